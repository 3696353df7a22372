//! Core modules shared by the engine and the subsystems.
//!
//! Configuration, errors, time buckets, the city set, the measurement store
//! and the RPC envelope live here.

pub mod city;
pub mod config;
pub mod context;
pub mod db;
pub mod error;
pub mod logging;
pub mod rpc;
pub mod schemas;
pub mod store;
pub mod time;
