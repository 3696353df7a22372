//! Subsystems built on the core primitives and the engine.

pub mod ingest;
pub mod service;
pub mod sources;
