use rusqlite;
use std::env;
use std::io;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AqhiError {
    #[error("SQLite error: {0}")]
    RusqliteError(#[from] rusqlite::Error),
    #[error("I/O error: {0}")]
    IoError(#[from] io::Error),
    #[error("Environment variable error: {0}")]
    EnvVarError(#[from] env::VarError),
    #[error("Configuration error: {0}")]
    ConfigError(String),
    #[error("Validation error: {0}")]
    ValidationError(String),
    #[error("Fetch error: {0}")]
    FetchError(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Store error: {0}")]
    StoreError(String),
    #[error("Internal error: {0}")]
    InternalError(String),
}

impl AqhiError {
    /// HTTP-style status for surfacing the error to a request boundary.
    pub fn http_status(&self) -> u16 {
        match self {
            AqhiError::ValidationError(_) => 400,
            AqhiError::NotFound(_) => 404,
            AqhiError::FetchError(_) => 502,
            _ => 500,
        }
    }

    /// Stable machine-readable code used in RPC error envelopes.
    pub fn code(&self) -> &'static str {
        match self {
            AqhiError::RusqliteError(_) => "store_error",
            AqhiError::IoError(_) => "io_error",
            AqhiError::EnvVarError(_) => "env_error",
            AqhiError::ConfigError(_) => "config_error",
            AqhiError::ValidationError(_) => "invalid_request",
            AqhiError::FetchError(_) => "fetch_error",
            AqhiError::NotFound(_) => "not_found",
            AqhiError::StoreError(_) => "store_error",
            AqhiError::InternalError(_) => "internal_error",
        }
    }
}

pub type Result<T> = std::result::Result<T, AqhiError>;
