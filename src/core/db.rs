//! SQLite connection helpers with busy/locked retry.
//!
//! Connections are opened fresh per operation. WAL mode lets readers proceed
//! while the scheduler writes; writers are serialized by the store's own lock
//! and retry with exponential backoff when another process holds the database.

use crate::core::error::AqhiError;
use rusqlite::Connection;
use std::thread;
use std::time::Duration;

/// Maximum retry attempts for busy/locked errors.
const MAX_RETRIES: u32 = 5;
/// Base delay for exponential backoff (milliseconds).
const BASE_DELAY_MS: u64 = 100;
/// Maximum delay cap (milliseconds).
const MAX_DELAY_MS: u64 = 5_000;

pub const WRITE_BUSY_TIMEOUT_SECS: u64 = 30;
pub const READ_BUSY_TIMEOUT_SECS: u64 = 15;

pub fn db_connect(db_path: &str, busy_timeout_secs: u64) -> Result<Connection, AqhiError> {
    let conn = Connection::open(db_path)?;
    conn.busy_timeout(Duration::from_secs(busy_timeout_secs))?;
    conn.query_row("PRAGMA journal_mode=WAL;", [], |_| Ok(()))?;
    conn.execute("PRAGMA synchronous=NORMAL;", [])?;
    Ok(conn)
}

/// Run `f`, retrying while SQLite reports the database as busy or locked.
pub fn with_busy_retry<F, R>(mut f: F) -> Result<R, AqhiError>
where
    F: FnMut() -> Result<R, AqhiError>,
{
    let mut attempt = 0u32;
    loop {
        match f() {
            Ok(v) => return Ok(v),
            Err(e) if is_busy_error(&e) && attempt < MAX_RETRIES => {
                attempt += 1;
                let delay_ms = (BASE_DELAY_MS * 2u64.pow(attempt - 1)).min(MAX_DELAY_MS);
                tracing::debug!(attempt, delay_ms, "sqlite busy, backing off");
                thread::sleep(Duration::from_millis(delay_ms));
            }
            Err(e) => return Err(e),
        }
    }
}

fn is_busy_error(err: &AqhiError) -> bool {
    match err {
        AqhiError::RusqliteError(rusqlite::Error::SqliteFailure(code, _)) => matches!(
            code.code,
            rusqlite::ErrorCode::DatabaseBusy | rusqlite::ErrorCode::DatabaseLocked
        ),
        _ => false,
    }
}
