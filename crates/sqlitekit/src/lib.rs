//! Embedded SQLite driver.
//!
// FFI bindings require unsafe code - this is expected for database drivers
#![allow(unsafe_code)]
//!
//! A thin, safe, typed client over the native SQLite C library:
//!
//! - [`Client`] - the connected façade: single-call queries in object or
//!   positional row shape, streaming sequences, template queries,
//!   transactions and lifecycle events
//! - [`Database`] - connection state machine owning the native handle and
//!   every dependent statement, blob handle and host function
//! - [`Statement`] - compiled statements with bind/run/get/all/iter
//!   operations
//! - [`Blob`] - incremental BLOB I/O
//! - [`Transaction`] - guard-based transactions with savepoints
//!
//! # Example
//!
//! ```rust,ignore
//! use sqlitekit::{Client, OpenOptions, Params, Queryable, Value};
//!
//! let client = Client::memory()?;
//! client.execute("CREATE TABLE users (id INTEGER PRIMARY KEY, name TEXT)", Params::None)?;
//!
//! let stmt = client.prepare_with("INSERT INTO users (name) VALUES (?)", Default::default())?;
//! stmt.run([Value::from("Alice")])?;
//! stmt.finalize()?;
//!
//! for row in client.query_many("SELECT * FROM users", ())? {
//!     println!("{:?}", row?);
//! }
//! # sqlitekit::Result::Ok(())
//! ```
//!
//! # Type Mapping
//!
//! | Rust value | SQLite storage |
//! |------------|----------------|
//! | `Value::Null` | NULL |
//! | `Value::Bool` | INTEGER 0/1 |
//! | `Value::Int` | INTEGER |
//! | `Value::Real` | REAL |
//! | `Value::Text` | TEXT |
//! | `Value::Blob` | BLOB |
//!
//! Integers beyond ±(2^53 - 1) require the `int64` option; without it they
//! fail to bind and read back as lossy doubles.
//!
//! # Thread Safety
//!
//! A connection and its statements are single-threaded by construction;
//! serialize access yourself or open one connection per thread.

pub mod blob;
pub mod client;
pub mod codec;
pub mod database;
pub mod ffi;
pub mod functions;
pub mod statement;
pub mod template;
pub mod transaction;

pub use blob::{Blob, BlobOptions};
pub use client::{Client, QueryArrayRows, QueryRows};
pub use database::{ConnectionEvent, Database, OpenOptions};
pub use functions::{Aggregate, FunctionOptions};
pub use statement::{ArrayRows, Rows, Statement, StatementOptions};
pub use template::Template;
pub use transaction::Transaction;

// Re-export the core surface so a single `use sqlitekit::...` suffices.
pub use sqlitekit_core::{
    ColumnInfo, Error, ErrorKind, EventBus, FromValue, ListenerId, MAX_SAFE_INTEGER,
    MIN_SAFE_INTEGER, Params, Preparable, Queryable, Result, Row, SqliteError,
    TransactionBehavior, TransactionHandle, Transactional, TypeError, Value, quote_ident,
};

/// The SQLite library version string.
pub fn sqlite_version() -> &'static str {
    ffi::version()
}

/// The SQLite library version number (e.g. `3045000` for 3.45.0).
pub fn sqlite_version_number() -> i32 {
    ffi::version_number()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sqlite_version() {
        let version = sqlite_version();
        assert!(
            version.starts_with('3'),
            "Expected SQLite 3.x, got {}",
            version
        );
    }

    #[test]
    fn test_sqlite_version_number() {
        let num = sqlite_version_number();
        assert!(
            num >= 3_000_000,
            "Expected SQLite 3.x.x (>= 3000000), got {}",
            num
        );
    }
}
