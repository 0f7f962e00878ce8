//! Core types and traits for the sqlitekit SQLite driver.
//!
//! This crate provides the driver-independent half of sqlitekit:
//!
//! - [`Value`] - the closed set of host values crossing the SQLite boundary
//! - [`Row`] - query results with positional and name-based access
//! - [`Error`] - the typed error hierarchy, including SQLite result codes
//! - [`Queryable`]/[`Preparable`]/[`Transactional`] - connection contracts
//! - [`EventBus`] - synchronous connection lifecycle notifications
//! - `log_*!` macros - env-driven diagnostics (`SQLITEKIT_LOG=1`)

pub mod error;
pub mod events;
pub mod identifiers;
pub mod logging;
pub mod row;
pub mod traits;
pub mod value;

pub use error::{Error, ErrorKind, Result, SqliteError, TypeError};
pub use events::{EventBus, ListenerId};
pub use identifiers::quote_ident;
pub use row::{ColumnInfo, FromValue, Row};
pub use traits::{
    Preparable, Queryable, TransactionBehavior, TransactionHandle, Transactional,
};
pub use value::{MAX_SAFE_INTEGER, MIN_SAFE_INTEGER, Params, Value};
