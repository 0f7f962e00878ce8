//! Connection-facing contracts.
//!
//! These traits describe what a connected handle can do, independent of
//! whether the implementor is a database client or a live transaction:
//!
//! - [`Queryable`] - single-call query execution in both row shapes
//! - [`Preparable`] - compiling reusable statements
//! - [`Transactional`] - starting transactions, plus the scoped helper
//!
//! A transaction is itself a [`Queryable`] over the same connection, which
//! is what lets application code take `&impl Queryable` and run unchanged
//! inside or outside a transaction.

use crate::error::Result;
use crate::row::Row;
use crate::value::{Params, Value};
use crate::log_warn;

/// A handle capable of executing SQL directly.
///
/// Each call prepares an ephemeral statement, runs it to completion and
/// releases it; hold a prepared statement yourself when re-executing.
pub trait Queryable {
    /// Execute a statement and return the number of rows changed.
    fn execute(&self, sql: &str, params: Params) -> Result<u64>;

    /// Execute a query and return all rows in object shape.
    fn query(&self, sql: &str, params: Params) -> Result<Vec<Row>>;

    /// Execute a query and return the first row in object shape, if any.
    fn query_one(&self, sql: &str, params: Params) -> Result<Option<Row>>;

    /// Execute a query and return all rows as positional cell sequences.
    fn query_array(&self, sql: &str, params: Params) -> Result<Vec<Vec<Value>>>;

    /// Execute a query and return the first row positionally, if any.
    fn query_one_array(&self, sql: &str, params: Params) -> Result<Option<Vec<Value>>>;
}

/// A handle that can compile SQL into a reusable statement.
pub trait Preparable {
    /// The compiled statement type.
    type Stmt;

    /// Compile `sql` into a statement bound to this handle's connection.
    fn prepare(&self, sql: &str) -> Result<Self::Stmt>;
}

/// Locking behavior of `BEGIN`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransactionBehavior {
    /// Take no locks until the first statement needs them.
    #[default]
    Deferred,
    /// Acquire the reserved write lock immediately.
    Immediate,
    /// Acquire an exclusive lock immediately.
    Exclusive,
}

impl TransactionBehavior {
    /// The `BEGIN` statement for this behavior.
    #[must_use]
    pub const fn begin_sql(&self) -> &'static str {
        match self {
            TransactionBehavior::Deferred => "BEGIN DEFERRED",
            TransactionBehavior::Immediate => "BEGIN IMMEDIATE",
            TransactionBehavior::Exclusive => "BEGIN EXCLUSIVE",
        }
    }
}

/// Lifecycle operations of a live transaction.
///
/// Committing or rolling back consumes the handle; both transition the
/// transaction to a terminal state even when the underlying statement
/// fails, so a failed commit can never be retried against a transaction
/// that only appears active.
pub trait TransactionHandle: Queryable + Sized {
    /// Whether this transaction can still accept operations.
    fn is_active(&self) -> bool;

    /// Commit, making all changes permanent.
    fn commit(self) -> Result<()>;

    /// Roll back, discarding all changes.
    fn rollback(self) -> Result<()>;
}

/// A handle that can start transactions.
pub trait Transactional {
    /// The transaction guard type, borrowing this handle.
    type Tx<'conn>: TransactionHandle
    where
        Self: 'conn;

    /// Issue `BEGIN` and return the guard.
    fn begin_transaction(&self, behavior: TransactionBehavior) -> Result<Self::Tx<'_>>;

    /// Run `f` inside a transaction.
    ///
    /// Commits when `f` returns `Ok`; on `Err` rolls back and returns the
    /// original error (a rollback failure is logged, not surfaced). If the
    /// commit itself fails, that error propagates without a further
    /// rollback attempt.
    fn transaction<'conn, T, F>(&'conn self, behavior: TransactionBehavior, f: F) -> Result<T>
    where
        F: FnOnce(&Self::Tx<'conn>) -> Result<T>,
    {
        let tx = self.begin_transaction(behavior)?;
        match f(&tx) {
            Ok(out) => {
                tx.commit()?;
                Ok(out)
            }
            Err(err) => {
                if let Err(rb) = tx.rollback() {
                    log_warn!("rollback after failed transaction body also failed: {rb}");
                }
                Err(err)
            }
        }
    }
}
