//! Transaction state machine.
//!
//! [`Database::begin_transaction`] issues `BEGIN` and returns a
//! [`Transaction`] guard over the same connection. The guard is itself a
//! queryable and preparable handle; once it leaves the Active state every
//! further operation fails with `TransactionInactive`. Commit and rollback
//! reach a terminal state even when the underlying statement fails, so a
//! failed commit can never be retried against a transaction that only
//! appears active; inspect [`Database::in_transaction`] for the state
//! SQLite was left in.

use crate::database::Database;
use crate::statement::{Statement, StatementOptions};
use sqlitekit_core::{
    Error, Params, Preparable, Queryable, Result, Row, TransactionBehavior, TransactionHandle,
    Transactional, Value, log_debug, quote_ident,
};
use std::cell::Cell;

/// An active transaction over a borrowed [`Database`].
///
/// Dropping an active guard rolls back (stack-unwinding exit); call
/// [`commit`](TransactionHandle::commit) to keep the changes.
pub struct Transaction<'db> {
    db: &'db Database,
    active: Cell<bool>,
}

impl<'db> Transaction<'db> {
    pub(crate) fn begin(db: &'db Database, behavior: TransactionBehavior) -> Result<Self> {
        db.exec(behavior.begin_sql())?;
        Ok(Self {
            db,
            active: Cell::new(true),
        })
    }

    /// The database this transaction runs on.
    pub fn database(&self) -> &'db Database {
        self.db
    }

    fn ensure_active(&self) -> Result<()> {
        if self.active.get() {
            Ok(())
        } else {
            Err(Error::TransactionInactive)
        }
    }

    /// Run a terminal statement. Deactivates first: whatever the outcome,
    /// the guard must not stay retryable.
    fn finish(&self, sql: &str) -> Result<()> {
        self.ensure_active()?;
        self.active.set(false);
        self.db.exec(sql)
    }

    /// Create a named savepoint within this transaction.
    pub fn create_savepoint(&self, name: &str) -> Result<()> {
        self.ensure_active()?;
        self.db.exec(&format!("SAVEPOINT {}", quote_ident(name)))
    }

    /// Release a savepoint, folding its changes into the transaction.
    pub fn release_savepoint(&self, name: &str) -> Result<()> {
        self.ensure_active()?;
        self.db.exec(&format!("RELEASE {}", quote_ident(name)))
    }

    /// Roll back to a savepoint. The transaction stays active on success;
    /// on failure the guard is deactivated like a full rollback.
    pub fn rollback_to(&self, name: &str) -> Result<()> {
        self.ensure_active()?;
        let out = self.db.exec(&format!("ROLLBACK TO {}", quote_ident(name)));
        if out.is_err() {
            self.active.set(false);
        }
        out
    }

    /// Compile a statement running inside this transaction.
    pub fn prepare_with(&self, sql: &str, options: StatementOptions) -> Result<Statement> {
        self.ensure_active()?;
        self.db.prepare_with(sql, options)
    }
}

impl TransactionHandle for Transaction<'_> {
    fn is_active(&self) -> bool {
        self.active.get()
    }

    fn commit(self) -> Result<()> {
        self.finish("COMMIT")
    }

    fn rollback(self) -> Result<()> {
        self.finish("ROLLBACK")
    }
}

impl Queryable for Transaction<'_> {
    fn execute(&self, sql: &str, params: Params) -> Result<u64> {
        self.ensure_active()?;
        self.db.execute(sql, params)
    }

    fn query(&self, sql: &str, params: Params) -> Result<Vec<Row>> {
        self.ensure_active()?;
        self.db.query(sql, params)
    }

    fn query_one(&self, sql: &str, params: Params) -> Result<Option<Row>> {
        self.ensure_active()?;
        self.db.query_one(sql, params)
    }

    fn query_array(&self, sql: &str, params: Params) -> Result<Vec<Vec<Value>>> {
        self.ensure_active()?;
        self.db.query_array(sql, params)
    }

    fn query_one_array(&self, sql: &str, params: Params) -> Result<Option<Vec<Value>>> {
        self.ensure_active()?;
        self.db.query_one_array(sql, params)
    }
}

impl Preparable for Transaction<'_> {
    type Stmt = Statement;

    fn prepare(&self, sql: &str) -> Result<Statement> {
        self.prepare_with(sql, StatementOptions::default())
    }
}

impl Drop for Transaction<'_> {
    fn drop(&mut self) {
        if self.active.get() {
            self.active.set(false);
            if self.db.exec("ROLLBACK").is_ok() {
                log_debug!("rolled back transaction dropped without commit");
            }
        }
    }
}

impl Database {
    /// Issue `BEGIN` and return the transaction guard.
    pub fn begin_transaction(&self, behavior: TransactionBehavior) -> Result<Transaction<'_>> {
        Transaction::begin(self, behavior)
    }
}

impl Transactional for Database {
    type Tx<'conn>
        = Transaction<'conn>
    where
        Self: 'conn;

    fn begin_transaction(&self, behavior: TransactionBehavior) -> Result<Transaction<'_>> {
        Transaction::begin(self, behavior)
    }
}
