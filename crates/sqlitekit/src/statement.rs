//! Prepared statements.
//!
//! A [`Statement`] owns one compiled statement handle, registered with its
//! database so the connection can finalize it at close. The statement keeps
//! the source SQL for diagnostics and revalidates its handle on every call;
//! a finalized statement or a closed connection produces a typed error.

use crate::codec;
use crate::database::DbHandle;
use crate::ffi;
use serde::{Deserialize, Serialize};
use sqlitekit_core::{ColumnInfo, Error, Params, Result, Row, Value};
use std::cell::Cell;
use std::collections::HashSet;
use std::ffi::c_int;
use std::rc::Rc;
use std::sync::Arc;

/// Options for compiling a statement.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct StatementOptions {
    /// Override the connection's 64-bit integer handling for this
    /// statement. `None` inherits the connection setting.
    pub int64: Option<bool>,
    /// Reject statements that write to the database.
    pub readonly: bool,
}

impl StatementOptions {
    /// Create the default option set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the 64-bit integer override.
    #[must_use]
    pub fn int64(mut self, int64: bool) -> Self {
        self.int64 = Some(int64);
        self
    }

    /// Require a read-only statement.
    #[must_use]
    pub fn readonly(mut self, readonly: bool) -> Self {
        self.readonly = readonly;
        self
    }
}

/// A compiled SQL statement bound to one database connection.
pub struct Statement {
    db: Rc<DbHandle>,
    id: u64,
    sql: String,
    int64: bool,
    busy: Cell<bool>,
    traversal: Cell<u64>,
}

impl Statement {
    pub(crate) fn new(db: Rc<DbHandle>, id: u64, sql: String, int64: bool) -> Self {
        Self {
            db,
            id,
            sql,
            int64,
            busy: Cell::new(false),
            traversal: Cell::new(0),
        }
    }

    /// The source SQL this statement was compiled from.
    pub fn sql(&self) -> &str {
        &self.sql
    }

    /// Whether full 64-bit integers are preserved by this statement.
    pub fn int64(&self) -> bool {
        self.int64
    }

    /// Number of parameter slots in the compiled statement.
    pub fn parameter_count(&self) -> Result<usize> {
        let stmt = self.raw()?;
        // SAFETY: stmt is valid
        Ok(unsafe { ffi::sqlite3_bind_parameter_count(stmt) } as usize)
    }

    /// Declared result column names, in order.
    pub fn column_names(&self) -> Result<Vec<String>> {
        let stmt = self.raw()?;
        // SAFETY: stmt is valid
        let count = unsafe { ffi::sqlite3_column_count(stmt) };
        let mut names = Vec::with_capacity(count as usize);
        for i in 0..count {
            // SAFETY: i is a valid column index
            names.push(unsafe { codec::column_name(stmt, i) }.unwrap_or_else(|| format!("col{i}")));
        }
        Ok(names)
    }

    fn raw(&self) -> Result<*mut ffi::sqlite3_stmt> {
        self.db.statement_ptr(self.id)
    }

    fn ensure_idle(&self) -> Result<()> {
        if self.busy.get() {
            Err(Error::StatementBusy)
        } else {
            Ok(())
        }
    }

    /// Bind parameters without stepping. Returns `self` for chaining.
    pub fn bind(&self, params: impl Into<Params>) -> Result<&Self> {
        self.ensure_idle()?;
        let stmt = self.raw()?;
        // SAFETY: stmt is valid; reset clears step state, keeps bindings
        unsafe {
            ffi::sqlite3_reset(stmt);
        }
        self.apply_params(stmt, params.into())?;
        Ok(self)
    }

    /// Clear step state, preserving bindings. Also releases a live row
    /// iterator, which will observe exhaustion on its next call.
    pub fn reset(&self) -> Result<()> {
        let stmt = self.raw()?;
        self.busy.set(false);
        // SAFETY: stmt is valid; the return value replays the last step
        // error, which has already been surfaced
        unsafe {
            ffi::sqlite3_reset(stmt);
        }
        Ok(())
    }

    /// Release the compiled handle. Subsequent operations (including a
    /// second `finalize`) fail with `StatementFinalized`.
    pub fn finalize(&self) -> Result<()> {
        self.ensure_idle()?;
        let stmt = self.db.take_statement(self.id)?;
        // SAFETY: stmt was just removed from the registry and is live
        let rc = unsafe { ffi::sqlite3_finalize(stmt) };
        self.db.check(rc)
    }

    /// Bind and step to completion, returning the connection's change
    /// count.
    pub fn run(&self, params: impl Into<Params>) -> Result<u64> {
        self.begin(params.into())?;
        while self.step_cursor()? {}
        self.reset_quiet();
        let db = self.db.raw()?;
        // SAFETY: db is valid
        Ok(unsafe { ffi::sqlite3_changes(db) }.max(0) as u64)
    }

    /// Bind, step once and return the row in object shape, if any.
    /// Implicitly resets.
    pub fn get(&self, params: impl Into<Params>) -> Result<Option<Row>> {
        self.begin(params.into())?;
        let row = if self.step_cursor()? {
            let columns = self.column_info()?;
            Some(Row::with_columns(columns, self.row_values()?))
        } else {
            None
        };
        self.reset_quiet();
        Ok(row)
    }

    /// Bind, step once and return the row positionally, if any.
    /// Implicitly resets.
    pub fn get_array(&self, params: impl Into<Params>) -> Result<Option<Vec<Value>>> {
        self.begin(params.into())?;
        let row = if self.step_cursor()? {
            Some(self.row_values()?)
        } else {
            None
        };
        self.reset_quiet();
        Ok(row)
    }

    /// Bind and collect every row in object shape.
    pub fn all(&self, params: impl Into<Params>) -> Result<Vec<Row>> {
        self.begin(params.into())?;
        let columns = self.column_info()?;
        let mut rows = Vec::new();
        while self.step_cursor()? {
            rows.push(Row::with_columns(Arc::clone(&columns), self.row_values()?));
        }
        self.reset_quiet();
        Ok(rows)
    }

    /// Bind and collect every row positionally.
    pub fn all_arrays(&self, params: impl Into<Params>) -> Result<Vec<Vec<Value>>> {
        self.begin(params.into())?;
        let mut rows = Vec::new();
        while self.step_cursor()? {
            rows.push(self.row_values()?);
        }
        self.reset_quiet();
        Ok(rows)
    }

    /// Bind and return a lazy, non-restartable sequence of object-shape
    /// rows.
    ///
    /// The sequence holds the statement until drained, dropped or
    /// explicitly [`reset`](Self::reset); any other operation in between
    /// fails with `StatementBusy`.
    pub fn iter(&self, params: impl Into<Params>) -> Result<Rows<'_>> {
        self.begin(params.into())?;
        let columns = self.column_info()?;
        Ok(Rows {
            stmt: self,
            columns,
            token: self.start_traversal(),
            done: false,
        })
    }

    /// Positional variant of [`iter`](Self::iter).
    pub fn iter_arrays(&self, params: impl Into<Params>) -> Result<ArrayRows<'_>> {
        self.begin(params.into())?;
        Ok(ArrayRows {
            stmt: self,
            token: self.start_traversal(),
            done: false,
        })
    }

    fn start_traversal(&self) -> u64 {
        let token = self.traversal.get() + 1;
        self.traversal.set(token);
        self.busy.set(true);
        token
    }

    /// Reset and bind; the entry point of every execution.
    pub(crate) fn begin(&self, params: Params) -> Result<()> {
        self.ensure_idle()?;
        let stmt = self.raw()?;
        // SAFETY: stmt is valid
        unsafe {
            ffi::sqlite3_reset(stmt);
        }
        self.apply_params(stmt, params)
    }

    /// Advance the cursor. `true` means a row is available.
    pub(crate) fn step_cursor(&self) -> Result<bool> {
        let stmt = self.raw()?;
        // SAFETY: stmt is valid
        match unsafe { ffi::sqlite3_step(stmt) } {
            ffi::SQLITE_ROW => Ok(true),
            ffi::SQLITE_DONE => Ok(false),
            rc => {
                let err = self.db.error_for(rc);
                // SAFETY: stmt is valid; reset clears the error state
                unsafe {
                    ffi::sqlite3_reset(stmt);
                }
                Err(err)
            }
        }
    }

    pub(crate) fn column_info(&self) -> Result<Arc<ColumnInfo>> {
        Ok(Arc::new(ColumnInfo::new(self.column_names()?)))
    }

    /// Extract the current row's cells. Valid only after a `true` step.
    pub(crate) fn row_values(&self) -> Result<Vec<Value>> {
        let stmt = self.raw()?;
        // SAFETY: stmt is valid
        let count = unsafe { ffi::sqlite3_column_count(stmt) };
        let mut values = Vec::with_capacity(count as usize);
        for i in 0..count {
            // SAFETY: the cursor is positioned on a row
            values.push(unsafe { codec::read_column(stmt, i, self.int64) });
        }
        Ok(values)
    }

    pub(crate) fn reset_quiet(&self) {
        if let Ok(stmt) = self.raw() {
            // SAFETY: stmt is valid
            unsafe {
                ffi::sqlite3_reset(stmt);
            }
        }
    }

    pub(crate) fn end_traversal(&self, token: u64) {
        if self.busy.get() && self.traversal.get() == token {
            self.busy.set(false);
            self.reset_quiet();
        }
    }

    pub(crate) fn traversal_live(&self, token: u64) -> bool {
        self.busy.get() && self.traversal.get() == token
    }

    fn apply_params(&self, stmt: *mut ffi::sqlite3_stmt, params: Params) -> Result<()> {
        match params {
            Params::None => Ok(()),
            Params::Positional(values) => {
                // SAFETY: stmt is valid
                let expected = unsafe { ffi::sqlite3_bind_parameter_count(stmt) } as usize;
                if values.len() > expected {
                    return Err(Error::TooManyParameters {
                        expected,
                        given: values.len(),
                    });
                }
                // Unbound trailing slots stay NULL.
                // SAFETY: stmt is valid
                unsafe {
                    ffi::sqlite3_clear_bindings(stmt);
                }
                for (i, value) in values.iter().enumerate() {
                    // SAFETY: index is within the parameter count
                    let rc = unsafe { codec::bind_value(stmt, (i + 1) as c_int, value, self.int64) }?;
                    self.db.check(rc)?;
                }
                Ok(())
            }
            Params::Named(pairs) => {
                // SAFETY: stmt is valid
                unsafe {
                    ffi::sqlite3_clear_bindings(stmt);
                }
                let mut bound: HashSet<c_int> = HashSet::new();
                for (name, value) in &pairs {
                    // SAFETY: stmt is valid
                    let index = unsafe { codec::parameter_index(stmt, name) }
                        .ok_or_else(|| Error::UnknownParameter(name.clone()))?;
                    if !bound.insert(index) {
                        return Err(Error::DuplicateParameter(name.clone()));
                    }
                    // SAFETY: index came from parameter lookup
                    let rc = unsafe { codec::bind_value(stmt, index, value, self.int64) }?;
                    self.db.check(rc)?;
                }
                Ok(())
            }
        }
    }
}

impl Drop for Statement {
    fn drop(&mut self) {
        if let Some(stmt) = self.db.remove_statement_quiet(self.id) {
            // SAFETY: the registry entry was live
            unsafe {
                ffi::sqlite3_finalize(stmt);
            }
        }
    }
}

impl std::fmt::Debug for Statement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Statement")
            .field("sql", &self.sql)
            .field("int64", &self.int64)
            .field("busy", &self.busy.get())
            .finish()
    }
}

/// Lazy object-shape row sequence borrowing its [`Statement`].
///
/// Finite and non-restartable; the statement resets when the sequence is
/// drained or dropped.
pub struct Rows<'s> {
    stmt: &'s Statement,
    columns: Arc<ColumnInfo>,
    token: u64,
    done: bool,
}

impl Iterator for Rows<'_> {
    type Item = Result<Row>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done || !self.stmt.traversal_live(self.token) {
            self.done = true;
            return None;
        }
        match self.stmt.step_cursor() {
            Ok(true) => match self.stmt.row_values() {
                Ok(values) => Some(Ok(Row::with_columns(Arc::clone(&self.columns), values))),
                Err(err) => {
                    self.finish();
                    Some(Err(err))
                }
            },
            Ok(false) => {
                self.finish();
                None
            }
            Err(err) => {
                self.finish();
                Some(Err(err))
            }
        }
    }
}

impl Rows<'_> {
    fn finish(&mut self) {
        self.stmt.end_traversal(self.token);
        self.done = true;
    }
}

impl Drop for Rows<'_> {
    fn drop(&mut self) {
        self.stmt.end_traversal(self.token);
    }
}

/// Lazy positional row sequence borrowing its [`Statement`].
pub struct ArrayRows<'s> {
    stmt: &'s Statement,
    token: u64,
    done: bool,
}

impl Iterator for ArrayRows<'_> {
    type Item = Result<Vec<Value>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done || !self.stmt.traversal_live(self.token) {
            self.done = true;
            return None;
        }
        match self.stmt.step_cursor() {
            Ok(true) => match self.stmt.row_values() {
                Ok(values) => Some(Ok(values)),
                Err(err) => {
                    self.finish();
                    Some(Err(err))
                }
            },
            Ok(false) => {
                self.finish();
                None
            }
            Err(err) => {
                self.finish();
                Some(Err(err))
            }
        }
    }
}

impl ArrayRows<'_> {
    fn finish(&mut self) {
        self.stmt.end_traversal(self.token);
        self.done = true;
    }
}

impl Drop for ArrayRows<'_> {
    fn drop(&mut self) {
        self.stmt.end_traversal(self.token);
    }
}
