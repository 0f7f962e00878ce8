//! SQLite database connection.
//!
//! A [`Database`] exclusively owns its native handle plus the registries of
//! live statements, blob handles and registered host functions. Dependent
//! objects ([`crate::Statement`], [`crate::Blob`]) hold a shared reference
//! to the inner handle and revalidate their registry entry on every call,
//! so closing the database degrades them to typed errors instead of
//! dangling pointers.
//!
//! A connection is **not** safe for concurrent use from multiple threads;
//! serialize access or open one connection per thread.

use crate::ffi;
use crate::statement::{Statement, StatementOptions};
use serde::{Deserialize, Serialize};
use sqlitekit_core::{
    Error, EventBus, ListenerId, Params, Queryable, Result, Row, Value, log_debug, log_error,
    log_warn,
};
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::ffi::{CStr, CString, c_int};
use std::ptr;
use std::rc::Rc;

/// Options controlling how a database is opened.
///
/// An explicit raw [`flags`](Self::flags) value bypasses all other flag
/// assembly. Otherwise `memory` adds `SQLITE_OPEN_MEMORY`, `readonly`
/// selects read-only access, and `create` (default) adds
/// `SQLITE_OPEN_CREATE` unless the database is read-only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenOptions {
    /// Open for reading only.
    pub readonly: bool,
    /// Create the database file if it does not exist (default true).
    pub create: bool,
    /// Open an in-memory database.
    pub memory: bool,
    /// Raw open flags, overriding every other flag option.
    pub flags: Option<i32>,
    /// Preserve the full 64-bit integer range in bound parameters and
    /// column values. Without it, integers beyond 2^53-1 fail to bind and
    /// read back as lossy doubles.
    pub int64: bool,
    /// Open in multi-thread mode (`SQLITE_OPEN_NOMUTEX`) instead of
    /// serialized mode. Unsafe with concurrent writers on the same handle.
    pub unsafe_concurrency: bool,
    /// Permit [`Database::load_extension`].
    pub enable_load_extension: bool,
    /// Busy timeout in milliseconds applied at connect.
    pub busy_timeout_ms: u32,
}

impl Default for OpenOptions {
    fn default() -> Self {
        Self {
            readonly: false,
            create: true,
            memory: false,
            flags: None,
            int64: false,
            unsafe_concurrency: false,
            enable_load_extension: false,
            busy_timeout_ms: 5000,
        }
    }
}

impl OpenOptions {
    /// Create the default option set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set read-only access.
    #[must_use]
    pub fn readonly(mut self, readonly: bool) -> Self {
        self.readonly = readonly;
        self
    }

    /// Set whether to create a missing database file.
    #[must_use]
    pub fn create(mut self, create: bool) -> Self {
        self.create = create;
        self
    }

    /// Open an in-memory database.
    #[must_use]
    pub fn memory(mut self, memory: bool) -> Self {
        self.memory = memory;
        self
    }

    /// Set raw open flags, bypassing the other flag options.
    #[must_use]
    pub fn flags(mut self, flags: i32) -> Self {
        self.flags = Some(flags);
        self
    }

    /// Enable full 64-bit integer handling.
    #[must_use]
    pub fn int64(mut self, int64: bool) -> Self {
        self.int64 = int64;
        self
    }

    /// Open in multi-thread mode.
    #[must_use]
    pub fn unsafe_concurrency(mut self, unsafe_concurrency: bool) -> Self {
        self.unsafe_concurrency = unsafe_concurrency;
        self
    }

    /// Permit extension loading.
    #[must_use]
    pub fn enable_load_extension(mut self, enable: bool) -> Self {
        self.enable_load_extension = enable;
        self
    }

    /// Set the busy timeout.
    #[must_use]
    pub fn busy_timeout(mut self, ms: u32) -> Self {
        self.busy_timeout_ms = ms;
        self
    }

    fn to_open_flags(&self) -> c_int {
        if let Some(flags) = self.flags {
            return flags as c_int;
        }

        let mut flags = 0;
        if self.memory {
            flags |= ffi::SQLITE_OPEN_MEMORY;
        }
        if self.readonly {
            flags |= ffi::SQLITE_OPEN_READONLY;
        } else {
            flags |= ffi::SQLITE_OPEN_READWRITE;
            if self.create {
                flags |= ffi::SQLITE_OPEN_CREATE;
            }
        }
        flags |= if self.unsafe_concurrency {
            ffi::SQLITE_OPEN_NOMUTEX
        } else {
            ffi::SQLITE_OPEN_FULLMUTEX
        };
        flags
    }
}

/// Payload of connection lifecycle notifications.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionEvent {
    /// Resolved path of the connection that fired the event.
    pub path: String,
}

/// A host function registration, kept so `close` can release it.
#[derive(Debug)]
pub(crate) struct RegisteredFunction {
    pub(crate) name: CString,
    pub(crate) nargs: c_int,
}

/// Shared inner state: the native handle plus resource registries.
#[derive(Debug)]
pub(crate) struct DbHandle {
    raw: Cell<*mut ffi::sqlite3>,
    statements: RefCell<HashMap<u64, *mut ffi::sqlite3_stmt>>,
    blobs: RefCell<HashMap<u64, *mut ffi::sqlite3_blob>>,
    functions: RefCell<Vec<RegisteredFunction>>,
    next_id: Cell<u64>,
    pub(crate) int64: bool,
}

impl DbHandle {
    fn new(int64: bool) -> Self {
        Self {
            raw: Cell::new(ptr::null_mut()),
            statements: RefCell::new(HashMap::new()),
            blobs: RefCell::new(HashMap::new()),
            functions: RefCell::new(Vec::new()),
            next_id: Cell::new(1),
            int64,
        }
    }

    pub(crate) fn is_open(&self) -> bool {
        !self.raw.get().is_null()
    }

    /// The native handle, or `ConnectionClosed`.
    pub(crate) fn raw(&self) -> Result<*mut ffi::sqlite3> {
        let db = self.raw.get();
        if db.is_null() {
            Err(Error::ConnectionClosed)
        } else {
            Ok(db)
        }
    }

    /// Convert a non-OK result code into a typed error carrying the
    /// extended code and `errmsg` text. This is the single unwrap point
    /// for every fallible native call on an open connection.
    pub(crate) fn check(&self, rc: c_int) -> Result<()> {
        if rc == ffi::SQLITE_OK {
            Ok(())
        } else {
            Err(self.error_for(rc))
        }
    }

    pub(crate) fn error_for(&self, rc: c_int) -> Error {
        let db = self.raw.get();
        if db.is_null() {
            return Error::sqlite(rc, ffi::error_string(rc));
        }
        // SAFETY: db is a live handle owned by this struct
        unsafe {
            let code = ffi::sqlite3_extended_errcode(db);
            let code = if code == 0 { rc } else { code };
            let message = CStr::from_ptr(ffi::sqlite3_errmsg(db))
                .to_string_lossy()
                .into_owned();
            Error::sqlite(code, message)
        }
    }

    /// The connection's current error state, for failures signalled
    /// through channels other than a result code (step, backup init).
    pub(crate) fn last_error(&self) -> Error {
        self.error_for(ffi::SQLITE_ERROR)
    }

    fn fresh_id(&self) -> u64 {
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        id
    }

    pub(crate) fn register_statement(&self, stmt: *mut ffi::sqlite3_stmt) -> u64 {
        let id = self.fresh_id();
        self.statements.borrow_mut().insert(id, stmt);
        id
    }

    pub(crate) fn statement_ptr(&self, id: u64) -> Result<*mut ffi::sqlite3_stmt> {
        if !self.is_open() {
            return Err(Error::ConnectionClosed);
        }
        self.statements
            .borrow()
            .get(&id)
            .copied()
            .ok_or(Error::StatementFinalized)
    }

    pub(crate) fn take_statement(&self, id: u64) -> Result<*mut ffi::sqlite3_stmt> {
        if !self.is_open() {
            return Err(Error::ConnectionClosed);
        }
        self.statements
            .borrow_mut()
            .remove(&id)
            .ok_or(Error::StatementFinalized)
    }

    /// Registry removal for drop paths; `None` when the database already
    /// finalized the handle.
    pub(crate) fn remove_statement_quiet(&self, id: u64) -> Option<*mut ffi::sqlite3_stmt> {
        if !self.is_open() {
            return None;
        }
        self.statements.borrow_mut().remove(&id)
    }

    pub(crate) fn register_blob(&self, blob: *mut ffi::sqlite3_blob) -> u64 {
        let id = self.fresh_id();
        self.blobs.borrow_mut().insert(id, blob);
        id
    }

    pub(crate) fn blob_ptr(&self, id: u64) -> Option<*mut ffi::sqlite3_blob> {
        if !self.is_open() {
            return None;
        }
        self.blobs.borrow().get(&id).copied()
    }

    pub(crate) fn remove_blob(&self, id: u64) -> Option<*mut ffi::sqlite3_blob> {
        if !self.is_open() {
            return None;
        }
        self.blobs.borrow_mut().remove(&id)
    }

    /// Track a host function registration. Registering a name/arity pair
    /// that already exists replaces it, mirroring what
    /// `sqlite3_create_function_v2` just did to the native registration.
    pub(crate) fn record_function(&self, name: CString, nargs: c_int) {
        let mut functions = self.functions.borrow_mut();
        functions.retain(|f| f.name != name || f.nargs != nargs);
        functions.push(RegisteredFunction { name, nargs });
    }

    pub(crate) fn statement_count(&self) -> usize {
        self.statements.borrow().len()
    }

    pub(crate) fn function_count(&self) -> usize {
        self.functions.borrow().len()
    }
}

/// A connection to a SQLite database.
///
/// Starts in the Closed state; [`connect`](Self::connect) opens the native
/// handle and [`close`](Self::close) tears everything down again. Most
/// callers go through [`crate::Client`], which connects on construction.
#[derive(Debug)]
pub struct Database {
    pub(crate) shared: Rc<DbHandle>,
    path: String,
    options: OpenOptions,
    connect_events: EventBus<ConnectionEvent>,
    close_events: EventBus<ConnectionEvent>,
}

impl Database {
    /// Create a closed database for `path` with the given options.
    ///
    /// `path` may be a filesystem path, a `file:` URL (converted to a
    /// local path) or the literal `":memory:"`.
    pub fn new(path: impl AsRef<str>, options: OpenOptions) -> Result<Self> {
        let path = resolve_path(path.as_ref())?;
        Ok(Self {
            shared: Rc::new(DbHandle::new(options.int64)),
            path,
            options,
            connect_events: EventBus::new(),
            close_events: EventBus::new(),
        })
    }

    /// Create and immediately connect.
    pub fn open(path: impl AsRef<str>, options: OpenOptions) -> Result<Self> {
        let db = Self::new(path, options)?;
        db.connect()?;
        Ok(db)
    }

    /// The resolved database path.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// The options this database was created with.
    pub fn options(&self) -> &OpenOptions {
        &self.options
    }

    /// Whether the native handle is open.
    pub fn is_open(&self) -> bool {
        self.shared.is_open()
    }

    /// Allocate and open the native handle. A no-op when already open.
    pub fn connect(&self) -> Result<()> {
        if self.shared.is_open() {
            return Ok(());
        }

        let c_path = CString::new(self.path.as_str())
            .map_err(|_| Error::InvalidPath(self.path.clone()))?;
        let flags = self.options.to_open_flags();

        let mut db: *mut ffi::sqlite3 = ptr::null_mut();
        // SAFETY: we pass valid pointers and check the return value
        let rc = unsafe { ffi::sqlite3_open_v2(c_path.as_ptr(), &mut db, flags, ptr::null()) };

        if rc != ffi::SQLITE_OK {
            let message = if db.is_null() {
                ffi::error_string(rc).to_string()
            } else {
                // SAFETY: db is valid; errmsg returns a C string owned by it
                unsafe {
                    let message = CStr::from_ptr(ffi::sqlite3_errmsg(db))
                        .to_string_lossy()
                        .into_owned();
                    ffi::sqlite3_close_v2(db);
                    message
                }
            };
            return Err(Error::sqlite(rc, message));
        }

        if self.options.busy_timeout_ms > 0 {
            // SAFETY: db is valid
            unsafe {
                ffi::sqlite3_busy_timeout(db, self.options.busy_timeout_ms as c_int);
            }
        }

        self.shared.raw.set(db);
        log_debug!("connected to {}", self.path);
        self.connect_events.emit(&ConnectionEvent {
            path: self.path.clone(),
        });
        Ok(())
    }

    /// Close the connection.
    ///
    /// In order: finalize every live statement, close every open blob
    /// handle, release every registered host function, close the native
    /// handle, emit the close event. Every step runs even when an earlier
    /// one fails; the first error is returned. Closing an already-closed
    /// database is a no-op.
    pub fn close(&self) -> Result<()> {
        let Ok(db) = self.shared.raw() else {
            return Ok(());
        };

        let mut first_error: Option<Error> = None;
        let record = |err: Option<Error>, first: &mut Option<Error>| {
            if let Some(err) = err {
                log_warn!("error during close: {err}");
                if first.is_none() {
                    *first = Some(err);
                }
            }
        };

        let statements: Vec<_> = self.shared.statements.borrow_mut().drain().collect();
        for (_, stmt) in statements {
            // SAFETY: the registry only holds live handles
            let rc = unsafe { ffi::sqlite3_finalize(stmt) };
            record(self.shared.check(rc).err(), &mut first_error);
        }

        let blobs: Vec<_> = self.shared.blobs.borrow_mut().drain().collect();
        for (_, blob) in blobs {
            // SAFETY: the registry only holds live handles
            let rc = unsafe { ffi::sqlite3_blob_close(blob) };
            record(self.shared.check(rc).err(), &mut first_error);
        }

        let functions: Vec<_> = std::mem::take(&mut *self.shared.functions.borrow_mut());
        for f in functions {
            // Re-registering with no callbacks removes the function; SQLite
            // invokes the old registration's destructor, freeing its state.
            // SAFETY: db is valid, the name CString outlives the call
            let rc = unsafe {
                ffi::sqlite3_create_function_v2(
                    db,
                    f.name.as_ptr(),
                    f.nargs,
                    ffi::SQLITE_UTF8,
                    ptr::null_mut(),
                    None,
                    None,
                    None,
                    None,
                )
            };
            record(self.shared.check(rc).err(), &mut first_error);
        }

        // SAFETY: db is valid; on failure close_v2 defers the free so the
        // pointer is never reused either way
        let rc = unsafe { ffi::sqlite3_close(db) };
        if rc != ffi::SQLITE_OK {
            record(Some(self.shared.error_for(rc)), &mut first_error);
            unsafe {
                ffi::sqlite3_close_v2(db);
            }
        }
        self.shared.raw.set(ptr::null_mut());

        log_debug!("closed {}", self.path);
        self.close_events.emit(&ConnectionEvent {
            path: self.path.clone(),
        });

        match first_error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// Compile `sql` into a [`Statement`] with default options.
    pub fn prepare(&self, sql: &str) -> Result<Statement> {
        self.prepare_with(sql, StatementOptions::default())
    }

    /// Compile `sql` into a [`Statement`].
    pub fn prepare_with(&self, sql: &str, options: StatementOptions) -> Result<Statement> {
        let db = self.shared.raw()?;
        let c_sql = CString::new(sql)
            .map_err(|_| Error::sqlite(ffi::SQLITE_MISUSE, "SQL contains a NUL byte"))?;

        let mut stmt: *mut ffi::sqlite3_stmt = ptr::null_mut();
        // SAFETY: all pointers are valid
        let rc = unsafe {
            ffi::sqlite3_prepare_v2(
                db,
                c_sql.as_ptr(),
                c_sql.as_bytes().len() as c_int,
                &mut stmt,
                ptr::null_mut(),
            )
        };
        self.shared.check(rc)?;

        if stmt.is_null() {
            return Err(Error::sqlite(
                ffi::SQLITE_MISUSE,
                "SQL contains no statement",
            ));
        }

        // SAFETY: stmt is valid
        if options.readonly && unsafe { ffi::sqlite3_stmt_readonly(stmt) } == 0 {
            unsafe {
                ffi::sqlite3_finalize(stmt);
            }
            return Err(Error::sqlite(
                ffi::SQLITE_MISUSE,
                format!("statement is not read-only: {sql}"),
            ));
        }

        let int64 = options.int64.unwrap_or(self.options.int64);
        let id = self.shared.register_statement(stmt);
        Ok(Statement::new(Rc::clone(&self.shared), id, sql.to_string(), int64))
    }

    /// Execute SQL directly without preparing (DDL, transaction control).
    pub fn exec(&self, sql: &str) -> Result<()> {
        let db = self.shared.raw()?;
        let c_sql = CString::new(sql)
            .map_err(|_| Error::sqlite(ffi::SQLITE_MISUSE, "SQL contains a NUL byte"))?;

        let mut errmsg: *mut std::ffi::c_char = ptr::null_mut();
        // SAFETY: all pointers are valid
        let rc = unsafe { ffi::sqlite3_exec(db, c_sql.as_ptr(), None, ptr::null_mut(), &mut errmsg) };

        if rc != ffi::SQLITE_OK {
            let message = if errmsg.is_null() {
                ffi::error_string(rc).to_string()
            } else {
                // SAFETY: errmsg is a sqlite3_malloc'd string we must free
                unsafe {
                    let message = CStr::from_ptr(errmsg).to_string_lossy().into_owned();
                    ffi::sqlite3_free(errmsg.cast());
                    message
                }
            };
            // SAFETY: db is valid
            let code = unsafe { ffi::sqlite3_extended_errcode(db) };
            return Err(Error::sqlite(if code == 0 { rc } else { code }, message));
        }
        Ok(())
    }

    /// Rows changed by the most recent statement.
    pub fn changes(&self) -> Result<u64> {
        let db = self.shared.raw()?;
        // SAFETY: db is valid
        Ok(unsafe { ffi::sqlite3_changes(db) }.max(0) as u64)
    }

    /// Total rows changed since the connection opened.
    pub fn total_changes(&self) -> Result<u64> {
        let db = self.shared.raw()?;
        // SAFETY: db is valid
        Ok(unsafe { ffi::sqlite3_total_changes(db) }.max(0) as u64)
    }

    /// Rowid of the most recent successful INSERT.
    pub fn last_insert_rowid(&self) -> Result<i64> {
        let db = self.shared.raw()?;
        // SAFETY: db is valid
        Ok(unsafe { ffi::sqlite3_last_insert_rowid(db) })
    }

    /// Whether the connection is in autocommit mode.
    pub fn autocommit(&self) -> Result<bool> {
        let db = self.shared.raw()?;
        // SAFETY: db is valid
        Ok(unsafe { ffi::sqlite3_get_autocommit(db) } != 0)
    }

    /// Whether a transaction is open: true only while the connection is
    /// open and autocommit is off.
    pub fn in_transaction(&self) -> bool {
        match self.shared.raw() {
            // SAFETY: db is valid
            Ok(db) => (unsafe { ffi::sqlite3_get_autocommit(db) }) == 0,
            Err(_) => false,
        }
    }

    /// Load a runtime-loadable extension.
    ///
    /// Requires [`OpenOptions::enable_load_extension`].
    pub fn load_extension(&self, file: &str, entry: Option<&str>) -> Result<()> {
        if !self.options.enable_load_extension {
            return Err(Error::ExtensionsDisabled);
        }
        let db = self.shared.raw()?;
        let c_file = CString::new(file)
            .map_err(|_| Error::InvalidPath(file.to_string()))?;
        let c_entry = match entry {
            Some(entry) => Some(
                CString::new(entry).map_err(|_| Error::InvalidPath(entry.to_string()))?,
            ),
            None => None,
        };

        // SAFETY: db is valid
        let rc = unsafe { ffi::sqlite3_enable_load_extension(db, 1) };
        self.shared.check(rc)?;

        let mut errmsg: *mut std::ffi::c_char = ptr::null_mut();
        // SAFETY: all pointers are valid; entry may be null for the default
        let rc = unsafe {
            ffi::sqlite3_load_extension(
                db,
                c_file.as_ptr(),
                c_entry.as_ref().map_or(ptr::null(), |e| e.as_ptr()),
                &mut errmsg,
            )
        };

        // Close the door again regardless of the load outcome.
        // SAFETY: db is valid
        unsafe {
            ffi::sqlite3_enable_load_extension(db, 0);
        }

        if rc != ffi::SQLITE_OK {
            let message = if errmsg.is_null() {
                ffi::error_string(rc).to_string()
            } else {
                // SAFETY: errmsg is a sqlite3_malloc'd string we must free
                unsafe {
                    let message = CStr::from_ptr(errmsg).to_string_lossy().into_owned();
                    ffi::sqlite3_free(errmsg.cast());
                    message
                }
            };
            return Err(Error::sqlite(rc, message));
        }
        Ok(())
    }

    /// Copy the database named `name` (usually `"main"`) into `dest` using
    /// SQLite's online backup API, in a single step/finish cycle.
    ///
    /// `pages` limits the copy per step; `-1` copies everything.
    pub fn backup_to(&self, dest: &Database, name: &str, pages: i32) -> Result<()> {
        let src = self.shared.raw()?;
        let dst = dest.shared.raw()?;

        let c_src_name = CString::new(name)
            .map_err(|_| Error::InvalidPath(name.to_string()))?;

        // SAFETY: both handles are valid
        let backup = unsafe {
            ffi::sqlite3_backup_init(dst, c"main".as_ptr(), src, c_src_name.as_ptr())
        };
        if backup.is_null() {
            // Init failures are reported on the destination handle.
            return Err(dest.shared.last_error());
        }

        // SAFETY: backup is valid until backup_finish
        let step_rc = unsafe { ffi::sqlite3_backup_step(backup, pages as c_int) };
        let finish_rc = unsafe { ffi::sqlite3_backup_finish(backup) };

        if finish_rc != ffi::SQLITE_OK {
            return Err(dest.shared.error_for(finish_rc));
        }
        if step_rc != ffi::SQLITE_DONE && step_rc != ffi::SQLITE_OK {
            return Err(Error::sqlite(step_rc, ffi::error_string(step_rc)));
        }
        Ok(())
    }

    /// Subscribe to connect notifications.
    pub fn on_connect(&self, listener: impl Fn(&ConnectionEvent) + 'static) -> ListenerId {
        self.connect_events.subscribe(listener)
    }

    /// Subscribe to close notifications.
    pub fn on_close(&self, listener: impl Fn(&ConnectionEvent) + 'static) -> ListenerId {
        self.close_events.subscribe(listener)
    }

    /// Remove a connect listener.
    pub fn remove_connect_listener(&self, id: ListenerId) -> bool {
        self.connect_events.unsubscribe(id)
    }

    /// Remove a close listener.
    pub fn remove_close_listener(&self, id: ListenerId) -> bool {
        self.close_events.unsubscribe(id)
    }

    /// Number of live (not yet finalized) statements.
    pub fn statement_count(&self) -> usize {
        self.shared.statement_count()
    }

    /// Number of registered host functions.
    pub fn function_count(&self) -> usize {
        self.shared.function_count()
    }
}

impl Drop for Database {
    fn drop(&mut self) {
        if let Err(err) = self.close() {
            log_error!("error closing database on drop: {err}");
        }
    }
}

impl Queryable for Database {
    fn execute(&self, sql: &str, params: Params) -> Result<u64> {
        let stmt = self.prepare(sql)?;
        let out = stmt.run(params);
        let fin = stmt.finalize();
        let changes = out?;
        fin?;
        Ok(changes)
    }

    fn query(&self, sql: &str, params: Params) -> Result<Vec<Row>> {
        let stmt = self.prepare(sql)?;
        let out = stmt.all(params);
        let fin = stmt.finalize();
        let rows = out?;
        fin?;
        Ok(rows)
    }

    fn query_one(&self, sql: &str, params: Params) -> Result<Option<Row>> {
        let stmt = self.prepare(sql)?;
        let out = stmt.get(params);
        let fin = stmt.finalize();
        let row = out?;
        fin?;
        Ok(row)
    }

    fn query_array(&self, sql: &str, params: Params) -> Result<Vec<Vec<Value>>> {
        let stmt = self.prepare(sql)?;
        let out = stmt.all_arrays(params);
        let fin = stmt.finalize();
        let rows = out?;
        fin?;
        Ok(rows)
    }

    fn query_one_array(&self, sql: &str, params: Params) -> Result<Option<Vec<Value>>> {
        let stmt = self.prepare(sql)?;
        let out = stmt.get_array(params);
        let fin = stmt.finalize();
        let row = out?;
        fin?;
        Ok(row)
    }
}

impl sqlitekit_core::Preparable for Database {
    type Stmt = Statement;

    fn prepare(&self, sql: &str) -> Result<Statement> {
        Database::prepare(self, sql)
    }
}

/// Convert a connection path or URL into the string handed to SQLite.
fn resolve_path(path: &str) -> Result<String> {
    if path == ":memory:" {
        return Ok(path.to_string());
    }
    if let Some(rest) = path.strip_prefix("file:") {
        return file_url_to_path(rest, path);
    }
    Ok(path.to_string())
}

/// Convert the remainder of a `file:` URL into a local filesystem path.
fn file_url_to_path(rest: &str, original: &str) -> Result<String> {
    // Query and fragment have no filesystem meaning here.
    let rest = rest.split(['?', '#']).next().unwrap_or(rest);

    let path_part = if let Some(after) = rest.strip_prefix("//") {
        let Some(slash) = after.find('/') else {
            return Err(Error::InvalidPath(original.to_string()));
        };
        let (host, path) = after.split_at(slash);
        if !host.is_empty() && host != "localhost" {
            return Err(Error::InvalidPath(original.to_string()));
        }
        path
    } else {
        rest
    };

    if path_part.is_empty() {
        return Err(Error::InvalidPath(original.to_string()));
    }

    percent_decode(path_part).ok_or_else(|| Error::InvalidPath(original.to_string()))
}

fn percent_decode(s: &str) -> Option<String> {
    let bytes = s.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let hex = s.get(i + 1..i + 3)?;
            out.push(u8::from_str_radix(hex, 16).ok()?);
            i += 3;
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }
    String::from_utf8(out).ok()
}
