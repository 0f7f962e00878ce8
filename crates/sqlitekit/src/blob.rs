//! Incremental BLOB I/O.
//!
//! A [`Blob`] reads and writes byte ranges of one BLOB cell without
//! materializing the whole value. The handle's length is fixed at open;
//! growing a blob requires an UPDATE through SQL.

use crate::database::{Database, DbHandle};
use crate::ffi;
use serde::{Deserialize, Serialize};
use sqlitekit_core::{Error, Result, log_error};
use std::ffi::{CString, c_int};
use std::rc::Rc;

/// Coordinates of the BLOB cell to open.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlobOptions {
    /// Attached database name, usually `"main"`.
    pub database: String,
    /// Table holding the blob column.
    pub table: String,
    /// Column name.
    pub column: String,
    /// Rowid of the target row.
    pub row_id: i64,
    /// Open for reading only.
    pub readonly: bool,
}

impl BlobOptions {
    /// Target `table.column` at `row_id` in the `main` database.
    pub fn new(table: impl Into<String>, column: impl Into<String>, row_id: i64) -> Self {
        Self {
            database: "main".to_string(),
            table: table.into(),
            column: column.into(),
            row_id,
            readonly: false,
        }
    }

    /// Select an attached database other than `main`.
    #[must_use]
    pub fn database(mut self, database: impl Into<String>) -> Self {
        self.database = database.into();
        self
    }

    /// Open read-only.
    #[must_use]
    pub fn readonly(mut self, readonly: bool) -> Self {
        self.readonly = readonly;
        self
    }
}

/// An open incremental blob handle.
///
/// Closing is mandatory and idempotent; I/O after close fails with
/// `BlobClosed`. The handle is registered with its database, which closes
/// it during connection teardown.
pub struct Blob {
    db: Rc<DbHandle>,
    id: u64,
    len: usize,
}

impl Blob {
    pub(crate) fn open(db: &Database, options: &BlobOptions) -> Result<Self> {
        let handle = db.shared.raw()?;

        let c_db = CString::new(options.database.as_str())
            .map_err(|_| Error::InvalidPath(options.database.clone()))?;
        let c_table = CString::new(options.table.as_str())
            .map_err(|_| Error::InvalidPath(options.table.clone()))?;
        let c_column = CString::new(options.column.as_str())
            .map_err(|_| Error::InvalidPath(options.column.clone()))?;

        let mut blob: *mut ffi::sqlite3_blob = std::ptr::null_mut();
        // SAFETY: all pointers are valid; flags selects read or read/write
        let rc = unsafe {
            ffi::sqlite3_blob_open(
                handle,
                c_db.as_ptr(),
                c_table.as_ptr(),
                c_column.as_ptr(),
                options.row_id,
                c_int::from(!options.readonly),
                &mut blob,
            )
        };
        db.shared.check(rc)?;

        // SAFETY: blob is valid after a successful open
        let len = unsafe { ffi::sqlite3_blob_bytes(blob) }.max(0) as usize;
        let id = db.shared.register_blob(blob);

        Ok(Self {
            db: Rc::clone(&db.shared),
            id,
            len,
        })
    }

    /// Length in bytes, fixed at open.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the blob is zero-length.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    fn raw(&self) -> Result<*mut ffi::sqlite3_blob> {
        self.db.blob_ptr(self.id).ok_or(Error::BlobClosed)
    }

    /// Fill `buf` from the blob starting at `offset`.
    pub fn read_at(&self, buf: &mut [u8], offset: usize) -> Result<()> {
        let blob = self.raw()?;
        self.check_range(buf.len(), offset)?;
        // SAFETY: blob is live and the range was checked against its length
        let rc = unsafe {
            ffi::sqlite3_blob_read(
                blob,
                buf.as_mut_ptr().cast(),
                buf.len() as c_int,
                offset as c_int,
            )
        };
        self.db.check(rc)
    }

    /// Write `data` into the blob starting at `offset`.
    ///
    /// Fails with `SQLITE_READONLY` when opened read-only.
    pub fn write_at(&self, data: &[u8], offset: usize) -> Result<()> {
        let blob = self.raw()?;
        self.check_range(data.len(), offset)?;
        // SAFETY: blob is live and the range was checked against its length
        let rc = unsafe {
            ffi::sqlite3_blob_write(
                blob,
                data.as_ptr().cast(),
                data.len() as c_int,
                offset as c_int,
            )
        };
        self.db.check(rc)
    }

    /// Read the entire blob.
    pub fn read_all(&self) -> Result<Vec<u8>> {
        let mut buf = vec![0u8; self.len];
        self.read_at(&mut buf, 0)?;
        Ok(buf)
    }

    /// Close the handle. Idempotent; afterwards every read or write fails
    /// with `BlobClosed`.
    pub fn close(&self) -> Result<()> {
        let Some(blob) = self.db.remove_blob(self.id) else {
            return Ok(());
        };
        // SAFETY: the registry entry was live
        let rc = unsafe { ffi::sqlite3_blob_close(blob) };
        self.db.check(rc)
    }

    fn check_range(&self, len: usize, offset: usize) -> Result<()> {
        if offset.checked_add(len).is_none_or(|end| end > self.len) {
            return Err(Error::sqlite(
                ffi::SQLITE_ERROR,
                format!(
                    "range {}..{} exceeds blob length {}",
                    offset,
                    offset.saturating_add(len),
                    self.len
                ),
            ));
        }
        Ok(())
    }
}

impl Drop for Blob {
    fn drop(&mut self) {
        if let Err(err) = self.close() {
            log_error!("error closing blob on drop: {err}");
        }
    }
}

impl Database {
    /// Open an incremental blob handle on one BLOB cell.
    pub fn open_blob(&self, options: &BlobOptions) -> Result<Blob> {
        Blob::open(self, options)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::OpenOptions;

    fn blob_db() -> Database {
        let db = Database::open(":memory:", OpenOptions::default()).unwrap();
        db.exec("CREATE TABLE files (id INTEGER PRIMARY KEY, data BLOB)")
            .unwrap();
        db.exec("INSERT INTO files (data) VALUES (zeroblob(8))").unwrap();
        db
    }

    #[test]
    fn write_then_read_ranges() {
        let db = blob_db();
        let blob = db.open_blob(&BlobOptions::new("files", "data", 1)).unwrap();
        assert_eq!(blob.len(), 8);

        blob.write_at(&[1, 2, 3, 4], 0).unwrap();
        blob.write_at(&[9, 9], 6).unwrap();

        let mut buf = [0u8; 4];
        blob.read_at(&mut buf, 0).unwrap();
        assert_eq!(buf, [1, 2, 3, 4]);

        assert_eq!(blob.read_all().unwrap(), vec![1, 2, 3, 4, 0, 0, 9, 9]);
    }

    #[test]
    fn out_of_range_is_rejected() {
        let db = blob_db();
        let blob = db.open_blob(&BlobOptions::new("files", "data", 1)).unwrap();

        let mut buf = [0u8; 4];
        assert!(blob.read_at(&mut buf, 6).is_err());
        assert!(blob.write_at(&[1], 8).is_err());
        // Length stays fixed at open.
        assert_eq!(blob.len(), 8);
    }

    #[test]
    fn readonly_blob_rejects_writes() {
        let db = blob_db();
        let blob = db
            .open_blob(&BlobOptions::new("files", "data", 1).readonly(true))
            .unwrap();

        let mut buf = [0u8; 8];
        blob.read_at(&mut buf, 0).unwrap();
        assert!(blob.write_at(&[1], 0).is_err());
    }

    #[test]
    fn close_is_mandatory_and_idempotent() {
        let db = blob_db();
        let blob = db.open_blob(&BlobOptions::new("files", "data", 1)).unwrap();

        blob.close().unwrap();
        blob.close().unwrap();

        let mut buf = [0u8; 1];
        assert!(matches!(blob.read_at(&mut buf, 0), Err(Error::BlobClosed)));
        assert!(matches!(blob.write_at(&[1], 0), Err(Error::BlobClosed)));
    }

    #[test]
    fn missing_row_fails_to_open() {
        let db = blob_db();
        assert!(db.open_blob(&BlobOptions::new("files", "data", 99)).is_err());
    }
}
