//! Value encoding and decoding between Rust and SQLite.
//!
//! SQLite has a simple type system with 5 storage classes:
//! - INTEGER: Signed integer (1, 2, 3, 4, 6, or 8 bytes)
//! - REAL: 8-byte IEEE floating point
//! - TEXT: UTF-8 or UTF-16 string
//! - BLOB: Binary data
//! - NULL: The NULL value
//!
//! We map these to/from sqlitekit-core's `Value` type, for parameter
//! binding, column extraction, function arguments and function results.
//! All four directions apply the same safe-integer policy: without the
//! `int64` option an integer must fit in the exactly-representable double
//! range, and an INTEGER column outside that range is surfaced as a REAL
//! with documented precision loss.

use crate::ffi;
use sqlitekit_core::{Error, Result, Value};
use std::ffi::{CStr, CString, c_int};

/// Bind a Value to a prepared statement parameter.
///
/// Returns the raw result code; the caller converts non-OK codes using the
/// owning connection so the error carries `errmsg`. Binding an integer
/// outside the safe range without `int64` fails before touching SQLite.
///
/// # Safety
/// - `stmt` must be a valid, non-null prepared statement handle
/// - `index` must be a valid 1-based parameter index
pub unsafe fn bind_value(
    stmt: *mut ffi::sqlite3_stmt,
    index: c_int,
    value: &Value,
    int64: bool,
) -> Result<c_int> {
    let rc = unsafe {
        match value {
            Value::Null => ffi::sqlite3_bind_null(stmt, index),

            Value::Bool(b) => ffi::sqlite3_bind_int(stmt, index, c_int::from(*b)),

            Value::Int(v) => {
                if !int64 && !Value::is_safe_integer(*v) {
                    return Err(Error::IntegerOutOfRange(*v));
                }
                ffi::sqlite3_bind_int64(stmt, index, *v)
            }

            Value::Real(v) => ffi::sqlite3_bind_double(stmt, index, *v),

            Value::Text(s) => {
                let bytes = s.as_bytes();
                ffi::sqlite3_bind_text(
                    stmt,
                    index,
                    bytes.as_ptr().cast(),
                    bytes.len() as c_int,
                    ffi::SQLITE_TRANSIENT,
                )
            }

            Value::Blob(b) => {
                if b.is_empty() {
                    // A null data pointer would bind NULL; force an empty blob.
                    ffi::sqlite3_bind_zeroblob(stmt, index, 0)
                } else {
                    ffi::sqlite3_bind_blob(
                        stmt,
                        index,
                        b.as_ptr().cast(),
                        b.len() as c_int,
                        ffi::SQLITE_TRANSIENT,
                    )
                }
            }
        }
    };

    Ok(rc)
}

/// Read a column value from a result row.
///
/// # Safety
/// - `stmt` must be a valid prepared statement that has just returned SQLITE_ROW
/// - `index` must be a valid 0-based column index
#[allow(clippy::cast_precision_loss)]
pub unsafe fn read_column(stmt: *mut ffi::sqlite3_stmt, index: c_int, int64: bool) -> Value {
    unsafe {
        let col_type = ffi::sqlite3_column_type(stmt, index);

        match col_type {
            ffi::SQLITE_NULL => Value::Null,

            ffi::SQLITE_INTEGER => {
                let v = ffi::sqlite3_column_int64(stmt, index);
                if int64 || Value::is_safe_integer(v) {
                    Value::Int(v)
                } else {
                    // Lossy by contract: the caller declined int64 mode.
                    Value::Real(v as f64)
                }
            }

            ffi::SQLITE_FLOAT => Value::Real(ffi::sqlite3_column_double(stmt, index)),

            ffi::SQLITE_TEXT => {
                let ptr = ffi::sqlite3_column_text(stmt, index);
                let len = ffi::sqlite3_column_bytes(stmt, index);
                if ptr.is_null() {
                    Value::Null
                } else {
                    let slice = std::slice::from_raw_parts(ptr.cast::<u8>(), len as usize);
                    Value::Text(String::from_utf8_lossy(slice).into_owned())
                }
            }

            ffi::SQLITE_BLOB => {
                let ptr = ffi::sqlite3_column_blob(stmt, index);
                let len = ffi::sqlite3_column_bytes(stmt, index);
                if ptr.is_null() || len == 0 {
                    Value::Blob(Vec::new())
                } else {
                    let slice = std::slice::from_raw_parts(ptr.cast::<u8>(), len as usize);
                    Value::Blob(slice.to_vec())
                }
            }

            _ => Value::Null,
        }
    }
}

/// Read a user-defined function argument.
///
/// Mirrors [`read_column`] over the `sqlite3_value_*` accessors.
///
/// # Safety
/// - `value` must be a valid protected value handle from a function callback
#[allow(clippy::cast_precision_loss)]
pub unsafe fn read_value(value: *mut ffi::sqlite3_value, int64: bool) -> Value {
    unsafe {
        match ffi::sqlite3_value_type(value) {
            ffi::SQLITE_NULL => Value::Null,

            ffi::SQLITE_INTEGER => {
                let v = ffi::sqlite3_value_int64(value);
                if int64 || Value::is_safe_integer(v) {
                    Value::Int(v)
                } else {
                    Value::Real(v as f64)
                }
            }

            ffi::SQLITE_FLOAT => Value::Real(ffi::sqlite3_value_double(value)),

            ffi::SQLITE_TEXT => {
                let ptr = ffi::sqlite3_value_text(value);
                let len = ffi::sqlite3_value_bytes(value);
                if ptr.is_null() {
                    Value::Null
                } else {
                    let slice = std::slice::from_raw_parts(ptr.cast::<u8>(), len as usize);
                    Value::Text(String::from_utf8_lossy(slice).into_owned())
                }
            }

            ffi::SQLITE_BLOB => {
                let ptr = ffi::sqlite3_value_blob(value);
                let len = ffi::sqlite3_value_bytes(value);
                if ptr.is_null() || len == 0 {
                    Value::Blob(Vec::new())
                } else {
                    let slice = std::slice::from_raw_parts(ptr.cast::<u8>(), len as usize);
                    Value::Blob(slice.to_vec())
                }
            }

            _ => Value::Null,
        }
    }
}

/// Write a user-defined function result.
///
/// # Safety
/// - `ctx` must be the context handle of the currently-running callback
pub unsafe fn set_result(ctx: *mut ffi::sqlite3_context, value: &Value) {
    unsafe {
        match value {
            Value::Null => ffi::sqlite3_result_null(ctx),
            Value::Bool(b) => ffi::sqlite3_result_int64(ctx, i64::from(*b)),
            Value::Int(v) => ffi::sqlite3_result_int64(ctx, *v),
            Value::Real(v) => ffi::sqlite3_result_double(ctx, *v),
            Value::Text(s) => {
                let bytes = s.as_bytes();
                ffi::sqlite3_result_text(
                    ctx,
                    bytes.as_ptr().cast(),
                    bytes.len() as c_int,
                    ffi::SQLITE_TRANSIENT,
                );
            }
            Value::Blob(b) => {
                ffi::sqlite3_result_blob(
                    ctx,
                    b.as_ptr().cast(),
                    b.len() as c_int,
                    ffi::SQLITE_TRANSIENT,
                );
            }
        }
    }
}

/// Report a host-side error to the SQL evaluator.
///
/// # Safety
/// - `ctx` must be the context handle of the currently-running callback
pub unsafe fn set_result_error(ctx: *mut ffi::sqlite3_context, message: &str) {
    let bytes = message.as_bytes();
    unsafe {
        ffi::sqlite3_result_error(ctx, bytes.as_ptr().cast(), bytes.len() as c_int);
    }
}

/// Get the column name from a result.
///
/// # Safety
/// - `stmt` must be a valid prepared statement
/// - `index` must be a valid 0-based column index
pub unsafe fn column_name(stmt: *mut ffi::sqlite3_stmt, index: c_int) -> Option<String> {
    unsafe {
        let ptr = ffi::sqlite3_column_name(stmt, index);
        if ptr.is_null() {
            None
        } else {
            CStr::from_ptr(ptr).to_str().ok().map(String::from)
        }
    }
}

/// Resolve a named parameter to its 1-based slot index.
///
/// The name is tried verbatim first (covering callers that pass the
/// placeholder spelling, `?NNN` included), then with each of the `:`,
/// `@` and `$` prefixes.
///
/// # Safety
/// - `stmt` must be a valid prepared statement
pub unsafe fn parameter_index(stmt: *mut ffi::sqlite3_stmt, name: &str) -> Option<c_int> {
    for candidate in [
        name.to_string(),
        format!(":{name}"),
        format!("@{name}"),
        format!("${name}"),
    ] {
        let Ok(c_name) = CString::new(candidate) else {
            continue;
        };
        let index = unsafe { ffi::sqlite3_bind_parameter_index(stmt, c_name.as_ptr()) };
        if index > 0 {
            return Some(index);
        }
    }
    None
}
