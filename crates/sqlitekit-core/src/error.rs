//! Error types for sqlitekit operations.

use std::fmt;

/// The primary error type for all sqlitekit operations.
#[derive(Debug)]
pub enum Error {
    /// An error reported by the SQLite library, carrying the extended
    /// result code and the `errmsg` text read from the connection.
    Sqlite(SqliteError),
    /// Type conversion error while extracting a column value.
    Type(TypeError),
    /// A transaction was used after it was committed or rolled back.
    TransactionInactive,
    /// An integer outside the safe double range was bound without the
    /// `int64` option enabled.
    IntegerOutOfRange(i64),
    /// More positional parameters were supplied than the statement has.
    TooManyParameters {
        /// Placeholder count of the statement.
        expected: usize,
        /// Values actually supplied.
        given: usize,
    },
    /// Two supplied named parameters resolved to the same placeholder.
    DuplicateParameter(String),
    /// A supplied named parameter matched no placeholder.
    UnknownParameter(String),
    /// The statement is being traversed by a live row iterator.
    StatementBusy,
    /// The statement handle has already been finalized.
    StatementFinalized,
    /// The blob handle has been closed.
    BlobClosed,
    /// The database connection is not open.
    ConnectionClosed,
    /// The connection path or URL could not be interpreted.
    InvalidPath(String),
    /// `load_extension` was called without `enable_load_extension`.
    ExtensionsDisabled,
}

/// An error with an SQLite result code attached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SqliteError {
    /// Extended result code as reported by SQLite.
    pub code: i32,
    /// Error message text.
    pub message: String,
}

/// Broad classification of an [`SqliteError`], derived from the primary
/// result code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// SQLITE_BUSY: a lock could not be obtained within the busy timeout.
    Busy,
    /// SQLITE_LOCKED: a table-level lock conflict within the connection.
    Locked,
    /// SQLITE_CONSTRAINT: a constraint violation.
    Constraint,
    /// SQLITE_MISUSE: the library was used incorrectly.
    Misuse,
    /// SQLITE_IOERR: an I/O error in the VFS layer.
    Io,
    /// SQLITE_CANTOPEN: the database file could not be opened (code 14,
    /// notably from opening a missing file without `create`).
    NotFound,
    /// Any other result code.
    Other,
}

impl SqliteError {
    /// Create an error from a result code and message.
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// The primary result code (low byte of the extended code).
    #[must_use]
    pub const fn primary_code(&self) -> i32 {
        self.code & 0xff
    }

    /// Classify this error by its primary result code.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self.primary_code() {
            5 => ErrorKind::Busy,
            6 => ErrorKind::Locked,
            10 => ErrorKind::Io,
            14 => ErrorKind::NotFound,
            19 => ErrorKind::Constraint,
            21 => ErrorKind::Misuse,
            _ => ErrorKind::Other,
        }
    }
}

impl Error {
    /// Shorthand for a [`SqliteError`]-carrying variant.
    pub fn sqlite(code: i32, message: impl Into<String>) -> Self {
        Error::Sqlite(SqliteError::new(code, message))
    }

    /// The SQLite extended result code, if this error carries one.
    #[must_use]
    pub fn code(&self) -> Option<i32> {
        match self {
            Error::Sqlite(e) => Some(e.code),
            _ => None,
        }
    }

    /// Classification of the underlying SQLite error, if any.
    #[must_use]
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            Error::Sqlite(e) => Some(e.kind()),
            _ => None,
        }
    }

    /// Is this a lock contention error (`SQLITE_BUSY` or `SQLITE_LOCKED`)?
    #[must_use]
    pub fn is_busy(&self) -> bool {
        matches!(self.kind(), Some(ErrorKind::Busy | ErrorKind::Locked))
    }

    /// Is this a constraint violation?
    #[must_use]
    pub fn is_constraint(&self) -> bool {
        matches!(self.kind(), Some(ErrorKind::Constraint))
    }
}

/// Type conversion error while reading a column value.
#[derive(Debug)]
pub struct TypeError {
    /// The Rust type that was requested.
    pub expected: &'static str,
    /// Description of the value actually present.
    pub actual: String,
    /// Column name, when known.
    pub column: Option<String>,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Sqlite(e) => write!(f, "{}", e),
            Error::Type(e) => write!(f, "{}", e),
            Error::TransactionInactive => write!(f, "transaction is not active"),
            Error::IntegerOutOfRange(v) => write!(
                f,
                "integer {} is outside the safe range; enable the int64 option",
                v
            ),
            Error::TooManyParameters { expected, given } => write!(
                f,
                "statement has {} parameter(s) but {} were supplied",
                expected, given
            ),
            Error::DuplicateParameter(name) => {
                write!(f, "parameter '{}' resolves to an already-bound slot", name)
            }
            Error::UnknownParameter(name) => {
                write!(f, "statement has no parameter named '{}'", name)
            }
            Error::StatementBusy => write!(f, "statement is busy with a row iteration"),
            Error::StatementFinalized => write!(f, "statement has been finalized"),
            Error::BlobClosed => write!(f, "blob handle has been closed"),
            Error::ConnectionClosed => write!(f, "database connection is closed"),
            Error::InvalidPath(path) => write!(f, "invalid database path: {}", path),
            Error::ExtensionsDisabled => {
                write!(f, "extension loading is disabled for this connection")
            }
        }
    }
}

impl fmt::Display for SqliteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (code {})", self.message, self.code)
    }
}

impl fmt::Display for TypeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(col) = &self.column {
            write!(
                f,
                "expected {} for column '{}', found {}",
                self.expected, col, self.actual
            )
        } else {
            write!(f, "expected {}, found {}", self.expected, self.actual)
        }
    }
}

impl std::error::Error for Error {}

impl From<SqliteError> for Error {
    fn from(err: SqliteError) -> Self {
        Error::Sqlite(err)
    }
}

impl From<TypeError> for Error {
    fn from(err: TypeError) -> Self {
        Error::Type(err)
    }
}

/// Result type alias for sqlitekit operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_from_primary_code() {
        assert_eq!(SqliteError::new(5, "busy").kind(), ErrorKind::Busy);
        assert_eq!(SqliteError::new(6, "locked").kind(), ErrorKind::Locked);
        assert_eq!(SqliteError::new(14, "cantopen").kind(), ErrorKind::NotFound);
        assert_eq!(SqliteError::new(19, "constraint").kind(), ErrorKind::Constraint);
        assert_eq!(SqliteError::new(21, "misuse").kind(), ErrorKind::Misuse);
        assert_eq!(SqliteError::new(1, "generic").kind(), ErrorKind::Other);
    }

    #[test]
    fn extended_codes_classify_by_low_byte() {
        // SQLITE_CONSTRAINT_UNIQUE = 19 | (8 << 8)
        let err = SqliteError::new(19 | (8 << 8), "unique violation");
        assert_eq!(err.primary_code(), 19);
        assert_eq!(err.kind(), ErrorKind::Constraint);

        let err = Error::Sqlite(err);
        assert!(err.is_constraint());
        assert!(!err.is_busy());
    }

    #[test]
    fn code_accessor() {
        assert_eq!(Error::sqlite(14, "no file").code(), Some(14));
        assert_eq!(Error::BlobClosed.code(), None);
    }

    #[test]
    fn display_messages() {
        let msg = Error::TooManyParameters {
            expected: 2,
            given: 3,
        }
        .to_string();
        assert!(msg.contains("2 parameter"));
        assert!(msg.contains('3'));

        let msg = Error::IntegerOutOfRange(1 << 60).to_string();
        assert!(msg.contains("int64"));
    }
}
