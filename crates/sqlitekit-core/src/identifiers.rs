//! SQL identifier quoting.

/// Quote a SQL identifier using ANSI double-quoting.
///
/// Embedded double-quotes are escaped by doubling them (`"` → `""`).
/// This function is safe against SQL injection for any input string and is
/// used for savepoint names, which cannot be carried as bind parameters.
///
/// # Examples
///
/// ```
/// use sqlitekit_core::quote_ident;
///
/// assert_eq!(quote_ident("users"), "\"users\"");
/// assert_eq!(quote_ident("sp\"1"), "\"sp\"\"1\"");
/// assert_eq!(quote_ident("rollback"), "\"rollback\""); // SQL keyword
/// ```
#[inline]
#[must_use]
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_names() {
        assert_eq!(quote_ident("sp1"), "\"sp1\"");
    }

    #[test]
    fn embedded_quotes_doubled() {
        assert_eq!(quote_ident("a\"b"), "\"a\"\"b\"");
        assert_eq!(quote_ident("\""), "\"\"\"\"");
    }

    #[test]
    fn hostile_input_stays_inert() {
        let quoted = quote_ident("x\"; DROP TABLE t; --");
        assert_eq!(quoted, "\"x\"\"; DROP TABLE t; --\"");
    }
}
