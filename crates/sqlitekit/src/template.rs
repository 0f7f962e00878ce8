//! Parameterised query templates.
//!
//! [`Template`] is the injection-safe shortcut behind the client's
//! template queries: literal SQL fragments are joined with `?` placeholders
//! and the interpolated values travel as positional parameters, never as
//! SQL text.

use sqlitekit_core::{Params, Value};

/// A SQL text built from literal fragments and interpolated values.
#[derive(Debug, Clone, Default)]
pub struct Template {
    sql: String,
    params: Vec<Value>,
}

impl Template {
    /// Start a template with a literal fragment.
    pub fn new(fragment: impl Into<String>) -> Self {
        Self {
            sql: fragment.into(),
            params: Vec::new(),
        }
    }

    /// Append a literal SQL fragment.
    #[must_use]
    pub fn text(mut self, fragment: &str) -> Self {
        self.sql.push_str(fragment);
        self
    }

    /// Append a `?` placeholder and carry `value` as its parameter.
    #[must_use]
    pub fn value(mut self, value: impl Into<Value>) -> Self {
        self.sql.push('?');
        self.params.push(value.into());
        self
    }

    /// The assembled SQL text.
    pub fn sql(&self) -> &str {
        &self.sql
    }

    /// The interpolated values, in placeholder order.
    pub fn params(&self) -> &[Value] {
        &self.params
    }

    /// Split into SQL text and positional parameters.
    pub fn into_parts(self) -> (String, Params) {
        (self.sql, Params::Positional(self.params))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn joins_fragments_with_placeholders() {
        let t = Template::new("SELECT ")
            .value(1)
            .text(" a, ")
            .value(3.5)
            .text(" b");

        assert_eq!(t.sql(), "SELECT ? a, ? b");
        assert_eq!(t.params(), &[Value::Int(1), Value::Real(3.5)]);
    }

    #[test]
    fn interpolated_text_is_a_parameter_not_sql() {
        let t = Template::new("SELECT ").value("1; DROP TABLE users");

        assert_eq!(t.sql(), "SELECT ?");
        assert_eq!(
            t.params(),
            &[Value::Text("1; DROP TABLE users".to_string())]
        );
    }

    #[test]
    fn into_parts() {
        let (sql, params) = Template::new("SELECT ").value(7).into_parts();
        assert_eq!(sql, "SELECT ?");
        assert_eq!(params, Params::Positional(vec![Value::Int(7)]));
    }
}
