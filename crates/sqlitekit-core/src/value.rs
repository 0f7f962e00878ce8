//! Dynamic SQLite values.

use serde::{Deserialize, Serialize};

/// Largest integer magnitude that survives a round-trip through an
/// IEEE-754 double without loss (2^53 - 1).
pub const MAX_SAFE_INTEGER: i64 = (1 << 53) - 1;

/// Smallest integer magnitude that survives a round-trip through an
/// IEEE-754 double without loss.
pub const MIN_SAFE_INTEGER: i64 = -MAX_SAFE_INTEGER;

/// A dynamically-typed SQLite value.
///
/// This enum is the closed set of host values accepted as bind parameters
/// and produced as column cells. Booleans are stored as INTEGER 0/1 and
/// read back as [`Value::Int`]; everything else maps directly onto one of
/// SQLite's five storage classes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    /// NULL value
    Null,

    /// Boolean value, bound as INTEGER 0/1
    Bool(bool),

    /// 64-bit signed integer
    Int(i64),

    /// 64-bit floating point
    Real(f64),

    /// UTF-8 text
    Text(String),

    /// Binary data
    Blob(Vec<u8>),
}

impl Value {
    /// Check if this value is NULL.
    pub const fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Get the SQLite storage class name of this value.
    pub const fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "NULL",
            Value::Bool(_) => "BOOLEAN",
            Value::Int(_) => "INTEGER",
            Value::Real(_) => "REAL",
            Value::Text(_) => "TEXT",
            Value::Blob(_) => "BLOB",
        }
    }

    /// Whether an [`Value::Int`] payload is exactly representable as a double.
    pub const fn is_safe_integer(v: i64) -> bool {
        v >= MIN_SAFE_INTEGER && v <= MAX_SAFE_INTEGER
    }

    /// Try to convert this value to a bool.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(v) => Some(*v),
            Value::Int(v) => Some(*v != 0),
            _ => None,
        }
    }

    /// Try to convert this value to an i64.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(v) => Some(*v),
            Value::Bool(v) => Some(i64::from(*v)),
            _ => None,
        }
    }

    /// Try to convert this value to an f64.
    #[allow(clippy::cast_precision_loss)]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Real(v) => Some(*v),
            Value::Int(v) => Some(*v as f64),
            _ => None,
        }
    }

    /// Try to get this value as a string reference.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Try to get this value as a byte slice.
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::Blob(b) => Some(b),
            Value::Text(s) => Some(s.as_bytes()),
            _ => None,
        }
    }
}

// Conversion implementations
impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i8> for Value {
    fn from(v: i8) -> Self {
        Value::Int(i64::from(v))
    }
}

impl From<i16> for Value {
    fn from(v: i16) -> Self {
        Value::Int(i64::from(v))
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(i64::from(v))
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<u8> for Value {
    fn from(v: u8) -> Self {
        Value::Int(i64::from(v))
    }
}

impl From<u16> for Value {
    fn from(v: u16) -> Self {
        Value::Int(i64::from(v))
    }
}

impl From<u32> for Value {
    fn from(v: u32) -> Self {
        Value::Int(i64::from(v))
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Value::Real(f64::from(v))
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Real(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Value::Blob(v)
    }
}

impl From<&[u8]> for Value {
    fn from(v: &[u8]) -> Self {
        Value::Blob(v.to_vec())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        match v {
            Some(v) => v.into(),
            None => Value::Null,
        }
    }
}

// TryFrom implementations for extracting values

use crate::error::{Error, TypeError};

impl TryFrom<Value> for bool {
    type Error = Error;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Bool(v) => Ok(v),
            Value::Int(v) => Ok(v != 0),
            other => Err(Error::Type(TypeError {
                expected: "bool",
                actual: other.type_name().to_string(),
                column: None,
            })),
        }
    }
}

impl TryFrom<Value> for i64 {
    type Error = Error;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Int(v) => Ok(v),
            Value::Bool(v) => Ok(i64::from(v)),
            other => Err(Error::Type(TypeError {
                expected: "i64",
                actual: other.type_name().to_string(),
                column: None,
            })),
        }
    }
}

impl TryFrom<Value> for f64 {
    type Error = Error;

    #[allow(clippy::cast_precision_loss)]
    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Real(v) => Ok(v),
            Value::Int(v) => Ok(v as f64),
            other => Err(Error::Type(TypeError {
                expected: "f64",
                actual: other.type_name().to_string(),
                column: None,
            })),
        }
    }
}

impl TryFrom<Value> for String {
    type Error = Error;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Text(v) => Ok(v),
            other => Err(Error::Type(TypeError {
                expected: "String",
                actual: other.type_name().to_string(),
                column: None,
            })),
        }
    }
}

impl TryFrom<Value> for Vec<u8> {
    type Error = Error;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Blob(v) => Ok(v),
            Value::Text(v) => Ok(v.into_bytes()),
            other => Err(Error::Type(TypeError {
                expected: "Vec<u8>",
                actual: other.type_name().to_string(),
                column: None,
            })),
        }
    }
}

/// TryFrom for `Option<T>` - returns None for Null, tries to convert otherwise
impl<T> TryFrom<Value> for Option<T>
where
    T: TryFrom<Value, Error = Error>,
{
    type Error = Error;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Null => Ok(None),
            v => T::try_from(v).map(Some),
        }
    }
}

/// Parameters for a statement execution.
///
/// `None` reuses whatever bindings the statement already carries.
/// Positional values fill slots `?1..?N` in order; supplying fewer values
/// than the statement has placeholders leaves the trailing slots NULL, and
/// supplying more is an error. Named pairs are resolved against `:name`,
/// `@name` and `$name` placeholders.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Params {
    /// Keep the statement's existing bindings.
    #[default]
    None,
    /// Positional values, bound to slots 1..=N.
    Positional(Vec<Value>),
    /// Name/value pairs, resolved by placeholder lookup.
    Named(Vec<(String, Value)>),
}

impl From<()> for Params {
    fn from((): ()) -> Self {
        Params::None
    }
}

impl From<Vec<Value>> for Params {
    fn from(v: Vec<Value>) -> Self {
        Params::Positional(v)
    }
}

impl From<&[Value]> for Params {
    fn from(v: &[Value]) -> Self {
        Params::Positional(v.to_vec())
    }
}

impl<const N: usize> From<[Value; N]> for Params {
    fn from(v: [Value; N]) -> Self {
        Params::Positional(v.into())
    }
}

impl From<Vec<(String, Value)>> for Params {
    fn from(v: Vec<(String, Value)>) -> Self {
        Params::Named(v)
    }
}

impl From<&[(&str, Value)]> for Params {
    fn from(v: &[(&str, Value)]) -> Self {
        Params::Named(v.iter().map(|(n, v)| ((*n).to_string(), v.clone())).collect())
    }
}

impl<const N: usize> From<[(&str, Value); N]> for Params {
    fn from(v: [(&str, Value); N]) -> Self {
        Params::Named(v.into_iter().map(|(n, v)| (n.to_string(), v)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_bool() {
        let v: Value = true.into();
        assert_eq!(v, Value::Bool(true));
    }

    #[test]
    fn from_integers() {
        assert_eq!(Value::from(42i8), Value::Int(42));
        assert_eq!(Value::from(42i16), Value::Int(42));
        assert_eq!(Value::from(42i32), Value::Int(42));
        assert_eq!(Value::from(42i64), Value::Int(42));
        assert_eq!(Value::from(42u32), Value::Int(42));
    }

    #[test]
    fn from_floats() {
        let pi = std::f64::consts::PI;
        assert_eq!(Value::from(pi), Value::Real(pi));
    }

    #[test]
    fn from_strings_and_bytes() {
        assert_eq!(Value::from("hello"), Value::Text("hello".to_string()));
        let bytes = vec![1u8, 2, 3];
        assert_eq!(Value::from(bytes.clone()), Value::Blob(bytes.clone()));
        assert_eq!(Value::from(bytes.as_slice()), Value::Blob(bytes));
    }

    #[test]
    fn from_option() {
        let some: Value = Some(42i64).into();
        assert_eq!(some, Value::Int(42));

        let none: Value = Option::<i64>::None.into();
        assert_eq!(none, Value::Null);
    }

    #[test]
    fn try_from_round_trips() {
        let original: i64 = i64::MAX;
        let value: Value = original.into();
        let recovered: i64 = value.try_into().unwrap();
        assert_eq!(original, recovered);

        let original = "hello world".to_string();
        let value: Value = original.clone().into();
        let recovered: String = value.try_into().unwrap();
        assert_eq!(original, recovered);

        let original = vec![0u8, 127, 255];
        let value: Value = original.clone().into();
        let recovered: Vec<u8> = value.try_into().unwrap();
        assert_eq!(original, recovered);
    }

    #[test]
    fn try_from_type_errors() {
        assert!(bool::try_from(Value::Text("true".to_string())).is_err());
        assert!(i64::try_from(Value::Text("42".to_string())).is_err());
        assert!(String::try_from(Value::Int(42)).is_err());
    }

    #[test]
    fn try_from_option() {
        let result: Option<i64> = Option::try_from(Value::Int(42)).unwrap();
        assert_eq!(result, Some(42));

        let result: Option<i64> = Option::try_from(Value::Null).unwrap();
        assert_eq!(result, None);
    }

    #[test]
    fn safe_integer_bounds() {
        assert!(Value::is_safe_integer(MAX_SAFE_INTEGER));
        assert!(Value::is_safe_integer(MIN_SAFE_INTEGER));
        assert!(Value::is_safe_integer(0));
        assert!(!Value::is_safe_integer(MAX_SAFE_INTEGER + 1));
        assert!(!Value::is_safe_integer(MIN_SAFE_INTEGER - 1));
        assert!(!Value::is_safe_integer(i64::MIN));
    }

    #[test]
    fn params_conversions() {
        assert_eq!(Params::from(()), Params::None);
        assert_eq!(
            Params::from(vec![Value::Int(1)]),
            Params::Positional(vec![Value::Int(1)])
        );
        assert_eq!(
            Params::from([("a", Value::Int(1))]),
            Params::Named(vec![("a".to_string(), Value::Int(1))])
        );
    }

    #[test]
    fn as_accessors() {
        assert_eq!(Value::Int(42).as_i64(), Some(42));
        assert_eq!(Value::Bool(true).as_i64(), Some(1));
        assert_eq!(Value::Null.as_i64(), None);
        assert_eq!(Value::Text("hi".to_string()).as_str(), Some("hi"));
        assert_eq!(Value::Int(2).as_f64(), Some(2.0));
    }
}
