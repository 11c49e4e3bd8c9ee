//! Scalar values produced by accessors and written by plans.

use std::fmt;
use std::io::{self, Write};

use chrono::{DateTime, SecondsFormat, Utc};
use rust_decimal::Decimal;
use serde::{Serialize, Serializer};
use uuid::Uuid;

use crate::config::CompilerConfig;

/// Declared column types a mapping may ask for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScalarType {
    String,
    Int,
    Decimal,
    Guid,
    DateTime,
}

impl ScalarType {
    /// Parses a declared `type` value. Matching is case-insensitive so both
    /// `Guid` and `guid` are accepted.
    pub fn parse(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "string" => Some(ScalarType::String),
            "int" => Some(ScalarType::Int),
            "decimal" => Some(ScalarType::Decimal),
            "guid" => Some(ScalarType::Guid),
            "datetime" => Some(ScalarType::DateTime),
            _ => None,
        }
    }

    /// Canonical name as written in mappings.
    pub fn as_str(&self) -> &'static str {
        match self {
            ScalarType::String => "string",
            ScalarType::Int => "int",
            ScalarType::Decimal => "decimal",
            ScalarType::Guid => "Guid",
            ScalarType::DateTime => "DateTime",
        }
    }

    /// Whether an accessor producing `self` may feed a column declared as `target`.
    pub fn coercible_to(self, target: ScalarType, config: &CompilerConfig) -> bool {
        if self == target {
            return true;
        }
        match (self, target) {
            (_, ScalarType::String) => config.string_coercion,
            (ScalarType::Int, ScalarType::Decimal) => config.decimal_from_int,
            _ => false,
        }
    }
}

impl fmt::Display for ScalarType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A dynamically typed scalar, one per output column.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    String(String),
    Int(i64),
    Decimal(Decimal),
    Guid(Uuid),
    DateTime(DateTime<Utc>),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// The scalar type of this value, `None` for null.
    pub fn scalar_type(&self) -> Option<ScalarType> {
        match self {
            Value::Null => None,
            Value::String(_) => Some(ScalarType::String),
            Value::Int(_) => Some(ScalarType::Int),
            Value::Decimal(_) => Some(ScalarType::Decimal),
            Value::Guid(_) => Some(ScalarType::Guid),
            Value::DateTime(_) => Some(ScalarType::DateTime),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Parses a `const.` literal into the declared type.
    pub fn parse_literal(value_type: ScalarType, literal: &str) -> Option<Value> {
        match value_type {
            ScalarType::String => Some(Value::String(literal.to_string())),
            ScalarType::Int => literal.parse().ok().map(Value::Int),
            ScalarType::Decimal => literal.parse().ok().map(Value::Decimal),
            ScalarType::Guid => Uuid::parse_str(literal).ok().map(Value::Guid),
            ScalarType::DateTime => DateTime::parse_from_rfc3339(literal)
                .ok()
                .map(|dt| Value::DateTime(dt.with_timezone(&Utc))),
        }
    }

    /// Converts to `target`. Only conversions accepted by
    /// [`ScalarType::coercible_to`] are ever requested; anything else is
    /// returned unchanged.
    pub fn coerce(self, target: ScalarType) -> Value {
        match (self, target) {
            (Value::Null, _) => Value::Null,
            (Value::String(s), ScalarType::String) => Value::String(s),
            (other, ScalarType::String) => Value::String(other.to_string()),
            (Value::Int(i), ScalarType::Decimal) => Value::Decimal(Decimal::from(i)),
            (other, _) => other,
        }
    }

    /// Writes this value as a JSON token.
    ///
    /// Strings, GUIDs and timestamps are quoted; integers and decimals are
    /// written as numbers.
    pub fn write_json<W: Write + ?Sized>(&self, out: &mut W) -> io::Result<()> {
        match self {
            Value::Null => out.write_all(b"null"),
            Value::String(s) => serde_json::to_writer(out, s).map_err(io::Error::from),
            Value::Int(i) => write!(out, "{}", i),
            Value::Decimal(d) => write!(out, "{}", d),
            Value::Guid(g) => write!(out, "\"{}\"", g.hyphenated()),
            Value::DateTime(dt) => write!(out, "\"{}\"", format_timestamp(dt)),
        }
    }
}

fn format_timestamp(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => Ok(()),
            Value::String(s) => f.write_str(s),
            Value::Int(i) => write!(f, "{}", i),
            Value::Decimal(d) => write!(f, "{}", d),
            Value::Guid(g) => write!(f, "{}", g.hyphenated()),
            Value::DateTime(dt) => f.write_str(&format_timestamp(dt)),
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Null => serializer.serialize_unit(),
            Value::String(s) => serializer.serialize_str(s),
            Value::Int(i) => serializer.serialize_i64(*i),
            Value::Decimal(_) | Value::Guid(_) | Value::DateTime(_) => {
                serializer.collect_str(self)
            }
        }
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int(value)
    }
}

// =============================================================================
// IntoValue
// =============================================================================

/// Rust types a shape field can expose as a scalar.
pub trait IntoValue {
    /// The scalar type every value of this Rust type maps to.
    const SCALAR_TYPE: ScalarType;

    fn into_value(self) -> Value;
}

impl IntoValue for String {
    const SCALAR_TYPE: ScalarType = ScalarType::String;

    fn into_value(self) -> Value {
        Value::String(self)
    }
}

macro_rules! int_into_value {
    ($($ty:ty),*) => {
        $(
            impl IntoValue for $ty {
                const SCALAR_TYPE: ScalarType = ScalarType::Int;

                fn into_value(self) -> Value {
                    Value::Int(i64::from(self))
                }
            }
        )*
    };
}

int_into_value!(i64, i32, i16, i8, u32, u16, u8);

impl IntoValue for Decimal {
    const SCALAR_TYPE: ScalarType = ScalarType::Decimal;

    fn into_value(self) -> Value {
        Value::Decimal(self)
    }
}

impl IntoValue for Uuid {
    const SCALAR_TYPE: ScalarType = ScalarType::Guid;

    fn into_value(self) -> Value {
        Value::Guid(self)
    }
}

impl IntoValue for DateTime<Utc> {
    const SCALAR_TYPE: ScalarType = ScalarType::DateTime;

    fn into_value(self) -> Value {
        Value::DateTime(self)
    }
}

impl<V: IntoValue> IntoValue for Option<V> {
    const SCALAR_TYPE: ScalarType = V::SCALAR_TYPE;

    fn into_value(self) -> Value {
        match self {
            Some(value) => value.into_value(),
            None => Value::Null,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal::Decimal;

    fn json(value: &Value) -> String {
        let mut out = Vec::new();
        value.write_json(&mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_parse_scalar_types() {
        assert_eq!(ScalarType::parse("string"), Some(ScalarType::String));
        assert_eq!(ScalarType::parse("int"), Some(ScalarType::Int));
        assert_eq!(ScalarType::parse("Guid"), Some(ScalarType::Guid));
        assert_eq!(ScalarType::parse("decimal"), Some(ScalarType::Decimal));
        assert_eq!(ScalarType::parse("DateTime"), Some(ScalarType::DateTime));
        assert_eq!(ScalarType::parse("bool"), None);
    }

    #[test]
    fn test_parse_rejects_type_aliases() {
        assert_eq!(ScalarType::parse("guid"), Some(ScalarType::Guid));
        assert_eq!(ScalarType::parse("long"), None);
        assert_eq!(ScalarType::parse("uuid"), None);
        assert_eq!(ScalarType::parse("timestamp"), None);
    }

    #[test]
    fn test_coercion_table() {
        let config = CompilerConfig::default();
        assert!(ScalarType::Int.coercible_to(ScalarType::Int, &config));
        assert!(ScalarType::Guid.coercible_to(ScalarType::String, &config));
        assert!(ScalarType::Int.coercible_to(ScalarType::Decimal, &config));
        assert!(!ScalarType::String.coercible_to(ScalarType::Int, &config));
        assert!(!ScalarType::Decimal.coercible_to(ScalarType::Int, &config));

        let strict = CompilerConfig {
            string_coercion: false,
            decimal_from_int: false,
        };
        assert!(!ScalarType::Int.coercible_to(ScalarType::String, &strict));
        assert!(!ScalarType::Int.coercible_to(ScalarType::Decimal, &strict));
    }

    #[test]
    fn test_parse_literals() {
        assert_eq!(Value::parse_literal(ScalarType::Int, "42"), Some(Value::Int(42)));
        assert_eq!(Value::parse_literal(ScalarType::Int, "forty-two"), None);
        assert_eq!(
            Value::parse_literal(ScalarType::Decimal, "12.50"),
            Some(Value::Decimal(Decimal::new(1250, 2)))
        );
        assert_eq!(
            Value::parse_literal(ScalarType::String, "Sample"),
            Some(Value::from("Sample"))
        );
        assert!(Value::parse_literal(ScalarType::Guid, "not-a-guid").is_none());
    }

    #[test]
    fn test_coerce_values() {
        assert_eq!(Value::Int(7).coerce(ScalarType::String), Value::from("7"));
        assert_eq!(
            Value::Int(7).coerce(ScalarType::Decimal),
            Value::Decimal(Decimal::from(7))
        );
        assert_eq!(Value::Null.coerce(ScalarType::String), Value::Null);
    }

    #[test]
    fn test_write_json_tokens() {
        assert_eq!(json(&Value::Null), "null");
        assert_eq!(json(&Value::Int(42)), "42");
        assert_eq!(json(&Value::from("a \"quoted\" name")), r#""a \"quoted\" name""#);
        assert_eq!(json(&Value::Decimal(Decimal::new(1999, 2))), "19.99");

        let ts = Utc.with_ymd_and_hms(2024, 3, 1, 12, 30, 0).unwrap();
        assert_eq!(json(&Value::DateTime(ts)), r#""2024-03-01T12:30:00Z""#);

        let guid = Uuid::nil();
        assert_eq!(
            json(&Value::Guid(guid)),
            r#""00000000-0000-0000-0000-000000000000""#
        );
    }

    #[test]
    fn test_serialize_matches_json_writer_for_scalars() {
        let row = vec![Value::Int(1), Value::from("x"), Value::Null];
        assert_eq!(serde_json::to_string(&row).unwrap(), r#"[1,"x",null]"#);
    }

    #[test]
    fn test_option_into_value() {
        assert_eq!(Some(5i32).into_value(), Value::Int(5));
        assert_eq!(None::<String>.into_value(), Value::Null);
        assert_eq!(<Option<Uuid> as IntoValue>::SCALAR_TYPE, ScalarType::Guid);
    }
}
