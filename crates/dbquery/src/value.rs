//! Bind values: a closed set of parameter types plus the pre-quoted literal case.

use crate::error::QueryResult;
use bytes::BytesMut;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::error::Error;
use tokio_postgres::types::{IsNull, ToSql, Type};
use uuid::Uuid;

/// A single value sent alongside a statement.
///
/// Every typed variant holds an `Option` so SQL `NULL` keeps its type.
/// [`Value::Null`] is the untyped `NULL`, accepted for any column.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Text(Option<String>),
    /// int4
    Int(Option<i32>),
    /// int8
    BigInt(Option<i64>),
    /// float8
    Float(Option<f64>),
    Bool(Option<bool>),
    Timestamp(Option<DateTime<Utc>>),
    Uuid(Option<Uuid>),
    Json(Option<serde_json::Value>),
    /// A string the caller already quoted (`'...'`). Inlined into the SQL
    /// text instead of being bound.
    Literal(String),
}

impl Value {
    /// Serialize any value into a JSON bind.
    pub fn json<T: Serialize + ?Sized>(value: &T) -> QueryResult<Self> {
        Ok(Value::Json(Some(serde_json::to_value(value)?)))
    }

    /// Parse pre-encoded JSON text into a JSON bind.
    pub fn json_text(text: &str) -> QueryResult<Self> {
        Ok(Value::Json(Some(serde_json::from_str(text)?)))
    }

    /// Text of a pre-quoted literal, if this is one.
    pub fn literal(&self) -> Option<&str> {
        match self {
            Value::Literal(s) => Some(s),
            _ => None,
        }
    }
}

/// True when the first and last characters are both `'`.
///
/// Purely syntactic: a lone `'` counts.
pub fn is_quoted_literal(s: &str) -> bool {
    s.starts_with('\'') && s.ends_with('\'')
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        if is_quoted_literal(&s) {
            Value::Literal(s)
        } else {
            Value::Text(Some(s))
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::from(s.to_string())
    }
}

impl From<Option<&str>> for Value {
    fn from(s: Option<&str>) -> Self {
        Value::Text(s.map(str::to_string))
    }
}

macro_rules! impl_from_value {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for Value {
                fn from(v: $ty) -> Self {
                    Value::$variant(Some(v))
                }
            }

            impl From<Option<$ty>> for Value {
                fn from(v: Option<$ty>) -> Self {
                    Value::$variant(v)
                }
            }
        )*
    };
}

impl_from_value! {
    i32 => Int,
    i64 => BigInt,
    f64 => Float,
    bool => Bool,
    DateTime<Utc> => Timestamp,
    Uuid => Uuid,
    serde_json::Value => Json,
}

impl From<Option<String>> for Value {
    fn from(v: Option<String>) -> Self {
        Value::Text(v)
    }
}

impl ToSql for Value {
    fn to_sql(&self, ty: &Type, out: &mut BytesMut) -> Result<IsNull, Box<dyn Error + Sync + Send>> {
        match self {
            Value::Null => Ok(IsNull::Yes),
            Value::Text(v) => v.to_sql(ty, out),
            Value::Int(v) => v.to_sql(ty, out),
            Value::BigInt(v) => v.to_sql(ty, out),
            Value::Float(v) => v.to_sql(ty, out),
            Value::Bool(v) => v.to_sql(ty, out),
            Value::Timestamp(v) => v.to_sql(ty, out),
            Value::Uuid(v) => v.to_sql(ty, out),
            Value::Json(v) => v.to_sql(ty, out),
            Value::Literal(v) => v.to_sql(ty, out),
        }
    }

    fn accepts(_ty: &Type) -> bool {
        // Checked per variant in `to_sql_checked`.
        true
    }

    fn to_sql_checked(
        &self,
        ty: &Type,
        out: &mut BytesMut,
    ) -> Result<IsNull, Box<dyn Error + Sync + Send>> {
        match self {
            Value::Null => Ok(IsNull::Yes),
            Value::Text(v) => v.to_sql_checked(ty, out),
            Value::Int(v) => v.to_sql_checked(ty, out),
            Value::BigInt(v) => v.to_sql_checked(ty, out),
            Value::Float(v) => v.to_sql_checked(ty, out),
            Value::Bool(v) => v.to_sql_checked(ty, out),
            Value::Timestamp(v) => v.to_sql_checked(ty, out),
            Value::Uuid(v) => v.to_sql_checked(ty, out),
            Value::Json(v) => v.to_sql_checked(ty, out),
            Value::Literal(v) => v.to_sql_checked(ty, out),
        }
    }
}

/// One positional parameter: a value plus an optional `::cast`.
#[derive(Debug, Clone, PartialEq)]
pub struct BindValue {
    pub value: Value,
    pub cast: Option<String>,
}

impl BindValue {
    pub fn new(value: impl Into<Value>) -> Self {
        Self {
            value: value.into(),
            cast: None,
        }
    }

    /// Render this bind's placeholder as `$N::ty`.
    pub fn cast(mut self, ty: impl Into<String>) -> Self {
        self.cast = Some(ty.into());
        self
    }

    pub fn is_literal(&self) -> bool {
        matches!(self.value, Value::Literal(_))
    }
}

impl From<Value> for BindValue {
    fn from(value: Value) -> Self {
        Self { value, cast: None }
    }
}

/// Shorthand for [`BindValue::new`].
pub fn bind(value: impl Into<Value>) -> BindValue {
    BindValue::new(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quoted_strings_become_literals() {
        assert_eq!(Value::from("'active'"), Value::Literal("'active'".into()));
        assert_eq!(Value::from("'"), Value::Literal("'".into()));
        assert_eq!(Value::from("active"), Value::Text(Some("active".into())));
        assert_eq!(Value::from("'half"), Value::Text(Some("'half".into())));
    }

    #[test]
    fn optional_values_keep_their_type() {
        assert_eq!(Value::from(None::<i64>), Value::BigInt(None));
        assert_eq!(Value::from(Some(3_i32)), Value::Int(Some(3)));
        assert_eq!(Value::from(None::<&str>), Value::Text(None));
    }

    #[test]
    fn json_text_is_parsed() {
        let v = Value::json_text(r#"{"a":1}"#).unwrap();
        assert_eq!(v, Value::Json(Some(serde_json::json!({"a": 1}))));
        assert!(Value::json_text("{oops").is_err());
    }

    #[test]
    fn bind_value_cast() {
        let b = bind(7_i64).cast("int4");
        assert_eq!(b.cast.as_deref(), Some("int4"));
        assert!(!b.is_literal());
        assert!(bind("'x'").is_literal());
    }

    #[test]
    fn value_encodes_through_inner_type() {
        let mut buf = BytesMut::new();
        let r = Value::BigInt(Some(5)).to_sql_checked(&Type::INT8, &mut buf);
        assert!(matches!(r, Ok(IsNull::No)));
        assert_eq!(buf.as_ref(), &5_i64.to_be_bytes());

        let mut buf = BytesMut::new();
        assert!(Value::BigInt(Some(5)).to_sql_checked(&Type::TEXT, &mut buf).is_err());

        let mut buf = BytesMut::new();
        let r = Value::Null.to_sql_checked(&Type::INT4, &mut buf);
        assert!(matches!(r, Ok(IsNull::Yes)));
    }
}
