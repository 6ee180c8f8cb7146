use crate::guess::{is_integer, is_real};
use crate::models::ColumnType;
use rusqlite::types::{ToSql, ToSqlOutput, ValueRef};
use std::borrow::Cow;

/// A single cell exchanged with the backing engine.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
    Blob(Vec<u8>),
}

impl Value {
    /// Convert a raw field into a value for a column of type `ty`.
    ///
    /// Empty fields in numeric columns become NULL. Fields that do not fit
    /// the column type fall back to text instead of failing the import.
    pub fn coerce(field: String, ty: ColumnType) -> Value {
        match ty {
            ColumnType::Text => Value::Text(field),
            _ if field.is_empty() => Value::Null,
            ColumnType::Integer if is_integer(&field) => match field.parse::<i64>() {
                Ok(n) => Value::Integer(n),
                Err(_) => Value::Text(field),
            },
            ColumnType::Real if is_integer(&field) || is_real(&field) => {
                match field.parse::<f64>() {
                    Ok(n) => Value::Real(n),
                    Err(_) => Value::Text(field),
                }
            }
            _ => Value::Text(field),
        }
    }

    /// The column type this value would be stored as.
    pub fn column_type(&self) -> Option<ColumnType> {
        match self {
            Value::Null => None,
            Value::Integer(_) => Some(ColumnType::Integer),
            Value::Real(_) => Some(ColumnType::Real),
            Value::Text(_) | Value::Blob(_) => Some(ColumnType::Text),
        }
    }

    /// Plain-text rendering used by the text output formats. NULL renders empty.
    pub fn render(&self) -> Cow<'_, str> {
        match self {
            Value::Null => Cow::Borrowed(""),
            Value::Integer(n) => Cow::Owned(n.to_string()),
            Value::Real(n) => Cow::Owned(n.to_string()),
            Value::Text(s) => Cow::Borrowed(s),
            Value::Blob(b) => String::from_utf8_lossy(b),
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Null => serde_json::Value::Null,
            Value::Integer(n) => serde_json::Value::Number((*n).into()),
            Value::Real(n) => serde_json::Number::from_f64(*n)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Value::Text(s) => serde_json::Value::String(s.clone()),
            Value::Blob(b) => serde_json::Value::String(String::from_utf8_lossy(b).into_owned()),
        }
    }
}

impl From<ValueRef<'_>> for Value {
    fn from(value: ValueRef<'_>) -> Self {
        match value {
            ValueRef::Null => Value::Null,
            ValueRef::Integer(n) => Value::Integer(n),
            ValueRef::Real(n) => Value::Real(n),
            ValueRef::Text(t) => Value::Text(String::from_utf8_lossy(t).into_owned()),
            ValueRef::Blob(b) => Value::Blob(b.to_vec()),
        }
    }
}

impl ToSql for Value {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            Value::Null => ToSqlOutput::Borrowed(ValueRef::Null),
            Value::Integer(n) => ToSqlOutput::Borrowed(ValueRef::Integer(*n)),
            Value::Real(n) => ToSqlOutput::Borrowed(ValueRef::Real(*n)),
            Value::Text(s) => ToSqlOutput::Borrowed(ValueRef::Text(s.as_bytes())),
            Value::Blob(b) => ToSqlOutput::Borrowed(ValueRef::Blob(b)),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coerce_integer_column() {
        assert_eq!(Value::coerce("42".into(), ColumnType::Integer), Value::Integer(42));
        assert_eq!(Value::coerce("".into(), ColumnType::Integer), Value::Null);
        assert_eq!(
            Value::coerce("4.5".into(), ColumnType::Integer),
            Value::Text("4.5".into())
        );
        assert_eq!(
            Value::coerce("007".into(), ColumnType::Integer),
            Value::Text("007".into())
        );
    }

    #[test]
    fn test_coerce_real_column() {
        assert_eq!(Value::coerce("1.5".into(), ColumnType::Real), Value::Real(1.5));
        assert_eq!(Value::coerce("2".into(), ColumnType::Real), Value::Real(2.0));
        assert_eq!(
            Value::coerce("NaN".into(), ColumnType::Real),
            Value::Text("NaN".into())
        );
    }

    #[test]
    fn test_coerce_text_column_keeps_empty() {
        assert_eq!(Value::coerce("".into(), ColumnType::Text), Value::Text(String::new()));
    }

    #[test]
    fn test_render() {
        assert_eq!(Value::Null.render(), "");
        assert_eq!(Value::Integer(-3).render(), "-3");
        assert_eq!(Value::Real(0.25).render(), "0.25");
        assert_eq!(Value::Text("Melon".into()).render(), "Melon");
    }

    #[test]
    fn test_to_json() {
        assert_eq!(Value::Integer(1).to_json(), serde_json::json!(1));
        assert_eq!(Value::Real(f64::NAN).to_json(), serde_json::Value::Null);
        assert_eq!(Value::Text("a".into()).to_json(), serde_json::json!("a"));
    }
}
