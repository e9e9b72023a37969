//! Detail field values.
//!
//! [`Value`] is the native representation of a field value, [`ValueType`] names the type a
//! field declares. Conversions between the two and their textual storage form live here;
//! schema specific conversions are in [`crate::conversion`].

use crate::error::ConversionError;
use chrono::{DateTime, FixedOffset, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Declared type of a detail field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ValueType {
    /// Plain text
    String,
    /// List of text items
    StringList,
    /// Signed integer
    Int,
    /// Floating point number
    Double,
    /// Boolean flag
    Bool,
    /// Timestamp with UTC offset
    DateTime,
    /// Resource locator
    Url,
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueType::String => write!(f, "string"),
            ValueType::StringList => write!(f, "string list"),
            ValueType::Int => write!(f, "int"),
            ValueType::Double => write!(f, "double"),
            ValueType::Bool => write!(f, "bool"),
            ValueType::DateTime => write!(f, "datetime"),
            ValueType::Url => write!(f, "url"),
        }
    }
}

/// Strongly-typed field value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    /// Text value (names, numbers, addresses)
    String(String),
    /// List of text values (subtypes, capabilities)
    StringList(Vec<String>),
    /// Integer value (presence states, enumerations)
    Int(i64),
    /// Floating point value (coordinates, relevance)
    Double(f64),
    /// Boolean flag
    Bool(bool),
    /// Timestamp retaining its UTC offset
    DateTime(DateTime<FixedOffset>),
    /// Resource locator (avatars, ringtones, web pages)
    Url(String),
    /// Explicit absence of a value
    Null,
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_string())
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Int(value as i64)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Double(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<Vec<String>> for Value {
    fn from(value: Vec<String>) -> Self {
        Value::StringList(value)
    }
}

impl From<Vec<&str>> for Value {
    fn from(value: Vec<&str>) -> Self {
        Value::StringList(value.into_iter().map(String::from).collect())
    }
}

impl From<DateTime<FixedOffset>> for Value {
    fn from(value: DateTime<FixedOffset>) -> Self {
        Value::DateTime(value)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(value: DateTime<Utc>) -> Self {
        Value::DateTime(value.fixed_offset())
    }
}

impl Value {
    /// Type of this value, `None` for [`Value::Null`].
    pub fn value_type(&self) -> Option<ValueType> {
        match self {
            Value::String(_) => Some(ValueType::String),
            Value::StringList(_) => Some(ValueType::StringList),
            Value::Int(_) => Some(ValueType::Int),
            Value::Double(_) => Some(ValueType::Double),
            Value::Bool(_) => Some(ValueType::Bool),
            Value::DateTime(_) => Some(ValueType::DateTime),
            Value::Url(_) => Some(ValueType::Url),
            Value::Null => None,
        }
    }

    /// Whether this is [`Value::Null`].
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Whether the value carries no information: null, empty text or an empty list.
    pub fn is_empty(&self) -> bool {
        match self {
            Value::Null => true,
            Value::String(s) | Value::Url(s) => s.is_empty(),
            Value::StringList(list) => list.is_empty(),
            _ => false,
        }
    }

    /// Borrow the text of a string or url value.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) | Value::Url(s) => Some(s),
            _ => None,
        }
    }

    /// View the value as a list of strings. Scalars become single element lists.
    pub fn to_string_list(&self) -> Vec<String> {
        match self {
            Value::Null => Vec::new(),
            Value::StringList(list) => list.clone(),
            other => vec![other.to_text()],
        }
    }

    /// Plain textual form, as written into a string literal.
    pub fn to_text(&self) -> String {
        match self {
            Value::String(s) | Value::Url(s) => s.clone(),
            Value::StringList(list) => list.join(","),
            Value::Int(i) => i.to_string(),
            Value::Double(d) => d.to_string(),
            Value::Bool(b) => b.to_string(),
            Value::DateTime(dt) => dt.to_rfc3339(),
            Value::Null => String::new(),
        }
    }

    /// Convert this value to another declared type.
    ///
    /// Follows the usual variant conversion rules: text parses into numbers, booleans and
    /// timestamps, scalars widen into single element lists and everything renders to text.
    pub fn convert(&self, target: ValueType) -> Result<Value, ConversionError> {
        if self.value_type() == Some(target) {
            return Ok(self.clone());
        }

        match (self, target) {
            (Value::Null, _) => Ok(Value::Null),
            (_, ValueType::String) => Ok(Value::String(self.to_text())),
            (Value::StringList(list), ValueType::Url) if list.len() == 1 => {
                Ok(Value::Url(list[0].clone()))
            }
            (Value::String(s), ValueType::Url) => Ok(Value::Url(s.clone())),
            (_, ValueType::StringList) => Ok(Value::StringList(self.to_string_list())),
            (Value::String(s), ValueType::Int) => s
                .trim()
                .parse()
                .map(Value::Int)
                .map_err(|_| ConversionError::new(self, "int")),
            (Value::Double(d), ValueType::Int) => Ok(Value::Int(d.round() as i64)),
            (Value::Bool(b), ValueType::Int) => Ok(Value::Int(*b as i64)),
            (Value::String(s), ValueType::Double) => s
                .trim()
                .parse()
                .map(Value::Double)
                .map_err(|_| ConversionError::new(self, "double")),
            (Value::Int(i), ValueType::Double) => Ok(Value::Double(*i as f64)),
            (Value::String(s), ValueType::Bool) => match s.trim() {
                "true" | "1" => Ok(Value::Bool(true)),
                "false" | "0" | "" => Ok(Value::Bool(false)),
                _ => Err(ConversionError::new(self, "bool")),
            },
            (Value::Int(i), ValueType::Bool) => Ok(Value::Bool(*i != 0)),
            (Value::String(s), ValueType::DateTime) => {
                parse_date_time(s).map(Value::DateTime).ok_or_else(|| ConversionError::new(self, "datetime"))
            }
            _ => Err(ConversionError::new(self, "requested type")),
        }
    }

    /// Parse the textual storage form of a value of type `value_type`.
    ///
    /// Empty text always parses as [`Value::Null`].
    pub fn parse(text: &str, value_type: ValueType) -> Result<Value, ConversionError> {
        if text.is_empty() {
            return Ok(Value::Null);
        }

        Value::String(text.to_string()).convert(value_type)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_text())
    }
}

/// Parse an ISO 8601 timestamp. Timestamps without offset are taken as UTC.
pub fn parse_date_time(text: &str) -> Option<DateTime<FixedOffset>> {
    let text = text.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt);
    }

    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"]
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(text, format).ok())
        .map(|naive| Utc.from_utc_datetime(&naive).fixed_offset())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_string_converts_to_numbers() {
        assert_eq!(Value::from("42").convert(ValueType::Int), Ok(Value::Int(42)));
        assert_eq!(
            Value::from("2.5").convert(ValueType::Double),
            Ok(Value::Double(2.5))
        );
        assert!(Value::from("abc").convert(ValueType::Int).is_err());
    }

    #[test]
    fn test_scalar_widens_to_list() {
        assert_eq!(
            Value::from("Home").convert(ValueType::StringList),
            Ok(Value::from(vec!["Home"]))
        );
    }

    #[test]
    fn test_parse_empty_is_null() {
        assert_eq!(Value::parse("", ValueType::Int), Ok(Value::Null));
    }

    #[test]
    fn test_parse_date_time_without_offset_is_utc() {
        let dt = parse_date_time("2011-03-04T05:06:07").unwrap();
        assert_eq!(dt.offset().local_minus_utc(), 0);
        assert_eq!(dt.to_rfc3339(), "2011-03-04T05:06:07+00:00");
    }

    #[test]
    fn test_emptiness() {
        assert!(Value::Null.is_empty());
        assert!(Value::from("").is_empty());
        assert!(Value::StringList(vec![]).is_empty());
        assert!(!Value::Int(0).is_empty());
    }
}
