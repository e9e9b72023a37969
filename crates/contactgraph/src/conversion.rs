//! Bidirectional value conversions between native values and their storage form.
//!
//! Conversions are pure. A failure is scoped to the one field being converted: the read
//! path leaves that field unresolved, the write path drops it.

use crate::error::ConversionError;
use crate::phone::{local_phone_number, normalize_phone_number, NormalizeOptions};
use crate::subject::{make_telepathy_iri_from_path, parse_telepathy_iri, unescape_iri};
use crate::value::{parse_date_time, Value, ValueType};
use chrono::FixedOffset;
use serde::{Deserialize, Serialize};

/// Separator between timestamp and UTC offset in the storage form of timestamps.
pub const DATE_TIME_SEPARATOR: char = '|';

/// A conversion between a native field value and its storage representation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Conversion {
    /// Values are stored as they are
    Identity,
    /// Timestamps are read as `{utc timestamp}|{offset seconds}` so the offset survives
    DateTimeOffset,
    /// URLs are stored as plain key literals of a shared resource
    UriAsForeignKey,
    /// Account paths are stored as `telepathy:` IRIs
    TelepathyIri,
    /// Phone numbers are stored without formatting and with ASCII digits
    LatinPhoneNumber,
    /// Computed suffix of a phone number used for matching
    LocalPhoneNumber {
        /// Number of trailing digits kept
        length: usize,
    },
}

impl Conversion {
    /// Convert a native value into its storage form.
    pub fn to_storage(&self, value: &Value) -> Result<Value, ConversionError> {
        match self {
            Conversion::Identity => Ok(value.clone()),
            Conversion::DateTimeOffset => match value.convert(ValueType::DateTime)? {
                Value::DateTime(dt) => Ok(Value::DateTime(dt)),
                _ => Err(ConversionError::new(value, "timestamp")),
            },
            Conversion::UriAsForeignKey => value.convert(ValueType::String),
            Conversion::TelepathyIri => make_telepathy_iri_from_path(&value.to_text())
                .map(Value::Url)
                .ok_or_else(|| ConversionError::new(value, "telepathy iri")),
            Conversion::LatinPhoneNumber => Ok(Value::String(normalize_phone_number(
                &value.to_text(),
                NormalizeOptions {
                    remove_unicode_formatters: true,
                    convert_to_latin: true,
                    ..NormalizeOptions::default()
                },
            ))),
            Conversion::LocalPhoneNumber { length } => {
                Ok(Value::String(local_phone_number(&value.to_text(), *length)))
            }
        }
    }

    /// Parse the textual storage form of a field of type `value_type`.
    pub fn from_storage(&self, text: &str, value_type: ValueType) -> Result<Value, ConversionError> {
        if text.is_empty() {
            return Ok(Value::Null);
        }

        match self {
            Conversion::DateTimeOffset => parse_date_time_with_offset(text)
                .map(Value::DateTime)
                .ok_or_else(|| ConversionError::new(text, "timestamp")),
            Conversion::UriAsForeignKey => Ok(Value::Url(text.to_string())),
            Conversion::TelepathyIri => parse_telepathy_iri(&unescape_iri(text))
                .map(Value::String)
                .ok_or_else(|| ConversionError::new(text, "account path")),
            Conversion::Identity
            | Conversion::LatinPhoneNumber
            | Conversion::LocalPhoneNumber { .. } => Value::parse(text, value_type),
        }
    }

    /// Type of the stored value, `None` when the field's own type is stored.
    pub fn storage_type(&self) -> Option<ValueType> {
        match self {
            Conversion::Identity => None,
            Conversion::DateTimeOffset => Some(ValueType::DateTime),
            Conversion::TelepathyIri => Some(ValueType::Url),
            Conversion::UriAsForeignKey
            | Conversion::LatinPhoneNumber
            | Conversion::LocalPhoneNumber { .. } => Some(ValueType::String),
        }
    }

    /// Whether values can be read back from storage.
    pub fn is_reversible(&self) -> bool {
        !matches!(self, Conversion::LocalPhoneNumber { .. })
    }
}

/// Parse `{timestamp}|{offset seconds}`, shifting the UTC timestamp into its offset.
///
/// A missing offset keeps the timestamp as parsed.
pub fn parse_date_time_with_offset(text: &str) -> Option<chrono::DateTime<FixedOffset>> {
    match text.split_once(DATE_TIME_SEPARATOR) {
        Some((timestamp, offset)) => {
            let dt = parse_date_time(timestamp)?;
            let offset = FixedOffset::east_opt(offset.trim().parse().ok()?)?;
            Some(dt.with_timezone(&offset))
        }
        None => parse_date_time(text),
    }
}

/// Outcome of matching a value against a closed list of allowed values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Restriction {
    /// The value matches the allowed entry at this index
    Allowed(usize),
    /// No match, but the field stores unknown values through the generic path
    Custom(String),
    /// No match and custom values are not permitted
    Rejected,
}

/// Match `value` case-insensitively against `allowed`.
pub fn restrict<'a>(
    value: &str,
    allowed: impl IntoIterator<Item = &'a str>,
    permits_custom_values: bool,
) -> Restriction {
    let value_lower = value.to_lowercase();
    let matched = allowed
        .into_iter()
        .position(|candidate| candidate.to_lowercase() == value_lower);

    match matched {
        Some(index) => Restriction::Allowed(index),
        None if permits_custom_values => Restriction::Custom(value.to_string()),
        None => Restriction::Rejected,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_date_time_offset_round_trip() {
        let dt = Conversion::DateTimeOffset
            .from_storage("2011-03-04T05:06:07Z|7200", ValueType::DateTime)
            .unwrap();
        assert_eq!(dt.to_text(), "2011-03-04T07:06:07+02:00");

        let stored = Conversion::DateTimeOffset.to_storage(&dt).unwrap();
        assert_eq!(stored, dt);
    }

    #[test]
    fn test_date_time_without_offset() {
        let dt = parse_date_time_with_offset("2011-03-04T05:06:07Z").unwrap();
        assert_eq!(dt.offset().local_minus_utc(), 0);
    }

    #[test]
    fn test_date_time_rejects_garbage() {
        assert!(Conversion::DateTimeOffset
            .to_storage(&Value::from("yesterday"))
            .is_err());
    }

    #[test]
    fn test_uri_as_foreign_key() {
        let url = Value::Url("file:///home/user/avatar.png".to_string());
        assert_eq!(
            Conversion::UriAsForeignKey.to_storage(&url),
            Ok(Value::from("file:///home/user/avatar.png"))
        );
        assert_eq!(
            Conversion::UriAsForeignKey.from_storage("file:///a.png", ValueType::Url),
            Ok(Value::Url("file:///a.png".to_string()))
        );
    }

    #[test]
    fn test_telepathy_iri() {
        let stored = Conversion::TelepathyIri
            .to_storage(&Value::from("/org/freedesktop/Telepathy/Account/gabble/jabber/me"))
            .unwrap();
        assert_eq!(
            stored,
            Value::Url("telepathy:/org/freedesktop/Telepathy/Account/gabble/jabber/me".into())
        );
        assert!(Conversion::TelepathyIri
            .to_storage(&Value::from("relative"))
            .is_err());
        assert_eq!(
            Conversion::TelepathyIri.from_storage("telepathy:/acc%20x", ValueType::String),
            Ok(Value::from("/acc x"))
        );
    }

    #[test]
    fn test_phone_number_conversions() {
        assert_eq!(
            Conversion::LatinPhoneNumber.to_storage(&Value::from("+49 \u{0663}0")),
            Ok(Value::from("+49 30"))
        );
        assert_eq!(
            Conversion::LocalPhoneNumber { length: 4 }.to_storage(&Value::from("+49 (30) 12345")),
            Ok(Value::from("2345"))
        );
        assert!(!Conversion::LocalPhoneNumber { length: 7 }.is_reversible());
    }

    #[test]
    fn test_storage_types() {
        assert_eq!(Conversion::Identity.storage_type(), None);
        assert_eq!(Conversion::UriAsForeignKey.storage_type(), Some(ValueType::String));
        assert_eq!(Conversion::TelepathyIri.storage_type(), Some(ValueType::Url));
    }

    #[test]
    fn test_restrict() {
        let allowed = ["Wedding", "Engagement"];
        assert_eq!(restrict("wedding", allowed, false), Restriction::Allowed(0));
        assert_eq!(restrict("Birth", allowed, false), Restriction::Rejected);
        assert_eq!(
            restrict("Birth", allowed, true),
            Restriction::Custom("Birth".to_string())
        );
    }
}
