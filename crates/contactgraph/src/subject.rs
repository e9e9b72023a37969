//! Content-addressed resource identifiers.
//!
//! Some related resources get an IRI derived purely from a field value, so saving the same
//! value twice, or from two contacts, addresses the same resource. Every scheme has a
//! matching parser that rejects malformed input instead of guessing.

use crate::value::Value;
use crate::vocab::{nao, nco, nfo};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

const ANONYMOUS_PREFIX: &str = "urn:uuid:";
const EMAIL_ADDRESS_PREFIX: &str = "mailto:";
const PHONE_NUMBER_PREFIX: &str = "urn:x-maemo-phone:";
const TELEPATHY_PREFIX: &str = "telepathy:";
const PRESENCE_PREFIX: &str = "presence:";

/// How the IRI of a related resource is derived.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum SubjectScheme {
    /// No IRI at all, the resource is a blank node
    #[default]
    None,
    /// A fresh opaque `urn:uuid:` IRI
    Anonymous,
    /// `urn:x-maemo-phone:` IRI derived from number and subtypes
    PhoneNumber,
    /// `mailto:` IRI derived from the address
    EmailAddress,
    /// `telepathy:` IRI derived from an account path and optional IM address
    Telepathy,
    /// `presence:` IRI derived from an account path and IM address
    Presence,
}

impl fmt::Display for SubjectScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SubjectScheme::None => write!(f, "none"),
            SubjectScheme::Anonymous => write!(f, "anonymous"),
            SubjectScheme::PhoneNumber => write!(f, "phone-number"),
            SubjectScheme::EmailAddress => write!(f, "email-address"),
            SubjectScheme::Telepathy => write!(f, "telepathy"),
            SubjectScheme::Presence => write!(f, "presence"),
        }
    }
}

impl SubjectScheme {
    /// Whether IRIs of this scheme are derived from the content of a field.
    pub fn is_content_scheme(self) -> bool {
        matches!(
            self,
            SubjectScheme::PhoneNumber
                | SubjectScheme::EmailAddress
                | SubjectScheme::Telepathy
                | SubjectScheme::Presence
        )
    }

    /// Scheme used for resources of class `class_iri`.
    pub fn for_class(class_iri: &str) -> Self {
        match class_iri {
            nco::PHONE_NUMBER => SubjectScheme::PhoneNumber,
            nco::EMAIL_ADDRESS => SubjectScheme::EmailAddress,
            nco::IM_ACCOUNT | nco::IM_ADDRESS => SubjectScheme::Telepathy,
            nco::AFFILIATION | nfo::FILE_DATA_OBJECT | nco::POSTAL_ADDRESS | nao::TAG => {
                SubjectScheme::Anonymous
            }
            _ => SubjectScheme::None,
        }
    }

    /// Build an IRI of this scheme from field values.
    ///
    /// Returns `None` when the argument count does not fit the scheme or a value is
    /// malformed. Phone numbers take the number and an optional subtype list, telepathy and presence
    /// IRIs take an account path and an optional IM address, everything else takes one value.
    pub fn make_iri(self, values: &[Value]) -> Option<String> {
        match (self, values) {
            (SubjectScheme::None | SubjectScheme::Anonymous, [value]) => {
                let uuid = Uuid::parse_str(value.as_str()?).ok()?;
                Some(make_anonymous_iri(&uuid))
            }
            (SubjectScheme::PhoneNumber, [number]) => {
                let number = number.to_text();
                (!number.is_empty()).then(|| make_phone_number_iri(&number, &[]))
            }
            (SubjectScheme::PhoneNumber, [number, subtypes]) => {
                let number = number.to_text();
                (!number.is_empty())
                    .then(|| make_phone_number_iri(&number, &subtypes.to_string_list()))
            }
            (SubjectScheme::EmailAddress, [address]) => make_email_address_iri(&address.to_text()),
            (SubjectScheme::Telepathy, [path]) => make_telepathy_iri_from_path(&path.to_text()),
            (SubjectScheme::Telepathy, [path, address]) => {
                make_telepathy_iri(&path.to_text(), Some(&address.to_text()))
            }
            (SubjectScheme::Presence, [path]) => make_presence_iri_from_path(&path.to_text()),
            (SubjectScheme::Presence, [path, address]) => {
                make_presence_iri(&path.to_text(), &address.to_text())
            }
            _ => {
                log::debug!("invalid arguments for {self} subject: {values:?}");
                None
            }
        }
    }

    /// Recover the value an IRI of this scheme was built from.
    pub fn parse_iri(self, iri: &str) -> Option<Value> {
        match self {
            SubjectScheme::None | SubjectScheme::Anonymous => {
                parse_anonymous_iri(iri).map(|uuid| Value::String(uuid.to_string()))
            }
            SubjectScheme::PhoneNumber => {
                parse_phone_number_iri(iri).map(|(number, _)| Value::String(number))
            }
            SubjectScheme::EmailAddress => parse_email_address_iri(iri).map(Value::String),
            SubjectScheme::Telepathy => parse_telepathy_iri(iri).map(Value::String),
            SubjectScheme::Presence => {
                parse_presence_iri(iri).map(|(path, address)| Value::String(format!("{path}!{address}")))
            }
        }
    }
}

/// A fresh opaque identifier.
pub fn new_anonymous_iri() -> String {
    make_anonymous_iri(&Uuid::new_v4())
}

/// `urn:uuid:` IRI for `uuid`.
pub fn make_anonymous_iri(uuid: &Uuid) -> String {
    format!("{ANONYMOUS_PREFIX}{}", uuid.hyphenated())
}

/// Parse a `urn:uuid:` IRI.
pub fn parse_anonymous_iri(iri: &str) -> Option<Uuid> {
    let suffix = iri.strip_prefix(ANONYMOUS_PREFIX)?;
    Uuid::parse_str(suffix).ok().filter(|uuid| !uuid.is_nil())
}

/// `mailto:` IRI for an email address, `None` for an empty address.
pub fn make_email_address_iri(address: &str) -> Option<String> {
    (!address.is_empty()).then(|| format!("{EMAIL_ADDRESS_PREFIX}{address}"))
}

/// Parse a `mailto:` IRI.
pub fn parse_email_address_iri(iri: &str) -> Option<String> {
    parse_text_iri(EMAIL_ADDRESS_PREFIX, iri)
}

/// Phone number IRI. Subtypes are lower-cased and sorted so their order does not matter.
pub fn make_phone_number_iri(number: &str, subtypes: &[String]) -> String {
    if subtypes.is_empty() {
        return format!("{PHONE_NUMBER_PREFIX}{number}");
    }

    let mut subtypes: Vec<String> = subtypes.iter().map(|s| s.to_lowercase()).collect();
    subtypes.sort();

    format!("{PHONE_NUMBER_PREFIX}{}:{number}", subtypes.join(","))
}

/// Parse a phone number IRI into number and lower-cased subtypes.
pub fn parse_phone_number_iri(iri: &str) -> Option<(String, Vec<String>)> {
    let rest = iri.strip_prefix(PHONE_NUMBER_PREFIX)?;

    let (subtypes, number) = match rest.split_once(':') {
        Some((subtypes, number)) => {
            let subtypes: Vec<String> = subtypes.split(',').map(String::from).collect();
            if subtypes.iter().any(|s| s.is_empty()) {
                return None;
            }
            (subtypes, number)
        }
        None => (Vec::new(), rest),
    };

    (!number.is_empty()).then(|| (number.to_string(), subtypes))
}

/// `telepathy:` IRI for an account path and an optional IM address.
///
/// The account path must be absolute.
pub fn make_telepathy_iri(account_path: &str, im_address: Option<&str>) -> Option<String> {
    if !account_path.starts_with('/') {
        log::debug!("invalid account path: {account_path}");
        return None;
    }

    match im_address.filter(|a| !a.is_empty()) {
        Some(address) => Some(format!("{TELEPATHY_PREFIX}{account_path}!{address}")),
        None => Some(format!("{TELEPATHY_PREFIX}{account_path}")),
    }
}

/// `telepathy:` IRI for a connection path of the form `{account}` or `{account}!{address}`.
pub fn make_telepathy_iri_from_path(connection_path: &str) -> Option<String> {
    match connection_path.split_once('!') {
        Some((account, address)) => make_telepathy_iri(account, Some(address)),
        None => make_telepathy_iri(connection_path, None),
    }
}

/// Parse a `telepathy:` IRI into its connection path.
pub fn parse_telepathy_iri(iri: &str) -> Option<String> {
    parse_text_iri(TELEPATHY_PREFIX, iri).filter(|path| path.starts_with('/'))
}

/// `presence:` IRI. Both parts are required.
pub fn make_presence_iri(account_path: &str, im_address: &str) -> Option<String> {
    if !account_path.starts_with('/') {
        log::debug!("invalid account path: {account_path}");
        return None;
    }

    if im_address.is_empty() {
        log::debug!("IM address cannot be empty: {account_path}");
        return None;
    }

    Some(format!("{PRESENCE_PREFIX}{account_path}!{im_address}"))
}

/// `presence:` IRI for a connection path of the form `{account}!{address}`.
pub fn make_presence_iri_from_path(connection_path: &str) -> Option<String> {
    let (account, address) = connection_path.split_once('!')?;
    make_presence_iri(account, address)
}

/// Parse a `presence:` IRI into account path and IM address.
pub fn parse_presence_iri(iri: &str) -> Option<(String, String)> {
    let path = parse_text_iri(PRESENCE_PREFIX, iri)?;
    let (account, address) = path.split_once('!')?;

    (account.starts_with('/') && !address.is_empty())
        .then(|| (account.to_string(), address.to_string()))
}

fn parse_text_iri(prefix: &str, iri: &str) -> Option<String> {
    iri.strip_prefix(prefix)
        .filter(|value| !value.is_empty())
        .map(String::from)
}

/// Percent-encode characters that may not appear inside an IRI reference.
pub fn escape_iri(iri: &str) -> String {
    let mut escaped = String::with_capacity(iri.len());

    for c in iri.chars() {
        if c.is_control() || matches!(c, ' ' | '<' | '>' | '"' | '{' | '}' | '|' | '\\' | '^' | '`')
        {
            let mut buffer = [0u8; 4];
            for byte in c.encode_utf8(&mut buffer).bytes() {
                escaped.push_str(&format!("%{byte:02X}"));
            }
        } else {
            escaped.push(c);
        }
    }

    escaped
}

/// Decode percent-encoded octets. Malformed escapes are kept literally.
pub fn unescape_iri(iri: &str) -> String {
    let bytes = iri.as_bytes();
    let mut decoded = Vec::with_capacity(bytes.len());
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] == b'%' && i + 2 < bytes.len() {
            let hex = std::str::from_utf8(&bytes[i + 1..i + 3]).ok();
            if let Some(byte) = hex.and_then(|h| u8::from_str_radix(h, 16).ok()) {
                decoded.push(byte);
                i += 3;
                continue;
            }
        }
        decoded.push(bytes[i]);
        i += 1;
    }

    String::from_utf8_lossy(&decoded).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_schemes() {
        assert!(SubjectScheme::PhoneNumber.is_content_scheme());
        assert!(SubjectScheme::Presence.is_content_scheme());
        assert!(!SubjectScheme::Anonymous.is_content_scheme());
        assert!(!SubjectScheme::None.is_content_scheme());
    }

    #[test]
    fn test_scheme_for_class() {
        assert_eq!(
            SubjectScheme::for_class(nco::IM_ADDRESS),
            SubjectScheme::Telepathy
        );
        assert_eq!(SubjectScheme::for_class(nao::TAG), SubjectScheme::Anonymous);
        assert_eq!(
            SubjectScheme::for_class(nco::PERSON_CONTACT),
            SubjectScheme::None
        );
    }

    #[test]
    fn test_phone_number_iri_sorts_subtypes() {
        let iri = make_phone_number_iri(
            "+4930123",
            &["Voice".to_string(), "Fax".to_string()],
        );
        assert_eq!(iri, "urn:x-maemo-phone:fax,voice:+4930123");
        assert_eq!(
            parse_phone_number_iri(&iri),
            Some((
                "+4930123".to_string(),
                vec!["fax".to_string(), "voice".to_string()]
            ))
        );
        assert_eq!(
            make_phone_number_iri("123", &[]),
            "urn:x-maemo-phone:123"
        );
    }

    #[test]
    fn test_phone_number_iri_rejects_malformed() {
        assert_eq!(parse_phone_number_iri("urn:x-maemo-phone:"), None);
        assert_eq!(parse_phone_number_iri("urn:x-maemo-phone:voice:"), None);
        assert_eq!(parse_phone_number_iri("urn:x-maemo-phone:,voice:12"), None);
        assert_eq!(parse_phone_number_iri("tel:12"), None);
    }

    #[test]
    fn test_telepathy_iri() {
        assert_eq!(
            make_telepathy_iri_from_path("/org/acc!alice@example.com").as_deref(),
            Some("telepathy:/org/acc!alice@example.com")
        );
        assert_eq!(
            make_telepathy_iri("/org/acc", None).as_deref(),
            Some("telepathy:/org/acc")
        );
        assert_eq!(make_telepathy_iri("org/acc", None), None);
        assert_eq!(parse_telepathy_iri("telepathy:relative"), None);
        assert_eq!(
            parse_telepathy_iri("telepathy:/org/acc").as_deref(),
            Some("/org/acc")
        );
    }

    #[test]
    fn test_presence_iri_requires_both_parts() {
        assert_eq!(make_presence_iri("/org/acc", ""), None);
        assert_eq!(make_presence_iri_from_path("/org/acc"), None);
        assert_eq!(
            parse_presence_iri("presence:/org/acc!bob"),
            Some(("/org/acc".to_string(), "bob".to_string()))
        );
        assert_eq!(parse_presence_iri("presence:/org/acc!"), None);
        assert_eq!(parse_presence_iri("presence:/org/acc"), None);
    }

    #[test]
    fn test_email_address_iri() {
        assert_eq!(
            SubjectScheme::EmailAddress
                .make_iri(&[Value::from("ada@example.com")])
                .as_deref(),
            Some("mailto:ada@example.com")
        );
        assert_eq!(make_email_address_iri(""), None);
        assert_eq!(parse_email_address_iri("mailto:"), None);
    }

    #[test]
    fn test_anonymous_iri_round_trip() {
        let iri = new_anonymous_iri();
        assert!(iri.starts_with("urn:uuid:"));
        assert!(parse_anonymous_iri(&iri).is_some());
        assert_eq!(parse_anonymous_iri("urn:uuid:not-a-uuid"), None);
    }

    #[test]
    fn test_make_iri_rejects_wrong_arity() {
        let three = [Value::from("1"), Value::Null, Value::Null];
        assert_eq!(SubjectScheme::PhoneNumber.make_iri(&three), None);
        assert_eq!(SubjectScheme::EmailAddress.make_iri(&[]), None);
        assert_eq!(
            SubjectScheme::PhoneNumber
                .make_iri(&[Value::from("123")])
                .as_deref(),
            Some("urn:x-maemo-phone:123")
        );
    }

    #[test]
    fn test_escape_iri() {
        assert_eq!(escape_iri("mailto:a b"), "mailto:a%20b");
        assert_eq!(escape_iri("urn:x:{1}"), "urn:x:%7B1%7D");
        assert_eq!(escape_iri("plain:iri"), "plain:iri");
    }

    #[test]
    fn test_unescape_iri() {
        assert_eq!(unescape_iri("mailto:a%20b"), "mailto:a b");
        assert_eq!(unescape_iri("100%"), "100%");
        assert_eq!(unescape_iri("%zz"), "%zz");
    }
}
