//! Entities handled by the compilers.
//!
//! A [`Contact`] is a bag of [`Detail`]s. A detail is an instance of a named detail
//! definition and maps field names to [`Value`]s. Besides its fields every detail carries
//! an optional detail URI naming the resource it was read from, links to sibling details
//! and the contexts ("Home", "Work") it applies to.

use crate::value::Value;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Name of the field carrying a detail's URI.
pub const FIELD_DETAIL_URI: &str = "DetailUri";
/// Name of the field linking a detail to the URIs of related details.
pub const FIELD_LINKED_DETAIL_URIS: &str = "LinkedDetailUris";
/// Name of the field listing a detail's contexts.
pub const FIELD_CONTEXT: &str = "Context";

/// Context of details describing the contact's private life.
pub const CONTEXT_HOME: &str = "Home";
/// Context of details describing the contact's work life.
pub const CONTEXT_WORK: &str = "Work";

/// Detail holding the contact's durable identity token.
pub const DETAIL_GUID: &str = "Guid";
/// Field of [`DETAIL_GUID`] holding the token.
pub const FIELD_GUID: &str = "Guid";
/// Detail holding the contact's timestamps.
pub const DETAIL_TIMESTAMP: &str = "Timestamp";
/// Creation time of the contact.
pub const FIELD_CREATED: &str = "CreationTimestamp";
/// Time of the last modification.
pub const FIELD_LAST_MODIFIED: &str = "ModificationTimestamp";
/// Time of the last access.
pub const FIELD_ACCESSED: &str = "AccessedTimestamp";
/// Detail naming the source that created the contact.
pub const DETAIL_SYNC_TARGET: &str = "SyncTarget";
/// Field of [`DETAIL_SYNC_TARGET`] holding the source name.
pub const FIELD_SYNC_TARGET: &str = "SyncTarget";

/// Kind of entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ContactType {
    /// A person
    #[default]
    Person,
    /// A group of contacts
    Group,
}

impl fmt::Display for ContactType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContactType::Person => write!(f, "Contact"),
            ContactType::Group => write!(f, "Group"),
        }
    }
}

/// One detail instance.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Detail {
    definition_name: String,
    values: BTreeMap<String, Value>,
    detail_uri: Option<String>,
    linked_detail_uris: Vec<String>,
    contexts: Vec<String>,
    read_only: bool,
}

impl Detail {
    /// Create an empty detail of definition `definition_name`.
    pub fn new(definition_name: impl Into<String>) -> Self {
        Self {
            definition_name: definition_name.into(),
            ..Self::default()
        }
    }

    /// Name of the detail definition.
    pub fn definition_name(&self) -> &str {
        &self.definition_name
    }

    /// Rename the definition, used when a synthesized detail resolves to an implementation.
    pub fn set_definition_name(&mut self, name: impl Into<String>) {
        self.definition_name = name.into();
    }

    /// Set a field value, builder style.
    pub fn with_value(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set_value(field, value);
        self
    }

    /// Set a field value. Null values remove the field.
    pub fn set_value(&mut self, field: impl Into<String>, value: impl Into<Value>) {
        let field = field.into();
        let value = value.into();

        if value.is_null() {
            self.values.remove(&field);
        } else {
            self.values.insert(field, value);
        }
    }

    /// Value of `field`, if set.
    pub fn value(&self, field: &str) -> Option<&Value> {
        self.values.get(field)
    }

    /// Remove and return the value of `field`.
    pub fn remove_value(&mut self, field: &str) -> Option<Value> {
        self.values.remove(field)
    }

    /// All field values by name.
    pub fn values(&self) -> &BTreeMap<String, Value> {
        &self.values
    }

    /// Whether no field other than the link fields carries a value.
    pub fn is_empty(&self) -> bool {
        self.values.values().all(Value::is_empty)
    }

    /// URI of the resource this detail was read from or will be written to.
    pub fn detail_uri(&self) -> Option<&str> {
        self.detail_uri.as_deref()
    }

    /// Set the detail URI.
    pub fn set_detail_uri(&mut self, uri: Option<String>) {
        self.detail_uri = uri.filter(|uri| !uri.is_empty());
    }

    /// Set the detail URI, builder style.
    pub fn with_detail_uri(mut self, uri: impl Into<String>) -> Self {
        self.set_detail_uri(Some(uri.into()));
        self
    }

    /// URIs of related details.
    pub fn linked_detail_uris(&self) -> &[String] {
        &self.linked_detail_uris
    }

    /// Replace the linked detail URIs.
    pub fn set_linked_detail_uris(&mut self, uris: Vec<String>) {
        self.linked_detail_uris = uris;
    }

    /// Link a related detail, ignoring duplicates.
    pub fn add_linked_detail_uri(&mut self, uri: impl Into<String>) {
        let uri = uri.into();
        if !self.linked_detail_uris.contains(&uri) {
            self.linked_detail_uris.push(uri);
        }
    }

    /// Link a related detail, builder style.
    pub fn with_linked_detail_uri(mut self, uri: impl Into<String>) -> Self {
        self.add_linked_detail_uri(uri);
        self
    }

    /// Contexts this detail applies to.
    pub fn contexts(&self) -> &[String] {
        &self.contexts
    }

    /// Replace the contexts.
    pub fn set_contexts(&mut self, contexts: Vec<String>) {
        self.contexts = contexts;
    }

    /// Add a context, builder style.
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        let context = context.into();
        if !self.contexts.contains(&context) {
            self.contexts.push(context);
        }
        self
    }

    /// Whether the detail was read from a graph this store does not own.
    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    /// Mark the detail read-only.
    pub fn set_read_only(&mut self, read_only: bool) {
        self.read_only = read_only;
    }
}

/// A contact or contact group with its details.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Contact {
    /// Store assigned numeric id, zero for contacts not saved yet
    pub local_id: u32,
    /// Kind of entity
    pub contact_type: ContactType,
    /// Details in the order they were added
    pub details: Vec<Detail>,
    /// Local ids of the groups this contact belongs to
    pub groups: Vec<u32>,
    /// Local ids of the members, for groups
    pub members: Vec<u32>,
}

impl Contact {
    /// Create an unsaved contact.
    pub fn new(contact_type: ContactType) -> Self {
        Self {
            contact_type,
            ..Self::default()
        }
    }

    /// Create a contact with a known local id.
    pub fn with_id(local_id: u32, contact_type: ContactType) -> Self {
        Self {
            local_id,
            contact_type,
            ..Self::default()
        }
    }

    /// Add a detail, builder style.
    pub fn with_detail(mut self, detail: Detail) -> Self {
        self.details.push(detail);
        self
    }

    /// Whether the contact has not been saved yet.
    pub fn is_new(&self) -> bool {
        self.local_id == 0
    }

    /// All details of definition `name`.
    pub fn details_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Detail> + 'a {
        self.details
            .iter()
            .filter(move |detail| detail.definition_name() == name)
    }

    /// The first detail of definition `name`.
    pub fn detail(&self, name: &str) -> Option<&Detail> {
        self.details
            .iter()
            .find(|detail| detail.definition_name() == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_null_values_remove_fields() {
        let mut detail = Detail::new("Name").with_value("FirstName", "Ada");
        assert_eq!(detail.value("FirstName"), Some(&Value::from("Ada")));

        detail.set_value("FirstName", Value::Null);
        assert_eq!(detail.value("FirstName"), None);
        assert!(detail.is_empty());
    }

    #[test]
    fn test_links_and_contexts_are_unique() {
        let detail = Detail::new("PhoneNumber")
            .with_linked_detail_uri("telepathy:/a!b")
            .with_linked_detail_uri("telepathy:/a!b")
            .with_context(CONTEXT_WORK)
            .with_context(CONTEXT_WORK);

        assert_eq!(detail.linked_detail_uris().len(), 1);
        assert_eq!(detail.contexts(), [CONTEXT_WORK.to_string()]);
        assert!(detail.is_empty());
    }

    #[test]
    fn test_empty_detail_uri_is_unset() {
        let mut detail = Detail::new("EmailAddress");
        detail.set_detail_uri(Some(String::new()));
        assert_eq!(detail.detail_uri(), None);
    }

    #[test]
    fn test_detail_outlives_lookup_name() {
        let contact = Contact::new(ContactType::Person)
            .with_detail(Detail::new("Note").with_value("Note", "hi"));

        let note = {
            let name = String::from("Note");
            contact.detail(&name)
        };

        assert_eq!(note.and_then(|d| d.value("Note")), Some(&Value::from("hi")));
    }

    #[test]
    fn test_contact_detail_lookup() {
        let contact = Contact::new(ContactType::Person)
            .with_detail(Detail::new("Tag").with_value("Tag", "Work"))
            .with_detail(Detail::new("Tag").with_value("Tag", "Family"))
            .with_detail(Detail::new("Note").with_value("Note", "hi"));

        assert!(contact.is_new());
        assert_eq!(contact.details_named("Tag").count(), 2);
        assert_eq!(
            contact.detail("Note").and_then(|d| d.value("Note")),
            Some(&Value::from("hi"))
        );
    }
}
