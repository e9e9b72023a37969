//! Tests for the stock person and group schemas

use contactgraph::config::{AvatarType, Settings};
use contactgraph::model::ContactType;
use contactgraph::vocab::nco;
use contactgraph_nco::{group_schema, person_schema, schema_for};

// ====================
// Person Schema
// ====================

#[test]
fn test_person_schema_builds() {
    let schema = person_schema(&Settings::default()).unwrap();

    assert_eq!(schema.contact_type(), ContactType::Person);
    assert!(schema.is_context_supported());

    for name in [
        "Address",
        "Anniversary",
        "Avatar",
        "Birthday",
        "EmailAddress",
        "Gender",
        "GeoLocation",
        "GlobalPresence",
        "Guid",
        "Hobby",
        "Name",
        "Nickname",
        "Note",
        "OnlineAccount",
        "Organization",
        "PhoneNumber",
        "Presence",
        "Relevance",
        "Ringtone",
        "SyncTarget",
        "Tag",
        "Timestamp",
        "Url",
    ] {
        assert!(schema.detail(name).is_some(), "missing detail {name}");
    }
}

#[test]
fn test_avatar_implementations_follow_settings() {
    let schema = person_schema(&Settings::default()).unwrap();
    let avatar = schema.detail("Avatar").unwrap();

    assert_eq!(avatar.dependencies, vec!["PersonalAvatar", "OnlineAvatar"]);
    assert!(schema.detail("PersonalAvatar").is_some());
    assert!(schema.detail("OnlineAvatar").is_some());
    assert!(schema.detail("SocialAvatar").is_none());

    let device = person_schema(&Settings::device()).unwrap();
    assert_eq!(device.detail("Avatar").unwrap().dependencies.len(), 3);
    assert!(device.detail("SocialAvatar").is_some());

    let minimal = person_schema(&Settings::minimal()).unwrap();
    assert!(minimal.detail("Avatar").is_none());
    assert!(minimal.detail("PersonalAvatar").is_none());
}

#[test]
fn test_only_social_avatars() {
    let settings = Settings::default().with_avatar_types(vec![AvatarType::Social]);
    let schema = person_schema(&settings).unwrap();

    assert_eq!(schema.detail("Avatar").unwrap().dependencies, vec!["SocialAvatar"]);
}

#[test]
fn test_schema_from_json_settings() {
    let json = serde_json::json!({
        "write_back_presence": true,
        "avatar_types": ["personal"],
    });
    let settings: Settings = serde_json::from_value(json).unwrap();
    let schema = person_schema(&settings).unwrap();

    assert_eq!(schema.detail("Avatar").unwrap().dependencies, vec!["PersonalAvatar"]);
    assert!(schema.detail("OnlineAvatar").is_none());
    assert!(!schema.detail("Presence").unwrap().field("Nickname").unwrap().is_read_only());
}

#[test]
fn test_internal_details_are_not_described() {
    let schema = person_schema(&Settings::default()).unwrap();
    let definitions = schema.definitions();

    assert!(definitions.contains_key("Avatar"));
    assert!(definitions.contains_key("Name"));
    assert!(!definitions.contains_key("PersonalAvatar"));
    assert!(!definitions.contains_key("OnlineAvatar"));
}

#[test]
fn test_presence_write_back() {
    let schema = person_schema(&Settings::default()).unwrap();
    let presence = schema.detail("Presence").unwrap();
    assert!(presence.field("Nickname").unwrap().is_read_only());

    let schema = person_schema(&Settings::default().with_write_back_presence(true)).unwrap();
    let presence = schema.detail("Presence").unwrap();
    assert!(!presence.field("Nickname").unwrap().is_read_only());
}

#[test]
fn test_account_uri_stays_writable() {
    let schema = person_schema(&Settings::default()).unwrap();
    let account = schema.detail("OnlineAccount").unwrap();

    assert!(!account.field("AccountUri").unwrap().is_read_only());
    assert!(account.field("ServiceProvider").unwrap().is_read_only());
}

#[test]
fn test_unique_details() {
    let schema = person_schema(&Settings::default()).unwrap();

    for name in ["Name", "Birthday", "Gender", "GeoLocation", "Guid", "Timestamp"] {
        assert!(schema.detail(name).unwrap().is_unique, "{name} should be unique");
    }
    for name in ["PhoneNumber", "EmailAddress", "Hobby", "Tag", "Url"] {
        assert!(!schema.detail(name).unwrap().is_unique, "{name} should repeat");
    }
}

#[test]
fn test_contexts_on_person_details() {
    let schema = person_schema(&Settings::default()).unwrap();

    assert!(schema.detail("PhoneNumber").unwrap().has_context);
    assert!(schema.detail("Address").unwrap().has_context);
    assert!(!schema.detail("Note").unwrap().has_context);
    assert!(!schema.detail("Organization").unwrap().has_context);
}

#[test]
fn test_timestamps_read_only_except_accessed() {
    let schema = person_schema(&Settings::default()).unwrap();
    let timestamp = schema.detail("Timestamp").unwrap();

    assert!(timestamp.field("CreationTimestamp").unwrap().is_read_only());
    assert!(timestamp.field("ModificationTimestamp").unwrap().is_read_only());
    assert!(!timestamp.field("AccessedTimestamp").unwrap().is_read_only());
}

// ====================
// Group Schema
// ====================

#[test]
fn test_group_schema_builds() {
    let schema = group_schema(&Settings::default()).unwrap();

    assert_eq!(schema.contact_type(), ContactType::Group);
    assert!(!schema.is_context_supported());
    assert!(schema.detail("Name").is_none());
    assert!(schema.detail("Gender").is_none());
    assert!(schema.detail("Ringtone").is_some());
    assert!(!schema.detail("PhoneNumber").unwrap().has_context);
}

#[test]
fn test_group_nickname_uses_group_name() {
    let schema = group_schema(&Settings::default()).unwrap();
    let nickname = schema.detail("Nickname").unwrap().field("Nickname").unwrap();

    assert_eq!(nickname.property_chain.iris(), vec![nco::CONTACT_GROUP_NAME]);
    assert!(nickname.is_original);
}

#[test]
fn test_schema_for_contact_type() {
    let settings = Settings::default();

    assert_eq!(
        schema_for(ContactType::Group, &settings).unwrap().contact_type(),
        ContactType::Group
    );
    assert_eq!(
        schema_for(ContactType::Person, &settings).unwrap().contact_type(),
        ContactType::Person
    );
}
