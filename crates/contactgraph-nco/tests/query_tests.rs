//! End-to-end compilation against the stock schemas

use chrono::DateTime;
use contactgraph::fetch::{compile_contact_ids, compile_fetch, FetchRequest};
use contactgraph::model::{Contact, ContactType, Detail, CONTEXT_HOME};
use contactgraph::remove::compile_remove;
use contactgraph::request::{FetchHint, SortOrder};
use contactgraph::save::{compile_save, SaveRequest};
use contactgraph::Settings;
use contactgraph_nco::{group_schema, person_schema};

fn timestamp() -> chrono::DateTime<chrono::FixedOffset> {
    DateTime::parse_from_rfc3339("2011-03-01T12:00:00+00:00").unwrap()
}

// ====================
// Fetch
// ====================

#[test]
fn test_fetch_everything_from_person_schema() {
    let settings = Settings::default();
    let schema = person_schema(&settings).unwrap();

    let sparql = compile_fetch(&schema, &FetchRequest::new(), &settings)
        .unwrap()
        .to_sparql();

    assert!(sparql.starts_with("SELECT ?contact"));
    assert!(sparql.contains("nco:nameGiven"));
    assert!(sparql.contains("nco:phoneNumber"));
    assert!(sparql.contains("nco:emailAddress"));
    assert!(sparql.contains("nco:PersonContact"));
}

#[test]
fn test_fetch_with_device_settings() {
    let settings = Settings::device();
    let schema = person_schema(&settings).unwrap();

    assert!(compile_fetch(&schema, &FetchRequest::new(), &settings).is_ok());
}

#[test]
fn test_fetch_only_names() {
    let settings = Settings::default();
    let schema = person_schema(&settings).unwrap();
    let request = FetchRequest::new().with_hint(FetchHint::details(["Name"]));

    let sparql = compile_fetch(&schema, &request, &settings).unwrap().to_sparql();

    assert!(sparql.contains("nco:nameFamily"));
    assert!(!sparql.contains("nco:phoneNumber"));
}

#[test]
fn test_fetch_groups() {
    let settings = Settings::default();
    let schema = group_schema(&settings).unwrap();

    let sparql = compile_fetch(&schema, &FetchRequest::new(), &settings)
        .unwrap()
        .to_sparql();

    assert!(sparql.contains("nco:ContactGroup"));
    assert!(sparql.contains("nco:contactGroupName"));
    assert!(!sparql.contains("nco:nameGiven"));
}

#[test]
fn test_contact_ids_sorted_by_synthesized_field_is_not_supported() {
    let settings = Settings::default();
    let persons = person_schema(&settings).unwrap();
    let groups = group_schema(&settings).unwrap();

    for order in [
        SortOrder::new("SyncTarget", "SyncTarget"),
        SortOrder::new("GlobalPresence", "Nickname"),
    ] {
        let request = FetchRequest::new().sort_by(order);

        let err = compile_contact_ids(&[&persons], &request, &settings).unwrap_err();
        assert!(err.is_not_supported(), "{err}");

        let err = compile_contact_ids(&[&persons, &groups], &request, &settings).unwrap_err();
        assert!(err.is_not_supported(), "{err}");

        // The same order on a full fetch is left to the caller.
        let query = compile_fetch(&persons, &request, &settings).unwrap();
        assert!(!query.sorted);
    }
}

#[test]
fn test_contact_ids_sorted_by_name() {
    let settings = Settings::default();
    let persons = person_schema(&settings).unwrap();
    let request = FetchRequest::new().sort_by(SortOrder::new("Name", "LastName"));

    let sparql = compile_contact_ids(&[&persons], &request, &settings).unwrap().to_string();
    assert!(sparql.contains("ORDER BY"));
    assert!(sparql.contains("nco:nameFamily"));
}

// ====================
// Save
// ====================

#[test]
fn test_save_new_person() {
    let settings = Settings::default();
    let schema = person_schema(&settings).unwrap();
    let contact = Contact::new(ContactType::Person)
        .with_detail(
            Detail::new("Name")
                .with_value("FirstName", "Ada")
                .with_value("LastName", "Lovelace"),
        )
        .with_detail(
            Detail::new("PhoneNumber")
                .with_value("PhoneNumber", "+44 20 7946 0000")
                .with_value("SubTypes", vec!["Mobile"])
                .with_context(CONTEXT_HOME),
        )
        .with_detail(Detail::new("EmailAddress").with_value("EmailAddress", "ada@example.org"));

    let request = SaveRequest::new(contact).with_timestamp(timestamp());
    let sparql = compile_save(&schema, &request, &settings).unwrap().to_sparql();

    assert!(sparql.starts_with("INSERT {"));
    assert!(sparql.contains("nco:nameGiven \"Ada\""));
    assert!(sparql.contains("nco:nameFamily \"Lovelace\""));
    assert!(sparql.contains("urn:x-maemo-phone:"));
    assert!(sparql.contains("nco:CellPhoneNumber"));
    assert!(sparql.contains("maemo:localPhoneNumber"));
    assert!(sparql.contains("ada@example.org"));
    assert!(sparql.contains("nie:generator \"addressbook\""));
}

#[test]
fn test_save_new_group() {
    let settings = Settings::default();
    let schema = group_schema(&settings).unwrap();
    let contact = Contact::new(ContactType::Group)
        .with_detail(Detail::new("Nickname").with_value("Nickname", "Family"));

    let request = SaveRequest::new(contact).with_timestamp(timestamp());
    let sparql = compile_save(&schema, &request, &settings).unwrap().to_sparql();

    assert!(sparql.contains("nco:ContactGroup"));
    assert!(sparql.contains("nco:contactGroupName \"Family\""));
}

#[test]
fn test_person_does_not_save_as_group() {
    let settings = Settings::default();
    let schema = group_schema(&settings).unwrap();
    let contact = Contact::new(ContactType::Person);

    assert!(compile_save(&schema, &SaveRequest::new(contact), &settings).is_err());
}

// ====================
// Remove
// ====================

#[test]
fn test_remove_contacts() {
    let sparql = compile_remove(&[7, 8], &Settings::default()).unwrap().to_string();

    assert!(sparql.contains("tracker:id(?contact) IN (7, 8)"));
}
