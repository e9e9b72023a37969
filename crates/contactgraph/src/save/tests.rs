use super::*;
use crate::fetch::tests::fixture_schema;
use crate::model::{ContactType, Detail};
use crate::resource::PropertyDescriptor;
use crate::schema::{DetailDefinition, FieldDefinition};
use crate::vocab::{nao, nco, rdfs, xsd};

struct FixedGuid;

impl GuidAlgorithm for FixedGuid {
    fn make_guid(&self, _contact: &Contact) -> String {
        "guid-1".to_string()
    }
}

fn tag_detail() -> DetailDefinition {
    DetailDefinition::new("Tag").with_field(FieldDefinition::new("Tag").with_chain(vec![
        PropertyDescriptor::new(nao::HAS_TAG, rdfs::RESOURCE, nao::TAG)
            .multi_valued()
            .has_detail_uri(),
        PropertyDescriptor::new(nao::PREF_LABEL, nao::TAG, xsd::STRING)
            .foreign_key()
            .case_insensitive(),
    ]))
}

fn email_detail() -> DetailDefinition {
    DetailDefinition::new("EmailAddress").with_context().with_field(
        FieldDefinition::new("EmailAddress").with_chain(vec![
            PropertyDescriptor::new(nco::HAS_EMAIL_ADDRESS, nco::ROLE, nco::EMAIL_ADDRESS)
                .multi_valued()
                .has_detail_uri()
                .defines_ownership(),
            PropertyDescriptor::new(nco::EMAIL_ADDRESS_PROPERTY, nco::EMAIL_ADDRESS, xsd::STRING)
                .foreign_key(),
        ]),
    )
}

fn schema() -> Schema {
    fixture_schema()
        .with_detail(tag_detail())
        .and_then(|schema| schema.with_detail(email_detail()))
        .expect("tag and email details are valid")
}

fn request(contact: Contact) -> SaveRequest {
    let timestamp = DateTime::parse_from_rfc3339("2011-03-01T12:00:00+00:00").unwrap();
    SaveRequest::new(contact).with_timestamp(timestamp)
}

fn compile(request: &SaveRequest) -> Result<SaveQuery> {
    let schema = schema();
    let settings = Settings::default();
    SaveCompiler::new(&schema, &settings)
        .with_guid_algorithm(&FixedGuid)
        .compile(request)
}

fn sparql(request: &SaveRequest) -> String {
    compile(request).unwrap().to_sparql()
}

fn phone(number: &str) -> Detail {
    Detail::new("PhoneNumber").with_value("PhoneNumber", number)
}

fn operations(sparql: &str) -> Vec<&str> {
    sparql.split("\n\n").collect()
}

fn operation_with<'q>(sparql: &'q str, needle: &str) -> &'q str {
    operations(sparql)
        .into_iter()
        .find(|operation| operation.contains(needle))
        .unwrap_or_else(|| panic!("no operation containing {needle:?}"))
}

#[test]
fn test_new_contact_gets_iri_and_stamps() {
    let contact = Contact::new(ContactType::Person)
        .with_detail(Detail::new("Name").with_value("FirstName", "Ada"));
    let query = compile(&request(contact)).unwrap();
    let sparql = query.to_sparql();

    assert!(query.contact_iri.starts_with("urn:uuid:"));
    assert_eq!(query.guid, "guid-1");
    assert_eq!(query.sync_target, "addressbook");

    let contact = format!("<{}>", query.contact_iri);
    assert!(sparql.starts_with("INSERT {"));
    assert!(sparql.contains(&format!("{contact} a nco:PersonContact .")));
    assert!(sparql.contains(&format!("{contact} nco:nameGiven \"Ada\" .")));
    assert!(sparql.contains(&format!("{contact} nco:contactUID \"guid-1\" .")));
    assert!(sparql.contains(&format!("{contact} nie:generator \"addressbook\" .")));
    assert!(sparql.contains(
        "nie:contentLastModified \"2011-03-01T12:00:00+00:00\"^^xsd:dateTime ."
    ));
    assert!(sparql.contains("nie:contentCreated \"2011-03-01T12:00:00+00:00\"^^xsd:dateTime ."));
    assert!(!sparql.contains("DELETE"));
    assert!(!sparql.contains("INSERT OR REPLACE"));
}

#[test]
fn test_existing_contact_needs_iri() {
    let err = compile(&request(Contact::with_id(7, ContactType::Person))).unwrap_err();
    assert!(matches!(err, CompileError::BadArgument { .. }));
}

#[test]
fn test_contact_type_must_match_schema() {
    let err = compile(&request(Contact::new(ContactType::Group))).unwrap_err();
    assert!(matches!(err, CompileError::BadArgument { .. }));
}

#[test]
fn test_full_save_of_existing_contact() {
    let contact = Contact::with_id(7, ContactType::Person)
        .with_detail(Detail::new("Name").with_value("FirstName", "Ada"));
    let request = request(contact).with_contact_iri("urn:contact:7");
    let sparql = sparql(&request);

    assert!(sparql.starts_with("DELETE {"));
    assert!(sparql.contains("<urn:contact:7> ?predicate ?object ."));
    assert!(sparql.contains(
        "FILTER(!(?predicate IN (rdf:type, nco:belongsToGroup, nco:contactUID, nie:contentCreated)))"
    ));

    // Identity and creation time survive through guarded inserts.
    assert!(sparql.contains("FILTER(!(EXISTS {"));
    let main = sparql
        .split("\n\n")
        .find(|operation| operation.contains("<urn:contact:7> a nco:PersonContact ."))
        .expect("main insert");
    assert!(main.starts_with("INSERT {"));
    assert!(!main.contains("nie:generator"));

    assert!(sparql.contains("INSERT OR REPLACE {"));
    assert!(sparql.contains(
        "FILTER(tracker:coalesce(nie:generator(<urn:contact:7>), \"\") IN (\"\", \"telepathy\"))"
    ));
}

#[test]
fn test_given_identity_is_rewritten() {
    let contact = Contact::with_id(7, ContactType::Person)
        .with_detail(Detail::new(DETAIL_GUID).with_value(FIELD_GUID, "abc"));
    let query = compile(&request(contact).with_contact_iri("urn:contact:7")).unwrap();
    let sparql = query.to_sparql();

    assert_eq!(query.guid, "abc");
    assert!(sparql.contains("FILTER(!(?predicate IN (rdf:type, nco:belongsToGroup, nie:contentCreated)))"));
    assert!(sparql.contains("<urn:contact:7> nco:contactUID \"abc\" ."));
}

#[test]
fn test_strong_sync_target_replaces_generator() {
    let contact = Contact::with_id(7, ContactType::Person)
        .with_detail(Detail::new(DETAIL_SYNC_TARGET).with_value(FIELD_SYNC_TARGET, "mfe"));
    let query = compile(&request(contact).with_contact_iri("urn:contact:7")).unwrap();
    let sparql = query.to_sparql();

    assert_eq!(query.sync_target, "mfe");
    assert!(sparql.ends_with(
        "INSERT OR REPLACE {\n  GRAPH <urn:uuid:08070f5c-a334-4d19-a8b0-12a3071bfab9> {\n    <urn:contact:7> nie:generator \"mfe\" .\n  }\n}"
    ));
}

#[test]
fn test_weak_sync_target_falls_back_to_default() {
    let contact = Contact::new(ContactType::Person)
        .with_detail(Detail::new(DETAIL_SYNC_TARGET).with_value(FIELD_SYNC_TARGET, "telepathy"));
    let query = compile(&request(contact)).unwrap();

    assert_eq!(query.sync_target, "addressbook");
}

#[test]
fn test_phone_number_with_context_and_custom_sub_type() {
    let contact = Contact::new(ContactType::Person).with_detail(
        phone("555")
            .with_value("SubTypes", vec!["Mobile", "Landline"])
            .with_context("Home"),
    );
    let sparql = sparql(&request(contact).with_contact_iri("urn:contact:1"));

    // The content addressed resource is pruned before it is written again.
    assert!(sparql.contains("<urn:x-maemo-phone:555> ?predicate ?object ."));
    assert!(sparql.contains("FILTER(?resource IN (<urn:x-maemo-phone:555>))"));

    assert!(sparql.contains("_:Affiliation_Home1 a nco:Affiliation ."));
    assert!(sparql.contains("_:Affiliation_Home1 rdfs:label \"Home\" ."));
    assert!(sparql.contains("<urn:contact:1> nco:hasAffiliation _:Affiliation_Home1 ."));
    assert!(sparql.contains("_:Affiliation_Home1 nco:hasPhoneNumber <urn:x-maemo-phone:555> ."));
    assert!(sparql.contains("<urn:x-maemo-phone:555> a nco:PhoneNumber ."));
    assert!(sparql.contains("<urn:x-maemo-phone:555> a nco:CellPhoneNumber ."));
    assert!(sparql.contains("<urn:x-maemo-phone:555> nco:phoneNumber \"555\" ."));
    assert!(sparql.contains("maemo:localPhoneNumber \"555\" ."));

    assert!(sparql.contains("<urn:x-maemo-phone:555> nao:hasProperty _:PhoneNumber_SubTypes2 ."));
    assert!(sparql.contains("_:PhoneNumber_SubTypes2 nao:propertyValue \"Landline\" ."));
    assert!(!sparql.contains("nao:propertyValue \"Mobile\""));
}

#[test]
fn test_phone_number_without_sub_types_uses_default_class() {
    let contact = Contact::new(ContactType::Person).with_detail(phone("555"));
    let sparql = sparql(&request(contact).with_contact_iri("urn:contact:1"));

    assert!(sparql.contains("<urn:x-maemo-phone:555> a nco:VoicePhoneNumber ."));
    assert!(!sparql.contains("nao:propertyValue"));
}

#[test]
fn test_tag_is_shared_by_key() {
    let contact =
        Contact::new(ContactType::Person).with_detail(Detail::new("Tag").with_value("Tag", "Friends"));
    let sparql = sparql(&request(contact).with_contact_iri("urn:contact:1"));

    let create = sparql
        .split("\n\n")
        .find(|operation| operation.contains("_:_ a nao:Tag ."))
        .expect("tag insert");
    assert!(create.contains("_:_ nao:prefLabel \"Friends\" ."));
    assert!(create.contains("FILTER(!(EXISTS {"));
    assert!(create.contains("?resource nao:prefLabel ?value ."));
    assert!(create.contains("fn:lower-case(\"Friends\") = fn:lower-case(?value)"));

    assert!(sparql.contains("<urn:contact:1> nao:hasTag ?Tag_Resource1 ."));
    assert!(sparql.contains("?Tag_Resource1 nao:prefLabel ?_1 ."));
    assert!(sparql.contains("fn:lower-case(?_1) = fn:lower-case(\"Friends\")"));
}

#[test]
fn test_masked_save_only_touches_masked_details() {
    let contact = Contact::with_id(7, ContactType::Person)
        .with_detail(Detail::new("Name").with_value("FirstName", "Ada"))
        .with_detail(phone("555"));
    let request = request(contact)
        .with_contact_iri("urn:contact:7")
        .with_definition_mask(["PhoneNumber", "Hobby"]);
    let sparql = sparql(&request);

    assert!(!sparql.contains("FILTER(!(?predicate IN"));
    assert!(sparql.contains("FILTER(?predicate IN (nie:contentLastModified))"));
    assert!(sparql.contains("<urn:contact:7> nco:hasAffiliation ?context ."));
    assert!(sparql.contains("?context nco:hasPhoneNumber ?object ."));
    assert!(sparql.contains("FILTER(?propertyName IN (\"Hobby\"))"));

    assert!(sparql.contains("nco:phoneNumber \"555\" ."));
    assert!(!sparql.contains("nco:nameGiven"));
}

#[test]
fn test_mask_is_ignored_for_new_contacts() {
    let contact = Contact::new(ContactType::Person)
        .with_detail(Detail::new("Name").with_value("FirstName", "Ada"));
    let request = request(contact).with_definition_mask(["PhoneNumber"]);

    assert!(!request.is_partial());
    assert!(sparql(&request).contains("nco:nameGiven \"Ada\" ."));
}

#[test]
fn test_custom_detail_is_stored_as_property() {
    let contact = Contact::new(ContactType::Person)
        .with_detail(Detail::new("Hobby").with_value("Kind", "Chess"));
    let sparql = sparql(&request(contact).with_contact_iri("urn:contact:1"));

    assert!(sparql.contains("<urn:contact:1> nao:hasProperty _:Hobby1 ."));
    assert!(sparql.contains("_:Hobby1 a nao:Property ."));
    assert!(sparql.contains("_:Hobby1 nao:propertyName \"Hobby\" ."));
    assert!(sparql.contains("_:Hobby1 nao:hasProperty _:Hobby_Kind2 ."));
    assert!(sparql.contains("_:Hobby_Kind2 nao:propertyName \"Kind\" ."));
    assert!(sparql.contains("_:Hobby_Kind2 nao:propertyValue \"Chess\" ."));
}

#[test]
fn test_unconvertible_value_drops_field() {
    let contact = Contact::new(ContactType::Person)
        .with_detail(Detail::new("Birthday").with_value("Birthday", "yesterday"))
        .with_detail(Detail::new("Name").with_value("FirstName", "Ada"));
    let sparql = sparql(&request(contact).with_contact_iri("urn:contact:1"));

    assert!(!sparql.contains("nco:birthDate"));
    assert!(sparql.contains("nco:nameGiven \"Ada\" ."));
}

#[test]
fn test_dangling_link_rejects_contact() {
    let contact = Contact::new(ContactType::Person)
        .with_detail(phone("555").with_linked_detail_uri("urn:x-maemo-phone:404"));
    let err = compile(&request(contact)).unwrap_err();

    assert!(matches!(err, CompileError::InvalidDetail { ref detail, .. } if detail == "PhoneNumber"));
}

#[test]
fn test_value_with_result_separator_drops_field() {
    let contact = Contact::new(ContactType::Person).with_detail(
        Detail::new("Name")
            .with_value("FirstName", "Ada\u{1f}Evil")
            .with_value("LastName", "Lovelace"),
    );
    let sparql = sparql(&request(contact).with_contact_iri("urn:contact:1"));

    assert!(!sparql.contains("nco:nameGiven"));
    assert!(!sparql.contains("Evil"));
    assert!(sparql.contains("<urn:contact:1> nco:nameFamily \"Lovelace\" ."));
}

#[test]
fn test_foreign_key_with_result_separator_is_not_created() {
    let contact = Contact::new(ContactType::Person)
        .with_detail(Detail::new("Tag").with_value("Tag", "Work\u{1e}Home"))
        .with_detail(Detail::new("Tag").with_value("Tag", "Friends"));
    let sparql = sparql(&request(contact).with_contact_iri("urn:contact:1"));

    assert!(!sparql.contains("Work"));
    assert!(sparql.contains("_:_ nao:prefLabel \"Friends\" ."));
}

#[test]
fn test_custom_sub_type_with_result_separator_is_dropped() {
    let contact = Contact::new(ContactType::Person)
        .with_detail(phone("555").with_value("SubTypes", vec!["Mobile", "Land\u{1d}line", "Car"]));
    let sparql = sparql(&request(contact).with_contact_iri("urn:contact:1"));

    assert!(sparql.contains("nao:propertyValue \"Car\" ."));
    assert!(!sparql.contains("Land"));
}

#[test]
fn test_empty_value_is_not_written() {
    let contact = Contact::new(ContactType::Person).with_detail(
        Detail::new("Name")
            .with_value("FirstName", "")
            .with_value("LastName", "Lovelace"),
    );
    let sparql = sparql(&request(contact).with_contact_iri("urn:contact:1"));

    assert!(!sparql.contains("nco:nameGiven"));
    assert!(sparql.contains("<urn:contact:1> nco:nameFamily \"Lovelace\" ."));
}

#[test]
fn test_foreign_keys_converge_across_contacts() {
    let first = Contact::new(ContactType::Person)
        .with_detail(Detail::new("Tag").with_value("Tag", "Work"))
        .with_detail(Detail::new("EmailAddress").with_value("EmailAddress", "ada@example.org"));
    let second = Contact::new(ContactType::Person)
        .with_detail(Detail::new("Tag").with_value("Tag", "work"))
        .with_detail(Detail::new("EmailAddress").with_value("EmailAddress", "ada@example.org"));

    let first = sparql(&request(first).with_contact_iri("urn:contact:1"));
    let second = sparql(&request(second).with_contact_iri("urn:contact:2"));

    // Both saves create the tag only when no label matches case-insensitively, so
    // whichever runs second reuses the tag of the first.
    let first_tag = operation_with(&first, "_:_ a nao:Tag .");
    let second_tag = operation_with(&second, "_:_ a nao:Tag .");
    assert!(first_tag.contains("fn:lower-case(\"Work\") = fn:lower-case(?value)"));
    assert!(second_tag.contains("fn:lower-case(\"work\") = fn:lower-case(?value)"));
    assert_ne!(first_tag, second_tag);
    assert_eq!(first_tag.to_lowercase(), second_tag.to_lowercase());

    assert!(first.contains("fn:lower-case(?_1) = fn:lower-case(\"Work\")"));
    assert!(second.contains("fn:lower-case(?_1) = fn:lower-case(\"work\")"));

    // The email address is content addressed, so both saves name the same resource.
    let first_email = operation_with(&first, "<mailto:ada@example.org> a nco:EmailAddress .");
    let second_email = operation_with(&second, "<mailto:ada@example.org> a nco:EmailAddress .");
    assert_eq!(first_email, second_email);
    assert!(first_email.contains("<mailto:ada@example.org> nco:emailAddress \"ada@example.org\" ."));
    assert!(first_email.contains("FILTER(!(EXISTS {"));
    assert!(first_email.contains("?resource nco:emailAddress \"ada@example.org\" ."));
}

#[test]
fn test_repeated_save_compiles_identically() {
    let contact = Contact::with_id(7, ContactType::Person)
        .with_detail(
            Detail::new("Name")
                .with_value("FirstName", "Ada")
                .with_value("LastName", "Lovelace"),
        )
        .with_detail(
            phone("+44 20 7946 0000")
                .with_value("SubTypes", vec!["Mobile", "Landline"])
                .with_context("Work"),
        )
        .with_detail(Detail::new("EmailAddress").with_value("EmailAddress", "ada@example.org"))
        .with_detail(Detail::new("Tag").with_value("Tag", "Friends"));
    let request = request(contact).with_contact_iri("urn:contact:7");

    let first = compile(&request).unwrap();
    let second = compile(&request).unwrap();

    assert_eq!(first.contact_iri, second.contact_iri);
    assert_eq!(first.guid, second.guid);
    assert_eq!(first.to_sparql(), second.to_sparql());
    assert!(first.to_sparql().contains("<urn:x-maemo-phone:"));
}

#[test]
fn test_masked_save_keeps_predicates_outside_mask() {
    let contact = Contact::with_id(7, ContactType::Person)
        .with_detail(Detail::new(DETAIL_GUID).with_value(FIELD_GUID, "abc"))
        .with_detail(Detail::new("Name").with_value("FirstName", "Ada"))
        .with_detail(phone("555"));
    let request = request(contact)
        .with_contact_iri("urn:contact:7")
        .with_definition_mask(["PhoneNumber"]);
    let sparql = sparql(&request);

    let deletions: Vec<&str> = operations(&sparql)
        .into_iter()
        .filter(|operation| operation.starts_with("DELETE"))
        .collect();
    assert!(!deletions.is_empty());

    for deletion in &deletions {
        assert!(!deletion.contains("nco:contactUID"), "{deletion}");
        assert!(!deletion.contains("nie:contentCreated"), "{deletion}");
        assert!(!deletion.contains("nco:nameGiven"), "{deletion}");
        assert!(!deletion.contains("FILTER(!(?predicate IN"), "{deletion}");
    }

    let on_contact = operation_with(&sparql, "<urn:contact:7> ?predicate ?object .");
    assert!(on_contact.contains("FILTER(?predicate IN (nie:contentLastModified))"));
}
