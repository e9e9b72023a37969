//! Details only person contacts carry.

use contactgraph::conversion::Conversion;
use contactgraph::resource::{InstanceDescriptor, PropertyDescriptor};
use contactgraph::schema::{DetailDefinition, FieldDefinition};
use contactgraph::value::ValueType;
use contactgraph::vocab::{maemo, nco, nfo, nie, xsd};

use crate::common::{contact_string, file_url};

pub(crate) fn details() -> Vec<DetailDefinition> {
    vec![gender(), hobby(), name(), nickname(), organization(), ringtone()]
}

fn gender() -> DetailDefinition {
    DetailDefinition::new("Gender").unique().with_field(
        FieldDefinition::new("Gender")
            .with_default("Unspecified")
            .with_chain(vec![PropertyDescriptor::new(
                nco::GENDER_PROPERTY,
                nco::PERSON_CONTACT,
                nco::GENDER,
            )])
            .with_allowable_instances(vec![
                InstanceDescriptor::new(nco::GENDER_FEMALE, "Female"),
                InstanceDescriptor::new(nco::GENDER_MALE, "Male"),
                InstanceDescriptor::new(nco::GENDER_OTHER, "Unspecified"),
            ]),
    )
}

fn hobby() -> DetailDefinition {
    DetailDefinition::new("Hobby").with_field(FieldDefinition::new("Hobby").with_chain(vec![
        PropertyDescriptor::new(nco::HOBBY, nco::CONTACT, xsd::STRING).multi_valued(),
    ]))
}

fn name() -> DetailDefinition {
    DetailDefinition::new("Name")
        .unique()
        .with_field(contact_string("Prefix", nco::NAME_HONORIFIC_PREFIX, nco::PERSON_CONTACT))
        .with_field(contact_string("FirstName", nco::NAME_GIVEN, nco::PERSON_CONTACT))
        .with_field(contact_string("MiddleName", nco::NAME_ADDITIONAL, nco::PERSON_CONTACT))
        .with_field(contact_string("LastName", nco::NAME_FAMILY, nco::PERSON_CONTACT))
        .with_field(contact_string("Suffix", nco::NAME_HONORIFIC_SUFFIX, nco::PERSON_CONTACT))
        .with_field(contact_string("CustomLabel", nco::FULLNAME, nco::CONTACT))
}

fn nickname() -> DetailDefinition {
    DetailDefinition::new("Nickname").with_field(
        FieldDefinition::new("Nickname")
            .with_chain(vec![
                PropertyDescriptor::new(nco::NICKNAME, nco::CONTACT, xsd::STRING).multi_valued()
            ])
            .original(),
    )
}

fn organization() -> DetailDefinition {
    let has_affiliation = || {
        PropertyDescriptor::new(nco::HAS_AFFILIATION, nco::PERSON_CONTACT, nco::AFFILIATION)
            .multi_valued()
    };
    let org = || PropertyDescriptor::new(nco::ORG, nco::AFFILIATION, nco::ORGANIZATION_CONTACT);
    let affiliation_string = |name: &str, iri: &str| {
        FieldDefinition::new(name).with_chain(vec![
            has_affiliation(),
            PropertyDescriptor::new(iri, nco::AFFILIATION, xsd::STRING),
        ])
    };

    DetailDefinition::new("Organization")
        .with_field(FieldDefinition::new("Department").with_chain(vec![
            has_affiliation().has_detail_uri(),
            PropertyDescriptor::new(nco::DEPARTMENT, nco::AFFILIATION, xsd::STRING),
        ]))
        .with_field(affiliation_string("Title", nco::TITLE))
        .with_field(affiliation_string("Role", nco::ROLE_PROPERTY))
        .with_field(FieldDefinition::new("Location").with_chain(vec![
            has_affiliation(),
            org(),
            PropertyDescriptor::new(nco::HAS_POSTAL_ADDRESS, nco::ROLE, nco::POSTAL_ADDRESS),
            PropertyDescriptor::new(nco::LOCALITY, nco::POSTAL_ADDRESS, xsd::STRING),
        ]))
        .with_field(
            FieldDefinition::new("LogoUrl")
                .with_type(ValueType::Url)
                .with_conversion(Conversion::UriAsForeignKey)
                .with_chain(vec![
                    has_affiliation(),
                    org(),
                    PropertyDescriptor::new(nco::LOGO, nco::CONTACT, nfo::FILE_DATA_OBJECT)
                        .defines_ownership(),
                    PropertyDescriptor::new(nie::URL, nie::DATA_OBJECT, xsd::STRING).foreign_key(),
                ]),
        )
        .with_field(FieldDefinition::new("Name").with_chain(vec![
            has_affiliation(),
            org(),
            PropertyDescriptor::new(nco::FULLNAME, nco::CONTACT, xsd::STRING),
        ]))
        .with_field(
            FieldDefinition::new("AssistantName")
                .with_chain(vec![has_affiliation(), org()])
                .permits_custom_values()
                .without_mapping(),
        )
}

fn ringtone() -> DetailDefinition {
    DetailDefinition::new("Ringtone")
        .unique()
        .with_field(file_url(
            "AudioRingtone",
            PropertyDescriptor::new(maemo::CONTACT_AUDIO_RINGTONE, nco::CONTACT, nfo::FILE_DATA_OBJECT),
        ))
        .with_field(file_url(
            "VideoRingtone",
            PropertyDescriptor::new(maemo::CONTACT_VIDEO_RINGTONE, nco::CONTACT, nfo::FILE_DATA_OBJECT),
        ))
        .with_field(file_url(
            "VibrationRingtone",
            PropertyDescriptor::new(
                maemo::CONTACT_VIBRATION_RINGTONE,
                nco::CONTACT,
                nfo::FILE_DATA_OBJECT,
            ),
        ))
}
