//! Details shared by person contacts and contact groups.

use contactgraph::config::{AvatarType, Settings};
use contactgraph::conversion::Conversion;
use contactgraph::model::{
    DETAIL_GUID, DETAIL_SYNC_TARGET, DETAIL_TIMESTAMP, FIELD_ACCESSED, FIELD_CREATED, FIELD_GUID,
    FIELD_LAST_MODIFIED, FIELD_LINKED_DETAIL_URIS, FIELD_SYNC_TARGET,
};
use contactgraph::resource::{ClassDescriptor, InstanceDescriptor, PropertyDescriptor};
use contactgraph::schema::{DetailDefinition, FieldDefinition, ImplementationResolver, QueryTransform};
use contactgraph::subject::SubjectScheme;
use contactgraph::value::ValueType;
use contactgraph::vocab::{maemo, nao, ncal, nco, nfo, nie, rdfs, slo, xsd};

/// Presence states by their numeric value.
const PRESENCE_STATES: [(&str, i64); 7] = [
    (nco::PRESENCE_STATUS_UNKNOWN, 0),
    (nco::PRESENCE_STATUS_AVAILABLE, 1),
    (nco::PRESENCE_STATUS_HIDDEN, 2),
    (nco::PRESENCE_STATUS_BUSY, 3),
    (nco::PRESENCE_STATUS_AWAY, 4),
    (nco::PRESENCE_STATUS_EXTENDED_AWAY, 5),
    (nco::PRESENCE_STATUS_OFFLINE, 6),
];

/// Every detail both entity types carry, as configured by `settings`.
pub(crate) fn details(settings: &Settings) -> Vec<DetailDefinition> {
    let read_only = !settings.write_back_presence;

    let mut details = vec![
        address(),
        anniversary(),
        birthday(),
        email_address(),
        geo_location(),
        global_presence(),
        guid(),
        note(),
        online_account(read_only),
        phone_number(settings),
        presence(read_only),
        relevance(),
        tag(),
        timestamp(),
        sync_target(),
        url(),
    ];

    if !settings.avatar_types.is_empty() {
        details.push(avatar(settings));
    }
    if settings.has_avatar_type(AvatarType::Personal) {
        details.push(personal_avatar());
    }
    if settings.has_avatar_type(AvatarType::Online) {
        details.push(online_avatar(read_only));
    }
    if settings.has_avatar_type(AvatarType::Social) {
        details.push(social_avatar(read_only));
    }

    details
}

/// Single-hop field storing a string on the contact.
pub(crate) fn contact_string(name: &str, iri: &str, domain: &str) -> FieldDefinition {
    FieldDefinition::new(name).with_chain(vec![PropertyDescriptor::new(iri, domain, xsd::STRING)])
}

/// Timestamp field keeping its UTC offset through reads.
fn date_time(field: FieldDefinition) -> FieldDefinition {
    field
        .with_type(ValueType::DateTime)
        .with_transform(QueryTransform::DateTimeOffset)
        .with_conversion(Conversion::DateTimeOffset)
}

/// Url field naming a shared file resource by its `nie:url`.
pub(crate) fn file_url(name: &str, owner: PropertyDescriptor) -> FieldDefinition {
    FieldDefinition::new(name)
        .with_type(ValueType::Url)
        .with_conversion(Conversion::UriAsForeignKey)
        .with_chain(vec![
            owner.defines_ownership(),
            PropertyDescriptor::new(nie::URL, nie::DATA_OBJECT, xsd::STRING).foreign_key(),
        ])
}

fn has_im_address(read_only: bool) -> PropertyDescriptor {
    PropertyDescriptor::new(nco::HAS_IM_ADDRESS, nco::ROLE, nco::IM_ADDRESS)
        .multi_valued()
        .read_only(read_only)
}

fn has_postal_address() -> PropertyDescriptor {
    PropertyDescriptor::new(nco::HAS_POSTAL_ADDRESS, nco::ROLE, nco::POSTAL_ADDRESS).multi_valued()
}

fn avatar(settings: &Settings) -> DetailDefinition {
    let mut detail = DetailDefinition::new("Avatar")
        .with_field(FieldDefinition::new("ImageUrl").with_type(ValueType::Url).synthesized())
        .with_field(FieldDefinition::new("VideoUrl").with_type(ValueType::Url).synthesized())
        .with_resolver(ImplementationResolver::LinkedAccount {
            account_detail: "OnlineAccount".to_string(),
            linked: "OnlineAvatar".to_string(),
            fallback: "PersonalAvatar".to_string(),
        });

    for (avatar_type, implementation) in [
        (AvatarType::Personal, "PersonalAvatar"),
        (AvatarType::Online, "OnlineAvatar"),
        (AvatarType::Social, "SocialAvatar"),
    ] {
        if settings.has_avatar_type(avatar_type) {
            detail = detail.with_dependency(implementation);
        }
    }

    detail
}

fn personal_avatar() -> DetailDefinition {
    DetailDefinition::new("PersonalAvatar")
        .unique()
        .internal()
        .with_field(file_url(
            "ImageUrl",
            PropertyDescriptor::new(nco::PHOTO, nco::CONTACT, nfo::FILE_DATA_OBJECT),
        ))
        .with_field(file_url(
            "VideoUrl",
            PropertyDescriptor::new(nco::VIDEO, nco::CONTACT, nfo::FILE_DATA_OBJECT),
        ))
}

fn online_avatar(read_only: bool) -> DetailDefinition {
    let im_avatar = || PropertyDescriptor::new(nco::IM_AVATAR, nco::IM_ADDRESS, nfo::FILE_DATA_OBJECT);

    DetailDefinition::new("OnlineAvatar")
        .internal()
        .with_context()
        .with_field(
            FieldDefinition::new("ImageUrl")
                .with_type(ValueType::Url)
                .with_conversion(Conversion::UriAsForeignKey)
                .with_chain(vec![
                    has_im_address(read_only),
                    im_avatar().defines_ownership(),
                    PropertyDescriptor::new(nie::URL, nie::DATA_OBJECT, xsd::STRING).foreign_key(),
                ]),
        )
        .with_field(FieldDefinition::new("SubType").with_chain(vec![
            has_im_address(read_only),
            im_avatar(),
            PropertyDescriptor::new(rdfs::LABEL, rdfs::RESOURCE, xsd::STRING),
        ]))
        .with_field(
            FieldDefinition::new(FIELD_LINKED_DETAIL_URIS)
                .with_type(ValueType::StringList)
                .with_chain(vec![has_im_address(read_only)]),
        )
}

fn social_avatar(read_only: bool) -> DetailDefinition {
    let im_avatar = || PropertyDescriptor::new(nco::IM_AVATAR, nco::IM_ADDRESS, nfo::FILE_DATA_OBJECT);
    let related_to =
        || PropertyDescriptor::new(nie::RELATED_TO, nie::INFORMATION_ELEMENT, nie::INFORMATION_ELEMENT);

    DetailDefinition::new("SocialAvatar")
        .internal()
        .with_context()
        .with_field(
            FieldDefinition::new("ImageUrl")
                .with_type(ValueType::Url)
                .with_conversion(Conversion::UriAsForeignKey)
                .with_chain(vec![
                    has_im_address(read_only),
                    im_avatar(),
                    related_to().defines_ownership(),
                    PropertyDescriptor::new(nie::URL, nie::DATA_OBJECT, xsd::STRING).foreign_key(),
                ]),
        )
        .with_field(FieldDefinition::new("SubType").with_chain(vec![
            has_im_address(read_only),
            im_avatar(),
            related_to(),
            PropertyDescriptor::new(rdfs::LABEL, rdfs::RESOURCE, xsd::STRING),
        ]))
        .with_field(
            FieldDefinition::new(FIELD_LINKED_DETAIL_URIS)
                .with_type(ValueType::StringList)
                .with_chain(vec![has_im_address(read_only)]),
        )
}

fn address() -> DetailDefinition {
    let part = |name: &str, iri: &str| {
        FieldDefinition::new(name).with_chain(vec![
            has_postal_address(),
            PropertyDescriptor::new(iri, nco::POSTAL_ADDRESS, xsd::STRING),
        ])
    };

    DetailDefinition::new("Address")
        .with_context()
        .with_field(FieldDefinition::new("Country").with_chain(vec![
            has_postal_address().has_detail_uri(),
            PropertyDescriptor::new(nco::COUNTRY, nco::POSTAL_ADDRESS, xsd::STRING),
        ]))
        .with_field(part("ExtendedAddress", nco::EXTENDED_ADDRESS))
        .with_field(part("Locality", nco::LOCALITY))
        .with_field(part("PostOfficeBox", nco::POBOX))
        .with_field(part("Postcode", nco::POSTALCODE))
        .with_field(part("Region", nco::REGION))
        .with_field(part("Street", nco::STREET_ADDRESS))
        .with_field(
            FieldDefinition::new("SubTypes")
                .with_type(ValueType::StringList)
                .with_chain(vec![has_postal_address()])
                .with_sub_type_classes(vec![
                    ClassDescriptor::new(nco::DOMESTIC_DELIVERY_ADDRESS, "Domestic"),
                    ClassDescriptor::new(nco::INTERNATIONAL_DELIVERY_ADDRESS, "International"),
                    ClassDescriptor::new(nco::PARCEL_DELIVERY_ADDRESS, "Parcel"),
                    ClassDescriptor::new(maemo::POSTAL_ADDRESS, "Postal"),
                ])
                .permits_custom_values(),
        )
}

fn anniversary() -> DetailDefinition {
    let anniversary =
        || PropertyDescriptor::new(ncal::ANNIVERSARY, nco::PERSON_CONTACT, ncal::EVENT).multi_valued();
    let event_string = |name: &str, iri: &str| {
        FieldDefinition::new(name)
            .with_chain(vec![anniversary(), PropertyDescriptor::new(iri, ncal::EVENT, xsd::STRING)])
    };

    DetailDefinition::new("Anniversary")
        .with_field(event_string("CalendarId", ncal::UID))
        .with_field(date_time(FieldDefinition::new("OriginalDate").with_chain(vec![
            anniversary(),
            PropertyDescriptor::new(ncal::DTSTART, ncal::EVENT, ncal::NCAL_DATE_TIME),
            PropertyDescriptor::new(ncal::DATE_TIME, ncal::NCAL_DATE_TIME, xsd::DATE_TIME),
        ])))
        .with_field(event_string("Event", ncal::DESCRIPTION))
        .with_field(
            event_string("SubType", ncal::CATEGORIES)
                .with_allowable_values(["Wedding", "Engagement", "House", "Employment", "Memorial"]),
        )
}

fn birthday() -> DetailDefinition {
    DetailDefinition::new("Birthday")
        .unique()
        .with_field(date_time(FieldDefinition::new("Birthday").with_chain(vec![
            PropertyDescriptor::new(nco::BIRTH_DATE, nco::CONTACT, xsd::DATE_TIME),
        ])))
        .with_field(FieldDefinition::new("CalendarId").with_chain(vec![
            PropertyDescriptor::new(ncal::BIRTHDAY, nco::PERSON_CONTACT, ncal::EVENT),
            PropertyDescriptor::new(ncal::UID, ncal::EVENT, xsd::STRING),
        ]))
}

fn email_address() -> DetailDefinition {
    DetailDefinition::new("EmailAddress")
        .with_context()
        .with_field(FieldDefinition::new("EmailAddress").with_chain(vec![
            PropertyDescriptor::new(nco::HAS_EMAIL_ADDRESS, nco::ROLE, nco::EMAIL_ADDRESS)
                .multi_valued()
                .has_detail_uri()
                .defines_ownership(),
            PropertyDescriptor::new(nco::EMAIL_ADDRESS_PROPERTY, nco::EMAIL_ADDRESS, xsd::STRING)
                .foreign_key(),
        ]))
}

fn geo_location() -> DetailDefinition {
    let has_location = || PropertyDescriptor::new(nco::HAS_LOCATION, nco::CONTACT, slo::GEO_LOCATION);
    let coordinate = |name: &str, iri: &str| {
        FieldDefinition::new(name).with_type(ValueType::Double).with_chain(vec![
            has_location(),
            PropertyDescriptor::new(iri, slo::GEO_LOCATION, xsd::DOUBLE),
        ])
    };

    DetailDefinition::new("GeoLocation")
        .unique()
        .with_context()
        .with_field(FieldDefinition::new("Label").with_chain(vec![
            has_location(),
            PropertyDescriptor::new(nie::TITLE, nie::INFORMATION_ELEMENT, xsd::STRING),
        ]))
        .with_field(coordinate("Latitude", slo::LATITUDE))
        .with_field(coordinate("Longitude", slo::LONGITUDE))
        .with_field(coordinate("Altitude", slo::ALTITUDE))
        .with_field(date_time(FieldDefinition::new("Timestamp").with_chain(vec![
            has_location(),
            PropertyDescriptor::new(slo::TIMESTAMP, slo::GEO_LOCATION, xsd::DATE_TIME),
        ])))
}

fn global_presence() -> DetailDefinition {
    DetailDefinition::new("GlobalPresence")
        .unique()
        .with_context()
        .with_field(FieldDefinition::new("Nickname").synthesized())
        .with_field(FieldDefinition::new("CustomMessage").synthesized())
        .with_field(FieldDefinition::new("Timestamp").with_type(ValueType::DateTime).synthesized())
        .with_field(
            FieldDefinition::new("PresenceState")
                .with_type(ValueType::Int)
                .with_default(0i64)
                .with_allowable_values(PRESENCE_STATES.map(|(_, state)| state))
                .synthesized(),
        )
        .with_dependency("Presence")
}

fn guid() -> DetailDefinition {
    DetailDefinition::new(DETAIL_GUID).unique().with_field(
        FieldDefinition::new(FIELD_GUID).with_chain(vec![PropertyDescriptor::new(
            nco::CONTACT_UID,
            nco::CONTACT,
            xsd::STRING,
        )
        .read_only(true)]),
    )
}

fn note() -> DetailDefinition {
    DetailDefinition::new("Note").with_field(FieldDefinition::new("Note").with_chain(vec![
        PropertyDescriptor::new(nco::NOTE, nco::CONTACT, xsd::STRING).multi_valued(),
    ]))
}

fn online_account(read_only: bool) -> DetailDefinition {
    let has_im_contact = PropertyDescriptor::new(nco::HAS_IM_CONTACT, nco::IM_ACCOUNT, nco::IM_ADDRESS)
        .multi_valued()
        .inverse();

    let capabilities = [
        (nco::IM_CAPABILITY_TEXT_CHAT, "TextChat"),
        (nco::IM_CAPABILITY_MEDIA_CALLS, "MediaCalls"),
        (nco::IM_CAPABILITY_AUDIO_CALLS, "AudioCalls"),
        (nco::IM_CAPABILITY_VIDEO_CALLS, "VideoCalls"),
        (nco::IM_CAPABILITY_UPGRADING_CALLS, "UpgradingCalls"),
        (nco::IM_CAPABILITY_FILE_TRANSFERS, "FileTransfers"),
        (nco::IM_CAPABILITY_STREAM_TUBES, "StreamTubes"),
        (nco::IM_CAPABILITY_DBUS_TUBES, "DBusTubes"),
    ];

    DetailDefinition::new("OnlineAccount")
        .with_context()
        .with_field(
            FieldDefinition::new("AccountPath")
                .with_conversion(Conversion::TelepathyIri)
                .with_chain(vec![has_im_address(false).has_detail_uri(), has_im_contact.clone()]),
        )
        .with_field(FieldDefinition::new("AccountUri").with_chain(vec![
            has_im_address(false).has_detail_uri(),
            PropertyDescriptor::new(nco::IM_ID, nco::IM_ADDRESS, xsd::STRING).defines_ownership(),
        ]))
        .with_field(FieldDefinition::new("ServiceProvider").with_chain(vec![
            has_im_address(read_only).defines_ownership(),
            has_im_contact,
            PropertyDescriptor::new(nco::IM_DISPLAY_NAME, nco::IM_ACCOUNT, xsd::STRING),
        ]))
        .with_field(FieldDefinition::new("Protocol").with_chain(vec![
            has_im_address(false),
            PropertyDescriptor::new(nco::IM_PROTOCOL, nco::IM_ADDRESS, xsd::STRING),
        ]))
        .with_field(
            FieldDefinition::new("Capabilities")
                .with_type(ValueType::StringList)
                .with_chain(vec![
                    has_im_address(read_only),
                    PropertyDescriptor::new(
                        nco::IM_CAPABILITY_PROPERTY,
                        nco::IM_ADDRESS,
                        nco::IM_CAPABILITY,
                    )
                    .multi_valued(),
                ])
                .with_allowable_instances(
                    capabilities
                        .iter()
                        .map(|(iri, value)| InstanceDescriptor::new(*iri, *value))
                        .collect(),
                )
                .permits_custom_values(),
        )
        .with_field(
            FieldDefinition::new("SubTypes")
                .with_type(ValueType::StringList)
                .with_chain(vec![has_im_address(false)])
                .permits_custom_values()
                .without_mapping(),
        )
}

fn phone_number(settings: &Settings) -> DetailDefinition {
    let has_phone_number =
        || PropertyDescriptor::new(nco::HAS_PHONE_NUMBER, nco::ROLE, nco::PHONE_NUMBER).multi_valued();

    let conversion = if settings.convert_numbers_to_latin {
        Conversion::LatinPhoneNumber
    } else {
        Conversion::Identity
    };

    DetailDefinition::new("PhoneNumber")
        .with_context()
        .with_field(
            FieldDefinition::new("PhoneNumber")
                .with_conversion(conversion)
                .with_chain(vec![
                    has_phone_number().has_detail_uri().defines_ownership(),
                    PropertyDescriptor::new(nco::PHONE_NUMBER_PROPERTY, nco::PHONE_NUMBER, xsd::STRING),
                ])
                .with_computed(
                    PropertyDescriptor::new(maemo::LOCAL_PHONE_NUMBER, nco::PHONE_NUMBER, xsd::STRING)
                        .with_conversion(Conversion::LocalPhoneNumber {
                            length: settings.local_phone_number_length,
                        }),
                ),
        )
        .with_field(
            FieldDefinition::new("SubTypes")
                .with_type(ValueType::StringList)
                .with_default(vec!["Voice"])
                .with_chain(vec![has_phone_number()])
                .with_sub_type_classes(vec![
                    ClassDescriptor::new(nco::BBS_NUMBER, "BulletinBoardSystem"),
                    ClassDescriptor::new(nco::CAR_PHONE_NUMBER, "Car"),
                    ClassDescriptor::new(nco::FAX_NUMBER, "Fax"),
                    ClassDescriptor::new(nco::MESSAGING_NUMBER, "MessagingCapable"),
                    ClassDescriptor::new(nco::CELL_PHONE_NUMBER, "Mobile"),
                    ClassDescriptor::new(nco::MODEM_NUMBER, "Modem"),
                    ClassDescriptor::new(nco::PAGER_NUMBER, "Pager"),
                    ClassDescriptor::new(nco::VIDEO_TELEPHONE_NUMBER, "Video"),
                    ClassDescriptor::new(nco::VOICE_PHONE_NUMBER, "Voice"),
                ])
                .permits_custom_values(),
        )
}

fn presence(read_only: bool) -> DetailDefinition {
    let im_string = |name: &str, iri: &str| {
        FieldDefinition::new(name).with_chain(vec![
            has_im_address(read_only),
            PropertyDescriptor::new(iri, nco::IM_ADDRESS, xsd::STRING),
        ])
    };
    let auth_status = |name: &str, iri: &str| {
        FieldDefinition::new(name)
            .with_chain(vec![
                has_im_address(read_only),
                PropertyDescriptor::new(iri, nco::IM_ADDRESS, nco::AUTHORIZATION_STATUS),
            ])
            .with_allowable_instances(vec![
                InstanceDescriptor::new(nco::AUTH_STATUS_NO, "No"),
                InstanceDescriptor::new(nco::AUTH_STATUS_REQUESTED, "Requested"),
                InstanceDescriptor::new(nco::AUTH_STATUS_YES, "Yes"),
            ])
    };

    DetailDefinition::new("Presence")
        .with_context()
        .with_detail_uri_scheme(SubjectScheme::Presence)
        .with_field(im_string("Nickname", nco::IM_NICKNAME))
        .with_field(im_string("CustomMessage", nco::IM_STATUS_MESSAGE))
        .with_field(date_time(FieldDefinition::new("Timestamp").with_chain(vec![
            has_im_address(read_only),
            PropertyDescriptor::new(nco::PRESENCE_LAST_MODIFIED, nco::IM_ADDRESS, xsd::DATE_TIME),
        ])))
        .with_field(
            FieldDefinition::new("PresenceState")
                .with_type(ValueType::Int)
                .with_default(0i64)
                .with_chain(vec![
                    has_im_address(read_only).has_detail_uri(),
                    PropertyDescriptor::new(nco::IM_PRESENCE, nco::IM_ADDRESS, nco::PRESENCE_STATUS),
                ])
                .with_allowable_instances(
                    PRESENCE_STATES
                        .iter()
                        .map(|(iri, state)| InstanceDescriptor::new(*iri, *state))
                        .collect(),
                ),
        )
        .with_field(auth_status("AuthStatusFrom", nco::IM_ADDRESS_AUTH_STATUS_FROM))
        .with_field(auth_status("AuthStatusTo", nco::IM_ADDRESS_AUTH_STATUS_TO))
}

fn relevance() -> DetailDefinition {
    DetailDefinition::new("Relevance").unique().with_field(
        FieldDefinition::new("Relevance")
            .with_type(ValueType::Double)
            .with_chain(vec![
                PropertyDescriptor::new(maemo::RELEVANCE, nco::CONTACT, xsd::DOUBLE).read_only(true)
            ]),
    )
}

fn tag() -> DetailDefinition {
    DetailDefinition::new("Tag").with_field(FieldDefinition::new("Tag").with_chain(vec![
        PropertyDescriptor::new(nao::HAS_TAG, rdfs::RESOURCE, nao::TAG)
            .multi_valued()
            .has_detail_uri()
            .defines_ownership(),
        PropertyDescriptor::new(nao::PREF_LABEL, rdfs::RESOURCE, xsd::STRING)
            .foreign_key()
            .case_insensitive(),
    ]))
}

fn timestamp() -> DetailDefinition {
    let stamp = |name: &str, iri: &str, read_only: bool| {
        date_time(FieldDefinition::new(name).with_chain(vec![PropertyDescriptor::new(
            iri,
            nie::INFORMATION_ELEMENT,
            xsd::DATE_TIME,
        )
        .read_only(read_only)]))
    };

    DetailDefinition::new(DETAIL_TIMESTAMP)
        .unique()
        .with_field(stamp(FIELD_CREATED, nie::CONTENT_CREATED, true))
        .with_field(stamp(FIELD_LAST_MODIFIED, nie::CONTENT_LAST_MODIFIED, true))
        .with_field(stamp(FIELD_ACCESSED, nie::CONTENT_ACCESSED, false))
}

fn sync_target() -> DetailDefinition {
    DetailDefinition::new(DETAIL_SYNC_TARGET).unique().with_field(
        FieldDefinition::new(FIELD_SYNC_TARGET)
            .with_chain(vec![PropertyDescriptor::new(
                nie::GENERATOR,
                nie::INFORMATION_ELEMENT,
                xsd::STRING,
            )])
            .synthesized(),
    )
}

fn url() -> DetailDefinition {
    let url = |iri: &str| PropertyDescriptor::new(iri, nco::ROLE, rdfs::RESOURCE).multi_valued();

    DetailDefinition::new("Url")
        .with_context()
        .with_field(FieldDefinition::new("Url").with_chain(vec![url(nco::URL)]))
        .with_field(
            FieldDefinition::new("SubType")
                .with_default("Favourite")
                .with_chain(vec![url(nco::URL)])
                .with_sub_type_properties(vec![
                    url(nco::WEBSITE_URL).with_value("HomePage"),
                    url(nco::BLOG_URL).with_value("Blog"),
                ]),
        )
}
