//! Details only contact groups carry.

use contactgraph::resource::PropertyDescriptor;
use contactgraph::schema::DetailDefinition;
use contactgraph::vocab::{maemo, nco, nfo};

use crate::common::{contact_string, file_url};

pub(crate) fn details() -> Vec<DetailDefinition> {
    vec![nickname(), ringtone()]
}

fn nickname() -> DetailDefinition {
    DetailDefinition::new("Nickname").unique().with_field(contact_string(
        "Nickname",
        nco::CONTACT_GROUP_NAME,
        nco::CONTACT_GROUP,
    ))
}

fn ringtone() -> DetailDefinition {
    let ringtone = |iri: &str| PropertyDescriptor::new(iri, nco::CONTACT_GROUP, nfo::FILE_DATA_OBJECT);

    DetailDefinition::new("Ringtone")
        .unique()
        .with_field(file_url("AudioRingtone", ringtone(maemo::CONTACT_GROUP_AUDIO_RINGTONE)))
        .with_field(file_url("VideoRingtone", ringtone(maemo::CONTACT_GROUP_VIDEO_RINGTONE)))
        .with_field(file_url(
            "VibrationRingtone",
            ringtone(maemo::CONTACT_GROUP_VIBRATION_RINGTONE),
        ))
}
