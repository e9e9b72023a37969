//! Details of a contact prepared for writing.

use crate::codec::contains_separator;
use crate::error::{CompileError, ConversionError, Result};
use crate::model::{Contact, Detail, DETAIL_GUID, DETAIL_SYNC_TARGET, DETAIL_TIMESTAMP};
use crate::schema::{DetailDefinition, FieldDefinition, Schema};
use crate::subject::SubjectScheme;
use crate::value::Value;
use std::collections::BTreeSet;

/// A detail paired with the definition it is stored as.
///
/// Details without a definition are custom details and go through the generic property
/// path.
#[derive(Debug, Clone)]
pub(crate) struct DetailMapping<'s> {
    detail: Detail,
    definition: Option<&'s DetailDefinition>,
}

impl<'s> DetailMapping<'s> {
    pub(crate) fn new(detail: Detail, definition: Option<&'s DetailDefinition>) -> Self {
        Self { detail, definition }
    }

    pub(crate) fn detail(&self) -> &Detail {
        &self.detail
    }

    pub(crate) fn definition(&self) -> Option<&'s DetailDefinition> {
        self.definition
    }

    pub(crate) fn name(&self) -> &str {
        self.detail.definition_name()
    }

    pub(crate) fn is_custom(&self) -> bool {
        self.definition.is_none()
    }

    pub(crate) fn has_context(&self) -> bool {
        self.definition.is_some_and(|definition| definition.has_context)
    }

    pub(crate) fn fields(&self) -> &'s [FieldDefinition] {
        self.definition
            .map(|definition| definition.fields.as_slice())
            .unwrap_or_default()
    }

    pub(crate) fn value(&self, field: &str) -> Option<&Value> {
        self.detail.value(field).filter(|value| !value.is_null())
    }

    pub(crate) fn sub_type_field(&self) -> Option<&'s FieldDefinition> {
        self.definition.and_then(DetailDefinition::sub_type_field)
    }

    pub(crate) fn detail_uri_scheme(&self) -> SubjectScheme {
        self.definition
            .map(DetailDefinition::detail_uri_scheme)
            .unwrap_or_default()
    }

    /// Contexts the detail is written for, deduplicated, `[""]` when none are given.
    pub(crate) fn contexts(&self) -> Vec<String> {
        let contexts: BTreeSet<&str> = self
            .detail
            .contexts()
            .iter()
            .map(String::as_str)
            .collect();

        if contexts.is_empty() {
            return vec![String::new()];
        }

        contexts.into_iter().map(String::from).collect()
    }

    /// IRI of the detail's resource derived from the current field values.
    ///
    /// The scheme is the one of the first writable detail URI field; the values of all
    /// writable detail URI fields are its arguments.
    pub(crate) fn make_resource_iri(&self) -> Option<String> {
        let mut scheme = SubjectScheme::None;
        let mut values = Vec::new();

        for field in self.fields() {
            let Some(property) = field.detail_uri_property() else {
                continue;
            };

            if field.property_chain.first().is_some_and(|first| first.read_only) {
                continue;
            }

            if values.is_empty() {
                scheme = property.resource_iri_scheme();

                if scheme == SubjectScheme::None {
                    log::warn!(
                        "detail URI property of {} detail's {} field has no IRI scheme",
                        self.name(),
                        field.name
                    );
                    continue;
                }
            }

            values.push(self.value(&field.name).cloned().unwrap_or(Value::Null));
        }

        if values.is_empty() {
            return None;
        }

        scheme.make_iri(&values)
    }
}

/// Details written from the save's stamps rather than from their fields.
const STAMP_DETAILS: [&str; 3] = [DETAIL_GUID, DETAIL_SYNC_TARGET, DETAIL_TIMESTAMP];

/// Whether `name` is skipped by a save restricted to `mask`.
pub(crate) fn is_masked_out(mask: Option<&[String]>, name: &str) -> bool {
    mask.is_some_and(|mask| !mask.iter().any(|masked| masked == name))
}

/// Pair the writable details of `contact` with their definitions.
///
/// Fails with `InvalidDetail` when a detail links to a detail URI no other detail of the
/// contact carries.
pub(crate) fn map_details<'s>(
    schema: &'s Schema,
    contact: &Contact,
    mask: Option<&[String]>,
) -> Result<Vec<DetailMapping<'s>>> {
    check_linked_detail_uris(contact)?;

    let mut mappings = Vec::new();

    for detail in &contact.details {
        let name = detail.definition_name();

        if is_masked_out(mask, name) || STAMP_DETAILS.contains(&name) {
            continue;
        }

        if detail.is_read_only() {
            log::debug!("skipping read-only {name} detail");
            continue;
        }

        let definition = match schema.detail(name) {
            None if Schema::is_synthetic_detail(name) => continue,
            None => None,
            Some(definition) => match implementation(schema, definition, detail, &contact.details) {
                Some(implementation) => Some(implementation),
                None => {
                    log::debug!("no implementation registered for {name} detail");
                    continue;
                }
            },
        };

        let mut detail = detail.clone();
        drop_unencodable_values(&mut detail);
        mappings.push(DetailMapping::new(detail, definition));
    }

    update_detail_uris(&mut mappings);
    Ok(mappings)
}

/// Drop the values a read could not return as they were written.
///
/// Empty text reads back as no value and is dropped quietly. Text holding a result
/// separator would split into extra cells, so it fails its field, or its list item, as a
/// conversion failure.
fn drop_unencodable_values(detail: &mut Detail) {
    let name = detail.definition_name().to_string();
    let fields: Vec<String> = detail.values().keys().cloned().collect();

    for field in fields {
        let Some(value) = detail.value(&field).cloned() else {
            continue;
        };

        match value {
            Value::String(text) | Value::Url(text) if text.is_empty() => {
                detail.remove_value(&field);
            }
            Value::String(text) | Value::Url(text) if contains_separator(&text) => {
                let err = ConversionError::new(&text, "text without result separators");
                log::warn!("dropping {name}.{field}: {err}");
                detail.remove_value(&field);
            }
            Value::StringList(items) => {
                let mut kept = Vec::with_capacity(items.len());

                for item in items.iter().filter(|item| !item.is_empty()) {
                    if contains_separator(item) {
                        let err = ConversionError::new(item, "text without result separators");
                        log::warn!("dropping item of {name}.{field}: {err}");
                    } else {
                        kept.push(item.clone());
                    }
                }

                if kept.len() != items.len() {
                    detail.set_value(&field, Value::StringList(kept));
                }
            }
            _ => {}
        }
    }
}

/// The definition a detail of `definition` is stored as.
fn implementation<'s>(
    schema: &'s Schema,
    definition: &'s DetailDefinition,
    detail: &Detail,
    siblings: &[Detail],
) -> Option<&'s DetailDefinition> {
    match &definition.resolver {
        Some(resolver) => schema.detail(resolver.resolve(detail, siblings)),
        None => Some(definition),
    }
}

/// Definitions a masked detail name covers on the write path.
pub(crate) fn implementations<'s>(
    schema: &'s Schema,
    definition: &'s DetailDefinition,
) -> Vec<&'s DetailDefinition> {
    if !definition.is_synthesized() {
        return vec![definition];
    }

    definition
        .dependencies
        .iter()
        .filter_map(|name| schema.detail(name))
        .filter(|dependency| !dependency.is_synthesized())
        .collect()
}

fn check_linked_detail_uris(contact: &Contact) -> Result<()> {
    let known: BTreeSet<&str> = contact
        .details
        .iter()
        .filter_map(Detail::detail_uri)
        .collect();

    for detail in &contact.details {
        if let Some(dangling) = detail
            .linked_detail_uris()
            .iter()
            .find(|uri| !known.contains(uri.as_str()))
        {
            return Err(CompileError::invalid_detail(
                detail.definition_name(),
                format!("links to unknown detail URI {dangling}"),
            ));
        }
    }

    Ok(())
}

/// Recompute detail URIs from field values and follow the change in sibling links.
fn update_detail_uris(mappings: &mut [DetailMapping<'_>]) {
    for index in 0..mappings.len() {
        if mappings[index].is_custom() {
            continue;
        }

        let Some(new_uri) = mappings[index].make_resource_iri() else {
            continue;
        };

        let old_uri = mappings[index].detail.detail_uri().map(String::from);
        if old_uri.as_deref() == Some(new_uri.as_str()) {
            continue;
        }

        mappings[index].detail.set_detail_uri(Some(new_uri.clone()));

        let Some(old_uri) = old_uri else {
            continue;
        };

        for mapping in mappings.iter_mut() {
            let mut links = mapping.detail.linked_detail_uris().to_vec();

            if let Some(position) = links.iter().position(|uri| *uri == old_uri) {
                links.remove(position);
                links.push(new_uri.clone());
                mapping.detail.set_linked_detail_uris(links);
            }
        }
    }
}
