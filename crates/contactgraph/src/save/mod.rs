//! Write-path compiler.
//!
//! A [`SaveRequest`] compiles into one [`Update`] that replaces the stored state of a
//! contact with the details of the request. The update deletes what the contact owns and
//! inserts the new values, all in one submission:
//!
//! ```text
//! SaveRequest ──▶ normalize ──▶ related objects ──▶ DELETE related objects
//!                (mask, URIs)                      DELETE contact properties
//!                                                  INSERT foreign key objects
//!                                                  INSERT detail values
//!                                                  INSERT preserved values
//!                                                  INSERT OR REPLACE sync target
//! ```
//!
//! Values that fail to convert drop only their field. A detail linking to a detail URI the
//! contact does not carry rejects the whole contact before anything is emitted.

mod delete;
mod insert;
mod mapping;

#[cfg(test)]
mod tests;

use crate::config::Settings;
use crate::error::{CompileError, Result};
use crate::model::{
    Contact, DETAIL_GUID, DETAIL_SYNC_TARGET, DETAIL_TIMESTAMP, FIELD_ACCESSED, FIELD_CREATED,
    FIELD_GUID, FIELD_LAST_MODIFIED, FIELD_SYNC_TARGET,
};
use crate::schema::Schema;
use crate::sparql::{Expression, Group, Triple, Update, UpdateOperation, VariablePool};
use crate::subject::new_anonymous_iri;
use crate::value::{Value, ValueType};
use chrono::{DateTime, FixedOffset, Utc};
use mapping::{is_masked_out, map_details, DetailMapping};
use std::collections::BTreeMap;

/// Source of identity tokens for contacts saved without one.
pub trait GuidAlgorithm {
    /// A new identity token for `contact`.
    fn make_guid(&self, contact: &Contact) -> String;
}

/// Random uuid tokens.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomGuid;

impl GuidAlgorithm for RandomGuid {
    fn make_guid(&self, _contact: &Contact) -> String {
        uuid::Uuid::new_v4().to_string()
    }
}

static RANDOM_GUID: RandomGuid = RandomGuid;

/// What to save.
#[derive(Debug, Clone, PartialEq)]
pub struct SaveRequest {
    /// Contact to save; a zero local id saves a new contact
    pub contact: Contact,
    /// IRI of the contact; required for existing contacts, generated for new ones
    pub contact_iri: Option<String>,
    /// Detail names to write; empty writes every detail
    pub definition_mask: Vec<String>,
    /// Time of the save
    pub timestamp: DateTime<FixedOffset>,
}

impl SaveRequest {
    /// Save every detail of `contact` now.
    pub fn new(contact: Contact) -> Self {
        Self {
            contact,
            contact_iri: None,
            definition_mask: Vec::new(),
            timestamp: Utc::now().fixed_offset(),
        }
    }

    /// Set the contact IRI.
    pub fn with_contact_iri(mut self, iri: impl Into<String>) -> Self {
        self.contact_iri = Some(iri.into());
        self
    }

    /// Only write the details named in `mask`.
    pub fn with_definition_mask<I, S>(mut self, mask: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.definition_mask = mask.into_iter().map(Into::into).collect();
        self
    }

    /// Set the time of the save.
    pub fn with_timestamp(mut self, timestamp: DateTime<FixedOffset>) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// Whether only some details of an existing contact are written.
    pub fn is_partial(&self) -> bool {
        !self.contact.is_new() && !self.definition_mask.is_empty()
    }
}

/// A compiled save.
#[derive(Debug, Clone, PartialEq)]
pub struct SaveQuery {
    /// The update
    pub update: Update,
    /// IRI the contact is stored under
    pub contact_iri: String,
    /// Identity token written, generated when the contact had none
    pub guid: String,
    /// Sync target written
    pub sync_target: String,
}

impl SaveQuery {
    /// Update text.
    pub fn to_sparql(&self) -> String {
        self.update.to_string()
    }
}

/// Compiles saves of contacts of one schema.
pub struct SaveCompiler<'a> {
    schema: &'a Schema,
    settings: &'a Settings,
    guid: &'a dyn GuidAlgorithm,
}

impl<'a> SaveCompiler<'a> {
    /// Compiler generating random identity tokens.
    pub fn new(schema: &'a Schema, settings: &'a Settings) -> Self {
        Self {
            schema,
            settings,
            guid: &RANDOM_GUID,
        }
    }

    /// Use `guid` for contacts saved without an identity token.
    pub fn with_guid_algorithm(mut self, guid: &'a dyn GuidAlgorithm) -> Self {
        self.guid = guid;
        self
    }

    /// Compile `request`.
    ///
    /// Fails with [`CompileError::BadArgument`] when an existing contact comes without IRI
    /// and with [`CompileError::InvalidDetail`] when a detail links to an unknown detail
    /// URI.
    pub fn compile(&self, request: &SaveRequest) -> Result<SaveQuery> {
        let contact = &request.contact;

        if contact.contact_type != self.schema.contact_type() {
            return Err(CompileError::bad_argument(format!(
                "cannot save a {} with the {} schema",
                contact.contact_type,
                self.schema.contact_type()
            )));
        }

        let contact_iri = match (&request.contact_iri, contact.is_new()) {
            (Some(iri), _) => iri.clone(),
            (None, true) => new_anonymous_iri(),
            (None, false) => {
                return Err(CompileError::bad_argument(format!(
                    "no IRI given for contact {}",
                    contact.local_id
                )))
            }
        };

        let mask = request
            .is_partial()
            .then_some(request.definition_mask.as_slice());
        let stamps = Stamps::new(request, mask, self.settings, self.guid);
        let mappings = map_details(self.schema, contact, mask)?;

        let mut builder = UpdateBuilder {
            schema: self.schema,
            settings: self.settings,
            mappings,
            mask,
            existing: !contact.is_new(),
            contact: Expression::iri(&contact_iri),
            graph: self.settings.graph_iri.clone(),
            stamps,
            pool: VariablePool::new(),
            counter: 0,
            affiliations: BTreeMap::new(),
            explicit: Vec::new(),
            restrictions: Group::new(),
            implicit: Vec::new(),
            update: Update::new(),
        };

        builder.build();

        log::trace!(
            "compiled save of {contact_iri} into {} operations",
            builder.update.len()
        );

        Ok(SaveQuery {
            update: builder.update,
            contact_iri,
            guid: builder.stamps.guid,
            sync_target: builder.stamps.sync_target,
        })
    }
}

/// Compile a save of `request` with random identity tokens.
///
/// # Examples
///
/// ```
/// use contactgraph::config::Settings;
/// use contactgraph::model::{Contact, ContactType};
/// use contactgraph::save::{compile_save, SaveRequest};
/// use contactgraph::schema::Schema;
/// use contactgraph::vocab::nco;
///
/// let schema = Schema::new(ContactType::Person, [nco::PERSON_CONTACT]);
/// let request = SaveRequest::new(Contact::new(ContactType::Person)).with_contact_iri("urn:uuid:1");
/// let query = compile_save(&schema, &request, &Settings::default()).unwrap();
///
/// assert!(query.to_sparql().contains("<urn:uuid:1> a nco:PersonContact ."));
/// ```
pub fn compile_save(schema: &Schema, request: &SaveRequest, settings: &Settings) -> Result<SaveQuery> {
    SaveCompiler::new(schema, settings).compile(request)
}

/// Identity, timestamps and sync target written with the contact.
///
/// `accessed` is only set when the contact does not carry its own access time, which is
/// then written with the other timestamp fields.
#[derive(Debug, Clone, PartialEq)]
struct Stamps {
    accessed: Option<DateTime<FixedOffset>>,
    created: DateTime<FixedOffset>,
    last_modified: DateTime<FixedOffset>,
    preserve_created: bool,
    guid: String,
    preserve_guid: bool,
    sync_target: String,
    preserve_sync_target: bool,
}

impl Stamps {
    fn new(
        request: &SaveRequest,
        mask: Option<&[String]>,
        settings: &Settings,
        guid_algorithm: &dyn GuidAlgorithm,
    ) -> Self {
        let contact = &request.contact;
        let existing = !contact.is_new();
        let timestamp = |field: &str| {
            contact
                .detail(DETAIL_TIMESTAMP)
                .and_then(|detail| detail.value(field))
                .and_then(|value| match value.convert(ValueType::DateTime) {
                    Ok(Value::DateTime(dt)) => Some(dt),
                    _ => None,
                })
        };

        let accessed = match timestamp(FIELD_ACCESSED) {
            Some(_) => None,
            None => Some(request.timestamp),
        };

        let (created, preserve_created) = match timestamp(FIELD_CREATED) {
            Some(created) => (created, is_masked_out(mask, DETAIL_TIMESTAMP)),
            None => (request.timestamp, existing),
        };

        let last_modified = match timestamp(FIELD_LAST_MODIFIED) {
            Some(last_modified) if !existing => last_modified,
            _ => request.timestamp,
        };

        let guid = contact
            .detail(DETAIL_GUID)
            .and_then(|detail| detail.value(FIELD_GUID))
            .map(Value::to_text)
            .filter(|guid| !guid.is_empty());

        let (guid, preserve_guid) = match guid {
            Some(guid) => (guid, is_masked_out(mask, DETAIL_GUID)),
            None => (guid_algorithm.make_guid(contact), existing),
        };

        let sync_target = contact
            .detail(DETAIL_SYNC_TARGET)
            .and_then(|detail| detail.value(FIELD_SYNC_TARGET))
            .map(Value::to_text)
            .unwrap_or_default();

        let (sync_target, preserve_sync_target) =
            if sync_target.is_empty() || settings.is_weak_sync_target(&sync_target) {
                (settings.default_sync_target.clone(), false)
            } else {
                (sync_target, true)
            };

        Self {
            accessed,
            created,
            last_modified,
            preserve_created,
            guid,
            preserve_guid,
            sync_target,
            preserve_sync_target,
        }
    }
}

/// State of one save compilation.
pub(crate) struct UpdateBuilder<'s> {
    schema: &'s Schema,
    settings: &'s Settings,
    mappings: Vec<DetailMapping<'s>>,
    mask: Option<&'s [String]>,
    existing: bool,
    contact: Expression,
    graph: String,
    stamps: Stamps,
    pool: VariablePool,
    counter: usize,
    affiliations: BTreeMap<String, Expression>,
    explicit: Vec<Triple>,
    restrictions: Group,
    implicit: Vec<UpdateOperation>,
    update: Update,
}

impl UpdateBuilder<'_> {
    fn build(&mut self) {
        let related = self.collect_related_objects();

        self.delete_related_objects(&related);

        if self.existing {
            self.delete_contact_properties();
        }

        self.insert_foreign_key_objects();
        self.collect_insertions();
    }

    /// `{basename}{n}` with `n` unique within this compilation.
    fn unique_name(&mut self, basename: &str) -> String {
        self.counter += 1;
        format!("{basename}{}", self.counter)
    }

    /// Delete operation scoped to the contact's graph.
    fn delete_in_graph(&self, template: Vec<Triple>, condition: Group) -> UpdateOperation {
        UpdateOperation::Delete {
            graph: Some(self.graph.clone()),
            template,
            condition: Some(graph_group(&self.graph, condition)),
        }
    }
}

/// `GRAPH <graph> { group }` as the only pattern of a group.
fn graph_group(graph: &str, group: Group) -> Group {
    let mut outer = Group::new();
    outer.push(crate::sparql::Pattern::Graph {
        graph: Expression::iri(graph),
        group,
    });
    outer
}

/// `prefix_suffix`, or `prefix` alone when `suffix` is empty.
fn scoped_name(prefix: &str, suffix: &str) -> String {
    if suffix.is_empty() {
        prefix.to_string()
    } else {
        format!("{prefix}_{suffix}")
    }
}
