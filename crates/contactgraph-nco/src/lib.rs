//! # contactgraph-nco
//!
//! Stock contact schemas for contactgraph, describing person contacts and contact groups
//! in the NCO vocabulary as a tracker store keeps them.
//!
//! ## Features
//!
//! - Person schema with names, phone numbers, addresses, online accounts and the rest
//! - Group schema sharing every detail that makes sense for groups
//! - Avatars backed by personal files, online accounts or social services
//! - Settings decide presence write back, phone number handling and avatar sources
//!
//! ## Quick Start
//!
//! ```rust
//! use contactgraph::fetch::{compile_fetch, FetchRequest};
//! use contactgraph::Settings;
//! use contactgraph_nco::person_schema;
//!
//! # fn main() -> contactgraph::Result<()> {
//! let settings = Settings::default();
//! let schema = person_schema(&settings)?;
//!
//! let query = compile_fetch(&schema, &FetchRequest::new(), &settings)?;
//! assert!(query.to_sparql().contains("nco:nameGiven"));
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

mod common;
mod group;
mod person;

use contactgraph::config::Settings;
use contactgraph::model::ContactType;
use contactgraph::schema::{DetailDefinition, Schema};
use contactgraph::vocab::nco;
use contactgraph::Result;

/// Schema of person contacts.
pub fn person_schema(settings: &Settings) -> Result<Schema> {
    build(
        Schema::new(ContactType::Person, [nco::PERSON_CONTACT]),
        common::details(settings).into_iter().chain(person::details()),
    )
}

/// Schema of contact groups.
///
/// Groups cannot store contexts, details declaring one lose it on registration.
pub fn group_schema(settings: &Settings) -> Result<Schema> {
    build(
        Schema::new(ContactType::Group, [nco::CONTACT_GROUP, nco::CONTACT]),
        common::details(settings).into_iter().chain(group::details()),
    )
}

/// Schema for contacts of `contact_type`.
pub fn schema_for(contact_type: ContactType, settings: &Settings) -> Result<Schema> {
    match contact_type {
        ContactType::Person => person_schema(settings),
        ContactType::Group => group_schema(settings),
    }
}

fn build(mut schema: Schema, details: impl IntoIterator<Item = DetailDefinition>) -> Result<Schema> {
    for detail in details {
        schema.register(detail)?;
    }

    log::debug!(
        "built {} schema with {} details",
        schema.contact_type(),
        schema.details().len()
    );
    Ok(schema)
}
