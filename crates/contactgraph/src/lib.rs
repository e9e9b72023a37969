//! # contactgraph
//!
//! A schema-driven compiler between contact records and SPARQL queries over an NCO graph
//! store.
//!
//! ## Core Principles
//!
//! - **Schema Driven**: Every detail maps onto the graph through declared property chains
//! - **Bidirectional**: The same schema compiles reads, decodes their rows and compiles writes
//! - **No I/O**: Compilers produce query text, running it is up to the caller
//! - **Explicit Failure**: Unsupported requests fail instead of matching something else
//!
//! ## Architecture
//!
//! ```text
//! Requests (FetchRequest, SaveRequest, local ids)
//!     ↓
//! Compilers (fetch, save, remove)
//!     ↓
//! Schema (details, fields, property chains)
//!     ↓
//! SPARQL AST (select, update, rendering)
//! ```
//!
//! ## Example
//!
//! ```rust
//! use contactgraph::fetch::{compile_fetch, FetchRequest};
//! use contactgraph::model::{Contact, ContactType, Detail};
//! use contactgraph::resource::PropertyDescriptor;
//! use contactgraph::save::{compile_save, SaveRequest};
//! use contactgraph::schema::{DetailDefinition, FieldDefinition, Schema};
//! use contactgraph::vocab::{nco, xsd};
//! use contactgraph::Settings;
//!
//! let schema = Schema::new(ContactType::Person, [nco::PERSON_CONTACT])
//!     .with_detail(DetailDefinition::new("Name").unique().with_field(
//!         FieldDefinition::new("FirstName").with_chain(vec![PropertyDescriptor::new(
//!             nco::NAME_GIVEN,
//!             nco::PERSON_CONTACT,
//!             xsd::STRING,
//!         )]),
//!     ))
//!     .unwrap();
//! let settings = Settings::default();
//!
//! let fetch = compile_fetch(&schema, &FetchRequest::new(), &settings).unwrap();
//! assert!(fetch.to_sparql().starts_with("SELECT ?contact"));
//!
//! let contact = Contact::new(ContactType::Person)
//!     .with_detail(Detail::new("Name").with_value("FirstName", "Ada"));
//! let save = compile_save(&schema, &SaveRequest::new(contact), &settings).unwrap();
//! assert!(save.to_sparql().contains("nco:nameGiven \"Ada\""));
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod codec;
pub mod config;
pub mod conversion;
pub mod error;
pub mod fetch;
pub mod model;
pub mod phone;
pub mod remove;
pub mod request;
pub mod resource;
pub mod save;
pub mod schema;
pub mod sparql;
pub mod subject;
pub mod value;
#[allow(missing_docs)]
pub mod vocab;

// Re-export main types
pub use config::Settings;
pub use error::{CompileError, Result};
pub use fetch::{compile_contact_ids, compile_fetch, FetchQuery, FetchRequest};
pub use model::{Contact, ContactType, Detail};
pub use remove::compile_remove;
pub use save::{compile_save, SaveQuery, SaveRequest};
pub use schema::{DetailDefinition, FieldDefinition, Schema};
pub use value::{Value, ValueType};
