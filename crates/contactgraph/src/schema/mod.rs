//! Schema model: how the details of one contact type map onto the graph.
//!
//! A [`Schema`] is assembled once per contact type from [`DetailDefinition`]s and is
//! immutable afterwards; both compilers only borrow it. Derived data (chain
//! classifications, detail URI fields, the public definitions) is computed on first use
//! and cached behind [`std::sync::OnceLock`], so a schema can be shared between threads.

mod detail;
mod field;

pub use detail::{DetailDefinition, DetailDescription, ImplementationResolver};
pub use field::{FieldDefinition, FieldDescription, QueryTransform, STORED_LIST_SEPARATOR};

use crate::error::{CompileError, Result};
use crate::model::ContactType;
use crate::value::ValueType;
use crate::vocab::nco;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::OnceLock;

/// Details computed from other details instead of being read as they are.
pub const SYNTHETIC_DETAILS: [&str; 5] = [
    "Avatar",
    "DisplayLabel",
    "GlobalPresence",
    "Thumbnail",
    "Type",
];

/// Detail mapping of one contact type.
#[derive(Debug)]
pub struct Schema {
    contact_type: ContactType,
    contact_class_iris: Vec<String>,
    context_supported: bool,
    details: BTreeMap<String, DetailDefinition>,
    definitions: OnceLock<BTreeMap<String, DetailDescription>>,
    value_types: OnceLock<Vec<ValueType>>,
}

impl Schema {
    /// Create an empty schema for contacts of the classes `contact_class_iris`.
    ///
    /// Contexts are stored through `nco:hasAffiliation`, so only person contacts
    /// support them.
    pub fn new<I, S>(contact_type: ContactType, contact_class_iris: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let contact_class_iris: Vec<String> =
            contact_class_iris.into_iter().map(Into::into).collect();
        let context_supported = contact_class_iris.iter().any(|iri| iri == nco::PERSON_CONTACT);

        Self {
            contact_type,
            contact_class_iris,
            context_supported,
            details: BTreeMap::new(),
            definitions: OnceLock::new(),
            value_types: OnceLock::new(),
        }
    }

    /// Whether `name` is one of the [`SYNTHETIC_DETAILS`].
    pub fn is_synthetic_detail(name: &str) -> bool {
        SYNTHETIC_DETAILS.contains(&name)
    }

    fn is_original_iri(&self, iri: &str) -> bool {
        iri != nco::CONTACT && self.contact_class_iris.iter().any(|class| class == iri)
    }

    /// Add a detail definition.
    ///
    /// Fields whose first hop is declared on one of this schema's own classes are marked
    /// original, and context support is dropped when the schema cannot store contexts.
    pub fn register(&mut self, mut detail: DetailDefinition) -> Result<()> {
        detail.validate()?;

        if self.details.contains_key(&detail.name) {
            return Err(CompileError::schema(format!(
                "detail {} registered twice",
                detail.name
            )));
        }

        let original: Vec<Option<bool>> = detail
            .fields
            .iter()
            .map(|field| {
                if field.is_original {
                    return None;
                }
                field
                    .property_chain
                    .first()
                    .or_else(|| field.sub_type_properties.first())
                    .map(|property| self.is_original_iri(&property.domain_iri))
            })
            .collect();

        for (field, original) in detail.fields_mut().iter_mut().zip(original) {
            if let Some(original) = original {
                field.is_original = original;
            }
        }

        detail.has_context = detail.has_context && self.context_supported;

        log::trace!("registered {} detail {}", self.contact_type, detail.name);
        self.details.insert(detail.name.clone(), detail);
        self.definitions = OnceLock::new();
        self.value_types = OnceLock::new();

        Ok(())
    }

    /// Add a detail definition, builder style.
    pub fn with_detail(mut self, detail: DetailDefinition) -> Result<Self> {
        self.register(detail)?;
        Ok(self)
    }

    /// Contact type described.
    pub fn contact_type(&self) -> ContactType {
        self.contact_type
    }

    /// Classes every contact of this type has.
    pub fn contact_class_iris(&self) -> &[String] {
        &self.contact_class_iris
    }

    /// Whether details of this schema can carry contexts.
    pub fn is_context_supported(&self) -> bool {
        self.context_supported
    }

    /// All detail definitions by name.
    pub fn details(&self) -> &BTreeMap<String, DetailDefinition> {
        &self.details
    }

    /// Detail definition `name`.
    pub fn detail(&self, name: &str) -> Option<&DetailDefinition> {
        self.details.get(name)
    }

    /// Public description of detail `name`; internal details are not described.
    pub fn describe(&self, name: &str) -> Option<DetailDescription> {
        self.detail(name)
            .filter(|detail| !detail.is_internal)
            .map(DetailDefinition::describe)
    }

    /// Public descriptions of all details except the internal ones.
    pub fn definitions(&self) -> &BTreeMap<String, DetailDescription> {
        self.definitions.get_or_init(|| {
            self.details
                .values()
                .filter(|detail| !detail.is_internal)
                .map(|detail| (detail.name.clone(), detail.describe()))
                .collect()
        })
    }

    /// Every class and individual IRI referenced by enumerations.
    ///
    /// Decoding needs their numeric ids, so a caller resolves them once up front.
    pub fn required_identifiers(&self) -> BTreeSet<String> {
        let mut iris = BTreeSet::new();

        for field in self.details.values().flat_map(|detail| &detail.fields) {
            iris.extend(field.sub_type_classes.iter().map(|class| class.iri.clone()));
            iris.extend(
                field
                    .allowable_instances
                    .iter()
                    .map(|instance| instance.iri.clone()),
            );
        }

        iris
    }

    /// Value types declared by any field.
    pub fn supported_value_types(&self) -> &[ValueType] {
        self.value_types.get_or_init(|| {
            let mut types: Vec<ValueType> = Vec::new();
            for field in self.details.values().flat_map(|detail| &detail.fields) {
                if !types.contains(&field.data_type) {
                    types.push(field.data_type);
                }
            }
            types
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::{ClassDescriptor, PropertyDescriptor};
    use crate::vocab::{nco, xsd};

    fn name_detail() -> DetailDefinition {
        DetailDefinition::new("Name").unique().with_field(
            FieldDefinition::new("FirstName").with_chain(vec![PropertyDescriptor::new(
                nco::NAME_GIVEN,
                nco::PERSON_CONTACT,
                xsd::STRING,
            )]),
        )
    }

    fn phone_detail() -> DetailDefinition {
        DetailDefinition::new("PhoneNumber")
            .with_context()
            .with_field(
                FieldDefinition::new("PhoneNumber").with_chain(vec![
                    PropertyDescriptor::new(nco::HAS_PHONE_NUMBER, nco::ROLE, nco::PHONE_NUMBER)
                        .multi_valued()
                        .has_detail_uri(),
                    PropertyDescriptor::new(
                        nco::PHONE_NUMBER_PROPERTY,
                        nco::PHONE_NUMBER,
                        xsd::STRING,
                    ),
                ]),
            )
            .with_field(
                FieldDefinition::new("SubTypes")
                    .with_type(ValueType::StringList)
                    .with_sub_type_classes(vec![ClassDescriptor::new(
                        nco::CELL_PHONE_NUMBER,
                        "Mobile",
                    )]),
            )
    }

    #[test]
    fn test_register_marks_original_fields() {
        let schema = Schema::new(ContactType::Person, [nco::PERSON_CONTACT])
            .with_detail(name_detail())
            .unwrap()
            .with_detail(phone_detail())
            .unwrap();

        let name = schema.detail("Name").unwrap();
        assert!(name.field("FirstName").unwrap().is_original);

        let phone = schema.detail("PhoneNumber").unwrap();
        assert!(!phone.field("PhoneNumber").unwrap().is_original);
        assert!(phone.has_context);
    }

    #[test]
    fn test_groups_do_not_support_context() {
        let schema = Schema::new(ContactType::Group, [nco::CONTACT_GROUP, nco::CONTACT])
            .with_detail(phone_detail())
            .unwrap();
        assert!(!schema.is_context_supported());
        assert!(!schema.detail("PhoneNumber").unwrap().has_context);
    }

    #[test]
    fn test_register_twice_fails() {
        let mut schema = Schema::new(ContactType::Person, [nco::PERSON_CONTACT]);
        schema.register(name_detail()).unwrap();
        assert!(matches!(
            schema.register(name_detail()),
            Err(CompileError::SchemaInconsistency { .. })
        ));
    }

    #[test]
    fn test_definitions_skip_internal_details() {
        let schema = Schema::new(ContactType::Person, [nco::PERSON_CONTACT])
            .with_detail(name_detail())
            .unwrap()
            .with_detail(DetailDefinition::new("Hidden").internal().with_field(
                FieldDefinition::new("Value").synthesized(),
            ))
            .unwrap();

        assert!(schema.definitions().contains_key("Name"));
        assert!(!schema.definitions().contains_key("Hidden"));
        assert!(schema.describe("Hidden").is_none());
        assert!(schema.detail("Hidden").is_some());
    }

    #[test]
    fn test_required_identifiers_and_types() {
        let schema = Schema::new(ContactType::Person, [nco::PERSON_CONTACT])
            .with_detail(phone_detail())
            .unwrap();
        assert!(schema.required_identifiers().contains(nco::CELL_PHONE_NUMBER));
        assert_eq!(
            schema.supported_value_types(),
            [ValueType::String, ValueType::StringList]
        );
    }

    #[test]
    fn test_synthetic_details() {
        assert!(Schema::is_synthetic_detail("Avatar"));
        assert!(!Schema::is_synthetic_detail("Name"));
    }
}
