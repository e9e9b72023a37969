//! Detail definitions and their derived chain classifications.

use super::field::{FieldDefinition, FieldDescription};
use crate::error::{CompileError, Result};
use crate::model::{Detail, FIELD_CONTEXT, FIELD_DETAIL_URI};
use crate::resource::PropertyChain;
use crate::subject::SubjectScheme;
use crate::value::{Value, ValueType};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::OnceLock;

/// Chooses the concrete detail a synthesized detail is stored as.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImplementationResolver {
    /// Use `linked` when one of the detail's linked URIs names a sibling detail of
    /// definition `account_detail`, else `fallback`.
    LinkedAccount {
        /// Definition of the sibling details looked for
        account_detail: String,
        /// Implementation used for details linked to such a sibling
        linked: String,
        /// Implementation used otherwise
        fallback: String,
    },
}

impl ImplementationResolver {
    /// Name of the implementation `detail` is stored as.
    pub fn resolve<'a>(&'a self, detail: &Detail, siblings: &[Detail]) -> &'a str {
        match self {
            ImplementationResolver::LinkedAccount {
                account_detail,
                linked,
                fallback,
            } => {
                let is_linked = detail.linked_detail_uris().iter().any(|uri| {
                    siblings.iter().any(|sibling| {
                        sibling.definition_name() == account_detail
                            && sibling.detail_uri() == Some(uri.as_str())
                    })
                });

                if is_linked {
                    linked
                } else {
                    fallback
                }
            }
        }
    }
}

/// Public description of a detail.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DetailDescription {
    /// Definition name
    pub name: String,
    /// At most one instance per contact
    pub unique: bool,
    /// Field descriptions by name
    pub fields: BTreeMap<String, FieldDescription>,
}

#[derive(Debug, Default)]
struct ChainSets {
    predicate: Vec<PropertyChain>,
    foreign_key: Vec<PropertyChain>,
    possessed: Vec<PropertyChain>,
    custom_value: Vec<PropertyChain>,
}

fn push_unique(chains: &mut Vec<PropertyChain>, chain: PropertyChain) {
    if !chains.contains(&chain) {
        chains.push(chain);
    }
}

/// How one detail maps onto the graph.
#[derive(Debug)]
pub struct DetailDefinition {
    /// Definition name
    pub name: String,
    /// Fields in declaration order
    pub fields: Vec<FieldDefinition>,
    /// At most one instance per contact
    pub is_unique: bool,
    /// Instances may be assigned to contexts
    pub has_context: bool,
    /// Implementation detail of a synthesized detail, not visible to clients
    pub is_internal: bool,
    /// Scheme of detail URIs, overriding the scheme of the detail's resource
    pub detail_uri_scheme: SubjectScheme,
    /// Details a synthesized detail is derived from
    pub dependencies: Vec<String>,
    /// Chooses the implementation of a synthesized detail
    pub resolver: Option<ImplementationResolver>,
    chains: OnceLock<ChainSets>,
    detail_uri_field: OnceLock<Option<FieldDefinition>>,
}

impl Clone for DetailDefinition {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            fields: self.fields.clone(),
            is_unique: self.is_unique,
            has_context: self.has_context,
            is_internal: self.is_internal,
            detail_uri_scheme: self.detail_uri_scheme,
            dependencies: self.dependencies.clone(),
            resolver: self.resolver.clone(),
            chains: OnceLock::new(),
            detail_uri_field: OnceLock::new(),
        }
    }
}

impl DetailDefinition {
    /// Create a repeatable detail without fields.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: Vec::new(),
            is_unique: false,
            has_context: false,
            is_internal: false,
            detail_uri_scheme: SubjectScheme::None,
            dependencies: Vec::new(),
            resolver: None,
            chains: OnceLock::new(),
            detail_uri_field: OnceLock::new(),
        }
    }

    /// Append a field.
    pub fn with_field(mut self, field: FieldDefinition) -> Self {
        self.fields.push(field);
        self.invalidate();
        self
    }

    /// Allow at most one instance per contact.
    pub fn unique(mut self) -> Self {
        self.is_unique = true;
        self
    }

    /// Allow contexts.
    pub fn with_context(mut self) -> Self {
        self.has_context = true;
        self
    }

    /// Hide from clients.
    pub fn internal(mut self) -> Self {
        self.is_internal = true;
        self
    }

    /// Override the scheme of detail URIs.
    pub fn with_detail_uri_scheme(mut self, scheme: SubjectScheme) -> Self {
        self.detail_uri_scheme = scheme;
        self
    }

    /// Add a detail this one is derived from.
    pub fn with_dependency(mut self, name: impl Into<String>) -> Self {
        self.dependencies.push(name.into());
        self
    }

    /// Set the implementation resolver.
    pub fn with_resolver(mut self, resolver: ImplementationResolver) -> Self {
        self.resolver = Some(resolver);
        self
    }

    pub(crate) fn fields_mut(&mut self) -> &mut [FieldDefinition] {
        self.invalidate();
        &mut self.fields
    }

    fn invalidate(&mut self) {
        self.chains = OnceLock::new();
        self.detail_uri_field = OnceLock::new();
    }

    /// Whether values are derived from dependencies instead of being stored.
    pub fn is_synthesized(&self) -> bool {
        !self.dependencies.is_empty()
    }

    /// Field named `name`, including the synthesized detail URI field.
    pub fn field(&self, name: &str) -> Option<&FieldDefinition> {
        self.fields
            .iter()
            .find(|field| field.name == name)
            .or_else(|| match name {
                FIELD_DETAIL_URI => self.detail_uri_field(),
                _ => None,
            })
    }

    /// The field whose chain reaches the detail's resource.
    pub fn resource_iri_field(&self) -> Option<&FieldDefinition> {
        self.fields.iter().find(|field| field.has_detail_uri())
    }

    /// The field encoding sub-types.
    pub fn sub_type_field(&self) -> Option<&FieldDefinition> {
        self.fields.iter().find(|field| field.has_sub_types())
    }

    /// Whether the detail's resource has an IRI.
    pub fn has_detail_uri(&self) -> bool {
        self.resource_iri_field().is_some()
    }

    /// Synthesized URL field reading the IRI of the detail's resource.
    pub fn detail_uri_field(&self) -> Option<&FieldDefinition> {
        self.detail_uri_field
            .get_or_init(|| {
                let subject = self.resource_iri_field()?;
                let chain = &subject.property_chain;
                let chain = if chain.len() > 1 {
                    chain.without_last()
                } else {
                    chain.clone()
                };

                let mut field = FieldDefinition::new(FIELD_DETAIL_URI).with_type(ValueType::Url);
                field.property_chain = chain;
                Some(field)
            })
            .as_ref()
    }

    /// Scheme of the resource reached by the detail URI hop.
    pub fn resource_iri_scheme(&self) -> SubjectScheme {
        self.fields
            .iter()
            .find_map(FieldDefinition::detail_uri_property)
            .map(|property| property.resource_iri_scheme())
            .unwrap_or_default()
    }

    /// Scheme of detail URIs exposed to clients.
    pub fn detail_uri_scheme(&self) -> SubjectScheme {
        match self.detail_uri_scheme {
            SubjectScheme::None => self.resource_iri_scheme(),
            scheme => scheme,
        }
    }

    fn chain_sets(&self) -> &ChainSets {
        self.chains.get_or_init(|| {
            let mut sets = ChainSets::default();

            for field in self.fields.iter().filter(|f| f.has_property_chain()) {
                let chain = &field.property_chain;
                let end = chain
                    .iter()
                    .position(|property| property.inverse)
                    .unwrap_or(chain.len());
                let predicates = chain.slice(0..end.saturating_sub(1));

                if predicates.is_empty() {
                    continue;
                }
                if field.is_foreign_key() {
                    push_unique(&mut sets.foreign_key, predicates.clone());
                }
                push_unique(&mut sets.predicate, predicates);
            }

            let possessed: Vec<PropertyChain> = sets
                .predicate
                .iter()
                .filter(|chain| {
                    !sets
                        .foreign_key
                        .iter()
                        .any(|key| chain.starts_with(key.as_slice()))
                })
                .cloned()
                .collect();
            sets.possessed = possessed;

            for field in &self.fields {
                if !field.permits_custom_values || !field.has_property_chain() {
                    continue;
                }

                let chain = if field.sub_type_classes.is_empty() && !field.is_without_mapping {
                    field.property_chain.without_last()
                } else {
                    field.property_chain.clone()
                };

                if !chain.is_empty() {
                    push_unique(&mut sets.custom_value, chain);
                }
            }

            sets
        })
    }

    /// Chains leading to resources holding field values, up to the first inverse hop.
    pub fn predicate_chains(&self) -> &[PropertyChain] {
        &self.chain_sets().predicate
    }

    /// Predicate chains of foreign key fields.
    pub fn foreign_key_chains(&self) -> &[PropertyChain] {
        &self.chain_sets().foreign_key
    }

    /// Predicate chains not prefixed by a foreign key chain.
    pub fn possessed_chains(&self) -> &[PropertyChain] {
        &self.chain_sets().possessed
    }

    /// Chains leading to the resources custom values are attached to.
    pub fn custom_value_chains(&self) -> &[PropertyChain] {
        &self.chain_sets().custom_value
    }

    /// Whether `chain` leads to privately owned resources.
    pub fn is_possessed_chain(&self, chain: &PropertyChain) -> bool {
        !self
            .foreign_key_chains()
            .iter()
            .any(|key| chain.starts_with(key.as_slice()))
    }

    /// Public description of this detail.
    pub fn describe(&self) -> DetailDescription {
        let mut fields = BTreeMap::new();

        if self.has_context {
            fields.insert(
                FIELD_CONTEXT.to_string(),
                FieldDescription {
                    data_type: ValueType::StringList,
                    allowable_values: vec![
                        Value::from(crate::model::CONTEXT_HOME),
                        Value::from(crate::model::CONTEXT_WORK),
                    ],
                },
            );
        }

        for field in &self.fields {
            fields.insert(field.name.clone(), field.describe());
        }

        DetailDescription {
            name: self.name.clone(),
            unique: self.is_unique,
            fields,
        }
    }

    /// Check the detail and its fields.
    pub fn validate(&self) -> Result<()> {
        for field in &self.fields {
            field.validate()?;
        }

        let mut detail_uri_properties = self
            .fields
            .iter()
            .filter_map(FieldDefinition::detail_uri_property);

        if let Some(first) = detail_uri_properties.next() {
            if detail_uri_properties.any(|property| property.iri != first.iri) {
                return Err(CompileError::schema(format!(
                    "{}: detail uri carried by different properties",
                    self.name
                )));
            }
        }

        if self.is_unique {
            let multi_valued_root = self
                .fields
                .iter()
                .filter(|field| !field.is_synthesized && field.data_type != ValueType::StringList)
                .filter_map(|field| field.property_chain.first())
                .filter(|root| root.iri != crate::vocab::nco::HAS_AFFILIATION)
                .any(|root| !root.single_valued && !root.inverse);

            if multi_valued_root {
                return Err(CompileError::schema(format!(
                    "{}: unique detail with multi-valued root property",
                    self.name
                )));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conversion::Conversion;
    use crate::resource::PropertyDescriptor;
    use crate::vocab::{nao, nco, nie, rdfs, xsd};

    fn email() -> DetailDefinition {
        let has_email = PropertyDescriptor::new(nco::HAS_EMAIL_ADDRESS, nco::ROLE, nco::EMAIL_ADDRESS)
            .multi_valued()
            .has_detail_uri()
            .defines_ownership();

        DetailDefinition::new("EmailAddress").with_field(
            FieldDefinition::new("EmailAddress").with_chain(vec![
                has_email,
                PropertyDescriptor::new(nco::EMAIL_ADDRESS_PROPERTY, nco::EMAIL_ADDRESS, xsd::STRING)
                    .foreign_key(),
            ]),
        )
    }

    fn avatar() -> DetailDefinition {
        DetailDefinition::new("PersonalAvatar")
            .unique()
            .with_field(
                FieldDefinition::new("ImageUrl")
                    .with_type(ValueType::Url)
                    .with_conversion(Conversion::UriAsForeignKey)
                    .with_chain(vec![
                        PropertyDescriptor::new(nco::PHOTO, nco::CONTACT, nfo_file())
                            .defines_ownership(),
                        PropertyDescriptor::new(nie::URL, nie::DATA_OBJECT, rdfs::RESOURCE)
                            .foreign_key(),
                    ]),
            )
    }

    fn nfo_file() -> &'static str {
        crate::vocab::nfo::FILE_DATA_OBJECT
    }

    #[test]
    fn test_predicate_chains_drop_value_hop() {
        let detail = email();
        assert_eq!(detail.predicate_chains().len(), 1);
        assert_eq!(detail.predicate_chains()[0].iris(), vec![nco::HAS_EMAIL_ADDRESS]);
        assert_eq!(detail.foreign_key_chains(), detail.predicate_chains());
        assert!(detail.possessed_chains().is_empty());
    }

    #[test]
    fn test_detail_uri_field() {
        let detail = email();
        let field = detail.field(FIELD_DETAIL_URI).unwrap();
        assert_eq!(field.data_type, ValueType::Url);
        assert_eq!(field.property_chain.iris(), vec![nco::HAS_EMAIL_ADDRESS]);
        assert_eq!(detail.detail_uri_scheme(), SubjectScheme::EmailAddress);
        assert!(avatar().field(FIELD_DETAIL_URI).is_none());
    }

    #[test]
    fn test_detail_uri_scheme_override() {
        let detail = email().with_detail_uri_scheme(SubjectScheme::Telepathy);
        assert_eq!(detail.detail_uri_scheme(), SubjectScheme::Telepathy);
        assert_eq!(detail.resource_iri_scheme(), SubjectScheme::EmailAddress);
    }

    #[test]
    fn test_custom_value_chains() {
        let tags = DetailDefinition::new("Tag").with_field(
            FieldDefinition::new("Tag")
                .permits_custom_values()
                .with_chain(vec![
                    PropertyDescriptor::new(nao::HAS_TAG, rdfs::RESOURCE, nao::TAG).multi_valued(),
                    PropertyDescriptor::new(nao::PREF_LABEL, rdfs::RESOURCE, xsd::STRING),
                ]),
        );
        assert_eq!(tags.custom_value_chains()[0].iris(), vec![nao::HAS_TAG]);
    }

    #[test]
    fn test_describe_adds_context() {
        let description = email().with_context().describe();
        assert!(description.fields.contains_key(FIELD_CONTEXT));
        assert!(description.fields.contains_key("EmailAddress"));
        assert!(!description.unique);
    }

    #[test]
    fn test_unique_detail_validation() {
        assert!(avatar().validate().is_ok());
        assert!(email().unique().validate().is_err());
    }

    #[test]
    fn test_linked_account_resolver() {
        let resolver = ImplementationResolver::LinkedAccount {
            account_detail: "OnlineAccount".into(),
            linked: "OnlineAvatar".into(),
            fallback: "PersonalAvatar".into(),
        };
        let account = Detail::new("OnlineAccount").with_detail_uri("telepathy:/acc!me");
        let linked = Detail::new("Avatar").with_linked_detail_uri("telepathy:/acc!me");
        let plain = Detail::new("Avatar");

        assert_eq!(resolver.resolve(&linked, &[account.clone()]), "OnlineAvatar");
        assert_eq!(resolver.resolve(&plain, &[account]), "PersonalAvatar");
    }
}
