//! Static bindings from detail fields to graph vocabulary.
//!
//! A [`PropertyDescriptor`] describes one hop of a property chain: the predicate IRI, its
//! domain and range, cardinality, direction and the write-path markers. A
//! [`PropertyChain`] is the ordered path from the contact to a field value; building one
//! links every hop to its predecessor. [`ClassDescriptor`] and [`InstanceDescriptor`] bind
//! enumeration values to classes and named individuals.

use crate::conversion::Conversion;
use crate::subject::SubjectScheme;
use crate::value::Value;
use std::ops::Index;

/// Facts about the previous hop of a chain needed to derive identifiers of this hop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParentLink {
    /// Whether the previous hop is traversed against its direction
    pub inverse: bool,
}

/// One hop of a property chain.
///
/// # Examples
///
/// ```
/// use contactgraph::resource::PropertyDescriptor;
/// use contactgraph::vocab::nco;
///
/// let has_email = PropertyDescriptor::new(nco::HAS_EMAIL_ADDRESS, nco::ROLE, nco::EMAIL_ADDRESS)
///     .multi_valued()
///     .has_detail_uri()
///     .defines_ownership();
///
/// assert!(!has_email.single_valued);
/// assert!(has_email.has_detail_uri);
/// ```
#[derive(Debug, Clone)]
pub struct PropertyDescriptor {
    /// Predicate IRI
    pub iri: String,
    /// Class the predicate is declared on
    pub domain_iri: String,
    /// Class or datatype of the predicate's values
    pub range_iri: String,
    /// At most one value per subject
    pub single_valued: bool,
    /// Traversed from object to subject
    pub inverse: bool,
    /// Never written by the write path
    pub read_only: bool,
    /// Value identifies a resource shared between contacts
    pub foreign_key: bool,
    /// The resource reached by this hop is what the detail URI names
    pub has_detail_uri: bool,
    /// Resources reached by this hop are owned by the contact's graph
    pub defines_ownership: bool,
    /// Foreign key matching respects case
    pub case_sensitive: bool,
    /// Enumeration value selected by this property when it is used as a sub-type
    pub value: Option<Value>,
    /// Conversion applied when the property is computed from a field value
    pub conversion: Option<Conversion>,
    /// Link to the previous hop, set when the chain is assembled
    pub parent: Option<ParentLink>,
}

impl PartialEq for PropertyDescriptor {
    fn eq(&self, other: &Self) -> bool {
        self.iri == other.iri && self.inverse == other.inverse
    }
}

impl Eq for PropertyDescriptor {}

impl PropertyDescriptor {
    /// Create a single-valued descriptor.
    pub fn new(
        iri: impl Into<String>,
        domain_iri: impl Into<String>,
        range_iri: impl Into<String>,
    ) -> Self {
        Self {
            iri: iri.into(),
            domain_iri: domain_iri.into(),
            range_iri: range_iri.into(),
            single_valued: true,
            inverse: false,
            read_only: false,
            foreign_key: false,
            has_detail_uri: false,
            defines_ownership: false,
            case_sensitive: true,
            value: None,
            conversion: None,
            parent: None,
        }
    }

    /// Allow several values per subject.
    pub fn multi_valued(mut self) -> Self {
        self.single_valued = false;
        self
    }

    /// Traverse the property from object to subject.
    pub fn inverse(mut self) -> Self {
        self.inverse = true;
        self
    }

    /// Mark the hop read-only when `read_only` holds.
    pub fn read_only(mut self, read_only: bool) -> Self {
        self.read_only = read_only;
        self
    }

    /// Mark the value as key of a shared resource.
    pub fn foreign_key(mut self) -> Self {
        self.foreign_key = true;
        self
    }

    /// Mark the hop as the one reaching the detail's resource.
    pub fn has_detail_uri(mut self) -> Self {
        self.has_detail_uri = true;
        self
    }

    /// Mark the hop as deciding ownership of the reached resource.
    pub fn defines_ownership(mut self) -> Self {
        self.defines_ownership = true;
        self
    }

    /// Compare foreign keys case-insensitively.
    pub fn case_insensitive(mut self) -> Self {
        self.case_sensitive = false;
        self
    }

    /// Bind an enumeration value, for sub-type properties.
    pub fn with_value(mut self, value: impl Into<Value>) -> Self {
        self.value = Some(value.into());
        self
    }

    /// Attach a conversion, for computed properties.
    pub fn with_conversion(mut self, conversion: Conversion) -> Self {
        self.conversion = Some(conversion);
        self
    }

    /// Identifier scheme of the domain class.
    pub fn domain_scheme(&self) -> SubjectScheme {
        SubjectScheme::for_class(&self.domain_iri)
    }

    /// Identifier scheme of the range class.
    pub fn range_scheme(&self) -> SubjectScheme {
        SubjectScheme::for_class(&self.range_iri)
    }

    /// Identifier scheme of the resource this hop leads to.
    ///
    /// When the reached class has no scheme, the scheme of the class this hop leaves is
    /// used, looking through the direction of the previous hop.
    pub fn resource_iri_scheme(&self) -> SubjectScheme {
        let scheme = if self.inverse {
            self.domain_scheme()
        } else {
            self.range_scheme()
        };

        match (scheme, self.parent) {
            (SubjectScheme::None, Some(parent)) if !parent.inverse => self.domain_scheme(),
            (SubjectScheme::None, Some(_)) => self.range_scheme(),
            _ => scheme,
        }
    }

    /// Class of the resource this hop leads to.
    pub fn resource_type_iri(&self) -> &str {
        if self.inverse {
            &self.domain_iri
        } else {
            &self.range_iri
        }
    }

    /// Content-addressed IRI of the resource holding `value`, if the scheme allows one.
    pub fn make_resource_iri(&self, value: &Value) -> Option<String> {
        self.resource_iri_scheme()
            .make_iri(std::slice::from_ref(value))
    }
}

/// A binding between an enumeration value and a class IRI.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassDescriptor {
    /// Class IRI
    pub iri: String,
    /// Enumeration value selecting the class
    pub value: Value,
}

impl ClassDescriptor {
    /// Create a class binding.
    pub fn new(iri: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            iri: iri.into(),
            value: value.into(),
        }
    }
}

/// A binding between an enumeration value and a named individual.
#[derive(Debug, Clone, PartialEq)]
pub struct InstanceDescriptor {
    /// Individual's IRI
    pub iri: String,
    /// Enumeration value selecting the individual
    pub value: Value,
}

impl InstanceDescriptor {
    /// Create an instance binding.
    pub fn new(iri: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            iri: iri.into(),
            value: value.into(),
        }
    }
}

/// Ordered path of properties from a subject to a value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PropertyChain {
    properties: Vec<PropertyDescriptor>,
}

impl PropertyChain {
    /// Assemble a chain, linking each hop to its predecessor.
    pub fn new(properties: Vec<PropertyDescriptor>) -> Self {
        Self::linked(properties, None)
    }

    /// Assemble a chain whose first hop continues after `parent`.
    pub fn linked(mut properties: Vec<PropertyDescriptor>, parent: Option<ParentLink>) -> Self {
        let mut previous = parent;

        for property in &mut properties {
            property.parent = previous;
            previous = Some(ParentLink {
                inverse: property.inverse,
            });
        }

        Self { properties }
    }

    /// Number of hops.
    pub fn len(&self) -> usize {
        self.properties.len()
    }

    /// Whether the chain has no hops.
    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }

    /// Iterate over the hops.
    pub fn iter(&self) -> std::slice::Iter<'_, PropertyDescriptor> {
        self.properties.iter()
    }

    /// The hops as a slice.
    pub fn as_slice(&self) -> &[PropertyDescriptor] {
        &self.properties
    }

    /// First hop.
    pub fn first(&self) -> Option<&PropertyDescriptor> {
        self.properties.first()
    }

    /// Last hop.
    pub fn last(&self) -> Option<&PropertyDescriptor> {
        self.properties.last()
    }

    /// Predicate IRIs of all hops.
    pub fn iris(&self) -> Vec<&str> {
        self.properties.iter().map(|p| p.iri.as_str()).collect()
    }

    /// Whether `prefix` is a prefix of this chain.
    pub fn starts_with(&self, prefix: &[PropertyDescriptor]) -> bool {
        self.properties.starts_with(prefix)
    }

    /// Copy of the hops in `range`.
    pub fn slice(&self, range: std::ops::Range<usize>) -> PropertyChain {
        PropertyChain {
            properties: self.properties[range].to_vec(),
        }
    }

    /// The chain without its first hop.
    pub fn without_first(&self) -> PropertyChain {
        self.slice(self.len().min(1)..self.len())
    }

    /// The chain without its last hop.
    pub fn without_last(&self) -> PropertyChain {
        self.slice(0..self.len().saturating_sub(1))
    }

    /// The chain with `last` replacing the final hop.
    pub fn with_last(&self, last: PropertyDescriptor) -> PropertyChain {
        let mut properties = self.without_last().properties;
        properties.push(last);
        PropertyChain::new(properties)
    }

    /// The chain with `first` prepended.
    pub fn prepended(&self, first: PropertyDescriptor) -> PropertyChain {
        let mut properties = vec![first];
        properties.extend(self.properties.iter().cloned());
        PropertyChain::new(properties)
    }

    /// Index of the first foreign key hop.
    pub fn foreign_key_index(&self) -> Option<usize> {
        self.properties.iter().position(|p| p.foreign_key)
    }

    /// Index of the hop reaching the detail's resource.
    pub fn detail_uri_index(&self) -> Option<usize> {
        self.properties.iter().position(|p| p.has_detail_uri)
    }

    /// Index of the first ownership defining hop.
    pub fn ownership_index(&self) -> Option<usize> {
        self.properties.iter().position(|p| p.defines_ownership)
    }

    /// Whether any hop is traversed inversely.
    pub fn has_inverse(&self) -> bool {
        self.properties.iter().any(|p| p.inverse)
    }

    /// Whether any hop is read-only.
    pub fn is_read_only(&self) -> bool {
        self.properties.iter().any(|p| p.read_only)
    }

    /// Whether every hop is single valued.
    ///
    /// Unless `strict` is set the last hop may be multi-valued: its values arrive as a
    /// separated list in the same column.
    pub fn is_single_valued(&self, strict: bool) -> bool {
        let checked = if strict {
            self.len()
        } else {
            self.len().saturating_sub(1)
        };

        self.properties[..checked].iter().all(|p| p.single_valued)
    }
}

impl Index<usize> for PropertyChain {
    type Output = PropertyDescriptor;

    fn index(&self, index: usize) -> &Self::Output {
        &self.properties[index]
    }
}

impl<'a> IntoIterator for &'a PropertyChain {
    type Item = &'a PropertyDescriptor;
    type IntoIter = std::slice::Iter<'a, PropertyDescriptor>;

    fn into_iter(self) -> Self::IntoIter {
        self.properties.iter()
    }
}

impl From<Vec<PropertyDescriptor>> for PropertyChain {
    fn from(properties: Vec<PropertyDescriptor>) -> Self {
        Self::new(properties)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vocab::{nao, nco, rdfs, xsd};

    fn email_chain() -> PropertyChain {
        PropertyChain::new(vec![
            PropertyDescriptor::new(nco::HAS_EMAIL_ADDRESS, nco::ROLE, nco::EMAIL_ADDRESS)
                .multi_valued()
                .has_detail_uri()
                .defines_ownership(),
            PropertyDescriptor::new(nco::EMAIL_ADDRESS_PROPERTY, nco::EMAIL_ADDRESS, xsd::STRING)
                .foreign_key(),
        ])
    }

    #[test]
    fn test_chain_links_parents() {
        let chain = email_chain();
        assert_eq!(chain[0].parent, None);
        assert_eq!(chain[1].parent, Some(ParentLink { inverse: false }));
    }

    #[test]
    fn test_resource_iri_scheme_falls_back_to_domain() {
        let chain = email_chain();
        assert_eq!(chain[0].resource_iri_scheme(), SubjectScheme::EmailAddress);
        // literal range, so the owning resource's scheme applies
        assert_eq!(chain[1].resource_iri_scheme(), SubjectScheme::EmailAddress);
        assert_eq!(
            chain[1].make_resource_iri(&Value::from("ada@example.com")).as_deref(),
            Some("mailto:ada@example.com")
        );
    }

    #[test]
    fn test_chain_classification() {
        let chain = email_chain();
        assert_eq!(chain.foreign_key_index(), Some(1));
        assert_eq!(chain.detail_uri_index(), Some(0));
        assert_eq!(chain.ownership_index(), Some(0));
        assert!(chain.is_single_valued(false));
        assert!(!chain.is_single_valued(true));
    }

    #[test]
    fn test_chain_editing() {
        let chain = email_chain();
        assert_eq!(chain.without_first().iris(), vec![nco::EMAIL_ADDRESS_PROPERTY]);
        assert_eq!(chain.without_last().iris(), vec![nco::HAS_EMAIL_ADDRESS]);

        let tag = PropertyDescriptor::new(nao::HAS_TAG, rdfs::RESOURCE, nao::TAG);
        let replaced = chain.with_last(tag.clone());
        assert_eq!(replaced.iris(), vec![nco::HAS_EMAIL_ADDRESS, nao::HAS_TAG]);
        assert!(replaced.starts_with(&chain.as_slice()[..1]));

        let prepended = chain.prepended(tag);
        assert_eq!(prepended.len(), 3);
        assert_eq!(prepended[1].parent, Some(ParentLink { inverse: false }));
    }

    #[test]
    fn test_inverse_resource_type() {
        let account = PropertyDescriptor::new(nco::HAS_IM_CONTACT, nco::IM_ACCOUNT, nco::IM_ADDRESS)
            .inverse();
        assert_eq!(account.resource_type_iri(), nco::IM_ACCOUNT);
        assert_eq!(account.resource_iri_scheme(), SubjectScheme::Telepathy);
    }
}
