//! Field definitions.

use crate::conversion::Conversion;
use crate::error::{CompileError, ConversionError, Result};
use crate::resource::{ClassDescriptor, InstanceDescriptor, PropertyChain, PropertyDescriptor};
use crate::sparql::{Expression, Function};
use crate::value::{Value, ValueType};
use serde::Serialize;

/// Separator between the items of a string list in stored values.
pub const STORED_LIST_SEPARATOR: char = '\u{1f}';

/// Transformation applied to a field's value expression inside read queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryTransform {
    /// Append the UTC offset: `concat(v, "|", fn:timezone-from-dateTime(v))`
    DateTimeOffset,
    /// Replace a resource by its numeric id
    TrackerId,
}

impl QueryTransform {
    /// Wrap `value` in this transformation.
    pub fn apply(&self, value: Expression) -> Expression {
        match self {
            QueryTransform::DateTimeOffset => Expression::concat(vec![
                value.clone(),
                Expression::separator(crate::conversion::DATE_TIME_SEPARATOR),
                Expression::call(Function::TimezoneFromDateTime, vec![value]),
            ]),
            QueryTransform::TrackerId => Expression::tracker_id(value),
        }
    }
}

/// Public description of a field.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldDescription {
    /// Declared type
    pub data_type: ValueType,
    /// Closed list of values, empty when the field is free-form
    pub allowable_values: Vec<Value>,
}

/// How one field of a detail maps onto the graph.
#[derive(Debug, Clone)]
pub struct FieldDefinition {
    /// Field name
    pub name: String,
    /// Declared value type
    pub data_type: ValueType,
    /// Value used when the field is absent
    pub default_value: Value,
    /// Path from the contact to the value
    pub property_chain: PropertyChain,
    /// Properties derived from the value and stored next to it
    pub computed_properties: Vec<PropertyDescriptor>,
    /// Sub-types encoded by choosing one of these properties
    pub sub_type_properties: Vec<PropertyDescriptor>,
    /// Sub-types encoded as classes of the detail resource
    pub sub_type_classes: Vec<ClassDescriptor>,
    /// Closed list of literal values
    pub allowable_values: Vec<Value>,
    /// Closed list of named individuals
    pub allowable_instances: Vec<InstanceDescriptor>,
    /// The first hop belongs to the schema's own contact classes
    pub is_original: bool,
    /// Not persisted, derived from other values
    pub is_synthesized: bool,
    /// Stored through the generic `nao:Property` path
    pub is_without_mapping: bool,
    /// Values outside the closed lists are kept through the generic path
    pub permits_custom_values: bool,
    /// Provenance of the value is tracked
    pub has_owner: bool,
    /// Conversion between native and stored value
    pub conversion: Option<Conversion>,
    /// Transformation applied inside read queries
    pub transform: Option<QueryTransform>,
}

impl FieldDefinition {
    /// Create a string field without mapping information.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data_type: ValueType::String,
            default_value: Value::Null,
            property_chain: PropertyChain::default(),
            computed_properties: Vec::new(),
            sub_type_properties: Vec::new(),
            sub_type_classes: Vec::new(),
            allowable_values: Vec::new(),
            allowable_instances: Vec::new(),
            is_original: false,
            is_synthesized: false,
            is_without_mapping: false,
            permits_custom_values: false,
            has_owner: true,
            conversion: None,
            transform: None,
        }
    }

    /// Set the declared type.
    pub fn with_type(mut self, data_type: ValueType) -> Self {
        self.data_type = data_type;
        self
    }

    /// Set the default value.
    pub fn with_default(mut self, value: impl Into<Value>) -> Self {
        self.default_value = value.into();
        self
    }

    /// Set the property chain.
    pub fn with_chain(mut self, properties: Vec<PropertyDescriptor>) -> Self {
        self.property_chain = PropertyChain::new(properties);
        self
    }

    /// Add a computed property stored next to the value.
    pub fn with_computed(mut self, property: PropertyDescriptor) -> Self {
        self.computed_properties.push(property);
        self
    }

    /// Encode sub-types by property choice.
    pub fn with_sub_type_properties(mut self, properties: Vec<PropertyDescriptor>) -> Self {
        self.sub_type_properties = properties;
        self
    }

    /// Encode sub-types by class.
    pub fn with_sub_type_classes(mut self, classes: Vec<ClassDescriptor>) -> Self {
        self.sub_type_classes = classes;
        self
    }

    /// Restrict values to a closed list of literals.
    pub fn with_allowable_values<I, V>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.allowable_values = values.into_iter().map(Into::into).collect();
        self
    }

    /// Restrict values to a closed list of individuals.
    pub fn with_allowable_instances(mut self, instances: Vec<InstanceDescriptor>) -> Self {
        self.allowable_instances = instances;
        self
    }

    /// Mark the field as using the schema's own vocabulary.
    pub fn original(mut self) -> Self {
        self.is_original = true;
        self
    }

    /// Mark the field as derived and not persisted.
    pub fn synthesized(mut self) -> Self {
        self.is_synthesized = true;
        self
    }

    /// Store through the generic property path.
    pub fn without_mapping(mut self) -> Self {
        self.is_without_mapping = true;
        self
    }

    /// Keep values outside the closed lists.
    pub fn permits_custom_values(mut self) -> Self {
        self.permits_custom_values = true;
        self
    }

    /// Do not track provenance.
    pub fn without_owner(mut self) -> Self {
        self.has_owner = false;
        self
    }

    /// Set the conversion.
    pub fn with_conversion(mut self, conversion: Conversion) -> Self {
        self.conversion = Some(conversion);
        self
    }

    /// Set the read query transformation.
    pub fn with_transform(mut self, transform: QueryTransform) -> Self {
        self.transform = Some(transform);
        self
    }

    /// Whether the field has a property chain.
    pub fn has_property_chain(&self) -> bool {
        !self.property_chain.is_empty()
    }

    /// Whether values are limited to closed lists.
    pub fn restricts_values(&self) -> bool {
        !self.allowable_values.is_empty() || !self.allowable_instances.is_empty()
    }

    /// Whether the field encodes sub-types.
    pub fn has_sub_types(&self) -> bool {
        !self.sub_type_properties.is_empty() || !self.sub_type_classes.is_empty()
    }

    /// Whether several restricted values may be selected at once.
    pub fn allows_multiple_values(&self) -> bool {
        self.restricts_values() && self.data_type == ValueType::StringList
    }

    /// Whether a hop of the chain is a foreign key.
    pub fn is_foreign_key(&self) -> bool {
        self.property_chain.foreign_key_index().is_some()
    }

    /// Whether a hop of the chain reaches the detail's resource.
    pub fn has_detail_uri(&self) -> bool {
        self.property_chain.detail_uri_index().is_some()
    }

    /// The hop reaching the detail's resource.
    pub fn detail_uri_property(&self) -> Option<&PropertyDescriptor> {
        self.property_chain
            .detail_uri_index()
            .map(|index| &self.property_chain[index])
    }

    /// Whether a hop of the chain decides ownership.
    pub fn defines_ownership(&self) -> bool {
        self.property_chain.ownership_index().is_some()
    }

    /// Whether a hop of the chain is traversed inversely.
    pub fn is_inverse(&self) -> bool {
        self.property_chain.has_inverse()
    }

    /// Whether a hop of the chain is read-only.
    pub fn is_read_only(&self) -> bool {
        self.property_chain.is_read_only()
    }

    /// Type of the stored value.
    pub fn rdf_type(&self) -> ValueType {
        self.conversion
            .and_then(|conversion| conversion.storage_type())
            .unwrap_or(self.data_type)
    }

    /// Whether the stored value is a literal rather than a resource.
    pub fn has_literal_value(&self) -> bool {
        self.rdf_type() != ValueType::Url
    }

    /// The chain ending in `computed` instead of the last hop.
    pub fn computed_chain(&self, computed: &PropertyDescriptor) -> PropertyChain {
        self.property_chain.with_last(computed.clone())
    }

    /// Individual bound to `value`, compared case-insensitively.
    pub fn instance_for_value(&self, value: &Value) -> Option<&InstanceDescriptor> {
        let text = value.to_text().to_lowercase();
        self.allowable_instances
            .iter()
            .find(|instance| instance.value.to_text().to_lowercase() == text)
    }

    /// Class bound to the sub-type `value`.
    pub fn class_for_value(&self, value: &str) -> Option<&ClassDescriptor> {
        self.sub_type_classes
            .iter()
            .find(|class| class.value.as_str() == Some(value))
    }

    /// Sub-type property bound to `value`.
    pub fn property_for_value(&self, value: &str) -> Option<&PropertyDescriptor> {
        self.sub_type_properties
            .iter()
            .find(|property| property.value.as_ref().and_then(Value::as_str) == Some(value))
    }

    /// Convert a native value into the value written to the store.
    pub fn make_value(&self, value: &Value) -> std::result::Result<Value, ConversionError> {
        if self.restricts_values() {
            if self.conversion.is_some() {
                return Err(ConversionError::new(value, "restricted value"));
            }

            if let Some(instance) = self.instance_for_value(value) {
                return Ok(Value::Url(instance.iri.clone()));
            }

            if !self.allowable_values.is_empty() {
                return self.restrict_to_allowable_values(value);
            }

            return Err(ConversionError::new(value, "allowed instance"));
        }

        match self.conversion {
            Some(conversion) => conversion.to_storage(value),
            None => value.convert(self.data_type),
        }
    }

    fn restrict_to_allowable_values(&self, value: &Value) -> std::result::Result<Value, ConversionError> {
        match self.data_type {
            ValueType::StringList => {
                let requested = value.to_string_list();
                let kept = self
                    .allowable_values
                    .iter()
                    .map(Value::to_text)
                    .filter(|allowed| requested.contains(allowed))
                    .collect();
                Ok(Value::StringList(kept))
            }
            ValueType::String => {
                let text = value.to_text();
                self.allowable_values
                    .iter()
                    .map(Value::to_text)
                    .find(|allowed| *allowed == text)
                    .map(Value::String)
                    .ok_or_else(|| ConversionError::new(value, "allowed value"))
            }
            ValueType::Int => {
                let int = value.convert(ValueType::Int)?;
                self.allowable_values
                    .iter()
                    .find(|allowed| **allowed == int)
                    .cloned()
                    .ok_or_else(|| ConversionError::new(value, "allowed value"))
            }
            _ => Err(ConversionError::new(value, "allowed value")),
        }
    }

    /// Parse the text read from the store into a native value.
    pub fn parse_value(&self, text: &str) -> std::result::Result<Value, ConversionError> {
        if self.restricts_values() {
            if self.conversion.is_some() {
                return Err(ConversionError::new(text, "restricted value"));
            }

            return self
                .allowable_instances
                .iter()
                .find(|instance| instance.iri == text)
                .map(|instance| instance.value.clone())
                .ok_or_else(|| ConversionError::new(text, "allowed instance"));
        }

        if let Some(conversion) = self.conversion {
            return conversion.from_storage(text, self.data_type);
        }

        if self.data_type == ValueType::StringList {
            if text.is_empty() {
                return Ok(Value::Null);
            }
            return Ok(Value::StringList(
                text.split(STORED_LIST_SEPARATOR).map(String::from).collect(),
            ));
        }

        Value::parse(text, self.data_type)
    }

    /// Every value of the closed lists, followed by the default if missing.
    pub fn describe_allowable_values(&self) -> Vec<Value> {
        let mut values = self.allowable_values.clone();

        values.extend(
            self.sub_type_properties
                .iter()
                .filter_map(|property| property.value.clone()),
        );
        values.extend(self.sub_type_classes.iter().map(|class| class.value.clone()));
        values.extend(
            self.allowable_instances
                .iter()
                .map(|instance| instance.value.clone()),
        );

        if !values.is_empty() && !self.default_value.is_null() && !values.contains(&self.default_value)
        {
            values.push(self.default_value.clone());
        }

        values
    }

    /// Public description of this field.
    pub fn describe(&self) -> FieldDescription {
        FieldDescription {
            data_type: self.data_type,
            allowable_values: self.describe_allowable_values(),
        }
    }

    /// Check the field's internal consistency.
    pub fn validate(&self) -> Result<()> {
        let fail = |message: &str| Err(CompileError::schema(format!("{}: {message}", self.name)));
        let is_text = matches!(self.data_type, ValueType::String | ValueType::StringList);

        if self.restricts_values() && self.has_sub_types() {
            return fail("cannot restrict values and describe sub-types");
        }
        if self.restricts_values() && self.conversion.is_some() {
            return fail("restricted values cannot have a conversion");
        }
        if !self.has_property_chain() && !self.has_sub_types() && !self.is_synthesized {
            return fail("needs a property chain, sub-types or to be synthesized");
        }
        if self.has_sub_types() && !is_text {
            return fail("sub-type fields must be strings or string lists");
        }
        if self.permits_custom_values && !is_text {
            return fail("custom values need a string or string list field");
        }
        if self.computed_properties.len() > 1 {
            return fail("at most one computed property");
        }
        if let Some(property) = self.detail_uri_property() {
            if property.resource_iri_scheme() == crate::subject::SubjectScheme::None {
                return fail("detail uri property needs an identifier scheme");
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vocab::{nco, xsd};

    fn gender() -> FieldDefinition {
        FieldDefinition::new("Gender")
            .with_chain(vec![PropertyDescriptor::new(
                nco::GENDER_PROPERTY,
                nco::PERSON_CONTACT,
                nco::GENDER,
            )])
            .with_allowable_instances(vec![
                InstanceDescriptor::new(nco::GENDER_FEMALE, "Female"),
                InstanceDescriptor::new(nco::GENDER_MALE, "Male"),
            ])
            .with_default("Unspecified")
    }

    #[test]
    fn test_instances_round_trip() {
        let field = gender();
        assert_eq!(
            field.make_value(&Value::from("female")),
            Ok(Value::Url(nco::GENDER_FEMALE.to_string()))
        );
        assert_eq!(field.parse_value(nco::GENDER_MALE), Ok(Value::from("Male")));
        assert!(field.make_value(&Value::from("Robot")).is_err());
        assert!(field.parse_value("urn:x").is_err());
    }

    #[test]
    fn test_allowable_values() {
        let list = FieldDefinition::new("SubTypes")
            .with_type(ValueType::StringList)
            .with_chain(vec![PropertyDescriptor::new(
                crate::vocab::ncal::CATEGORIES,
                crate::vocab::ncal::EVENT,
                xsd::STRING,
            )])
            .with_allowable_values(["Wedding", "Engagement"]);

        assert!(list.allows_multiple_values());
        assert_eq!(
            list.make_value(&Value::from(vec!["Engagement", "Birth", "Wedding"])),
            Ok(Value::from(vec!["Wedding", "Engagement"]))
        );

        let single = list.clone().with_type(ValueType::String);
        assert_eq!(single.make_value(&Value::from("Wedding")), Ok(Value::from("Wedding")));
        assert!(single.make_value(&Value::from("wedding")).is_err());
    }

    #[test]
    fn test_describe_appends_default() {
        let values = gender().describe_allowable_values();
        assert_eq!(
            values,
            vec![Value::from("Female"), Value::from("Male"), Value::from("Unspecified")]
        );
        assert!(FieldDefinition::new("Note").describe_allowable_values().is_empty());
    }

    #[test]
    fn test_parse_string_list() {
        let field = FieldDefinition::new("Hobby")
            .with_type(ValueType::StringList)
            .with_chain(vec![PropertyDescriptor::new(nco::HOBBY, nco::CONTACT, xsd::STRING)]);
        assert_eq!(
            field.parse_value("chess\u{1f}go"),
            Ok(Value::from(vec!["chess", "go"]))
        );
        assert_eq!(field.parse_value(""), Ok(Value::Null));
    }

    #[test]
    fn test_rdf_type_follows_conversion() {
        let field = FieldDefinition::new("ImageUrl")
            .with_type(ValueType::Url)
            .with_conversion(Conversion::UriAsForeignKey);
        assert_eq!(field.rdf_type(), ValueType::String);
        assert!(field.has_literal_value());
        assert!(!FieldDefinition::new("Url").with_type(ValueType::Url).has_literal_value());
    }

    #[test]
    fn test_validation() {
        assert!(gender().validate().is_ok());
        assert!(FieldDefinition::new("Orphan").validate().is_err());
        assert!(FieldDefinition::new("Synthetic").synthesized().validate().is_ok());
        assert!(gender()
            .with_conversion(Conversion::Identity)
            .validate()
            .is_err());
        assert!(FieldDefinition::new("Count")
            .with_type(ValueType::Int)
            .synthesized()
            .permits_custom_values()
            .validate()
            .is_err());
    }

    #[test]
    fn test_date_time_transform() {
        let value = Expression::iri("urn:x");
        let transformed = QueryTransform::DateTimeOffset.apply(value);
        assert_eq!(
            transformed.to_string(),
            "concat(<urn:x>, \"|\", fn:timezone-from-dateTime(<urn:x>))"
        );
    }
}
