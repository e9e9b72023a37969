//! Filters of fetch queries.

use super::fields::ChainPattern;
use super::Binder;
use crate::error::{CompileError, Result};
use crate::model::FIELD_CONTEXT;
use crate::phone::{dtmf_index, local_phone_number};
use crate::request::{
    ChangeLogEvent, ContactRef, Filter, MatchFlags, MatchKind, RangeFlags, RelationshipRole,
    RELATIONSHIP_HAS_MEMBER,
};
use crate::resource::PropertyDescriptor;
use crate::schema::{DetailDefinition, FieldDefinition};
use crate::sparql::{CompareOp, Expression, Function, Group, Variable};
use crate::value::{Value, ValueType};
use crate::vocab::{maemo, nco, nie, rdf, rdfs, xsd};

const DETAIL_TYPE: &str = "Type";

/// Simplify a filter tree without changing what it matches.
///
/// Nested junctions of the same kind are flattened, neutral children dropped and
/// degenerate junctions replaced by their only child or by [`Filter::Default`] and
/// [`Filter::Invalid`]. Detail filters without a detail name match nothing, and a closed
/// range around a single value becomes an exact match.
///
/// ```
/// use contactgraph::fetch::canonicalize;
/// use contactgraph::request::Filter;
///
/// let filter = Filter::Invalid.or(Filter::LocalId(vec![7]));
/// assert_eq!(canonicalize(filter), Filter::LocalId(vec![7]));
/// ```
pub fn canonicalize(filter: Filter) -> Filter {
    match filter {
        Filter::Intersection(children) => {
            let mut result = Vec::with_capacity(children.len());

            for child in children {
                match canonicalize(child) {
                    Filter::Default => {}
                    Filter::Invalid => return Filter::Invalid,
                    Filter::Intersection(nested) => result.extend(nested),
                    other => result.push(other),
                }
            }

            match result.len() {
                0 => Filter::Default,
                1 => result.remove(0),
                _ => Filter::Intersection(result),
            }
        }
        Filter::Union(children) => {
            let mut result = Vec::with_capacity(children.len());

            for child in children {
                match canonicalize(child) {
                    Filter::Default => return Filter::Default,
                    Filter::Invalid => {}
                    Filter::Union(nested) => result.extend(nested),
                    other => result.push(other),
                }
            }

            match result.len() {
                0 => Filter::Invalid,
                1 => result.remove(0),
                _ => Filter::Union(result),
            }
        }
        Filter::DetailField { detail, .. } | Filter::DetailRange { detail, .. }
            if detail.is_empty() =>
        {
            Filter::Invalid
        }
        Filter::DetailRange {
            detail,
            field,
            min,
            max,
            range:
                RangeFlags {
                    exclude_lower: false,
                    include_upper: true,
                },
            flags,
        } if min == max => Filter::DetailField {
            detail,
            field: Some(field),
            value: min,
            flags,
        },
        other => other,
    }
}

/// Compare `param` with `value` the way `flags` ask for.
fn match_function(flags: MatchFlags, param: Expression, value: &Value) -> Expression {
    let (param, value) = match value {
        Value::String(text) if !flags.case_sensitive => (
            Expression::call(Function::LowerCase, vec![param]),
            Value::String(text.to_lowercase()),
        ),
        _ => (param, value.clone()),
    };

    if !matches!(value, Value::String(_)) && !flags.is_string_compare() {
        return Expression::equal(param, Expression::value(&value));
    }

    let value = Expression::value(&value);

    match flags.kind {
        MatchKind::Contains => Expression::call(Function::Contains, vec![param, value]),
        MatchKind::StartsWith => Expression::call(Function::StartsWith, vec![param, value]),
        MatchKind::EndsWith => Expression::call(Function::EndsWith, vec![param, value]),
        MatchKind::Exactly => Expression::equal(param, value),
    }
}

/// Whether an enumeration value matches the filter value.
fn matches(sample: &str, pattern: &str, flags: MatchFlags) -> bool {
    if !flags.case_sensitive {
        return matches(
            &sample.to_lowercase(),
            &pattern.to_lowercase(),
            flags.case_sensitive(),
        );
    }

    match flags.kind {
        MatchKind::Contains => sample.contains(pattern),
        MatchKind::StartsWith => sample.starts_with(pattern),
        MatchKind::EndsWith => sample.ends_with(pattern),
        MatchKind::Exactly => sample == pattern,
    }
}

fn is_phone_number_chain(field: &FieldDefinition) -> bool {
    field
        .property_chain
        .last()
        .is_some_and(|property| property.iri == nco::PHONE_NUMBER_PROPERTY)
}

fn affiliation() -> PropertyDescriptor {
    PropertyDescriptor::new(nco::HAS_AFFILIATION, nco::PERSON_CONTACT, nco::AFFILIATION)
        .multi_valued()
}

/// How a detail field filter binds its value.
struct FieldMatch<'d> {
    field: &'d FieldDefinition,
    flags: MatchFlags,
    property_subtype: Option<&'d PropertyDescriptor>,
    custom_sub_type: bool,
}

impl Binder<'_> {
    /// Filter expression of `filter`, `None` when it matches every contact.
    pub(crate) fn bind_filter(&mut self, filter: &Filter) -> Result<Option<Expression>> {
        match filter {
            Filter::Default => Ok(None),
            Filter::Invalid => Ok(Some(Expression::boolean(false))),
            Filter::LocalId(ids) => {
                if ids.is_empty() {
                    return Err(CompileError::bad_argument("local id filter without ids"));
                }

                Ok(Some(Expression::is_in(
                    Expression::tracker_id(self.contact()),
                    ids.iter().map(|id| Expression::int(i64::from(*id))).collect(),
                )))
            }
            Filter::Intersection(children) => {
                let mut operands = Vec::with_capacity(children.len());
                for child in children {
                    if let Some(expression) = self.bind_filter(child)? {
                        operands.push(expression);
                    }
                }
                Ok((!operands.is_empty()).then_some(Expression::And(operands)))
            }
            Filter::Union(children) => {
                let mut operands = Vec::with_capacity(children.len());
                for child in children {
                    match self.bind_filter(child)? {
                        Some(expression) => operands.push(expression),
                        None => return Ok(None),
                    }
                }
                Ok(Some(Expression::Or(operands)))
            }
            Filter::ChangeLog { event, since } => {
                let predicate = match event {
                    ChangeLogEvent::Added => nie::CONTENT_CREATED,
                    ChangeLogEvent::Changed => nie::CONTENT_LAST_MODIFIED,
                    ChangeLogEvent::Removed => {
                        return Err(CompileError::not_supported(
                            "removed contacts are not tracked",
                        ))
                    }
                };

                let stamp = self.pool.fresh();
                let mut group = Group::new();
                group.triple(self.contact(), predicate, &stamp).filter(Expression::compare(
                    CompareOp::GreaterOrEqual,
                    (&stamp).into(),
                    Expression::value(&Value::DateTime(*since)),
                ));

                Ok(Some(Expression::exists(group)))
            }
            Filter::Relationship {
                relationship_type,
                role,
                related,
            } => self
                .bind_relationship(relationship_type, *role, related.as_ref())
                .map(Some),
            Filter::DetailField {
                detail,
                field,
                value,
                flags,
            } => self
                .bind_detail_field(detail, field.as_deref(), value, *flags)
                .map(Some),
            Filter::DetailRange {
                detail,
                field,
                min,
                max,
                range,
                flags,
            } => self
                .bind_detail_range(detail, field, min, max, *range, *flags)
                .map(Some),
        }
    }

    fn bind_relationship(
        &mut self,
        relationship_type: &str,
        role: RelationshipRole,
        related: Option<&ContactRef>,
    ) -> Result<Expression> {
        if relationship_type != RELATIONSHIP_HAS_MEMBER {
            return Err(CompileError::not_supported(format!(
                "relationship type {relationship_type}"
            )));
        }

        if let Some(related) = related {
            if !related.manager_uri.is_empty() && related.manager_uri != self.settings.manager_uri
            {
                return Ok(Expression::boolean(false));
            }
        }

        let id = related.map(|related| Expression::int(i64::from(related.local_id)));
        let mut branches = Vec::new();

        // The related contact is the group.
        if matches!(role, RelationshipRole::First | RelationshipRole::Either) {
            let group_var = self.pool.fresh();
            let mut group = Group::new();
            group
                .triple(&group_var, rdf::TYPE, Expression::iri(nco::CONTACT))
                .triple(&group_var, rdf::TYPE, Expression::iri(nco::CONTACT_GROUP))
                .triple(self.contact(), nco::BELONGS_TO_GROUP, &group_var);
            if let Some(id) = &id {
                group.filter(Expression::equal(
                    Expression::tracker_id((&group_var).into()),
                    id.clone(),
                ));
            }
            branches.push(Expression::exists(group));
        }

        // The related contact is a member.
        if matches!(role, RelationshipRole::Second | RelationshipRole::Either) {
            let member = self.pool.fresh();
            let mut group = Group::new();
            group
                .triple(&member, rdf::TYPE, Expression::iri(nco::CONTACT))
                .triple(&member, nco::BELONGS_TO_GROUP, self.contact());
            if let Some(id) = id {
                group.filter(Expression::equal(Expression::tracker_id((&member).into()), id));
            }
            branches.push(Expression::exists(group));
        }

        Ok(Expression::Or(branches))
    }

    fn bind_detail_field(
        &mut self,
        detail_name: &str,
        field_name: Option<&str>,
        value: &Value,
        flags: MatchFlags,
    ) -> Result<Expression> {
        if detail_name == DETAIL_TYPE && field_name == Some(DETAIL_TYPE) {
            return Ok(Expression::boolean(
                self.schema.contact_type().to_string() == value.to_text(),
            ));
        }

        let Some(detail) = self.schema.detail(detail_name) else {
            let object = self.pool.fresh();
            let mut group =
                self.custom_detail_pattern(self.contact(), detail_name, field_name, (&object).into());
            if !value.is_null() {
                group.filter(match_function(flags, object.into(), value));
            }
            return Ok(Expression::exists(group));
        };

        let Some(field_name) = field_name else {
            let mut operands = Vec::new();
            for field in detail.fields.iter().filter(|f| f.has_property_chain()) {
                operands.push(self.bind_detail_field(
                    detail_name,
                    Some(field.name.as_str()),
                    value,
                    flags,
                )?);
            }
            return self.any_field(detail, operands);
        };

        if field_name == FIELD_CONTEXT {
            return self.bind_context_filter(detail, value, flags);
        }

        let field = detail.field(field_name).ok_or_else(|| {
            CompileError::not_supported(format!("unknown field {detail_name}.{field_name}"))
        })?;

        let flags = self.normalize_flags(field, flags, value);

        let raw = value;
        let mut instances = None;
        let value = if field.allowable_instances.is_empty() {
            self.normalize_value(field, flags, value)?
        } else {
            if flags.phone_number {
                return Err(CompileError::not_supported(format!(
                    "phone number matching on field {field_name}"
                )));
            }

            let pattern = value.to_text();
            instances = Some(
                field
                    .allowable_instances
                    .iter()
                    .filter(|instance| matches(&instance.value.to_text(), &pattern, flags))
                    .map(|instance| Expression::iri(&instance.iri))
                    .collect::<Vec<_>>(),
            );
            value.clone()
        };

        let property_subtype = if field.sub_type_properties.is_empty() {
            None
        } else {
            let sub_type = value.to_text();
            if field.default_value.to_text() == sub_type {
                field.property_chain.last()
            } else {
                field.property_for_value(&sub_type)
            }
        };

        let custom_sub_type = !field.sub_type_classes.is_empty()
            && field.class_for_value(&value.to_text()).is_none()
            && !matches!(value, Value::Url(_));

        let matcher = FieldMatch {
            field,
            flags,
            property_subtype,
            custom_sub_type,
        };
        let (mut group, subject) = self.field_pattern(detail, &matcher);

        if value.is_null() || property_subtype.is_some() {
            return Ok(Expression::exists(group));
        }

        let dtmf = flags.phone_number
            && is_phone_number_chain(field)
            && dtmf_index(&raw.to_text()).is_some_and(|index| index > 0);

        let condition = if !field.sub_type_classes.is_empty() {
            Expression::equal(subject.into(), Expression::value(&value))
        } else if dtmf {
            let number = raw.to_text();
            let length = self.settings.local_phone_number_length;
            let dialable = dtmf_index(&number).map_or(number.as_str(), |index| &number[..index]);

            Expression::is_in(
                subject.into(),
                vec![
                    Expression::string(local_phone_number(&number, length)),
                    Expression::string(local_phone_number(dialable, length)),
                ],
            )
        } else if let Some(mut iris) = instances {
            match iris.len() {
                0 => Expression::boolean(false),
                1 => Expression::equal(subject.into(), iris.remove(0)),
                _ => Expression::is_in(subject.into(), iris),
            }
        } else {
            match_function(flags, subject.into(), &value)
        };

        group.filter(condition);
        Ok(Expression::exists(group))
    }

    fn bind_detail_range(
        &mut self,
        detail_name: &str,
        field_name: &str,
        min: &Value,
        max: &Value,
        range: RangeFlags,
        flags: MatchFlags,
    ) -> Result<Expression> {
        let Some(detail) = self.schema.detail(detail_name) else {
            let object = self.pool.fresh();
            let mut group = self.custom_detail_pattern(
                self.contact(),
                detail_name,
                Some(field_name),
                (&object).into(),
            );
            group.filter(range_condition(&object, min, max, range));
            return Ok(Expression::exists(group));
        };

        if field_name.is_empty() {
            let mut operands = Vec::new();
            for field in detail.fields.iter().filter(|f| f.has_property_chain()) {
                operands.push(self.bind_detail_range(
                    detail_name,
                    &field.name,
                    min,
                    max,
                    range,
                    flags,
                )?);
            }
            return self.any_field(detail, operands);
        }

        let field = detail.field(field_name).ok_or_else(|| {
            CompileError::not_supported(format!("unknown field {detail_name}.{field_name}"))
        })?;

        let flags = self.normalize_flags(field, flags, min);
        let min = self.normalize_value(field, flags, min)?;
        let max = self.normalize_value(field, flags, max)?;

        let matcher = FieldMatch {
            field,
            flags,
            property_subtype: None,
            custom_sub_type: false,
        };
        let (mut group, subject) = self.field_pattern(detail, &matcher);
        group.filter(range_condition(&subject, &min, &max, range));

        Ok(Expression::exists(group))
    }

    fn any_field(
        &self,
        detail: &DetailDefinition,
        operands: Vec<Expression>,
    ) -> Result<Expression> {
        if operands.is_empty() {
            return Err(CompileError::not_supported(format!(
                "detail {} has no field to filter on",
                detail.name
            )));
        }
        Ok(Expression::Or(operands))
    }

    /// Contacts with an instance of `detail` in an affiliation labelled `value`.
    fn bind_context_filter(
        &mut self,
        detail: &DetailDefinition,
        value: &Value,
        flags: MatchFlags,
    ) -> Result<Expression> {
        if !detail.has_context {
            return Ok(Expression::boolean(false));
        }

        let affiliation = self.pool.fresh();
        let mut operands = Vec::new();

        if !value.is_null() {
            operands.push(match_function(
                flags,
                Expression::property(rdfs::LABEL, (&affiliation).into()),
                value,
            ));
        }

        let mut alternatives = Vec::new();
        for field in detail.fields.iter().filter(|f| !f.is_without_mapping) {
            let pattern =
                self.chain_pattern((&affiliation).into(), field.property_chain.as_slice(), None);
            alternatives.push(Expression::exists(pattern.group));
        }

        if alternatives.is_empty() {
            return Err(CompileError::not_supported(format!(
                "context filter on unmapped detail {}",
                detail.name
            )));
        }

        operands.push(Expression::Or(alternatives));

        let mut group = Group::new();
        group
            .triple(self.contact(), nco::HAS_AFFILIATION, &affiliation)
            .filter(Expression::And(operands));

        Ok(Expression::exists(group))
    }

    /// Replace the phone number flag by the suffix or exact comparison it stands for.
    fn normalize_flags(&self, field: &FieldDefinition, flags: MatchFlags, value: &Value) -> MatchFlags {
        if !flags.phone_number || !is_phone_number_chain(field) {
            return flags;
        }

        let kind = if value.to_text().chars().count() >= self.settings.local_phone_number_length {
            MatchKind::EndsWith
        } else {
            MatchKind::Exactly
        };

        MatchFlags { kind, ..flags }
    }

    /// Convert a filter value into the form stored in the graph.
    fn normalize_value(
        &self,
        field: &FieldDefinition,
        flags: MatchFlags,
        value: &Value,
    ) -> Result<Value> {
        if value.is_null() {
            return Ok(Value::Null);
        }

        let bad_value = |_| {
            CompileError::bad_argument(format!(
                "cannot compare {value:?} with field {}",
                field.name
            ))
        };

        let value = if !field.sub_type_classes.is_empty() || flags.is_string_compare() {
            value.convert(ValueType::String).map_err(bad_value)?
        } else {
            field.make_value(value).map_err(bad_value)?
        };

        if is_phone_number_chain(field) && flags.kind == MatchKind::EndsWith {
            return Ok(Value::String(local_phone_number(
                &value.to_text(),
                self.settings.local_phone_number_length,
            )));
        }

        if !field.sub_type_classes.is_empty() {
            return match field.class_for_value(&value.to_text()) {
                Some(class) => Ok(Value::Url(class.iri.clone())),
                None if field.permits_custom_values => Ok(value),
                None => Err(CompileError::bad_argument(format!(
                    "unknown sub-type {value} of field {}",
                    field.name
                ))),
            };
        }

        Ok(value)
    }

    /// Patterns reaching the value a field filter compares, and the variable holding it.
    fn field_pattern(&mut self, detail: &DetailDefinition, matcher: &FieldMatch) -> (Group, Variable) {
        let field = matcher.field;
        let mut properties = field.property_chain.as_slice().to_vec();

        if !field.sub_type_classes.is_empty() && !matcher.custom_sub_type {
            properties.push(
                PropertyDescriptor::new(rdf::TYPE, rdfs::RESOURCE, rdfs::RESOURCE).multi_valued(),
            );
        }

        if matcher.property_subtype.is_some() {
            properties.pop();
        }

        if matcher.flags.phone_number
            && properties
                .last()
                .is_some_and(|property| property.iri == nco::PHONE_NUMBER_PROPERTY)
        {
            let local = field
                .computed_properties
                .iter()
                .find(|property| property.iri == maemo::LOCAL_PHONE_NUMBER)
                .cloned()
                .unwrap_or_else(|| {
                    PropertyDescriptor::new(maemo::LOCAL_PHONE_NUMBER, nco::PHONE_NUMBER, xsd::STRING)
                });
            properties.pop();
            properties.push(local);
        }

        if detail.has_context {
            properties.insert(0, affiliation());
        }

        let value = self.pool.fresh();
        let ChainPattern { mut group, .. } =
            self.chain_pattern(self.contact(), &properties, Some((&value).into()));
        let mut subject = value;

        if let Some(subtype) = matcher.property_subtype {
            let object = self.pool.fresh();
            group.triple(&subject, &subtype.iri, &object);

            let listed = field
                .sub_type_properties
                .iter()
                .any(|property| property.iri == subtype.iri);

            if !listed {
                let mut operands = Vec::new();
                for property in &field.sub_type_properties {
                    let mut exists = Group::new();
                    exists.triple(&subject, &property.iri, &object);
                    operands.push(Expression::not(Expression::exists(exists)));
                }
                group.filter(Expression::And(operands));
            }

            subject = object;
        }

        let generic = field.is_without_mapping
            || matcher.custom_sub_type
            || (!field.sub_type_properties.is_empty() && matcher.property_subtype.is_none());

        if generic {
            let object = self.pool.fresh();
            group.extend(self.custom_field_pattern(
                (&subject).into(),
                Some(&field.name),
                (&object).into(),
            ));
            subject = object;
        }

        (group, subject)
    }
}

fn range_condition(subject: &Variable, min: &Value, max: &Value, range: RangeFlags) -> Expression {
    let mut operands = Vec::new();

    if !min.is_null() {
        let op = if range.exclude_lower {
            CompareOp::Less
        } else {
            CompareOp::LessOrEqual
        };
        operands.push(Expression::compare(op, Expression::value(min), subject.into()));
    }

    if !max.is_null() {
        let op = if range.include_upper {
            CompareOp::LessOrEqual
        } else {
            CompareOp::Less
        };
        operands.push(Expression::compare(op, subject.into(), Expression::value(max)));
    }

    Expression::And(operands)
}
