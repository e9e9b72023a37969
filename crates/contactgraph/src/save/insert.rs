//! Insertions writing the new values of a contact.

use super::mapping::DetailMapping;
use super::{graph_group, scoped_name, UpdateBuilder};
use crate::model::DETAIL_TIMESTAMP;
use crate::resource::PropertyDescriptor;
use crate::schema::FieldDefinition;
use crate::sparql::{Expression, Function, Group, Pattern, Triple, UpdateOperation, Variable};
use crate::value::Value;
use crate::vocab::{nao, nco, nie, rdf, rdfs};
use std::collections::BTreeMap;

/// Classes of the resources of one detail, keyed by the predicate chain reaching them.
type ResourceTypes = BTreeMap<Vec<String>, Vec<String>>;

/// Per-detail state while its fields are written.
struct DetailWrite {
    types: ResourceTypes,
    objects: BTreeMap<Vec<String>, Expression>,
    custom_subjects: Vec<Expression>,
}

impl UpdateBuilder<'_> {
    /// Create the shared resources named by foreign key values, unless a resource with
    /// the same key exists already.
    pub(crate) fn insert_foreign_key_objects(&mut self) {
        let mappings = std::mem::take(&mut self.mappings);

        for mapping in &mappings {
            for field in mapping.fields() {
                let Some(index) = field.property_chain.foreign_key_index() else {
                    continue;
                };

                let Some(value) = mapping.value(&field.name) else {
                    continue;
                };

                let value = match field.make_value(value) {
                    Ok(value) if !value.is_empty() => value,
                    Ok(_) => continue,
                    Err(err) => {
                        log::debug!("dropping {}.{}: {err}", mapping.name(), field.name);
                        continue;
                    }
                };

                let chain = field.property_chain.as_slice();
                let key = &chain[index];
                let literal = Expression::value(&value);

                let subject = make_subject_iri(mapping, field, index, &value)
                    .map(Expression::iri)
                    .unwrap_or_else(|| Expression::blank("_"));

                let mut template = vec![Triple::new(
                    subject.clone(),
                    rdf::TYPE,
                    Expression::iri(&key.domain_iri),
                )];

                if let Some(parent) = index.checked_sub(1).map(|parent| &chain[parent]) {
                    if parent.resource_type_iri() != key.domain_iri {
                        template.push(Triple::new(
                            subject.clone(),
                            rdf::TYPE,
                            Expression::iri(parent.resource_type_iri()),
                        ));
                    }
                }

                template.push(Triple::new(subject, key.iri.as_str(), literal.clone()));

                let resource = Variable::new("resource");
                let mut existing = Group::new();

                if key.case_sensitive {
                    existing.triple(&resource, key.iri.as_str(), literal);
                } else {
                    let stored = Variable::new("value");
                    existing
                        .triple(&resource, key.iri.as_str(), &stored)
                        .filter(lower_case_equal(literal, (&stored).into()));
                }

                let mut condition = Group::new();
                condition.filter(Expression::not(Expression::exists(existing)));

                self.update.push(UpdateOperation::Insert {
                    or_replace: false,
                    graph: Some(self.graph.clone()),
                    template,
                    condition: Some(condition),
                });
            }
        }

        self.mappings = mappings;
    }

    /// Write every detail and the contact's own stamps.
    pub(crate) fn collect_insertions(&mut self) {
        let contact = self.contact.clone();

        for class in self.schema.contact_class_iris() {
            self.insert_value(contact.clone(), rdf::TYPE, Expression::iri(class));
        }

        let mappings = std::mem::take(&mut self.mappings);

        for mapping in &mappings {
            if mapping.is_custom() {
                self.insert_custom_detail(contact.clone(), mapping);
                continue;
            }

            let mut write = DetailWrite {
                types: collect_resource_types(mapping),
                objects: BTreeMap::new(),
                custom_subjects: Vec::new(),
            };

            for field in mapping.fields() {
                if field.has_sub_types() || field.is_synthesized {
                    continue;
                }

                let Some(value) = mapping.value(&field.name) else {
                    continue;
                };

                let value = match field.make_value(value) {
                    Ok(value) if value.is_empty() && !field.permits_custom_values => {
                        log::trace!("skipping empty {}.{}", mapping.name(), field.name);
                        continue;
                    }
                    Ok(value) if value.is_empty() => None,
                    Ok(value) => Some(value),
                    Err(_) if field.permits_custom_values => None,
                    Err(err) => {
                        log::debug!("dropping {}.{}: {err}", mapping.name(), field.name);
                        continue;
                    }
                };

                if !mapping.has_context() {
                    self.insert_detail_field(
                        contact.clone(),
                        mapping,
                        field,
                        value.as_ref(),
                        &mut write,
                    );
                    continue;
                }

                for context in mapping.contexts() {
                    let affiliation = self.lookup_affiliation(&context);

                    self.insert_value(
                        affiliation.clone(),
                        rdf::TYPE,
                        Expression::iri(nco::AFFILIATION),
                    );

                    if !context.is_empty() {
                        self.insert_value(affiliation.clone(), rdfs::LABEL, Expression::string(context));
                    }

                    self.insert_value(contact.clone(), nco::HAS_AFFILIATION, affiliation.clone());
                    self.insert_detail_field(affiliation, mapping, field, value.as_ref(), &mut write);
                }
            }
        }

        self.mappings = mappings;
        self.insert_stamps();
        self.emit_insertions();
    }

    fn insert_stamps(&mut self) {
        let contact = self.contact.clone();
        let stamps = self.stamps.clone();

        self.insert_value(
            contact.clone(),
            nie::CONTENT_LAST_MODIFIED,
            Expression::value(&Value::DateTime(stamps.last_modified)),
        );

        if let Some(accessed) = stamps.accessed {
            let writes_timestamps = self
                .schema
                .detail(DETAIL_TIMESTAMP)
                .is_some_and(|detail| !self.is_unknown_detail(detail));

            if writes_timestamps {
                self.insert_value(
                    contact.clone(),
                    nie::CONTENT_ACCESSED,
                    Expression::value(&Value::DateTime(accessed)),
                );
            }
        }

        let created = Expression::value(&Value::DateTime(stamps.created));
        if stamps.preserve_created {
            self.insert_preserved_value(contact.clone(), nie::CONTENT_CREATED, created);
        } else {
            self.insert_value(contact.clone(), nie::CONTENT_CREATED, created);
        }

        let guid = Expression::string(stamps.guid);
        if stamps.preserve_guid {
            self.insert_preserved_value(contact.clone(), nco::CONTACT_UID, guid);
        } else {
            self.insert_value(contact.clone(), nco::CONTACT_UID, guid);
        }

        if !self.existing {
            self.insert_value(contact, nie::GENERATOR, Expression::string(stamps.sync_target));
        }
    }

    fn emit_insertions(&mut self) {
        let template = std::mem::take(&mut self.explicit);
        let restrictions = std::mem::take(&mut self.restrictions);

        self.update.push(UpdateOperation::Insert {
            or_replace: false,
            graph: Some(self.graph.clone()),
            template,
            condition: (!restrictions.is_empty()).then_some(restrictions),
        });

        for operation in std::mem::take(&mut self.implicit) {
            self.update.push(operation);
        }

        if self.existing {
            let template = vec![Triple::new(
                self.contact.clone(),
                nie::GENERATOR,
                Expression::string(&self.stamps.sync_target),
            )];

            let condition = (!self.stamps.preserve_sync_target).then(|| {
                let mut weak = vec![Expression::string("")];
                weak.extend(self.settings.weak_sync_targets.iter().map(Expression::string));

                let generator = Expression::coalesce(
                    Expression::property(nie::GENERATOR, self.contact.clone()),
                    Expression::string(""),
                );

                let mut group = Group::new();
                group.filter(Expression::is_in(generator, weak));
                group
            });

            self.update.push(UpdateOperation::Insert {
                or_replace: true,
                graph: Some(self.graph.clone()),
                template,
                condition,
            });
        }
    }

    fn insert_value(&mut self, subject: Expression, predicate: &str, object: Expression) {
        self.explicit.push(Triple::new(subject, predicate, object));
    }

    /// Insert a value unless the contact's graph holds one already.
    fn insert_preserved_value(&mut self, subject: Expression, predicate: &str, object: Expression) {
        let mut existing = Group::new();
        existing.triple(subject.clone(), predicate, self.pool.fresh());

        let mut condition = Group::new();
        condition.filter(Expression::not(Expression::exists(graph_group(&self.graph, existing))));

        self.implicit.push(UpdateOperation::Insert {
            or_replace: false,
            graph: Some(self.graph.clone()),
            template: vec![Triple::new(subject, predicate, object)],
            condition: Some(condition),
        });
    }

    /// Blank affiliation of `context`, one per context and save.
    fn lookup_affiliation(&mut self, context: &str) -> Expression {
        if let Some(affiliation) = self.affiliations.get(context) {
            return affiliation.clone();
        }

        let label = self.unique_name(&scoped_name("Affiliation", context));
        let affiliation = Expression::blank(label);
        self.affiliations.insert(context.to_string(), affiliation.clone());
        affiliation
    }

    /// Store a detail without schema as a `nao:Property` with one property per field.
    fn insert_custom_detail(&mut self, subject: Expression, mapping: &DetailMapping<'_>) {
        let name = mapping.name();
        let property = Expression::blank(self.unique_name(name));

        self.insert_value(subject, nao::HAS_PROPERTY, property.clone());
        self.insert_value(property.clone(), rdf::TYPE, Expression::iri(nao::PROPERTY));
        self.insert_value(property.clone(), nao::PROPERTY_NAME, Expression::string(name));

        for (field, value) in mapping.detail().values() {
            self.insert_custom_values(property.clone(), name, field, value, &[]);
        }
    }

    /// Store the elements of `value` missing from `allowable` as tagged properties.
    fn insert_custom_values(
        &mut self,
        subject: Expression,
        detail: &str,
        field: &str,
        value: &Value,
        allowable: &[Value],
    ) {
        let allowed = |text: &str| allowable.iter().any(|value| value.to_text() == text);

        let custom: Vec<String> = match value {
            Value::Null => Vec::new(),
            Value::StringList(list) => list
                .iter()
                .filter(|element| !element.is_empty() && !allowed(element))
                .cloned()
                .collect(),
            other => Some(other.to_text())
                .filter(|text| !text.is_empty() && !allowed(text))
                .into_iter()
                .collect(),
        };

        for element in custom {
            let property = Expression::blank(self.unique_name(&scoped_name(detail, field)));

            self.insert_value(subject.clone(), rdf::TYPE, Expression::iri(nie::INFORMATION_ELEMENT));
            self.insert_value(subject.clone(), nao::HAS_PROPERTY, property.clone());
            self.insert_value(property.clone(), rdf::TYPE, Expression::iri(nao::PROPERTY));
            self.insert_value(property.clone(), nao::PROPERTY_NAME, Expression::string(field));
            self.insert_value(property, nao::PROPERTY_VALUE, Expression::string(element));
        }
    }

    /// Walk the chain of `field` from `subject`, creating or reusing the resources on the
    /// way, then write the value at its end.
    ///
    /// A `None` value only writes the custom values of the field.
    fn insert_detail_field(
        &mut self,
        subject: Expression,
        mapping: &DetailMapping<'_>,
        field: &FieldDefinition,
        value: Option<&Value>,
        write: &mut DetailWrite,
    ) {
        let chain = field.property_chain.as_slice();

        let Some(first) = chain.first() else {
            log::warn!(
                "no property chain for {} field of {} detail",
                field.name,
                mapping.name()
            );
            return;
        };

        if first.read_only {
            return;
        }

        let end = if field.is_without_mapping || !field.has_literal_value() {
            chain.len()
        } else {
            chain.len() - 1
        };

        let literal = value.map(Expression::value);
        let mut literal_pending = true;
        let mut axis = vec![subject];
        let mut key = Vec::new();

        for (index, hop) in chain[..end].iter().enumerate() {
            if hop.read_only {
                break;
            }

            let Some(current) = axis.last().cloned() else {
                break;
            };

            key.push(hop.iri.clone());

            let cached = write.objects.get(&key).cloned();
            let object = match cached {
                Some(object) => object,
                None => {
                    let next = chain.get(index + 1);

                    let subject_iri = match (next, value) {
                        (Some(next), Some(value)) if !next.foreign_key => {
                            make_subject_iri(mapping, field, index + 1, value)
                        }
                        _ => None,
                    };

                    let object = match (subject_iri, &literal) {
                        (Some(iri), _) => Expression::iri(iri),
                        (None, _) if next.is_some() || field.is_without_mapping => {
                            let basename = scoped_name(mapping.name(), "Resource");
                            let name = self.unique_name(&basename);

                            let binds_key = !field.is_without_mapping
                                && chain.last().is_some_and(|last| last.foreign_key)
                                && index + 2 == chain.len();

                            if binds_key {
                                Expression::Variable(Variable::new(name))
                            } else {
                                Expression::blank(name)
                            }
                        }
                        (None, Some(literal)) => {
                            literal_pending = false;
                            literal.clone()
                        }
                        (None, None) => break,
                    };

                    write.objects.insert(key.clone(), object.clone());

                    if next.map_or(true, |next| !next.foreign_key) {
                        match write.types.get(&key) {
                            Some(types) => {
                                for class in types {
                                    self.insert_value(object.clone(), rdf::TYPE, Expression::iri(class));
                                }
                            }
                            None => log::warn!(
                                "no resource types for {} property of {} detail's {} field",
                                hop.iri,
                                mapping.name(),
                                field.name
                            ),
                        }
                    }

                    object
                }
            };

            if hop.inverse {
                self.insert_value(object.clone(), &hop.iri, current);
            } else {
                self.insert_value(current, &hop.iri, object.clone());
            }

            axis.push(object);
        }

        let Some(tail) = axis.last().cloned() else {
            return;
        };

        if let Some(sub_type_field) = mapping.sub_type_field().filter(|f| f.permits_custom_values) {
            if !write.custom_subjects.contains(&tail) {
                write.custom_subjects.push(tail.clone());

                let sub_types = mapping
                    .value(&sub_type_field.name)
                    .cloned()
                    .unwrap_or(Value::Null);

                self.insert_custom_values(
                    tail.clone(),
                    mapping.name(),
                    &sub_type_field.name,
                    &sub_types,
                    &sub_type_field.describe_allowable_values(),
                );
            }
        }

        if let (Some(value), Some(literal)) = (value, literal) {
            if !field.is_without_mapping {
                if let Some(value_property) = chain.last() {
                    self.insert_field_value(
                        mapping,
                        field,
                        value_property,
                        tail.clone(),
                        literal,
                        literal_pending,
                    );
                }
            }

            for computed in &field.computed_properties {
                let computed_value = match computed.conversion {
                    Some(conversion) => conversion.to_storage(value),
                    None => Ok(value.clone()),
                };

                match computed_value {
                    Ok(computed_value) => self.insert_value(
                        tail.clone(),
                        &computed.iri,
                        Expression::value(&computed_value),
                    ),
                    Err(err) => log::debug!(
                        "dropping {} of {}.{}: {err}",
                        computed.iri,
                        mapping.name(),
                        field.name
                    ),
                }
            }
        }

        if field.permits_custom_values {
            if let Some(raw) = mapping.value(&field.name) {
                let raw = raw.clone();
                self.insert_custom_values(
                    tail,
                    mapping.name(),
                    &field.name,
                    &raw,
                    &field.describe_allowable_values(),
                );
            }
        }
    }

    /// Write the value reached by the last hop, or restrict the key variable of a foreign
    /// key to it.
    fn insert_field_value(
        &mut self,
        mapping: &DetailMapping<'_>,
        field: &FieldDefinition,
        value_property: &PropertyDescriptor,
        tail: Expression,
        literal: Expression,
        literal_pending: bool,
    ) {
        if value_property.foreign_key {
            if value_property.case_sensitive {
                self.restrictions
                    .triple(tail, value_property.iri.as_str(), literal);
            } else {
                let stored = self.pool.fresh();
                let mut group = Group::new();
                group
                    .triple(tail, value_property.iri.as_str(), &stored)
                    .filter(lower_case_equal((&stored).into(), literal));
                self.restrictions.push(Pattern::Group(group));
            }
            return;
        }

        if !literal_pending {
            return;
        }

        let predicate = find_sub_type_predicate(mapping, field);

        if value_property.inverse {
            self.insert_value(literal, &predicate, tail);
        } else {
            self.insert_value(tail, &predicate, literal);
        }
    }
}

/// IRI of the resource reached by hop `index` of `field`, when its scheme derives one from
/// content.
///
/// At the tail of the chain the detail's own URI wins when its scheme matches, so every
/// field of a detail lands on the same resource.
fn make_subject_iri(
    mapping: &DetailMapping<'_>,
    field: &FieldDefinition,
    index: usize,
    value: &Value,
) -> Option<String> {
    let chain = field.property_chain.as_slice();
    let hop = chain.get(index)?;
    let scheme = hop.resource_iri_scheme();

    if !scheme.is_content_scheme() {
        return None;
    }

    let detail_uri = (index + 1 == chain.len() && scheme == mapping.detail_uri_scheme())
        .then(|| mapping.detail().detail_uri())
        .flatten()
        .filter(|uri| !uri.is_empty());

    match detail_uri {
        Some(uri) => Some(uri.to_string()),
        None => hop.make_resource_iri(value),
    }
}

/// Classes asserted on the resources a detail's fields pass through.
fn collect_resource_types(mapping: &DetailMapping<'_>) -> ResourceTypes {
    let mut types = ResourceTypes::new();
    let mut add = |key: &[String], class: &str| {
        let classes = types.entry(key.to_vec()).or_default();
        if !classes.iter().any(|known| known == class) {
            classes.push(class.to_string());
        }
    };

    for field in mapping.fields() {
        let chain = field.property_chain.as_slice();
        let mut key = Vec::new();

        for pair in chain.windows(2) {
            let (hop, next) = (&pair[0], &pair[1]);
            key.push(hop.iri.clone());

            add(&key, if next.inverse { &next.range_iri } else { &next.domain_iri });
            add(&key, hop.resource_type_iri());
        }

        if field.sub_type_classes.is_empty() {
            continue;
        }

        let Some(last) = chain.last() else {
            continue;
        };

        let sub_types = mapping
            .value(&field.name)
            .unwrap_or(&field.default_value)
            .to_string_list();

        key.push(last.iri.clone());

        for class in &field.sub_type_classes {
            if sub_types.iter().any(|sub_type| class.value.as_str() == Some(sub_type.as_str())) {
                add(&key, &class.iri);
            }
        }
    }

    types
}

/// Predicate selected by the detail's sub-type, or the field's own last hop.
fn find_sub_type_predicate(mapping: &DetailMapping<'_>, field: &FieldDefinition) -> String {
    let own = || {
        field
            .property_chain
            .last()
            .map(|last| last.iri.clone())
            .unwrap_or_default()
    };

    let Some(sub_type_field) = mapping
        .sub_type_field()
        .filter(|sub_type_field| !sub_type_field.sub_type_properties.is_empty())
    else {
        return own();
    };

    let sub_type = match mapping.value(&sub_type_field.name) {
        Some(Value::StringList(list)) => {
            if list.len() > 1 {
                log::warn!(
                    "sub-type field {} of {} detail holds a list, using its first value",
                    sub_type_field.name,
                    mapping.name()
                );
            }
            list.first().cloned()
        }
        Some(Value::String(text)) => Some(text.clone()),
        Some(other) => {
            log::warn!(
                "invalid value {other:?} for sub-type field {} of {} detail",
                sub_type_field.name,
                mapping.name()
            );
            None
        }
        None => None,
    };

    sub_type
        .or_else(|| sub_type_field.default_value.as_str().map(String::from))
        .and_then(|sub_type| sub_type_field.property_for_value(&sub_type))
        .map(|property| property.iri.clone())
        .unwrap_or_else(own)
}

/// `fn:lower-case(left) = fn:lower-case(right)`.
fn lower_case_equal(left: Expression, right: Expression) -> Expression {
    Expression::equal(
        Expression::call(Function::LowerCase, vec![left]),
        Expression::call(Function::LowerCase, vec![right]),
    )
}
