//! Deletions planned before the new values of a contact are inserted.

use super::mapping::implementations;
use super::UpdateBuilder;
use crate::resource::PropertyDescriptor;
use crate::schema::{DetailDefinition, Schema};
use crate::sparql::{Expression, Group, Pattern, Triple, UpdateOperation, Variable};
use crate::vocab::{nao, nco, nie, rdf};
use std::collections::BTreeSet;

/// Predicates and sub-type classes pruned from the resources of one detail.
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct RelatedPredicates {
    pub(crate) predicate_iris: BTreeSet<String>,
    pub(crate) sub_type_iris: BTreeSet<String>,
}

impl RelatedPredicates {
    pub(crate) fn of(detail: &DetailDefinition) -> Self {
        let mut related = Self::default();

        for field in &detail.fields {
            if field.permits_custom_values {
                related.predicate_iris.insert(nao::HAS_PROPERTY.to_string());
            }

            if field.has_sub_types() {
                related
                    .sub_type_iris
                    .extend(field.sub_type_classes.iter().map(|class| class.iri.clone()));
                continue;
            }

            if field.is_without_mapping || field.is_read_only() || field.is_inverse() {
                continue;
            }

            if let Some(last) = field.property_chain.last() {
                related.predicate_iris.insert(last.iri.clone());
            }

            related
                .predicate_iris
                .extend(field.computed_properties.iter().map(|property| property.iri.clone()));
        }

        related
    }
}

/// Resources of a detail known by their content IRIs.
#[derive(Debug, Clone)]
pub(crate) struct ExplicitObjects<'s> {
    detail: &'s DetailDefinition,
    type_iri: String,
    object_iris: Vec<String>,
}

/// Shared resources of a detail known by their key values.
#[derive(Debug, Clone)]
pub(crate) struct ForeignObjects<'s> {
    detail: &'s DetailDefinition,
    type_iri: String,
    key_iri: String,
    keys: Vec<Expression>,
}

/// Resources the saved details relate to, by the way they can be found.
#[derive(Debug, Clone, Default)]
pub(crate) struct RelatedObjects<'s> {
    /// Details whose resources are only reachable from the contact
    implicit: Vec<&'s DetailDefinition>,
    explicit: Vec<ExplicitObjects<'s>>,
    foreign: Vec<ForeignObjects<'s>>,
}

impl<'s> UpdateBuilder<'s> {
    /// Whether `detail` is left untouched by a masked save.
    pub(crate) fn is_unknown_detail(&self, detail: &DetailDefinition) -> bool {
        let Some(mask) = self.mask else {
            return false;
        };

        !mask.iter().any(|name| {
            *name == detail.name
                || self.schema.detail(name).is_some_and(|masked| {
                    implementations(self.schema, masked)
                        .iter()
                        .any(|implementation| implementation.name == detail.name)
                })
        })
    }

    pub(crate) fn collect_related_objects(&self) -> RelatedObjects<'s> {
        let schema: &'s Schema = self.schema;
        let mut related = RelatedObjects::default();

        for detail in schema.details().values() {
            if detail.is_synthesized() || self.is_unknown_detail(detail) {
                continue;
            }

            if let Some(subject_field) = detail.resource_iri_field() {
                let chain = &subject_field.property_chain;

                if chain.first().is_some_and(|first| first.read_only) {
                    continue;
                }

                let Some(subject) = subject_field.detail_uri_property() else {
                    continue;
                };

                if subject_field.is_foreign_key() {
                    let Some(key) = chain.last() else {
                        continue;
                    };

                    let keys = self
                        .mappings
                        .iter()
                        .filter(|mapping| mapping.definition().is_some_and(|d| d.name == detail.name))
                        .filter_map(|mapping| mapping.value(&subject_field.name))
                        .filter_map(|value| match subject_field.make_value(value) {
                            Ok(key) => Some(Expression::value(&key)),
                            Err(err) => {
                                log::debug!("dropping key of {} detail: {err}", detail.name);
                                None
                            }
                        })
                        .collect::<Vec<_>>();

                    if !keys.is_empty() {
                        related.foreign.push(ForeignObjects {
                            detail,
                            type_iri: subject.resource_type_iri().to_string(),
                            key_iri: key.iri.clone(),
                            keys,
                        });
                    }

                    continue;
                }

                if subject.resource_iri_scheme().is_content_scheme() {
                    let mut object_iris = Vec::new();

                    for mapping in &self.mappings {
                        if mapping.definition().map(|d| d.name.as_str()) != Some(detail.name.as_str()) {
                            continue;
                        }

                        match mapping.make_resource_iri() {
                            Some(iri) => object_iris.push(iri),
                            None => log::warn!(
                                "empty object IRI for {} detail which has a content IRI",
                                detail.name
                            ),
                        }
                    }

                    if !object_iris.is_empty() {
                        related.explicit.push(ExplicitObjects {
                            detail,
                            type_iri: subject.resource_type_iri().to_string(),
                            object_iris,
                        });
                    }

                    continue;
                }
            }

            if !detail.predicate_chains().is_empty() {
                related.implicit.push(detail);
            }
        }

        related
    }

    pub(crate) fn delete_related_objects(&mut self, related: &RelatedObjects<'s>) {
        if self.existing {
            for detail in &related.implicit {
                self.delete_possessed_objects(detail);
            }
        }

        for objects in &related.explicit {
            self.delete_explicit_objects(objects);
        }

        for objects in &related.foreign {
            self.delete_foreign_objects(objects);
        }
    }

    /// Unlink the resources reached by each possessed chain from the contact's graph.
    fn delete_possessed_objects(&mut self, detail: &DetailDefinition) {
        for chain in detail.possessed_chains() {
            let hops = chain.as_slice();
            let Some((last, path)) = hops.split_last() else {
                continue;
            };

            if detail.has_context {
                let mut context_path = vec![has_affiliation()];
                context_path.extend(path.iter().cloned());
                self.delete_chain_objects(&context_path, &last.iri);
            }

            if hops.len() > 1 {
                self.delete_chain_objects(path, &last.iri);
            }
        }
    }

    fn delete_chain_objects(&mut self, path: &[PropertyDescriptor], predicate: &str) {
        let subject = Variable::new("subject");
        let object = Variable::new("object");

        let mut condition = Group::new();
        let mut axis = self.contact.clone();

        for (index, hop) in path.iter().enumerate() {
            let next: Expression = if index + 1 == path.len() {
                (&subject).into()
            } else {
                self.pool.fresh().into()
            };

            if hop.inverse {
                condition.triple(next.clone(), hop.iri.as_str(), axis);
            } else {
                condition.triple(axis, hop.iri.as_str(), next.clone());
            }

            axis = next;
        }

        condition.triple(&subject, predicate, &object);

        let template = vec![Triple::new(&subject, predicate, &object)];
        let operation = self.delete_in_graph(template, condition);
        self.update.push(operation);
    }

    /// Prune the predicates and sub-type classes of content addressed resources.
    fn delete_explicit_objects(&mut self, objects: &ExplicitObjects<'_>) {
        let related = RelatedPredicates::of(objects.detail);
        let predicate = Variable::new("predicate");
        let object = Variable::new("object");

        if !related.predicate_iris.is_empty() {
            for iri in &objects.object_iris {
                let mut condition = Group::new();
                condition
                    .push(Pattern::Triple(Triple::with_predicate(
                        Expression::iri(iri),
                        &predicate,
                        &object,
                    )))
                    .filter(Expression::is_in(
                        (&predicate).into(),
                        related.predicate_iris.iter().map(Expression::iri).collect(),
                    ));

                self.update.push(UpdateOperation::Delete {
                    graph: None,
                    template: vec![Triple::with_predicate(Expression::iri(iri), &predicate, &object)],
                    condition: Some(condition),
                });
            }
        }

        if !related.sub_type_iris.is_empty() {
            let resource = Variable::new("resource");
            let mut condition = Group::new();
            condition
                .triple(&resource, rdf::TYPE, Expression::iri(&objects.type_iri))
                .filter(Expression::is_in(
                    (&resource).into(),
                    objects.object_iris.iter().map(Expression::iri).collect(),
                ));

            self.update.push(UpdateOperation::Delete {
                graph: None,
                template: sub_type_template(&resource, &related.sub_type_iris),
                condition: Some(condition),
            });
        }
    }

    /// Prune custom values and sub-type classes of shared resources matched by key.
    fn delete_foreign_objects(&mut self, objects: &ForeignObjects<'_>) {
        let related = RelatedPredicates::of(objects.detail);
        let resource = Variable::new("resource");
        let key = Variable::new("key");
        let key_filter = Expression::is_in((&key).into(), objects.keys.clone());

        if related.predicate_iris.contains(nao::HAS_PROPERTY) || !related.sub_type_iris.is_empty() {
            let property = Variable::new("property");
            let mut condition = Group::new();
            condition
                .triple(&resource, nao::HAS_PROPERTY, &property)
                .triple(&resource, objects.key_iri.as_str(), &key)
                .filter(key_filter.clone());

            self.update.push(UpdateOperation::Delete {
                graph: None,
                template: vec![Triple::new(&resource, nao::HAS_PROPERTY, &property)],
                condition: Some(condition),
            });
        }

        if !related.sub_type_iris.is_empty() {
            let mut condition = Group::new();
            condition
                .triple(&resource, rdf::TYPE, Expression::iri(&objects.type_iri))
                .triple(&resource, objects.key_iri.as_str(), &key)
                .filter(key_filter);

            self.update.push(UpdateOperation::Delete {
                graph: None,
                template: sub_type_template(&resource, &related.sub_type_iris),
                condition: Some(condition),
            });
        }
    }

    pub(crate) fn delete_contact_properties(&mut self) {
        if self.mask.is_some() {
            self.delete_masked_contact_properties();
        } else {
            self.delete_all_contact_properties();
        }
    }

    /// Delete every property of the contact in its graph but its classes, its group
    /// memberships and the values preserved by this save.
    fn delete_all_contact_properties(&mut self) {
        let predicate = Variable::new("predicate");
        let object = Variable::new("object");

        let mut kept = vec![Expression::iri(rdf::TYPE), Expression::iri(nco::BELONGS_TO_GROUP)];

        if self.stamps.preserve_guid {
            kept.push(Expression::iri(nco::CONTACT_UID));
        }

        if self.stamps.preserve_created {
            kept.push(Expression::iri(nie::CONTENT_CREATED));
        }

        let mut condition = Group::new();
        condition
            .push(Pattern::Triple(Triple::with_predicate(
                self.contact.clone(),
                &predicate,
                &object,
            )))
            .filter(Expression::not(Expression::is_in((&predicate).into(), kept)));

        let template = vec![Triple::with_predicate(self.contact.clone(), &predicate, &object)];
        let operation = self.delete_in_graph(template, condition);
        self.update.push(operation);
    }

    /// Delete only the predicates written by the masked details.
    fn delete_masked_contact_properties(&mut self) {
        let mut on_contact = BTreeSet::from([nie::CONTENT_LAST_MODIFIED.to_string()]);
        let mut on_affiliation = BTreeSet::new();
        let mut custom_details = BTreeSet::new();

        if !self.stamps.preserve_guid {
            on_contact.insert(nco::CONTACT_UID.to_string());
        }

        let schema: &'s Schema = self.schema;

        for name in self.mask.unwrap_or_default() {
            let definitions = match schema.detail(name) {
                Some(definition) => implementations(schema, definition),
                None if Schema::is_synthetic_detail(name) => continue,
                None => {
                    custom_details.insert(name.clone());
                    continue;
                }
            };

            for detail in definitions {
                for field in &detail.fields {
                    if field.is_read_only() || field.is_synthesized || field.has_sub_types() {
                        continue;
                    }

                    let hops = field.property_chain.as_slice();
                    let (first, through_affiliation) = match hops {
                        [] => {
                            log::warn!(
                                "no property chain for {} field of {} detail",
                                field.name,
                                detail.name
                            );
                            continue;
                        }
                        [first, second, ..] if first.iri == nco::HAS_AFFILIATION => (second, true),
                        [first] if first.iri == nco::HAS_AFFILIATION => continue,
                        [first, ..] => (first, detail.has_context),
                    };

                    if through_affiliation {
                        on_affiliation.insert(first.iri.clone());
                    } else {
                        on_contact.insert(first.iri.clone());
                    }
                }
            }
        }

        let predicate = Variable::new("predicate");
        let object = Variable::new("object");

        let mut condition = Group::new();
        condition
            .push(Pattern::Triple(Triple::with_predicate(
                self.contact.clone(),
                &predicate,
                &object,
            )))
            .filter(Expression::is_in(
                (&predicate).into(),
                on_contact.iter().map(Expression::iri).collect(),
            ));

        let template = vec![Triple::with_predicate(self.contact.clone(), &predicate, &object)];
        let operation = self.delete_in_graph(template, condition);
        self.update.push(operation);

        if !custom_details.is_empty() {
            let property = Variable::new("property");
            let property_name = Variable::new("propertyName");

            let mut condition = Group::new();
            condition
                .triple(self.contact.clone(), nao::HAS_PROPERTY, &property)
                .triple(&property, nao::PROPERTY_NAME, &property_name)
                .filter(Expression::is_in(
                    (&property_name).into(),
                    custom_details.iter().map(Expression::string).collect(),
                ));

            let template = vec![Triple::new(self.contact.clone(), nao::HAS_PROPERTY, &property)];
            let operation = self.delete_in_graph(template, condition);
            self.update.push(operation);
        }

        let context = Variable::new("context");

        for iri in &on_affiliation {
            let mut condition = Group::new();
            condition
                .triple(self.contact.clone(), nco::HAS_AFFILIATION, &context)
                .triple(&context, iri.as_str(), &object);

            let template = vec![Triple::new(&context, iri.as_str(), &object)];
            let operation = self.delete_in_graph(template, condition);
            self.update.push(operation);
        }
    }
}

fn has_affiliation() -> PropertyDescriptor {
    PropertyDescriptor::new(nco::HAS_AFFILIATION, nco::ROLE, nco::AFFILIATION).multi_valued()
}

/// `resource a class` for every class of `classes`.
fn sub_type_template(resource: &Variable, classes: &BTreeSet<String>) -> Vec<Triple> {
    classes
        .iter()
        .map(|class| Triple::new(resource, rdf::TYPE, Expression::iri(class)))
        .collect()
}
