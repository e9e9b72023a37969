//! Detail columns of fetch queries.
//!
//! Unique details project one column per field, read with property functions wherever
//! the chain allows it. Repeatable details are grouped by the first hop of their chains:
//! every group becomes one column concatenating all instances reached through that hop,
//! each instance being the fields joined by [`FIELD_SEPARATOR`].

use super::{Binder, Cell, Column, ColumnKind};
use crate::codec::{DETAIL_SEPARATOR, FIELD_SEPARATOR, GRAPH_SEPARATOR, LIST_SEPARATOR};
use crate::error::{CompileError, Result};
use crate::resource::PropertyDescriptor;
use crate::schema::{DetailDefinition, FieldDefinition, QueryTransform};
use crate::sparql::{Expression, Group, Pattern, Select, Triple};
use crate::value::Value;
use crate::vocab::{nao, nco, rdf, rdfs, xsd};
use std::collections::HashMap;

/// The hops up to and including the one reaching the detail's resource.
pub(crate) fn chain_to_detail_uri(chain: &[PropertyDescriptor]) -> &[PropertyDescriptor] {
    match chain.iter().position(|property| property.has_detail_uri) {
        Some(index) => &chain[..=index],
        None => &[],
    }
}

/// Nested property functions reading `chain` from `subject`.
pub(crate) fn property_function_chain(
    chain: &[PropertyDescriptor],
    subject: Expression,
    with_graph: bool,
) -> Expression {
    let Some((last, init)) = chain.split_last() else {
        return subject;
    };

    let inner = init
        .iter()
        .fold(subject, |subject, property| Expression::property(&property.iri, subject));

    Expression::property(&last.iri, inner).with_separators(
        (!last.single_valued).then_some(LIST_SEPARATOR),
        with_graph.then_some(GRAPH_SEPARATOR),
    )
}

/// Whether every hop but the last (or every hop, when `strict`) is single valued.
pub(crate) fn is_single_valued(chain: &[PropertyDescriptor], strict: bool) -> bool {
    let checked = if strict {
        chain.len()
    } else {
        chain.len().saturating_sub(1)
    };

    chain[..checked].iter().all(|property| property.single_valued)
}

/// Split a chain into the hops that need triple patterns and the tail readable with
/// property functions.
///
/// The tail starts after the last multi-valued or ownership defining hop before the final
/// one.
pub(crate) fn split_chain(
    chain: &[PropertyDescriptor],
) -> (&[PropertyDescriptor], &[PropertyDescriptor]) {
    let mut split = chain.len().saturating_sub(1);

    while split > 0 && chain[split - 1].single_valued && !chain[split - 1].defines_ownership {
        split -= 1;
    }

    chain.split_at(split)
}

/// The triple of one hop, honouring its direction.
pub(crate) fn hop_triple(
    subject: Expression,
    property: &PropertyDescriptor,
    object: Expression,
) -> Triple {
    if property.inverse {
        Triple::new(object, &property.iri, subject)
    } else {
        Triple::new(subject, &property.iri, object)
    }
}

fn has_property() -> PropertyDescriptor {
    PropertyDescriptor::new(nao::HAS_PROPERTY, rdfs::RESOURCE, nao::PROPERTY).multi_valued()
}

fn property_value() -> PropertyDescriptor {
    PropertyDescriptor::new(nao::PROPERTY_VALUE, nao::PROPERTY, xsd::STRING)
}

fn is_affiliation(property: &PropertyDescriptor) -> bool {
    property.iri == nco::HAS_AFFILIATION && !property.inverse
}

/// Triple patterns of a chain walked from a subject.
pub(crate) struct ChainPattern {
    pub(crate) group: Group,
    /// Resource or value the chain ends in; the subject for an empty chain
    pub(crate) object: Expression,
    /// Triple of the last ownership defining hop
    pub(crate) ownership: Option<Triple>,
    /// Triple of the final hop
    pub(crate) last: Option<Triple>,
}

/// Hops sharing one leading property, bound into one column.
struct PrefixGroup<'d> {
    prefix: PropertyDescriptor,
    sub_type: Option<Value>,
    fields: Vec<&'d FieldDefinition>,
    inverse: Vec<&'d FieldDefinition>,
}

fn prefix_group<'g, 'd>(
    groups: &'g mut Vec<PrefixGroup<'d>>,
    prefix: &PropertyDescriptor,
    sub_type: Option<Value>,
) -> &'g mut PrefixGroup<'d> {
    let index = match groups.iter().position(|group| group.prefix == *prefix) {
        Some(index) => index,
        None => {
            groups.push(PrefixGroup {
                prefix: prefix.clone(),
                sub_type,
                fields: Vec::new(),
                inverse: Vec::new(),
            });
            groups.len() - 1
        }
    };

    &mut groups[index]
}

fn rest(field: &FieldDefinition) -> &[PropertyDescriptor] {
    let chain = field.property_chain.as_slice();
    &chain[chain.len().min(1)..]
}

impl Binder<'_> {
    /// Walk `chain` from `subject`, ending in `object` or a fresh variable.
    pub(crate) fn chain_pattern(
        &mut self,
        subject: Expression,
        chain: &[PropertyDescriptor],
        object: Option<Expression>,
    ) -> ChainPattern {
        let mut pattern = ChainPattern {
            group: Group::new(),
            object: subject.clone(),
            ownership: None,
            last: None,
        };

        let mut current = subject;

        for (index, property) in chain.iter().enumerate() {
            let next = match (&object, index + 1 == chain.len()) {
                (Some(object), true) => object.clone(),
                _ => self.pool.fresh().into(),
            };

            let triple = hop_triple(current, property, next.clone());
            if property.defines_ownership {
                pattern.ownership = Some(triple.clone());
            }
            pattern.group.push(Pattern::Triple(triple.clone()));
            pattern.last = Some(triple);
            current = next;
        }

        pattern.object = current;
        pattern
    }

    /// `subject nao:hasProperty ?f . ?f nao:propertyName "name" . ?f nao:propertyValue object`
    pub(crate) fn custom_field_pattern(
        &mut self,
        subject: Expression,
        field: Option<&str>,
        object: Expression,
    ) -> Group {
        let property = self.pool.fresh();
        let mut group = Group::new();

        group.triple(subject, nao::HAS_PROPERTY, &property);
        if let Some(name) = field.filter(|name| !name.is_empty()) {
            group.triple(&property, nao::PROPERTY_NAME, Expression::string(name));
        }
        group.triple(&property, nao::PROPERTY_VALUE, object);

        group
    }

    /// Pattern reaching a field value of a detail the schema does not know.
    pub(crate) fn custom_detail_pattern(
        &mut self,
        subject: Expression,
        detail: &str,
        field: Option<&str>,
        object: Expression,
    ) -> Group {
        let resource = self.pool.fresh();
        let mut group = Group::new();

        group
            .triple(subject, nao::HAS_PROPERTY, &resource)
            .triple(&resource, nao::PROPERTY_NAME, Expression::string(detail));
        group.extend(self.custom_field_pattern(resource.into(), field, object));

        group
    }

    /// `concat(value, GS, coalesce((SELECT ?g WHERE { GRAPH ?g { triple } }), ""))`
    pub(crate) fn concat_with_graph(&mut self, value: Expression, triple: &Triple) -> Expression {
        let graph = self.pool.fresh();

        let mut inner = Group::new();
        inner.push(Pattern::Triple(triple.clone()));

        let mut select = Select::new();
        select.project(&graph).restrict(Pattern::Graph {
            graph: (&graph).into(),
            group: inner,
        });

        Expression::concat(vec![
            value,
            Expression::separator(GRAPH_SEPARATOR),
            Expression::or_empty(select.into()),
        ])
    }

    /// Subject and chain of a unique field, reading affiliation hops from the row's context.
    fn strip_affiliation<'c>(
        &self,
        chain: &'c [PropertyDescriptor],
    ) -> (Expression, &'c [PropertyDescriptor]) {
        match chain.split_first() {
            Some((first, rest)) if is_affiliation(first) => (self.context(), rest),
            _ => (self.contact(), chain),
        }
    }

    pub(crate) fn bind_unique_detail(
        &mut self,
        detail: &DetailDefinition,
        select: &mut Select,
        columns: &mut Vec<Column>,
    ) -> Result<()> {
        if let Some(field) = detail.resource_iri_field() {
            let (subject, chain) = self.strip_affiliation(field.property_chain.as_slice());
            let uri_chain = chain_to_detail_uri(chain);

            // An affiliation detail URI is the context column itself.
            if !uri_chain.is_empty() {
                let expression = if is_single_valued(uri_chain, false) {
                    property_function_chain(uri_chain, subject, false)
                } else {
                    log::warn!(
                        "detail URI of {} is reached through a multi-valued chain",
                        detail.name
                    );
                    Expression::string("")
                };

                select.project(expression);
                columns.push(Column::detail(detail, ColumnKind::DetailUri));
            }
        }

        for field in detail.fields.iter().filter(|f| f.has_property_chain()) {
            let expression = self.bind_unique_field(field)?;
            select.project(expression);
            columns.push(Column::detail(detail, ColumnKind::Field(field.name.clone())));
        }

        Ok(())
    }

    fn bind_unique_field(&mut self, field: &FieldDefinition) -> Result<Expression> {
        let (subject, chain) = self.strip_affiliation(field.property_chain.as_slice());

        if field.has_sub_types() {
            return Err(CompileError::not_supported(format!(
                "sub-types of unique field {}",
                field.name
            )));
        }

        if field.is_inverse() {
            return Err(CompileError::not_supported(format!(
                "inverse chain of unique field {}",
                field.name
            )));
        }

        if chain.is_empty() {
            return Ok(subject);
        }

        let has_instances = !field.allowable_instances.is_empty();
        let with_graph = field.has_owner && !has_instances;

        if is_single_valued(chain, false) && !field.is_without_mapping && !field.defines_ownership()
        {
            if has_instances {
                if field.has_owner {
                    if chain.len() != 1 {
                        return Err(CompileError::not_supported(format!(
                            "owned instances behind a chain for field {}",
                            field.name
                        )));
                    }
                    return Ok(self.unique_field_subquery(
                        subject,
                        chain,
                        QueryTransform::TrackerId,
                        true,
                    ));
                }

                if is_single_valued(chain, true) {
                    return Ok(Expression::tracker_id(property_function_chain(
                        chain, subject, false,
                    )));
                }

                let pattern = self.chain_pattern(subject, chain, None);
                let mut select = Select::new();
                select
                    .project(Expression::group_concat(
                        Expression::tracker_id(pattern.object),
                        LIST_SEPARATOR,
                    ))
                    .restrict_group(pattern.group);
                return Ok(select.into());
            }

            if let Some(transform) = field.transform {
                return Ok(self.unique_field_subquery(subject, chain, transform, field.has_owner));
            }

            return Ok(property_function_chain(chain, subject, with_graph));
        }

        let mut select = Select::new();

        let projection = if field.is_without_mapping {
            let pattern = self.chain_pattern(subject, chain, None);
            let owner = pattern.object;
            let property = self.pool.fresh();

            select
                .restrict_group(pattern.group)
                .triple(owner, nao::HAS_PROPERTY, &property)
                .triple(&property, nao::PROPERTY_NAME, Expression::string(&field.name));

            property_function_chain(&[property_value()], property.into(), with_graph)
        } else {
            let (restriction, projection) = split_chain(chain);
            let pattern = self.chain_pattern(subject, restriction, None);
            let target = pattern.object.clone();
            select.restrict_group(pattern.group);

            if has_instances {
                if field.has_owner {
                    return Err(CompileError::not_supported(format!(
                        "owned instances for field {}",
                        field.name
                    )));
                }

                let values = self.chain_pattern(target, projection, None);
                select.restrict_group(values.group);
                Expression::group_concat(Expression::tracker_id(values.object), LIST_SEPARATOR)
            } else {
                match pattern.ownership {
                    Some(ownership) if field.has_owner => {
                        let value = property_function_chain(projection, target, false);
                        self.concat_with_graph(value, &ownership)
                    }
                    _ => property_function_chain(projection, target, with_graph),
                }
            }
        };

        select.project(projection);
        Ok(select.into())
    }

    fn unique_field_subquery(
        &mut self,
        subject: Expression,
        chain: &[PropertyDescriptor],
        transform: QueryTransform,
        with_graph: bool,
    ) -> Expression {
        let pattern = self.chain_pattern(subject, chain, None);
        let mut value = transform.apply(pattern.object.clone());

        if with_graph {
            if let Some(last) = &pattern.last {
                value = self.concat_with_graph(value, last);
            }
        }

        if chain.first().is_some_and(|property| !property.single_valued) {
            value = Expression::group_concat(value, LIST_SEPARATOR);
        }

        let mut select = Select::new();
        select.project(value).restrict_group(pattern.group);
        select.into()
    }

    pub(crate) fn bind_multi_detail(
        &mut self,
        detail: &DetailDefinition,
        select: &mut Select,
        columns: &mut Vec<Column>,
    ) -> Result<()> {
        let subject = if detail.has_context {
            self.context()
        } else {
            self.contact()
        };

        let mut groups: Vec<PrefixGroup> = Vec::new();

        for field in detail.fields.iter().filter(|f| f.has_property_chain()) {
            let prefix = &field.property_chain[0];

            if rest(field).iter().any(|property| property.inverse) {
                prefix_group(&mut groups, prefix, None).inverse.push(field);
                continue;
            }

            if !field.sub_type_properties.is_empty() {
                if field.property_chain.len() != 1 {
                    return Err(CompileError::not_supported(format!(
                        "sub-type properties behind a chain for field {}",
                        field.name
                    )));
                }

                for property in &field.sub_type_properties {
                    prefix_group(&mut groups, property, property.value.clone())
                        .fields
                        .push(field);
                }
            }

            prefix_group(&mut groups, prefix, None).fields.push(field);
        }

        let detail_uri = detail
            .resource_iri_field()
            .map(|field| chain_to_detail_uri(field.property_chain.as_slice()))
            .filter(|chain| !chain.is_empty());

        for group in &groups {
            let (expression, cells) = self.bind_prefix_group(detail, group, &subject, detail_uri)?;
            select.project(expression);
            columns.push(Column::detail(
                detail,
                ColumnKind::Instances {
                    sub_type: group.sub_type.clone(),
                    cells,
                },
            ));
        }

        Ok(())
    }

    fn bind_prefix_group(
        &mut self,
        detail: &DetailDefinition,
        group: &PrefixGroup,
        subject: &Expression,
        detail_uri: Option<&[PropertyDescriptor]>,
    ) -> Result<(Expression, Vec<Cell>)> {
        let prefix = &group.prefix;
        let uri_rest = detail_uri
            .and_then(|chain| chain.split_first())
            .filter(|(first, _)| *first == prefix)
            .map(|(_, rest)| rest);

        if let [field] = group.fields.as_slice() {
            let plain = !field.has_sub_types()
                && !field.is_without_mapping
                && !field.permits_custom_values
                && !field.restricts_values();

            if group.inverse.is_empty()
                && uri_rest.is_none()
                && rest(field).is_empty()
                && (group.sub_type.is_some() || plain)
            {
                let expression = Expression::property(&prefix.iri, subject.clone())
                    .with_separators(
                        Some(DETAIL_SEPARATOR),
                        field.has_owner.then_some(GRAPH_SEPARATOR),
                    );

                // Sub-type columns carry the value of the field sharing their chain.
                let name = detail
                    .fields
                    .iter()
                    .find(|other| {
                        !other.has_sub_types() && other.property_chain == field.property_chain
                    })
                    .unwrap_or(*field)
                    .name
                    .clone();

                return Ok((expression, vec![Cell::Value(name)]));
            }
        }

        let object: Expression = if is_affiliation(prefix) {
            self.context()
        } else {
            self.pool.fresh().into()
        };

        let prefix_triple = if is_affiliation(prefix) {
            Triple::new(self.contact(), nco::HAS_AFFILIATION, self.context())
        } else {
            hop_triple(subject.clone(), prefix, object.clone())
        };

        let mut group_select = Select::new();
        let mut tokens = Vec::new();
        let mut cells = Vec::new();

        if let Some(uri_rest) = uri_rest {
            tokens.push(property_function_chain(uri_rest, object.clone(), false));
            cells.push(Cell::DetailUri);
        }

        let shared = shared_restriction(&group.fields);
        let shared_target = match shared {
            Some(restriction) => {
                let pattern = self.chain_pattern(object.clone(), restriction, None);
                group_select.restrict_group(pattern.group);
                Some((restriction, pattern.object, pattern.ownership))
            }
            None => None,
        };

        for field in &group.fields {
            let chain = rest(field);

            if !field.is_without_mapping {
                let value = if chain.is_empty() {
                    if field.allowable_instances.is_empty() {
                        object.clone()
                    } else {
                        Expression::tracker_id(object.clone())
                    }
                } else if field.restricts_values() {
                    Expression::or_empty(self.restricted_values(field, chain, object.clone()))
                } else {
                    self.bind_group_field(field, chain, &object, &prefix_triple, &shared_target)
                };

                if !field.sub_type_classes.is_empty() {
                    let class = self.pool.fresh();
                    let mut classes = Select::new();
                    classes
                        .project(Expression::group_concat(
                            Expression::tracker_id((&class).into()),
                            LIST_SEPARATOR,
                        ))
                        .triple(value, rdf::TYPE, &class);

                    tokens.push(Expression::or_empty(classes.into()));
                    cells.push(Cell::SubTypeClasses(field.name.clone()));
                } else if field.sub_type_properties.is_empty() {
                    let value = if chain.is_empty() && field.has_owner {
                        self.concat_with_graph(value, &prefix_triple)
                    } else {
                        value
                    };

                    tokens.push(value);
                    cells.push(Cell::Value(field.name.clone()));
                }
            }

            if field.permits_custom_values {
                let values = self.custom_values(field, object.clone(), chain)?;
                tokens.push(Expression::or_empty(values));
                cells.push(Cell::CustomValues(field.name.clone()));
            }
        }

        if !group.inverse.is_empty() {
            let (token, names) = self.inverse_fields(&group.inverse, &object, &prefix_triple);
            tokens.push(token);
            cells.extend(names.into_iter().map(Cell::Value));
        }

        let joined = match tokens.len() {
            0 => object,
            1 => tokens.remove(0),
            _ => Expression::concat(intercalate(tokens, FIELD_SEPARATOR)),
        };

        if !is_affiliation(prefix) {
            group_select.group.patterns.insert(0, Pattern::Triple(prefix_triple));
        }
        group_select.project(Expression::group_concat(joined, DETAIL_SEPARATOR));

        Ok((group_select.into(), cells))
    }

    /// Value of a plain field of a prefix group.
    fn bind_group_field(
        &mut self,
        field: &FieldDefinition,
        chain: &[PropertyDescriptor],
        object: &Expression,
        prefix_triple: &Triple,
        shared: &Option<(&[PropertyDescriptor], Expression, Option<Triple>)>,
    ) -> Expression {
        let (restriction, projection) = split_chain(chain);
        let owned = field.has_owner && field.defines_ownership();

        if restriction.is_empty() && field.transform.is_none() {
            let fetched_with_graph = field
                .property_chain
                .last()
                .is_some_and(|property| property.defines_ownership);

            if owned && !fetched_with_graph {
                let value = property_function_chain(projection, object.clone(), false);
                return self.concat_with_graph(value, prefix_triple);
            }

            return Expression::or_empty(property_function_chain(
                chain,
                object.clone(),
                field.has_owner,
            ));
        }

        if let Some((shared_restriction, target, ownership)) = shared {
            if *shared_restriction == restriction && field.transform.is_none() {
                let value = property_function_chain(projection, target.clone(), !owned && field.has_owner);
                return match (owned, ownership) {
                    (true, Some(ownership)) => self.concat_with_graph(value, ownership),
                    (true, None) => self.concat_with_graph(value, prefix_triple),
                    _ => value,
                };
            }
        }

        let mut subselect = Select::new();

        let value = match field.transform {
            Some(transform) if !owned => {
                let value = self.multivalue_subquery(
                    chain,
                    object.clone(),
                    &mut subselect,
                    Some(transform),
                    field.has_owner,
                );
                if is_single_valued(chain, true) {
                    value
                } else {
                    Expression::group_concat(value, LIST_SEPARATOR)
                }
            }
            _ => {
                let pattern = self.chain_pattern(object.clone(), restriction, None);
                let target = pattern.object.clone();
                subselect.restrict_group(pattern.group);

                if owned {
                    let value = property_function_chain(projection, target, false);
                    let ownership = pattern.ownership.unwrap_or_else(|| prefix_triple.clone());
                    self.concat_with_graph(value, &ownership)
                } else {
                    property_function_chain(projection, target, field.has_owner)
                }
            }
        };

        subselect.project(value);
        Expression::or_empty(subselect.into())
    }

    /// Values of a field restricted to closed lists.
    fn restricted_values(
        &mut self,
        field: &FieldDefinition,
        chain: &[PropertyDescriptor],
        subject: Expression,
    ) -> Expression {
        let has_instances = !field.allowable_instances.is_empty();

        if is_single_valued(chain, false) && !has_instances {
            return property_function_chain(chain, subject, field.has_owner);
        }

        let mut select = Select::new();

        let value = if field.has_owner {
            let transform = has_instances.then_some(QueryTransform::TrackerId);
            self.multivalue_subquery(chain, subject, &mut select, transform, true)
        } else {
            let pattern = self.chain_pattern(subject, chain, None);
            select.restrict_group(pattern.group);
            if has_instances {
                Expression::tracker_id(pattern.object)
            } else {
                pattern.object
            }
        };

        select.project(Expression::group_concat(value, LIST_SEPARATOR));
        select.into()
    }

    /// Bind `chain` into `select` by triple patterns, returning the transformed final value.
    fn multivalue_subquery(
        &mut self,
        chain: &[PropertyDescriptor],
        subject: Expression,
        select: &mut Select,
        transform: Option<QueryTransform>,
        with_graph: bool,
    ) -> Expression {
        let apply = |value: Expression| match transform {
            Some(transform) => transform.apply(value),
            None => value,
        };

        let Some((postfix, base)) = chain.split_last() else {
            return apply(subject);
        };

        let pattern = self.chain_pattern(subject, base, None);
        let last = pattern.object;
        select.restrict_group(pattern.group);

        let instance = self.pool.fresh();
        let triple = hop_triple(last, postfix, (&instance).into());
        select.restrict(Pattern::Triple(triple.clone()));

        let value = apply((&instance).into());
        if with_graph {
            self.concat_with_graph(value, &triple)
        } else {
            value
        }
    }

    /// Values of a field stored outside its closed list, as `nao:Property` resources.
    fn custom_values(
        &mut self,
        field: &FieldDefinition,
        subject: Expression,
        chain: &[PropertyDescriptor],
    ) -> Result<Expression> {
        let mut chain = chain.to_vec();

        if !field.is_without_mapping && !field.has_sub_types() {
            match chain.last() {
                None => {
                    return Err(CompileError::schema(format!(
                        "custom values of {} need a resource to attach to",
                        field.name
                    )))
                }
                Some(last) if last.inverse => {
                    return Err(CompileError::not_supported(format!(
                        "custom values behind an inverse property for field {}",
                        field.name
                    )))
                }
                Some(_) => {
                    chain.pop();
                }
            }
        }

        if !chain.is_empty() && !is_single_valued(&chain, false) {
            return Err(CompileError::not_supported(format!(
                "custom values behind a multi-valued chain for field {}",
                field.name
            )));
        }

        chain.push(has_property());
        let pattern = self.chain_pattern(subject, &chain, None);
        let property = pattern.object.clone();

        let mut value = Expression::property(nao::PROPERTY_VALUE, property.clone());
        if field.has_owner {
            if let Some(last) = &pattern.last {
                value = self.concat_with_graph(value, last);
            }
        }

        let mut select = Select::new();
        select
            .project(Expression::group_concat(value, LIST_SEPARATOR))
            .restrict_group(pattern.group)
            .triple(property, nao::PROPERTY_NAME, Expression::string(&field.name));

        Ok(select.into())
    }

    /// One token holding the fields whose chains traverse an inverse property.
    ///
    /// Returns the token and the names of the fields it holds, in order.
    fn inverse_fields(
        &mut self,
        fields: &[&FieldDefinition],
        subject: &Expression,
        prefix_triple: &Triple,
    ) -> (Expression, Vec<String>) {
        let mut select = Select::new();
        let mut values = Vec::new();
        let mut names = Vec::new();
        let mut bound: HashMap<(Vec<String>, String), (Expression, Option<Triple>)> =
            HashMap::new();

        for field in fields {
            let chain = rest(field);
            let Some(inverse_index) = chain.iter().position(|property| property.inverse) else {
                continue;
            };

            let restriction = &chain[..inverse_index];
            let inverse = &chain[inverse_index];
            let projection = &chain[inverse_index + 1..];
            let key = (
                restriction.iter().map(|p| p.iri.clone()).collect(),
                inverse.iri.clone(),
            );

            let (inverse_object, ownership) = match bound.get(&key).cloned() {
                Some(known) => known,
                None => {
                    let pattern = self.chain_pattern(subject.clone(), restriction, None);
                    let mut ownership = pattern.ownership;
                    select.restrict_group(pattern.group);

                    let inverse_object: Expression = self.pool.fresh().into();
                    let triple = Triple::new(inverse_object.clone(), &inverse.iri, pattern.object);
                    if inverse.defines_ownership {
                        ownership = Some(triple.clone());
                    }
                    select.restrict(Pattern::Triple(triple));

                    bound.insert(key, (inverse_object.clone(), ownership.clone()));
                    (inverse_object, ownership)
                }
            };

            let ownership = ownership.or_else(|| field.has_owner.then(|| prefix_triple.clone()));

            let value = if projection.is_empty() {
                match (&ownership, field.has_owner) {
                    (Some(ownership), true) => self.concat_with_graph(inverse_object, ownership),
                    _ => inverse_object,
                }
            } else if !field.has_owner
                || projection.last().is_some_and(|property| property.defines_ownership)
            {
                Expression::or_empty(property_function_chain(
                    projection,
                    inverse_object,
                    field.has_owner,
                ))
            } else if let (false, Some(ownership)) =
                (projection.iter().any(|p| p.defines_ownership), &ownership)
            {
                let value = property_function_chain(projection, inverse_object, false);
                Expression::or_empty(self.concat_with_graph(value, ownership))
            } else {
                log::warn!("unsupported ownership for inverse field {}", field.name);
                continue;
            };

            values.push(value);
            names.push(field.name.clone());
        }

        let fallback = FIELD_SEPARATOR
            .to_string()
            .repeat(values.len().saturating_sub(1));

        match values.len() {
            0 => return (Expression::string(fallback), names),
            1 => {
                select.project(values.remove(0));
            }
            _ => {
                select.project(Expression::concat(intercalate(values, FIELD_SEPARATOR)));
            }
        }

        (
            Expression::coalesce(select.into(), Expression::string(fallback)),
            names,
        )
    }
}

/// Restriction chain shared by every field of a group, when longer than one hop.
fn shared_restriction<'d>(fields: &[&'d FieldDefinition]) -> Option<&'d [PropertyDescriptor]> {
    let mut restrictions = fields
        .iter()
        .map(|field| split_chain(rest(field)).0)
        .filter(|restriction| !restriction.is_empty());

    let first = restrictions.next()?;
    (first.len() > 1 && restrictions.all(|other| other == first)).then_some(first)
}

fn intercalate(tokens: Vec<Expression>, separator: char) -> Vec<Expression> {
    let mut joined = Vec::with_capacity(tokens.len() * 2);

    for (index, token) in tokens.into_iter().enumerate() {
        if index > 0 {
            joined.push(Expression::separator(separator));
        }
        joined.push(token);
    }

    joined
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Settings;
    use crate::fetch::tests::fixture_schema;

    fn chain() -> Vec<PropertyDescriptor> {
        vec![
            PropertyDescriptor::new(nco::HAS_EMAIL_ADDRESS, nco::ROLE, nco::EMAIL_ADDRESS)
                .multi_valued()
                .has_detail_uri()
                .defines_ownership(),
            PropertyDescriptor::new(nco::EMAIL_ADDRESS_PROPERTY, nco::EMAIL_ADDRESS, xsd::STRING),
        ]
    }

    #[test]
    fn test_chain_to_detail_uri() {
        let chain = chain();
        assert_eq!(chain_to_detail_uri(&chain).len(), 1);
        assert!(chain_to_detail_uri(&chain[1..]).is_empty());
    }

    #[test]
    fn test_split_chain_stops_at_ownership() {
        let chain = chain();
        let (restriction, projection) = split_chain(&chain);
        assert_eq!(restriction.len(), 1);
        assert_eq!(projection.len(), 1);

        let single = [PropertyDescriptor::new(nco::NAME_GIVEN, nco::PERSON_CONTACT, xsd::STRING)];
        let (restriction, projection) = split_chain(&single);
        assert!(restriction.is_empty());
        assert_eq!(projection.len(), 1);
    }

    #[test]
    fn test_property_function_chain_separators() {
        let chain = chain();
        let contact = Expression::iri("urn:contact");

        assert_eq!(
            property_function_chain(&chain, contact.clone(), true).to_string(),
            "nco:emailAddress(nco:hasEmailAddress(<urn:contact>), \",\", \"\\u001C\")"
        );
        assert_eq!(property_function_chain(&[], contact.clone(), true), contact);
    }

    #[test]
    fn test_is_single_valued_ignores_last_hop_unless_strict() {
        let chain = [
            PropertyDescriptor::new(nco::HAS_AFFILIATION, nco::PERSON_CONTACT, nco::AFFILIATION),
            PropertyDescriptor::new(nco::HAS_PHONE_NUMBER, nco::ROLE, nco::PHONE_NUMBER)
                .multi_valued(),
        ];
        assert!(is_single_valued(&chain, false));
        assert!(!is_single_valued(&chain, true));
    }

    #[test]
    fn test_inverse_hop_swaps_triple() {
        let property =
            PropertyDescriptor::new(nco::BELONGS_TO_GROUP, nco::CONTACT, nco::CONTACT_GROUP)
                .inverse();
        let triple = hop_triple(Expression::iri("urn:a"), &property, Expression::iri("urn:b"));
        assert_eq!(triple.subject, Expression::iri("urn:b"));
    }

    #[test]
    fn test_chain_pattern_records_ownership() {
        let schema = fixture_schema();
        let settings = Settings::default();
        let mut binder = Binder::new(&schema, &settings);

        let pattern = binder.chain_pattern(binder.contact(), &chain(), None);
        assert_eq!(pattern.group.patterns.len(), 2);
        assert!(pattern.ownership.is_some());
        assert_ne!(pattern.ownership, pattern.last);

        let empty = binder.chain_pattern(binder.contact(), &[], None);
        assert_eq!(empty.object, binder.contact());
        assert!(empty.last.is_none());
    }

    #[test]
    fn test_shared_restriction_needs_two_hops() {
        let first = FieldDefinition::new("A").with_chain(vec![
            PropertyDescriptor::new(nco::HAS_AFFILIATION, nco::PERSON_CONTACT, nco::AFFILIATION)
                .multi_valued(),
            PropertyDescriptor::new(nco::ORG, nco::AFFILIATION, nco::ORGANIZATION_CONTACT),
            PropertyDescriptor::new(nco::HAS_POSTAL_ADDRESS, nco::ROLE, nco::POSTAL_ADDRESS)
                .multi_valued(),
            PropertyDescriptor::new(nco::LOCALITY, nco::POSTAL_ADDRESS, xsd::STRING),
        ]);
        let second = FieldDefinition::new("B").with_chain(vec![
            PropertyDescriptor::new(nco::HAS_AFFILIATION, nco::PERSON_CONTACT, nco::AFFILIATION)
                .multi_valued(),
            PropertyDescriptor::new(nco::ORG, nco::AFFILIATION, nco::ORGANIZATION_CONTACT),
            PropertyDescriptor::new(nco::HAS_POSTAL_ADDRESS, nco::ROLE, nco::POSTAL_ADDRESS)
                .multi_valued(),
            PropertyDescriptor::new(nco::COUNTRY, nco::POSTAL_ADDRESS, xsd::STRING),
        ]);

        assert_eq!(shared_restriction(&[&first, &second]).map(<[_]>::len), Some(2));
        assert_eq!(shared_restriction(&[&first]).map(<[_]>::len), Some(2));
    }
}
