//! Turning result rows of a fetch query back into contacts.

use super::{Cell, Column, ColumnKind, DetailColumn, FetchQuery};
use crate::codec::{decode_cell_trimmed, split_column, split_graph, split_record, LIST_SEPARATOR};
use crate::config::Settings;
use crate::model::{Contact, Detail};
use crate::schema::{DetailDefinition, FieldDefinition, Schema};
use crate::subject::unescape_iri;
use crate::value::{Value, ValueType};
use crate::vocab::nco;
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// Graphs written by the instant messaging bridge start with this prefix.
const TELEPATHY_GRAPH_PREFIX: &str = "telepathy:";

/// Looks up the numeric id the store assigned to a resource.
///
/// Classes and named individuals are projected by id, so decoding needs the ids of the
/// resources a schema mentions.
pub trait ResourceResolver {
    /// Id of the resource `iri`, if known.
    fn resource_id(&self, iri: &str) -> Option<u32>;
}

/// A [`ResourceResolver`] over ids fetched up front.
#[derive(Debug, Clone, Default)]
pub struct ResourceCache {
    ids: HashMap<String, u32>,
}

impl ResourceCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Remember the id of `iri`.
    pub fn insert(&mut self, iri: impl Into<String>, id: u32) {
        self.ids.insert(iri.into(), id);
    }

    /// Remember the id of `iri`, builder style.
    pub fn with(mut self, iri: impl Into<String>, id: u32) -> Self {
        self.insert(iri, id);
        self
    }

    /// Number of known resources.
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Whether no resource is known.
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

impl ResourceResolver for ResourceCache {
    fn resource_id(&self, iri: &str) -> Option<u32> {
        self.ids.get(iri).copied()
    }
}

impl<S: Into<String>> FromIterator<(S, u32)> for ResourceCache {
    fn from_iter<I: IntoIterator<Item = (S, u32)>>(iter: I) -> Self {
        Self {
            ids: iter.into_iter().map(|(iri, id)| (iri.into(), id)).collect(),
        }
    }
}

/// Row-independent state of a decode.
struct Decoder<'a> {
    schema: &'a Schema,
    settings: &'a Settings,
    resolver: &'a dyn ResourceResolver,
}

/// The identifying columns of one row.
#[derive(Default)]
struct RowHeader<'r> {
    local_id: Option<&'r str>,
    context: &'r str,
    context_label: &'r str,
}

pub(super) fn decode_rows(
    schema: &Schema,
    query: &FetchQuery,
    rows: &[Vec<String>],
    resolver: &dyn ResourceResolver,
    settings: &Settings,
) -> Vec<Contact> {
    let decoder = Decoder {
        schema,
        settings,
        resolver,
    };

    let mut contacts: Vec<Contact> = Vec::new();
    let mut slots: HashMap<u32, usize> = HashMap::new();

    for row in rows {
        if row.len() != query.columns.len() {
            log::warn!(
                "skipping row with {} columns, expected {}",
                row.len(),
                query.columns.len()
            );
            continue;
        }

        let header = row_header(&query.columns, row);

        let Some(local_id) = header.local_id.and_then(|id| id.parse::<u32>().ok()) else {
            log::warn!("skipping row with invalid local id {:?}", header.local_id);
            continue;
        };

        let slot = match slots.get(&local_id) {
            Some(slot) => *slot,
            None => {
                if query.limit.is_some_and(|limit| contacts.len() >= limit) {
                    break;
                }
                contacts.push(Contact::with_id(local_id, schema.contact_type()));
                slots.insert(local_id, contacts.len() - 1);
                contacts.len() - 1
            }
        };

        decoder.decode_row(&mut contacts[slot], &query.columns, row, &header);
    }

    contacts
}

fn row_header<'r>(columns: &[Column], row: &'r [String]) -> RowHeader<'r> {
    let mut header = RowHeader::default();

    for (column, text) in columns.iter().zip(row) {
        match column {
            Column::LocalId => header.local_id = Some(text.as_str()),
            Column::Context => header.context = text.as_str(),
            Column::ContextLabel => header.context_label = text.as_str(),
            _ => {}
        }
    }

    header
}

/// `"work"` becomes `"Work"`.
fn context_name(label: &str) -> String {
    let mut chars = label.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}

fn parse_ids(text: &str) -> impl Iterator<Item = u32> + '_ {
    text.split(LIST_SEPARATOR)
        .filter(|id| !id.is_empty())
        .filter_map(|id| id.parse().ok())
}

fn merge_ids(ids: &mut Vec<u32>, text: &str) {
    for id in parse_ids(text) {
        if !ids.contains(&id) {
            ids.push(id);
        }
    }
}

/// Value of a sub-type field holding `sub_types`, falling back to the default sub-types.
fn sub_type_value(field: &FieldDefinition, mut sub_types: Vec<String>) -> Option<Value> {
    if sub_types.is_empty() {
        match &field.default_value {
            Value::String(text) => sub_types.push(text.clone()),
            Value::StringList(list) => sub_types.extend(list.iter().cloned()),
            Value::Null => {}
            other => log::warn!("invalid default {other:?} for sub-type field {}", field.name),
        }
    }

    if sub_types.is_empty() {
        return None;
    }

    match field.data_type {
        ValueType::StringList => Some(Value::StringList(sub_types)),
        ValueType::String => sub_types.into_iter().next().map(Value::String),
        other => {
            log::warn!("invalid type {other:?} for sub-type field {}", field.name);
            None
        }
    }
}

impl Decoder<'_> {
    fn decode_row(&self, contact: &mut Contact, columns: &[Column], row: &[String], header: &RowHeader) {
        let context = context_name(header.context_label);
        let mut index = 0;

        while index < columns.len() {
            match &columns[index] {
                Column::Detail(column) => {
                    let start = index;
                    while index < columns.len()
                        && matches!(&columns[index], Column::Detail(other) if other.detail == column.detail)
                    {
                        index += 1;
                    }

                    let cells: Vec<(&DetailColumn, &str)> = columns[start..index]
                        .iter()
                        .zip(&row[start..index])
                        .filter_map(|(column, text)| match column {
                            Column::Detail(column) => Some((column, text.as_str())),
                            _ => None,
                        })
                        .collect();

                    let Some(definition) = self.schema.detail(&column.detail) else {
                        log::warn!("no definition for fetched detail {}", column.detail);
                        continue;
                    };

                    let details: Vec<Detail> = if definition.is_unique {
                        self.decode_unique(definition, &cells, header.context)
                            .into_iter()
                            .collect()
                    } else {
                        self.decode_multi(definition, &cells)
                    };

                    for detail in details {
                        self.save_detail(contact, definition, detail, &context);
                    }
                    continue;
                }
                Column::CustomDetails => {
                    for record in split_column(&row[index]) {
                        if let Some(detail) = decode_custom_detail(record) {
                            save_unless_known(contact, detail);
                        }
                    }
                }
                Column::Groups => merge_ids(&mut contact.groups, &row[index]),
                Column::Members => merge_ids(&mut contact.members, &row[index]),
                Column::Contact | Column::LocalId | Column::Context | Column::ContextLabel => {}
            }

            index += 1;
        }
    }

    fn decode_unique(
        &self,
        definition: &DetailDefinition,
        cells: &[(&DetailColumn, &str)],
        affiliation: &str,
    ) -> Option<Detail> {
        let mut detail = Detail::new(&definition.name);
        let mut graphs = BTreeSet::new();
        let mut detail_uri = None;

        for (column, text) in cells {
            if text.is_empty() {
                continue;
            }

            match &column.kind {
                ColumnKind::DetailUri => detail_uri = Some(unescape_iri(text)),
                ColumnKind::Field(name) => {
                    let Some(field) = definition.field(name) else {
                        continue;
                    };
                    if let Some(value) = self.fetch_field(field, text, &mut graphs) {
                        detail.set_value(name, value);
                    }
                }
                ColumnKind::Instances { .. } => {
                    log::warn!("instance column for unique detail {}", definition.name);
                }
            }
        }

        if detail.is_empty() {
            return None;
        }

        // The affiliation IRI is the context column itself.
        let on_affiliation = definition
            .resource_iri_field()
            .and_then(FieldDefinition::detail_uri_property)
            .is_some_and(|property| property.iri == nco::HAS_AFFILIATION);
        if detail_uri.is_none() && on_affiliation && !affiliation.is_empty() {
            detail_uri = Some(unescape_iri(affiliation));
        }

        detail.set_detail_uri(detail_uri);
        self.update_origin(&mut detail, &graphs);

        Some(detail)
    }

    fn decode_multi(&self, definition: &DetailDefinition, cells: &[(&DetailColumn, &str)]) -> Vec<Detail> {
        let mut details = Vec::new();
        let mut sub_typed: Vec<(String, Detail)> = Vec::new();

        for (column, text) in cells {
            let ColumnKind::Instances {
                sub_type,
                cells: layout,
            } = &column.kind
            else {
                log::warn!("unexpected column for repeatable detail {}", definition.name);
                continue;
            };

            for record in split_column(text) {
                if record.is_empty() {
                    continue;
                }

                let detail = self.decode_record(definition, layout, record);
                match sub_type {
                    None => details.push(detail),
                    Some(sub_type) => sub_typed.push((sub_type.to_text(), detail)),
                }
            }
        }

        let sub_type_field = definition
            .fields
            .iter()
            .find(|field| !field.sub_type_properties.is_empty());

        if let Some(field) = sub_type_field {
            for detail in &mut details {
                let mut sub_types: Vec<String> = Vec::new();
                for (sub_type, other) in &sub_typed {
                    if other.values() == detail.values() && !sub_types.contains(sub_type) {
                        sub_types.push(sub_type.clone());
                    }
                }

                if let Some(value) = sub_type_value(field, sub_types) {
                    detail.set_value(&field.name, value);
                }
            }
        }

        details
    }

    fn decode_record(&self, definition: &DetailDefinition, layout: &[Cell], record: &str) -> Detail {
        let texts = split_record(record);
        let mut detail = Detail::new(&definition.name);
        let mut graphs = BTreeSet::new();

        if texts.len() != layout.len() {
            log::warn!(
                "record of detail {} has {} cells, expected {}",
                definition.name,
                texts.len(),
                layout.len()
            );
        }

        for (cell, text) in layout.iter().zip(texts) {
            match cell {
                Cell::DetailUri => {
                    if !text.is_empty() {
                        detail.set_detail_uri(Some(unescape_iri(text)));
                    }
                }
                Cell::Value(name) => {
                    let Some(field) = definition.field(name) else {
                        continue;
                    };
                    if let Some(value) = self.fetch_field(field, text, &mut graphs) {
                        detail.set_value(name, value);
                    }
                }
                Cell::SubTypeClasses(name) => {
                    let Some(field) = definition.field(name) else {
                        continue;
                    };
                    if let Some(value) = self.fetch_sub_type_classes(field, text) {
                        detail.set_value(name, value);
                    }
                }
                Cell::CustomValues(name) => {
                    let Some(field) = definition.field(name) else {
                        continue;
                    };
                    let current = detail.remove_value(name);
                    if let Some(value) = fetch_custom_values(field, current, text, &mut graphs) {
                        detail.set_value(name, value);
                    }
                }
            }
        }

        self.update_origin(&mut detail, &graphs);
        detail
    }

    /// Native value of one field cell; `None` when the cell holds nothing usable.
    fn fetch_field(
        &self,
        field: &FieldDefinition,
        text: &str,
        graphs: &mut BTreeSet<String>,
    ) -> Option<Value> {
        if !field.sub_type_classes.is_empty() {
            return self.fetch_sub_type_classes(field, text);
        }

        if text.is_empty() {
            return None;
        }

        if !field.allowable_instances.is_empty() {
            return self.fetch_instances(field, text, graphs);
        }

        let multi_valued = field
            .property_chain
            .last()
            .is_some_and(|property| !property.single_valued);

        if field.data_type == ValueType::StringList
            && (multi_valued || !field.allowable_values.is_empty())
        {
            let values = strip_graphs(text, graphs);
            return (!values.is_empty()).then_some(Value::StringList(values));
        }

        let text = strip_graph(text, graphs);

        if !field.allowable_values.is_empty() {
            return Some(Value::String(text.to_string()));
        }

        match field.parse_value(text) {
            Ok(value) if value.is_empty() => None,
            Ok(value) => Some(value),
            Err(err) => {
                log::warn!("cannot read field {}: {err}", field.name);
                None
            }
        }
    }

    fn fetch_instances(
        &self,
        field: &FieldDefinition,
        text: &str,
        graphs: &mut BTreeSet<String>,
    ) -> Option<Value> {
        let ids: Vec<u32> = strip_graphs(text, graphs)
            .iter()
            .filter_map(|id| id.parse().ok())
            .collect();

        let mut values = field.allowable_instances.iter().filter(|instance| {
            self.resolver
                .resource_id(&instance.iri)
                .is_some_and(|id| ids.contains(&id))
        });

        if field.data_type == ValueType::StringList {
            let mut list: Vec<String> = values.map(|instance| instance.value.to_text()).collect();
            if list.is_empty() && !field.default_value.is_null() {
                list.push(field.default_value.to_text());
            }
            return Some(Value::StringList(list));
        }

        match values.next() {
            Some(instance) => Some(instance.value.clone()),
            None => {
                log::warn!("unknown instance id for field {}", field.name);
                (!field.default_value.is_null()).then(|| field.default_value.clone())
            }
        }
    }

    /// Sub-types of a field encoded as classes, or its default sub-types.
    fn fetch_sub_type_classes(&self, field: &FieldDefinition, text: &str) -> Option<Value> {
        let ids: Vec<u32> = parse_ids(text).collect();

        let sub_types = field
            .sub_type_classes
            .iter()
            .filter(|class| {
                self.resolver
                    .resource_id(&class.iri)
                    .is_some_and(|id| ids.contains(&id))
            })
            .map(|class| class.value.to_text())
            .collect();

        sub_type_value(field, sub_types)
    }

    /// Mark where a detail's values came from.
    ///
    /// Values from the messaging bridge link the detail to the account they came from;
    /// values from any other writer's graph make the detail read-only.
    fn update_origin(&self, detail: &mut Detail, graphs: &BTreeSet<String>) {
        for graph in graphs {
            if graph.starts_with(TELEPATHY_GRAPH_PREFIX) && detail.detail_uri() != Some(graph.as_str()) {
                detail.add_linked_detail_uri(graph);
            }

            if self.settings.is_foreign_graph(graph) {
                detail.set_read_only(true);
            }
        }
    }

    fn save_detail(
        &self,
        contact: &mut Contact,
        definition: &DetailDefinition,
        mut detail: Detail,
        context: &str,
    ) {
        if detail.is_empty() {
            return;
        }

        if definition.has_context && !context.is_empty() {
            detail.set_contexts(vec![context.to_string()]);
        }

        let resource_scheme = definition.resource_iri_scheme();
        let detail_scheme = definition.detail_uri_scheme();

        if detail_scheme != resource_scheme {
            let rescheme = detail
                .detail_uri()
                .and_then(|uri| Some((uri.to_string(), resource_scheme.parse_iri(uri)?)))
                .and_then(|(uri, value)| Some((uri, detail_scheme.make_iri(&[value])?)));

            if let Some((resource_uri, detail_uri)) = rescheme {
                detail.set_linked_detail_uris(vec![resource_uri]);
                detail.set_detail_uri(Some(unescape_iri(&detail_uri)));
            }
        }

        if definition.is_unique && !definition.has_context {
            if let Some(existing) = contact
                .details
                .iter_mut()
                .find(|existing| existing.definition_name() == definition.name)
            {
                *existing = detail;
                return;
            }
        }

        save_unless_known(contact, detail);
    }
}

/// Add `detail` unless an equal one was read from an earlier row.
fn save_unless_known(contact: &mut Contact, detail: Detail) {
    if !contact.details.contains(&detail) {
        contact.details.push(detail);
    }
}

fn strip_graph<'t>(text: &'t str, graphs: &mut BTreeSet<String>) -> &'t str {
    let (value, graph) = split_graph(text);
    if let Some(graph) = graph.filter(|graph| !graph.is_empty()) {
        graphs.insert(graph.to_string());
    }
    value
}

fn strip_graphs(text: &str, graphs: &mut BTreeSet<String>) -> Vec<String> {
    decode_cell_trimmed(text)
        .into_iter()
        .map(|tagged| {
            if let Some(graph) = tagged.graph.filter(|graph| !graph.is_empty()) {
                graphs.insert(graph);
            }
            tagged.value
        })
        .collect()
}

/// Merge the values stored outside a field's closed list into `current`.
fn fetch_custom_values(
    field: &FieldDefinition,
    current: Option<Value>,
    text: &str,
    graphs: &mut BTreeSet<String>,
) -> Option<Value> {
    let custom = strip_graphs(text, graphs);

    match field.data_type {
        ValueType::StringList => {
            let mut values = current.map(|value| value.to_string_list()).unwrap_or_default();
            values.extend(custom);
            (!values.is_empty()).then_some(Value::StringList(values))
        }
        ValueType::String => custom.into_iter().next().map(Value::String).or(current),
        other => {
            log::warn!("custom values of {other:?} field {} are not supported", field.name);
            current
        }
    }
}

/// Decode `name FS field FS id:value LS id:value ... FS field FS ...`.
///
/// Values are ordered by the id of the resource holding them, which is their insertion
/// order.
fn decode_custom_detail(record: &str) -> Option<Detail> {
    let mut tokens = split_record(record).into_iter();
    let name = tokens.next().filter(|name| !name.is_empty())?;

    let mut fields: BTreeMap<&str, BTreeMap<u32, &str>> = BTreeMap::new();

    while let (Some(field), Some(values)) = (tokens.next(), tokens.next()) {
        let ordered = fields.entry(field).or_default();
        for item in values.split(LIST_SEPARATOR).filter(|item| !item.is_empty()) {
            let (id, value) = item.split_once(':').unwrap_or(("0", item));
            ordered.insert(id.parse().unwrap_or_default(), value);
        }
    }

    let mut detail = Detail::new(name);

    for (field, ordered) in fields {
        let mut values: Vec<String> = ordered.into_values().map(str::to_string).collect();
        let value = match values.len() {
            0 => continue,
            1 => Value::String(values.remove(0)),
            _ => Value::StringList(values),
        };
        detail.set_value(field, value);
    }

    (!detail.is_empty()).then_some(detail)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{DETAIL_SEPARATOR, FIELD_SEPARATOR, GRAPH_SEPARATOR};
    use crate::config::{DEFAULT_GRAPH_IRI, TELEPATHY_GRAPH_IRI};
    use crate::fetch::tests::fixture_schema;
    use crate::sparql::Select;

    fn query(columns: Vec<Column>) -> FetchQuery {
        let mut all = vec![
            Column::Contact,
            Column::LocalId,
            Column::Context,
            Column::ContextLabel,
        ];
        all.extend(columns);

        FetchQuery {
            select: Select::new(),
            columns: all,
            sorted: true,
            limit: None,
        }
    }

    fn column(detail: &str, kind: ColumnKind) -> Column {
        Column::Detail(DetailColumn {
            detail: detail.to_string(),
            kind,
        })
    }

    fn row(cells: &[&str]) -> Vec<String> {
        cells.iter().map(|cell| cell.to_string()).collect()
    }

    fn resolver() -> ResourceCache {
        [
            (nco::CELL_PHONE_NUMBER, 10),
            (nco::FAX_NUMBER, 11),
            (nco::VOICE_PHONE_NUMBER, 12),
            (nco::GENDER_MALE, 20),
            (nco::GENDER_FEMALE, 21),
        ]
        .into_iter()
        .collect()
    }

    fn decode(query: &FetchQuery, rows: &[Vec<String>]) -> Vec<Contact> {
        query.decode(&fixture_schema(), rows, &resolver(), &Settings::default())
    }

    #[test]
    fn test_context_name() {
        assert_eq!(context_name("work"), "Work");
        assert_eq!(context_name("HOME"), "Home");
        assert_eq!(context_name(""), "");
    }

    #[test]
    fn test_unique_detail_is_read_once_per_contact() {
        let query = query(vec![
            column("Name", ColumnKind::Field("FirstName".into())),
            column("Name", ColumnKind::Field("LastName".into())),
        ]);
        let first = format!("Ada{GRAPH_SEPARATOR}{DEFAULT_GRAPH_IRI}");
        let rows = vec![
            row(&["urn:c1", "1", "", "", &first, "Lovelace"]),
            row(&["urn:c1", "1", "urn:a1", "work", &first, "Lovelace"]),
            row(&["urn:c2", "2", "", "", "", ""]),
        ];

        let contacts = decode(&query, &rows);

        assert_eq!(contacts.len(), 2);
        assert_eq!(contacts[0].local_id, 1);
        assert_eq!(contacts[0].details.len(), 1);

        let name = contacts[0].detail("Name").unwrap();
        assert_eq!(name.value("FirstName"), Some(&Value::from("Ada")));
        assert_eq!(name.value("LastName"), Some(&Value::from("Lovelace")));
        assert!(!name.is_read_only());
        assert!(contacts[1].details.is_empty());
    }

    #[test]
    fn test_foreign_graph_makes_detail_read_only() {
        let query = query(vec![column("Name", ColumnKind::Field("FirstName".into()))]);
        let first = format!("Ada{GRAPH_SEPARATOR}{TELEPATHY_GRAPH_IRI}");
        let contacts = decode(&query, &[row(&["urn:c1", "1", "", "", &first])]);

        assert!(contacts[0].detail("Name").unwrap().is_read_only());
    }

    #[test]
    fn test_repeatable_detail_records() {
        let query = query(vec![column(
            "PhoneNumber",
            ColumnKind::Instances {
                sub_type: None,
                cells: vec![
                    Cell::DetailUri,
                    Cell::Value("PhoneNumber".into()),
                    Cell::SubTypeClasses("SubTypes".into()),
                    Cell::CustomValues("SubTypes".into()),
                ],
            },
        )]);

        let first = [
            "tel:%2B123",
            format!("+123{GRAPH_SEPARATOR}telepathy:/account/1").as_str(),
            "10\u{1d}11",
            "Satellite",
        ]
        .join(&FIELD_SEPARATOR.to_string());
        let second = ["tel:456", "456", "", ""].join(&FIELD_SEPARATOR.to_string());
        let cell = format!("{first}{DETAIL_SEPARATOR}{second}");

        let contacts = decode(&query, &[row(&["urn:c1", "1", "urn:a1", "work", &cell])]);
        let phones: Vec<&Detail> = contacts[0].details_named("PhoneNumber").collect();

        assert_eq!(phones.len(), 2);
        assert_eq!(phones[0].detail_uri(), Some("tel:+123"));
        assert_eq!(phones[0].value("PhoneNumber"), Some(&Value::from("+123")));
        assert_eq!(
            phones[0].value("SubTypes"),
            Some(&Value::from(vec!["Mobile", "Fax", "Satellite"]))
        );
        assert_eq!(phones[0].linked_detail_uris(), ["telepathy:/account/1"]);
        assert!(phones[0].is_read_only());
        assert_eq!(phones[0].contexts(), ["Work"]);

        // No known class: the default sub-type applies.
        assert_eq!(phones[1].value("SubTypes"), Some(&Value::from(vec!["Voice"])));
    }

    #[test]
    fn test_property_sub_types_are_unified() {
        let url = |sub_type: Option<&str>| {
            column(
                "Url",
                ColumnKind::Instances {
                    sub_type: sub_type.map(Value::from),
                    cells: vec![Cell::Value("Url".into())],
                },
            )
        };
        let query = query(vec![url(None), url(Some("HomePage")), url(Some("Blog"))]);
        let all = format!("http://a.example{DETAIL_SEPARATOR}http://b.example");

        let contacts = decode(
            &query,
            &[row(&["urn:c1", "1", "", "", &all, "http://a.example", ""])],
        );
        let urls: Vec<&Detail> = contacts[0].details_named("Url").collect();

        assert_eq!(urls.len(), 2);
        assert_eq!(urls[0].value("SubType"), Some(&Value::from("HomePage")));
        assert_eq!(urls[1].value("SubType"), Some(&Value::from("Favourite")));
    }

    #[test]
    fn test_instances_resolve_through_ids() {
        let query = query(vec![column("Gender", ColumnKind::Field("Gender".into()))]);
        let contacts = decode(&query, &[row(&["urn:c1", "1", "", "", "21"])]);
        assert_eq!(
            contacts[0].detail("Gender").unwrap().value("Gender"),
            Some(&Value::from("Female"))
        );
    }

    #[test]
    fn test_custom_details_and_relationships() {
        let query = {
            let mut query = query(Vec::new());
            query.columns.extend([Column::CustomDetails, Column::Groups]);
            query
        };

        let custom = format!(
            "Hobby{FIELD_SEPARATOR}Kind{FIELD_SEPARATOR}7:chess\u{1d}5:go{FIELD_SEPARATOR}Level{FIELD_SEPARATOR}9:high"
        );
        let contacts = decode(
            &query,
            &[row(&["urn:c1", "1", "", "", &custom, "4\u{1d}8\u{1d}4"])],
        );

        let hobby = contacts[0].detail("Hobby").unwrap();
        assert_eq!(hobby.value("Kind"), Some(&Value::from(vec!["go", "chess"])));
        assert_eq!(hobby.value("Level"), Some(&Value::from("high")));
        assert_eq!(contacts[0].groups, vec![4, 8]);
    }

    #[test]
    fn test_limit_and_invalid_rows() {
        let mut query = query(Vec::new());
        query.limit = Some(1);

        let rows = vec![
            row(&["urn:c0", "x", "", ""]),
            row(&["urn:c1", "1", "", ""]),
            row(&["urn:c1", "1", "urn:a", "home"]),
            row(&["urn:c2", "2", "", ""]),
            row(&["short"]),
        ];

        let contacts = decode(&query, &rows);
        assert_eq!(contacts.len(), 1);
        assert_eq!(contacts[0].local_id, 1);
    }

    #[test]
    fn test_resource_cache() {
        let cache = ResourceCache::new().with("urn:a", 1);
        assert_eq!(cache.resource_id("urn:a"), Some(1));
        assert_eq!(cache.resource_id("urn:b"), None);
        assert_eq!(cache.len(), 1);
        assert!(!cache.is_empty());
    }
}
