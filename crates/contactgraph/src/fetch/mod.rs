//! Read-path compiler.
//!
//! A [`FetchRequest`] compiles into one [`Select`] returning a row per contact and context.
//! The first four columns identify the contact and the affiliation the row was joined
//! with; every detail then contributes one or more scalar columns encoded as described in
//! [`crate::codec`]. The [`FetchQuery`] keeps a [`Column`] plan next to the query so that
//! [`FetchQuery::decode`] can turn result rows back into [`Contact`]s.
//!
//! ```text
//! FetchRequest ──▶ hints ──▶ base query ──▶ detail columns ──▶ filter ──▶ sort
//!                                                 │
//!                           rows ◀── store ◀── FetchQuery (select + column plan)
//!                            │
//!                            └──▶ decode ──▶ Vec<Contact>
//! ```

mod decode;
mod fields;
mod filter;
mod sort;

pub use decode::{ResourceCache, ResourceResolver};
pub use filter::canonicalize;

use crate::codec::{DETAIL_SEPARATOR, FIELD_SEPARATOR, LIST_SEPARATOR};
use crate::config::Settings;
use crate::error::{CompileError, Result};
use crate::model::{Contact, ContactType};
use crate::request::{FetchHint, Filter, SortOrder};
use crate::schema::{DetailDefinition, Schema};
use crate::sparql::{Expression, Function, OrderDirection, Select, Variable, VariablePool};
use crate::value::Value;
use crate::vocab::{nao, nco, rdf, rdfs};
use std::collections::BTreeSet;

/// What to fetch.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FetchRequest {
    /// Contacts to return
    pub filter: Filter,
    /// Sort keys, most significant first
    pub sorting: Vec<SortOrder>,
    /// Details and relationships to return
    pub hint: FetchHint,
    /// Largest number of contacts returned
    pub limit: Option<usize>,
}

impl FetchRequest {
    /// Fetch every detail of every contact.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the filter.
    pub fn with_filter(mut self, filter: Filter) -> Self {
        self.filter = filter;
        self
    }

    /// Append a sort key.
    pub fn sort_by(mut self, order: SortOrder) -> Self {
        self.sorting.push(order);
        self
    }

    /// Set the fetch hint.
    pub fn with_hint(mut self, hint: FetchHint) -> Self {
        self.hint = hint;
        self
    }

    /// Limit the number of contacts.
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// One field of a repeatable detail record, in the order the record holds them.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    /// IRI of the detail's resource
    DetailUri,
    /// Value of a field
    Value(String),
    /// Tracker ids of the classes encoding a field's sub-types
    SubTypeClasses(String),
    /// Values of a field stored outside its closed list
    CustomValues(String),
}

/// What a detail column holds.
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnKind {
    /// One field of a unique detail
    Field(String),
    /// IRI of a unique detail's resource
    DetailUri,
    /// Every instance of a repeatable detail reached through one leading property
    Instances {
        /// Sub-type selected by the leading property, `None` for the base column
        sub_type: Option<Value>,
        /// Cells of each record
        cells: Vec<Cell>,
    },
}

/// A column bound to a detail.
#[derive(Debug, Clone, PartialEq)]
pub struct DetailColumn {
    /// Detail definition name
    pub detail: String,
    /// Content of the column
    pub kind: ColumnKind,
}

/// Meaning of one projected column of a fetch query.
#[derive(Debug, Clone, PartialEq)]
pub enum Column {
    /// Contact IRI
    Contact,
    /// Numeric id of the contact
    LocalId,
    /// IRI of the affiliation joined with the row
    Context,
    /// Label of that affiliation
    ContextLabel,
    /// Detail values
    Detail(DetailColumn),
    /// Details without schema, stored as `nao:Property` resources
    CustomDetails,
    /// Ids of the groups the contact belongs to
    Groups,
    /// Ids of the members of a group
    Members,
}

impl Column {
    fn detail(detail: &DetailDefinition, kind: ColumnKind) -> Self {
        Column::Detail(DetailColumn {
            detail: detail.name.clone(),
            kind,
        })
    }
}

/// A compiled fetch.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchQuery {
    /// The query
    pub select: Select,
    /// Meaning of each projected column
    pub columns: Vec<Column>,
    /// Whether the query sorts natively; otherwise the caller sorts
    pub sorted: bool,
    /// Largest number of contacts decoded
    pub limit: Option<usize>,
}

impl FetchQuery {
    /// Query text.
    pub fn to_sparql(&self) -> String {
        self.select.to_string()
    }

    /// Decode result rows into contacts, in the order they first appear.
    pub fn decode(
        &self,
        schema: &Schema,
        rows: &[Vec<String>],
        resolver: &dyn ResourceResolver,
        settings: &Settings,
    ) -> Vec<Contact> {
        decode::decode_rows(schema, self, rows, resolver, settings)
    }
}

/// Query-wide state of one compilation.
pub(crate) struct Binder<'s> {
    pub(crate) schema: &'s Schema,
    pub(crate) settings: &'s Settings,
    pub(crate) pool: VariablePool,
    pub(crate) contact: Variable,
    pub(crate) context: Variable,
}

impl<'s> Binder<'s> {
    pub(crate) fn new(schema: &'s Schema, settings: &'s Settings) -> Self {
        Self::with_pool(schema, settings, VariablePool::new())
    }

    /// Bind with variables continuing `pool`, so several schemas can share one query.
    pub(crate) fn with_pool(schema: &'s Schema, settings: &'s Settings, pool: VariablePool) -> Self {
        Self {
            schema,
            settings,
            pool,
            contact: Variable::new("contact"),
            context: Variable::new("context"),
        }
    }

    pub(crate) fn into_pool(self) -> VariablePool {
        self.pool
    }

    pub(crate) fn contact(&self) -> Expression {
        Expression::from(&self.contact)
    }

    pub(crate) fn context(&self) -> Expression {
        Expression::from(&self.context)
    }

    /// Contact IRI, id, affiliation and its label over the contacts of this schema.
    fn base_query(&self) -> Select {
        let mut select = Select::new();

        select
            .project(self.contact())
            .project(Expression::tracker_id(self.contact()))
            .project(self.context())
            .project(Expression::property(rdfs::LABEL, self.context()));

        for class in self.schema.contact_class_iris() {
            select.triple(self.contact(), rdf::TYPE, Expression::iri(class));
        }

        let mut affiliation = crate::sparql::Group::new();
        affiliation.triple(self.contact(), nco::HAS_AFFILIATION, self.context());
        select.restrict(crate::sparql::Pattern::Optional(affiliation));

        select
    }

    /// Column listing every custom detail, optionally only those named in `names`.
    fn custom_details(&self, names: &BTreeSet<String>) -> Expression {
        let detail = Variable::new("customDetail");
        let field = Variable::new("customField");
        let value = Variable::new("value");

        let mut values = Select::new();
        values
            .project(Expression::group_concat(
                Expression::concat(vec![
                    Expression::tracker_id(Expression::from(&field)),
                    Expression::string(":"),
                    Expression::from(&value),
                ]),
                LIST_SEPARATOR,
            ))
            .triple(&field, nao::PROPERTY_VALUE, &value);

        let mut fields = Select::new();
        fields
            .project(Expression::group_concat(
                Expression::concat(vec![
                    Expression::property(nao::PROPERTY_NAME, Expression::from(&field)),
                    Expression::separator(FIELD_SEPARATOR),
                    values.into(),
                ]),
                FIELD_SEPARATOR,
            ))
            .triple(&detail, nao::HAS_PROPERTY, &field);

        let detail_name = Expression::property(nao::PROPERTY_NAME, Expression::from(&detail));

        let mut details = Select::new();
        details
            .project(Expression::group_concat(
                Expression::concat(vec![
                    detail_name.clone(),
                    Expression::separator(FIELD_SEPARATOR),
                    fields.into(),
                ]),
                DETAIL_SEPARATOR,
            ))
            .triple(self.contact(), nao::HAS_PROPERTY, &detail);

        if !names.is_empty() {
            details.filter(Expression::is_in(
                detail_name,
                names.iter().map(Expression::string).collect(),
            ));
        }

        details.into()
    }

    /// Ids of the resources linked to the contact by `nco:belongsToGroup`.
    ///
    /// With `members` set the contact is the group and the members are listed.
    fn group_links(&mut self, members: bool) -> Expression {
        let other = self.pool.fresh();
        let mut select = Select::new();

        select.project(Expression::group_concat(
            Expression::tracker_id(Expression::from(&other)),
            LIST_SEPARATOR,
        ));

        if members {
            select.triple(&other, nco::BELONGS_TO_GROUP, self.contact());
        } else {
            select.triple(self.contact(), nco::BELONGS_TO_GROUP, &other);
        }

        select.into()
    }
}

/// Details a fetch binds, resolved from the hint and the sort keys.
#[derive(Debug, Default)]
struct DetailHints {
    fetch_all: bool,
    details: BTreeSet<String>,
    custom: BTreeSet<String>,
}

impl DetailHints {
    fn new(schema: &Schema, request: &FetchRequest) -> Self {
        if request.hint.fetches_all() {
            return Self {
                fetch_all: true,
                ..Default::default()
            };
        }

        let mut hints = Self::default();

        for name in &request.hint.details {
            hints.add(schema, name, true);
        }

        for order in &request.sorting {
            hints.add(schema, &order.detail, false);
        }

        log::trace!(
            "fetch hints: details {:?}, custom {:?}",
            hints.details,
            hints.custom
        );

        hints
    }

    fn add(&mut self, schema: &Schema, name: &str, with_dependencies: bool) {
        match schema.detail(name) {
            Some(detail) => {
                self.details.insert(detail.name.clone());
                if with_dependencies {
                    self.details.extend(detail.dependencies.iter().cloned());
                }
            }
            None if !Schema::is_synthetic_detail(name) => {
                self.custom.insert(name.to_string());
            }
            None => {}
        }
    }

    fn wants(&self, name: &str) -> bool {
        self.fetch_all || self.details.contains(name)
    }

    fn wants_custom_details(&self) -> bool {
        self.fetch_all || !self.custom.is_empty()
    }
}

/// Compile a fetch of the contacts described by `schema`.
///
/// Fails when a requested detail or the filter uses a construct the compiler cannot
/// express, or when a sort order is malformed. Well-formed sort orders the compiler cannot
/// express leave the query unsorted and [`FetchQuery::sorted`] unset; the limit is then
/// applied while decoding.
///
/// # Examples
///
/// ```
/// use contactgraph::fetch::{compile_fetch, FetchRequest};
/// use contactgraph::model::ContactType;
/// use contactgraph::schema::Schema;
/// use contactgraph::vocab::nco;
/// use contactgraph::Settings;
///
/// let schema = Schema::new(ContactType::Person, [nco::PERSON_CONTACT]);
/// let query = compile_fetch(&schema, &FetchRequest::new(), &Settings::default()).unwrap();
///
/// assert!(query.to_sparql().starts_with("SELECT ?contact"));
/// ```
pub fn compile_fetch(
    schema: &Schema,
    request: &FetchRequest,
    settings: &Settings,
) -> Result<FetchQuery> {
    let mut binder = Binder::new(schema, settings);
    let hints = DetailHints::new(schema, request);

    let mut select = binder.base_query();
    let mut columns = vec![
        Column::Contact,
        Column::LocalId,
        Column::Context,
        Column::ContextLabel,
    ];

    for detail in schema.details().values() {
        if detail.is_synthesized() || !hints.wants(&detail.name) {
            continue;
        }

        if detail.fields.is_empty() {
            log::debug!("detail {} has no fields, skipping", detail.name);
            continue;
        }

        if detail.is_unique {
            binder.bind_unique_detail(detail, &mut select, &mut columns)?;
        } else {
            binder.bind_multi_detail(detail, &mut select, &mut columns)?;
        }
    }

    if let Some(filter) = binder.bind_filter(&canonicalize(request.filter.clone()))? {
        select.filter(filter);
    }

    let sorted = match binder.bind_sort_orders(&request.sorting) {
        Ok(conditions) => {
            select.order_by.extend(conditions);
            true
        }
        Err(err) if err.is_not_supported() => {
            log::debug!("sorting left to the caller: {err}");
            false
        }
        Err(err) => return Err(err),
    };

    if hints.wants_custom_details() {
        select.project(binder.custom_details(&hints.custom));
        columns.push(Column::CustomDetails);
    }

    if !request.hint.no_relationships {
        let groups = binder.group_links(false);
        select.project(groups);
        columns.push(Column::Groups);

        if schema.contact_type() == ContactType::Group {
            let members = binder.group_links(true);
            select.project(members);
            columns.push(Column::Members);
        }
    }

    log::trace!("compiled fetch of {} contacts:\n{}", schema.contact_type(), select);

    Ok(FetchQuery {
        select,
        columns,
        sorted,
        limit: request.limit,
    })
}

/// Compile a query returning the ids of the contacts matching `request` over several
/// schemas, sorted and limited natively.
///
/// The details of the request's hint are ignored. Sort orders that cannot be expressed
/// fail with [`CompileError::NotSupported`], so the caller can sort the ids itself. Sort
/// keys of two schemas are fused per row; more schemas cannot be sorted.
pub fn compile_contact_ids(
    schemas: &[&Schema],
    request: &FetchRequest,
    settings: &Settings,
) -> Result<Select> {
    let Some(first) = schemas.first() else {
        return Err(CompileError::bad_argument("no schema to fetch contact ids from"));
    };

    let contact = Variable::new("contact");
    let filter = canonicalize(request.filter.clone());
    let mut pool = VariablePool::new();
    let mut branches = Vec::with_capacity(schemas.len());
    let mut comparators = Vec::with_capacity(schemas.len());

    for schema in schemas {
        let mut binder = Binder::with_pool(schema, settings, pool);
        let mut branch = crate::sparql::Group::new();

        for class in schema.contact_class_iris() {
            branch.triple(binder.contact(), rdf::TYPE, Expression::iri(class));
        }

        if let Some(expression) = binder.bind_filter(&filter)? {
            branch.filter(expression);
        }

        if !request.sorting.is_empty() {
            comparators.push(binder.bind_sort_orders(&request.sorting)?);
        }

        branches.push(branch);
        pool = binder.into_pool();
    }

    let mut select = Select::new();
    select.project(Expression::tracker_id(Expression::from(&contact)));

    if branches.len() == 1 {
        if let Some(branch) = branches.pop() {
            select.restrict_group(branch);
        }
    } else {
        select.restrict(crate::sparql::Pattern::Union(branches));
    }

    match comparators.len() {
        0 => {}
        1 => {
            if let Some(conditions) = comparators.pop() {
                select.order_by.extend(conditions);
            }
        }
        2 => {
            let (first_keys, second_keys) = (&comparators[0], &comparators[1]);
            if first_keys.len() != second_keys.len() {
                return Err(CompileError::not_supported(
                    "sort keys differ between contact types",
                ));
            }

            let mut is_first = crate::sparql::Group::new();
            for class in first.contact_class_iris() {
                is_first.triple(Expression::from(&contact), rdf::TYPE, Expression::iri(class));
            }

            for (a, b) in first_keys.iter().zip(second_keys) {
                let mut choice = Select::new();
                choice.project(Expression::call(
                    Function::If,
                    vec![
                        Expression::exists(is_first.clone()),
                        a.expression.clone(),
                        b.expression.clone(),
                    ],
                ));
                select.order_by(choice.into(), a.direction);
            }
        }
        _ => {
            return Err(CompileError::not_supported(
                "sorting more than two contact types",
            ))
        }
    }

    if let Some(limit) = request.limit {
        select.limit(limit);
    }

    log::trace!("compiled contact id query:\n{select}");

    Ok(select)
}

/// Default direction of a sort key.
pub(crate) fn order_direction(order: &SortOrder) -> OrderDirection {
    match order.direction {
        crate::request::SortDirection::Ascending => OrderDirection::Ascending,
        crate::request::SortDirection::Descending => OrderDirection::Descending,
    }
}
