//! Abstract syntax for the SPARQL subset emitted by the compilers.
//!
//! The compilers assemble [`Select`] and [`Update`] values; [`render`] turns them into query
//! text. Variables are plain names: named ones like `?contact` are shared across a query,
//! fresh ones come from a per-compilation [`VariablePool`] so nested sub-selects never
//! capture each other's variables.

pub mod render;

use crate::schema::STORED_LIST_SEPARATOR;
use crate::value::Value;
use chrono::{DateTime, FixedOffset};

/// A query variable, rendered as `?name`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Variable(String);

impl Variable {
    /// Create a named variable.
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Variable name without the leading `?`.
    pub fn name(&self) -> &str {
        &self.0
    }
}

/// Source of fresh variables for one compilation.
#[derive(Debug, Default)]
pub struct VariablePool {
    next: usize,
}

impl VariablePool {
    /// Create an empty pool.
    pub fn new() -> Self {
        Self::default()
    }

    /// A variable not handed out before by this pool.
    pub fn fresh(&mut self) -> Variable {
        self.next += 1;
        Variable(format!("_{}", self.next))
    }
}

/// A literal constant.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    /// String literal
    String(String),
    /// Integer literal
    Int(i64),
    /// Double literal
    Double(f64),
    /// Boolean literal
    Bool(bool),
    /// `xsd:dateTime` literal
    DateTime(DateTime<FixedOffset>),
}

/// Built-in functions used in projections and filters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Function {
    /// `concat(..)`
    Concat,
    /// `tracker:coalesce(..)`
    Coalesce,
    /// `GROUP_CONCAT(value, separator)`
    GroupConcat,
    /// `tracker:id(resource)`
    TrackerId,
    /// `fn:lower-case(text)`
    LowerCase,
    /// `fn:contains(text, pattern)`
    Contains,
    /// `fn:starts-with(text, pattern)`
    StartsWith,
    /// `fn:ends-with(text, pattern)`
    EndsWith,
    /// `fn:timezone-from-dateTime(timestamp)`
    TimezoneFromDateTime,
    /// `IF(condition, then, else)`
    If,
}

/// Comparison operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    /// `=`
    Equal,
    /// `<`
    Less,
    /// `<=`
    LessOrEqual,
    /// `>=`
    GreaterOrEqual,
}

/// Expression in projections, filters and triple positions.
#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    /// A variable
    Variable(Variable),
    /// A resource IRI
    Iri(String),
    /// Blank node of an update template, rendered as `_:label`
    Blank(String),
    /// A literal constant
    Literal(Literal),
    /// Application of a built-in function
    Call {
        /// Function applied
        function: Function,
        /// Arguments in order
        args: Vec<Expression>,
    },
    /// Property function: the values of `iri` on `subject`.
    ///
    /// Several values are joined by `value_separator`; with a `graph_separator` each value
    /// is followed by that separator and the IRI of the graph holding it.
    Property {
        /// Predicate IRI
        iri: String,
        /// Resource the property is read from
        subject: Box<Expression>,
        /// Separator between several values
        value_separator: Option<char>,
        /// Separator between a value and its graph
        graph_separator: Option<char>,
    },
    /// Binary comparison
    Compare {
        /// Operator
        op: CompareOp,
        /// Left operand
        left: Box<Expression>,
        /// Right operand
        right: Box<Expression>,
    },
    /// Conjunction; empty is `true`
    And(Vec<Expression>),
    /// Disjunction; empty is `false`
    Or(Vec<Expression>),
    /// Negation
    Not(Box<Expression>),
    /// Membership test
    In {
        /// Tested value
        value: Box<Expression>,
        /// Candidates
        list: Vec<Expression>,
    },
    /// `EXISTS { .. }`
    Exists(Box<Group>),
    /// Scalar sub-select
    Select(Box<Select>),
}

impl From<Variable> for Expression {
    fn from(variable: Variable) -> Self {
        Expression::Variable(variable)
    }
}

impl From<&Variable> for Expression {
    fn from(variable: &Variable) -> Self {
        Expression::Variable(variable.clone())
    }
}

impl From<Select> for Expression {
    fn from(select: Select) -> Self {
        Expression::Select(Box::new(select))
    }
}

impl Expression {
    /// Resource IRI.
    pub fn iri(iri: impl Into<String>) -> Self {
        Expression::Iri(iri.into())
    }

    /// Blank node `_:label`.
    pub fn blank(label: impl Into<String>) -> Self {
        Expression::Blank(label.into())
    }

    /// String literal.
    pub fn string(text: impl Into<String>) -> Self {
        Expression::Literal(Literal::String(text.into()))
    }

    /// String literal made of one separator character.
    pub fn separator(separator: char) -> Self {
        Expression::string(separator.to_string())
    }

    /// Boolean literal.
    pub fn boolean(value: bool) -> Self {
        Expression::Literal(Literal::Bool(value))
    }

    /// Integer literal.
    pub fn int(value: i64) -> Self {
        Expression::Literal(Literal::Int(value))
    }

    /// Literal or IRI for a field value.
    pub fn value(value: &Value) -> Self {
        match value {
            Value::String(s) => Expression::string(s.clone()),
            Value::StringList(list) => {
                Expression::string(list.join(&STORED_LIST_SEPARATOR.to_string()))
            }
            Value::Int(i) => Expression::int(*i),
            Value::Double(d) => Expression::Literal(Literal::Double(*d)),
            Value::Bool(b) => Expression::boolean(*b),
            Value::DateTime(dt) => Expression::Literal(Literal::DateTime(*dt)),
            Value::Url(url) => Expression::iri(url.clone()),
            Value::Null => Expression::string(""),
        }
    }

    /// Apply `function` to `args`.
    pub fn call(function: Function, args: Vec<Expression>) -> Self {
        Expression::Call { function, args }
    }

    /// `concat(..)` of `args`.
    pub fn concat(args: Vec<Expression>) -> Self {
        Expression::call(Function::Concat, args)
    }

    /// `tracker:coalesce(value, fallback)`.
    pub fn coalesce(value: Expression, fallback: Expression) -> Self {
        Expression::call(Function::Coalesce, vec![value, fallback])
    }

    /// `tracker:coalesce(value, "")`.
    pub fn or_empty(value: Expression) -> Self {
        Expression::coalesce(value, Expression::string(""))
    }

    /// `GROUP_CONCAT(value, separator)`.
    pub fn group_concat(value: Expression, separator: char) -> Self {
        Expression::call(
            Function::GroupConcat,
            vec![value, Expression::separator(separator)],
        )
    }

    /// `tracker:id(resource)`.
    pub fn tracker_id(resource: Expression) -> Self {
        Expression::call(Function::TrackerId, vec![resource])
    }

    /// Property function `iri(subject)`.
    pub fn property(iri: impl Into<String>, subject: Expression) -> Self {
        Expression::Property {
            iri: iri.into(),
            subject: Box::new(subject),
            value_separator: None,
            graph_separator: None,
        }
    }

    /// Set the separators of a property function. Other expressions are returned as they are.
    pub fn with_separators(self, value: Option<char>, graph: Option<char>) -> Self {
        match self {
            Expression::Property {
                iri,
                subject,
                value_separator,
                graph_separator,
            } => Expression::Property {
                iri,
                subject,
                value_separator: value.or(value_separator),
                graph_separator: graph.or(graph_separator),
            },
            other => other,
        }
    }

    /// Comparison `left op right`.
    pub fn compare(op: CompareOp, left: Expression, right: Expression) -> Self {
        Expression::Compare {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    /// `left = right`.
    pub fn equal(left: Expression, right: Expression) -> Self {
        Expression::compare(CompareOp::Equal, left, right)
    }

    /// `!operand`.
    pub fn not(operand: Expression) -> Self {
        Expression::Not(Box::new(operand))
    }

    /// `value IN (list)`.
    pub fn is_in(value: Expression, list: Vec<Expression>) -> Self {
        Expression::In {
            value: Box::new(value),
            list,
        }
    }

    /// `EXISTS { group }`.
    pub fn exists(group: Group) -> Self {
        Expression::Exists(Box::new(group))
    }

    /// Whether this is the variable `variable`.
    pub fn is_variable(&self, variable: &Variable) -> bool {
        matches!(self, Expression::Variable(v) if v == variable)
    }
}

/// A triple pattern or template triple.
#[derive(Debug, Clone, PartialEq)]
pub struct Triple {
    /// Subject
    pub subject: Expression,
    /// Predicate
    pub predicate: Expression,
    /// Object
    pub object: Expression,
}

impl Triple {
    /// Create a triple.
    pub fn new(
        subject: impl Into<Expression>,
        predicate: impl Into<String>,
        object: impl Into<Expression>,
    ) -> Self {
        Self {
            subject: subject.into(),
            predicate: Expression::Iri(predicate.into()),
            object: object.into(),
        }
    }

    /// Create a triple whose predicate is a variable.
    pub fn with_predicate(
        subject: impl Into<Expression>,
        predicate: impl Into<Expression>,
        object: impl Into<Expression>,
    ) -> Self {
        Self {
            subject: subject.into(),
            predicate: predicate.into(),
            object: object.into(),
        }
    }
}

/// Element of a group graph pattern.
#[derive(Debug, Clone, PartialEq)]
pub enum Pattern {
    /// A triple pattern
    Triple(Triple),
    /// A nested group
    Group(Group),
    /// `OPTIONAL { .. }`
    Optional(Group),
    /// `{ .. } UNION { .. }`
    Union(Vec<Group>),
    /// `GRAPH graph { .. }`
    Graph {
        /// Graph IRI or variable
        graph: Expression,
        /// Patterns inside the graph
        group: Group,
    },
    /// `{ SELECT .. }` joined into the group
    SubSelect(Box<Select>),
}

/// A group graph pattern with its filters.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Group {
    /// Patterns in order
    pub patterns: Vec<Pattern>,
    /// Filter expressions, all of which must hold
    pub filters: Vec<Expression>,
}

impl Group {
    /// Create an empty group.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a triple pattern.
    pub fn triple(
        &mut self,
        subject: impl Into<Expression>,
        predicate: impl Into<String>,
        object: impl Into<Expression>,
    ) -> &mut Self {
        self.patterns
            .push(Pattern::Triple(Triple::new(subject, predicate, object)));
        self
    }

    /// Append a pattern.
    pub fn push(&mut self, pattern: Pattern) -> &mut Self {
        self.patterns.push(pattern);
        self
    }

    /// Append every pattern and filter of `other`.
    pub fn extend(&mut self, other: Group) -> &mut Self {
        self.patterns.extend(other.patterns);
        self.filters.extend(other.filters);
        self
    }

    /// Add a filter expression.
    pub fn filter(&mut self, filter: Expression) -> &mut Self {
        self.filters.push(filter);
        self
    }

    /// Whether the group has neither patterns nor filters.
    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty() && self.filters.is_empty()
    }

    /// The triple patterns of this group, without descending into nested groups.
    pub fn triples(&self) -> impl Iterator<Item = &Triple> {
        self.patterns.iter().filter_map(|pattern| match pattern {
            Pattern::Triple(triple) => Some(triple),
            _ => None,
        })
    }
}

/// Sort direction of an order condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderDirection {
    /// `ASC(..)`
    Ascending,
    /// `DESC(..)`
    Descending,
}

/// One `ORDER BY` key.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderCondition {
    /// Compared expression
    pub expression: Expression,
    /// Sort direction
    pub direction: OrderDirection,
}

/// A projected expression, optionally bound to a variable with `AS`.
#[derive(Debug, Clone, PartialEq)]
pub struct Projection {
    /// Projected expression
    pub expression: Expression,
    /// Variable the value is bound to
    pub alias: Option<Variable>,
}

/// A `SELECT` query or scalar sub-select.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Select {
    /// Projected columns in order
    pub projections: Vec<Projection>,
    /// The `WHERE` clause
    pub group: Group,
    /// `ORDER BY` keys
    pub order_by: Vec<OrderCondition>,
    /// Row limit
    pub limit: Option<usize>,
}

impl Select {
    /// Create an empty select.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a projected column.
    pub fn project(&mut self, expression: impl Into<Expression>) -> &mut Self {
        self.projections.push(Projection {
            expression: expression.into(),
            alias: None,
        });
        self
    }

    /// Append a projected column bound to `alias`.
    pub fn project_as(&mut self, expression: impl Into<Expression>, alias: Variable) -> &mut Self {
        self.projections.push(Projection {
            expression: expression.into(),
            alias: Some(alias),
        });
        self
    }

    /// Append a triple pattern to the `WHERE` clause.
    pub fn triple(
        &mut self,
        subject: impl Into<Expression>,
        predicate: impl Into<String>,
        object: impl Into<Expression>,
    ) -> &mut Self {
        self.group.triple(subject, predicate, object);
        self
    }

    /// Append a pattern to the `WHERE` clause.
    pub fn restrict(&mut self, pattern: Pattern) -> &mut Self {
        self.group.push(pattern);
        self
    }

    /// Append a whole group to the `WHERE` clause.
    pub fn restrict_group(&mut self, group: Group) -> &mut Self {
        self.group.extend(group);
        self
    }

    /// Add a filter to the `WHERE` clause.
    pub fn filter(&mut self, filter: Expression) -> &mut Self {
        self.group.filter(filter);
        self
    }

    /// Append an `ORDER BY` key.
    pub fn order_by(&mut self, expression: Expression, direction: OrderDirection) -> &mut Self {
        self.order_by.push(OrderCondition {
            expression,
            direction,
        });
        self
    }

    /// Limit the number of rows.
    pub fn limit(&mut self, limit: usize) -> &mut Self {
        self.limit = Some(limit);
        self
    }

    /// Number of projected columns.
    pub fn column_count(&self) -> usize {
        self.projections.len()
    }
}

/// One operation of an update request.
#[derive(Debug, Clone, PartialEq)]
pub enum UpdateOperation {
    /// `DELETE { template } WHERE { condition }`
    Delete {
        /// Graph the template is removed from
        graph: Option<String>,
        /// Triples removed for every solution
        template: Vec<Triple>,
        /// Where clause; `None` deletes the template as is
        condition: Option<Group>,
    },
    /// `INSERT [OR REPLACE] { GRAPH g { template } } WHERE { condition }`
    Insert {
        /// Replace existing values of single valued properties
        or_replace: bool,
        /// Target graph
        graph: Option<String>,
        /// Triples inserted for every solution
        template: Vec<Triple>,
        /// Where clause; `None` inserts the template as is
        condition: Option<Group>,
    },
}

/// Ordered update operations submitted as one request.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Update {
    /// Operations in execution order
    pub operations: Vec<UpdateOperation>,
}

impl Update {
    /// Create an empty update.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an operation.
    pub fn push(&mut self, operation: UpdateOperation) -> &mut Self {
        self.operations.push(operation);
        self
    }

    /// Whether no operation was added.
    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    /// Number of operations.
    pub fn len(&self) -> usize {
        self.operations.len()
    }
}
