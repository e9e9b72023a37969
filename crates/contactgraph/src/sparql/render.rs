//! Query text rendering.
//!
//! IRIs in a namespace the store predefines are written in compact form, other IRIs are
//! escaped and written in angle brackets. Control characters in string literals, which
//! includes the result separators, are written as `\uXXXX` escapes.

use super::{
    CompareOp, Expression, Function, Group, Literal, OrderDirection, Pattern, Select, Triple,
    Update, UpdateOperation, Variable,
};
use crate::subject::escape_iri;
use crate::vocab;
use std::fmt::{self, Write};

const INDENT: &str = "  ";

struct Renderer {
    out: String,
    depth: usize,
}

impl Renderer {
    fn new() -> Self {
        Self {
            out: String::new(),
            depth: 0,
        }
    }

    fn newline(&mut self) {
        self.out.push('\n');
        for _ in 0..self.depth {
            self.out.push_str(INDENT);
        }
    }

    fn iri(&mut self, iri: &str) {
        match vocab::compact(iri) {
            Some(compact) => self.out.push_str(&compact),
            None => {
                self.out.push('<');
                self.out.push_str(&escape_iri(iri));
                self.out.push('>');
            }
        }
    }

    fn variable(&mut self, variable: &Variable) {
        self.out.push('?');
        self.out.push_str(variable.name());
    }

    fn string(&mut self, text: &str) {
        self.out.push('"');
        for c in text.chars() {
            match c {
                '"' => self.out.push_str("\\\""),
                '\\' => self.out.push_str("\\\\"),
                '\n' => self.out.push_str("\\n"),
                '\r' => self.out.push_str("\\r"),
                '\t' => self.out.push_str("\\t"),
                c if c.is_control() => {
                    let _ = write!(self.out, "\\u{:04X}", c as u32);
                }
                c => self.out.push(c),
            }
        }
        self.out.push('"');
    }

    fn literal(&mut self, literal: &Literal) {
        match literal {
            Literal::String(text) => self.string(text),
            Literal::Int(i) => {
                let _ = write!(self.out, "{i}");
            }
            Literal::Double(d) => {
                let _ = write!(self.out, "\"{d}\"^^xsd:double");
            }
            Literal::Bool(b) => {
                let _ = write!(self.out, "{b}");
            }
            Literal::DateTime(dt) => {
                let _ = write!(self.out, "\"{}\"^^xsd:dateTime", dt.to_rfc3339());
            }
        }
    }

    fn list(&mut self, expressions: &[Expression], separator: &str) {
        for (i, expression) in expressions.iter().enumerate() {
            if i > 0 {
                self.out.push_str(separator);
            }
            self.expression(expression);
        }
    }

    fn expression(&mut self, expression: &Expression) {
        match expression {
            Expression::Variable(variable) => self.variable(variable),
            Expression::Iri(iri) => self.iri(iri),
            Expression::Blank(label) => {
                self.out.push_str("_:");
                self.out.push_str(label);
            }
            Expression::Literal(literal) => self.literal(literal),
            Expression::Call { function, args } => {
                self.out.push_str(function_name(*function));
                self.out.push('(');
                self.list(args, ", ");
                self.out.push(')');
            }
            Expression::Property {
                iri,
                subject,
                value_separator,
                graph_separator,
            } => {
                self.iri(iri);
                self.out.push('(');
                self.expression(subject);
                if value_separator.is_some() || graph_separator.is_some() {
                    self.out.push_str(", ");
                    self.string(&value_separator.unwrap_or(',').to_string());
                }
                if let Some(separator) = graph_separator {
                    self.out.push_str(", ");
                    self.string(&separator.to_string());
                }
                self.out.push(')');
            }
            Expression::Compare { op, left, right } => {
                self.out.push('(');
                self.expression(left);
                self.out.push_str(match op {
                    CompareOp::Equal => " = ",
                    CompareOp::Less => " < ",
                    CompareOp::LessOrEqual => " <= ",
                    CompareOp::GreaterOrEqual => " >= ",
                });
                self.expression(right);
                self.out.push(')');
            }
            Expression::And(operands) if operands.is_empty() => self.out.push_str("true"),
            Expression::Or(operands) if operands.is_empty() => self.out.push_str("false"),
            Expression::And(operands) => self.junction(operands, " && "),
            Expression::Or(operands) => self.junction(operands, " || "),
            Expression::Not(operand) => {
                self.out.push_str("!(");
                self.expression(operand);
                self.out.push(')');
            }
            Expression::In { value, list } => {
                self.expression(value);
                self.out.push_str(" IN (");
                self.list(list, ", ");
                self.out.push(')');
            }
            Expression::Exists(group) => {
                self.out.push_str("EXISTS ");
                self.group(group);
            }
            Expression::Select(select) => {
                self.out.push('(');
                self.select(select);
                self.out.push(')');
            }
        }
    }

    fn junction(&mut self, operands: &[Expression], operator: &str) {
        if let [single] = operands {
            return self.expression(single);
        }

        self.out.push('(');
        self.list(operands, operator);
        self.out.push(')');
    }

    fn triple(&mut self, triple: &Triple) {
        self.expression(&triple.subject);
        self.out.push(' ');
        match &triple.predicate {
            Expression::Iri(iri) if iri == vocab::rdf::TYPE => self.out.push('a'),
            predicate => self.expression(predicate),
        }
        self.out.push(' ');
        self.expression(&triple.object);
        self.out.push_str(" .");
    }

    fn group(&mut self, group: &Group) {
        self.out.push('{');
        self.depth += 1;
        self.group_body(group);
        self.depth -= 1;
        self.newline();
        self.out.push('}');
    }

    fn group_body(&mut self, group: &Group) {
        for pattern in &group.patterns {
            self.newline();
            self.pattern(pattern);
        }

        for filter in &group.filters {
            self.newline();
            self.out.push_str("FILTER(");
            self.expression(filter);
            self.out.push(')');
        }
    }

    fn pattern(&mut self, pattern: &Pattern) {
        match pattern {
            Pattern::Triple(triple) => self.triple(triple),
            Pattern::Group(group) => self.group(group),
            Pattern::Optional(group) => {
                self.out.push_str("OPTIONAL ");
                self.group(group);
            }
            Pattern::Union(groups) => {
                for (i, group) in groups.iter().enumerate() {
                    if i > 0 {
                        self.out.push_str(" UNION ");
                    }
                    self.group(group);
                }
            }
            Pattern::Graph { graph, group } => {
                self.out.push_str("GRAPH ");
                self.expression(graph);
                self.out.push(' ');
                self.group(group);
            }
            Pattern::SubSelect(select) => {
                self.out.push('{');
                self.depth += 1;
                self.newline();
                self.select(select);
                self.depth -= 1;
                self.newline();
                self.out.push('}');
            }
        }
    }

    fn select(&mut self, select: &Select) {
        self.out.push_str("SELECT");

        for projection in &select.projections {
            self.out.push(' ');
            match &projection.alias {
                Some(alias) => {
                    self.out.push('(');
                    self.expression(&projection.expression);
                    self.out.push_str(" AS ");
                    self.variable(alias);
                    self.out.push(')');
                }
                None => match &projection.expression {
                    Expression::Variable(variable) => self.variable(variable),
                    Expression::Select(_) => self.expression(&projection.expression),
                    expression => {
                        self.out.push('(');
                        self.expression(expression);
                        self.out.push(')');
                    }
                },
            }
        }

        self.newline();
        self.out.push_str("WHERE ");
        self.group(&select.group);

        if !select.order_by.is_empty() {
            self.newline();
            self.out.push_str("ORDER BY");
            for condition in &select.order_by {
                self.out.push_str(match condition.direction {
                    OrderDirection::Ascending => " ASC(",
                    OrderDirection::Descending => " DESC(",
                });
                self.expression(&condition.expression);
                self.out.push(')');
            }
        }

        if let Some(limit) = select.limit {
            self.newline();
            let _ = write!(self.out, "LIMIT {limit}");
        }
    }

    fn template(&mut self, triples: &[Triple]) {
        for triple in triples {
            self.newline();
            self.triple(triple);
        }
    }

    fn operation(&mut self, operation: &UpdateOperation) {
        match operation {
            UpdateOperation::Delete {
                graph,
                template,
                condition,
            } => {
                self.out.push_str("DELETE {");
                self.graph_template(graph.as_deref(), template);
                self.newline();
                self.out.push('}');
                self.where_clause(condition.as_ref());
            }
            UpdateOperation::Insert {
                or_replace,
                graph,
                template,
                condition,
            } => {
                self.out.push_str(if *or_replace {
                    "INSERT OR REPLACE {"
                } else {
                    "INSERT {"
                });
                self.graph_template(graph.as_deref(), template);
                self.newline();
                self.out.push('}');
                self.where_clause(condition.as_ref());
            }
        }
    }

    fn graph_template(&mut self, graph: Option<&str>, template: &[Triple]) {
        self.depth += 1;
        match graph {
            Some(graph) => {
                self.newline();
                self.out.push_str("GRAPH ");
                self.iri(graph);
                self.out.push_str(" {");
                self.depth += 1;
                self.template(template);
                self.depth -= 1;
                self.newline();
                self.out.push('}');
            }
            None => self.template(template),
        }
        self.depth -= 1;
    }

    fn where_clause(&mut self, condition: Option<&Group>) {
        if let Some(group) = condition {
            self.newline();
            self.out.push_str("WHERE ");
            self.group(group);
        }
    }
}

fn function_name(function: Function) -> &'static str {
    match function {
        Function::Concat => "concat",
        Function::Coalesce => "tracker:coalesce",
        Function::GroupConcat => "GROUP_CONCAT",
        Function::TrackerId => "tracker:id",
        Function::LowerCase => "fn:lower-case",
        Function::Contains => "fn:contains",
        Function::StartsWith => "fn:starts-with",
        Function::EndsWith => "fn:ends-with",
        Function::TimezoneFromDateTime => "fn:timezone-from-dateTime",
        Function::If => "IF",
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut renderer = Renderer::new();
        renderer.expression(self);
        f.write_str(&renderer.out)
    }
}

impl fmt::Display for Select {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut renderer = Renderer::new();
        renderer.select(self);
        f.write_str(&renderer.out)
    }
}

impl fmt::Display for Update {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut renderer = Renderer::new();
        for (i, operation) in self.operations.iter().enumerate() {
            if i > 0 {
                renderer.out.push_str("\n\n");
            }
            renderer.operation(operation);
        }
        f.write_str(&renderer.out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vocab::{nco, rdf};

    #[test]
    fn test_compact_and_escaped_iris() {
        assert_eq!(Expression::iri(nco::PERSON_CONTACT).to_string(), "nco:PersonContact");
        assert_eq!(
            Expression::iri("urn:x-maemo-phone:+49 30").to_string(),
            "<urn:x-maemo-phone:+49%2030>"
        );
    }

    #[test]
    fn test_string_escapes() {
        assert_eq!(
            Expression::string("a\"b\u{1f}").to_string(),
            "\"a\\\"b\\u001F\""
        );
    }

    #[test]
    fn test_select_rendering() {
        let contact = Variable::new("contact");
        let mut select = Select::new();
        select
            .project(&contact)
            .project(Expression::tracker_id((&contact).into()))
            .triple(&contact, rdf::TYPE, Expression::iri(nco::PERSON_CONTACT))
            .limit(1);

        assert_eq!(
            select.to_string(),
            "SELECT ?contact (tracker:id(?contact))\nWHERE {\n  ?contact a nco:PersonContact .\n}\nLIMIT 1"
        );
    }

    #[test]
    fn test_property_function_separators() {
        let contact = Variable::new("contact");
        let property = Expression::property(nco::HAS_PHONE_NUMBER, (&contact).into())
            .with_separators(None, Some('\u{1c}'));
        assert_eq!(
            property.to_string(),
            "nco:hasPhoneNumber(?contact, \",\", \"\\u001C\")"
        );
    }

    #[test]
    fn test_update_rendering() {
        let mut update = Update::new();
        update.push(UpdateOperation::Insert {
            or_replace: true,
            graph: Some("urn:graph".to_string()),
            template: vec![Triple::new(
                Expression::iri("urn:uuid:1"),
                nco::NAME_GIVEN,
                Expression::string("Ada"),
            )],
            condition: None,
        });

        assert_eq!(
            update.to_string(),
            "INSERT OR REPLACE {\n  GRAPH <urn:graph> {\n    <urn:uuid:1> nco:nameGiven \"Ada\" .\n  }\n}"
        );
    }

    #[test]
    fn test_graph_delete_with_blank_template() {
        let mut update = Update::new();
        update.push(UpdateOperation::Delete {
            graph: Some("urn:graph".to_string()),
            template: vec![Triple::new(
                Expression::iri("urn:uuid:1"),
                nco::HAS_PHONE_NUMBER,
                Variable::new("object"),
            )],
            condition: None,
        });
        update.push(UpdateOperation::Insert {
            or_replace: false,
            graph: None,
            template: vec![Triple::new(
                Expression::blank("PhoneNumber_1"),
                rdf::TYPE,
                Expression::iri(nco::PHONE_NUMBER),
            )],
            condition: None,
        });

        assert_eq!(
            update.to_string(),
            "DELETE {\n  GRAPH <urn:graph> {\n    <urn:uuid:1> nco:hasPhoneNumber ?object .\n  }\n}\n\n\
             INSERT {\n  _:PhoneNumber_1 a nco:PhoneNumber .\n}"
        );
    }

    #[test]
    fn test_empty_junctions() {
        assert_eq!(Expression::And(vec![]).to_string(), "true");
        assert_eq!(Expression::Or(vec![]).to_string(), "false");
        assert_eq!(
            Expression::Or(vec![Expression::boolean(true)]).to_string(),
            "true"
        );
    }
}
