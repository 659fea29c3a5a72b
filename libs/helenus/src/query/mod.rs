//! Minimal CQL statement builder producing positional-bind statements.

use std::fmt;

use scylla::value::CqlValue;

use crate::mapping::{OrderingDirection, render_value};
use crate::operator::Operator;

/// CQL text plus its positional bind values
#[derive(Clone, Debug, PartialEq)]
pub struct BuiltStatement {
    pub cql: String,
    pub values: Vec<Option<CqlValue>>,
    pub idempotent: bool,
}

impl BuiltStatement {
    /// CQL with bound values listed after it, for logging
    pub fn with_values(&self) -> String {
        if self.values.is_empty() {
            return self.cql.clone();
        }
        let values: Vec<String> = self
            .values
            .iter()
            .map(|v| v.as_ref().map(render_value).unwrap_or_else(|| "null".into()))
            .collect();
        format!("{} [{}]", self.cql, values.join(", "))
    }
}

impl fmt::Display for BuiltStatement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.cql)
    }
}

/// One relation of a WHERE or IF clause
#[derive(Clone, Debug, PartialEq)]
pub struct Clause {
    column: String,
    operator: Operator,
    values: Vec<CqlValue>,
}

impl Clause {
    pub fn new(column: impl Into<String>, operator: Operator, values: Vec<CqlValue>) -> Self {
        Self {
            column: column.into(),
            operator,
            values,
        }
    }

    pub fn operator(&self) -> Operator {
        self.operator
    }

    fn render(&self, cql: &mut String, values: &mut Vec<Option<CqlValue>>) {
        cql.push_str(&self.column);
        cql.push(' ');
        cql.push_str(self.operator.cql());
        match self.operator {
            Operator::In => {
                let markers = vec!["?"; self.values.len()].join(", ");
                cql.push_str(&format!(" ({markers})"));
            }
            _ => cql.push_str(" ?"),
        }
        values.extend(self.values.iter().cloned().map(Some));
    }
}

fn render_clauses(
    keyword: &str,
    clauses: &[Clause],
    cql: &mut String,
    values: &mut Vec<Option<CqlValue>>,
) {
    for (i, clause) in clauses.iter().enumerate() {
        cql.push_str(if i == 0 { keyword } else { " AND " });
        clause.render(cql, values);
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Ordering {
    pub column: String,
    pub direction: OrderingDirection,
}

#[derive(Clone, Debug, Default, PartialEq)]
struct Using {
    ttl: Option<i32>,
    timestamp: Option<i64>,
}

impl Using {
    fn render(&self, cql: &mut String) {
        let mut parts = Vec::new();
        if let Some(ttl) = self.ttl {
            parts.push(format!("TTL {ttl}"));
        }
        if let Some(timestamp) = self.timestamp {
            parts.push(format!("TIMESTAMP {timestamp}"));
        }
        if !parts.is_empty() {
            cql.push_str(" USING ");
            cql.push_str(&parts.join(" AND "));
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
enum Selection {
    Columns(Vec<String>),
    Count,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Select {
    table: String,
    selection: Selection,
    where_: Vec<Clause>,
    orderings: Vec<Ordering>,
    limit: Option<i32>,
    allow_filtering: bool,
}

impl Select {
    pub fn columns(table: impl Into<String>, columns: Vec<String>) -> Self {
        Self::new(table.into(), Selection::Columns(columns))
    }

    pub fn count(table: impl Into<String>) -> Self {
        Self::new(table.into(), Selection::Count)
    }

    fn new(table: String, selection: Selection) -> Self {
        Self {
            table,
            selection,
            where_: Vec::new(),
            orderings: Vec::new(),
            limit: None,
            allow_filtering: false,
        }
    }

    pub fn where_clause(mut self, clause: Clause) -> Self {
        self.where_.push(clause);
        self
    }

    pub fn order_by(mut self, ordering: Ordering) -> Self {
        self.orderings.push(ordering);
        self
    }

    pub fn limit(mut self, limit: i32) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn allow_filtering(mut self) -> Self {
        self.allow_filtering = true;
        self
    }

    pub fn build(&self) -> BuiltStatement {
        let mut cql = String::from("SELECT ");
        let mut values = Vec::new();
        match &self.selection {
            Selection::Columns(columns) => cql.push_str(&columns.join(", ")),
            Selection::Count => cql.push_str("count(*)"),
        }
        cql.push_str(" FROM ");
        cql.push_str(&self.table);
        render_clauses(" WHERE ", &self.where_, &mut cql, &mut values);
        if !self.orderings.is_empty() {
            let orderings: Vec<String> = self
                .orderings
                .iter()
                .map(|o| format!("{} {}", o.column, o.direction))
                .collect();
            cql.push_str(" ORDER BY ");
            cql.push_str(&orderings.join(", "));
        }
        if let Some(limit) = self.limit {
            cql.push_str(&format!(" LIMIT {limit}"));
        }
        if self.allow_filtering {
            cql.push_str(" ALLOW FILTERING");
        }
        BuiltStatement {
            cql,
            values,
            idempotent: true,
        }
    }
}

/// Right-hand side of an UPDATE ... SET entry
#[derive(Clone, Debug, PartialEq)]
pub enum Assignment {
    Set(String, Option<CqlValue>),
    Increment(String, i64),
    Decrement(String, i64),
    Append(String, CqlValue),
    Prepend(String, CqlValue),
    Add(String, CqlValue),
    Remove(String, CqlValue),
}

impl Assignment {
    fn render(&self, cql: &mut String, values: &mut Vec<Option<CqlValue>>) {
        match self {
            Assignment::Set(column, value) => {
                cql.push_str(&format!("{column} = ?"));
                values.push(value.clone());
            }
            Assignment::Increment(column, delta) => {
                cql.push_str(&format!("{column} = {column} + ?"));
                values.push(Some(CqlValue::BigInt(*delta)));
            }
            Assignment::Decrement(column, delta) => {
                cql.push_str(&format!("{column} = {column} - ?"));
                values.push(Some(CqlValue::BigInt(*delta)));
            }
            Assignment::Append(column, value) | Assignment::Add(column, value) => {
                cql.push_str(&format!("{column} = {column} + ?"));
                values.push(Some(value.clone()));
            }
            Assignment::Prepend(column, value) => {
                cql.push_str(&format!("{column} = ? + {column}"));
                values.push(Some(value.clone()));
            }
            Assignment::Remove(column, value) => {
                cql.push_str(&format!("{column} = {column} - ?"));
                values.push(Some(value.clone()));
            }
        }
    }

    /// Whether re-running the assignment leaves the same state
    fn is_idempotent(&self) -> bool {
        !matches!(
            self,
            Assignment::Increment(..)
                | Assignment::Decrement(..)
                | Assignment::Append(..)
                | Assignment::Prepend(..)
        )
    }
}

/// Lightweight-transaction condition of a write
#[derive(Clone, Debug, Default, PartialEq)]
enum Conditional {
    #[default]
    None,
    Exists,
    NotExists,
    Conditions(Vec<Clause>),
}

impl Conditional {
    fn render(&self, cql: &mut String, values: &mut Vec<Option<CqlValue>>) {
        match self {
            Conditional::None => {}
            Conditional::Exists => cql.push_str(" IF EXISTS"),
            Conditional::NotExists => cql.push_str(" IF NOT EXISTS"),
            Conditional::Conditions(clauses) => render_clauses(" IF ", clauses, cql, values),
        }
    }

    fn is_none(&self) -> bool {
        matches!(self, Conditional::None)
    }

    fn add(&mut self, clause: Clause) {
        match self {
            Conditional::Conditions(clauses) => clauses.push(clause),
            _ => *self = Conditional::Conditions(vec![clause]),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Update {
    table: String,
    using: Using,
    assignments: Vec<Assignment>,
    where_: Vec<Clause>,
    conditional: Conditional,
}

impl Update {
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            using: Using::default(),
            assignments: Vec::new(),
            where_: Vec::new(),
            conditional: Conditional::None,
        }
    }

    pub fn assign(mut self, assignment: Assignment) -> Self {
        self.assignments.push(assignment);
        self
    }

    pub fn where_clause(mut self, clause: Clause) -> Self {
        self.where_.push(clause);
        self
    }

    pub fn only_if(mut self, clause: Clause) -> Self {
        self.conditional.add(clause);
        self
    }

    pub fn if_exists(mut self) -> Self {
        self.conditional = Conditional::Exists;
        self
    }

    pub fn ttl(mut self, seconds: i32) -> Self {
        self.using.ttl = Some(seconds);
        self
    }

    pub fn timestamp(mut self, micros: i64) -> Self {
        self.using.timestamp = Some(micros);
        self
    }

    pub fn build(&self) -> BuiltStatement {
        let mut cql = format!("UPDATE {}", self.table);
        let mut values = Vec::new();
        self.using.render(&mut cql);
        cql.push_str(" SET ");
        for (i, assignment) in self.assignments.iter().enumerate() {
            if i > 0 {
                cql.push_str(", ");
            }
            assignment.render(&mut cql, &mut values);
        }
        render_clauses(" WHERE ", &self.where_, &mut cql, &mut values);
        self.conditional.render(&mut cql, &mut values);
        BuiltStatement {
            cql,
            values,
            idempotent: self.conditional.is_none()
                && self.assignments.iter().all(Assignment::is_idempotent),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Insert {
    table: String,
    values: Vec<(String, Option<CqlValue>)>,
    using: Using,
    if_not_exists: bool,
}

impl Insert {
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            values: Vec::new(),
            using: Using::default(),
            if_not_exists: false,
        }
    }

    pub fn value(mut self, column: impl Into<String>, value: Option<CqlValue>) -> Self {
        self.values.push((column.into(), value));
        self
    }

    pub fn if_not_exists(mut self) -> Self {
        self.if_not_exists = true;
        self
    }

    pub fn ttl(mut self, seconds: i32) -> Self {
        self.using.ttl = Some(seconds);
        self
    }

    pub fn timestamp(mut self, micros: i64) -> Self {
        self.using.timestamp = Some(micros);
        self
    }

    pub fn build(&self) -> BuiltStatement {
        let columns: Vec<&str> = self.values.iter().map(|(c, _)| c.as_str()).collect();
        let markers = vec!["?"; columns.len()].join(", ");
        let mut cql = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            self.table,
            columns.join(", "),
            markers
        );
        if self.if_not_exists {
            cql.push_str(" IF NOT EXISTS");
        }
        self.using.render(&mut cql);
        BuiltStatement {
            cql,
            values: self.values.iter().map(|(_, v)| v.clone()).collect(),
            idempotent: !self.if_not_exists,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Delete {
    table: String,
    using: Using,
    where_: Vec<Clause>,
    conditional: Conditional,
}

impl Delete {
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            using: Using::default(),
            where_: Vec::new(),
            conditional: Conditional::None,
        }
    }

    pub fn where_clause(mut self, clause: Clause) -> Self {
        self.where_.push(clause);
        self
    }

    pub fn only_if(mut self, clause: Clause) -> Self {
        self.conditional.add(clause);
        self
    }

    pub fn if_exists(mut self) -> Self {
        self.conditional = Conditional::Exists;
        self
    }

    pub fn timestamp(mut self, micros: i64) -> Self {
        self.using.timestamp = Some(micros);
        self
    }

    pub fn build(&self) -> BuiltStatement {
        let mut cql = format!("DELETE FROM {}", self.table);
        let mut values = Vec::new();
        self.using.render(&mut cql);
        render_clauses(" WHERE ", &self.where_, &mut cql, &mut values);
        self.conditional.render(&mut cql, &mut values);
        BuiltStatement {
            cql,
            values,
            idempotent: self.conditional.is_none(),
        }
    }
}

pub fn truncate(table: impl fmt::Display) -> BuiltStatement {
    BuiltStatement {
        cql: format!("TRUNCATE {table}"),
        values: Vec::new(),
        idempotent: false,
    }
}
