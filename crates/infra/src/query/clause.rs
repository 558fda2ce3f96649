//! Structured query clause: projection, predicates, joins, ordering, paging.
//!
//! Clauses are plain data built with the builder methods below; nothing here
//! is parsed from free-form text.

use serde::{Deserialize, Serialize};

use strata_core::PropertyValue;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operator {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Contains,
    StartsWith,
    In,
    IsNull,
    IsNotNull,
}

/// Right-hand side of a filter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Operand {
    None,
    Value(PropertyValue),
    List(Vec<PropertyValue>),
}

/// `{field, operator, value}` predicate. All filters of a clause are AND-ed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Filter {
    pub field: String,
    pub operator: Operator,
    pub operand: Operand,
}

impl Filter {
    pub fn new(field: impl Into<String>, operator: Operator, value: impl Into<PropertyValue>) -> Self {
        Self {
            field: field.into(),
            operator,
            operand: Operand::Value(value.into()),
        }
    }

    pub fn eq(field: impl Into<String>, value: impl Into<PropertyValue>) -> Self {
        Self::new(field, Operator::Eq, value)
    }

    pub fn ne(field: impl Into<String>, value: impl Into<PropertyValue>) -> Self {
        Self::new(field, Operator::Ne, value)
    }

    pub fn is_in(field: impl Into<String>, values: Vec<PropertyValue>) -> Self {
        Self {
            field: field.into(),
            operator: Operator::In,
            operand: Operand::List(values),
        }
    }

    pub fn is_null(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            operator: Operator::IsNull,
            operand: Operand::None,
        }
    }

    pub fn is_not_null(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            operator: Operator::IsNotNull,
            operand: Operand::None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    #[default]
    Ascending,
    Descending,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderBy {
    pub field: String,
    pub direction: Direction,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum JoinKind {
    #[default]
    Inner,
    Left,
}

/// A field copied from the joined container, optionally renamed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinedField {
    pub source: String,
    pub alias: Option<String>,
}

impl JoinedField {
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            alias: None,
        }
    }

    pub fn aliased(source: impl Into<String>, alias: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            alias: Some(alias.into()),
        }
    }

    /// Name of the field in the joined row.
    pub fn name(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.source)
    }
}

/// Equi-join of the primary rows (`left_field`) with another container (`right_field`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Join {
    pub container: String,
    pub kind: JoinKind,
    pub left_field: String,
    pub right_field: String,
    /// Only these fields are copied into the joined row.
    pub fields: Vec<JoinedField>,
}

impl Join {
    pub fn inner(
        container: impl Into<String>,
        left_field: impl Into<String>,
        right_field: impl Into<String>,
    ) -> Self {
        Self {
            container: container.into(),
            kind: JoinKind::Inner,
            left_field: left_field.into(),
            right_field: right_field.into(),
            fields: Vec::new(),
        }
    }

    pub fn left(
        container: impl Into<String>,
        left_field: impl Into<String>,
        right_field: impl Into<String>,
    ) -> Self {
        Self {
            kind: JoinKind::Left,
            ..Self::inner(container, left_field, right_field)
        }
    }

    pub fn field(mut self, field: JoinedField) -> Self {
        self.fields.push(field);
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryClause {
    /// Explicit projection; empty means every declared property.
    pub select: Vec<String>,
    pub filters: Vec<Filter>,
    pub joins: Vec<Join>,
    pub order_by: Vec<OrderBy>,
    pub skip: Option<usize>,
    pub take: Option<usize>,
}

impl QueryClause {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn select<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.select.extend(fields.into_iter().map(Into::into));
        self
    }

    pub fn filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn join(mut self, join: Join) -> Self {
        self.joins.push(join);
        self
    }

    pub fn order_by(mut self, field: impl Into<String>, direction: Direction) -> Self {
        self.order_by.push(OrderBy {
            field: field.into(),
            direction,
        });
        self
    }

    pub fn skip(mut self, skip: usize) -> Self {
        self.skip = Some(skip);
        self
    }

    pub fn take(mut self, take: usize) -> Self {
        self.take = Some(take);
        self
    }

    /// A clause that constrains nothing at all (the "no query" value).
    pub fn is_empty(&self) -> bool {
        self.select.is_empty()
            && self.filters.is_empty()
            && self.joins.is_empty()
            && self.order_by.is_empty()
            && self.skip.is_none()
            && self.take.is_none()
    }
}
