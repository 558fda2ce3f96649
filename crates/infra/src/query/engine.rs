//! In-memory join/query engine.
//!
//! Evaluates a [`QueryClause`] over materialized rows for backends that
//! cannot filter, join or order natively. Pure and single-threaded: each call
//! works on its own copy of the rows.

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};

use strata_core::schema::is_system_property;
use strata_core::{
    GenericEntity, ID_PROPERTY, IS_DELETED_PROPERTY, LAST_PERSISTED_PROPERTY, PropertyBag, PropertyValue,
    SchemaMetadata,
};

use super::clause::{Direction, Filter, JoinKind, JoinedField, Operand, Operator, OrderBy, QueryClause};
use crate::config::StoreOptions;
use crate::error::{StoreError, StoreResult};

/// Rows of every joinable container, keyed by container name.
pub type JoinedRows = HashMap<String, Vec<GenericEntity>>;

type Row = BTreeMap<String, Option<PropertyValue>>;

#[derive(Debug, Clone, Default)]
pub struct QueryEngine {
    options: StoreOptions,
}

impl QueryEngine {
    pub fn new(options: StoreOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &StoreOptions {
        &self.options
    }

    /// Run `clause` over `primary`, joining against `joined`.
    ///
    /// `schema` describes the primary container; projected entities carry the
    /// kinds of the selected names, and join fields are declared from their values.
    pub fn execute(
        &self,
        clause: &QueryClause,
        schema: &SchemaMetadata,
        primary: &[GenericEntity],
        joined: &JoinedRows,
    ) -> StoreResult<Vec<GenericEntity>> {
        let take = self.options.resolve_take(clause.take);
        if take == 0 {
            return Ok(Vec::new());
        }

        let selected = selection(clause, schema);
        let order = resolve_order(clause, schema, &selected)?;
        let projection = projection(clause, &selected);

        let mut rows = join_rows(clause, primary, joined);
        rows.retain(|row| clause.filters.iter().all(|f| matches(row, f)));
        sort_rows(&mut rows, &order);

        tracing::debug!(
            rows = rows.len(),
            skip = clause.skip.unwrap_or(0),
            take,
            "query evaluated"
        );

        Ok(rows
            .into_iter()
            .skip(clause.skip.unwrap_or(0))
            .take(take)
            .map(|row| project(row, &projection, schema))
            .collect())
    }

    /// Number of rows matching the joins and filters; paging is ignored.
    pub fn count(&self, clause: &QueryClause, primary: &[GenericEntity], joined: &JoinedRows) -> usize {
        join_rows(clause, primary, joined)
            .iter()
            .filter(|row| clause.filters.iter().all(|f| matches(row, f)))
            .count()
    }
}

fn selection(clause: &QueryClause, schema: &SchemaMetadata) -> Vec<String> {
    if clause.select.is_empty() {
        schema.names().map(str::to_string).collect()
    } else {
        clause.select.clone()
    }
}

fn join_fields(clause: &QueryClause) -> impl Iterator<Item = &str> {
    clause
        .joins
        .iter()
        .flat_map(|join| join.fields.iter().map(JoinedField::name))
}

/// Identity, then the selected names, then every join field.
fn projection(clause: &QueryClause, selected: &[String]) -> Vec<String> {
    let mut names = vec![ID_PROPERTY.to_string()];
    for name in selected.iter().map(String::as_str).chain(join_fields(clause)) {
        if !names.iter().any(|n| n == name) {
            names.push(name.to_string());
        }
    }
    names
}

fn resolve_order(
    clause: &QueryClause,
    schema: &SchemaMetadata,
    selected: &[String],
) -> StoreResult<Vec<OrderBy>> {
    if !clause.order_by.is_empty() {
        for order in &clause.order_by {
            let field = order.field.as_str();
            let known = schema.contains(field)
                || is_system_property(field)
                || selected.iter().any(|s| s == field)
                || join_fields(clause).any(|j| j == field);
            if !known {
                return Err(StoreError::configuration(format!(
                    "cannot order by '{field}': not declared in the schema or selected from a join"
                )));
            }
        }
        return Ok(clause.order_by.clone());
    }

    // With no explicit selection, `selected` is the schema in declaration
    // order, so "first selected" doubles as "first schema field".
    let is_selected = |name: &str| selected.iter().any(|s| s == name);
    let field = if is_selected(LAST_PERSISTED_PROPERTY) {
        LAST_PERSISTED_PROPERTY.to_string()
    } else if is_selected(ID_PROPERTY) {
        ID_PROPERTY.to_string()
    } else if let Some(first) = selected.first() {
        first.clone()
    } else {
        return Err(StoreError::configuration(
            "no default ordering: the projection and the schema are both empty",
        ));
    };

    Ok(vec![OrderBy {
        field,
        direction: Direction::Ascending,
    }])
}

fn join_rows(clause: &QueryClause, primary: &[GenericEntity], joined: &JoinedRows) -> Vec<Row> {
    let mut rows: Vec<Row> = primary
        .iter()
        .map(|entity| {
            entity
                .properties()
                .iter()
                .map(|(name, value)| (name.to_string(), value.clone()))
                .collect()
        })
        .collect();

    for join in &clause.joins {
        let right = joined.get(&join.container).map(Vec::as_slice).unwrap_or(&[]);

        // First row wins on duplicate keys: a join never multiplies primary rows.
        let mut index: HashMap<String, &PropertyBag> = HashMap::new();
        for entity in right {
            if let Some(key) = entity.properties().value(&join.right_field) {
                index.entry(key.join_key()).or_insert(entity.properties());
            }
        }

        rows = rows
            .into_iter()
            .filter_map(|mut row| {
                let matched = cell(&row, &join.left_field).and_then(|v| index.get(&v.join_key()).copied());
                match (matched, join.kind) {
                    (Some(bag), _) => {
                        for field in &join.fields {
                            row.insert(field.name().to_string(), bag.value(&field.source).cloned());
                        }
                        Some(row)
                    }
                    (None, JoinKind::Left) => {
                        for field in &join.fields {
                            row.insert(field.name().to_string(), None);
                        }
                        Some(row)
                    }
                    (None, JoinKind::Inner) => None,
                }
            })
            .collect();
    }

    rows
}

fn cell<'a>(row: &'a Row, field: &str) -> Option<&'a PropertyValue> {
    row.get(field).and_then(Option::as_ref)
}

fn equals(a: &PropertyValue, b: &PropertyValue) -> bool {
    a.compare(b) == Some(Ordering::Equal) || a.join_key() == b.join_key()
}

fn matches(row: &Row, filter: &Filter) -> bool {
    let value = cell(row, &filter.field);
    match (filter.operator, &filter.operand) {
        (Operator::IsNull, _) => value.is_none(),
        (Operator::IsNotNull, _) => value.is_some(),
        (Operator::In, Operand::List(items)) => value.is_some_and(|v| items.iter().any(|i| equals(v, i))),
        (Operator::Eq, Operand::None) => value.is_none(),
        (Operator::Ne, Operand::None) => value.is_some(),
        (operator, Operand::Value(target)) => compare_with(operator, value, target),
        _ => false,
    }
}

fn compare_with(operator: Operator, value: Option<&PropertyValue>, target: &PropertyValue) -> bool {
    let ordering = value.and_then(|v| v.compare(target));
    let text = value.and_then(PropertyValue::as_str).zip(target.as_str());
    match operator {
        Operator::Eq | Operator::In => value.is_some_and(|v| equals(v, target)),
        Operator::Ne => !value.is_some_and(|v| equals(v, target)),
        Operator::Lt => ordering == Some(Ordering::Less),
        Operator::Le => matches!(ordering, Some(Ordering::Less | Ordering::Equal)),
        Operator::Gt => ordering == Some(Ordering::Greater),
        Operator::Ge => matches!(ordering, Some(Ordering::Greater | Ordering::Equal)),
        Operator::Contains => text.is_some_and(|(v, t)| v.contains(t)),
        Operator::StartsWith => text.is_some_and(|(v, t)| v.starts_with(t)),
        Operator::IsNull | Operator::IsNotNull => false,
    }
}

fn kind_rank(value: &PropertyValue) -> u8 {
    match value {
        PropertyValue::Boolean(_) => 0,
        PropertyValue::Integer(_) | PropertyValue::Float(_) => 1,
        PropertyValue::Timestamp(_) => 2,
        PropertyValue::String(_) => 3,
        PropertyValue::Guid(_) => 4,
        PropertyValue::Complex { .. } => 5,
        PropertyValue::Bytes(_) => 6,
    }
}

/// Total order over cells: nulls first, then by value, mixed kinds by kind.
fn compare_cells(a: Option<&PropertyValue>, b: Option<&PropertyValue>) -> Ordering {
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(a), Some(b)) => a.compare(b).unwrap_or_else(|| {
            kind_rank(a)
                .cmp(&kind_rank(b))
                .then_with(|| a.to_string().cmp(&b.to_string()))
        }),
    }
}

fn sort_rows(rows: &mut [Row], order: &[OrderBy]) {
    rows.sort_by(|a, b| {
        for spec in order {
            let ordering = compare_cells(cell(a, &spec.field), cell(b, &spec.field));
            let ordering = match spec.direction {
                Direction::Ascending => ordering,
                Direction::Descending => ordering.reverse(),
            };
            if ordering != Ordering::Equal {
                return ordering;
            }
        }
        Ordering::Equal
    });
}

fn project(mut row: Row, projection: &[String], schema: &SchemaMetadata) -> GenericEntity {
    // The bag always holds the system properties; keep the row's real values.
    let mut properties = PropertyBag::new();
    for name in [IS_DELETED_PROPERTY, LAST_PERSISTED_PROPERTY] {
        if let Some(value) = row.get(name) {
            properties.set(name, value.clone());
        }
    }

    let mut declared = SchemaMetadata::new();
    for name in projection {
        let value = row.remove(name).flatten();
        let kind = schema
            .kind_of(name)
            .cloned()
            .or_else(|| value.as_ref().map(PropertyValue::kind));
        if let Some(kind) = kind {
            declared.declare(name.clone(), kind);
        }
        properties.set(name.clone(), value);
    }

    GenericEntity::projected(properties, declared)
}
