//! Query clause model and the in-memory join/query engine.

pub mod clause;
pub mod engine;

pub use clause::{
    Direction, Filter, Join, JoinKind, JoinedField, Operand, Operator, OrderBy, QueryClause,
};
pub use engine::{JoinedRows, QueryEngine};
