//! Value generators invoked by the engine for each column of a row.
//!
//! `primitives` covers the randomized type-based values; `derive` covers the
//! values computed from the row being built or from reference tables.

pub mod derive;
pub mod primitives;

use std::collections::HashMap;

use mamegen_core::Value;

use crate::model::Row;

/// A column value that could not be resolved; the engine applies the
/// allow-null-or-raise policy to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Unresolved(pub String);

impl Unresolved {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }

    pub fn message(&self) -> &str {
        &self.0
    }
}

pub type Generated = Result<Value, Unresolved>;

/// State owned by one row while it is generated and dropped at row end.
#[derive(Debug, Default)]
pub struct RowScope {
    pub row: Row,
    /// Entry index chosen by the first plain reference to each table key.
    pub reference_locks: HashMap<String, usize>,
}

impl RowScope {
    pub fn new(columns: usize) -> Self {
        Self {
            row: Row::with_capacity(columns),
            reference_locks: HashMap::new(),
        }
    }

    pub fn into_row(self) -> Row {
        self.row
    }
}
