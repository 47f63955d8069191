use chrono::NaiveDateTime;
use mamegen_core::Value;
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

/// Seed used for runs with `reproducible` enabled.
pub const REPRODUCIBLE_SEED: u64 = 42;

/// Options for the generation engine.
#[derive(Debug, Clone, Default)]
pub struct GenerateOptions {
    /// Forces a seeded run, taking precedence over `reproducible`.
    pub seed: Option<u64>,
    /// Overrides `CONFIG.count`.
    pub row_count: Option<u64>,
    /// Pins the clock used for default date bounds.
    pub now: Option<NaiveDateTime>,
}

/// One generated record: column names paired with values, in header order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    cells: Vec<(String, Value)>,
}

impl Row {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            cells: Vec::with_capacity(capacity),
        }
    }

    pub fn push(&mut self, column: impl Into<String>, value: Value) {
        self.cells.push((column.into(), value));
    }

    /// Value already produced for `column`, if any.
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.cells
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value)
    }

    /// Value at zero-based position `index`.
    pub fn get_index(&self, index: usize) -> Option<&Value> {
        self.cells.get(index).map(|(_, value)| value)
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.cells.iter().map(|(name, _)| name.as_str())
    }

    pub fn values(&self) -> impl Iterator<Item = &Value> {
        self.cells.iter().map(|(_, value)| value)
    }
}

impl Serialize for Row {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.cells.len()))?;
        for (name, value) in &self.cells {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

/// Summary of a generation run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GenerationReport {
    pub rows: u64,
    pub columns: usize,
    pub seed: u64,
    pub reproducible: bool,
    pub null_count: u64,
    /// Column failures turned into nulls by the allow-null policy.
    pub downgraded: u64,
}
