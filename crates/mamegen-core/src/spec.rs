use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::rules::RuleSet;
use crate::value::{ConfigValue, Value};
use crate::{DEFAULT_ENCODING, DEFAULT_ROW_COUNT};

/// One `"label" value` line of a reference table.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReferenceEntry {
    pub label: String,
    pub value: Value,
}

/// Ordered, immutable lookup table declared by a `REFERENCE` section.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(transparent)]
pub struct ReferenceTable {
    entries: Vec<ReferenceEntry>,
}

impl ReferenceTable {
    pub fn new(entries: Vec<ReferenceEntry>) -> Self {
        Self { entries }
    }

    pub fn entries(&self) -> &[ReferenceEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&ReferenceEntry> {
        self.entries.get(index)
    }

    /// First entry whose label equals `label`.
    pub fn find_by_label(&self, label: &str) -> Option<&ReferenceEntry> {
        self.entries.iter().find(|entry| entry.label == label)
    }
}

/// An output column and the rules that produce its values.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Column {
    pub name: String,
    pub rules: RuleSet,
}

impl Column {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            rules: RuleSet::empty_string(),
        }
    }
}

/// Serialization format handed to the writers.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum OutputFormat {
    Csv,
    Json,
}

impl OutputFormat {
    /// Maps a `CONFIG.type` value; anything other than `JSON` falls back to CSV.
    pub fn from_type_name(name: &str) -> Self {
        if name.eq_ignore_ascii_case("json") {
            OutputFormat::Json
        } else {
            OutputFormat::Csv
        }
    }
}

/// Formatting contract between the engine and the writers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriterOptions {
    pub format: OutputFormat,
    pub with_header: bool,
    pub quote_strings: bool,
    pub quote_header: bool,
    pub encoding: String,
}

/// Assembled specification produced by the DSL parser.
///
/// `columns` mirrors `header` in order and names.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Specification {
    /// Output format name from `CONFIG.type`, uppercased.
    #[serde(rename = "type")]
    pub format_type: String,
    #[serde(rename = "count")]
    pub row_count: u64,
    pub options: BTreeMap<String, ConfigValue>,
    pub header: Vec<String>,
    pub reference_tables: BTreeMap<String, ReferenceTable>,
    pub columns: Vec<Column>,
}

impl Default for Specification {
    fn default() -> Self {
        let options = BTreeMap::from([
            ("reproducible".to_string(), ConfigValue::Bool(false)),
            ("with_header".to_string(), ConfigValue::Bool(true)),
            (
                "encoding".to_string(),
                ConfigValue::Text(DEFAULT_ENCODING.to_string()),
            ),
            ("quote_strings".to_string(), ConfigValue::Bool(true)),
            ("quote_header".to_string(), ConfigValue::Bool(true)),
        ]);
        Self {
            format_type: "CSV".to_string(),
            row_count: DEFAULT_ROW_COUNT,
            options,
            header: Vec::new(),
            reference_tables: BTreeMap::new(),
            columns: Vec::new(),
        }
    }
}

impl Specification {
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|column| column.name == name)
    }

    pub fn column_mut(&mut self, name: &str) -> Option<&mut Column> {
        self.columns.iter_mut().find(|column| column.name == name)
    }

    /// Zero-based header position of `name`.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.header.iter().position(|header| header == name)
    }

    pub fn option(&self, key: &str) -> Option<&ConfigValue> {
        self.options.get(key)
    }

    pub fn option_flag(&self, key: &str, default: bool) -> bool {
        self.option(key).map_or(default, ConfigValue::as_flag)
    }

    pub fn reproducible(&self) -> bool {
        self.option_flag("reproducible", false)
    }

    /// First non-empty of `output_encoding` and `encoding`, else UTF-8.
    pub fn encoding(&self) -> String {
        ["output_encoding", "encoding"]
            .iter()
            .filter_map(|key| self.option(key))
            .map(ToString::to_string)
            .find(|value| !value.is_empty())
            .unwrap_or_else(|| DEFAULT_ENCODING.to_string())
    }

    pub fn writer_options(&self) -> WriterOptions {
        WriterOptions {
            format: OutputFormat::from_type_name(&self.format_type),
            with_header: self.option_flag("with_header", true),
            quote_strings: self.option_flag("quote_strings", true),
            quote_header: self.option_flag("quote_header", true),
            encoding: self.encoding(),
        }
    }
}
