use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::value::Value;

/// Declared type of a generated column.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ValueType {
    String,
    Int,
    Float,
    Date,
    DateTime,
}

/// Named character pool usable by the string generator.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum Charset {
    Alphabet,
    Lower,
    Upper,
    Number,
    Hex,
    Symbol,
}

const LOWER: &str = "abcdefghijklmnopqrstuvwxyz";
const UPPER: &str = "ABCDEFGHIJKLMNOPQRSTUVWXYZ";
const ALPHABET: &str = "abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ";
const NUMBER: &str = "0123456789";
const HEX: &str = "0123456789ABCDEF";
const SYMBOL: &str = "!\"#$%&'()*+,-./:;<=>?@[\\]^_`{|}~";

impl Charset {
    pub const ALL: [Charset; 6] = [
        Charset::Alphabet,
        Charset::Lower,
        Charset::Upper,
        Charset::Number,
        Charset::Hex,
        Charset::Symbol,
    ];

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|charset| charset.name() == name)
    }

    pub fn name(self) -> &'static str {
        match self {
            Charset::Alphabet => "alphabet",
            Charset::Lower => "lower",
            Charset::Upper => "upper",
            Charset::Number => "number",
            Charset::Hex => "hex",
            Charset::Symbol => "symbol",
        }
    }

    /// Characters contributed by this pool.
    pub fn chars(self) -> &'static str {
        match self {
            Charset::Alphabet => ALPHABET,
            Charset::Lower => LOWER,
            Charset::Upper => UPPER,
            Charset::Number => NUMBER,
            Charset::Hex => HEX,
            Charset::Symbol => SYMBOL,
        }
    }
}

/// Source column of a `copy` rule.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "by", content = "key", rename_all = "lowercase")]
pub enum CopySource {
    Label(String),
    /// 1-based header position.
    Index(usize),
}

/// One element of a `join` rule.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum JoinItem {
    Literal(String),
    Column(String),
}

/// Which side of a reference entry a column emits.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum OutputSide {
    Label,
    #[default]
    Value,
}

/// Where a reference lookup takes its label from.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "mode", content = "column", rename_all = "lowercase")]
pub enum ValueSource {
    /// Nearest earlier column referencing the same key with `output label`.
    Auto,
    Column(String),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReferenceRule {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<OutputSide>,
    #[serde(
        default,
        rename = "valueSource",
        skip_serializing_if = "Option::is_none"
    )]
    pub value_source: Option<ValueSource>,
}

impl ReferenceRule {
    pub fn output_side(&self) -> OutputSide {
        self.output.unwrap_or_default()
    }
}

/// Counter rule; `end` is advisory and never stops generation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SeqRule {
    pub start: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<i64>,
    pub step: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub digits: Option<usize>,
}

impl Default for SeqRule {
    fn default() -> Self {
        Self {
            start: 1,
            end: None,
            step: 1,
            digits: None,
        }
    }
}

/// Bounds of a `range` rule. A missing `max` means an open upper bound.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum NumericRange {
    Int { min: i64, max: Option<i64> },
    Float { min: f64, max: Option<f64> },
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

/// The family a column's value rule belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueFamily {
    Fixed,
    Copy,
    Join,
    Reference,
    Seq,
    Enum,
    Range,
    Date,
}

impl ValueFamily {
    pub fn name(self) -> &'static str {
        match self {
            ValueFamily::Fixed => "fixed",
            ValueFamily::Copy => "copy",
            ValueFamily::Join => "join",
            ValueFamily::Reference => "reference",
            ValueFamily::Seq => "seq",
            ValueFamily::Enum => "enum",
            ValueFamily::Range => "range",
            ValueFamily::Date => "date",
        }
    }
}

/// Value-producing part of a rule set.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ValueRules {
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub value_type: Option<ValueType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fixed: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub copy: Option<CopySource>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub join: Option<Vec<JoinItem>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<ReferenceRule>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seq: Option<SeqRule>,
    #[serde(default, rename = "enum", skip_serializing_if = "Option::is_none")]
    pub enum_values: Option<Vec<Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub range: Option<NumericRange>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_range: Option<DateRange>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_format: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub length: Option<usize>,
    /// Accumulated pools, sorted and deduplicated.
    #[serde(default, rename = "charset", skip_serializing_if = "Vec::is_empty")]
    pub charsets: Vec<Charset>,
}

impl ValueRules {
    /// Returns the value family currently set, checked in generation priority order.
    pub fn family(&self) -> Option<ValueFamily> {
        if self.fixed.is_some() {
            Some(ValueFamily::Fixed)
        } else if self.copy.is_some() {
            Some(ValueFamily::Copy)
        } else if self.join.is_some() {
            Some(ValueFamily::Join)
        } else if self.reference.is_some() {
            Some(ValueFamily::Reference)
        } else if self.seq.is_some() {
            Some(ValueFamily::Seq)
        } else if self.enum_values.is_some() {
            Some(ValueFamily::Enum)
        } else if self.range.is_some() {
            Some(ValueFamily::Range)
        } else if self.date_range.is_some()
            || self.date_format.is_some()
            || matches!(self.value_type, Some(ValueType::Date | ValueType::DateTime))
        {
            Some(ValueFamily::Date)
        } else {
            None
        }
    }

    /// Drops every slot owned by `family`, leaving string shaping intact.
    pub fn clear_family(&mut self, family: ValueFamily) {
        match family {
            ValueFamily::Fixed => self.fixed = None,
            ValueFamily::Copy => self.copy = None,
            ValueFamily::Join => self.join = None,
            ValueFamily::Reference => self.reference = None,
            ValueFamily::Seq => self.seq = None,
            ValueFamily::Enum => self.enum_values = None,
            ValueFamily::Range => self.range = None,
            ValueFamily::Date => {
                self.date_range = None;
                self.date_format = None;
            }
        }
        self.value_type = if self.length.is_some() || !self.charsets.is_empty() {
            Some(ValueType::String)
        } else {
            None
        };
    }

    /// True when the date generator should work at day granularity.
    pub fn is_date_like(&self) -> bool {
        match self.value_type {
            Some(ValueType::Date) => true,
            Some(ValueType::DateTime) => false,
            _ => self.date_range.is_some(),
        }
    }
}

/// Normalized generation directives attached to one column.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RuleSet {
    pub allow_null: bool,
    pub null_probability: f64,
    #[serde(flatten)]
    pub value: ValueRules,
}

impl RuleSet {
    /// Rule set for a column without any rule keywords: a fixed empty string.
    pub fn empty_string() -> Self {
        Self {
            allow_null: true,
            null_probability: 0.0,
            value: ValueRules {
                value_type: Some(ValueType::String),
                fixed: Some(Value::Text(String::new())),
                ..ValueRules::default()
            },
        }
    }
}

impl Default for RuleSet {
    fn default() -> Self {
        Self::empty_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn charset_pools_match_names() {
        assert_eq!(Charset::from_name("hex"), Some(Charset::Hex));
        assert_eq!(Charset::Hex.chars(), "0123456789ABCDEF");
        assert_eq!(Charset::Symbol.chars().len(), 32);
        assert_eq!(Charset::from_name("emoji"), None);
    }

    #[test]
    fn family_follows_priority_order() {
        let mut rules = ValueRules {
            seq: Some(SeqRule::default()),
            fixed: Some(Value::Int(1)),
            ..ValueRules::default()
        };
        assert_eq!(rules.family(), Some(ValueFamily::Fixed));
        rules.clear_family(ValueFamily::Fixed);
        assert_eq!(rules.family(), Some(ValueFamily::Seq));
    }

    #[test]
    fn clearing_keeps_string_type_when_shaped() {
        let mut rules = ValueRules {
            value_type: Some(ValueType::Int),
            enum_values: Some(vec![Value::Int(1)]),
            length: Some(4),
            ..ValueRules::default()
        };
        rules.clear_family(ValueFamily::Enum);
        assert_eq!(rules.value_type, Some(ValueType::String));
    }

    #[test]
    fn date_range_without_type_is_date_like() {
        let day = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let mut rules = ValueRules {
            date_range: Some(DateRange {
                start: day,
                end: day,
            }),
            ..ValueRules::default()
        };
        assert!(rules.is_date_like());
        rules.value_type = Some(ValueType::DateTime);
        assert!(!rules.is_date_like());
    }
}
