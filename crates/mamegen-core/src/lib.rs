//! Core contracts for mamegen.
//!
//! This crate defines the assembled specification produced by the DSL parser
//! and consumed by the generation engine, together with the error taxonomy
//! shared by every stage.

pub mod error;
pub mod rules;
pub mod spec;
pub mod value;

pub use error::{DslError, DslErrorKind, Result};
pub use rules::{
    Charset, CopySource, DateRange, JoinItem, NumericRange, OutputSide, ReferenceRule, RuleSet,
    SeqRule, ValueFamily, ValueRules, ValueSource, ValueType,
};
pub use spec::{Column, OutputFormat, ReferenceEntry, ReferenceTable, Specification, WriterOptions};
pub use value::{ConfigValue, Value};

/// Row count used when `CONFIG` does not set `count`.
pub const DEFAULT_ROW_COUNT: u64 = 10;

/// Output encoding used when `CONFIG` names none.
pub const DEFAULT_ENCODING: &str = "utf-8";
