//! Row generation engine for mamegen specifications.
//!
//! This crate turns an assembled [`mamegen_core::Specification`] into rows and
//! writes them as CSV or JSON in the requested encoding.

pub mod engine;
pub mod errors;
pub mod generators;
pub mod model;
pub mod output;

pub use engine::{GenerationEngine, GenerationResult, emits_null};
pub use errors::GenerationError;
pub use model::{GenerateOptions, GenerationReport, REPRODUCIBLE_SEED, Row};
pub use output::{resolve_encoding, write_rows};
