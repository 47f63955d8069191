//! Parser for the mamegen block DSL.
//!
//! Text flows through [`lex`] (comment stripping and quote-aware splitting),
//! the block reader and section consumers in [`parser`], the per-keyword
//! parsers in [`grammar`], selector expansion in [`selector`] and the rule
//! merge in [`builder`].

pub mod builder;
pub mod grammar;
pub mod lex;
pub mod parser;
pub mod selector;

pub use builder::RuleSetBuilder;
pub use grammar::ParsedRule;
pub use parser::{Block, LineCursor, parse_spec};
pub use selector::Selector;
