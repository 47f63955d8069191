use std::collections::{BTreeMap, VecDeque};

use mamegen_core::{
    Column, ConfigValue, DslError, ReferenceEntry, ReferenceTable, Result, RuleSet, Specification,
    Value,
};
use tracing::{debug, info, warn};

use crate::builder::RuleSetBuilder;
use crate::grammar::{self, CLASS_KEYWORD};
use crate::lex::{self, SourceLine};
use crate::selector::Selector;

/// Parses mamegen DSL text into an assembled [`Specification`].
pub fn parse_spec(text: &str) -> Result<Specification> {
    SpecParser::new().parse(text)
}

/// A brace-delimited block, either closed on its opening line or spanning many.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    /// Text before the opening brace.
    pub head: String,
    /// Line of the opening brace.
    pub line: usize,
    /// Line of the closing brace.
    pub end_line: usize,
    pub inline: bool,
    /// Non-blank body lines with the braces removed; nested blocks are kept verbatim.
    pub body: Vec<SourceLine>,
}

/// Line queue that lets a block push back text found after its closing brace.
#[derive(Debug, Default)]
pub struct LineCursor {
    lines: VecDeque<SourceLine>,
}

impl LineCursor {
    pub fn new(lines: Vec<SourceLine>) -> Self {
        Self {
            lines: lines.into(),
        }
    }

    pub fn next_line(&mut self) -> Option<SourceLine> {
        self.lines.pop_front()
    }

    fn push_front(&mut self, line: SourceLine) {
        self.lines.push_front(line);
    }

    /// Reads the block opened on `first`, consuming lines up to its matching `}`.
    pub fn read_block(&mut self, first: SourceLine) -> Result<Block> {
        let open = lex::find_unquoted(&first.text, '{').ok_or_else(|| {
            DslError::unexpected_token(first.number, "expected '{' on the same line")
        })?;
        let head = first.text[..open].trim().to_string();
        let mut body = Vec::new();
        let mut depth = 1usize;
        let mut current = SourceLine::new(first.number, &first.text[open + 1..]);
        loop {
            if let Some(close) = closing_brace(&current.text, &mut depth) {
                let inner = current.text[..close].trim();
                if !inner.is_empty() {
                    body.push(SourceLine::new(current.number, inner));
                }
                let rest = current.text[close + 1..].trim();
                if !rest.is_empty() {
                    self.push_front(SourceLine::new(current.number, rest));
                }
                return Ok(Block {
                    head,
                    line: first.number,
                    end_line: current.number,
                    inline: current.number == first.number,
                    body,
                });
            }
            let inner = current.text.trim();
            if !inner.is_empty() {
                body.push(SourceLine::new(current.number, inner));
            }
            current = self.next_line().ok_or_else(|| {
                DslError::unexpected_token(
                    first.number,
                    format!("missing '}}' for block '{head}'"),
                )
            })?;
        }
    }
}

fn closing_brace(text: &str, depth: &mut usize) -> Option<usize> {
    for (idx, ch) in lex::unquoted_chars(text) {
        match ch {
            '{' => *depth += 1,
            '}' => {
                *depth -= 1;
                if *depth == 0 {
                    return Some(idx);
                }
            }
            _ => {}
        }
    }
    None
}

fn leading_word(text: &str) -> &str {
    let text = text.trim_start();
    let end = text
        .find(|ch: char| !(ch.is_ascii_alphanumeric() || ch == '_'))
        .unwrap_or(text.len());
    &text[..end]
}

#[derive(Debug)]
struct SpecParser {
    spec: Specification,
    classes: BTreeMap<String, RuleSet>,
    header_declared: bool,
    keywords: Vec<&'static str>,
}

impl SpecParser {
    fn new() -> Self {
        Self {
            spec: Specification::default(),
            classes: BTreeMap::new(),
            header_declared: false,
            keywords: grammar::segment_keywords(),
        }
    }

    fn parse(mut self, text: &str) -> Result<Specification> {
        let lines = lex::source_lines(text);
        let line_count = text.lines().count();
        let mut cursor = LineCursor::new(lines);
        let first = cursor
            .next_line()
            .ok_or_else(|| DslError::parse(1, "empty DSL input"))?;
        if leading_word(&first.text) != "mamegen" {
            return Err(DslError::invalid_rule(
                first.number,
                "root 'mamegen { ... }' is required",
            ));
        }
        if lex::find_unquoted(&first.text, '{').is_none() {
            return Err(DslError::invalid_rule(
                first.number,
                "expected '{' after mamegen",
            ));
        }
        let root = cursor.read_block(first)?;
        if let Some(extra) = cursor.next_line() {
            warn!(line = extra.number, "ignoring text after the root block");
        }

        let mut sections = LineCursor::new(root.body);
        while let Some(line) = sections.next_line() {
            let keyword = leading_word(&line.text).to_string();
            debug!(line = line.number, section = %keyword, "reading section");
            match keyword.as_str() {
                "CONFIG" => {
                    let block = sections.read_block(line)?;
                    self.config(&block)?;
                }
                "HEADER" => {
                    let block = sections.read_block(line)?;
                    self.header(&block)?;
                }
                "CLASS" => {
                    let block = sections.read_block(line)?;
                    self.class_section(&block)?;
                }
                "REFERENCE" => {
                    let block = sections.read_block(line)?;
                    self.reference_section(&block)?;
                }
                "COLUMN_RULES" => {
                    let block = sections.read_block(line)?;
                    self.column_rules(&block)?;
                }
                _ => {
                    warn!(line = line.number, section = %keyword, "skipping unknown section");
                    if lex::find_unquoted(&line.text, '{').is_some() {
                        sections.read_block(line)?;
                    }
                }
            }
        }

        if !self.header_declared {
            return Err(DslError::parse(root.end_line, "HEADER section is required"));
        }

        info!(
            lines = line_count,
            columns = self.spec.columns.len(),
            reference_tables = self.spec.reference_tables.len(),
            classes = self.classes.len(),
            "parsed mamegen spec"
        );
        Ok(self.spec)
    }

    fn config(&mut self, block: &Block) -> Result<()> {
        for line in &block.body {
            lex::reject_assignment(&line.text, line.number)?;
            let tokens = lex::tokens(&line.text);
            for pair in tokens.chunks(2) {
                match pair {
                    [key, value] => self.set_config(key, value, line.number)?,
                    [key] => {
                        return Err(DslError::invalid_rule(
                            line.number,
                            format!("invalid CONFIG line: key '{key}' has no value"),
                        ));
                    }
                    _ => {}
                }
            }
        }
        Ok(())
    }

    fn set_config(&mut self, key: &str, raw: &str, line: usize) -> Result<()> {
        let value = match lex::quoted(raw) {
            Some(text) => ConfigValue::Text(text.to_string()),
            None => infer_config_value(raw),
        };
        match key.to_ascii_lowercase().as_str() {
            "type" => self.spec.format_type = value.to_string().to_uppercase(),
            "count" => {
                self.spec.row_count = value
                    .as_int()
                    .and_then(|count| u64::try_from(count).ok())
                    .ok_or_else(|| {
                        DslError::invalid_rule(line, "count must be a non-negative integer")
                    })?;
            }
            _ if key == "header" => {
                self.spec
                    .options
                    .insert("with_header".to_string(), ConfigValue::Bool(value.as_flag()));
            }
            _ => {
                self.spec.options.insert(key.to_string(), value);
            }
        }
        Ok(())
    }

    fn header(&mut self, block: &Block) -> Result<()> {
        if self.header_declared {
            return Err(DslError::invalid_rule(
                block.line,
                "HEADER may only be declared once",
            ));
        }
        let text = block
            .body
            .iter()
            .map(|line| line.text.as_str())
            .collect::<Vec<_>>()
            .join(" ");
        if text.trim().is_empty() {
            return Err(DslError::parse(block.line, "HEADER must contain a non-empty array"));
        }
        let names: Vec<String> = lex::split_bracket_items(&text, block.line)?
            .into_iter()
            .map(|item| item.text)
            .collect();
        if names.is_empty() {
            return Err(DslError::parse(block.line, "HEADER must contain a non-empty array"));
        }
        if names.iter().any(String::is_empty) {
            return Err(DslError::parse(block.line, "HEADER column names must not be empty"));
        }

        let mut duplicates: Vec<&str> = Vec::new();
        for (idx, name) in names.iter().enumerate() {
            if names[..idx].contains(name) && !duplicates.contains(&name.as_str()) {
                duplicates.push(name);
            }
        }
        if !duplicates.is_empty() {
            return Err(DslError::invalid_rule(
                block.line,
                format!("duplicate column names in HEADER: {}", duplicates.join(", ")),
            ));
        }

        self.spec.columns = names.iter().map(Column::new).collect();
        self.spec.header = names;
        self.header_declared = true;
        Ok(())
    }

    fn class_section(&mut self, block: &Block) -> Result<()> {
        let target = block.head["CLASS".len()..].trim();
        if !target.is_empty() {
            let name = lex::quoted(target).ok_or_else(|| {
                DslError::invalid_rule(block.line, format!("invalid CLASS name: {target}"))
            })?;
            let rules = self.rule_block(block)?;
            self.define_class(name, rules, block.line);
            return Ok(());
        }

        let mut entries = LineCursor::new(block.body.clone());
        while let Some(line) = entries.next_line() {
            let entry = entries.read_block(line)?;
            let name = lex::quoted(&entry.head).ok_or_else(|| {
                DslError::invalid_rule(entry.line, format!("invalid CLASS name: {}", entry.head))
            })?;
            let rules = self.rule_block(&entry)?;
            self.define_class(name, rules, entry.line);
        }
        Ok(())
    }

    fn define_class(&mut self, name: &str, rules: RuleSet, line: usize) {
        debug!(line, class = name, "defined class");
        if self.classes.insert(name.to_string(), rules).is_some() {
            warn!(line, class = name, "class redefined; later definition wins");
        }
    }

    fn reference_section(&mut self, block: &Block) -> Result<()> {
        let key = lex::quoted(&block.head["REFERENCE".len()..])
            .filter(|key| !key.is_empty())
            .ok_or_else(|| DslError::invalid_rule(block.line, "invalid REFERENCE header"))?
            .to_string();

        let mut entries = Vec::new();
        for line in &block.body {
            let tokens = lex::tokens(&line.text);
            if block.inline {
                for pair in tokens.chunks(2) {
                    entries.push(reference_entry(&key, pair, line.number)?);
                }
            } else {
                entries.push(reference_entry(&key, &tokens, line.number)?);
            }
        }
        if entries.is_empty() {
            return Err(DslError::invalid_rule(
                block.line,
                format!("REFERENCE \"{key}\" is empty"),
            ));
        }
        if self
            .spec
            .reference_tables
            .insert(key.clone(), ReferenceTable::new(entries))
            .is_some()
        {
            warn!(line = block.line, key = %key, "reference table redefined; later definition wins");
        }
        Ok(())
    }

    fn column_rules(&mut self, block: &Block) -> Result<()> {
        let mut entries = LineCursor::new(block.body.clone());
        while let Some(line) = entries.next_line() {
            let entry = entries.read_block(line)?;
            let targets = self.targets(&entry)?;
            let rules = self.rule_block(&entry)?;
            for name in &targets {
                if let Some(column) = self.spec.column_mut(name) {
                    column.rules = rules.clone();
                }
            }
            debug!(line = entry.line, columns = ?targets, "assigned column rules");
        }
        Ok(())
    }

    fn targets(&self, entry: &Block) -> Result<Vec<String>> {
        if let Some(name) = lex::quoted(&entry.head) {
            if !self.spec.header.iter().any(|header| header == name) {
                return Err(DslError::unknown_column(
                    entry.line,
                    format!("unknown column in COLUMN_RULES: \"{name}\""),
                ));
            }
            return Ok(vec![name.to_string()]);
        }
        match Selector::parse(&entry.head, entry.line)? {
            Some(selector) => selector.resolve(&self.spec.header, entry.line),
            None => Err(DslError::invalid_rule(
                entry.line,
                format!("unrecognized COLUMN_RULES entry: {}", entry.head),
            )),
        }
    }

    /// Builds the rule set of one block. Inline bodies hold a single setting.
    fn rule_block(&self, block: &Block) -> Result<RuleSet> {
        let mut builder = RuleSetBuilder::new();
        if block.inline {
            let text = block.body.first().map_or("", |line| line.text.as_str());
            let segments = lex::split_inline_rule_segments(text, &self.keywords);
            if segments.len() > 1 {
                return Err(DslError::invalid_rule(
                    block.line,
                    "inline rule must contain exactly one setting",
                ));
            }
            for segment in &segments {
                self.apply_rule_line(&mut builder, segment, block.line)?;
            }
        } else {
            for line in &block.body {
                self.apply_rule_line(&mut builder, &line.text, line.number)?;
            }
        }
        builder.finish(block.end_line)
    }

    fn apply_rule_line(&self, builder: &mut RuleSetBuilder, text: &str, line: usize) -> Result<()> {
        lex::reject_assignment(text, line)?;
        let text = text.trim();
        if text.split_whitespace().next() == Some(CLASS_KEYWORD) {
            let name = lex::unquote(&text[CLASS_KEYWORD.len()..]);
            match self.classes.get(name) {
                Some(template) => builder.apply_class(template),
                None => warn!(line, class = name, "ignoring unknown class"),
            }
            return Ok(());
        }
        if let Some(rule) = grammar::parse_rule_line(text, line)? {
            builder.apply(rule, line)?;
        }
        Ok(())
    }
}

fn infer_config_value(raw: &str) -> ConfigValue {
    match raw {
        "true" => ConfigValue::Bool(true),
        "false" => ConfigValue::Bool(false),
        _ if lex::is_int_literal(raw) => raw
            .parse::<i64>()
            .map(ConfigValue::Int)
            .unwrap_or_else(|_| ConfigValue::Text(raw.to_string())),
        _ => ConfigValue::Text(raw.to_string()),
    }
}

fn reference_entry(key: &str, tokens: &[&str], line: usize) -> Result<ReferenceEntry> {
    let (label, value) = match tokens {
        [label, value] => (*label, *value),
        [_] => {
            return Err(DslError::parse(
                line,
                format!("REFERENCE \"{key}\": missing value token"),
            ));
        }
        [] => {
            return Err(DslError::parse(
                line,
                format!("REFERENCE \"{key}\": expected quoted label"),
            ));
        }
        _ => {
            return Err(DslError::parse(
                line,
                format!("REFERENCE \"{key}\": extra tokens after value"),
            ));
        }
    };
    let label = lex::quoted(label)
        .filter(|label| !label.is_empty())
        .ok_or_else(|| {
            DslError::parse(line, format!("REFERENCE \"{key}\": expected quoted label"))
        })?;
    let value = if let Some(text) = lex::quoted(value) {
        Value::text(text)
    } else if lex::is_int_literal(value) {
        lex::infer_number(value, line)?
    } else if lex::is_float_literal(value) {
        lex::infer_number(value, line)?
    } else {
        return Err(DslError::parse(
            line,
            format!("REFERENCE \"{key}\": value must be number or quoted string"),
        ));
    };
    Ok(ReferenceEntry {
        label: label.to_string(),
        value,
    })
}
