//! `INDEX`/`INDICES`/`LABEL`/`LABELS` heads and their expansion against the header.

use std::sync::LazyLock;

use mamegen_core::{DslError, Result};
use regex::Regex;

use crate::lex;

const QUOTED: &str = r#"("[^"]*"|'[^']*')"#;

static INDEX_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^INDEX\s+(\d+)$").expect("INDEX regex"));
static INDICES_RANGE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^INDICES\s+(\d+)\s*\.\.\s*(\d+)$").expect("INDICES range regex"));
static INDICES_LIST_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^INDICES\s*\[([^\]]*)\]$").expect("INDICES list regex"));
static INDICES_SINGLE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^INDICES\s+(\d+)$").expect("INDICES regex"));
static LABEL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(&format!(r"^LABEL\s+{QUOTED}$")).expect("LABEL regex"));
static LABELS_LIST_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^LABELS\s*(\[.*\])$").expect("LABELS list regex"));
static LABELS_RANGE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"^LABELS\s+{QUOTED}\s*\.\.\s*{QUOTED}$")).expect("LABELS range regex")
});

const SELECTOR_KEYWORDS: [&str; 4] = ["INDICES", "INDEX", "LABELS", "LABEL"];

/// A parsed selector head.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selector {
    Index(usize),
    IndexRange(usize, usize),
    Indices(Vec<usize>),
    Label(String),
    Labels(Vec<String>),
    LabelRange(String, String),
}

impl Selector {
    /// Parses a block head. Returns `None` when the head is not a selector.
    pub fn parse(head: &str, line: usize) -> Result<Option<Self>> {
        let head = head.trim();
        let keyword = head
            .split(|ch: char| ch.is_whitespace() || ch == '[')
            .next()
            .unwrap_or_default();
        if !SELECTOR_KEYWORDS.contains(&keyword) {
            return Ok(None);
        }

        if let Some(caps) = INDEX_RE.captures(head) {
            return Ok(Some(Selector::Index(index(&caps[1], line)?)));
        }
        if let Some(caps) = INDICES_RANGE_RE.captures(head) {
            return Ok(Some(Selector::IndexRange(
                index(&caps[1], line)?,
                index(&caps[2], line)?,
            )));
        }
        if let Some(caps) = INDICES_LIST_RE.captures(head) {
            return parse_index_list(&caps[1], line).map(|list| Some(Selector::Indices(list)));
        }
        if let Some(caps) = INDICES_SINGLE_RE.captures(head) {
            return Ok(Some(Selector::Indices(vec![index(&caps[1], line)?])));
        }
        if let Some(caps) = LABEL_RE.captures(head) {
            return Ok(Some(Selector::Label(lex::unquote(&caps[1]).to_string())));
        }
        if let Some(caps) = LABELS_RANGE_RE.captures(head) {
            return Ok(Some(Selector::LabelRange(
                lex::unquote(&caps[1]).to_string(),
                lex::unquote(&caps[2]).to_string(),
            )));
        }
        if let Some(caps) = LABELS_LIST_RE.captures(head) {
            return parse_label_list(&caps[1], line).map(|list| Some(Selector::Labels(list)));
        }
        Err(DslError::invalid_rule(line, format!("invalid selector: {head}")))
    }

    /// Expands the selector into header names, in selector order.
    pub fn resolve(&self, header: &[String], line: usize) -> Result<Vec<String>> {
        match self {
            Selector::Index(index) => {
                let name = at(header, *index)
                    .ok_or_else(|| DslError::invalid_rule(line, format!("INDEX out of range: {index}")))?;
                Ok(vec![name])
            }
            Selector::IndexRange(start, end) => {
                let in_bounds = |value: usize| value >= 1 && value <= header.len();
                if !in_bounds(*start) || !in_bounds(*end) {
                    return Err(DslError::invalid_rule(
                        line,
                        format!("INDICES range out of HEADER: {start}..{end}"),
                    ));
                }
                if start > end {
                    return Err(DslError::invalid_rule(
                        line,
                        format!("INDICES invalid range: {start}..{end}"),
                    ));
                }
                Ok(header[start - 1..*end].to_vec())
            }
            Selector::Indices(indices) => indices
                .iter()
                .map(|index| {
                    at(header, *index).ok_or_else(|| {
                        DslError::invalid_rule(line, format!("INDICES item out of range: {index}"))
                    })
                })
                .collect(),
            Selector::Label(name) => {
                position(header, name, line)?;
                Ok(vec![name.clone()])
            }
            Selector::Labels(names) => names
                .iter()
                .map(|name| position(header, name, line).map(|_| name.clone()))
                .collect(),
            Selector::LabelRange(start, end) => {
                let missing: Vec<&str> = [start, end]
                    .into_iter()
                    .filter(|name| !header.contains(*name))
                    .map(String::as_str)
                    .collect();
                if !missing.is_empty() {
                    return Err(DslError::unknown_column(
                        line,
                        format!("unknown column label: {}", missing.join(", ")),
                    ));
                }
                let from = position(header, start, line)?;
                let to = position(header, end, line)?;
                if to < from {
                    return Err(DslError::invalid_rule(
                        line,
                        format!("LABELS range invalid: \"{start}\"..\"{end}\""),
                    ));
                }
                Ok(header[from..=to].to_vec())
            }
        }
    }
}

fn at(header: &[String], index: usize) -> Option<String> {
    index
        .checked_sub(1)
        .and_then(|zero_based| header.get(zero_based))
        .cloned()
}

fn position(header: &[String], name: &str, line: usize) -> Result<usize> {
    header
        .iter()
        .position(|candidate| candidate == name)
        .ok_or_else(|| DslError::unknown_column(line, format!("unknown column label: \"{name}\"")))
}

fn index(text: &str, line: usize) -> Result<usize> {
    text.parse::<usize>()
        .map_err(|_| DslError::invalid_rule(line, format!("index out of range: {text}")))
}

fn parse_index_list(body: &str, line: usize) -> Result<Vec<usize>> {
    let mut items = Vec::new();
    for token in body.split(',').map(str::trim).filter(|token| !token.is_empty()) {
        if !lex::is_int_literal(token) {
            return Err(DslError::invalid_rule(
                line,
                format!("INDICES expects integer list: '{token}'"),
            ));
        }
        // Negative positions can never match a header column.
        let value = token.parse::<usize>().map_err(|_| {
            DslError::invalid_rule(line, format!("INDICES item out of range: {token}"))
        })?;
        items.push(value);
    }
    if items.is_empty() {
        return Err(DslError::invalid_rule(line, "INDICES list must not be empty"));
    }
    Ok(items)
}

fn parse_label_list(body: &str, line: usize) -> Result<Vec<String>> {
    let items = lex::split_bracket_items(body, line)
        .map_err(|err| DslError::invalid_rule(line, err.message().to_string()))?;
    if items.is_empty() {
        return Err(DslError::invalid_rule(line, "LABELS list must not be empty"));
    }
    items
        .into_iter()
        .map(|item| {
            if item.text.is_empty() {
                Err(DslError::invalid_rule(line, "empty label in LABELS list"))
            } else {
                Ok(item.text)
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use mamegen_core::DslErrorKind;

    use super::*;

    fn header() -> Vec<String> {
        ["a", "b", "c", "d", "e"].iter().map(|s| s.to_string()).collect()
    }

    fn expand(head: &str) -> Result<Vec<String>> {
        let selector = Selector::parse(head, 2)?.expect("selector head");
        selector.resolve(&header(), 2)
    }

    #[test]
    fn index_forms() {
        assert_eq!(expand("INDEX 1").expect("index"), vec!["a"]);
        assert_eq!(expand("INDICES 2..4").expect("range"), vec!["b", "c", "d"]);
        assert_eq!(expand("INDICES [5, 1]").expect("list"), vec!["e", "a"]);
        assert_eq!(expand("INDICES 3").expect("single"), vec!["c"]);
    }

    #[test]
    fn index_errors_are_invalid_rules() {
        for head in [
            "INDEX 0",
            "INDEX 6",
            "INDICES 4..2",
            "INDICES 0..2",
            "INDICES [1, 9]",
            "INDICES [x]",
            "INDICES [-1]",
        ] {
            let err = expand(head).expect_err(head);
            assert_eq!(err.kind(), DslErrorKind::InvalidRule, "{head}");
        }
    }

    #[test]
    fn label_forms() {
        assert_eq!(expand(r#"LABEL "c""#).expect("label"), vec!["c"]);
        assert_eq!(expand(r#"LABELS ["e", 'a']"#).expect("labels"), vec!["e", "a"]);
        assert_eq!(expand(r#"LABELS "b".."d""#).expect("label range"), vec!["b", "c", "d"]);
    }

    #[test]
    fn label_errors() {
        assert_eq!(
            expand(r#"LABEL "z""#).expect_err("unknown").kind(),
            DslErrorKind::UnknownColumn
        );
        assert_eq!(
            expand(r#"LABELS ["a", "z"]"#).expect_err("unknown").kind(),
            DslErrorKind::UnknownColumn
        );
        assert_eq!(
            expand(r#"LABELS "d".."b""#).expect_err("reversed").kind(),
            DslErrorKind::InvalidRule
        );
        assert_eq!(
            expand(r#"LABELS "a".."z""#).expect_err("unknown end").kind(),
            DslErrorKind::UnknownColumn
        );
    }

    #[test]
    fn non_selector_heads_are_passed_through() {
        assert_eq!(Selector::parse(r#""name""#, 1).expect("head"), None);
        assert!(Selector::parse("INDEX one", 1).is_err());
    }

    #[test]
    fn selectors_against_empty_header_fail() {
        let selector = Selector::parse("INDEX 1", 1).expect("parse").expect("selector");
        assert_eq!(
            selector.resolve(&[], 1).expect_err("no header").kind(),
            DslErrorKind::InvalidRule
        );
    }
}
