//! Tokenizing helpers shared by the block parser and the rule grammar.
//!
//! Every helper is quote-aware: single- and double-quoted substrings are
//! opaque, and a backslash hides the next character from delimiter checks.

use std::sync::LazyLock;

use chrono::NaiveDate;
use mamegen_core::{DslError, Result, Value};
use regex::Regex;

static INT_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^-?\d+$").expect("int regex"));
static FLOAT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^-?(?:\d+\.\d*|\d*\.\d+)$").expect("float regex"));
static IDENT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("identifier regex"));

/// A non-blank source line with its 1-based line number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLine {
    pub number: usize,
    pub text: String,
}

impl SourceLine {
    pub fn new(number: usize, text: impl Into<String>) -> Self {
        Self {
            number,
            text: text.into(),
        }
    }
}

/// Returns `(byte_offset, char)` for every character outside quotes that is
/// not escaped. Quote delimiters themselves are not reported.
pub fn unquoted_chars(text: &str) -> Vec<(usize, char)> {
    let mut out = Vec::new();
    let mut quote: Option<char> = None;
    let mut escaped = false;
    for (idx, ch) in text.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        if ch == '\\' {
            escaped = true;
            continue;
        }
        match quote {
            Some(open) => {
                if ch == open {
                    quote = None;
                }
            }
            None if ch == '"' || ch == '\'' => quote = Some(ch),
            None => out.push((idx, ch)),
        }
    }
    out
}

/// Byte offset of the first unquoted `needle`.
pub fn find_unquoted(text: &str, needle: char) -> Option<usize> {
    unquoted_chars(text)
        .into_iter()
        .find(|(_, ch)| *ch == needle)
        .map(|(idx, _)| idx)
}

/// Removes `#` comments while keeping one output line per input line.
pub fn strip_comments(text: &str) -> String {
    text.lines()
        .map(|line| match find_unquoted(line, '#') {
            Some(idx) => line[..idx].trim_end(),
            None => line.trim_end(),
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Comment-stripped, non-blank lines with their original line numbers.
pub fn source_lines(text: &str) -> Vec<SourceLine> {
    strip_comments(text)
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(idx, line)| SourceLine::new(idx + 1, line))
        .collect()
}

/// Inner text of a single- or double-quoted literal.
pub fn quoted(text: &str) -> Option<&str> {
    let text = text.trim();
    let first = text.chars().next()?;
    if text.len() >= 2 && (first == '"' || first == '\'') && text.ends_with(first) {
        Some(&text[1..text.len() - 1])
    } else {
        None
    }
}

pub fn unquote(text: &str) -> &str {
    quoted(text).unwrap_or_else(|| text.trim())
}

pub fn is_int_literal(text: &str) -> bool {
    INT_RE.is_match(text)
}

pub fn is_float_literal(text: &str) -> bool {
    FLOAT_RE.is_match(text)
}

pub fn is_identifier(text: &str) -> bool {
    IDENT_RE.is_match(text)
}

/// Splits on unquoted whitespace, keeping quotes on the returned tokens.
pub fn tokens(text: &str) -> Vec<&str> {
    let mut out = Vec::new();
    let mut start = None;
    let mut quote: Option<char> = None;
    let mut escaped = false;
    for (idx, ch) in text.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match ch {
            '\\' => {
                escaped = true;
                start.get_or_insert(idx);
            }
            _ if quote == Some(ch) => quote = None,
            _ if quote.is_some() => {}
            '"' | '\'' => {
                quote = Some(ch);
                start.get_or_insert(idx);
            }
            _ if ch.is_whitespace() => {
                if let Some(begin) = start.take() {
                    out.push(&text[begin..idx]);
                }
            }
            _ => {
                start.get_or_insert(idx);
            }
        }
    }
    if let Some(begin) = start {
        out.push(&text[begin..]);
    }
    out
}

/// Splits on every unquoted `separator`.
pub fn split_unquoted(text: &str, separator: char) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut last = 0;
    for (idx, ch) in unquoted_chars(text) {
        if ch == separator {
            parts.push(&text[last..idx]);
            last = idx + ch.len_utf8();
        }
    }
    parts.push(&text[last..]);
    parts
}

/// Splits `a..b` on the first unquoted range operator.
pub fn split_range(text: &str) -> Option<(&str, &str)> {
    let positions = unquoted_chars(text);
    positions
        .windows(2)
        .find(|pair| pair[0].1 == '.' && pair[1].1 == '.' && pair[1].0 == pair[0].0 + 1)
        .map(|pair| (text[..pair[0].0].trim(), text[pair[0].0 + 2..].trim()))
}

/// One element of a bracketed list, before typing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListItem {
    pub text: String,
    pub quoted: bool,
}

impl ListItem {
    /// Integer or float when the bare text is a numeric literal, else a string.
    pub fn to_value(&self) -> Value {
        if !self.quoted {
            if is_int_literal(&self.text) {
                if let Ok(value) = self.text.parse::<i64>() {
                    return Value::Int(value);
                }
            } else if is_float_literal(&self.text) {
                if let Ok(value) = self.text.parse::<f64>() {
                    return Value::Float(value);
                }
            }
        }
        Value::Text(self.text.clone())
    }
}

/// Parses `[v1, v2, ...]` into raw items; `[]` yields an empty list.
pub fn split_bracket_items(text: &str, line: usize) -> Result<Vec<ListItem>> {
    let trimmed = text.trim();
    let inner = trimmed
        .strip_prefix('[')
        .and_then(|rest| rest.strip_suffix(']'))
        .ok_or_else(|| DslError::parse(line, format!("expected a [v1, v2, ...] list: {trimmed}")))?;
    if inner.trim().is_empty() {
        return Ok(Vec::new());
    }
    split_unquoted(inner, ',')
        .into_iter()
        .map(|part| {
            let part = part.trim();
            if part.is_empty() {
                return Err(DslError::parse(line, format!("empty element in list: {trimmed}")));
            }
            Ok(match quoted(part) {
                Some(inner) => ListItem {
                    text: inner.to_string(),
                    quoted: true,
                },
                None => ListItem {
                    text: part.to_string(),
                    quoted: false,
                },
            })
        })
        .collect()
}

/// Parses `[v1, v2, ...]` into typed values.
pub fn split_bracket_list(text: &str, line: usize) -> Result<Vec<Value>> {
    Ok(split_bracket_items(text, line)?
        .iter()
        .map(ListItem::to_value)
        .collect())
}

fn is_word_char(ch: char) -> bool {
    ch.is_alphanumeric() || ch == '_'
}

/// Splits one inline rule body at the start of each known keyword.
///
/// `keywords` should be ordered longest first. Quoted text and bracketed
/// lists never start a new segment.
pub fn split_inline_rule_segments(text: &str, keywords: &[&str]) -> Vec<String> {
    let mut boundaries = Vec::new();
    let mut quote: Option<char> = None;
    let mut escaped = false;
    let mut depth = 0usize;
    let mut previous: Option<char> = None;
    for (idx, ch) in text.char_indices() {
        let prior = previous.replace(ch);
        if escaped {
            escaped = false;
            continue;
        }
        if ch == '\\' {
            escaped = true;
            continue;
        }
        if let Some(open) = quote {
            if ch == open {
                quote = None;
            }
            continue;
        }
        match ch {
            '"' | '\'' => quote = Some(ch),
            '[' => depth += 1,
            ']' => depth = depth.saturating_sub(1),
            _ if depth == 0 && !prior.is_some_and(is_word_char) => {
                let rest = &text[idx..];
                let starts_keyword = keywords.iter().any(|keyword| {
                    rest.starts_with(keyword)
                        && !rest[keyword.len()..].chars().next().is_some_and(is_word_char)
                });
                if starts_keyword {
                    boundaries.push(idx);
                }
            }
            _ => {}
        }
    }

    if boundaries.is_empty() {
        let whole = text.trim();
        return if whole.is_empty() {
            Vec::new()
        } else {
            vec![whole.to_string()]
        };
    }
    let mut segments = Vec::new();
    let leading = text[..boundaries[0]].trim();
    if !leading.is_empty() {
        segments.push(leading.to_string());
    }
    for (pos, start) in boundaries.iter().enumerate() {
        let end = boundaries.get(pos + 1).copied().unwrap_or(text.len());
        let segment = text[*start..end].trim();
        if !segment.is_empty() {
            segments.push(segment.to_string());
        }
    }
    segments
}

/// Integer first, then float; anything else is a parse error.
pub fn infer_number(text: &str, line: usize) -> Result<Value> {
    let text = text.trim();
    if let Ok(value) = text.parse::<i64>() {
        return Ok(Value::Int(value));
    }
    match text.parse::<f64>() {
        Ok(value) if value.is_finite() => Ok(Value::Float(value)),
        _ => Err(DslError::parse(line, format!("invalid numeric literal: {text}"))),
    }
}

/// Validates a quoted `YYYY-MM-DD` literal.
pub fn validate_ymd(text: &str, line: usize) -> Result<NaiveDate> {
    let inner = quoted(text).ok_or_else(|| {
        DslError::invalid_rule(line, "date must be enclosed in quotes, e.g. \"2025-09-17\"")
    })?;
    NaiveDate::parse_from_str(inner, "%Y-%m-%d").map_err(|_| {
        DslError::invalid_rule(line, format!("invalid date: {inner} (expected YYYY-MM-DD)"))
    })
}

/// Rejects `:` and `=` outside quoted substrings.
pub fn reject_assignment(text: &str, line: usize) -> Result<()> {
    if unquoted_chars(text)
        .iter()
        .any(|(_, ch)| *ch == ':' || *ch == '=')
    {
        return Err(DslError::invalid_rule(line, "':' and '=' are not allowed"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use mamegen_core::DslErrorKind;

    use super::*;

    #[test]
    fn strip_comments_keeps_line_count() {
        let text = "a # one\n  # two\nb \"#not\" # three";
        let stripped = strip_comments(text);
        assert_eq!(stripped, "a\n\nb \"#not\"");
        let lines = source_lines(text);
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[1].number, 3);
    }

    #[test]
    fn bracket_list_types_elements() {
        let values = split_bracket_list(r#"[1, 2.5, "a, b", 'c', bare]"#, 1).expect("list");
        assert_eq!(
            values,
            vec![
                Value::Int(1),
                Value::Float(2.5),
                Value::text("a, b"),
                Value::text("c"),
                Value::text("bare"),
            ]
        );
        assert!(split_bracket_list("[]", 1).expect("empty").is_empty());
        let quoted_number = split_bracket_list(r#"["1"]"#, 1).expect("quoted");
        assert_eq!(quoted_number, vec![Value::text("1")]);
    }

    #[test]
    fn bracket_list_requires_brackets() {
        let err = split_bracket_list("1, 2", 4).expect_err("missing brackets");
        assert_eq!(err.kind(), DslErrorKind::Parse);
        assert_eq!(err.line(), 4);
        let err = split_bracket_list("[1,,2]", 5).expect_err("empty element");
        assert_eq!(err.kind(), DslErrorKind::Parse);
    }

    #[test]
    fn inline_segments_prefer_longest_keyword() {
        let keywords = ["date_range", "allow_null", "datetime", "date", "seq", "fixed"];
        let segments = split_inline_rule_segments(
            r#"date_range "2024-01-01".."2024-12-31" allow_null false"#,
            &keywords,
        );
        assert_eq!(
            segments,
            vec![
                r#"date_range "2024-01-01".."2024-12-31""#.to_string(),
                "allow_null false".to_string()
            ]
        );
    }

    #[test]
    fn inline_segments_ignore_quoted_and_bracketed_keywords() {
        let keywords = ["fixed", "seq", "join", "date"];
        assert_eq!(
            split_inline_rule_segments(r#"fixed "seq 1..""#, &keywords),
            vec![r#"fixed "seq 1..""#.to_string()]
        );
        assert_eq!(
            split_inline_rule_segments(r#"join ["on ", date]"#, &keywords),
            vec![r#"join ["on ", date]"#.to_string()]
        );
        assert_eq!(
            split_inline_rule_segments("seq_no", &keywords),
            vec!["seq_no".to_string()]
        );
        assert!(split_inline_rule_segments("   ", &keywords).is_empty());
    }

    #[test]
    fn infer_number_tries_int_then_float() {
        assert_eq!(infer_number("42", 1).expect("int"), Value::Int(42));
        assert_eq!(infer_number("-1.5", 1).expect("float"), Value::Float(-1.5));
        let err = infer_number("abc", 9).expect_err("not a number");
        assert_eq!(err.kind(), DslErrorKind::Parse);
        assert!(infer_number("inf", 1).is_err());
    }

    #[test]
    fn validate_ymd_checks_quotes_and_calendar() {
        assert_eq!(
            validate_ymd("\"2024-02-29\"", 1).expect("leap day"),
            NaiveDate::from_ymd_opt(2024, 2, 29).expect("date")
        );
        assert!(validate_ymd("'2024-01-31'", 1).is_ok());
        assert!(validate_ymd("2024-01-31", 1).is_err());
        let err = validate_ymd("\"2023-02-29\"", 3).expect_err("not a leap year");
        assert_eq!(err.kind(), DslErrorKind::InvalidRule);
    }

    #[test]
    fn assignment_characters_only_count_outside_quotes() {
        assert!(reject_assignment("date_format \"HH:mm\"", 1).is_ok());
        assert!(reject_assignment("seq = 1", 1).is_err());
        assert!(reject_assignment("type: CSV", 1).is_err());
    }

    #[test]
    fn tokens_and_ranges_respect_quotes() {
        assert_eq!(
            tokens(r#"title "My data" count 3"#),
            vec!["title", "\"My data\"", "count", "3"]
        );
        assert_eq!(
            split_range(r#""a..b".."c""#),
            Some(("\"a..b\"", "\"c\""))
        );
        assert_eq!(split_range("1.."), Some(("1", "")));
        assert_eq!(split_range("1.5"), None);
    }
}
