//! Per-keyword rule parsers and the keyword dispatch table.

use mamegen_core::{
    Charset, CopySource, DateRange, DslError, JoinItem, NumericRange, OutputSide, Result, Value,
    ValueSource,
};
use tracing::warn;

use crate::lex;

/// Normalized result of parsing one rule line.
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedRule {
    AllowNull(bool),
    NullProbability(f64),
    Seq { start: i64, end: Option<i64> },
    Digits(usize),
    Step(i64),
    Charset(Charset),
    Length(usize),
    Enum(Vec<Value>),
    Fixed(Value),
    Copy(CopySource),
    Join(Vec<JoinItem>),
    Range(NumericRange),
    Date,
    DateTime,
    DateRange(DateRange),
    DateFormat(String),
    Reference(String),
    Output(OutputSide),
    ValueSource(ValueSource),
}

/// Signature shared by every rule parser: `(line body, line number)`.
pub type RuleParser = fn(&str, usize) -> Result<ParsedRule>;

/// Keyword dispatch table.
pub const RULE_TABLE: &[(&str, RuleParser)] = &[
    ("allow_null", parse_allow_null),
    ("null_probability", parse_null_probability),
    ("seq", parse_seq),
    ("digits", parse_digits),
    ("step", parse_step),
    ("charset", parse_charset),
    ("length", parse_length),
    ("enum", parse_enum),
    ("fixed", parse_fixed),
    ("copy", parse_copy),
    ("join", parse_join),
    ("range", parse_range),
    ("date_range", parse_date_range),
    ("date_format", parse_date_format),
    ("date", parse_date),
    ("datetime", parse_datetime),
    ("reference", parse_reference),
    ("output", parse_output),
    ("value_source", parse_value_source),
];

/// Keyword that pulls a `CLASS` template into a rule block.
pub const CLASS_KEYWORD: &str = "class";

pub fn lookup(keyword: &str) -> Option<RuleParser> {
    RULE_TABLE
        .iter()
        .find(|(name, _)| *name == keyword)
        .map(|(_, parser)| *parser)
}

/// Every keyword that can start an inline segment, longest first.
pub fn segment_keywords() -> Vec<&'static str> {
    let mut keywords: Vec<&'static str> = RULE_TABLE.iter().map(|(name, _)| *name).collect();
    keywords.push(CLASS_KEYWORD);
    keywords.sort_by(|a, b| b.len().cmp(&a.len()).then(a.cmp(b)));
    keywords
}

/// Parses one rule line. Unknown keywords are skipped and yield `None`.
pub fn parse_rule_line(body: &str, line: usize) -> Result<Option<ParsedRule>> {
    let body = body.trim();
    let Some(keyword) = body.split_whitespace().next() else {
        return Ok(None);
    };
    match lookup(keyword) {
        Some(parser) => parser(body, line).map(Some),
        None => {
            warn!(line, keyword, "ignoring unknown rule keyword");
            Ok(None)
        }
    }
}

/// Argument text after `keyword`, which must be followed by whitespace.
fn rule_argument<'a>(body: &'a str, keyword: &str, line: usize, usage: &str) -> Result<&'a str> {
    body.trim()
        .strip_prefix(keyword)
        .filter(|rest| rest.starts_with(char::is_whitespace))
        .map(str::trim)
        .filter(|rest| !rest.is_empty())
        .ok_or_else(|| DslError::invalid_rule(line, format!("{keyword} syntax: '{usage}'")))
}

fn positive_integer(arg: &str, keyword: &str, line: usize) -> Result<usize> {
    if !arg.chars().all(|ch| ch.is_ascii_digit()) {
        return Err(DslError::invalid_rule(
            line,
            format!("{keyword} syntax: '{keyword} <n>' (n must be positive integer)"),
        ));
    }
    match arg.parse::<usize>() {
        Ok(value) if value > 0 => Ok(value),
        Ok(_) => Err(DslError::invalid_rule(line, format!("{keyword} must be > 0"))),
        Err(_) => Err(DslError::invalid_rule(line, format!("{keyword} is too large: {arg}"))),
    }
}

fn signed_integer(text: &str, what: &str, line: usize) -> Result<i64> {
    if !lex::is_int_literal(text) {
        return Err(DslError::invalid_rule(line, format!("{what} must be an integer")));
    }
    text.parse::<i64>()
        .map_err(|_| DslError::invalid_rule(line, format!("{what} is out of range: {text}")))
}

fn number(text: &str, message: &str, line: usize) -> Result<Value> {
    lex::infer_number(text, line).map_err(|_| DslError::invalid_rule(line, message))
}

fn bare_keyword(body: &str, keyword: &str, line: usize, usage: &str) -> Result<()> {
    if body.trim() == keyword {
        Ok(())
    } else {
        Err(DslError::invalid_rule(line, format!("{keyword} syntax: {usage}")))
    }
}

pub fn parse_allow_null(body: &str, line: usize) -> Result<ParsedRule> {
    let arg = rule_argument(body, "allow_null", line, "allow_null true|false")?;
    match arg.to_ascii_lowercase().as_str() {
        "true" => Ok(ParsedRule::AllowNull(true)),
        "false" => Ok(ParsedRule::AllowNull(false)),
        _ => Err(DslError::invalid_rule(line, "allow_null must be true/false")),
    }
}

pub fn parse_null_probability(body: &str, line: usize) -> Result<ParsedRule> {
    let arg = rule_argument(body, "null_probability", line, "null_probability <0..1>")?;
    let probability = match number(arg, "null_probability must be a number", line)? {
        Value::Int(value) => value as f64,
        Value::Float(value) => value,
        _ => return Err(DslError::invalid_rule(line, "null_probability must be a number")),
    };
    if !(0.0..=1.0).contains(&probability) {
        return Err(DslError::invalid_rule(
            line,
            "null_probability must be between 0 and 1",
        ));
    }
    Ok(ParsedRule::NullProbability(probability))
}

pub fn parse_seq(body: &str, line: usize) -> Result<ParsedRule> {
    let arg = rule_argument(body, "seq", line, "seq <start>' or 'seq <start>..<end>")?;
    let Some((start, end)) = lex::split_range(arg) else {
        let start = signed_integer(arg, "seq start", line)?;
        return Ok(ParsedRule::Seq { start, end: None });
    };
    let start = signed_integer(start, "seq start", line)?;
    if end.is_empty() {
        return Ok(ParsedRule::Seq { start, end: None });
    }
    let end = signed_integer(end, "seq end", line)?;
    if start > end {
        return Err(DslError::invalid_rule(line, "seq start must be <= end"));
    }
    Ok(ParsedRule::Seq {
        start,
        end: Some(end),
    })
}

pub fn parse_digits(body: &str, line: usize) -> Result<ParsedRule> {
    let arg = rule_argument(body, "digits", line, "digits <n>")?;
    positive_integer(arg, "digits", line).map(ParsedRule::Digits)
}

pub fn parse_step(body: &str, line: usize) -> Result<ParsedRule> {
    let arg = rule_argument(body, "step", line, "step <n>")?;
    let step = positive_integer(arg, "step", line)?;
    i64::try_from(step)
        .map(ParsedRule::Step)
        .map_err(|_| DslError::invalid_rule(line, format!("step is too large: {arg}")))
}

pub fn parse_charset(body: &str, line: usize) -> Result<ParsedRule> {
    let arg = rule_argument(
        body,
        "charset",
        line,
        "charset alphabet|lower|upper|number|hex|symbol",
    )?;
    let name = arg.to_ascii_lowercase();
    Charset::from_name(&name).map(ParsedRule::Charset).ok_or_else(|| {
        let allowed: Vec<&str> = Charset::ALL.iter().map(|charset| charset.name()).collect();
        DslError::invalid_rule(
            line,
            format!("unsupported charset '{name}' (allowed: {})", allowed.join(", ")),
        )
    })
}

pub fn parse_length(body: &str, line: usize) -> Result<ParsedRule> {
    let arg = rule_argument(body, "length", line, "length <n>")?;
    positive_integer(arg, "length", line).map(ParsedRule::Length)
}

pub fn parse_enum(body: &str, line: usize) -> Result<ParsedRule> {
    let arg = rule_argument(body, "enum", line, "enum [v1,v2,...]")?;
    if !(arg.starts_with('[') && arg.ends_with(']')) {
        return Err(DslError::invalid_rule(line, "enum syntax: 'enum [v1,v2,...]'"));
    }
    let values = lex::split_bracket_list(arg, line)?;
    if values.is_empty() {
        return Err(DslError::invalid_rule(line, "enum requires non-empty list"));
    }
    Ok(ParsedRule::Enum(values))
}

pub fn parse_fixed(body: &str, line: usize) -> Result<ParsedRule> {
    let arg = rule_argument(body, "fixed", line, "fixed <value>")?;
    if let Some(text) = lex::quoted(arg) {
        return Ok(ParsedRule::Fixed(Value::text(text)));
    }
    number(arg, "fixed value must be a number or a quoted string", line).map(ParsedRule::Fixed)
}

pub fn parse_copy(body: &str, line: usize) -> Result<ParsedRule> {
    let arg = rule_argument(body, "copy", line, "copy \"label\"' or 'copy <index>")?;
    if let Some(label) = lex::quoted(arg) {
        return Ok(ParsedRule::Copy(CopySource::Label(label.to_string())));
    }
    if lex::is_int_literal(arg) {
        return match arg.parse::<i64>() {
            Ok(index) if index >= 1 => usize::try_from(index)
                .map(|index| ParsedRule::Copy(CopySource::Index(index)))
                .map_err(|_| DslError::invalid_rule(line, "copy index is too large")),
            Ok(_) => Err(DslError::invalid_rule(line, "copy index must be >= 1")),
            Err(_) => Err(DslError::invalid_rule(line, "copy index is too large")),
        };
    }
    Err(DslError::invalid_rule(
        line,
        "copy arg must be \"label\" or integer",
    ))
}

pub fn parse_join(body: &str, line: usize) -> Result<ParsedRule> {
    let arg = rule_argument(body, "join", line, "join [\"literal\", column, ...]")?;
    let items = lex::split_bracket_items(arg, line)
        .map_err(|err| DslError::invalid_rule(line, format!("join syntax error: {}", err.message())))?;
    items
        .into_iter()
        .map(|item| {
            if item.quoted {
                Ok(JoinItem::Literal(item.text))
            } else if lex::is_identifier(&item.text) {
                Ok(JoinItem::Column(item.text))
            } else {
                Err(DslError::invalid_rule(
                    line,
                    format!("join syntax error: invalid identifier: {}", item.text),
                ))
            }
        })
        .collect::<Result<Vec<_>>>()
        .map(ParsedRule::Join)
}

pub fn parse_range(body: &str, line: usize) -> Result<ParsedRule> {
    let arg = rule_argument(body, "range", line, "range <min>..<max>' or 'range <min>")?;
    let Some((min, max)) = lex::split_range(arg) else {
        let range = match number(arg, "range start must be a valid number", line)? {
            Value::Int(min) => NumericRange::Int { min, max: None },
            Value::Float(min) => NumericRange::Float { min, max: None },
            _ => return Err(DslError::invalid_rule(line, "range start must be a valid number")),
        };
        return Ok(ParsedRule::Range(range));
    };
    let usage = "range syntax: range <num>..<num>";
    let range = match (number(min, usage, line)?, number(max, usage, line)?) {
        (Value::Int(min), Value::Int(max)) => {
            if min > max {
                return Err(DslError::invalid_rule(
                    line,
                    "range lower bound must be <= upper bound",
                ));
            }
            NumericRange::Int {
                min,
                max: Some(max),
            }
        }
        (min, max) => {
            let (min, max) = (as_float(&min), as_float(&max));
            if min > max {
                return Err(DslError::invalid_rule(
                    line,
                    "range lower bound must be <= upper bound",
                ));
            }
            if !(max - min).is_finite() {
                return Err(DslError::invalid_rule(line, "range span is too large"));
            }
            NumericRange::Float {
                min,
                max: Some(max),
            }
        }
    };
    Ok(ParsedRule::Range(range))
}

fn as_float(value: &Value) -> f64 {
    match value {
        Value::Int(value) => *value as f64,
        Value::Float(value) => *value,
        _ => 0.0,
    }
}

pub fn parse_date_range(body: &str, line: usize) -> Result<ParsedRule> {
    let usage = "date_range \"YYYY-MM-DD\"..\"YYYY-MM-DD\"";
    let arg = rule_argument(body, "date_range", line, usage)?;
    let (start, end) = lex::split_range(arg)
        .filter(|(start, end)| !start.is_empty() && !end.is_empty())
        .ok_or_else(|| DslError::invalid_rule(line, format!("date_range syntax: {usage}")))?;
    let start = lex::validate_ymd(start, line)?;
    let end = lex::validate_ymd(end, line)?;
    if start > end {
        return Err(DslError::invalid_rule(line, "date_range start must be <= end"));
    }
    Ok(ParsedRule::DateRange(DateRange { start, end }))
}

pub fn parse_date_format(body: &str, line: usize) -> Result<ParsedRule> {
    let arg = rule_argument(body, "date_format", line, "date_format \"YYYY-MM-DD\"")?;
    match lex::quoted(arg) {
        Some(pattern) if !pattern.is_empty() => Ok(ParsedRule::DateFormat(pattern.to_string())),
        _ => Err(DslError::invalid_rule(
            line,
            "date_format pattern must be a non-empty quoted string",
        )),
    }
}

pub fn parse_date(body: &str, line: usize) -> Result<ParsedRule> {
    bare_keyword(body, "date", line, "just 'date' (use date_range for bounds)")?;
    Ok(ParsedRule::Date)
}

pub fn parse_datetime(body: &str, line: usize) -> Result<ParsedRule> {
    bare_keyword(body, "datetime", line, "just 'datetime'")?;
    Ok(ParsedRule::DateTime)
}

pub fn parse_reference(body: &str, line: usize) -> Result<ParsedRule> {
    let arg = rule_argument(body, "reference", line, "reference \"KEY\"")?;
    let key = lex::quoted(arg).ok_or_else(|| {
        DslError::invalid_rule(line, "reference key must be enclosed in quotes")
    })?;
    if key.is_empty() {
        return Err(DslError::invalid_rule(line, "reference key must not be empty"));
    }
    Ok(ParsedRule::Reference(key.to_string()))
}

pub fn parse_output(body: &str, line: usize) -> Result<ParsedRule> {
    match rule_argument(body, "output", line, "output label|value")? {
        "label" => Ok(ParsedRule::Output(OutputSide::Label)),
        "value" => Ok(ParsedRule::Output(OutputSide::Value)),
        _ => Err(DslError::invalid_rule(line, "output syntax: output label|value")),
    }
}

pub fn parse_value_source(body: &str, line: usize) -> Result<ParsedRule> {
    let usage = "value_source syntax: value_source or value_source \"colname\"";
    if body.trim() == "value_source" {
        return Ok(ParsedRule::ValueSource(ValueSource::Auto));
    }
    let arg = rule_argument(body, "value_source", line, "value_source \"colname\"")?;
    let column = lex::quoted(arg).ok_or_else(|| DslError::invalid_rule(line, usage))?;
    if column.is_empty() {
        return Err(DslError::invalid_rule(
            line,
            "value_source column name must not be empty",
        ));
    }
    Ok(ParsedRule::ValueSource(ValueSource::Column(column.to_string())))
}
