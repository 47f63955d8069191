use mamegen_core::{
    DslError, NumericRange, Result, RuleSet, ValueFamily, ValueRules, ValueType,
};

use crate::grammar::ParsedRule;

/// Accumulates parsed rules for one block and produces a finalized [`RuleSet`].
///
/// A block owns at most one value family. A value rule arriving after a
/// `class` line replaces whatever family the template supplied.
#[derive(Debug, Default, Clone)]
pub struct RuleSetBuilder {
    allow_null: Option<bool>,
    null_probability: Option<f64>,
    value: ValueRules,
    own_family: Option<ValueFamily>,
    touched: bool,
}

impl RuleSetBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        !self.touched
    }

    pub fn apply(&mut self, rule: ParsedRule, line: usize) -> Result<()> {
        self.touched = true;
        match rule {
            ParsedRule::AllowNull(allow) => self.allow_null = Some(allow),
            ParsedRule::NullProbability(probability) => {
                self.null_probability = Some(probability)
            }
            ParsedRule::Seq { start, end } => {
                self.claim(ValueFamily::Seq, line)?;
                let seq = self.value.seq.get_or_insert_with(Default::default);
                seq.start = start;
                seq.end = end;
            }
            ParsedRule::Digits(digits) => {
                self.claim(ValueFamily::Seq, line)?;
                self.value.seq.get_or_insert_with(Default::default).digits = Some(digits);
            }
            ParsedRule::Step(step) => {
                self.claim(ValueFamily::Seq, line)?;
                self.value.seq.get_or_insert_with(Default::default).step = step;
            }
            ParsedRule::Charset(charset) => {
                if !self.value.charsets.contains(&charset) {
                    self.value.charsets.push(charset);
                    self.value.charsets.sort();
                }
                self.value.value_type.get_or_insert(ValueType::String);
            }
            ParsedRule::Length(length) => {
                self.value.length = Some(length);
                self.value.value_type.get_or_insert(ValueType::String);
            }
            ParsedRule::Enum(values) => {
                self.claim(ValueFamily::Enum, line)?;
                self.value.enum_values = Some(values);
                self.value.value_type = Some(ValueType::Int);
            }
            ParsedRule::Fixed(value) => {
                self.claim(ValueFamily::Fixed, line)?;
                self.value.fixed = Some(value);
                self.value.value_type.get_or_insert(ValueType::String);
            }
            ParsedRule::Copy(source) => {
                self.claim(ValueFamily::Copy, line)?;
                self.value.copy = Some(source);
            }
            ParsedRule::Join(items) => {
                self.claim(ValueFamily::Join, line)?;
                self.value.join = Some(items);
                self.value.value_type.get_or_insert(ValueType::String);
            }
            ParsedRule::Range(range) => {
                self.claim(ValueFamily::Range, line)?;
                self.value.value_type = Some(match range {
                    NumericRange::Int { .. } => ValueType::Int,
                    NumericRange::Float { .. } => ValueType::Float,
                });
                self.value.range = Some(range);
            }
            ParsedRule::Date => {
                self.claim(ValueFamily::Date, line)?;
                self.value.value_type = Some(ValueType::Date);
            }
            ParsedRule::DateTime => {
                self.claim(ValueFamily::Date, line)?;
                self.value.value_type = Some(ValueType::DateTime);
            }
            ParsedRule::DateRange(range) => {
                self.claim(ValueFamily::Date, line)?;
                self.value.date_range = Some(range);
                self.ensure_date_type();
            }
            ParsedRule::DateFormat(format) => {
                self.claim(ValueFamily::Date, line)?;
                self.value.date_format = Some(format);
                self.ensure_date_type();
            }
            ParsedRule::Reference(key) => {
                self.claim(ValueFamily::Reference, line)?;
                self.value.reference.get_or_insert_with(Default::default).key = Some(key);
            }
            ParsedRule::Output(side) => {
                self.claim(ValueFamily::Reference, line)?;
                self.value.reference.get_or_insert_with(Default::default).output = Some(side);
            }
            ParsedRule::ValueSource(source) => {
                self.claim(ValueFamily::Reference, line)?;
                self.value
                    .reference
                    .get_or_insert_with(Default::default)
                    .value_source = Some(source);
            }
        }
        Ok(())
    }

    /// Shallow merge of a finalized template; its keys overwrite what this
    /// block has set so far.
    pub fn apply_class(&mut self, template: &RuleSet) {
        self.touched = true;
        self.allow_null = Some(template.allow_null);
        self.null_probability = Some(template.null_probability);

        let incoming = &template.value;
        let incoming_family = incoming.family();
        if incoming_family.is_some() {
            if let Some(current) = self.value.family() {
                self.value.clear_family(current);
            }
            self.own_family = None;
        }
        if incoming.value_type.is_some() && (incoming_family.is_some() || self.value.family().is_none()) {
            self.value.value_type = incoming.value_type;
        }
        overwrite(&mut self.value.fixed, &incoming.fixed);
        overwrite(&mut self.value.copy, &incoming.copy);
        overwrite(&mut self.value.join, &incoming.join);
        overwrite(&mut self.value.reference, &incoming.reference);
        overwrite(&mut self.value.seq, &incoming.seq);
        overwrite(&mut self.value.enum_values, &incoming.enum_values);
        overwrite(&mut self.value.range, &incoming.range);
        overwrite(&mut self.value.date_range, &incoming.date_range);
        overwrite(&mut self.value.date_format, &incoming.date_format);
        overwrite(&mut self.value.length, &incoming.length);
        if !incoming.charsets.is_empty() {
            self.value.charsets = incoming.charsets.clone();
        }
    }

    /// Applies null defaults and validation. `line` is the closing line of the block.
    pub fn finish(self, line: usize) -> Result<RuleSet> {
        if !self.touched {
            return Ok(RuleSet::empty_string());
        }
        let allow_null = self.allow_null.unwrap_or(true);
        let null_probability = self.null_probability.unwrap_or(0.0);
        if !(0.0..=1.0).contains(&null_probability) {
            return Err(DslError::invalid_rule(
                line,
                "null_probability must be between 0 and 1",
            ));
        }
        Ok(RuleSet {
            allow_null,
            null_probability: if allow_null { null_probability } else { 0.0 },
            value: self.value,
        })
    }

    fn ensure_date_type(&mut self) {
        if self.value.value_type != Some(ValueType::DateTime) {
            self.value.value_type = Some(ValueType::Date);
        }
    }

    fn claim(&mut self, family: ValueFamily, line: usize) -> Result<()> {
        match self.own_family {
            Some(own) if own != family => Err(DslError::invalid_rule(
                line,
                format!(
                    "a column may have only one value rule: '{}' conflicts with '{}'",
                    family.name(),
                    own.name()
                ),
            )),
            Some(_) => Ok(()),
            None => {
                if let Some(inherited) = self.value.family() {
                    if inherited != family {
                        self.value.clear_family(inherited);
                    }
                }
                self.own_family = Some(family);
                Ok(())
            }
        }
    }
}

fn overwrite<T: Clone>(slot: &mut Option<T>, incoming: &Option<T>) {
    if let Some(value) = incoming {
        *slot = Some(value.clone());
    }
}
