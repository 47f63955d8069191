use std::collections::HashMap;
use std::time::Instant;

use chrono::{Local, NaiveDateTime};
use mamegen_core::{Column, RuleSet, Specification, Value, ValueFamily, ValueType};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::{debug, info};

use crate::errors::GenerationError;
use crate::generators::{Generated, RowScope, derive, primitives};
use crate::model::{GenerateOptions, GenerationReport, REPRODUCIBLE_SEED, Row};

/// Result of a generation run.
#[derive(Debug, Clone)]
pub struct GenerationResult {
    pub rows: Vec<Row>,
    pub report: GenerationReport,
}

/// Entry point for generating rows from an assembled specification.
#[derive(Debug, Clone, Default)]
pub struct GenerationEngine {
    options: GenerateOptions,
}

impl GenerationEngine {
    pub fn new(options: GenerateOptions) -> Self {
        Self { options }
    }

    /// Seed for a run: the explicit override, the fixed seed of reproducible
    /// specifications, else a fresh random one.
    pub fn resolve_seed(&self, spec: &Specification) -> u64 {
        self.options
            .seed
            .or_else(|| spec.reproducible().then_some(REPRODUCIBLE_SEED))
            .unwrap_or_else(|| rand::rng().random())
    }

    pub fn run(&self, spec: &Specification) -> Result<GenerationResult, GenerationError> {
        let seed = self.resolve_seed(spec);
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let mut result = self.run_with_rng(spec, &mut rng)?;
        result.report.seed = seed;
        Ok(result)
    }

    /// Runs with a caller-provided generator; the report's seed is left at 0.
    pub fn run_with_rng<R: Rng + ?Sized>(
        &self,
        spec: &Specification,
        rng: &mut R,
    ) -> Result<GenerationResult, GenerationError> {
        let start = Instant::now();
        let row_count = self.options.row_count.unwrap_or(spec.row_count);
        let now = self
            .options
            .now
            .unwrap_or_else(|| Local::now().naive_local());

        info!(
            rows = row_count,
            columns = spec.columns.len(),
            reproducible = spec.reproducible(),
            "generation started"
        );

        let mut run = RunState::new(spec, now);
        let mut rows = Vec::with_capacity(usize::try_from(row_count).unwrap_or_default());
        for _ in 0..row_count {
            rows.push(run.next_row(rng)?);
        }

        let report = GenerationReport {
            rows: row_count,
            columns: spec.columns.len(),
            seed: 0,
            reproducible: spec.reproducible(),
            null_count: run.null_count,
            downgraded: run.downgraded,
        };
        info!(
            rows = report.rows,
            nulls = report.null_count,
            downgraded = report.downgraded,
            duration_ms = start.elapsed().as_millis() as u64,
            "generation finished"
        );
        Ok(GenerationResult { rows, report })
    }
}

/// Null decision for a uniform `draw` in `[0, 1)`: only a draw strictly below
/// `probability` emits null.
pub fn emits_null(probability: f64, draw: f64) -> bool {
    draw < probability
}

/// Mutable state of one run: sequence counters and counts for the report.
struct RunState<'a> {
    spec: &'a Specification,
    now: NaiveDateTime,
    /// Next value of every `seq` column, keyed by header position.
    sequences: HashMap<usize, i64>,
    null_count: u64,
    downgraded: u64,
}

impl<'a> RunState<'a> {
    fn new(spec: &'a Specification, now: NaiveDateTime) -> Self {
        Self {
            spec,
            now,
            sequences: HashMap::new(),
            null_count: 0,
            downgraded: 0,
        }
    }

    fn next_row<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Result<Row, GenerationError> {
        let spec = self.spec;
        let mut scope = RowScope::new(spec.columns.len());
        for (position, column) in spec.columns.iter().enumerate() {
            let value = self.column_value(column, position, &mut scope, rng)?;
            if value.is_null() {
                self.null_count += 1;
            }
            scope.row.push(column.name.clone(), value);
        }
        Ok(scope.into_row())
    }

    fn column_value<R: Rng + ?Sized>(
        &mut self,
        column: &Column,
        position: usize,
        scope: &mut RowScope,
        rng: &mut R,
    ) -> Result<Value, GenerationError> {
        let rules = &column.rules;
        let sequence = self.advance_sequence(rules, position);
        if should_emit_null(rules, rng) {
            return Ok(Value::Null);
        }
        let generated = match sequence {
            Some(value) => Ok(value),
            None => self.generate(rules, position, scope, rng),
        };
        generated.or_else(|unresolved| {
            if rules.allow_null {
                debug!(
                    column = %column.name,
                    reason = unresolved.message(),
                    "column value downgraded to null"
                );
                self.downgraded += 1;
                Ok(Value::Null)
            } else {
                Err(GenerationError::column(&column.name, unresolved.0))
            }
        })
    }

    /// Renders the current counter of a `seq` column and advances it, also on
    /// rows where the column ends up null.
    fn advance_sequence(&mut self, rules: &RuleSet, position: usize) -> Option<Value> {
        if rules.value.family() != Some(ValueFamily::Seq) {
            return None;
        }
        let seq = rules.value.seq.as_ref()?;
        let counter = self.sequences.entry(position).or_insert(seq.start);
        let current = *counter;
        *counter = current.saturating_add(seq.step);
        Some(primitives::sequence_value(current, seq, rules.value.value_type))
    }

    /// Value of a non-sequence column, first matching family wins.
    fn generate<R: Rng + ?Sized>(
        &self,
        rules: &RuleSet,
        position: usize,
        scope: &mut RowScope,
        rng: &mut R,
    ) -> Generated {
        let value = &rules.value;
        if let Some(fixed) = &value.fixed {
            return Ok(fixed.clone());
        }
        if let Some(source) = &value.copy {
            return derive::copy_value(source, position, &scope.row);
        }
        if let Some(items) = &value.join {
            return Ok(derive::join_values(items, &scope.row));
        }
        if let Some(reference) = &value.reference {
            return derive::reference_value(reference, self.spec, position, scope, rng);
        }

        let is_date = matches!(value.value_type, Some(ValueType::Date | ValueType::DateTime))
            || value.date_range.is_some();
        if is_date {
            return primitives::random_date(rng, value, self.now);
        }
        match value.value_type {
            Some(ValueType::Int) => primitives::random_int(rng, value),
            Some(ValueType::Float) => primitives::random_float(rng, value.range.as_ref()),
            Some(ValueType::String) => Ok(Value::Text(primitives::random_string(
                rng,
                value.length.unwrap_or(primitives::DEFAULT_STRING_LENGTH),
                &value.charsets,
            ))),
            _ => match &value.enum_values {
                Some(values) => primitives::pick(rng, values),
                None => Ok(Value::Text(primitives::random_string(
                    rng,
                    value.length.unwrap_or(primitives::DEFAULT_STRING_LENGTH),
                    &value.charsets,
                ))),
            },
        }
    }
}

fn should_emit_null<R: Rng + ?Sized>(rules: &RuleSet, rng: &mut R) -> bool {
    if !rules.allow_null || rules.null_probability <= 0.0 {
        return false;
    }
    emits_null(rules.null_probability, rng.random::<f64>())
}
