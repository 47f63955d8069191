use mamegen_core::{
    CopySource, JoinItem, OutputSide, ReferenceEntry, ReferenceRule, Specification, Value,
    ValueSource,
};
use rand::Rng;

use super::{Generated, RowScope, Unresolved};
use crate::model::Row;

/// Copies a value already produced in this row.
///
/// A label naming a column without a value yet yields null. An index is
/// 1-based and must point at an earlier column.
pub fn copy_value(source: &CopySource, position: usize, row: &Row) -> Generated {
    match source {
        CopySource::Label(name) => Ok(row.get(name).cloned().unwrap_or(Value::Null)),
        CopySource::Index(index) => {
            let target = index
                .checked_sub(1)
                .ok_or_else(|| Unresolved::new(format!("copy index {index} out of range")))?;
            if target >= position {
                return Err(Unresolved::new(format!(
                    "copy index {index} does not refer to an earlier column"
                )));
            }
            row.get_index(target)
                .cloned()
                .ok_or_else(|| Unresolved::new(format!("copy index {index} out of range")))
        }
    }
}

/// Concatenates literals with the textual form of referenced columns.
pub fn join_values(items: &[JoinItem], row: &Row) -> Value {
    let joined = items
        .iter()
        .map(|item| match item {
            JoinItem::Literal(text) => text.clone(),
            JoinItem::Column(name) => row.get(name).map(Value::to_text).unwrap_or_default(),
        })
        .collect::<String>();
    Value::Text(joined)
}

/// Resolves a `reference` rule for the column at `position`.
///
/// Plain references pick one entry per table key and row; every later plain
/// reference to that key in the same row reuses it.
pub fn reference_value<R: Rng + ?Sized>(
    rule: &ReferenceRule,
    spec: &Specification,
    position: usize,
    scope: &mut RowScope,
    rng: &mut R,
) -> Generated {
    let key = rule
        .key
        .as_deref()
        .filter(|key| !key.is_empty())
        .ok_or_else(|| Unresolved::new("reference key not set"))?;
    let table = spec
        .reference_tables
        .get(key)
        .filter(|table| !table.is_empty())
        .ok_or_else(|| {
            Unresolved::new(format!("reference table \"{key}\" not found or empty"))
        })?;

    let entry = match &rule.value_source {
        Some(source) => {
            let label = source_label(source, key, spec, position, &scope.row)
                .filter(|label| !label.is_empty())
                .ok_or_else(|| Unresolved::new("value_source did not provide a label"))?;
            table.find_by_label(&label).ok_or_else(|| {
                Unresolved::new(format!("label \"{label}\" not found in reference \"{key}\""))
            })?
        }
        None => {
            let index = *scope
                .reference_locks
                .entry(key.to_string())
                .or_insert_with(|| rng.random_range(0..table.len()));
            table.get(index).ok_or_else(|| {
                Unresolved::new(format!("reference \"{key}\" index {index} out of range"))
            })?
        }
    };
    Ok(output_of(entry, rule.output_side()))
}

fn output_of(entry: &ReferenceEntry, side: OutputSide) -> Value {
    match side {
        OutputSide::Label => Value::Text(entry.label.clone()),
        OutputSide::Value => entry.value.clone(),
    }
}

/// Textual label a `value_source` points at for the current row.
fn source_label(
    source: &ValueSource,
    key: &str,
    spec: &Specification,
    position: usize,
    row: &Row,
) -> Option<String> {
    let column = match source {
        ValueSource::Column(name) => name.as_str(),
        ValueSource::Auto => spec.columns[..position.min(spec.columns.len())]
            .iter()
            .rev()
            .find(|column| {
                column.rules.value.reference.as_ref().is_some_and(|reference| {
                    reference.key.as_deref() == Some(key)
                        && reference.output == Some(OutputSide::Label)
                })
            })?
            .name
            .as_str(),
    };
    row.get(column)
        .filter(|value| !value.is_null())
        .map(Value::to_text)
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use mamegen_core::{Column, ReferenceTable};
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    use super::*;

    fn row(cells: &[(&str, Value)]) -> Row {
        let mut row = Row::default();
        for (name, value) in cells {
            row.push(*name, value.clone());
        }
        row
    }

    fn reference_column(name: &str, key: &str, output: OutputSide) -> Column {
        let mut column = Column::new(name);
        column.rules.value.fixed = None;
        column.rules.value.reference = Some(ReferenceRule {
            key: Some(key.to_string()),
            output: Some(output),
            value_source: None,
        });
        column
    }

    fn spec_with_table(columns: Vec<Column>) -> Specification {
        let table = ReferenceTable::new(vec![
            ReferenceEntry {
                label: "A".to_string(),
                value: Value::Int(10),
            },
            ReferenceEntry {
                label: "B".to_string(),
                value: Value::Int(20),
            },
            ReferenceEntry {
                label: "C".to_string(),
                value: Value::Int(30),
            },
        ]);
        Specification {
            header: columns.iter().map(|column| column.name.clone()).collect(),
            columns,
            reference_tables: BTreeMap::from([("Q1".to_string(), table)]),
            ..Specification::default()
        }
    }

    #[test]
    fn copy_by_label_of_missing_column_is_null() {
        let row = row(&[("a", Value::Int(1))]);
        let copied = copy_value(&CopySource::Label("a".into()), 1, &row);
        assert_eq!(copied, Ok(Value::Int(1)));
        let missing = copy_value(&CopySource::Label("later".into()), 1, &row);
        assert_eq!(missing, Ok(Value::Null));
    }

    #[test]
    fn copy_by_index_only_reaches_earlier_columns() {
        let row = row(&[("a", Value::Int(1)), ("b", Value::text("x"))]);
        assert_eq!(copy_value(&CopySource::Index(2), 2, &row), Ok(Value::text("x")));
        assert!(copy_value(&CopySource::Index(0), 2, &row).is_err());
        assert!(copy_value(&CopySource::Index(3), 2, &row).is_err());
        assert!(copy_value(&CopySource::Index(2), 1, &row).is_err());
    }

    #[test]
    fn join_treats_missing_and_null_as_empty() {
        let row = row(&[("name", Value::text("Al")), ("gone", Value::Null)]);
        let items = vec![
            JoinItem::Literal("hi ".into()),
            JoinItem::Column("name".into()),
            JoinItem::Column("gone".into()),
            JoinItem::Column("nope".into()),
        ];
        assert_eq!(join_values(&items, &row), Value::text("hi Al"));
    }

    #[test]
    fn plain_references_share_the_row_lock() {
        let spec = spec_with_table(vec![
            reference_column("label", "Q1", OutputSide::Label),
            reference_column("value", "Q1", OutputSide::Value),
        ]);
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        for _ in 0..30 {
            let mut scope = RowScope::new(2);
            let label_rule = spec.columns[0].rules.value.reference.clone().expect("rule");
            let label = reference_value(&label_rule, &spec, 0, &mut scope, &mut rng).expect("label");
            scope.row.push("label", label.clone());
            let value_rule = spec.columns[1].rules.value.reference.clone().expect("rule");
            let value = reference_value(&value_rule, &spec, 1, &mut scope, &mut rng).expect("value");
            let expected = match label.as_str() {
                Some("A") => Value::Int(10),
                Some("B") => Value::Int(20),
                _ => Value::Int(30),
            };
            assert_eq!(value, expected);
        }
    }

    #[test]
    fn auto_value_source_finds_nearest_label_column() {
        let mut value_column = reference_column("value", "Q1", OutputSide::Value);
        if let Some(reference) = value_column.rules.value.reference.as_mut() {
            reference.value_source = Some(ValueSource::Auto);
        }
        let spec = spec_with_table(vec![
            reference_column("label", "Q1", OutputSide::Label),
            value_column,
        ]);
        let mut scope = RowScope::new(2);
        scope.row.push("label", Value::text("C"));
        let rule = spec.columns[1].rules.value.reference.clone().expect("rule");
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let value = reference_value(&rule, &spec, 1, &mut scope, &mut rng);
        assert_eq!(value, Ok(Value::Int(30)));
        assert!(scope.reference_locks.is_empty());
    }

    #[test]
    fn column_value_source_reports_unknown_labels() {
        let spec = spec_with_table(vec![Column::new("code")]);
        let rule = ReferenceRule {
            key: Some("Q1".into()),
            output: None,
            value_source: Some(ValueSource::Column("code".into())),
        };
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let mut scope = RowScope::new(2);
        scope.row.push("code", Value::text("Z"));
        let err = reference_value(&rule, &spec, 1, &mut scope, &mut rng).expect_err("unknown");
        assert_eq!(err.message(), "label \"Z\" not found in reference \"Q1\"");

        let mut scope = RowScope::new(2);
        scope.row.push("code", Value::Null);
        assert!(reference_value(&rule, &spec, 1, &mut scope, &mut rng).is_err());
    }

    #[test]
    fn missing_table_is_unresolved() {
        let spec = spec_with_table(Vec::new());
        let rule = ReferenceRule {
            key: Some("nope".into()),
            ..ReferenceRule::default()
        };
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let err = reference_value(&rule, &spec, 0, &mut RowScope::new(1), &mut rng)
            .expect_err("missing");
        assert_eq!(err.message(), "reference table \"nope\" not found or empty");
    }
}
