use std::fmt::Write as _;

use chrono::{Duration, NaiveDateTime, NaiveTime};
use mamegen_core::{Charset, NumericRange, SeqRule, Value, ValueRules, ValueType};
use rand::Rng;

use super::{Generated, Unresolved};

pub const DEFAULT_STRING_LENGTH: usize = 8;
pub const DEFAULT_DATE_FORMAT: &str = "YYYY-MM-DD";
pub const DEFAULT_DATETIME_FORMAT: &str = "YYYY-MM-DD HH:mm:ss";
/// Width of the window used when a range has no upper bound or no range is given.
pub const DEFAULT_SPAN: i64 = 100;
const DEFAULT_DATE_WINDOW_DAYS: i64 = 365;

/// Sorted, deduplicated union of the given pools; letters and digits when empty.
pub fn character_pool(charsets: &[Charset]) -> Vec<char> {
    let selected: &[Charset] = if charsets.is_empty() {
        &[Charset::Alphabet, Charset::Number]
    } else {
        charsets
    };
    let mut pool: Vec<char> = selected
        .iter()
        .flat_map(|charset| charset.chars().chars())
        .collect();
    pool.sort_unstable();
    pool.dedup();
    pool
}

pub fn random_string<R: Rng + ?Sized>(
    rng: &mut R,
    length: usize,
    charsets: &[Charset],
) -> String {
    let pool = character_pool(charsets);
    (0..length)
        .map(|_| pool[rng.random_range(0..pool.len())])
        .collect()
}

/// Uniform pick from an `enum` list.
pub fn pick<R: Rng + ?Sized>(rng: &mut R, values: &[Value]) -> Generated {
    if values.is_empty() {
        return Err(Unresolved::new("enum list is empty"));
    }
    Ok(values[rng.random_range(0..values.len())].clone())
}

pub fn random_int<R: Rng + ?Sized>(rng: &mut R, rules: &ValueRules) -> Generated {
    if let Some(values) = &rules.enum_values {
        return pick(rng, values);
    }
    let (min, max) = match rules.range {
        Some(NumericRange::Int { min, max }) => {
            (min, max.unwrap_or_else(|| min.saturating_add(DEFAULT_SPAN)))
        }
        Some(NumericRange::Float { min, max }) => {
            let min = min as i64;
            (
                min,
                max.map_or_else(|| min.saturating_add(DEFAULT_SPAN), |max| max as i64),
            )
        }
        None => (0, DEFAULT_SPAN),
    };
    let (min, max) = if min <= max { (min, max) } else { (max, min) };
    Ok(Value::Int(rng.random_range(min..=max)))
}

/// Uniform float within the range, rounded to six decimals.
///
/// An open bound too large to widen by the default span yields `min` itself.
pub fn random_float<R: Rng + ?Sized>(rng: &mut R, range: Option<&NumericRange>) -> Generated {
    let bounds = match range {
        Some(NumericRange::Float { min, max }) => Some((*min, *max)),
        Some(NumericRange::Int { min, max }) => Some((*min as f64, max.map(|max| max as f64))),
        None => None,
    };
    let sampled = match bounds {
        Some((min, Some(max))) => {
            let (min, max) = if min <= max { (min, max) } else { (max, min) };
            if !(max - min).is_finite() {
                return Err(Unresolved::new(format!("float range {min}..{max} is too wide")));
            }
            rng.random_range(min..=max)
        }
        Some((min, None)) => {
            let high = min + DEFAULT_SPAN as f64;
            if high > min {
                rng.random_range(min..high)
            } else {
                min
            }
        }
        None => rng.random::<f64>() * DEFAULT_SPAN as f64,
    };
    Ok(Value::Float(round6(sampled)))
}

/// Values at or above 2^53 carry no fractional digits and pass through as is.
fn round6(value: f64) -> f64 {
    if value.abs() >= 9_007_199_254_740_992.0 {
        return value;
    }
    (value * 1_000_000.0).round() / 1_000_000.0
}

/// Renders the counter value `current` of a `seq` column.
pub fn sequence_value(current: i64, seq: &SeqRule, value_type: Option<ValueType>) -> Value {
    match seq.digits {
        Some(width) if width > 0 => Value::Text(zero_pad(current, width)),
        _ if value_type == Some(ValueType::String) => Value::Text(current.to_string()),
        _ => Value::Int(current),
    }
}

/// Left-pads with zeros to `width` characters, keeping a leading minus sign.
pub fn zero_pad(value: i64, width: usize) -> String {
    if value < 0 {
        let digits = width.saturating_sub(1);
        format!("-{:0>digits$}", value.unsigned_abs())
    } else {
        format!("{value:0>width$}")
    }
}

/// Converts a `YYYY`/`MM`/`DD`/`HH`/`mm`/`ss` pattern into strftime syntax.
pub fn translate_date_format(pattern: &str) -> String {
    pattern
        .replace('%', "%%")
        .replace("YYYY", "%Y")
        .replace("HH", "%H")
        .replace("mm", "%M")
        .replace("MM", "%m")
        .replace("DD", "%d")
        .replace("ss", "%S")
}

/// Uniform date or timestamp within the column's bounds, formatted as text.
///
/// Without a `date_range` the bounds are the 365 days before `now`.
pub fn random_date<R: Rng + ?Sized>(
    rng: &mut R,
    rules: &ValueRules,
    now: NaiveDateTime,
) -> Generated {
    let date_like = rules.is_date_like();
    let pattern = rules.date_format.as_deref().unwrap_or(if date_like {
        DEFAULT_DATE_FORMAT
    } else {
        DEFAULT_DATETIME_FORMAT
    });
    let (start, end) = match &rules.date_range {
        Some(range) => (
            range.start.and_time(NaiveTime::MIN),
            range.end.and_time(NaiveTime::MIN),
        ),
        None => (now - Duration::days(DEFAULT_DATE_WINDOW_DAYS), now),
    };

    let picked = if date_like {
        let days = (end.date() - start.date()).num_days().max(0);
        let offset = rng.random_range(0..=days);
        (start.date() + Duration::days(offset)).and_time(NaiveTime::MIN)
    } else {
        let (low, high) = if end < start { (end, start) } else { (start, end) };
        let span = (high - low).num_seconds();
        low + Duration::seconds(rng.random_range(0..=span))
    };

    let mut out = String::new();
    write!(out, "{}", picked.format(&translate_date_format(pattern)))
        .map_err(|_| Unresolved::new(format!("invalid date format '{pattern}'")))?;
    Ok(Value::Text(out))
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use mamegen_core::DateRange;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    use super::*;

    fn rng() -> ChaCha8Rng {
        ChaCha8Rng::seed_from_u64(7)
    }

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
    }

    #[test]
    fn pool_is_sorted_and_deduplicated() {
        let pool = character_pool(&[Charset::Hex, Charset::Number]);
        assert_eq!(pool.iter().collect::<String>(), "0123456789ABCDEF");
        assert_eq!(character_pool(&[]).len(), 62);
    }

    #[test]
    fn strings_use_length_and_pool() {
        let mut rng = rng();
        for _ in 0..50 {
            let value = random_string(&mut rng, 5, &[Charset::Upper]);
            assert_eq!(value.len(), 5);
            assert!(value.chars().all(|ch| ch.is_ascii_uppercase()));
        }
        assert_eq!(random_string(&mut rng, 0, &[]), "");
    }

    #[test]
    fn ints_respect_range_and_open_bound() {
        let mut rng = rng();
        let closed = ValueRules {
            range: Some(NumericRange::Int { min: 3, max: Some(5) }),
            ..ValueRules::default()
        };
        let open = ValueRules {
            range: Some(NumericRange::Int { min: 10, max: None }),
            ..ValueRules::default()
        };
        for _ in 0..200 {
            let Ok(Value::Int(value)) = random_int(&mut rng, &closed) else {
                panic!("expected int");
            };
            assert!((3..=5).contains(&value));
            let Ok(Value::Int(value)) = random_int(&mut rng, &open) else {
                panic!("expected int");
            };
            assert!((10..=110).contains(&value));
        }
    }

    #[test]
    fn ints_prefer_enum_values() {
        let mut rng = rng();
        let rules = ValueRules {
            enum_values: Some(vec![Value::Int(1), Value::text("two")]),
            range: Some(NumericRange::Int { min: 50, max: Some(60) }),
            ..ValueRules::default()
        };
        for _ in 0..50 {
            let value = random_int(&mut rng, &rules).expect("value");
            assert!(value == Value::Int(1) || value == Value::text("two"));
        }
    }

    #[test]
    fn empty_enum_is_unresolved() {
        assert!(pick(&mut rng(), &[]).is_err());
    }

    #[test]
    fn floats_are_rounded_to_six_places() {
        let mut rng = rng();
        let range = NumericRange::Float {
            min: 1.5,
            max: Some(2.5),
        };
        for _ in 0..100 {
            let Ok(Value::Float(value)) = random_float(&mut rng, Some(&range)) else {
                panic!("expected float");
            };
            assert!((1.5..=2.5).contains(&value));
            assert_eq!(value, round6(value));
            let Ok(Value::Float(value)) = random_float(&mut rng, None) else {
                panic!("expected float");
            };
            assert!((0.0..=100.0).contains(&value));
        }
    }

    #[test]
    fn huge_float_bounds_do_not_panic() {
        let mut rng = rng();
        let open = NumericRange::Float {
            min: 1e19,
            max: None,
        };
        assert_eq!(random_float(&mut rng, Some(&open)), Ok(Value::Float(1e19)));
        let wide = NumericRange::Float {
            min: -1e308,
            max: Some(1e308),
        };
        let err = random_float(&mut rng, Some(&wide)).expect_err("too wide");
        assert!(err.message().contains("too wide"));
        let near_max = NumericRange::Float {
            min: 1e305,
            max: Some(2e305),
        };
        let Ok(Value::Float(value)) = random_float(&mut rng, Some(&near_max)) else {
            panic!("expected float");
        };
        assert!(value.is_finite() && (1e305..=2e305).contains(&value));
    }

    #[test]
    fn zero_pad_keeps_sign_first() {
        assert_eq!(zero_pad(7, 4), "0007");
        assert_eq!(zero_pad(-5, 4), "-005");
        assert_eq!(zero_pad(12345, 3), "12345");
    }

    #[test]
    fn sequence_value_depends_on_digits_and_type() {
        let padded = SeqRule {
            digits: Some(3),
            ..SeqRule::default()
        };
        assert_eq!(sequence_value(4, &padded, None), Value::text("004"));
        let plain = SeqRule::default();
        assert_eq!(sequence_value(4, &plain, Some(ValueType::String)), Value::text("4"));
        assert_eq!(sequence_value(4, &plain, Some(ValueType::Int)), Value::Int(4));
        assert_eq!(sequence_value(4, &plain, None), Value::Int(4));
    }

    #[test]
    fn date_tokens_translate_to_strftime() {
        assert_eq!(translate_date_format("YYYY-MM-DD HH:mm:ss"), "%Y-%m-%d %H:%M:%S");
        assert_eq!(translate_date_format("DD/MM/YYYY 100%"), "%d/%m/%Y 100%%");
    }

    #[test]
    fn dates_stay_within_range() {
        let mut rng = rng();
        let rules = ValueRules {
            date_range: Some(DateRange {
                start: day(2024, 1, 30),
                end: day(2024, 2, 2),
            }),
            ..ValueRules::default()
        };
        let now = day(2025, 1, 1).and_time(NaiveTime::MIN);
        let allowed = ["2024-01-30", "2024-01-31", "2024-02-01", "2024-02-02"];
        for _ in 0..100 {
            let value = random_date(&mut rng, &rules, now).expect("date");
            assert!(allowed.contains(&value.as_str().unwrap_or_default()));
        }
    }

    #[test]
    fn reversed_date_range_yields_start() {
        let rules = ValueRules {
            value_type: Some(ValueType::Date),
            date_range: Some(DateRange {
                start: day(2024, 5, 1),
                end: day(2024, 4, 1),
            }),
            ..ValueRules::default()
        };
        let now = day(2025, 1, 1).and_time(NaiveTime::MIN);
        let value = random_date(&mut rng(), &rules, now).expect("date");
        assert_eq!(value, Value::text("2024-05-01"));
    }

    #[test]
    fn datetimes_use_custom_format_and_default_window() {
        let rules = ValueRules {
            value_type: Some(ValueType::DateTime),
            date_format: Some("YYYY/MM/DD HH:mm".to_string()),
            ..ValueRules::default()
        };
        let now = day(2025, 6, 1).and_time(NaiveTime::MIN);
        let mut rng = rng();
        for _ in 0..50 {
            let value = random_date(&mut rng, &rules, now).expect("datetime");
            let text = value.as_str().unwrap_or_default().to_string();
            let parsed = NaiveDateTime::parse_from_str(&text, "%Y/%m/%d %H:%M").expect("parse");
            assert!(parsed <= now);
            assert!(parsed >= now - Duration::days(365));
        }
    }
}
