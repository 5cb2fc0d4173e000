//! Literal representation and value coercion against queryable metadata.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};
use crate::scope::{Meta, Queryable};

/// Cardinality threshold above which a multi-value equality/inequality is
/// pushed down as a residual filter instead of an inline condition string.
pub const MAX_SELECTORS: usize = 31;

/// The declared type of a queryable column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Kind {
    Integer,
    Float,
    Bool,
    String,
    Date,
    Datetime,
    Datetime64,
    Timedelta,
    Timedelta64,
}

/// A literal as produced by the parser, before any kind-directed coercion.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Int(i64),
    Float(f64),
    Str(String),
}

impl Literal {
    fn stringify(&self) -> String {
        match self {
            Literal::Int(i) => i.to_string(),
            Literal::Float(f) => {
                if f.fract() == 0.0 && f.is_finite() {
                    format!("{}", *f as i64)
                } else {
                    f.to_string()
                }
            }
            Literal::Str(s) => s.clone(),
        }
    }

    fn as_f64(&self) -> Option<f64> {
        match self {
            Literal::Int(i) => Some(*i as f64),
            Literal::Float(f) => Some(*f),
            Literal::Str(s) => s.trim().parse::<f64>().ok(),
        }
    }

    fn is_falsy_string(s: &str) -> bool {
        matches!(
            s.trim().to_ascii_lowercase().as_str(),
            "false" | "f" | "no" | "n" | "none" | "0" | "[]" | "{}" | ""
        )
    }
}

/// The wire-form value used inside a condition string or a filter's value
/// set, after kind-directed coercion.
#[derive(Debug, Clone, PartialEq)]
pub enum Wire {
    Int(i64),
    Float(f64),
    Bool(bool),
    Str(String),
}

impl Wire {
    /// Direct (uncoerced) mapping used for residual filter values, which
    /// are never run through [`convert_value`].
    pub fn from_literal_raw(lit: &Literal) -> Wire {
        match lit {
            Literal::Int(i) => Wire::Int(*i),
            Literal::Float(f) => Wire::Float(*f),
            Literal::Str(s) => Wire::Str(s.clone()),
        }
    }

    /// Renders the value the way it would appear inside a generated
    /// condition string: quoted strings unless `encoding` says the bytes
    /// are already encoded and should pass through raw.
    pub fn tostring(&self, encoding: Option<&str>) -> String {
        match self {
            Wire::Int(i) => i.to_string(),
            Wire::Float(f) => {
                if f.fract() == 0.0 && f.is_finite() {
                    format!("{f:.1}")
                } else {
                    f.to_string()
                }
            }
            Wire::Bool(b) => b.to_string(),
            Wire::Str(s) => {
                if encoding.is_some() {
                    s.clone()
                } else {
                    format!("\"{}\"", s.replace('"', "\\\""))
                }
            }
        }
    }
}

/// The `(native, converted, kind)` triple used for condition emission. The
/// native literal is retained because residual filters never see a
/// converted value; conditions always use `converted`.
#[derive(Debug, Clone, PartialEq)]
pub struct TermValue {
    pub native: Literal,
    pub converted: Wire,
    pub kind: Kind,
}

fn parse_datetime_like(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    let naive_formats = [
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%d %H:%M:%S",
    ];
    for fmt in naive_formats {
        if let Ok(ndt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(DateTime::<Utc>::from_naive_utc_and_offset(ndt, Utc));
        }
    }
    let date_formats = ["%Y-%m-%d", "%Y%m%d"];
    for fmt in date_formats {
        if let Ok(nd) = NaiveDate::parse_from_str(s, fmt) {
            return Some(DateTime::<Utc>::from_naive_utc_and_offset(nd.and_hms_opt(0, 0, 0)?, Utc));
        }
    }
    None
}

fn parse_duration_ns(lit: &Literal) -> Option<i64> {
    match lit {
        Literal::Int(i) => Some(*i * 1_000_000_000),
        Literal::Float(f) => Some((*f * 1_000_000_000.0) as i64),
        Literal::Str(s) => {
            let s = s.trim();
            let split_at = s.find(|c: char| !(c.is_ascii_digit() || c == '.' || c == '-'));
            let (num_part, unit) = match split_at {
                Some(idx) => (&s[..idx], s[idx..].trim()),
                None => (s, ""),
            };
            let n: f64 = num_part.parse().ok()?;
            let ns_per_unit: f64 = match unit {
                "" | "s" => 1_000_000_000.0,
                "ms" => 1_000_000.0,
                "us" => 1_000.0,
                "ns" => 1.0,
                "m" | "min" => 60.0 * 1_000_000_000.0,
                "h" => 3_600.0 * 1_000_000_000.0,
                "d" => 86_400.0 * 1_000_000_000.0,
                "w" => 7.0 * 86_400.0 * 1_000_000_000.0,
                _ => return None,
            };
            Some((n * ns_per_unit) as i64)
        }
    }
}

/// Coerces a raw literal against a queryable's declared kind, producing the
/// wire-form value used in a generated condition string. Filters never call
/// this - they carry raw literal values untouched.
pub fn convert_value(lit: &Literal, queryable: &Queryable) -> Result<TermValue> {
    debug!("[COERCE] {lit:?} against kind={:?} meta={:?}", queryable.kind, queryable.meta);
    if queryable.meta == Some(Meta::Category) {
        let label = lit.stringify();
        let table = queryable.metadata.as_deref().unwrap_or(&[]);
        let idx = table.partition_point(|x| x.as_str() < label.as_str());
        return Ok(TermValue { native: lit.clone(), converted: Wire::Int(idx as i64), kind: Kind::Integer });
    }

    match queryable.kind {
        Kind::Datetime | Kind::Datetime64 => {
            let s = lit.stringify();
            let dt = parse_datetime_like(&s).ok_or_else(|| Error::ValueCoercion {
                field: String::new(),
                reason: format!("{s:?} is not a valid datetime"),
            })?;
            let ns = dt.timestamp_nanos_opt().ok_or_else(|| Error::ValueCoercion {
                field: String::new(),
                reason: "datetime out of representable range".into(),
            })?;
            Ok(TermValue { native: lit.clone(), converted: Wire::Int(ns), kind: queryable.kind })
        }
        Kind::Date => {
            let s = lit.stringify();
            let dt = parse_datetime_like(&s).ok_or_else(|| Error::ValueCoercion {
                field: String::new(),
                reason: format!("{s:?} is not a valid date"),
            })?;
            Ok(TermValue { native: lit.clone(), converted: Wire::Int(dt.timestamp()), kind: Kind::Date })
        }
        Kind::Timedelta | Kind::Timedelta64 => {
            let ns = parse_duration_ns(lit).ok_or_else(|| Error::ValueCoercion {
                field: String::new(),
                reason: format!("{lit:?} is not a valid timedelta"),
            })?;
            Ok(TermValue { native: lit.clone(), converted: Wire::Int(ns), kind: queryable.kind })
        }
        Kind::Integer => {
            let f = lit.as_f64().ok_or_else(|| Error::ValueCoercion {
                field: String::new(),
                reason: format!("{lit:?} is not numeric"),
            })?;
            Ok(TermValue { native: lit.clone(), converted: Wire::Int(f as i64), kind: Kind::Integer })
        }
        Kind::Float => {
            let f = lit.as_f64().ok_or_else(|| Error::ValueCoercion {
                field: String::new(),
                reason: format!("{lit:?} is not numeric"),
            })?;
            Ok(TermValue { native: lit.clone(), converted: Wire::Float(f), kind: Kind::Float })
        }
        Kind::Bool => {
            let b = match lit {
                Literal::Str(s) => !Literal::is_falsy_string(s),
                Literal::Int(i) => *i != 0,
                Literal::Float(f) => *f != 0.0,
            };
            Ok(TermValue { native: lit.clone(), converted: Wire::Bool(b), kind: Kind::Bool })
        }
        Kind::String => {
            Ok(TermValue { native: lit.clone(), converted: Wire::Str(lit.stringify()), kind: Kind::String })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scope::Queryable;

    #[test]
    fn datetime_rfc3339_date_only_to_epoch_ns() {
        let q = Queryable::new(Kind::Datetime64);
        let tv = convert_value(&Literal::Str("2013-01-01".into()), &q).unwrap();
        assert_eq!(tv.converted, Wire::Int(1_356_998_400_000_000_000));
    }

    #[test]
    fn numeric_literal_stringified_before_date_parse() {
        let q = Queryable::new(Kind::Datetime64);
        let tv = convert_value(&Literal::Int(20_130_101), &q).unwrap();
        assert_eq!(tv.converted, Wire::Int(1_356_998_400_000_000_000));
    }

    #[test]
    fn category_lookup_uses_ordered_position() {
        let q = Queryable::category(vec!["x".into(), "y".into(), "z".into()]);
        let tv = convert_value(&Literal::Str("y".into()), &q).unwrap();
        assert_eq!(tv.converted, Wire::Int(1));
        assert_eq!(tv.kind, Kind::Integer);
    }

    #[test]
    fn category_lookup_of_absent_label_returns_insertion_point() {
        let q = Queryable::category(vec!["a".into(), "c".into()]);
        let tv = convert_value(&Literal::Str("b".into()), &q).unwrap();
        assert_eq!(tv.converted, Wire::Int(1));
    }

    #[test]
    fn integer_kind_truncates_float_like_strings() {
        let q = Queryable::new(Kind::Integer);
        let tv = convert_value(&Literal::Str("3.7".into()), &q).unwrap();
        assert_eq!(tv.converted, Wire::Int(3));
    }

    #[test]
    fn timedelta_default_unit_is_seconds() {
        let q = Queryable::new(Kind::Timedelta64);
        let tv = convert_value(&Literal::Int(5), &q).unwrap();
        assert_eq!(tv.converted, Wire::Int(5_000_000_000));
    }

    #[test]
    fn timedelta_with_explicit_unit() {
        let q = Queryable::new(Kind::Timedelta64);
        let tv = convert_value(&Literal::Str("2h".into()), &q).unwrap();
        assert_eq!(tv.converted, Wire::Int(7_200_000_000_000));
    }

    #[test]
    fn bool_kind_false_set_is_case_insensitive_and_trimmed() {
        let q = Queryable::new(Kind::Bool);
        for falsy in ["false", "F", "NO", "n", "None", "0", "[]", "{}", "", "  no  ", "FaLsE"] {
            let tv = convert_value(&Literal::Str(falsy.into()), &q).unwrap();
            assert_eq!(tv.converted, Wire::Bool(false), "{falsy:?} should coerce to false");
        }
    }

    #[test]
    fn bool_kind_truthy_strings_are_not_in_false_set() {
        let q = Queryable::new(Kind::Bool);
        for truthy in ["true", "yes", "y", "1", "anything"] {
            let tv = convert_value(&Literal::Str(truthy.into()), &q).unwrap();
            assert_eq!(tv.converted, Wire::Bool(true), "{truthy:?} should coerce to true");
        }
    }

    #[test]
    fn float_kind_whole_value_renders_with_decimal_point() {
        let q = Queryable::new(Kind::Float);
        let tv = convert_value(&Literal::Int(1), &q).unwrap();
        assert_eq!(tv.converted.tostring(None), "1.0");
    }
}
