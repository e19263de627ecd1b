//! Scalar coercion table, version 1
//!
//! Each primitive target kind accepts its own kind as is, `undef` as the
//! target's zero value and a fixed set of safe conversions from other kinds.
//! Everything else is incompatible. The table is part of the crate's
//! contract: a value coerced once coerces to itself afterwards.
//!
//! | target | accepted conversions |
//! |--------|----------------------|
//! | bool   | integer 0/1, real 0.0/1.0, string `""`/`"true"` |
//! | int    | boolean, integral real in range, integral numeric string in range |
//! | real   | boolean, integer, finite numeric string |
//! | string | boolean (`"true"`/`""`), integer, real, uuid, date, uri |
//! | uuid   | canonical uuid string |
//! | date   | `YYYY-MM-DDTHH:MM:SS(.f)?Z` string |
//! | uri    | uri reference string |
//! | binary | none |
//!
//! The empty string is the zero value for int, real, uuid, date and uri.

use crate::llsd::{format_date, Kind, Uuid, Value};

use chrono::{DateTime, Utc};
use regex::Regex;
use std::{convert::TryFrom, sync::OnceLock};
use uriparse::URIReference;

/// Version of the coercion table implemented here
pub const VERSION: u32 = 1;

const DATE_PATTERN: &str = r"^\d{4}-\d{2}-\d{2}T\d{2}:\d{2}:\d{2}(\.\d+)?Z$";

/// Result of coercing a value to a primitive kind
#[derive(Debug, Clone, PartialEq)]
pub enum Coercion {
  /// Value already has the target kind
  Matched,
  /// Value was converted without loss
  Converted(Value),
  /// Value was undef or empty and is replaced by the zero value
  Defaulted(Value),
  /// No safe conversion exists
  Incompatible,
}

/// Zero value of a kind
pub fn zero(kind: Kind) -> Value {
  match kind {
    Kind::Undefined => Value::Undefined,
    Kind::Boolean => Value::Boolean(false),
    Kind::Integer => Value::Integer(0),
    Kind::Real => Value::Real(0.0),
    Kind::String => Value::String(String::new()),
    Kind::Uuid => Value::Uuid(Uuid::nil()),
    Kind::Date => Value::Date(DateTime::<Utc>::default()),
    Kind::Uri => Value::Uri(String::new()),
    Kind::Binary => Value::Binary(Vec::new()),
    Kind::Array => Value::Array(Vec::new()),
    Kind::Map => Value::Map(Default::default()),
  }
}

/// Coerces a value to the given primitive kind
pub fn coerce(target: Kind, value: &Value) -> Coercion {
  if value.kind() == target {
    return Coercion::Matched;
  }

  if value.is_undefined() {
    return Coercion::Defaulted(zero(target));
  }

  match target {
    Kind::Boolean => to_bool(value),
    Kind::Integer => to_integer(value),
    Kind::Real => to_real(value),
    Kind::String => to_string(value),
    Kind::Uuid => from_text(target, value, |s| parse_uuid(s).map(Value::Uuid)),
    Kind::Date => from_text(target, value, |s| parse_date(s).map(Value::Date)),
    Kind::Uri => from_text(target, value, |s| {
      URIReference::try_from(s).ok().map(|_| Value::Uri(s.to_string()))
    }),
    Kind::Undefined | Kind::Binary | Kind::Array | Kind::Map => Coercion::Incompatible,
  }
}

// Only the 36 character hyphenated form is canonical
fn parse_uuid(s: &str) -> Option<Uuid> {
  if s.len() != 36 {
    return None;
  }

  Uuid::parse_str(s).ok()
}

fn to_bool(value: &Value) -> Coercion {
  match value {
    Value::Integer(0) => Coercion::Converted(Value::Boolean(false)),
    Value::Integer(1) => Coercion::Converted(Value::Boolean(true)),
    Value::Real(r) if *r == 0.0 => Coercion::Converted(Value::Boolean(false)),
    Value::Real(r) if *r == 1.0 => Coercion::Converted(Value::Boolean(true)),
    Value::String(s) if s.is_empty() => Coercion::Converted(Value::Boolean(false)),
    Value::String(s) if s == "true" => Coercion::Converted(Value::Boolean(true)),
    _ => Coercion::Incompatible,
  }
}

fn integral(r: f64) -> Option<i32> {
  if r.is_finite() && r.fract() == 0.0 && r >= i32::MIN as f64 && r <= i32::MAX as f64 {
    Some(r as i32)
  } else {
    None
  }
}

fn parse_number(s: &str) -> Option<f64> {
  lexical_core::parse::<f64>(s.as_bytes())
    .ok()
    .filter(|r| r.is_finite())
}

fn to_integer(value: &Value) -> Coercion {
  match value {
    Value::Boolean(b) => Coercion::Converted(Value::Integer(*b as i32)),
    Value::Real(r) => integral(*r).map_or(Coercion::Incompatible, |i| {
      Coercion::Converted(Value::Integer(i))
    }),
    Value::String(s) if s.is_empty() => Coercion::Defaulted(zero(Kind::Integer)),
    Value::String(s) => parse_number(s)
      .and_then(integral)
      .map_or(Coercion::Incompatible, |i| Coercion::Converted(Value::Integer(i))),
    _ => Coercion::Incompatible,
  }
}

fn to_real(value: &Value) -> Coercion {
  match value {
    Value::Boolean(b) => Coercion::Converted(Value::Real(if *b { 1.0 } else { 0.0 })),
    Value::Integer(i) => Coercion::Converted(Value::Real(f64::from(*i))),
    Value::String(s) if s.is_empty() => Coercion::Defaulted(zero(Kind::Real)),
    Value::String(s) => parse_number(s)
      .map_or(Coercion::Incompatible, |r| Coercion::Converted(Value::Real(r))),
    _ => Coercion::Incompatible,
  }
}

fn to_string(value: &Value) -> Coercion {
  let text = match value {
    Value::Boolean(true) => "true".to_string(),
    Value::Boolean(false) => String::new(),
    Value::Integer(i) => i.to_string(),
    Value::Real(r) => r.to_string(),
    Value::Uuid(u) => u.to_string(),
    Value::Date(d) => format_date(d),
    Value::Uri(u) => u.clone(),
    _ => return Coercion::Incompatible,
  };

  Coercion::Converted(Value::String(text))
}

fn from_text<F>(target: Kind, value: &Value, parse: F) -> Coercion
where
  F: Fn(&str) -> Option<Value>,
{
  match value {
    Value::String(s) if s.is_empty() => Coercion::Defaulted(zero(target)),
    Value::String(s) => parse(s).map_or(Coercion::Incompatible, Coercion::Converted),
    _ => Coercion::Incompatible,
  }
}

/// Parses the date text form LLSD accepts, UTC with a trailing `Z`
pub fn parse_date(s: &str) -> Option<DateTime<Utc>> {
  static DATE_RE: OnceLock<Option<Regex>> = OnceLock::new();

  let re = DATE_RE.get_or_init(|| Regex::new(DATE_PATTERN).ok()).as_ref()?;

  if !re.is_match(s) {
    return None;
  }

  DateTime::parse_from_rfc3339(s)
    .ok()
    .map(|d| d.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
  use super::*;
  use chrono::TimeZone;

  fn converted(target: Kind, value: Value) -> Value {
    match coerce(target, &value) {
      Coercion::Converted(v) => v,
      other => panic!("expected {} to convert to {}, got {:?}", value, target, other),
    }
  }

  fn incompatible(target: Kind, value: Value) {
    assert_eq!(
      coerce(target, &value),
      Coercion::Incompatible,
      "{} to {}",
      value,
      target
    );
  }

  fn uuid() -> Uuid {
    "6cb93268-5148-423f-8618-c7a8e3ef6b2f".parse().unwrap()
  }

  fn date() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2009, 2, 6, 22, 17, 38).unwrap()
  }

  #[test]
  fn verify_same_kind_matches() {
    let values = vec![
      Value::from(true),
      Value::from(7),
      Value::from(1.5),
      Value::from("text"),
      Value::from(uuid()),
      Value::from(date()),
      Value::uri("http://example.com/"),
      Value::from(vec![1u8]),
    ];

    for v in values {
      assert_eq!(coerce(v.kind(), &v), Coercion::Matched);
    }
  }

  #[test]
  fn verify_undefined_defaults_to_zero() {
    for kind in [
      Kind::Boolean,
      Kind::Integer,
      Kind::Real,
      Kind::String,
      Kind::Uuid,
      Kind::Date,
      Kind::Uri,
      Kind::Binary,
    ] {
      assert_eq!(
        coerce(kind, &Value::Undefined),
        Coercion::Defaulted(zero(kind))
      );
    }

    assert_eq!(zero(Kind::Date), Value::Date(Utc.timestamp_opt(0, 0).unwrap()));
    assert_eq!(zero(Kind::Uuid).to_string(), "u00000000-0000-0000-0000-000000000000");
  }

  #[test]
  fn verify_to_bool() {
    assert_eq!(converted(Kind::Boolean, Value::from(1)), Value::from(true));
    assert_eq!(converted(Kind::Boolean, Value::from(0)), Value::from(false));
    assert_eq!(converted(Kind::Boolean, Value::from(1.0)), Value::from(true));
    assert_eq!(converted(Kind::Boolean, Value::from(0.0)), Value::from(false));
    assert_eq!(converted(Kind::Boolean, Value::from("true")), Value::from(true));
    assert_eq!(converted(Kind::Boolean, Value::from("")), Value::from(false));

    incompatible(Kind::Boolean, Value::from(2));
    incompatible(Kind::Boolean, Value::from(0.5));
    incompatible(Kind::Boolean, Value::from("false"));
    incompatible(Kind::Boolean, Value::from(uuid()));
    incompatible(Kind::Boolean, Value::from(date()));
    incompatible(Kind::Boolean, Value::uri("x"));
    incompatible(Kind::Boolean, Value::from(vec![1u8]));
    incompatible(Kind::Boolean, Value::from(Vec::<Value>::new()));
  }

  #[test]
  fn verify_to_integer() {
    assert_eq!(converted(Kind::Integer, Value::from(true)), Value::from(1));
    assert_eq!(converted(Kind::Integer, Value::from(false)), Value::from(0));
    assert_eq!(converted(Kind::Integer, Value::from(3.0)), Value::from(3));
    assert_eq!(converted(Kind::Integer, Value::from("42")), Value::from(42));
    assert_eq!(converted(Kind::Integer, Value::from("-7.0")), Value::from(-7));
    assert_eq!(
      coerce(Kind::Integer, &Value::from("")),
      Coercion::Defaulted(Value::from(0))
    );

    incompatible(Kind::Integer, Value::from(3.5));
    incompatible(Kind::Integer, Value::from(3e10));
    incompatible(Kind::Integer, Value::from(f64::NAN));
    incompatible(Kind::Integer, Value::from("forty two"));
    incompatible(Kind::Integer, Value::from("4.2"));
    incompatible(Kind::Integer, Value::from("3000000000"));
    incompatible(Kind::Integer, Value::from(uuid()));
    incompatible(Kind::Integer, Value::from(date()));
    incompatible(Kind::Integer, Value::from(vec![1u8]));
  }

  #[test]
  fn verify_to_real() {
    assert_eq!(converted(Kind::Real, Value::from(true)), Value::from(1.0));
    assert_eq!(converted(Kind::Real, Value::from(-2)), Value::from(-2.0));
    assert_eq!(converted(Kind::Real, Value::from("2.5")), Value::from(2.5));
    assert_eq!(
      coerce(Kind::Real, &Value::from("")),
      Coercion::Defaulted(Value::from(0.0))
    );

    incompatible(Kind::Real, Value::from("two"));
    incompatible(Kind::Real, Value::from(uuid()));
    incompatible(Kind::Real, Value::uri("http://example.com/"));
    incompatible(Kind::Real, Value::from(vec![1u8]));
  }

  #[test]
  fn verify_to_string() {
    assert_eq!(converted(Kind::String, Value::from(true)), Value::from("true"));
    assert_eq!(converted(Kind::String, Value::from(false)), Value::from(""));
    assert_eq!(converted(Kind::String, Value::from(5)), Value::from("5"));
    assert_eq!(converted(Kind::String, Value::from(1.5)), Value::from("1.5"));
    assert_eq!(
      converted(Kind::String, Value::from(uuid())),
      Value::from("6cb93268-5148-423f-8618-c7a8e3ef6b2f")
    );
    assert_eq!(
      converted(Kind::String, Value::from(date())),
      Value::from("2009-02-06T22:17:38Z")
    );
    assert_eq!(
      converted(Kind::String, Value::uri("http://example.com/")),
      Value::from("http://example.com/")
    );

    incompatible(Kind::String, Value::from(vec![1u8]));
    incompatible(Kind::String, Value::from(vec![Value::from(1)]));
  }

  #[test]
  fn verify_text_kinds() {
    assert_eq!(
      converted(Kind::Uuid, Value::from("6CB93268-5148-423F-8618-C7A8E3EF6B2F")),
      Value::from(uuid())
    );
    assert_eq!(
      converted(Kind::Date, Value::from("2009-02-06T22:17:38Z")),
      Value::from(date())
    );
    assert_eq!(
      converted(Kind::Uri, Value::from("http://example.com/path?q=1")),
      Value::uri("http://example.com/path?q=1")
    );

    for kind in [Kind::Uuid, Kind::Date, Kind::Uri] {
      assert_eq!(coerce(kind, &Value::from("")), Coercion::Defaulted(zero(kind)));
      incompatible(kind, Value::from(1));
      incompatible(kind, Value::from(true));
    }

    incompatible(Kind::Uuid, Value::from("not-a-uuid"));
    incompatible(Kind::Uuid, Value::from("6cb932685148423f8618c7a8e3ef6b2f"));
    incompatible(Kind::Uuid, Value::from("{6cb93268-5148-423f-8618-c7a8e3ef6b2f}"));
    incompatible(
      Kind::Uuid,
      Value::from("urn:uuid:6cb93268-5148-423f-8618-c7a8e3ef6b2f"),
    );
    incompatible(Kind::Uuid, Value::from("6cb93268+5148-423f-8618-c7a8e3ef6b2f"));
    incompatible(Kind::Date, Value::from("2009-02-06"));
    incompatible(Kind::Date, Value::from("2009-02-06T22:17:38+01:00"));
    incompatible(Kind::Date, Value::from("2009-13-45T22:17:38Z"));
    incompatible(Kind::Uri, Value::from("http://exa mple.com/"));
  }

  #[test]
  fn verify_to_binary() {
    incompatible(Kind::Binary, Value::from("AAEC"));
    incompatible(Kind::Binary, Value::from(1));
  }

  #[test]
  fn verify_conversion_is_stable() {
    let samples = vec![
      (Kind::Integer, Value::from("42")),
      (Kind::Real, Value::from("2.5")),
      (Kind::String, Value::from(1.5)),
      (Kind::String, Value::from(date())),
      (Kind::Boolean, Value::from(1)),
      (Kind::Date, Value::from("2009-02-06T22:17:38.25Z")),
    ];

    for (kind, value) in samples {
      let once = converted(kind, value);
      assert_eq!(coerce(kind, &once), Coercion::Matched);
    }
  }
}
