//! JSON carries a subset of the LLSD data model. Converting into LLSD is
//! lossless for that subset; converting out of LLSD renders UUIDs, dates and
//! URIs as strings and binary as base64 text.

use super::{format_date, Map, Value};

use serde_json::{Number, Value as JsonValue};

use std::convert::TryFrom;

impl From<JsonValue> for Value {
  fn from(json: JsonValue) -> Self {
    match json {
      JsonValue::Null => Value::Undefined,
      JsonValue::Bool(b) => Value::Boolean(b),
      JsonValue::Number(n) => number_to_value(&n),
      JsonValue::String(s) => Value::String(s),
      JsonValue::Array(a) => Value::Array(a.into_iter().map(Value::from).collect()),
      JsonValue::Object(o) => Value::Map(
        o.into_iter()
          .map(|(k, v)| (k, Value::from(v)))
          .collect::<Map>(),
      ),
    }
  }
}

fn number_to_value(n: &Number) -> Value {
  if let Some(i) = n.as_i64().and_then(|i| i32::try_from(i).ok()) {
    return Value::Integer(i);
  }

  // u64 and out of range i64 values fall through to the float form
  Value::Real(n.as_f64().unwrap_or(f64::NAN))
}

impl From<&Value> for JsonValue {
  fn from(value: &Value) -> Self {
    match value {
      Value::Undefined => JsonValue::Null,
      Value::Boolean(b) => JsonValue::Bool(*b),
      Value::Integer(i) => JsonValue::from(*i),
      Value::Real(r) => Number::from_f64(*r).map_or(JsonValue::Null, JsonValue::Number),
      Value::String(s) | Value::Uri(s) => JsonValue::String(s.clone()),
      Value::Uuid(u) => JsonValue::String(u.to_string()),
      Value::Date(d) => JsonValue::String(format_date(d)),
      Value::Binary(b) => JsonValue::String(data_encoding::BASE64.encode(b)),
      Value::Array(a) => JsonValue::Array(a.iter().map(JsonValue::from).collect()),
      Value::Map(m) => JsonValue::Object(
        m.iter()
          .map(|(k, v)| (k.clone(), JsonValue::from(v)))
          .collect(),
      ),
    }
  }
}
