/// Conversion between `serde_json::Value` and LLSD values
#[cfg(feature = "json")]
pub mod json;

pub use uuid::Uuid;

use std::{collections::BTreeMap, fmt};

use chrono::{DateTime, SecondsFormat, Utc};
use displaydoc::Display;
use itertools::Itertools;

#[cfg(feature = "serde")]
use serde::Serialize;

/// LLSD map type. Keys are unique and ordering carries no meaning
pub type Map = BTreeMap<String, Value>;

/// The variant tag of an LLSD value
#[cfg_attr(feature = "serde", derive(Serialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
  /// undef
  Undefined,
  /// boolean
  Boolean,
  /// 32-bit signed integer
  Integer,
  /// 64-bit floating point
  Real,
  /// UTF-8 text
  String,
  /// UUID
  Uuid,
  /// date-time in UTC
  Date,
  /// URI
  Uri,
  /// opaque byte sequence
  Binary,
  /// ordered sequence of values
  Array,
  /// string-keyed map of values
  Map,
}

impl Kind {
  /// Whether or not values of this kind have no children
  pub fn is_scalar(self) -> bool {
    !matches!(self, Kind::Undefined | Kind::Array | Kind::Map)
  }
}

impl fmt::Display for Kind {
  fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
    let name = match self {
      Kind::Undefined => "undef",
      Kind::Boolean => "boolean",
      Kind::Integer => "integer",
      Kind::Real => "real",
      Kind::String => "string",
      Kind::Uuid => "uuid",
      Kind::Date => "date",
      Kind::Uri => "uri",
      Kind::Binary => "binary",
      Kind::Array => "array",
      Kind::Map => "map",
    };

    write!(f, "{}", name)
  }
}

/// Error returned by a typed accessor invoked against the wrong variant
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq)]
#[displaydoc("expected {expected} value, found {found}")]
pub struct TypeMismatch {
  /// Requested kind
  pub expected: Kind,
  /// Kind actually stored
  pub found: Kind,
}

impl std::error::Error for TypeMismatch {}

/// A decoded LLSD value, independent of the wire format that carried it
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
  /// undef. Distinct from a key being absent from a map
  Undefined,
  /// Boolean
  Boolean(bool),
  /// Integer
  Integer(i32),
  /// Real
  Real(f64),
  /// String
  String(String),
  /// UUID
  Uuid(Uuid),
  /// Date
  Date(DateTime<Utc>),
  /// URI text
  Uri(String),
  /// Binary
  Binary(Vec<u8>),
  /// Array
  Array(Vec<Value>),
  /// Map
  Map(Map),
}

impl Default for Value {
  fn default() -> Self {
    Value::Undefined
  }
}

macro_rules! accessor {
  ($(#[$doc:meta])* $name:ident, $variant:ident, $ty:ty) => {
    $(#[$doc])*
    pub fn $name(&self) -> Result<$ty, TypeMismatch> {
      match self {
        Value::$variant(v) => Ok(v),
        _ => Err(self.mismatch(Kind::$variant)),
      }
    }
  };
}

impl Value {
  /// Creates a URI value
  pub fn uri<S: Into<String>>(uri: S) -> Self {
    Value::Uri(uri.into())
  }

  /// The variant tag of this value
  pub fn kind(&self) -> Kind {
    match self {
      Value::Undefined => Kind::Undefined,
      Value::Boolean(_) => Kind::Boolean,
      Value::Integer(_) => Kind::Integer,
      Value::Real(_) => Kind::Real,
      Value::String(_) => Kind::String,
      Value::Uuid(_) => Kind::Uuid,
      Value::Date(_) => Kind::Date,
      Value::Uri(_) => Kind::Uri,
      Value::Binary(_) => Kind::Binary,
      Value::Array(_) => Kind::Array,
      Value::Map(_) => Kind::Map,
    }
  }

  /// Whether or not the value is undef
  pub fn is_undefined(&self) -> bool {
    matches!(self, Value::Undefined)
  }

  /// Whether or not the value is of the given kind
  pub fn is(&self, kind: Kind) -> bool {
    self.kind() == kind
  }

  fn mismatch(&self, expected: Kind) -> TypeMismatch {
    TypeMismatch {
      expected,
      found: self.kind(),
    }
  }

  /// Boolean accessor
  pub fn as_bool(&self) -> Result<bool, TypeMismatch> {
    match self {
      Value::Boolean(b) => Ok(*b),
      _ => Err(self.mismatch(Kind::Boolean)),
    }
  }

  /// Integer accessor
  pub fn as_integer(&self) -> Result<i32, TypeMismatch> {
    match self {
      Value::Integer(i) => Ok(*i),
      _ => Err(self.mismatch(Kind::Integer)),
    }
  }

  /// Real accessor
  pub fn as_real(&self) -> Result<f64, TypeMismatch> {
    match self {
      Value::Real(r) => Ok(*r),
      _ => Err(self.mismatch(Kind::Real)),
    }
  }

  /// String accessor
  pub fn as_str(&self) -> Result<&str, TypeMismatch> {
    match self {
      Value::String(s) => Ok(s),
      _ => Err(self.mismatch(Kind::String)),
    }
  }

  /// URI accessor
  pub fn as_uri(&self) -> Result<&str, TypeMismatch> {
    match self {
      Value::Uri(u) => Ok(u),
      _ => Err(self.mismatch(Kind::Uri)),
    }
  }

  accessor!(
    /// UUID accessor
    as_uuid, Uuid, &Uuid
  );
  accessor!(
    /// Date accessor
    as_date, Date, &DateTime<Utc>
  );
  accessor!(
    /// Binary accessor
    as_binary, Binary, &Vec<u8>
  );
  accessor!(
    /// Array accessor
    as_array, Array, &Vec<Value>
  );
  accessor!(
    /// Map accessor
    as_map, Map, &Map
  );

  /// Looks up a key if the value is a map
  pub fn get(&self, key: &str) -> Option<&Value> {
    match self {
      Value::Map(m) => m.get(key),
      _ => None,
    }
  }
}

impl From<bool> for Value {
  fn from(b: bool) -> Self {
    Value::Boolean(b)
  }
}

impl From<i32> for Value {
  fn from(i: i32) -> Self {
    Value::Integer(i)
  }
}

impl From<f64> for Value {
  fn from(r: f64) -> Self {
    Value::Real(r)
  }
}

impl From<&str> for Value {
  fn from(s: &str) -> Self {
    Value::String(s.to_string())
  }
}

impl From<String> for Value {
  fn from(s: String) -> Self {
    Value::String(s)
  }
}

impl From<Uuid> for Value {
  fn from(u: Uuid) -> Self {
    Value::Uuid(u)
  }
}

impl From<DateTime<Utc>> for Value {
  fn from(d: DateTime<Utc>) -> Self {
    Value::Date(d)
  }
}

impl From<Vec<u8>> for Value {
  fn from(b: Vec<u8>) -> Self {
    Value::Binary(b)
  }
}

impl From<Vec<Value>> for Value {
  fn from(a: Vec<Value>) -> Self {
    Value::Array(a)
  }
}

impl From<Map> for Value {
  fn from(m: Map) -> Self {
    Value::Map(m)
  }
}

impl<K: Into<String>> std::iter::FromIterator<(K, Value)> for Value {
  fn from_iter<I: IntoIterator<Item = (K, Value)>>(iter: I) -> Self {
    Value::Map(iter.into_iter().map(|(k, v)| (k.into(), v)).collect())
  }
}

/// Text form of a date as LLSD writes it
pub fn format_date(date: &DateTime<Utc>) -> String {
  date.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

pub(crate) fn escape(s: &str, quote: char) -> String {
  let mut escaped = String::with_capacity(s.len());
  for ch in s.chars() {
    match ch {
      '\\' => escaped.push_str("\\\\"),
      '\n' => escaped.push_str("\\n"),
      '\r' => escaped.push_str("\\r"),
      '\t' => escaped.push_str("\\t"),
      c if c == quote => {
        escaped.push('\\');
        escaped.push(c);
      }
      c => escaped.push(c),
    }
  }

  escaped
}

impl fmt::Display for Value {
  fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
    match self {
      Value::Undefined => write!(f, "!"),
      Value::Boolean(b) => write!(f, "{}", b),
      Value::Integer(i) => write!(f, "i{}", i),
      Value::Real(r) => write!(f, "r{:?}", r),
      Value::String(s) => write!(f, "'{}'", escape(s, '\'')),
      Value::Uuid(u) => write!(f, "u{}", u),
      Value::Date(d) => write!(f, "d\"{}\"", format_date(d)),
      Value::Uri(u) => write!(f, "l\"{}\"", escape(u, '"')),
      Value::Binary(b) => write!(f, "b64\"{}\"", data_encoding::BASE64.encode(b)),
      Value::Array(a) => write!(f, "[{}]", a.iter().join(",")),
      Value::Map(m) => write!(
        f,
        "{{{}}}",
        m.iter()
          .map(|(k, v)| format!("'{}':{}", escape(k, '\''), v))
          .join(",")
      ),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use chrono::TimeZone;

  #[test]
  fn verify_kind_inspection() {
    assert_eq!(Value::Undefined.kind(), Kind::Undefined);
    assert_eq!(Value::from(true).kind(), Kind::Boolean);
    assert_eq!(Value::from(3).kind(), Kind::Integer);
    assert_eq!(Value::from(3.14).kind(), Kind::Real);
    assert_eq!(Value::from("bob").kind(), Kind::String);
    assert_eq!(Value::from(Uuid::nil()).kind(), Kind::Uuid);
    assert_eq!(Value::uri("http://example.com/").kind(), Kind::Uri);
    assert_eq!(Value::from(vec![1u8, 2, 3]).kind(), Kind::Binary);
    assert_eq!(Value::from(vec![Value::Undefined]).kind(), Kind::Array);
    assert_eq!(Value::Map(Map::new()).kind(), Kind::Map);

    assert!(Kind::Date.is_scalar());
    assert!(!Kind::Undefined.is_scalar());
    assert!(!Kind::Map.is_scalar());
  }

  #[test]
  fn verify_typed_accessors() {
    let v = Value::from(42);
    assert_eq!(v.as_integer(), Ok(42));
    assert_eq!(
      v.as_str(),
      Err(TypeMismatch {
        expected: Kind::String,
        found: Kind::Integer,
      })
    );
    assert_eq!(
      v.as_map().unwrap_err().to_string(),
      "expected map value, found integer"
    );

    let u = Value::uri("http://example.com/");
    assert_eq!(u.as_uri(), Ok("http://example.com/"));
    assert!(u.as_str().is_err());
  }

  #[test]
  fn verify_map_equality_ignores_insertion_order() {
    let a: Value = vec![("name", Value::from("Ann")), ("age", Value::from(3))]
      .into_iter()
      .collect();
    let b: Value = vec![("age", Value::from(3)), ("name", Value::from("Ann"))]
      .into_iter()
      .collect();

    assert_eq!(a, b);
    assert_ne!(a, Value::Map(Map::new()));
    assert_eq!(a.get("name"), Some(&Value::from("Ann")));
    assert_eq!(a.get("missing"), None);
  }

  #[test]
  fn verify_undefined_is_a_value() {
    let with_undef: Value = vec![("a", Value::Undefined)].into_iter().collect();
    let empty = Value::Map(Map::new());

    assert_ne!(with_undef, empty);
    assert_eq!(with_undef.get("a"), Some(&Value::Undefined));
  }

  #[test]
  fn verify_notation_display() {
    let date = Utc.with_ymd_and_hms(2009, 2, 6, 22, 17, 38).unwrap();
    let v: Value = vec![
      ("b", Value::from(vec![0u8, 1, 2])),
      ("d", Value::from(date)),
      ("i", Value::from(vec![Value::from(1), Value::Real(1.0)])),
      ("s", Value::from("it's")),
      ("u", Value::Undefined),
    ]
    .into_iter()
    .collect();

    assert_eq!(
      v.to_string(),
      r#"{'b':b64"AAEC",'d':d"2009-02-06T22:17:38Z",'i':[i1,r1.0],'s':'it\'s','u':!}"#
    );
  }
}
