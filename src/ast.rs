//! Schema node tree built by the parser
//!
//! A value description is a tree of [`Node`]s. Named definitions live in a
//! [`Definitions`] map and are referenced with [`Node::Alias`]. Every type
//! implements `Display`, which writes LLIDL text that parses back to an equal
//! tree.

use crate::llsd::{escape, Kind, Value};

use itertools::Itertools;
use std::{collections::BTreeMap, fmt};

/// Named alias definitions of a suite. A name defined more than once is a
/// variant and keeps every definition in declaration order
///
/// ```text
/// definition = "&" name "=" value
/// ```
pub type Definitions = BTreeMap<String, Vec<Node>>;

/// Schema node
///
/// ```text
/// value = typename / literal / array / map / dict / alias / selector
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
  /// `undef`, matches anything
  Any,
  /// Primitive type name
  Primitive(Kind),
  /// Literal value that must match exactly
  Literal(Value),
  /// Array
  Array(ArrayNode),
  /// Map with declared fields
  Map(MapNode),
  /// Map with arbitrary keys whose values all share one node
  Dictionary(Box<Node>),
  /// Map whose shape is chosen by the value of one of its fields
  Selector(SelectorNode),
  /// Reference to a named definition
  Alias(String),
}

/// Array size constraint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArraySize {
  /// Tuple, exactly as many elements as listed
  Exact,
  /// The listed elements form a pattern that repeats without bound
  Repeating,
}

/// Array node
///
/// ```text
/// array = "[" value *("," value) [","] ["..."] "]"
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct ArrayNode {
  /// Element nodes, at least one
  pub elements: Vec<Node>,
  /// Size constraint
  pub size: ArraySize,
}

/// Map node
///
/// ```text
/// map = "{" field *("," field) [","] "}"
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct MapNode {
  /// Declared fields in declaration order
  pub fields: Vec<Field>,
}

impl MapNode {
  /// Looks up a declared field by name
  pub fn field(&self, name: &str) -> Option<&Field> {
    self.fields.iter().find(|f| f.name == name)
  }
}

/// Map field
///
/// ```text
/// field = key ["?"] ":" value ["=" literal]
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
  /// Key
  pub name: String,
  /// Node the field's value must match
  pub node: Node,
  /// Whether or not the field may be absent
  pub optional: bool,
  /// Literal substituted when the field is absent
  pub default: Option<Value>,
}

impl Field {
  /// Whether or not an absent field is acceptable
  pub fn may_be_absent(&self) -> bool {
    self.optional || self.default.is_some()
  }
}

/// Selector node
///
/// ```text
/// selector = "select" key "{" selkey ":" value *("," selkey ":" value) [","] "}"
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct SelectorNode {
  /// Field whose value picks the alternative
  pub discriminant: String,
  /// Alternatives in declaration order
  pub alternatives: Vec<Alternative>,
}

impl SelectorNode {
  /// Alternative whose key equals the given discriminant value
  pub fn alternative(&self, key: &Value) -> Option<&Alternative> {
    self.alternatives.iter().find(|a| &a.key == key)
  }
}

/// Selector alternative
#[derive(Debug, Clone, PartialEq)]
pub struct Alternative {
  /// String or Integer key
  pub key: Value,
  /// Node describing the map, a Map or an alias of one
  pub node: Node,
}

/// LLIDL name of a primitive kind
pub fn type_name(kind: Kind) -> &'static str {
  match kind {
    Kind::Undefined => "undef",
    Kind::Boolean => "bool",
    Kind::Integer => "int",
    Kind::Real => "real",
    Kind::String => "string",
    Kind::Uuid => "uuid",
    Kind::Date => "date",
    Kind::Uri => "uri",
    Kind::Binary => "binary",
    Kind::Array => "array",
    Kind::Map => "map",
  }
}

fn is_bare_name(name: &str) -> bool {
  let mut chars = name.chars();

  match chars.next() {
    Some(c) if c.is_ascii_alphabetic() || c == '_' => {
      chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '/')
    }
    _ => false,
  }
}

/// Writes a key bare when it lexes as a name, quoted otherwise
pub(crate) fn fmt_key(name: &str) -> String {
  if is_bare_name(name) {
    name.to_string()
  } else {
    format!("\"{}\"", escape(name, '"'))
  }
}

/// LLIDL literal text of a value
pub(crate) fn fmt_literal(value: &Value) -> String {
  match value {
    Value::Boolean(b) => b.to_string(),
    Value::Integer(i) => i.to_string(),
    Value::Real(r) => format!("{:?}", r),
    Value::String(s) | Value::Uri(s) => format!("\"{}\"", escape(s, '"')),
    Value::Uuid(u) => format!("\"{}\"", u),
    Value::Date(d) => format!("\"{}\"", crate::llsd::format_date(d)),
    // Not expressible as literals
    Value::Undefined | Value::Binary(_) | Value::Array(_) | Value::Map(_) => "undef".into(),
  }
}

impl fmt::Display for Node {
  fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
    match self {
      Node::Any => write!(f, "undef"),
      Node::Primitive(kind) => write!(f, "{}", type_name(*kind)),
      Node::Literal(value) => write!(f, "{}", fmt_literal(value)),
      Node::Array(a) => write!(f, "{}", a),
      Node::Map(m) => write!(f, "{}", m),
      Node::Dictionary(node) => write!(f, "{{ $: {} }}", node),
      Node::Selector(s) => write!(f, "{}", s),
      Node::Alias(name) => write!(f, "&{}", name),
    }
  }
}

impl fmt::Display for ArrayNode {
  fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
    let elements = self.elements.iter().join(", ");

    match self.size {
      ArraySize::Exact => write!(f, "[ {} ]", elements),
      ArraySize::Repeating => write!(f, "[ {}, ... ]", elements),
    }
  }
}

impl fmt::Display for MapNode {
  fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
    write!(f, "{{ {} }}", self.fields.iter().join(", "))
  }
}

impl fmt::Display for Field {
  fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
    write!(f, "{}", fmt_key(&self.name))?;

    if self.optional {
      write!(f, "?")?;
    }

    write!(f, ": {}", self.node)?;

    if let Some(default) = &self.default {
      write!(f, " = {}", fmt_literal(default))?;
    }

    Ok(())
  }
}

impl fmt::Display for SelectorNode {
  fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
    write!(
      f,
      "select {} {{ {} }}",
      fmt_key(&self.discriminant),
      self
        .alternatives
        .iter()
        .map(|a| format!("{}: {}", fmt_literal(&a.key), a.node))
        .join(", ")
    )
  }
}

/// Writes every definition, one per line
pub fn fmt_definitions(definitions: &Definitions) -> String {
  let mut output = String::new();

  for (name, nodes) in definitions.iter() {
    for node in nodes.iter() {
      output.push_str(&format!("&{} = {}\n", name, node));
    }
  }

  output
}
