//! Graded comparison of LLSD values against schema nodes
//!
//! Matching never fails outright. Every value and node pair yields an
//! [`Outcome`], a converted value and the list of [`Finding`]s that explain
//! each decision below [`Outcome::Matched`].

use crate::{
  ast::{ArraySize, Definitions, Field, MapNode, Node, SelectorNode},
  coerce::{self, Coercion},
  llsd::{Kind, Map, Value},
};

use displaydoc::Display;
use log::{trace, warn};
use std::{fmt, fmt::Write, mem};

#[cfg(feature = "serde")]
use serde::Serialize;

/// Recursion limit used unless configured otherwise
pub const DEFAULT_MAX_DEPTH: usize = 128;

/// Graded verdict of a comparison, ordered from worst to best
///
/// Outcomes combine with [`Outcome::join`]. `Incompatible` absorbs every other
/// grade and `Matched` is the identity. Two different grades among
/// `Converted`, `Defaulted` and `Additional` combine to `Mixed`.
#[cfg_attr(feature = "serde", derive(Serialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Outcome {
  /// The value cannot be made to conform
  Incompatible,
  /// More than one kind of adjustment was needed
  Mixed,
  /// The value carried data the schema does not declare, which was dropped
  Additional,
  /// Missing or undefined data was filled in with defaults
  Defaulted,
  /// Scalars were converted without loss
  Converted,
  /// The value conforms as is
  Matched,
}

impl Outcome {
  /// Combines two outcomes
  pub fn join(self, other: Outcome) -> Outcome {
    match (self, other) {
      (Outcome::Incompatible, _) | (_, Outcome::Incompatible) => Outcome::Incompatible,
      (Outcome::Matched, o) | (o, Outcome::Matched) => o,
      (a, b) if a == b => a,
      _ => Outcome::Mixed,
    }
  }

  /// Combines any number of outcomes, `Matched` when there are none
  pub fn join_all<I: IntoIterator<Item = Outcome>>(outcomes: I) -> Outcome {
    outcomes.into_iter().fold(Outcome::Matched, Outcome::join)
  }

  /// Whether or not the value can be used after conversion
  pub fn is_valid(self) -> bool {
    self != Outcome::Incompatible
  }

  /// Whether or not the value matched exactly or by conversion only
  pub fn is_match(self) -> bool {
    self >= Outcome::Converted
  }
}

impl fmt::Display for Outcome {
  fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
    let s = match self {
      Outcome::Incompatible => "incompatible",
      Outcome::Mixed => "mixed",
      Outcome::Additional => "additional",
      Outcome::Defaulted => "defaulted",
      Outcome::Converted => "converted",
      Outcome::Matched => "matched",
    };

    write!(f, "{}", s)
  }
}

/// Why a part of a value did not match exactly
#[cfg_attr(feature = "serde", derive(Serialize))]
#[derive(Debug, Display, Clone, PartialEq)]
pub enum Reason {
  /// converted {from} to {to}
  Converted {
    /// Kind of the input
    from: Kind,
    /// Kind required by the schema
    to: Kind,
  },
  /// undefined or empty value replaced by the default
  Defaulted,
  /// missing optional key filled in with the default
  MissingOptional,
  /// missing array element filled in with the default
  MissingElement,
  /// undeclared key dropped
  UndeclaredKey,
  /// extra array element dropped
  ExtraElement,
  /// cannot convert {from} to {to}
  NotConvertible {
    /// Kind of the input
    from: Kind,
    /// Kind required by the schema
    to: Kind,
  },
  /// expected {expected}, found {found}
  WrongKind {
    /// Kind required by the schema
    expected: Kind,
    /// Kind of the input
    found: Kind,
  },
  /// missing required key
  MissingRequired,
  /// value does not equal the literal {0}
  LiteralMismatch(String),
  /// selector key {0} is missing or not a string or integer
  BadDiscriminant(String),
  /// no selector alternative for {0}
  UnknownAlternative(String),
  /// no definition named {0}
  UnknownAlias(String),
  /// maximum nesting depth exceeded
  DepthExceeded,
}

/// One non-exact decision made while matching
#[cfg_attr(feature = "serde", derive(Serialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct Finding {
  /// Location in the value in JSON pointer notation, empty for the root
  pub path: String,
  /// Grade of this decision
  pub outcome: Outcome,
  /// Explanation
  pub reason: Reason,
}

impl fmt::Display for Finding {
  fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
    if self.path.is_empty() {
      return write!(f, "{} at the root of the value: {}", self.outcome, self.reason);
    }

    write!(f, "{} at {}: {}", self.outcome, self.path, self.reason)
  }
}

/// Result of matching a value
#[derive(Debug, Clone, PartialEq)]
pub struct Match {
  /// Overall grade
  pub outcome: Outcome,
  /// Converted value. The original value when the outcome is incompatible
  pub value: Value,
  /// Every decision below `Matched`, in traversal order
  pub findings: Vec<Finding>,
}

impl Match {
  /// Whether or not any undeclared data was dropped
  pub fn has_additional(&self) -> bool {
    self.has(Outcome::Additional)
  }

  /// Whether or not any data was defaulted
  pub fn has_defaulted(&self) -> bool {
    self.has(Outcome::Defaulted)
  }

  /// Whether or not any part of the value was incompatible
  pub fn incompatible(&self) -> bool {
    self.has(Outcome::Incompatible)
  }

  fn has(&self, outcome: Outcome) -> bool {
    self.findings.iter().any(|f| f.outcome == outcome)
  }

  /// Fails when the outcome is worse than the threshold
  pub fn check(self, threshold: Outcome) -> Result<Value, MatchError> {
    if self.outcome >= threshold {
      return Ok(self.value);
    }

    Err(MatchError {
      outcome: self.outcome,
      threshold,
      findings: self.findings,
    })
  }
}

/// Strict matching failure
#[derive(Debug, Display, Clone, PartialEq)]
#[displaydoc("value graded {outcome}, at least {threshold} required")]
pub struct MatchError {
  /// Grade the value received
  pub outcome: Outcome,
  /// Grade that was required
  pub threshold: Outcome,
  /// Findings explaining the grade
  pub findings: Vec<Finding>,
}

impl std::error::Error for MatchError {}

/// Compares values against schema nodes, resolving aliases through a set of
/// definitions
#[derive(Debug, Clone)]
pub struct Matcher<'a> {
  definitions: &'a Definitions,
  max_depth: usize,
  depth: usize,
  location: String,
  findings: Vec<Finding>,
  // Aliases entered on the way down to the current node
  aliases: Vec<&'a str>,
}

impl<'a> Matcher<'a> {
  /// Creates a matcher over the given definitions
  pub fn new(definitions: &'a Definitions) -> Self {
    Matcher {
      definitions,
      max_depth: DEFAULT_MAX_DEPTH,
      depth: 0,
      location: String::new(),
      findings: Vec::new(),
      aliases: Vec::new(),
    }
  }

  /// Sets the nesting depth past which values are graded incompatible
  pub fn with_max_depth(mut self, max_depth: usize) -> Self {
    self.max_depth = max_depth;
    self
  }

  /// Matches a value against a node
  pub fn compare(&mut self, node: &Node, value: &Value) -> Match {
    self.depth = 0;
    self.location.clear();
    self.findings.clear();
    self.aliases.clear();

    let (outcome, value) = self.match_node(node, value);
    let findings = mem::take(&mut self.findings);

    for finding in findings.iter() {
      trace!("{}", finding);
    }

    Match {
      outcome,
      value,
      findings,
    }
  }

  fn record(&mut self, outcome: Outcome, reason: Reason) {
    self.findings.push(Finding {
      path: self.location.clone(),
      outcome,
      reason,
    });
  }

  fn enter<S: fmt::Display>(&mut self, segment: S) -> usize {
    let len = self.location.len();
    let segment = segment.to_string().replace('~', "~0").replace('/', "~1");
    let _ = write!(self.location, "/{}", segment);
    len
  }

  fn leave(&mut self, len: usize) {
    self.location.truncate(len);
  }

  fn incompatible(&mut self, value: &Value, reason: Reason) -> (Outcome, Value) {
    self.record(Outcome::Incompatible, reason);
    (Outcome::Incompatible, value.clone())
  }

  fn wrong_kind(&mut self, expected: Kind, value: &Value) -> (Outcome, Value) {
    self.incompatible(
      value,
      Reason::WrongKind {
        expected,
        found: value.kind(),
      },
    )
  }

  fn match_node(&mut self, node: &Node, value: &Value) -> (Outcome, Value) {
    if self.depth >= self.max_depth {
      warn!(
        "maximum nesting depth of {} exceeded at {:?}",
        self.max_depth, self.location
      );
      return self.incompatible(value, Reason::DepthExceeded);
    }

    self.depth += 1;

    let result = match node {
      Node::Any => (Outcome::Matched, value.clone()),
      Node::Primitive(kind) => self.match_primitive(*kind, value),
      Node::Literal(expected) => {
        if expected == value {
          (Outcome::Matched, value.clone())
        } else {
          self.incompatible(value, Reason::LiteralMismatch(expected.to_string()))
        }
      }
      Node::Array(a) => match value {
        Value::Array(items) => self.match_array(&a.elements, a.size, items, value),
        _ => self.wrong_kind(Kind::Array, value),
      },
      Node::Map(m) => self.match_map(m, value, None),
      Node::Dictionary(entry) => self.match_dictionary(entry, value),
      Node::Selector(s) => self.match_selector(s, value),
      Node::Alias(name) => self.match_alias(name, value),
    };

    self.depth -= 1;

    result
  }

  fn match_selector(&mut self, node: &SelectorNode, value: &Value) -> (Outcome, Value) {
    let map = match value {
      Value::Map(map) => map,
      _ => return self.wrong_kind(Kind::Map, value),
    };

    let key = match map.get(&node.discriminant) {
      Some(key @ Value::String(_)) | Some(key @ Value::Integer(_)) => key,
      _ => return self.incompatible(value, Reason::BadDiscriminant(node.discriminant.clone())),
    };

    let alternative = match node.alternative(key) {
      Some(alternative) => alternative,
      None => return self.incompatible(value, Reason::UnknownAlternative(key.to_string())),
    };

    match self.resolve_map(&alternative.node) {
      Some(m) => self.match_map(m, value, Some(&node.discriminant)),
      None => self.match_node(&alternative.node, value),
    }
  }

  fn match_primitive(&mut self, kind: Kind, value: &Value) -> (Outcome, Value) {
    match coerce::coerce(kind, value) {
      Coercion::Matched => (Outcome::Matched, value.clone()),
      Coercion::Converted(converted) => {
        self.record(
          Outcome::Converted,
          Reason::Converted {
            from: value.kind(),
            to: kind,
          },
        );
        (Outcome::Converted, converted)
      }
      Coercion::Defaulted(zero) => {
        self.record(Outcome::Defaulted, Reason::Defaulted);
        (Outcome::Defaulted, zero)
      }
      Coercion::Incompatible => self.incompatible(
        value,
        Reason::NotConvertible {
          from: value.kind(),
          to: kind,
        },
      ),
    }
  }

  fn match_array(
    &mut self,
    elements: &[Node],
    size: ArraySize,
    items: &[Value],
    value: &Value,
  ) -> (Outcome, Value) {
    let n = elements.len();
    if n == 0 {
      return (Outcome::Matched, value.clone());
    }

    let target_len = match size {
      ArraySize::Exact => n,
      // Pad to a whole number of repetitions of the pattern
      ArraySize::Repeating => ((items.len() + n - 1) / n) * n,
    };

    let mut outcome = Outcome::Matched;
    let mut converted = Vec::with_capacity(target_len);

    for (idx, element) in elements.iter().cycle().take(target_len).enumerate() {
      let len = self.enter(idx);

      match items.get(idx) {
        Some(item) => {
          let (o, v) = self.match_node(element, item);
          outcome = outcome.join(o);
          converted.push(v);
        }
        None => {
          self.record(Outcome::Defaulted, Reason::MissingElement);
          outcome = outcome.join(Outcome::Defaulted);
          converted.push(self.default_of(element, &mut self.aliases.clone()));
        }
      }

      self.leave(len);
    }

    for idx in target_len..items.len() {
      let len = self.enter(idx);
      self.record(Outcome::Additional, Reason::ExtraElement);
      outcome = outcome.join(Outcome::Additional);
      self.leave(len);
    }

    if outcome == Outcome::Incompatible {
      return (outcome, value.clone());
    }

    (outcome, Value::Array(converted))
  }

  fn match_map(
    &mut self,
    node: &MapNode,
    value: &Value,
    discriminant: Option<&str>,
  ) -> (Outcome, Value) {
    let map = match value {
      Value::Map(map) => map,
      _ => return self.wrong_kind(Kind::Map, value),
    };

    let mut outcome = Outcome::Matched;
    let mut converted = Map::new();

    for field in node.fields.iter() {
      let len = self.enter(&field.name);

      match map.get(&field.name) {
        Some(v) if !(v.is_undefined() && field.may_be_absent()) => {
          let (o, v) = self.match_node(&field.node, v);
          outcome = outcome.join(o);
          converted.insert(field.name.clone(), v);
        }
        present if field.may_be_absent() => {
          let default = self.field_default(field, &mut self.aliases.clone());

          // An undef that is already the default stays as it is
          if present.is_none() || !default.is_undefined() {
            self.record(Outcome::Defaulted, Reason::MissingOptional);
            outcome = outcome.join(Outcome::Defaulted);
          }

          converted.insert(field.name.clone(), default);
        }
        _ => {
          self.record(Outcome::Incompatible, Reason::MissingRequired);
          outcome = Outcome::Incompatible;
        }
      }

      self.leave(len);
    }

    for (key, v) in map.iter().filter(|(k, _)| node.field(k).is_none()) {
      if Some(key.as_str()) == discriminant {
        converted.insert(key.clone(), v.clone());
        continue;
      }

      let len = self.enter(key);
      self.record(Outcome::Additional, Reason::UndeclaredKey);
      outcome = outcome.join(Outcome::Additional);
      self.leave(len);
    }

    if outcome == Outcome::Incompatible {
      return (outcome, value.clone());
    }

    (outcome, Value::Map(converted))
  }

  fn match_dictionary(&mut self, entry: &Node, value: &Value) -> (Outcome, Value) {
    let map = match value {
      Value::Map(map) => map,
      _ => return self.wrong_kind(Kind::Map, value),
    };

    let mut outcome = Outcome::Matched;
    let mut converted = Map::new();

    for (key, v) in map.iter() {
      let len = self.enter(key);
      let (o, v) = self.match_node(entry, v);
      outcome = outcome.join(o);
      converted.insert(key.clone(), v);
      self.leave(len);
    }

    if outcome == Outcome::Incompatible {
      return (outcome, value.clone());
    }

    (outcome, Value::Map(converted))
  }

  fn match_alias(&mut self, name: &str, value: &Value) -> (Outcome, Value) {
    let definitions = self.definitions;

    let (name, nodes) = match definitions.get_key_value(name) {
      Some((name, nodes)) if !nodes.is_empty() => (name.as_str(), nodes),
      _ => return self.incompatible(value, Reason::UnknownAlias(name.to_string())),
    };

    self.aliases.push(name);
    let result = self.match_variants(nodes, value);
    self.aliases.pop();

    result
  }

  fn match_variants(&mut self, nodes: &[Node], value: &Value) -> (Outcome, Value) {
    if nodes.len() == 1 {
      return self.match_node(&nodes[0], value);
    }

    // Variant: keep the best definition, the first one on ties
    let start = self.findings.len();
    let mut best: Option<(Outcome, Value, Vec<Finding>)> = None;

    for node in nodes.iter() {
      let (o, v) = self.match_node(node, value);
      let findings = self.findings.split_off(start);

      match &best {
        Some((b, _, _)) if o <= *b => (),
        _ => best = Some((o, v, findings)),
      }

      if o == Outcome::Matched {
        break;
      }
    }

    match best {
      Some((o, v, mut findings)) => {
        self.findings.append(&mut findings);
        (o, v)
      }
      None => (Outcome::Incompatible, value.clone()),
    }
  }

  /// Map node an alias chain ends in, when it ends in exactly one
  fn resolve_map<'n>(&self, node: &'n Node) -> Option<&'n MapNode>
  where
    'a: 'n,
  {
    let mut node = node;

    for _ in 0..=self.definitions.len() {
      match node {
        Node::Map(m) => return Some(m),
        Node::Alias(name) => match self.definitions.get(name) {
          Some(nodes) if nodes.len() == 1 => node = &nodes[0],
          _ => return None,
        },
        _ => return None,
      }
    }

    None
  }

  fn field_default(&self, field: &Field, expanding: &mut Vec<&'a str>) -> Value {
    if let Some(literal) = &field.default {
      let mut matcher = Matcher::new(self.definitions).with_max_depth(self.max_depth);
      matcher.depth = self.depth;

      let (outcome, v) = matcher.match_node(&field.node, literal);
      if outcome.is_valid() {
        return v;
      }
    }

    self.default_of(&field.node, expanding)
  }

  /// Value substituted for a missing part of the value. An alias that is
  /// already being expanded defaults to undef, so the result is bounded by
  /// the size of the schema
  fn default_of(&self, node: &Node, expanding: &mut Vec<&'a str>) -> Value {
    match node {
      Node::Any => Value::Undefined,
      Node::Primitive(kind) => coerce::zero(*kind),
      Node::Literal(value) => value.clone(),
      Node::Array(a) => match a.size {
        ArraySize::Exact => Value::Array(
          a.elements
            .iter()
            .map(|e| self.default_of(e, expanding))
            .collect(),
        ),
        ArraySize::Repeating => Value::Array(Vec::new()),
      },
      Node::Map(m) => self.map_default(m, expanding),
      Node::Dictionary(_) => Value::Map(Map::new()),
      Node::Selector(s) => match s.alternatives.first() {
        Some(alternative) => {
          let mut value = match self.resolve_map(&alternative.node) {
            Some(m) => self.map_default(m, expanding),
            None => self.default_of(&alternative.node, expanding),
          };

          if let Value::Map(map) = &mut value {
            map.insert(s.discriminant.clone(), alternative.key.clone());
          }

          value
        }
        None => Value::Map(Map::new()),
      },
      Node::Alias(name) => {
        let definitions: &'a Definitions = self.definitions;

        match definitions.get_key_value(name) {
          Some((name, nodes)) if !expanding.contains(&name.as_str()) => match nodes.first() {
            Some(node) => {
              expanding.push(name.as_str());
              let value = self.default_of(node, expanding);
              expanding.pop();
              value
            }
            None => Value::Undefined,
          },
          _ => Value::Undefined,
        }
      }
    }
  }

  fn map_default(&self, node: &MapNode, expanding: &mut Vec<&'a str>) -> Value {
    Value::Map(
      node
        .fields
        .iter()
        .map(|f| (f.name.clone(), self.field_default(f, expanding)))
        .collect(),
    )
  }
}

/// Matches a value against a node that references no definitions
pub fn compare(node: &Node, value: &Value) -> Match {
  let definitions = Definitions::new();
  Matcher::new(&definitions).compare(node, value)
}
