//! Parsed suites of LLIDL resources and the entry points that match values
//! against them

use crate::{
  ast::{fmt_definitions, Definitions, Node},
  llsd::Value,
  matcher::{Match, MatchError, Matcher, Outcome, DEFAULT_MAX_DEPTH},
};

use displaydoc::Display;
use std::{collections::BTreeMap, fmt, result, str::FromStr};

/// Alias for `Result` with an error of type `llidl::SuiteError`
pub type Result<T> = result::Result<T, Error>;

/// Resolution and strict matching errors
#[derive(Debug, Display, Clone, PartialEq)]
pub enum Error {
  /// unknown resource {0}
  UnknownResource(String),
  /// unknown direction {0}, expected request or response
  UnknownDirection(String),
  /// {0}
  Match(MatchError),
}

impl std::error::Error for Error {}

impl From<MatchError> for Error {
  fn from(e: MatchError) -> Self {
    Error::Match(e)
  }
}

/// Which message of a resource a value is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
  /// Sent to the resource
  Request,
  /// Returned by the resource
  Response,
}

impl FromStr for Direction {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self> {
    if s.eq_ignore_ascii_case("request") {
      Ok(Direction::Request)
    } else if s.eq_ignore_ascii_case("response") {
      Ok(Direction::Response)
    } else {
      Err(Error::UnknownDirection(s.to_string()))
    }
  }
}

impl fmt::Display for Direction {
  fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
    match self {
      Direction::Request => write!(f, "request"),
      Direction::Response => write!(f, "response"),
    }
  }
}

/// How a resource is accessed, named by the arrow in its declaration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
  /// `->` request `<-` response
  Post,
  /// `<<` response only
  Get,
  /// `>>` request only
  Put,
  /// `<>` the same body both ways
  GetPut,
  /// `<x>` the same body both ways, deletable
  GetPutDelete,
}

impl ResourceKind {
  /// Declaration arrow
  pub fn arrow(self) -> &'static str {
    match self {
      ResourceKind::Post => "->",
      ResourceKind::Get => "<<",
      ResourceKind::Put => ">>",
      ResourceKind::GetPut => "<>",
      ResourceKind::GetPutDelete => "<x>",
    }
  }
}

/// Named resource
///
/// ```text
/// resource = "%%" name ( "->" value "<-" value / ("<<" / ">>" / "<>" / "<x>") value )
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Resource {
  /// Name
  pub name: String,
  /// Access kind
  pub kind: ResourceKind,
  /// Request body. `undef` for resources that only respond
  pub request: Node,
  /// Response body. `undef` for resources that only accept
  pub response: Node,
}

impl Resource {
  /// Body node for a direction
  pub fn node(&self, direction: Direction) -> &Node {
    match direction {
      Direction::Request => &self.request,
      Direction::Response => &self.response,
    }
  }
}

impl fmt::Display for Resource {
  fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
    match self.kind {
      ResourceKind::Post => write!(
        f,
        "%% {}\n-> {}\n<- {}",
        self.name, self.request, self.response
      ),
      ResourceKind::Get => write!(f, "%% {} << {}", self.name, self.response),
      ResourceKind::Put => write!(f, "%% {} >> {}", self.name, self.request),
      ResourceKind::GetPut | ResourceKind::GetPutDelete => {
        write!(f, "%% {} {} {}", self.name, self.kind.arrow(), self.request)
      }
    }
  }
}

/// Immutable collection of resources and the definitions they reference
#[derive(Debug, Clone, PartialEq)]
pub struct Suite {
  resources: BTreeMap<String, Resource>,
  definitions: Definitions,
  max_depth: usize,
}

impl Suite {
  pub(crate) fn new(resources: BTreeMap<String, Resource>, definitions: Definitions) -> Self {
    Suite {
      resources,
      definitions,
      max_depth: DEFAULT_MAX_DEPTH,
    }
  }

  /// Sets the nesting depth past which matched values are graded
  /// incompatible
  pub fn with_max_depth(mut self, max_depth: usize) -> Self {
    self.max_depth = max_depth;
    self
  }

  /// Looks up a resource by name
  pub fn resource(&self, name: &str) -> Result<&Resource> {
    self
      .resources
      .get(name)
      .ok_or_else(|| Error::UnknownResource(name.to_string()))
  }

  /// All resources, ordered by name
  pub fn resources(&self) -> impl Iterator<Item = &Resource> {
    self.resources.values()
  }

  /// Named definitions
  pub fn definitions(&self) -> &Definitions {
    &self.definitions
  }

  /// Body node of a resource for a direction
  pub fn schema(&self, name: &str, direction: Direction) -> Result<&Node> {
    Ok(self.resource(name)?.node(direction))
  }

  /// Matches a value against a resource's request or response
  pub fn compare(&self, name: &str, direction: Direction, value: &Value) -> Result<Match> {
    let node = self.schema(name, direction)?;

    Ok(
      Matcher::new(&self.definitions)
        .with_max_depth(self.max_depth)
        .compare(node, value),
    )
  }

  /// Matches a value and fails when it grades below the threshold. Returns
  /// the converted value otherwise
  pub fn check(
    &self,
    name: &str,
    direction: Direction,
    value: &Value,
    threshold: Outcome,
  ) -> Result<Value> {
    Ok(self.compare(name, direction, value)?.check(threshold)?)
  }

  /// Whether or not a request matches exactly or by conversion
  pub fn match_request(&self, name: &str, value: &Value) -> Result<bool> {
    Ok(self.compare(name, Direction::Request, value)?.outcome.is_match())
  }

  /// Whether or not a response matches exactly or by conversion
  pub fn match_response(&self, name: &str, value: &Value) -> Result<bool> {
    Ok(self.compare(name, Direction::Response, value)?.outcome.is_match())
  }

  /// Whether or not a request is usable after conversion
  pub fn valid_request(&self, name: &str, value: &Value) -> Result<bool> {
    Ok(self.compare(name, Direction::Request, value)?.outcome.is_valid())
  }

  /// Whether or not a response is usable after conversion
  pub fn valid_response(&self, name: &str, value: &Value) -> Result<bool> {
    Ok(self.compare(name, Direction::Response, value)?.outcome.is_valid())
  }
}

impl fmt::Display for Suite {
  fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
    write!(f, "{}", fmt_definitions(&self.definitions))?;

    for resource in self.resources.values() {
      writeln!(f, "{}", resource)?;
    }

    Ok(())
  }
}

/// A single value description, without definitions
#[derive(Debug, Clone, PartialEq)]
pub struct Schema {
  node: Node,
  definitions: Definitions,
  max_depth: usize,
}

impl Schema {
  pub(crate) fn new(node: Node) -> Self {
    Schema {
      node,
      definitions: Definitions::new(),
      max_depth: DEFAULT_MAX_DEPTH,
    }
  }

  /// Sets the nesting depth past which matched values are graded
  /// incompatible
  pub fn with_max_depth(mut self, max_depth: usize) -> Self {
    self.max_depth = max_depth;
    self
  }

  /// Root node
  pub fn node(&self) -> &Node {
    &self.node
  }

  /// Matches a value
  pub fn compare(&self, value: &Value) -> Match {
    Matcher::new(&self.definitions)
      .with_max_depth(self.max_depth)
      .compare(&self.node, value)
  }

  /// Whether or not the value matches exactly or by conversion
  pub fn matches(&self, value: &Value) -> bool {
    self.compare(value).outcome.is_match()
  }

  /// Whether or not the value is usable after conversion
  pub fn valid(&self, value: &Value) -> bool {
    self.compare(value).outcome.is_valid()
  }

  /// Whether or not the value carries data the schema does not declare
  pub fn has_additional(&self, value: &Value) -> bool {
    self.compare(value).has_additional()
  }

  /// Whether or not matching the value fills in defaults
  pub fn has_defaulted(&self, value: &Value) -> bool {
    self.compare(value).has_defaulted()
  }

  /// Whether or not any part of the value is incompatible
  pub fn incompatible(&self, value: &Value) -> bool {
    self.compare(value).incompatible()
  }

  /// Matches a value and fails when it grades below the threshold
  pub fn check(&self, value: &Value, threshold: Outcome) -> result::Result<Value, MatchError> {
    self.compare(value).check(threshold)
  }
}

impl fmt::Display for Schema {
  fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
    write!(f, "{}", self.node)
  }
}
