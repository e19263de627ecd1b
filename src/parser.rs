//! LLIDL parser
//!
//! A single-pass recursive-descent parser over the tokens produced by
//! [`crate::lexer`]. Alias references may appear before their definitions, so
//! name resolution and the checks that depend on it run once the whole input
//! has been read. A suite is only returned whole.

use super::{
  ast::{Alternative, ArrayNode, ArraySize, Definitions, Field, MapNode, Node, SelectorNode},
  error::{self, ErrorMsg, MsgType},
  lexer::{self, Lexer, Position},
  llsd::Value,
  matcher::{Matcher, Outcome, DEFAULT_MAX_DEPTH},
  suite::{Resource, ResourceKind, Schema, Suite},
  token::{self, Token},
};

use displaydoc::Display;
use itertools::Itertools;
use log::debug;
use std::{
  collections::{BTreeMap, BTreeSet},
  mem, result,
};

/// Alias for `Result` with an error of type `llidl::ParserError`
pub type Result<T> = result::Result<T, Error>;

/// Parsing error types
#[derive(Debug, Display)]
pub enum Error {
  /// Lexing error
  #[displaydoc("{0}")]
  LEXER(lexer::Error),
  /// Parsing error occurred
  #[displaydoc("parsing error: position {position}, msg: {msg}")]
  PARSER {
    /// Error position
    position: Position,
    /// Error message
    msg: ErrorMsg,
  },
}

impl std::error::Error for Error {}

impl From<lexer::Error> for Error {
  fn from(e: lexer::Error) -> Self {
    Error::LEXER(e)
  }
}

impl Error {
  /// Where the error was detected
  pub fn position(&self) -> Position {
    match self {
      Error::LEXER(e) => e.position,
      Error::PARSER { position, .. } => *position,
    }
  }

  /// Message describing the error
  pub fn msg(&self) -> ErrorMsg {
    match self {
      Error::LEXER(e) => e.msg(),
      Error::PARSER { msg, .. } => msg.clone(),
    }
  }

  /// Renders the error as a diagnostic over the source it was parsed from
  pub fn report(&self, input: &str) -> String {
    let rendered = match self {
      Error::LEXER(e) => return e.to_string(),
      Error::PARSER { position, msg } => {
        error::diagnostic(input, "parser error", position.range, msg.to_string())
      }
    };

    rendered.unwrap_or_else(|_| self.to_string())
  }
}

// Checks that need every definition, run after the full pass
#[derive(Debug)]
enum Pending {
  Alias {
    name: String,
    position: Position,
  },
  Selector {
    discriminant: String,
    alternatives: Vec<(Position, Value, Node)>,
  },
  Default {
    node: Node,
    default: Value,
    position: Position,
  },
}

/// Parser over LLIDL source text
pub struct Parser<'a> {
  lexer: Lexer<'a>,
  cur_token: Token<'a>,
  position: Position,
  max_depth: usize,
  depth: usize,
  pending: Vec<Pending>,
}

impl<'a> Parser<'a> {
  /// Creates a parser and reads the first token
  pub fn new(str_input: &'a str) -> Result<Parser<'a>> {
    let mut p = Parser {
      lexer: Lexer::new(str_input),
      cur_token: Token::EOF,
      position: Position::default(),
      max_depth: DEFAULT_MAX_DEPTH,
      depth: 0,
      pending: Vec::new(),
    };

    p.next_token()?;

    Ok(p)
  }

  /// Sets the nesting depth past which input is rejected
  pub fn with_max_depth(mut self, max_depth: usize) -> Self {
    self.max_depth = max_depth;
    self
  }

  fn next_token(&mut self) -> Result<()> {
    let (position, token) = self.lexer.next_token()?;
    self.cur_token = token;
    self.position = position;

    Ok(())
  }

  fn error(&self, mt: MsgType) -> Error {
    self.error_at(self.position, mt)
  }

  fn error_at(&self, position: Position, mt: MsgType) -> Error {
    Error::PARSER {
      position,
      msg: mt.into(),
    }
  }

  fn expect(&mut self, token: Token, mt: MsgType) -> Result<()> {
    if self.cur_token != token {
      return Err(self.error(mt));
    }

    self.next_token()
  }

  /// Parses a suite of resources and definitions
  pub fn parse_suite(&mut self) -> Result<Suite> {
    let mut resources = BTreeMap::new();
    let mut definitions = Definitions::new();
    let mut definition_positions = BTreeMap::new();

    loop {
      match self.cur_token {
        Token::EOF => break,
        Token::RESOURCE => {
          self.next_token()?;

          let (position, name) = self.parse_name()?;
          if resources.contains_key(&name) {
            return Err(
              self.error_at(position, MsgType::DuplicateResourceName)
                .with_detail(&name),
            );
          }

          let resource = self.parse_resource(name.clone())?;
          resources.insert(name, resource);
        }
        Token::AMPERSAND => {
          self.next_token()?;

          let (position, name) = self.parse_name()?;
          self.expect(Token::ASSIGN, MsgType::ExpectedEqualsSign)?;

          let node = self.parse_value()?;
          definition_positions.entry(name.clone()).or_insert(position);
          definitions.entry(name).or_insert_with(Vec::new).push(node);
        }
        _ => return Err(self.error(MsgType::ExpectedDeclaration)),
      }
    }

    self.resolve(&definitions, &definition_positions)?;

    debug!(
      "parsed suite with {} definitions and {} resources",
      definitions.len(),
      resources.len()
    );

    Ok(Suite::new(resources, definitions))
  }

  /// Parses a single value description
  pub fn parse_schema(&mut self) -> Result<Schema> {
    let node = self.parse_value()?;

    if self.cur_token != Token::EOF {
      return Err(self.error(MsgType::ExpectedEndOfInput));
    }

    self.resolve(&Definitions::new(), &BTreeMap::new())?;

    debug!("parsed schema {}", node);

    Ok(Schema::new(node))
  }

  fn parse_name(&mut self) -> Result<(Position, String)> {
    let position = self.position;

    match self.cur_token.name() {
      Some(name) => {
        self.next_token()?;
        Ok((position, name.to_string()))
      }
      None => Err(self.error(MsgType::ExpectedName)),
    }
  }

  fn parse_resource(&mut self, name: String) -> Result<Resource> {
    let kind = match self.cur_token {
      Token::POST => ResourceKind::Post,
      Token::GET => ResourceKind::Get,
      Token::PUT => ResourceKind::Put,
      Token::GETPUT => ResourceKind::GetPut,
      Token::GETPUTDEL => ResourceKind::GetPutDelete,
      _ => return Err(self.error(MsgType::ExpectedResourceArrow)),
    };

    self.next_token()?;

    let (request, response) = match kind {
      ResourceKind::Post => {
        let request = self.parse_value()?;
        self.expect(Token::RESULT, MsgType::ExpectedResultArrow)?;
        (request, self.parse_value()?)
      }
      ResourceKind::Get => (Node::Any, self.parse_value()?),
      ResourceKind::Put => (self.parse_value()?, Node::Any),
      ResourceKind::GetPut | ResourceKind::GetPutDelete => {
        let node = self.parse_value()?;
        (node.clone(), node)
      }
    };

    Ok(Resource {
      name,
      kind,
      request,
      response,
    })
  }

  fn parse_value(&mut self) -> Result<Node> {
    if self.depth >= self.max_depth {
      return Err(self.error(MsgType::NestingTooDeep));
    }

    self.depth += 1;
    let node = self.parse_value_inner();
    self.depth -= 1;

    node
  }

  fn parse_value_inner(&mut self) -> Result<Node> {
    if let Some(kind) = self.cur_token.primitive_kind() {
      self.next_token()?;
      return Ok(Node::Primitive(kind));
    }

    match &self.cur_token {
      Token::UNDEF => {
        self.next_token()?;
        Ok(Node::Any)
      }
      Token::TRUE | Token::FALSE | Token::VALUE(_) => Ok(Node::Literal(self.parse_literal()?)),
      Token::LBRACKET => self.parse_array(),
      Token::LBRACE => self.parse_map(),
      Token::SELECT => self.parse_selector(),
      Token::AMPERSAND => {
        let position = self.position;
        self.next_token()?;

        let (_, name) = self.parse_name()?;
        self.pending.push(Pending::Alias {
          name: name.clone(),
          position,
        });

        Ok(Node::Alias(name))
      }
      Token::IDENT(ident) => {
        Err(self.error(MsgType::UnknownType).with_detail(*ident))
      }
      _ => Err(self.error(MsgType::ExpectedValue)),
    }
  }

  fn parse_literal(&mut self) -> Result<Value> {
    let value = match &self.cur_token {
      Token::TRUE => Value::Boolean(true),
      Token::FALSE => Value::Boolean(false),
      Token::VALUE(token::Value::INT(i)) => Value::Integer(*i),
      Token::VALUE(token::Value::FLOAT(f)) => Value::Real(*f),
      Token::VALUE(token::Value::TEXT(t)) => Value::String(t.to_string()),
      _ => return Err(self.error(MsgType::ExpectedDefaultLiteral)),
    };

    self.next_token()?;

    Ok(value)
  }

  fn parse_array(&mut self) -> Result<Node> {
    self.next_token()?;

    if self.cur_token == Token::RBRACKET {
      return Err(self.error(MsgType::EmptyArray));
    }

    let mut elements = Vec::new();
    let mut size = ArraySize::Exact;

    loop {
      elements.push(self.parse_value()?);

      let comma = self.cur_token == Token::COMMA;
      if comma {
        self.next_token()?;
      }

      match self.cur_token {
        Token::ELLIPSIS => {
          self.next_token()?;
          size = ArraySize::Repeating;
          self.expect(Token::RBRACKET, MsgType::ExpectedCloseBracket)?;
          break;
        }
        Token::RBRACKET => {
          self.next_token()?;
          break;
        }
        _ if comma => (),
        _ => return Err(self.error(MsgType::ExpectedCloseBracket)),
      }
    }

    Ok(Node::Array(ArrayNode { elements, size }))
  }

  fn parse_map(&mut self) -> Result<Node> {
    self.next_token()?;

    match self.cur_token {
      Token::RBRACE => return Err(self.error(MsgType::EmptyMap)),
      Token::DOLLAR => {
        self.next_token()?;
        self.expect(Token::COLON, MsgType::ExpectedColon)?;
        let node = self.parse_value()?;
        self.expect(Token::RBRACE, MsgType::ExpectedCloseBrace)?;

        return Ok(Node::Dictionary(Box::new(node)));
      }
      _ => (),
    }

    let mut fields: Vec<Field> = Vec::new();

    loop {
      let position = self.position;
      let field = self.parse_field()?;

      if fields.iter().any(|f| f.name == field.name) {
        return Err(
          self
            .error_at(position, MsgType::DuplicateFieldName)
            .with_detail(&field.name),
        );
      }

      fields.push(field);

      if self.cur_token == Token::COMMA {
        self.next_token()?;

        if self.cur_token == Token::RBRACE {
          self.next_token()?;
          break;
        }

        continue;
      }

      self.expect(Token::RBRACE, MsgType::ExpectedCloseBrace)?;
      break;
    }

    Ok(Node::Map(MapNode { fields }))
  }

  fn parse_key(&mut self) -> Result<String> {
    if let Some(name) = self.cur_token.name() {
      self.next_token()?;
      return Ok(name.to_string());
    }

    match &self.cur_token {
      Token::VALUE(token::Value::TEXT(t)) => {
        let key = t.to_string();
        self.next_token()?;
        Ok(key)
      }
      Token::VALUE(_) => Err(self.error(MsgType::ExpectedNameInQuotes)),
      _ => Err(self.error(MsgType::ExpectedName)),
    }
  }

  fn parse_field(&mut self) -> Result<Field> {
    let name = self.parse_key()?;

    let optional = self.cur_token == Token::OPTIONAL;
    if optional {
      self.next_token()?;
    }

    self.expect(Token::COLON, MsgType::ExpectedColon)?;

    let node = self.parse_value()?;

    let default = if self.cur_token == Token::ASSIGN {
      self.next_token()?;

      let position = self.position;
      let default = self.parse_literal()?;
      self.pending.push(Pending::Default {
        node: node.clone(),
        default: default.clone(),
        position,
      });

      Some(default)
    } else {
      None
    };

    Ok(Field {
      name,
      node,
      optional,
      default,
    })
  }

  fn parse_selector(&mut self) -> Result<Node> {
    self.next_token()?;

    let discriminant = self.parse_key()?;

    self.expect(Token::LBRACE, MsgType::ExpectedOpenBrace)?;

    if self.cur_token == Token::RBRACE {
      return Err(self.error(MsgType::EmptyMap));
    }

    let mut alternatives: Vec<Alternative> = Vec::new();
    let mut positions = Vec::new();

    loop {
      let position = self.position;

      let key = match &self.cur_token {
        Token::VALUE(token::Value::TEXT(t)) => Value::String(t.to_string()),
        Token::VALUE(token::Value::INT(i)) => Value::Integer(*i),
        Token::VALUE(_) | Token::TRUE | Token::FALSE => {
          return Err(self.error(MsgType::SelectorDiscriminantNotScalar))
        }
        _ => return Err(self.error(MsgType::ExpectedSelectorKey)),
      };

      if alternatives.iter().any(|a| a.key == key) {
        return Err(
          self
            .error(MsgType::DuplicateSelectorAlternative)
            .with_detail(key.to_string()),
        );
      }

      self.next_token()?;
      self.expect(Token::COLON, MsgType::ExpectedColon)?;

      let node = self.parse_value()?;
      positions.push((position, key.clone(), node.clone()));
      alternatives.push(Alternative { key, node });

      if self.cur_token == Token::COMMA {
        self.next_token()?;

        if self.cur_token == Token::RBRACE {
          self.next_token()?;
          break;
        }

        continue;
      }

      self.expect(Token::RBRACE, MsgType::ExpectedCloseBrace)?;
      break;
    }

    self.pending.push(Pending::Selector {
      discriminant: discriminant.clone(),
      alternatives: positions,
    });

    Ok(Node::Selector(SelectorNode {
      discriminant,
      alternatives,
    }))
  }

  // Name resolution and the checks that depend on it
  fn resolve(
    &mut self,
    definitions: &Definitions,
    definition_positions: &BTreeMap<String, Position>,
  ) -> Result<()> {
    let pending = mem::take(&mut self.pending);

    let missing = pending
      .iter()
      .filter_map(|p| match p {
        Pending::Alias { name, position } if !definitions.contains_key(name) => {
          Some((name.as_str(), *position))
        }
        _ => None,
      })
      .collect::<Vec<_>>();

    if let Some((_, position)) = missing.first() {
      let names = missing.iter().map(|(name, _)| *name).unique().join(", ");

      return Err(
        self
          .error_at(*position, MsgType::UnresolvedAlias)
          .with_detail(names),
      );
    }

    for (name, position) in definition_positions.iter() {
      if alias_cycle(definitions, name) {
        return Err(
          self
            .error_at(*position, MsgType::CyclicAlias)
            .with_detail(name.as_str()),
        );
      }
    }

    for p in pending.iter() {
      match p {
        Pending::Selector {
          discriminant,
          alternatives,
        } => {
          for (position, key, node) in alternatives.iter() {
            let map = match resolve_map(definitions, node) {
              Some(map) => map,
              None => return Err(self.error_at(*position, MsgType::SelectorAlternativeNotMap)),
            };

            if let Some(field) = map.field(discriminant) {
              if !is_scalar_key_node(&field.node) {
                return Err(
                  self
                    .error_at(*position, MsgType::SelectorDiscriminantNotScalar)
                    .with_detail(discriminant.as_str()),
                );
              }

              if !accepts_key(&field.node, key) {
                return Err(
                  self
                    .error_at(*position, MsgType::SelectorKeyRejected)
                    .with_detail(format!("{} is declared as {}", discriminant, field.node)),
                );
              }
            }
          }
        }
        Pending::Default {
          node,
          default,
          position,
        } => {
          let outcome = Matcher::new(definitions)
            .with_max_depth(self.max_depth)
            .compare(node, default)
            .outcome;

          if outcome == Outcome::Incompatible {
            return Err(
              self
                .error_at(*position, MsgType::IncompatibleDefault)
                .with_detail(format!("{} for {}", default, node)),
            );
          }
        }
        Pending::Alias { .. } => (),
      }
    }

    Ok(())
  }
}

impl Error {
  fn with_detail<S: Into<String>>(self, detail: S) -> Self {
    match self {
      Error::PARSER { position, msg } => Error::PARSER {
        position,
        msg: msg.with_detail(detail),
      },
      e => e,
    }
  }
}

// Whether or not a chain of bare aliases starting at `start` leads back to it
fn alias_cycle(definitions: &Definitions, start: &str) -> bool {
  let mut seen = BTreeSet::new();
  let mut stack = vec![start];

  while let Some(name) = stack.pop() {
    for node in definitions.get(name).into_iter().flatten() {
      if let Node::Alias(next) = node {
        if next == start {
          return true;
        }

        if seen.insert(next.as_str()) {
          stack.push(next.as_str());
        }
      }
    }
  }

  false
}

fn resolve_map<'d>(definitions: &'d Definitions, node: &'d Node) -> Option<&'d MapNode> {
  let mut node = node;

  for _ in 0..=definitions.len() {
    match node {
      Node::Map(m) => return Some(m),
      Node::Alias(name) => match definitions.get(name) {
        Some(nodes) if nodes.len() == 1 => node = &nodes[0],
        _ => return None,
      },
      _ => return None,
    }
  }

  None
}

fn is_scalar_key_node(node: &Node) -> bool {
  use crate::llsd::Kind;

  matches!(
    node,
    Node::Literal(Value::String(_))
      | Node::Literal(Value::Integer(_))
      | Node::Primitive(Kind::String)
      | Node::Primitive(Kind::Integer)
  )
}

// Whether or not a declared discriminant takes the alternative's key as is
fn accepts_key(node: &Node, key: &Value) -> bool {
  match node {
    Node::Literal(literal) => literal == key,
    Node::Primitive(kind) => *kind == key.kind(),
    _ => false,
  }
}

/// Returns a `Suite` from a `&str`
///
/// # Arguments
///
/// * `input` - A string slice with the LLIDL suite text
///
/// # Example
///
/// ```
/// use llidl::suite_from_str;
///
/// let input = r#"
///   %% agent/name
///   -> { agent_id: uuid }
///   <- { name: string }
/// "#;
///
/// assert!(suite_from_str(input).is_ok());
/// ```
pub fn suite_from_str(input: &str) -> Result<Suite> {
  Parser::new(input)?.parse_suite()
}

/// Returns a `Schema` from a `&str` holding a single value description
///
/// # Arguments
///
/// * `input` - A string slice with the LLIDL value text
///
/// # Example
///
/// ```
/// use llidl::schema_from_str;
///
/// let schema = schema_from_str("[ real, real, real ]").unwrap();
/// ```
pub fn schema_from_str(input: &str) -> Result<Schema> {
  Parser::new(input)?.parse_schema()
}

#[cfg(test)]
#[allow(unused_imports)]
mod tests {
  use super::*;
  use crate::llsd::Kind;
  use indoc::indoc;
  use pretty_assertions::assert_eq;

  fn parse_error(input: &str) -> (usize, usize, String) {
    match suite_from_str(input) {
      Ok(s) => panic!("expected error parsing {:?}, got {:?}", input, s),
      Err(e) => {
        let position = e.position();
        (position.line, position.column, e.msg().short)
      }
    }
  }

  fn schema_error(input: &str) -> (usize, String) {
    match schema_from_str(input) {
      Ok(s) => panic!("expected error parsing {:?}, got {:?}", input, s),
      Err(e) => (e.position().column, e.msg().short),
    }
  }

  fn field(name: &str, node: Node) -> Field {
    Field {
      name: name.into(),
      node,
      optional: false,
      default: None,
    }
  }

  #[test]
  fn verify_primitives() -> Result<()> {
    let expected = [
      ("undef", Node::Any),
      ("bool", Node::Primitive(Kind::Boolean)),
      ("int", Node::Primitive(Kind::Integer)),
      ("real", Node::Primitive(Kind::Real)),
      ("string", Node::Primitive(Kind::String)),
      ("uuid", Node::Primitive(Kind::Uuid)),
      ("date", Node::Primitive(Kind::Date)),
      ("uri", Node::Primitive(Kind::Uri)),
      ("binary", Node::Primitive(Kind::Binary)),
      ("true", Node::Literal(Value::from(true))),
      ("-12", Node::Literal(Value::from(-12))),
      ("0.5", Node::Literal(Value::from(0.5))),
      (r#""blue""#, Node::Literal(Value::from("blue"))),
    ];

    for (input, node) in expected.iter() {
      assert_eq!(schema_from_str(input)?.node(), node);
    }

    Ok(())
  }

  #[test]
  fn verify_parse_map() -> Result<()> {
    let schema = schema_from_str(indoc!(
      r#"
        {
          name: string, ; who
          "favorite color"?: string,
          size: real = 1,
        }
      "#
    ))?;

    assert_eq!(
      schema.node(),
      &Node::Map(MapNode {
        fields: vec![
          field("name", Node::Primitive(Kind::String)),
          Field {
            optional: true,
            ..field("favorite color", Node::Primitive(Kind::String))
          },
          Field {
            default: Some(Value::from(1)),
            ..field("size", Node::Primitive(Kind::Real))
          },
        ],
      })
    );

    Ok(())
  }

  #[test]
  fn verify_parse_arrays() -> Result<()> {
    assert_eq!(
      schema_from_str("[ int, string, ... ]")?.node(),
      &Node::Array(ArrayNode {
        elements: vec![Node::Primitive(Kind::Integer), Node::Primitive(Kind::String)],
        size: ArraySize::Repeating,
      })
    );

    assert_eq!(
      schema_from_str("[real,real,]")?.node(),
      &Node::Array(ArrayNode {
        elements: vec![Node::Primitive(Kind::Real), Node::Primitive(Kind::Real)],
        size: ArraySize::Exact,
      })
    );

    assert_eq!(
      schema_from_str("{ $: [ uuid, ... ] }")?.node(),
      &Node::Dictionary(Box::new(Node::Array(ArrayNode {
        elements: vec![Node::Primitive(Kind::Uuid)],
        size: ArraySize::Repeating,
      })))
    );

    Ok(())
  }

  #[test]
  fn verify_parse_suite() -> Result<()> {
    let suite = suite_from_str(indoc!(
      r#"
        %% agent/name
        -> { agent_id: uuid }
        <- { name: &name }

        &name = string
        &name = { first: string, last: string }

        %% motd << string
        %% mute >> { on: bool }
        %% prefs <> { $: string }
        %% item <x> &name
      "#
    ))?;

    assert_eq!(suite.definitions()["name"].len(), 2);
    assert_eq!(
      suite.resources().map(|r| r.name.as_str()).collect::<Vec<_>>(),
      vec!["agent/name", "item", "motd", "mute", "prefs"]
    );

    let motd = suite.resource("motd").unwrap();
    assert_eq!(motd.kind, ResourceKind::Get);
    assert_eq!(motd.request, Node::Any);
    assert_eq!(motd.response, Node::Primitive(Kind::String));

    let mute = suite.resource("mute").unwrap();
    assert_eq!(mute.kind, ResourceKind::Put);
    assert_eq!(mute.response, Node::Any);

    let item = suite.resource("item").unwrap();
    assert_eq!(item.kind, ResourceKind::GetPutDelete);
    assert_eq!(item.request, Node::Alias("name".into()));
    assert_eq!(item.request, item.response);

    Ok(())
  }

  #[test]
  fn verify_missing_type() {
    match suite_from_str("%% a -> {name: } <- undef") {
      Err(Error::PARSER { position, msg }) => {
        assert_eq!(msg.short, "expected value");
        assert_eq!((position.line, position.column, position.index), (1, 16, 15));
      }
      other => panic!("expected parser error, got {:?}", other),
    }

    match schema_from_str("{name: }") {
      Err(Error::PARSER { position, msg }) => {
        assert_eq!(msg.short, "expected value");
        assert_eq!((position.line, position.column, position.index), (1, 8, 7));
      }
      other => panic!("expected parser error, got {:?}", other),
    }
  }

  #[test]
  fn verify_value_errors() {
    let cases = [
      ("", (1, "expected value")),
      ("[]", (2, "empty array")),
      ("[int", (5, "expected close bracket")),
      ("[int,,bool]", (6, "expected value")),
      ("[int bool]", (6, "expected close bracket")),
      ("{}", (2, "empty map")),
      ("{a int}", (4, "expected colon")),
      ("{a:,b:int}", (4, "expected value")),
      ("{a:int b:int}", (8, "expected close brace")),
      ("{a:int,a:bool}", (8, "duplicate key in map")),
      ("{3:int}", (2, "expected name in quotes")),
      ("{a:int = int}", (10, "expected default value literal")),
      ("color", (1, "unknown type")),
      ("int int", (5, "expected end of input")),
      ("&thing", (1, "missing definitions of variants")),
      ("{ $: int", (9, "expected close brace")),
      ("{when: date = \"yesterday\"}", (15, "default value is incompatible with the field type")),
      ("{when: date = \"2009-02-06T22:17:38Z\", n: int = 1.5}", (48, "default value is incompatible with the field type")),
    ];

    for (input, (column, msg)) in cases.iter() {
      assert_eq!(schema_error(input), (*column, msg.to_string()), "{:?}", input);
    }
  }

  #[test]
  fn verify_lexer_errors() {
    let cases = [
      ("\"feh", (5, "expected close quote")),
      ("{alpha-omega: int}", (7, "malformed name: hyphen (-) not allowed")),
      ("{a: int} !", (10, "invalid character")),
      ("\"\\q\"", (3, "invalid escape character")),
      ("4294967296", (1, "integer literal out of range")),
    ];

    for (input, (column, msg)) in cases.iter() {
      assert_eq!(schema_error(input), (*column, msg.to_string()), "{:?}", input);
    }
  }

  #[test]
  fn verify_suite_errors() {
    assert_eq!(
      parse_error("%% a -> int <- int\n%% a -> int <- int"),
      (2, 4, "duplicate resource name".into())
    );
    assert_eq!(
      parse_error("%% a -> int string"),
      (1, 13, "expected result arrow '<-'".into())
    );
    assert_eq!(
      parse_error("%% a ~> int"),
      (1, 6, "invalid character".into())
    );
    assert_eq!(
      parse_error("%% a int"),
      (1, 6, "unknown resource type, expected ->, <<, >>, <> or <x>".into())
    );
    assert_eq!(
      parse_error("&a = int\nint"),
      (2, 1, "expected resource (%%) or definition (&)".into())
    );
    assert_eq!(parse_error("&a int"), (1, 4, "expected equals sign".into()));
    assert_eq!(parse_error("%% [ int"), (1, 4, "expected name".into()));
  }

  #[test]
  fn verify_unresolved_aliases_listed() {
    match suite_from_str("%% a -> &b <- [ &c, &b, &d ]\n&d = int") {
      Err(Error::PARSER { position, msg }) => {
        assert_eq!(msg.to_string(), "missing definitions of variants: b, c");
        assert_eq!(position.column, 9);
      }
      other => panic!("expected parser error, got {:?}", other),
    }
  }

  #[test]
  fn verify_forward_references() -> Result<()> {
    let suite = suite_from_str(indoc!(
      r#"
        %% list -> &node <- undef
        &node = { value: int, next?: &node }
      "#
    ))?;

    assert!(suite.definitions().contains_key("node"));

    Ok(())
  }

  #[test]
  fn verify_cyclic_alias() {
    assert_eq!(
      parse_error("&a = &b\n&b = &a"),
      (1, 2, "variant definition refers only to itself".into())
    );
    assert_eq!(
      parse_error("&a = int\n&a = &a"),
      (1, 2, "variant definition refers only to itself".into())
    );
  }

  #[test]
  fn verify_selectors() -> Result<()> {
    let suite = suite_from_str(indoc!(
      r#"
        &shape = select type {
          "circle": { radius: real },
          "square": &square,
          3: { type: int, sides: [ real, ... ] },
        }
        &square = { type: "square", side: real }
      "#
    ))?;

    match &suite.definitions()["shape"][0] {
      Node::Selector(s) => {
        assert_eq!(s.discriminant, "type");
        assert_eq!(
          s.alternatives.iter().map(|a| a.key.clone()).collect::<Vec<_>>(),
          vec![Value::from("circle"), Value::from("square"), Value::from(3)]
        );
      }
      other => panic!("expected selector, got {:?}", other),
    }

    assert_eq!(
      parse_error("&s = select t { true: { a: int } }"),
      (1, 17, "selector discriminant must be a string or integer".into())
    );
    assert_eq!(
      parse_error("&s = select t { \"a\": { t: real } }"),
      (1, 17, "selector discriminant must be a string or integer".into())
    );
    assert_eq!(
      parse_error("&s = select t { 3: { t: string } }"),
      (1, 17, "selector alternative does not accept its own key".into())
    );
    assert_eq!(
      parse_error("&s = select t { \"a\": { t: int } }"),
      (1, 17, "selector alternative does not accept its own key".into())
    );
    assert_eq!(
      parse_error("&s = select t { \"a\": { t: \"b\" } }"),
      (1, 17, "selector alternative does not accept its own key".into())
    );
    assert_eq!(
      parse_error("&s = select t { \"a\": &b }\n&b = { t: 2 }"),
      (1, 17, "selector alternative does not accept its own key".into())
    );
    assert!(suite_from_str("&s = select t { 3: { t: 3 }, \"a\": { t: string } }").is_ok());
    assert_eq!(
      parse_error("&s = select t { \"a\": [ int ] }"),
      (1, 17, "selector alternative must be a map".into())
    );
    assert_eq!(
      parse_error("&s = select t { \"a\": &v }\n&v = { a: int }\n&v = { b: int }"),
      (1, 17, "selector alternative must be a map".into())
    );
    assert_eq!(
      parse_error("&s = select t { \"a\": { a: int }, \"a\": { b: int } }"),
      (1, 34, "duplicate selector alternative".into())
    );
    assert_eq!(
      parse_error("&s = select t { }"),
      (1, 17, "empty map".into())
    );

    Ok(())
  }

  #[test]
  fn verify_nesting_limit() {
    let input = format!("{}int{}", "[".repeat(200), "]".repeat(200));

    assert_eq!(schema_error(&input), (129, "maximum nesting depth exceeded".into()));

    let shallow = format!("{}int{}", "[".repeat(20), "]".repeat(20));
    assert!(schema_from_str(&shallow).is_ok());

    let limited = Parser::new(&shallow).map(|p| p.with_max_depth(10));
    assert!(limited.and_then(|mut p| p.parse_schema()).is_err());
  }

  #[test]
  fn verify_parser_report() {
    let input = indoc!(
      r#"
        %% agent/name
        -> { agent_id: uuid, agent_id: string }
        <- undef
      "#
    );

    match suite_from_str(input) {
      Ok(_) => panic!("expected error"),
      Err(e) => {
        assert_eq!(
          e.to_string(),
          "parsing error: position line 2, char 22, msg: duplicate key in map: agent_id"
        );
        assert_eq!(
          e.report(input),
          indoc!(
            r#"
              error: parser error
                ┌─ input:2:22
                │
              2 │ -> { agent_id: uuid, agent_id: string }
                │                      ^^^^^^^^ duplicate key in map: agent_id

            "#
          )
        );
      }
    }
  }
}
