use std::{borrow::Cow, fmt};

use crate::llsd::Kind;

/// Token which represents a valid LLIDL character or sequence
#[derive(PartialEq, Debug, Clone)]
pub enum Token<'a> {
  /// End of file
  EOF,

  /// Name
  IDENT(&'a str),
  /// Literal value
  VALUE(Value<'a>),

  // Type names
  /// 'undef'
  UNDEF,
  /// 'bool'
  BOOL,
  /// 'int'
  INT,
  /// 'real'
  REAL,
  /// 'string'
  STRING,
  /// 'date'
  DATE,
  /// 'uuid'
  UUID,
  /// 'uri'
  URI,
  /// 'binary'
  BINARY,

  // Keywords
  /// 'true'
  TRUE,
  /// 'false'
  FALSE,
  /// 'select'
  SELECT,

  // Operators
  /// Assignment / default value '='
  ASSIGN,
  /// Optional field indicator '?'
  OPTIONAL,
  /// Variant reference or definition '&'
  AMPERSAND,
  /// Arbitrary key indicator '$'
  DOLLAR,
  /// Repeating array indicator '...'
  ELLIPSIS,

  // Delimiters
  /// Comma ','
  COMMA,
  /// Colon ':'
  COLON,
  /// Left brace '{'
  LBRACE,
  /// Right brace '}'
  RBRACE,
  /// Left bracket '['
  LBRACKET,
  /// Right bracket ']'
  RBRACKET,

  // Resources
  /// Resource declaration '%%'
  RESOURCE,
  /// Request arrow '->'
  POST,
  /// Response arrow '<-'
  RESULT,
  /// GET resource '<<'
  GET,
  /// PUT resource '>>'
  PUT,
  /// GET/PUT resource '<>'
  GETPUT,
  /// GET/PUT/DELETE resource '<x>'
  GETPUTDEL,
}

/// Literal values
#[derive(Debug, PartialEq, Clone)]
pub enum Value<'a> {
  /// Integer value
  INT(i32),
  /// Float value
  FLOAT(f64),
  /// Text value
  TEXT(Cow<'a, str>),
}

impl<'a> fmt::Display for Value<'a> {
  fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
    match self {
      Value::TEXT(text) => write!(f, "\"{}\"", text),
      Value::INT(i) => write!(f, "{}", i),
      Value::FLOAT(float) => write!(f, "{:?}", float),
    }
  }
}

impl<'a> From<&'a str> for Value<'a> {
  fn from(value: &'a str) -> Self {
    Value::TEXT(value.into())
  }
}

impl<'a> Token<'a> {
  /// Name text of an identifier or keyword token. Keywords are legal as map
  /// keys and resource names
  pub fn name(&self) -> Option<&'a str> {
    let name = match self {
      Token::IDENT(ident) => *ident,
      Token::UNDEF => "undef",
      Token::BOOL => "bool",
      Token::INT => "int",
      Token::REAL => "real",
      Token::STRING => "string",
      Token::DATE => "date",
      Token::UUID => "uuid",
      Token::URI => "uri",
      Token::BINARY => "binary",
      Token::TRUE => "true",
      Token::FALSE => "false",
      Token::SELECT => "select",
      _ => return None,
    };

    Some(name)
  }

  /// Primitive kind named by a type name token
  pub fn primitive_kind(&self) -> Option<Kind> {
    match self {
      Token::BOOL => Some(Kind::Boolean),
      Token::INT => Some(Kind::Integer),
      Token::REAL => Some(Kind::Real),
      Token::STRING => Some(Kind::String),
      Token::DATE => Some(Kind::Date),
      Token::UUID => Some(Kind::Uuid),
      Token::URI => Some(Kind::Uri),
      Token::BINARY => Some(Kind::Binary),
      _ => None,
    }
  }
}

impl<'a> fmt::Display for Token<'a> {
  fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
    if let Some(name) = self.name() {
      return write!(f, "{}", name);
    }

    match self {
      Token::EOF => write!(f, ""),
      Token::VALUE(value) => write!(f, "{}", value),
      Token::ASSIGN => write!(f, "="),
      Token::OPTIONAL => write!(f, "?"),
      Token::AMPERSAND => write!(f, "&"),
      Token::DOLLAR => write!(f, "$"),
      Token::ELLIPSIS => write!(f, "..."),
      Token::COMMA => write!(f, ","),
      Token::COLON => write!(f, ":"),
      Token::LBRACE => write!(f, "{{"),
      Token::RBRACE => write!(f, "}}"),
      Token::LBRACKET => write!(f, "["),
      Token::RBRACKET => write!(f, "]"),
      Token::RESOURCE => write!(f, "%%"),
      Token::POST => write!(f, "->"),
      Token::RESULT => write!(f, "<-"),
      Token::GET => write!(f, "<<"),
      Token::PUT => write!(f, ">>"),
      Token::GETPUT => write!(f, "<>"),
      Token::GETPUTDEL => write!(f, "<x>"),
      _ => write!(f, ""),
    }
  }
}

/// Returns the keyword token for a name, or an identifier token
pub fn lookup_ident(ident: &str) -> Token<'_> {
  match ident {
    "undef" => Token::UNDEF,
    "bool" => Token::BOOL,
    "int" => Token::INT,
    "real" => Token::REAL,
    "string" => Token::STRING,
    "date" => Token::DATE,
    "uuid" => Token::UUID,
    "uri" => Token::URI,
    "binary" => Token::BINARY,
    "true" => Token::TRUE,
    "false" => Token::FALSE,
    "select" => Token::SELECT,
    _ => Token::IDENT(ident),
  }
}
