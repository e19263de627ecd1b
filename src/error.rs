use codespan_reporting::{
  diagnostic::{Diagnostic, Label},
  files::SimpleFiles,
  term,
};
use std::fmt;

#[cfg(feature = "serde")]
use serde::Serialize;

/// Human readable parse error message
#[cfg_attr(feature = "serde", derive(Serialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorMsg {
  /// Short message
  pub short: String,
  /// Optional detail, such as the offending names
  pub extended: Option<String>,
}

impl ErrorMsg {
  /// Attaches detail to the message
  pub fn with_detail<S: Into<String>>(mut self, detail: S) -> Self {
    self.extended = Some(detail.into());
    self
  }
}

impl fmt::Display for ErrorMsg {
  fn fmt(&self, f: &mut std::fmt::Formatter) -> fmt::Result {
    match &self.extended {
      Some(extended) => write!(f, "{}: {}", self.short, extended),
      None => write!(f, "{}", self.short),
    }
  }
}

/// Kinds of LLIDL lexing and parsing failures. Each converts to its
/// [`ErrorMsg`]
#[allow(missing_docs)]
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum MsgType {
  // Parser
  ExpectedValue,
  ExpectedName,
  ExpectedNameInQuotes,
  ExpectedColon,
  ExpectedEqualsSign,
  ExpectedCloseBracket,
  ExpectedOpenBrace,
  ExpectedCloseBrace,
  ExpectedDeclaration,
  ExpectedResultArrow,
  ExpectedResourceArrow,
  ExpectedEndOfInput,
  ExpectedDefaultLiteral,
  ExpectedSelectorKey,
  EmptyArray,
  EmptyMap,
  UnknownType,
  DuplicateFieldName,
  DuplicateResourceName,
  DuplicateSelectorAlternative,
  SelectorDiscriminantNotScalar,
  SelectorAlternativeNotMap,
  SelectorKeyRejected,
  UnresolvedAlias,
  CyclicAlias,
  IncompatibleDefault,
  NestingTooDeep,

  // Lexer
  InvalidCharacter,
  InvalidEscapeCharacter,
  ExpectedCloseQuote,
  RealOutOfRange,
  MalformedName,
}

impl From<MsgType> for ErrorMsg {
  fn from(mt: MsgType) -> ErrorMsg {
    let short = match mt {
      MsgType::ExpectedValue => "expected value",
      MsgType::ExpectedName => "expected name",
      MsgType::ExpectedNameInQuotes => "expected name in quotes",
      MsgType::ExpectedColon => "expected colon",
      MsgType::ExpectedEqualsSign => "expected equals sign",
      MsgType::ExpectedCloseBracket => "expected close bracket",
      MsgType::ExpectedOpenBrace => "expected open brace",
      MsgType::ExpectedCloseBrace => "expected close brace",
      MsgType::ExpectedDeclaration => "expected resource (%%) or definition (&)",
      MsgType::ExpectedResultArrow => "expected result arrow '<-'",
      MsgType::ExpectedResourceArrow => "unknown resource type, expected ->, <<, >>, <> or <x>",
      MsgType::ExpectedEndOfInput => "expected end of input",
      MsgType::ExpectedDefaultLiteral => "expected default value literal",
      MsgType::ExpectedSelectorKey => "expected selector alternative key",
      MsgType::EmptyArray => "empty array",
      MsgType::EmptyMap => "empty map",
      MsgType::UnknownType => "unknown type",
      MsgType::DuplicateFieldName => "duplicate key in map",
      MsgType::DuplicateResourceName => "duplicate resource name",
      MsgType::DuplicateSelectorAlternative => "duplicate selector alternative",
      MsgType::SelectorDiscriminantNotScalar => {
        "selector discriminant must be a string or integer"
      }
      MsgType::SelectorAlternativeNotMap => "selector alternative must be a map",
      MsgType::SelectorKeyRejected => "selector alternative does not accept its own key",
      MsgType::UnresolvedAlias => "missing definitions of variants",
      MsgType::CyclicAlias => "variant definition refers only to itself",
      MsgType::IncompatibleDefault => "default value is incompatible with the field type",
      MsgType::NestingTooDeep => "maximum nesting depth exceeded",
      MsgType::InvalidCharacter => "invalid character",
      MsgType::InvalidEscapeCharacter => "invalid escape character",
      MsgType::ExpectedCloseQuote => "expected close quote",
      MsgType::RealOutOfRange => "real literal out of range",
      MsgType::MalformedName => "malformed name: hyphen (-) not allowed",
    };

    ErrorMsg {
      short: short.into(),
      extended: None,
    }
  }
}

/// Renders a single labelled error against the source text
pub(crate) fn diagnostic(
  input: &str,
  title: &str,
  range: (usize, usize),
  msg: String,
) -> Result<String, fmt::Error> {
  let mut files = SimpleFiles::new();
  let file_id = files.add("input", input);
  let config = term::Config::default();
  let mut buffer = Vec::new();
  let mut writer = term::termcolor::NoColor::new(&mut buffer);

  let diagnostic = Diagnostic::error()
    .with_message(title)
    .with_labels(vec![
      Label::primary(file_id, range.0..range.1).with_message(msg)
    ]);

  term::emit(&mut writer, &config, &files, &diagnostic).map_err(|_| fmt::Error)?;

  String::from_utf8(buffer).map_err(|_| fmt::Error)
}
