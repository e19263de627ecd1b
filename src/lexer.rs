use super::{
  error::{
    self, ErrorMsg,
    MsgType::{self, *},
  },
  token::{self, Token, Value},
};
use itertools::{multipeek, MultiPeek};
use std::{borrow::Cow, fmt, num, result, str::CharIndices};

use lexical_core as lexical;

#[cfg(feature = "serde")]
use serde::Serialize;

/// Alias for `Result` with an error of type `llidl::LexerError`
pub type Result<T> = result::Result<T, Error>;

/// Lexer position
#[cfg_attr(feature = "serde", derive(Serialize))]
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Position {
  /// Line number, starting at 1
  pub line: usize,
  /// Column number, starting at 1. A tab counts as one column
  pub column: usize,
  /// Token begin and end byte index range
  pub range: (usize, usize),
  /// Byte index
  pub index: usize,
}

impl Default for Position {
  fn default() -> Self {
    Position {
      line: 1,
      column: 1,
      range: (0, 0),
      index: 0,
    }
  }
}

impl fmt::Display for Position {
  fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
    write!(f, "line {}, char {}", self.line, self.column)
  }
}

/// Lexer error
#[derive(Debug)]
pub struct Error {
  /// Error type
  pub error_type: LexerErrorType,
  input: String,
  /// Where the error was detected
  pub position: Position,
}

/// Various error types emitted by the lexer
#[derive(Debug)]
pub enum LexerErrorType {
  /// LLIDL lexing syntax error
  LEXER(MsgType),
  /// Error parsing integer
  PARSEINT(num::ParseIntError),
  /// Error parsing float
  PARSEFLOAT(lexical::Error),
}

impl std::error::Error for Error {}

impl fmt::Display for Error {
  fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
    let msg = match &self.error_type {
      LexerErrorType::LEXER(le) => ErrorMsg::from(*le).to_string(),
      LexerErrorType::PARSEINT(pie) => pie.to_string(),
      LexerErrorType::PARSEFLOAT(pfe) => format!("{:#?}", pfe),
    };

    write!(
      f,
      "{}",
      error::diagnostic(&self.input, "lexer error", self.position.range, msg)?
    )
  }
}

impl Error {
  /// Message describing the error, without the rendered source snippet
  pub fn msg(&self) -> ErrorMsg {
    match &self.error_type {
      LexerErrorType::LEXER(le) => ErrorMsg::from(*le),
      LexerErrorType::PARSEINT(pie) => ErrorMsg {
        short: "integer literal out of range".into(),
        extended: Some(pie.to_string()),
      },
      LexerErrorType::PARSEFLOAT(pfe) => ErrorMsg {
        short: "invalid number".into(),
        extended: Some(format!("{:?}", pfe)),
      },
    }
  }
}

impl From<(&str, Position, MsgType)> for Error {
  fn from(e: (&str, Position, MsgType)) -> Self {
    Error {
      error_type: LexerErrorType::LEXER(e.2),
      input: e.0.to_string(),
      position: e.1,
    }
  }
}

impl From<(&str, Position, num::ParseIntError)> for Error {
  fn from(e: (&str, Position, num::ParseIntError)) -> Self {
    Error {
      error_type: LexerErrorType::PARSEINT(e.2),
      input: e.0.to_string(),
      position: e.1,
    }
  }
}

impl From<(&str, Position, lexical::Error)> for Error {
  fn from(e: (&str, Position, lexical::Error)) -> Self {
    Error {
      error_type: LexerErrorType::PARSEFLOAT(e.2),
      input: e.0.to_string(),
      position: e.1,
    }
  }
}

/// Lexer which holds a string slice and a multi-peek iterator over it
#[derive(Debug)]
pub struct Lexer<'a> {
  /// LLIDL input string
  pub str_input: &'a str,
  input: MultiPeek<CharIndices<'a>>,
  /// Position of the next unread character
  pub position: Position,
}

/// Creates a `Lexer` from a string slice
///
/// # Arguments
///
/// `str_input` - String slice with input
pub fn lexer_from_str(str_input: &str) -> Lexer {
  Lexer::new(str_input)
}

impl<'a> Lexer<'a> {
  /// Creates a new `Lexer` from a given `&str` input
  pub fn new(str_input: &'a str) -> Lexer<'a> {
    Lexer {
      str_input,
      input: multipeek(str_input.char_indices()),
      position: Position::default(),
    }
  }

  fn peek_char(&mut self) -> Option<char> {
    self.input.reset_peek();
    self.input.peek().map(|c| c.1)
  }

  fn peek_second_char(&mut self) -> Option<char> {
    self.input.reset_peek();
    let _ = self.input.peek();
    self.input.peek().map(|c| c.1)
  }

  fn read_char(&mut self) -> Option<(usize, char)> {
    let c = self.input.next()?;

    match c.1 {
      '\n' => {
        self.position.line += 1;
        self.position.column = 1;
      }
      // A lone carriage return ends a line, '\r\n' is counted once at '\n'
      '\r' if self.peek_char() != Some('\n') => {
        self.position.line += 1;
        self.position.column = 1;
      }
      _ => self.position.column += 1,
    }

    self.position.index = c.0 + c.1.len_utf8();

    Some(c)
  }

  // Error located at `at`, spanning everything read since `start`
  fn error(&self, at: &Position, start: &Position, mt: MsgType) -> Error {
    let position = Position {
      line: at.line,
      column: at.column,
      range: (start.index, self.position.index),
      index: at.index,
    };

    (self.str_input, position, mt).into()
  }

  // Current position, covering everything read since `start`
  fn span_from(&self, start: &Position) -> Position {
    Position {
      range: (start.index, self.position.index),
      ..self.position
    }
  }

  /// Advances over the input and returns the next `Token` along with the
  /// position of its first character
  pub fn next_token(&mut self) -> Result<(Position, Token<'a>)> {
    self.skip_whitespace();

    let start = self.position;

    let c = match self.read_char() {
      Some(c) => c,
      None => return Ok((start, Token::EOF)),
    };

    let token = match c {
      (_, '{') => Token::LBRACE,
      (_, '}') => Token::RBRACE,
      (_, '[') => Token::LBRACKET,
      (_, ']') => Token::RBRACKET,
      (_, ',') => Token::COMMA,
      (_, ':') => Token::COLON,
      (_, '=') => Token::ASSIGN,
      (_, '?') => Token::OPTIONAL,
      (_, '&') => Token::AMPERSAND,
      (_, '$') => Token::DOLLAR,
      (_, '%') => match self.peek_char() {
        Some('%') => {
          let _ = self.read_char();
          Token::RESOURCE
        }
        _ => return Err(self.error(&start, &start, InvalidCharacter)),
      },
      (_, '.') => match (self.peek_char(), self.peek_second_char()) {
        (Some('.'), Some('.')) => {
          let _ = self.read_char();
          let _ = self.read_char();
          Token::ELLIPSIS
        }
        _ => return Err(self.error(&start, &start, InvalidCharacter)),
      },
      (idx, '-') => match self.peek_char() {
        Some('>') => {
          let _ = self.read_char();
          Token::POST
        }
        Some(ch) if is_digit(ch) => self.read_number(idx, &start)?,
        _ => return Err(self.error(&start, &start, InvalidCharacter)),
      },
      (_, '<') => match self.peek_char() {
        Some('-') => {
          let _ = self.read_char();
          Token::RESULT
        }
        Some('<') => {
          let _ = self.read_char();
          Token::GET
        }
        Some('>') => {
          let _ = self.read_char();
          Token::GETPUT
        }
        Some('x') if self.peek_second_char() == Some('>') => {
          let _ = self.read_char();
          let _ = self.read_char();
          Token::GETPUTDEL
        }
        _ => return Err(self.error(&start, &start, InvalidCharacter)),
      },
      (_, '>') => match self.peek_char() {
        Some('>') => {
          let _ = self.read_char();
          Token::PUT
        }
        _ => return Err(self.error(&start, &start, InvalidCharacter)),
      },
      (idx, '"') => Token::VALUE(Value::TEXT(self.read_text_value(idx, &start)?)),
      (idx, ch) if is_name_start(ch) => token::lookup_ident(self.read_identifier(idx, &start)?),
      (idx, ch) if is_digit(ch) => self.read_number(idx, &start)?,
      _ => return Err(self.error(&start, &start, InvalidCharacter)),
    };

    Ok((self.span_from(&start).with_start(&start), token))
  }

  fn read_identifier(&mut self, idx: usize, start: &Position) -> Result<&'a str> {
    while let Some(ch) = self.peek_char() {
      if is_name_char(ch) {
        let _ = self.read_char();
      } else if ch == '-' && self.peek_second_char() != Some('>') {
        // "foo->" is a name followed by a request arrow
        let at = self.position;
        let _ = self.read_char();
        return Err(self.error(&at, start, MalformedName));
      } else {
        break;
      }
    }

    Ok(&self.str_input[idx..self.position.index])
  }

  fn read_text_value(&mut self, idx: usize, start: &Position) -> Result<Cow<'a, str>> {
    let mut text = String::new();
    let mut has_escape = false;

    loop {
      let at = self.position;

      match self.read_char() {
        Some((end, '"')) => {
          if has_escape {
            return Ok(Cow::Owned(text));
          }

          return Ok(Cow::Borrowed(&self.str_input[idx + 1..end]));
        }
        Some((_, '\\')) => {
          has_escape = true;

          let at = self.position;
          match self.read_char() {
            Some((_, '"')) => text.push('"'),
            Some((_, '\\')) => text.push('\\'),
            Some((_, '/')) => text.push('/'),
            Some((_, 'n')) => text.push('\n'),
            Some((_, 'r')) => text.push('\r'),
            Some((_, 't')) => text.push('\t'),
            Some(_) => return Err(self.error(&at, start, InvalidEscapeCharacter)),
            None => return Err(self.error(&at, start, ExpectedCloseQuote)),
          }
        }
        Some((_, '\n')) | Some((_, '\r')) | None => {
          return Err(self.error(&at, start, ExpectedCloseQuote))
        }
        Some((_, ch)) => text.push(ch),
      }
    }
  }

  fn read_number(&mut self, idx: usize, start: &Position) -> Result<Token<'a>> {
    let mut is_float = false;

    self.read_digits();

    if self.peek_char() == Some('.') && self.peek_second_char().map_or(false, is_digit) {
      let _ = self.read_char();
      self.read_digits();
      is_float = true;
    }

    if let Some('e') | Some('E') = self.peek_char() {
      match self.peek_second_char() {
        Some(ch) if is_digit(ch) || ch == '+' || ch == '-' => {
          let _ = self.read_char();
          let _ = self.read_char();
          self.read_digits();
          is_float = true;
        }
        _ => (),
      }
    }

    let text = &self.str_input[idx..self.position.index];

    if is_float {
      let f = lexical::parse::<f64>(text.as_bytes()).map_err(|e| {
        Error::from((self.str_input, self.span_from(start).with_start(start), e))
      })?;

      if !f.is_finite() {
        return Err(self.error(start, start, RealOutOfRange));
      }

      return Ok(Token::VALUE(Value::FLOAT(f)));
    }

    text
      .parse::<i32>()
      .map(|i| Token::VALUE(Value::INT(i)))
      .map_err(|e| (self.str_input, self.span_from(start).with_start(start), e).into())
  }

  fn read_digits(&mut self) {
    while self.peek_char().map_or(false, is_digit) {
      let _ = self.read_char();
    }
  }

  fn skip_whitespace(&mut self) {
    while let Some(ch) = self.peek_char() {
      match ch {
        ';' => {
          while let Some(ch) = self.peek_char() {
            if ch == '\n' || ch == '\r' {
              break;
            }
            let _ = self.read_char();
          }
        }
        ch if ch.is_whitespace() => {
          let _ = self.read_char();
        }
        _ => break,
      }
    }
  }
}

impl Position {
  fn with_start(self, start: &Position) -> Position {
    Position {
      line: start.line,
      column: start.column,
      range: self.range,
      index: start.index,
    }
  }
}

fn is_name_start(ch: char) -> bool {
  ch.is_ascii_alphabetic() || ch == '_'
}

fn is_name_char(ch: char) -> bool {
  ch.is_ascii_alphanumeric() || ch == '_' || ch == '/'
}

fn is_digit(ch: char) -> bool {
  ch.is_ascii_digit()
}
