//! # llidl
//!
//! A Rust implementation of LLSD, the self-describing structured data model
//! spoken by Second Life style REST services, and LLIDL, the interface
//! description language that describes the shape LLSD messages are expected
//! to take.
//!
//! Conformance is graded rather than binary. Comparing a value against a
//! schema produces an [`Outcome`] together with a converted value, so a
//! client built against an older schema and a server built against a newer
//! one can still interoperate:
//!
//! | Outcome        | Meaning                                                |
//! |----------------|--------------------------------------------------------|
//! | `Matched`      | the value conforms as is                               |
//! | `Converted`    | scalars were converted without loss                    |
//! | `Defaulted`    | missing or undefined data was filled in with defaults  |
//! | `Additional`   | undeclared data was present and dropped                |
//! | `Mixed`        | more than one of the three adjustments above           |
//! | `Incompatible` | the value cannot be made to conform                    |
//!
//! This crate includes a handwritten lexer and recursive-descent parser for
//! LLIDL. Parse errors carry a line, column and byte range and render as
//! diagnostics over the source text.
//!
//! ## Goals
//!
//! - Parse LLIDL suites and single value descriptions
//! - Grade LLSD values against resources' requests and responses
//! - Explain every non-exact decision with a located finding
//! - Re-emit parsed schemas as LLIDL text
//!
//! ## Non-goals
//!
//! - LLSD wire codecs (XML, binary and notation). Values are handed in and
//!   out already decoded
//! - Generating fuzzed sample values
//!
//! ## Usage
//!
//! ```
//! use llidl::{llsd::Value, suite_from_str, Direction, Outcome};
//!
//! let suite = suite_from_str(
//!   r#"
//!     %% agent/name
//!     -> { agent_id: uuid }
//!     <- { name: string, "age"?: int }
//!   "#,
//! )
//! .unwrap();
//!
//! let response: Value = vec![("name", Value::from("Ann"))].into_iter().collect();
//!
//! let m = suite
//!   .compare("agent/name", Direction::Response, &response)
//!   .unwrap();
//!
//! assert_eq!(m.outcome, Outcome::Defaulted);
//! assert_eq!(m.value.get("age"), Some(&Value::from(0)));
//! ```
//!
//! ## Features
//!
//! - `json` (default): conversions between `serde_json::Value` and LLSD
//!   values
//! - `serde`: `Serialize` for outcomes, findings and positions

#![warn(missing_docs)]

/// Abstract syntax tree of LLIDL value descriptions
pub mod ast;
/// Scalar coercion table
pub mod coerce;
/// Lexer for LLIDL
pub mod lexer;
/// LLSD value model
pub mod llsd;
/// Graded matching of values against schema nodes
pub mod matcher;
/// Parser for LLIDL
pub mod parser;
/// Suites of resources
pub mod suite;
/// LLIDL tokens for lexing
pub mod token;

mod error;

#[doc(inline)]
pub use self::{
  error::{ErrorMsg, MsgType},
  lexer::{lexer_from_str, Error as LexerError, Position},
  matcher::{Finding, Match, MatchError, Matcher, Outcome, Reason},
  parser::{schema_from_str, suite_from_str, Error as ParserError},
  suite::{Direction, Error as SuiteError, Resource, ResourceKind, Schema, Suite},
};
