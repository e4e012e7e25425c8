//! Parse error type.

use thiserror::Error;

/// Errors produced while lexing or parsing a unit. All are fatal for the
/// unit they occur in.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// The lexer could not form a token at this position (stray character,
    /// or an integer literal out of range).
    #[error("line {line}: invalid token `{text}`")]
    InvalidToken { text: String, line: u32 },

    /// The parser found a well-formed token that the grammar does not allow
    /// here.
    #[error("line {line}: expected {expected}, found {found}")]
    Unexpected {
        expected: &'static str,
        found: String,
        line: u32,
    },
}
