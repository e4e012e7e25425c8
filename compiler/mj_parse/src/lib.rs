//! Front end for the minijava compiler.
//!
//! Turns source text into the `mj_ir` tree in two steps:
//! - `lexer`: logos-derived tokenizer with line tracking
//! - `parser`: hand-written recursive descent over the token list
//!
//! The grammar is deliberately flat: binary operators do not chain without
//! parentheses, `&&` takes exactly two clauses, and `if` always has an
//! `else`. Anything outside the grammar is a `ParseError`.

mod error;
mod lexer;
mod parser;

pub use error::ParseError;
pub use parser::parse;
