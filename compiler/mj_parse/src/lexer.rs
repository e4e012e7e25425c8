//! Tokenizer.
//!
//! A logos-derived raw token enum plus a thin conversion layer that attaches
//! line numbers and the trailing `Eof` marker the parser relies on.

use std::fmt;

use logos::Logos;

use crate::error::ParseError;

/// Raw token from logos.
#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"[ \t\r\n\f]+")] // Whitespace
#[logos(skip(r"//[^\n]*", allow_greedy = true))] // Line comments
#[logos(skip r"/\*([^*]|\*+[^*/])*\*+/")] // Block comments
enum RawToken {
    // === Keywords ===
    #[token("class")]
    Class,
    #[token("public")]
    Public,
    #[token("static")]
    Static,
    #[token("void")]
    Void,
    #[token("main")]
    Main,
    #[token("String")]
    StringKw,
    #[token("extends")]
    Extends,
    #[token("return")]
    Return,
    #[token("int")]
    Int,
    #[token("boolean")]
    Boolean,
    #[token("if")]
    If,
    #[token("else")]
    Else,
    #[token("while")]
    While,
    #[token("true")]
    True,
    #[token("false")]
    False,
    #[token("this")]
    This,
    #[token("new")]
    New,
    #[token("length")]
    Length,

    // The print statement is a single lexeme in this language.
    #[token("System.out.println")]
    Println,

    // === Symbols ===
    #[token("{")]
    LBrace,
    #[token("}")]
    RBrace,
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token("[")]
    LBracket,
    #[token("]")]
    RBracket,
    #[token(";")]
    Semi,
    #[token(",")]
    Comma,
    #[token(".")]
    Dot,
    #[token("=")]
    Assign,
    #[token("&&")]
    AndAnd,
    #[token("<")]
    Less,
    #[token("+")]
    Plus,
    #[token("-")]
    Minus,
    #[token("*")]
    Star,
    #[token("!")]
    Bang,

    // === Literals and names ===
    // Out-of-range literals fail the callback and surface as lex errors.
    #[regex(r"[0-9]+", |lex| lex.slice().parse::<i32>().ok())]
    IntLit(i32),

    #[regex(r"[a-zA-Z_][a-zA-Z0-9_]*")]
    Ident,
}

/// Final token kind, with literal payloads and an explicit end marker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum TokenKind {
    Class,
    Public,
    Static,
    Void,
    Main,
    StringKw,
    Extends,
    Return,
    Int,
    Boolean,
    If,
    Else,
    While,
    True,
    False,
    This,
    New,
    Length,
    Println,
    LBrace,
    RBrace,
    LParen,
    RParen,
    LBracket,
    RBracket,
    Semi,
    Comma,
    Dot,
    Assign,
    AndAnd,
    Less,
    Plus,
    Minus,
    Star,
    Bang,
    IntLit(i32),
    Ident(String),
    Eof,
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            TokenKind::Class => "class",
            TokenKind::Public => "public",
            TokenKind::Static => "static",
            TokenKind::Void => "void",
            TokenKind::Main => "main",
            TokenKind::StringKw => "String",
            TokenKind::Extends => "extends",
            TokenKind::Return => "return",
            TokenKind::Int => "int",
            TokenKind::Boolean => "boolean",
            TokenKind::If => "if",
            TokenKind::Else => "else",
            TokenKind::While => "while",
            TokenKind::True => "true",
            TokenKind::False => "false",
            TokenKind::This => "this",
            TokenKind::New => "new",
            TokenKind::Length => "length",
            TokenKind::Println => "System.out.println",
            TokenKind::LBrace => "{",
            TokenKind::RBrace => "}",
            TokenKind::LParen => "(",
            TokenKind::RParen => ")",
            TokenKind::LBracket => "[",
            TokenKind::RBracket => "]",
            TokenKind::Semi => ";",
            TokenKind::Comma => ",",
            TokenKind::Dot => ".",
            TokenKind::Assign => "=",
            TokenKind::AndAnd => "&&",
            TokenKind::Less => "<",
            TokenKind::Plus => "+",
            TokenKind::Minus => "-",
            TokenKind::Star => "*",
            TokenKind::Bang => "!",
            TokenKind::IntLit(n) => return write!(f, "`{n}`"),
            TokenKind::Ident(name) => return write!(f, "`{name}`"),
            TokenKind::Eof => return f.write_str("end of input"),
        };
        write!(f, "`{text}`")
    }
}

/// A token with the 1-based source line it starts on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Token {
    pub(crate) kind: TokenKind,
    pub(crate) line: u32,
}

fn convert(raw: RawToken, slice: &str) -> TokenKind {
    match raw {
        RawToken::Class => TokenKind::Class,
        RawToken::Public => TokenKind::Public,
        RawToken::Static => TokenKind::Static,
        RawToken::Void => TokenKind::Void,
        RawToken::Main => TokenKind::Main,
        RawToken::StringKw => TokenKind::StringKw,
        RawToken::Extends => TokenKind::Extends,
        RawToken::Return => TokenKind::Return,
        RawToken::Int => TokenKind::Int,
        RawToken::Boolean => TokenKind::Boolean,
        RawToken::If => TokenKind::If,
        RawToken::Else => TokenKind::Else,
        RawToken::While => TokenKind::While,
        RawToken::True => TokenKind::True,
        RawToken::False => TokenKind::False,
        RawToken::This => TokenKind::This,
        RawToken::New => TokenKind::New,
        RawToken::Length => TokenKind::Length,
        RawToken::Println => TokenKind::Println,
        RawToken::LBrace => TokenKind::LBrace,
        RawToken::RBrace => TokenKind::RBrace,
        RawToken::LParen => TokenKind::LParen,
        RawToken::RParen => TokenKind::RParen,
        RawToken::LBracket => TokenKind::LBracket,
        RawToken::RBracket => TokenKind::RBracket,
        RawToken::Semi => TokenKind::Semi,
        RawToken::Comma => TokenKind::Comma,
        RawToken::Dot => TokenKind::Dot,
        RawToken::Assign => TokenKind::Assign,
        RawToken::AndAnd => TokenKind::AndAnd,
        RawToken::Less => TokenKind::Less,
        RawToken::Plus => TokenKind::Plus,
        RawToken::Minus => TokenKind::Minus,
        RawToken::Star => TokenKind::Star,
        RawToken::Bang => TokenKind::Bang,
        RawToken::IntLit(n) => TokenKind::IntLit(n),
        RawToken::Ident => TokenKind::Ident(slice.to_owned()),
    }
}

fn count_newlines(text: &str) -> u32 {
    let count = text.bytes().filter(|b| *b == b'\n').count();
    u32::try_from(count).unwrap_or(u32::MAX)
}

/// Tokenize a whole unit, ending with `TokenKind::Eof`.
pub(crate) fn lex(source: &str) -> Result<Vec<Token>, ParseError> {
    let mut tokens = Vec::new();
    let mut line = 1u32;
    let mut scanned = 0usize;

    let mut lexer = RawToken::lexer(source);
    while let Some(result) = lexer.next() {
        let span = lexer.span();
        line += count_newlines(&source[scanned..span.start]);
        scanned = span.end;
        match result {
            Ok(raw) => tokens.push(Token {
                kind: convert(raw, lexer.slice()),
                line,
            }),
            Err(()) => {
                return Err(ParseError::InvalidToken {
                    text: lexer.slice().to_owned(),
                    line,
                })
            }
        }
    }

    line += count_newlines(&source[scanned..]);
    tokens.push(Token {
        kind: TokenKind::Eof,
        line,
    });
    Ok(tokens)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        lex(source).unwrap().into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn keywords_and_symbols() {
        assert_eq!(
            kinds("class Foo extends Bar {"),
            vec![
                TokenKind::Class,
                TokenKind::Ident("Foo".to_owned()),
                TokenKind::Extends,
                TokenKind::Ident("Bar".to_owned()),
                TokenKind::LBrace,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn print_is_one_token() {
        assert_eq!(
            kinds("System.out.println(0);"),
            vec![
                TokenKind::Println,
                TokenKind::LParen,
                TokenKind::IntLit(0),
                TokenKind::RParen,
                TokenKind::Semi,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn comments_and_lines() {
        let tokens = lex("x // one\n/* two\nthree */ y").unwrap();
        assert_eq!(tokens[0].kind, TokenKind::Ident("x".to_owned()));
        assert_eq!(tokens[0].line, 1);
        assert_eq!(tokens[1].kind, TokenKind::Ident("y".to_owned()));
        assert_eq!(tokens[1].line, 3);
    }

    #[test]
    fn out_of_range_literal_is_an_error() {
        let err = lex("9999999999").unwrap_err();
        assert_eq!(
            err,
            ParseError::InvalidToken {
                text: "9999999999".to_owned(),
                line: 1,
            }
        );
    }

    #[test]
    fn stray_character_is_an_error() {
        let err = lex("a % b").unwrap_err();
        assert!(matches!(err, ParseError::InvalidToken { ref text, line: 1 } if text == "%"));
    }
}
