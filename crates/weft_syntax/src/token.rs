//! Tokens of an executable document.

use std::fmt;
use weft_core::Span;

/// What a token is.
///
/// Keywords such as `query`, `fragment` and `on` are contextual in request
/// documents, so they scan as [`TokenKind::Name`] and the parser matches
/// on the name text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    Name,
    Int,
    Float,
    String,
    BlockString,
    OpenBrace,
    CloseBrace,
    OpenParen,
    CloseParen,
    OpenBracket,
    CloseBracket,
    Colon,
    Equals,
    At,
    Exclamation,
    Dollar,
    Ellipsis,
    /// A byte sequence that starts no valid token.
    Error,
    Eof,
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::Name => "name",
            Self::Int => "integer",
            Self::Float => "float",
            Self::String | Self::BlockString => "string",
            Self::OpenBrace => "{",
            Self::CloseBrace => "}",
            Self::OpenParen => "(",
            Self::CloseParen => ")",
            Self::OpenBracket => "[",
            Self::CloseBracket => "]",
            Self::Colon => ":",
            Self::Equals => "=",
            Self::At => "@",
            Self::Exclamation => "!",
            Self::Dollar => "$",
            Self::Ellipsis => "...",
            Self::Error => "invalid token",
            Self::Eof => "end of input",
        };
        f.write_str(text)
    }
}

/// A scanned token. The text is recovered from the source by its span.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
}

impl Token {
    #[must_use]
    pub const fn new(kind: TokenKind, span: Span) -> Self {
        Self { kind, span }
    }
}
