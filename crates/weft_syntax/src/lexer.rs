//! Lexer for executable documents.

use crate::token::{Token, TokenKind};
use weft_core::Span;

/// A lexer over GraphQL request source.
pub struct Lexer<'a> {
    source: &'a str,
    bytes: &'a [u8],
    pos: u32,
}

impl<'a> Lexer<'a> {
    /// Creates a new lexer.
    pub fn new(source: &'a str) -> Self {
        Self {
            source,
            bytes: source.as_bytes(),
            pos: 0,
        }
    }

    #[inline]
    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos as usize).copied()
    }

    #[inline]
    fn peek_at(&self, offset: u32) -> Option<u8> {
        self.bytes.get((self.pos + offset) as usize).copied()
    }

    #[inline]
    fn advance(&mut self) {
        self.pos += 1;
    }

    #[inline]
    fn advance_by(&mut self, n: u32) {
        self.pos += n;
    }

    /// Scans the next token.
    pub fn next_token(&mut self) -> Token {
        self.skip_ignored();

        let start = self.pos;

        let Some(c) = self.peek() else {
            return Token::new(TokenKind::Eof, Span::new(start, start));
        };

        let kind = match c {
            b'{' => self.single(TokenKind::OpenBrace),
            b'}' => self.single(TokenKind::CloseBrace),
            b'(' => self.single(TokenKind::OpenParen),
            b')' => self.single(TokenKind::CloseParen),
            b'[' => self.single(TokenKind::OpenBracket),
            b']' => self.single(TokenKind::CloseBracket),
            b':' => self.single(TokenKind::Colon),
            b'=' => self.single(TokenKind::Equals),
            b'@' => self.single(TokenKind::At),
            b'!' => self.single(TokenKind::Exclamation),
            b'$' => self.single(TokenKind::Dollar),
            b'.' => {
                if self.peek_at(1) == Some(b'.') && self.peek_at(2) == Some(b'.') {
                    self.advance_by(3);
                    TokenKind::Ellipsis
                } else {
                    self.single(TokenKind::Error)
                }
            }
            b'"' => self.scan_string(),
            b'-' | b'0'..=b'9' => self.scan_number(),
            b'a'..=b'z' | b'A'..=b'Z' | b'_' => self.scan_name(),
            _ => self.single(TokenKind::Error),
        };

        Token::new(kind, Span::new(start, self.pos))
    }

    fn single(&mut self, kind: TokenKind) -> TokenKind {
        self.advance();
        kind
    }

    /// Skips whitespace, commas, comments and a leading BOM.
    fn skip_ignored(&mut self) {
        loop {
            match self.peek() {
                Some(b' ' | b'\t' | b'\r' | b'\n' | b',') => self.advance(),
                Some(b'#') => {
                    let rest = &self.bytes[self.pos as usize..];
                    let skip = memchr::memchr(b'\n', rest).unwrap_or(rest.len());
                    #[allow(clippy::cast_possible_truncation)]
                    self.advance_by(skip as u32);
                }
                Some(0xEF) if self.peek_at(1) == Some(0xBB) && self.peek_at(2) == Some(0xBF) => {
                    self.advance_by(3);
                }
                _ => break,
            }
        }
    }

    fn scan_name(&mut self) -> TokenKind {
        while let Some(c) = self.peek() {
            if c.is_ascii_alphanumeric() || c == b'_' {
                self.advance();
            } else {
                break;
            }
        }
        TokenKind::Name
    }

    fn scan_digits(&mut self) -> bool {
        let start = self.pos;
        while self.peek().is_some_and(|c| c.is_ascii_digit()) {
            self.advance();
        }
        self.pos > start
    }

    fn scan_number(&mut self) -> TokenKind {
        let mut is_float = false;

        if self.peek() == Some(b'-') {
            self.advance();
        }

        if self.peek() == Some(b'0') {
            self.advance();
            if self.peek().is_some_and(|c| c.is_ascii_digit()) {
                return TokenKind::Error;
            }
        } else if !self.scan_digits() {
            return TokenKind::Error;
        }

        if self.peek() == Some(b'.') {
            is_float = true;
            self.advance();
            if !self.scan_digits() {
                return TokenKind::Error;
            }
        }

        if let Some(b'e' | b'E') = self.peek() {
            is_float = true;
            self.advance();
            if let Some(b'+' | b'-') = self.peek() {
                self.advance();
            }
            if !self.scan_digits() {
                return TokenKind::Error;
            }
        }

        if is_float {
            TokenKind::Float
        } else {
            TokenKind::Int
        }
    }

    fn scan_string(&mut self) -> TokenKind {
        self.advance();

        if self.peek() == Some(b'"') && self.peek_at(1) == Some(b'"') {
            self.advance_by(2);
            return self.scan_block_string();
        }

        loop {
            match self.peek() {
                None | Some(b'\n' | b'\r') => return TokenKind::Error,
                Some(b'"') => {
                    self.advance();
                    return TokenKind::String;
                }
                Some(b'\\') if self.peek_at(1).is_some() => self.advance_by(2),
                Some(_) => self.advance(),
            }
        }
    }

    fn scan_block_string(&mut self) -> TokenKind {
        loop {
            match self.peek() {
                None => return TokenKind::Error,
                Some(b'"') if self.peek_at(1) == Some(b'"') && self.peek_at(2) == Some(b'"') => {
                    self.advance_by(3);
                    return TokenKind::BlockString;
                }
                Some(b'\\')
                    if self.peek_at(1) == Some(b'"')
                        && self.peek_at(2) == Some(b'"')
                        && self.peek_at(3) == Some(b'"') =>
                {
                    self.advance_by(4);
                }
                Some(_) => self.advance(),
            }
        }
    }

    /// The source being scanned.
    #[must_use]
    pub fn source(&self) -> &'a str {
        self.source
    }
}

/// Yields tokens up to, but not including, [`TokenKind::Eof`].
impl Iterator for Lexer<'_> {
    type Item = Token;

    fn next(&mut self) -> Option<Token> {
        let token = self.next_token();
        (token.kind != TokenKind::Eof).then_some(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        Lexer::new(source).map(|token| token.kind).collect()
    }

    #[test]
    fn test_punctuation_and_commas() {
        assert_eq!(
            kinds("{ } ( ) [ ] : = @ ! $ ... ,,"),
            vec![
                TokenKind::OpenBrace,
                TokenKind::CloseBrace,
                TokenKind::OpenParen,
                TokenKind::CloseParen,
                TokenKind::OpenBracket,
                TokenKind::CloseBracket,
                TokenKind::Colon,
                TokenKind::Equals,
                TokenKind::At,
                TokenKind::Exclamation,
                TokenKind::Dollar,
                TokenKind::Ellipsis,
            ]
        );
    }

    #[test]
    fn test_numbers() {
        assert_eq!(
            kinds("42 -17 3.14 1e10 2.5e-3"),
            vec![
                TokenKind::Int,
                TokenKind::Int,
                TokenKind::Float,
                TokenKind::Float,
                TokenKind::Float,
            ]
        );
        assert_eq!(kinds("01")[0], TokenKind::Error);
    }

    #[test]
    fn test_comments_are_skipped() {
        let source = "# leading\nquery # trailing\n{ id }";
        assert_eq!(
            kinds(source),
            vec![
                TokenKind::Name,
                TokenKind::OpenBrace,
                TokenKind::Name,
                TokenKind::CloseBrace,
            ]
        );
    }

    #[test]
    fn test_strings() {
        assert_eq!(
            kinds(r#""hello" "esc\"aped" """block "quoted" string""""#),
            vec![
                TokenKind::String,
                TokenKind::String,
                TokenKind::BlockString,
            ]
        );
        assert_eq!(kinds("\"unterminated\n")[0], TokenKind::Error);
    }
}
