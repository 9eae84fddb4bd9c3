//! Byte spans into request source and their line/column positions.

use serde::{Deserialize, Serialize};

/// A half-open byte range `start..end` into source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Span {
    pub start: u32,
    pub end: u32,
}

impl Span {
    #[must_use]
    #[inline]
    pub const fn new(start: u32, end: u32) -> Self {
        Self { start, end }
    }

    /// The source text covered by the span, or `""` if the span does not
    /// fall on character boundaries of `source`.
    #[must_use]
    pub fn slice(self, source: &str) -> &str {
        source
            .get(self.start as usize..self.end as usize)
            .unwrap_or_default()
    }

    /// The 1-based line and column of the span start. Columns count
    /// characters, not bytes.
    #[must_use]
    pub fn locate(&self, source: &str) -> Location {
        let offset = (self.start as usize).min(source.len());
        let before = source.get(..offset).unwrap_or(source);
        let line_start = before.rfind('\n').map_or(0, |newline| newline + 1);
        Location {
            line: before.matches('\n').count() + 1,
            column: before[line_start..].chars().count() + 1,
        }
    }
}

impl From<Span> for miette::SourceSpan {
    fn from(span: Span) -> Self {
        let length = span.end.saturating_sub(span.start);
        (span.start as usize, length as usize).into()
    }
}

/// A position as reported in the `locations` of a GraphQL error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    pub line: usize,
    pub column: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slice() {
        let source = "{ comments { id } }";
        assert_eq!(Span::new(2, 10).slice(source), "comments");
        assert_eq!(Span::new(2, 99).slice(source), "");
    }

    #[test]
    fn test_locate() {
        let source = "{\n  comments {\n    id\n  }\n}";
        assert_eq!(Span::new(4, 12).locate(source), Location { line: 2, column: 3 });
        assert_eq!(Span::new(0, 1).locate(source), Location { line: 1, column: 1 });
        assert_eq!(Span::new(99, 99).locate(source), Location { line: 5, column: 2 });
    }

    #[test]
    fn test_columns_count_characters() {
        let source = "{ é: x }";
        assert_eq!(Span::new(6, 7).locate(source), Location { line: 1, column: 6 });
    }
}
