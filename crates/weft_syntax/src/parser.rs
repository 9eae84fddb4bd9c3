//! Recursive descent parser for executable documents.

use crate::ast::*;
use crate::lexer::Lexer;
use crate::token::{Token, TokenKind};
use miette::{Diagnostic, SourceSpan};
use thiserror::Error;
use weft_core::Span;

/// A syntax error with the location it was detected at.
#[derive(Debug, Clone, Error, Diagnostic)]
#[error("syntax error: {message}")]
#[diagnostic(code(weft::syntax))]
pub struct SyntaxError {
    pub message: String,
    pub span: Span,
    #[label("here")]
    label: SourceSpan,
}

impl SyntaxError {
    fn new(message: impl Into<String>, span: Span) -> Self {
        Self {
            message: message.into(),
            span,
            label: span.into(),
        }
    }
}

type ParseResult<T> = Result<T, SyntaxError>;

/// How deeply selection sets, list and object literals and list types may
/// nest before parsing stops with an error.
pub const MAX_NESTING: usize = 128;

/// Parses a request document.
///
/// # Errors
///
/// Returns the first [`SyntaxError`] encountered.
pub fn parse(source: &str) -> ParseResult<Document> {
    let mut parser = Parser::new(source);
    parser.parse_document()
}

/// Parses a single literal value, such as a default value or a scalar literal.
///
/// # Errors
///
/// Returns a [`SyntaxError`] if the source is not exactly one value.
pub fn parse_value(source: &str) -> ParseResult<Value> {
    let mut parser = Parser::new(source);
    let value = parser.parse_value(true)?;
    parser.expect(TokenKind::Eof)?;
    Ok(value)
}

/// Parser over a token stream.
pub struct Parser<'a> {
    lexer: Lexer<'a>,
    current: Token,
    depth: usize,
}

impl<'a> Parser<'a> {
    /// Creates a new parser.
    pub fn new(source: &'a str) -> Self {
        let mut lexer = Lexer::new(source);
        let current = lexer.next_token();
        Self {
            lexer,
            current,
            depth: 0,
        }
    }

    /// Runs `parse` one nesting level deeper.
    fn nested<T>(&mut self, parse: impl FnOnce(&mut Self) -> ParseResult<T>) -> ParseResult<T> {
        if self.depth == MAX_NESTING {
            return Err(SyntaxError::new(
                format!("document nests deeper than {MAX_NESTING} levels"),
                self.current.span,
            ));
        }
        self.depth += 1;
        let result = parse(self);
        self.depth -= 1;
        result
    }

    #[inline]
    fn at(&self, kind: TokenKind) -> bool {
        self.current.kind == kind
    }

    fn at_keyword(&self, keyword: &str) -> bool {
        self.at(TokenKind::Name) && self.current_text() == keyword
    }

    fn advance(&mut self) {
        self.current = self.lexer.next_token();
    }

    fn current_text(&self) -> &'a str {
        self.current.span.slice(self.lexer.source())
    }

    fn unexpected(&self, expected: &str) -> SyntaxError {
        let found = match self.current.kind {
            TokenKind::Error => "invalid token".to_string(),
            TokenKind::Eof => "end of input".to_string(),
            TokenKind::Name => format!("`{}`", self.current_text()),
            kind => format!("`{kind}`"),
        };
        SyntaxError::new(format!("expected {expected}, found {found}"), self.current.span)
    }

    fn expect(&mut self, kind: TokenKind) -> ParseResult<Span> {
        if self.at(kind) {
            let span = self.current.span;
            self.advance();
            Ok(span)
        } else {
            Err(self.unexpected(&format!("`{kind}`")))
        }
    }

    fn expect_keyword(&mut self, keyword: &str) -> ParseResult<()> {
        if self.at_keyword(keyword) {
            self.advance();
            Ok(())
        } else {
            Err(self.unexpected(&format!("`{keyword}`")))
        }
    }

    fn parse_name(&mut self) -> ParseResult<String> {
        if self.at(TokenKind::Name) {
            let name = self.current_text().to_string();
            self.advance();
            Ok(name)
        } else {
            Err(self.unexpected("a name"))
        }
    }

    /// Parses a document.
    pub fn parse_document(&mut self) -> ParseResult<Document> {
        let mut definitions = Vec::new();

        while !self.at(TokenKind::Eof) {
            if self.at_keyword("fragment") {
                definitions.push(Definition::Fragment(self.parse_fragment_definition()?));
            } else {
                definitions.push(Definition::Operation(self.parse_operation()?));
            }
        }

        if definitions.is_empty() {
            return Err(SyntaxError::new(
                "document does not contain any operation",
                self.current.span,
            ));
        }

        Ok(Document { definitions })
    }

    fn parse_operation(&mut self) -> ParseResult<OperationDefinition> {
        let start = self.current.span.start;

        if self.at(TokenKind::OpenBrace) {
            let selection_set = self.parse_selection_set()?;
            return Ok(OperationDefinition {
                operation: OperationType::Query,
                name: None,
                variables: Vec::new(),
                directives: Vec::new(),
                span: Span::new(start, selection_set.span.end),
                selection_set,
            });
        }

        let operation = if self.at_keyword("query") {
            OperationType::Query
        } else if self.at_keyword("mutation") {
            OperationType::Mutation
        } else if self.at_keyword("subscription") {
            OperationType::Subscription
        } else {
            return Err(self.unexpected("an operation or fragment definition"));
        };
        self.advance();

        let name = if self.at(TokenKind::Name) {
            Some(self.parse_name()?)
        } else {
            None
        };

        let variables = if self.at(TokenKind::OpenParen) {
            self.parse_variable_definitions()?
        } else {
            Vec::new()
        };

        let directives = self.parse_directives()?;
        let selection_set = self.parse_selection_set()?;

        Ok(OperationDefinition {
            operation,
            name,
            variables,
            directives,
            span: Span::new(start, selection_set.span.end),
            selection_set,
        })
    }

    fn parse_variable_definitions(&mut self) -> ParseResult<Vec<VariableDefinition>> {
        self.expect(TokenKind::OpenParen)?;
        let mut variables = Vec::new();
        while !self.at(TokenKind::CloseParen) {
            let start = self.expect(TokenKind::Dollar)?.start;
            let name = self.parse_name()?;
            self.expect(TokenKind::Colon)?;
            let ty = self.parse_type()?;
            let default_value = if self.at(TokenKind::Equals) {
                self.advance();
                Some(self.parse_value(true)?)
            } else {
                None
            };
            variables.push(VariableDefinition {
                name,
                ty,
                default_value,
                span: Span::new(start, self.current.span.start),
            });
        }
        self.expect(TokenKind::CloseParen)?;
        Ok(variables)
    }

    fn parse_type(&mut self) -> ParseResult<TypeAnnotation> {
        let ty = if self.at(TokenKind::OpenBracket) {
            self.advance();
            let inner = self.nested(Self::parse_type)?;
            self.expect(TokenKind::CloseBracket)?;
            TypeAnnotation::List(Box::new(inner))
        } else {
            TypeAnnotation::Named(self.parse_name()?)
        };

        if self.at(TokenKind::Exclamation) {
            self.advance();
            Ok(TypeAnnotation::NonNull(Box::new(ty)))
        } else {
            Ok(ty)
        }
    }

    fn parse_fragment_definition(&mut self) -> ParseResult<FragmentDefinition> {
        let start = self.current.span.start;
        self.expect_keyword("fragment")?;

        if self.at_keyword("on") {
            return Err(self.unexpected("a fragment name"));
        }
        let name = self.parse_name()?;
        self.expect_keyword("on")?;
        let type_condition = self.parse_name()?;
        let directives = self.parse_directives()?;
        let selection_set = self.parse_selection_set()?;

        Ok(FragmentDefinition {
            name,
            type_condition,
            directives,
            span: Span::new(start, selection_set.span.end),
            selection_set,
        })
    }

    fn parse_selection_set(&mut self) -> ParseResult<SelectionSet> {
        self.nested(Self::parse_selections)
    }

    fn parse_selections(&mut self) -> ParseResult<SelectionSet> {
        let start = self.expect(TokenKind::OpenBrace)?.start;

        let mut selections = Vec::new();
        while !self.at(TokenKind::CloseBrace) {
            if self.at(TokenKind::Eof) {
                return Err(self.unexpected("`}`"));
            }
            selections.push(self.parse_selection()?);
        }
        let end = self.expect(TokenKind::CloseBrace)?.end;

        if selections.is_empty() {
            return Err(SyntaxError::new(
                "selection set must not be empty",
                Span::new(start, end),
            ));
        }

        Ok(SelectionSet {
            selections,
            span: Span::new(start, end),
        })
    }

    fn parse_selection(&mut self) -> ParseResult<Selection> {
        if !self.at(TokenKind::Ellipsis) {
            return self.parse_field().map(Selection::Field);
        }

        let start = self.current.span.start;
        self.advance();

        if self.at_keyword("on") {
            self.advance();
            let type_condition = Some(self.parse_name()?);
            let directives = self.parse_directives()?;
            let selection_set = self.parse_selection_set()?;
            Ok(Selection::InlineFragment(InlineFragment {
                type_condition,
                directives,
                span: Span::new(start, selection_set.span.end),
                selection_set,
            }))
        } else if self.at(TokenKind::OpenBrace) || self.at(TokenKind::At) {
            let directives = self.parse_directives()?;
            let selection_set = self.parse_selection_set()?;
            Ok(Selection::InlineFragment(InlineFragment {
                type_condition: None,
                directives,
                span: Span::new(start, selection_set.span.end),
                selection_set,
            }))
        } else {
            let name = self.parse_name()?;
            let directives = self.parse_directives()?;
            Ok(Selection::FragmentSpread(FragmentSpread {
                name,
                directives,
                span: Span::new(start, self.current.span.start),
            }))
        }
    }

    fn parse_field(&mut self) -> ParseResult<Field> {
        let start = self.current.span.start;

        let first = self.parse_name()?;
        let (alias, name) = if self.at(TokenKind::Colon) {
            self.advance();
            (Some(first), self.parse_name()?)
        } else {
            (None, first)
        };

        let arguments = self.parse_arguments(false)?;
        let directives = self.parse_directives()?;

        let selection_set = if self.at(TokenKind::OpenBrace) {
            Some(self.parse_selection_set()?)
        } else {
            None
        };

        let end = selection_set
            .as_ref()
            .map_or(self.current.span.start, |set| set.span.end);

        Ok(Field {
            alias,
            name,
            arguments,
            directives,
            selection_set,
            span: Span::new(start, end),
        })
    }

    fn parse_arguments(&mut self, constant: bool) -> ParseResult<Vec<(String, Value)>> {
        if !self.at(TokenKind::OpenParen) {
            return Ok(Vec::new());
        }
        self.advance();

        let mut arguments = Vec::new();
        while !self.at(TokenKind::CloseParen) {
            let name = self.parse_name()?;
            self.expect(TokenKind::Colon)?;
            let value = self.parse_value(constant)?;
            arguments.push((name, value));
        }
        self.expect(TokenKind::CloseParen)?;

        if arguments.is_empty() {
            return Err(self.unexpected("at least one argument"));
        }
        Ok(arguments)
    }

    fn parse_directives(&mut self) -> ParseResult<Vec<Directive>> {
        let mut directives = Vec::new();
        while self.at(TokenKind::At) {
            let start = self.current.span.start;
            self.advance();
            let name = self.parse_name()?;
            let arguments = self.parse_arguments(false)?;
            directives.push(Directive {
                name,
                arguments,
                span: Span::new(start, self.current.span.start),
            });
        }
        Ok(directives)
    }

    fn parse_value(&mut self, constant: bool) -> ParseResult<Value> {
        let span = self.current.span;

        let value = match self.current.kind {
            TokenKind::Dollar if !constant => {
                self.advance();
                return Ok(Value::Variable(self.parse_name()?));
            }
            TokenKind::Int => {
                let value = self
                    .current_text()
                    .parse()
                    .map_err(|_| SyntaxError::new("integer literal out of range", span))?;
                Value::Int(value)
            }
            TokenKind::Float => {
                let value = self
                    .current_text()
                    .parse()
                    .map_err(|_| SyntaxError::new("invalid float literal", span))?;
                Value::Float(value)
            }
            TokenKind::String => {
                let text = self.current_text();
                Value::String(unescape(&text[1..text.len() - 1], span)?)
            }
            TokenKind::BlockString => {
                let text = self.current_text();
                Value::String(block_string_value(&text[3..text.len() - 3]))
            }
            TokenKind::Name => match self.current_text() {
                "true" => Value::Boolean(true),
                "false" => Value::Boolean(false),
                "null" => Value::Null,
                name => Value::Enum(name.to_string()),
            },
            TokenKind::OpenBracket => {
                return self.nested(|parser| parser.parse_list(constant));
            }
            TokenKind::OpenBrace => {
                return self.nested(|parser| parser.parse_object(constant));
            }
            _ => return Err(self.unexpected("a value")),
        };

        self.advance();
        Ok(value)
    }

    fn parse_list(&mut self, constant: bool) -> ParseResult<Value> {
        self.expect(TokenKind::OpenBracket)?;
        let mut items = Vec::new();
        while !self.at(TokenKind::CloseBracket) {
            if self.at(TokenKind::Eof) {
                return Err(self.unexpected("`]`"));
            }
            items.push(self.parse_value(constant)?);
        }
        self.advance();
        Ok(Value::List(items))
    }

    fn parse_object(&mut self, constant: bool) -> ParseResult<Value> {
        self.expect(TokenKind::OpenBrace)?;
        let mut fields = Vec::new();
        while !self.at(TokenKind::CloseBrace) {
            let name = self.parse_name()?;
            self.expect(TokenKind::Colon)?;
            fields.push((name, self.parse_value(constant)?));
        }
        self.advance();
        Ok(Value::Object(fields))
    }
}

/// Resolves escape sequences in a quoted string body.
fn unescape(raw: &str, span: Span) -> ParseResult<String> {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();

    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('"') => out.push('"'),
            Some('\\') => out.push('\\'),
            Some('/') => out.push('/'),
            Some('b') => out.push('\u{8}'),
            Some('f') => out.push('\u{c}'),
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('t') => out.push('\t'),
            Some('u') => {
                let hex: String = chars.by_ref().take(4).collect();
                let decoded = u32::from_str_radix(&hex, 16)
                    .ok()
                    .filter(|_| hex.len() == 4)
                    .and_then(char::from_u32)
                    .ok_or_else(|| SyntaxError::new(format!("invalid unicode escape `\\u{hex}`"), span))?;
                out.push(decoded);
            }
            other => {
                let shown = other.map(String::from).unwrap_or_default();
                return Err(SyntaxError::new(format!("invalid escape `\\{shown}`"), span));
            }
        }
    }

    Ok(out)
}

/// Computes the value of a block string: common indentation removed and
/// blank leading/trailing lines dropped.
fn block_string_value(raw: &str) -> String {
    let raw = raw.replace("\\\"\"\"", "\"\"\"");
    let lines: Vec<&str> = raw.lines().collect();

    let indent = lines
        .iter()
        .skip(1)
        .filter(|line| !line.trim().is_empty())
        .map(|line| line.len() - line.trim_start_matches([' ', '\t']).len())
        .min()
        .unwrap_or(0);

    let mut out: Vec<String> = lines
        .iter()
        .enumerate()
        .map(|(i, line)| {
            if i == 0 {
                (*line).to_string()
            } else {
                line.get(indent..).unwrap_or_default().to_string()
            }
        })
        .collect();

    while out.first().is_some_and(|line| line.trim().is_empty()) {
        out.remove(0);
    }
    while out.last().is_some_and(|line| line.trim().is_empty()) {
        out.pop();
    }

    out.join("\n")
}
