//! Request documents for weft.
//!
//! [`parse`] turns an executable document (operations and fragments) into
//! the [`Document`] tree the executor walks. Literal [`Value`]s convert to
//! [`weft_core::Map`] for argument coercion and scalar `parse_literal`.

pub mod ast;
pub mod lexer;
pub mod parser;
pub mod token;

pub use ast::*;
pub use lexer::Lexer;
pub use parser::{parse, parse_value, SyntaxError};
pub use token::{Token, TokenKind};
