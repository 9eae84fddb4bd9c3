//! Core value model for weft.
//!
//! This crate provides the foundational types shared by every other crate:
//! - `map`: The universal weakly-typed `Map` value
//! - `coder`: Translation between `Map` and strongly-typed host values
//! - `span`: Source location tracking

pub mod coder;
pub mod map;
pub mod span;

pub use coder::{decode, encode, CoderError};
pub use map::Map;
pub use span::{Location, Span};
