//! Typed schema construction for weft.
//!
//! A schema is declared as a list of components, one per named type or
//! root, each binding strongly-typed Rust resolvers into the weak resolver
//! contract the executor runs.
//!
//! # Declaring a schema
//!
//! ```ignore
//! use weft_sdk::{
//!     connection_from, ConnectionArguments, ConnectionType, Field, Identifiable, Query,
//!     SchemaBuilder, Type,
//! };
//!
//! struct Comment { id: i32, message: String }
//! impl weft_sdk::GraphType for Comment {}
//! impl Identifiable for Comment {
//!     fn id(&self) -> String { self.id.to_string() }
//! }
//!
//! let schema = SchemaBuilder::new()
//!     .add(
//!         Type::<Comment>::new()
//!             .field(Field::new("id", |c: &Comment| c.id))
//!             .field(Field::new("message", |c: &Comment| c.message.clone())),
//!     )
//!     .add(ConnectionType::<Comment>::new())
//!     .add(Query::<()>::new().field(
//!         Field::sync("comments", |_: &(), _: &(), args: ConnectionArguments| {
//!             Ok(connection_from(load_comments(), &args)?)
//!         })
//!         .arguments(ConnectionArguments::arguments()),
//!     ))
//!     .build()?;
//!
//! let response = schema
//!     .execute("{ comments(first: 1) { edges { cursor } } }", (), (), Map::Null, None)
//!     .await;
//! ```
//!
//! # Federation
//!
//! Object types declare [`Key`]s and [`SchemaBuilder::federation`] adds
//! `_entities` and `_service` to the query root.

pub mod component;
pub mod connection;
pub mod enum_type;
pub mod error;
pub mod federation;
pub mod field;
pub mod input;
pub mod interface;
pub mod object;
pub mod root;
pub mod scalar;
pub mod schema;
pub mod union;

pub use component::{BuildContext, Component};
pub use connection::{
    connection_from, decode_cursor, encode_cursor, Connection, ConnectionArguments,
    ConnectionError, ConnectionType, Edge, ForwardArguments, Identifiable, PageInfo,
    PaginationArguments,
};
pub use enum_type::{Enum, EnumValue};
pub use error::{ErrorCode, ResultExt};
pub use federation::{FederationConfig, Key, KeyPolicy, Service};
pub use field::{Argument, Field, InputField, NoArguments};
pub use input::Input;
pub use interface::Interface;
pub use object::Type;
pub use root::{Mutation, Query, Subscription, Types};
pub use scalar::Scalar;
pub use schema::{Schema, SchemaBuilder};
pub use union::Union;

pub use weft_core::{decode, encode, CoderError, Map};
pub use weft_runtime::{
    ConstructionError, Deferred, ExecutorConfig, FieldError, FieldResult, GraphType, Id,
    OpaqueValue, Resolved, Response, Spawner, TypeReference,
};
