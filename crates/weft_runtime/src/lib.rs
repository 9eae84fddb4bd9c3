//! Runtime for weft.
//!
//! This crate holds everything between a component tree and a response:
//! - `graph_type`: Native type identities and type expressions
//! - `types`: Type descriptors stored in the registry
//! - `scalars`: The built-in scalars
//! - `registry`: The type registry and reference resolver
//! - `schema`: The frozen schema
//! - `resolve`: The weak resolver contract and concurrency handle
//! - `executor`: Reference query execution
//! - `printer`: SDL printing
//! - `error`: Field and construction errors

pub mod error;
pub mod executor;
pub mod graph_type;
pub mod printer;
pub mod registry;
pub mod resolve;
pub mod scalars;
pub mod schema;
pub mod types;

pub use error::{format_path, ConstructionError, FieldError, FieldResult, PathSegment};
pub use executor::{Executor, ExecutorConfig, Response};
pub use graph_type::{short_type_name, AnyType, GraphType, Id, TypeExpr, TypeReference};
pub use printer::print_schema;
pub use registry::TypeRegistry;
pub use resolve::{
    fail, join, ready, suspend, Deferred, FieldFuture, IsInstanceFn, OpaqueValue, ParseLiteralFn,
    ParseValueFn, ResolveFn, ResolveInfo, Resolved, SerializeFn, Spawner, TypeMismatch,
};
pub use schema::{Roots, Schema};
pub use types::{
    EnumType, EnumValueDefinition, FieldDefinition, InputObjectType, InputValue, InterfaceType,
    NamedType, ObjectType, ScalarType, TypeIndex, TypeKind, TypeRef, UnionType,
};
