//! Field binding and the resolution bridge.
//!
//! A [`Field`] turns a strongly-typed resolver into the weak
//! [`ResolveFn`] the execution engine calls. Each calling convention has its
//! own constructor and is adapted once, when the field is declared:
//!
//! - [`Field::new`]: a projection of the owner value
//! - [`Field::sync`]: owner, context and arguments to a `FieldResult`
//! - [`Field::future`]: the same, suspending on a future
//! - [`Field::deferred`]: work spawned through the [`Spawner`] and joined back
//!
//! Every bound resolver projects the source and context to their declared
//! types and decodes the raw arguments before it runs. A failure at any of
//! these steps is a field error for that field alone.

use crate::error::ErrorCode;
use indexmap::IndexMap;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;
use weft_core::{decode, encode, CoderError, Map};
use weft_runtime::{
    fail, join, ready, suspend, ConstructionError, Deferred, FieldDefinition, FieldError,
    FieldFuture, FieldResult, GraphType, InputValue, OpaqueValue, ResolveFn, ResolveInfo,
    Spawner, TypeExpr, TypeMismatch, TypeRegistry,
};

/// An output field owned by `T`, resolved with context `Ctx`.
pub struct Field<T, Ctx = ()> {
    name: String,
    description: Option<String>,
    deprecation_reason: Option<String>,
    ty: TypeExpr,
    arguments: Vec<Argument>,
    resolve: ResolveFn,
    _owner: PhantomData<fn(&T, &Ctx)>,
}

impl<T, Ctx> Field<T, Ctx>
where
    T: Send + Sync + 'static,
    Ctx: Send + Sync + 'static,
{
    fn with_resolver<Out: GraphType>(name: impl Into<String>, resolve: ResolveFn) -> Self {
        Self {
            name: name.into(),
            description: None,
            deprecation_reason: None,
            ty: Out::type_expr(),
            arguments: Vec::new(),
            resolve,
            _owner: PhantomData,
        }
    }

    /// Creates a field that projects a value out of its owner.
    ///
    /// ```ignore
    /// Field::new("message", |comment: &Comment| comment.message.clone())
    /// ```
    pub fn new<Out, F>(name: impl Into<String>, project: F) -> Self
    where
        Out: GraphType,
        F: Fn(&T) -> Out + Send + Sync + 'static,
    {
        let resolve: ResolveFn = Arc::new(
            move |source: OpaqueValue, _: Map, _: OpaqueValue, _: Spawner, _: ResolveInfo| {
                match source.downcast::<T>() {
                    Ok(owner) => ready(Ok(project(owner.as_ref()))),
                    Err(mismatch) => fail(source_mismatch(&mismatch)),
                }
            },
        );
        Self::with_resolver::<Out>(name, resolve)
    }

    /// Creates a field computed synchronously on the calling task.
    pub fn sync<A, Out, F>(name: impl Into<String>, resolve: F) -> Self
    where
        A: DeserializeOwned,
        Out: GraphType,
        F: Fn(&T, &Ctx, A) -> FieldResult<Out> + Send + Sync + 'static,
    {
        let resolve = bind::<T, Ctx, A, _>(move |owner, context, args, _| {
            ready(resolve(&owner, &context, args))
        });
        Self::with_resolver::<Out>(name, resolve)
    }

    /// Creates a field whose resolver suspends on a future.
    pub fn future<A, Out, F, Fut>(name: impl Into<String>, resolve: F) -> Self
    where
        A: DeserializeOwned,
        Out: GraphType,
        F: Fn(Arc<T>, Arc<Ctx>, A) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = FieldResult<Out>> + Send + 'static,
    {
        let resolve = bind::<T, Ctx, A, _>(move |owner, context, args, _| {
            suspend(resolve(owner, context, args))
        });
        Self::with_resolver::<Out>(name, resolve)
    }

    /// Creates a field whose resolver spawns work and hands back the handle.
    ///
    /// The handle is joined on the task executing the request, so the
    /// continuation never runs on the worker that produced the value.
    pub fn deferred<A, Out, F>(name: impl Into<String>, resolve: F) -> Self
    where
        A: DeserializeOwned,
        Out: GraphType,
        F: Fn(Arc<T>, Arc<Ctx>, A, &Spawner) -> Deferred<Out> + Send + Sync + 'static,
    {
        let resolve = bind::<T, Ctx, A, _>(move |owner, context, args, spawner| {
            join(resolve(owner, context, args, &spawner))
        });
        Self::with_resolver::<Out>(name, resolve)
    }

    /// Sets the description.
    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Marks the field as deprecated.
    #[must_use]
    pub fn deprecated(mut self, reason: impl Into<String>) -> Self {
        self.deprecation_reason = Some(reason.into());
        self
    }

    /// Declares an argument.
    #[must_use]
    pub fn argument(mut self, argument: Argument) -> Self {
        self.arguments.push(argument);
        self
    }

    /// Declares several arguments.
    #[must_use]
    pub fn arguments(mut self, arguments: impl IntoIterator<Item = Argument>) -> Self {
        self.arguments.extend(arguments);
        self
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn build(
        self,
        registry: &mut TypeRegistry,
        owner: &str,
    ) -> Result<FieldDefinition, ConstructionError> {
        let usage = format!("{owner}.{}", self.name);
        let ty = registry.get_output_type(&self.ty, &usage)?;
        let arguments = build_arguments(registry, &usage, self.arguments)?;
        Ok(FieldDefinition {
            name: self.name,
            description: self.description,
            deprecation_reason: self.deprecation_reason,
            ty,
            arguments,
            resolve: self.resolve,
        })
    }
}

/// Adapts a typed call into the weak resolve signature.
fn bind<T, Ctx, A, F>(call: F) -> ResolveFn
where
    T: Send + Sync + 'static,
    Ctx: Send + Sync + 'static,
    A: DeserializeOwned,
    F: Fn(Arc<T>, Arc<Ctx>, A, Spawner) -> FieldFuture + Send + Sync + 'static,
{
    Arc::new(
        move |source: OpaqueValue,
              args: Map,
              context: OpaqueValue,
              spawner: Spawner,
              _: ResolveInfo| {
            let owner = match source.downcast::<T>() {
                Ok(owner) => owner,
                Err(mismatch) => return fail(source_mismatch(&mismatch)),
            };
            let context = match context.downcast::<Ctx>() {
                Ok(context) => context,
                Err(mismatch) => return fail(context_mismatch(&mismatch)),
            };
            let args = match decode::<A>(args) {
                Ok(args) => args,
                Err(error) => return fail(ErrorCode::DeserializeError.error(error.to_string())),
            };
            call(owner, context, args, spawner)
        },
    )
}

pub(crate) fn source_mismatch(mismatch: &TypeMismatch) -> FieldError {
    ErrorCode::InternalError.error(format!(
        "expected source type {} but got {}",
        mismatch.expected, mismatch.found
    ))
}

pub(crate) fn context_mismatch(mismatch: &TypeMismatch) -> FieldError {
    ErrorCode::InternalError.error(format!(
        "expected context type {} but got {}",
        mismatch.expected, mismatch.found
    ))
}

/// Builds the fields of one owner, rejecting duplicate names.
pub(crate) fn build_fields<T, Ctx>(
    registry: &mut TypeRegistry,
    owner: &str,
    fields: Vec<Field<T, Ctx>>,
) -> Result<IndexMap<String, FieldDefinition>, ConstructionError>
where
    T: Send + Sync + 'static,
    Ctx: Send + Sync + 'static,
{
    let mut built = IndexMap::with_capacity(fields.len());
    for field in fields {
        if built.contains_key(field.name()) {
            return Err(ConstructionError::DuplicateField {
                owner: owner.to_string(),
                field: field.name,
            });
        }
        let definition = field.build(registry, owner)?;
        built.insert(definition.name.clone(), definition);
    }
    Ok(built)
}

pub(crate) fn build_arguments(
    registry: &mut TypeRegistry,
    field: &str,
    arguments: Vec<Argument>,
) -> Result<IndexMap<String, InputValue>, ConstructionError> {
    let mut built = IndexMap::with_capacity(arguments.len());
    for argument in arguments {
        if built.contains_key(&argument.name) {
            return Err(ConstructionError::DuplicateArgument {
                field: field.to_string(),
                argument: argument.name,
            });
        }
        let usage = format!("{field}({}:)", argument.name);
        let value = argument.build(registry, &usage)?;
        built.insert(value.name.clone(), value);
    }
    Ok(built)
}

/// A declared argument or input field.
#[derive(Debug, Clone)]
pub struct Argument {
    name: String,
    description: Option<String>,
    ty: TypeExpr,
    default_value: Option<Result<Map, CoderError>>,
}

/// Input object fields are declared the same way as arguments.
pub type InputField = Argument;

impl Argument {
    /// Creates an argument of type `V`.
    pub fn new<V: GraphType>(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            ty: V::type_expr(),
            default_value: None,
        }
    }

    /// Sets the description.
    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Sets the default value, encoded now. An encoding failure is reported
    /// when the schema is built.
    #[must_use]
    pub fn default_value<V: Serialize>(mut self, value: V) -> Self {
        self.default_value = Some(encode(&value));
        self
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn build(
        self,
        registry: &mut TypeRegistry,
        usage: &str,
    ) -> Result<InputValue, ConstructionError> {
        let ty = registry.get_input_type(&self.ty, usage)?;
        let default_value = self
            .default_value
            .transpose()
            .map_err(|source| ConstructionError::InvalidDefault {
                usage: usage.to_string(),
                source,
            })?;
        Ok(InputValue {
            name: self.name,
            description: self.description,
            ty,
            default_value,
        })
    }
}

/// Arguments of a field that declares none.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct NoArguments {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use weft_runtime::{Id, Resolved};

    #[derive(Debug)]
    struct Comment {
        id: i32,
        message: String,
    }
    impl GraphType for Comment {}

    struct Context {
        prefix: String,
    }

    #[derive(Deserialize)]
    struct Shout {
        times: usize,
    }

    fn info() -> ResolveInfo {
        ResolveInfo {
            field_name: "field".into(),
            parent_type: "Comment".into(),
            return_type: "String".into(),
            path: Vec::new(),
        }
    }

    fn comment() -> OpaqueValue {
        OpaqueValue::new(Comment {
            id: 1,
            message: "hi".into(),
        })
    }

    fn context() -> OpaqueValue {
        OpaqueValue::new(Context {
            prefix: "> ".into(),
        })
    }

    async fn call(
        field: Field<Comment, Context>,
        source: OpaqueValue,
        args: Map,
    ) -> FieldResult<Resolved> {
        (field.resolve)(source, args, context(), Spawner::current(), info()).await
    }

    fn string(resolved: &Resolved) -> &str {
        match resolved {
            Resolved::Value(value) => value
                .downcast_ref::<String>()
                .map_or("<not a string>", String::as_str),
            _ => "<not a value>",
        }
    }

    #[tokio::test]
    async fn test_projection() {
        let field = Field::new("message", |c: &Comment| c.message.clone());
        let resolved = call(field, comment(), Map::object()).await.unwrap();
        assert_eq!(string(&resolved), "hi");
    }

    #[tokio::test]
    async fn test_calling_conventions_agree() {
        let sync = Field::sync("shout", |c: &Comment, ctx: &Context, args: Shout| {
            Ok(format!("{}{}", ctx.prefix, c.message.repeat(args.times)))
        });
        let future = Field::future(
            "shout",
            |c: Arc<Comment>, ctx: Arc<Context>, args: Shout| async move {
                tokio::task::yield_now().await;
                Ok(format!("{}{}", ctx.prefix, c.message.repeat(args.times)))
            },
        );
        let deferred = Field::deferred(
            "shout",
            |c: Arc<Comment>, ctx: Arc<Context>, args: Shout, spawner: &Spawner| {
                spawner.spawn(async move {
                    Ok(format!("{}{}", ctx.prefix, c.message.repeat(args.times)))
                })
            },
        );

        let mut args = Map::object();
        args.insert("times", 2);
        for field in [sync, future, deferred] {
            let resolved = call(field, comment(), args.clone()).await.unwrap();
            assert_eq!(string(&resolved), "> hihi");
        }
    }

    #[tokio::test]
    async fn test_source_mismatch() {
        let field = Field::new("id", |c: &Comment| c.id);
        let error = call(field, OpaqueValue::new(7_i32), Map::object())
            .await
            .unwrap_err();
        assert!(error.message.starts_with("expected source type"));
        assert!(error.message.ends_with("but got i32"));
    }

    #[tokio::test]
    async fn test_context_mismatch() {
        let field: Field<Comment, Context> =
            Field::sync("id", |c: &Comment, _: &Context, _: NoArguments| Ok(c.id));
        let error = (field.resolve)(
            comment(),
            Map::object(),
            OpaqueValue::unit(),
            Spawner::current(),
            info(),
        )
        .await
        .unwrap_err();
        assert!(error.message.starts_with("expected context type"));
        assert!(error.message.ends_with("but got ()"));
    }

    #[tokio::test]
    async fn test_argument_decode_failure() {
        let field = Field::sync("shout", |c: &Comment, _: &Context, args: Shout| {
            Ok(c.message.repeat(args.times))
        });
        let mut args = Map::object();
        args.insert("times", "twice");
        let error = call(field, comment(), args).await.unwrap_err();
        assert!(error.message.contains("Shout"));
        assert_eq!(
            error.extensions.get("code"),
            Some(&Map::String("DESERIALIZE_ERROR".into()))
        );
    }

    #[test]
    fn test_duplicate_argument() {
        let mut registry = TypeRegistry::new();
        let field: Field<Comment, Context> =
            Field::sync("find", |c: &Comment, _: &Context, _: NoArguments| Ok(c.id))
                .argument(Argument::new::<Id>("id"))
                .argument(Argument::new::<Option<String>>("id"));
        let error = field.build(&mut registry, "Query").unwrap_err();
        assert_eq!(
            error,
            ConstructionError::DuplicateArgument {
                field: "Query.find".into(),
                argument: "id".into(),
            }
        );
    }

    #[test]
    fn test_invalid_default() {
        let mut registry = TypeRegistry::new();
        let mut weird = BTreeMap::new();
        weird.insert(vec![1_u8], 1);
        let error = Argument::new::<Option<i32>>("limit")
            .default_value(weird)
            .build(&mut registry, "Query.items(limit:)")
            .unwrap_err();
        assert!(matches!(error, ConstructionError::InvalidDefault { .. }));
    }

    #[test]
    fn test_argument_defaults_are_encoded() {
        let mut registry = TypeRegistry::new();
        let value = Argument::new::<Option<i32>>("first")
            .default_value(10)
            .description("Page size")
            .build(&mut registry, "Query.comments(first:)")
            .unwrap();
        assert_eq!(value.default_value, Some(Map::Int(10)));
        assert!(!value.ty.is_non_null());
    }
}
