//! Federation entity resolution.
//!
//! Object types declare [`Key`]s: the field sets that identify an instance
//! across subgraphs, each with a resolver from the decoded key to the
//! entity. When federation is enabled the schema gains:
//!
//! ```graphql
//! scalar _Any
//! type _Service { sdl: String! }
//! union _Entity = ...every keyed type
//! extend type Query {
//!   _entities(representations: [_Any!]!): [_Entity]!
//!   _service: _Service!
//! }
//! ```
//!
//! Each representation is resolved on its own task. A representation that
//! cannot be resolved becomes `null` without failing its siblings.

use crate::component::{BuildContext, Component};
use crate::error::ErrorCode;
use crate::field::{build_arguments, context_mismatch, Argument, Field};
use crate::object::Type;
use crate::scalar::Scalar;
use futures::future::join_all;
use indexmap::IndexMap;
use rustc_hash::FxHashMap;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::marker::PhantomData;
use std::sync::{Arc, OnceLock};
use tracing::{debug, warn};
use weft_core::{decode, Map};
use weft_runtime::{
    fail, ready, suspend, AnyType, ConstructionError, FieldDefinition, FieldError, FieldFuture,
    FieldResult, GraphType, NamedType, OpaqueValue, ResolveFn, ResolveInfo, Resolved, Spawner,
    TypeIndex, TypeRegistry, UnionType,
};
use weft_syntax::OperationType;

/// How a type with several matching keys is treated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyPolicy {
    /// Keys are tried in declaration order and the first one whose fields
    /// are all present in a representation wins.
    #[default]
    FirstMatch,
    /// Keys of a type must have mutually exclusive field sets; a type whose
    /// keys share a field is rejected when the schema is built. A
    /// representation carrying the fields of more than one key resolves to
    /// null instead of being settled by declaration order.
    RejectAmbiguous,
}

/// Federation settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FederationConfig {
    /// SDL served by `_service`. Defaults to the printed schema.
    pub sdl: Option<String>,
    pub key_policy: KeyPolicy,
}

impl FederationConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_sdl(mut self, sdl: impl Into<String>) -> Self {
        self.sdl = Some(sdl.into());
        self
    }

    #[must_use]
    pub fn with_key_policy(mut self, key_policy: KeyPolicy) -> Self {
        self.key_policy = key_policy;
        self
    }
}

/// Resolves a selected representation, or `None` if it does not decode as
/// this key.
type KeyResolveFn = Arc<dyn Fn(Map, OpaqueValue) -> Option<FieldFuture> + Send + Sync>;

/// A federation key of `T`.
///
/// The declared arguments name the key fields, which must be fields of
/// `T`. A representation matches when it carries all of them; the selected
/// fields are then decoded into the resolver's key type `K`.
///
/// ```ignore
/// #[derive(Deserialize)]
/// struct UserById { id: Id }
///
/// Type::<User, Context>::new()
///     .field(Field::new("id", |u: &User| u.id.clone()))
///     .key(
///         Key::sync(|cx: &Context, key: UserById| Ok(cx.users.get(&key.id).cloned()))
///             .argument(Argument::new::<Id>("id")),
///     )
/// ```
pub struct Key<T, Ctx = ()> {
    arguments: Vec<Argument>,
    resolve: KeyResolveFn,
    _marker: PhantomData<fn(&T, &Ctx)>,
}

impl<T, Ctx> Key<T, Ctx>
where
    T: GraphType,
    Ctx: Send + Sync + 'static,
{
    /// Creates a key resolved by a future.
    pub fn new<K, F, Fut>(resolve: F) -> Self
    where
        K: DeserializeOwned,
        F: Fn(Arc<Ctx>, K) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = FieldResult<Option<T>>> + Send + 'static,
    {
        Self::bind::<K, _>(move |context, key| suspend(resolve(context, key)))
    }

    /// Creates a key resolved synchronously.
    pub fn sync<K, F>(resolve: F) -> Self
    where
        K: DeserializeOwned,
        F: Fn(&Ctx, K) -> FieldResult<Option<T>> + Send + Sync + 'static,
    {
        Self::bind::<K, _>(move |context: Arc<Ctx>, key| ready(resolve(&context, key)))
    }

    fn bind<K, F>(call: F) -> Self
    where
        K: DeserializeOwned,
        F: Fn(Arc<Ctx>, K) -> FieldFuture + Send + Sync + 'static,
    {
        let resolve: KeyResolveFn = Arc::new(move |selected: Map, context: OpaqueValue| {
            let key = decode::<K>(selected).ok()?;
            Some(match context.downcast::<Ctx>() {
                Ok(context) => call(context, key),
                Err(mismatch) => fail(context_mismatch(&mismatch)),
            })
        });
        Self {
            arguments: Vec::new(),
            resolve,
            _marker: PhantomData,
        }
    }

    /// Declares a key field.
    #[must_use]
    pub fn argument(mut self, argument: Argument) -> Self {
        self.arguments.push(argument);
        self
    }

    pub(crate) fn build(
        self,
        registry: &mut TypeRegistry,
        type_name: &str,
        fields: &IndexMap<String, FieldDefinition>,
    ) -> Result<EntityKey, ConstructionError> {
        if let Some(unknown) = self
            .arguments
            .iter()
            .find(|argument| !fields.contains_key(argument.name()))
        {
            return Err(ConstructionError::UnknownKeyField {
                type_name: type_name.to_string(),
                argument: unknown.name().to_string(),
            });
        }

        let usage = format!("{type_name} key");
        let arguments = build_arguments(registry, &usage, self.arguments)?;
        Ok(EntityKey {
            fields: arguments.into_keys().collect(),
            resolve: self.resolve,
        })
    }
}

/// A built key of an entity type.
#[derive(Clone)]
pub(crate) struct EntityKey {
    pub(crate) fields: Vec<String>,
    resolve: KeyResolveFn,
}

impl EntityKey {
    /// Selects this key's fields from a representation, if all are present.
    fn select(&self, representation: &IndexMap<String, Map>) -> Option<Map> {
        self.fields
            .iter()
            .map(|field| {
                representation
                    .get(field)
                    .map(|value| (field.clone(), value.clone()))
            })
            .collect()
    }
}

/// A keyed object type.
#[derive(Clone)]
pub(crate) struct Entity {
    pub(crate) type_name: String,
    pub(crate) index: TypeIndex,
    pub(crate) keys: Vec<EntityKey>,
}

/// The value of `_service`.
#[derive(Debug, Clone)]
pub struct Service {
    pub sdl: String,
}

impl GraphType for Service {
    fn type_name() -> String {
        "_Service".to_string()
    }
}

/// Marker for the `_Entity` union.
enum EntityUnion {}

impl GraphType for EntityUnion {
    fn type_name() -> String {
        "_Entity".to_string()
    }
}

/// Registers the federation types and root fields.
///
/// `printed` is filled with the printed schema once it is frozen; `_service`
/// serves it unless the config supplies its own SDL.
pub(crate) fn install(
    cx: &mut BuildContext,
    config: &FederationConfig,
    printed: Arc<OnceLock<String>>,
) -> Result<(), ConstructionError> {
    Box::new(Scalar::<Map>::new()).apply(cx)?;
    Box::new(
        Type::<Service>::new().field(Field::new("sdl", |service: &Service| service.sdl.clone())),
    )
    .apply(cx)?;

    if !cx.entities.is_empty() {
        install_entities(cx)?;
    }

    let ty = cx
        .registry()
        .get_output_type(&Service::type_expr(), "Query._service")?;
    let configured = config.sdl.clone();
    let resolve: ResolveFn = Arc::new(
        move |_: OpaqueValue, _: Map, _: OpaqueValue, _: Spawner, _: ResolveInfo| {
            let sdl = configured
                .clone()
                .or_else(|| printed.get().cloned())
                .unwrap_or_default();
            ready(Ok(Service { sdl }))
        },
    );
    cx.add_root_field(
        OperationType::Query,
        FieldDefinition {
            name: "_service".to_string(),
            description: None,
            deprecation_reason: None,
            ty,
            arguments: IndexMap::new(),
            resolve,
        },
    )
}

fn install_entities(cx: &mut BuildContext) -> Result<(), ConstructionError> {
    let key_policy = cx.key_policy();
    let members: Vec<TypeIndex> = cx.entities.iter().map(|entity| entity.index).collect();
    cx.registry().register(
        AnyType::of::<EntityUnion>(),
        NamedType::Union(UnionType {
            name: EntityUnion::type_name(),
            description: None,
            members,
        }),
    )?;

    let registry = cx.registry();
    let ty = registry.get_output_type(
        &Vec::<Option<EntityUnion>>::type_expr(),
        "Query._entities",
    )?;
    let arguments = build_arguments(
        registry,
        "Query._entities",
        vec![Argument::new::<Vec<Map>>("representations")],
    )?;

    let entities: Arc<FxHashMap<String, Entity>> = Arc::new(
        cx.entities
            .iter()
            .map(|entity| (entity.type_name.clone(), entity.clone()))
            .collect(),
    );
    debug!(entities = entities.len(), "installed _entities");

    let resolve: ResolveFn = Arc::new(
        move |_: OpaqueValue, args: Map, context: OpaqueValue, spawner: Spawner, _: ResolveInfo| {
            let Some(representations) = args.get("representations").and_then(Map::as_array) else {
                return fail(ErrorCode::BadUserInput.error("`representations` must be a list"));
            };
            let pending: Vec<_> = representations
                .iter()
                .cloned()
                .map(|representation| {
                    spawner.spawn(resolve_representation(
                        Arc::clone(&entities),
                        key_policy,
                        representation,
                        context.clone(),
                    ))
                })
                .collect();

            let future: FieldFuture = Box::pin(async move {
                let results = join_all(pending.into_iter().map(|deferred| deferred.join())).await;
                Ok(Resolved::List(
                    results
                        .into_iter()
                        .map(|result| {
                            result.unwrap_or_else(|error| {
                                warn!(error = %error.message, "entity resolved to null");
                                Resolved::Null
                            })
                        })
                        .collect(),
                ))
            });
            future
        },
    );

    cx.add_root_field(
        OperationType::Query,
        FieldDefinition {
            name: "_entities".to_string(),
            description: None,
            deprecation_reason: None,
            ty,
            arguments,
            resolve,
        },
    )
}

/// Resolves one representation with the first key whose fields it carries
/// and that decodes.
async fn resolve_representation(
    entities: Arc<FxHashMap<String, Entity>>,
    key_policy: KeyPolicy,
    representation: Map,
    context: OpaqueValue,
) -> FieldResult<Resolved> {
    let Some(object) = representation.as_object() else {
        return Err(ErrorCode::BadUserInput.error("representation must be an object"));
    };
    let Some(type_name) = object.get("__typename").and_then(Map::as_str) else {
        return Err(ErrorCode::BadUserInput.error("representation is missing `__typename`"));
    };
    let Some(entity) = entities.get(type_name) else {
        return Err(ErrorCode::NotFound.error(format!("`{type_name}` is not an entity type")));
    };

    if key_policy == KeyPolicy::RejectAmbiguous {
        let matching: Vec<String> = entity
            .keys
            .iter()
            .filter(|key| key.select(object).is_some())
            .map(|key| format!("`{}`", key.fields.join(" ")))
            .collect();
        if matching.len() > 1 {
            return Err(ErrorCode::BadUserInput.error(format!(
                "representation of `{type_name}` matches keys {}",
                matching.join(", ")
            )));
        }
    }

    for key in &entity.keys {
        let Some(selected) = key.select(object) else {
            continue;
        };
        if let Some(future) = (key.resolve)(selected, context.clone()) {
            return future.await.map_err(|error| FieldError {
                message: format!("resolving `{type_name}` failed: {}", error.message),
                ..error
            });
        }
    }

    warn!(entity = %type_name, "no key matches representation");
    Ok(Resolved::Null)
}
