//! Schema construction and execution.

use crate::component::{root_name, BuildContext, Component, RootFields};
use crate::error::ErrorCode;
use crate::federation::{self, FederationConfig};
use std::sync::{Arc, OnceLock};
use tracing::{debug, info};
use weft_core::Map;
use weft_runtime::{
    ConstructionError, Executor, ExecutorConfig, NamedType, ObjectType, OpaqueValue, Response,
    Spawner, TypeRegistry,
};
use weft_syntax::OperationType;

/// Collects components and builds a [`Schema`].
///
/// ```ignore
/// let schema = SchemaBuilder::new()
///     .add(Type::<Comment>::new().field(Field::new("id", |c: &Comment| c.id)))
///     .add(ConnectionType::<Comment>::new())
///     .add(Query::<(), Context>::new().field(comments_field()))
///     .build()?;
/// ```
#[derive(Default)]
pub struct SchemaBuilder {
    description: Option<String>,
    components: Vec<Box<dyn Component>>,
    federation: Option<FederationConfig>,
    executor_config: ExecutorConfig,
}

impl SchemaBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Enables federation.
    #[must_use]
    pub fn federation(mut self, config: FederationConfig) -> Self {
        self.federation = Some(config);
        self
    }

    #[must_use]
    pub fn executor_config(mut self, config: ExecutorConfig) -> Self {
        self.executor_config = config;
        self
    }

    /// Adds a component. Components are applied in the order they are
    /// added.
    #[must_use]
    pub fn add(mut self, component: impl Component + 'static) -> Self {
        self.components.push(Box::new(component));
        self
    }

    /// Applies every component and freezes the schema.
    ///
    /// # Errors
    ///
    /// Returns the first [`ConstructionError`]. A schema needs at least one
    /// query field, or a federated entity when federation is enabled.
    pub fn build(self) -> Result<Schema, ConstructionError> {
        let mut registry = TypeRegistry::new();
        if let Some(description) = self.description {
            registry.set_description(description);
        }
        let key_policy = self
            .federation
            .as_ref()
            .map(|config| config.key_policy)
            .unwrap_or_default();

        let mut cx = BuildContext::new(registry, key_policy);
        for component in self.components {
            debug!(kind = component.kind(), name = %component.name(), "applying component");
            component.apply(&mut cx)?;
        }

        let federated = self.federation.is_some() && !cx.entities.is_empty();
        if cx.query.fields.is_empty() && !federated {
            return Err(ConstructionError::MissingQuery);
        }

        let printed = Arc::new(OnceLock::new());
        if let Some(config) = &self.federation {
            federation::install(&mut cx, config, Arc::clone(&printed))?;
        }

        let query = std::mem::take(&mut cx.query);
        let mutation = std::mem::take(&mut cx.mutation);
        let subscription = std::mem::take(&mut cx.subscription);
        let mut registry = cx.registry;
        register_root(&mut registry, OperationType::Query, query)?;
        if !mutation.fields.is_empty() {
            register_root(&mut registry, OperationType::Mutation, mutation)?;
        }
        if !subscription.fields.is_empty() {
            register_root(&mut registry, OperationType::Subscription, subscription)?;
        }

        let inner = registry.finish()?;
        let _ = printed.set(inner.sdl());
        info!(federation = self.federation.is_some(), "schema built");

        Ok(Schema {
            inner,
            executor: Executor::with_config(self.executor_config),
        })
    }
}

fn register_root(
    registry: &mut TypeRegistry,
    operation: OperationType,
    root: RootFields,
) -> Result<(), ConstructionError> {
    let object = ObjectType {
        name: root_name(operation).to_string(),
        description: root.description,
        fields: root.fields,
        interfaces: Vec::new(),
        is_instance: Arc::new(|_: &OpaqueValue| true),
        keys: Vec::new(),
    };
    registry.register_root(operation, NamedType::Object(object))?;
    Ok(())
}

/// A built schema, ready to execute requests.
///
/// Cheap to clone; clones share the frozen type graph.
#[derive(Debug, Clone)]
pub struct Schema {
    inner: weft_runtime::Schema,
    executor: Executor,
}

impl Schema {
    /// Executes a request against `root` with `context`.
    ///
    /// Must be called from within a tokio runtime; resolvers spawn their
    /// work on it.
    pub async fn execute<R, C>(
        &self,
        request: &str,
        root: R,
        context: C,
        variables: Map,
        operation_name: Option<&str>,
    ) -> Response
    where
        R: Send + Sync + 'static,
        C: Send + Sync + 'static,
    {
        self.execute_opaque(
            request,
            OpaqueValue::new(root),
            OpaqueValue::new(context),
            variables,
            operation_name,
        )
        .await
    }

    /// Executes a request with already type-erased root and context values.
    pub async fn execute_opaque(
        &self,
        request: &str,
        root: OpaqueValue,
        context: OpaqueValue,
        variables: Map,
        operation_name: Option<&str>,
    ) -> Response {
        let document = match weft_syntax::parse(request) {
            Ok(document) => document,
            Err(error) => {
                let location = error.span.locate(request);
                return Response::error(
                    ErrorCode::ParseError
                        .error(error.message)
                        .with_location(location),
                );
            }
        };
        let Some(spawner) = Spawner::try_current() else {
            return Response::error(
                ErrorCode::ExecutionError.error("requests must be executed on a tokio runtime"),
            );
        };

        self.executor
            .execute(
                &self.inner,
                &document,
                operation_name,
                root,
                context,
                spawner,
                variables,
            )
            .await
    }

    /// The schema printed as SDL.
    #[must_use]
    pub fn sdl(&self) -> String {
        self.inner.sdl()
    }

    /// The frozen type graph.
    #[must_use]
    pub fn runtime(&self) -> &weft_runtime::Schema {
        &self.inner
    }

    #[must_use]
    pub fn executor_config(&self) -> &ExecutorConfig {
        self.executor.config()
    }
}
