//! Reference execution engine.
//!
//! Executes a parsed document against a frozen [`Schema`] by invoking each
//! field's [`ResolveFn`](crate::resolve::ResolveFn) and completing the
//! results into a [`Map`]. Validation beyond what execution itself needs is
//! not performed.

use crate::error::{format_path, FieldError, FieldResult, PathSegment};
use crate::resolve::{OpaqueValue, ResolveInfo, Resolved, Spawner};
use crate::schema::Schema;
use crate::types::{FieldDefinition, InputObjectType, NamedType, TypeIndex, TypeRef};
use futures::future::{join_all, BoxFuture, FutureExt};
use indexmap::IndexMap;
use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::debug;
use weft_core::Map;
use weft_syntax::{
    Directive, Document, Field, FragmentDefinition, OperationType, Selection, SelectionSet,
    TypeAnnotation, Value, VariableDefinition,
};

/// Executor configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutorConfig {
    /// Maximum field nesting depth.
    pub max_depth: usize,
    /// Execute mutation root fields one after another.
    pub serial_mutations: bool,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            max_depth: 64,
            serial_mutations: true,
        }
    }
}

impl ExecutorConfig {
    /// Creates a new config with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the maximum field nesting depth.
    #[must_use]
    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }

    /// Sets whether mutation root fields run serially.
    #[must_use]
    pub fn with_serial_mutations(mut self, serial: bool) -> Self {
        self.serial_mutations = serial;
        self
    }
}

/// A GraphQL response.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Response {
    /// The data, absent when execution did not start.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Map>,
    /// The errors.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<FieldError>,
}

impl Response {
    /// Creates a successful response with data.
    #[must_use]
    pub fn data(data: Map) -> Self {
        Self {
            data: Some(data),
            errors: Vec::new(),
        }
    }

    /// Creates a response for a request that could not be executed.
    pub fn error(error: impl Into<FieldError>) -> Self {
        Self {
            data: None,
            errors: vec![error.into()],
        }
    }

    /// Returns true if the response has errors.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Converts the response into its JSON shape.
    #[must_use]
    pub fn into_json(self) -> serde_json::Value {
        let mut object = serde_json::Map::new();
        if let Some(data) = self.data {
            object.insert("data".to_string(), data.into());
        }
        if !self.errors.is_empty() {
            object.insert(
                "errors".to_string(),
                serde_json::to_value(&self.errors).unwrap_or_default(),
            );
        }
        serde_json::Value::Object(object)
    }
}

/// The query executor.
#[derive(Debug, Clone, Default)]
pub struct Executor {
    config: ExecutorConfig,
}

impl Executor {
    /// Creates a new executor.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an executor with configuration.
    #[must_use]
    pub fn with_config(config: ExecutorConfig) -> Self {
        Self { config }
    }

    #[must_use]
    pub fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    /// Executes an operation of `document`.
    ///
    /// `variables` must be an object or null. Field errors are collected
    /// into the response; request errors (unknown operation, bad variables,
    /// unsupported operation type) produce a response without data.
    #[allow(clippy::too_many_arguments)]
    pub async fn execute(
        &self,
        schema: &Schema,
        document: &Document,
        operation_name: Option<&str>,
        root: OpaqueValue,
        context: OpaqueValue,
        spawner: Spawner,
        variables: Map,
    ) -> Response {
        let Some(operation) = document.operation(operation_name) else {
            return Response::error(match operation_name {
                Some(name) => format!("unknown operation `{name}`"),
                None => "the document must contain exactly one operation, or an operation name \
                         must be provided"
                    .to_string(),
            });
        };

        let root_type = match operation.operation {
            OperationType::Query => schema.query(),
            OperationType::Mutation => match schema.mutation() {
                Some(mutation) => mutation,
                None => return Response::error("schema does not support mutations"),
            },
            OperationType::Subscription => {
                return Response::error("subscriptions are not supported by this executor")
            }
        };

        let mut ctx = ExecutionContext {
            schema,
            fragments: document.fragments().map(|f| (f.name.as_str(), f)).collect(),
            variables: IndexMap::new(),
            context,
            spawner,
            config: &self.config,
            errors: Mutex::new(Vec::new()),
        };

        if let Err(error) = ctx.coerce_variables(&operation.variables, variables) {
            return Response::error(error);
        }

        let serial = operation.operation == OperationType::Mutation && self.config.serial_mutations;
        let data = ctx
            .execute_selection_set(
                root_type,
                root,
                vec![&operation.selection_set],
                Vec::new(),
                0,
                serial,
            )
            .await;

        Response {
            data: Some(data.unwrap_or_default()),
            errors: ctx.errors.into_inner(),
        }
    }
}

/// A null that must propagate to the nearest nullable position. The error
/// that caused it has already been recorded.
struct Propagate;

type Completion = Result<Map, Propagate>;

struct ExecutionContext<'a> {
    schema: &'a Schema,
    fragments: FxHashMap<&'a str, &'a FragmentDefinition>,
    variables: IndexMap<String, Map>,
    context: OpaqueValue,
    spawner: Spawner,
    config: &'a ExecutorConfig,
    errors: Mutex<Vec<FieldError>>,
}

impl<'a> ExecutionContext<'a> {
    fn execute_selection_set<'b>(
        &'b self,
        object: TypeIndex,
        source: OpaqueValue,
        sets: Vec<&'a SelectionSet>,
        path: Vec<PathSegment>,
        depth: usize,
        serial: bool,
    ) -> BoxFuture<'b, Completion> {
        async move {
            let fields = self.collect_fields(object, &sets);
            let mut data = IndexMap::with_capacity(fields.len());

            if serial {
                for (key, nodes) in &fields {
                    let value = self
                        .execute_field(object, source.clone(), key, nodes, path.clone(), depth)
                        .await?;
                    data.insert((*key).to_string(), value);
                }
            } else {
                let results = join_all(fields.iter().map(|(key, nodes)| {
                    self.execute_field(object, source.clone(), key, nodes, path.clone(), depth)
                }))
                .await;
                for (key, result) in fields.keys().zip(results) {
                    data.insert((*key).to_string(), result?);
                }
            }

            Ok(Map::Object(data))
        }
        .boxed()
    }

    async fn execute_field(
        &self,
        object: TypeIndex,
        source: OpaqueValue,
        key: &str,
        nodes: &[&'a Field],
        mut path: Vec<PathSegment>,
        depth: usize,
    ) -> Completion {
        let field = nodes[0];
        let parent = self.schema.get(object);
        path.push(PathSegment::Field(key.to_string()));

        if field.name == "__typename" {
            return Ok(Map::String(parent.name().to_string()));
        }

        let Some(definition) = parent.fields().and_then(|fields| fields.get(&field.name)) else {
            let message = format!(
                "cannot query field `{}` on type `{}`",
                field.name,
                parent.name()
            );
            self.record(FieldError::new(message), path).await;
            return Ok(Map::Null);
        };

        if depth >= self.config.max_depth {
            let message = format!("query exceeds the maximum depth of {}", self.config.max_depth);
            return self.fail(FieldError::new(message), path, &definition.ty).await;
        }

        let args = match self.coerce_arguments(definition, field) {
            Ok(args) => args,
            Err(error) => return self.fail(error, path, &definition.ty).await,
        };

        let info = ResolveInfo {
            field_name: field.name.clone(),
            parent_type: parent.name().to_string(),
            return_type: self.schema.display_type(&definition.ty),
            path: path.clone(),
        };

        let resolved = (definition.resolve)(
            source,
            args,
            self.context.clone(),
            self.spawner.clone(),
            info,
        )
        .await;

        match resolved {
            Ok(resolved) => {
                self.complete_value(&definition.ty, nodes, resolved, path, depth + 1)
                    .await
            }
            Err(error) => self.fail(error, path, &definition.ty).await,
        }
    }

    fn complete_value<'b>(
        &'b self,
        ty: &'b TypeRef,
        nodes: &'b [&'a Field],
        resolved: Resolved,
        path: Vec<PathSegment>,
        depth: usize,
    ) -> BoxFuture<'b, Completion> {
        async move {
            match ty {
                TypeRef::NonNull(inner) => {
                    let value = self
                        .complete_nullable(inner, nodes, resolved, path.clone(), depth)
                        .await?;
                    if value.is_null() {
                        let message = format!(
                            "cannot return null for non-nullable field `{}`",
                            nodes[0].name
                        );
                        self.record(FieldError::new(message), path).await;
                        Err(Propagate)
                    } else {
                        Ok(value)
                    }
                }
                _ => Ok(self
                    .complete_nullable(ty, nodes, resolved, path, depth)
                    .await
                    .unwrap_or_default()),
            }
        }
        .boxed()
    }

    /// Completes a value at a position that is not itself non-null.
    /// `Err(Propagate)` leaves the decision to null it to the caller.
    fn complete_nullable<'b>(
        &'b self,
        ty: &'b TypeRef,
        nodes: &'b [&'a Field],
        resolved: Resolved,
        path: Vec<PathSegment>,
        depth: usize,
    ) -> BoxFuture<'b, Completion> {
        async move {
            if resolved.is_null() {
                return Ok(Map::Null);
            }

            let index = match ty {
                TypeRef::NonNull(_) => {
                    return self.complete_value(ty, nodes, resolved, path, depth).await
                }
                TypeRef::List(item) => {
                    let Resolved::List(items) = resolved else {
                        let message = format!(
                            "expected a list for `{}`",
                            self.schema.display_type(ty)
                        );
                        return self.propagate(FieldError::new(message), path).await;
                    };
                    let results = join_all(items.into_iter().enumerate().map(|(i, value)| {
                        let mut path = path.clone();
                        path.push(PathSegment::Index(i));
                        self.complete_value(item, nodes, value, path, depth)
                    }))
                    .await;
                    return results.into_iter().collect::<Result<Vec<_>, _>>().map(Map::Array);
                }
                TypeRef::Named(index) => *index,
            };

            let named = self.schema.get(index);
            let Resolved::Value(value) = resolved else {
                let message = format!("expected a single value of type `{}`", named.name());
                return self.propagate(FieldError::new(message), path).await;
            };

            match named {
                NamedType::Scalar(scalar) => match (scalar.serialize)(&value) {
                    Ok(map) => Ok(map),
                    Err(error) => self.propagate(error, path).await,
                },
                NamedType::Enum(enum_type) => match (enum_type.serialize)(&value) {
                    Ok(map) => Ok(map),
                    Err(error) => self.propagate(error, path).await,
                },
                NamedType::Object(_) => {
                    self.execute_selection_set(index, value, sub_selections(nodes), path, depth, false)
                        .await
                }
                NamedType::Interface(_) | NamedType::Union(_) => {
                    match self.runtime_type(index, &value) {
                        Some(object) => {
                            self.execute_selection_set(
                                object,
                                value,
                                sub_selections(nodes),
                                path,
                                depth,
                                false,
                            )
                            .await
                        }
                        None => {
                            let message = format!(
                                "could not determine the runtime type of `{}` for a value of type `{}`",
                                named.name(),
                                value.type_name()
                            );
                            self.propagate(FieldError::new(message), path).await
                        }
                    }
                }
                NamedType::InputObject(input) => {
                    let message = format!("input object `{}` cannot be used as output", input.name);
                    self.propagate(FieldError::new(message), path).await
                }
            }
        }
        .boxed()
    }

    /// Finds the object type of `value` among the possible types of an
    /// interface or union.
    fn runtime_type(&self, abstract_type: TypeIndex, value: &OpaqueValue) -> Option<TypeIndex> {
        self.schema
            .possible_types(abstract_type)
            .iter()
            .copied()
            .find(|&candidate| {
                self.schema
                    .get(candidate)
                    .as_object()
                    .is_some_and(|object| (object.is_instance)(value))
            })
    }

    async fn record(&self, error: FieldError, path: Vec<PathSegment>) {
        let error = if error.path.is_empty() {
            error.with_path(path)
        } else {
            error
        };
        debug!(path = %format_path(&error.path), error = %error.message, "field error");
        self.errors.lock().await.push(error);
    }

    async fn propagate(&self, error: FieldError, path: Vec<PathSegment>) -> Completion {
        self.record(error, path).await;
        Err(Propagate)
    }

    async fn fail(&self, error: FieldError, path: Vec<PathSegment>, ty: &TypeRef) -> Completion {
        self.record(error, path).await;
        if ty.is_non_null() {
            Err(Propagate)
        } else {
            Ok(Map::Null)
        }
    }

    fn collect_fields(
        &self,
        object: TypeIndex,
        sets: &[&'a SelectionSet],
    ) -> IndexMap<&'a str, Vec<&'a Field>> {
        let mut fields = IndexMap::new();
        let mut visited = FxHashSet::default();
        for set in sets {
            self.collect_into(object, set, &mut fields, &mut visited);
        }
        fields
    }

    fn collect_into(
        &self,
        object: TypeIndex,
        set: &'a SelectionSet,
        fields: &mut IndexMap<&'a str, Vec<&'a Field>>,
        visited: &mut FxHashSet<&'a str>,
    ) {
        for selection in &set.selections {
            if !self.should_include(selection.directives()) {
                continue;
            }
            match selection {
                Selection::Field(field) => {
                    fields.entry(field.response_key()).or_default().push(field);
                }
                Selection::FragmentSpread(spread) => {
                    if !visited.insert(spread.name.as_str()) {
                        continue;
                    }
                    if let Some(&fragment) = self.fragments.get(spread.name.as_str()) {
                        if self.fragment_applies(object, &fragment.type_condition) {
                            self.collect_into(object, &fragment.selection_set, fields, visited);
                        }
                    }
                }
                Selection::InlineFragment(inline) => {
                    let applies = inline
                        .type_condition
                        .as_deref()
                        .map_or(true, |condition| self.fragment_applies(object, condition));
                    if applies {
                        self.collect_into(object, &inline.selection_set, fields, visited);
                    }
                }
            }
        }
    }

    fn fragment_applies(&self, object: TypeIndex, condition: &str) -> bool {
        match self.schema.type_by_name(condition) {
            Some((index, _)) if index == object => true,
            Some((index, ty)) if ty.kind().is_abstract() => {
                self.schema.is_possible_type(index, object)
            }
            _ => false,
        }
    }

    /// Evaluates `@skip` and `@include`.
    fn should_include(&self, directives: &[Directive]) -> bool {
        for directive in directives {
            let condition = directive
                .arguments
                .iter()
                .find(|(name, _)| name == "if")
                .map(|(_, value)| match value {
                    Value::Boolean(b) => *b,
                    Value::Variable(name) => self
                        .variables
                        .get(name)
                        .and_then(Map::as_bool)
                        .unwrap_or(false),
                    _ => false,
                });
            match (directive.name.as_str(), condition) {
                ("skip", Some(true)) | ("include", Some(false)) => return false,
                _ => {}
            }
        }
        true
    }

    fn coerce_variables(
        &mut self,
        definitions: &[VariableDefinition],
        provided: Map,
    ) -> FieldResult<()> {
        let provided = match provided {
            Map::Object(fields) => fields,
            Map::Null => IndexMap::new(),
            other => {
                return Err(FieldError::new(format!(
                    "variables must be an object, got {}",
                    other.kind()
                )))
            }
        };

        for definition in definitions {
            let Some(ty) = self.annotation_type(&definition.ty) else {
                return Err(FieldError::new(format!(
                    "unknown type `{}` for variable `${}`",
                    definition.ty, definition.name
                )));
            };

            let value = match (provided.get(&definition.name), &definition.default_value) {
                (Some(value), _) => self.coerce_input(value, &ty),
                (None, Some(default)) => self.coerce_literal(default, &ty),
                (None, None) if ty.is_non_null() => Err(FieldError::new(format!(
                    "variable of required type `{}` was not provided",
                    definition.ty
                ))),
                (None, None) => continue,
            }
            .map_err(|e| FieldError::new(format!("variable `${}`: {}", definition.name, e.message)))?;

            self.variables.insert(definition.name.clone(), value);
        }
        Ok(())
    }

    fn annotation_type(&self, annotation: &TypeAnnotation) -> Option<TypeRef> {
        match annotation {
            TypeAnnotation::Named(name) => self
                .schema
                .type_by_name(name)
                .map(|(index, _)| TypeRef::Named(index)),
            TypeAnnotation::List(inner) => Some(self.annotation_type(inner)?.list()),
            TypeAnnotation::NonNull(inner) => Some(self.annotation_type(inner)?.non_null()),
        }
    }

    fn coerce_arguments(&self, definition: &FieldDefinition, field: &Field) -> FieldResult<Map> {
        if let Some((name, _)) = field
            .arguments
            .iter()
            .find(|(name, _)| !definition.arguments.contains_key(name))
        {
            return Err(FieldError::new(format!(
                "unknown argument `{name}` on field `{}`",
                definition.name
            )));
        }

        let mut args = Map::object();
        for (name, argument) in &definition.arguments {
            let provided = match field.argument(name) {
                Some(Value::Variable(variable)) => self.variables.get(variable).cloned().map(Ok),
                Some(literal) => Some(self.coerce_literal(literal, &argument.ty)),
                None => None,
            };

            match provided {
                Some(value) => {
                    let value = value.map_err(|e| {
                        FieldError::new(format!("invalid value for argument `{name}`: {}", e.message))
                    })?;
                    if value.is_null() && argument.ty.is_non_null() {
                        return Err(FieldError::new(format!(
                            "argument `{name}` of non-null type `{}` must not be null",
                            self.schema.display_type(&argument.ty)
                        )));
                    }
                    args.insert(name.clone(), value);
                }
                None => match &argument.default_value {
                    Some(default) => {
                        args.insert(name.clone(), default.clone());
                    }
                    None if argument.ty.is_non_null() => {
                        return Err(FieldError::new(format!(
                            "argument `{name}` of required type `{}` was not provided",
                            self.schema.display_type(&argument.ty)
                        )))
                    }
                    None => {}
                },
            }
        }
        Ok(args)
    }

    fn expected(&self, ty: &TypeRef, found: impl std::fmt::Display) -> FieldError {
        FieldError::new(format!(
            "expected a value of type `{}`, found {found}",
            self.schema.display_type(ty)
        ))
    }

    /// Coerces a literal written in the document.
    fn coerce_literal(&self, value: &Value, ty: &TypeRef) -> FieldResult<Map> {
        if let Value::Variable(name) = value {
            let value = self.variables.get(name).cloned().unwrap_or_default();
            if value.is_null() && ty.is_non_null() {
                return Err(self.expected(ty, format!("null variable `${name}`")));
            }
            return Ok(value);
        }

        match ty {
            TypeRef::NonNull(inner) => {
                if matches!(value, Value::Null) {
                    Err(self.expected(ty, "null"))
                } else {
                    self.coerce_literal(value, inner)
                }
            }
            _ if matches!(value, Value::Null) => Ok(Map::Null),
            TypeRef::List(item) => match value {
                Value::List(items) => items
                    .iter()
                    .map(|value| self.coerce_literal(value, item))
                    .collect::<FieldResult<Vec<_>>>()
                    .map(Map::Array),
                single => Ok(Map::Array(vec![self.coerce_literal(single, item)?])),
            },
            TypeRef::Named(index) => match self.schema.get(*index) {
                NamedType::Scalar(scalar) => (scalar.parse_literal)(value, &self.variables),
                NamedType::Enum(enum_type) => match value {
                    Value::Enum(name) if enum_type.values.contains_key(name) => {
                        Ok(Map::String(name.clone()))
                    }
                    _ => Err(self.expected(ty, "a value outside the enum")),
                },
                NamedType::InputObject(input) => match value {
                    Value::Object(fields) => {
                        let provided: IndexMap<String, &Value> =
                            fields.iter().map(|(k, v)| (k.clone(), v)).collect();
                        self.coerce_input_fields(input, &provided, |value, ty| {
                            self.coerce_literal(value, ty)
                        })
                    }
                    _ => Err(self.expected(ty, "a non-object literal")),
                },
                other => Err(FieldError::new(format!(
                    "`{}` is not an input type",
                    other.name()
                ))),
            },
        }
    }

    /// Coerces a value supplied through variables.
    fn coerce_input(&self, value: &Map, ty: &TypeRef) -> FieldResult<Map> {
        match ty {
            TypeRef::NonNull(inner) => {
                if value.is_null() {
                    Err(self.expected(ty, "null"))
                } else {
                    self.coerce_input(value, inner)
                }
            }
            _ if value.is_null() => Ok(Map::Null),
            TypeRef::List(item) => match value {
                Map::Array(items) => items
                    .iter()
                    .map(|value| self.coerce_input(value, item))
                    .collect::<FieldResult<Vec<_>>>()
                    .map(Map::Array),
                single => Ok(Map::Array(vec![self.coerce_input(single, item)?])),
            },
            TypeRef::Named(index) => match self.schema.get(*index) {
                NamedType::Scalar(scalar) => (scalar.parse_value)(value.clone()),
                NamedType::Enum(enum_type) => match value.as_str() {
                    Some(name) if enum_type.values.contains_key(name) => Ok(value.clone()),
                    _ => Err(self.expected(ty, value)),
                },
                NamedType::InputObject(input) => match value.as_object() {
                    Some(fields) => self.coerce_input_fields(input, fields, |value, ty| {
                        self.coerce_input(value, ty)
                    }),
                    None => Err(self.expected(ty, value)),
                },
                other => Err(FieldError::new(format!(
                    "`{}` is not an input type",
                    other.name()
                ))),
            },
        }
    }

    fn coerce_input_fields<X>(
        &self,
        input: &InputObjectType,
        provided: &IndexMap<String, X>,
        coerce: impl Fn(&X, &TypeRef) -> FieldResult<Map>,
    ) -> FieldResult<Map> {
        if let Some(unknown) = provided.keys().find(|key| !input.fields.contains_key(*key)) {
            return Err(FieldError::new(format!(
                "field `{unknown}` is not defined on input `{}`",
                input.name
            )));
        }

        let mut out = Map::object();
        for (name, field) in &input.fields {
            match (provided.get(name), &field.default_value) {
                (Some(value), _) => {
                    out.insert(name.clone(), coerce(value, &field.ty)?);
                }
                (None, Some(default)) => {
                    out.insert(name.clone(), default.clone());
                }
                (None, None) if field.ty.is_non_null() => {
                    return Err(FieldError::new(format!(
                        "field `{}.{name}` of required type `{}` was not provided",
                        input.name,
                        self.schema.display_type(&field.ty)
                    )))
                }
                (None, None) => {}
            }
        }
        Ok(out)
    }
}

fn sub_selections<'a>(nodes: &[&'a Field]) -> Vec<&'a SelectionSet> {
    nodes
        .iter()
        .filter_map(|field| field.selection_set.as_ref())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph_type::{AnyType, GraphType};
    use crate::registry::TypeRegistry;
    use crate::resolve::{ready, FieldFuture, ResolveFn};
    use crate::types::{InputValue, ObjectType};
    use std::sync::Arc;

    #[derive(Debug)]
    struct Pet {
        name: &'static str,
    }
    impl GraphType for Pet {}

    fn resolver<F>(f: F) -> ResolveFn
    where
        F: Fn(OpaqueValue, Map) -> FieldFuture + Send + Sync + 'static,
    {
        Arc::new(
            move |source: OpaqueValue, args: Map, _: OpaqueValue, _: Spawner, _: ResolveInfo| {
                f(source, args)
            },
        )
    }

    fn field(name: &str, ty: TypeRef, resolve: ResolveFn) -> (String, FieldDefinition) {
        (
            name.to_string(),
            FieldDefinition {
                name: name.to_string(),
                description: None,
                deprecation_reason: None,
                ty,
                arguments: IndexMap::new(),
                resolve,
            },
        )
    }

    fn object(name: &str, fields: Vec<(String, FieldDefinition)>) -> NamedType {
        NamedType::Object(ObjectType {
            name: name.to_string(),
            description: None,
            fields: fields.into_iter().collect(),
            interfaces: Vec::new(),
            is_instance: Arc::new(|value: &OpaqueValue| value.is::<Pet>()),
            keys: Vec::new(),
        })
    }

    fn schema() -> Schema {
        let mut registry = TypeRegistry::new();

        let name = registry.resolve(&String::type_expr(), "Pet.name");
        let nickname = registry.resolve(&Option::<String>::type_expr(), "Pet.nickname");
        registry
            .register(
                AnyType::of::<Pet>(),
                object(
                    "Pet",
                    vec![
                        field(
                            "name",
                            name,
                            resolver(|source, _| {
                                ready(
                                    source
                                        .downcast::<Pet>()
                                        .map(|pet| pet.name.to_string())
                                        .map_err(|e| FieldError::new(e.to_string())),
                                )
                            }),
                        ),
                        field(
                            "nickname",
                            nickname,
                            resolver(|_, _| ready(Err::<String, _>(FieldError::new("no nickname")))),
                        ),
                    ],
                ),
            )
            .unwrap();

        let greeting = registry.resolve(&String::type_expr(), "Query.greet");
        let arg = registry.resolve(&Option::<String>::type_expr(), "Query.greet(name:)");
        let (key, mut greet) = field(
            "greet",
            greeting,
            resolver(|_, args| {
                let name = args["name"].as_str().unwrap_or("nobody").to_string();
                ready(Ok(format!("hello, {name}")))
            }),
        );
        greet.arguments.insert(
            "name".into(),
            InputValue {
                name: "name".into(),
                description: None,
                ty: arg,
                default_value: Some(Map::String("world".into())),
            },
        );

        let pets = registry.resolve(&Vec::<Pet>::type_expr(), "Query.pets");
        let strict = registry.resolve(&Pet::type_expr(), "Query.strict");
        let broken = registry.resolve(&Option::<String>::type_expr(), "Query.broken");

        registry
            .register_root(
                OperationType::Query,
                object(
                    "Query",
                    vec![
                        (key, greet),
                        field(
                            "pets",
                            pets,
                            resolver(|_, _| {
                                ready(Ok(vec![Pet { name: "Rex" }, Pet { name: "Tom" }]))
                            }),
                        ),
                        field("strict", strict, resolver(|_, _| ready(Ok(None::<Pet>)))),
                        field(
                            "broken",
                            broken,
                            resolver(|_, _| ready(Ok(42_i32))),
                        ),
                    ],
                ),
            )
            .unwrap();

        registry.finish().unwrap()
    }

    async fn run(query: &str, variables: Map) -> Response {
        let document = weft_syntax::parse(query).unwrap();
        Executor::new()
            .execute(
                &schema(),
                &document,
                None,
                OpaqueValue::unit(),
                OpaqueValue::unit(),
                Spawner::current(),
                variables,
            )
            .await
    }

    #[tokio::test]
    async fn test_arguments_and_defaults() {
        let response = run(r#"{ a: greet b: greet(name: "Ada") __typename }"#, Map::Null).await;
        assert!(!response.has_errors());
        assert_eq!(
            response.into_json(),
            serde_json::json!({
                "data": { "a": "hello, world", "b": "hello, Ada", "__typename": "Query" }
            })
        );
    }

    #[tokio::test]
    async fn test_variables() {
        let mut variables = Map::object();
        variables.insert("who", "Grace");
        let response = run(
            "query Greet($who: String, $skip: Boolean = true) { greet(name: $who) pets @skip(if: $skip) { name } }",
            variables,
        )
        .await;
        assert_eq!(
            response.data.unwrap(),
            Map::from(serde_json::json!({ "greet": "hello, Grace" }))
        );
    }

    #[tokio::test]
    async fn test_nullable_field_error_is_isolated() {
        let response = run("{ pets { name nickname } }", Map::Null).await;
        assert_eq!(
            response.data.clone().unwrap(),
            Map::from(serde_json::json!({
                "pets": [
                    { "name": "Rex", "nickname": null },
                    { "name": "Tom", "nickname": null }
                ]
            }))
        );
        assert_eq!(response.errors.len(), 2);
        assert_eq!(
            response.errors[0].path,
            vec![
                PathSegment::Field("pets".into()),
                PathSegment::Index(0),
                PathSegment::Field("nickname".into()),
            ]
        );
    }

    #[tokio::test]
    async fn test_non_null_propagates_to_data() {
        let response = run("{ greet strict { name } }", Map::Null).await;
        assert_eq!(response.data, Some(Map::Null));
        assert_eq!(response.errors.len(), 1);
        assert!(response.errors[0].message.contains("non-nullable field `strict`"));
    }

    #[tokio::test]
    async fn test_serialize_failure_is_field_error() {
        let response = run("{ broken }", Map::Null).await;
        assert_eq!(
            response.data.unwrap(),
            Map::from(serde_json::json!({ "broken": null }))
        );
        assert!(response.errors[0].message.starts_with("String cannot represent"));
    }

    #[tokio::test]
    async fn test_request_errors() {
        let response = run("subscription { greet }", Map::Null).await;
        assert!(response.data.is_none());

        let response = run("query($n: Int!) { greet }", Map::Null).await;
        assert!(response.data.is_none());
        assert!(response.errors[0].message.contains("$n"));

        let response = run("{ greet(nope: 1) }", Map::Null).await;
        assert!(response.errors[0].message.contains("unknown argument `nope`"));
    }

    #[tokio::test]
    async fn test_max_depth() {
        let document = weft_syntax::parse("{ pets { name } }").unwrap();
        let response = Executor::with_config(ExecutorConfig::new().with_max_depth(1))
            .execute(
                &schema(),
                &document,
                None,
                OpaqueValue::unit(),
                OpaqueValue::unit(),
                Spawner::current(),
                Map::Null,
            )
            .await;
        assert!(response.errors[0].message.contains("maximum depth"));
    }

    #[test]
    fn test_config_deserializes_with_defaults() {
        let config: ExecutorConfig = serde_json::from_str(r#"{ "max_depth": 8 }"#).unwrap();
        assert_eq!(config.max_depth, 8);
        assert!(config.serial_mutations);
    }
}
