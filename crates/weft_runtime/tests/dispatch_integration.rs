//! Integration tests for abstract type dispatch through the registry and executor.

use indexmap::IndexMap;
use std::sync::Arc;
use weft_core::Map;
use weft_runtime::{
    AnyType, Executor, FieldDefinition, FieldError, FieldFuture, InterfaceType, NamedType, ObjectType,
    OpaqueValue, ResolveFn, ResolveInfo, Resolved, Schema, Spawner, TypeIndex, TypeRef,
    TypeRegistry, UnionType,
};
use weft_syntax::OperationType;

struct User {
    id: &'static str,
    name: &'static str,
}

struct Post {
    id: &'static str,
    title: &'static str,
}

fn resolve_with(f: impl Fn(&OpaqueValue) -> Resolved + Send + Sync + 'static) -> ResolveFn {
    Arc::new(
        move |source: OpaqueValue, _: Map, _: OpaqueValue, _: Spawner, _: ResolveInfo| {
            let resolved = f(&source);
            let future: FieldFuture = Box::pin(async move { Ok::<_, FieldError>(resolved) });
            future
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

fn string_field<T: Send + Sync + 'static>(
    registry: &mut TypeRegistry,
    name: &str,
    get: fn(&T) -> &'static str,
) -> (String, FieldDefinition) {
    let ty = registry.resolve(&weft_runtime::TypeExpr::named::<String>(), name);
    field(
        name,
        ty,
        resolve_with(move |source| {
            source
                .downcast_ref::<T>()
                .map_or(Resolved::Null, |value| Resolved::value(get(value).to_string()))
        }),
    )
}

fn object<T: Send + Sync + 'static>(
    name: &str,
    interfaces: Vec<TypeIndex>,
    fields: Vec<(String, FieldDefinition)>,
) -> NamedType {
    NamedType::Object(ObjectType {
        name: name.to_string(),
        description: None,
        fields: fields.into_iter().collect(),
        interfaces,
        is_instance: Arc::new(|value: &OpaqueValue| value.is::<T>()),
        keys: Vec::new(),
    })
}

fn schema() -> Schema {
    let mut registry = TypeRegistry::new();

    let node_id = string_field::<User>(&mut registry, "id", |user| user.id);
    let node = registry
        .register_named(NamedType::Interface(InterfaceType {
            name: "Node".into(),
            description: None,
            fields: [node_id].into_iter().collect(),
        }))
        .unwrap();

    let user_fields = vec![
        string_field::<User>(&mut registry, "id", |user| user.id),
        string_field::<User>(&mut registry, "name", |user| user.name),
    ];
    let user = registry
        .register(AnyType::of::<User>(), object::<User>("User", vec![node], user_fields))
        .unwrap()
        .unwrap();

    let post_fields = vec![
        string_field::<Post>(&mut registry, "id", |post| post.id),
        string_field::<Post>(&mut registry, "title", |post| post.title),
    ];
    let post = registry
        .register(AnyType::of::<Post>(), object::<Post>("Post", vec![node], post_fields))
        .unwrap()
        .unwrap();

    let search = registry
        .register_named(NamedType::Union(UnionType {
            name: "SearchResult".into(),
            description: None,
            members: vec![user, post],
        }))
        .unwrap();

    registry
        .register_root(
            OperationType::Query,
            NamedType::Object(ObjectType {
                name: "Query".into(),
                description: None,
                fields: [
                    field(
                        "node",
                        TypeRef::Named(node),
                        resolve_with(|_| Resolved::value(Post { id: "p1", title: "Hello" })),
                    ),
                    field(
                        "search",
                        TypeRef::Named(search).non_null().list().non_null(),
                        resolve_with(|_| {
                            Resolved::List(vec![
                                Resolved::value(User { id: "u1", name: "Ada" }),
                                Resolved::value(Post { id: "p2", title: "Weft" }),
                            ])
                        }),
                    ),
                    field(
                        "mystery",
                        TypeRef::Named(search),
                        resolve_with(|_| Resolved::value(42_i32)),
                    ),
                ]
                .into_iter()
                .collect(),
                interfaces: Vec::new(),
                is_instance: Arc::new(|_: &OpaqueValue| true),
                keys: Vec::new(),
            }),
        )
        .unwrap();

    registry.finish().unwrap()
}

async fn run(query: &str) -> serde_json::Value {
    let document = weft_syntax::parse(query).unwrap();
    Executor::new()
        .execute(
            &schema(),
            &document,
            None,
            OpaqueValue::unit(),
            OpaqueValue::unit(),
            Spawner::current(),
            Map::Null,
        )
        .await
        .into_json()
}

/// Interface fields dispatch to the concrete object by runtime type test.
#[tokio::test]
async fn test_interface_dispatch() {
    let response = run("{ node { __typename id ... on Post { title } ... on User { name } } }").await;
    assert_eq!(
        response,
        serde_json::json!({
            "data": { "node": { "__typename": "Post", "id": "p1", "title": "Hello" } }
        })
    );
}

/// Union members are completed through named fragments.
#[tokio::test]
async fn test_union_dispatch_with_fragments() {
    let response = run(
        "query { search { __typename ...UserParts ... on Post { title } } }
         fragment UserParts on User { name }",
    )
    .await;
    assert_eq!(
        response,
        serde_json::json!({
            "data": {
                "search": [
                    { "__typename": "User", "name": "Ada" },
                    { "__typename": "Post", "title": "Weft" }
                ]
            }
        })
    );
}

/// A value no member accepts is a field error at that position.
#[tokio::test]
async fn test_unknown_runtime_type() {
    let response = run("{ mystery { __typename } }").await;
    assert_eq!(response["data"], serde_json::json!({ "mystery": null }));
    let message = response["errors"][0]["message"].as_str().unwrap();
    assert!(message.contains("runtime type of `SearchResult`"));
    assert_eq!(response["errors"][0]["path"], serde_json::json!(["mystery"]));
}

/// Possible types are computed when the schema is frozen.
#[test]
fn test_possible_types() {
    let schema = schema();
    let (node, _) = schema.type_by_name("Node").unwrap();
    let (user, _) = schema.type_by_name("User").unwrap();
    let (post, _) = schema.type_by_name("Post").unwrap();
    assert_eq!(schema.possible_types(node), &[user, post]);
    assert!(schema.is_possible_type(node, post));
}
