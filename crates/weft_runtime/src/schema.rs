//! The frozen, immutable schema.

use crate::graph_type::{AnyType, GraphType};
use crate::printer;
use crate::scalars::BUILTIN_SCALARS;
use crate::types::{NamedType, TypeIndex, TypeRef};
use rustc_hash::FxHashMap;
use std::fmt;
use std::sync::Arc;
use tracing::info;

/// Schema root assignments.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Roots {
    pub query: Option<TypeIndex>,
    pub mutation: Option<TypeIndex>,
    pub subscription: Option<TypeIndex>,
}

/// A frozen schema.
///
/// Cheap to clone and safe to share across concurrently executing requests.
#[derive(Clone)]
pub struct Schema {
    inner: Arc<SchemaInner>,
}

struct SchemaInner {
    types: Vec<NamedType>,
    by_name: FxHashMap<String, TypeIndex>,
    by_type: FxHashMap<AnyType, TypeIndex>,
    query: TypeIndex,
    roots: Roots,
    possible_types: FxHashMap<TypeIndex, Vec<TypeIndex>>,
    description: Option<String>,
}

impl Schema {
    pub(crate) fn new(
        types: Vec<NamedType>,
        by_name: FxHashMap<String, TypeIndex>,
        by_type: FxHashMap<AnyType, TypeIndex>,
        query: TypeIndex,
        roots: Roots,
        description: Option<String>,
    ) -> Self {
        let mut possible_types: FxHashMap<TypeIndex, Vec<TypeIndex>> = FxHashMap::default();
        for (i, ty) in types.iter().enumerate() {
            #[allow(clippy::cast_possible_truncation)]
            let index = TypeIndex(i as u32);
            match ty {
                NamedType::Object(object) => {
                    for interface in &object.interfaces {
                        possible_types.entry(*interface).or_default().push(index);
                    }
                }
                NamedType::Union(union) => {
                    possible_types
                        .entry(index)
                        .or_default()
                        .extend(union.members.iter().copied());
                }
                _ => {}
            }
        }

        info!(
            types = types.len(),
            query = types[query.index()].name(),
            mutation = roots.mutation.is_some(),
            subscription = roots.subscription.is_some(),
            "schema frozen"
        );

        Self {
            inner: Arc::new(SchemaInner {
                types,
                by_name,
                by_type,
                query,
                roots,
                possible_types,
                description,
            }),
        }
    }

    /// Gets a named type.
    ///
    /// # Panics
    ///
    /// Panics if `index` does not come from this schema.
    #[must_use]
    pub fn get(&self, index: TypeIndex) -> &NamedType {
        &self.inner.types[index.index()]
    }

    /// Looks up a named type by name.
    #[must_use]
    pub fn type_by_name(&self, name: &str) -> Option<(TypeIndex, &NamedType)> {
        self.inner
            .by_name
            .get(name)
            .map(|&index| (index, self.get(index)))
    }

    /// Looks up the named type registered for a native type.
    #[must_use]
    pub fn index_of_type(&self, ty: AnyType) -> Option<TypeIndex> {
        self.inner.by_type.get(&ty).copied()
    }

    /// Looks up the named type registered for `T`.
    #[must_use]
    pub fn index_of<T: GraphType>(&self) -> Option<TypeIndex> {
        self.index_of_type(AnyType::of::<T>())
    }

    #[must_use]
    pub fn query(&self) -> TypeIndex {
        self.inner.query
    }

    #[must_use]
    pub fn mutation(&self) -> Option<TypeIndex> {
        self.inner.roots.mutation
    }

    #[must_use]
    pub fn subscription(&self) -> Option<TypeIndex> {
        self.inner.roots.subscription
    }

    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.inner.description.as_deref()
    }

    /// The object types an interface or union may resolve to.
    #[must_use]
    pub fn possible_types(&self, index: TypeIndex) -> &[TypeIndex] {
        self.inner
            .possible_types
            .get(&index)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Whether `object` is a possible runtime type of `abstract_type`.
    #[must_use]
    pub fn is_possible_type(&self, abstract_type: TypeIndex, object: TypeIndex) -> bool {
        self.possible_types(abstract_type).contains(&object)
    }

    /// Iterates over all named types in registration order.
    pub fn types(&self) -> impl Iterator<Item = (TypeIndex, &NamedType)> {
        self.inner.types.iter().enumerate().map(|(i, ty)| {
            #[allow(clippy::cast_possible_truncation)]
            (TypeIndex(i as u32), ty)
        })
    }

    /// Whether the type at `index` is one of the built-in scalars.
    #[must_use]
    pub fn is_builtin(&self, index: TypeIndex) -> bool {
        index.index() < BUILTIN_SCALARS.len()
    }

    /// Formats a type reference as written in SDL, e.g. `[Comment!]!`.
    #[must_use]
    pub fn display_type(&self, ty: &TypeRef) -> String {
        match ty {
            TypeRef::Named(index) => self.get(*index).name().to_string(),
            TypeRef::List(inner) => format!("[{}]", self.display_type(inner)),
            TypeRef::NonNull(inner) => format!("{}!", self.display_type(inner)),
        }
    }

    /// Prints the schema as SDL.
    #[must_use]
    pub fn sdl(&self) -> String {
        printer::print_schema(self)
    }
}

impl fmt::Debug for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Schema")
            .field("types", &self.inner.types.len())
            .field("query", &self.inner.query)
            .field("roots", &self.inner.roots)
            .finish_non_exhaustive()
    }
}
