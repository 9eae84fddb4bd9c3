//! The asynchronous field-result contract.
//!
//! Every resolver, whatever its calling convention, is adapted once into a
//! [`ResolveFn`] returning a [`FieldFuture`]. The execution engine only ever
//! sees that shape:
//! - [`ready`]: a value computed synchronously on the calling task
//! - [`suspend`]: a future awaited on the calling task
//! - [`join`]: a [`Deferred`] handle spawned through a [`Spawner`], joined
//!   back onto the calling task

use crate::error::{FieldError, FieldResult, PathSegment};
use crate::graph_type::GraphType;
use indexmap::IndexMap;
use std::any::Any;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use thiserror::Error;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use weft_core::Map;
use weft_syntax::Value;

/// A type-erased host value flowing between resolvers.
#[derive(Clone)]
pub struct OpaqueValue {
    value: Arc<dyn Any + Send + Sync>,
    type_name: &'static str,
}

/// A failed projection of an [`OpaqueValue`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("expected {expected} but got {found}")]
pub struct TypeMismatch {
    pub expected: &'static str,
    pub found: &'static str,
}

impl OpaqueValue {
    /// Creates a new opaque value.
    pub fn new<T: Any + Send + Sync>(value: T) -> Self {
        Self {
            value: Arc::new(value),
            type_name: std::any::type_name::<T>(),
        }
    }

    /// Wraps an already shared value without copying it.
    pub fn from_arc<T: Any + Send + Sync>(value: Arc<T>) -> Self {
        Self {
            value,
            type_name: std::any::type_name::<T>(),
        }
    }

    /// An opaque unit, for roots and contexts that carry nothing.
    #[must_use]
    pub fn unit() -> Self {
        Self::new(())
    }

    /// The Rust type name of the wrapped value.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    #[must_use]
    pub fn is<T: Any>(&self) -> bool {
        self.value.is::<T>()
    }

    #[must_use]
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.value.downcast_ref::<T>()
    }

    /// Projects the value to a shared `T`.
    ///
    /// # Errors
    ///
    /// Returns [`TypeMismatch`] if the value is not a `T`.
    pub fn downcast<T: Any + Send + Sync>(&self) -> Result<Arc<T>, TypeMismatch> {
        Arc::clone(&self.value)
            .downcast::<T>()
            .map_err(|_| TypeMismatch {
                expected: std::any::type_name::<T>(),
                found: self.type_name,
            })
    }
}

impl fmt::Debug for OpaqueValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("OpaqueValue").field(&self.type_name).finish()
    }
}

/// The outcome of a resolver before completion.
#[derive(Debug, Clone)]
pub enum Resolved {
    Null,
    Value(OpaqueValue),
    List(Vec<Resolved>),
}

impl Resolved {
    /// Wraps a host value.
    pub fn value<T: Any + Send + Sync>(value: T) -> Self {
        Self::Value(OpaqueValue::new(value))
    }

    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }
}

/// Future type every bound field returns.
pub type FieldFuture = Pin<Box<dyn Future<Output = FieldResult<Resolved>> + Send>>;

/// Information about the field being resolved.
#[derive(Debug, Clone)]
pub struct ResolveInfo {
    /// The field name being resolved.
    pub field_name: String,
    /// The parent type name.
    pub parent_type: String,
    /// The return type, as written in SDL.
    pub return_type: String,
    /// Path to this field.
    pub path: Vec<PathSegment>,
}

/// The weak resolve signature invoked by the execution engine.
pub type ResolveFn =
    Arc<dyn Fn(OpaqueValue, Map, OpaqueValue, Spawner, ResolveInfo) -> FieldFuture + Send + Sync>;

/// Serializes a resolved leaf value.
pub type SerializeFn = Arc<dyn Fn(&OpaqueValue) -> FieldResult<Map> + Send + Sync>;

/// Validates and normalizes an input value supplied through variables.
pub type ParseValueFn = Arc<dyn Fn(Map) -> FieldResult<Map> + Send + Sync>;

/// Validates and normalizes an input value written as a literal. Variables
/// nested in the literal are read from the coerced request variables.
pub type ParseLiteralFn =
    Arc<dyn Fn(&Value, &IndexMap<String, Map>) -> FieldResult<Map> + Send + Sync>;

/// Runtime type test used for interface and union dispatch.
pub type IsInstanceFn = Arc<dyn Fn(&OpaqueValue) -> bool + Send + Sync>;

/// The concurrency handle passed to every resolver.
///
/// Work spawned through it runs on the request's runtime; the returned
/// [`Deferred`] is joined back on the task that awaits it.
#[derive(Debug, Clone)]
pub struct Spawner {
    handle: Handle,
}

impl Spawner {
    /// Creates a spawner for the runtime the caller is running on.
    ///
    /// # Panics
    ///
    /// Panics when called outside of a tokio runtime.
    #[must_use]
    pub fn current() -> Self {
        Self {
            handle: Handle::current(),
        }
    }

    /// Creates a spawner for the runtime the caller is running on, if any.
    #[must_use]
    pub fn try_current() -> Option<Self> {
        Handle::try_current().ok().map(Self::from_handle)
    }

    /// Creates a spawner bound to a specific runtime.
    #[must_use]
    pub fn from_handle(handle: Handle) -> Self {
        Self { handle }
    }

    #[must_use]
    pub fn handle(&self) -> &Handle {
        &self.handle
    }

    /// Spawns a future and returns a handle to its result.
    pub fn spawn<F, T>(&self, future: F) -> Deferred<T>
    where
        F: Future<Output = FieldResult<T>> + Send + 'static,
        T: Send + 'static,
    {
        Deferred {
            handle: self.handle.spawn(future),
        }
    }

    /// Runs blocking work on the runtime's blocking pool.
    pub fn spawn_blocking<F, T>(&self, work: F) -> Deferred<T>
    where
        F: FnOnce() -> FieldResult<T> + Send + 'static,
        T: Send + 'static,
    {
        Deferred {
            handle: self.handle.spawn_blocking(work),
        }
    }
}

/// A handle to work running on a [`Spawner`].
///
/// Dropping the handle before the work finishes aborts the spawned task, so
/// work started for a request that is itself dropped does not outlive it.
/// Blocking work that has already started runs to completion.
#[derive(Debug)]
pub struct Deferred<T> {
    handle: JoinHandle<FieldResult<T>>,
}

impl<T> Deferred<T> {
    /// Waits for the spawned work, resuming on the awaiting task.
    ///
    /// # Errors
    ///
    /// Returns the work's own error, or a field error if the task was
    /// cancelled or panicked.
    pub async fn join(mut self) -> FieldResult<T> {
        match (&mut self.handle).await {
            Ok(result) => result,
            Err(e) if e.is_cancelled() => Err(FieldError::new("resolver task was cancelled")),
            Err(e) => Err(FieldError::new(format!("resolver task failed: {e}"))),
        }
    }
}

impl<T> Drop for Deferred<T> {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Adapts a synchronously computed result.
pub fn ready<T: GraphType>(result: FieldResult<T>) -> FieldFuture {
    Box::pin(std::future::ready(result.map(GraphType::into_resolved)))
}

/// Adapts a future awaited on the calling task.
pub fn suspend<T, F>(future: F) -> FieldFuture
where
    T: GraphType,
    F: Future<Output = FieldResult<T>> + Send + 'static,
{
    Box::pin(async move { future.await.map(GraphType::into_resolved) })
}

/// Adapts a deferred handle, joining it back onto the calling task.
pub fn join<T: GraphType>(deferred: Deferred<T>) -> FieldFuture {
    Box::pin(async move { deferred.join().await.map(GraphType::into_resolved) })
}

/// A field future that has already failed.
pub fn fail(error: impl Into<FieldError>) -> FieldFuture {
    Box::pin(std::future::ready(Err(error.into())))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    struct Comment {
        id: i32,
    }

    #[test]
    fn test_downcast() {
        let value = OpaqueValue::new(Comment { id: 1 });
        assert!(value.is::<Comment>());
        assert_eq!(value.downcast::<Comment>().unwrap().id, 1);

        let err = value.downcast::<String>().unwrap_err();
        assert_eq!(err.expected, std::any::type_name::<String>());
        assert!(err.found.ends_with("Comment"));
    }

    #[test]
    fn test_from_arc_shares_value() {
        let shared = Arc::new(Comment { id: 7 });
        let value = OpaqueValue::from_arc(Arc::clone(&shared));
        assert!(Arc::ptr_eq(&value.downcast::<Comment>().unwrap(), &shared));
    }

    #[tokio::test]
    async fn test_adapters_produce_same_shape() {
        let spawner = Spawner::current();

        let sync = ready(Ok(1_i32)).await.unwrap();
        let suspended = suspend(async { Ok(2_i32) }).await.unwrap();
        let deferred = join(spawner.spawn(async { Ok(3_i32) })).await.unwrap();

        for (resolved, expected) in [(sync, 1), (suspended, 2), (deferred, 3)] {
            let Resolved::Value(value) = resolved else {
                panic!("expected a value");
            };
            assert_eq!(*value.downcast::<i32>().unwrap(), expected);
        }
    }

    #[tokio::test]
    async fn test_deferred_propagates_errors() {
        let spawner = Spawner::current();
        let deferred = spawner.spawn::<_, i32>(async { Err(FieldError::new("nope")) });
        assert_eq!(deferred.join().await.unwrap_err().message, "nope");

        let blocking = spawner.spawn_blocking(|| Ok(String::from("done")));
        assert_eq!(blocking.join().await.unwrap(), "done");
    }

    #[tokio::test]
    async fn test_dropping_deferred_aborts_work() {
        use std::sync::atomic::{AtomicBool, Ordering};
        use std::time::Duration;

        let spawner = Spawner::current();
        let finished = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&finished);
        let field = join(spawner.spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            flag.store(true, Ordering::SeqCst);
            Ok(1_i32)
        }));
        drop(field);

        tokio::time::sleep(Duration::from_millis(60)).await;
        assert!(!finished.load(Ordering::SeqCst));
    }
}
