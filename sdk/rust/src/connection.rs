//! Cursor-based pagination.
//!
//! A connection wraps a page of identifiable elements in edges carrying an
//! opaque cursor, plus a [`PageInfo`] describing the neighbouring pages.
//! Cursors are the standard base64 encoding of the element id, so `"1"`
//! becomes `"MQ=="`.

use crate::component::{BuildContext, Component};
use crate::error::ErrorCode;
use crate::field::{Argument, Field};
use crate::object::Type;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};
use std::marker::PhantomData;
use std::sync::Arc;
use thiserror::Error;
use weft_runtime::{ConstructionError, FieldError, GraphType};

/// An element with a stable identity within its collection.
pub trait Identifiable {
    fn id(&self) -> String;
}

/// Encodes the cursor of an element id.
#[must_use]
pub fn encode_cursor(id: &str) -> String {
    STANDARD.encode(id)
}

/// Decodes a cursor back into an element id.
///
/// # Errors
///
/// Returns [`ConnectionError::InvalidCursor`] if the cursor is not valid
/// base64 of a UTF-8 id.
pub fn decode_cursor(cursor: &str) -> Result<String, ConnectionError> {
    STANDARD
        .decode(cursor)
        .ok()
        .and_then(|bytes| String::from_utf8(bytes).ok())
        .ok_or_else(|| ConnectionError::InvalidCursor(cursor.to_string()))
}

/// Errors raised while slicing a connection.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConnectionError {
    #[error("`first` must be non-negative, got {0}")]
    NegativeFirst(i32),

    #[error("`last` must be non-negative, got {0}")]
    NegativeLast(i32),

    #[error("invalid cursor `{0}`")]
    InvalidCursor(String),
}

impl From<ConnectionError> for FieldError {
    fn from(error: ConnectionError) -> Self {
        ErrorCode::BadUserInput.error(error.to_string())
    }
}

/// Access to the standard pagination arguments.
pub trait PaginationArguments {
    fn first(&self) -> Option<i32>;
    fn last(&self) -> Option<i32>;
    fn after(&self) -> Option<&str>;
    fn before(&self) -> Option<&str>;
}

/// Arguments for paging in both directions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionArguments {
    pub first: Option<i32>,
    pub last: Option<i32>,
    pub after: Option<String>,
    pub before: Option<String>,
}

impl ConnectionArguments {
    /// The argument declarations matching this type.
    #[must_use]
    pub fn arguments() -> Vec<Argument> {
        vec![
            Argument::new::<Option<i32>>("first"),
            Argument::new::<Option<String>>("after"),
            Argument::new::<Option<i32>>("last"),
            Argument::new::<Option<String>>("before"),
        ]
    }
}

impl PaginationArguments for ConnectionArguments {
    fn first(&self) -> Option<i32> {
        self.first
    }

    fn last(&self) -> Option<i32> {
        self.last
    }

    fn after(&self) -> Option<&str> {
        self.after.as_deref()
    }

    fn before(&self) -> Option<&str> {
        self.before.as_deref()
    }
}

/// Arguments for paging forward only.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForwardArguments {
    pub first: Option<i32>,
    pub after: Option<String>,
}

impl ForwardArguments {
    #[must_use]
    pub fn arguments() -> Vec<Argument> {
        vec![
            Argument::new::<Option<i32>>("first"),
            Argument::new::<Option<String>>("after"),
        ]
    }
}

impl PaginationArguments for ForwardArguments {
    fn first(&self) -> Option<i32> {
        self.first
    }

    fn last(&self) -> Option<i32> {
        None
    }

    fn after(&self) -> Option<&str> {
        self.after.as_deref()
    }

    fn before(&self) -> Option<&str> {
        None
    }
}

/// Information about the current page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageInfo {
    pub has_previous_page: bool,
    pub has_next_page: bool,
    pub start_cursor: Option<String>,
    pub end_cursor: Option<String>,
}

impl GraphType for PageInfo {}

/// An element and its cursor.
#[derive(Debug)]
pub struct Edge<N> {
    pub cursor: String,
    pub node: Arc<N>,
}

impl<N: GraphType> GraphType for Edge<N> {
    fn type_name() -> String {
        format!("{}Edge", N::type_name())
    }
}

/// One page of elements.
#[derive(Debug)]
pub struct Connection<N> {
    pub edges: Vec<Arc<Edge<N>>>,
    pub page_info: PageInfo,
}

impl<N: GraphType> GraphType for Connection<N> {
    fn type_name() -> String {
        format!("{}Connection", N::type_name())
    }
}

/// Slices `elements` into a connection page.
///
/// `after` and `before` narrow the range to the elements strictly between
/// the two cursors; a cursor that matches no element leaves that side of
/// the range open. `first` then keeps the leading elements and `last` the
/// trailing ones.
///
/// # Errors
///
/// Returns [`ConnectionError`] for a negative count or a cursor that cannot
/// be decoded.
pub fn connection_from<N, A>(
    elements: impl IntoIterator<Item = N>,
    args: &A,
) -> Result<Connection<N>, ConnectionError>
where
    N: Identifiable,
    A: PaginationArguments + ?Sized,
{
    let first = match args.first() {
        Some(first) if first < 0 => return Err(ConnectionError::NegativeFirst(first)),
        first => first.map(count),
    };
    let last = match args.last() {
        Some(last) if last < 0 => return Err(ConnectionError::NegativeLast(last)),
        last => last.map(count),
    };
    let after = args.after().map(decode_cursor).transpose()?;
    let before = args.before().map(decode_cursor).transpose()?;

    let elements: Vec<(String, N)> = elements
        .into_iter()
        .map(|element| (element.id(), element))
        .collect();

    let mut start = 0;
    let mut end = elements.len();
    if let Some(after) = after {
        if let Some(position) = elements.iter().position(|(id, _)| *id == after) {
            start = position + 1;
        }
    }
    if let Some(before) = before {
        if let Some(position) = elements.iter().position(|(id, _)| *id == before) {
            end = position.max(start);
        }
    }

    let mut page_info = PageInfo::default();
    if let Some(first) = first {
        if end - start > first {
            end = start + first;
            page_info.has_next_page = true;
        }
    }
    if let Some(last) = last {
        if end - start > last {
            start = end - last;
            page_info.has_previous_page = true;
        }
    }

    let edges: Vec<Arc<Edge<N>>> = elements
        .into_iter()
        .skip(start)
        .take(end - start)
        .map(|(id, node)| {
            Arc::new(Edge {
                cursor: encode_cursor(&id),
                node: Arc::new(node),
            })
        })
        .collect();

    page_info.start_cursor = edges.first().map(|edge| edge.cursor.clone());
    page_info.end_cursor = edges.last().map(|edge| edge.cursor.clone());
    Ok(Connection { edges, page_info })
}

#[allow(clippy::cast_sign_loss)]
fn count(value: i32) -> usize {
    value as usize
}

/// Declares `PageInfo`, `<N>Edge` and `<N>Connection`.
///
/// `PageInfo` is shared by every connection and only registered by the
/// first one. `N` itself is declared separately.
pub struct ConnectionType<N, Ctx = ()> {
    _marker: PhantomData<fn(&N, &Ctx)>,
}

impl<N, Ctx> Default for ConnectionType<N, Ctx>
where
    N: GraphType,
    Ctx: Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<N, Ctx> ConnectionType<N, Ctx>
where
    N: GraphType,
    Ctx: Send + Sync + 'static,
{
    #[must_use]
    pub fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }
}

impl<N, Ctx> Component for ConnectionType<N, Ctx>
where
    N: GraphType,
    Ctx: Send + Sync + 'static,
{
    fn kind(&self) -> &'static str {
        "connection"
    }

    fn name(&self) -> String {
        Connection::<N>::type_name()
    }

    fn apply(self: Box<Self>, cx: &mut BuildContext) -> Result<(), ConstructionError> {
        if cx.registry().index_of::<PageInfo>().is_none() {
            let page_info = Type::<PageInfo, Ctx>::new()
                .description("Information about pagination in a connection.")
                .field(Field::new("hasNextPage", |info: &PageInfo| info.has_next_page))
                .field(Field::new("hasPreviousPage", |info: &PageInfo| {
                    info.has_previous_page
                }))
                .field(Field::new("startCursor", |info: &PageInfo| {
                    info.start_cursor.clone()
                }))
                .field(Field::new("endCursor", |info: &PageInfo| {
                    info.end_cursor.clone()
                }));
            Box::new(page_info).apply(cx)?;
        }

        let edge = Type::<Edge<N>, Ctx>::new()
            .description("An edge in a connection.")
            .field(Field::new("cursor", |edge: &Edge<N>| edge.cursor.clone()))
            .field(Field::new("node", |edge: &Edge<N>| Arc::clone(&edge.node)));
        Box::new(edge).apply(cx)?;

        let connection = Type::<Connection<N>, Ctx>::new()
            .description(format!("A page of {}.", N::type_name()))
            .field(Field::new("edges", |page: &Connection<N>| page.edges.clone()))
            .field(Field::new("pageInfo", |page: &Connection<N>| {
                page.page_info.clone()
            }));
        Box::new(connection).apply(cx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use weft_core::{decode, Map};

    #[derive(Debug)]
    struct Item(u32);

    impl Identifiable for Item {
        fn id(&self) -> String {
            self.0.to_string()
        }
    }

    fn items() -> Vec<Item> {
        (1..=5).map(Item).collect()
    }

    fn ids(connection: &Connection<Item>) -> Vec<u32> {
        connection.edges.iter().map(|edge| edge.node.0).collect()
    }

    fn args(first: Option<i32>, after: Option<&str>, last: Option<i32>, before: Option<&str>) -> ConnectionArguments {
        ConnectionArguments {
            first,
            last,
            after: after.map(encode_cursor),
            before: before.map(encode_cursor),
        }
    }

    #[test]
    fn test_cursor_is_base64_of_id() {
        assert_eq!(encode_cursor("1"), "MQ==");
        assert_eq!(decode_cursor("Mw==").unwrap(), "3");
        assert_eq!(
            decode_cursor("not base64!"),
            Err(ConnectionError::InvalidCursor("not base64!".into()))
        );
    }

    #[test]
    fn test_whole_collection() {
        let page = connection_from(items(), &ConnectionArguments::default()).unwrap();
        assert_eq!(ids(&page), [1, 2, 3, 4, 5]);
        assert_eq!(
            page.page_info,
            PageInfo {
                has_previous_page: false,
                has_next_page: false,
                start_cursor: Some(encode_cursor("1")),
                end_cursor: Some(encode_cursor("5")),
            }
        );
    }

    #[test]
    fn test_first_after() {
        let page = connection_from(items(), &args(Some(2), Some("2"), None, None)).unwrap();
        assert_eq!(ids(&page), [3, 4]);
        assert!(page.page_info.has_next_page);
        assert!(!page.page_info.has_previous_page);
    }

    #[test]
    fn test_last_before() {
        let page = connection_from(items(), &args(None, None, Some(2), Some("5"))).unwrap();
        assert_eq!(ids(&page), [3, 4]);
        assert!(page.page_info.has_previous_page);
        assert!(!page.page_info.has_next_page);
    }

    #[test]
    fn test_unknown_cursor_leaves_range_open() {
        let page = connection_from(items(), &args(Some(1), Some("42"), None, None)).unwrap();
        assert_eq!(ids(&page), [1]);
    }

    #[test]
    fn test_empty_page() {
        let page = connection_from(items(), &args(Some(0), None, None, None)).unwrap();
        assert!(page.edges.is_empty());
        assert_eq!(page.page_info.start_cursor, None);
        assert!(page.page_info.has_next_page);
    }

    #[test]
    fn test_negative_counts() {
        assert_eq!(
            connection_from(items(), &args(Some(-1), None, None, None)).unwrap_err(),
            ConnectionError::NegativeFirst(-1)
        );
        assert_eq!(
            connection_from(items(), &args(None, None, Some(-3), None)).unwrap_err(),
            ConnectionError::NegativeLast(-3)
        );
        let error = FieldError::from(ConnectionError::NegativeFirst(-1));
        assert_eq!(error.extensions["code"], Map::String("BAD_USER_INPUT".into()));
    }

    #[test]
    fn test_decode_arguments() {
        let mut raw = Map::object();
        raw.insert("first", 1);
        raw.insert("after", "MQ==");
        let decoded: ConnectionArguments = decode(raw).unwrap();
        assert_eq!(
            decoded,
            ConnectionArguments {
                first: Some(1),
                after: Some("MQ==".into()),
                ..ConnectionArguments::default()
            }
        );
    }

    #[test]
    fn test_forward_arguments_ignore_backward_paging() {
        let forward = ForwardArguments {
            first: Some(1),
            after: None,
        };
        let page = connection_from(items(), &forward).unwrap();
        assert_eq!(ids(&page), [1]);
        assert_eq!(ForwardArguments::arguments().len(), 2);
    }

    #[test]
    fn test_type_names() {
        struct Comment;
        impl GraphType for Comment {}
        assert_eq!(Edge::<Comment>::type_name(), "CommentEdge");
        assert_eq!(Connection::<Comment>::type_name(), "CommentConnection");
    }
}
