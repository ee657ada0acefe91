//! Cursor-based pagination types for GraphQL
//!
//! Implements Relay-style connections over an offset-addressable source.
//! `after` is the number of items already seen and an item's cursor is its
//! 1-based position in the full ordering, so `after: <last cursor>` resumes
//! right after the last item seen and `after: (page - 1) * first` jumps
//! straight to a page.
//!
//! Offset cursors drift when rows are inserted or removed ahead of the
//! current window between two calls. That is a known limitation of the
//! scheme and is kept so that client-visible semantics stay stable.
//!
//! Usage: Use the `define_connection!` macro to create type-specific connections.

use async_graphql::SimpleObject;
use async_trait::async_trait;

use crate::error::{ExplorerError, Result};

/// Information about pagination in a connection
#[derive(SimpleObject, Debug, Clone, Default, PartialEq, Eq)]
pub struct PageInfo {
    /// When paginating forwards, are there more items?
    pub has_next_page: bool,
    /// When paginating backwards, are there more items?
    pub has_previous_page: bool,
    /// Cursor of the first item in this page
    pub start_cursor: Option<String>,
    /// Cursor of the last item in this page
    pub end_cursor: Option<String>,
    /// Total count of items matching the query
    pub total_count: i64,
}

/// An edge in a connection, containing a node and cursor (internal use)
#[derive(Debug, Clone)]
pub struct Edge<T> {
    /// The item at the end of the edge
    pub node: T,
    /// A cursor for pagination
    pub cursor: String,
}

/// A paginated connection result (internal use)
#[derive(Debug, Clone)]
pub struct Connection<T> {
    /// The edges in this connection
    pub edges: Vec<Edge<T>>,
    /// Pagination information
    pub page_info: PageInfo,
}

/// Macro to define a GraphQL connection type for a specific entity
///
/// Usage:
/// ```ignore
/// define_connection!(ProposalConnection, ProposalEdge, Proposal);
/// ```
#[macro_export]
macro_rules! define_connection {
    ($conn_name:ident, $edge_name:ident, $node_type:ty) => {
        /// Edge containing a node and cursor
        #[derive(async_graphql::SimpleObject, Debug, Clone)]
        pub struct $edge_name {
            /// The item at the end of the edge
            pub node: $node_type,
            /// A cursor for pagination
            pub cursor: String,
        }

        /// Connection containing edges and page info
        #[derive(async_graphql::SimpleObject, Debug, Clone)]
        pub struct $conn_name {
            /// The edges in this connection
            pub edges: Vec<$edge_name>,
            /// Pagination information
            pub page_info: $crate::graphql::pagination::PageInfo,
            /// Total count of items matching the query
            pub total_count: i64,
        }

        impl $conn_name {
            /// Create from a generic Connection
            pub fn from_connection(
                conn: $crate::graphql::pagination::Connection<$node_type>,
            ) -> Self {
                Self {
                    total_count: conn.page_info.total_count,
                    edges: conn
                        .edges
                        .into_iter()
                        .map(|e| $edge_name {
                            node: e.node,
                            cursor: e.cursor,
                        })
                        .collect(),
                    page_info: conn.page_info,
                }
            }
        }
    };
}

/// Page size bounds, taken from configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageLimits {
    pub default_size: i32,
    pub max_size: i32,
}

impl Default for PageLimits {
    fn default() -> Self {
        Self {
            default_size: 25,
            max_size: 100,
        }
    }
}

/// Validated pagination request: `first` items after `after` already-seen items
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    first: i64,
    after: i64,
}

impl PageRequest {
    /// Validate raw arguments. `first` must be within `1..=max_size`.
    pub fn new(first: i32, after: i64, limits: PageLimits) -> Result<Self> {
        if first <= 0 {
            return Err(ExplorerError::invalid_argument(
                "first",
                format!("must be a positive integer, got {}", first),
            ));
        }
        if first > limits.max_size {
            return Err(ExplorerError::invalid_argument(
                "first",
                format!("must not exceed {}, got {}", limits.max_size, first),
            ));
        }
        if after < 0 {
            return Err(ExplorerError::invalid_argument(
                "after",
                format!("must not be negative, got {}", after),
            ));
        }
        Ok(Self {
            first: first as i64,
            after,
        })
    }

    /// Apply defaults to the raw GraphQL arguments and validate them
    pub fn from_args(first: Option<i32>, after: Option<i32>, limits: PageLimits) -> Result<Self> {
        Self::new(
            first.unwrap_or(limits.default_size),
            after.map(i64::from).unwrap_or(0),
            limits,
        )
    }

    /// Maximum number of items in the page (the fetch limit)
    pub fn first(&self) -> i64 {
        self.first
    }

    /// Number of items before the page (the fetch offset)
    pub fn after(&self) -> i64 {
        self.after
    }
}

/// One ordered window of a result set plus the size of the whole set
#[derive(Debug, Clone)]
pub struct Window<T> {
    pub items: Vec<T>,
    pub total_count: i64,
}

/// Ordered range fetch supplied per list query.
#[async_trait]
pub trait RangedFetch: Send + Sync {
    type Item: Send;
    type Filter: Send + Sync;

    /// Label used in log lines and error messages
    fn name(&self) -> &str;

    async fn fetch_range(
        &self,
        filter: &Self::Filter,
        offset: i64,
        limit: i64,
    ) -> anyhow::Result<Window<Self::Item>>;
}

impl<T> Connection<T> {
    /// Fetch one page from `source` and stamp cursors on it
    pub async fn page<S>(source: &S, filter: &S::Filter, request: PageRequest) -> Result<Self>
    where
        S: RangedFetch<Item = T> + ?Sized,
    {
        let window = source
            .fetch_range(filter, request.after(), request.first())
            .await
            .map_err(|e| {
                tracing::error!(source = source.name(), error = %e, "Range fetch failed");
                ExplorerError::batch_fetch(source.name(), e)
            })?;
        Ok(Self::from_window(window, request))
    }

    /// Build a page from a window fetched at `request.after()`.
    ///
    /// The item at index `i` gets cursor position `after + i + 1`.
    pub fn from_window(window: Window<T>, request: PageRequest) -> Self {
        let Window {
            mut items,
            total_count,
        } = window;
        items.truncate(request.first() as usize);

        let after = request.after();
        let has_next_page = after + (items.len() as i64) < total_count;
        let has_previous_page = after > 0;

        let edges: Vec<Edge<T>> = items
            .into_iter()
            .enumerate()
            .map(|(i, node)| Edge {
                cursor: cursor_at(after + i as i64 + 1),
                node,
            })
            .collect();

        let page_info = PageInfo {
            has_next_page,
            has_previous_page,
            start_cursor: edges.first().map(|e| e.cursor.clone()),
            end_cursor: edges.last().map(|e| e.cursor.clone()),
            total_count,
        };

        Self { edges, page_info }
    }
}

/// Cursor of the item at a 1-based position; it is also the `after` value
/// that resumes right behind that item
pub fn cursor_at(position: i64) -> String {
    position.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use pretty_assertions::assert_eq;

    /// 1..=n in order, windowed like a SQL LIMIT/OFFSET
    struct Numbers(i64);

    #[async_trait]
    impl RangedFetch for Numbers {
        type Item = i64;
        type Filter = ();

        fn name(&self) -> &str {
            "numbers"
        }

        async fn fetch_range(
            &self,
            _: &(),
            offset: i64,
            limit: i64,
        ) -> anyhow::Result<Window<i64>> {
            Ok(Window {
                items: (offset + 1..=self.0).take(limit as usize).collect(),
                total_count: self.0,
            })
        }
    }

    struct Broken;

    #[async_trait]
    impl RangedFetch for Broken {
        type Item = i64;
        type Filter = ();

        fn name(&self) -> &str {
            "broken"
        }

        async fn fetch_range(&self, _: &(), _: i64, _: i64) -> anyhow::Result<Window<i64>> {
            anyhow::bail!("relation does not exist")
        }
    }

    fn request(first: i32, after: i64) -> PageRequest {
        PageRequest::new(first, after, PageLimits::default()).unwrap()
    }

    fn items(page: &Connection<i64>) -> Vec<i64> {
        page.edges.iter().map(|e| e.node).collect()
    }

    #[tokio::test]
    async fn test_first_page_of_hundred() {
        let page = Connection::page(&Numbers(100), &(), request(10, 0)).await.unwrap();
        assert_eq!(items(&page), (1..=10).collect::<Vec<_>>());
        assert!(page.page_info.has_next_page);
        assert!(!page.page_info.has_previous_page);
        assert_eq!(page.page_info.total_count, 100);
        assert_eq!(page.page_info.start_cursor.as_deref(), Some("1"));
        assert_eq!(page.page_info.end_cursor.as_deref(), Some("10"));
    }

    #[tokio::test]
    async fn test_resuming_after_end_cursor_has_no_gap_or_overlap() {
        let first = Connection::page(&Numbers(100), &(), request(10, 0)).await.unwrap();
        let end_cursor: i32 = first.page_info.end_cursor.unwrap().parse().unwrap();

        let next_request =
            PageRequest::from_args(Some(10), Some(end_cursor), PageLimits::default()).unwrap();
        let second = Connection::page(&Numbers(100), &(), next_request).await.unwrap();

        assert_eq!(items(&second), (11..=20).collect::<Vec<_>>());
        assert!(second.page_info.has_previous_page);
        assert!(second.page_info.has_next_page);
    }

    #[tokio::test]
    async fn test_integer_after_jumps_to_page() {
        let request = PageRequest::from_args(Some(10), Some(10), PageLimits::default()).unwrap();
        assert_eq!(request.after(), 10);

        let page = Connection::page(&Numbers(100), &(), request).await.unwrap();
        assert_eq!(page.edges[0].node, 11);
        assert_eq!(page.edges[0].cursor, "11");
        assert_eq!(page.page_info.end_cursor.as_deref(), Some("20"));
    }

    #[tokio::test]
    async fn test_short_last_page() {
        let page = Connection::page(&Numbers(100), &(), request(10, 95)).await.unwrap();
        assert_eq!(page.edges.len(), 5);
        assert!(!page.page_info.has_next_page);
        assert!(page.page_info.has_previous_page);
        assert_eq!(page.edges[0].cursor, cursor_at(96));
    }

    #[tokio::test]
    async fn test_past_the_end_is_empty_not_error() {
        let page = Connection::page(&Numbers(5), &(), request(10, 50)).await.unwrap();
        assert!(page.edges.is_empty());
        assert_eq!(page.page_info.start_cursor, None);
        assert!(!page.page_info.has_next_page);
    }

    #[tokio::test]
    async fn test_range_failure_is_batch_fetch_error() {
        let result = Connection::page(&Broken, &(), request(10, 0)).await;
        assert_matches!(result, Err(ExplorerError::BatchFetch { entity_type, .. }) if entity_type == "broken");
    }

    #[test]
    fn test_non_positive_first_is_rejected() {
        for first in [0, -1, -100] {
            assert_matches!(
                PageRequest::new(first, 0, PageLimits::default()),
                Err(ExplorerError::InvalidArgument { argument: "first", .. })
            );
        }
    }

    #[test]
    fn test_first_above_maximum_is_rejected() {
        assert_matches!(
            PageRequest::new(101, 0, PageLimits::default()),
            Err(ExplorerError::InvalidArgument { argument: "first", .. })
        );
        assert!(PageRequest::new(100, 0, PageLimits::default()).is_ok());
    }

    #[test]
    fn test_negative_after_is_rejected() {
        assert_matches!(
            PageRequest::from_args(Some(10), Some(-3), PageLimits::default()),
            Err(ExplorerError::InvalidArgument { argument: "after", .. })
        );
    }

    #[test]
    fn test_default_page_size() {
        let request = PageRequest::from_args(None, None, PageLimits::default()).unwrap();
        assert_eq!(request.first(), 25);
        assert_eq!(request.after(), 0);
    }

    #[test]
    fn test_from_window_truncates_oversized_window() {
        let window = Window {
            items: (1..=30).collect::<Vec<i64>>(),
            total_count: 30,
        };
        let page = Connection::from_window(window, request(10, 0));
        assert_eq!(page.edges.len(), 10);
        assert!(page.page_info.has_next_page);
    }
}
