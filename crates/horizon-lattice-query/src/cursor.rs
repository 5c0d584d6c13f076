//! Pagination state for connection fields.
//!
//! A [`ListCursor`] is owned by a connection node and tracks the page most
//! recently bound into it. The cursor never performs I/O itself: when a page
//! runs out it reports [`CursorStep::FetchNeeded`] and the pagination driver
//! issues the narrowed re-query, whose binding lands back in the cursor via
//! [`ListCursor::bind_page`].

use serde_json::Value;

use crate::error::{QueryError, Result};

/// Default number of items requested per page.
pub const DEFAULT_PAGE_SIZE: u32 = 100;

/// Response and argument keys describing a paginated connection.
///
/// The default matches the Relay connection shape:
///
/// ```text
/// repositories(first:100, after:"...") {
///     nodes { ... }
///     pageInfo { hasNextPage endCursor }
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageShape {
    /// Key of the item list inside the connection object.
    pub nodes_key: String,
    /// Key of the page-info trailer inside the connection object.
    pub page_info_key: String,
    /// Key of the "more pages" flag inside the page-info trailer.
    pub has_next_key: String,
    /// Key of the continuation cursor inside the page-info trailer.
    pub end_cursor_key: String,
    /// Argument carrying the page size.
    pub page_size_argument: String,
    /// Argument carrying the continuation cursor.
    pub cursor_argument: String,
}

impl Default for PageShape {
    fn default() -> Self {
        Self {
            nodes_key: "nodes".into(),
            page_info_key: "pageInfo".into(),
            has_next_key: "hasNextPage".into(),
            end_cursor_key: "endCursor".into(),
            page_size_argument: "first".into(),
            cursor_argument: "after".into(),
        }
    }
}

/// Where a cursor stands in its pagination lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorState {
    /// No page has been bound yet.
    Fresh,
    /// The cursor points at an unread item of the current page.
    HasCurrent,
    /// The current page is consumed and the server reported more pages.
    PageExhausted,
    /// A narrowed re-query for the next page is in flight.
    Fetching,
    /// No current item and no further pages; no more fetches will be asked for.
    Terminal,
}

/// Outcome of [`ListCursor::advance`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorStep {
    /// Another item of the current page is available.
    Ready,
    /// The page is consumed; the driver must fetch the next one.
    FetchNeeded,
    /// Iteration is over.
    Exhausted,
}

/// Cursor over the pages of a connection field.
#[derive(Debug, Clone, PartialEq)]
pub struct ListCursor {
    shape: PageShape,
    items: Vec<Value>,
    position: usize,
    has_more_pages: bool,
    end_cursor: Option<String>,
    pages_loaded: usize,
    state: CursorState,
}

impl ListCursor {
    /// Create a fresh cursor for the given connection shape.
    pub fn new(shape: PageShape) -> Self {
        Self {
            shape,
            items: Vec::new(),
            position: 0,
            has_more_pages: false,
            end_cursor: None,
            pages_loaded: 0,
            state: CursorState::Fresh,
        }
    }

    /// The connection shape this cursor reads pages with.
    pub fn shape(&self) -> &PageShape {
        &self.shape
    }

    /// The most recently bound page.
    pub fn items(&self) -> &[Value] {
        &self.items
    }

    /// Index of the next unread item within [`items`](Self::items).
    pub fn position(&self) -> usize {
        self.position
    }

    /// Whether the server reported pages beyond the current one.
    pub fn has_more_pages(&self) -> bool {
        self.has_more_pages
    }

    /// Continuation cursor for the next page.
    pub fn end_cursor(&self) -> Option<&str> {
        self.end_cursor.as_deref()
    }

    /// Number of pages bound since the cursor was created.
    pub fn pages_loaded(&self) -> usize {
        self.pages_loaded
    }

    /// Current lifecycle state.
    pub fn state(&self) -> CursorState {
        self.state
    }

    /// Whether the cursor points at an unread item of the current page.
    ///
    /// This is a pure predicate; it never triggers a fetch.
    pub fn has_current(&self) -> bool {
        self.position < self.items.len()
    }

    /// The item under the cursor.
    ///
    /// Returns `None` when there is no current item or when the page itself
    /// holds `null` at this position.
    pub fn current(&self) -> Option<&Value> {
        self.items.get(self.position).filter(|item| !item.is_null())
    }

    /// Rewind to the start of whatever page is currently held.
    pub fn reset(&mut self) {
        self.position = 0;
        self.state = if self.pages_loaded == 0 {
            CursorState::Fresh
        } else if self.has_current() {
            CursorState::HasCurrent
        } else {
            CursorState::Terminal
        };
    }

    /// Move past the current item.
    pub fn advance(&mut self) -> CursorStep {
        match self.state {
            CursorState::HasCurrent => {
                self.position += 1;
                if self.has_current() {
                    CursorStep::Ready
                } else if self.has_more_pages {
                    self.state = CursorState::PageExhausted;
                    CursorStep::FetchNeeded
                } else {
                    self.state = CursorState::Terminal;
                    CursorStep::Exhausted
                }
            }
            CursorState::Fresh | CursorState::PageExhausted | CursorState::Fetching => {
                CursorStep::FetchNeeded
            }
            CursorState::Terminal => CursorStep::Exhausted,
        }
    }

    /// Mark a page fetch as in flight.
    pub fn begin_fetch(&mut self) {
        if self.state != CursorState::Terminal {
            self.state = CursorState::Fetching;
        }
    }

    /// Enter the terminal state; no further fetches will be requested.
    pub fn terminate(&mut self) {
        self.position = self.items.len();
        self.state = CursorState::Terminal;
    }

    /// Install a freshly fetched page and rewind to its first item.
    ///
    /// An empty page ends pagination even when it claims more pages, and
    /// "more pages" without a continuation cursor is treated as the last page.
    pub fn load_page(
        &mut self,
        items: Vec<Value>,
        has_more_pages: bool,
        end_cursor: Option<String>,
    ) {
        if has_more_pages && (items.is_empty() || end_cursor.is_none()) {
            tracing::debug!(
                target: crate::logging::targets::PAGINATION,
                items = items.len(),
                "page reports more pages but cannot be continued, treating as last page"
            );
        }
        self.has_more_pages = has_more_pages && !items.is_empty() && end_cursor.is_some();
        self.items = items;
        self.end_cursor = end_cursor;
        self.position = 0;
        self.pages_loaded += 1;
        self.state = if self.has_current() {
            CursorState::HasCurrent
        } else {
            CursorState::Terminal
        };
    }

    /// Bind a connection object from a response into this cursor.
    ///
    /// A `null` connection binds as an empty last page.
    pub fn bind_page(&mut self, page: &Value) -> Result<()> {
        if page.is_null() {
            self.load_page(Vec::new(), false, None);
            return Ok(());
        }

        let items = match page.get(&self.shape.nodes_key) {
            Some(Value::Array(items)) => items.clone(),
            Some(Value::Null) => Vec::new(),
            _ => return Err(QueryError::missing_field(&self.shape.nodes_key, page)),
        };
        let page_info = page
            .get(&self.shape.page_info_key)
            .ok_or_else(|| QueryError::missing_field(&self.shape.page_info_key, page))?;
        let has_more = page_info
            .get(&self.shape.has_next_key)
            .and_then(Value::as_bool)
            .ok_or_else(|| QueryError::missing_field(&self.shape.has_next_key, page_info))?;
        let end_cursor = page_info
            .get(&self.shape.end_cursor_key)
            .and_then(Value::as_str)
            .map(str::to_owned);

        self.load_page(items, has_more, end_cursor);
        Ok(())
    }
}

impl Default for ListCursor {
    fn default() -> Self {
        Self::new(PageShape::default())
    }
}
