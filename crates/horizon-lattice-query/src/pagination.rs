//! Lazy iteration over connection fields.
//!
//! Iterating a connection walks the page already bound into its cursor and,
//! each time the page runs out while the server reports more, re-executes the
//! owning node narrowed to that connection alone. Siblings of the connection
//! are pruned for the request and restored right after it, whether or not it
//! succeeded, so the rest of the tree keeps its shape and bound values.
//!
//! ```ignore
//! let mut user = QueryNode::new("user");
//! user.add_argument("login", "torvalds");
//! user.add_child("name")?;
//! user.add_child(QueryNode::connection("repositories"))?
//!     .add_child("name")?;
//!
//! for name in endpoint.iterate(&mut user, "repositories", "name")? {
//!     println!("{name:?}");
//! }
//! ```
//!
//! A fetch that fails mid-iteration ends the sequence after the last item
//! that was yielded. The failure is logged on the pagination target and
//! handed to the hook set with [`ConnectionIter::on_fetch_error`]; it is never
//! returned through the iterator.

use serde_json::Value;

use crate::cursor::{CursorState, ListCursor};
use crate::error::{QueryError, Result};
use crate::executor::Endpoint;
use crate::logging::targets;
use crate::node::QueryNode;

/// Performs the narrowed re-query that loads the next page of one connection.
#[derive(Debug, Clone)]
pub struct PageFetcher<'t> {
    endpoint: Endpoint<'t>,
    field: String,
}

impl<'t> PageFetcher<'t> {
    /// Create a fetcher for the connection child named `field`.
    pub fn new(endpoint: Endpoint<'t>, field: impl Into<String>) -> Self {
        Self {
            endpoint,
            field: field.into(),
        }
    }

    /// Name of the connection this fetcher loads pages for.
    pub fn field(&self) -> &str {
        &self.field
    }

    /// The endpoint pages are fetched from.
    pub fn endpoint(&self) -> &Endpoint<'t> {
        &self.endpoint
    }

    /// Load the next page of the connection into `owner`.
    ///
    /// Continues from the cursor's end cursor when one is known, otherwise
    /// requests the first page.
    pub fn fetch(&self, owner: &mut QueryNode) -> Result<()> {
        let connection = owner
            .child_mut(&self.field)
            .filter(|child| child.is_connection())
            .ok_or_else(|| QueryError::UnknownConnection(self.field.clone()))?;

        let continuation = connection.cursor_mut().and_then(|cursor| {
            cursor.begin_fetch();
            let argument = cursor.shape().cursor_argument.clone();
            cursor.end_cursor().map(|end| (argument, end.to_owned()))
        });
        if let Some((argument, end_cursor)) = continuation {
            connection.add_argument(argument, end_cursor);
        }

        tracing::debug!(target: targets::PAGINATION, field = %self.field, "fetching page");
        owner.with_narrowed_view(&[self.field.as_str()], |narrowed| {
            self.endpoint.execute(narrowed).map(|_| ())
        })
    }
}

/// Lazy iterator over the raw items of a connection.
///
/// Yields `None` for `null` items so positions match the server's pages.
/// Not restartable without [`reset`](Self::reset).
pub struct ConnectionIter<'a, 't> {
    owner: &'a mut QueryNode,
    fetcher: PageFetcher<'t>,
    on_fetch_error: Option<Box<dyn FnMut(&QueryError) + 'a>>,
    fetches: usize,
}

impl<'a, 't> ConnectionIter<'a, 't> {
    /// Iterate the connection child `fetcher.field()` of `owner`.
    pub fn new(owner: &'a mut QueryNode, fetcher: PageFetcher<'t>) -> Result<Self> {
        if owner.child(fetcher.field()).is_none_or(|child| !child.is_connection()) {
            return Err(QueryError::UnknownConnection(fetcher.field().to_owned()));
        }
        Ok(Self {
            owner,
            fetcher,
            on_fetch_error: None,
            fetches: 0,
        })
    }

    /// Call `hook` with the error that ends iteration early.
    pub fn on_fetch_error(mut self, hook: impl FnMut(&QueryError) + 'a) -> Self {
        self.on_fetch_error = Some(Box::new(hook));
        self
    }

    /// Rewind to the start of the page currently held by the cursor.
    pub fn reset(&mut self) {
        if let Some(cursor) = self.cursor_mut() {
            cursor.reset();
        }
    }

    /// Number of page fetches performed by this iterator.
    pub fn fetch_count(&self) -> usize {
        self.fetches
    }

    /// The connection's cursor.
    pub fn cursor(&self) -> Option<&ListCursor> {
        self.owner.child(self.fetcher.field()).and_then(QueryNode::cursor)
    }

    fn cursor_mut(&mut self) -> Option<&mut ListCursor> {
        self.owner
            .child_mut(&self.fetcher.field)
            .and_then(QueryNode::cursor_mut)
    }

    fn fetch_page(&mut self) -> bool {
        self.fetches += 1;
        let Err(err) = self.fetcher.fetch(self.owner) else {
            return true;
        };

        tracing::warn!(
            target: targets::PAGINATION,
            field = %self.fetcher.field,
            error = %err,
            "page fetch failed, ending iteration"
        );
        if let Some(hook) = self.on_fetch_error.as_mut() {
            hook(&err);
        }
        if let Some(cursor) = self.cursor_mut() {
            cursor.terminate();
        }
        false
    }
}

impl Iterator for ConnectionIter<'_, '_> {
    type Item = Option<Value>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let cursor = self.cursor_mut()?;
            match cursor.state() {
                CursorState::HasCurrent => {
                    let item = cursor.current().cloned();
                    cursor.advance();
                    return Some(item);
                }
                CursorState::Fresh | CursorState::PageExhausted => {
                    if !self.fetch_page() {
                        return None;
                    }
                }
                CursorState::Fetching => {
                    cursor.terminate();
                    return None;
                }
                CursorState::Terminal => return None,
            }
        }
    }
}

impl std::fmt::Debug for ConnectionIter<'_, '_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionIter")
            .field("owner", &self.owner.name())
            .field("field", &self.fetcher.field)
            .field("fetches", &self.fetches)
            .finish()
    }
}

fn project(item: Option<&Value>, key: &str) -> Option<Value> {
    item.and_then(|item| item.get(key)).cloned()
}

/// Iterator over one attribute of each connection item.
#[derive(Debug)]
pub struct Values<'a, 't> {
    items: ConnectionIter<'a, 't>,
    key: String,
}

impl<'a, 't> Values<'a, 't> {
    /// Call `hook` with the error that ends iteration early.
    pub fn on_fetch_error(mut self, hook: impl FnMut(&QueryError) + 'a) -> Self {
        self.items = self.items.on_fetch_error(hook);
        self
    }

    /// Rewind to the start of the page currently held by the cursor.
    pub fn reset(&mut self) {
        self.items.reset();
    }

    /// Number of page fetches performed so far.
    pub fn fetch_count(&self) -> usize {
        self.items.fetch_count()
    }
}

impl Iterator for Values<'_, '_> {
    type Item = Option<Value>;

    fn next(&mut self) -> Option<Self::Item> {
        let item = self.items.next()?;
        Some(project(item.as_ref(), &self.key))
    }
}

/// Iterator over several attributes of each connection item, in the order
/// they were requested.
#[derive(Debug)]
pub struct Rows<'a, 't> {
    items: ConnectionIter<'a, 't>,
    keys: Vec<String>,
}

impl<'a, 't> Rows<'a, 't> {
    /// Call `hook` with the error that ends iteration early.
    pub fn on_fetch_error(mut self, hook: impl FnMut(&QueryError) + 'a) -> Self {
        self.items = self.items.on_fetch_error(hook);
        self
    }

    /// Rewind to the start of the page currently held by the cursor.
    pub fn reset(&mut self) {
        self.items.reset();
    }

    /// Number of page fetches performed so far.
    pub fn fetch_count(&self) -> usize {
        self.items.fetch_count()
    }
}

impl Iterator for Rows<'_, '_> {
    type Item = Vec<Option<Value>>;

    fn next(&mut self) -> Option<Self::Item> {
        let item = self.items.next()?;
        Some(
            self.keys
                .iter()
                .map(|key| project(item.as_ref(), key))
                .collect(),
        )
    }
}

impl<'t> Endpoint<'t> {
    /// Iterate the raw items of the connection child `field` of `owner`.
    pub fn connection<'a>(
        &self,
        owner: &'a mut QueryNode,
        field: &str,
    ) -> Result<ConnectionIter<'a, 't>> {
        ConnectionIter::new(owner, PageFetcher::new(self.clone(), field))
    }

    /// Iterate `value_key` of each item of the connection child `field`.
    ///
    /// A `null` item, or an item without `value_key`, yields `None`.
    pub fn iterate<'a>(
        &self,
        owner: &'a mut QueryNode,
        field: &str,
        value_key: &str,
    ) -> Result<Values<'a, 't>> {
        Ok(Values {
            items: self.connection(owner, field)?,
            key: value_key.to_owned(),
        })
    }

    /// Iterate `value_key` followed by `extra` attributes of each item.
    ///
    /// A `null` item yields a row of `None`s of the same width.
    pub fn iterate_rows<'a>(
        &self,
        owner: &'a mut QueryNode,
        field: &str,
        value_key: &str,
        extra: &[&str],
    ) -> Result<Rows<'a, 't>> {
        let keys = std::iter::once(value_key)
            .chain(extra.iter().copied())
            .map(str::to_owned)
            .collect();
        Ok(Rows {
            items: self.connection(owner, field)?,
            keys,
        })
    }
}
