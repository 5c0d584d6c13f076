//! Lazily fetched, memoized fields.
//!
//! [`LazyObject`] wraps an object node and fetches single fields on first
//! access. Each fetch narrows the object to exactly the requested field, so
//! the request stays small no matter how many fields were read before.
//! Later reads are served from the cache without a round trip.
//!
//! ```ignore
//! let mut user = QueryNode::new("user");
//! user.add_argument("login", "torvalds");
//! let mut user = LazyObject::new(user);
//!
//! let name: String = user.get_as(&endpoint, "name")?;   // one request
//! let again: String = user.get_as(&endpoint, "name")?;  // cached
//! ```

use std::collections::HashMap;

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::{QueryError, Result};
use crate::executor::Endpoint;
use crate::logging::targets;
use crate::node::QueryNode;

/// An object node whose fields are fetched one at a time on demand.
#[derive(Debug, Clone)]
pub struct LazyObject {
    node: QueryNode,
    values: HashMap<String, Value>,
}

impl LazyObject {
    /// Wrap `node`; its existing children are fetched lazily like any other.
    pub fn new(node: QueryNode) -> Self {
        Self {
            node,
            values: HashMap::new(),
        }
    }

    /// The wrapped node.
    pub fn node(&self) -> &QueryNode {
        &self.node
    }

    /// Unwrap the node.
    pub fn into_node(self) -> QueryNode {
        self.node
    }

    /// Whether `field` has been fetched and cached.
    pub fn is_cached(&self, field: &str) -> bool {
        self.values.contains_key(field)
    }

    /// Drop the cached value of `field`; the next access fetches it again.
    pub fn invalidate(&mut self, field: &str) -> Option<Value> {
        self.values.remove(field)
    }

    /// Get `field`, fetching it on first access.
    pub fn get(&mut self, endpoint: &Endpoint<'_>, field: &str) -> Result<&Value> {
        if !self.values.contains_key(field) {
            let value = self.fetch(endpoint, field)?;
            self.values.insert(field.to_owned(), value);
        }
        self.values
            .get(field)
            .ok_or_else(|| QueryError::missing_field(field, &Value::Null))
    }

    /// Get `field` deserialized as `T`, fetching it on first access.
    pub fn get_as<T: DeserializeOwned>(
        &mut self,
        endpoint: &Endpoint<'_>,
        field: &str,
    ) -> Result<T> {
        let value = self.get(endpoint, field)?.clone();
        Ok(serde_json::from_value(value)?)
    }

    fn fetch(&mut self, endpoint: &Endpoint<'_>, field: &str) -> Result<Value> {
        if self.node.child(field).is_none() {
            self.node.add_child(field)?;
        }
        tracing::debug!(
            target: targets::MEMO,
            object = self.node.name(),
            field,
            "fetching field"
        );

        self.node
            .with_narrowed_view(&[field], |narrowed| endpoint.execute(narrowed))?;
        Ok(self
            .node
            .child(field)
            .and_then(QueryNode::bound_value)
            .unwrap_or(Value::Null))
    }
}
