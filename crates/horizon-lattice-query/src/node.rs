//! The query tree.
//!
//! A [`QueryNode`] is both a fragment of GraphQL query text and the binding
//! target for the matching fragment of the JSON response. Building a tree,
//! serializing it and binding a response all walk the same structure:
//!
//! ```
//! use horizon_lattice_query::QueryNode;
//! use serde_json::json;
//!
//! let mut user = QueryNode::new("user");
//! user.add_argument("login", "torvalds");
//! user.add_child("id").unwrap();
//! user.add_child("email").unwrap();
//!
//! assert_eq!(user.serialize(), r#"user(login:"torvalds") { id email } "#);
//!
//! user.bind(&json!({"user": {"id": "MDQ6", "email": "torvalds@example.com"}}))
//!     .unwrap();
//! assert_eq!(user.child("id").unwrap().value(), Some(&json!("MDQ6")));
//! ```

use std::fmt;
use std::ops::{Deref, DerefMut};

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::cursor::{DEFAULT_PAGE_SIZE, ListCursor, PageShape};
use crate::error::{QueryError, Result};

/// Name of the operation wrapper node.
pub const ROOT_NAME: &str = "query";

/// Key of the data container in the transport envelope.
pub const DATA_KEY: &str = "data";

/// A pre-formatted argument literal.
///
/// Text is wrapped in double quotes without escaping, booleans become
/// `true`/`false`, numbers render as-is. Queries are client-authored, so
/// embedded quotes in text values are the caller's responsibility.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Argument(String);

impl Argument {
    /// Use `literal` verbatim, e.g. an enum value such as `STARGAZERS`.
    pub fn raw(literal: impl Into<String>) -> Self {
        Self(literal.into())
    }

    /// The literal as it appears in query text.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Argument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Argument {
    fn from(value: &str) -> Self {
        Self(format!("\"{value}\""))
    }
}

impl From<String> for Argument {
    fn from(value: String) -> Self {
        Self::from(value.as_str())
    }
}

impl From<&String> for Argument {
    fn from(value: &String) -> Self {
        Self::from(value.as_str())
    }
}

impl From<bool> for Argument {
    fn from(value: bool) -> Self {
        Self(value.to_string())
    }
}

macro_rules! numeric_argument {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for Argument {
                fn from(value: $ty) -> Self {
                    Self(value.to_string())
                }
            }
        )*
    };
}

numeric_argument!(i8, i16, i32, i64, u8, u16, u32, u64, usize, isize, f32, f64);

impl From<&Value> for Argument {
    fn from(value: &Value) -> Self {
        match value {
            Value::String(text) => Self::from(text.as_str()),
            Value::Bool(flag) => Self::from(*flag),
            other => Self(other.to_string()),
        }
    }
}

impl From<Value> for Argument {
    fn from(value: Value) -> Self {
        Self::from(&value)
    }
}

#[derive(Debug, Clone, PartialEq)]
enum NodeKind {
    Field,
    Root,
    Connection(ListCursor),
}

/// A node of the query tree.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryNode {
    name: String,
    bind_name: String,
    arguments: Vec<(String, Argument)>,
    children: Vec<QueryNode>,
    /// Children currently held by a [`NarrowedView`].
    pruned: usize,
    value: Option<Value>,
    kind: NodeKind,
}

impl QueryNode {
    /// Create a field node.
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            bind_name: name.clone(),
            name,
            arguments: Vec::new(),
            children: Vec::new(),
            pruned: 0,
            value: None,
            kind: NodeKind::Field,
        }
    }

    /// Create an operation root.
    ///
    /// The root serializes as `query { ... }` and binds against the
    /// transport envelope's `data` member.
    pub fn root() -> Self {
        Self {
            bind_name: DATA_KEY.to_owned(),
            kind: NodeKind::Root,
            ..Self::new(ROOT_NAME)
        }
    }

    /// Create a paginated connection field with the Relay page shape.
    pub fn connection(name: impl Into<String>) -> Self {
        Self::connection_with_shape(name, PageShape::default())
    }

    /// Create a paginated connection field with a custom page shape.
    pub fn connection_with_shape(name: impl Into<String>, shape: PageShape) -> Self {
        let page_size_argument = shape.page_size_argument.clone();
        let mut node = Self {
            kind: NodeKind::Connection(ListCursor::new(shape)),
            ..Self::new(name)
        };
        node.add_argument(page_size_argument, DEFAULT_PAGE_SIZE);
        node
    }

    /// Override the key this node is looked up by in its parent's response.
    pub fn with_bind_name(mut self, bind_name: impl Into<String>) -> Self {
        self.bind_name = bind_name.into();
        self
    }

    /// Set the number of items requested per page of a connection.
    pub fn with_page_size(mut self, size: u32) -> Self {
        let argument = self
            .cursor()
            .map(|cursor| cursor.shape().page_size_argument.clone());
        if let Some(argument) = argument {
            self.add_argument(argument, size);
        }
        self
    }

    /// Field name used in query text.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Key used to find this node's data in the parent's response fragment.
    pub fn bind_name(&self) -> &str {
        &self.bind_name
    }

    /// Arguments in insertion order.
    pub fn arguments(&self) -> impl Iterator<Item = (&str, &Argument)> {
        self.arguments.iter().map(|(name, value)| (name.as_str(), value))
    }

    /// Look up an argument by name.
    pub fn argument(&self, name: &str) -> Option<&Argument> {
        self.arguments
            .iter()
            .find(|(arg, _)| arg == name)
            .map(|(_, value)| value)
    }

    /// Children in serialization order.
    pub fn children(&self) -> &[QueryNode] {
        &self.children
    }

    /// The scalar bound into this leaf by the last successful bind.
    pub fn value(&self) -> Option<&Value> {
        self.value.as_ref()
    }

    /// Deserialize the bound scalar.
    pub fn value_as<T: DeserializeOwned>(&self) -> Result<T> {
        let value = self.value.clone().unwrap_or(Value::Null);
        Ok(serde_json::from_value(value)?)
    }

    /// Whether this node binds a scalar.
    ///
    /// Children removed by a live [`NarrowedView`] still count, so a node
    /// narrowed down to nothing stays an object.
    pub fn is_leaf(&self) -> bool {
        self.binds_scalar() && !self.is_connection()
    }

    fn binds_scalar(&self) -> bool {
        self.children.is_empty() && self.pruned == 0
    }

    /// Whether this node is an operation root.
    pub fn is_root(&self) -> bool {
        matches!(self.kind, NodeKind::Root)
    }

    /// Whether this node is a paginated connection.
    pub fn is_connection(&self) -> bool {
        matches!(self.kind, NodeKind::Connection(_))
    }

    /// Pagination state of a connection node.
    pub fn cursor(&self) -> Option<&ListCursor> {
        match &self.kind {
            NodeKind::Connection(cursor) => Some(cursor),
            _ => None,
        }
    }

    /// Mutable pagination state of a connection node.
    pub fn cursor_mut(&mut self) -> Option<&mut ListCursor> {
        match &mut self.kind {
            NodeKind::Connection(cursor) => Some(cursor),
            _ => None,
        }
    }

    /// Add an argument, formatting the value as a literal.
    ///
    /// Re-adding an existing argument replaces its value in place.
    pub fn add_argument(
        &mut self,
        name: impl Into<String>,
        value: impl Into<Argument>,
    ) -> &mut Self {
        let name = name.into();
        let value = value.into();
        match self.arguments.iter_mut().find(|(arg, _)| *arg == name) {
            Some((_, slot)) => *slot = value,
            None => self.arguments.push((name, value)),
        }
        self
    }

    /// Append a child and return it for further configuration.
    ///
    /// Fails with [`QueryError::InvalidChildType`] when this node is a leaf
    /// that already holds a bound value.
    pub fn add_child(&mut self, child: impl Into<QueryNode>) -> Result<&mut QueryNode> {
        let child = child.into();
        if self.value.is_some() {
            return Err(QueryError::InvalidChildType {
                parent: self.name.clone(),
                child: child.name,
            });
        }
        let index = self.children.len();
        self.children.push(child);
        Ok(&mut self.children[index])
    }

    /// First child with the given name.
    pub fn child(&self, name: &str) -> Option<&QueryNode> {
        self.children.iter().find(|child| child.name == name)
    }

    /// First child with the given name, mutably.
    pub fn child_mut(&mut self, name: &str) -> Option<&mut QueryNode> {
        self.children.iter_mut().find(|child| child.name == name)
    }

    /// Serialize this subtree into GraphQL query text.
    pub fn serialize(&self) -> String {
        self.to_string()
    }

    /// Bind the fragment found under this node's bind key in `response`.
    ///
    /// Leaves take the scalar, internal nodes recurse with each child using
    /// its own bind key, connections load a page into their cursor. A `null`
    /// object binds `null` into every leaf below it. On failure the leaf that
    /// could not be bound keeps its previous value.
    pub fn bind(&mut self, response: &Value) -> Result<&mut Self> {
        let fragment = response
            .get(self.bind_name.as_str())
            .ok_or_else(|| QueryError::missing_field(&self.bind_name, response))?;
        self.bind_fragment(fragment)?;
        Ok(self)
    }

    fn bind_fragment(&mut self, fragment: &Value) -> Result<()> {
        if let NodeKind::Connection(cursor) = &mut self.kind {
            return cursor.bind_page(fragment);
        }
        if self.binds_scalar() {
            self.value = Some(fragment.clone());
            return Ok(());
        }
        if fragment.is_null() {
            for child in &mut self.children {
                child.bind_fragment(&Value::Null)?;
            }
            return Ok(());
        }
        for child in &mut self.children {
            child.bind(fragment)?;
        }
        Ok(())
    }

    /// Rebuild the JSON shape of the bound subtree.
    ///
    /// Leaves yield their value, internal nodes an object keyed by each
    /// child's bind key, connections the items of their current page.
    /// Unbound leaves are omitted.
    pub fn bound_value(&self) -> Option<Value> {
        match &self.kind {
            NodeKind::Connection(cursor) => Some(Value::Array(cursor.items().to_vec())),
            _ if self.binds_scalar() => self.value.clone(),
            _ => {
                let mut object = Map::new();
                for child in &self.children {
                    if let Some(value) = child.bound_value() {
                        object.insert(child.bind_name.clone(), value);
                    }
                }
                Some(Value::Object(object))
            }
        }
    }

    /// Remove every child whose name is not in `retain`.
    ///
    /// The returned guard dereferences to this node and puts the removed
    /// children back at their original positions when dropped.
    pub fn prune_children(&mut self, retain: &[&str]) -> NarrowedView<'_> {
        let mut kept = Vec::with_capacity(self.children.len());
        let mut removed = Vec::new();
        for (index, child) in std::mem::take(&mut self.children).into_iter().enumerate() {
            if retain.contains(&child.name.as_str()) {
                kept.push(child);
            } else {
                removed.push((index, child));
            }
        }
        self.children = kept;
        self.pruned += removed.len();
        NarrowedView {
            node: self,
            removed,
        }
    }

    /// Run `f` against this node narrowed to the `retain` children.
    ///
    /// The pruned children are restored however `f` exits, including
    /// unwinding.
    pub fn with_narrowed_view<R>(
        &mut self,
        retain: &[&str],
        f: impl FnOnce(&mut QueryNode) -> R,
    ) -> R {
        let mut view = self.prune_children(retain);
        f(&mut view)
    }
}

impl From<&str> for QueryNode {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for QueryNode {
    fn from(name: String) -> Self {
        Self::new(name)
    }
}

impl fmt::Display for QueryNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)?;
        if !self.arguments.is_empty() {
            f.write_str("(")?;
            for (i, (name, value)) in self.arguments.iter().enumerate() {
                if i > 0 {
                    f.write_str(", ")?;
                }
                write!(f, "{name}:{value}")?;
            }
            f.write_str(") ")?;
        }

        if let NodeKind::Connection(cursor) = &self.kind {
            let shape = cursor.shape();
            write!(f, "{{ {} ", shape.nodes_key)?;
            if !self.children.is_empty() {
                f.write_str("{ ")?;
                for child in &self.children {
                    write!(f, "{child}")?;
                }
                f.write_str("} ")?;
            }
            return write!(
                f,
                "{} {{ {} {} }} }} ",
                shape.page_info_key, shape.has_next_key, shape.end_cursor_key
            );
        }

        if self.children.is_empty() {
            if self.arguments.is_empty() {
                f.write_str(" ")?;
            }
            return Ok(());
        }
        f.write_str("{ ")?;
        for child in &self.children {
            write!(f, "{child}")?;
        }
        f.write_str("} ")
    }
}

/// A node temporarily narrowed by [`QueryNode::prune_children`].
///
/// Dropping the view restores the pruned children. Restoring reinserts each
/// child at its original index, so prune followed by restore leaves the
/// children unchanged when nothing else touched them in between.
pub struct NarrowedView<'a> {
    node: &'a mut QueryNode,
    removed: Vec<(usize, QueryNode)>,
}

impl NarrowedView<'_> {
    /// Names of the children removed by the prune, in original order.
    pub fn pruned(&self) -> impl Iterator<Item = &str> {
        self.removed.iter().map(|(_, child)| child.name.as_str())
    }

    /// Restore the pruned children now.
    pub fn restore(self) {}

    fn put_back(&mut self) {
        self.node.pruned -= self.removed.len();
        for (index, child) in self.removed.drain(..) {
            let at = index.min(self.node.children.len());
            self.node.children.insert(at, child);
        }
    }
}

impl Deref for NarrowedView<'_> {
    type Target = QueryNode;

    fn deref(&self) -> &QueryNode {
        self.node
    }
}

impl DerefMut for NarrowedView<'_> {
    fn deref_mut(&mut self) -> &mut QueryNode {
        self.node
    }
}

impl Drop for NarrowedView<'_> {
    fn drop(&mut self) {
        self.put_back();
    }
}

impl fmt::Debug for NarrowedView<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NarrowedView")
            .field("node", &self.node.name)
            .field("pruned", &self.pruned().collect::<Vec<_>>())
            .finish()
    }
}

/// A transient operation root wrapped around a subtree for one request.
///
/// The subtree is moved under a fresh [`QueryNode::root`] and moved back into
/// its slot when the wrapper is dropped.
pub(crate) struct SyntheticRoot<'a> {
    slot: &'a mut QueryNode,
    root: QueryNode,
}

impl<'a> SyntheticRoot<'a> {
    pub(crate) fn attach(slot: &'a mut QueryNode) -> Self {
        let mut root = QueryNode::root();
        let subtree = std::mem::replace(slot, QueryNode::new(String::new()));
        root.children.push(subtree);
        Self { slot, root }
    }
}

impl Deref for SyntheticRoot<'_> {
    type Target = QueryNode;

    fn deref(&self) -> &QueryNode {
        &self.root
    }
}

impl DerefMut for SyntheticRoot<'_> {
    fn deref_mut(&mut self) -> &mut QueryNode {
        &mut self.root
    }
}

impl Drop for SyntheticRoot<'_> {
    fn drop(&mut self) {
        if let Some(subtree) = self.root.children.pop() {
            *self.slot = subtree;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn torvalds() -> QueryNode {
        let mut user = QueryNode::new("user");
        user.add_argument("login", "torvalds");
        user.add_child("id").unwrap();
        user.add_child("email").unwrap();
        user
    }

    #[test]
    fn test_serialize_user() {
        assert_eq!(torvalds().serialize(), r#"user(login:"torvalds") { id email } "#);
    }

    #[test]
    fn test_serialize_is_stable() {
        let user = torvalds();
        assert_eq!(user.serialize(), user.serialize());
    }

    #[test]
    fn test_leaf_has_single_trailing_space() {
        assert_eq!(QueryNode::new("login").serialize(), "login ");
    }

    #[test]
    fn test_argument_formatting_and_order() {
        let mut node = QueryNode::new("avatarUrl");
        node.add_argument("size", 20)
            .add_argument("fresh", true)
            .add_argument("format", "png")
            .add_argument("order", Argument::raw("DESC"));

        assert_eq!(
            node.serialize(),
            r#"avatarUrl(size:20, fresh:true, format:"png", order:DESC) "#
        );
    }

    #[test]
    fn test_readding_argument_keeps_position() {
        let mut node = QueryNode::new("search");
        node.add_argument("query", "rust").add_argument("first", 10);
        node.add_argument("query", "lattice");

        let names: Vec<_> = node.arguments().map(|(name, _)| name).collect();
        assert_eq!(names, ["query", "first"]);
        assert_eq!(node.argument("query").unwrap().as_str(), r#""lattice""#);
    }

    #[test]
    fn test_json_value_arguments() {
        assert_eq!(Argument::from(json!("a")).as_str(), r#""a""#);
        assert_eq!(Argument::from(json!(false)).as_str(), "false");
        assert_eq!(Argument::from(json!(2.5)).as_str(), "2.5");
    }

    #[test]
    fn test_serialize_root() {
        let mut root = QueryNode::root();
        root.add_child(torvalds()).unwrap();
        assert_eq!(
            root.serialize(),
            r#"query { user(login:"torvalds") { id email } } "#
        );
    }

    #[test]
    fn test_serialize_connection() {
        let mut repos = QueryNode::connection("repositories").with_page_size(2);
        repos.add_child("name").unwrap();
        assert_eq!(
            repos.serialize(),
            "repositories(first:2) { nodes { name } pageInfo { hasNextPage endCursor } } "
        );
    }

    #[test]
    fn test_add_child_returns_child() {
        let mut root = QueryNode::root();
        root.add_child("viewer")
            .unwrap()
            .add_child("login")
            .unwrap();
        assert_eq!(root.child("viewer").unwrap().children()[0].name(), "login");
    }

    #[test]
    fn test_add_child_to_bound_leaf_fails() {
        let mut leaf = QueryNode::new("name");
        leaf.bind(&json!({"name": "Linus"})).unwrap();

        let err = leaf.add_child("first").unwrap_err();
        assert!(matches!(err, QueryError::InvalidChildType { .. }));
        assert!(leaf.children().is_empty());
    }

    #[test]
    fn test_bind_internal_node() {
        let mut user = torvalds();
        user.bind(&json!({"user": {"id": "1", "email": "a@b.c"}})).unwrap();

        assert_eq!(user.child("id").unwrap().value(), Some(&json!("1")));
        assert_eq!(user.child("email").unwrap().value_as::<String>().unwrap(), "a@b.c");
    }

    #[test]
    fn test_bind_last_wins() {
        let mut user = torvalds();
        user.bind(&json!({"user": {"id": "1", "email": "old"}})).unwrap();
        user.bind(&json!({"user": {"id": "2", "email": "new"}})).unwrap();

        assert_eq!(user.child("id").unwrap().value(), Some(&json!("2")));
        assert_eq!(user.child("email").unwrap().value(), Some(&json!("new")));
    }

    #[test]
    fn test_bind_missing_leaf_keeps_value() {
        let mut leaf = QueryNode::new("email");
        leaf.bind(&json!({"email": "first"})).unwrap();

        let err = leaf.bind(&json!({"id": "1"})).unwrap_err();
        assert!(matches!(err, QueryError::MissingField { ref field, .. } if field == "email"));
        assert_eq!(leaf.value(), Some(&json!("first")));
    }

    #[test]
    fn test_bind_missing_leaf_on_fresh_node() {
        let mut leaf = QueryNode::new("email");
        assert!(leaf.bind(&json!({})).is_err());
        assert!(leaf.value().is_none());
    }

    #[test]
    fn test_bind_missing_child() {
        let mut user = torvalds();
        let err = user.bind(&json!({"user": {"id": "1"}})).unwrap_err();
        assert!(matches!(err, QueryError::MissingField { ref field, .. } if field == "email"));
    }

    #[test]
    fn test_child_uses_own_bind_name() {
        let mut user = QueryNode::new("user");
        user.add_child(QueryNode::new("email").with_bind_name("primaryEmail"))
            .unwrap();
        user.bind(&json!({"user": {"primaryEmail": "x@y.z"}})).unwrap();

        assert_eq!(user.child("email").unwrap().value(), Some(&json!("x@y.z")));
    }

    #[test]
    fn test_bind_null_object() {
        let mut user = torvalds();
        user.bind(&json!({"user": null})).unwrap();
        assert_eq!(user.child("id").unwrap().value(), Some(&Value::Null));
    }

    #[test]
    fn test_bind_connection() {
        let mut owner = QueryNode::new("user");
        owner.add_child(QueryNode::connection("repositories")).unwrap();
        owner
            .bind(&json!({"user": {"repositories": {
                "nodes": [{"name": "linux"}],
                "pageInfo": {"hasNextPage": false, "endCursor": null}
            }}}))
            .unwrap();

        let cursor = owner.child("repositories").unwrap().cursor().unwrap();
        assert_eq!(cursor.items(), [json!({"name": "linux"})]);
    }

    #[test]
    fn test_bound_value() {
        let mut user = torvalds();
        user.bind(&json!({"user": {"id": "1", "email": "e"}})).unwrap();
        assert_eq!(user.bound_value(), Some(json!({"id": "1", "email": "e"})));
    }

    #[test]
    fn test_prune_and_restore_preserves_order() {
        let mut user = QueryNode::new("user");
        for name in ["id", "x", "email", "x", "bio"] {
            user.add_child(name).unwrap();
        }
        let before = user.clone();

        let view = user.prune_children(&["x"]);
        let names: Vec<_> = view.children().iter().map(QueryNode::name).collect();
        assert_eq!(names, ["x", "x"]);
        assert_eq!(view.pruned().collect::<Vec<_>>(), ["id", "email", "bio"]);
        view.restore();

        assert_eq!(user, before);
    }

    #[test]
    fn test_narrowed_view_serializes_retained_only() {
        let mut user = torvalds();
        let text = user.with_narrowed_view(&["email"], |node| node.serialize());
        assert_eq!(text, r#"user(login:"torvalds") { email } "#);
        assert_eq!(user.children().len(), 2);
    }

    #[test]
    fn test_node_narrowed_to_nothing_stays_an_object() {
        let mut user = QueryNode::new("user");
        user.add_child("id").unwrap();

        user.with_narrowed_view(&["missing"], |node| {
            assert!(!node.is_leaf());
            node.bind(&json!({"user": {"id": 1}})).map(|_| ())
        })
        .unwrap();

        assert_eq!(user.children().len(), 1);
        assert!(user.value().is_none());
        assert!(user.child("id").unwrap().value().is_none());
        user.add_child("email").unwrap();
    }

    #[test]
    fn test_narrowed_view_restores_on_error() {
        let mut user = torvalds();
        let result: Result<()> = user.with_narrowed_view(&["id"], |node| {
            node.bind(&json!({}))?;
            Ok(())
        });

        assert!(result.is_err());
        assert_eq!(user, torvalds());
    }

    #[test]
    fn test_narrowed_view_restores_on_panic() {
        let mut user = torvalds();
        let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            user.with_narrowed_view(&["id"], |node| {
                assert!(node.child("email").is_some(), "email was pruned");
            })
        }));

        assert!(outcome.is_err());
        assert_eq!(user, torvalds());
    }

    #[test]
    fn test_synthetic_root_round_trip() {
        let mut user = torvalds();
        {
            let mut root = SyntheticRoot::attach(&mut user);
            assert_eq!(
                root.serialize(),
                r#"query { user(login:"torvalds") { id email } } "#
            );
            root.bind(&json!({"data": {"user": {"id": "7", "email": "e"}}}))
                .unwrap();
        }
        assert_eq!(user.name(), "user");
        assert_eq!(user.child("id").unwrap().value(), Some(&json!("7")));
    }
}
