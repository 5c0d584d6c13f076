//! Shared helpers for integration tests.

#![allow(dead_code)]

use std::collections::VecDeque;

use horizon_lattice_query::{QueryError, QueryNode, Result, Transport, TransportResponse};
use parking_lot::Mutex;
use serde_json::{Value, json};

pub const GRAPHQL_URL: &str = "https://api.github.com/graphql";

/// In-memory transport replaying queued responses and recording every request.
#[derive(Default)]
pub struct ScriptedTransport {
    responses: Mutex<VecDeque<TransportResponse>>,
    requests: Mutex<Vec<Value>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a 200 response with `body`.
    pub fn reply(&self, body: Value) -> &Self {
        self.reply_with(200, body)
    }

    /// Queue a response with an explicit status.
    pub fn reply_with(&self, status: u16, body: Value) -> &Self {
        self.responses.lock().push_back(TransportResponse::new(status, body));
        self
    }

    /// Every request body posted so far.
    pub fn requests(&self) -> Vec<Value> {
        self.requests.lock().clone()
    }

    /// Query text of the `n`-th request.
    pub fn query(&self, n: usize) -> String {
        self.requests.lock()[n]["query"]
            .as_str()
            .unwrap_or_default()
            .to_owned()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().len()
    }
}

impl Transport for ScriptedTransport {
    fn post(&self, _url: &str, body: &Value) -> Result<TransportResponse> {
        self.requests.lock().push(body.clone());
        self.responses
            .lock()
            .pop_front()
            .ok_or_else(|| QueryError::Http("no scripted response left".into()))
    }
}

/// `user(login:"torvalds") { name repositories(first:100) { nodes { name stars } ... } email }`
pub fn user_with_repositories() -> QueryNode {
    let mut user = QueryNode::new("user");
    user.add_argument("login", "torvalds");
    user.add_child("name").unwrap();
    let repositories = user.add_child(QueryNode::connection("repositories")).unwrap();
    repositories.add_child("name").unwrap();
    repositories.add_child("stars").unwrap();
    user.add_child("email").unwrap();
    user
}

/// A `data` envelope for [`user_with_repositories`] holding one page.
pub fn user_page(items: Value, has_next: bool, end_cursor: Option<&str>) -> Value {
    json!({
        "data": {
            "user": {
                "name": "Linus Torvalds",
                "email": "torvalds@example.com",
                "repositories": {
                    "nodes": items,
                    "pageInfo": {"hasNextPage": has_next, "endCursor": end_cursor}
                }
            }
        }
    })
}

/// A `data` envelope for a narrowed re-query of `repositories` only.
pub fn repositories_page(items: Value, has_next: bool, end_cursor: Option<&str>) -> Value {
    json!({
        "data": {
            "user": {
                "repositories": {
                    "nodes": items,
                    "pageInfo": {"hasNextPage": has_next, "endCursor": end_cursor}
                }
            }
        }
    })
}

pub fn child_names(node: &QueryNode) -> Vec<&str> {
    node.children().iter().map(QueryNode::name).collect()
}
