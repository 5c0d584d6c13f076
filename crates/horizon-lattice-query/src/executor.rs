//! Query execution.
//!
//! An [`Endpoint`] pairs a [`Transport`] with the GraphQL URL. Executing a
//! node serializes it under an operation root, performs one POST and binds
//! the response back into the tree:
//!
//! ```ignore
//! let transport = HttpTransport::builder().bearer_auth(token)?.build()?;
//! let endpoint = Endpoint::new(&transport, "https://api.github.com/graphql")?;
//!
//! let mut user = QueryNode::new("user");
//! user.add_argument("login", "torvalds");
//! user.add_child("name")?;
//!
//! endpoint.execute(&mut user)?;
//! let name: String = user.child("name").unwrap().value_as()?;
//! ```

use serde::Deserialize;
use serde_json::json;

use crate::error::{QueryError, Result};
use crate::logging::targets;
use crate::node::{QueryNode, SyntheticRoot};
use crate::response::{GraphQLError, GraphQLResponse};
use crate::transport::Transport;

/// Key of the application-level error collection in a response.
const ERRORS_KEY: &str = "errors";

enum Outcome {
    Bound(GraphQLResponse),
    Rejected(Vec<GraphQLError>),
}

/// A GraphQL endpoint reachable through a transport.
///
/// Cheap to clone; the transport is borrowed, not owned.
#[derive(Clone)]
pub struct Endpoint<'t> {
    transport: &'t dyn Transport,
    url: String,
}

impl<'t> Endpoint<'t> {
    /// Create an endpoint, validating the URL.
    pub fn new(transport: &'t dyn Transport, url: impl Into<String>) -> Result<Self> {
        let url = url.into();
        url::Url::parse(&url)?;
        Ok(Self { transport, url })
    }

    /// The endpoint URL.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// The transport requests are sent through.
    pub fn transport(&self) -> &'t dyn Transport {
        self.transport
    }

    /// Execute `node` and bind the response into it.
    ///
    /// A node that is not an operation root is wrapped in one for the
    /// request. Fails with [`QueryError::Transport`] on a non-2xx status and
    /// with [`QueryError::GraphQL`] when the response carries `errors`.
    pub fn execute(&self, node: &mut QueryNode) -> Result<GraphQLResponse> {
        match self.run(node)? {
            Outcome::Bound(response) => Ok(response),
            Outcome::Rejected(errors) => Err(QueryError::GraphQL(errors)),
        }
    }

    /// Execute `node`, routing GraphQL errors to `on_error` instead of failing.
    ///
    /// Returns `Ok(None)` after `on_error` has been called with the errors and
    /// the node that was executed. Transport and binding failures are still
    /// returned as errors.
    pub fn execute_with<F>(
        &self,
        node: &mut QueryNode,
        mut on_error: F,
    ) -> Result<Option<GraphQLResponse>>
    where
        F: FnMut(&[GraphQLError], &QueryNode),
    {
        match self.run(node)? {
            Outcome::Bound(response) => Ok(Some(response)),
            Outcome::Rejected(errors) => {
                on_error(&errors, node);
                Ok(None)
            }
        }
    }

    fn run(&self, node: &mut QueryNode) -> Result<Outcome> {
        if node.is_root() {
            return self.round_trip(node);
        }
        let mut root = SyntheticRoot::attach(node);
        self.round_trip(&mut root)
    }

    fn round_trip(&self, root: &mut QueryNode) -> Result<Outcome> {
        let query = root.serialize();
        tracing::debug!(
            target: targets::EXECUTOR,
            url = %self.url,
            bytes = query.len(),
            "executing query"
        );
        tracing::trace!(target: targets::EXECUTOR, %query);

        let request = json!({ "query": query });
        let response = self.transport.post(&self.url, &request)?;
        if !response.is_success() {
            tracing::debug!(
                target: targets::EXECUTOR,
                status = response.status,
                "endpoint rejected request"
            );
            return Err(QueryError::Transport {
                status: response.status,
                body: response.body,
                request,
            });
        }

        let document = response.body;
        if let Some(errors) = document.get(ERRORS_KEY).filter(|errors| !errors.is_null()) {
            let errors = GraphQLError::collect(errors);
            tracing::debug!(
                target: targets::EXECUTOR,
                count = errors.len(),
                "response carries GraphQL errors"
            );
            return Ok(Outcome::Rejected(errors));
        }

        let parsed = GraphQLResponse::deserialize(&document)?;
        root.bind(&document)?;
        Ok(Outcome::Bound(parsed))
    }
}

impl std::fmt::Debug for Endpoint<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Endpoint").field("url", &self.url).finish()
    }
}
