//! Error types for building, executing and binding queries.

use std::path::PathBuf;

use serde_json::Value;

use crate::response::GraphQLError;

/// Result type alias for query operations.
pub type Result<T> = std::result::Result<T, QueryError>;

/// Errors that can occur while building, executing or binding a query tree.
#[derive(Debug, thiserror::Error)]
pub enum QueryError {
    /// A child was attached to a node that cannot hold children.
    #[error("Cannot attach child '{child}' to '{parent}': node holds a bound scalar value")]
    InvalidChildType { parent: String, child: String },

    /// A declarative query description has the wrong shape.
    #[error("Invalid query description: {0}")]
    InvalidDescription(String),

    /// The owner node has no connection child with the requested name.
    #[error("No connection field named '{0}'")]
    UnknownConnection(String),

    /// The endpoint URL could not be parsed.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// The endpoint answered with a non-success HTTP status.
    #[error("HTTP {status} from GraphQL endpoint: {body}")]
    Transport {
        status: u16,
        body: Value,
        request: Value,
    },

    /// The request failed before a status was received.
    #[error("HTTP request error: {0}")]
    Http(String),

    /// The response carried an application-level `errors` collection.
    #[error("GraphQL error: {}", join_messages(.0))]
    GraphQL(Vec<GraphQLError>),

    /// A response fragment lacks the key a node binds to.
    #[error("Bind error: field '{field}' could not be found in {fragment}")]
    MissingField { field: String, fragment: String },

    /// JSON serialization or deserialization failed.
    #[error("JSON error: {0}")]
    Json(String),

    /// A description file could not be read.
    #[error("Failed to read query description '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Longest response excerpt kept in a [`QueryError::MissingField`].
const FRAGMENT_EXCERPT: usize = 160;

impl QueryError {
    /// Create a missing-field error, keeping a short excerpt of the fragment.
    pub fn missing_field(field: impl Into<String>, fragment: &Value) -> Self {
        let mut excerpt = fragment.to_string();
        if excerpt.len() > FRAGMENT_EXCERPT {
            let mut cut = FRAGMENT_EXCERPT;
            while !excerpt.is_char_boundary(cut) {
                cut -= 1;
            }
            excerpt.truncate(cut);
            excerpt.push_str("...");
        }
        Self::MissingField {
            field: field.into(),
            fragment: excerpt,
        }
    }

    /// Create a description error.
    pub fn invalid_description(message: impl Into<String>) -> Self {
        Self::InvalidDescription(message.into())
    }

    /// Create an I/O error.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// The GraphQL errors carried by this error, if any.
    pub fn graphql_errors(&self) -> Option<&[GraphQLError]> {
        match self {
            Self::GraphQL(errors) => Some(errors),
            _ => None,
        }
    }

    /// The HTTP status carried by this error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Transport { status, .. } => Some(*status),
            _ => None,
        }
    }
}

fn join_messages(errors: &[GraphQLError]) -> String {
    errors
        .iter()
        .map(|e| e.message.as_str())
        .collect::<Vec<_>>()
        .join("; ")
}

impl From<reqwest::Error> for QueryError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Http(format!("request timed out: {err}"))
        } else if err.is_connect() {
            Self::Http(format!("connection failed: {err}"))
        } else {
            Self::Http(err.to_string())
        }
    }
}

impl From<serde_json::Error> for QueryError {
    fn from(err: serde_json::Error) -> Self {
        Self::Json(err.to_string())
    }
}

impl From<url::ParseError> for QueryError {
    fn from(err: url::ParseError) -> Self {
        Self::InvalidUrl(err.to_string())
    }
}

impl From<toml::de::Error> for QueryError {
    fn from(err: toml::de::Error) -> Self {
        Self::InvalidDescription(err.to_string())
    }
}
