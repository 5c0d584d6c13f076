//! GraphQL response envelope types.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// A GraphQL error returned by the server.
///
/// Only `message` is read by this crate; every other member is optional so
/// that servers with non-standard error objects still deserialize.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphQLError {
    /// The error message.
    #[serde(default)]
    pub message: String,

    /// Locations in the document where the error occurred.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub locations: Vec<GraphQLLocation>,

    /// Path to the field that caused the error.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<Vec<PathSegment>>,

    /// Additional error metadata.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extensions: Option<Value>,
}

impl GraphQLError {
    /// Create an error carrying only a message.
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            locations: Vec::new(),
            path: None,
            extensions: None,
        }
    }

    /// Collect the errors of a response's `errors` member.
    ///
    /// Entries that are not error objects are kept as their JSON text, so the
    /// number of collected errors always matches the server's collection.
    pub fn collect(errors: &Value) -> Vec<Self> {
        match errors {
            Value::Array(entries) => entries.iter().map(Self::from_entry).collect(),
            other => vec![Self::from_entry(other)],
        }
    }

    fn from_entry(entry: &Value) -> Self {
        serde_json::from_value(entry.clone())
            .unwrap_or_else(|_| Self::message(entry.to_string()))
    }
}

impl fmt::Display for GraphQLError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)?;
        if let Some(ref path) = self.path {
            write!(f, " (at ")?;
            for (i, segment) in path.iter().enumerate() {
                if i > 0 {
                    write!(f, ".")?;
                }
                match segment {
                    PathSegment::Field(name) => write!(f, "{name}")?,
                    PathSegment::Index(idx) => write!(f, "[{idx}]")?,
                }
            }
            write!(f, ")")?;
        }
        Ok(())
    }
}

impl std::error::Error for GraphQLError {}

/// A location in a GraphQL document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphQLLocation {
    /// Line number (1-indexed).
    pub line: u32,
    /// Column number (1-indexed).
    pub column: u32,
}

/// A segment in an error path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PathSegment {
    /// A field name.
    Field(String),
    /// An array index.
    Index(usize),
}

/// A successful GraphQL response, returned by the executor after binding.
///
/// Responses carrying `errors` are never returned as values; the executor
/// turns them into [`QueryError::GraphQL`](crate::QueryError::GraphQL).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GraphQLResponse {
    /// The data returned by the operation.
    #[serde(default)]
    pub data: Option<Value>,

    /// Additional response metadata.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extensions: Option<Value>,
}

impl GraphQLResponse {
    /// Get raw data as Value without parsing.
    pub fn raw_data(&self) -> Option<&Value> {
        self.data.as_ref()
    }
}
