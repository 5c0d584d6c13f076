//! Transport used by the executor to reach the GraphQL endpoint.
//!
//! The executor only needs one capability: POST a JSON body to a URL and get
//! back a status code and a JSON body. [`HttpTransport`] provides it over
//! `reqwest`; tests and embedders can implement [`Transport`] directly.
//!
//! ```ignore
//! use horizon_lattice_query::transport::HttpTransport;
//!
//! let transport = HttpTransport::builder()
//!     .bearer_auth("<token>")?
//!     .timeout(Duration::from_secs(20))
//!     .build()?;
//! ```
//!
//! No retry or backoff is performed at this layer.

mod client;
pub mod runtime;

use std::sync::Arc;

use serde_json::Value;

use crate::error::Result;

pub use client::{HttpTransport, HttpTransportBuilder, HttpTransportConfig};

/// Status and decoded body of one POST.
#[derive(Debug, Clone, PartialEq)]
pub struct TransportResponse {
    /// HTTP status code.
    pub status: u16,
    /// Response body; non-JSON bodies are carried as a JSON string.
    pub body: Value,
}

impl TransportResponse {
    /// Create a response.
    pub fn new(status: u16, body: Value) -> Self {
        Self { status, body }
    }

    /// Check if the status indicates success (2xx).
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// A blocking JSON-over-HTTP POST capability.
///
/// Implementations must be reusable across requests; the executor borrows the
/// transport for every round trip and never retries.
pub trait Transport: Send + Sync {
    /// POST `body` to `url`, blocking until the response is received.
    fn post(&self, url: &str, body: &Value) -> Result<TransportResponse>;
}

impl<T: Transport + ?Sized> Transport for &T {
    fn post(&self, url: &str, body: &Value) -> Result<TransportResponse> {
        (**self).post(url, body)
    }
}

impl<T: Transport + ?Sized> Transport for Arc<T> {
    fn post(&self, url: &str, body: &Value) -> Result<TransportResponse> {
        (**self).post(url, body)
    }
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn post(&self, url: &str, body: &Value) -> Result<TransportResponse> {
        (**self).post(url, body)
    }
}
