//! `reqwest`-backed transport.

use std::time::Duration;

use http::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
use serde_json::Value;

use super::{Transport, TransportResponse, runtime};
use crate::error::{QueryError, Result};
use crate::logging::targets;

/// Configuration for the HTTP transport.
#[derive(Clone, Debug)]
pub struct HttpTransportConfig {
    /// Request timeout.
    pub timeout: Option<Duration>,
    /// Connect timeout.
    pub connect_timeout: Option<Duration>,
    /// User agent sent with every request.
    pub user_agent: Option<String>,
}

impl Default for HttpTransportConfig {
    fn default() -> Self {
        Self {
            timeout: Some(Duration::from_secs(30)),
            connect_timeout: Some(Duration::from_secs(10)),
            user_agent: Some(format!(
                "HorizonLattice/{} (Rust)",
                env!("CARGO_PKG_VERSION")
            )),
        }
    }
}

/// Builder for an [`HttpTransport`].
pub struct HttpTransportBuilder {
    config: HttpTransportConfig,
    default_headers: HeaderMap,
}

impl Default for HttpTransportBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpTransportBuilder {
    /// Create a new builder with default configuration.
    pub fn new() -> Self {
        let mut default_headers = HeaderMap::new();
        default_headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        default_headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        Self {
            config: HttpTransportConfig::default(),
            default_headers,
        }
    }

    /// Set the request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = Some(timeout);
        self
    }

    /// Disable the request timeout.
    pub fn no_timeout(mut self) -> Self {
        self.config.timeout = None;
        self
    }

    /// Set the connect timeout.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.config.connect_timeout = Some(timeout);
        self
    }

    /// Set the user agent string.
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.config.user_agent = Some(user_agent.into());
        self
    }

    /// Add a header sent with every request.
    pub fn header(mut self, name: &str, value: &str) -> Result<Self> {
        let name = HeaderName::try_from(name)
            .map_err(|e| QueryError::Http(format!("invalid header name '{name}': {e}")))?;
        let value = HeaderValue::try_from(value)
            .map_err(|e| QueryError::Http(format!("invalid value for header '{name}': {e}")))?;
        self.default_headers.insert(name, value);
        Ok(self)
    }

    /// Authenticate every request with a bearer token.
    pub fn bearer_auth(mut self, token: &str) -> Result<Self> {
        let mut value = HeaderValue::try_from(format!("Bearer {token}"))
            .map_err(|e| QueryError::Http(format!("invalid bearer token: {e}")))?;
        value.set_sensitive(true);
        self.default_headers.insert(AUTHORIZATION, value);
        Ok(self)
    }

    /// Build the transport.
    pub fn build(self) -> Result<HttpTransport> {
        let mut builder = reqwest::Client::builder();

        if let Some(timeout) = self.config.timeout {
            builder = builder.timeout(timeout);
        }
        if let Some(connect_timeout) = self.config.connect_timeout {
            builder = builder.connect_timeout(connect_timeout);
        }
        if let Some(ref ua) = self.config.user_agent {
            builder = builder.user_agent(ua);
        }
        builder = builder.default_headers(self.default_headers);

        Ok(HttpTransport {
            client: builder.build()?,
            config: self.config,
        })
    }
}

/// Blocking JSON POST transport over `reqwest`.
///
/// Requests run on the shared [`runtime`]; the calling thread blocks until
/// the response body has been read. Clones share the connection pool.
#[derive(Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    config: HttpTransportConfig,
}

impl HttpTransport {
    /// Create a transport with default configuration.
    pub fn new() -> Result<Self> {
        HttpTransportBuilder::new().build()
    }

    /// Create a builder for configuring a transport.
    pub fn builder() -> HttpTransportBuilder {
        HttpTransportBuilder::new()
    }

    /// Get the transport's configuration.
    pub fn config(&self) -> &HttpTransportConfig {
        &self.config
    }

    /// POST `body` to `url` without blocking.
    pub async fn post_async(&self, url: &str, body: &Value) -> Result<TransportResponse> {
        let response = self.client.post(url).json(body).send().await?;
        let status = response.status().as_u16();
        let text = response.text().await?;

        tracing::trace!(
            target: targets::TRANSPORT,
            status,
            bytes = text.len(),
            "response received"
        );

        let body = if text.trim().is_empty() {
            Value::Null
        } else if (200..300).contains(&status) {
            serde_json::from_str(&text)?
        } else {
            serde_json::from_str(&text).unwrap_or(Value::String(text))
        };
        Ok(TransportResponse::new(status, body))
    }
}

impl Transport for HttpTransport {
    fn post(&self, url: &str, body: &Value) -> Result<TransportResponse> {
        runtime::block_on(self.post_async(url, body))
    }
}

impl std::fmt::Debug for HttpTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpTransport")
            .field("config", &self.config)
            .finish()
    }
}
