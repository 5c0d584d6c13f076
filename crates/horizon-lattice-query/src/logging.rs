//! Tracing integration.
//!
//! This crate logs through the `tracing` crate and never installs a
//! subscriber itself. To see its output, install one in the application:
//!
//! ```ignore
//! tracing_subscriber::fmt()
//!     .with_env_filter("horizon_lattice_query=debug")
//!     .init();
//! ```
//!
//! Every event carries one of the [`targets`] below.

/// Target names for log filtering.
pub mod targets {
    /// Query execution: one event per round trip.
    pub const EXECUTOR: &str = "horizon_lattice_query::executor";
    /// Page fetches and iteration termination.
    pub const PAGINATION: &str = "horizon_lattice_query::pagination";
    /// HTTP transport.
    pub const TRANSPORT: &str = "horizon_lattice_query::transport";
    /// Declarative description loading.
    pub const LOADER: &str = "horizon_lattice_query::loader";
    /// Lazily fetched fields.
    pub const MEMO: &str = "horizon_lattice_query::memo";
}
