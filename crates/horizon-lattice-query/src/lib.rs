//! GraphQL query object model for Horizon Lattice.
//!
//! This crate builds GraphQL queries as a tree of [`QueryNode`]s, serializes
//! them, executes them against a single endpoint and binds the response back
//! into the same tree:
//!
//! - **Query tree**: fields, arguments and nested selections
//! - **Executor**: one POST per execution through a pluggable [`Transport`]
//! - **Pagination**: lazy iteration over Relay-style connections, fetching
//!   one page at a time with the rest of the tree pruned from the request
//! - **Loader**: trees described declaratively in JSON or TOML
//! - **Memoizer**: objects whose fields are fetched on first access
//!
//! # Building and executing
//!
//! ```ignore
//! use horizon_lattice_query::{Endpoint, HttpTransport, QueryNode};
//!
//! let transport = HttpTransport::builder()
//!     .bearer_auth(&token)?
//!     .build()?;
//! let endpoint = Endpoint::new(&transport, "https://api.github.com/graphql")?;
//!
//! let mut user = QueryNode::new("user");
//! user.add_argument("login", "torvalds");
//! user.add_child("name")?;
//! user.add_child(QueryNode::connection("repositories"))?
//!     .add_child("name")?;
//!
//! endpoint.execute(&mut user)?;
//! let name: String = user.child("name").unwrap().value_as()?;
//! ```
//!
//! # Paginating
//!
//! Iterating a connection yields the items already bound and fetches further
//! pages as they are needed:
//!
//! ```ignore
//! for repository in endpoint.iterate(&mut user, "repositories", "name")? {
//!     println!("{}", repository.unwrap_or_default());
//! }
//! ```
//!
//! # Logging
//!
//! Everything is logged through `tracing` on the targets listed in
//! [`logging::targets`].

mod error;
pub mod cursor;
pub mod executor;
pub mod loader;
pub mod logging;
pub mod memo;
pub mod node;
pub mod pagination;
pub mod response;
pub mod transport;

pub use error::{QueryError, Result};

// Re-export commonly used types at the crate root
pub use cursor::{CursorState, CursorStep, ListCursor, PageShape};
pub use executor::Endpoint;
pub use memo::LazyObject;
pub use node::{Argument, NarrowedView, QueryNode};
pub use pagination::{ConnectionIter, PageFetcher, Rows, Values};
pub use response::{GraphQLError, GraphQLResponse};
pub use transport::{HttpTransport, HttpTransportBuilder, Transport, TransportResponse};
