//! # Articles API
//!
//! A small content backend serving articles, links and article images over
//! HTTP, with token-protected writes.
//!
//! ## Features
//!
//! - **Documents**: articles and links stored in DynamoDB (or in memory),
//!   listed newest first and filterable by query parameters
//! - **Images**: article images stored in S3 (or in memory)
//! - **Authentication**: RS256 bearer tokens verified against the identity
//!   provider's published key set
//! - **Uniform errors**: every failure is classified into a category that
//!   determines the status code and the JSON error envelope
//! - **Tools**: a markdown importer, a link command, and a static-site proxy
//!   that injects an access token into `/api/*` calls
//!
//! ## Architecture
//!
//! - [`error`] - error categories, the classified [`ApiError`] and the envelope
//! - [`model`] - document types and identifiers
//! - [`store`] - document store trait, DynamoDB and in-memory backends, filters
//! - [`objects`] - object store trait, S3 and in-memory backends
//! - [`server`] - Axum router, handlers, authorization gate
//! - [`client`] - access tokens, API client, markdown importer
//! - [`proxy`] - static-site server with the API proxy
//! - [`config`] - CLI and configuration types
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use articles_api::{create_router, AppState, MemoryObjectStore, MemoryStore, RouterConfig};
//!
//! #[tokio::main]
//! async fn main() {
//!     let state = AppState::new(Arc::new(MemoryStore::new()), Arc::new(MemoryObjectStore::new()));
//!     let router = create_router(state, RouterConfig::without_auth());
//!
//!     let listener = tokio::net::TcpListener::bind("127.0.0.1:8080").await.unwrap();
//!     axum::serve(listener, router).await.unwrap();
//! }
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod model;
pub mod objects;
pub mod proxy;
pub mod server;
pub mod store;

pub use config::{Cli, Command, ServeConfig};
pub use error::{ApiError, ErrorCategory, ErrorEnvelope};
pub use model::{Article, Document, DocumentId, Link};
pub use objects::{MemoryObjectStore, ObjectStore, S3ObjectStore};
pub use server::{create_router, AppState, JwtAuth, RouterConfig};
pub use store::{DocumentStore, DynamoStore, MemoryStore, Repository};
