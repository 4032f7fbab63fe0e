//! HTTP transport.
//!
//! Exposes the engine as JSON endpoints under `/api/v1`. The router is
//! composable: `api_router()` returns a `Router` that can be mounted on any
//! axum server instance; `start_api_server()` runs it standalone.

pub mod endpoints;
pub mod error;
pub mod router;
pub mod server;
pub mod types;

pub use error::ApiError;
pub use router::api_router;
pub use server::{start_api_server, ApiServer, ServerError};
pub use types::ApiContext;
