//! HTTP API layer for agora.
//!
//! - **Endpoints**: accounts, posts, comments, reply trees and votes
//! - **Extractors**: bearer-token authentication
//! - **Middleware**: shared state and token lookup
//!
//! Built on Axum 0.8 with Tower middleware stack.

pub mod endpoints;
pub mod extractors;
pub mod middleware;
pub mod response;

pub use endpoints::router;
