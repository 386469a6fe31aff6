//! HTTP adapter for the mercato marketplace.
//!
//! Routes under `/api` delegate to [`mercato_core::AppCore`]; this crate
//! owns request parsing, session extraction and error mapping only.

#![deny(unsafe_code)]
#![deny(unused_crate_dependencies)]

// Dev-dependencies used only by integration tests
#[cfg(test)]
use async_trait as _;
#[cfg(test)]
use http_body_util as _;
#[cfg(test)]
use serde_json as _;
#[cfg(test)]
use tower as _;

pub mod auth;
pub mod bootstrap;
pub mod dto;
pub mod error;
pub mod extract;
pub mod handlers;
pub mod routes;
pub mod state;

// Re-export primary types
pub use bootstrap::{AxumContext, CorsConfig, ServerConfig, ServerConfigError, bootstrap, start_server};
pub use error::HttpError;
pub use routes::create_router;
pub use state::AppState;
