//! HTTP request handlers for the Axum web server.
//!
//! Each submodule contains handlers for a specific API area.
//! Handlers are thin wrappers that delegate to `AppCore` services.

pub mod admin;
pub mod agents;
pub mod auth;
pub mod businesses;
pub mod media;
pub mod missions;
pub mod payments;
pub mod workspace;
