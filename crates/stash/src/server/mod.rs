//! Axum HTTP server, routing, and middleware.
//!
//! # Responsibilities
//! - Define the Axum router with all routes and shared middleware.
//! - Resolve the caller from the configured identity header.
//! - Inject shared application state (`AppState`) into handlers.

pub mod extract;
pub mod handlers;
pub mod middleware;
pub mod router;
pub mod state;
