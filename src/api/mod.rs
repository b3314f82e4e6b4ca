//! HTTP API
//!
//! Thin axum surface over the betting core. Callers are identified by the
//! `x-account-id` header set by the identity gateway; settlement webhooks are
//! guarded by an API key.

pub mod errors;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod server;

pub use server::ApiServer;
