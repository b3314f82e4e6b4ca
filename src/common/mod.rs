//! Common utilities and shared functionality
//!
//! Identifiers, money helpers, the configuration loader and the ports the
//! core consumes from its host.

pub mod config;
pub mod traits;
pub mod types;
