//! Wagerline - betting platform core
//!
//! Dual-balance ledger, RTP-governed fairness engine, seven house games and
//! the deposit bonus cascade, hosted behind a thin axum API.

pub mod accounts;
pub mod api;
pub mod bonus;
pub mod common;
pub mod config;
pub mod errors;
pub mod fairness;
pub mod games;
pub mod ledger;
pub mod random;
pub mod services;
pub mod settings;
pub mod settlement;

pub use config::WagerlineConfig;
pub use errors::{CasinoError, CasinoResult, ConfigurationError};
pub use games::GameController;
pub use services::{ServiceBuilder, ServiceContainer};
pub use settlement::SettlementService;
