//! API Request and Response Models
//!
//! Shapes that only exist at the HTTP boundary; game and ledger payloads are
//! serialized straight from the core types.

use crate::games::session::CrashRound;
use crate::settlement::PayoutRequest;
use serde::{Deserialize, Serialize};

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RegisterRequest {
    #[serde(default)]
    pub referrer_code: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromoActivateRequest {
    pub code: String,
}

/// GET /api/games/crash/status/:bet_id?current_mult=
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CrashStatusQuery {
    #[serde(default)]
    pub current_mult: Option<f64>,
}

/// Result reported by the payment provider for a payout
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PayoutCallbackRequest {
    pub success: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WithdrawHistoryResponse {
    pub payouts: Vec<PayoutRequest>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrashHistoryResponse {
    pub rounds: Vec<CrashRound>,
}
