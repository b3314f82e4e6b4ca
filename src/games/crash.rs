//! Crash: the bet carries a secret crash point fixed at placement time.
//!
//! The client drives the flight animation and reports the multiplier it
//! cashes out at; the server only compares it against the secret.

use crate::common::types::has_two_decimals;
use crate::errors::{CasinoError, CasinoResult};
use crate::ledger::LedgerSplit;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CrashStatus {
    Active,
    CashedOut,
    /// Cashout requested above the crash point
    Crashed,
    /// Status poll observed the flight passing the crash point
    Lose,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrashBet {
    pub id: String,
    pub bet: f64,
    pub split: LedgerSplit,
    pub crash_point: f64,
    pub status: CrashStatus,
    pub cashed_out_multiplier: Option<f64>,
    pub win: f64,
    pub created_at: DateTime<Utc>,
}

impl CrashBet {
    pub fn new(id: String, bet: f64, split: LedgerSplit, crash_point: f64) -> Self {
        Self {
            id,
            bet,
            split,
            crash_point,
            status: CrashStatus::Active,
            cashed_out_multiplier: None,
            win: 0.0,
            created_at: Utc::now(),
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == CrashStatus::Active
    }

    /// Client-facing state; the crash point is withheld while the bet is live
    pub fn view(&self) -> CrashView {
        CrashView {
            bet_id: self.id.clone(),
            status: self.status,
            bet: self.bet,
            win: self.win,
            cashed_out_multiplier: self.cashed_out_multiplier,
            crash_point: if self.is_active() { None } else { Some(self.crash_point) },
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrashView {
    pub bet_id: String,
    pub status: CrashStatus,
    pub bet: f64,
    pub win: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cashed_out_multiplier: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub crash_point: Option<f64>,
}

/// Cashout multipliers must be at least 1.00 with at most two decimals
pub fn validate_cashout_multiplier(multiplier: f64) -> CasinoResult<()> {
    if !multiplier.is_finite() || multiplier < 1.0 {
        return Err(CasinoError::validation("cashout multiplier must be at least 1.00"));
    }
    if !has_two_decimals(multiplier) {
        return Err(CasinoError::validation("cashout multiplier must have at most two decimals"));
    }
    Ok(())
}
