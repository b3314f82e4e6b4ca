//! Daily login bonus with a seven-day streak.

use crate::errors::{CasinoError, CasinoResult};
use crate::ledger::{Account, JournalKind};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

/// Wager requirement attached to daily bonus funds, as a multiple of the reward
pub const DAILY_WAGER_MULTIPLIER: f64 = 1.0;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DailyStreak {
    pub last_claim: Option<NaiveDate>,
    pub streak: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DailyClaim {
    /// Position in the reward cycle, starting at 1
    pub day: u32,
    pub streak: u32,
    pub reward: f64,
}

/// Claim today's bonus. A missed day restarts the streak; the reward cycle
/// repeats once the last day has been paid.
pub fn claim(account: &mut Account, rewards: &[f64], now: DateTime<Utc>) -> CasinoResult<DailyClaim> {
    if rewards.is_empty() {
        return Err(CasinoError::validation("daily bonus is not configured"));
    }
    let today = now.date_naive();
    let streak = match account.daily.last_claim {
        Some(last) if last == today => {
            return Err(CasinoError::conflict("daily bonus already claimed today"));
        }
        Some(last) if last.succ_opt() == Some(today) => account.daily.streak + 1,
        _ => 1,
    };

    let day = (streak - 1) % rewards.len() as u32 + 1;
    let reward = rewards[(day - 1) as usize];

    account.daily = DailyStreak {
        last_claim: Some(today),
        streak,
    };
    account.promo_balance += reward;
    account.add_wager(reward * DAILY_WAGER_MULTIPLIER);
    account.record(JournalKind::DailyBonus { day }, reward, now);
    info!(account = %account.id, day, streak, reward, "Daily bonus claimed");

    Ok(DailyClaim { day, streak, reward })
}
