//! Promo codes: fixed rewards activated by hand, or deposit-percentage
//! bonuses attached to a deposit.

use crate::common::types::round_money;
use crate::errors::{CasinoError, CasinoResult};
use crate::ledger::{Account, JournalKind};
use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

fn default_wager_multiplier() -> f64 {
    3.0
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PromoReward {
    Fixed { amount: f64 },
    DepositPercent { percent: f64 },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromoCode {
    pub code: String,
    pub reward: PromoReward,
    #[serde(default = "default_wager_multiplier")]
    pub wager_multiplier: f64,
    pub limit: u32,
    #[serde(default)]
    pub used: u32,
    #[serde(default)]
    pub deposit_required: bool,
}

impl PromoCode {
    pub fn is_exhausted(&self) -> bool {
        self.used >= self.limit
    }

    /// Bonus granted for this code; `deposit` only matters for percentage codes
    pub fn bonus_for(&self, deposit: Option<f64>) -> f64 {
        match self.reward {
            PromoReward::Fixed { amount } => amount,
            PromoReward::DepositPercent { percent } => deposit
                .map(|amount| round_money(amount * percent / 100.0))
                .unwrap_or(0.0),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromoActivation {
    pub code: String,
    pub reward: f64,
    pub wager_added: f64,
}

/// Registry of known promo codes keyed by upper-cased code
pub struct PromoRegistry {
    codes: DashMap<String, PromoCode>,
    cooldown: Duration,
}

impl PromoRegistry {
    pub fn new(codes: Vec<PromoCode>, cooldown_hours: i64) -> Self {
        let map = DashMap::new();
        for code in codes {
            map.insert(normalize(&code.code), code);
        }
        Self {
            codes: map,
            cooldown: Duration::hours(cooldown_hours),
        }
    }

    pub fn insert(&self, code: PromoCode) {
        self.codes.insert(normalize(&code.code), code);
    }

    pub fn get(&self, code: &str) -> Option<PromoCode> {
        self.codes.get(&normalize(code)).map(|c| c.clone())
    }

    /// Manually activate a fixed-reward code.
    ///
    /// Usage is limited per code, once per account, and to one activation per
    /// cooldown window per account across all codes.
    pub fn activate(&self, account: &mut Account, code: &str, now: DateTime<Utc>) -> CasinoResult<PromoActivation> {
        let key = normalize(code);
        let mut entry = self
            .codes
            .get_mut(&key)
            .ok_or_else(|| CasinoError::not_found(format!("promo code {}", key)))?;

        if matches!(entry.reward, PromoReward::DepositPercent { .. }) {
            return Err(CasinoError::validation("this code applies to deposits only"));
        }
        if entry.is_exhausted() {
            return Err(CasinoError::conflict("promo code usage limit reached"));
        }
        if account.used_promos.contains(&key) {
            return Err(CasinoError::conflict("promo code already used"));
        }
        if let Some(last) = account.last_promo_at {
            if now < last + self.cooldown {
                return Err(CasinoError::conflict("promo code cooldown is still running"));
            }
        }
        if entry.deposit_required && account.total_deposited <= 0.0 {
            return Err(CasinoError::validation("a deposit is required before using this code"));
        }

        let reward = entry.bonus_for(None);
        let wager_added = reward * entry.wager_multiplier;
        entry.used += 1;
        drop(entry);

        account.promo_balance += reward;
        account.add_wager(wager_added);
        account.used_promos.insert(key.clone());
        account.last_promo_at = Some(now);
        account.record(JournalKind::Promo { code: key.clone() }, reward, now);
        info!(account = %account.id, code = %key, reward, wager_added, "Promo code activated");

        Ok(PromoActivation {
            code: key,
            reward,
            wager_added,
        })
    }

    /// Apply a code attached to a deposit. Unknown, exhausted or already
    /// used codes are skipped so the deposit itself still settles.
    pub fn apply_to_deposit(
        &self,
        account: &mut Account,
        code: &str,
        amount: f64,
        now: DateTime<Utc>,
    ) -> Option<PromoActivation> {
        let key = normalize(code);
        let mut entry = self.codes.get_mut(&key)?;
        if entry.is_exhausted() || account.used_promos.contains(&key) {
            debug!(account = %account.id, code = %key, "Deposit promo code skipped");
            return None;
        }

        let reward = entry.bonus_for(Some(amount));
        let wager_added = reward * entry.wager_multiplier;
        entry.used += 1;
        drop(entry);

        account.promo_balance += reward;
        account.add_wager(wager_added);
        account.used_promos.insert(key.clone());
        account.record(JournalKind::Promo { code: key.clone() }, reward, now);
        info!(account = %account.id, code = %key, reward, "Deposit promo bonus credited");

        Some(PromoActivation {
            code: key,
            reward,
            wager_added,
        })
    }
}

fn normalize(code: &str) -> String {
    code.trim().to_uppercase()
}
