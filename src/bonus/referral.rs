//! Referral commissions paid to the inviting account on every deposit.

use crate::bonus::tiers::{level_for, level_view, LevelView, Tier};
use crate::common::types::{AccountId, MONEY_EPSILON};
use crate::ledger::{Account, JournalKind};
use chrono::{DateTime, Utc};
use dashmap::DashSet;
use serde::{Deserialize, Serialize};
use tracing::info;

/// True when the deposit is the account's first, given the total *after* it
pub fn is_first_deposit(total_after: f64, amount: f64) -> bool {
    total_after - amount <= MONEY_EPSILON
}

/// Commission bookkeeping; each deposit id pays out at most once.
///
/// Credited deposit ids share the retention of the settlement records they
/// mirror and are never pruned.
#[derive(Default)]
pub struct ReferralProgram {
    tiers: Vec<Tier>,
    credited: DashSet<String>,
}

impl ReferralProgram {
    pub fn new(tiers: Vec<Tier>) -> Self {
        Self {
            tiers,
            credited: DashSet::new(),
        }
    }

    pub fn tiers(&self) -> &[Tier] {
        &self.tiers
    }

    /// Credit the referrer for a settled deposit.
    ///
    /// Returns `None` when this deposit already paid a commission.
    pub fn credit(
        &self,
        referrer: &mut Account,
        from: &AccountId,
        deposit_id: &str,
        amount: f64,
        first_deposit: bool,
        now: DateTime<Utc>,
    ) -> Option<f64> {
        if !self.credited.insert(deposit_id.to_string()) {
            return None;
        }

        if first_deposit {
            referrer.deposited_refs += 1;
        }
        let bonus = level_for(&self.tiers, referrer.deposited_refs as f64)
            .map(|tier| tier.share_of(amount))
            .unwrap_or(0.0);

        referrer.deposit_balance += bonus;
        referrer.income += bonus;
        referrer.income_all += bonus;
        referrer.record(JournalKind::Referral { from_account: from.clone() }, bonus, now);
        info!(
            referrer = %referrer.id,
            from = %from,
            bonus,
            deposited_refs = referrer.deposited_refs,
            "Referral commission credited"
        );
        Some(bonus)
    }

    pub fn status(&self, account: &Account) -> ReferralStatus {
        ReferralStatus {
            ref_code: account.ref_code.clone(),
            deposited_refs: account.deposited_refs,
            income: account.income,
            income_all: account.income_all,
            level: level_view(&self.tiers, account.deposited_refs as f64),
        }
    }
}

/// Invited accounts shown on the referral list
pub const REFERRAL_LIST_LIMIT: usize = 100;
const SHOWN_ID_CHARS: usize = 8;

/// One invited account as its referrer sees it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReferralEntry {
    pub account: String,
    pub registered_at: DateTime<Utc>,
    pub total_deposited: f64,
    pub has_deposited: bool,
}

impl ReferralEntry {
    pub fn of(account: &Account) -> Self {
        let id = account.id.to_string();
        let shown = if id.chars().count() > SHOWN_ID_CHARS {
            format!("{}...", id.chars().take(SHOWN_ID_CHARS).collect::<String>())
        } else {
            id
        };
        Self {
            account: shown,
            registered_at: account.created_at,
            total_deposited: account.total_deposited,
            has_deposited: account.total_deposited > MONEY_EPSILON,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReferralList {
    pub referrals: Vec<ReferralEntry>,
    pub total_count: usize,
    pub deposited_count: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReferralStatus {
    pub ref_code: String,
    pub deposited_refs: u32,
    pub income: f64,
    pub income_all: f64,
    pub level: LevelView,
}
