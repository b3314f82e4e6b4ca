//! Deposit cashback: every deposit accrues a tiered share into the cashback
//! pool, which can only be claimed once the spendable balance is gone.

use crate::bonus::tiers::{level_for, level_view, LevelView, Tier};
use crate::common::types::MONEY_EPSILON;
use crate::errors::{CasinoError, CasinoResult};
use crate::ledger::{Account, JournalKind};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

/// Accrue cashback for a deposit.
///
/// `total_deposited` must already include this deposit, so the deposit that
/// crosses a threshold earns the higher tier.
pub fn accrue(account: &mut Account, tiers: &[Tier], amount: f64, now: DateTime<Utc>) -> f64 {
    let Some(tier) = level_for(tiers, account.total_deposited) else {
        return 0.0;
    };
    let cashback = tier.share_of(amount);
    if cashback > 0.0 {
        account.cashback_pool += cashback;
        account.record(JournalKind::Cashback, cashback, now);
        info!(account = %account.id, cashback, tier = %tier.name, "Cashback accrued");
    }
    cashback
}

/// Move the whole cashback pool onto the deposit balance
pub fn claim(
    account: &mut Account,
    min_claim: f64,
    require_monthly_deposit: bool,
    now: DateTime<Utc>,
) -> CasinoResult<f64> {
    if account.total() >= MONEY_EPSILON {
        return Err(CasinoError::validation("cashback can only be claimed with a zero balance"));
    }
    if account.cashback_pool < min_claim {
        return Err(CasinoError::validation(format!(
            "cashback pool below minimum claim of {:.2}",
            min_claim
        )));
    }
    if require_monthly_deposit && !account.deposited_in_month_of(now) {
        return Err(CasinoError::validation("a deposit this month is required to claim cashback"));
    }

    let amount = account.cashback_pool;
    account.cashback_pool = 0.0;
    account.deposit_balance += amount;
    account.record(JournalKind::CashbackClaim, amount, now);
    info!(account = %account.id, amount, "Cashback claimed");
    Ok(amount)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CashbackStatus {
    pub pool: f64,
    pub can_claim: bool,
    pub level: LevelView,
}

pub fn status(account: &Account, tiers: &[Tier], min_claim: f64) -> CashbackStatus {
    CashbackStatus {
        pool: account.cashback_pool,
        can_claim: account.total() < MONEY_EPSILON && account.cashback_pool >= min_claim,
        level: level_view(tiers, account.total_deposited),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::types::AccountId;
    use crate::config::BonusConfig;

    fn account() -> Account {
        Account::new(AccountId::from("a"), "CODE".into(), None, 300.0)
    }

    #[test]
    fn test_accrue_uses_tier_after_deposit() {
        let tiers = BonusConfig::default().cashback_tiers;
        let mut acc = account();
        acc.total_deposited = 1_000.0;
        assert_eq!(accrue(&mut acc, &tiers, 1_000.0, Utc::now()), 50.0);

        // This deposit lifts the total to 5000: Silver, 10%
        acc.total_deposited = 5_000.0;
        assert_eq!(accrue(&mut acc, &tiers, 4_000.0, Utc::now()), 400.0);
        assert_eq!(acc.cashback_pool, 450.0);
        assert_eq!(acc.journal.len(), 2);
    }

    #[test]
    fn test_claim_rules() {
        let now = Utc::now();
        let mut acc = account();
        acc.cashback_pool = 40.0;
        acc.deposit_balance = 0.5;
        assert!(claim(&mut acc, 1.0, false, now).is_err());

        acc.deposit_balance = 0.0;
        assert!(claim(&mut acc, 1.0, true, now).is_err());

        acc.last_deposit_at = Some(now);
        assert_eq!(claim(&mut acc, 1.0, true, now).unwrap(), 40.0);
        assert_eq!(acc.deposit_balance, 40.0);
        assert_eq!(acc.cashback_pool, 0.0);
    }

    #[test]
    fn test_sub_cent_dust_does_not_block_claim() {
        let tiers = BonusConfig::default().cashback_tiers;
        let mut acc = account();
        acc.cashback_pool = 30.0;
        acc.deposit_balance = 0.004;
        acc.promo_balance = 0.003;
        assert!(status(&acc, &tiers, 1.0).can_claim);
        assert_eq!(claim(&mut acc, 1.0, false, Utc::now()).unwrap(), 30.0);
        assert!((acc.deposit_balance - 30.004).abs() < 1e-9);
    }

    #[test]
    fn test_claim_below_minimum() {
        let mut acc = account();
        acc.cashback_pool = 0.5;
        assert!(matches!(claim(&mut acc, 1.0, false, Utc::now()), Err(CasinoError::Validation(_))));
    }
}
