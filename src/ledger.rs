//! Dual-balance ledger
//!
//! Every account holds deposited funds and promotional funds side by side.
//! Bets draw on deposit funds first, wins flow back in the same proportion the
//! bet was taken, and promotional funds stay locked behind a wager requirement
//! that decays with every resolved bet.

use crate::bonus::achievements::{Achievement, PlayStats};
use crate::bonus::daily::DailyStreak;
use crate::common::types::{round_money, AccountId};
use crate::errors::{CasinoError, CasinoResult};
use crate::fairness::PlayerOverride;
use crate::games::types::{BalanceView, GameType};
use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};

/// How a deduction was taken; consumed by the matching credit
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct LedgerSplit {
    pub from_deposit: f64,
    pub from_promo: f64,
}

impl LedgerSplit {
    pub fn total(&self) -> f64 {
        self.from_deposit + self.from_promo
    }
}

/// Breakdown of what an account may withdraw right now
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Withdrawable {
    pub from_deposit: f64,
    pub from_promo: f64,
    pub locked_promo: f64,
    pub total: f64,
    pub wager: f64,
}

/// Kind of ledger mutation recorded in the journal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum JournalKind {
    Bet { game: GameType },
    Win { game: GameType },
    Deposit { deposit_id: String },
    Cashback,
    CashbackClaim,
    Referral { from_account: AccountId },
    Promo { code: String },
    DailyBonus { day: u32 },
    Achievement { achievement: Achievement },
    Withdrawal { payout_id: String },
    /// Funds returned after an aborted bet or a failed payout
    Refund { reference: String },
}

/// Append-only record of one balance change
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JournalEntry {
    pub at: DateTime<Utc>,
    #[serde(flatten)]
    pub kind: JournalKind,
    pub amount: f64,
    pub deposit_balance: f64,
    pub promo_balance: f64,
}

/// Player account with both balances, wager state and bonus bookkeeping
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    pub id: AccountId,
    /// Code other players quote to become this account's referrals
    pub ref_code: String,
    /// Referral code of whoever invited this account
    pub referrer: Option<String>,
    pub deposit_balance: f64,
    pub promo_balance: f64,
    pub wager: f64,
    pub promo_withdrawal_limit: f64,
    pub total_deposited: f64,
    pub deposited_refs: u32,
    pub income: f64,
    pub income_all: f64,
    pub cashback_pool: f64,
    pub banned: bool,
    pub player: PlayerOverride,
    pub last_deposit_at: Option<DateTime<Utc>>,
    pub last_promo_at: Option<DateTime<Utc>>,
    pub used_promos: HashSet<String>,
    pub daily: DailyStreak,
    pub stats: PlayStats,
    pub achievements: BTreeSet<Achievement>,
    pub claimed_achievements: BTreeSet<Achievement>,
    pub created_at: DateTime<Utc>,
    pub journal: Vec<JournalEntry>,
}

impl Account {
    pub fn new(id: AccountId, ref_code: String, referrer: Option<String>, promo_cap: f64) -> Self {
        Self {
            id,
            ref_code,
            referrer,
            deposit_balance: 0.0,
            promo_balance: 0.0,
            wager: 0.0,
            promo_withdrawal_limit: promo_cap,
            total_deposited: 0.0,
            deposited_refs: 0,
            income: 0.0,
            income_all: 0.0,
            cashback_pool: 0.0,
            banned: false,
            player: PlayerOverride::None,
            last_deposit_at: None,
            last_promo_at: None,
            used_promos: HashSet::new(),
            daily: DailyStreak::default(),
            stats: PlayStats::default(),
            achievements: BTreeSet::new(),
            claimed_achievements: BTreeSet::new(),
            created_at: Utc::now(),
            journal: Vec::new(),
        }
    }

    /// Banned accounts keep their data but may not move money
    pub fn ensure_active(&self) -> CasinoResult<()> {
        if self.banned {
            return Err(CasinoError::Forbidden(format!("account {} is banned", self.id)));
        }
        Ok(())
    }

    /// Spendable funds across both balances
    pub fn total(&self) -> f64 {
        self.deposit_balance + self.promo_balance
    }

    pub fn balance_view(&self) -> BalanceView {
        BalanceView {
            deposit_balance: self.deposit_balance,
            promo_balance: self.promo_balance,
            total: self.total(),
            wager: self.wager,
        }
    }

    /// Take `amount` from deposit funds first, then promo funds.
    ///
    /// Callers clamp the bet to the available total beforehand; an overdraw
    /// here is a broken invariant.
    pub fn deduct(&mut self, amount: f64) -> LedgerSplit {
        assert!(
            amount >= 0.0 && amount <= self.total() + 1e-9,
            "ledger overdraw: {} > {}",
            amount,
            self.total()
        );
        let from_deposit = amount.min(self.deposit_balance);
        let from_promo = (amount - from_deposit).max(0.0);
        self.deposit_balance -= from_deposit;
        self.promo_balance = (self.promo_balance - from_promo).max(0.0);
        LedgerSplit { from_deposit, from_promo }
    }

    /// Credit a win in the same proportion as the bet split.
    ///
    /// Returns the amounts that landed on the deposit and promo balances.
    pub fn credit(&mut self, win: f64, split: &LedgerSplit) -> LedgerSplit {
        let bet = split.total();
        if win <= 0.0 || bet <= 0.0 {
            return LedgerSplit::default();
        }
        let to_deposit = win * (split.from_deposit / bet);
        let to_promo = win - to_deposit;
        self.deposit_balance += to_deposit;
        self.promo_balance += to_promo;
        LedgerSplit { from_deposit: to_deposit, from_promo: to_promo }
    }

    /// Put a split back exactly where it was taken from
    pub fn refund(&mut self, split: &LedgerSplit) {
        self.deposit_balance += split.from_deposit;
        self.promo_balance += split.from_promo;
    }

    /// Reduce the wager requirement after a resolved bet, never below zero
    pub fn decrease_wager(&mut self, bet: f64) {
        self.wager = (self.wager - bet).max(0.0);
    }

    /// Add a wager requirement for freshly granted promo funds
    pub fn add_wager(&mut self, amount: f64) {
        if amount > 0.0 {
            self.wager += amount;
        }
    }

    /// Deposit funds are always withdrawable; promo funds only once the
    /// wager requirement is met and only up to the promo withdrawal limit.
    pub fn withdrawable(&self) -> Withdrawable {
        let from_deposit = self.deposit_balance;
        let from_promo = if self.wager <= 0.0 {
            self.promo_balance.min(self.promo_withdrawal_limit)
        } else {
            0.0
        };
        Withdrawable {
            from_deposit,
            from_promo,
            locked_promo: self.promo_balance - from_promo,
            total: from_deposit + from_promo,
            wager: self.wager,
        }
    }

    /// True when a deposit settled in the same calendar month as `now`
    pub fn deposited_in_month_of(&self, now: DateTime<Utc>) -> bool {
        self.last_deposit_at
            .map(|at| at.year() == now.year() && at.month() == now.month())
            .unwrap_or(false)
    }

    /// Remove a withdrawal from the withdrawable funds, deposit first
    pub fn withdraw(&mut self, amount: f64, min_withdrawal: f64) -> CasinoResult<LedgerSplit> {
        if !amount.is_finite() || amount < min_withdrawal {
            return Err(CasinoError::validation(format!(
                "minimum withdrawal is {:.2}",
                min_withdrawal
            )));
        }
        let available = self.withdrawable();
        if amount > available.total + 1e-9 {
            return Err(CasinoError::InsufficientFunds {
                requested: amount,
                available: available.total,
            });
        }
        let from_deposit = amount.min(available.from_deposit);
        let from_promo = (amount - from_deposit).min(available.from_promo).max(0.0);
        self.deposit_balance -= from_deposit;
        self.promo_balance -= from_promo;
        Ok(LedgerSplit { from_deposit, from_promo })
    }

    /// Append a journal entry reflecting the balances after the change
    pub fn record(&mut self, kind: JournalKind, amount: f64, at: DateTime<Utc>) {
        self.journal.push(JournalEntry {
            at,
            kind,
            amount: round_money(amount.abs()) * amount.signum(),
            deposit_balance: self.deposit_balance,
            promo_balance: self.promo_balance,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn account(deposit: f64, promo: f64) -> Account {
        let mut acc = Account::new(AccountId::from("acc"), "REF".to_string(), None, 300.0);
        acc.deposit_balance = deposit;
        acc.promo_balance = promo;
        acc
    }

    #[test]
    fn test_deduct_deposit_first() {
        let mut acc = account(70.0, 50.0);
        let split = acc.deduct(100.0);
        assert_eq!(split, LedgerSplit { from_deposit: 70.0, from_promo: 30.0 });
        assert_eq!(split.total(), 100.0);
        assert_eq!(acc.deposit_balance, 0.0);
        assert_eq!(acc.promo_balance, 20.0);
    }

    #[test]
    #[should_panic(expected = "ledger overdraw")]
    fn test_deduct_overdraw_panics() {
        let mut acc = account(5.0, 5.0);
        acc.deduct(11.0);
    }

    #[test]
    fn test_credit_proportional() {
        let mut acc = account(0.0, 0.0);
        let split = LedgerSplit { from_deposit: 70.0, from_promo: 30.0 };
        let credited = acc.credit(100.0, &split);
        assert!((acc.deposit_balance - 70.0).abs() < 1e-9);
        assert!((acc.promo_balance - 30.0).abs() < 1e-9);
        assert!((credited.total() - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_credit_zero_win_is_noop() {
        let mut acc = account(10.0, 0.0);
        let credited = acc.credit(0.0, &LedgerSplit { from_deposit: 5.0, from_promo: 0.0 });
        assert_eq!(credited, LedgerSplit::default());
        assert_eq!(acc.deposit_balance, 10.0);
    }

    #[test]
    fn test_refund_restores_both_balances() {
        let mut acc = account(70.0, 50.0);
        let split = acc.deduct(100.0);
        acc.refund(&split);
        assert_eq!((acc.deposit_balance, acc.promo_balance), (70.0, 50.0));
    }

    #[test]
    fn test_decrease_wager_floors_at_zero() {
        let mut acc = account(0.0, 0.0);
        acc.add_wager(30.0);
        acc.decrease_wager(10.0);
        assert_eq!(acc.wager, 20.0);
        acc.decrease_wager(50.0);
        assert_eq!(acc.wager, 0.0);
    }

    #[test]
    fn test_withdrawable_with_and_without_wager() {
        let mut acc = account(500.0, 400.0);
        let w = acc.withdrawable();
        assert_eq!((w.from_deposit, w.from_promo, w.locked_promo), (500.0, 300.0, 100.0));
        assert_eq!(w.total, 800.0);

        acc.wager = 50.0;
        let w = acc.withdrawable();
        assert_eq!((w.from_deposit, w.from_promo, w.locked_promo), (500.0, 0.0, 400.0));
    }

    #[test]
    fn test_withdraw_deposit_then_promo() {
        let mut acc = account(100.0, 400.0);
        let split = acc.withdraw(250.0, 150.0).unwrap();
        assert_eq!(split, LedgerSplit { from_deposit: 100.0, from_promo: 150.0 });
        assert_eq!(acc.promo_balance, 250.0);

        assert!(matches!(acc.withdraw(100.0, 150.0), Err(CasinoError::Validation(_))));
        // 250 promo left, deposit empty
        assert!(matches!(acc.withdraw(300.0, 150.0), Err(CasinoError::InsufficientFunds { .. })));
    }

    #[test]
    fn test_deposited_in_month() {
        let mut acc = account(0.0, 0.0);
        let now = Utc::now();
        assert!(!acc.deposited_in_month_of(now));
        acc.last_deposit_at = Some(now);
        assert!(acc.deposited_in_month_of(now));
        assert!(!acc.deposited_in_month_of(now + chrono::Duration::days(400)));
    }

    #[test]
    fn test_journal_records_balances() {
        let mut acc = account(10.0, 0.0);
        acc.deduct(4.0);
        acc.record(JournalKind::Bet { game: GameType::Dice }, -4.0, Utc::now());
        let entry = &acc.journal[0];
        assert_eq!(entry.amount, -4.0);
        assert_eq!(entry.deposit_balance, 6.0);
    }
}
