//! Settlement of money moving in and out of the platform
//!
//! Deposit events arrive from an external source that may redeliver them.
//! Each deposit id walks `pending -> processing -> completed`; only the exit
//! from `pending` (or from `failed`, for a retry) is allowed, so a duplicate
//! delivery observes `processing`/`completed` and is reported as stale.
//! Withdrawals produce payout requests for an external payout consumer,
//! which reports back whether the transfer went through.

use crate::bonus::{cashback, referral};
use crate::common::types::AccountId;
use crate::errors::{CasinoError, CasinoResult};
use crate::games::types::BalanceView;
use crate::ledger::{JournalKind, LedgerSplit, Withdrawable};
use crate::services::ServiceContainer;
use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Settlement status tracking
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SettlementStatus {
    Pending,
    Processing,
    Completed,
    Failed { reason: String },
}

/// "Deposit settled" event from the payment side
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DepositEvent {
    pub deposit_id: String,
    pub account_id: AccountId,
    pub amount: f64,
    #[serde(default)]
    pub promo_code: Option<String>,
}

/// What one settled deposit did to the ledger
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DepositOutcome {
    pub deposit_id: String,
    pub amount: f64,
    pub cashback: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub promo_bonus: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub referral_bonus: Option<f64>,
    pub first_deposit: bool,
    pub balance: BalanceView,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DepositRecord {
    pub deposit_id: String,
    pub account_id: AccountId,
    pub amount: f64,
    pub status: SettlementStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome: Option<DepositOutcome>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PayoutStatus {
    Pending,
    Completed,
    /// Rejected by the payout consumer; funds went back to the account
    Failed,
}

/// Withdrawal handed to the external payout consumer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PayoutRequest {
    pub id: String,
    pub account_id: AccountId,
    pub amount: f64,
    pub split: LedgerSplit,
    pub destination: String,
    pub method: String,
    pub status: PayoutStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WithdrawRequest {
    pub amount: f64,
    pub destination: String,
    #[serde(default = "default_method")]
    pub method: String,
}

fn default_method() -> String {
    "card".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WithdrawInfo {
    pub withdrawable: Withdrawable,
    pub balance: BalanceView,
    pub min_withdrawal: f64,
    pub promo_limit: f64,
    pub has_deposit_this_month: bool,
}

/// Deduplication state for deposits plus the payout queue.
///
/// Deposit records are the idempotency keys for redelivered events and are
/// kept for the life of the process, terminal ones included; dropping a
/// completed record would let a late redelivery credit the deposit again.
/// Durable retention belongs to the persistence layer behind this store.
#[derive(Default)]
pub struct SettlementLedger {
    deposits: DashMap<String, DepositRecord>,
    payouts: DashMap<String, PayoutRequest>,
}

impl SettlementLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Note an announced deposit that has not been paid yet
    pub fn register_pending(&self, event: &DepositEvent) {
        self.deposits
            .entry(event.deposit_id.clone())
            .or_insert_with(|| DepositRecord {
                deposit_id: event.deposit_id.clone(),
                account_id: event.account_id.clone(),
                amount: event.amount,
                status: SettlementStatus::Pending,
                outcome: None,
                updated_at: Utc::now(),
            });
    }

    /// Claim a deposit for processing. Exactly one caller wins the move out
    /// of `pending`; everyone else gets a stale-state error.
    pub fn begin(&self, event: &DepositEvent) -> CasinoResult<()> {
        match self.deposits.entry(event.deposit_id.clone()) {
            Entry::Vacant(vacant) => {
                vacant.insert(DepositRecord {
                    deposit_id: event.deposit_id.clone(),
                    account_id: event.account_id.clone(),
                    amount: event.amount,
                    status: SettlementStatus::Processing,
                    outcome: None,
                    updated_at: Utc::now(),
                });
                Ok(())
            }
            Entry::Occupied(mut occupied) => {
                let record = occupied.get_mut();
                match record.status {
                    SettlementStatus::Pending | SettlementStatus::Failed { .. } => {
                        record.status = SettlementStatus::Processing;
                        record.updated_at = Utc::now();
                        Ok(())
                    }
                    SettlementStatus::Processing | SettlementStatus::Completed => {
                        Err(CasinoError::stale(format!("deposit {}", event.deposit_id)))
                    }
                }
            }
        }
    }

    pub fn complete(&self, deposit_id: &str, outcome: DepositOutcome) {
        if let Some(mut record) = self.deposits.get_mut(deposit_id) {
            record.status = SettlementStatus::Completed;
            record.outcome = Some(outcome);
            record.updated_at = Utc::now();
        }
    }

    pub fn fail(&self, deposit_id: &str, reason: impl Into<String>) {
        if let Some(mut record) = self.deposits.get_mut(deposit_id) {
            record.status = SettlementStatus::Failed { reason: reason.into() };
            record.updated_at = Utc::now();
        }
    }

    pub fn deposit(&self, deposit_id: &str) -> Option<DepositRecord> {
        self.deposits.get(deposit_id).map(|r| r.clone())
    }

    pub fn record_payout(&self, payout: PayoutRequest) {
        self.payouts.insert(payout.id.clone(), payout);
    }

    pub fn payout(&self, payout_id: &str) -> Option<PayoutRequest> {
        self.payouts.get(payout_id).map(|p| p.clone())
    }

    /// Most recent payouts of one account, newest first
    pub fn payouts_for(&self, account: &AccountId, limit: usize) -> Vec<PayoutRequest> {
        let mut payouts: Vec<PayoutRequest> = self
            .payouts
            .iter()
            .filter(|p| &p.account_id == account)
            .map(|p| p.clone())
            .collect();
        payouts.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        payouts.truncate(limit);
        payouts
    }

    /// Move a pending payout to its final status; any other state is stale
    fn finish_payout(&self, payout_id: &str, status: PayoutStatus) -> CasinoResult<PayoutRequest> {
        let mut payout = self
            .payouts
            .get_mut(payout_id)
            .ok_or_else(|| CasinoError::not_found(format!("payout {}", payout_id)))?;
        if payout.status != PayoutStatus::Pending {
            return Err(CasinoError::stale(format!("payout {}", payout_id)));
        }
        payout.status = status;
        Ok(payout.clone())
    }
}

/// Deposit settlement and withdrawal operations
#[derive(Clone)]
pub struct SettlementService {
    services: Arc<ServiceContainer>,
}

impl SettlementService {
    pub fn new(services: Arc<ServiceContainer>) -> Self {
        Self { services }
    }

    /// Apply a settled deposit: balance, deposit promo code, cashback, then
    /// the referrer's commission.
    pub async fn settle_deposit(&self, event: DepositEvent) -> CasinoResult<DepositOutcome> {
        if !event.amount.is_finite() || event.amount <= 0.0 {
            return Err(CasinoError::validation("deposit amount must be positive"));
        }
        if event.deposit_id.trim().is_empty() {
            return Err(CasinoError::validation("deposit id is required"));
        }

        let ledger = self.services.settlements();
        ledger.begin(&event)?;

        let handle = match self.services.accounts().get(&event.account_id) {
            Ok(handle) => handle,
            Err(err) => {
                warn!(deposit = %event.deposit_id, account = %event.account_id, "Deposit for unknown account");
                ledger.fail(&event.deposit_id, err.to_string());
                return Err(err);
            }
        };

        let now = Utc::now();
        let amount = event.amount;
        let bonus = &self.services.config().bonus;

        let (mut outcome, referrer_code) = {
            let mut account = handle.lock().await;
            account.deposit_balance += amount;
            account.total_deposited += amount;
            account.last_deposit_at = Some(now);
            account.record(
                JournalKind::Deposit { deposit_id: event.deposit_id.clone() },
                amount,
                now,
            );
            let first_deposit = referral::is_first_deposit(account.total_deposited, amount);

            let promo_bonus = event
                .promo_code
                .as_deref()
                .filter(|code| !code.trim().is_empty())
                .and_then(|code| self.services.promos().apply_to_deposit(&mut account, code, amount, now))
                .map(|activation| activation.reward);

            let cashback = cashback::accrue(&mut account, &bonus.cashback_tiers, amount, now);

            let outcome = DepositOutcome {
                deposit_id: event.deposit_id.clone(),
                amount,
                cashback,
                promo_bonus,
                referral_bonus: None,
                first_deposit,
                balance: account.balance_view(),
            };
            (outcome, account.referrer.clone())
        };

        // The depositor's lock is released before the referrer's is taken
        if let Some(code) = referrer_code {
            match self.services.accounts().find_by_ref_code(&code) {
                Some(referrer) => {
                    let mut referrer = referrer.lock().await;
                    outcome.referral_bonus = self.services.referral().credit(
                        &mut referrer,
                        &event.account_id,
                        &event.deposit_id,
                        amount,
                        outcome.first_deposit,
                        now,
                    );
                }
                None => debug!(account = %event.account_id, code = %code, "Referrer missing, commission skipped"),
            }
        }

        ledger.complete(&event.deposit_id, outcome.clone());
        info!(
            deposit = %event.deposit_id,
            account = %event.account_id,
            amount,
            cashback = outcome.cashback,
            first = outcome.first_deposit,
            "Deposit settled"
        );
        Ok(outcome)
    }

    pub async fn withdraw(&self, id: &AccountId, request: WithdrawRequest) -> CasinoResult<PayoutRequest> {
        self.services.limiter().check(id, "withdraw")?;
        let handle = self.services.accounts().get(id)?;
        let mut account = handle.lock().await;
        account.ensure_active()?;

        let config = self.services.config();
        let now = Utc::now();
        if config.bonus.require_monthly_deposit && !account.deposited_in_month_of(now) {
            return Err(CasinoError::validation("a deposit this month is required to withdraw"));
        }
        if request.destination.trim().is_empty() {
            return Err(CasinoError::validation("payout destination is required"));
        }

        let split = account.withdraw(request.amount, config.limits.min_withdrawal)?;
        let payout = PayoutRequest {
            id: Uuid::new_v4().to_string(),
            account_id: id.clone(),
            amount: request.amount,
            split,
            destination: request.destination.trim().to_string(),
            method: request.method,
            status: PayoutStatus::Pending,
            created_at: now,
        };
        account.record(
            JournalKind::Withdrawal { payout_id: payout.id.clone() },
            -request.amount,
            now,
        );
        self.services.settlements().record_payout(payout.clone());
        info!(
            account = %id,
            payout = %payout.id,
            amount = payout.amount,
            from_deposit = split.from_deposit,
            from_promo = split.from_promo,
            "Withdrawal recorded"
        );
        Ok(payout)
    }

    pub async fn withdraw_info(&self, id: &AccountId) -> CasinoResult<WithdrawInfo> {
        let handle = self.services.authenticate(id);
        let account = handle.lock().await;
        Ok(WithdrawInfo {
            withdrawable: account.withdrawable(),
            balance: account.balance_view(),
            min_withdrawal: self.services.config().limits.min_withdrawal,
            promo_limit: account.promo_withdrawal_limit,
            has_deposit_this_month: account.deposited_in_month_of(Utc::now()),
        })
    }

    pub fn withdraw_history(&self, id: &AccountId) -> Vec<PayoutRequest> {
        self.services.settlements().payouts_for(id, 20)
    }

    /// Result reported by the payout consumer. A failed transfer puts the
    /// withdrawn split back on the account.
    pub async fn finish_payout(&self, payout_id: &str, success: bool) -> CasinoResult<PayoutRequest> {
        let status = if success { PayoutStatus::Completed } else { PayoutStatus::Failed };
        let payout = self.services.settlements().finish_payout(payout_id, status)?;

        if !success {
            let handle = self.services.accounts().get(&payout.account_id)?;
            let mut account = handle.lock().await;
            account.refund(&payout.split);
            account.record(
                JournalKind::Refund { reference: payout.id.clone() },
                payout.split.total(),
                Utc::now(),
            );
            warn!(payout = %payout.id, account = %payout.account_id, amount = payout.amount, "Payout failed, funds returned");
        } else {
            info!(payout = %payout.id, account = %payout.account_id, "Payout completed");
        }
        Ok(payout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WagerlineConfig;

    fn event(id: &str, account: &str, amount: f64) -> DepositEvent {
        DepositEvent {
            deposit_id: id.to_string(),
            account_id: AccountId::from(account),
            amount,
            promo_code: None,
        }
    }

    fn service() -> (Arc<ServiceContainer>, SettlementService) {
        let services = Arc::new(ServiceContainer::new(WagerlineConfig::testing()).unwrap());
        (services.clone(), SettlementService::new(services))
    }

    #[test]
    fn test_begin_transitions() {
        let ledger = SettlementLedger::new();
        let ev = event("d1", "a", 10.0);

        ledger.register_pending(&ev);
        assert_eq!(ledger.deposit("d1").unwrap().status, SettlementStatus::Pending);
        assert!(ledger.begin(&ev).is_ok());
        assert!(ledger.begin(&ev).unwrap_err().is_benign());

        ledger.fail("d1", "account missing");
        assert!(ledger.begin(&ev).is_ok());
    }

    #[tokio::test]
    async fn test_duplicate_deposit_is_stale() {
        let (services, settlement) = service();
        services.authenticate(&AccountId::from("p"));

        let first = settlement.settle_deposit(event("dep-1", "p", 1_000.0)).await.unwrap();
        assert!(first.first_deposit);
        assert_eq!(first.cashback, 50.0);

        let err = settlement.settle_deposit(event("dep-1", "p", 1_000.0)).await.unwrap_err();
        assert!(err.is_benign());

        let summary = services.account_summary(&AccountId::from("p")).await.unwrap();
        assert_eq!(summary.balance.deposit_balance, 1_000.0);
        assert_eq!(summary.cashback_pool, 50.0);
    }

    #[tokio::test]
    async fn test_unknown_account_marks_failed() {
        let (services, settlement) = service();
        let err = settlement.settle_deposit(event("dep-x", "ghost", 100.0)).await.unwrap_err();
        assert!(matches!(err, CasinoError::NotFound(_)));
        assert!(matches!(
            services.settlements().deposit("dep-x").unwrap().status,
            SettlementStatus::Failed { .. }
        ));
    }

    #[tokio::test]
    async fn test_invalid_deposit_amount() {
        let (_, settlement) = service();
        assert!(matches!(
            settlement.settle_deposit(event("dep-neg", "p", -5.0)).await,
            Err(CasinoError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_withdraw_and_failed_payout_refund() {
        let (services, settlement) = service();
        let id = AccountId::from("w");
        services.authenticate(&id);
        settlement.settle_deposit(event("dep-w", "w", 500.0)).await.unwrap();

        let request = WithdrawRequest {
            amount: 200.0,
            destination: "4111 1111".into(),
            method: "card".into(),
        };
        let payout = settlement.withdraw(&id, request).await.unwrap();
        assert_eq!(payout.split.from_deposit, 200.0);
        assert_eq!(settlement.withdraw_info(&id).await.unwrap().balance.deposit_balance, 300.0);

        let failed = settlement.finish_payout(&payout.id, false).await.unwrap();
        assert_eq!(failed.status, PayoutStatus::Failed);
        assert_eq!(settlement.withdraw_info(&id).await.unwrap().balance.deposit_balance, 500.0);

        assert!(settlement.finish_payout(&payout.id, true).await.unwrap_err().is_benign());
        assert_eq!(settlement.withdraw_history(&id).len(), 1);
    }

    #[tokio::test]
    async fn test_withdraw_rules() {
        let mut config = WagerlineConfig::testing();
        config.bonus.require_monthly_deposit = true;
        let services = Arc::new(ServiceContainer::new(config).unwrap());
        let settlement = SettlementService::new(services.clone());
        let id = AccountId::from("r");
        let handle = services.authenticate(&id);
        handle.lock().await.deposit_balance = 1_000.0;

        let request = |amount: f64, destination: &str| WithdrawRequest {
            amount,
            destination: destination.to_string(),
            method: "sbp".into(),
        };

        // No deposit this month yet
        assert!(matches!(settlement.withdraw(&id, request(200.0, "x")).await, Err(CasinoError::Validation(_))));

        handle.lock().await.last_deposit_at = Some(Utc::now());
        assert!(matches!(settlement.withdraw(&id, request(200.0, " ")).await, Err(CasinoError::Validation(_))));
        assert!(matches!(settlement.withdraw(&id, request(100.0, "x")).await, Err(CasinoError::Validation(_))));
        assert!(matches!(
            settlement.withdraw(&id, request(5_000.0, "x")).await,
            Err(CasinoError::InsufficientFunds { .. })
        ));

        handle.lock().await.banned = true;
        assert!(matches!(settlement.withdraw(&id, request(200.0, "x")).await, Err(CasinoError::Forbidden(_))));
    }

    #[tokio::test]
    async fn test_withdraw_checks_run_in_order() {
        let mut config = WagerlineConfig::testing();
        config.bonus.require_monthly_deposit = true;
        let services = Arc::new(ServiceContainer::new(config).unwrap());
        let settlement = SettlementService::new(services.clone());
        let id = AccountId::from("order");
        let handle = services.authenticate(&id);
        handle.lock().await.deposit_balance = 50.0;

        let request = |amount: f64, destination: &str| WithdrawRequest {
            amount,
            destination: destination.to_string(),
            method: "card".into(),
        };
        let message = |err: CasinoError| match err {
            CasinoError::Validation(msg) => msg,
            other => panic!("expected validation error, got {:?}", other),
        };

        // Each case also breaks every later rule
        handle.lock().await.banned = true;
        assert!(matches!(
            settlement.withdraw(&id, request(1.0, "")).await,
            Err(CasinoError::Forbidden(_))
        ));

        handle.lock().await.banned = false;
        let err = settlement.withdraw(&id, request(1.0, "")).await.unwrap_err();
        assert!(message(err).contains("deposit this month"));

        handle.lock().await.last_deposit_at = Some(Utc::now());
        let err = settlement.withdraw(&id, request(1.0, "")).await.unwrap_err();
        assert!(message(err).contains("destination"));

        let err = settlement.withdraw(&id, request(100.0, "x")).await.unwrap_err();
        assert!(message(err).contains("minimum withdrawal"));

        assert!(matches!(
            settlement.withdraw(&id, request(200.0, "x")).await,
            Err(CasinoError::InsufficientFunds { .. })
        ));
        assert_eq!(handle.lock().await.deposit_balance, 50.0);
    }

    #[tokio::test]
    async fn test_completed_deposits_are_retained() {
        let (services, settlement) = service();
        let id = AccountId::from("keep");
        services.authenticate(&id);
        settlement.settle_deposit(event("dep-old", "keep", 100.0)).await.unwrap();
        for n in 0..50 {
            settlement
                .settle_deposit(event(&format!("dep-{}", n), "keep", 1.0))
                .await
                .unwrap();
        }

        assert!(settlement.settle_deposit(event("dep-old", "keep", 100.0)).await.unwrap_err().is_benign());
        assert_eq!(
            services.settlements().deposit("dep-old").unwrap().status,
            SettlementStatus::Completed
        );
        assert_eq!(services.account_summary(&id).await.unwrap().balance.deposit_balance, 150.0);
    }
}
