//! Bonus programs: deposit cashback, referral commissions, promo codes,
//! the daily login streak and achievements.

pub mod achievements;
pub mod cashback;
pub mod daily;
pub mod promo;
pub mod referral;
pub mod tiers;

use crate::common::types::AccountId;
use crate::errors::CasinoResult;
use crate::games::types::BalanceView;
use crate::services::ServiceContainer;
use achievements::{Achievement, AchievementClaim, AchievementView};
use cashback::CashbackStatus;
use chrono::Utc;
use daily::DailyClaim;
use promo::PromoActivation;
use referral::{ReferralEntry, ReferralList, ReferralStatus, REFERRAL_LIST_LIMIT};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// A bonus result together with the balances after it was applied
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Credited<T> {
    #[serde(flatten)]
    pub detail: T,
    pub balance: BalanceView,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CashbackClaim {
    pub amount: f64,
}

/// Player-initiated bonus operations
#[derive(Clone)]
pub struct BonusService {
    services: Arc<ServiceContainer>,
}

impl BonusService {
    pub fn new(services: Arc<ServiceContainer>) -> Self {
        Self { services }
    }

    pub async fn activate_promo(&self, id: &AccountId, code: &str) -> CasinoResult<Credited<PromoActivation>> {
        self.services.limiter().check(id, "promo")?;
        let handle = self.services.authenticate(id);
        let mut account = handle.lock().await;
        account.ensure_active()?;
        let detail = self.services.promos().activate(&mut account, code, Utc::now())?;
        Ok(Credited {
            detail,
            balance: account.balance_view(),
        })
    }

    pub async fn cashback_status(&self, id: &AccountId) -> CasinoResult<CashbackStatus> {
        let handle = self.services.authenticate(id);
        let account = handle.lock().await;
        let config = self.services.config();
        Ok(cashback::status(
            &account,
            &config.bonus.cashback_tiers,
            config.limits.cashback_min_claim,
        ))
    }

    pub async fn claim_cashback(&self, id: &AccountId) -> CasinoResult<Credited<CashbackClaim>> {
        self.services.limiter().check(id, "cashback")?;
        let handle = self.services.authenticate(id);
        let mut account = handle.lock().await;
        account.ensure_active()?;
        let config = self.services.config();
        let amount = cashback::claim(
            &mut account,
            config.limits.cashback_min_claim,
            config.bonus.require_monthly_deposit,
            Utc::now(),
        )?;
        Ok(Credited {
            detail: CashbackClaim { amount },
            balance: account.balance_view(),
        })
    }

    pub async fn referral_status(&self, id: &AccountId) -> CasinoResult<ReferralStatus> {
        let handle = self.services.authenticate(id);
        let account = handle.lock().await;
        Ok(self.services.referral().status(&account))
    }

    /// Accounts invited by the caller, newest first
    pub async fn referral_list(&self, id: &AccountId) -> CasinoResult<ReferralList> {
        let (code, deposited_count) = {
            let handle = self.services.authenticate(id);
            let account = handle.lock().await;
            (account.ref_code.clone(), account.deposited_refs)
        };

        let invited = self.services.accounts().invited_by(&code);
        let mut referrals = Vec::with_capacity(invited.len().min(REFERRAL_LIST_LIMIT));
        for handle in invited.iter().take(REFERRAL_LIST_LIMIT) {
            referrals.push(ReferralEntry::of(&*handle.lock().await));
        }
        Ok(ReferralList {
            referrals,
            total_count: invited.len(),
            deposited_count,
        })
    }

    pub async fn achievements(&self, id: &AccountId) -> CasinoResult<Vec<AchievementView>> {
        let handle = self.services.authenticate(id);
        let mut account = handle.lock().await;
        achievements::unlock(&mut account);
        Ok(achievements::overview(&account))
    }

    pub async fn claim_achievement(&self, id: &AccountId, achievement: &str) -> CasinoResult<Credited<AchievementClaim>> {
        let achievement: Achievement = achievement.parse()?;
        self.services.limiter().check(id, "achievement")?;
        let handle = self.services.authenticate(id);
        let mut account = handle.lock().await;
        account.ensure_active()?;
        let detail = achievements::claim(
            &mut account,
            achievement,
            self.services.config().bonus.require_monthly_deposit,
            Utc::now(),
        )?;
        Ok(Credited {
            detail,
            balance: account.balance_view(),
        })
    }

    pub async fn claim_daily(&self, id: &AccountId) -> CasinoResult<Credited<DailyClaim>> {
        self.services.limiter().check(id, "daily")?;
        let handle = self.services.authenticate(id);
        let mut account = handle.lock().await;
        account.ensure_active()?;
        let detail = daily::claim(&mut account, &self.services.config().bonus.daily_rewards, Utc::now())?;
        Ok(Credited {
            detail,
            balance: account.balance_view(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WagerlineConfig;
    use crate::errors::CasinoError;

    fn bonus() -> (Arc<ServiceContainer>, BonusService) {
        let services = Arc::new(ServiceContainer::new(WagerlineConfig::testing()).unwrap());
        (services.clone(), BonusService::new(services))
    }

    #[tokio::test]
    async fn test_welcome_code_and_repeat() {
        let (_, bonus) = bonus();
        let id = AccountId::from("promo-user");
        let credited = bonus.activate_promo(&id, "welcome").await.unwrap();
        assert_eq!(credited.detail.reward, 50.0);
        assert_eq!(credited.balance.promo_balance, 50.0);
        assert_eq!(credited.balance.wager, 150.0);

        assert!(matches!(bonus.activate_promo(&id, "WELCOME").await, Err(CasinoError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_cashback_claim_through_service() {
        let (services, bonus) = bonus();
        let id = AccountId::from("cb");
        services.authenticate(&id).lock().await.cashback_pool = 25.0;

        assert!(bonus.cashback_status(&id).await.unwrap().can_claim);
        let claimed = bonus.claim_cashback(&id).await.unwrap();
        assert_eq!(claimed.detail.amount, 25.0);
        assert_eq!(claimed.balance.deposit_balance, 25.0);
        assert!(!bonus.cashback_status(&id).await.unwrap().can_claim);
    }

    #[tokio::test]
    async fn test_banned_account_cannot_claim() {
        let (services, bonus) = bonus();
        let id = AccountId::from("banned");
        services.authenticate(&id);
        services.accounts().set_banned(&id, true).await.unwrap();
        assert!(matches!(bonus.claim_daily(&id).await, Err(CasinoError::Forbidden(_))));
    }

    #[tokio::test]
    async fn test_daily_once_per_day() {
        let (_, bonus) = bonus();
        let id = AccountId::from("daily");
        let first = bonus.claim_daily(&id).await.unwrap();
        assert_eq!(first.detail.reward, 2.0);
        assert!(matches!(bonus.claim_daily(&id).await, Err(CasinoError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_referral_list_counts() {
        let (services, bonus) = bonus();
        let parent = AccountId::from("parent");
        let code = services.authenticate(&parent).lock().await.ref_code.clone();
        for child in ["kid-one", "kid-two", "kid-three"] {
            services.accounts().get_or_create(&AccountId::from(child), Some(&code));
        }
        {
            let handle = services.accounts().get(&AccountId::from("kid-two")).unwrap();
            handle.lock().await.total_deposited = 100.0;
        }
        services.authenticate(&parent).lock().await.deposited_refs = 1;

        let list = bonus.referral_list(&parent).await.unwrap();
        assert_eq!(list.total_count, 3);
        assert_eq!(list.deposited_count, 1);
        let shown: Vec<&str> = list.referrals.iter().map(|r| r.account.as_str()).collect();
        assert_eq!(shown, vec!["kid-thre...", "kid-two", "kid-one"]);
        assert!(list.referrals[1].has_deposited);
    }

    #[tokio::test]
    async fn test_achievement_claim_through_service() {
        let (services, bonus) = bonus();
        let id = AccountId::from("achiever");
        assert!(matches!(bonus.claim_achievement(&id, "unknown").await, Err(CasinoError::NotFound(_))));
        assert!(matches!(
            bonus.claim_achievement(&id, "first_win").await,
            Err(CasinoError::Validation(_))
        ));

        services
            .authenticate(&id)
            .lock()
            .await
            .stats
            .record(crate::games::types::GameType::Dice, 10.0, 20.0);
        let view = bonus.achievements(&id).await.unwrap();
        assert!(view.iter().any(|a| a.id == Achievement::FirstWin && a.unlocked && !a.claimed));

        let credited = bonus.claim_achievement(&id, "first_win").await.unwrap();
        assert_eq!(credited.detail.reward, 5.0);
        assert_eq!(credited.balance.promo_balance, 5.0);
        assert!(bonus.claim_achievement(&id, "first_win").await.unwrap_err().is_benign());
    }

    #[tokio::test]
    async fn test_referral_status_view() {
        let (_, bonus) = bonus();
        let status = bonus.referral_status(&AccountId::from("r")).await.unwrap();
        assert_eq!(status.deposited_refs, 0);
        assert_eq!(status.level.current.unwrap().name, "Newbie");
        assert_eq!(status.level.next.unwrap().name, "Partner");
    }
}
