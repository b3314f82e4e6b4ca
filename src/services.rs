//! Service layer providing dependency injection
//!
//! `ServiceContainer` owns every shared component of the betting core. The
//! game controller, the settlement service and the bonus service each hold an
//! `Arc` of it. `ServiceBuilder` swaps in test doubles for the random source,
//! the settings provider and the rate limiter.

use crate::accounts::{AccountHandle, AccountStore};
use crate::bonus::promo::PromoRegistry;
use crate::bonus::referral::ReferralProgram;
use crate::common::config::ConfigLoader;
use crate::common::traits::{RateLimiter, SettingsProvider, Unlimited};
use crate::common::types::AccountId;
use crate::config::WagerlineConfig;
use crate::errors::CasinoResult;
use crate::fairness::FairnessEngine;
use crate::games::session::SessionStore;
use crate::games::types::{BalanceView, GameType};
use crate::ledger::{Account, Withdrawable};
use crate::random::{OsRandom, RandomSource};
use crate::settings::InMemorySettings;
use crate::settlement::SettlementLedger;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

/// Main service container
pub struct ServiceContainer {
    config: WagerlineConfig,
    accounts: AccountStore,
    sessions: SessionStore,
    settings: Arc<dyn SettingsProvider>,
    engine: FairnessEngine,
    referral: ReferralProgram,
    promos: PromoRegistry,
    settlements: SettlementLedger,
    limiter: Arc<dyn RateLimiter>,
}

impl ServiceContainer {
    /// Create a container with production collaborators
    pub fn new(config: WagerlineConfig) -> CasinoResult<Self> {
        ServiceBuilder::new().with_config(config).build()
    }

    fn assemble(
        config: WagerlineConfig,
        random: Arc<dyn RandomSource>,
        settings: Arc<dyn SettingsProvider>,
        limiter: Arc<dyn RateLimiter>,
    ) -> Self {
        let accounts = AccountStore::new(config.limits.promo_withdrawal_cap);
        let referral = ReferralProgram::new(config.bonus.referral_tiers.clone());
        let promos = PromoRegistry::new(config.promos.clone(), config.bonus.promo_cooldown_hours);
        Self {
            accounts,
            sessions: SessionStore::new(),
            settings,
            engine: FairnessEngine::new(random),
            referral,
            promos,
            settlements: SettlementLedger::new(),
            limiter,
            config,
        }
    }

    pub fn config(&self) -> &WagerlineConfig {
        &self.config
    }

    pub fn accounts(&self) -> &AccountStore {
        &self.accounts
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    pub fn settings(&self) -> Arc<dyn SettingsProvider> {
        Arc::clone(&self.settings)
    }

    pub fn engine(&self) -> &FairnessEngine {
        &self.engine
    }

    pub fn referral(&self) -> &ReferralProgram {
        &self.referral
    }

    pub fn promos(&self) -> &PromoRegistry {
        &self.promos
    }

    pub fn settlements(&self) -> &SettlementLedger {
        &self.settlements
    }

    pub fn limiter(&self) -> Arc<dyn RateLimiter> {
        Arc::clone(&self.limiter)
    }

    /// Resolve an authenticated caller to its account, creating it on first sight
    pub fn authenticate(&self, id: &AccountId) -> AccountHandle {
        self.accounts.get_or_create(id, None).0
    }

    /// Explicit registration; the referrer code only counts for new accounts
    pub async fn register(&self, id: &AccountId, referrer_code: Option<&str>) -> CasinoResult<Registration> {
        self.limiter.check(id, "register")?;
        let (handle, created) = self.accounts.get_or_create(id, referrer_code);
        let account = handle.lock().await;
        Ok(Registration {
            created,
            account: AccountSummary::from(&*account),
        })
    }

    pub async fn account_summary(&self, id: &AccountId) -> CasinoResult<AccountSummary> {
        let handle = self.authenticate(id);
        let account = handle.lock().await;
        Ok(AccountSummary::from(&*account))
    }

    /// Configured against realised RTP for every game
    pub async fn game_stats(&self) -> CasinoResult<Vec<GameStats>> {
        let settings = self.settings.all_settings().await?;
        Ok(settings
            .into_iter()
            .map(|s| GameStats {
                game: s.game,
                rtp: s.rtp.value(),
                bank: s.bank,
                total_bets: s.total_bets,
                total_wins: s.total_wins,
                realised_rtp: s.realised_rtp(),
            })
            .collect())
    }
}

/// Account as shown to its owner
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountSummary {
    pub id: AccountId,
    pub ref_code: String,
    pub referred: bool,
    pub balance: BalanceView,
    pub withdrawable: Withdrawable,
    pub total_deposited: f64,
    pub cashback_pool: f64,
    pub banned: bool,
    pub created_at: DateTime<Utc>,
}

impl From<&Account> for AccountSummary {
    fn from(account: &Account) -> Self {
        Self {
            id: account.id.clone(),
            ref_code: account.ref_code.clone(),
            referred: account.referrer.is_some(),
            balance: account.balance_view(),
            withdrawable: account.withdrawable(),
            total_deposited: account.total_deposited,
            cashback_pool: account.cashback_pool,
            banned: account.banned,
            created_at: account.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Registration {
    pub created: bool,
    pub account: AccountSummary,
}

/// Realised RTP report line
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameStats {
    pub game: GameType,
    pub rtp: f64,
    pub bank: f64,
    pub total_bets: f64,
    pub total_wins: f64,
    pub realised_rtp: Option<f64>,
}

/// Service builder for creating configured service containers
#[derive(Default)]
pub struct ServiceBuilder {
    config: Option<WagerlineConfig>,
    config_path: Option<PathBuf>,
    random: Option<Arc<dyn RandomSource>>,
    settings: Option<Arc<dyn SettingsProvider>>,
    limiter: Option<Arc<dyn RateLimiter>>,
}

impl ServiceBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(mut self, config: WagerlineConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Load the configuration from a TOML file at build time
    pub fn with_config_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config_path = Some(path.into());
        self
    }

    /// Override the random source (useful for testing)
    pub fn with_random(mut self, random: Arc<dyn RandomSource>) -> Self {
        self.random = Some(random);
        self
    }

    /// Override the settings provider
    pub fn with_settings(mut self, settings: Arc<dyn SettingsProvider>) -> Self {
        self.settings = Some(settings);
        self
    }

    pub fn with_rate_limiter(mut self, limiter: Arc<dyn RateLimiter>) -> Self {
        self.limiter = Some(limiter);
        self
    }

    /// Build the service container; the configuration is validated first
    pub fn build(self) -> CasinoResult<ServiceContainer> {
        let config = match (self.config, self.config_path) {
            (Some(config), _) => config,
            (None, Some(path)) => ConfigLoader::new().with_path(path).load()?,
            (None, None) => WagerlineConfig::default(),
        };
        config.validate()?;

        let random = self.random.unwrap_or_else(|| Arc::new(OsRandom));
        let settings = self
            .settings
            .unwrap_or_else(|| Arc::new(InMemorySettings::new(config.games.clone())));
        let limiter = self.limiter.unwrap_or_else(|| Arc::new(Unlimited));

        info!(
            promos = config.promos.len(),
            min_bet = config.limits.min_bet,
            max_bet = config.limits.max_bet,
            "Service container ready"
        );
        Ok(ServiceContainer::assemble(config, random, settings, limiter))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::traits::DenyList;
    use crate::errors::CasinoError;

    #[tokio::test]
    async fn test_register_with_referrer() {
        let services = ServiceContainer::new(WagerlineConfig::testing()).unwrap();
        let parent = services.register(&AccountId::from("parent"), None).await.unwrap();
        assert!(parent.created);
        assert!(!parent.account.referred);

        let child = services
            .register(&AccountId::from("child"), Some(&parent.account.ref_code))
            .await
            .unwrap();
        assert!(child.account.referred);

        let again = services.register(&AccountId::from("child"), None).await.unwrap();
        assert!(!again.created);
        assert!(again.account.referred);
    }

    #[tokio::test]
    async fn test_unknown_referrer_is_ignored() {
        let services = ServiceContainer::new(WagerlineConfig::testing()).unwrap();
        let reg = services.register(&AccountId::from("solo"), Some("NOSUCH")).await.unwrap();
        assert!(!reg.account.referred);
    }

    #[tokio::test]
    async fn test_builder_rejects_invalid_config() {
        let mut config = WagerlineConfig::testing();
        config.games.dice.rtp = 5.0;
        assert!(ServiceBuilder::new().with_config(config).build().is_err());
    }

    #[tokio::test]
    async fn test_rate_limiter_is_consulted() {
        let services = ServiceBuilder::new()
            .with_config(WagerlineConfig::testing())
            .with_rate_limiter(Arc::new(DenyList::new([AccountId::from("spammer")])))
            .build()
            .unwrap();
        let err = services.register(&AccountId::from("spammer"), None).await.unwrap_err();
        assert!(matches!(err, CasinoError::RateLimited(_)));
    }

    #[tokio::test]
    async fn test_game_stats_cover_every_game() {
        let services = ServiceContainer::new(WagerlineConfig::testing()).unwrap();
        let stats = services.game_stats().await.unwrap();
        assert_eq!(stats.len(), GameType::ALL.len());
        assert!(stats.iter().all(|s| s.realised_rtp.is_none()));
    }
}
