//! Shared traits and interfaces
//!
//! Ports the core consumes from its host: the settings provider that owns
//! per-game RTP and bank state, and the rate limiter consulted before any
//! request is processed.

use crate::common::types::AccountId;
use crate::errors::{CasinoError, CasinoResult};
use crate::games::types::GameType;
use crate::settings::GameSettings;
use async_trait::async_trait;

/// Source of per-game RTP, bank reserve and audit counters
#[async_trait]
pub trait SettingsProvider: Send + Sync {
    /// Current settings of one game
    async fn game_settings(&self, game: GameType) -> CasinoResult<GameSettings>;

    /// Replace the RTP of a game; values outside [10, 99.9] are rejected
    async fn update_rtp(&self, game: GameType, rtp: f64) -> CasinoResult<()>;

    /// Apply a resolved bet to the bank reserve and the cumulative counters
    async fn record_outcome(&self, game: GameType, bet: f64, win: f64, promotional: bool) -> CasinoResult<()>;

    /// Settings of every game, for the realised RTP report
    async fn all_settings(&self) -> CasinoResult<Vec<GameSettings>> {
        let mut out = Vec::with_capacity(GameType::ALL.len());
        for game in GameType::ALL {
            out.push(self.game_settings(game).await?);
        }
        Ok(out)
    }
}

/// Anti-abuse gate called before a request reaches the core
pub trait RateLimiter: Send + Sync {
    fn check(&self, account: &AccountId, action: &str) -> CasinoResult<()>;
}

/// Rate limiter that admits everything
#[derive(Debug, Default, Clone, Copy)]
pub struct Unlimited;

impl RateLimiter for Unlimited {
    fn check(&self, _account: &AccountId, _action: &str) -> CasinoResult<()> {
        Ok(())
    }
}

/// Rate limiter that rejects a fixed set of accounts; handy in tests
#[derive(Debug, Default, Clone)]
pub struct DenyList {
    denied: Vec<AccountId>,
}

impl DenyList {
    pub fn new(denied: impl IntoIterator<Item = AccountId>) -> Self {
        Self { denied: denied.into_iter().collect() }
    }
}

impl RateLimiter for DenyList {
    fn check(&self, account: &AccountId, action: &str) -> CasinoResult<()> {
        if self.denied.contains(account) {
            return Err(CasinoError::RateLimited(format!("{} for {}", action, account)));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unlimited_admits() {
        assert!(Unlimited.check(&AccountId::from("a"), "dice").is_ok());
    }

    #[test]
    fn test_deny_list() {
        let limiter = DenyList::new([AccountId::from("spammer")]);
        assert!(limiter.check(&AccountId::from("a"), "dice").is_ok());
        assert!(matches!(
            limiter.check(&AccountId::from("spammer"), "dice"),
            Err(CasinoError::RateLimited(_))
        ));
    }
}
