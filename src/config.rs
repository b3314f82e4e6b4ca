//! Configuration management with validation and defaults
//!
//! Centralized configuration for the betting core and its HTTP host

use crate::bonus::promo::{PromoCode, PromoReward};
use crate::bonus::tiers::Tier;
use crate::errors::ConfigurationError;
use crate::fairness::Rtp;
use crate::games::types::GameType;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Complete wagerline configuration
#[derive(Clone, Debug, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct WagerlineConfig {
    pub server: ServerConfig,
    pub limits: LimitsConfig,
    pub games: GamesConfig,
    pub bonus: BonusConfig,
    pub promos: Vec<PromoCode>,
}

/// HTTP host configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub cors_origins: Vec<String>,
    pub request_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            cors_origins: vec!["*".to_string()],
            request_timeout_secs: 30,
        }
    }
}

/// Monetary limits applied to bets, withdrawals and claims
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    pub min_bet: f64,
    pub max_bet: f64,
    pub crash_max_bet: f64,
    pub min_withdrawal: f64,
    pub promo_withdrawal_cap: f64,
    pub cashback_min_claim: f64,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            min_bet: 1.0,
            max_bet: 1_000_000.0,
            crash_max_bet: 10_000.0,
            min_withdrawal: 150.0,
            promo_withdrawal_cap: 300.0,
            cashback_min_claim: 1.0,
        }
    }
}

/// Starting RTP and bank reserve of one game
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    pub rtp: f64,
    pub bank: f64,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self { rtp: 97.0, bank: 10_000.0 }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct GamesConfig {
    pub dice: GameConfig,
    pub mines: GameConfig,
    pub tower: GameConfig,
    pub crash: GameConfig,
    pub x100: GameConfig,
    pub keno: GameConfig,
    pub bubbles: GameConfig,
}

impl GamesConfig {
    pub fn get(&self, game: GameType) -> &GameConfig {
        match game {
            GameType::Dice => &self.dice,
            GameType::Mines => &self.mines,
            GameType::Tower => &self.tower,
            GameType::Crash => &self.crash,
            GameType::X100 => &self.x100,
            GameType::Keno => &self.keno,
            GameType::Bubbles => &self.bubbles,
        }
    }

    pub fn get_mut(&mut self, game: GameType) -> &mut GameConfig {
        match game {
            GameType::Dice => &mut self.dice,
            GameType::Mines => &mut self.mines,
            GameType::Tower => &mut self.tower,
            GameType::Crash => &mut self.crash,
            GameType::X100 => &mut self.x100,
            GameType::Keno => &mut self.keno,
            GameType::Bubbles => &mut self.bubbles,
        }
    }
}

/// Bonus program tables
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct BonusConfig {
    pub cashback_tiers: Vec<Tier>,
    pub referral_tiers: Vec<Tier>,
    pub daily_rewards: Vec<f64>,
    pub promo_cooldown_hours: i64,
    /// Withdrawals and cashback claims need a deposit in the current month
    pub require_monthly_deposit: bool,
}

impl Default for BonusConfig {
    fn default() -> Self {
        Self {
            cashback_tiers: vec![
                Tier::new(0.0, 5.0, "Bronze"),
                Tier::new(5_000.0, 10.0, "Silver"),
                Tier::new(20_000.0, 15.0, "Gold"),
                Tier::new(50_000.0, 20.0, "Platinum"),
                Tier::new(100_000.0, 25.0, "Diamond"),
                Tier::new(200_000.0, 30.0, "Legend"),
            ],
            referral_tiers: vec![
                Tier::new(0.0, 10.0, "Newbie"),
                Tier::new(10.0, 20.0, "Partner"),
                Tier::new(25.0, 30.0, "Master"),
                Tier::new(50.0, 40.0, "Legend"),
            ],
            daily_rewards: vec![2.0, 4.0, 6.0, 10.0, 15.0, 20.0, 35.0],
            promo_cooldown_hours: 24,
            require_monthly_deposit: true,
        }
    }
}

impl WagerlineConfig {
    /// Configuration used by tests: no monthly deposit rule, deep bank reserves
    pub fn testing() -> Self {
        let mut config = Self::default();
        config.bonus.require_monthly_deposit = false;
        for game in GameType::ALL {
            config.games.get_mut(game).bank = 1_000_000_000.0;
        }
        config.promos = vec![PromoCode {
            code: "WELCOME".to_string(),
            reward: PromoReward::Fixed { amount: 50.0 },
            wager_multiplier: 3.0,
            limit: 1_000,
            used: 0,
            deposit_required: false,
        }];
        config
    }

    /// Validate configuration for logical consistency
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.server.port == 0 {
            return Err(ConfigurationError::InvalidValue {
                field: "server.port".to_string(),
                value: "0".to_string(),
                reason: "Port cannot be zero".to_string(),
            });
        }

        if self.server.request_timeout_secs == 0 {
            return Err(ConfigurationError::InvalidValue {
                field: "server.request_timeout_secs".to_string(),
                value: "0".to_string(),
                reason: "Timeout must be positive".to_string(),
            });
        }

        let limits = [
            ("limits.min_bet", self.limits.min_bet),
            ("limits.max_bet", self.limits.max_bet),
            ("limits.crash_max_bet", self.limits.crash_max_bet),
            ("limits.min_withdrawal", self.limits.min_withdrawal),
            ("limits.promo_withdrawal_cap", self.limits.promo_withdrawal_cap),
            ("limits.cashback_min_claim", self.limits.cashback_min_claim),
        ];
        for (field, value) in limits {
            if value.is_nan() || value <= 0.0 {
                return Err(ConfigurationError::InvalidValue {
                    field: field.to_string(),
                    value: value.to_string(),
                    reason: "Limit must be positive".to_string(),
                });
            }
        }

        if self.limits.max_bet < self.limits.min_bet {
            return Err(ConfigurationError::ValidationFailed(
                "limits.max_bet must not be below limits.min_bet".to_string(),
            ));
        }

        for game in GameType::ALL {
            let cfg = self.games.get(game);
            Rtp::new(cfg.rtp).map_err(|_| ConfigurationError::InvalidValue {
                field: format!("games.{}.rtp", game),
                value: cfg.rtp.to_string(),
                reason: "RTP must be within [10, 99.9]".to_string(),
            })?;
            if cfg.bank < 0.0 {
                return Err(ConfigurationError::InvalidValue {
                    field: format!("games.{}.bank", game),
                    value: cfg.bank.to_string(),
                    reason: "Bank reserve cannot be negative".to_string(),
                });
            }
        }

        validate_tiers("bonus.cashback_tiers", &self.bonus.cashback_tiers)?;
        validate_tiers("bonus.referral_tiers", &self.bonus.referral_tiers)?;

        if self.bonus.daily_rewards.is_empty() {
            return Err(ConfigurationError::MissingRequired("bonus.daily_rewards".to_string()));
        }

        if self.bonus.promo_cooldown_hours < 0 {
            return Err(ConfigurationError::InvalidValue {
                field: "bonus.promo_cooldown_hours".to_string(),
                value: self.bonus.promo_cooldown_hours.to_string(),
                reason: "Cooldown cannot be negative".to_string(),
            });
        }

        for promo in &self.promos {
            if promo.code.trim().is_empty() {
                return Err(ConfigurationError::MissingRequired("promos.code".to_string()));
            }
            if promo.wager_multiplier < 0.0 {
                return Err(ConfigurationError::InvalidValue {
                    field: format!("promos.{}.wager_multiplier", promo.code),
                    value: promo.wager_multiplier.to_string(),
                    reason: "Wager multiplier cannot be negative".to_string(),
                });
            }
        }

        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.server.request_timeout_secs)
    }
}

fn validate_tiers(field: &str, tiers: &[Tier]) -> Result<(), ConfigurationError> {
    if tiers.is_empty() {
        return Err(ConfigurationError::MissingRequired(field.to_string()));
    }
    if tiers[0].threshold != 0.0 {
        return Err(ConfigurationError::InvalidValue {
            field: field.to_string(),
            value: tiers[0].threshold.to_string(),
            reason: "First tier must start at 0".to_string(),
        });
    }
    for pair in tiers.windows(2) {
        if pair[1].threshold <= pair[0].threshold {
            return Err(ConfigurationError::ValidationFailed(format!(
                "{} thresholds must be strictly ascending",
                field
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = WagerlineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.limits.promo_withdrawal_cap, 300.0);
        assert_eq!(config.games.get(GameType::Crash).rtp, 97.0);
    }

    #[test]
    fn test_testing_config_is_valid() {
        let config = WagerlineConfig::testing();
        assert!(config.validate().is_ok());
        assert!(!config.bonus.require_monthly_deposit);
    }

    #[test]
    fn test_rtp_out_of_bounds_rejected() {
        let mut config = WagerlineConfig::default();
        config.games.dice.rtp = 9.9;
        assert!(config.validate().is_err());

        config.games.dice.rtp = 99.9;
        assert!(config.validate().is_ok());

        config.games.mines.rtp = 100.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_tiers_must_ascend() {
        let mut config = WagerlineConfig::default();
        config.bonus.referral_tiers.swap(1, 2);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_duration_conversion() {
        let config = WagerlineConfig::default();
        assert_eq!(config.request_timeout(), Duration::from_secs(30));
    }
}
