//! Ascending threshold tables shared by the cashback and referral programs.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tier {
    pub threshold: f64,
    pub percent: f64,
    pub name: String,
}

impl Tier {
    pub fn new(threshold: f64, percent: f64, name: &str) -> Self {
        Self {
            threshold,
            percent,
            name: name.to_string(),
        }
    }

    /// `amount * percent`, rounded down to cents
    pub fn share_of(&self, amount: f64) -> f64 {
        crate::common::types::round_money(amount * self.percent / 100.0)
    }
}

/// Last tier whose threshold is reached
pub fn level_for(tiers: &[Tier], value: f64) -> Option<&Tier> {
    tiers.iter().rev().find(|t| value >= t.threshold)
}

/// First tier not yet reached
pub fn next_level(tiers: &[Tier], value: f64) -> Option<&Tier> {
    tiers.iter().find(|t| t.threshold > value)
}

/// Current, next and all levels for a progress value
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LevelView {
    pub value: f64,
    pub current: Option<Tier>,
    pub next: Option<Tier>,
    pub levels: Vec<Tier>,
}

pub fn level_view(tiers: &[Tier], value: f64) -> LevelView {
    LevelView {
        value,
        current: level_for(tiers, value).cloned(),
        next: next_level(tiers, value).cloned(),
        levels: tiers.to_vec(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BonusConfig;

    #[test]
    fn test_last_matching_threshold_wins() {
        let tiers = BonusConfig::default().cashback_tiers;
        assert_eq!(level_for(&tiers, 0.0).unwrap().name, "Bronze");
        assert_eq!(level_for(&tiers, 4_999.99).unwrap().name, "Bronze");
        assert_eq!(level_for(&tiers, 5_000.0).unwrap().name, "Silver");
        assert_eq!(level_for(&tiers, 1_000_000.0).unwrap().name, "Legend");
        assert_eq!(next_level(&tiers, 5_000.0).unwrap().name, "Gold");
        assert!(next_level(&tiers, 200_000.0).is_none());
    }

    #[test]
    fn test_referral_levels() {
        let tiers = BonusConfig::default().referral_tiers;
        assert_eq!(level_for(&tiers, 9.0).unwrap().percent, 10.0);
        assert_eq!(level_for(&tiers, 10.0).unwrap().percent, 20.0);
        assert_eq!(level_for(&tiers, 50.0).unwrap().percent, 40.0);
    }

    #[test]
    fn test_share_of_rounds_down() {
        let tier = Tier::new(0.0, 5.0, "Bronze");
        assert_eq!(tier.share_of(333.33), 16.66);
    }
}
