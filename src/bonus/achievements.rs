//! Achievements unlocked by play history and claimed for a one-off reward.
//!
//! Unlocking is checked lazily against the running [`PlayStats`] kept on the
//! account whenever the player looks at or claims achievements.

use crate::errors::{CasinoError, CasinoResult};
use crate::games::types::GameType;
use crate::ledger::{Account, JournalKind};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;
use tracing::info;

pub const HIGH_ROLLER_BET: f64 = 500.0;
pub const BIG_WIN: f64 = 500.0;
pub const LUCKY_STREAK: u32 = 5;
pub const VETERAN_BETS: u32 = 100;
pub const WEEK_STREAK: u32 = 7;

/// Wager requirement on achievement rewards, as a multiple of the reward
pub const ACHIEVEMENT_WAGER_MULTIPLIER: f64 = 1.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Achievement {
    FirstWin,
    HighRoller,
    LuckyStreak,
    BigWin,
    Explorer,
    Veteran,
    WeekStreak,
}

impl Achievement {
    pub const ALL: [Achievement; 7] = [
        Achievement::FirstWin,
        Achievement::HighRoller,
        Achievement::LuckyStreak,
        Achievement::BigWin,
        Achievement::Explorer,
        Achievement::Veteran,
        Achievement::WeekStreak,
    ];

    pub fn id(self) -> &'static str {
        match self {
            Achievement::FirstWin => "first_win",
            Achievement::HighRoller => "high_roller",
            Achievement::LuckyStreak => "lucky_streak",
            Achievement::BigWin => "big_win",
            Achievement::Explorer => "explorer",
            Achievement::Veteran => "veteran",
            Achievement::WeekStreak => "week_streak",
        }
    }

    pub fn reward(self) -> f64 {
        match self {
            Achievement::FirstWin => 5.0,
            Achievement::HighRoller => 12.0,
            Achievement::LuckyStreak => 25.0,
            Achievement::BigWin => 17.0,
            Achievement::Explorer => 7.0,
            Achievement::Veteran => 37.0,
            Achievement::WeekStreak => 50.0,
        }
    }

    pub fn description(self) -> String {
        match self {
            Achievement::FirstWin => "Win a game".to_string(),
            Achievement::HighRoller => format!("Place a bet of {} or more", HIGH_ROLLER_BET),
            Achievement::LuckyStreak => format!("Win {} games in a row", LUCKY_STREAK),
            Achievement::BigWin => format!("Win {} or more in one game", BIG_WIN),
            Achievement::Explorer => "Play every game".to_string(),
            Achievement::Veteran => format!("Place {} bets", VETERAN_BETS),
            Achievement::WeekStreak => format!("Claim the daily bonus {} days running", WEEK_STREAK),
        }
    }

    fn reached(self, stats: &PlayStats, daily_streak: u32) -> bool {
        match self {
            Achievement::FirstWin => stats.wins >= 1,
            Achievement::HighRoller => stats.max_bet >= HIGH_ROLLER_BET,
            Achievement::LuckyStreak => stats.best_win_streak >= LUCKY_STREAK,
            Achievement::BigWin => stats.max_win >= BIG_WIN,
            Achievement::Explorer => GameType::ALL.iter().all(|g| stats.games.contains(g)),
            Achievement::Veteran => stats.bets >= VETERAN_BETS,
            Achievement::WeekStreak => daily_streak >= WEEK_STREAK,
        }
    }
}

impl fmt::Display for Achievement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for Achievement {
    type Err = CasinoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Achievement::ALL
            .into_iter()
            .find(|a| a.id() == s)
            .ok_or_else(|| CasinoError::not_found(format!("achievement {}", s)))
    }
}

/// Running play statistics, updated once per resolved bet
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlayStats {
    pub bets: u32,
    pub wins: u32,
    pub max_bet: f64,
    pub max_win: f64,
    pub win_streak: u32,
    pub best_win_streak: u32,
    pub games: HashSet<GameType>,
}

impl PlayStats {
    pub fn record(&mut self, game: GameType, bet: f64, win: f64) {
        self.bets += 1;
        self.max_bet = self.max_bet.max(bet);
        self.max_win = self.max_win.max(win);
        self.games.insert(game);
        if win > 0.0 {
            self.wins += 1;
            self.win_streak += 1;
            self.best_win_streak = self.best_win_streak.max(self.win_streak);
        } else {
            self.win_streak = 0;
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AchievementView {
    pub id: Achievement,
    pub description: String,
    pub reward: f64,
    pub unlocked: bool,
    pub claimed: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AchievementClaim {
    pub achievement: Achievement,
    pub reward: f64,
}

/// Unlock everything the account has reached; returns the new ones
pub fn unlock(account: &mut Account) -> Vec<Achievement> {
    let streak = account.daily.streak;
    let fresh: Vec<Achievement> = Achievement::ALL
        .into_iter()
        .filter(|a| !account.achievements.contains(a) && a.reached(&account.stats, streak))
        .collect();
    for achievement in &fresh {
        account.achievements.insert(*achievement);
        info!(account = %account.id, achievement = %achievement, "Achievement unlocked");
    }
    fresh
}

pub fn overview(account: &Account) -> Vec<AchievementView> {
    Achievement::ALL
        .into_iter()
        .map(|a| AchievementView {
            id: a,
            description: a.description(),
            reward: a.reward(),
            unlocked: account.achievements.contains(&a),
            claimed: account.claimed_achievements.contains(&a),
        })
        .collect()
}

/// Pay out an unlocked achievement as promo funds. A second claim is stale.
pub fn claim(
    account: &mut Account,
    achievement: Achievement,
    require_monthly_deposit: bool,
    now: DateTime<Utc>,
) -> CasinoResult<AchievementClaim> {
    if require_monthly_deposit && !account.deposited_in_month_of(now) {
        return Err(CasinoError::validation("a deposit this month is required to claim achievements"));
    }
    unlock(account);
    if !account.achievements.contains(&achievement) {
        return Err(CasinoError::validation(format!("achievement {} is not unlocked", achievement)));
    }
    if !account.claimed_achievements.insert(achievement) {
        return Err(CasinoError::stale(format!("achievement {} already claimed", achievement)));
    }

    let reward = achievement.reward();
    account.promo_balance += reward;
    account.add_wager(reward * ACHIEVEMENT_WAGER_MULTIPLIER);
    account.record(JournalKind::Achievement { achievement }, reward, now);
    info!(account = %account.id, achievement = %achievement, reward, "Achievement claimed");
    Ok(AchievementClaim { achievement, reward })
}
