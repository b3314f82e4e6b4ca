//! In-memory game settings: RTP, bank reserve and audit counters per game.
//!
//! Each game's state is a set of atomics; bank reserve updates are single
//! read-modify-write operations so concurrent bets never lose an update.

use crate::common::traits::SettingsProvider;
use crate::config::GamesConfig;
use crate::errors::CasinoResult;
use crate::fairness::Rtp;
use crate::games::types::GameType;
use async_trait::async_trait;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, info};

/// Share of a lost bet retained by the bank reserve
pub const BANK_LOSS_RETENTION: f64 = 0.75;

/// Snapshot of one game's settings
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct GameSettings {
    pub game: GameType,
    pub rtp: Rtp,
    pub bank: f64,
    pub total_bets: f64,
    pub total_wins: f64,
}

impl GameSettings {
    /// Realised RTP in percent, `None` before the first bet
    pub fn realised_rtp(&self) -> Option<f64> {
        if self.total_bets > 0.0 {
            Some(self.total_wins / self.total_bets * 100.0)
        } else {
            None
        }
    }
}

/// f64 stored as raw bits in an `AtomicU64`
#[derive(Debug, Default)]
struct AtomicF64(AtomicU64);

impl AtomicF64 {
    fn new(value: f64) -> Self {
        Self(AtomicU64::new(value.to_bits()))
    }

    fn load(&self) -> f64 {
        f64::from_bits(self.0.load(Ordering::Acquire))
    }

    fn store(&self, value: f64) {
        self.0.store(value.to_bits(), Ordering::Release);
    }

    fn fetch_add(&self, delta: f64) -> f64 {
        let previous = self
            .0
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |bits| {
                Some((f64::from_bits(bits) + delta).to_bits())
            })
            .unwrap_or_else(|bits| bits);
        f64::from_bits(previous)
    }
}

#[derive(Debug)]
struct GameState {
    rtp: AtomicF64,
    bank: AtomicF64,
    total_bets: AtomicF64,
    total_wins: AtomicF64,
}

/// Settings provider backed by process memory
pub struct InMemorySettings {
    games: DashMap<GameType, Arc<GameState>>,
    defaults: GamesConfig,
}

impl InMemorySettings {
    /// The configuration has already been validated, so default RTPs are in range.
    pub fn new(defaults: GamesConfig) -> Self {
        Self {
            games: DashMap::new(),
            defaults,
        }
    }

    /// Per-game state, created with the configured defaults on first use
    fn state(&self, game: GameType) -> Arc<GameState> {
        self.games
            .entry(game)
            .or_insert_with(|| {
                let cfg = self.defaults.get(game);
                debug!(game = %game, rtp = cfg.rtp, bank = cfg.bank, "Initialising game settings");
                Arc::new(GameState {
                    rtp: AtomicF64::new(cfg.rtp),
                    bank: AtomicF64::new(cfg.bank),
                    total_bets: AtomicF64::default(),
                    total_wins: AtomicF64::default(),
                })
            })
            .clone()
    }
}

#[async_trait]
impl SettingsProvider for InMemorySettings {
    async fn game_settings(&self, game: GameType) -> CasinoResult<GameSettings> {
        let state = self.state(game);
        Ok(GameSettings {
            game,
            rtp: Rtp::new(state.rtp.load())?,
            bank: state.bank.load(),
            total_bets: state.total_bets.load(),
            total_wins: state.total_wins.load(),
        })
    }

    async fn update_rtp(&self, game: GameType, rtp: f64) -> CasinoResult<()> {
        let rtp = Rtp::new(rtp)?;
        self.state(game).rtp.store(rtp.value());
        info!(game = %game, rtp = %rtp, "RTP updated");
        Ok(())
    }

    async fn record_outcome(&self, game: GameType, bet: f64, win: f64, promotional: bool) -> CasinoResult<()> {
        let state = self.state(game);
        state.total_bets.fetch_add(bet);
        state.total_wins.fetch_add(win);

        if !promotional {
            let delta = if win > 0.0 { -(win - bet) } else { bet * BANK_LOSS_RETENTION };
            let before = state.bank.fetch_add(delta);
            debug!(game = %game, bank_before = before, delta, "Bank reserve updated");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::CasinoError;

    fn settings() -> InMemorySettings {
        InMemorySettings::new(GamesConfig::default())
    }

    #[tokio::test]
    async fn test_lazy_defaults() {
        let s = settings();
        let dice = s.game_settings(GameType::Dice).await.unwrap();
        assert_eq!(dice.rtp.value(), 97.0);
        assert_eq!(dice.bank, 10_000.0);
        assert_eq!(dice.realised_rtp(), None);
    }

    #[tokio::test]
    async fn test_update_rtp_validates() {
        let s = settings();
        assert!(matches!(s.update_rtp(GameType::Keno, 150.0).await, Err(CasinoError::Validation(_))));
        s.update_rtp(GameType::Keno, 90.0).await.unwrap();
        assert_eq!(s.game_settings(GameType::Keno).await.unwrap().rtp.value(), 90.0);
    }

    #[tokio::test]
    async fn test_bank_and_counters() {
        let s = settings();
        s.record_outcome(GameType::Mines, 100.0, 250.0, false).await.unwrap();
        s.record_outcome(GameType::Mines, 100.0, 0.0, false).await.unwrap();
        s.record_outcome(GameType::Mines, 100.0, 0.0, true).await.unwrap();

        let mines = s.game_settings(GameType::Mines).await.unwrap();
        assert_eq!(mines.bank, 10_000.0 - 150.0 + 75.0);
        assert_eq!(mines.total_bets, 300.0);
        assert_eq!(mines.total_wins, 250.0);
        let realised = mines.realised_rtp().unwrap();
        assert!((realised - 83.333).abs() < 0.01);
    }

    #[tokio::test]
    async fn test_concurrent_bank_updates() {
        let s = Arc::new(settings());
        let mut handles = Vec::new();
        for _ in 0..8 {
            let s = s.clone();
            handles.push(tokio::spawn(async move {
                for _ in 0..100 {
                    s.record_outcome(GameType::Dice, 4.0, 0.0, false).await.unwrap();
                }
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }
        let dice = s.game_settings(GameType::Dice).await.unwrap();
        assert_eq!(dice.bank, 10_000.0 + 800.0 * 3.0);
    }
}
