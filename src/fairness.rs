//! Fairness engine: turns a configured RTP and a bet multiplier into a
//! win/lose decision, and generates secret crash points.
//!
//! Decisions are pure functions of the inputs plus one or two uniform draws
//! from the injected [`RandomSource`]. Override precedence is fixed:
//! promotional accounts first, then drain mode, then the bank reserve guard,
//! and only then the RTP formula.

use crate::errors::{CasinoError, CasinoResult};
use crate::random::RandomSource;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Lowest accepted RTP percentage (inclusive)
pub const RTP_MIN: f64 = 10.0;
/// Highest accepted RTP percentage (inclusive)
pub const RTP_MAX: f64 = 99.9;

/// Lower clamp for per-step chances in multi-step games
pub const STEP_CHANCE_MIN: f64 = 0.10;
/// Upper clamp for per-step chances in multi-step games
pub const STEP_CHANCE_MAX: f64 = 0.95;

/// Scaling applied to the crash distribution tail
pub const CRASH_SCALE: f64 = 0.99;
pub const CRASH_MIN: f64 = 1.0;
pub const CRASH_MAX: f64 = 1000.0;

/// Fixed chances for promotional accounts
pub const PROMO_SINGLE_CHANCE: f64 = 0.75;
pub const PROMO_STEP_CHANCE: f64 = 0.95;

/// Default drain-mode loss probability in percent
pub const DEFAULT_DRAIN_CHANCE: u32 = 20;

/// Return-to-player percentage, validated to `[10, 99.9]`
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct Rtp(f64);

impl Rtp {
    pub fn new(value: f64) -> CasinoResult<Self> {
        if value.is_finite() && (RTP_MIN..=RTP_MAX).contains(&value) {
            Ok(Self(value))
        } else {
            Err(CasinoError::validation(format!(
                "RTP {} outside [{}, {}]",
                value, RTP_MIN, RTP_MAX
            )))
        }
    }

    pub fn value(self) -> f64 {
        self.0
    }

    /// RTP as a fraction in `[0.1, 0.999]`
    pub fn fraction(self) -> f64 {
        self.0 / 100.0
    }
}

impl TryFrom<f64> for Rtp {
    type Error = CasinoError;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        Rtp::new(value)
    }
}

impl From<Rtp> for f64 {
    fn from(rtp: Rtp) -> f64 {
        rtp.0
    }
}

impl fmt::Display for Rtp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}%", self.0)
    }
}

/// Per-account mode consulted once at the top of every decision
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
#[serde(tag = "mode", rename_all = "lowercase")]
pub enum PlayerOverride {
    #[default]
    None,
    /// Influencer and promotional accounts win at a fixed rate
    Promotional,
    /// Force a loss with `chance` percent probability
    Drain { chance: u32 },
}

impl PlayerOverride {
    pub fn drain() -> Self {
        PlayerOverride::Drain { chance: DEFAULT_DRAIN_CHANCE }
    }

    pub fn is_promotional(self) -> bool {
        matches!(self, PlayerOverride::Promotional)
    }
}

/// Potential payout of a bet measured against the game's bank reserve
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Exposure {
    pub payout: f64,
    pub bet: f64,
    pub bank: f64,
}

impl Exposure {
    /// True when paying out would take more than the bank holds
    pub fn exceeds_bank(&self) -> bool {
        self.payout - self.bet > self.bank
    }
}

/// Everything the engine needs to decide one bet or one step
#[derive(Debug, Clone, Copy)]
pub struct Wager {
    pub rtp: Rtp,
    pub multiplier: f64,
    /// Number of steps the multiplier is spread over; 1 for single-shot games
    pub steps: u32,
    /// Step of a multi-step session, even on its first step
    pub progressive: bool,
    pub player: PlayerOverride,
    pub exposure: Option<Exposure>,
}

impl Wager {
    pub fn single(rtp: Rtp, multiplier: f64) -> Self {
        Self {
            rtp,
            multiplier,
            steps: 1,
            progressive: false,
            player: PlayerOverride::None,
            exposure: None,
        }
    }

    pub fn with_steps(mut self, steps: u32) -> Self {
        self.steps = steps.max(1);
        self.progressive = true;
        self
    }

    pub fn with_player(mut self, player: PlayerOverride) -> Self {
        self.player = player;
        self
    }

    pub fn with_exposure(mut self, exposure: Exposure) -> Self {
        self.exposure = Some(exposure);
        self
    }
}

/// Win probability of a single draw under the RTP formula.
///
/// For `steps > 1` the overall chance is spread evenly across steps and the
/// per-step value is clamped to `[STEP_CHANCE_MIN, STEP_CHANCE_MAX]`.
pub fn win_chance(rtp: Rtp, multiplier: f64, steps: u32) -> f64 {
    if multiplier.is_nan() || multiplier <= 0.0 {
        return 0.0;
    }
    let chance = rtp.fraction() / multiplier;
    if steps > 1 {
        chance
            .powf(1.0 / steps as f64)
            .clamp(STEP_CHANCE_MIN, STEP_CHANCE_MAX)
    } else {
        chance.clamp(0.0, 1.0)
    }
}

/// Decision engine over an injected random source
#[derive(Clone)]
pub struct FairnessEngine {
    random: Arc<dyn RandomSource>,
}

impl FairnessEngine {
    pub fn new(random: Arc<dyn RandomSource>) -> Self {
        Self { random }
    }

    pub fn random(&self) -> &dyn RandomSource {
        self.random.as_ref()
    }

    /// Decide whether the wager wins
    pub fn decide(&self, wager: &Wager) -> bool {
        match wager.player {
            PlayerOverride::Promotional => {
                let chance = if wager.progressive { PROMO_STEP_CHANCE } else { PROMO_SINGLE_CHANCE };
                return self.random.next_f64() < chance;
            }
            PlayerOverride::Drain { chance } => {
                if self.random.range_inclusive(1, 100) <= chance {
                    return false;
                }
            }
            PlayerOverride::None => {}
        }

        if let Some(exposure) = wager.exposure {
            if exposure.exceeds_bank() {
                return false;
            }
        }

        self.random.next_f64() < win_chance(wager.rtp, wager.multiplier, wager.steps)
    }

    /// Secret crash multiplier for one crash bet
    pub fn crash_point(&self, rtp: Rtp) -> f64 {
        crash_point_from_draw(rtp, self.random.next_f64())
    }
}

/// Map a uniform draw in `[0, 1)` to a crash multiplier
pub fn crash_point_from_draw(rtp: Rtp, r: f64) -> f64 {
    let house_edge = (100.0 - rtp.value()) / 100.0;
    if r < house_edge {
        return CRASH_MIN;
    }
    let scaled = (r - house_edge) / (1.0 - house_edge);
    let point = 1.0 / (1.0 - scaled * CRASH_SCALE * rtp.fraction());
    let clamped = point.clamp(CRASH_MIN, CRASH_MAX);
    (clamped * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::random::{ScriptedRandom, SeededRandom};

    fn rtp(value: f64) -> Rtp {
        Rtp::new(value).unwrap()
    }

    #[test]
    fn test_rtp_bounds_inclusive() {
        assert!(Rtp::new(10.0).is_ok());
        assert!(Rtp::new(99.9).is_ok());
        assert!(Rtp::new(9.99).is_err());
        assert!(Rtp::new(99.91).is_err());
        assert!(Rtp::new(f64::NAN).is_err());
    }

    #[test]
    fn test_rtp_serde_validates() {
        let parsed: Rtp = serde_json::from_str("95.5").unwrap();
        assert_eq!(parsed.value(), 95.5);
        assert!(serde_json::from_str::<Rtp>("150").is_err());
    }

    #[test]
    fn test_win_chance_single_and_steps() {
        assert!((win_chance(rtp(97.0), 2.0, 1) - 0.485).abs() < 1e-12);

        let per_step = win_chance(rtp(90.0), 8.0, 3);
        assert!((per_step - (0.90f64 / 8.0).powf(1.0 / 3.0)).abs() < 1e-12);
        assert!((per_step.powi(3) - 0.1125).abs() < 1e-9);

        // Tiny chance spread over two steps is lifted to the lower clamp
        assert_eq!(win_chance(rtp(10.0), 1000.0, 2), STEP_CHANCE_MIN);
        // Huge chance spread over steps is capped
        assert_eq!(win_chance(rtp(99.9), 1.0, 5), STEP_CHANCE_MAX);
    }

    #[test]
    fn test_empirical_win_rate() {
        let engine = FairnessEngine::new(Arc::new(SeededRandom::new(2024)));
        let wager = Wager::single(rtp(96.0), 3.0);
        let draws = 100_000;
        let wins = (0..draws).filter(|_| engine.decide(&wager)).count();
        let rate = wins as f64 / draws as f64;
        assert!((rate - 0.32).abs() < 0.01, "rate {}", rate);
    }

    #[test]
    fn test_promotional_overrides_everything() {
        let exposure = Exposure { payout: 1_000_000.0, bet: 1.0, bank: 0.0 };
        let engine = FairnessEngine::new(Arc::new(ScriptedRandom::new([0.74, 0.94])));

        let single = Wager::single(rtp(10.0), 1000.0)
            .with_player(PlayerOverride::Promotional)
            .with_exposure(exposure);
        assert!(engine.decide(&single));

        let step = single.with_steps(5);
        assert!(engine.decide(&step));

        // First click of a session already gets the per-step rate
        let engine = FairnessEngine::new(Arc::new(ScriptedRandom::new([0.9, 0.9])));
        assert!(engine.decide(&single.with_steps(1)));
        assert!(!engine.decide(&single));
    }

    #[test]
    fn test_drain_forces_loss_then_falls_through() {
        // First draw 0.0 maps to 1 in 1..=100, which is within the drain chance
        let engine = FairnessEngine::new(Arc::new(ScriptedRandom::new([0.0, 0.5, 0.0])));
        let wager = Wager::single(rtp(99.9), 1.01).with_player(PlayerOverride::drain());
        assert!(!engine.decide(&wager));

        // 0.5 maps to 51, outside the drain chance; 0.0 then wins on the formula
        assert!(engine.decide(&wager));
    }

    #[test]
    fn test_bank_guard() {
        let engine = FairnessEngine::new(Arc::new(ScriptedRandom::new([0.0, 0.0])));
        let base = Wager::single(rtp(99.9), 2.0);

        let over = base.with_exposure(Exposure { payout: 200.0, bet: 100.0, bank: 99.0 });
        assert!(!engine.decide(&over));

        let within = base.with_exposure(Exposure { payout: 200.0, bet: 100.0, bank: 100.0 });
        assert!(engine.decide(&within));
    }

    #[test]
    fn test_crash_point_edges() {
        let r = rtp(80.0);
        assert_eq!(crash_point_from_draw(r, 0.0), 1.0);
        assert_eq!(crash_point_from_draw(r, 0.1999), 1.0);
        assert_eq!(crash_point_from_draw(r, 0.2), 1.0);

        let high = crash_point_from_draw(rtp(99.9), 0.999_999_999);
        assert!(high <= CRASH_MAX);

        let mid = crash_point_from_draw(r, 0.6);
        let expected: f64 = 1.0 / (1.0 - 0.5 * 0.99 * 0.8);
        assert_eq!(mid, (expected * 100.0).round() / 100.0);
    }

    #[test]
    fn test_crash_instant_fraction() {
        let engine = FairnessEngine::new(Arc::new(SeededRandom::new(99)));
        let r = rtp(80.0);
        let samples = 100_000;
        let instant = (0..samples).filter(|_| engine.crash_point(r) == 1.0).count();
        let fraction = instant as f64 / samples as f64;
        assert!((fraction - 0.20).abs() < 0.01, "fraction {}", fraction);
    }
}
