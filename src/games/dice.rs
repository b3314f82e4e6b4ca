//! Dice: roll 0..=99 under or over a chosen chance.

use crate::common::types::round2;
use crate::errors::{CasinoError, CasinoResult};
use crate::games::types::DiceDirection;
use crate::random::RandomSource;

pub const MIN_CHANCE: f64 = 1.0;
pub const MAX_CHANCE: f64 = 95.0;

pub fn validate_chance(chance: f64) -> CasinoResult<()> {
    if !chance.is_finite() || !(MIN_CHANCE..=MAX_CHANCE).contains(&chance) {
        return Err(CasinoError::validation(format!(
            "chance must be between {} and {}",
            MIN_CHANCE, MAX_CHANCE
        )));
    }
    Ok(())
}

/// Payout multiplier for a chance, with a 1% edge baked in
pub fn multiplier(chance: f64) -> f64 {
    round2(99.0 / chance)
}

/// Roll consistent with an already made decision.
///
/// Under wins below the chance and Over wins above it; a fractional chance
/// is rounded towards the losing side, so the roll always sits on the right
/// side of the threshold.
pub fn roll(random: &dyn RandomSource, chance: f64, direction: DiceDirection, win: bool) -> u32 {
    let above = chance.ceil() as u32;
    let below = chance.floor() as u32;
    match (direction, win) {
        (DiceDirection::Under, true) => random.range_inclusive(0, above.saturating_sub(1)),
        (DiceDirection::Under, false) => random.range_inclusive(above, 99),
        (DiceDirection::Over, true) => random.range_inclusive((below + 1).min(99), 99),
        (DiceDirection::Over, false) => random.range_inclusive(0, below),
    }
}
