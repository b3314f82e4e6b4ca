//! X100 wheel: pick a coefficient, win when the wheel stops on it.

use crate::errors::{CasinoError, CasinoResult};
use crate::random::{RandomSource, SourceRng};
use rand::seq::SliceRandom;

pub const COEFFICIENTS: [u32; 6] = [2, 3, 10, 15, 20, 100];

/// Segment layout, clockwise from the pointer
pub const WHEEL: [u32; 99] = [
    2, 3, 2, 15, 2, 3, 2, 20, 2, 15, 2, 3, 2, 3, 2, 15, 2, 3, 10, 3, 2, 10, 2, 3, 2,
    100,
    2, 3, 2, 10, 2, 3, 2, 3, 2, 15, 2, 3, 2, 3, 2, 20, 2, 3, 2, 10, 2, 3, 2, 10,
    2, 3, 2, 15, 2, 3, 2, 3, 2, 10, 20, 3, 2, 3, 2, 15, 2, 10, 2, 3, 2, 20, 2, 3, 2,
    15, 2, 3, 2, 10, 2, 3, 2, 3, 2, 10, 2, 3, 2, 3, 2, 10, 2, 3, 2, 3, 2, 3, 2,
];

/// Full turns added to the final angle so the animation spins
const SPIN_OFFSET: f64 = 360.0 * 5.0;

pub fn validate_coef(coef: u32) -> CasinoResult<()> {
    if !COEFFICIENTS.contains(&coef) {
        return Err(CasinoError::validation(format!("coefficient must be one of {:?}", COEFFICIENTS)));
    }
    Ok(())
}

/// Pick the stop position: a segment carrying `coef` on a win, any other on a loss
pub fn spin(random: &dyn RandomSource, coef: u32, win: bool) -> usize {
    let candidates: Vec<usize> = (0..WHEEL.len()).filter(|&i| (WHEEL[i] == coef) == win).collect();
    candidates
        .choose(&mut SourceRng::new(random))
        .copied()
        .unwrap_or_else(|| random.below(WHEEL.len() as u32) as usize)
}

pub fn rotation(position: usize) -> f64 {
    position as f64 * (360.0 / WHEEL.len() as f64) + SPIN_OFFSET
}
