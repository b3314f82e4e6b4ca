//! Bubbles: the bubble grows until it pops; win when it passes the target.

use crate::errors::{CasinoError, CasinoResult};
use crate::random::RandomSource;

pub const MIN_TARGET: f64 = 1.05;
pub const MAX_TARGET: f64 = 100.0;

pub fn validate_target(target: f64) -> CasinoResult<()> {
    if !target.is_finite() || !(MIN_TARGET..=MAX_TARGET).contains(&target) {
        return Err(CasinoError::validation(format!(
            "target must be between {} and {}",
            MIN_TARGET, MAX_TARGET
        )));
    }
    Ok(())
}

fn between(random: &dyn RandomSource, a: f64, b: f64) -> f64 {
    if a <= b {
        random.uniform(a, b)
    } else {
        random.uniform(b, a)
    }
}

/// Multiplier the bubble reached, consistent with the decision.
///
/// Losses cluster low: 50% pop below 1.5x, 30% below half the target and
/// 20% just short of it.
pub fn pop_point(random: &dyn RandomSource, target: f64, win: bool) -> f64 {
    if win {
        let reached = target + random.uniform(0.1, (target * 0.5).min(5.0));
        return (reached * 100.0).round() / 100.0;
    }

    let r = random.next_f64();
    let raw = if r < 0.5 {
        random.uniform(1.0, 1.5)
    } else if r < 0.8 {
        between(random, 1.5, target * 0.5)
    } else {
        between(random, target * 0.5, target - 0.01)
    };
    // Truncate so rounding can never lift a loss onto the target
    let capped = raw.clamp(1.0, target - 0.01);
    (capped * 100.0).floor() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::random::SeededRandom;

    #[test]
    fn test_target_bounds() {
        assert!(validate_target(1.04).is_err());
        assert!(validate_target(100.01).is_err());
        assert!(validate_target(1.05).is_ok());
        assert!(validate_target(100.0).is_ok());
    }

    #[test]
    fn test_pop_point_matches_decision() {
        let random = SeededRandom::new(41);
        for target in [1.05, 1.5, 2.0, 10.0, 100.0] {
            for _ in 0..300 {
                let won = pop_point(&random, target, true);
                assert!(won >= target, "win {} for target {}", won, target);
                assert!(won <= target + 5.0 + 0.01);

                let lost = pop_point(&random, target, false);
                assert!(lost < target, "loss {} for target {}", lost, target);
                assert!(lost >= 1.0);
            }
        }
    }
}
