//! Keno: pick 1-10 numbers out of 40, ten are drawn.

use crate::errors::{CasinoError, CasinoResult};
use crate::random::{RandomSource, SourceRng};
use rand::seq::index;

pub const POOL: u8 = 40;
pub const DRAWN: usize = 10;
pub const MAX_PICKS: usize = 10;

/// Payout multiplier by (picks, matches); zero when the pair pays nothing
pub fn payout(picks: usize, matches: usize) -> f64 {
    let table: &[(usize, f64)] = match picks {
        1 => &[(1, 3.0)],
        2 => &[(2, 9.0)],
        3 => &[(2, 2.0), (3, 25.0)],
        4 => &[(2, 1.0), (3, 5.0), (4, 50.0)],
        5 => &[(3, 3.0), (4, 15.0), (5, 100.0)],
        6 => &[(3, 2.0), (4, 5.0), (5, 30.0), (6, 200.0)],
        7 => &[(4, 3.0), (5, 10.0), (6, 50.0), (7, 500.0)],
        8 => &[(4, 2.0), (5, 5.0), (6, 20.0), (7, 100.0), (8, 1000.0)],
        9 => &[(5, 3.0), (6, 10.0), (7, 30.0), (8, 300.0), (9, 2000.0)],
        10 => &[(5, 2.0), (6, 5.0), (7, 15.0), (8, 100.0), (9, 500.0), (10, 5000.0)],
        _ => &[],
    };
    table
        .iter()
        .find(|(m, _)| *m == matches)
        .map(|(_, mult)| *mult)
        .unwrap_or(0.0)
}

/// Picks must be 1-10 distinct numbers within 1..=40
pub fn validate_picks(picks: &[u8]) -> CasinoResult<()> {
    if picks.is_empty() || picks.len() > MAX_PICKS {
        return Err(CasinoError::validation(format!("pick between 1 and {} numbers", MAX_PICKS)));
    }
    if picks.iter().any(|n| !(1..=POOL).contains(n)) {
        return Err(CasinoError::validation(format!("numbers must be between 1 and {}", POOL)));
    }
    let mut sorted = picks.to_vec();
    sorted.sort_unstable();
    sorted.dedup();
    if sorted.len() != picks.len() {
        return Err(CasinoError::validation("numbers must be distinct"));
    }
    Ok(())
}

pub fn draw(random: &dyn RandomSource) -> Vec<u8> {
    index::sample(&mut SourceRng::new(random), POOL as usize, DRAWN)
        .into_iter()
        .map(|i| i as u8 + 1)
        .collect()
}

pub fn count_matches(picks: &[u8], drawn: &[u8]) -> usize {
    picks.iter().filter(|n| drawn.contains(n)).count()
}

/// Replacement draw with no matches at all
pub fn losing_draw(picks: &[u8]) -> Vec<u8> {
    (1..=POOL).filter(|n| !picks.contains(n)).take(DRAWN).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::random::SeededRandom;

    #[test]
    fn test_payout_table() {
        assert_eq!(payout(1, 1), 3.0);
        assert_eq!(payout(1, 0), 0.0);
        assert_eq!(payout(4, 2), 1.0);
        assert_eq!(payout(10, 10), 5000.0);
        assert_eq!(payout(10, 4), 0.0);
        assert_eq!(payout(11, 5), 0.0);
    }

    #[test]
    fn test_validate_picks() {
        assert!(validate_picks(&[]).is_err());
        assert!(validate_picks(&[0]).is_err());
        assert!(validate_picks(&[41]).is_err());
        assert!(validate_picks(&[3, 3]).is_err());
        assert!(validate_picks(&(1..=11).collect::<Vec<u8>>()).is_err());
        assert!(validate_picks(&[1, 40, 7]).is_ok());
    }

    #[test]
    fn test_draw_and_losing_draw() {
        let random = SeededRandom::new(31);
        let drawn = draw(&random);
        assert_eq!(drawn.len(), DRAWN);
        assert!(drawn.iter().all(|n| (1..=POOL).contains(n)));
        let mut distinct = drawn.clone();
        distinct.sort_unstable();
        distinct.dedup();
        assert_eq!(distinct.len(), DRAWN);

        let picks = vec![1, 2, 3, 4, 5, 6, 7, 8, 9, 10];
        let losing = losing_draw(&picks);
        assert_eq!(losing.len(), DRAWN);
        assert_eq!(count_matches(&picks, &losing), 0);
        assert_eq!(losing[0], 11);
    }
}
