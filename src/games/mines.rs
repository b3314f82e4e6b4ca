//! Mines: a 5x5 board with a hidden bomb layout.
//!
//! The layout is generated when the session opens. Each click asks the
//! fairness engine first and then reconciles the layout so that the clicked
//! cell agrees with the decision, never touching cells already revealed.

use crate::common::types::round2;
use crate::errors::{CasinoError, CasinoResult};
use crate::ledger::LedgerSplit;
use crate::random::{RandomSource, SourceRng};
use rand::seq::{index, SliceRandom};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const GRID_CELLS: u8 = 25;
pub const MIN_BOMBS: u8 = 1;
pub const MAX_BOMBS: u8 = 24;

/// Active Mines session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MinesSession {
    pub id: String,
    pub bet: f64,
    pub split: LedgerSplit,
    pub bombs: u8,
    /// Bomb cells, numbered 1..=25
    pub mines: Vec<u8>,
    pub opened: Vec<u8>,
    pub win: f64,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

impl MinesSession {
    pub fn new(id: String, bet: f64, split: LedgerSplit, bombs: u8, mines: Vec<u8>) -> Self {
        Self {
            id,
            bet,
            split,
            bombs,
            mines,
            opened: Vec::new(),
            win: 0.0,
            active: true,
            created_at: Utc::now(),
        }
    }

    pub fn safe_cells(&self) -> usize {
        (GRID_CELLS - self.bombs) as usize
    }

    /// All safe cells revealed
    pub fn is_cleared(&self) -> bool {
        self.opened.len() >= self.safe_cells()
    }

    /// Client-facing state; the layout is only shown once the session is over
    pub fn view(&self) -> MinesView {
        MinesView {
            game_id: self.id.clone(),
            active: self.active,
            bet: self.bet,
            bombs: self.bombs,
            opened: self.opened.clone(),
            win: self.win,
            coefficient: coefficient(self.bombs, self.opened.len()),
            mines: if self.active { None } else { Some(self.mines.clone()) },
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MinesView {
    pub game_id: String,
    pub active: bool,
    pub bet: f64,
    pub bombs: u8,
    pub opened: Vec<u8>,
    pub win: f64,
    pub coefficient: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mines: Option<Vec<u8>>,
}

pub fn validate_bombs(bombs: u8) -> CasinoResult<()> {
    if !(MIN_BOMBS..=MAX_BOMBS).contains(&bombs) {
        return Err(CasinoError::validation(format!(
            "bombs must be between {} and {}",
            MIN_BOMBS, MAX_BOMBS
        )));
    }
    Ok(())
}

pub fn validate_cell(cell: u8) -> CasinoResult<()> {
    if !(1..=GRID_CELLS).contains(&cell) {
        return Err(CasinoError::validation(format!("cell must be between 1 and {}", GRID_CELLS)));
    }
    Ok(())
}

/// Payout coefficient after `opened` safe cells
pub fn coefficient(bombs: u8, opened: usize) -> f64 {
    let total = GRID_CELLS as f64;
    let bombs = bombs as f64;
    let mut coeff = 1.0;
    for i in 0..opened {
        let i = i as f64;
        coeff *= (total - i) / (total - bombs - i);
    }
    round2(coeff)
}

/// Random bomb layout with `bombs` distinct cells
pub fn generate_layout(random: &dyn RandomSource, bombs: u8) -> Vec<u8> {
    let count = (bombs as usize).min(GRID_CELLS as usize);
    let mut mines: Vec<u8> = index::sample(&mut SourceRng::new(random), GRID_CELLS as usize, count)
        .into_iter()
        .map(|i| i as u8 + 1)
        .collect();
    mines.sort_unstable();
    mines
}

/// Make the layout agree with the engine's decision for `cell`.
///
/// A loss moves one bomb under `cell`; a safe click moves a bomb out from
/// under `cell` to a cell that is neither revealed nor mined. The bomb count
/// never changes and revealed cells are never mined.
pub fn reconcile(mines: &[u8], opened: &[u8], cell: u8, safe: bool, random: &dyn RandomSource) -> Vec<u8> {
    let mut layout = mines.to_vec();
    let mined = layout.contains(&cell);

    if !safe && !mined {
        let movable: Vec<usize> = (0..layout.len()).filter(|&i| !opened.contains(&layout[i])).collect();
        if let Some(&slot) = movable.choose(&mut SourceRng::new(random)) {
            layout[slot] = cell;
        }
    } else if safe && mined {
        let free: Vec<u8> = (1..=GRID_CELLS)
            .filter(|c| *c != cell && !opened.contains(c) && !layout.contains(c))
            .collect();
        if let Some(&target) = free.choose(&mut SourceRng::new(random)) {
            for m in layout.iter_mut() {
                if *m == cell {
                    *m = target;
                }
            }
        }
    }

    layout.sort_unstable();
    layout
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::random::SeededRandom;

    #[test]
    fn test_coefficient_table() {
        assert_eq!(coefficient(5, 0), 1.0);
        assert_eq!(coefficient(1, 1), 1.04);
        assert_eq!(coefficient(3, 1), 1.14);
        assert_eq!(coefficient(5, 2), round2(25.0 / 20.0 * 24.0 / 19.0));
        assert_eq!(coefficient(24, 1), 25.0);
    }

    #[test]
    fn test_layout_has_distinct_cells() {
        let random = SeededRandom::new(1);
        for bombs in [1, 5, 24] {
            let layout = generate_layout(&random, bombs);
            assert_eq!(layout.len(), bombs as usize);
            let mut dedup = layout.clone();
            dedup.dedup();
            assert_eq!(dedup.len(), layout.len());
            assert!(layout.iter().all(|c| (1..=25).contains(c)));
        }
    }

    #[test]
    fn test_reconcile_forces_loss() {
        let random = SeededRandom::new(3);
        let mines = vec![1, 2, 3];
        let opened = vec![10, 11];
        let layout = reconcile(&mines, &opened, 12, false, &random);
        assert!(layout.contains(&12));
        assert_eq!(layout.len(), 3);
        assert!(!layout.contains(&10) && !layout.contains(&11));
    }

    #[test]
    fn test_reconcile_forces_safe() {
        let random = SeededRandom::new(4);
        let mines = vec![5, 6, 7];
        let opened = vec![1, 2];
        let layout = reconcile(&mines, &opened, 6, true, &random);
        assert!(!layout.contains(&6));
        assert_eq!(layout.len(), 3);
        assert!(layout.contains(&5) && layout.contains(&7));
        assert!(!layout.contains(&1) && !layout.contains(&2));
    }

    #[test]
    fn test_reconcile_noop_when_consistent() {
        let random = SeededRandom::new(5);
        assert_eq!(reconcile(&[4, 9], &[], 9, false, &random), vec![4, 9]);
        assert_eq!(reconcile(&[4, 9], &[], 1, true, &random), vec![4, 9]);
    }

    #[test]
    fn test_view_hides_layout_while_active() {
        let mut session = MinesSession::new("g".into(), 10.0, LedgerSplit::default(), 3, vec![1, 2, 3]);
        assert!(session.view().mines.is_none());
        session.active = false;
        assert_eq!(session.view().mines, Some(vec![1, 2, 3]));
    }

    #[test]
    fn test_validation() {
        assert!(validate_bombs(0).is_err());
        assert!(validate_bombs(25).is_err());
        assert!(validate_bombs(24).is_ok());
        assert!(validate_cell(0).is_err());
        assert!(validate_cell(26).is_err());
        assert!(validate_cell(25).is_ok());
    }
}
