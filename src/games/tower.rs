//! Tower: climb nine rows of four columns, each row hiding 1-3 bombs
//! depending on difficulty.

use crate::errors::{CasinoError, CasinoResult};
use crate::games::types::TowerDifficulty;
use crate::ledger::LedgerSplit;
use crate::random::{RandomSource, SourceRng};
use rand::seq::{index, SliceRandom};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const ROWS: usize = 9;
pub const COLUMNS: u8 = 4;

const LOW: [f64; ROWS] = [1.12, 1.25, 1.40, 1.56, 1.75, 1.96, 2.19, 2.45, 2.75];
const MEDIUM: [f64; ROWS] = [1.47, 2.18, 3.27, 4.89, 7.34, 11.0, 16.51, 24.77, 37.15];
const HIGH: [f64; ROWS] = [1.96, 3.92, 7.84, 15.68, 31.36, 62.72, 125.44, 250.88, 501.77];

fn ladder(difficulty: TowerDifficulty) -> &'static [f64; ROWS] {
    match difficulty {
        TowerDifficulty::Low => &LOW,
        TowerDifficulty::Medium => &MEDIUM,
        TowerDifficulty::High => &HIGH,
    }
}

/// Multiplier earned by clearing `row` (1-based)
pub fn multiplier(difficulty: TowerDifficulty, row: usize) -> Option<f64> {
    row.checked_sub(1).and_then(|i| ladder(difficulty).get(i).copied())
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TowerStep {
    pub row: usize,
    pub column: u8,
}

/// Active Tower session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TowerSession {
    pub id: String,
    pub bet: f64,
    pub split: LedgerSplit,
    pub difficulty: TowerDifficulty,
    /// Bomb columns for each row, index 0 is row 1
    pub bombs: Vec<Vec<u8>>,
    pub current_row: usize,
    pub path: Vec<TowerStep>,
    pub win: f64,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

impl TowerSession {
    pub fn new(id: String, bet: f64, split: LedgerSplit, difficulty: TowerDifficulty, bombs: Vec<Vec<u8>>) -> Self {
        Self {
            id,
            bet,
            split,
            difficulty,
            bombs,
            current_row: 0,
            path: Vec::new(),
            win: 0.0,
            active: true,
            created_at: Utc::now(),
        }
    }

    pub fn reached_top(&self) -> bool {
        self.current_row >= ROWS
    }

    pub fn view(&self) -> TowerView {
        TowerView {
            game_id: self.id.clone(),
            active: self.active,
            bet: self.bet,
            difficulty: self.difficulty,
            current_row: self.current_row,
            path: self.path.clone(),
            win: self.win,
            bombs: if self.active { None } else { Some(self.bombs.clone()) },
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TowerView {
    pub game_id: String,
    pub active: bool,
    pub bet: f64,
    pub difficulty: TowerDifficulty,
    pub current_row: usize,
    pub path: Vec<TowerStep>,
    pub win: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bombs: Option<Vec<Vec<u8>>>,
}

/// Static board description served to clients
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TowerConfig {
    pub rows: usize,
    pub columns: u8,
    pub difficulties: Vec<TowerDifficulty>,
    pub multipliers: BTreeMap<String, Vec<f64>>,
}

pub fn board_config() -> TowerConfig {
    let difficulties = vec![TowerDifficulty::Low, TowerDifficulty::Medium, TowerDifficulty::High];
    let multipliers = difficulties
        .iter()
        .map(|d| {
            let name = serde_json::to_value(d)
                .ok()
                .and_then(|v| v.as_str().map(str::to_string))
                .unwrap_or_default();
            (name, ladder(*d).to_vec())
        })
        .collect();
    TowerConfig {
        rows: ROWS,
        columns: COLUMNS,
        difficulties,
        multipliers,
    }
}

pub fn validate_column(column: u8) -> CasinoResult<()> {
    if !(1..=COLUMNS).contains(&column) {
        return Err(CasinoError::validation(format!("column must be between 1 and {}", COLUMNS)));
    }
    Ok(())
}

/// Bomb columns for all nine rows
pub fn generate_layout(random: &dyn RandomSource, difficulty: TowerDifficulty) -> Vec<Vec<u8>> {
    let per_row = difficulty.bombs_per_row().min(COLUMNS as usize);
    let mut rng = SourceRng::new(random);
    (0..ROWS)
        .map(|_| {
            let mut row: Vec<u8> = index::sample(&mut rng, COLUMNS as usize, per_row)
                .into_iter()
                .map(|i| i as u8 + 1)
                .collect();
            row.sort_unstable();
            row
        })
        .collect()
}

/// Make one row agree with the decision for `column`, keeping its bomb count
pub fn reconcile_row(row: &[u8], column: u8, safe: bool, random: &dyn RandomSource) -> Vec<u8> {
    let mut bombs = row.to_vec();
    let mined = bombs.contains(&column);

    if !safe && !mined {
        let slots: Vec<usize> = (0..bombs.len()).collect();
        if let Some(&slot) = slots.choose(&mut SourceRng::new(random)) {
            bombs[slot] = column;
        }
    } else if safe && mined {
        let free: Vec<u8> = (1..=COLUMNS).filter(|c| *c != column && !bombs.contains(c)).collect();
        if let Some(&target) = free.choose(&mut SourceRng::new(random)) {
            for b in bombs.iter_mut() {
                if *b == column {
                    *b = target;
                }
            }
        }
    }

    bombs.sort_unstable();
    bombs
}
