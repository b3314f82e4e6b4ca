use serde::{Deserialize, Serialize};
use std::fmt;

/// Supported game types
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum GameType {
    Dice,
    Mines,
    Tower,
    Crash,
    X100,
    Keno,
    Bubbles,
}

impl GameType {
    pub const ALL: [GameType; 7] = [
        GameType::Dice,
        GameType::Mines,
        GameType::Tower,
        GameType::Crash,
        GameType::X100,
        GameType::Keno,
        GameType::Bubbles,
    ];

    /// Games that keep a server-side session between requests
    pub fn is_session_based(self) -> bool {
        matches!(self, GameType::Mines | GameType::Tower | GameType::Crash)
    }
}

impl fmt::Display for GameType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            GameType::Dice => "dice",
            GameType::Mines => "mines",
            GameType::Tower => "tower",
            GameType::Crash => "crash",
            GameType::X100 => "x100",
            GameType::Keno => "keno",
            GameType::Bubbles => "bubbles",
        };
        f.write_str(name)
    }
}

/// Game outcome
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum GameOutcome {
    Win,
    Loss,
}

impl GameOutcome {
    pub fn from_win(win: bool) -> Self {
        if win {
            GameOutcome::Win
        } else {
            GameOutcome::Loss
        }
    }
}

/// Dice roll direction
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DiceDirection {
    Under,
    Over,
}

/// Tower difficulty, selects bombs per row and the multiplier ladder
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum TowerDifficulty {
    Low,
    #[default]
    Medium,
    High,
}

impl TowerDifficulty {
    pub fn bombs_per_row(self) -> usize {
        match self {
            TowerDifficulty::Low => 1,
            TowerDifficulty::Medium => 2,
            TowerDifficulty::High => 3,
        }
    }
}

/// Balances reported back after every ledger-touching call
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct BalanceView {
    pub deposit_balance: f64,
    pub promo_balance: f64,
    pub total: f64,
    pub wager: f64,
}

/// Request to play Dice
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DicePlayRequest {
    pub bet: f64,
    pub chance: f64,
    #[serde(default = "default_direction")]
    pub direction: DiceDirection,
}

fn default_direction() -> DiceDirection {
    DiceDirection::Under
}

/// Request to spin the X100 wheel
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct X100PlayRequest {
    pub bet: f64,
    pub coef: u32,
}

/// Request to play Keno
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KenoPlayRequest {
    pub bet: f64,
    pub numbers: Vec<u8>,
}

/// Request to play Bubbles
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BubblesPlayRequest {
    pub bet: f64,
    pub target: f64,
}

/// Request to open a Mines session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MinesStartRequest {
    pub bet: f64,
    #[serde(default = "default_bombs")]
    pub bombs: u8,
}

fn default_bombs() -> u8 {
    5
}

/// Request to open a Tower session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TowerStartRequest {
    pub bet: f64,
    #[serde(default)]
    pub difficulty: TowerDifficulty,
}

/// Click one Mines cell (1-25)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MinesStepRequest {
    pub cell: u8,
}

/// Pick a column on the next Tower row. `row`, when sent, must be the row
/// being played; anything else is a replay.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TowerStepRequest {
    pub column: u8,
    #[serde(default)]
    pub row: Option<usize>,
}

/// Cash out a Mines or Tower session. `game_id`, when sent, pins the
/// session the client is looking at.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionCashoutRequest {
    #[serde(default)]
    pub game_id: Option<String>,
}

/// Request to place a Crash bet
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrashBetRequest {
    pub bet: f64,
}

/// Cash a Crash bet out at the multiplier the client reached
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrashCashoutRequest {
    pub multiplier: f64,
}

/// Result of a single-shot game
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayResult {
    pub game_id: String,
    pub game_type: GameType,
    pub outcome: GameOutcome,
    pub bet: f64,
    pub win: f64,
    pub multiplier: f64,
    pub balance: BalanceView,
    #[serde(flatten)]
    pub detail: PlayDetail,
}

/// Game-specific data (discriminated union)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "game_type_data", rename_all = "lowercase")]
pub enum PlayDetail {
    Dice {
        roll: u32,
        chance: f64,
        direction: DiceDirection,
    },
    X100 {
        selected_coef: u32,
        result_coef: u32,
        position: usize,
        rotation: f64,
    },
    Keno {
        selected: Vec<u8>,
        drawn: Vec<u8>,
        matches: usize,
    },
    Bubbles {
        target: f64,
        result: f64,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_game_type_display_matches_serde() {
        for game in GameType::ALL {
            let json = serde_json::to_string(&game).unwrap();
            assert_eq!(json, format!("\"{}\"", game));
        }
    }

    #[test]
    fn test_play_request_defaults() {
        let req: DicePlayRequest = serde_json::from_str(r#"{"bet": 10, "chance": 50}"#).unwrap();
        assert_eq!(req.direction, DiceDirection::Under);

        let req: TowerStartRequest = serde_json::from_str(r#"{"bet": 5}"#).unwrap();
        assert_eq!(req.difficulty, TowerDifficulty::Medium);
        assert_eq!(req.difficulty.bombs_per_row(), 2);
    }
}
