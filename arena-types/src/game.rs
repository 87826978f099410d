use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use ts_rs::TS;

use crate::errors::ApiError;

/// The two mini-games offered at the event. Wire names match the
/// client (`timing_game` / `fast_hand_game`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum GameType {
    TimingGame,
    FastHandGame,
}

/// Leaderboard sort direction. A property of the game type, never a
/// query parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Ascending,
    Descending,
}

impl GameType {
    pub const ALL: [GameType; 2] = [GameType::TimingGame, GameType::FastHandGame];

    pub fn as_str(&self) -> &'static str {
        match self {
            GameType::TimingGame => "timing_game",
            GameType::FastHandGame => "fast_hand_game",
        }
    }

    /// Timing game scores are error-from-target, so smaller is better.
    /// Fast hand scores are click counts, so larger is better.
    pub fn sort_order(&self) -> SortOrder {
        match self {
            GameType::TimingGame => SortOrder::Ascending,
            GameType::FastHandGame => SortOrder::Descending,
        }
    }
}

impl fmt::Display for GameType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GameType {
    type Err = ApiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "timing_game" => Ok(GameType::TimingGame),
            "fast_hand_game" => Ok(GameType::FastHandGame),
            other => Err(ApiError::Validation(format!("unknown game type: {other}"))),
        }
    }
}

/// Per-game slice of the live state: which round is active and
/// whether the game is shown to players.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct GameTypeState {
    pub current_round: u8,
    pub is_visible: bool,
}

impl Default for GameTypeState {
    fn default() -> Self {
        Self {
            current_round: 1,
            is_visible: false,
        }
    }
}

/// The shared, ephemeral record of active round and visibility per
/// game type. Not persisted; lost on process restart. The camelCase
/// keys are what the client indexes into.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct LiveGameState {
    pub timing_game: GameTypeState,
    pub fast_hand_game: GameTypeState,
}

impl LiveGameState {
    pub fn game(&self, game_type: GameType) -> &GameTypeState {
        match game_type {
            GameType::TimingGame => &self.timing_game,
            GameType::FastHandGame => &self.fast_hand_game,
        }
    }

    pub fn game_mut(&mut self, game_type: GameType) -> &mut GameTypeState {
        match game_type {
            GameType::TimingGame => &mut self.timing_game,
            GameType::FastHandGame => &mut self.fast_hand_game,
        }
    }
}

/// One row of a leaderboard, joined with the player's display
/// fields. Rank is implied by position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardEntry {
    pub name: String,
    pub student_id: String,
    pub score: f64,
}
