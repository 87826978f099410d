use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::{GameType, LiveGameState};

/// Messages a connected client may send over the WebSocket.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub enum ClientMessage {
    SubmitScore {
        game_type: GameType,
        round: u8,
        score: f64,
    },
    /// Admin-only; validated server-side against the is_admin claim.
    AdminUpdateState { action: AdminAction },
    Heartbeat,
}

/// Live-state mutations an admin can issue, over the socket or via
/// the corresponding HTTP routes.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub enum AdminAction {
    SetVisibility {
        game_type: GameType,
        is_visible: bool,
    },
    SetRound {
        game_type: GameType,
        round: u8,
    },
}

/// Messages the server pushes to clients.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub enum ServerMessage {
    /// Sent to a client right after connecting, and to every client
    /// on each live-state mutation.
    GameStateUpdate { state: LiveGameState },
    ScoreAccepted {
        game_type: GameType,
        round: u8,
        score: f64,
    },
    /// Explicit rejection: duplicate submission or invalid shape.
    ScoreRejected { reason: String },
    Error { message: String },
}
