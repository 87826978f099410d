use std::sync::Arc;
use tokio::sync::RwLock;

use crate::websocket::ConnectionManager;
use arena_types::{AdminAction, ApiError, LiveGameState, ServerMessage};

/// Single source of truth for which round is active and visible per
/// game type. Owned and injected, never a module global; every
/// mutation goes through `apply`.
pub struct LiveStateManager {
    state: RwLock<LiveGameState>,
    connections: Arc<ConnectionManager>,
}

impl LiveStateManager {
    pub fn new(connections: Arc<ConnectionManager>) -> Self {
        Self {
            state: RwLock::new(LiveGameState::default()),
            connections,
        }
    }

    pub async fn snapshot(&self) -> LiveGameState {
        self.state.read().await.clone()
    }

    /// Apply an admin command and push the new snapshot to every
    /// connected client. The broadcast happens while the write lock
    /// is still held, so clients observe mutations in the order
    /// they were applied. On failure the state is unchanged and
    /// nothing is sent.
    pub async fn apply(&self, action: &AdminAction) -> Result<LiveGameState, ApiError> {
        let mut state = self.state.write().await;
        arena_core::live_state::apply(&mut state, action)?;

        let snapshot = state.clone();
        tracing::info!(?action, "live game state updated");
        self.connections
            .broadcast(ServerMessage::GameStateUpdate {
                state: snapshot.clone(),
            })
            .await;

        Ok(snapshot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arena_types::GameType;

    #[tokio::test]
    async fn test_apply_mutates_snapshot() {
        let connections = Arc::new(ConnectionManager::new());
        let manager = LiveStateManager::new(connections);

        manager
            .apply(&AdminAction::SetRound {
                game_type: GameType::TimingGame,
                round: 2,
            })
            .await
            .unwrap();

        let snapshot = manager.snapshot().await;
        assert_eq!(snapshot.timing_game.current_round, 2);
        assert_eq!(snapshot.fast_hand_game.current_round, 1);
    }

    #[tokio::test]
    async fn test_invalid_round_leaves_state_unchanged() {
        let connections = Arc::new(ConnectionManager::new());
        let manager = LiveStateManager::new(connections);

        let err = manager
            .apply(&AdminAction::SetRound {
                game_type: GameType::TimingGame,
                round: 4,
            })
            .await
            .unwrap_err();

        assert!(matches!(err, ApiError::Validation(_)));
        assert_eq!(manager.snapshot().await, LiveGameState::default());
    }
}
