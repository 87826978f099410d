use std::sync::Arc;
use tracing::{error, warn};

use crate::auth::SessionClaims;
use crate::state::LiveStateManager;
use crate::websocket::connection::{ConnectionId, ConnectionManager};
use arena_persistence::RepoError;
use arena_persistence::repositories::ScoreRepository;
use arena_types::{AdminAction, ClientMessage, GameType, ServerMessage};

#[derive(Clone)]
pub struct MessageHandler {
    connection_id: ConnectionId,
    claims: SessionClaims,
    connection_manager: Arc<ConnectionManager>,
    live_state: Arc<LiveStateManager>,
    score_repository: Arc<ScoreRepository>,
}

impl MessageHandler {
    pub fn new(
        connection_id: ConnectionId,
        claims: SessionClaims,
        connection_manager: Arc<ConnectionManager>,
        live_state: Arc<LiveStateManager>,
        score_repository: Arc<ScoreRepository>,
    ) -> Self {
        Self {
            connection_id,
            claims,
            connection_manager,
            live_state,
            score_repository,
        }
    }

    pub async fn handle_message(&self, message: ClientMessage) -> Result<(), String> {
        self.connection_manager
            .update_activity(self.connection_id)
            .await;

        match message {
            ClientMessage::SubmitScore {
                game_type,
                round,
                score,
            } => self.handle_submit_score(game_type, round, score).await,
            ClientMessage::AdminUpdateState { action } => self.handle_admin_update(action).await,
            ClientMessage::Heartbeat => Ok(()),
        }
    }

    /// At-most-once score intake. Uniqueness is enforced by the
    /// store's single insert; a duplicate comes back as an explicit
    /// rejection, never a silent drop.
    async fn handle_submit_score(
        &self,
        game_type: GameType,
        round: u8,
        score: f64,
    ) -> Result<(), String> {
        if let Err(e) = arena_core::submission::validate_submission(round, score) {
            return self
                .send_message(ServerMessage::ScoreRejected {
                    reason: e.to_string(),
                })
                .await;
        }

        match self
            .score_repository
            .submit(self.claims.sub, game_type, round, score)
            .await
        {
            Ok(()) => {
                self.send_message(ServerMessage::ScoreAccepted {
                    game_type,
                    round,
                    score,
                })
                .await
            }
            Err(RepoError::Duplicate(reason)) => {
                self.send_message(ServerMessage::ScoreRejected { reason })
                    .await
            }
            Err(e) => {
                error!(
                    "failed to persist score for user {}: {}",
                    self.claims.sub, e
                );
                self.send_message(ServerMessage::Error {
                    message: "Failed to save score".to_string(),
                })
                .await
            }
        }
    }

    async fn handle_admin_update(&self, action: AdminAction) -> Result<(), String> {
        if !self.claims.is_admin {
            // Non-admin socket commands are dropped, not answered.
            warn!(
                "connection {} (user {}) attempted admin action without admin claim",
                self.connection_id, self.claims.sub
            );
            return Ok(());
        }

        match self.live_state.apply(&action).await {
            // The broadcast already delivered the new state.
            Ok(_) => Ok(()),
            Err(e) => {
                self.send_message(ServerMessage::Error {
                    message: e.to_string(),
                })
                .await
            }
        }
    }

    async fn send_message(&self, message: ServerMessage) -> Result<(), String> {
        self.connection_manager
            .send_to_connection(self.connection_id, message)
            .await
    }
}
