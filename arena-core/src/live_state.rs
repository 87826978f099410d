use arena_types::{AdminAction, ApiError, GameType, LiveGameState};

pub const MIN_ROUND: u8 = 1;
pub const MAX_ROUND: u8 = 3;

pub fn validate_round(round: u8) -> Result<(), ApiError> {
    if (MIN_ROUND..=MAX_ROUND).contains(&round) {
        Ok(())
    } else {
        Err(ApiError::Validation(format!(
            "round must be between {MIN_ROUND} and {MAX_ROUND}, got {round}"
        )))
    }
}

/// Switch the active round for one game. On failure the state is
/// left untouched.
pub fn set_round(state: &mut LiveGameState, game_type: GameType, round: u8) -> Result<(), ApiError> {
    validate_round(round)?;
    state.game_mut(game_type).current_round = round;
    Ok(())
}

pub fn set_visibility(state: &mut LiveGameState, game_type: GameType, is_visible: bool) {
    state.game_mut(game_type).is_visible = is_visible;
}

/// Apply one admin command. Every live-state mutation in the system
/// goes through here.
pub fn apply(state: &mut LiveGameState, action: &AdminAction) -> Result<(), ApiError> {
    match action {
        AdminAction::SetVisibility {
            game_type,
            is_visible,
        } => {
            set_visibility(state, *game_type, *is_visible);
            Ok(())
        }
        AdminAction::SetRound { game_type, round } => set_round(state, *game_type, *round),
    }
}
