use arena_types::ApiError;

use crate::live_state::validate_round;

/// Shape check for an inbound score submission. Uniqueness is the
/// score store's job; this only rejects inputs that could never be
/// valid for any round.
pub fn validate_submission(round: u8, score: f64) -> Result<(), ApiError> {
    validate_round(round)?;
    if !score.is_finite() {
        return Err(ApiError::Validation("score must be a finite number".to_string()));
    }
    if score < 0.0 {
        return Err(ApiError::Validation("score must not be negative".to_string()));
    }
    Ok(())
}
