use sea_orm::DbErr;
use thiserror::Error;

/// Store-level outcomes the handlers care about. `Duplicate` is how
/// the unique submission index surfaces: callers never pre-read to
/// check for an existing row.
#[derive(Debug, Error)]
pub enum RepoError {
    #[error("duplicate: {0}")]
    Duplicate(String),
    #[error("record not found")]
    NotFound,
    #[error(transparent)]
    Db(#[from] DbErr),
}

impl RepoError {
    /// Map a sea-orm error, folding unique-constraint violations
    /// into `Duplicate`.
    pub fn from_db(err: DbErr, duplicate_context: &str) -> Self {
        match err.sql_err() {
            Some(sea_orm::SqlErr::UniqueConstraintViolation(_)) => {
                RepoError::Duplicate(duplicate_context.to_string())
            }
            _ => RepoError::Db(err),
        }
    }
}
