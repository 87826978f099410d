use sea_orm::{
    ActiveValue::Set, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter,
};
use uuid::Uuid;

use crate::entities::{prelude::*, scores};
use crate::error::RepoError;
use arena_core::leaderboard;
use arena_types::{GameType, LeaderboardEntry};

pub struct ScoreRepository {
    db: DatabaseConnection,
}

impl ScoreRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Record a score, at most once per (user, game type, round).
    /// A single insert: the unique index turns a repeat submission
    /// into `RepoError::Duplicate`, with no read-before-write race.
    pub async fn submit(
        &self,
        user_id: Uuid,
        game_type: GameType,
        round: u8,
        score: f64,
    ) -> Result<(), RepoError> {
        let model = scores::ActiveModel {
            id: Set(Uuid::new_v4()),
            user_id: Set(user_id),
            game_type: Set(game_type.as_str().to_string()),
            round: Set(i32::from(round)),
            score: Set(score),
            submitted_at: Set(chrono::Utc::now()),
        };

        Scores::insert(model).exec(&self.db).await.map_err(|e| {
            RepoError::from_db(
                e,
                &format!("already played {game_type} round {round}"),
            )
        })?;

        Ok(())
    }

    /// Top scores for one (game type, round), joined with the
    /// players' display fields. Ordering direction and the top-10
    /// cut live in arena-core.
    pub async fn leaderboard(
        &self,
        game_type: GameType,
        round: u8,
    ) -> Result<Vec<LeaderboardEntry>, RepoError> {
        let rows = Scores::find()
            .filter(scores::Column::GameType.eq(game_type.as_str()))
            .filter(scores::Column::Round.eq(i32::from(round)))
            .find_also_related(Users)
            .all(&self.db)
            .await?;

        let entries = rows
            .into_iter()
            .filter_map(|(score, user)| {
                user.map(|user| LeaderboardEntry {
                    name: user.name,
                    student_id: user.student_id,
                    score: score.score,
                })
            })
            .collect();

        Ok(leaderboard::rank(game_type, entries))
    }

    /// Uniform reset capability: everything, one game type, or one
    /// round of one game type. Returns the number of deleted rows.
    pub async fn clear(
        &self,
        game_type: Option<GameType>,
        round: Option<u8>,
    ) -> Result<u64, RepoError> {
        let mut delete = Scores::delete_many();

        if let Some(game_type) = game_type {
            delete = delete.filter(scores::Column::GameType.eq(game_type.as_str()));
        }
        if let Some(round) = round {
            delete = delete.filter(scores::Column::Round.eq(i32::from(round)));
        }

        let result = delete.exec(&self.db).await?;
        tracing::info!(
            rows = result.rows_affected,
            game_type = ?game_type,
            round = ?round,
            "cleared leaderboard scores"
        );

        Ok(result.rows_affected)
    }
}
