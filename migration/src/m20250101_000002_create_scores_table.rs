use sea_orm_migration::prelude::*;

use crate::m20250101_000001_create_users_table::Users;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Scores::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Scores::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Scores::UserId).uuid().not_null())
                    .col(ColumnDef::new(Scores::GameType).string().not_null())
                    .col(ColumnDef::new(Scores::Round).integer().not_null())
                    .col(ColumnDef::new(Scores::Score).double().not_null())
                    .col(
                        ColumnDef::new(Scores::SubmittedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_scores_user")
                            .from(Scores::Table, Scores::UserId)
                            .to(Users::Table, Users::Id),
                    )
                    .to_owned(),
            )
            .await?;

        // At most one score per (user, game type, round). Submission
        // relies on this index for atomic insert-if-absent.
        manager
            .create_index(
                Index::create()
                    .name("idx_scores_user_game_round")
                    .table(Scores::Table)
                    .col(Scores::UserId)
                    .col(Scores::GameType)
                    .col(Scores::Round)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // Leaderboard queries filter by (game_type, round).
        manager
            .create_index(
                Index::create()
                    .name("idx_scores_game_round")
                    .table(Scores::Table)
                    .col(Scores::GameType)
                    .col(Scores::Round)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Scores::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Scores {
    Table,
    Id,
    UserId,
    GameType,
    Round,
    Score,
    SubmittedAt,
}
