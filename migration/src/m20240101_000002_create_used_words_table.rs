use sea_orm_migration::prelude::*;

use crate::m20240101_000001_create_sessions_table::Sessions;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(UsedWords::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(UsedWords::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(UsedWords::SessionId).string().not_null())
                    .col(ColumnDef::new(UsedWords::Word).string().not_null())
                    .col(
                        ColumnDef::new(UsedWords::UsedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_used_words_session")
                            .from(UsedWords::Table, UsedWords::SessionId)
                            .to(Sessions::Table, Sessions::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // One row per word per session; mark_used relies on it for idempotency
        manager
            .create_index(
                Index::create()
                    .name("idx_used_words_session_word")
                    .table(UsedWords::Table)
                    .col(UsedWords::SessionId)
                    .col(UsedWords::Word)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(UsedWords::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum UsedWords {
    Table,
    Id,
    SessionId,
    Word,
    UsedAt,
}
