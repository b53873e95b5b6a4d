use anyhow::Result;
use sea_orm::sea_query::OnConflict;
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder};
use std::collections::HashSet;

use crate::entities::{prelude::*, used_words};

/// Per-session list of words already played.
///
/// Every write is a single committed statement, so a word recorded here
/// survives a crash right after the call returns.
#[derive(Clone)]
pub struct UsedWordRepository {
    db: DatabaseConnection,
}

impl UsedWordRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Used words in the order they were recorded.
    pub async fn list(&self, session_id: &str) -> Result<Vec<String>> {
        let rows = UsedWords::find()
            .filter(used_words::Column::SessionId.eq(session_id))
            .order_by_asc(used_words::Column::Id)
            .all(&self.db)
            .await?;

        Ok(rows.into_iter().map(|row| row.word).collect())
    }

    pub async fn used_set(&self, session_id: &str) -> Result<HashSet<String>> {
        Ok(self.list(session_id).await?.into_iter().collect())
    }

    /// Returns `false` when the word was already recorded.
    pub async fn mark_used(&self, session_id: &str, word: &str) -> Result<bool> {
        let row = used_words::ActiveModel {
            session_id: sea_orm::ActiveValue::Set(session_id.to_string()),
            word: sea_orm::ActiveValue::Set(word.to_string()),
            used_at: sea_orm::ActiveValue::Set(chrono::Utc::now()),
            ..Default::default()
        };

        let inserted = UsedWords::insert(row)
            .on_conflict(
                OnConflict::columns([used_words::Column::SessionId, used_words::Column::Word])
                    .do_nothing()
                    .to_owned(),
            )
            .exec_without_returning(&self.db)
            .await?;

        Ok(inserted > 0)
    }

    /// Empties the session's record. Returns how many words were dropped.
    pub async fn clear(&self, session_id: &str) -> Result<u64> {
        let result = UsedWords::delete_many()
            .filter(used_words::Column::SessionId.eq(session_id))
            .exec(&self.db)
            .await?;

        Ok(result.rows_affected)
    }
}
