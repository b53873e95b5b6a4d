use anyhow::Result;
use sea_orm::{DatabaseConnection, EntityTrait, PaginatorTrait};

use crate::entities::{prelude::*, sessions};

/// Durable record of which sessions were ever created.
#[derive(Clone)]
pub struct SessionRepository {
    db: DatabaseConnection,
}

impl SessionRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub async fn create(&self, session_id: &str) -> Result<()> {
        let session = sessions::ActiveModel {
            id: sea_orm::ActiveValue::Set(session_id.to_string()),
            created_at: sea_orm::ActiveValue::Set(chrono::Utc::now()),
        };

        Sessions::insert(session).exec(&self.db).await?;
        Ok(())
    }

    pub async fn exists(&self, session_id: &str) -> Result<bool> {
        let session = Sessions::find_by_id(session_id.to_string())
            .one(&self.db)
            .await?;
        Ok(session.is_some())
    }

    pub async fn count(&self) -> Result<u64> {
        Ok(Sessions::find().count(&self.db).await?)
    }
}
