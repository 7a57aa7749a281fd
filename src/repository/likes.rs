//! Like sets for LoRAs, collections and comments

use sqlx::{Pool, Postgres};

use crate::{error::AppResult, models::lora::LikeToggle};

/// Which like table to act on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LikeTarget {
    Lora,
    Collection,
    Comment,
}

impl LikeTarget {
    fn table(&self) -> (&'static str, &'static str) {
        match self {
            LikeTarget::Lora => ("lora_likes", "lora_id"),
            LikeTarget::Collection => ("collection_likes", "collection_id"),
            LikeTarget::Comment => ("comment_likes", "comment_id"),
        }
    }
}

#[derive(Clone)]
pub struct LikesRepository {
    pool: Pool<Postgres>,
}

impl LikesRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Add the like if absent, remove it if present
    pub async fn toggle(&self, target: LikeTarget, id: i32, user_id: i32) -> AppResult<LikeToggle> {
        let (table, column) = target.table();
        let mut tx = self.pool.begin().await?;

        let removed = sqlx::query(&format!(
            "DELETE FROM {} WHERE {} = $1 AND user_id = $2",
            table, column
        ))
        .bind(id)
        .bind(user_id)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        if removed == 0 {
            sqlx::query(&format!(
                "INSERT INTO {} ({}, user_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
                table, column
            ))
            .bind(id)
            .bind(user_id)
            .execute(&mut *tx)
            .await?;
        }

        let like_count: i64 = sqlx::query_scalar(&format!(
            "SELECT COUNT(*) FROM {} WHERE {} = $1",
            table, column
        ))
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(LikeToggle {
            liked: removed == 0,
            like_count,
        })
    }

    pub async fn count(&self, target: LikeTarget, id: i32) -> AppResult<i64> {
        let (table, column) = target.table();
        let count: i64 = sqlx::query_scalar(&format!(
            "SELECT COUNT(*) FROM {} WHERE {} = $1",
            table, column
        ))
        .bind(id)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }

    pub async fn is_liked(&self, target: LikeTarget, id: i32, user_id: i32) -> AppResult<bool> {
        let (table, column) = target.table();
        let liked: bool = sqlx::query_scalar(&format!(
            "SELECT EXISTS(SELECT 1 FROM {} WHERE {} = $1 AND user_id = $2)",
            table, column
        ))
        .bind(id)
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(liked)
    }
}
