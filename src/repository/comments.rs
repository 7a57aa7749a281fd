//! Comments repository

use sqlx::{Pool, Postgres};

use crate::{
    error::{AppError, AppResult},
    models::comment::{Comment, CommentDetails, CommentTarget},
};

#[derive(Clone)]
pub struct CommentsRepository {
    pool: Pool<Postgres>,
}

impl CommentsRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    pub async fn get_by_id(&self, id: i32) -> AppResult<Comment> {
        sqlx::query_as::<_, Comment>("SELECT * FROM comments WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Comment with id {} not found", id)))
    }

    pub async fn create(&self, user_id: i32, target: CommentTarget, body: &str) -> AppResult<Comment> {
        let (lora_id, collection_id) = match target {
            CommentTarget::Lora(id) => (Some(id), None),
            CommentTarget::Collection(id) => (None, Some(id)),
        };

        let comment = sqlx::query_as::<_, Comment>(
            r#"
            INSERT INTO comments (user_id, lora_id, collection_id, body)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(lora_id)
        .bind(collection_id)
        .bind(body)
        .fetch_one(&self.pool)
        .await?;
        Ok(comment)
    }

    pub async fn delete(&self, id: i32) -> AppResult<()> {
        sqlx::query("DELETE FROM comments WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Comments under a LoRA or collection, newest first
    pub async fn list_for(&self, target: CommentTarget) -> AppResult<Vec<CommentDetails>> {
        let (column, id) = match target {
            CommentTarget::Lora(id) => ("lora_id", id),
            CommentTarget::Collection(id) => ("collection_id", id),
        };

        let comments = sqlx::query_as::<_, CommentDetails>(&format!(
            r#"
            SELECT cm.id, cm.user_id, u.username, cm.body, cm.created_at,
                   (SELECT COUNT(*) FROM comment_likes lk WHERE lk.comment_id = cm.id) AS like_count
            FROM comments cm
            JOIN users u ON u.id = cm.user_id
            WHERE cm.{} = $1
            ORDER BY cm.created_at DESC
            "#,
            column
        ))
        .bind(id)
        .fetch_all(&self.pool)
        .await?;
        Ok(comments)
    }
}
