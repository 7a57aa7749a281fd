//! In-app notifications repository

use async_trait::async_trait;
use sqlx::{Pool, Postgres};

use crate::{
    error::AppResult,
    models::notification::{NewNotification, Notification},
    services::notifications::InboxStore,
};

#[derive(Clone)]
pub struct NotificationsRepository {
    pool: Pool<Postgres>,
}

impl NotificationsRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl InboxStore for NotificationsRepository {
    async fn push(&self, notification: &NewNotification) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO notifications (recipient_id, actor_id, verb, target_kind, target_id, description)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(notification.recipient_id)
        .bind(notification.actor_id)
        .bind(&notification.verb)
        .bind(notification.target_kind.as_str())
        .bind(notification.target_id)
        .bind(&notification.description)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Notifications for a user, newest first
    async fn list(&self, recipient_id: i32, unread_only: bool) -> AppResult<Vec<Notification>> {
        let rows = sqlx::query_as::<_, Notification>(
            r#"
            SELECT * FROM notifications
            WHERE recipient_id = $1 AND (NOT $2 OR unread)
            ORDER BY created_at DESC
            LIMIT 200
            "#,
        )
        .bind(recipient_id)
        .bind(unread_only)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// Mark one notification read; returns false if it is not the user's
    async fn mark_read(&self, id: i32, recipient_id: i32) -> AppResult<bool> {
        let result = sqlx::query("UPDATE notifications SET unread = FALSE WHERE id = $1 AND recipient_id = $2")
            .bind(id)
            .bind(recipient_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn mark_all_read(&self, recipient_id: i32) -> AppResult<u64> {
        let result = sqlx::query("UPDATE notifications SET unread = FALSE WHERE recipient_id = $1 AND unread")
            .bind(recipient_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}
