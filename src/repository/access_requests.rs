//! Access requests repository

use sqlx::{Pool, Postgres};

use crate::{
    error::{AppError, AppResult},
    models::{
        access_request::{AccessRequest, AccessRequestDetails},
        enums::RequestStatus,
    },
};

#[derive(Clone)]
pub struct AccessRequestsRepository {
    pool: Pool<Postgres>,
}

impl AccessRequestsRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    pub async fn get_details(&self, id: i32) -> AppResult<AccessRequestDetails> {
        sqlx::query_as::<_, AccessRequestDetails>(&format!("{} WHERE ar.id = $1", DETAILS_SELECT))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Access request with id {} not found", id)))
    }

    /// File a pending request. The partial unique index turns a second
    /// pending request for the same pair into a conflict.
    pub async fn create(&self, collection_id: i32, patron_id: i32) -> AppResult<AccessRequest> {
        sqlx::query_as::<_, AccessRequest>(
            r#"
            INSERT INTO access_requests (collection_id, patron_id, status)
            VALUES ($1, $2, $3)
            RETURNING *
            "#,
        )
        .bind(collection_id)
        .bind(patron_id)
        .bind(RequestStatus::Pending)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::on_unique_violation(e, "You have already requested access to this collection."))
    }

    /// Pending requests, newest first
    pub async fn list_pending(&self) -> AppResult<Vec<AccessRequestDetails>> {
        let rows = sqlx::query_as::<_, AccessRequestDetails>(&format!(
            "{} WHERE ar.status = 'pending' ORDER BY ar.created_at DESC",
            DETAILS_SELECT
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// Approve a pending request and grant access in one transaction
    pub async fn approve(&self, id: i32) -> AppResult<AccessRequest> {
        let mut tx = self.pool.begin().await?;

        let request = lock(&mut tx, id).await?;
        ensure_pending(&request)?;

        let approved = sqlx::query_as::<_, AccessRequest>(
            "UPDATE access_requests SET status = $2, resolved_at = NOW() WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(RequestStatus::Approved)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            INSERT INTO collection_allowed_users (collection_id, user_id)
            VALUES ($1, $2)
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(request.collection_id)
        .bind(request.patron_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(approved)
    }

    /// Deny (archive) a pending request
    pub async fn deny(&self, id: i32) -> AppResult<AccessRequest> {
        let mut tx = self.pool.begin().await?;

        let request = lock(&mut tx, id).await?;
        ensure_pending(&request)?;

        let denied = sqlx::query_as::<_, AccessRequest>(
            "UPDATE access_requests SET status = $2, resolved_at = NOW() WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(RequestStatus::Denied)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(denied)
    }
}

const DETAILS_SELECT: &str = r#"
    SELECT ar.id, ar.collection_id, c.title AS collection_title, c.creator_id AS collection_creator_id,
           ar.patron_id, u.username AS patron_username, u.email AS patron_email,
           ar.status, ar.created_at
    FROM access_requests ar
    JOIN collections c ON c.id = ar.collection_id
    JOIN users u ON u.id = ar.patron_id
"#;

async fn lock(tx: &mut sqlx::Transaction<'_, Postgres>, id: i32) -> AppResult<AccessRequest> {
    sqlx::query_as::<_, AccessRequest>("SELECT * FROM access_requests WHERE id = $1 FOR UPDATE")
        .bind(id)
        .fetch_optional(&mut **tx)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Access request with id {} not found", id)))
}

fn ensure_pending(request: &AccessRequest) -> AppResult<()> {
    if request.is_archived() {
        return Err(AppError::BusinessRule(format!(
            "Access request has already been {}",
            request.status
        )));
    }
    Ok(())
}
