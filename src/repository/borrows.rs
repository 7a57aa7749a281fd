//! Borrow requests and borrowed records repository.
//!
//! Each lifecycle transition runs in a single transaction and locks the rows
//! it changes, so concurrent approvals or returns cannot double-apply.

use chrono::{DateTime, Duration, Utc};
use sqlx::{Pool, Postgres};

use crate::{
    error::{AppError, AppResult},
    models::{
        borrow::{
            check_denial, plan_approval, ApprovalPlan, BorrowRequest, BorrowRequestDetails,
            BorrowedItem, BorrowedItemRow, ReturnOutcome,
        },
        enums::{LoraStatus, RequestStatus},
    },
};

const REQUEST_DETAILS_SELECT: &str = r#"
    SELECT br.id, br.lora_id, l.title AS lora_title, br.patron_id, u.username AS patron_username,
           br.duration_secs, br.status, br.created_at, br.updated_at
    FROM borrow_requests br
    JOIN loras l ON l.id = br.lora_id
    JOIN users u ON u.id = br.patron_id
"#;

const BORROWED_SELECT: &str = r#"
    SELECT b.*, l.title AS lora_title, u.username AS patron_username, u.email AS patron_email
    FROM borrowed_items b
    JOIN loras l ON l.id = b.lora_id
    JOIN users u ON u.id = b.patron_id
"#;

#[derive(Clone)]
pub struct BorrowsRepository {
    pool: Pool<Postgres>,
}

impl BorrowsRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Get borrow request by ID
    pub async fn get_request(&self, id: i32) -> AppResult<BorrowRequest> {
        sqlx::query_as::<_, BorrowRequest>("SELECT * FROM borrow_requests WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Borrow request with id {} not found", id)))
    }

    /// Create a pending request, or update the duration of the patron's
    /// existing pending request for the same LoRA. Returns `true` when created.
    pub async fn upsert_pending(&self, lora_id: i32, patron_id: i32, duration: Duration) -> AppResult<(BorrowRequest, bool)> {
        let mut tx = self.pool.begin().await?;

        let existing = sqlx::query_as::<_, BorrowRequest>(
            r#"
            SELECT * FROM borrow_requests
            WHERE lora_id = $1 AND patron_id = $2 AND status = 'pending'
            FOR UPDATE
            "#,
        )
        .bind(lora_id)
        .bind(patron_id)
        .fetch_optional(&mut *tx)
        .await?;

        let result = match existing {
            Some(request) => {
                let updated = sqlx::query_as::<_, BorrowRequest>(
                    "UPDATE borrow_requests SET duration_secs = $2, updated_at = NOW() WHERE id = $1 RETURNING *",
                )
                .bind(request.id)
                .bind(duration.num_seconds())
                .fetch_one(&mut *tx)
                .await?;
                (updated, false)
            }
            None => {
                let created = sqlx::query_as::<_, BorrowRequest>(
                    r#"
                    INSERT INTO borrow_requests (lora_id, patron_id, duration_secs, status)
                    VALUES ($1, $2, $3, $4)
                    RETURNING *
                    "#,
                )
                .bind(lora_id)
                .bind(patron_id)
                .bind(duration.num_seconds())
                .bind(RequestStatus::Pending)
                .fetch_one(&mut *tx)
                .await
                .map_err(|e| AppError::on_unique_violation(e, "A borrow request for this LoRA is already pending"))?;
                (created, true)
            }
        };

        tx.commit().await?;
        Ok(result)
    }

    /// Pending requests, oldest first
    pub async fn list_pending(&self) -> AppResult<Vec<BorrowRequestDetails>> {
        let rows = sqlx::query_as::<_, BorrowRequestDetails>(&format!(
            "{} WHERE br.status = 'pending' ORDER BY br.created_at ASC",
            REQUEST_DETAILS_SELECT
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// All requests filed by a patron, newest first
    pub async fn list_for_patron(&self, patron_id: i32) -> AppResult<Vec<BorrowRequestDetails>> {
        let rows = sqlx::query_as::<_, BorrowRequestDetails>(&format!(
            "{} WHERE br.patron_id = $1 ORDER BY br.created_at DESC",
            REQUEST_DETAILS_SELECT
        ))
        .bind(patron_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// Approve a request. The borrowed record is created at most once per
    /// request; re-approving hands back the existing record.
    pub async fn approve(&self, id: i32) -> AppResult<(ApprovalPlan, BorrowedItem)> {
        let mut tx = self.pool.begin().await?;

        let request = sqlx::query_as::<_, BorrowRequest>("SELECT * FROM borrow_requests WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Borrow request with id {} not found", id)))?;

        let lora_status = sqlx::query_scalar::<_, LoraStatus>("SELECT status FROM loras WHERE id = $1 FOR UPDATE")
            .bind(request.lora_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("LoRA with id {} not found", request.lora_id)))?;

        let plan = plan_approval(request.status, lora_status)?;

        if plan == ApprovalPlan::CreateBorrowedRecord {
            sqlx::query("UPDATE borrow_requests SET status = $2, updated_at = NOW() WHERE id = $1")
                .bind(id)
                .bind(RequestStatus::Approved)
                .execute(&mut *tx)
                .await?;

            sqlx::query("UPDATE loras SET status = $2 WHERE id = $1")
                .bind(request.lora_id)
                .bind(LoraStatus::InCirculation)
                .execute(&mut *tx)
                .await?;

            sqlx::query(
                r#"
                INSERT INTO borrowed_items (borrow_request_id, lora_id, patron_id, duration_secs)
                VALUES ($1, $2, $3, $4)
                ON CONFLICT (borrow_request_id) DO NOTHING
                "#,
            )
            .bind(request.id)
            .bind(request.lora_id)
            .bind(request.patron_id)
            .bind(request.duration_secs)
            .execute(&mut *tx)
            .await?;
        }

        let borrowed = sqlx::query_as::<_, BorrowedItem>("SELECT * FROM borrowed_items WHERE borrow_request_id = $1")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| AppError::Internal(format!("Approved borrow request {} has no borrowed record", id)))?;

        tx.commit().await?;
        Ok((plan, borrowed))
    }

    /// Deny a pending request
    pub async fn deny(&self, id: i32) -> AppResult<BorrowRequest> {
        let mut tx = self.pool.begin().await?;

        let request = sqlx::query_as::<_, BorrowRequest>("SELECT * FROM borrow_requests WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Borrow request with id {} not found", id)))?;

        check_denial(request.status)?;

        let denied = sqlx::query_as::<_, BorrowRequest>(
            "UPDATE borrow_requests SET status = $2, updated_at = NOW() WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(RequestStatus::Denied)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(denied)
    }

    /// Borrowed record with LoRA and patron details
    pub async fn get_borrowed(&self, id: i32) -> AppResult<BorrowedItemRow> {
        sqlx::query_as::<_, BorrowedItemRow>(&format!("{} WHERE b.id = $1", BORROWED_SELECT))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Borrowed record with id {} not found", id)))
    }

    /// Outstanding borrowed records, newest first; all patrons when `patron_id` is `None`
    pub async fn list_outstanding(&self, patron_id: Option<i32>) -> AppResult<Vec<BorrowedItemRow>> {
        let rows = sqlx::query_as::<_, BorrowedItemRow>(&format!(
            "{} WHERE b.returned_at IS NULL AND ($1::int4 IS NULL OR b.patron_id = $1) ORDER BY b.start_date DESC",
            BORROWED_SELECT
        ))
        .bind(patron_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// Mark a borrowed record returned and check the LoRA back in.
    /// A record that is already returned is left untouched.
    pub async fn mark_returned(&self, id: i32) -> AppResult<(ReturnOutcome, BorrowedItem)> {
        let mut tx = self.pool.begin().await?;

        let borrowed = sqlx::query_as::<_, BorrowedItem>("SELECT * FROM borrowed_items WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Borrowed record with id {} not found", id)))?;

        let outcome = borrowed.return_outcome();
        if outcome == ReturnOutcome::AlreadyReturned {
            tx.rollback().await?;
            return Ok((outcome, borrowed));
        }

        let returned = sqlx::query_as::<_, BorrowedItem>(
            "UPDATE borrowed_items SET returned_at = NOW() WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query("UPDATE loras SET status = $2 WHERE id = $1")
            .bind(borrowed.lora_id)
            .bind(LoraStatus::CheckedIn)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok((outcome, returned))
    }

    /// Outstanding records due within `window` of `now` that were not reminded yet
    pub async fn due_for_reminder(&self, now: DateTime<Utc>, window: Duration) -> AppResult<Vec<BorrowedItemRow>> {
        let rows = sqlx::query_as::<_, BorrowedItemRow>(&format!(
            r#"
            {}
            WHERE b.returned_at IS NULL
              AND b.reminder_sent = FALSE
              AND b.start_date + b.duration_secs * INTERVAL '1 second' BETWEEN $1 AND $2
            ORDER BY b.start_date
            "#,
            BORROWED_SELECT
        ))
        .bind(now)
        .bind(now + window)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn mark_reminder_sent(&self, id: i32) -> AppResult<()> {
        sqlx::query("UPDATE borrowed_items SET reminder_sent = TRUE WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
