//! Borrow lifecycle service: request, approve, deny, return

use chrono::Utc;

use super::{
    catalog::CatalogService,
    notifications::{self, NotificationService},
};
use crate::{
    error::{AppError, AppResult},
    models::{
        borrow::{
            borrow_duration, format_duration_short, ApprovalPlan, BorrowRequest, BorrowRequestDetails,
            BorrowedItemDetails, BorrowedItemRow, ReturnOutcome,
        },
        user::{UserClaims, UserShort},
    },
    repository::Repository,
};

#[derive(Clone)]
pub struct BorrowsService {
    repository: Repository,
    catalog: CatalogService,
    notifications: NotificationService,
}

impl BorrowsService {
    pub fn new(repository: Repository, catalog: CatalogService, notifications: NotificationService) -> Self {
        Self {
            repository,
            catalog,
            notifications,
        }
    }

    /// File a borrow request, or update the duration of the caller's pending
    /// request for the same LoRA. Returns whether a new request was created.
    pub async fn request(
        &self,
        claims: &UserClaims,
        lora_id: i32,
        due_date: chrono::DateTime<Utc>,
    ) -> AppResult<(BorrowRequest, bool)> {
        let lora = self.catalog.get_visible(Some(claims), lora_id).await?;
        if !lora.status.is_borrowable() {
            return Err(AppError::BusinessRule(
                "This LoRA is not available for borrowing".to_string(),
            ));
        }

        let duration = borrow_duration(due_date, Utc::now())?;
        let (request, created) = self
            .repository
            .borrows
            .upsert_pending(lora_id, claims.user_id, duration)
            .await?;

        tracing::info!(
            borrow_request_id = request.id,
            lora_id,
            patron_id = claims.user_id,
            created,
            "Borrow request saved"
        );
        Ok((request, created))
    }

    /// Pending requests, oldest first
    pub async fn list_pending(&self, claims: &UserClaims) -> AppResult<Vec<BorrowRequestDetails>> {
        claims.require_librarian()?;
        self.repository.borrows.list_pending().await
    }

    pub async fn list_mine(&self, claims: &UserClaims) -> AppResult<Vec<BorrowRequestDetails>> {
        self.repository.borrows.list_for_patron(claims.user_id).await
    }

    /// Approve a request. Approving twice returns the same borrowed record and
    /// does not notify again.
    pub async fn approve(&self, claims: &UserClaims, id: i32) -> AppResult<(ApprovalPlan, BorrowedItemDetails)> {
        claims.require_librarian()?;

        let (plan, borrowed) = self.repository.borrows.approve(id).await?;
        let row = self.repository.borrows.get_borrowed(borrowed.id).await?;

        if plan == ApprovalPlan::CreateBorrowedRecord {
            tracing::info!(
                borrow_request_id = id,
                lora_id = borrowed.lora_id,
                patron_id = borrowed.patron_id,
                borrowed_id = borrowed.id,
                "Borrow request approved"
            );
            let patron: UserShort = self.repository.users.get_by_id(row.item.patron_id).await?.into();
            self.notifications
                .dispatch(notifications::borrow_approved(
                    claims.user_id,
                    &patron,
                    row.item.lora_id,
                    &row.lora_title,
                    &format_duration_short(row.item.duration_secs),
                ))
                .await;
        } else {
            tracing::debug!(borrow_request_id = id, "Borrow request was already approved");
        }

        Ok((plan, row.into_details(Utc::now())))
    }

    pub async fn deny(&self, claims: &UserClaims, id: i32) -> AppResult<BorrowRequest> {
        claims.require_librarian()?;

        let request = self.repository.borrows.deny(id).await?;
        tracing::info!(
            borrow_request_id = id,
            lora_id = request.lora_id,
            patron_id = request.patron_id,
            "Borrow request denied"
        );

        let patron: UserShort = self.repository.users.get_by_id(request.patron_id).await?.into();
        let lora = self.repository.loras.get_by_id(request.lora_id).await?;
        self.notifications
            .dispatch(notifications::borrow_denied(claims.user_id, &patron, lora.id, &lora.title))
            .await;

        Ok(request)
    }

    /// Outstanding borrowed records: all for librarians, own for patrons
    pub async fn list_outstanding(&self, claims: &UserClaims) -> AppResult<Vec<BorrowedItemDetails>> {
        let patron_filter = if claims.is_librarian() { None } else { Some(claims.user_id) };
        let now = Utc::now();
        let rows = self.repository.borrows.list_outstanding(patron_filter).await?;
        Ok(rows.into_iter().map(|row| row.into_details(now)).collect())
    }

    /// Return a borrowed LoRA. Returning twice is a no-op.
    pub async fn return_item(&self, claims: &UserClaims, id: i32) -> AppResult<(ReturnOutcome, String, BorrowedItemDetails)> {
        let row = self.repository.borrows.get_borrowed(id).await?;
        if row.item.patron_id != claims.user_id && !claims.is_librarian() {
            return Err(AppError::Authorization(
                "Only the borrower or a librarian can return this LoRA".to_string(),
            ));
        }

        let (outcome, returned) = self.repository.borrows.mark_returned(id).await?;
        let message = outcome.message(&row.lora_title);

        if outcome == ReturnOutcome::Returned {
            tracing::info!(
                borrowed_id = id,
                lora_id = returned.lora_id,
                patron_id = returned.patron_id,
                returned_by = claims.user_id,
                "LoRA returned"
            );
            let patron: UserShort = self.repository.users.get_by_id(row.item.patron_id).await?.into();
            self.notifications
                .dispatch(notifications::lora_returned(&patron, &row.lora_title))
                .await;
        }

        let details = BorrowedItemRow {
            item: returned,
            lora_title: row.lora_title,
            patron_username: row.patron_username,
            patron_email: row.patron_email,
        }
        .into_details(Utc::now());

        Ok((outcome, message, details))
    }
}
