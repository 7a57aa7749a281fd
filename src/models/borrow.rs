//! Borrow requests and borrowed records, with the lifecycle guards that
//! drive transitions between them.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

use super::enums::{LoraStatus, RequestStatus};
use crate::error::{AppError, AppResult};

/// Borrow request row from database
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct BorrowRequest {
    pub id: i32,
    pub lora_id: i32,
    pub patron_id: i32,
    pub duration_secs: i64,
    pub status: RequestStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Borrowed record row from database. `returned_at` is null while outstanding.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct BorrowedItem {
    pub id: i32,
    pub borrow_request_id: i32,
    pub lora_id: i32,
    pub patron_id: i32,
    pub start_date: DateTime<Utc>,
    pub duration_secs: i64,
    pub reminder_sent: bool,
    pub returned_at: Option<DateTime<Utc>>,
}

impl BorrowedItem {
    pub fn due_date(&self) -> DateTime<Utc> {
        self.start_date + Duration::seconds(self.duration_secs)
    }

    pub fn is_outstanding(&self) -> bool {
        self.returned_at.is_none()
    }

    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        self.is_outstanding() && self.due_date() < now
    }

    /// Returning twice is a no-op rather than an error
    pub fn return_outcome(&self) -> ReturnOutcome {
        if self.is_outstanding() {
            ReturnOutcome::Returned
        } else {
            ReturnOutcome::AlreadyReturned
        }
    }

    /// Whether a due-soon reminder should go out now
    pub fn needs_reminder(&self, now: DateTime<Utc>, window: Duration) -> bool {
        let due = self.due_date();
        self.is_outstanding() && !self.reminder_sent && due >= now && due <= now + window
    }
}

/// Borrow request joined with LoRA and patron names
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct BorrowRequestDetails {
    pub id: i32,
    pub lora_id: i32,
    pub lora_title: String,
    pub patron_id: i32,
    pub patron_username: String,
    pub duration_secs: i64,
    pub status: RequestStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Borrowed record joined with LoRA and patron, ready for display
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct BorrowedItemDetails {
    pub id: i32,
    pub borrow_request_id: i32,
    pub lora_id: i32,
    pub lora_title: String,
    pub patron_id: i32,
    pub patron_username: String,
    pub start_date: DateTime<Utc>,
    pub due_date: DateTime<Utc>,
    pub duration_secs: i64,
    /// Compact duration, e.g. "3d 4h"
    pub duration_display: String,
    pub returned_at: Option<DateTime<Utc>>,
    pub is_overdue: bool,
}

/// Row shape used to build `BorrowedItemDetails`
#[derive(Debug, Clone, FromRow)]
pub struct BorrowedItemRow {
    #[sqlx(flatten)]
    pub item: BorrowedItem,
    pub lora_title: String,
    pub patron_username: String,
    pub patron_email: String,
}

impl BorrowedItemRow {
    pub fn into_details(self, now: DateTime<Utc>) -> BorrowedItemDetails {
        let item = self.item;
        BorrowedItemDetails {
            id: item.id,
            borrow_request_id: item.borrow_request_id,
            lora_id: item.lora_id,
            lora_title: self.lora_title,
            patron_id: item.patron_id,
            patron_username: self.patron_username,
            start_date: item.start_date,
            due_date: item.due_date(),
            duration_secs: item.duration_secs,
            duration_display: format_duration_short(item.duration_secs),
            returned_at: item.returned_at,
            is_overdue: item.is_overdue(now),
        }
    }
}

/// Borrow a LoRA until the given date
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateBorrowRequest {
    /// Requested due date (ISO 8601), must be in the future
    pub due_date: DateTime<Utc>,
}

/// What approving a borrow request must do
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApprovalPlan {
    /// First approval: create the borrowed record and put the LoRA in circulation
    CreateBorrowedRecord,
    /// Request was approved before; hand back the existing record
    AlreadyApproved,
}

/// What returning a borrowed record did
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ReturnOutcome {
    Returned,
    AlreadyReturned,
}

impl ReturnOutcome {
    pub fn message(&self, lora_title: &str) -> String {
        match self {
            ReturnOutcome::Returned => format!("'{}' has been returned successfully.", lora_title),
            ReturnOutcome::AlreadyReturned => "This LoRA has already been returned.".to_string(),
        }
    }
}

/// Compute the borrow duration for a requested due date
pub fn borrow_duration(due_date: DateTime<Utc>, now: DateTime<Utc>) -> AppResult<Duration> {
    if due_date <= now {
        return Err(AppError::Validation("Due date must be in the future.".to_string()));
    }
    Ok(due_date - now)
}

/// Decide how to approve a request given its status and the LoRA's status
pub fn plan_approval(request: RequestStatus, lora: LoraStatus) -> AppResult<ApprovalPlan> {
    match request {
        RequestStatus::Approved => Ok(ApprovalPlan::AlreadyApproved),
        RequestStatus::Denied => Err(AppError::BusinessRule(
            "Borrow request has already been denied".to_string(),
        )),
        RequestStatus::Pending if !lora.is_borrowable() => Err(AppError::Conflict(format!(
            "LoRA is {} and cannot be lent out",
            lora
        ))),
        RequestStatus::Pending => Ok(ApprovalPlan::CreateBorrowedRecord),
    }
}

/// Only pending requests can be denied
pub fn check_denial(request: RequestStatus) -> AppResult<()> {
    if request.is_pending() {
        Ok(())
    } else {
        Err(AppError::BusinessRule(format!(
            "Borrow request has already been {}",
            request
        )))
    }
}

/// The borrow lifecycle owns a LoRA's status while it is lent out
pub fn check_status_change(outstanding_borrows: i64) -> AppResult<()> {
    if outstanding_borrows > 0 {
        return Err(AppError::BusinessRule(
            "This LoRA is currently borrowed; its status changes when it is returned".to_string(),
        ));
    }
    Ok(())
}

/// Render a duration in seconds as "Xd Yh"
pub fn format_duration_short(secs: i64) -> String {
    let secs = secs.max(0);
    let days = secs / 86_400;
    let hours = (secs % 86_400) / 3_600;
    format!("{}d {}h", days, hours)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn borrowed(start: DateTime<Utc>, secs: i64) -> BorrowedItem {
        BorrowedItem {
            id: 1,
            borrow_request_id: 10,
            lora_id: 100,
            patron_id: 5,
            start_date: start,
            duration_secs: secs,
            reminder_sent: false,
            returned_at: None,
        }
    }

    #[test]
    fn due_date_in_the_past_is_rejected() {
        let now = Utc::now();
        assert!(borrow_duration(now, now).is_err());
        assert!(borrow_duration(now - Duration::hours(1), now).is_err());
        assert_eq!(borrow_duration(now + Duration::days(2), now).unwrap(), Duration::days(2));
    }

    #[test]
    fn pending_request_on_checked_in_lora_creates_record() {
        assert_eq!(
            plan_approval(RequestStatus::Pending, LoraStatus::CheckedIn).unwrap(),
            ApprovalPlan::CreateBorrowedRecord
        );
    }

    #[test]
    fn second_approval_is_idempotent() {
        // The LoRA is in circulation after the first approval
        assert_eq!(
            plan_approval(RequestStatus::Approved, LoraStatus::InCirculation).unwrap(),
            ApprovalPlan::AlreadyApproved
        );
    }

    #[test]
    fn denied_request_cannot_be_approved() {
        let err = plan_approval(RequestStatus::Denied, LoraStatus::CheckedIn).unwrap_err();
        assert!(matches!(err, AppError::BusinessRule(_)));
    }

    #[test]
    fn lora_already_lent_blocks_approval() {
        let err = plan_approval(RequestStatus::Pending, LoraStatus::InCirculation).unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
        assert!(plan_approval(RequestStatus::Pending, LoraStatus::BeingRepaired).is_err());
    }

    #[test]
    fn only_pending_requests_can_be_denied() {
        assert!(check_denial(RequestStatus::Pending).is_ok());
        assert!(check_denial(RequestStatus::Approved).is_err());
        assert!(check_denial(RequestStatus::Denied).is_err());
    }

    #[test]
    fn status_is_locked_while_borrowed() {
        assert!(check_status_change(0).is_ok());
        let err = check_status_change(1).unwrap_err();
        assert!(matches!(err, AppError::BusinessRule(_)));
    }

    #[test]
    fn returning_twice_is_a_no_op() {
        let mut item = borrowed(Utc::now(), 3600);
        assert_eq!(item.return_outcome(), ReturnOutcome::Returned);
        item.returned_at = Some(Utc::now());
        assert_eq!(item.return_outcome(), ReturnOutcome::AlreadyReturned);
        assert_eq!(
            ReturnOutcome::AlreadyReturned.message("anything"),
            "This LoRA has already been returned."
        );
    }

    #[test]
    fn overdue_only_while_outstanding() {
        let now = Utc::now();
        let mut item = borrowed(now - Duration::days(3), 86_400);
        assert!(item.is_overdue(now));
        item.returned_at = Some(now);
        assert!(!item.is_overdue(now));
    }

    #[test]
    fn reminder_window() {
        let now = Utc::now();
        let window = Duration::hours(24);

        let due_soon = borrowed(now - Duration::days(1), 86_400 + 3_600);
        assert!(due_soon.needs_reminder(now, window));

        let due_later = borrowed(now, 86_400 * 3);
        assert!(!due_later.needs_reminder(now, window));

        let already_late = borrowed(now - Duration::days(2), 86_400);
        assert!(!already_late.needs_reminder(now, window));

        let mut reminded = due_soon.clone();
        reminded.reminder_sent = true;
        assert!(!reminded.needs_reminder(now, window));
    }

    #[test]
    fn duration_formatting() {
        assert_eq!(format_duration_short(0), "0d 0h");
        assert_eq!(format_duration_short(90_000), "1d 1h");
        assert_eq!(format_duration_short(3 * 86_400 + 4 * 3_600 + 59), "3d 4h");
        assert_eq!(format_duration_short(-5), "0d 0h");
    }
}
