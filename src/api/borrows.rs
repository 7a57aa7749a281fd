//! Borrow lifecycle endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;
use utoipa::ToSchema;

use crate::{
    error::AppResult,
    models::borrow::{
        format_duration_short, ApprovalPlan, BorrowRequest, BorrowRequestDetails, BorrowedItemDetails,
        CreateBorrowRequest, ReturnOutcome,
    },
};

use super::AuthenticatedUser;

/// Borrow request response
#[derive(Serialize, ToSchema)]
pub struct BorrowRequestResponse {
    pub request: BorrowRequest,
    /// False when an existing pending request was updated
    pub created: bool,
    /// Requested duration as "Xd Yh"
    pub duration_display: String,
    pub message: String,
}

/// Approval response
#[derive(Serialize, ToSchema)]
pub struct ApprovalResponse {
    /// True when the request had been approved before
    pub already_approved: bool,
    pub borrowed: BorrowedItemDetails,
}

/// Return response
#[derive(Serialize, ToSchema)]
pub struct ReturnResponse {
    pub outcome: ReturnOutcome,
    pub message: String,
    pub borrowed: BorrowedItemDetails,
}

/// Reminder sweep result
#[derive(Serialize, ToSchema)]
pub struct RemindersResponse {
    /// Number of reminder emails sent
    pub sent: u32,
}

/// Ask to borrow a LoRA until a due date
#[utoipa::path(
    post,
    path = "/loras/{id}/borrow",
    tag = "borrows",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "LoRA ID")
    ),
    request_body = CreateBorrowRequest,
    responses(
        (status = 201, description = "Borrow request created", body = BorrowRequestResponse),
        (status = 200, description = "Pending request updated", body = BorrowRequestResponse),
        (status = 400, description = "Due date is not in the future"),
        (status = 404, description = "LoRA not found"),
        (status = 422, description = "LoRA not available")
    )
)]
pub async fn request_borrow(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(lora_id): Path<i32>,
    Json(data): Json<CreateBorrowRequest>,
) -> AppResult<(StatusCode, Json<BorrowRequestResponse>)> {
    let (request, created) = state
        .services
        .borrows
        .request(&claims, lora_id, data.due_date)
        .await?;

    let (code, message) = if created {
        (StatusCode::CREATED, "Borrow request submitted")
    } else {
        (StatusCode::OK, "Borrow request updated")
    };

    Ok((
        code,
        Json(BorrowRequestResponse {
            duration_display: format_duration_short(request.duration_secs),
            request,
            created,
            message: message.to_string(),
        }),
    ))
}

/// Pending borrow requests, oldest first
#[utoipa::path(
    get,
    path = "/borrow-requests",
    tag = "borrows",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Pending requests", body = Vec<BorrowRequestDetails>),
        (status = 403, description = "Librarian privileges required")
    )
)]
pub async fn list_borrow_requests(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> AppResult<Json<Vec<BorrowRequestDetails>>> {
    let requests = state.services.borrows.list_pending(&claims).await?;
    Ok(Json(requests))
}

/// Caller's own borrow requests
#[utoipa::path(
    get,
    path = "/borrow-requests/mine",
    tag = "borrows",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Own requests", body = Vec<BorrowRequestDetails>)
    )
)]
pub async fn my_borrow_requests(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> AppResult<Json<Vec<BorrowRequestDetails>>> {
    let requests = state.services.borrows.list_mine(&claims).await?;
    Ok(Json(requests))
}

/// Approve a borrow request
#[utoipa::path(
    post,
    path = "/borrow-requests/{id}/approve",
    tag = "borrows",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Borrow request ID")
    ),
    responses(
        (status = 200, description = "Request approved", body = ApprovalResponse),
        (status = 403, description = "Librarian privileges required"),
        (status = 404, description = "Request not found"),
        (status = 409, description = "LoRA is not checked in"),
        (status = 422, description = "Request was denied")
    )
)]
pub async fn approve_borrow_request(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<ApprovalResponse>> {
    let (plan, borrowed) = state.services.borrows.approve(&claims, id).await?;
    Ok(Json(ApprovalResponse {
        already_approved: plan == ApprovalPlan::AlreadyApproved,
        borrowed,
    }))
}

/// Deny a borrow request
#[utoipa::path(
    post,
    path = "/borrow-requests/{id}/deny",
    tag = "borrows",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Borrow request ID")
    ),
    responses(
        (status = 200, description = "Request denied", body = BorrowRequest),
        (status = 403, description = "Librarian privileges required"),
        (status = 404, description = "Request not found"),
        (status = 422, description = "Request is no longer pending")
    )
)]
pub async fn deny_borrow_request(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<BorrowRequest>> {
    let request = state.services.borrows.deny(&claims, id).await?;
    Ok(Json(request))
}

/// Outstanding borrowed LoRAs
#[utoipa::path(
    get,
    path = "/borrowed",
    tag = "borrows",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "All outstanding records for librarians, own for patrons", body = Vec<BorrowedItemDetails>)
    )
)]
pub async fn list_borrowed(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> AppResult<Json<Vec<BorrowedItemDetails>>> {
    let items = state.services.borrows.list_outstanding(&claims).await?;
    Ok(Json(items))
}

/// Return a borrowed LoRA
#[utoipa::path(
    post,
    path = "/borrowed/{id}/return",
    tag = "borrows",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Borrowed record ID")
    ),
    responses(
        (status = 200, description = "Returned, or already returned", body = ReturnResponse),
        (status = 403, description = "Not the borrower or a librarian"),
        (status = 404, description = "Borrowed record not found")
    )
)]
pub async fn return_borrowed(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<ReturnResponse>> {
    let (outcome, message, borrowed) = state.services.borrows.return_item(&claims, id).await?;
    Ok(Json(ReturnResponse {
        outcome,
        message,
        borrowed,
    }))
}

/// Send due-date reminders now
#[utoipa::path(
    post,
    path = "/borrowed/reminders",
    tag = "borrows",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Reminders sent", body = RemindersResponse),
        (status = 403, description = "Librarian privileges required")
    )
)]
pub async fn send_reminders(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> AppResult<Json<RemindersResponse>> {
    let sent = state.services.reminders.sweep_now(&claims).await?;
    Ok(Json(RemindersResponse { sent }))
}
