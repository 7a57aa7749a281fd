//! Access request review endpoints (librarians)

use axum::{
    extract::{Path, State},
    Json,
};

use crate::{
    error::AppResult,
    models::access_request::{AccessRequest, AccessRequestDetails},
};

use super::AuthenticatedUser;

/// Pending access requests, newest first
#[utoipa::path(
    get,
    path = "/access-requests",
    tag = "access-requests",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Pending requests", body = Vec<AccessRequestDetails>),
        (status = 403, description = "Librarian privileges required")
    )
)]
pub async fn list_access_requests(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> AppResult<Json<Vec<AccessRequestDetails>>> {
    let requests = state.services.access_requests.list_pending(&claims).await?;
    Ok(Json(requests))
}

/// Approve an access request
#[utoipa::path(
    post,
    path = "/access-requests/{id}/approve",
    tag = "access-requests",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Access request ID")
    ),
    responses(
        (status = 200, description = "Request approved", body = AccessRequest),
        (status = 403, description = "Librarian privileges required"),
        (status = 404, description = "Request not found"),
        (status = 422, description = "Request is no longer pending")
    )
)]
pub async fn approve_access_request(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<AccessRequest>> {
    let request = state.services.access_requests.approve(&claims, id).await?;
    Ok(Json(request))
}

/// Deny an access request
#[utoipa::path(
    post,
    path = "/access-requests/{id}/deny",
    tag = "access-requests",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Access request ID")
    ),
    responses(
        (status = 200, description = "Request denied", body = AccessRequest),
        (status = 403, description = "Librarian privileges required"),
        (status = 404, description = "Request not found"),
        (status = 422, description = "Request is no longer pending")
    )
)]
pub async fn deny_access_request(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<AccessRequest>> {
    let request = state.services.access_requests.deny(&claims, id).await?;
    Ok(Json(request))
}
