//! Comment endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use crate::{error::AppResult, models::lora::LikeToggle};

use super::AuthenticatedUser;

/// Delete own comment
#[utoipa::path(
    delete,
    path = "/comments/{id}",
    tag = "comments",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Comment ID")
    ),
    responses(
        (status = 204, description = "Comment deleted"),
        (status = 403, description = "Not the author"),
        (status = 404, description = "Comment not found")
    )
)]
pub async fn delete_comment(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<StatusCode> {
    state.services.comments.delete(&claims, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Like or unlike a comment
#[utoipa::path(
    post,
    path = "/comments/{id}/like",
    tag = "comments",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Comment ID")
    ),
    responses(
        (status = 200, description = "Like toggled", body = LikeToggle),
        (status = 404, description = "Comment not found")
    )
)]
pub async fn like_comment(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<LikeToggle>> {
    let toggle = state.services.comments.toggle_like(&claims, id).await?;
    Ok(Json(toggle))
}
