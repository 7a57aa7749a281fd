//! LoRA catalog endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;
use utoipa::ToSchema;
use validator::Validate;

use crate::{
    error::AppResult,
    models::{
        comment::{Comment, CommentTarget, CreateComment},
        lora::{
            CreateLora, LikeToggle, Lora, LoraDetails, LoraQuery, LoraShort, RateLora, RatingResult,
            UpdateLora, UpdateLoraStatus,
        },
    },
};

use super::{AuthenticatedUser, MaybeUser};

/// Paginated response wrapper
#[derive(Serialize, ToSchema)]
#[aliases(LoraPage = PaginatedResponse<LoraShort>)]
pub struct PaginatedResponse<T>
where
    T: for<'a> ToSchema<'a>,
{
    /// Entries on this page
    pub items: Vec<T>,
    /// Total number of matching entries
    pub total: i64,
    /// Current page number
    pub page: i64,
    /// Entries per page
    pub per_page: i64,
}

/// Search LoRAs visible to the caller
#[utoipa::path(
    get,
    path = "/loras",
    tag = "loras",
    params(LoraQuery),
    responses(
        (status = 200, description = "Visible LoRAs", body = LoraPage)
    )
)]
pub async fn list_loras(
    State(state): State<crate::AppState>,
    MaybeUser(viewer): MaybeUser,
    Query(query): Query<LoraQuery>,
) -> AppResult<Json<LoraPage>> {
    let (items, total) = state.services.catalog.search(viewer.as_ref(), &query).await?;

    Ok(Json(PaginatedResponse {
        items,
        total,
        page: query.page(),
        per_page: query.per_page(),
    }))
}

/// LoRAs owned by the calling librarian
#[utoipa::path(
    get,
    path = "/loras/mine",
    tag = "loras",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Own LoRAs", body = Vec<LoraShort>),
        (status = 403, description = "Librarian privileges required")
    )
)]
pub async fn my_loras(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> AppResult<Json<Vec<LoraShort>>> {
    let loras = state.services.catalog.mine(&claims).await?;
    Ok(Json(loras))
}

/// Get LoRA details
#[utoipa::path(
    get,
    path = "/loras/{id}",
    tag = "loras",
    params(
        ("id" = i32, Path, description = "LoRA ID")
    ),
    responses(
        (status = 200, description = "LoRA details", body = LoraDetails),
        (status = 404, description = "LoRA not found or not visible")
    )
)]
pub async fn get_lora(
    State(state): State<crate::AppState>,
    MaybeUser(viewer): MaybeUser,
    Path(id): Path<i32>,
) -> AppResult<Json<LoraDetails>> {
    let details = state.services.catalog.get_details(viewer.as_ref(), id).await?;
    Ok(Json(details))
}

/// Create a LoRA
#[utoipa::path(
    post,
    path = "/loras",
    tag = "loras",
    security(("bearer_auth" = [])),
    request_body = CreateLora,
    responses(
        (status = 201, description = "LoRA created", body = Lora),
        (status = 400, description = "Invalid input"),
        (status = 403, description = "Librarian privileges required")
    )
)]
pub async fn create_lora(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Json(data): Json<CreateLora>,
) -> AppResult<(StatusCode, Json<Lora>)> {
    data.validate()?;
    let lora = state.services.catalog.create(&claims, &data).await?;
    Ok((StatusCode::CREATED, Json(lora)))
}

/// Update LoRA fields
#[utoipa::path(
    put,
    path = "/loras/{id}",
    tag = "loras",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "LoRA ID")
    ),
    request_body = UpdateLora,
    responses(
        (status = 200, description = "LoRA updated", body = Lora),
        (status = 403, description = "Not the owning librarian"),
        (status = 404, description = "LoRA not found")
    )
)]
pub async fn update_lora(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
    Json(data): Json<UpdateLora>,
) -> AppResult<Json<Lora>> {
    data.validate()?;
    let lora = state.services.catalog.update(&claims, id, &data).await?;
    Ok(Json(lora))
}

/// Change circulation status
#[utoipa::path(
    put,
    path = "/loras/{id}/status",
    tag = "loras",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "LoRA ID")
    ),
    request_body = UpdateLoraStatus,
    responses(
        (status = 200, description = "Status updated", body = Lora),
        (status = 403, description = "Not the owning librarian"),
        (status = 404, description = "LoRA not found"),
        (status = 422, description = "LoRA is currently borrowed")
    )
)]
pub async fn update_lora_status(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
    Json(data): Json<UpdateLoraStatus>,
) -> AppResult<Json<Lora>> {
    let lora = state.services.catalog.update_status(&claims, id, &data).await?;
    Ok(Json(lora))
}

/// Delete a LoRA
#[utoipa::path(
    delete,
    path = "/loras/{id}",
    tag = "loras",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "LoRA ID")
    ),
    responses(
        (status = 204, description = "LoRA deleted"),
        (status = 403, description = "Not the owning librarian"),
        (status = 404, description = "LoRA not found")
    )
)]
pub async fn delete_lora(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<StatusCode> {
    state.services.catalog.delete(&claims, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Like or unlike a LoRA
#[utoipa::path(
    post,
    path = "/loras/{id}/like",
    tag = "loras",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "LoRA ID")
    ),
    responses(
        (status = 200, description = "Like toggled", body = LikeToggle),
        (status = 404, description = "LoRA not found")
    )
)]
pub async fn like_lora(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<LikeToggle>> {
    let toggle = state.services.catalog.toggle_like(&claims, id).await?;
    Ok(Json(toggle))
}

/// Rate a LoRA from 1 to 5
#[utoipa::path(
    post,
    path = "/loras/{id}/rate",
    tag = "loras",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "LoRA ID")
    ),
    request_body = RateLora,
    responses(
        (status = 200, description = "Rating stored", body = RatingResult),
        (status = 400, description = "Rating out of range"),
        (status = 404, description = "LoRA not found")
    )
)]
pub async fn rate_lora(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
    Json(data): Json<RateLora>,
) -> AppResult<Json<RatingResult>> {
    data.validate()?;
    let result = state.services.catalog.rate(&claims, id, data.rating).await?;
    Ok(Json(result))
}

/// Comment on a LoRA
#[utoipa::path(
    post,
    path = "/loras/{id}/comments",
    tag = "comments",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "LoRA ID")
    ),
    request_body = CreateComment,
    responses(
        (status = 201, description = "Comment posted", body = Comment),
        (status = 404, description = "LoRA not found")
    )
)]
pub async fn comment_lora(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
    Json(data): Json<CreateComment>,
) -> AppResult<(StatusCode, Json<Comment>)> {
    data.validate()?;
    let comment = state
        .services
        .comments
        .post(&claims, CommentTarget::Lora(id), &data.body)
        .await?;
    Ok((StatusCode::CREATED, Json(comment)))
}
