//! Librarian user management endpoints

use axum::{
    extract::{Path, Query, State},
    Json,
};

use crate::{
    error::AppResult,
    models::user::{PatronQuery, UserShort},
};

use super::AuthenticatedUser;

/// Search patrons
#[utoipa::path(
    get,
    path = "/users/patrons",
    tag = "users",
    security(("bearer_auth" = [])),
    params(PatronQuery),
    responses(
        (status = 200, description = "Matching patrons", body = Vec<UserShort>),
        (status = 403, description = "Librarian privileges required")
    )
)]
pub async fn search_patrons(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Query(query): Query<PatronQuery>,
) -> AppResult<Json<Vec<UserShort>>> {
    claims.require_librarian()?;

    let users = state.services.users.search_patrons(query.q.as_deref()).await?;
    Ok(Json(users))
}

/// Promote a patron to librarian
#[utoipa::path(
    post,
    path = "/users/{id}/promote",
    tag = "users",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "User ID")
    ),
    responses(
        (status = 200, description = "User promoted", body = UserShort),
        (status = 403, description = "Librarian privileges required"),
        (status = 404, description = "User not found"),
        (status = 422, description = "User is already a librarian")
    )
)]
pub async fn promote(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<UserShort>> {
    let user = state.services.users.promote(&claims, id).await?;
    Ok(Json(user))
}
