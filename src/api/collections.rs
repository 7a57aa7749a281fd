//! Collection endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use validator::Validate;

use crate::{
    error::AppResult,
    models::{
        access_request::AccessRequest,
        collection::{
            Collection, CollectionDetails, CollectionLoraQuery, CollectionQuery, CollectionShort,
            CreateCollection, SetAllowedUsers, UpdateCollection,
        },
        comment::{Comment, CommentTarget, CreateComment},
        lora::{LikeToggle, LoraShort},
    },
};

use super::{AuthenticatedUser, MaybeUser};

/// List collections. Anonymous visitors only get public ones.
#[utoipa::path(
    get,
    path = "/collections",
    tag = "collections",
    params(CollectionQuery),
    responses(
        (status = 200, description = "Collections", body = Vec<CollectionShort>)
    )
)]
pub async fn list_collections(
    State(state): State<crate::AppState>,
    MaybeUser(viewer): MaybeUser,
    Query(query): Query<CollectionQuery>,
) -> AppResult<Json<Vec<CollectionShort>>> {
    let collections = state.services.collections.list(viewer.as_ref(), &query).await?;
    Ok(Json(collections))
}

/// Create a collection
#[utoipa::path(
    post,
    path = "/collections",
    tag = "collections",
    security(("bearer_auth" = [])),
    request_body = CreateCollection,
    responses(
        (status = 201, description = "Collection created", body = Collection),
        (status = 400, description = "Invalid input"),
        (status = 403, description = "Patrons cannot create private collections")
    )
)]
pub async fn create_collection(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Json(data): Json<CreateCollection>,
) -> AppResult<(StatusCode, Json<Collection>)> {
    data.validate()?;
    let collection = state.services.collections.create(&claims, &data).await?;
    Ok((StatusCode::CREATED, Json(collection)))
}

/// Collection details, guarded by the access rules
#[utoipa::path(
    get,
    path = "/collections/{id}",
    tag = "collections",
    params(
        ("id" = i32, Path, description = "Collection ID"),
        CollectionLoraQuery
    ),
    responses(
        (status = 200, description = "Collection details", body = CollectionDetails),
        (status = 403, description = "Private collection"),
        (status = 404, description = "Collection not found")
    )
)]
pub async fn get_collection(
    State(state): State<crate::AppState>,
    MaybeUser(viewer): MaybeUser,
    Path(id): Path<i32>,
    Query(query): Query<CollectionLoraQuery>,
) -> AppResult<Json<CollectionDetails>> {
    let details = state
        .services
        .collections
        .get_details(viewer.as_ref(), id, query.q.as_deref())
        .await?;
    Ok(Json(details))
}

/// Update a collection
#[utoipa::path(
    put,
    path = "/collections/{id}",
    tag = "collections",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Collection ID")
    ),
    request_body = UpdateCollection,
    responses(
        (status = 200, description = "Collection updated", body = Collection),
        (status = 403, description = "Not the creator"),
        (status = 404, description = "Collection not found"),
        (status = 422, description = "Shared LoRAs block the switch to private")
    )
)]
pub async fn update_collection(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
    Json(data): Json<UpdateCollection>,
) -> AppResult<Json<Collection>> {
    data.validate()?;
    let collection = state.services.collections.update(&claims, id, &data).await?;
    Ok(Json(collection))
}

/// Delete a collection
#[utoipa::path(
    delete,
    path = "/collections/{id}",
    tag = "collections",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Collection ID")
    ),
    responses(
        (status = 204, description = "Collection deleted"),
        (status = 403, description = "Not the creator"),
        (status = 404, description = "Collection not found")
    )
)]
pub async fn delete_collection(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<StatusCode> {
    state.services.collections.delete(&claims, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Add a LoRA to a collection
#[utoipa::path(
    post,
    path = "/collections/{id}/loras/{lora_id}",
    tag = "collections",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Collection ID"),
        ("lora_id" = i32, Path, description = "LoRA ID")
    ),
    responses(
        (status = 204, description = "LoRA added"),
        (status = 403, description = "Not the creator"),
        (status = 422, description = "Private collection exclusivity violated")
    )
)]
pub async fn add_lora(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path((id, lora_id)): Path<(i32, i32)>,
) -> AppResult<StatusCode> {
    state.services.collections.add_lora(&claims, id, lora_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Remove a LoRA from a collection
#[utoipa::path(
    delete,
    path = "/collections/{id}/loras/{lora_id}",
    tag = "collections",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Collection ID"),
        ("lora_id" = i32, Path, description = "LoRA ID")
    ),
    responses(
        (status = 204, description = "LoRA removed"),
        (status = 403, description = "Not the creator"),
        (status = 404, description = "LoRA not in collection")
    )
)]
pub async fn remove_lora(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path((id, lora_id)): Path<(i32, i32)>,
) -> AppResult<StatusCode> {
    state.services.collections.remove_lora(&claims, id, lora_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// LoRAs that can still be added to a collection
#[utoipa::path(
    get,
    path = "/collections/{id}/candidates",
    tag = "collections",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Collection ID"),
        CollectionLoraQuery
    ),
    responses(
        (status = 200, description = "Candidate LoRAs", body = Vec<LoraShort>),
        (status = 403, description = "Not the creator")
    )
)]
pub async fn candidates(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
    Query(query): Query<CollectionLoraQuery>,
) -> AppResult<Json<Vec<LoraShort>>> {
    let loras = state
        .services
        .collections
        .candidates(&claims, id, query.q.as_deref())
        .await?;
    Ok(Json(loras))
}

/// Replace the allowed users of a private collection
#[utoipa::path(
    put,
    path = "/collections/{id}/allowed-users",
    tag = "collections",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Collection ID")
    ),
    request_body = SetAllowedUsers,
    responses(
        (status = 200, description = "Allowed user IDs after the update", body = Vec<i32>),
        (status = 400, description = "Unknown user IDs"),
        (status = 403, description = "Not the creator"),
        (status = 422, description = "Collection is public")
    )
)]
pub async fn set_allowed_users(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
    Json(data): Json<SetAllowedUsers>,
) -> AppResult<Json<Vec<i32>>> {
    let ids = state
        .services
        .collections
        .set_allowed_users(&claims, id, &data.user_ids)
        .await?;
    Ok(Json(ids))
}

/// Like or unlike a collection
#[utoipa::path(
    post,
    path = "/collections/{id}/like",
    tag = "collections",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Collection ID")
    ),
    responses(
        (status = 200, description = "Like toggled", body = LikeToggle),
        (status = 403, description = "Private collection")
    )
)]
pub async fn like_collection(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<LikeToggle>> {
    let toggle = state.services.collections.toggle_like(&claims, id).await?;
    Ok(Json(toggle))
}

/// Comment on a collection
#[utoipa::path(
    post,
    path = "/collections/{id}/comments",
    tag = "comments",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Collection ID")
    ),
    request_body = CreateComment,
    responses(
        (status = 201, description = "Comment posted", body = Comment),
        (status = 403, description = "Private collection")
    )
)]
pub async fn comment_collection(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
    Json(data): Json<CreateComment>,
) -> AppResult<(StatusCode, Json<Comment>)> {
    data.validate()?;
    let comment = state
        .services
        .comments
        .post(&claims, CommentTarget::Collection(id), &data.body)
        .await?;
    Ok((StatusCode::CREATED, Json(comment)))
}

/// Request access to a private collection
#[utoipa::path(
    post,
    path = "/collections/{id}/access-requests",
    tag = "access-requests",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Collection ID")
    ),
    responses(
        (status = 201, description = "Access request filed", body = AccessRequest),
        (status = 403, description = "Librarians cannot request access"),
        (status = 409, description = "A request is already pending"),
        (status = 422, description = "Caller already has access")
    )
)]
pub async fn request_access(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<(StatusCode, Json<AccessRequest>)> {
    let request = state.services.access_requests.file(&claims, id).await?;
    Ok((StatusCode::CREATED, Json(request)))
}
