//! Comment model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::Validate;

/// Comment row from database. Exactly one of `lora_id` / `collection_id` is set.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Comment {
    pub id: i32,
    pub user_id: i32,
    pub lora_id: Option<i32>,
    pub collection_id: Option<i32>,
    pub body: String,
    pub created_at: DateTime<Utc>,
}

/// Comment with author and like count, as displayed under a LoRA or collection
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct CommentDetails {
    pub id: i32,
    pub user_id: i32,
    pub username: String,
    pub body: String,
    pub like_count: i64,
    pub created_at: DateTime<Utc>,
}

/// Post comment request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateComment {
    #[validate(length(min = 1, max = 5000, message = "Comment must be 1 to 5000 characters"))]
    pub body: String,
}

/// What a comment is attached to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommentTarget {
    Lora(i32),
    Collection(i32),
}
