//! Collection model ("models" in the catalog UI) and related types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use super::{comment::CommentDetails, enums::Visibility, lora::LoraShort};

/// Collection row from database
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Collection {
    pub id: i32,
    pub title: String,
    pub description: String,
    pub visibility: Visibility,
    pub creator_id: i32,
    pub views: i32,
    pub created_at: DateTime<Utc>,
}

/// A collection a LoRA belongs to, seen from one viewer
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct Membership {
    pub collection_id: i32,
    pub visibility: Visibility,
    pub creator_id: i32,
    /// Viewer is in the collection's allowed users
    pub allowed: bool,
}

/// Collection list entry
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct CollectionShort {
    pub id: i32,
    pub title: String,
    pub visibility: Visibility,
    pub creator_id: i32,
    pub views: i32,
    pub lora_count: i64,
    pub like_count: i64,
    pub created_at: DateTime<Utc>,
}

/// Collection detail view
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CollectionDetails {
    #[serde(flatten)]
    pub collection: Collection,
    pub like_count: i64,
    pub liked: bool,
    /// Only returned to the creator
    pub allowed_user_ids: Option<Vec<i32>>,
    pub loras: Vec<LoraShort>,
    pub comments: Vec<CommentDetails>,
}

/// Create collection request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateCollection {
    #[validate(length(min = 1, max = 255, message = "Title must be 1 to 255 characters"))]
    pub title: String,
    #[serde(default)]
    pub description: String,
    /// Defaults to public; only librarians may create private collections
    pub visibility: Option<Visibility>,
}

/// Update collection request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateCollection {
    #[validate(length(min = 1, max = 255, message = "Title must be 1 to 255 characters"))]
    pub title: Option<String>,
    pub description: Option<String>,
    pub visibility: Option<Visibility>,
}

/// Replace the allowed users of a private collection
#[derive(Debug, Deserialize, ToSchema)]
pub struct SetAllowedUsers {
    pub user_ids: Vec<i32>,
}

/// Sort order for collection lists
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, ToSchema, Default)]
#[serde(rename_all = "lowercase")]
pub enum CollectionSort {
    /// Newest first
    #[default]
    Newest,
    /// Most LoRAs first
    Items,
    /// Most viewed first
    Views,
}

impl CollectionSort {
    pub fn order_clause(&self) -> &'static str {
        match self {
            CollectionSort::Newest => "c.created_at DESC",
            CollectionSort::Items => "lora_count DESC, c.created_at DESC",
            CollectionSort::Views => "c.views DESC, c.created_at DESC",
        }
    }
}

/// Collection list parameters
#[derive(Debug, Deserialize, IntoParams, ToSchema)]
pub struct CollectionQuery {
    /// Matches title or description
    pub q: Option<String>,
    pub sort: Option<CollectionSort>,
}

/// Search parameters inside a collection
#[derive(Debug, Deserialize, IntoParams, ToSchema)]
pub struct CollectionLoraQuery {
    pub q: Option<String>,
}
