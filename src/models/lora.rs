//! LoRA model and related types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use super::{comment::CommentDetails, enums::LoraStatus};

/// LoRA row from database
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Lora {
    pub id: i32,
    pub title: String,
    pub description: String,
    pub identifier: Option<String>,
    pub location: Option<String>,
    pub status: LoraStatus,
    /// Owning librarian
    pub librarian_id: Option<i32>,
    /// Average of all ratings, null when unrated
    pub rating: Option<f64>,
    pub views: i32,
    pub created_at: DateTime<Utc>,
}

/// LoRA list entry
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct LoraShort {
    pub id: i32,
    pub title: String,
    pub status: LoraStatus,
    pub rating: Option<f64>,
    pub like_count: i64,
    pub created_at: DateTime<Utc>,
}

/// LoRA detail view
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct LoraDetails {
    #[serde(flatten)]
    pub lora: Lora,
    pub like_count: i64,
    /// Whether the caller likes this LoRA
    pub liked: bool,
    /// The caller's own rating, if any
    pub my_rating: Option<i16>,
    pub comments: Vec<CommentDetails>,
}

/// Create LoRA request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateLora {
    #[validate(length(min = 1, max = 255, message = "Title must be 1 to 255 characters"))]
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub identifier: Option<String>,
    pub location: Option<String>,
}

/// Update LoRA request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateLora {
    #[validate(length(min = 1, max = 255, message = "Title must be 1 to 255 characters"))]
    pub title: Option<String>,
    pub description: Option<String>,
    pub identifier: Option<String>,
    pub location: Option<String>,
}

/// Update LoRA status request
#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateLoraStatus {
    pub status: LoraStatus,
}

/// Rate LoRA request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct RateLora {
    #[validate(range(min = 1, max = 5, message = "Rating must be between 1 and 5"))]
    pub rating: i16,
}

/// Rating result
#[derive(Debug, Serialize, ToSchema)]
pub struct RatingResult {
    pub rating: i16,
    pub average: Option<f64>,
}

/// Highest page number accepted; keeps the offset within i64
const MAX_PAGE: i64 = i64::MAX / 100;

/// LoRA search parameters
#[derive(Debug, Deserialize, IntoParams, ToSchema)]
pub struct LoraQuery {
    /// Matches title or description
    pub q: Option<String>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

impl LoraQuery {
    pub fn page(&self) -> i64 {
        self.page.unwrap_or(1).clamp(1, MAX_PAGE)
    }

    pub fn per_page(&self) -> i64 {
        self.per_page.unwrap_or(20).clamp(1, 100)
    }

    /// Rows to skip for the current page
    pub fn offset(&self) -> i64 {
        (self.page() - 1).saturating_mul(self.per_page())
    }
}

/// Result of toggling a like
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct LikeToggle {
    pub liked: bool,
    pub like_count: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rating_out_of_range_is_rejected() {
        assert!(RateLora { rating: 0 }.validate().is_err());
        assert!(RateLora { rating: 6 }.validate().is_err());
        assert!(RateLora { rating: 5 }.validate().is_ok());
    }

    #[test]
    fn pagination_is_clamped() {
        let query = LoraQuery { q: None, page: Some(0), per_page: Some(1000) };
        assert_eq!(query.page(), 1);
        assert_eq!(query.per_page(), 100);
        assert_eq!(query.offset(), 0);
    }

    #[test]
    fn huge_page_does_not_overflow_offset() {
        let query = LoraQuery { q: None, page: Some(i64::MAX), per_page: Some(100) };
        assert_eq!(query.page(), i64::MAX / 100);
        assert!(query.offset() > 0);

        let query = LoraQuery { q: None, page: Some(3), per_page: Some(20) };
        assert_eq!(query.offset(), 40);
    }
}
