//! Access requests for private collections

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

use super::enums::RequestStatus;

/// Access request row from database
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct AccessRequest {
    pub id: i32,
    pub collection_id: i32,
    pub patron_id: i32,
    pub status: RequestStatus,
    pub created_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
}

impl AccessRequest {
    /// Approved and denied requests are archived
    pub fn is_archived(&self) -> bool {
        !self.status.is_pending()
    }
}

/// Access request joined with collection and patron names, for librarian review
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct AccessRequestDetails {
    pub id: i32,
    pub collection_id: i32,
    pub collection_title: String,
    pub collection_creator_id: i32,
    pub patron_id: i32,
    pub patron_username: String,
    pub patron_email: String,
    pub status: RequestStatus,
    pub created_at: DateTime<Utc>,
}
