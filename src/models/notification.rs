//! In-app notifications

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};

/// Kind of object a notification points at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum TargetKind {
    Lora,
    Collection,
    User,
}

impl TargetKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TargetKind::Lora => "lora",
            TargetKind::Collection => "collection",
            TargetKind::User => "user",
        }
    }
}

/// Notification row from database
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Notification {
    pub id: i32,
    pub recipient_id: i32,
    pub actor_id: Option<i32>,
    pub verb: String,
    pub target_kind: String,
    pub target_id: i32,
    pub description: String,
    pub unread: bool,
    pub created_at: DateTime<Utc>,
}

/// A notification about to be delivered
#[derive(Debug, Clone, PartialEq)]
pub struct NewNotification {
    pub recipient_id: i32,
    pub actor_id: Option<i32>,
    pub verb: String,
    pub target_kind: TargetKind,
    pub target_id: i32,
    pub description: String,
}

/// Email half of a notification
#[derive(Debug, Clone, PartialEq)]
pub struct OutgoingEmail {
    pub to: String,
    pub subject: String,
    pub body: String,
}

/// Notification list parameters
#[derive(Debug, Deserialize, IntoParams, ToSchema)]
pub struct NotificationQuery {
    /// Only unread notifications
    pub unread: Option<bool>,
}
