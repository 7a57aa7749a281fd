//! LoRA Shelf lending library
//!
//! A REST JSON API for sharing LoRA models: a catalog of LoRAs curated into
//! public and private collections, access requests for private collections,
//! and a borrow lifecycle with notifications and due-date reminders.

use std::sync::Arc;

pub mod api;
pub mod config;
pub mod error;
pub mod models;
pub mod repository;
pub mod services;

pub use config::AppConfig;
pub use error::{AppError, AppResult};

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub services: Arc<services::Services>,
}
