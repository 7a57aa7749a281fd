//! Business logic services

pub mod access;
pub mod access_requests;
pub mod borrows;
pub mod catalog;
pub mod collections;
pub mod comments;
pub mod email;
pub mod notifications;
pub mod reminders;
pub mod users;

use std::sync::Arc;

use crate::{config::AppConfig, repository::Repository};

/// Container for all services
#[derive(Clone)]
pub struct Services {
    pub repository: Repository,
    pub users: users::UsersService,
    pub catalog: catalog::CatalogService,
    pub collections: collections::CollectionsService,
    pub comments: comments::CommentsService,
    pub access_requests: access_requests::AccessRequestsService,
    pub borrows: borrows::BorrowsService,
    pub notifications: notifications::NotificationService,
    pub reminders: reminders::RemindersService,
}

impl Services {
    /// Create all services with the given repository
    pub fn new(repository: Repository, config: &AppConfig) -> Self {
        let mailer = Arc::new(email::EmailService::new(config.email.clone()));
        let inbox = Arc::new(repository.notifications.clone());
        let notifications = notifications::NotificationService::new(mailer, inbox);

        let catalog = catalog::CatalogService::new(repository.clone());
        let collections = collections::CollectionsService::new(repository.clone());

        Self {
            users: users::UsersService::new(repository.clone(), config.auth.clone(), notifications.clone()),
            comments: comments::CommentsService::new(repository.clone(), catalog.clone(), collections.clone()),
            access_requests: access_requests::AccessRequestsService::new(
                repository.clone(),
                collections.clone(),
                notifications.clone(),
            ),
            borrows: borrows::BorrowsService::new(repository.clone(), catalog.clone(), notifications.clone()),
            reminders: reminders::RemindersService::new(
                repository.clone(),
                notifications.clone(),
                config.reminders.clone(),
            ),
            catalog,
            collections,
            notifications,
            repository,
        }
    }
}
