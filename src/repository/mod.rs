//! Repository layer for database operations

pub mod access_requests;
pub mod borrows;
pub mod collections;
pub mod comments;
pub mod likes;
pub mod loras;
pub mod notifications;
pub mod users;

use sqlx::{Pool, Postgres};

/// Main repository struct holding database connection pool
#[derive(Clone)]
pub struct Repository {
    pub pool: Pool<Postgres>,
    pub users: users::UsersRepository,
    pub loras: loras::LorasRepository,
    pub collections: collections::CollectionsRepository,
    pub comments: comments::CommentsRepository,
    pub likes: likes::LikesRepository,
    pub access_requests: access_requests::AccessRequestsRepository,
    pub borrows: borrows::BorrowsRepository,
    pub notifications: notifications::NotificationsRepository,
}

impl Repository {
    /// Create a new repository with the given database pool
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self {
            users: users::UsersRepository::new(pool.clone()),
            loras: loras::LorasRepository::new(pool.clone()),
            collections: collections::CollectionsRepository::new(pool.clone()),
            comments: comments::CommentsRepository::new(pool.clone()),
            likes: likes::LikesRepository::new(pool.clone()),
            access_requests: access_requests::AccessRequestsRepository::new(pool.clone()),
            borrows: borrows::BorrowsRepository::new(pool.clone()),
            notifications: notifications::NotificationsRepository::new(pool.clone()),
            pool,
        }
    }

    /// Round-trip to the database, used by the readiness probe
    pub async fn ping(&self) -> bool {
        sqlx::query("SELECT 1").execute(&self.pool).await.is_ok()
    }
}
