//! Access requests for private collections

use super::{
    access::AccessDecision,
    collections::CollectionsService,
    notifications::{self, NotificationService},
};
use crate::{
    error::{AppError, AppResult},
    models::{
        access_request::{AccessRequest, AccessRequestDetails},
        enums::Role,
        user::{UserClaims, UserShort},
    },
    repository::Repository,
};

#[derive(Clone)]
pub struct AccessRequestsService {
    repository: Repository,
    collections: CollectionsService,
    notifications: NotificationService,
}

impl AccessRequestsService {
    pub fn new(repository: Repository, collections: CollectionsService, notifications: NotificationService) -> Self {
        Self {
            repository,
            collections,
            notifications,
        }
    }

    /// A patron asks for access to a private collection
    pub async fn file(&self, claims: &UserClaims, collection_id: i32) -> AppResult<AccessRequest> {
        let (collection, decision) = self.collections.decide(Some(claims), collection_id).await?;

        match decision {
            AccessDecision::RequestRequired => {}
            AccessDecision::FullAccess if collection.visibility.is_private() => {
                return Err(AppError::BusinessRule(
                    "You already have access to this collection.".to_string(),
                ));
            }
            AccessDecision::FullAccess => {
                return Err(AppError::BusinessRule(
                    "This collection is public; no access request is needed.".to_string(),
                ));
            }
            AccessDecision::Denied => {
                return Err(AppError::Authorization(
                    "Librarians cannot request access to collections.".to_string(),
                ));
            }
        }

        let request = self.repository.access_requests.create(collection_id, claims.user_id).await?;
        tracing::info!(
            access_request_id = request.id,
            collection_id,
            patron_id = claims.user_id,
            "Access request filed"
        );

        let patron: UserShort = self.repository.users.get_by_id(claims.user_id).await?.into();
        let creator: UserShort = self.repository.users.get_by_id(collection.creator_id).await?.into();
        self.notifications
            .dispatch(notifications::access_requested(&patron, &creator, collection.id, &collection.title))
            .await;

        Ok(request)
    }

    /// Pending requests for librarian review
    pub async fn list_pending(&self, claims: &UserClaims) -> AppResult<Vec<AccessRequestDetails>> {
        claims.require_librarian()?;
        self.repository.access_requests.list_pending().await
    }

    pub async fn approve(&self, claims: &UserClaims, id: i32) -> AppResult<AccessRequest> {
        claims.require_librarian()?;
        let request = self.repository.access_requests.approve(id).await?;
        tracing::info!(
            access_request_id = id,
            collection_id = request.collection_id,
            patron_id = request.patron_id,
            "Access request approved"
        );

        let details = self.repository.access_requests.get_details(id).await?;
        self.notifications
            .dispatch(notifications::access_approved(
                claims.user_id,
                &patron_of(&details),
                details.collection_id,
                &details.collection_title,
            ))
            .await;

        Ok(request)
    }

    pub async fn deny(&self, claims: &UserClaims, id: i32) -> AppResult<AccessRequest> {
        claims.require_librarian()?;
        let request = self.repository.access_requests.deny(id).await?;
        tracing::info!(
            access_request_id = id,
            collection_id = request.collection_id,
            patron_id = request.patron_id,
            "Access request denied"
        );

        let details = self.repository.access_requests.get_details(id).await?;
        self.notifications
            .dispatch(notifications::access_denied(
                claims.user_id,
                &patron_of(&details),
                details.collection_id,
                &details.collection_title,
            ))
            .await;

        Ok(request)
    }
}

fn patron_of(details: &AccessRequestDetails) -> UserShort {
    UserShort {
        id: details.patron_id,
        username: details.patron_username.clone(),
        email: details.patron_email.clone(),
        role: Role::Patron,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn patron_is_rebuilt_from_request_details() {
        let details = AccessRequestDetails {
            id: 1,
            collection_id: 2,
            collection_title: "Portraits".to_string(),
            collection_creator_id: 3,
            patron_id: 4,
            patron_username: "ada".to_string(),
            patron_email: "ada@example.com".to_string(),
            status: crate::models::enums::RequestStatus::Pending,
            created_at: chrono::Utc::now(),
        };
        let patron = patron_of(&details);
        assert_eq!(patron.id, 4);
        assert_eq!(patron.email, "ada@example.com");
    }
}
