//! Comments on LoRAs and collections

use super::{catalog::CatalogService, collections::CollectionsService};
use crate::{
    error::{AppError, AppResult},
    models::{
        comment::{Comment, CommentTarget},
        lora::LikeToggle,
        user::UserClaims,
    },
    repository::{likes::LikeTarget, Repository},
};

#[derive(Clone)]
pub struct CommentsService {
    repository: Repository,
    catalog: CatalogService,
    collections: CollectionsService,
}

impl CommentsService {
    pub fn new(repository: Repository, catalog: CatalogService, collections: CollectionsService) -> Self {
        Self {
            repository,
            catalog,
            collections,
        }
    }

    /// The viewer must be able to see what they comment on
    async fn ensure_target_visible(&self, claims: &UserClaims, target: CommentTarget) -> AppResult<()> {
        match target {
            CommentTarget::Lora(id) => self.catalog.get_visible(Some(claims), id).await.map(|_| ()),
            CommentTarget::Collection(id) => self.collections.get_accessible(Some(claims), id).await.map(|_| ()),
        }
    }

    pub async fn post(&self, claims: &UserClaims, target: CommentTarget, body: &str) -> AppResult<Comment> {
        self.ensure_target_visible(claims, target).await?;
        self.repository.comments.create(claims.user_id, target, body.trim()).await
    }

    /// Authors delete their own comments only
    pub async fn delete(&self, claims: &UserClaims, id: i32) -> AppResult<()> {
        let comment = self.repository.comments.get_by_id(id).await?;
        if comment.user_id != claims.user_id {
            return Err(AppError::Authorization(
                "You can only delete your own comments".to_string(),
            ));
        }
        self.repository.comments.delete(id).await
    }

    pub async fn toggle_like(&self, claims: &UserClaims, id: i32) -> AppResult<LikeToggle> {
        let comment = self.repository.comments.get_by_id(id).await?;
        let target = match (comment.lora_id, comment.collection_id) {
            (Some(lora_id), _) => CommentTarget::Lora(lora_id),
            (None, Some(collection_id)) => CommentTarget::Collection(collection_id),
            (None, None) => {
                return Err(AppError::Internal(format!("Comment {} has no target", id)));
            }
        };
        self.ensure_target_visible(claims, target).await?;
        self.repository.likes.toggle(LikeTarget::Comment, id, claims.user_id).await
    }
}
