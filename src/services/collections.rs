//! Collections service: curation, allowed users and access-guarded detail

use super::access::{self, AccessDecision};
use crate::{
    error::{AppError, AppResult},
    models::{
        collection::{
            Collection, CollectionDetails, CollectionQuery, CollectionShort, CreateCollection,
            UpdateCollection,
        },
        comment::CommentTarget,
        lora::{LikeToggle, LoraShort},
        user::UserClaims,
    },
    repository::{likes::LikeTarget, Repository},
};

#[derive(Clone)]
pub struct CollectionsService {
    repository: Repository,
}

impl CollectionsService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    /// Load a collection and evaluate the viewer against it
    pub async fn decide(&self, viewer: Option<&UserClaims>, id: i32) -> AppResult<(Collection, AccessDecision)> {
        let collection = self.repository.collections.get_by_id(id).await?;
        let is_allowed = match viewer {
            Some(v) if collection.visibility.is_private() => {
                self.repository.collections.is_allowed(id, v.user_id).await?
            }
            _ => false,
        };
        let decision = access::evaluate(viewer, &collection, is_allowed);
        Ok((collection, decision))
    }

    /// Load a collection the viewer has full access to
    pub async fn get_accessible(&self, viewer: Option<&UserClaims>, id: i32) -> AppResult<Collection> {
        let (collection, decision) = self.decide(viewer, id).await?;
        access::require_full_access(decision)?;
        Ok(collection)
    }

    async fn get_as_creator(&self, claims: &UserClaims, id: i32) -> AppResult<Collection> {
        let collection = self.repository.collections.get_by_id(id).await?;
        access::require_creator(claims, &collection)?;
        Ok(collection)
    }

    pub async fn list(&self, viewer: Option<&UserClaims>, query: &CollectionQuery) -> AppResult<Vec<CollectionShort>> {
        self.repository.collections.list(viewer.is_some(), query).await
    }

    pub async fn create(&self, claims: &UserClaims, data: &CreateCollection) -> AppResult<Collection> {
        let visibility = access::effective_visibility(claims.role, data.visibility)?;
        let collection = self.repository.collections.create(claims.user_id, data, visibility).await?;
        tracing::info!(collection_id = collection.id, creator_id = claims.user_id, %visibility, "Created collection");
        Ok(collection)
    }

    /// Detail view with LoRAs (filtered by `q`) and comments; counts as a view
    pub async fn get_details(&self, viewer: Option<&UserClaims>, id: i32, q: Option<&str>) -> AppResult<CollectionDetails> {
        let mut collection = self.get_accessible(viewer, id).await?;
        self.repository.collections.increment_views(id).await?;
        collection.views += 1;

        let like_count = self.repository.likes.count(LikeTarget::Collection, id).await?;
        let liked = match viewer {
            Some(v) => self.repository.likes.is_liked(LikeTarget::Collection, id, v.user_id).await?,
            None => false,
        };
        let allowed_user_ids = match viewer {
            Some(v) if v.user_id == collection.creator_id => {
                Some(self.repository.collections.allowed_user_ids(id).await?)
            }
            _ => None,
        };
        let loras = self.repository.loras.list_in_collection(id, q).await?;
        let comments = self.repository.comments.list_for(CommentTarget::Collection(id)).await?;

        Ok(CollectionDetails {
            collection,
            like_count,
            liked,
            allowed_user_ids,
            loras,
            comments,
        })
    }

    pub async fn update(&self, claims: &UserClaims, id: i32, data: &UpdateCollection) -> AppResult<Collection> {
        self.get_as_creator(claims, id).await?;
        if data.visibility.is_some() {
            access::effective_visibility(claims.role, data.visibility)?;
        }
        self.repository.collections.update(id, data).await
    }

    pub async fn delete(&self, claims: &UserClaims, id: i32) -> AppResult<()> {
        self.get_as_creator(claims, id).await?;
        self.repository.collections.delete(id).await?;
        tracing::info!(collection_id = id, "Deleted collection");
        Ok(())
    }

    pub async fn add_lora(&self, claims: &UserClaims, id: i32, lora_id: i32) -> AppResult<()> {
        self.get_as_creator(claims, id).await?;
        self.repository.collections.add_lora(id, lora_id).await?;
        tracing::debug!(collection_id = id, lora_id, "Added LoRA to collection");
        Ok(())
    }

    pub async fn remove_lora(&self, claims: &UserClaims, id: i32, lora_id: i32) -> AppResult<()> {
        self.get_as_creator(claims, id).await?;
        self.repository.collections.remove_lora(id, lora_id).await
    }

    /// LoRAs the creator could still add
    pub async fn candidates(&self, claims: &UserClaims, id: i32, q: Option<&str>) -> AppResult<Vec<LoraShort>> {
        self.get_as_creator(claims, id).await?;
        self.repository.loras.list_candidates(id, q).await
    }

    /// Replace the allowed users of a private collection
    pub async fn set_allowed_users(&self, claims: &UserClaims, id: i32, user_ids: &[i32]) -> AppResult<Vec<i32>> {
        let collection = self.get_as_creator(claims, id).await?;
        if !collection.visibility.is_private() {
            return Err(AppError::BusinessRule(
                "Allowed users only apply to private collections".to_string(),
            ));
        }
        if !user_ids.is_empty() && !self.repository.users.all_exist(user_ids).await? {
            return Err(AppError::Validation("Some users do not exist".to_string()));
        }

        self.repository.collections.set_allowed_users(id, user_ids).await?;
        self.repository.collections.allowed_user_ids(id).await
    }

    pub async fn toggle_like(&self, claims: &UserClaims, id: i32) -> AppResult<LikeToggle> {
        self.get_accessible(Some(claims), id).await?;
        self.repository.likes.toggle(LikeTarget::Collection, id, claims.user_id).await
    }
}
