//! LoRA catalog service

use super::access;
use crate::{
    error::{AppError, AppResult},
    models::{
        comment::CommentTarget,
        lora::{
            CreateLora, LikeToggle, Lora, LoraDetails, LoraQuery, LoraShort, RatingResult, UpdateLora,
            UpdateLoraStatus,
        },
        user::UserClaims,
    },
    repository::{likes::LikeTarget, Repository},
};

#[derive(Clone)]
pub struct CatalogService {
    repository: Repository,
}

impl CatalogService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    /// Load a LoRA the viewer is allowed to see. Hidden LoRAs read as missing.
    pub async fn get_visible(&self, viewer: Option<&UserClaims>, id: i32) -> AppResult<Lora> {
        let lora = self.repository.loras.get_by_id(id).await?;
        let memberships = self
            .repository
            .loras
            .memberships(id, viewer.map(|v| v.user_id))
            .await?;

        if access::lora_visible_to(viewer, &memberships) {
            Ok(lora)
        } else {
            Err(AppError::NotFound(format!("LoRA with id {} not found", id)))
        }
    }

    /// Load a LoRA for modification by its owning librarian
    async fn get_owned(&self, claims: &UserClaims, id: i32) -> AppResult<Lora> {
        claims.require_librarian()?;
        let lora = self.repository.loras.get_by_id(id).await?;
        if lora.librarian_id != Some(claims.user_id) {
            return Err(AppError::Authorization(
                "Only the owning librarian can modify this LoRA".to_string(),
            ));
        }
        Ok(lora)
    }

    pub async fn search(&self, viewer: Option<&UserClaims>, query: &LoraQuery) -> AppResult<(Vec<LoraShort>, i64)> {
        self.repository
            .loras
            .search(
                viewer.map(|v| v.user_id),
                viewer.map(UserClaims::is_librarian).unwrap_or(false),
                query,
            )
            .await
    }

    /// Detail view; counts as a view
    pub async fn get_details(&self, viewer: Option<&UserClaims>, id: i32) -> AppResult<LoraDetails> {
        let mut lora = self.get_visible(viewer, id).await?;
        self.repository.loras.increment_views(id).await?;
        lora.views += 1;

        let like_count = self.repository.likes.count(LikeTarget::Lora, id).await?;
        let (liked, my_rating) = match viewer {
            Some(v) => (
                self.repository.likes.is_liked(LikeTarget::Lora, id, v.user_id).await?,
                self.repository.loras.user_rating(id, v.user_id).await?,
            ),
            None => (false, None),
        };
        let comments = self.repository.comments.list_for(CommentTarget::Lora(id)).await?;

        Ok(LoraDetails {
            lora,
            like_count,
            liked,
            my_rating,
            comments,
        })
    }

    pub async fn create(&self, claims: &UserClaims, data: &CreateLora) -> AppResult<Lora> {
        claims.require_librarian()?;
        let lora = self.repository.loras.create(claims.user_id, data).await?;
        tracing::info!(lora_id = lora.id, librarian_id = claims.user_id, "Created LoRA");
        Ok(lora)
    }

    pub async fn update(&self, claims: &UserClaims, id: i32, data: &UpdateLora) -> AppResult<Lora> {
        self.get_owned(claims, id).await?;
        self.repository.loras.update(id, data).await
    }

    pub async fn update_status(&self, claims: &UserClaims, id: i32, data: &UpdateLoraStatus) -> AppResult<Lora> {
        self.get_owned(claims, id).await?;
        let lora = self.repository.loras.set_status(id, data.status).await?;
        tracing::info!(lora_id = id, status = %data.status, "LoRA status changed");
        Ok(lora)
    }

    pub async fn delete(&self, claims: &UserClaims, id: i32) -> AppResult<()> {
        self.get_owned(claims, id).await?;
        self.repository.loras.delete(id).await?;
        tracing::info!(lora_id = id, librarian_id = claims.user_id, "Deleted LoRA");
        Ok(())
    }

    pub async fn mine(&self, claims: &UserClaims) -> AppResult<Vec<LoraShort>> {
        claims.require_librarian()?;
        self.repository.loras.list_by_librarian(claims.user_id).await
    }

    pub async fn toggle_like(&self, claims: &UserClaims, id: i32) -> AppResult<LikeToggle> {
        self.get_visible(Some(claims), id).await?;
        self.repository.likes.toggle(LikeTarget::Lora, id, claims.user_id).await
    }

    pub async fn rate(&self, claims: &UserClaims, id: i32, rating: i16) -> AppResult<RatingResult> {
        self.get_visible(Some(claims), id).await?;
        let average = self.repository.loras.rate(id, claims.user_id, rating).await?;
        Ok(RatingResult { rating, average })
    }
}
