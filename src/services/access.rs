//! Access-control rules for collections and LoRAs.
//!
//! Everything here is pure: callers load the facts (visibility, creator,
//! allowed flag, memberships) and these functions decide.

use serde::Serialize;
use utoipa::ToSchema;

use crate::{
    error::{AppError, AppResult},
    models::{
        collection::{Collection, Membership},
        enums::{Role, Visibility},
        user::UserClaims,
    },
};

/// Outcome of evaluating a viewer against a collection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum AccessDecision {
    FullAccess,
    /// The viewer may file an access request
    RequestRequired,
    Denied,
}

/// Decide whether `viewer` may see the contents of `collection`.
/// `is_allowed` is whether the viewer is in the collection's allowed users.
pub fn evaluate(viewer: Option<&UserClaims>, collection: &Collection, is_allowed: bool) -> AccessDecision {
    if !collection.visibility.is_private() {
        return AccessDecision::FullAccess;
    }

    match viewer {
        None => AccessDecision::Denied,
        Some(claims) if claims.user_id == collection.creator_id || is_allowed => AccessDecision::FullAccess,
        Some(claims) if claims.role == Role::Librarian => AccessDecision::Denied,
        Some(_) => AccessDecision::RequestRequired,
    }
}

/// Turn a decision into an error for handlers that need full access
pub fn require_full_access(decision: AccessDecision) -> AppResult<()> {
    match decision {
        AccessDecision::FullAccess => Ok(()),
        AccessDecision::RequestRequired => Err(AppError::Authorization(
            "This collection is private. Request access to view it.".to_string(),
        )),
        AccessDecision::Denied => Err(AppError::Authorization(
            "You do not have access to this collection".to_string(),
        )),
    }
}

/// Only the creator may edit, delete, or curate a collection
pub fn require_creator(claims: &UserClaims, collection: &Collection) -> AppResult<()> {
    if claims.user_id == collection.creator_id {
        Ok(())
    } else {
        Err(AppError::Authorization(
            "Only the creator can modify this collection".to_string(),
        ))
    }
}

/// Whether a LoRA is visible given the collections it belongs to
pub fn lora_visible_to(viewer: Option<&UserClaims>, memberships: &[Membership]) -> bool {
    if viewer.map(UserClaims::is_librarian).unwrap_or(false) || memberships.is_empty() {
        return true;
    }

    memberships.iter().any(|m| match m.visibility {
        Visibility::Public => true,
        Visibility::Private => viewer
            .map(|v| v.user_id == m.creator_id || m.allowed)
            .unwrap_or(false),
    })
}

/// Private collections hold their LoRAs exclusively.
///
/// `target` is the collection receiving the LoRA and `others` the visibility
/// of every other collection the LoRA already belongs to.
pub fn check_membership(target: Visibility, others: &[Visibility]) -> AppResult<()> {
    if others.iter().any(Visibility::is_private) {
        return Err(AppError::BusinessRule(
            "This LoRA belongs to a private collection and cannot be added elsewhere".to_string(),
        ));
    }
    if target.is_private() && !others.is_empty() {
        return Err(AppError::BusinessRule(
            "A LoRA in a private collection cannot belong to any other collection".to_string(),
        ));
    }
    Ok(())
}

/// A collection can only turn private when none of its LoRAs is shared
pub fn check_private_switch(shared_loras: i64) -> AppResult<()> {
    if shared_loras > 0 {
        return Err(AppError::BusinessRule(format!(
            "{} LoRA(s) in this collection also belong to other collections",
            shared_loras
        )));
    }
    Ok(())
}

/// Visibility a user may give to a new or edited collection
pub fn effective_visibility(role: Role, requested: Option<Visibility>) -> AppResult<Visibility> {
    match (role, requested) {
        (Role::Patron, Some(Visibility::Private)) => Err(AppError::Authorization(
            "Patrons are not allowed to create private collections.".to_string(),
        )),
        (_, requested) => Ok(requested.unwrap_or_default()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn claims(user_id: i32, role: Role) -> UserClaims {
        UserClaims {
            sub: format!("user{}", user_id),
            user_id,
            role,
            exp: 0,
            iat: 0,
        }
    }

    fn collection(visibility: Visibility, creator_id: i32) -> Collection {
        Collection {
            id: 1,
            title: "Portraits".to_string(),
            description: String::new(),
            visibility,
            creator_id,
            views: 0,
            created_at: Utc::now(),
        }
    }

    fn membership(visibility: Visibility, creator_id: i32, allowed: bool) -> Membership {
        Membership {
            collection_id: 1,
            visibility,
            creator_id,
            allowed,
        }
    }

    #[test]
    fn public_collections_are_open_to_everyone() {
        let c = collection(Visibility::Public, 1);
        assert_eq!(evaluate(None, &c, false), AccessDecision::FullAccess);
        assert_eq!(evaluate(Some(&claims(2, Role::Patron)), &c, false), AccessDecision::FullAccess);
    }

    #[test]
    fn private_collection_grants_creator_and_allowed_users() {
        let c = collection(Visibility::Private, 1);
        assert_eq!(evaluate(Some(&claims(1, Role::Librarian)), &c, false), AccessDecision::FullAccess);
        assert_eq!(evaluate(Some(&claims(2, Role::Patron)), &c, true), AccessDecision::FullAccess);
    }

    #[test]
    fn private_collection_asks_patrons_to_request() {
        let c = collection(Visibility::Private, 1);
        assert_eq!(evaluate(Some(&claims(2, Role::Patron)), &c, false), AccessDecision::RequestRequired);
    }

    #[test]
    fn private_collection_denies_anonymous_and_other_librarians() {
        let c = collection(Visibility::Private, 1);
        assert_eq!(evaluate(None, &c, false), AccessDecision::Denied);
        assert_eq!(evaluate(Some(&claims(3, Role::Librarian)), &c, false), AccessDecision::Denied);
    }

    #[test]
    fn full_access_required_maps_to_authorization_errors() {
        assert!(require_full_access(AccessDecision::FullAccess).is_ok());
        assert!(matches!(
            require_full_access(AccessDecision::RequestRequired),
            Err(AppError::Authorization(_))
        ));
    }

    #[test]
    fn only_creator_may_edit() {
        let c = collection(Visibility::Public, 1);
        assert!(require_creator(&claims(1, Role::Patron), &c).is_ok());
        assert!(require_creator(&claims(2, Role::Librarian), &c).is_err());
    }

    #[test]
    fn loose_and_public_loras_are_visible() {
        assert!(lora_visible_to(None, &[]));
        assert!(lora_visible_to(None, &[membership(Visibility::Public, 1, false)]));
    }

    #[test]
    fn private_loras_need_creator_or_allowed_viewer() {
        let private = [membership(Visibility::Private, 1, false)];
        assert!(!lora_visible_to(None, &private));
        assert!(!lora_visible_to(Some(&claims(2, Role::Patron)), &private));
        assert!(lora_visible_to(Some(&claims(1, Role::Patron)), &private));
        assert!(lora_visible_to(Some(&claims(9, Role::Librarian)), &private));

        let allowed = [membership(Visibility::Private, 1, true)];
        assert!(lora_visible_to(Some(&claims(2, Role::Patron)), &allowed));
    }

    #[test]
    fn private_collection_requires_exclusive_lora() {
        assert!(check_membership(Visibility::Private, &[]).is_ok());
        assert!(check_membership(Visibility::Private, &[Visibility::Public]).is_err());
        assert!(check_membership(Visibility::Public, &[Visibility::Public]).is_ok());
    }

    #[test]
    fn lora_in_private_collection_cannot_join_another() {
        assert!(check_membership(Visibility::Public, &[Visibility::Private]).is_err());
    }

    #[test]
    fn switching_to_private_requires_no_shared_loras() {
        assert!(check_private_switch(0).is_ok());
        assert!(check_private_switch(2).is_err());
    }

    #[test]
    fn patrons_cannot_pick_private() {
        assert!(effective_visibility(Role::Patron, Some(Visibility::Private)).is_err());
        assert_eq!(effective_visibility(Role::Patron, None).unwrap(), Visibility::Public);
        assert_eq!(
            effective_visibility(Role::Librarian, Some(Visibility::Private)).unwrap(),
            Visibility::Private
        );
    }
}
