//! OpenAPI documentation

use axum::Router;
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

use crate::api::{access_requests, auth, borrows, collections, comments, health, loras, notifications, users};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "LoRA Shelf API",
        version = "1.0.0",
        description = "LoRA lending library REST API"
    ),
    servers(
        (url = "/api/v1", description = "API v1")
    ),
    paths(
        // Health
        health::health_check,
        health::readiness_check,
        // Auth
        auth::register,
        auth::login,
        auth::me,
        auth::update_profile,
        // Users
        users::search_patrons,
        users::promote,
        // LoRAs
        loras::list_loras,
        loras::my_loras,
        loras::get_lora,
        loras::create_lora,
        loras::update_lora,
        loras::update_lora_status,
        loras::delete_lora,
        loras::like_lora,
        loras::rate_lora,
        loras::comment_lora,
        // Collections
        collections::list_collections,
        collections::create_collection,
        collections::get_collection,
        collections::update_collection,
        collections::delete_collection,
        collections::add_lora,
        collections::remove_lora,
        collections::candidates,
        collections::set_allowed_users,
        collections::like_collection,
        collections::comment_collection,
        collections::request_access,
        // Comments
        comments::delete_comment,
        comments::like_comment,
        // Access requests
        access_requests::list_access_requests,
        access_requests::approve_access_request,
        access_requests::deny_access_request,
        // Borrows
        borrows::request_borrow,
        borrows::list_borrow_requests,
        borrows::my_borrow_requests,
        borrows::approve_borrow_request,
        borrows::deny_borrow_request,
        borrows::list_borrowed,
        borrows::return_borrowed,
        borrows::send_reminders,
        // Notifications
        notifications::list_notifications,
        notifications::mark_read,
        notifications::mark_all_read,
    ),
    components(
        schemas(
            // Auth
            auth::LoginRequest,
            auth::LoginResponse,
            // Users
            crate::models::user::User,
            crate::models::user::UserShort,
            crate::models::user::RegisterUser,
            crate::models::user::UpdateProfile,
            crate::models::enums::Role,
            // LoRAs
            loras::LoraPage,
            crate::models::lora::Lora,
            crate::models::lora::LoraShort,
            crate::models::lora::LoraDetails,
            crate::models::lora::CreateLora,
            crate::models::lora::UpdateLora,
            crate::models::lora::UpdateLoraStatus,
            crate::models::lora::RateLora,
            crate::models::lora::RatingResult,
            crate::models::lora::LikeToggle,
            crate::models::enums::LoraStatus,
            // Collections
            crate::models::collection::Collection,
            crate::models::collection::CollectionShort,
            crate::models::collection::CollectionDetails,
            crate::models::collection::CreateCollection,
            crate::models::collection::UpdateCollection,
            crate::models::collection::SetAllowedUsers,
            crate::models::collection::CollectionSort,
            crate::models::enums::Visibility,
            crate::services::access::AccessDecision,
            // Comments
            crate::models::comment::Comment,
            crate::models::comment::CommentDetails,
            crate::models::comment::CreateComment,
            // Access requests
            crate::models::access_request::AccessRequest,
            crate::models::access_request::AccessRequestDetails,
            crate::models::enums::RequestStatus,
            // Borrows
            crate::models::borrow::BorrowRequest,
            crate::models::borrow::BorrowRequestDetails,
            crate::models::borrow::BorrowedItem,
            crate::models::borrow::BorrowedItemDetails,
            crate::models::borrow::CreateBorrowRequest,
            crate::models::borrow::ReturnOutcome,
            borrows::BorrowRequestResponse,
            borrows::ApprovalResponse,
            borrows::ReturnResponse,
            borrows::RemindersResponse,
            // Notifications
            crate::models::notification::Notification,
            notifications::MarkAllReadResponse,
            // Health
            health::HealthResponse,
            // Errors
            crate::error::ErrorResponse,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "auth", description = "Registration and login"),
        (name = "users", description = "Librarian user management"),
        (name = "loras", description = "LoRA catalog"),
        (name = "collections", description = "Curated collections"),
        (name = "comments", description = "Comments and comment likes"),
        (name = "access-requests", description = "Private collection access requests"),
        (name = "borrows", description = "Borrow requests and borrowed LoRAs"),
        (name = "notifications", description = "In-app notifications")
    )
)]
pub struct ApiDoc;

/// Registers the `bearer_auth` scheme used by protected paths
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

/// Create the OpenAPI documentation router
pub fn create_openapi_router() -> Router {
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_lists_lending_paths() {
        let doc = ApiDoc::openapi();
        assert!(doc.paths.paths.contains_key("/borrow-requests/{id}/approve"));
        assert!(doc.paths.paths.contains_key("/collections/{id}/access-requests"));
    }

    #[test]
    fn bearer_scheme_is_registered() {
        let doc = ApiDoc::openapi();
        let components = doc.components.expect("components");
        assert!(components.security_schemes.contains_key("bearer_auth"));
    }
}
