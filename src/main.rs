//! LoRA Shelf server
//!
//! REST API server for the LoRA lending library.

use anyhow::Context;
use axum::{
    routing::{delete, get, post, put},
    Router,
};
use sqlx::postgres::PgPoolOptions;
use std::net::SocketAddr;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use lorashelf_server::{api, config::AppConfig, repository::Repository, services::Services, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    let config = AppConfig::load().context("Failed to load configuration")?;

    // Initialize tracing
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("lorashelf_server={},tower_http=debug", config.logging.level).into());

    let registry = tracing_subscriber::registry().with(filter);
    if config.logging.format.eq_ignore_ascii_case("json") {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }

    tracing::info!("Starting LoRA Shelf Server v{}", env!("CARGO_PKG_VERSION"));

    let pool = PgPoolOptions::new()
        .max_connections(config.database.max_connections)
        .min_connections(config.database.min_connections)
        .connect(&config.database.url)
        .await
        .context("Failed to connect to database")?;

    tracing::info!("Connected to database");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .context("Failed to run database migrations")?;

    tracing::info!("Database migrations completed");

    let addr = SocketAddr::new(
        config.server.host.parse().context("Invalid host address")?,
        config.server.port,
    );

    let repository = Repository::new(pool);
    let services = Services::new(repository, &config);
    services
        .users
        .ensure_admin(&config.admin)
        .await
        .context("Failed to create initial librarian")?;

    // Background due-date reminders
    let _reminders = services.reminders.clone().spawn();

    let state = AppState {
        config: Arc::new(config),
        services: Arc::new(services),
    };

    let app = create_router(state);

    tracing::info!("Server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Create the application router with all routes
fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api_v1 = Router::new()
        // Health check
        .route("/health", get(api::health::health_check))
        .route("/ready", get(api::health::readiness_check))
        // Authentication
        .route("/auth/register", post(api::auth::register))
        .route("/auth/login", post(api::auth::login))
        .route("/auth/me", get(api::auth::me))
        .route("/auth/profile", put(api::auth::update_profile))
        // Users
        .route("/users/patrons", get(api::users::search_patrons))
        .route("/users/:id/promote", post(api::users::promote))
        // LoRAs
        .route("/loras", get(api::loras::list_loras).post(api::loras::create_lora))
        .route("/loras/mine", get(api::loras::my_loras))
        .route(
            "/loras/:id",
            get(api::loras::get_lora)
                .put(api::loras::update_lora)
                .delete(api::loras::delete_lora),
        )
        .route("/loras/:id/status", put(api::loras::update_lora_status))
        .route("/loras/:id/like", post(api::loras::like_lora))
        .route("/loras/:id/rate", post(api::loras::rate_lora))
        .route("/loras/:id/comments", post(api::loras::comment_lora))
        .route("/loras/:id/borrow", post(api::borrows::request_borrow))
        // Collections
        .route(
            "/collections",
            get(api::collections::list_collections).post(api::collections::create_collection),
        )
        .route(
            "/collections/:id",
            get(api::collections::get_collection)
                .put(api::collections::update_collection)
                .delete(api::collections::delete_collection),
        )
        .route(
            "/collections/:id/loras/:lora_id",
            post(api::collections::add_lora).delete(api::collections::remove_lora),
        )
        .route("/collections/:id/candidates", get(api::collections::candidates))
        .route("/collections/:id/allowed-users", put(api::collections::set_allowed_users))
        .route("/collections/:id/like", post(api::collections::like_collection))
        .route("/collections/:id/comments", post(api::collections::comment_collection))
        .route("/collections/:id/access-requests", post(api::collections::request_access))
        // Comments
        .route("/comments/:id", delete(api::comments::delete_comment))
        .route("/comments/:id/like", post(api::comments::like_comment))
        // Access requests
        .route("/access-requests", get(api::access_requests::list_access_requests))
        .route("/access-requests/:id/approve", post(api::access_requests::approve_access_request))
        .route("/access-requests/:id/deny", post(api::access_requests::deny_access_request))
        // Borrows
        .route("/borrow-requests", get(api::borrows::list_borrow_requests))
        .route("/borrow-requests/mine", get(api::borrows::my_borrow_requests))
        .route("/borrow-requests/:id/approve", post(api::borrows::approve_borrow_request))
        .route("/borrow-requests/:id/deny", post(api::borrows::deny_borrow_request))
        .route("/borrowed", get(api::borrows::list_borrowed))
        .route("/borrowed/reminders", post(api::borrows::send_reminders))
        .route("/borrowed/:id/return", post(api::borrows::return_borrowed))
        // Notifications
        .route("/notifications", get(api::notifications::list_notifications))
        .route("/notifications/read-all", post(api::notifications::mark_all_read))
        .route("/notifications/:id/read", post(api::notifications::mark_read))
        .with_state(state);

    // OpenAPI documentation
    let openapi = api::openapi::create_openapi_router();

    Router::new()
        .nest("/api/v1", api_v1)
        .merge(openapi)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CompressionLayer::new())
                .layer(cors),
        )
}
