use axum::{
    Router,
    extract::{FromRef, Request},
    http::HeaderName,
    middleware::{self, Next},
    response::Response,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{Level, Span};

// --- Module Structure ---

// Core application services and components.
pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod memory;
pub mod models;
pub mod rbac;
pub mod repository;
pub mod service;

// Module for routing segregation (Public, Authenticated, Admin).
pub mod routes;
use rbac::Claim;
use routes::{admin, authenticated, public};

// --- Public Re-exports ---

// Makes the state building blocks accessible to the entry point and tests.
pub use config::AppConfig;
pub use rbac::AccessPolicy;
pub use repository::{PostgresRepository, SnippetRepo, UserRepo};
pub use service::{SnippetService, UserService};

/// ApiDoc
///
/// Aggregates every annotated path and schema into the OpenAPI document
/// served at `/api-docs/openapi.json` (Swagger UI at `/swagger-ui`).
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::register, handlers::login, handlers::get_me, handlers::get_user,
        handlers::update_user, handlers::delete_user, handlers::create_snippet,
        handlers::get_snippet, handlers::get_my_snippets, handlers::update_snippet,
        handlers::delete_snippet, handlers::admin_stats,
    ),
    components(
        schemas(
            models::User, models::Snippet, models::RegisterRequest, models::LoginRequest,
            models::TokenResponse, models::UpdateUserRequest, models::CreateSnippetRequest,
            models::UpdateSnippetRequest, models::AdminStats, error::ErrorBody,
        )
    ),
    tags(
        (name = "snipshare", description = "Snippet sharing API")
    )
)]
struct ApiDoc;

/// AppState
///
/// The single, immutable, thread-safe container shared by every request:
/// the two services, the repository handle the claim extractor needs, and
/// the loaded configuration. All wired once in `main` — dependency
/// injection, not globals.
#[derive(Clone)]
pub struct AppState {
    pub users: Arc<UserService>,
    pub snippets: Arc<SnippetService>,
    /// Used by the claim extractor for its fresh per-request user lookup.
    pub user_repo: UserRepo,
    pub config: AppConfig,
}

// --- Axum FromRef Extractor Implementations ---

// Let the claim extractor pull just what it needs from the shared state.

impl FromRef<AppState> for UserRepo {
    fn from_ref(app_state: &AppState) -> UserRepo {
        app_state.user_repo.clone()
    }
}

impl FromRef<AppState> for AppConfig {
    fn from_ref(app_state: &AppState) -> AppConfig {
        app_state.config.clone()
    }
}

/// auth_middleware
///
/// Gate for the authenticated route group. Extracting `Claim` runs the full
/// verification flow (bearer decode + user lookup); a failure rejects the
/// request with 401 before any handler executes.
async fn auth_middleware(_claim: Claim, request: Request, next: Next) -> Response {
    next.run(request).await
}

/// create_router
///
/// Assembles the routing structure, applies the observability and CORS
/// layers, and registers the shared state.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    // Header name constant for request correlation.
    let x_request_id = HeaderName::from_static("x-request-id");

    let base_router = Router::new()
        // Documentation: auto-generated Swagger UI.
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        // Public routes: no middleware.
        .merge(public::public_routes())
        // Authenticated routes: gated by the claim extractor middleware.
        .merge(
            authenticated::authenticated_routes()
                .route_layer(middleware::from_fn_with_state(state.clone(), auth_middleware)),
        )
        // Admin routes: authenticated here, grant-checked in the services.
        .nest(
            "/admin",
            admin::admin_routes()
                .route_layer(middleware::from_fn_with_state(state.clone(), auth_middleware)),
        )
        .with_state(state);

    base_router
        .layer(
            ServiceBuilder::new()
                // Unique id per request, propagated back to the client and
                // stamped into every span.
                .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(trace_span_logger)
                        .on_response(
                            DefaultOnResponse::new()
                                .level(Level::INFO)
                                .latency_unit(tower_http::LatencyUnit::Millis),
                        ),
                )
                .layer(PropagateRequestIdLayer::new(x_request_id)),
        )
        .layer(cors)
}

/// trace_span_logger
///
/// Span factory for `TraceLayer`: correlates every log line of a request by
/// its `x-request-id` alongside method and URI.
fn trace_span_logger(request: &axum::http::Request<axum::body::Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown");

    tracing::info_span!(
        "http_request",
        method = ?request.method(),
        uri = ?request.uri(),
        req_id = %request_id,
    )
}
