use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post, put},
};

/// Authenticated Router Module
///
/// Routes for any caller who passed the claim extractor. Every handler
/// receives a verified `Claim`; ownership checks and role grants are
/// enforced by the service layer's authorization engine, never here.
pub fn authenticated_routes() -> Router<AppState> {
    Router::<AppState>::new()
        // GET /me
        // The caller's own profile.
        .route("/me", get(handlers::get_me))
        // GET /me/snippets
        // All snippets owned by the caller, private ones included.
        .route("/me/snippets", get(handlers::get_my_snippets))
        // --- Snippets ---
        // POST /snippets
        // Submits a new snippet; ownership comes from the claim.
        .route("/snippets", post(handlers::create_snippet))
        // PUT/DELETE /snippets/{id}
        // Modify or remove a snippet. Owner-scoped, with the admin role
        // grant as the override path.
        .route(
            "/snippets/{id}",
            put(handlers::update_snippet).delete(handlers::delete_snippet),
        )
        // --- Account management ---
        // GET/PUT/DELETE /users/{id}
        // Self-service through the ownership override; any account through
        // an admin grant. Flipping the banned flag is grant-gated only.
        .route(
            "/users/{id}",
            get(handlers::get_user)
                .put(handlers::update_user)
                .delete(handlers::delete_user),
        )
}
