use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post},
};

/// Public Router Module
///
/// Endpoints reachable without authentication: the health probe, the two
/// identity gateway operations, and read access to snippets that are
/// explicitly public.
///
/// Security mandate: the snippet handler here passes no claim into the
/// service, so the service can only ever release public records.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // GET /health
        // Unauthenticated liveness probe for monitors and load balancers.
        .route("/health", get(|| async { "ok" }))
        // POST /register
        // Account creation. Passwords are hashed before storage; duplicate
        // login/email answers 409.
        .route("/register", post(handlers::register))
        // POST /login
        // Credential exchange for a signed bearer token.
        .route("/login", post(handlers::login))
        // GET /snippets/{id}
        // Detail view of a single snippet, public visibility only. Private
        // snippets answer 401 rather than pretending not to exist.
        .route("/snippets/{id}", get(handlers::get_snippet))
}
