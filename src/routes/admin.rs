use crate::{AppState, handlers};
use axum::{Router, routing::get};

/// Admin Router Module
///
/// Routes for administrative oversight, nested under `/admin`. The
/// authentication layer above guarantees a verified claim; the admin role
/// check itself happens inside the services through grant-gated decisions,
/// so an authenticated non-admin receives 403 from the engine.
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        // GET /admin/stats
        // Live user and snippet counts for the dashboard. Both counts are
        // individually grant-gated on the unowned resource kind.
        .route("/stats", get(handlers::admin_stats))
}
