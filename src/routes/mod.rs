/// Router Module Index
///
/// Organizes the routing surface into security-segregated modules so access
/// control is applied explicitly at the module level (via Axum layers)
/// rather than remembered per-handler.

/// Routes accessible to any client, anonymous included. Data handlers here
/// only ever return publicly visible records.
pub mod public;

/// Routes protected by the claim extractor middleware; every handler
/// receives a verified identity.
pub mod authenticated;

/// Routes restricted to claims holding administrative grants.
pub mod admin;
