use axum::{
    extract::{FromRef, FromRequestParts},
    http::{header, request::Parts},
};
use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

use crate::{
    config::{AppConfig, Env},
    error::ServiceError,
    rbac::Claim,
    repository::UserRepo,
};

/// Claims
///
/// The signed JWT payload. Deliberately minimal: the subject is the numeric
/// user id, and role/ban state are re-read from storage on every request so
/// a role change or ban takes effect immediately, not at token expiry.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Subject: the user's id.
    pub sub: i64,
    /// Expiration time, seconds since epoch.
    pub exp: usize,
    /// Issued-at, seconds since epoch.
    pub iat: usize,
}

/// Token lifetime granted by POST /login.
const TOKEN_TTL_HOURS: i64 = 24;

/// issue_token
///
/// Signs a fresh token for an authenticated user. This is transport-side
/// plumbing: the core services never mint or verify tokens themselves.
pub fn issue_token(user_id: i64, secret: &str) -> Result<String, ServiceError> {
    let now = Utc::now();
    let claims = Claims {
        sub: user_id,
        iat: now.timestamp() as usize,
        exp: (now + Duration::hours(TOKEN_TTL_HOURS)).timestamp() as usize,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| {
        tracing::error!("token signing failed: {e}");
        ServiceError::StorageUnavailable
    })
}

/// Claim Extractor
///
/// Implements Axum's `FromRequestParts` so any authenticated handler can
/// take a [`Claim`] argument. The extractor is the identity-claim provider
/// the core trusts: it validates the bearer token, re-reads the user from
/// storage, and hands the services an already-verified claim. Nothing
/// downstream re-derives identity from raw credentials.
///
/// Flow:
/// 1. Dependency resolution: repository and config from the app state.
/// 2. Local bypass: in `Env::Local` a numeric `x-user-id` header resolves
///    directly against the database, which speeds up development.
/// 3. Bearer extraction and JWT decoding (expiry always enforced).
/// 4. Fresh user lookup, so deleted users are rejected and role/ban state
///    is current.
///
/// Rejection: `ServiceError::Unauthenticated` (401) on any failure.
impl<S> FromRequestParts<S> for Claim
where
    S: Send + Sync,
    UserRepo: FromRef<S>,
    AppConfig: FromRef<S>,
{
    type Rejection = ServiceError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let repo = UserRepo::from_ref(state);
        let config = AppConfig::from_ref(state);

        if config.env == Env::Local {
            if let Some(user_id_header) = parts.headers.get("x-user-id") {
                if let Ok(id_str) = user_id_header.to_str() {
                    if let Ok(user_id) = id_str.parse::<i64>() {
                        // The bypass still requires a real record so role and
                        // ban state are loaded correctly.
                        if let Ok(user) = repo.find_by_id(user_id).await {
                            return Ok(Claim {
                                user_id: user.id,
                                role: user.role,
                                banned: user.banned,
                            });
                        }
                    }
                }
            }
        }
        // Production, or the bypass fell through: standard bearer validation.

        let auth_header = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or(ServiceError::Unauthenticated)?;

        let token = auth_header
            .strip_prefix("Bearer ")
            .ok_or(ServiceError::Unauthenticated)?;

        let decoding_key = DecodingKey::from_secret(config.jwt_secret.as_bytes());
        let mut validation = Validation::default();
        validation.validate_exp = true;

        let token_data = decode::<Claims>(token, &decoding_key, &validation)
            .map_err(|_| ServiceError::Unauthenticated)?;

        // A valid signature is not enough: the user must still exist.
        let user = repo
            .find_by_id(token_data.claims.sub)
            .await
            .map_err(|_| ServiceError::Unauthenticated)?;

        Ok(Claim {
            user_id: user.id,
            role: user.role,
            banned: user.banned,
        })
    }
}
