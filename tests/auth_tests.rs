//! Claim extractor tests: bearer decoding, expiry enforcement, the fresh
//! per-request user lookup, and the local-only identity header bypass.

use axum::extract::FromRequestParts;
use axum::http::{Request, header};
use chrono::Utc;
use jsonwebtoken::{EncodingKey, Header, encode};
use snipshare::AppState;
use snipshare::auth::{self, Claims};
use snipshare::config::{AppConfig, Env};
use snipshare::error::ServiceError;
use snipshare::memory::{MemorySnippetRepository, MemoryUserRepository};
use snipshare::models::User;
use snipshare::rbac::{AccessPolicy, Claim};
use snipshare::repository::{SnippetRepo, UserRepo};
use snipshare::service::{SnippetService, UserService};
use std::sync::Arc;
use tokio::test;

fn seeded_user(id: i64, login: &str, role: &str) -> User {
    let now = Utc::now();
    User {
        id,
        login: login.to_string(),
        email: format!("{login}@mail.com"),
        password_hash: format!("hash_{login}"),
        website: None,
        role: role.to_string(),
        banned: false,
        created_at: now,
        updated_at: now,
    }
}

fn state_in(env: Env, users: Vec<User>) -> AppState {
    let user_repo: UserRepo = Arc::new(MemoryUserRepository::with_users(users));
    let snippet_repo: SnippetRepo = Arc::new(MemorySnippetRepository::new());
    let policy = Arc::new(AccessPolicy::defaults());
    let config = AppConfig {
        env,
        ..AppConfig::default()
    };
    AppState {
        users: Arc::new(UserService::new(user_repo.clone(), policy.clone())),
        snippets: Arc::new(SnippetService::new(snippet_repo, policy)),
        user_repo,
        config,
    }
}

/// Runs the extractor exactly as axum would for an authenticated route.
async fn extract(state: &AppState, request: Request<()>) -> Result<Claim, ServiceError> {
    let (mut parts, _) = request.into_parts();
    Claim::from_request_parts(&mut parts, state).await
}

fn bearer(token: &str) -> Request<()> {
    Request::builder()
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .body(())
        .unwrap()
}

#[test]
async fn valid_token_resolves_a_fresh_claim() {
    let state = state_in(Env::Production, vec![seeded_user(7, "carol", "admin")]);
    let token = auth::issue_token(7, &state.config.jwt_secret).expect("signing");

    let claim = extract(&state, bearer(&token)).await.expect("valid bearer");
    assert_eq!(claim.user_id, 7);
    // Role and ban state come from storage, not from the token.
    assert_eq!(claim.role, "admin");
    assert!(!claim.banned);
}

#[test]
async fn missing_or_garbage_credentials_are_rejected() {
    let state = state_in(Env::Production, vec![seeded_user(7, "carol", "user")]);

    // No Authorization header at all.
    let bare = Request::builder().body(()).unwrap();
    assert!(matches!(
        extract(&state, bare).await,
        Err(ServiceError::Unauthenticated)
    ));

    // A header without the bearer scheme.
    let unschemed = Request::builder()
        .header(header::AUTHORIZATION, "Basic carol:hunter2")
        .body(())
        .unwrap();
    assert!(matches!(
        extract(&state, unschemed).await,
        Err(ServiceError::Unauthenticated)
    ));

    // A bearer that is not a token.
    assert!(matches!(
        extract(&state, bearer("not.a.token")).await,
        Err(ServiceError::Unauthenticated)
    ));
}

#[test]
async fn expired_token_is_rejected() {
    let state = state_in(Env::Production, vec![seeded_user(7, "carol", "user")]);

    // Same secret and algorithm as a real login, but expired an hour ago.
    let now = Utc::now().timestamp();
    let stale = Claims {
        sub: 7,
        iat: (now - 7200) as usize,
        exp: (now - 3600) as usize,
    };
    let token = encode(
        &Header::default(),
        &stale,
        &EncodingKey::from_secret(state.config.jwt_secret.as_bytes()),
    )
    .expect("signing");

    assert!(matches!(
        extract(&state, bearer(&token)).await,
        Err(ServiceError::Unauthenticated)
    ));
}

#[test]
async fn token_for_a_deleted_user_is_rejected() {
    let state = state_in(Env::Production, vec![seeded_user(7, "carol", "user")]);

    // Properly signed and unexpired, but the subject no longer exists.
    let token = auth::issue_token(99, &state.config.jwt_secret).expect("signing");
    assert!(matches!(
        extract(&state, bearer(&token)).await,
        Err(ServiceError::Unauthenticated)
    ));
}

#[test]
async fn identity_header_bypass_only_works_locally() {
    let with_header = || {
        Request::builder()
            .header("x-user-id", "7")
            .body(())
            .unwrap()
    };

    // Local: the header resolves against storage, no token required.
    let local = state_in(Env::Local, vec![seeded_user(7, "carol", "admin")]);
    let claim = extract(&local, with_header()).await.expect("local bypass");
    assert_eq!(claim.user_id, 7);
    assert_eq!(claim.role, "admin");

    // Local, but the id matches no record: falls through to bearer
    // validation and fails.
    let local = state_in(Env::Local, vec![]);
    assert!(matches!(
        extract(&local, with_header()).await,
        Err(ServiceError::Unauthenticated)
    ));

    // Production: the header is ignored entirely.
    let prod = state_in(Env::Production, vec![seeded_user(7, "carol", "admin")]);
    assert!(matches!(
        extract(&prod, with_header()).await,
        Err(ServiceError::Unauthenticated)
    ));
}
