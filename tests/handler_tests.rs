//! Handler tests: the axum handlers invoked directly with an `AppState`
//! wired over the in-memory stores, checking status codes and the wire
//! shape of success and error bodies.

use axum::body::to_bytes;
use axum::extract::{Json, Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use chrono::Utc;
use snipshare::config::AppConfig;
use snipshare::error::{ErrorBody, ServiceError};
use snipshare::handlers;
use snipshare::memory::{MemorySnippetRepository, MemoryUserRepository};
use snipshare::models::{
    CreateSnippetRequest, LoginRequest, RegisterRequest, Snippet, UpdateUserRequest, User,
};
use snipshare::rbac::{AccessPolicy, Claim};
use snipshare::repository::{SnippetRepo, UserRepo};
use snipshare::service::{SnippetService, UserService};
use snipshare::AppState;
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

fn seeded_snippet(id: i64, user_id: i64, title: &str, public: bool) -> Snippet {
    let now = Utc::now();
    Snippet {
        id,
        user_id,
        title: title.to_string(),
        content: "print('hi')".to_string(),
        language: Some("python".to_string()),
        public,
        favorite: false,
        created_at: now,
        updated_at: now,
    }
}

fn claim_for(user: &User) -> Claim {
    Claim {
        user_id: user.id,
        role: user.role.clone(),
        banned: user.banned,
    }
}

fn state(users: Vec<User>, snippets: Vec<Snippet>) -> AppState {
    let user_repo: UserRepo = Arc::new(MemoryUserRepository::with_users(users));
    let snippet_repo: SnippetRepo = Arc::new(MemorySnippetRepository::with_snippets(snippets));
    let policy = Arc::new(AccessPolicy::defaults());
    AppState {
        users: Arc::new(UserService::new(user_repo.clone(), policy.clone())),
        snippets: Arc::new(SnippetService::new(snippet_repo, policy)),
        user_repo,
        config: AppConfig::default(),
    }
}

// --- Account endpoints ---

#[test]
async fn register_answers_created_and_hides_the_hash() {
    let app = state(vec![], vec![]);

    let (status, Json(user)) = handlers::register(
        State(app),
        Json(RegisterRequest {
            login: "newcomer".to_string(),
            email: "newcomer@mail.com".to_string(),
            password: "long-enough-pass".to_string(),
            website: None,
        }),
    )
    .await
    .expect("registration succeeds");

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(user.login, "newcomer");
    assert_eq!(user.role, "user");

    // The hash exists in storage but never crosses the wire.
    assert!(!user.password_hash.is_empty());
    let wire = serde_json::to_value(&user).unwrap();
    assert!(wire.get("password_hash").is_none());
}

#[test]
async fn register_conflict_maps_to_409_with_stable_code() {
    let app = state(vec![], vec![]);
    let payload = RegisterRequest {
        login: "repeat".to_string(),
        email: "repeat@mail.com".to_string(),
        password: "long-enough-pass".to_string(),
        website: None,
    };

    handlers::register(State(app.clone()), Json(payload.clone()))
        .await
        .expect("first registration");
    let err = handlers::register(State(app), Json(payload))
        .await
        .expect_err("second must conflict");

    let response = err.into_response();
    assert_eq!(response.status(), StatusCode::CONFLICT);
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body: ErrorBody = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body.code, "conflict");
    assert!(!body.message.is_empty());
}

#[test]
async fn login_issues_a_signed_token() {
    let app = state(vec![], vec![]);
    handlers::register(
        State(app.clone()),
        Json(RegisterRequest {
            login: "visitor".to_string(),
            email: "visitor@mail.com".to_string(),
            password: "long-enough-pass".to_string(),
            website: None,
        }),
    )
    .await
    .expect("registration");

    let Json(token) = handlers::login(
        State(app.clone()),
        Json(LoginRequest {
            login: "visitor".to_string(),
            password: "long-enough-pass".to_string(),
        }),
    )
    .await
    .expect("login succeeds");
    // Compact JWS form: header.payload.signature.
    assert_eq!(token.token.split('.').count(), 3);

    let err = handlers::login(
        State(app),
        Json(LoginRequest {
            login: "visitor".to_string(),
            password: "not-the-password".to_string(),
        }),
    )
    .await
    .expect_err("wrong password");
    assert!(matches!(err, ServiceError::Unauthenticated));
}

#[test]
async fn get_me_returns_the_callers_profile() {
    let alice = seeded_user(1, "alice", "user");
    let app = state(vec![alice.clone()], vec![]);

    let Json(me) = handlers::get_me(claim_for(&alice), State(app))
        .await
        .expect("own profile");
    assert_eq!(me.id, 1);
    assert_eq!(me.login, "alice");
}

#[test]
async fn update_user_merges_only_the_provided_fields() {
    let alice = seeded_user(1, "alice", "user");
    let app = state(vec![alice.clone()], vec![]);

    let Json(updated) = handlers::update_user(
        claim_for(&alice),
        State(app),
        Path(1),
        Json(UpdateUserRequest {
            website: Some(Some("alice.example".to_string())),
            ..UpdateUserRequest::default()
        }),
    )
    .await
    .expect("self update");

    assert_eq!(updated.website.as_deref(), Some("alice.example"));
    assert_eq!(updated.email, "alice@mail.com");
}

#[test]
async fn delete_user_answers_no_content() {
    let alice = seeded_user(1, "alice", "user");
    let app = state(vec![alice.clone()], vec![]);

    let status = handlers::delete_user(claim_for(&alice), State(app.clone()), Path(1))
        .await
        .expect("self delete");
    assert_eq!(status, StatusCode::NO_CONTENT);

    let err = handlers::get_me(claim_for(&alice), State(app))
        .await
        .expect_err("account is gone");
    assert!(matches!(err, ServiceError::NotFound(_)));
}

// --- Snippet endpoints ---

#[test]
async fn create_then_fetch_a_public_snippet_anonymously() {
    let alice = seeded_user(1, "alice", "user");
    let app = state(vec![alice.clone()], vec![]);

    let (status, Json(created)) = handlers::create_snippet(
        claim_for(&alice),
        State(app.clone()),
        Json(CreateSnippetRequest {
            title: "hello".to_string(),
            content: "print('hi')".to_string(),
            language: Some("python".to_string()),
            public: true,
        }),
    )
    .await
    .expect("creation");
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created.user_id, 1);

    // The public route carries no claim at all.
    let Json(fetched) = handlers::get_snippet(State(app), Path(created.id))
        .await
        .expect("public read");
    assert_eq!(fetched.title, "hello");
}

#[test]
async fn private_snippet_on_the_public_route_demands_authentication() {
    let alice = seeded_user(1, "alice", "user");
    let app = state(
        vec![alice],
        vec![seeded_snippet(10, 1, "secret", false)],
    );

    let err = handlers::get_snippet(State(app.clone()), Path(10))
        .await
        .expect_err("private must not leak");
    let response = err.into_response();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    // A missing snippet is a different answer.
    let err = handlers::get_snippet(State(app), Path(404))
        .await
        .expect_err("absent snippet");
    assert_eq!(err.into_response().status(), StatusCode::NOT_FOUND);
}

#[test]
async fn my_snippets_lists_both_visibilities() {
    let alice = seeded_user(1, "alice", "user");
    let app = state(
        vec![alice.clone()],
        vec![
            seeded_snippet(10, 1, "open", true),
            seeded_snippet(11, 1, "closed", false),
            seeded_snippet(12, 2, "foreign", true),
        ],
    );

    let Json(mine) = handlers::get_my_snippets(claim_for(&alice), State(app))
        .await
        .expect("listing");
    assert_eq!(mine.len(), 2);
    assert!(mine.iter().all(|s| s.user_id == 1));
}

#[test]
async fn delete_snippet_answers_no_content_for_the_owner_only() {
    let alice = seeded_user(1, "alice", "user");
    let mallory = seeded_user(2, "mallory", "user");
    let app = state(
        vec![alice.clone(), mallory.clone()],
        vec![seeded_snippet(10, 1, "target", false)],
    );

    let err = handlers::delete_snippet(claim_for(&mallory), State(app.clone()), Path(10))
        .await
        .expect_err("not the owner");
    assert_eq!(err.into_response().status(), StatusCode::FORBIDDEN);

    let status = handlers::delete_snippet(claim_for(&alice), State(app), Path(10))
        .await
        .expect("owner delete");
    assert_eq!(status, StatusCode::NO_CONTENT);
}

// --- Admin endpoints ---

#[test]
async fn admin_stats_is_grant_gated_and_counts_live_records() {
    let alice = seeded_user(1, "alice", "user");
    let admin = seeded_user(2, "boss", "admin");
    let app = state(
        vec![alice.clone(), admin.clone()],
        vec![
            seeded_snippet(10, 1, "one", true),
            seeded_snippet(11, 1, "two", false),
        ],
    );

    let err = handlers::admin_stats(claim_for(&alice), State(app.clone()))
        .await
        .expect_err("ordinary users are denied");
    assert!(matches!(err, ServiceError::Forbidden));

    let Json(stats) = handlers::admin_stats(claim_for(&admin), State(app))
        .await
        .expect("admin access");
    assert_eq!(stats.total_users, 2);
    assert_eq!(stats.total_snippets, 2);
}
