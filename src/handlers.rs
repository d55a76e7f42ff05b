use crate::{
    AppState, auth,
    error::ServiceError,
    models::{
        AdminStats, CreateSnippetRequest, LoginRequest, RegisterRequest, Snippet, TokenResponse,
        UpdateSnippetRequest, UpdateUserRequest, User,
    },
    rbac::Claim,
};
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};

// --- Account Handlers ---

/// register
///
/// [Public Route] Creates a new account with the default 'user' role.
/// Validation and password hashing happen in the service layer; a login or
/// email collision surfaces as 409.
#[utoipa::path(
    post,
    path = "/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Registered", body = User),
        (status = 400, description = "Malformed input"),
        (status = 409, description = "Login or email taken")
    )
)]
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<User>), ServiceError> {
    let user = state.users.register(payload).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

/// login
///
/// [Public Route] Exchanges credentials for a signed bearer token. The
/// service resolves the credentials; signing happens here because token
/// format is a transport concern, not a core one.
#[utoipa::path(
    post,
    path = "/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Token issued", body = TokenResponse),
        (status = 401, description = "Bad credentials"),
        (status = 403, description = "Account banned")
    )
)]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<TokenResponse>, ServiceError> {
    let user = state.users.authenticate(payload).await?;
    let token = auth::issue_token(user.id, &state.config.jwt_secret)?;
    Ok(Json(TokenResponse { token }))
}

/// get_me
///
/// [Authenticated Route] The caller's own profile. Always permitted through
/// the ownership override (unless banned).
#[utoipa::path(
    get,
    path = "/me",
    responses((status = 200, description = "Profile", body = User))
)]
pub async fn get_me(
    claim: Claim,
    State(state): State<AppState>,
) -> Result<Json<User>, ServiceError> {
    let user = state.users.get(&claim, claim.user_id).await?;
    Ok(Json(user))
}

/// get_user
///
/// [Authenticated Route] Fetch a user by id: self via ownership, anyone via
/// an admin grant.
#[utoipa::path(
    get,
    path = "/users/{id}",
    params(("id" = i64, Path, description = "User ID")),
    responses(
        (status = 200, description = "Found", body = User),
        (status = 403, description = "Not permitted"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn get_user(
    claim: Claim,
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<User>, ServiceError> {
    let user = state.users.get(&claim, id).await?;
    Ok(Json(user))
}

/// update_user
///
/// [Authenticated Route] Partial account update. The `banned` field is
/// grant-gated in the service: owners cannot flip it on themselves.
#[utoipa::path(
    put,
    path = "/users/{id}",
    params(("id" = i64, Path, description = "User ID")),
    request_body = UpdateUserRequest,
    responses(
        (status = 200, description = "Updated", body = User),
        (status = 403, description = "Not permitted"),
        (status = 404, description = "Not Found"),
        (status = 409, description = "Email taken")
    )
)]
pub async fn update_user(
    claim: Claim,
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateUserRequest>,
) -> Result<Json<User>, ServiceError> {
    let user = state.users.update(&claim, id, payload).await?;
    Ok(Json(user))
}

/// delete_user
///
/// [Authenticated Route] Deletes an account: self, or any account with an
/// admin grant.
#[utoipa::path(
    delete,
    path = "/users/{id}",
    params(("id" = i64, Path, description = "User ID")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 403, description = "Not permitted"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn delete_user(
    claim: Claim,
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ServiceError> {
    state.users.delete(&claim, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// --- Snippet Handlers ---

/// create_snippet
///
/// [Authenticated Route] Submits a new snippet. Ownership is taken from the
/// verified claim, never from the body.
#[utoipa::path(
    post,
    path = "/snippets",
    request_body = CreateSnippetRequest,
    responses(
        (status = 201, description = "Created", body = Snippet),
        (status = 400, description = "Malformed input"),
        (status = 403, description = "Role lacks the create grant")
    )
)]
pub async fn create_snippet(
    claim: Claim,
    State(state): State<AppState>,
    Json(payload): Json<CreateSnippetRequest>,
) -> Result<(StatusCode, Json<Snippet>), ServiceError> {
    let snippet = state.snippets.create(&claim, payload).await?;
    Ok((StatusCode::CREATED, Json(snippet)))
}

/// get_snippet
///
/// [Public Route] Retrieves a snippet by id. Only public snippets are
/// visible here; a private snippet answers 401 so the caller knows to
/// authenticate rather than being told it does not exist.
#[utoipa::path(
    get,
    path = "/snippets/{id}",
    params(("id" = i64, Path, description = "Snippet ID")),
    responses(
        (status = 200, description = "Found", body = Snippet),
        (status = 401, description = "Private snippet, no identity"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn get_snippet(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Snippet>, ServiceError> {
    let snippet = state.snippets.get(None, id).await?;
    Ok(Json(snippet))
}

/// get_my_snippets
///
/// [Authenticated Route] Lists every snippet owned by the caller, public and
/// private alike.
#[utoipa::path(
    get,
    path = "/me/snippets",
    responses((status = 200, description = "My snippets", body = [Snippet]))
)]
pub async fn get_my_snippets(
    claim: Claim,
    State(state): State<AppState>,
) -> Result<Json<Vec<Snippet>>, ServiceError> {
    let snippets = state.snippets.list_mine(&claim).await?;
    Ok(Json(snippets))
}

/// update_snippet
///
/// [Authenticated Route] Partial update of an owned snippet; admins may
/// update any snippet through their role grant.
#[utoipa::path(
    put,
    path = "/snippets/{id}",
    params(("id" = i64, Path, description = "Snippet ID")),
    request_body = UpdateSnippetRequest,
    responses(
        (status = 200, description = "Updated", body = Snippet),
        (status = 403, description = "Not owner"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn update_snippet(
    claim: Claim,
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateSnippetRequest>,
) -> Result<Json<Snippet>, ServiceError> {
    let snippet = state.snippets.update(&claim, id, payload).await?;
    Ok(Json(snippet))
}

/// delete_snippet
///
/// [Authenticated Route] Deletes an owned snippet. The service resolves the
/// snippet first, so "absent" and "not yours" stay distinguishable.
#[utoipa::path(
    delete,
    path = "/snippets/{id}",
    params(("id" = i64, Path, description = "Snippet ID")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 403, description = "Not owner"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn delete_snippet(
    claim: Claim,
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ServiceError> {
    state.snippets.delete(&claim, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// --- Admin Handlers ---

/// admin_stats
///
/// [Admin Route] Live record counts. Both service calls are grant-gated, so
/// a non-admin claim is rejected before any counting happens.
#[utoipa::path(
    get,
    path = "/admin/stats",
    responses(
        (status = 200, description = "Stats", body = AdminStats),
        (status = 403, description = "Not an admin")
    )
)]
pub async fn admin_stats(
    claim: Claim,
    State(state): State<AppState>,
) -> Result<Json<AdminStats>, ServiceError> {
    let total_users = state.users.count(&claim).await?;
    let total_snippets = state.snippets.count(&claim).await?;
    Ok(Json(AdminStats {
        total_users,
        total_snippets,
    }))
}
