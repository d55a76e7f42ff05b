use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

// --- Core Application Schemas (Mapped to Database) ---

/// User
///
/// The canonical identity record stored in the `users` table. The password
/// hash is an opaque PHC string produced by the service layer and is never
/// serialized outward.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, FromRow, Default)]
pub struct User {
    /// Storage-assigned, stable numeric primary key.
    pub id: i64,
    /// Globally unique login name.
    pub login: String,
    /// Globally unique email address.
    pub email: String,
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    pub website: Option<String>,
    /// The RBAC tier: 'admin', 'user' or 'guest'. The grant set attached to
    /// each role lives in the access policy, not here.
    pub role: String,
    /// Banned users are denied every action by the authorization engine.
    pub banned: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Snippet
///
/// An owned resource from the `snippets` table. Every snippet has exactly one
/// owner (`user_id`); ownership never changes after creation.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, FromRow, Default)]
pub struct Snippet {
    pub id: i64,
    /// Owner. Authorization decisions compare this against the claim.
    pub user_id: i64,
    pub title: String,
    pub content: String,
    pub language: Option<String>,
    /// Public snippets are readable without authentication.
    pub public: bool,
    pub favorite: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// --- Insert Payloads (Repository Input) ---

/// NewUser
///
/// A user record as handed to the repository: everything except the
/// storage-assigned id and timestamps. Built by the service layer after
/// validation and password hashing.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub login: String,
    pub email: String,
    pub password_hash: String,
    pub website: Option<String>,
    pub role: String,
}

/// NewSnippet
///
/// A snippet record ready for insertion; the owner comes from the verified
/// claim, never from the request body.
#[derive(Debug, Clone)]
pub struct NewSnippet {
    pub user_id: i64,
    pub title: String,
    pub content: String,
    pub language: Option<String>,
    pub public: bool,
    pub favorite: bool,
}

// --- Request Payloads (Input Schemas) ---

/// RegisterRequest
///
/// Input payload for the public registration endpoint (POST /register).
/// The password is hashed by the service layer before it reaches storage.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Default)]
pub struct RegisterRequest {
    pub login: String,
    pub email: String,
    pub password: String,
    pub website: Option<String>,
}

/// LoginRequest
///
/// Input payload for POST /login. Exchanged for a signed JWT on success.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Default)]
pub struct LoginRequest {
    pub login: String,
    pub password: String,
}

/// TokenResponse
///
/// Output of a successful login: a bearer token the client presents on
/// every authenticated request.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Default)]
pub struct TokenResponse {
    pub token: String,
}

/// Keeps an absent field distinguishable from an explicit `null`: a missing
/// key deserializes to `None` (leave unchanged) while a present `null`
/// becomes `Some(None)` (clear the value).
fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: serde::Deserialize<'de>,
    D: serde::Deserializer<'de>,
{
    serde::Deserialize::deserialize(deserializer).map(Some)
}

/// UpdateUserRequest
///
/// Partial update payload for PUT /users/{id}. Only provided fields change;
/// `website` additionally accepts an explicit `null` to clear the stored
/// value. The `banned` flag is grant-gated in the service layer: ownership
/// alone is not enough to flip it.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Default)]
pub struct UpdateUserRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "double_option"
    )]
    #[schema(value_type = Option<String>)]
    pub website: Option<Option<String>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub banned: Option<bool>,
}

/// CreateSnippetRequest
///
/// Input payload for submitting a new snippet (POST /snippets).
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Default)]
pub struct CreateSnippetRequest {
    pub title: String,
    pub content: String,
    pub language: Option<String>,
    /// Defaults to private when omitted.
    #[serde(default)]
    pub public: bool,
}

/// UpdateSnippetRequest
///
/// Partial update payload for PUT /snippets/{id}. Uses `Option<T>` so only
/// provided fields are overwritten.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Default)]
pub struct UpdateSnippetRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub public: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub favorite: Option<bool>,
}

// --- Dashboard Schemas (Output) ---

/// AdminStats
///
/// Output schema for the administrative statistics endpoint (GET /admin/stats).
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Default)]
pub struct AdminStats {
    pub total_users: i64,
    pub total_snippets: i64,
}
