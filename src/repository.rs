use crate::models::{NewSnippet, NewUser, Snippet, User};
use async_trait::async_trait;
use sqlx::PgPool;
use std::sync::Arc;
use thiserror::Error;

/// RepoError
///
/// The storage-level failure taxonomy. The repository reports what happened
/// to the data; it never interprets business meaning (no authorization or
/// validation logic lives behind this boundary).
#[derive(Debug, Error)]
pub enum RepoError {
    /// No record with the requested identity.
    #[error("record not found")]
    NotFound,

    /// A uniqueness invariant (login/email) was violated. The operation
    /// leaves no partial record behind.
    #[error("{0}")]
    Conflict(String),

    /// Transient infrastructure failure; the message carries the underlying
    /// driver error for logging.
    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

pub type RepoResult<T> = Result<T, RepoError>;

/// UserRepository
///
/// The storage contract for user records. The service layer depends only on
/// this trait; the Postgres implementation and the in-memory double satisfy
/// the identical contract, so tests substitute freely.
///
/// **Send + Sync + async_trait** are required to make the trait object
/// (`Arc<dyn UserRepository>`) shareable across Axum's task boundaries.
#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn find_by_id(&self, id: i64) -> RepoResult<User>;
    /// Lookup by the unique login name; used by the authentication flow.
    async fn find_by_login(&self, login: &str) -> RepoResult<User>;
    /// Insert a new record. Storage assigns the id and timestamps. Fails
    /// with `Conflict` when login or email are already taken.
    async fn create(&self, user: NewUser) -> RepoResult<User>;
    /// Overwrite the stored record matching `user.id`. Updating a
    /// nonexistent id is a no-op success; see the contract notes in
    /// DESIGN.md before changing that.
    async fn update(&self, user: User) -> RepoResult<()>;
    /// Remove by id. Deleting a nonexistent id is a no-op success.
    async fn delete(&self, id: i64) -> RepoResult<()>;
    /// Total live records.
    async fn count(&self) -> RepoResult<i64>;
}

/// SnippetRepository
///
/// The storage contract for snippets; mirrors the user contract and adds the
/// owner listing the authenticated routes need.
#[async_trait]
pub trait SnippetRepository: Send + Sync {
    async fn find_by_id(&self, id: i64) -> RepoResult<Snippet>;
    async fn list_by_owner(&self, user_id: i64) -> RepoResult<Vec<Snippet>>;
    async fn create(&self, snippet: NewSnippet) -> RepoResult<Snippet>;
    /// Same missing-id semantics as the user contract.
    async fn update(&self, snippet: Snippet) -> RepoResult<()>;
    async fn delete(&self, id: i64) -> RepoResult<()>;
    async fn count(&self) -> RepoResult<i64>;
}

/// Shared handles used throughout the application state.
pub type UserRepo = Arc<dyn UserRepository>;
pub type SnippetRepo = Arc<dyn SnippetRepository>;

/// Maps a driver error onto the contract taxonomy. Unique-index violations
/// become `Conflict` (the constraint name tells us which field collided);
/// everything else is treated as transient.
fn map_sqlx(err: sqlx::Error) -> RepoError {
    match err {
        sqlx::Error::RowNotFound => RepoError::NotFound,
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            let field = match db.constraint() {
                Some(c) if c.contains("login") => "login",
                Some(c) if c.contains("email") => "email",
                _ => "record",
            };
            RepoError::Conflict(format!("{field} already exists"))
        }
        other => RepoError::Unavailable(other.to_string()),
    }
}

/// PostgresRepository
///
/// The durable implementation, backed by a PostgreSQL pool. A single
/// create/update/delete call is atomic with respect to its uniqueness checks;
/// concurrency control is delegated entirely to the database.
///
/// Queries use the runtime-checked sqlx API so the crate builds without a
/// live database.
pub struct PostgresRepository {
    pool: PgPool,
}

impl PostgresRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const USER_COLUMNS: &str =
    "id, login, email, password_hash, website, role, banned, created_at, updated_at";

const SNIPPET_COLUMNS: &str =
    "id, user_id, title, content, language, public, favorite, created_at, updated_at";

#[async_trait]
impl UserRepository for PostgresRepository {
    async fn find_by_id(&self, id: i64) -> RepoResult<User> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx)?
            .ok_or(RepoError::NotFound)
    }

    async fn find_by_login(&self, login: &str) -> RepoResult<User> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE login = $1");
        sqlx::query_as::<_, User>(&sql)
            .bind(login)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx)?
            .ok_or(RepoError::NotFound)
    }

    async fn create(&self, user: NewUser) -> RepoResult<User> {
        let sql = format!(
            "INSERT INTO users (login, email, password_hash, website, role, banned, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, false, NOW(), NOW()) \
             RETURNING {USER_COLUMNS}"
        );
        sqlx::query_as::<_, User>(&sql)
            .bind(&user.login)
            .bind(&user.email)
            .bind(&user.password_hash)
            .bind(&user.website)
            .bind(&user.role)
            .fetch_one(&self.pool)
            .await
            .map_err(map_sqlx)
    }

    async fn update(&self, user: User) -> RepoResult<()> {
        // Zero affected rows (missing id) is still a success; the uniqueness
        // indexes surface conflicts through the driver error.
        sqlx::query(
            "UPDATE users SET login = $2, email = $3, password_hash = $4, website = $5, \
             role = $6, banned = $7, updated_at = NOW() WHERE id = $1",
        )
        .bind(user.id)
        .bind(&user.login)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(&user.website)
        .bind(&user.role)
        .bind(user.banned)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx)?;
        Ok(())
    }

    async fn delete(&self, id: i64) -> RepoResult<()> {
        sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx)?;
        Ok(())
    }

    async fn count(&self) -> RepoResult<i64> {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await
            .map_err(map_sqlx)
    }
}

#[async_trait]
impl SnippetRepository for PostgresRepository {
    async fn find_by_id(&self, id: i64) -> RepoResult<Snippet> {
        let sql = format!("SELECT {SNIPPET_COLUMNS} FROM snippets WHERE id = $1");
        sqlx::query_as::<_, Snippet>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx)?
            .ok_or(RepoError::NotFound)
    }

    async fn list_by_owner(&self, user_id: i64) -> RepoResult<Vec<Snippet>> {
        let sql = format!(
            "SELECT {SNIPPET_COLUMNS} FROM snippets WHERE user_id = $1 ORDER BY created_at DESC"
        );
        sqlx::query_as::<_, Snippet>(&sql)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await
            .map_err(map_sqlx)
    }

    async fn create(&self, snippet: NewSnippet) -> RepoResult<Snippet> {
        let sql = format!(
            "INSERT INTO snippets (user_id, title, content, language, public, favorite, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, NOW(), NOW()) \
             RETURNING {SNIPPET_COLUMNS}"
        );
        sqlx::query_as::<_, Snippet>(&sql)
            .bind(snippet.user_id)
            .bind(&snippet.title)
            .bind(&snippet.content)
            .bind(&snippet.language)
            .bind(snippet.public)
            .bind(snippet.favorite)
            .fetch_one(&self.pool)
            .await
            .map_err(map_sqlx)
    }

    async fn update(&self, snippet: Snippet) -> RepoResult<()> {
        // Ownership never changes here: user_id is deliberately absent from
        // the SET list.
        sqlx::query(
            "UPDATE snippets SET title = $2, content = $3, language = $4, public = $5, \
             favorite = $6, updated_at = NOW() WHERE id = $1",
        )
        .bind(snippet.id)
        .bind(&snippet.title)
        .bind(&snippet.content)
        .bind(&snippet.language)
        .bind(snippet.public)
        .bind(snippet.favorite)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx)?;
        Ok(())
    }

    async fn delete(&self, id: i64) -> RepoResult<()> {
        sqlx::query("DELETE FROM snippets WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx)?;
        Ok(())
    }

    async fn count(&self) -> RepoResult<i64> {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM snippets")
            .fetch_one(&self.pool)
            .await
            .map_err(map_sqlx)
    }
}
