//! Service layer: the only path from transport to storage.
//!
//! Every operation runs the same pipeline — validate, resolve, authorize,
//! persist — and exits it at the first failure. No step retries; retries are
//! the caller's concern.

use crate::error::ServiceError;
use crate::models::{
    CreateSnippetRequest, LoginRequest, NewSnippet, NewUser, RegisterRequest, Snippet,
    UpdateSnippetRequest, UpdateUserRequest, User,
};
use crate::rbac::{AccessPolicy, Action, Claim, Resource, ResourceRef};
use crate::repository::{RepoError, SnippetRepo, UserRepo};
use argon2::{Argon2, PasswordHasher, PasswordVerifier};
use password_hash::{PasswordHash, SaltString};
use std::sync::Arc;

/// Role assigned to every self-registered account.
const DEFAULT_ROLE: &str = "user";

// --- Credential hashing (Argon2 PHC strings) ---

fn hash_password(password: &str) -> Result<String, ServiceError> {
    let mut salt_bytes = [0u8; 16];
    getrandom::getrandom(&mut salt_bytes).map_err(|e| {
        tracing::error!("salt generation failed: {e}");
        ServiceError::StorageUnavailable
    })?;
    let salt = SaltString::encode_b64(&salt_bytes).map_err(|e| {
        tracing::error!("salt encoding failed: {e}");
        ServiceError::StorageUnavailable
    })?;
    let argon2 = Argon2::default();
    let phc = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| {
            tracing::error!("password hashing failed: {e}");
            ServiceError::StorageUnavailable
        })?
        .to_string();
    Ok(phc)
}

fn verify_password(hash: &str, password: &str) -> bool {
    match PasswordHash::new(hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(_) => false,
    }
}

// --- Structural validation ---

fn require_login(login: &str) -> Result<(), ServiceError> {
    let ok_chars = login
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if login.len() < 3 || login.len() > 64 || !ok_chars {
        return Err(ServiceError::Validation(
            "login must be 3-64 characters of [a-zA-Z0-9_-]".to_string(),
        ));
    }
    Ok(())
}

fn require_email(email: &str) -> Result<(), ServiceError> {
    let well_formed = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty() && !domain.is_empty() && domain.contains('.')
        }
        None => false,
    };
    if !well_formed || email.len() > 254 {
        return Err(ServiceError::Validation("email is malformed".to_string()));
    }
    Ok(())
}

fn require_password(password: &str) -> Result<(), ServiceError> {
    if password.len() < 8 {
        return Err(ServiceError::Validation(
            "password must be at least 8 characters".to_string(),
        ));
    }
    Ok(())
}

fn require_non_empty(value: &str, field: &str) -> Result<(), ServiceError> {
    if value.trim().is_empty() {
        return Err(ServiceError::Validation(format!("{field} is required")));
    }
    Ok(())
}

// --- User orchestration ---

/// UserService
///
/// Orchestrates every user-facing account operation. Depends only on the
/// repository trait and the immutable access policy, both injected at
/// startup, so tests swap in the in-memory double without conditionals.
pub struct UserService {
    repo: UserRepo,
    policy: Arc<AccessPolicy>,
}

impl UserService {
    pub fn new(repo: UserRepo, policy: Arc<AccessPolicy>) -> Self {
        Self { repo, policy }
    }

    /// register
    ///
    /// Public operation: no claim. Validation runs before anything else;
    /// the repository's uniqueness check guarantees no partial write on a
    /// login/email collision.
    pub async fn register(&self, req: RegisterRequest) -> Result<User, ServiceError> {
        require_login(&req.login)?;
        require_email(&req.email)?;
        require_password(&req.password)?;

        let password_hash = hash_password(&req.password)?;
        let user = self
            .repo
            .create(NewUser {
                login: req.login,
                email: req.email,
                password_hash,
                website: req.website,
                role: DEFAULT_ROLE.to_string(),
            })
            .await?;
        tracing::info!(user_id = user.id, "user registered");
        Ok(user)
    }

    /// authenticate
    ///
    /// Resolves credentials to a user record. An unknown login and a wrong
    /// password are indistinguishable to the caller; a banned account is
    /// rejected outright. Token issuance belongs to the transport layer.
    pub async fn authenticate(&self, req: LoginRequest) -> Result<User, ServiceError> {
        require_non_empty(&req.login, "login")?;
        require_non_empty(&req.password, "password")?;

        let user = match self.repo.find_by_login(&req.login).await {
            Ok(user) => user,
            Err(RepoError::NotFound) => return Err(ServiceError::Unauthenticated),
            Err(other) => return Err(other.into()),
        };
        if !verify_password(&user.password_hash, &req.password) {
            return Err(ServiceError::Unauthenticated);
        }
        if user.banned {
            return Err(ServiceError::Forbidden);
        }
        Ok(user)
    }

    /// get
    ///
    /// Resolution happens before authorization: an absent user surfaces as
    /// `NotFound`, never disguised as a denial (and vice versa).
    pub async fn get(&self, claim: &Claim, id: i64) -> Result<User, ServiceError> {
        let user = match self.repo.find_by_id(id).await {
            Ok(user) => user,
            Err(RepoError::NotFound) => return Err(ServiceError::NotFound("user")),
            Err(other) => return Err(other.into()),
        };
        let target = ResourceRef::owned(Resource::User, user.id);
        if !self.policy.allows(claim, &target, Action::Read) {
            return Err(ServiceError::Forbidden);
        }
        Ok(user)
    }

    /// update
    ///
    /// Self-service via the ownership override, or administrative via role
    /// grants. The `banned` flag is the exception: it is checked against an
    /// unowned target so a user can never flip their own ban.
    pub async fn update(
        &self,
        claim: &Claim,
        id: i64,
        req: UpdateUserRequest,
    ) -> Result<User, ServiceError> {
        if let Some(email) = &req.email {
            require_email(email)?;
        }

        let mut user = match self.repo.find_by_id(id).await {
            Ok(user) => user,
            Err(RepoError::NotFound) => return Err(ServiceError::NotFound("user")),
            Err(other) => return Err(other.into()),
        };

        let target = ResourceRef::owned(Resource::User, user.id);
        if !self.policy.allows(claim, &target, Action::Update) {
            return Err(ServiceError::Forbidden);
        }
        if req.banned.is_some() {
            let unowned = ResourceRef::unowned(Resource::User);
            if !self.policy.allows(claim, &unowned, Action::Update) {
                return Err(ServiceError::Forbidden);
            }
        }

        if let Some(email) = req.email {
            user.email = email;
        }
        if let Some(website) = req.website {
            // Some(None) is an explicit null from the client: clear the field.
            user.website = website;
        }
        if let Some(banned) = req.banned {
            user.banned = banned;
        }

        self.repo.update(user.clone()).await?;
        Ok(user)
    }

    pub async fn delete(&self, claim: &Claim, id: i64) -> Result<(), ServiceError> {
        let user = match self.repo.find_by_id(id).await {
            Ok(user) => user,
            Err(RepoError::NotFound) => return Err(ServiceError::NotFound("user")),
            Err(other) => return Err(other.into()),
        };
        let target = ResourceRef::owned(Resource::User, user.id);
        if !self.policy.allows(claim, &target, Action::Delete) {
            return Err(ServiceError::Forbidden);
        }
        self.repo.delete(id).await?;
        tracing::info!(user_id = id, actor = claim.user_id, "user deleted");
        Ok(())
    }

    /// Grant-gated: the unowned target keeps the ownership override out of
    /// play, so only roles holding `(User, Read)` may count accounts.
    pub async fn count(&self, claim: &Claim) -> Result<i64, ServiceError> {
        let target = ResourceRef::unowned(Resource::User);
        if !self.policy.allows(claim, &target, Action::Read) {
            return Err(ServiceError::Forbidden);
        }
        Ok(self.repo.count().await?)
    }
}

// --- Snippet orchestration ---

/// SnippetService
///
/// Same pipeline as the user service, over the snippet contract.
pub struct SnippetService {
    repo: SnippetRepo,
    policy: Arc<AccessPolicy>,
}

impl SnippetService {
    pub fn new(repo: SnippetRepo, policy: Arc<AccessPolicy>) -> Self {
        Self { repo, policy }
    }

    /// create
    ///
    /// Creation has no owner yet, so the decision runs against the bare
    /// resource kind. The owner recorded is always the claim's user id.
    pub async fn create(
        &self,
        claim: &Claim,
        req: CreateSnippetRequest,
    ) -> Result<Snippet, ServiceError> {
        require_non_empty(&req.title, "title")?;
        require_non_empty(&req.content, "content")?;

        let target = ResourceRef::unowned(Resource::Snippet);
        if !self.policy.allows(claim, &target, Action::Create) {
            return Err(ServiceError::Forbidden);
        }

        let snippet = self
            .repo
            .create(NewSnippet {
                user_id: claim.user_id,
                title: req.title,
                content: req.content,
                language: req.language,
                public: req.public,
                favorite: false,
            })
            .await?;
        tracing::info!(snippet_id = snippet.id, owner = claim.user_id, "snippet created");
        Ok(snippet)
    }

    /// get
    ///
    /// Public snippets are readable by anyone, claim or not. Private
    /// snippets require an identity: anonymous callers are told to
    /// authenticate, authenticated ones get the engine's verdict.
    pub async fn get(&self, claim: Option<&Claim>, id: i64) -> Result<Snippet, ServiceError> {
        let snippet = match self.repo.find_by_id(id).await {
            Ok(snippet) => snippet,
            Err(RepoError::NotFound) => return Err(ServiceError::NotFound("snippet")),
            Err(other) => return Err(other.into()),
        };
        if snippet.public {
            return Ok(snippet);
        }
        let Some(claim) = claim else {
            return Err(ServiceError::Unauthenticated);
        };
        let target = ResourceRef::owned(Resource::Snippet, snippet.user_id);
        if !self.policy.allows(claim, &target, Action::Read) {
            return Err(ServiceError::Forbidden);
        }
        Ok(snippet)
    }

    /// The listing still routes through the engine so a banned owner is
    /// denied their own snippets.
    pub async fn list_mine(&self, claim: &Claim) -> Result<Vec<Snippet>, ServiceError> {
        let target = ResourceRef::owned(Resource::Snippet, claim.user_id);
        if !self.policy.allows(claim, &target, Action::Read) {
            return Err(ServiceError::Forbidden);
        }
        Ok(self.repo.list_by_owner(claim.user_id).await?)
    }

    pub async fn update(
        &self,
        claim: &Claim,
        id: i64,
        req: UpdateSnippetRequest,
    ) -> Result<Snippet, ServiceError> {
        if let Some(title) = &req.title {
            require_non_empty(title, "title")?;
        }
        if let Some(content) = &req.content {
            require_non_empty(content, "content")?;
        }

        let mut snippet = match self.repo.find_by_id(id).await {
            Ok(snippet) => snippet,
            Err(RepoError::NotFound) => return Err(ServiceError::NotFound("snippet")),
            Err(other) => return Err(other.into()),
        };

        let target = ResourceRef::owned(Resource::Snippet, snippet.user_id);
        if !self.policy.allows(claim, &target, Action::Update) {
            return Err(ServiceError::Forbidden);
        }

        if let Some(title) = req.title {
            snippet.title = title;
        }
        if let Some(content) = req.content {
            snippet.content = content;
        }
        if let Some(language) = req.language {
            snippet.language = Some(language);
        }
        if let Some(public) = req.public {
            snippet.public = public;
        }
        if let Some(favorite) = req.favorite {
            snippet.favorite = favorite;
        }

        self.repo.update(snippet.clone()).await?;
        Ok(snippet)
    }

    pub async fn delete(&self, claim: &Claim, id: i64) -> Result<(), ServiceError> {
        let snippet = match self.repo.find_by_id(id).await {
            Ok(snippet) => snippet,
            Err(RepoError::NotFound) => return Err(ServiceError::NotFound("snippet")),
            Err(other) => return Err(other.into()),
        };
        let target = ResourceRef::owned(Resource::Snippet, snippet.user_id);
        if !self.policy.allows(claim, &target, Action::Delete) {
            return Err(ServiceError::Forbidden);
        }
        self.repo.delete(id).await?;
        tracing::info!(snippet_id = id, actor = claim.user_id, "snippet deleted");
        Ok(())
    }

    pub async fn count(&self, claim: &Claim) -> Result<i64, ServiceError> {
        let target = ResourceRef::unowned(Resource::Snippet);
        if !self.policy.allows(claim, &target, Action::Read) {
            return Err(ServiceError::Forbidden);
        }
        Ok(self.repo.count().await?)
    }
}
