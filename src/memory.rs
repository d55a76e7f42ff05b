//! In-memory repository doubles.
//!
//! Both doubles satisfy the exact contract of their Postgres counterparts
//! over a process-local ordered `Vec`, giving tests deterministic storage
//! with no database. They are intended for single-threaded test use; the
//! mutex exists only to make the trait objects `Send + Sync`.

use crate::models::{NewSnippet, NewUser, Snippet, User};
use crate::repository::{RepoError, RepoResult, SnippetRepository, UserRepository};
use async_trait::async_trait;
use chrono::Utc;
use std::sync::Mutex;

/// Records whose identifying field equals this marker deterministically fail
/// with `Unavailable`. Purely a test hook for exercising caller error paths;
/// nothing in production storage behaves this way.
pub const POISON_MARKER: &str = "error";

fn poisoned() -> RepoError {
    RepoError::Unavailable("poison marker hit".to_string())
}

/// MemoryUserRepository
///
/// The in-memory double for the user contract.
#[derive(Default)]
pub struct MemoryUserRepository {
    items: Mutex<Vec<User>>,
}

impl MemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the store with pre-built records, ids included.
    pub fn with_users(items: Vec<User>) -> Self {
        Self {
            items: Mutex::new(items),
        }
    }

    fn next_id(items: &[User]) -> i64 {
        items.iter().map(|u| u.id).max().unwrap_or(0) + 1
    }
}

#[async_trait]
impl UserRepository for MemoryUserRepository {
    async fn find_by_id(&self, id: i64) -> RepoResult<User> {
        let items = self.items.lock().unwrap();
        items
            .iter()
            .find(|u| u.id == id)
            .cloned()
            .ok_or(RepoError::NotFound)
    }

    async fn find_by_login(&self, login: &str) -> RepoResult<User> {
        let items = self.items.lock().unwrap();
        items
            .iter()
            .find(|u| u.login == login)
            .cloned()
            .ok_or(RepoError::NotFound)
    }

    async fn create(&self, user: NewUser) -> RepoResult<User> {
        if user.login == POISON_MARKER {
            return Err(poisoned());
        }
        let mut items = self.items.lock().unwrap();
        if items.iter().any(|u| u.login == user.login) {
            return Err(RepoError::Conflict("login already exists".to_string()));
        }
        if items.iter().any(|u| u.email == user.email) {
            return Err(RepoError::Conflict("email already exists".to_string()));
        }
        let now = Utc::now();
        let stored = User {
            id: Self::next_id(&items),
            login: user.login,
            email: user.email,
            password_hash: user.password_hash,
            website: user.website,
            role: user.role,
            banned: false,
            created_at: now,
            updated_at: now,
        };
        items.push(stored.clone());
        Ok(stored)
    }

    async fn update(&self, user: User) -> RepoResult<()> {
        if user.login == POISON_MARKER {
            return Err(poisoned());
        }
        let mut items = self.items.lock().unwrap();
        // Missing id is a no-op success, matching the durable contract: a
        // zero-row UPDATE never trips a unique index, so the collision check
        // only applies when a record is actually replaced.
        let Some(pos) = items.iter().position(|u| u.id == user.id) else {
            return Ok(());
        };
        if items
            .iter()
            .any(|u| u.id != user.id && (u.login == user.login || u.email == user.email))
        {
            return Err(RepoError::Conflict("login or email already exists".to_string()));
        }
        items[pos] = user;
        Ok(())
    }

    async fn delete(&self, id: i64) -> RepoResult<()> {
        let mut items = self.items.lock().unwrap();
        items.retain(|u| u.id != id);
        Ok(())
    }

    async fn count(&self) -> RepoResult<i64> {
        Ok(self.items.lock().unwrap().len() as i64)
    }
}

/// MemorySnippetRepository
///
/// The in-memory double for the snippet contract. The poison marker applies
/// to the title field.
#[derive(Default)]
pub struct MemorySnippetRepository {
    items: Mutex<Vec<Snippet>>,
}

impl MemorySnippetRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_snippets(items: Vec<Snippet>) -> Self {
        Self {
            items: Mutex::new(items),
        }
    }

    fn next_id(items: &[Snippet]) -> i64 {
        items.iter().map(|s| s.id).max().unwrap_or(0) + 1
    }
}

#[async_trait]
impl SnippetRepository for MemorySnippetRepository {
    async fn find_by_id(&self, id: i64) -> RepoResult<Snippet> {
        let items = self.items.lock().unwrap();
        items
            .iter()
            .find(|s| s.id == id)
            .cloned()
            .ok_or(RepoError::NotFound)
    }

    async fn list_by_owner(&self, user_id: i64) -> RepoResult<Vec<Snippet>> {
        let items = self.items.lock().unwrap();
        Ok(items
            .iter()
            .filter(|s| s.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn create(&self, snippet: NewSnippet) -> RepoResult<Snippet> {
        if snippet.title == POISON_MARKER {
            return Err(poisoned());
        }
        let mut items = self.items.lock().unwrap();
        let now = Utc::now();
        let stored = Snippet {
            id: Self::next_id(&items),
            user_id: snippet.user_id,
            title: snippet.title,
            content: snippet.content,
            language: snippet.language,
            public: snippet.public,
            favorite: snippet.favorite,
            created_at: now,
            updated_at: now,
        };
        items.push(stored.clone());
        Ok(stored)
    }

    async fn update(&self, snippet: Snippet) -> RepoResult<()> {
        if snippet.title == POISON_MARKER {
            return Err(poisoned());
        }
        let mut items = self.items.lock().unwrap();
        if let Some(slot) = items.iter_mut().find(|s| s.id == snippet.id) {
            *slot = snippet;
        }
        Ok(())
    }

    async fn delete(&self, id: i64) -> RepoResult<()> {
        let mut items = self.items.lock().unwrap();
        items.retain(|s| s.id != id);
        Ok(())
    }

    async fn count(&self) -> RepoResult<i64> {
        Ok(self.items.lock().unwrap().len() as i64)
    }
}
