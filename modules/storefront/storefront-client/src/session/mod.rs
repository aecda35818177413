//! Session-store seam.
//!
//! The client never reaches for a global session store: a
//! [`SessionStorage`] is injected at construction and consulted once per
//! request to read the caller's auth token, and once more when the shop
//! API issues a new one.

mod cookies;
mod memory;

use std::collections::HashMap;

pub use cookies::{CookieOptions, SameSite, find_cookie};
pub use memory::{DEFAULT_SESSION_TTL, MemorySessionStorage};

/// Session key under which the shop API auth token is stored.
pub const AUTH_TOKEN_SESSION_KEY: &str = "authToken";

/// Errors from session storage backends.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("invalid session cookie: {0}")]
    InvalidCookie(String),
    #[error("session storage error: {0}")]
    Storage(String),
}

/// Per-caller server-side state, keyed by an id carried in a cookie.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    id: String,
    data: HashMap<String, String>,
    is_new: bool,
}

impl Session {
    /// A session that has never been committed.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            data: HashMap::new(),
            is_new: true,
        }
    }

    /// A session loaded back from storage.
    #[must_use]
    pub fn restore(
        id: impl Into<String>,
        data: impl IntoIterator<Item = (String, String)>,
    ) -> Self {
        Self {
            id: id.into(),
            data: data.into_iter().collect(),
            is_new: false,
        }
    }

    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    #[must_use]
    pub fn is_new(&self) -> bool {
        self.is_new
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.data.get(key).map(String::as_str)
    }

    #[must_use]
    pub fn has(&self, key: &str) -> bool {
        self.data.contains_key(key)
    }

    /// Overwrites any previous value.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.data.insert(key.into(), value.into());
    }

    pub fn unset(&mut self, key: &str) {
        self.data.remove(key);
    }

    #[must_use]
    pub fn data(&self) -> &HashMap<String, String> {
        &self.data
    }
}

/// Cookie-keyed session storage.
#[async_trait::async_trait]
pub trait SessionStorage: Send + Sync {
    /// Resolve the session named by a raw `Cookie` header.
    ///
    /// Backends may return `None` when no session can be resolved; the
    /// bundled [`MemorySessionStorage`] always yields one, fresh if needed.
    ///
    /// # Errors
    /// Returns `SessionError` if the backend fails.
    async fn get_session(&self, cookie_header: Option<&str>)
    -> Result<Option<Session>, SessionError>;

    /// Persist the session and return the `Set-Cookie` directive naming it.
    ///
    /// # Errors
    /// Returns `SessionError` if the backend fails.
    async fn commit_session(&self, session: &Session) -> Result<String, SessionError>;

    /// Drop the session and return an expiring `Set-Cookie` directive.
    ///
    /// # Errors
    /// Returns `SessionError` if the backend fails.
    async fn destroy_session(&self, session: &Session) -> Result<String, SessionError>;
}
