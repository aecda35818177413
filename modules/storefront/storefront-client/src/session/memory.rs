use std::collections::HashMap;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use uuid::Uuid;

use super::{CookieOptions, Session, SessionError, SessionStorage, find_cookie};

/// Idle lifetime of a session whose cookie carries no `Max-Age`.
pub const DEFAULT_SESSION_TTL: Duration = Duration::from_secs(24 * 60 * 60);

#[derive(Debug)]
struct StoredSession {
    data: HashMap<String, String>,
    expires_at: Instant,
}

impl StoredSession {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at <= now
    }
}

/// Process-local session storage keyed by a random id in the session cookie.
///
/// Unknown, missing or expired cookies resolve to a fresh, uncommitted
/// session. Every commit extends the session by the cookie's `Max-Age`
/// (or [`DEFAULT_SESSION_TTL`]) and drops entries that have expired.
/// Concurrent commits for the same id are last-write-wins.
#[derive(Debug)]
pub struct MemorySessionStorage {
    cookie: CookieOptions,
    ttl: Duration,
    sessions: DashMap<String, StoredSession>,
}

impl Default for MemorySessionStorage {
    fn default() -> Self {
        Self::with_cookie_options(CookieOptions::default())
    }
}

impl MemorySessionStorage {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_cookie_options(cookie: CookieOptions) -> Self {
        Self {
            ttl: cookie.max_age.unwrap_or(DEFAULT_SESSION_TTL),
            cookie,
            sessions: DashMap::new(),
        }
    }

    /// Override how long a committed session stays resolvable.
    #[must_use]
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    #[must_use]
    pub fn cookie_options(&self) -> &CookieOptions {
        &self.cookie
    }

    /// Number of stored sessions, expired ones included until pruned
    #[must_use]
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Drop every expired session.
    pub fn prune_expired(&self) {
        let now = Instant::now();
        self.sessions.retain(|_, stored| !stored.is_expired(now));
    }

    fn load(&self, id: &str) -> Option<Session> {
        let now = Instant::now();
        let data = {
            let stored = self.sessions.get(id)?;
            if stored.is_expired(now) {
                None
            } else {
                Some(stored.data.clone())
            }
        };
        match data {
            Some(data) => Some(Session::restore(id, data)),
            None => {
                self.sessions
                    .remove_if(id, |_, stored| stored.is_expired(now));
                None
            }
        }
    }
}

#[async_trait::async_trait]
impl SessionStorage for MemorySessionStorage {
    async fn get_session(
        &self,
        cookie_header: Option<&str>,
    ) -> Result<Option<Session>, SessionError> {
        let known = cookie_header
            .and_then(|header| find_cookie(header, &self.cookie.name))
            .and_then(|id| self.load(&id));

        Ok(Some(
            known.unwrap_or_else(|| Session::new(Uuid::new_v4().to_string())),
        ))
    }

    async fn commit_session(&self, session: &Session) -> Result<String, SessionError> {
        if session.id().is_empty() {
            return Err(SessionError::InvalidCookie("empty session id".into()));
        }
        self.prune_expired();
        self.sessions.insert(
            session.id().to_owned(),
            StoredSession {
                data: session.data().clone(),
                expires_at: Instant::now() + self.ttl,
            },
        );
        Ok(self.cookie.serialize(session.id()))
    }

    async fn destroy_session(&self, session: &Session) -> Result<String, SessionError> {
        self.sessions.remove(session.id());
        Ok(self.cookie.expire())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::AUTH_TOKEN_SESSION_KEY;

    #[tokio::test]
    async fn test_unknown_cookie_yields_fresh_session() {
        let store = MemorySessionStorage::new();
        let session = store
            .get_session(Some("__session=nope"))
            .await
            .unwrap()
            .unwrap();
        assert!(session.is_new());
        assert_ne!(session.id(), "nope");
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_commit_then_resolve() {
        let store = MemorySessionStorage::new();
        let mut session = store.get_session(None).await.unwrap().unwrap();
        session.set(AUTH_TOKEN_SESSION_KEY, "XYZ");

        let directive = store.commit_session(&session).await.unwrap();
        assert!(directive.starts_with(&format!("__session={}", session.id())));
        assert_eq!(store.len(), 1);

        let cookie = format!("theme=dark; __session={}", session.id());
        let loaded = store.get_session(Some(&cookie)).await.unwrap().unwrap();
        assert!(!loaded.is_new());
        assert_eq!(loaded.get(AUTH_TOKEN_SESSION_KEY), Some("XYZ"));
    }

    #[tokio::test]
    async fn test_destroy_session() {
        let store = MemorySessionStorage::new();
        let session = store.get_session(None).await.unwrap().unwrap();
        store.commit_session(&session).await.unwrap();

        let directive = store.destroy_session(&session).await.unwrap();
        assert!(directive.contains("Max-Age=0"));
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_custom_cookie_name() {
        let store = MemorySessionStorage::with_cookie_options(CookieOptions {
            name: "sid".into(),
            ..CookieOptions::default()
        });
        let session = store.get_session(None).await.unwrap().unwrap();
        let directive = store.commit_session(&session).await.unwrap();
        assert!(directive.starts_with("sid="));

        let loaded = store
            .get_session(Some(&format!("sid={}", session.id())))
            .await
            .unwrap()
            .unwrap();
        assert!(!loaded.is_new());
    }

    #[test]
    fn test_ttl_follows_max_age() {
        let store = MemorySessionStorage::with_cookie_options(CookieOptions {
            max_age: Some(Duration::from_secs(60)),
            ..CookieOptions::default()
        });
        assert_eq!(store.ttl, Duration::from_secs(60));
        assert_eq!(MemorySessionStorage::new().ttl, DEFAULT_SESSION_TTL);
    }

    #[tokio::test]
    async fn test_expired_session_is_unknown() {
        let store = MemorySessionStorage::new().with_ttl(Duration::from_millis(50));
        let mut session = store.get_session(None).await.unwrap().unwrap();
        session.set(AUTH_TOKEN_SESSION_KEY, "T");
        store.commit_session(&session).await.unwrap();

        tokio::time::sleep(Duration::from_millis(120)).await;

        let cookie = format!("__session={}", session.id());
        let loaded = store.get_session(Some(&cookie)).await.unwrap().unwrap();
        assert!(loaded.is_new());
        assert_eq!(loaded.get(AUTH_TOKEN_SESSION_KEY), None);
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_commit_prunes_expired_sessions() {
        let store = MemorySessionStorage::new().with_ttl(Duration::from_millis(50));
        for _ in 0..5 {
            let session = store.get_session(None).await.unwrap().unwrap();
            store.commit_session(&session).await.unwrap();
        }
        assert_eq!(store.len(), 5);

        tokio::time::sleep(Duration::from_millis(120)).await;

        let fresh = store.get_session(None).await.unwrap().unwrap();
        store.commit_session(&fresh).await.unwrap();
        assert_eq!(store.len(), 1);
    }
}
