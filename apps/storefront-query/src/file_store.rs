use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::PathBuf;

use storefront_client::session::find_cookie;
use storefront_client::{CookieOptions, Session, SessionError, SessionStorage};
use tokio::sync::Mutex;
use uuid::Uuid;

type SessionMap = HashMap<String, HashMap<String, String>>;

/// Session storage persisted as one JSON file, so the auth token survives
/// between command invocations.
pub struct FileSessionStorage {
    path: PathBuf,
    cookie: CookieOptions,
    // serializes read-modify-write cycles within this process
    lock: Mutex<()>,
}

impl FileSessionStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            cookie: CookieOptions::default(),
            lock: Mutex::new(()),
        }
    }

    async fn read_all(&self) -> Result<SessionMap, SessionError> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) => serde_json::from_slice(&bytes)
                .map_err(|e| SessionError::Storage(format!("{}: {e}", self.path.display()))),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(SessionMap::new()),
            Err(e) => Err(SessionError::Storage(format!(
                "{}: {e}",
                self.path.display()
            ))),
        }
    }

    async fn write_all(&self, sessions: &SessionMap) -> Result<(), SessionError> {
        let bytes = serde_json::to_vec_pretty(sessions)
            .map_err(|e| SessionError::Storage(e.to_string()))?;
        tokio::fs::write(&self.path, bytes)
            .await
            .map_err(|e| SessionError::Storage(format!("{}: {e}", self.path.display())))
    }
}

#[async_trait::async_trait]
impl SessionStorage for FileSessionStorage {
    async fn get_session(
        &self,
        cookie_header: Option<&str>,
    ) -> Result<Option<Session>, SessionError> {
        let _guard = self.lock.lock().await;
        let mut sessions = self.read_all().await?;

        let known = cookie_header
            .and_then(|header| find_cookie(header, &self.cookie.name))
            .and_then(|id| sessions.remove_entry(&id));

        Ok(Some(match known {
            Some((id, data)) => Session::restore(id, data),
            None => Session::new(Uuid::new_v4().to_string()),
        }))
    }

    async fn commit_session(&self, session: &Session) -> Result<String, SessionError> {
        let _guard = self.lock.lock().await;
        let mut sessions = self.read_all().await?;
        sessions.insert(session.id().to_owned(), session.data().clone());
        self.write_all(&sessions).await?;
        Ok(self.cookie.serialize(session.id()))
    }

    async fn destroy_session(&self, session: &Session) -> Result<String, SessionError> {
        let _guard = self.lock.lock().await;
        let mut sessions = self.read_all().await?;
        if sessions.remove(session.id()).is_some() {
            self.write_all(&sessions).await?;
        }
        Ok(self.cookie.expire())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use storefront_client::AUTH_TOKEN_SESSION_KEY;

    #[tokio::test]
    async fn test_sessions_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sessions.json");

        let store = FileSessionStorage::new(&path);
        let mut session = store.get_session(None).await.unwrap().unwrap();
        session.set(AUTH_TOKEN_SESSION_KEY, "tok");
        let directive = store.commit_session(&session).await.unwrap();
        let cookie = directive.split(';').next().unwrap().to_owned();

        let reopened = FileSessionStorage::new(&path);
        let loaded = reopened.get_session(Some(&cookie)).await.unwrap().unwrap();
        assert!(!loaded.is_new());
        assert_eq!(loaded.get(AUTH_TOKEN_SESSION_KEY), Some("tok"));

        reopened.destroy_session(&loaded).await.unwrap();
        let gone = reopened.get_session(Some(&cookie)).await.unwrap().unwrap();
        assert!(gone.is_new());
    }

    #[tokio::test]
    async fn test_corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sessions.json");
        std::fs::write(&path, "not json").unwrap();

        let store = FileSessionStorage::new(&path);
        let err = store.get_session(None).await.unwrap_err();
        assert!(matches!(err, SessionError::Storage(_)));
    }
}
