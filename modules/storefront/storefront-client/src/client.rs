use std::sync::Arc;

use http::header::{AUTHORIZATION, CONTENT_TYPE, SET_COOKIE};
use http::{HeaderMap, HeaderName, HeaderValue};
use serde::de::DeserializeOwned;

use crate::config::StorefrontClientConfig;
use crate::document::{Document, Operation};
use crate::error::ClientError;
use crate::request::{CallerContext, GraphqlRequest};
use crate::response::{Envelope, GraphqlErrorDetail, WithHeaders};
use crate::session::{AUTH_TOKEN_SESSION_KEY, SessionStorage};
use crate::transport::{HttpTransport, RawResponse};

/// Shop API client that carries the caller's auth token across requests.
///
/// Every call is independent: the only state shared between calls lives in
/// the injected [`SessionStorage`].
pub struct StorefrontClient {
    config: StorefrontClientConfig,
    auth_token_header: HeaderName,
    transport: HttpTransport,
    sessions: Arc<dyn SessionStorage>,
}

impl std::fmt::Debug for StorefrontClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorefrontClient")
            .field("config", &self.config)
            .field("auth_token_header", &self.auth_token_header)
            .field("transport", &self.transport)
            .field("sessions", &"dyn SessionStorage")
            .finish()
    }
}

impl StorefrontClient {
    /// Create client from configuration
    ///
    /// # Errors
    /// Returns `ClientError::BuildError` if the auth token header name is
    /// invalid or the HTTP client cannot be built.
    pub fn new(
        config: StorefrontClientConfig,
        sessions: Arc<dyn SessionStorage>,
    ) -> Result<Self, ClientError> {
        let auth_token_header = HeaderName::from_bytes(config.auth_token_header.as_bytes())
            .map_err(|e| ClientError::BuildError(format!("Invalid auth token header: {e}")))?;
        let transport = HttpTransport::new(config.timeout)?;

        Ok(Self {
            config,
            auth_token_header,
            transport,
            sessions,
        })
    }

    /// Create client from `VENDURE_API_URL` and friends
    ///
    /// # Errors
    /// See [`StorefrontClientConfig::from_env`] and [`StorefrontClient::new`].
    pub fn from_env(sessions: Arc<dyn SessionStorage>) -> Result<Self, ClientError> {
        Self::new(StorefrontClientConfig::from_env()?, sessions)
    }

    #[must_use]
    pub fn config(&self) -> &StorefrontClientConfig {
        &self.config
    }

    #[must_use]
    pub fn sessions(&self) -> &Arc<dyn SessionStorage> {
        &self.sessions
    }

    /// Send a query and decode its `data` as `T`.
    ///
    /// When `context` resolves to a session holding an auth token, it is
    /// sent as a bearer credential. A token issued by the shop API is stored
    /// in the caller's session and the committed cookie is returned in
    /// [`WithHeaders::headers`] for the caller to relay.
    ///
    /// # Errors
    /// - `ClientError::BuildError` if `query` is not a valid operation; it
    ///   is never sent
    /// - `ClientError::Graphql` with the first error's message when the API
    ///   reports errors. A token issued alongside is still stored and its
    ///   cookie is carried on the error
    /// - transport, status and decoding failures as-is; nothing is retried
    /// - `ClientError::Session` if the session store fails
    pub async fn send<T: DeserializeOwned>(
        &self,
        query: &Document,
        variables: Option<serde_json::Value>,
        context: Option<&CallerContext>,
    ) -> Result<WithHeaders<T>, ClientError> {
        let query = query.print()?;
        let cookie = context.and_then(CallerContext::cookie);

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        if let Some(token) = self.stored_token(cookie).await? {
            let bearer = HeaderValue::from_str(&format!("Bearer {token}"))
                .map_err(|e| ClientError::BuildError(format!("Invalid stored token: {e}")))?;
            headers.insert(AUTHORIZATION, bearer);
        }

        let body = serde_json::to_vec(&GraphqlRequest { query, variables })?;

        tracing::debug!(
            api_url = %self.config.api_url,
            authenticated = headers.contains_key(AUTHORIZATION),
            "sending shop API request"
        );
        let raw = self
            .transport
            .post_json(&self.config.api_url, headers, body)
            .await?;
        let envelope = decode_envelope(&raw)?;

        // Undecodable data fails before any session write.
        let data = if envelope.errors.is_empty() {
            match envelope.data {
                Some(data) => Some(serde_json::from_value::<T>(data)?),
                None => {
                    return Err(ClientError::InvalidResponse(
                        "response carried neither data nor errors".into(),
                    ));
                }
            }
        } else {
            None
        };

        let relay = self.relay_new_token(cookie, &raw.headers).await?;

        match data {
            Some(value) => Ok(WithHeaders {
                value,
                headers: relay,
                upstream_headers: raw.headers,
            }),
            None => {
                log_errors(&envelope.errors);
                let message = envelope
                    .errors
                    .first()
                    .map(|first| first.message.clone())
                    .unwrap_or_default();
                Err(ClientError::Graphql {
                    message,
                    errors: envelope.errors,
                    headers: relay,
                })
            }
        }
    }

    /// Send a typed operation.
    ///
    /// # Errors
    /// Same as [`StorefrontClient::send`], plus `ClientError::Serialization`
    /// if the variables cannot be serialized.
    pub async fn request<O: Operation>(
        &self,
        variables: &O::Variables,
        context: Option<&CallerContext>,
    ) -> Result<WithHeaders<O::Data>, ClientError> {
        let variables = match serde_json::to_value(variables)? {
            serde_json::Value::Null => None,
            value => Some(value),
        };
        tracing::debug!(operation = O::NAME, "dispatching operation");
        self.send(&O::document(), variables, context).await
    }

    /// Drop the caller's session, e.g. after logging out.
    ///
    /// Returns the expiring `Set-Cookie` directive to relay, or `None` when
    /// the caller has no session.
    ///
    /// # Errors
    /// Returns `ClientError::Session` if the session store fails.
    pub async fn end_session(
        &self,
        context: Option<&CallerContext>,
    ) -> Result<Option<String>, ClientError> {
        let Some(cookie) = context.and_then(CallerContext::cookie) else {
            return Ok(None);
        };
        match self.sessions.get_session(Some(cookie)).await? {
            Some(session) if !session.is_new() => {
                Ok(Some(self.sessions.destroy_session(&session).await?))
            }
            _ => Ok(None),
        }
    }

    /// Store a token issued in the response headers and return the
    /// `Set-Cookie` directive naming the committed session.
    async fn relay_new_token(
        &self,
        cookie: Option<&str>,
        upstream: &HeaderMap,
    ) -> Result<HeaderMap, ClientError> {
        let mut relay = HeaderMap::new();
        let Some(value) = upstream.get(&self.auth_token_header) else {
            return Ok(relay);
        };
        let Ok(token) = value.to_str() else {
            tracing::warn!(
                header = %self.auth_token_header,
                "ignoring auth token that is not visible ASCII"
            );
            return Ok(relay);
        };

        if let Some(directive) = self.store_token(cookie, token).await? {
            let directive = HeaderValue::from_str(&directive).map_err(|e| {
                ClientError::InvalidResponse(format!("Invalid session cookie: {e}"))
            })?;
            relay.insert(SET_COOKIE, directive);
        }
        Ok(relay)
    }

    async fn stored_token(&self, cookie: Option<&str>) -> Result<Option<String>, ClientError> {
        let Some(cookie) = cookie else {
            return Ok(None);
        };
        let session = self.sessions.get_session(Some(cookie)).await?;
        Ok(session.and_then(|s| s.get(AUTH_TOKEN_SESSION_KEY).map(str::to_owned)))
    }

    async fn store_token(
        &self,
        cookie: Option<&str>,
        token: &str,
    ) -> Result<Option<String>, ClientError> {
        let Some(mut session) = self.sessions.get_session(cookie).await? else {
            tracing::warn!("shop API issued an auth token but no session could be resolved");
            return Ok(None);
        };
        session.set(AUTH_TOKEN_SESSION_KEY, token);
        let directive = self.sessions.commit_session(&session).await?;
        tracing::debug!(new_session = session.is_new(), "stored shop API auth token");
        Ok(Some(directive))
    }
}

/// Decode the body as an envelope with untyped `data`.
///
/// A non-2xx status is a transport failure unless the body is an envelope
/// that reports errors.
fn decode_envelope(raw: &RawResponse) -> Result<Envelope<serde_json::Value>, ClientError> {
    let parsed = serde_json::from_slice::<Envelope<serde_json::Value>>(&raw.body);
    if raw.status.is_success() {
        return Ok(parsed?);
    }
    match parsed {
        Ok(envelope) if !envelope.errors.is_empty() => Ok(envelope),
        _ => Err(ClientError::Http {
            status: raw.status,
            body: raw.body.clone(),
        }),
    }
}

fn log_errors(errors: &[GraphqlErrorDetail]) {
    for (index, err) in errors.iter().enumerate() {
        tracing::error!(
            index,
            code = ?err.code(),
            path = ?err.path,
            error = %err.message,
            stacktrace = ?err.stacktrace(),
            "shop API error"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::MemorySessionStorage;
    use http::StatusCode;
    use httpmock::prelude::*;
    use serde_json::json;
    use tracing_test::traced_test;

    fn raw(status: StatusCode, body: &str) -> RawResponse {
        RawResponse {
            status,
            headers: HeaderMap::new(),
            body: bytes::Bytes::from(body.to_owned()),
        }
    }

    #[test]
    fn test_client_creation() {
        let config = StorefrontClientConfig::new("http://localhost:3000/shop-api");
        let client = StorefrontClient::new(config, Arc::new(MemorySessionStorage::new()));
        assert!(client.is_ok());
    }

    #[test]
    fn test_invalid_token_header_rejected() {
        let config = StorefrontClientConfig::new("http://localhost:3000/shop-api")
            .with_auth_token_header("bad header");
        let err = StorefrontClient::new(config, Arc::new(MemorySessionStorage::new())).unwrap_err();
        assert!(matches!(err, ClientError::BuildError(_)));
    }

    #[test]
    fn test_decode_error_status_with_envelope() {
        let envelope = decode_envelope(&raw(
            StatusCode::BAD_REQUEST,
            r#"{"errors":[{"message":"Syntax Error"}]}"#,
        ))
        .unwrap();
        assert_eq!(envelope.errors[0].message, "Syntax Error");
    }

    #[test]
    fn test_decode_error_status_without_envelope() {
        let err = decode_envelope(&raw(StatusCode::BAD_GATEWAY, "upstream down")).unwrap_err();
        assert!(matches!(
            err,
            ClientError::Http { status: StatusCode::BAD_GATEWAY, .. }
        ));
    }

    #[test]
    fn test_decode_error_status_with_data_only() {
        let err = decode_envelope(&raw(StatusCode::INTERNAL_SERVER_ERROR, r#"{"data":{}}"#))
            .unwrap_err();
        assert!(matches!(err, ClientError::Http { .. }));
    }

    #[test]
    fn test_decode_malformed_json() {
        let err = decode_envelope(&raw(StatusCode::OK, "<html>")).unwrap_err();
        assert!(matches!(err, ClientError::Serialization(_)));
    }

    #[traced_test]
    #[tokio::test]
    async fn test_error_stacktrace_is_logged() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/shop-api");
            then.status(200).json_body(json!({
                "data": null,
                "errors": [
                    {
                        "message": "Not authorized",
                        "extensions": {"exception": {"stacktrace": ["ForbiddenError: Not authorized", "at AuthGuard"]}}
                    },
                    {"message": "Second failure", "path": ["activeOrder"]}
                ]
            }));
        });

        let client = StorefrontClient::new(
            StorefrontClientConfig::new(server.url("/shop-api")),
            Arc::new(MemorySessionStorage::new()),
        )
        .unwrap();

        let err = client
            .send::<serde_json::Value>(&Document::new("{ activeCustomer { id } }"), None, None)
            .await
            .unwrap_err();

        assert_eq!(err.to_string(), "Not authorized");
        assert_eq!(err.graphql_errors().map(<[_]>::len), Some(2));
        assert!(logs_contain("ForbiddenError: Not authorized"));
        assert!(logs_contain("at AuthGuard"));
        assert!(logs_contain("Second failure"));
    }

    #[traced_test]
    #[tokio::test]
    async fn test_non_ascii_token_is_ignored() {
        let store = Arc::new(MemorySessionStorage::new());
        let client = StorefrontClient::new(
            StorefrontClientConfig::new("http://localhost:3000/shop-api"),
            store.clone(),
        )
        .unwrap();

        let mut upstream = HeaderMap::new();
        upstream.insert(
            "vendure-auth-token",
            HeaderValue::from_bytes(b"t\xf6ken").unwrap(),
        );

        let relay = client.relay_new_token(None, &upstream).await.unwrap();
        assert!(relay.is_empty());
        assert!(store.is_empty());
        assert!(logs_contain("ignoring auth token"));
    }

    #[tokio::test]
    async fn test_end_session_without_cookie() {
        let client = StorefrontClient::new(
            StorefrontClientConfig::new("http://localhost:3000/shop-api"),
            Arc::new(MemorySessionStorage::new()),
        )
        .unwrap();
        assert_eq!(client.end_session(None).await.unwrap(), None);
        assert_eq!(
            client
                .end_session(Some(&CallerContext::with_cookie("__session=unknown")))
                .await
                .unwrap(),
            None
        );
    }
}
