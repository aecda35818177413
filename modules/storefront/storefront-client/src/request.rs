use http::HeaderMap;
use http::header::COOKIE;
use serde::Serialize;

/// Outbound wire body: `{"query": ..., "variables": ...}`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GraphqlRequest {
    pub query: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub variables: Option<serde_json::Value>,
}

/// Identity of the in-flight caller: the raw `Cookie` header of the
/// request being served, used to resolve its session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallerContext {
    cookie: Option<String>,
}

impl CallerContext {
    /// A caller without any cookie
    #[must_use]
    pub fn anonymous() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_cookie(cookie: impl Into<String>) -> Self {
        Self {
            cookie: Some(cookie.into()),
        }
    }

    /// Capture the `Cookie` header of an inbound request.
    ///
    /// Multiple `Cookie` headers are joined with `; ` as HTTP/2 allows
    /// them to be split. Non-UTF-8 values are ignored.
    #[must_use]
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let parts: Vec<&str> = headers
            .get_all(COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .collect();

        if parts.is_empty() {
            Self::anonymous()
        } else {
            Self::with_cookie(parts.join("; "))
        }
    }

    /// The raw cookie header, if any
    #[must_use]
    pub fn cookie(&self) -> Option<&str> {
        self.cookie.as_deref()
    }
}

#[cfg(feature = "axum")]
impl<S: Send + Sync> axum::extract::FromRequestParts<S> for CallerContext {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(
        parts: &mut http::request::Parts,
        _state: &S,
    ) -> Result<Self, Self::Rejection> {
        Ok(Self::from_headers(&parts.headers))
    }
}
