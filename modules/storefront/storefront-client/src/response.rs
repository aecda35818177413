use http::HeaderMap;
use http::header::SET_COOKIE;
use serde::{Deserialize, Deserializer, Serialize};

/// Standard GraphQL response wrapper.
///
/// `errors` is empty when the API omitted it or sent `null`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Envelope<T> {
    pub data: Option<T>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub errors: Vec<GraphqlErrorDetail>,
}

/// One entry of the envelope's `errors` list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphqlErrorDetail {
    pub message: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub locations: Vec<SourceLocation>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub path: Vec<serde_json::Value>,
    #[serde(default)]
    pub extensions: Option<ErrorExtensions>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceLocation {
    pub line: u32,
    pub column: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorExtensions {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub exception: Option<ErrorException>,
    #[serde(flatten)]
    pub other: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorException {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub stacktrace: Vec<String>,
}

impl GraphqlErrorDetail {
    /// Server-side stack trace joined with newlines, when the API sent one.
    #[must_use]
    pub fn stacktrace(&self) -> Option<String> {
        self.extensions
            .as_ref()
            .and_then(|ext| ext.exception.as_ref())
            .filter(|exc| !exc.stacktrace.is_empty())
            .map(|exc| exc.stacktrace.join("\n"))
    }

    #[must_use]
    pub fn code(&self) -> Option<&str> {
        self.extensions.as_ref().and_then(|ext| ext.code.as_deref())
    }
}

fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

/// A decoded result together with transport metadata.
///
/// `headers` holds what the calling layer must copy into its own HTTP
/// response (currently only `Set-Cookie`); `upstream_headers` are the
/// shop API's response headers as received.
#[derive(Debug, Clone)]
pub struct WithHeaders<T> {
    pub value: T,
    pub headers: HeaderMap,
    pub upstream_headers: HeaderMap,
}

impl<T> WithHeaders<T> {
    #[must_use]
    pub fn new(value: T, upstream_headers: HeaderMap) -> Self {
        Self {
            value,
            headers: HeaderMap::new(),
            upstream_headers,
        }
    }

    /// The session cookie directive to relay, if a new token was committed
    #[must_use]
    pub fn set_cookie(&self) -> Option<&str> {
        self.headers.get(SET_COOKIE).and_then(|v| v.to_str().ok())
    }

    #[must_use]
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> WithHeaders<U> {
        WithHeaders {
            value: f(self.value),
            headers: self.headers,
            upstream_headers: self.upstream_headers,
        }
    }

    /// Split into the value and the headers to relay.
    #[must_use]
    pub fn into_parts(self) -> (T, HeaderMap) {
        (self.value, self.headers)
    }

    #[must_use]
    pub fn into_value(self) -> T {
        self.value
    }

    /// Append the relay headers to an outgoing response's header map.
    pub fn relay_into(&self, target: &mut HeaderMap) {
        for (name, value) in &self.headers {
            target.append(name.clone(), value.clone());
        }
    }
}

#[cfg(feature = "axum")]
impl<T: axum::response::IntoResponse> axum::response::IntoResponse for WithHeaders<T> {
    fn into_response(self) -> axum::response::Response {
        (self.headers, self.value).into_response()
    }
}
