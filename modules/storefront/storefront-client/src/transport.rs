use bytes::Bytes;
use http::{HeaderMap, StatusCode};
use std::time::Duration;

use crate::error::ClientError;

/// Fully buffered shop API response
#[derive(Debug)]
pub(crate) struct RawResponse {
    pub(crate) status: StatusCode,
    pub(crate) headers: HeaderMap,
    pub(crate) body: Bytes,
}

/// HTTP transport that posts JSON bodies to the shop API
#[derive(Debug, Clone)]
pub(crate) struct HttpTransport {
    http_client: reqwest::Client,
}

impl HttpTransport {
    pub(crate) fn new(timeout: Duration) -> Result<Self, ClientError> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ClientError::BuildError(e.to_string()))?;

        Ok(Self { http_client })
    }

    /// POST `body` to `url` with exactly the given headers
    pub(crate) async fn post_json(
        &self,
        url: &str,
        headers: HeaderMap,
        body: Vec<u8>,
    ) -> Result<RawResponse, ClientError> {
        let resp = self
            .http_client
            .post(url)
            .headers(headers)
            .body(body)
            .send()
            .await
            .map_err(classify)?;

        let status = resp.status();
        let headers = resp.headers().clone();
        let body = resp.bytes().await.map_err(classify)?;

        Ok(RawResponse {
            status,
            headers,
            body,
        })
    }
}

fn classify(e: reqwest::Error) -> ClientError {
    if e.is_timeout() {
        ClientError::Timeout(e.to_string())
    } else if e.is_connect() {
        ClientError::Connection(e.to_string())
    } else {
        ClientError::Reqwest(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::HeaderValue;
    use http::header::CONTENT_TYPE;
    use httpmock::prelude::*;

    #[tokio::test]
    async fn test_post_json_buffers_response() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(POST)
                .path("/shop-api")
                .header("content-type", "application/json")
                .body("{\"query\":\"{a}\"}");
            then.status(200)
                .header("x-trace", "1")
                .body("{\"data\":{\"a\":1}}");
        });

        let transport = HttpTransport::new(Duration::from_secs(5)).unwrap();
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let resp = transport
            .post_json(
                &server.url("/shop-api"),
                headers,
                b"{\"query\":\"{a}\"}".to_vec(),
            )
            .await
            .unwrap();

        assert_eq!(resp.status, StatusCode::OK);
        assert_eq!(resp.headers.get("x-trace").unwrap(), "1");
        assert_eq!(&resp.body[..], b"{\"data\":{\"a\":1}}");
        mock.assert();
    }

    #[tokio::test]
    async fn test_connection_refused_is_classified() {
        let transport = HttpTransport::new(Duration::from_secs(5)).unwrap();
        let err = transport
            .post_json("http://127.0.0.1:1/shop-api", HeaderMap::new(), Vec::new())
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::Connection(_)));
    }
}
