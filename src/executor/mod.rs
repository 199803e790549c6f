//! Request execution: header injection and outcome normalization.
//!
//! The executor wraps an injected [`Transport`], attaches a bearer token
//! when one is available, and normalizes every completion into a uniform
//! outcome: a JSON payload on success or a typed [`FetchError`] otherwise.
//!
//! It performs no retries and no backoff; when to issue a request (and how
//! many times) is the cache's concern, not the executor's.

pub mod error;
pub mod transport;

pub use error::FetchError;
pub use transport::{HttpTransport, RawResponse, Request, Transport, TransportError};

use std::sync::Arc;

use serde_json::Value;
use tracing::debug;

use crate::auth::TokenProvider;

pub struct RequestExecutor {
    transport: Arc<dyn Transport>,
    tokens: Arc<dyn TokenProvider>,
}

impl RequestExecutor {
    pub fn new(transport: Arc<dyn Transport>, tokens: Arc<dyn TokenProvider>) -> Self {
        Self { transport, tokens }
    }

    /// Execute one request and normalize the result.
    ///
    /// A missing token is not an error; the request proceeds unauthenticated
    /// and the backend answers with 401/403 if it objects.
    pub async fn execute(&self, mut request: Request) -> Result<Value, FetchError> {
        if let Some(token) = self.tokens.token() {
            request = request.header("Authorization", format!("Bearer {}", token));
        }

        debug!(method = %request.method, path = %request.path, "executing request");

        let response = self
            .transport
            .send(request)
            .await
            .map_err(|e| FetchError::Network(e.to_string()))?;

        if !(200..300).contains(&response.status) {
            return Err(FetchError::from_status(response.status, &response.body));
        }

        // 204-style responses carry no body
        if response.body.is_empty() {
            return Ok(Value::Null);
        }

        serde_json::from_str(&response.body).map_err(|e| FetchError::Parse(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{NoToken, TokenStore};
    use futures::future::BoxFuture;
    use serde_json::json;
    use std::sync::Mutex;

    /// Records requests and replays a fixed response.
    struct FixedTransport {
        response: Result<RawResponse, String>,
        seen: Mutex<Vec<Request>>,
    }

    impl FixedTransport {
        fn ok(status: u16, body: &str) -> Self {
            Self {
                response: Ok(RawResponse {
                    status,
                    body: body.to_string(),
                }),
                seen: Mutex::new(Vec::new()),
            }
        }

        fn unreachable() -> Self {
            Self {
                response: Err("connection refused".to_string()),
                seen: Mutex::new(Vec::new()),
            }
        }
    }

    impl Transport for FixedTransport {
        fn send(&self, request: Request) -> BoxFuture<'_, Result<RawResponse, TransportError>> {
            self.seen.lock().expect("lock poisoned").push(request);
            let response = self.response.clone();
            Box::pin(async move { response.map_err(TransportError::from_message) })
        }
    }

    #[tokio::test]
    async fn test_success_parses_json_payload() {
        let transport = Arc::new(FixedTransport::ok(200, r#"{"knowledges":["kb-0"]}"#));
        let executor = RequestExecutor::new(transport, Arc::new(NoToken));

        let payload = executor
            .execute(Request::get("/v1/knowledges/list"))
            .await
            .expect("request failed");
        assert_eq!(payload, json!({ "knowledges": ["kb-0"] }));
    }

    #[tokio::test]
    async fn test_bearer_header_attached_when_token_present() {
        let transport = Arc::new(FixedTransport::ok(200, "null"));
        let tokens = TokenStore::new();
        tokens.set("secret");
        let executor = RequestExecutor::new(transport.clone(), Arc::new(tokens));

        executor
            .execute(Request::get("/v1/knowledges"))
            .await
            .expect("request failed");

        let seen = transport.seen.lock().expect("lock poisoned");
        assert_eq!(
            seen[0].headers,
            vec![("Authorization".to_string(), "Bearer secret".to_string())]
        );
    }

    #[tokio::test]
    async fn test_no_token_means_no_authorization_header() {
        let transport = Arc::new(FixedTransport::ok(200, "null"));
        let executor = RequestExecutor::new(transport.clone(), Arc::new(NoToken));

        executor
            .execute(Request::get("/v1/knowledges"))
            .await
            .expect("request failed");

        let seen = transport.seen.lock().expect("lock poisoned");
        assert!(seen[0].headers.is_empty());
    }

    #[tokio::test]
    async fn test_401_surfaces_as_unauthorized() {
        let transport = Arc::new(FixedTransport::ok(401, "expired"));
        let executor = RequestExecutor::new(transport, Arc::new(NoToken));

        let err = executor
            .execute(Request::get("/v1/knowledges"))
            .await
            .expect_err("expected failure");
        assert_eq!(err, FetchError::Unauthorized);
    }

    #[tokio::test]
    async fn test_server_error_surfaces_as_http() {
        let transport = Arc::new(FixedTransport::ok(500, "boom"));
        let executor = RequestExecutor::new(transport, Arc::new(NoToken));

        let err = executor
            .execute(Request::get("/v1/knowledges"))
            .await
            .expect_err("expected failure");
        assert_eq!(
            err,
            FetchError::Http {
                status: 500,
                body: "boom".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_bad_json_surfaces_as_parse() {
        let transport = Arc::new(FixedTransport::ok(200, "<html>not json</html>"));
        let executor = RequestExecutor::new(transport, Arc::new(NoToken));

        let err = executor
            .execute(Request::get("/v1/knowledges"))
            .await
            .expect_err("expected failure");
        assert!(matches!(err, FetchError::Parse(_)));
    }

    #[tokio::test]
    async fn test_transport_failure_surfaces_as_network() {
        let transport = Arc::new(FixedTransport::unreachable());
        let executor = RequestExecutor::new(transport, Arc::new(NoToken));

        let err = executor
            .execute(Request::get("/v1/knowledges"))
            .await
            .expect_err("expected failure");
        assert!(matches!(err, FetchError::Network(_)));
    }

    #[tokio::test]
    async fn test_empty_body_becomes_null() {
        let transport = Arc::new(FixedTransport::ok(204, ""));
        let executor = RequestExecutor::new(transport, Arc::new(NoToken));

        let payload = executor
            .execute(Request::delete("/v1/knowledges/kb-1"))
            .await
            .expect("request failed");
        assert_eq!(payload, Value::Null);
    }
}
