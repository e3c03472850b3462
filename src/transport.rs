//! HTTP transport abstraction used by the request executor

use crate::{
    constants::USER_AGENT,
    error::ApiError,
};
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

/// Raw HTTP response as seen by the executor
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub status_text: String,
    pub body: String,
}

impl HttpResponse {
    /// Creates a response with the canonical reason phrase for `status`
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        let status_text = reqwest::StatusCode::from_u16(status)
            .ok()
            .and_then(|code| code.canonical_reason())
            .unwrap_or_default()
            .to_string();

        Self {
            status,
            status_text,
            body: body.into(),
        }
    }

    /// Creates a 200 response carrying a JSON body
    pub fn ok_json(body: impl Into<String>) -> Self {
        Self::new(200, body)
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn is_rate_limited(&self) -> bool {
        self.status == 429
    }
}

/// Trait for issuing GET requests against the upstream API
///
/// Implementations perform exactly one physical request per call; retry
/// policy belongs to [`RequestExecutor`](crate::executor::RequestExecutor).
#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// Sends a GET request to `url` with the given headers
    async fn get(&self, url: &str, headers: &[(&str, &str)]) -> Result<HttpResponse, ApiError>;
}

/// reqwest-backed transport
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    /// Creates a new transport with the given request timeout
    pub fn new(timeout: Duration) -> Result<Self, ApiError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(ApiError::Network)?;

        Ok(Self { client })
    }

    /// Wraps an already configured reqwest client
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn get(&self, url: &str, headers: &[(&str, &str)]) -> Result<HttpResponse, ApiError> {
        let mut request = self.client.get(url).header("Accept", "application/json");
        for (name, value) in headers {
            request = request.header(*name, *value);
        }

        let response = request.send().await.map_err(ApiError::Network)?;
        let status = response.status();
        let body = response.text().await.map_err(ApiError::Network)?;

        Ok(HttpResponse {
            status: status.as_u16(),
            status_text: status.canonical_reason().unwrap_or_default().to_string(),
            body,
        })
    }
}

#[cfg(test)]
pub mod mock {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};
    use tokio::time::Instant;

    /// One recorded request
    #[derive(Debug, Clone)]
    pub struct RecordedCall {
        pub url: String,
        pub headers: Vec<(String, String)>,
        pub at: Instant,
    }

    /// Transport that replays scripted outcomes in order
    pub struct MockTransport {
        script: Arc<Mutex<VecDeque<Result<HttpResponse, ApiError>>>>,
        calls: Arc<Mutex<Vec<RecordedCall>>>,
    }

    impl Default for MockTransport {
        fn default() -> Self {
            Self::new()
        }
    }

    impl MockTransport {
        pub fn new() -> Self {
            Self {
                script: Arc::new(Mutex::new(VecDeque::new())),
                calls: Arc::new(Mutex::new(Vec::new())),
            }
        }

        pub fn push_status(&self, status: u16) -> &Self {
            self.push(Ok(HttpResponse::new(status, "")))
        }

        pub fn push_json(&self, body: &str) -> &Self {
            self.push(Ok(HttpResponse::ok_json(body)))
        }

        pub fn push_error(&self, message: &str) -> &Self {
            self.push(Err(ApiError::Transport(message.to_string())))
        }

        pub fn push(&self, outcome: Result<HttpResponse, ApiError>) -> &Self {
            self.script.lock().unwrap().push_back(outcome);
            self
        }

        pub fn calls(&self) -> Vec<RecordedCall> {
            self.calls.lock().unwrap().clone()
        }

        pub fn call_count(&self) -> usize {
            self.calls.lock().unwrap().len()
        }

        /// Elapsed time between consecutive requests
        pub fn gaps(&self) -> Vec<Duration> {
            let calls = self.calls();
            calls.windows(2).map(|w| w[1].at - w[0].at).collect()
        }
    }

    #[async_trait]
    impl HttpTransport for MockTransport {
        async fn get(&self, url: &str, headers: &[(&str, &str)]) -> Result<HttpResponse, ApiError> {
            self.calls.lock().unwrap().push(RecordedCall {
                url: url.to_string(),
                headers: headers
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .collect(),
                at: Instant::now(),
            });

            self.script
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(ApiError::Transport("script exhausted".to_string())))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_response_classification() {
        let ok = HttpResponse::ok_json("{}");
        assert!(ok.is_success());
        assert!(!ok.is_rate_limited());

        let limited = HttpResponse::new(429, "");
        assert!(!limited.is_success());
        assert!(limited.is_rate_limited());
        assert_eq!(limited.status_text, "Too Many Requests");

        let missing = HttpResponse::new(404, "");
        assert_eq!(missing.status_text, "Not Found");
    }
}
