// src/llm/http.rs
// Shared HTTP client configuration for scoring and embedding providers

use anyhow::{anyhow, Result};
use reqwest::{Client, RequestBuilder};
use std::time::Duration;
use tracing::warn;

/// Maximum retry attempts for transient failures
const DEFAULT_MAX_ATTEMPTS: u32 = 3;
/// Base backoff duration between retries (doubles each attempt)
const DEFAULT_BASE_BACKOFF_MS: u64 = 500;

/// Shared HTTP client with bounded retry for provider calls.
///
/// Retries cover transport-level failures and retryable status codes only;
/// provider-level failure (all attempts exhausted) surfaces as an error and
/// is handled by the strategy chain above.
pub struct LlmHttpClient {
    client: Client,
    pub max_attempts: u32,
    pub base_backoff: Duration,
}

impl LlmHttpClient {
    pub fn new(request_timeout: Duration, connect_timeout: Duration) -> Self {
        let client = Client::builder()
            .timeout(request_timeout)
            .connect_timeout(connect_timeout)
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            client,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base_backoff: Duration::from_millis(DEFAULT_BASE_BACKOFF_MS),
        }
    }

    /// Create from an existing reqwest::Client
    pub fn from_client(client: Client) -> Self {
        Self {
            client,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base_backoff: Duration::from_millis(DEFAULT_BASE_BACKOFF_MS),
        }
    }

    pub fn inner(&self) -> &Client {
        &self.client
    }

    /// POST a JSON body with Bearer auth, retrying transient failures.
    /// Returns the response body as text on success.
    pub async fn post_json_bearer(
        &self,
        request_id: &str,
        url: &str,
        api_key: &str,
        body: String,
    ) -> Result<String> {
        self.execute_with_retry(request_id, body, |client, body| {
            client
                .post(url)
                .header("Authorization", format!("Bearer {api_key}"))
                .header("Content-Type", "application/json")
                .body(body)
        })
        .await
    }

    /// Execute an HTTP request with retry, using a custom request builder.
    /// The closure is invoked on each attempt with the client and body.
    pub async fn execute_with_retry<F>(
        &self,
        request_id: &str,
        body: String,
        build_request: F,
    ) -> Result<String>
    where
        F: Fn(&Client, String) -> RequestBuilder,
    {
        let mut last_error = None;

        for attempt in 1..=self.max_attempts {
            if attempt > 1 {
                let backoff = self.base_backoff * 2u32.pow(attempt - 2);
                warn!(
                    request_id = %request_id,
                    attempt,
                    backoff_ms = backoff.as_millis() as u64,
                    "Retrying provider request"
                );
                tokio::time::sleep(backoff).await;
            }

            let response = match build_request(&self.client, body.clone()).send().await {
                Ok(r) => r,
                Err(e) => {
                    last_error = Some(anyhow!("request failed: {e}"));
                    continue;
                }
            };

            let status = response.status();
            let text = response.text().await.unwrap_or_default();

            if status.is_success() {
                return Ok(text);
            }

            // 429 and 5xx are worth retrying; 4xx client errors are not
            if status.as_u16() == 429 || status.is_server_error() {
                last_error = Some(anyhow!(
                    "provider returned {status}: {}",
                    truncate(&text, 200)
                ));
                continue;
            }

            return Err(anyhow!(
                "provider returned {status}: {}",
                truncate(&text, 200)
            ));
        }

        Err(last_error.unwrap_or_else(|| anyhow!("request failed with no attempts made")))
    }
}

/// Truncate a string for log/error output, respecting char boundaries
fn truncate(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        s.to_string()
    } else {
        s.chars().take(max_chars).collect()
    }
}
