use std::time::Duration;

use async_trait::async_trait;
use dich_config::remote::RemoteConfig;

use crate::outcome::RemoteCallOutcome;
use crate::wire::{GenerateRequest, GenerateResponse};

/// Anything that can answer a `generateContent` request
#[async_trait]
pub trait GenerativeBackend: Send + Sync {
    /// One attempt. `Success` carries the envelope's inner text, possibly empty.
    async fn generate(&self, api_key: &str, request: &GenerateRequest)
    -> RemoteCallOutcome<String>;
}

#[derive(Clone)]
pub struct GeminiClient {
    client: reqwest::Client,
    url: String,
}

impl GeminiClient {
    pub fn new(config: &RemoteConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .unwrap_or_else(|e| {
                tracing::warn!("Falling back to default HTTP client: {}", e);
                reqwest::Client::new()
            });

        Self {
            client,
            url: config.generate_url(),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl GenerativeBackend for GeminiClient {
    async fn generate(
        &self,
        api_key: &str,
        request: &GenerateRequest,
    ) -> RemoteCallOutcome<String> {
        tracing::debug!(
            "POST {} (image: {})",
            self.url,
            request.has_image()
        );

        let response = match self
            .client
            .post(&self.url)
            .header("x-goog-api-key", api_key)
            .json(request)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                return RemoteCallOutcome::PermanentFailure {
                    status: e.status().map(|s| s.as_u16()),
                    message: format!("Network error: {}", e.without_url()),
                };
            }
        };

        let status = response.status();
        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => {
                return RemoteCallOutcome::PermanentFailure {
                    status: Some(status.as_u16()),
                    message: format!("Failed to read response body: {}", e.without_url()),
                };
            }
        };

        if !status.is_success() {
            return RemoteCallOutcome::from_status(status.as_u16(), error_message(&body));
        }

        match serde_json::from_str::<GenerateResponse>(&body) {
            Ok(envelope) => {
                let text = envelope.text();
                tracing::debug!("Model returned {} chars", text.len());
                RemoteCallOutcome::Success(text)
            }
            Err(e) => {
                tracing::warn!("Unexpected response envelope: {}", e);
                RemoteCallOutcome::MalformedResponse(body)
            }
        }
    }
}

/// `error.message` of a Google API error body, or the body itself
fn error_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v["error"]["message"].as_str().map(str::to_string))
        .unwrap_or_else(|| {
            let body = body.trim();
            if body.is_empty() {
                "Request failed".to_string()
            } else {
                body.chars().take(300).collect()
            }
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn google_error_body_is_unwrapped() {
        let body = r#"{"error":{"code":400,"message":"API key not valid. Please pass a valid API key.","status":"INVALID_ARGUMENT"}}"#;
        assert_eq!(
            error_message(body),
            "API key not valid. Please pass a valid API key."
        );
    }

    #[test]
    fn plain_error_body_is_kept() {
        assert_eq!(error_message("Service Unavailable"), "Service Unavailable");
        assert_eq!(error_message("  "), "Request failed");
    }

    #[test]
    fn client_targets_configured_model() {
        let client = GeminiClient::new(&RemoteConfig::default());
        assert!(client.url().ends_with("/models/gemini-2.5-flash-lite:generateContent"));
    }
}
