use std::env;

use serde::{Deserialize, Serialize};

fn default_endpoint() -> String {
    "https://generativelanguage.googleapis.com/v1beta".to_string()
}

fn default_model() -> String {
    "gemini-2.5-flash-lite".to_string()
}

fn default_timeout_seconds() -> u64 {
    60
}

/// Generative API endpoint settings
#[derive(Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct RemoteConfig {
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
}

impl RemoteConfig {
    pub fn new() -> Self {
        let endpoint = env::var("GEMINI_ENDPOINT").unwrap_or_else(|_| default_endpoint());
        let model = env::var("GEMINI_MODEL").unwrap_or_else(|_| default_model());
        let timeout_seconds = env::var("REMOTE_TIMEOUT_SECONDS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or_else(default_timeout_seconds);

        Self {
            endpoint,
            model,
            timeout_seconds,
        }
    }

    pub fn generate_url(&self) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.endpoint.trim_end_matches('/'),
            self.model
        )
    }
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            model: default_model(),
            timeout_seconds: default_timeout_seconds(),
        }
    }
}
