use std::env;

use serde::{Deserialize, Serialize};

use self::capture::CaptureConfig;
use self::ocr::OcrConfig;
use self::remote::RemoteConfig;
use self::retry::RetryConfig;
use self::translator::TranslatorConfig;
use self::update::UpdateConfig;

pub mod capture;
pub mod ocr;
pub mod remote;
pub mod retry;
pub mod translator;
pub mod update;

pub use self::capture::SelectorKind;
pub use self::translator::PipelineMode;

#[derive(Serialize, Deserialize, Clone, Default)]
#[serde(default)]
pub struct Config {
    pub remote: RemoteConfig,
    pub retry: RetryConfig,
    pub translator: TranslatorConfig,
    pub ocr: OcrConfig,
    pub capture: CaptureConfig,
    pub update: UpdateConfig,

    /// Emit logs as JSON lines instead of human-readable text
    pub log_json: bool,
}

impl Config {
    pub fn new() -> Self {
        let log_json = env::var("LOG_FORMAT")
            .map(|v| v.eq_ignore_ascii_case("json"))
            .unwrap_or(false);

        Config {
            remote: RemoteConfig::new(),
            retry: RetryConfig::new(),
            translator: TranslatorConfig::new(),
            ocr: OcrConfig::new(),
            capture: CaptureConfig::new(),
            update: UpdateConfig::new(),

            log_json,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_profile_fills_defaults() {
        let config: Config =
            serde_json::from_str(r#"{"translator":{"to_lang":"vi"},"capture":{"min_selection":20}}"#)
                .unwrap();

        assert_eq!(config.translator.to_lang, "vi");
        assert_eq!(config.translator.fallback_lang, "en");
        assert_eq!(config.capture.min_selection, 20);
        assert_eq!(config.capture.timeout_seconds, 60);
        assert_eq!(config.retry.max_attempts, 3);
        assert_eq!(config.retry.base_delay_ms, 2000);
        assert_eq!(config.ocr.max_dimension, 1024);
    }

    #[test]
    fn generate_url_joins_model() {
        let remote = RemoteConfig {
            endpoint: "https://example.test/v1beta/".to_string(),
            model: "m".to_string(),
            timeout_seconds: 5,
        };
        assert_eq!(
            remote.generate_url(),
            "https://example.test/v1beta/models/m:generateContent"
        );
    }

    #[test]
    fn pipeline_mode_serializes_snake_case() {
        let json = serde_json::to_string(&PipelineMode::Combined).unwrap();
        assert_eq!(json, "\"combined\"");
    }
}
