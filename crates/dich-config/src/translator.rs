use std::env;

use dich_types::AUTO_LANGUAGE;
use serde::{Deserialize, Serialize};

fn default_from_lang() -> String {
    AUTO_LANGUAGE.to_string()
}

fn default_to_lang() -> String {
    "en".to_string()
}

fn default_fallback_lang() -> String {
    "en".to_string()
}

/// How captured images turn into translations
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum PipelineMode {
    /// Plain OCR call, then a separate translation call
    #[default]
    Sequential,
    /// One call that extracts and translates together
    Combined,
}

impl PipelineMode {
    fn from_env(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "sequential" => Some(Self::Sequential),
            "combined" => Some(Self::Combined),
            _ => None,
        }
    }
}

#[derive(Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct TranslatorConfig {
    #[serde(default = "default_from_lang")]
    pub from_lang: String,
    #[serde(default = "default_to_lang")]
    pub to_lang: String,
    /// Target used when the detected source equals the requested target
    #[serde(default = "default_fallback_lang")]
    pub fallback_lang: String,
    #[serde(default)]
    pub pipeline: PipelineMode,
}

impl TranslatorConfig {
    pub fn new() -> Self {
        let from_lang = env::var("SOURCE_LANG").unwrap_or_else(|_| default_from_lang());
        let to_lang = env::var("TARGET_LANG").unwrap_or_else(|_| default_to_lang());
        let fallback_lang = env::var("FALLBACK_LANG").unwrap_or_else(|_| default_fallback_lang());
        let pipeline = env::var("PIPELINE_MODE")
            .ok()
            .and_then(|v| PipelineMode::from_env(&v))
            .unwrap_or_default();

        Self {
            from_lang,
            to_lang,
            fallback_lang,
            pipeline,
        }
    }
}

impl Default for TranslatorConfig {
    fn default() -> Self {
        Self {
            from_lang: default_from_lang(),
            to_lang: default_to_lang(),
            fallback_lang: default_fallback_lang(),
            pipeline: PipelineMode::default(),
        }
    }
}
