use dich_remote::RemoteError;
use dich_types::LanguageCode;

mod gemini;
mod orchestrator;
mod session;

pub use gemini::GeminiTranslator;
pub use orchestrator::{Orchestrated, TranslationOrchestrator};
pub use session::{MemoryPreferences, PreferenceStore, SessionState, TranslationSession};

/// Translation provider interface
#[async_trait::async_trait]
pub trait Translator: Send + Sync {
    /// Translate text to `to`; `from = None` asks the provider to detect the source
    async fn translate(
        &self,
        text: &str,
        from: Option<&str>,
        to: &str,
    ) -> Result<Translation, TranslateError>;

    /// Detect language of text
    async fn detect_language(&self, text: &str) -> Result<LanguageCode, TranslateError>;

    /// Provider metadata
    fn metadata(&self) -> ProviderMetadata;
}

#[derive(Debug, Clone, PartialEq)]
pub struct Translation {
    pub text: String,
    /// Detected (or given) source language, "auto" when the provider did not say
    pub from: LanguageCode,
    pub to: LanguageCode,
    pub provider: String,
}

#[derive(Debug, Clone)]
pub struct ProviderMetadata {
    pub name: String,
    pub requires_api_key: bool,
    pub free_tier_available: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum TranslateError {
    #[error("Please configure your API key in Settings")]
    MissingCredential,

    #[error("Please enter some text to translate")]
    EmptyInput,

    #[error("No response from the translation service")]
    EmptyModelResponse,

    #[error("Invalid translation response: {0}")]
    InvalidResponseFormat(String),

    #[error("Unsupported language: {0}")]
    UnsupportedLanguage(LanguageCode),

    #[error("No fallback language differs from {0}")]
    NoFallbackLanguage(LanguageCode),

    #[error("Translation request failed: {0}")]
    RemoteCallFailure(RemoteError),
}

impl From<RemoteError> for TranslateError {
    fn from(err: RemoteError) -> Self {
        match err {
            RemoteError::Malformed(_) => {
                TranslateError::InvalidResponseFormat("unexpected response envelope".to_string())
            }
            other => TranslateError::RemoteCallFailure(other),
        }
    }
}
