use std::sync::Arc;

use async_trait::async_trait;
use dich_core::language::{LanguageTable, normalize_code};
use dich_remote::payload::parse_object;
use dich_remote::{GenerateRequest, GenerativeBackend, RetryPolicy};
use dich_secret::SecretStore;
use dich_types::{AUTO_LANGUAGE, LanguageCode};
use serde::Deserialize;

use crate::{ProviderMetadata, TranslateError, Translation, Translator};

#[derive(Deserialize)]
struct TranslationReply {
    #[serde(rename = "detectedLang", default)]
    detected_lang: Option<String>,
    #[serde(rename = "translatedText", default)]
    translated_text: Option<String>,
}

/// Translator backed by the generative-language API
#[derive(Clone)]
pub struct GeminiTranslator {
    backend: Arc<dyn GenerativeBackend>,
    secrets: Arc<dyn SecretStore>,
    retry: RetryPolicy,
    languages: LanguageTable,
}

impl GeminiTranslator {
    pub fn new(
        backend: Arc<dyn GenerativeBackend>,
        secrets: Arc<dyn SecretStore>,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            backend,
            secrets,
            retry,
            languages: LanguageTable::builtin(),
        }
    }

    pub fn with_languages(mut self, languages: LanguageTable) -> Self {
        self.languages = languages;
        self
    }

    fn build_prompt(&self, text: &str, from: Option<&str>, to: &str) -> String {
        let target_label = self.languages.label(to);
        let source_instruction = match from {
            Some(code) => format!("The source text is in language code: {code}."),
            None => {
                "Detect the source language yourself and report its ISO 639-1 code.".to_string()
            }
        };
        // Quoting through serde keeps newlines and quotes in the text unambiguous
        let quoted = serde_json::to_string(text).unwrap_or_else(|_| format!("\"{text}\""));

        format!(
            "You are a professional translator.\n\
             \n\
             Task: translate the text below into {target_label} (ISO code: {to}).\n\
             {source_instruction}\n\
             \n\
             Rules:\n\
             1. Translate only the text content; never translate language names or codes.\n\
             2. Keep the original meaning and tone.\n\
             3. Reply with a single JSON object only: no markdown, no code blocks, no commentary.\n\
             \n\
             JSON shape:\n\
             {{\n  \"detectedLang\": \"source_language_iso_code\",\n  \"translatedText\": \"translation\"\n}}\n\
             \n\
             Text:\n\
             {quoted}"
        )
    }
}

#[async_trait]
impl Translator for GeminiTranslator {
    async fn translate(
        &self,
        text: &str,
        from: Option<&str>,
        to: &str,
    ) -> Result<Translation, TranslateError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(TranslateError::EmptyInput);
        }

        let api_key = self.secrets.get().ok_or(TranslateError::MissingCredential)?;

        let to = normalize_code(to);
        let from = from.map(normalize_code);
        let request =
            GenerateRequest::prompt(self.build_prompt(text, from.as_deref(), &to)).json_response();

        tracing::debug!(
            "Translating {} chars {} -> {}",
            text.len(),
            from.as_deref().unwrap_or(AUTO_LANGUAGE),
            to
        );
        let raw = self
            .retry
            .generate(self.backend.as_ref(), &api_key, &request)
            .await?;

        if raw.trim().is_empty() {
            return Err(TranslateError::EmptyModelResponse);
        }

        let reply: TranslationReply = parse_object(&raw)
            .map_err(|e| TranslateError::InvalidResponseFormat(e.to_string()))?;

        let translated = reply
            .translated_text
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .ok_or_else(|| {
                TranslateError::InvalidResponseFormat("missing translatedText".to_string())
            })?;

        let detected = reply
            .detected_lang
            .map(|d| normalize_code(&d))
            .filter(|d| !d.is_empty())
            .or(from)
            .unwrap_or_else(|| AUTO_LANGUAGE.to_string());

        Ok(Translation {
            text: translated,
            from: detected,
            to,
            provider: "gemini".to_string(),
        })
    }

    async fn detect_language(&self, text: &str) -> Result<LanguageCode, TranslateError> {
        let translation = self.translate(text, None, "en").await?;
        Ok(translation.from)
    }

    fn metadata(&self) -> ProviderMetadata {
        ProviderMetadata {
            name: "Gemini".to_string(),
            requires_api_key: true,
            free_tier_available: true,
        }
    }
}
