use std::sync::Arc;

use dich_core::language::{LanguageTable, normalize_code, same_language};
use dich_types::{LanguageCode, TranslationRequest, TranslationResult};

use crate::{TranslateError, Translator};

/// Outcome of an orchestrated translation
#[derive(Debug, Clone, PartialEq)]
pub struct Orchestrated {
    pub result: TranslationResult,
    /// The requested target matched the detected language and was replaced
    pub fallback_applied: bool,
}

/// Runs translations and resolves detected/target language conflicts.
///
/// When the model reports that the source equals the target, the text is
/// translated once more into the fallback language with the detected language
/// pinned as source. A returned result never has `detected_lang == target_lang`.
#[derive(Clone)]
pub struct TranslationOrchestrator {
    translator: Arc<dyn Translator>,
    languages: LanguageTable,
    fallback_lang: LanguageCode,
}

impl TranslationOrchestrator {
    pub fn new(translator: Arc<dyn Translator>, fallback_lang: impl Into<String>) -> Self {
        Self {
            translator,
            languages: LanguageTable::builtin(),
            fallback_lang: normalize_code(&fallback_lang.into()),
        }
    }

    pub fn with_languages(mut self, languages: LanguageTable) -> Self {
        self.languages = languages;
        self
    }

    pub fn languages(&self) -> &LanguageTable {
        &self.languages
    }

    pub fn translator(&self) -> &Arc<dyn Translator> {
        &self.translator
    }

    /// Target to use when the text is already in `detected`
    pub fn fallback_for(&self, detected: &str) -> Result<LanguageCode, TranslateError> {
        if !same_language(&self.fallback_lang, detected) {
            return Ok(self.fallback_lang.clone());
        }

        self.languages
            .first_other_than(detected)
            .map(|lang| lang.code.to_string())
            .ok_or_else(|| TranslateError::NoFallbackLanguage(normalize_code(detected)))
    }

    /// Fails with [`TranslateError::UnsupportedLanguage`] unless the target
    /// is a concrete language from the table
    pub async fn translate(
        &self,
        request: &TranslationRequest,
    ) -> Result<Orchestrated, TranslateError> {
        if !self.languages.contains(&request.target_lang) {
            return Err(TranslateError::UnsupportedLanguage(normalize_code(
                &request.target_lang,
            )));
        }

        let source = request.explicit_source();
        let first = self
            .translator
            .translate(&request.text, source, &request.target_lang)
            .await?;

        if !same_language(&first.from, &first.to) {
            return Ok(Orchestrated {
                result: TranslationResult {
                    translated_text: first.text,
                    detected_lang: first.from,
                    target_lang: first.to,
                },
                fallback_applied: false,
            });
        }

        let detected = first.from;
        let fallback = self.fallback_for(&detected)?;
        tracing::info!(
            "Detected language {} equals target, retranslating into {}",
            detected,
            fallback
        );

        let second = self
            .translator
            .translate(&request.text, Some(&detected), &fallback)
            .await?;

        Ok(Orchestrated {
            result: TranslationResult {
                translated_text: second.text,
                detected_lang: detected,
                target_lang: second.to,
            },
            fallback_applied: true,
        })
    }

    /// Translates each request in order; one failure does not stop the rest
    pub async fn translate_batch(
        &self,
        requests: &[TranslationRequest],
    ) -> Vec<Result<Orchestrated, TranslateError>> {
        let mut results = Vec::with_capacity(requests.len());
        for request in requests {
            results.push(self.translate(request).await);
        }
        results
    }
}
