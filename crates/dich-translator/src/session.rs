use std::sync::{Arc, Mutex};

use dich_core::language::{is_auto, normalize_code};
use dich_types::{AUTO_LANGUAGE, LanguageCode, TextSource, TranslationRequest};
use tokio::sync::RwLock;

use crate::{Orchestrated, TranslateError, TranslationOrchestrator};

/// Where the chosen target language survives restarts
pub trait PreferenceStore: Send + Sync {
    fn load_target(&self) -> Option<LanguageCode>;
    fn save_target(&self, target: &str) -> anyhow::Result<()>;
}

#[derive(Default)]
pub struct MemoryPreferences {
    target: Mutex<Option<LanguageCode>>,
}

impl MemoryPreferences {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PreferenceStore for MemoryPreferences {
    fn load_target(&self) -> Option<LanguageCode> {
        self.target.lock().ok().and_then(|t| t.clone())
    }

    fn save_target(&self, target: &str) -> anyhow::Result<()> {
        let mut slot = self
            .target
            .lock()
            .map_err(|_| anyhow::anyhow!("preference lock poisoned"))?;
        *slot = Some(target.to_string());
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionState {
    /// "auto" until manual input reveals the language
    pub source: LanguageCode,
    pub target: LanguageCode,
    /// Language of the last translated text
    pub detected: Option<LanguageCode>,
}

/// Source/target selection carried across translations
pub struct TranslationSession {
    orchestrator: TranslationOrchestrator,
    preferences: Arc<dyn PreferenceStore>,
    state: RwLock<SessionState>,
}

impl TranslationSession {
    pub fn new(
        orchestrator: TranslationOrchestrator,
        preferences: Arc<dyn PreferenceStore>,
        source: &str,
        default_target: &str,
    ) -> Self {
        let target = preferences
            .load_target()
            .map(|t| normalize_code(&t))
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| normalize_code(default_target));

        let source = if is_auto(source) {
            AUTO_LANGUAGE.to_string()
        } else {
            normalize_code(source)
        };

        Self {
            orchestrator,
            preferences,
            state: RwLock::new(SessionState {
                source,
                target,
                detected: None,
            }),
        }
    }

    pub fn orchestrator(&self) -> &TranslationOrchestrator {
        &self.orchestrator
    }

    pub async fn snapshot(&self) -> SessionState {
        self.state.read().await.clone()
    }

    pub async fn handle_translate(
        &self,
        text: &str,
        source: TextSource,
    ) -> Result<Orchestrated, TranslateError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(TranslateError::EmptyInput);
        }

        let request = {
            let mut state = self.state.write().await;
            if source.is_override() {
                state.source = AUTO_LANGUAGE.to_string();
            }
            TranslationRequest::new(text, state.target.clone()).with_source(state.source.clone())
        };

        let outcome = self.orchestrator.translate(&request).await?;
        let result = &outcome.result;

        let persist = {
            let mut state = self.state.write().await;
            apply_detection(&mut state, &result.detected_lang, source);
            if outcome.fallback_applied {
                state.target = result.target_lang.clone();
                true
            } else {
                false
            }
        };

        if persist {
            self.persist_target(&result.target_lang);
        }

        Ok(outcome)
    }

    /// Records a translation produced outside the session, such as a
    /// combined OCR reply, as if it had gone through [`Self::handle_translate`]
    pub async fn record_detection(&self, detected: &str, source: TextSource) {
        let mut state = self.state.write().await;
        if source.is_override() {
            state.source = AUTO_LANGUAGE.to_string();
        }
        apply_detection(&mut state, &normalize_code(detected), source);
    }

    pub async fn set_target(&self, target: &str) {
        let target = normalize_code(target);
        self.state.write().await.target = target.clone();
        self.persist_target(&target);
    }

    /// Changes the target without remembering it for the next launch
    pub async fn use_target(&self, target: &str) -> Result<LanguageCode, TranslateError> {
        let target = normalize_code(target);
        if !self.orchestrator.languages().contains(&target) {
            return Err(TranslateError::UnsupportedLanguage(target));
        }
        self.state.write().await.target = target.clone();
        Ok(target)
    }

    pub async fn set_source(&self, source: &str) {
        let source = if is_auto(source) {
            AUTO_LANGUAGE.to_string()
        } else {
            normalize_code(source)
        };
        self.state.write().await.source = source;
    }

    /// Swaps source and target. With an "auto" source the detected language
    /// takes the source's place; returns false when there is nothing to swap.
    pub async fn swap(&self) -> bool {
        let target = {
            let mut state = self.state.write().await;
            let new_target = if is_auto(&state.source) {
                match state.detected.clone() {
                    Some(detected) => detected,
                    None => return false,
                }
            } else {
                state.source.clone()
            };

            state.source = std::mem::replace(&mut state.target, new_target);
            state.target.clone()
        };

        self.persist_target(&target);
        true
    }

    fn persist_target(&self, target: &str) {
        if let Err(e) = self.preferences.save_target(target) {
            tracing::warn!("Failed to persist target language {}: {:#}", target, e);
        }
    }
}

fn apply_detection(state: &mut SessionState, detected: &str, source: TextSource) {
    if is_auto(detected) {
        return;
    }
    state.detected = Some(detected.to_string());
    if !source.is_override() {
        state.source = detected.to_string();
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;

    use super::*;
    use crate::{ProviderMetadata, Translation, Translator};

    /// Reports the given source or guesses by a single marker word
    struct MarkerDetector;

    #[async_trait]
    impl Translator for MarkerDetector {
        async fn translate(
            &self,
            text: &str,
            from: Option<&str>,
            to: &str,
        ) -> Result<Translation, TranslateError> {
            let detected = match from {
                Some(code) => code.to_string(),
                None if text.contains("chào") => "vi".to_string(),
                None => "en".to_string(),
            };
            Ok(Translation {
                text: format!("{text} ({to})"),
                from: detected,
                to: to.to_string(),
                provider: "marker".to_string(),
            })
        }

        async fn detect_language(&self, text: &str) -> Result<LanguageCode, TranslateError> {
            Ok(self.translate(text, None, "en").await?.from)
        }

        fn metadata(&self) -> ProviderMetadata {
            ProviderMetadata {
                name: "marker".to_string(),
                requires_api_key: false,
                free_tier_available: true,
            }
        }
    }

    struct FailingPreferences;

    impl PreferenceStore for FailingPreferences {
        fn load_target(&self) -> Option<LanguageCode> {
            None
        }

        fn save_target(&self, _target: &str) -> anyhow::Result<()> {
            anyhow::bail!("read-only")
        }
    }

    fn session(prefs: Arc<dyn PreferenceStore>, target: &str) -> TranslationSession {
        let orchestrator = TranslationOrchestrator::new(Arc::new(MarkerDetector), "en");
        TranslationSession::new(orchestrator, prefs, "auto", target)
    }

    #[tokio::test]
    async fn persisted_target_wins_over_default() {
        let prefs = Arc::new(MemoryPreferences::new());
        prefs.save_target("ja").unwrap();
        let s = session(prefs, "vi");
        assert_eq!(s.snapshot().await.target, "ja");
    }

    #[tokio::test]
    async fn manual_input_locks_source_to_detected() {
        let s = session(Arc::new(MemoryPreferences::new()), "vi");

        s.handle_translate("Hello world", TextSource::Manual)
            .await
            .unwrap();

        let state = s.snapshot().await;
        assert_eq!(state.source, "en");
        assert_eq!(state.detected.as_deref(), Some("en"));
    }

    #[tokio::test]
    async fn ocr_input_resets_source_to_auto() {
        let s = session(Arc::new(MemoryPreferences::new()), "ja");
        s.set_source("en").await;

        let out = s
            .handle_translate("Xin chào", TextSource::Ocr)
            .await
            .unwrap();

        assert_eq!(out.result.detected_lang, "vi");
        let state = s.snapshot().await;
        assert_eq!(state.source, AUTO_LANGUAGE);
        assert_eq!(state.detected.as_deref(), Some("vi"));
    }

    #[tokio::test]
    async fn fallback_updates_and_persists_target() {
        let prefs = Arc::new(MemoryPreferences::new());
        let s = session(prefs.clone(), "vi");

        let out = s
            .handle_translate("Xin chào thế giới", TextSource::Ocr)
            .await
            .unwrap();

        assert!(out.fallback_applied);
        assert_eq!(out.result.target_lang, "en");
        assert_eq!(s.snapshot().await.target, "en");
        assert_eq!(prefs.load_target().as_deref(), Some("en"));
    }

    #[tokio::test]
    async fn persistence_failure_does_not_fail_translation() {
        let s = session(Arc::new(FailingPreferences), "vi");

        let out = s
            .handle_translate("Xin chào", TextSource::Manual)
            .await
            .unwrap();
        assert!(out.fallback_applied);
        assert_eq!(s.snapshot().await.target, "en");
    }

    #[tokio::test]
    async fn empty_text_is_rejected() {
        let s = session(Arc::new(MemoryPreferences::new()), "vi");
        assert!(matches!(
            s.handle_translate("   \n", TextSource::Manual).await,
            Err(TranslateError::EmptyInput)
        ));
    }

    #[tokio::test]
    async fn swap_uses_detected_when_source_is_auto() {
        let prefs = Arc::new(MemoryPreferences::new());
        let s = session(prefs.clone(), "vi");

        // Nothing detected yet
        assert!(!s.swap().await);

        s.handle_translate("Hello", TextSource::Clipboard)
            .await
            .unwrap();
        assert!(s.swap().await);

        let state = s.snapshot().await;
        assert_eq!(state.source, "vi");
        assert_eq!(state.target, "en");
        assert_eq!(prefs.load_target().as_deref(), Some("en"));
    }

    #[tokio::test]
    async fn recorded_detection_follows_source_rules() {
        let s = session(Arc::new(MemoryPreferences::new()), "en");
        s.set_source("ja").await;

        s.record_detection("VI", TextSource::Image).await;
        let state = s.snapshot().await;
        assert_eq!(state.source, AUTO_LANGUAGE);
        assert_eq!(state.detected.as_deref(), Some("vi"));

        s.record_detection("auto", TextSource::Manual).await;
        assert_eq!(s.snapshot().await.detected.as_deref(), Some("vi"));
    }

    #[tokio::test]
    async fn used_target_is_not_remembered() {
        let prefs = Arc::new(MemoryPreferences::new());
        let s = session(prefs.clone(), "vi");

        assert_eq!(s.use_target("JA").await.unwrap(), "ja");
        assert_eq!(s.snapshot().await.target, "ja");
        assert_eq!(prefs.load_target(), None);

        for target in ["auto", "", "xx"] {
            assert!(matches!(
                s.use_target(target).await,
                Err(TranslateError::UnsupportedLanguage(_))
            ));
        }
        assert_eq!(s.snapshot().await.target, "ja");
    }

    #[tokio::test]
    async fn swap_exchanges_explicit_languages() {
        let s = session(Arc::new(MemoryPreferences::new()), "vi");
        s.set_source("ja").await;

        assert!(s.swap().await);
        let state = s.snapshot().await;
        assert_eq!(state.source, "vi");
        assert_eq!(state.target, "ja");
    }
}
