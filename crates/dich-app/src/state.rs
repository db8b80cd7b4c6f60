use std::sync::Arc;

use dich_config::{Config, SelectorKind};
use dich_ocr::{
    CancelKey, CaptureCoordinator, CommandGrabber, FallbackGrabber, MainWindow, OcrExtractor,
    PromptSurface, ScreenGrabber, SelectionSurface, SignalSource, SlurpSurface, XcapGrabber,
};
use dich_remote::{GeminiClient, GenerativeBackend, RetryPolicy};
use dich_secret::{FileSecretStore, MemorySecretStore, SecretStore, validate_key};
use dich_translator::{
    GeminiTranslator, PreferenceStore, TranslationOrchestrator, TranslationSession,
};
use dich_types::{AppEvent, CaptureRegion};
use dich_update::{GithubReleaseChannel, UpdateChannel, UpdateController};
use kanal::AsyncSender;
use tokio::sync::RwLock;

use crate::profile::FilePreferences;
use crate::window::{ConsoleSurface, ConsoleWindow};

/// How the user talks to the app, which decides where region selections come from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Frontend {
    /// Long-running console session; selections arrive as events
    Interactive,
    /// A single command; the prompt selector may read stdin directly
    OneShot,
}

/// Everything [`AppState`] talks to outside the process
pub struct Services {
    pub backend: Arc<dyn GenerativeBackend>,
    pub secrets: Arc<dyn SecretStore>,
    pub preferences: Arc<dyn PreferenceStore>,
    pub surface: Arc<dyn SelectionSurface>,
    pub grabber: Arc<dyn ScreenGrabber>,
    pub signal_sources: Vec<Arc<dyn SignalSource>>,
    pub update_channel: Arc<dyn UpdateChannel>,
    /// Feeds a [`ConsoleSurface`], when that is the surface in use
    pub selection_tx: Option<AsyncSender<Option<CaptureRegion>>>,
}

/// A key in `GEMINI_API_KEY` wins over the stored one and is never written to disk
pub fn secret_store() -> anyhow::Result<Arc<dyn SecretStore>> {
    if let Ok(key) = std::env::var("GEMINI_API_KEY") {
        match validate_key(&key) {
            Ok(key) => {
                tracing::info!("Using API key from GEMINI_API_KEY");
                return Ok(Arc::new(MemorySecretStore::with_key(key)));
            }
            Err(e) => tracing::warn!("Ignoring GEMINI_API_KEY: {}", e),
        }
    }
    Ok(Arc::new(FileSecretStore::in_user_config()?))
}

impl Services {
    pub fn production(
        config: &Config,
        frontend: Frontend,
        app_to_ui_tx: &AsyncSender<AppEvent>,
    ) -> anyhow::Result<Self> {
        let mut selection_tx = None;
        let surface: Arc<dyn SelectionSurface> = match (config.capture.selector, frontend) {
            (SelectorKind::Slurp, _) => Arc::new(SlurpSurface),
            (SelectorKind::Prompt, Frontend::OneShot) => Arc::new(PromptSurface::new()),
            (SelectorKind::Prompt, Frontend::Interactive) => {
                let (surface, tx) = ConsoleSurface::new(app_to_ui_tx.clone());
                selection_tx = Some(tx);
                surface
            }
        };

        let grabber = FallbackGrabber::new(
            Box::new(CommandGrabber::new(config.capture.screenshot_command.clone())),
            Box::new(XcapGrabber),
        );

        let mut signal_sources: Vec<Arc<dyn SignalSource>> = Vec::new();
        if config.capture.cancel_hotkey {
            signal_sources.push(Arc::new(CancelKey));
        }

        Ok(Self {
            backend: Arc::new(GeminiClient::new(&config.remote)),
            secrets: secret_store()?,
            preferences: Arc::new(FilePreferences::in_user_config()?),
            surface,
            grabber: Arc::new(grabber),
            signal_sources,
            update_channel: Arc::new(GithubReleaseChannel::new(
                &config.update,
                env!("CARGO_PKG_VERSION"),
            )),
            selection_tx,
        })
    }
}

pub struct AppState {
    pub config: Arc<RwLock<Config>>,
    pub secrets: Arc<dyn SecretStore>,
    pub session: TranslationSession,
    pub ocr: OcrExtractor,
    pub capture: CaptureCoordinator,
    pub updates: Arc<UpdateController>,
    pub window: Arc<ConsoleWindow>,
    pub selection_tx: Option<AsyncSender<Option<CaptureRegion>>>,
}

impl AppState {
    pub fn new(config: Config, services: Services, app_to_ui_tx: AsyncSender<AppEvent>) -> Self {
        let retry = RetryPolicy::from_config(&config.retry);

        let translator = GeminiTranslator::new(
            Arc::clone(&services.backend),
            Arc::clone(&services.secrets),
            retry,
        );
        let orchestrator = TranslationOrchestrator::new(
            Arc::new(translator),
            config.translator.fallback_lang.clone(),
        );
        let session = TranslationSession::new(
            orchestrator,
            services.preferences,
            &config.translator.from_lang,
            &config.translator.to_lang,
        );

        let ocr = OcrExtractor::new(
            services.backend,
            Arc::clone(&services.secrets),
            retry,
            config.ocr.clone(),
        );

        let window = Arc::new(ConsoleWindow::new());
        let main_window: Arc<dyn MainWindow> = window.clone();
        let capture = services.signal_sources.into_iter().fold(
            CaptureCoordinator::new(
                main_window,
                services.surface,
                services.grabber,
                config.capture.clone(),
            ),
            |coordinator, source| coordinator.with_source(source),
        );

        let updates = Arc::new(UpdateController::new(services.update_channel, app_to_ui_tx));

        Self {
            config: Arc::new(RwLock::new(config)),
            secrets: services.secrets,
            session,
            ocr,
            capture,
            updates,
            window,
            selection_tx: services.selection_tx,
        }
    }
}
