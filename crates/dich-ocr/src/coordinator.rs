//! Screen-region capture: hide the main window, let the user pick a region,
//! grab it, and bring the window back no matter how the selection ended.

use std::io::BufRead;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use dich_config::capture::CaptureConfig;
use dich_types::CaptureRegion;
use tokio::io::AsyncWriteExt;
use tokio::sync::oneshot;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::{HotkeyManager, ImagePayload, ScreenGrabber};

/// The application window that must stay out of the screenshot
pub trait MainWindow: Send + Sync {
    fn hide(&self);
    fn show(&self);
    fn is_visible(&self) -> bool;
}

impl dyn MainWindow {
    /// Hides the window until the returned guard is dropped
    pub fn hide_scoped(self: &Arc<Self>) -> VisibilityGuard {
        self.hide();
        VisibilityGuard {
            window: Arc::clone(self),
        }
    }
}

pub struct VisibilityGuard {
    window: Arc<dyn MainWindow>,
}

impl Drop for VisibilityGuard {
    fn drop(&mut self) {
        self.window.show();
    }
}

/// How the selection phase ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectionSignal {
    Selected(CaptureRegion),
    Cancelled,
    Closed(String),
    TimedOut,
}

/// Shared single-shot completion; the first caller wins, later calls are no-ops
#[derive(Clone)]
pub struct Resolver {
    slot: Arc<Mutex<Option<oneshot::Sender<SelectionSignal>>>>,
}

impl Resolver {
    pub fn new() -> (Self, oneshot::Receiver<SelectionSignal>) {
        let (tx, rx) = oneshot::channel();
        (
            Self {
                slot: Arc::new(Mutex::new(Some(tx))),
            },
            rx,
        )
    }

    fn slot(&self) -> MutexGuard<'_, Option<oneshot::Sender<SelectionSignal>>> {
        self.slot.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Returns whether this call was the one that resolved
    pub fn resolve(&self, signal: SelectionSignal) -> bool {
        match self.slot().take() {
            Some(tx) => {
                tracing::debug!("Selection resolved: {:?}", signal);
                tx.send(signal).is_ok()
            }
            None => false,
        }
    }

    pub fn is_resolved(&self) -> bool {
        self.slot().is_none()
    }
}

/// Lets the user pick a screen region
#[async_trait]
pub trait SelectionSurface: Send + Sync {
    /// `Ok(None)` when the user dismissed the picker
    async fn select_region(&self, cancel: CancellationToken)
    -> anyhow::Result<Option<CaptureRegion>>;
}

/// Anything besides the surface that can end a selection (cancel key, window close)
#[async_trait]
pub trait SignalSource: Send + Sync {
    /// Runs until it resolves or `cancel` fires
    async fn watch(&self, resolver: Resolver, cancel: CancellationToken);
}

/// Global Escape hotkey
pub struct CancelKey;

#[async_trait]
impl SignalSource for CancelKey {
    async fn watch(&self, resolver: Resolver, cancel: CancellationToken) {
        let result = tokio::task::spawn_blocking(move || {
            let hotkey = HotkeyManager::cancel_key()?;
            while !cancel.is_cancelled() {
                if hotkey.poll() {
                    resolver.resolve(SelectionSignal::Cancelled);
                    break;
                }
                std::thread::sleep(Duration::from_millis(30));
            }
            anyhow::Ok(())
        })
        .await;

        match result {
            Ok(Ok(())) => {}
            Ok(Err(e)) => tracing::warn!("Cancel key unavailable: {:#}", e),
            Err(e) => tracing::error!("Cancel key task failed: {}", e),
        }
    }
}

/// The `slurp` region picker; it exits non-zero when the user presses Escape
pub struct SlurpSurface;

#[async_trait]
impl SelectionSurface for SlurpSurface {
    async fn select_region(
        &self,
        _cancel: CancellationToken,
    ) -> anyhow::Result<Option<CaptureRegion>> {
        let output = tokio::process::Command::new("slurp")
            .kill_on_drop(true)
            .output()
            .await
            .context("Failed to run slurp")?;

        if !output.status.success() {
            return Ok(None);
        }

        let text = String::from_utf8_lossy(&output.stdout);
        let region = text.parse::<CaptureRegion>().map_err(anyhow::Error::msg)?;
        Ok(Some(region))
    }
}

/// Reads `x,y WxH` from the console; an empty line cancels
pub struct PromptSurface {
    open_input: fn() -> Box<dyn BufRead + Send>,
}

impl PromptSurface {
    pub fn new() -> Self {
        Self::with_input(|| Box::new(std::io::BufReader::new(std::io::stdin())))
    }

    pub fn with_input(open_input: fn() -> Box<dyn BufRead + Send>) -> Self {
        Self { open_input }
    }
}

impl Default for PromptSurface {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SelectionSurface for PromptSurface {
    async fn select_region(
        &self,
        cancel: CancellationToken,
    ) -> anyhow::Result<Option<CaptureRegion>> {
        let mut stdout = tokio::io::stdout();
        stdout
            .write_all(b"Region (x,y WxH, empty to cancel): ")
            .await?;
        stdout.flush().await?;

        // Plain thread: runtime shutdown must not wait on a pending read
        let mut input = (self.open_input)();
        let (tx, rx) = oneshot::channel();
        std::thread::spawn(move || {
            let mut line = String::new();
            let _ = tx.send(input.read_line(&mut line).map(|_| line));
        });

        let line = tokio::select! {
            _ = cancel.cancelled() => return Ok(None),
            line = rx => line
                .context("Region reader stopped")?
                .context("Failed to read region")?,
        };

        let line = line.trim();
        if line.is_empty() {
            return Ok(None);
        }
        Ok(Some(line.parse().map_err(anyhow::Error::msg)?))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CapturePhase {
    Idle,
    HidingMainWindow,
    AwaitingSelection,
    Capturing,
    RestoringMainWindow,
}

#[derive(Debug)]
pub enum CaptureOutcome {
    Captured {
        image: ImagePayload,
        region: CaptureRegion,
    },
    Cancelled,
    TimedOut,
    /// Closed picker, too-small selection or a selector failure
    Dismissed(String),
}

#[derive(Debug, thiserror::Error)]
pub enum CaptureError {
    #[error("A capture is already in progress")]
    Busy,

    #[error("Screen capture failed: {0:#}")]
    Grab(anyhow::Error),
}

/// Resets the phase to `Idle` when the capture ends
struct ActiveCapture<'a> {
    phase: &'a Mutex<CapturePhase>,
}

impl Drop for ActiveCapture<'_> {
    fn drop(&mut self) {
        *self.phase.lock().unwrap_or_else(|p| p.into_inner()) = CapturePhase::Idle;
    }
}

pub struct CaptureCoordinator {
    window: Arc<dyn MainWindow>,
    surface: Arc<dyn SelectionSurface>,
    grabber: Arc<dyn ScreenGrabber>,
    sources: Vec<Arc<dyn SignalSource>>,
    config: CaptureConfig,
    phase: Mutex<CapturePhase>,
}

impl CaptureCoordinator {
    pub fn new(
        window: Arc<dyn MainWindow>,
        surface: Arc<dyn SelectionSurface>,
        grabber: Arc<dyn ScreenGrabber>,
        config: CaptureConfig,
    ) -> Self {
        Self {
            window,
            surface,
            grabber,
            sources: Vec::new(),
            config,
            phase: Mutex::new(CapturePhase::Idle),
        }
    }

    pub fn with_source(mut self, source: Arc<dyn SignalSource>) -> Self {
        self.sources.push(source);
        self
    }

    pub fn phase(&self) -> CapturePhase {
        *self.lock_phase()
    }

    fn lock_phase(&self) -> MutexGuard<'_, CapturePhase> {
        self.phase.lock().unwrap_or_else(|p| p.into_inner())
    }

    fn set_phase(&self, session: Uuid, phase: CapturePhase) {
        tracing::debug!("[{}] {:?}", session, phase);
        *self.lock_phase() = phase;
    }

    fn begin(&self) -> Result<ActiveCapture<'_>, CaptureError> {
        let mut phase = self.lock_phase();
        if *phase != CapturePhase::Idle {
            return Err(CaptureError::Busy);
        }
        *phase = CapturePhase::HidingMainWindow;
        Ok(ActiveCapture { phase: &self.phase })
    }

    /// Runs one capture session. The main window is shown again on every
    /// path out of here, including errors and a dropped future.
    pub async fn capture(&self) -> Result<CaptureOutcome, CaptureError> {
        let _active = self.begin()?;
        let session = Uuid::new_v4();
        tracing::info!("[{}] Starting capture", session);

        let visibility = self.window.hide_scoped();
        tokio::time::sleep(Duration::from_millis(self.config.settle_delay_ms)).await;

        self.set_phase(session, CapturePhase::AwaitingSelection);
        let signal = self.await_selection().await;

        let min = self.config.min_selection;
        let outcome = match signal {
            SelectionSignal::Selected(region) if region.is_selection(min) => {
                self.set_phase(session, CapturePhase::Capturing);
                match self.grabber.grab(region).await {
                    Ok(image) => {
                        tracing::info!(
                            "[{}] Captured {} via {} ({} bytes)",
                            session,
                            region,
                            self.grabber.name(),
                            image.bytes.len()
                        );
                        Ok(CaptureOutcome::Captured { image, region })
                    }
                    Err(e) => {
                        tracing::error!("[{}] Capture of {} failed: {:#}", session, region, e);
                        Err(CaptureError::Grab(e))
                    }
                }
            }
            SelectionSignal::Selected(region) => Ok(CaptureOutcome::Dismissed(format!(
                "Selection {region} is smaller than {min}x{min}"
            ))),
            SelectionSignal::Cancelled => Ok(CaptureOutcome::Cancelled),
            SelectionSignal::TimedOut => Ok(CaptureOutcome::TimedOut),
            SelectionSignal::Closed(reason) => Ok(CaptureOutcome::Dismissed(reason)),
        };

        self.set_phase(session, CapturePhase::RestoringMainWindow);
        drop(visibility);
        tracing::info!("[{}] Capture finished", session);

        outcome
    }

    /// Races the surface, the extra sources and the timeout; tears all of them
    /// down once one resolves
    async fn await_selection(&self) -> SelectionSignal {
        let (resolver, rx) = Resolver::new();
        let token = CancellationToken::new();
        let _teardown = token.clone().drop_guard();
        let mut tasks = JoinSet::new();

        {
            let surface = Arc::clone(&self.surface);
            let resolver = resolver.clone();
            let token = token.clone();
            tasks.spawn(async move {
                tokio::select! {
                    _ = token.cancelled() => {}
                    result = surface.select_region(token.clone()) => {
                        let signal = match result {
                            Ok(Some(region)) => SelectionSignal::Selected(region),
                            Ok(None) => SelectionSignal::Cancelled,
                            Err(e) => {
                                tracing::error!("Region selection failed: {:#}", e);
                                SelectionSignal::Closed(format!("Region selection failed: {e:#}"))
                            }
                        };
                        resolver.resolve(signal);
                    }
                }
            });
        }

        for source in &self.sources {
            let source = Arc::clone(source);
            let resolver = resolver.clone();
            let token = token.clone();
            tasks.spawn(async move { source.watch(resolver, token).await });
        }

        {
            let timeout = Duration::from_secs(self.config.timeout_seconds);
            let resolver = resolver.clone();
            let token = token.clone();
            tasks.spawn(async move {
                tokio::select! {
                    _ = token.cancelled() => {}
                    _ = tokio::time::sleep(timeout) => {
                        tracing::warn!("Selection timed out after {}s", timeout.as_secs());
                        resolver.resolve(SelectionSignal::TimedOut);
                    }
                }
            });
        }

        drop(resolver);
        let signal = rx
            .await
            .unwrap_or_else(|_| SelectionSignal::Closed("Selection sources ended".to_string()));

        token.cancel();
        tasks.shutdown().await;
        signal
    }
}
