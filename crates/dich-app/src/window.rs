use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use dich_ocr::{MainWindow, SelectionSurface};
use dich_types::{AppEvent, CaptureRegion};
use kanal::{AsyncReceiver, AsyncSender};
use tokio_util::sync::CancellationToken;

/// The terminal standing in for the main window. A terminal cannot be moved
/// off-screen, so only the visibility flag changes.
pub struct ConsoleWindow {
    visible: AtomicBool,
}

impl ConsoleWindow {
    pub fn new() -> Self {
        Self {
            visible: AtomicBool::new(true),
        }
    }
}

impl Default for ConsoleWindow {
    fn default() -> Self {
        Self::new()
    }
}

impl MainWindow for ConsoleWindow {
    fn hide(&self) {
        self.visible.store(false, Ordering::SeqCst);
        tracing::debug!("Main window hidden");
    }

    fn show(&self) {
        self.visible.store(true, Ordering::SeqCst);
        tracing::debug!("Main window shown");
    }

    fn is_visible(&self) -> bool {
        self.visible.load(Ordering::SeqCst)
    }
}

/// Selection overlay driven by the interactive console: the region arrives
/// as [`AppEvent::RegionSelected`] and is forwarded here by the event loop.
pub struct ConsoleSurface {
    regions: AsyncReceiver<Option<CaptureRegion>>,
    ui_tx: AsyncSender<AppEvent>,
}

impl ConsoleSurface {
    /// Returns the surface and the sender the event loop feeds it through
    pub fn new(ui_tx: AsyncSender<AppEvent>) -> (Arc<Self>, AsyncSender<Option<CaptureRegion>>) {
        let (tx, rx) = kanal::bounded_async(4);
        (Arc::new(Self { regions: rx, ui_tx }), tx)
    }
}

#[async_trait]
impl SelectionSurface for ConsoleSurface {
    async fn select_region(
        &self,
        cancel: CancellationToken,
    ) -> anyhow::Result<Option<CaptureRegion>> {
        // Answers typed while no capture was running
        while let Ok(Some(stale)) = self.regions.try_recv() {
            tracing::debug!("Dropping stale selection {:?}", stale);
        }

        let _ = self
            .ui_tx
            .send(AppEvent::Status {
                message: "Select a region: `region x,y WxH`, or `cancel`".to_string(),
                busy: true,
            })
            .await;

        tokio::select! {
            _ = cancel.cancelled() => Ok(None),
            region = self.regions.recv() => Ok(region?),
        }
    }
}
