use std::sync::Arc;

use dich_ocr::{CaptureError, CaptureOutcome};
use dich_types::{AppEvent, OcrMode, TextSource};
use kanal::AsyncSender;

use crate::events::{send_error, send_status};
use crate::pipeline::process_image;
use crate::state::AppState;

pub async fn handle_capture_trigger(
    state: Arc<AppState>,
    mode: OcrMode,
    app_to_ui_tx: AsyncSender<AppEvent>,
) -> anyhow::Result<()> {
    tracing::debug!(">>> [OCR] Capture triggered");

    match state.capture.capture().await {
        Ok(CaptureOutcome::Captured { image, region }) => {
            tracing::debug!(">>> [OCR] Captured {}", region);
            process_image(&state, &image, mode, TextSource::Ocr, &app_to_ui_tx).await
        }
        Ok(CaptureOutcome::Cancelled) => {
            send_status(&app_to_ui_tx, "Capture cancelled", false).await;
            Ok(())
        }
        Ok(CaptureOutcome::TimedOut) => {
            send_status(&app_to_ui_tx, "Selection timed out", false).await;
            Ok(())
        }
        Ok(CaptureOutcome::Dismissed(reason)) => {
            send_status(&app_to_ui_tx, &reason, false).await;
            Ok(())
        }
        Err(CaptureError::Busy) => {
            tracing::debug!("Capture requested while one is running");
            send_status(&app_to_ui_tx, "A capture is already in progress", true).await;
            Ok(())
        }
        Err(e) => send_error(&app_to_ui_tx, e.to_string()).await,
    }
}
