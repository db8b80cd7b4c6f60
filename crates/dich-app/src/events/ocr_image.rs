use std::path::PathBuf;
use std::sync::Arc;

use dich_ocr::ImagePayload;
use dich_types::{AppEvent, OcrMode, TextSource};
use kanal::AsyncSender;

use crate::events::send_error;
use crate::pipeline::process_image;
use crate::state::AppState;

/// OCR on an image file, as if it had been pasted
pub async fn handle_image_file(
    state: Arc<AppState>,
    path: PathBuf,
    mode: OcrMode,
    app_to_ui_tx: AsyncSender<AppEvent>,
) -> anyhow::Result<()> {
    let image = match ImagePayload::from_path(&path).await {
        Ok(image) => image,
        Err(e) => {
            tracing::warn!("Cannot use {}: {}", path.display(), e);
            return send_error(&app_to_ui_tx, e.to_string()).await;
        }
    };

    process_image(&state, &image, mode, TextSource::Image, &app_to_ui_tx).await
}
