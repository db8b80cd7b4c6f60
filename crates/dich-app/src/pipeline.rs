//! Image to translation: OCR the image, then show text, a translation or
//! per-region overlays depending on the mode.

use dich_config::PipelineMode;
use dich_core::language::same_language;
use dich_ocr::{ImagePayload, TextExtraction};
use dich_types::{AppEvent, OcrMode, TextSource};
use kanal::AsyncSender;

use crate::events::text_input::handle_text_input;
use crate::state::AppState;

pub async fn process_image(
    state: &AppState,
    image: &ImagePayload,
    mode: OcrMode,
    source: TextSource,
    app_to_ui_tx: &AsyncSender<AppEvent>,
) -> anyhow::Result<()> {
    tracing::debug!(
        ">>> [OCR] {:?} on {}x{} {}",
        mode,
        image.width,
        image.height,
        image.mime_type
    );

    match mode {
        OcrMode::Regions => detect_regions(state, image, app_to_ui_tx).await,
        OcrMode::Translate => combined(state, image, source, app_to_ui_tx).await,
        OcrMode::Text => {
            let pipeline = state.config.read().await.translator.pipeline;
            match pipeline {
                PipelineMode::Sequential => sequential(state, image, source, app_to_ui_tx).await,
                PipelineMode::Combined => combined(state, image, source, app_to_ui_tx).await,
            }
        }
    }
}

async fn status(app_to_ui_tx: &AsyncSender<AppEvent>, message: &str, busy: bool) {
    let _ = app_to_ui_tx
        .send(AppEvent::Status {
            message: message.to_string(),
            busy,
        })
        .await;
}

async fn no_text(app_to_ui_tx: &AsyncSender<AppEvent>) {
    status(app_to_ui_tx, "No text found in image", false).await;
}

/// Extraction first, then a separate translation through the session
async fn sequential(
    state: &AppState,
    image: &ImagePayload,
    source: TextSource,
    app_to_ui_tx: &AsyncSender<AppEvent>,
) -> anyhow::Result<()> {
    status(app_to_ui_tx, "Recognizing text...", true).await;

    match state.ocr.extract_text(image).await {
        Ok(TextExtraction::Found(result)) => {
            tracing::debug!(">>> [OCR] Got text: {} chars", result.extracted_text.len());
            app_to_ui_tx
                .send(AppEvent::RawTextInput {
                    text: result.extracted_text.clone(),
                    source,
                })
                .await?;
            handle_text_input(state, result.extracted_text, source, app_to_ui_tx).await
        }
        Ok(TextExtraction::NoTextFound) => {
            no_text(app_to_ui_tx).await;
            Ok(())
        }
        Err(e) => {
            tracing::error!("Text extraction failed: {}", e);
            app_to_ui_tx
                .send(AppEvent::Error {
                    message: e.to_string(),
                })
                .await?;
            Ok(())
        }
    }
}

/// One round trip for extraction and translation. A reply without a usable
/// translation, or one already in the target language, goes back through the
/// session so the conflict policy applies.
async fn combined(
    state: &AppState,
    image: &ImagePayload,
    source: TextSource,
    app_to_ui_tx: &AsyncSender<AppEvent>,
) -> anyhow::Result<()> {
    status(app_to_ui_tx, "Recognizing and translating...", true).await;
    let target = state.session.snapshot().await.target;

    let combined = match state.ocr.extract_and_translate(image, &target).await {
        Ok(combined) => combined,
        Err(e) => {
            tracing::error!("Combined OCR failed: {}", e);
            app_to_ui_tx
                .send(AppEvent::Error {
                    message: e.to_string(),
                })
                .await?;
            return Ok(());
        }
    };

    if !combined.has_text() {
        no_text(app_to_ui_tx).await;
        return Ok(());
    }

    app_to_ui_tx
        .send(AppEvent::RawTextInput {
            text: combined.original_text.clone(),
            source,
        })
        .await?;

    if combined.translated_text.is_empty() || same_language(&combined.detected_lang, &target) {
        tracing::debug!(
            "Combined reply unusable (detected {}), translating separately",
            combined.detected_lang
        );
        return handle_text_input(state, combined.original_text, source, app_to_ui_tx).await;
    }

    state
        .session
        .record_detection(&combined.detected_lang, source)
        .await;
    app_to_ui_tx
        .send(AppEvent::ShowTranslation {
            original: combined.original_text,
            translated: combined.translated_text,
            detected_lang: combined.detected_lang,
            target_lang: target,
        })
        .await?;
    status(app_to_ui_tx, "Done", false).await;
    Ok(())
}

async fn detect_regions(
    state: &AppState,
    image: &ImagePayload,
    app_to_ui_tx: &AsyncSender<AppEvent>,
) -> anyhow::Result<()> {
    status(app_to_ui_tx, "Detecting text regions...", true).await;
    let session = state.session.snapshot().await;

    let detection = state
        .ocr
        .detect_regions(image, &session.source, &session.target)
        .await;

    if !detection.success {
        let message = detection
            .error
            .unwrap_or_else(|| "Region detection failed".to_string());
        tracing::error!("Region detection failed: {}", message);
        app_to_ui_tx.send(AppEvent::Error { message }).await?;
        return Ok(());
    }

    if detection.regions.is_empty() {
        no_text(app_to_ui_tx).await;
        return Ok(());
    }

    tracing::info!("Detected {} text regions", detection.regions.len());
    app_to_ui_tx
        .send(AppEvent::ShowRegions(detection.regions))
        .await?;
    status(app_to_ui_tx, "Done", false).await;
    Ok(())
}
