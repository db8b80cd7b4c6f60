use std::sync::Arc;

use dich_core::language::is_auto;
use dich_types::AppEvent;
use kanal::{AsyncReceiver, AsyncSender};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use crate::state::AppState;

pub mod ocr_image;
pub mod text_input;
pub mod trigger_capture;
pub mod update;

use ocr_image::handle_image_file;
use text_input::handle_text_input;
use trigger_capture::handle_capture_trigger;

pub(crate) async fn send_status(app_to_ui_tx: &AsyncSender<AppEvent>, message: &str, busy: bool) {
    let _ = app_to_ui_tx
        .send(AppEvent::Status {
            message: message.to_string(),
            busy,
        })
        .await;
}

pub(crate) async fn send_error(
    app_to_ui_tx: &AsyncSender<AppEvent>,
    message: impl Into<String>,
) -> anyhow::Result<()> {
    app_to_ui_tx
        .send(AppEvent::Error {
            message: message.into(),
        })
        .await?;
    Ok(())
}

/// App's main loop. Captures, image OCR and update transfers run as
/// background tasks so the loop keeps answering while they wait on the user
/// or the network.
pub async fn event_loop(
    state: Arc<AppState>,
    ui_to_app_rx: AsyncReceiver<AppEvent>,
    app_to_ui_tx: AsyncSender<AppEvent>,
    cancel: CancellationToken,
) -> anyhow::Result<()> {
    let mut background: JoinSet<anyhow::Result<()>> = JoinSet::new();
    let _ = app_to_ui_tx.send(AppEvent::BackendReady).await;

    tracing::info!("[EVENT_LOOP] Starting main loop, waiting for events");
    loop {
        let event = tokio::select! {
            _ = cancel.cancelled() => break,
            event = ui_to_app_rx.recv() => event?,
        };

        while let Some(joined) = background.try_join_next() {
            match joined {
                Ok(Ok(())) => {}
                Ok(Err(e)) => tracing::error!("Background task failed: {:#}", e),
                Err(e) => tracing::error!("Background task panicked: {}", e),
            }
        }

        tracing::debug!(
            "[EVENT_LOOP] EVENT RECEIVED: {:?}",
            std::mem::discriminant(&event)
        );
        if let AppEvent::Shutdown = event {
            tracing::info!("[EVENT_LOOP] Shutdown requested");
            cancel.cancel();
            break;
        }

        handle_events(&state, &app_to_ui_tx, &mut background, event).await?;
    }

    background.shutdown().await;
    Ok(())
}

async fn handle_events(
    state: &Arc<AppState>,
    app_to_ui_tx: &AsyncSender<AppEvent>,
    background: &mut JoinSet<anyhow::Result<()>>,
    event: AppEvent,
) -> anyhow::Result<()> {
    let languages = state.session.orchestrator().languages();

    match event {
        AppEvent::Translate { text, source } => {
            handle_text_input(state, text, source, app_to_ui_tx).await?;
        }
        AppEvent::SetTargetLanguage(code) => {
            if !languages.contains(&code) {
                return send_error(app_to_ui_tx, format!("Unsupported language: {code}")).await;
            }
            state.session.set_target(&code).await;
            let message = format!("Translating to {}", languages.label(&code));
            send_status(app_to_ui_tx, &message, false).await;
        }
        AppEvent::SetSourceLanguage(code) => {
            if !is_auto(&code) && !languages.contains(&code) {
                return send_error(app_to_ui_tx, format!("Unsupported language: {code}")).await;
            }
            state.session.set_source(&code).await;
            let message = if is_auto(&code) {
                "Detecting the source language".to_string()
            } else {
                format!("Translating from {}", languages.label(&code))
            };
            send_status(app_to_ui_tx, &message, false).await;
        }
        AppEvent::SwapLanguages => {
            if state.session.swap().await {
                let session = state.session.snapshot().await;
                let message = format!(
                    "Translating from {} to {}",
                    languages.label(&session.source),
                    languages.label(&session.target)
                );
                send_status(app_to_ui_tx, &message, false).await;
            } else {
                send_status(app_to_ui_tx, "Nothing to swap until a language is detected", false)
                    .await;
            }
        }
        AppEvent::StartCapture => {
            let mode = state.config.read().await.ocr.default_mode;
            background.spawn(handle_capture_trigger(
                Arc::clone(state),
                mode,
                app_to_ui_tx.clone(),
            ));
        }
        AppEvent::RegionSelected(region) => match &state.selection_tx {
            Some(tx) => {
                if !tx.try_send(region)? {
                    tracing::warn!("Selection surface is not keeping up, dropping {:?}", region);
                }
            }
            None => tracing::debug!("No console selection surface, ignoring {:?}", region),
        },
        AppEvent::OcrImage { path, mode } => {
            background.spawn(handle_image_file(
                Arc::clone(state),
                path,
                mode,
                app_to_ui_tx.clone(),
            ));
        }
        AppEvent::CheckForUpdates => {
            background.spawn(update::check(Arc::clone(state)));
        }
        AppEvent::DownloadUpdate => {
            background.spawn(update::download(Arc::clone(state), app_to_ui_tx.clone()));
        }
        AppEvent::InstallUpdate => {
            background.spawn(update::install(Arc::clone(state), app_to_ui_tx.clone()));
        }
        AppEvent::TogglePauseDownload => {
            update::toggle_pause(state, app_to_ui_tx).await?;
        }
        AppEvent::DismissUpdate => {
            state.updates.dismiss().await;
        }
        AppEvent::Shutdown => {}
        AppEvent::BackendReady
        | AppEvent::RawTextInput { .. }
        | AppEvent::ShowTranslation { .. }
        | AppEvent::ShowRegions(_)
        | AppEvent::Status { .. }
        | AppEvent::Error { .. }
        | AppEvent::Update(_) => {
            // UI-only event, ignore in backend
        }
    }

    Ok(())
}
