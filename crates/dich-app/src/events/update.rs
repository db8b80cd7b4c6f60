//! Update actions. The controller publishes its own notices; these only
//! report actions that made no sense in the current state.

use std::sync::Arc;

use dich_types::AppEvent;
use dich_update::{UpdateError, UpdateState};
use kanal::AsyncSender;

use crate::events::send_error;
use crate::state::AppState;

/// Returns whether the action went through
async fn report(
    app_to_ui_tx: &AsyncSender<AppEvent>,
    result: Result<(), UpdateError>,
) -> anyhow::Result<bool> {
    match result {
        Ok(()) => Ok(true),
        Err(e @ UpdateError::InvalidState { .. }) => {
            send_error(app_to_ui_tx, e.to_string()).await?;
            Ok(false)
        }
        // Channel failures already reached the UI as an error notice
        Err(_) => Ok(false),
    }
}

pub async fn check(state: Arc<AppState>) -> anyhow::Result<()> {
    state.updates.check_for_updates().await;
    Ok(())
}

pub async fn download(
    state: Arc<AppState>,
    app_to_ui_tx: AsyncSender<AppEvent>,
) -> anyhow::Result<()> {
    let result = state.updates.download_update().await;
    report(&app_to_ui_tx, result).await?;
    Ok(())
}

pub async fn install(
    state: Arc<AppState>,
    app_to_ui_tx: AsyncSender<AppEvent>,
) -> anyhow::Result<()> {
    let result = state.updates.install_update().await;
    report(&app_to_ui_tx, result).await?;
    Ok(())
}

pub async fn toggle_pause(
    state: &AppState,
    app_to_ui_tx: &AsyncSender<AppEvent>,
) -> anyhow::Result<()> {
    let result = state.updates.toggle_pause().await.map(|_| ());
    report(app_to_ui_tx, result).await?;
    Ok(())
}

/// Checks, then downloads and optionally installs, stopping at the first
/// step that leaves nothing to do
pub async fn check_and_fetch(
    state: &AppState,
    app_to_ui_tx: &AsyncSender<AppEvent>,
    install: bool,
) -> anyhow::Result<()> {
    if !matches!(
        state.updates.check_for_updates().await,
        UpdateState::Available(_)
    ) {
        return Ok(());
    }

    let downloaded = state.updates.download_update().await;
    if !report(app_to_ui_tx, downloaded).await? || !install {
        return Ok(());
    }

    let installed = state.updates.install_update().await;
    report(app_to_ui_tx, installed).await?;
    Ok(())
}
