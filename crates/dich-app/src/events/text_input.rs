use dich_types::{AppEvent, TextSource};
use kanal::AsyncSender;

use crate::events::{send_error, send_status};
use crate::state::AppState;

/// Translates text through the session and shows the result
pub async fn handle_text_input(
    state: &AppState,
    text: String,
    source: TextSource,
    app_to_ui_tx: &AsyncSender<AppEvent>,
) -> anyhow::Result<()> {
    tracing::debug!("TextInput received: {} chars from {:?}", text.len(), source);
    send_status(app_to_ui_tx, "Translating...", true).await;

    let outcome = match state.session.handle_translate(&text, source).await {
        Ok(outcome) => outcome,
        Err(e) => {
            tracing::warn!("Translation failed: {}", e);
            return send_error(app_to_ui_tx, e.to_string()).await;
        }
    };

    let result = outcome.result;
    let languages = state.session.orchestrator().languages();
    let status = if outcome.fallback_applied {
        format!(
            "Text is already in {}, translated to {} instead",
            languages.label(&result.detected_lang),
            languages.label(&result.target_lang)
        )
    } else {
        "Done".to_string()
    };

    app_to_ui_tx
        .send(AppEvent::ShowTranslation {
            original: text.trim().to_string(),
            translated: result.translated_text,
            detected_lang: result.detected_lang,
            target_lang: result.target_lang,
        })
        .await?;
    send_status(app_to_ui_tx, &status, false).await;

    Ok(())
}
