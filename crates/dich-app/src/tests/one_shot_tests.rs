use dich_types::AppEvent;

use super::{HarnessBuilder, TRANSLATED_VI};
use crate::translate_once;

/// Test 1: `--to` and `--from` reach the request without touching the session
#[tokio::test]
async fn test_translate_once_uses_flags() {
    let h = HarnessBuilder::new(&[TRANSLATED_VI]).build();

    translate_once(
        h.state.clone(),
        h.ui_tx.clone(),
        "Xin chào".to_string(),
        Some("ja".to_string()),
        Some("auto".to_string()),
    )
    .await
    .unwrap();

    let target = h.drain().into_iter().find_map(|event| match event {
        AppEvent::ShowTranslation { target_lang, .. } => Some(target_lang),
        _ => None,
    });
    assert_eq!(target.as_deref(), Some("ja"));
    assert_eq!(h.state.session.snapshot().await.target, "en");
    assert_eq!(h.backend.calls(), 1);
}

/// Test 2: targets that are not concrete languages never reach the model
#[tokio::test]
async fn test_translate_once_rejects_unusable_target() {
    let h = HarnessBuilder::new(&[TRANSLATED_VI]).build();

    for to in ["auto", "", "xx"] {
        let err = translate_once(
            h.state.clone(),
            h.ui_tx.clone(),
            "Hello".to_string(),
            Some(to.to_string()),
            None,
        )
        .await
        .unwrap_err();
        assert_eq!(err.to_string(), format!("Unsupported language: {to}"));
    }

    let err = translate_once(
        h.state.clone(),
        h.ui_tx.clone(),
        "Hello".to_string(),
        None,
        Some("klingon".to_string()),
    )
    .await
    .unwrap_err();
    assert_eq!(err.to_string(), "Unsupported language: klingon");
    assert_eq!(h.backend.calls(), 0);
}

/// Test 3: a one-shot target override is checked and not remembered
#[tokio::test]
async fn test_one_shot_target_is_not_persisted() {
    use dich_translator::PreferenceStore;

    let h = HarnessBuilder::new(&[]).build();

    assert!(h.state.session.use_target("auto").await.is_err());
    h.state.session.use_target("ko").await.unwrap();
    assert_eq!(h.state.session.snapshot().await.target, "ko");
    assert_eq!(h.preferences.load_target(), None);
}
