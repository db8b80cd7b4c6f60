use std::path::PathBuf;

use dich_core::language::LanguageTable;
use dich_types::{AppEvent, CaptureRegion, OcrMode, TextSource, UpdateNotice};

use crate::console::{ConsoleCommand, parse_command, render};

fn event(line: &str) -> AppEvent {
    match parse_command(line, OcrMode::Text) {
        ConsoleCommand::Send(event) => event,
        other => panic!("{line:?} parsed as {other:?}"),
    }
}

#[test]
fn test_plain_text_is_translated() {
    match event("  Xin chào thế giới ") {
        AppEvent::Translate { text, source } => {
            assert_eq!(text, "Xin chào thế giới");
            assert_eq!(source, TextSource::Manual);
        }
        other => panic!("Wrong event type: {other:?}"),
    }
}

#[test]
fn test_language_commands() {
    assert!(matches!(event("to:vi"), AppEvent::SetTargetLanguage(code) if code == "vi"));
    assert!(matches!(event("from: auto"), AppEvent::SetSourceLanguage(code) if code == "auto"));
    assert!(matches!(event("swap"), AppEvent::SwapLanguages));
}

#[test]
fn test_region_commands() {
    assert!(matches!(
        event("region 10,20 300x40"),
        AppEvent::RegionSelected(Some(region)) if region == CaptureRegion::new(10, 20, 300, 40)
    ));
    assert!(matches!(event("cancel"), AppEvent::RegionSelected(None)));
    assert!(matches!(
        parse_command("region 10x20", OcrMode::Text),
        ConsoleCommand::Invalid(_)
    ));
}

#[test]
fn test_image_command_mode_is_optional() {
    match event("image /tmp/my shot.png regions") {
        AppEvent::OcrImage { path, mode } => {
            assert_eq!(path, PathBuf::from("/tmp/my shot.png"));
            assert_eq!(mode, OcrMode::Regions);
        }
        other => panic!("Wrong event type: {other:?}"),
    }

    match parse_command("image /tmp/my shot.png", OcrMode::Translate) {
        ConsoleCommand::Send(AppEvent::OcrImage { path, mode }) => {
            assert_eq!(path, PathBuf::from("/tmp/my shot.png"));
            assert_eq!(mode, OcrMode::Translate);
        }
        other => panic!("Wrong command: {other:?}"),
    }
}

#[test]
fn test_update_and_control_commands() {
    assert!(matches!(event("update pause"), AppEvent::TogglePauseDownload));
    assert!(matches!(event("update check"), AppEvent::CheckForUpdates));
    assert!(matches!(
        parse_command("update now", OcrMode::Text),
        ConsoleCommand::Invalid(_)
    ));
    assert!(matches!(parse_command("quit", OcrMode::Text), ConsoleCommand::Quit));
    assert!(matches!(parse_command("   ", OcrMode::Text), ConsoleCommand::Nothing));
}

#[test]
fn test_render_translation_uses_language_names() {
    let text = render(
        &AppEvent::ShowTranslation {
            original: "Xin chào".to_string(),
            translated: "Hello".to_string(),
            detected_lang: "vi".to_string(),
            target_lang: "en".to_string(),
        },
        &LanguageTable::builtin(),
    );
    assert_eq!(text.as_deref(), Some("Vietnamese -> English\nHello"));
}

#[test]
fn test_render_update_notices() {
    let languages = LanguageTable::builtin();
    let notice = |state: &str| UpdateNotice {
        state: state.to_string(),
        version: Some("1.2.0".to_string()),
        progress: Some(40),
        pause_label: Some("Pause"),
        error: None,
    };

    assert_eq!(
        render(&AppEvent::Update(notice("downloading")), &languages).as_deref(),
        Some("Downloading 1.2.0: 40% (`update pause`)")
    );
    assert!(render(&AppEvent::Update(notice("dismissed")), &languages).is_none());
    assert!(render(&AppEvent::StartCapture, &languages).is_none());
}
