//! Line-based console front end: typed lines become app events, app events
//! are printed as they arrive.

use std::path::PathBuf;

use dich_core::language::LanguageTable;
use dich_types::{AppEvent, CaptureRegion, OcrMode, TextSource, UpdateNotice};
use kanal::{AsyncReceiver, AsyncSender};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_util::sync::CancellationToken;

const HELP: &str = "\
Type any text to translate it. Commands:
  to:<lang>            set the target language
  from:<lang>          set the source language (from:auto to detect)
  swap                 swap source and target
  capture              select a screen region and translate it
  region x,y WxH       answer a running selection, `cancel` aborts it
  image <path> [mode]  OCR an image file (text, translate, regions)
  update <action>      check, download, pause, install, dismiss
  languages            list supported languages
  help                 show this help
  quit                 exit";

#[derive(Debug, Clone)]
pub enum ConsoleCommand {
    Send(AppEvent),
    Help,
    Languages,
    Quit,
    Invalid(String),
    Nothing,
}

fn parse_mode(mode: &str) -> Option<OcrMode> {
    match mode.to_ascii_lowercase().as_str() {
        "text" => Some(OcrMode::Text),
        "translate" => Some(OcrMode::Translate),
        "regions" => Some(OcrMode::Regions),
        _ => None,
    }
}

pub fn parse_command(line: &str, default_mode: OcrMode) -> ConsoleCommand {
    let line = line.trim();
    let (word, rest) = line
        .split_once(char::is_whitespace)
        .map(|(w, r)| (w, r.trim()))
        .unwrap_or((line, ""));

    if let Some(code) = line.strip_prefix("to:") {
        return ConsoleCommand::Send(AppEvent::SetTargetLanguage(code.trim().to_string()));
    }
    if let Some(code) = line.strip_prefix("from:") {
        return ConsoleCommand::Send(AppEvent::SetSourceLanguage(code.trim().to_string()));
    }

    let event = match (word.to_ascii_lowercase().as_str(), rest) {
        ("", _) => return ConsoleCommand::Nothing,
        ("quit" | "exit", "") => return ConsoleCommand::Quit,
        ("help" | "?", "") => return ConsoleCommand::Help,
        ("languages", "") => return ConsoleCommand::Languages,
        ("swap", "") => AppEvent::SwapLanguages,
        ("capture", "") => AppEvent::StartCapture,
        ("cancel", "") => AppEvent::RegionSelected(None),
        ("region", region) => match region.parse::<CaptureRegion>() {
            Ok(region) => AppEvent::RegionSelected(Some(region)),
            Err(e) => return ConsoleCommand::Invalid(e),
        },
        ("image", args) if !args.is_empty() => {
            // A trailing mode word is optional; paths may contain spaces
            let (path, mode) = args
                .rsplit_once(char::is_whitespace)
                .and_then(|(path, mode)| Some((path.trim(), parse_mode(mode)?)))
                .unwrap_or((args, default_mode));
            AppEvent::OcrImage {
                path: PathBuf::from(path),
                mode,
            }
        }
        ("update", action) if !action.is_empty() => match action {
            "check" => AppEvent::CheckForUpdates,
            "download" => AppEvent::DownloadUpdate,
            "pause" | "resume" => AppEvent::TogglePauseDownload,
            "install" => AppEvent::InstallUpdate,
            "dismiss" => AppEvent::DismissUpdate,
            other => return ConsoleCommand::Invalid(format!("Unknown update action: {other}")),
        },
        _ => AppEvent::Translate {
            text: line.to_string(),
            source: TextSource::Manual,
        },
    };

    ConsoleCommand::Send(event)
}

fn render_notice(notice: &UpdateNotice) -> Option<String> {
    let version = notice.version.as_deref().unwrap_or("?");
    let line = match notice.state.as_str() {
        "checking" => "Checking for updates...".to_string(),
        "not-available" => "You are on the latest version".to_string(),
        "available" => format!("Update {version} is available (`update download`)"),
        "downloading" => format!(
            "Downloading {version}: {}% (`update {}`)",
            notice.progress.unwrap_or(0),
            notice.pause_label.unwrap_or("Pause").to_ascii_lowercase()
        ),
        "paused" => format!("Download of {version} continues in the background (`update resume`)"),
        "downloaded" => format!("Update {version} is ready (`update install`)"),
        "installing" => format!("Installing {version}..."),
        "error" => format!(
            "Update failed: {}",
            notice.error.as_deref().unwrap_or("unknown error")
        ),
        _ => return None,
    };
    Some(line)
}

/// Text shown for an app event, `None` for events the console does not display
pub fn render(event: &AppEvent, languages: &LanguageTable) -> Option<String> {
    match event {
        AppEvent::BackendReady => {
            Some("Ready. Type text to translate, `help` for commands.".to_string())
        }
        AppEvent::RawTextInput { text, source } => Some(format!("[{source:?}] {text}")),
        AppEvent::ShowTranslation {
            translated,
            detected_lang,
            target_lang,
            ..
        } => Some(format!(
            "{} -> {}\n{}",
            languages.label(detected_lang),
            languages.label(target_lang),
            translated
        )),
        AppEvent::ShowRegions(regions) => Some(
            regions
                .iter()
                .map(|region| {
                    let b = &region.bounds;
                    format!(
                        "({},{} {}x{}) {} => {}",
                        b.x, b.y, b.width, b.height, region.text, region.translated_text
                    )
                })
                .collect::<Vec<_>>()
                .join("\n"),
        ),
        AppEvent::Status { message, busy } => Some(if *busy {
            format!("... {message}")
        } else {
            message.clone()
        }),
        AppEvent::Error { message } => Some(format!("Error: {message}")),
        AppEvent::Update(notice) => render_notice(notice),
        _ => None,
    }
}

fn list_languages(languages: &LanguageTable) -> String {
    languages
        .iter()
        .map(|lang| format!("  {:<4} {} ({})", lang.code, lang.name, lang.native_name))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Prints app events until `done` fires, then drains what is left
pub async fn print_events(
    app_to_ui_rx: AsyncReceiver<AppEvent>,
    languages: LanguageTable,
    done: CancellationToken,
) {
    loop {
        tokio::select! {
            biased;
            event = app_to_ui_rx.recv() => match event {
                Ok(event) => {
                    if let Some(text) = render(&event, &languages) {
                        println!("{text}");
                    }
                }
                Err(_) => break,
            },
            _ = done.cancelled() => {
                while let Ok(Some(event)) = app_to_ui_rx.try_recv() {
                    if let Some(text) = render(&event, &languages) {
                        println!("{text}");
                    }
                }
                break;
            }
        }
    }
}

pub async fn ui_loop(
    app_to_ui_rx: AsyncReceiver<AppEvent>,
    ui_to_app_tx: AsyncSender<AppEvent>,
    languages: LanguageTable,
    default_mode: OcrMode,
    cancel: CancellationToken,
) -> anyhow::Result<()> {
    let printer = print_events(app_to_ui_rx, languages.clone(), cancel.clone());
    let reader = async {
        let result = read_commands(&ui_to_app_tx, &languages, default_mode, &cancel).await;
        // Quitting from the keyboard also stops the printer
        cancel.cancel();
        result
    };

    let ((), result) = tokio::join!(printer, reader);
    result
}

async fn read_commands(
    ui_to_app_tx: &AsyncSender<AppEvent>,
    languages: &LanguageTable,
    default_mode: OcrMode,
    cancel: &CancellationToken,
) -> anyhow::Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        let line = tokio::select! {
            _ = cancel.cancelled() => return Ok(()),
            line = lines.next_line() => line?,
        };
        let Some(line) = line else {
            tracing::info!("Console input closed");
            ui_to_app_tx.send(AppEvent::Shutdown).await?;
            return Ok(());
        };

        match parse_command(&line, default_mode) {
            ConsoleCommand::Send(event) => ui_to_app_tx.send(event).await?,
            ConsoleCommand::Help => println!("{HELP}"),
            ConsoleCommand::Languages => print_languages(languages),
            ConsoleCommand::Invalid(message) => println!("Error: {message}"),
            ConsoleCommand::Nothing => {}
            ConsoleCommand::Quit => {
                ui_to_app_tx.send(AppEvent::Shutdown).await?;
                return Ok(());
            }
        }
    }
}

pub fn print_languages(languages: &LanguageTable) {
    println!("{}", list_languages(languages));
}
