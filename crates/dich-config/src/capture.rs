use std::env;

use serde::{Deserialize, Serialize};

fn default_settle_delay_ms() -> u64 {
    150
}

fn default_timeout_seconds() -> u64 {
    60
}

fn default_min_selection() -> u32 {
    10
}

fn default_selector() -> SelectorKind {
    SelectorKind::Slurp
}

fn default_cancel_hotkey() -> bool {
    true
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SelectorKind {
    /// External `slurp` region picker
    Slurp,
    /// Type the region into the console
    Prompt,
}

#[derive(Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct CaptureConfig {
    /// Wait after hiding the main window before the overlay appears
    #[serde(default = "default_settle_delay_ms")]
    pub settle_delay_ms: u64,
    /// Safety net for a selection nobody finishes
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
    #[serde(default = "default_min_selection")]
    pub min_selection: u32,
    #[serde(default = "default_selector")]
    pub selector: SelectorKind,
    /// Overrides the OS screenshot command; `{x} {y} {w} {h} {out}` are substituted
    #[serde(default)]
    pub screenshot_command: Option<String>,
    #[serde(default = "default_cancel_hotkey")]
    pub cancel_hotkey: bool,
}

impl CaptureConfig {
    pub fn new() -> Self {
        let selector = match env::var("CAPTURE_SELECTOR").ok().as_deref() {
            Some("prompt") => SelectorKind::Prompt,
            Some("slurp") => SelectorKind::Slurp,
            _ => default_selector(),
        };

        let timeout_seconds = env::var("CAPTURE_TIMEOUT_SECONDS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or_else(default_timeout_seconds);

        Self {
            selector,
            timeout_seconds,
            screenshot_command: env::var("SCREENSHOT_COMMAND").ok(),
            ..Self::default()
        }
    }
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            settle_delay_ms: default_settle_delay_ms(),
            timeout_seconds: default_timeout_seconds(),
            min_selection: default_min_selection(),
            selector: default_selector(),
            screenshot_command: None,
            cancel_hotkey: default_cancel_hotkey(),
        }
    }
}
