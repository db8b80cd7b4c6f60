use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use dich_types::OcrMode;

#[derive(Parser)]
#[command(
    name = "dich",
    version,
    about = "Translate text and screen captures with the Gemini API"
)]
pub struct Cli {
    /// Load settings from a saved profile instead of the environment
    #[arg(long, global = true)]
    pub profile: Option<String>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Translate text given on the command line
    Translate {
        #[arg(required = true)]
        text: Vec<String>,
        /// Target language for this call only
        #[arg(long)]
        to: Option<String>,
        /// Source language; detected when omitted
        #[arg(long)]
        from: Option<String>,
    },
    /// Interactive console session (the default)
    Interactive,
    /// List supported languages
    Languages,
    /// OCR an image file and translate it
    Image {
        path: PathBuf,
        #[arg(long, value_enum)]
        mode: Option<ModeArg>,
        /// Target language for this call only
        #[arg(long)]
        to: Option<String>,
    },
    /// Select a screen region and translate it
    Capture {
        #[arg(long, value_enum)]
        mode: Option<ModeArg>,
        /// Target language for this call only
        #[arg(long)]
        to: Option<String>,
    },
    /// Manage the stored API key
    Key {
        #[command(subcommand)]
        action: KeyAction,
    },
    /// Check for, download or install a new release
    Update {
        #[command(subcommand)]
        action: UpdateAction,
    },
    /// Manage saved settings profiles
    Profile {
        #[command(subcommand)]
        action: ProfileAction,
    },
}

#[derive(Subcommand)]
pub enum KeyAction {
    /// Validate and store a key
    Set { key: String },
    /// Remove the stored key
    Clear,
    /// Show the stored key, masked
    Show,
}

#[derive(Subcommand, Clone, Copy)]
pub enum UpdateAction {
    Check,
    Download,
    Install,
}

#[derive(Subcommand)]
pub enum ProfileAction {
    /// Create the main profile from the current environment
    Init,
    List,
    /// Save the effective settings under a name
    Save { name: String },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
pub enum ModeArg {
    Text,
    Translate,
    Regions,
}

impl From<ModeArg> for OcrMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Text => OcrMode::Text,
            ModeArg::Translate => OcrMode::Translate,
            ModeArg::Regions => OcrMode::Regions,
        }
    }
}
