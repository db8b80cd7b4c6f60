mod capture;
mod coordinator;
mod extract;
mod hotkey;
mod payload;

use dich_remote::RemoteError;

pub use capture::{
    CommandGrabber, FallbackGrabber, ScreenGrabber, XcapGrabber, capture_screen_region,
    command_line,
};
pub use coordinator::{
    CancelKey, CaptureCoordinator, CaptureError, CaptureOutcome, CapturePhase, MainWindow,
    PromptSurface, Resolver, SelectionSignal, SelectionSurface, SignalSource, SlurpSurface,
    VisibilityGuard,
};
pub use extract::{CombinedOcr, OcrExtractor, RegionDetection, TextExtraction};
pub use hotkey::HotkeyManager;
pub use payload::{ImagePayload, PreparedImage};

#[derive(Debug, thiserror::Error)]
pub enum OcrError {
    #[error("Please configure your API key in Settings")]
    MissingCredential,

    #[error("Invalid image file: {0}")]
    UnsupportedImage(String),

    #[error("Failed to read image: {0}")]
    Io(#[from] std::io::Error),

    #[error("OCR request failed: {0}")]
    Remote(#[from] RemoteError),
}
