use std::fmt;
use std::str::FromStr;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Language codes are ISO 639-1 strings ("en", "vi", "ja", ...).
pub type LanguageCode = String;

/// Source language marker meaning "let the model detect it".
pub const AUTO_LANGUAGE: &str = "auto";

#[derive(Debug, Clone)]
pub enum AppEvent {
    // UI -> app
    Translate {
        text: String,
        source: TextSource,
    },
    SetTargetLanguage(LanguageCode),
    SetSourceLanguage(LanguageCode),
    SwapLanguages,
    StartCapture,
    /// Region picked in the UI's selection overlay, `None` when dismissed
    RegionSelected(Option<CaptureRegion>),
    OcrImage {
        path: PathBuf,
        mode: OcrMode,
    },
    CheckForUpdates,
    DownloadUpdate,
    InstallUpdate,
    TogglePauseDownload,
    DismissUpdate,
    Shutdown,

    // app -> UI
    BackendReady,
    RawTextInput {
        text: String,
        source: TextSource,
    },
    ShowTranslation {
        original: String,
        translated: String,
        detected_lang: LanguageCode,
        target_lang: LanguageCode,
    },
    ShowRegions(Vec<TextRegion>),
    Status {
        message: String,
        busy: bool,
    },
    Error {
        message: String,
    },
    Update(UpdateNotice),
}

/// Where a piece of input text came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TextSource {
    Manual,
    Ocr,
    Clipboard,
    Image,
}

impl TextSource {
    /// Text that did not come from the keyboard invalidates a locked source language
    pub fn is_override(&self) -> bool {
        !matches!(self, TextSource::Manual)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OcrMode {
    /// Plain text extraction
    Text,
    /// Extract and translate in a single round trip
    Translate,
    /// Per-region boxes with translated text
    Regions,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptureRegion {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl CaptureRegion {
    pub fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Builds a region from two drag corners, in any order
    pub fn from_corners(a: (i32, i32), b: (i32, i32)) -> Self {
        let x = a.0.min(b.0);
        let y = a.1.min(b.1);
        Self {
            x,
            y,
            width: a.0.abs_diff(b.0),
            height: a.1.abs_diff(b.1),
        }
    }

    /// Smaller drags are accidental clicks
    pub fn is_selection(&self, min_side: u32) -> bool {
        self.x >= 0
            && self.y >= 0
            && self.width > 0
            && self.height > 0
            && self.width >= min_side
            && self.height >= min_side
    }

    fn right(&self) -> i64 {
        i64::from(self.x) + i64::from(self.width)
    }

    fn bottom(&self) -> i64 {
        i64::from(self.y) + i64::from(self.height)
    }

    /// Lies entirely inside `outer`
    pub fn is_within(&self, outer: &CaptureRegion) -> bool {
        self.x >= outer.x
            && self.y >= outer.y
            && self.right() <= outer.right()
            && self.bottom() <= outer.bottom()
    }

    /// Position of this region's origin relative to `(x, y)`, clamped to
    /// the positive quadrant
    pub fn offset_from(&self, x: i32, y: i32) -> (u32, u32) {
        let clamp = |d: i64| d.clamp(0, i64::from(u32::MAX)) as u32;
        (
            clamp(i64::from(self.x) - i64::from(x)),
            clamp(i64::from(self.y) - i64::from(y)),
        )
    }
}

impl fmt::Display for CaptureRegion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{} {}x{}", self.x, self.y, self.width, self.height)
    }
}

/// Parses the `x,y WxH` form region pickers print
impl FromStr for CaptureRegion {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || format!("expected `x,y WxH`, got `{}`", s.trim());

        let (origin, size) = s.trim().split_once(' ').ok_or_else(invalid)?;
        let (x, y) = origin.split_once(',').ok_or_else(invalid)?;
        let (w, h) = size.trim().split_once('x').ok_or_else(invalid)?;

        Ok(Self {
            x: x.trim().parse().map_err(|_| invalid())?,
            y: y.trim().parse().map_err(|_| invalid())?,
            width: w.trim().parse().map_err(|_| invalid())?,
            height: h.trim().parse().map_err(|_| invalid())?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranslationRequest {
    pub text: String,
    pub target_lang: LanguageCode,
    /// `None` or "auto" asks the model to detect the language
    pub source_lang: Option<LanguageCode>,
}

impl TranslationRequest {
    pub fn new(text: impl Into<String>, target_lang: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            target_lang: target_lang.into(),
            source_lang: None,
        }
    }

    pub fn with_source(mut self, source_lang: impl Into<String>) -> Self {
        self.source_lang = Some(source_lang.into());
        self
    }

    /// Explicit source language, treating "auto" as absent
    pub fn explicit_source(&self) -> Option<&str> {
        self.source_lang
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty() && !s.eq_ignore_ascii_case(AUTO_LANGUAGE))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranslationResult {
    pub translated_text: String,
    pub detected_lang: LanguageCode,
    /// May differ from the requested target after conflict resolution
    pub target_lang: LanguageCode,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextRegion {
    pub text: String,
    pub translated_text: String,
    pub bounds: BoundingBox,
    pub font_size: f32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OcrResult {
    pub extracted_text: String,
    /// Only filled when region detection was requested
    pub regions: Vec<TextRegion>,
}

impl OcrResult {
    pub fn has_text(&self) -> bool {
        !self.extracted_text.trim().is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateInfo {
    pub version: String,
    pub release_date: Option<String>,
    pub release_notes: Option<String>,
    pub download_url: String,
    pub size: Option<u64>,
}

/// Events emitted by an update channel
#[derive(Debug, Clone, PartialEq)]
pub enum UpdateEvent {
    Checking,
    Available(UpdateInfo),
    NotAvailable,
    Error(String),
    Progress(f64),
    Downloaded(UpdateInfo),
}

/// What the UI shows for the update panel
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateNotice {
    pub state: String,
    pub version: Option<String>,
    pub progress: Option<u8>,
    pub pause_label: Option<&'static str>,
    pub error: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn region_from_reversed_corners() {
        let region = CaptureRegion::from_corners((300, 200), (100, 50));
        assert_eq!(region, CaptureRegion::new(100, 50, 200, 150));
    }

    #[test]
    fn tiny_drag_is_not_a_selection() {
        assert!(!CaptureRegion::new(10, 10, 9, 40).is_selection(10));
        assert!(CaptureRegion::new(0, 0, 10, 10).is_selection(10));
        assert!(!CaptureRegion::new(-1, 0, 50, 50).is_selection(10));
    }

    #[test]
    fn far_out_region_does_not_overflow() {
        let monitor = CaptureRegion::new(0, 0, 1920, 1080);
        let region: CaptureRegion = "2147483600,0 100x100".parse().unwrap();
        assert!(region.is_selection(10));
        assert!(!region.is_within(&monitor));
        assert!(!CaptureRegion::new(0, 0, u32::MAX, 10).is_within(&monitor));
        assert!(CaptureRegion::new(1820, 980, 100, 100).is_within(&monitor));
    }

    #[test]
    fn offset_is_clamped() {
        let region = CaptureRegion::new(i32::MAX, -5, 10, 10);
        assert_eq!(region.offset_from(i32::MIN, 0), (u32::MAX, 0));
        assert_eq!(CaptureRegion::new(150, 40, 10, 10).offset_from(100, -20), (50, 60));
    }

    #[test]
    fn region_text_form_parses_back() {
        let region: CaptureRegion = "12,34 560x78\n".parse().unwrap();
        assert_eq!(region, CaptureRegion::new(12, 34, 560, 78));
        assert_eq!(region.to_string().parse::<CaptureRegion>().unwrap(), region);
        assert!("12 34 56 78".parse::<CaptureRegion>().is_err());
    }

    #[test]
    fn auto_source_is_not_explicit() {
        let request = TranslationRequest::new("hi", "vi").with_source("AUTO");
        assert_eq!(request.explicit_source(), None);
        let request = TranslationRequest::new("hi", "vi").with_source("en");
        assert_eq!(request.explicit_source(), Some("en"));
    }

    #[test]
    fn only_manual_text_keeps_source() {
        assert!(!TextSource::Manual.is_override());
        assert!(TextSource::Ocr.is_override());
        assert!(TextSource::Image.is_override());
    }
}
