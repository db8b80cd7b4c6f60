use dich_types::OcrMode;
use serde::{Deserialize, Serialize};

fn default_max_dimension() -> u32 {
    1024
}

fn default_jpeg_quality() -> u8 {
    80
}

fn default_mode() -> OcrMode {
    OcrMode::Text
}

#[derive(Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct OcrConfig {
    /// Longest side sent for region detection
    #[serde(default = "default_max_dimension")]
    pub max_dimension: u32,
    #[serde(default = "default_jpeg_quality")]
    pub jpeg_quality: u8,
    #[serde(default = "default_mode")]
    pub default_mode: OcrMode,
}

impl OcrConfig {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            max_dimension: default_max_dimension(),
            jpeg_quality: default_jpeg_quality(),
            default_mode: default_mode(),
        }
    }
}
