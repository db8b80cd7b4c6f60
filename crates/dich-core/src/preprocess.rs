use unicode_normalization::UnicodeNormalization;

pub trait Preprocessor {
    /// Default cleanup for text coming back from OCR
    fn process(&self, text: &str) -> String {
        let text = text.trim();

        if text.is_empty() {
            return String::new();
        }

        // Canonical composition keeps Vietnamese diacritics in one code point
        let text: String = text.nfc().collect();

        text.replace("\r\n", "\n")
            .replace('\r', "\n")
            .lines()
            .map(str::trim_end)
            .collect::<Vec<_>>()
            .join("\n")
            .trim()
            .to_string()
    }
}

pub struct DefaultPreprocessor;
impl Preprocessor for DefaultPreprocessor {}
