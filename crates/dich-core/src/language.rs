use dich_types::{AUTO_LANGUAGE, LanguageCode};

/// One entry of the supported language table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Language {
    /// ISO 639-1 code
    pub code: &'static str,
    pub name: &'static str,
    pub native_name: &'static str,
}

const BUILTIN: &[Language] = &[
    Language {
        code: "en",
        name: "English",
        native_name: "English",
    },
    Language {
        code: "vi",
        name: "Vietnamese",
        native_name: "Tiếng Việt",
    },
    Language {
        code: "zh",
        name: "Chinese",
        native_name: "中文",
    },
    Language {
        code: "ja",
        name: "Japanese",
        native_name: "日本語",
    },
    Language {
        code: "ko",
        name: "Korean",
        native_name: "한국어",
    },
    Language {
        code: "fr",
        name: "French",
        native_name: "Français",
    },
    Language {
        code: "de",
        name: "German",
        native_name: "Deutsch",
    },
    Language {
        code: "es",
        name: "Spanish",
        native_name: "Español",
    },
    Language {
        code: "pt",
        name: "Portuguese",
        native_name: "Português",
    },
    Language {
        code: "ru",
        name: "Russian",
        native_name: "Русский",
    },
    Language {
        code: "ar",
        name: "Arabic",
        native_name: "العربية",
    },
    Language {
        code: "th",
        name: "Thai",
        native_name: "ไทย",
    },
    Language {
        code: "id",
        name: "Indonesian",
        native_name: "Bahasa Indonesia",
    },
    Language {
        code: "ms",
        name: "Malay",
        native_name: "Bahasa Melayu",
    },
];

/// Ordered code -> display name table
#[derive(Debug, Clone)]
pub struct LanguageTable {
    languages: Vec<Language>,
}

impl LanguageTable {
    pub fn builtin() -> Self {
        Self {
            languages: BUILTIN.to_vec(),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Language> {
        self.languages.iter()
    }

    pub fn get(&self, code: &str) -> Option<&Language> {
        self.languages
            .iter()
            .find(|lang| same_language(lang.code, code))
    }

    /// Display label for prompts and UI, falling back to the code itself
    pub fn label(&self, code: &str) -> String {
        self.get(code)
            .map(|lang| lang.name.to_string())
            .unwrap_or_else(|| code.trim().to_string())
    }

    pub fn contains(&self, code: &str) -> bool {
        self.get(code).is_some()
    }

    /// First language in table order that differs from `code`
    pub fn first_other_than(&self, code: &str) -> Option<&Language> {
        self.languages
            .iter()
            .find(|lang| !same_language(lang.code, code))
    }
}

impl Default for LanguageTable {
    fn default() -> Self {
        Self::builtin()
    }
}

/// Lowercase, trimmed, with `_` separators turned into `-`
pub fn normalize_code(code: &str) -> LanguageCode {
    code.trim().to_ascii_lowercase().replace('_', "-")
}

pub fn primary_subtag(code: &str) -> &str {
    let code = code.trim();
    code.split(['-', '_']).next().unwrap_or(code)
}

pub fn is_auto(code: &str) -> bool {
    let code = code.trim();
    code.is_empty() || code.eq_ignore_ascii_case(AUTO_LANGUAGE)
}

/// `en-US` and `EN` name the same language; "auto" never matches anything
pub fn same_language(a: &str, b: &str) -> bool {
    if is_auto(a) || is_auto(b) {
        return false;
    }
    primary_subtag(a).eq_ignore_ascii_case(primary_subtag(b))
}
