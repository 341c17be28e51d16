//! Languages for hyphenation and document metadata

use crate::error::{EngineError, Result};

/// A known language
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lang {
    /// Name the language was requested with
    pub name: String,
    /// BCP 47 code written to the PDF catalog
    pub code: &'static str,
}

const LANGUAGES: &[(&str, &str)] = &[
    ("en", "en"),
    ("english", "en"),
    ("en-us", "en-US"),
    ("en-gb", "en-GB"),
    ("de", "de"),
    ("german", "de"),
    ("fr", "fr"),
    ("french", "fr"),
    ("es", "es"),
    ("it", "it"),
    ("nl", "nl"),
    ("sv", "sv"),
    ("da", "da"),
    ("nb", "nb"),
    ("fi", "fi"),
    ("pl", "pl"),
    ("pt", "pt"),
    ("cs", "cs"),
];

/// Look up a language by name or code, case-insensitive
pub fn get_language(name: &str) -> Result<Lang> {
    let lower = name.trim().to_ascii_lowercase().replace('_', "-");
    LANGUAGES
        .iter()
        .find(|(key, _)| *key == lower)
        .map(|(_, code)| Lang {
            name: name.to_string(),
            code,
        })
        .ok_or_else(|| EngineError::Language(name.to_string()))
}
