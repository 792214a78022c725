use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::TranslateError;

/// Languages offered in the language selector.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Language {
    /// Let the service detect the source language
    #[default]
    Auto,
    /// English
    En,
    /// Spanish
    Es,
    /// French
    Fr,
    /// German
    De,
    /// Simplified Chinese
    ZhCn,
    /// Japanese
    Ja,
}

impl Language {
    /// Every selectable language, `Auto` first.
    pub const ALL: [Language; 7] = [
        Language::Auto,
        Language::En,
        Language::Es,
        Language::Fr,
        Language::De,
        Language::ZhCn,
        Language::Ja,
    ];

    /// Code understood by the translation service.
    pub fn code(self) -> &'static str {
        match self {
            Language::Auto => "auto",
            Language::En => "en",
            Language::Es => "es",
            Language::Fr => "fr",
            Language::De => "de",
            Language::ZhCn => "zh-cn",
            Language::Ja => "ja",
        }
    }

    /// Human-readable name for selectors.
    pub fn name(self) -> &'static str {
        match self {
            Language::Auto => "Auto-detect",
            Language::En => "English",
            Language::Es => "Spanish",
            Language::Fr => "French",
            Language::De => "German",
            Language::ZhCn => "Chinese (Simplified)",
            Language::Ja => "Japanese",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Language {
    type Err = TranslateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase().replace('_', "-");
        Language::ALL
            .into_iter()
            .find(|lang| lang.code() == wanted)
            .ok_or_else(|| TranslateError::UnknownLanguage(s.to_string()))
    }
}

impl TryFrom<String> for Language {
    type Error = TranslateError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Language> for String {
    fn from(lang: Language) -> Self {
        lang.code().to_string()
    }
}
