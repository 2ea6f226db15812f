//! Locale handling. Only the language prefix of a locale string is consulted.

use serde::{Deserialize, Serialize};

/// Languages the assistant can reply in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Language {
    #[default]
    Spanish,
    English,
}

impl Language {
    /// Resolve a locale such as `es-AR`, `en_US` or `EN` to a language.
    ///
    /// Unknown prefixes fall back to Spanish, the assistant's home language.
    pub fn from_locale(locale: &str) -> Self {
        let prefix: String = locale
            .trim()
            .chars()
            .take_while(|c| c.is_ascii_alphabetic())
            .collect::<String>()
            .to_ascii_lowercase();
        match prefix.as_str() {
            "en" => Self::English,
            _ => Self::Spanish,
        }
    }

    /// Pick between a Spanish and an English string.
    pub fn pick<'a>(&self, es: &'a str, en: &'a str) -> &'a str {
        match self {
            Self::Spanish => es,
            Self::English => en,
        }
    }

    /// Language name used inside LLM prompts.
    pub fn prompt_name(&self) -> &'static str {
        match self {
            Self::Spanish => "Spanish (Rioplatense, informal 'vos')",
            Self::English => "English",
        }
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Spanish => write!(f, "es"),
            Self::English => write!(f, "en"),
        }
    }
}
