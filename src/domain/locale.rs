use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Languages the site publishes content in
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    En,
    Ar,
    Es,
    Pt,
}

impl Language {
    pub const ALL: [Language; 4] = [Language::En, Language::Ar, Language::Es, Language::Pt];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::En => "en",
            Self::Ar => "ar",
            Self::Es => "es",
            Self::Pt => "pt",
        }
    }

    /// Resolve a user supplied language code, falling back to English for anything
    /// outside of the allow-list (missing, malformed, or otherwise unexpected input)
    pub fn resolve(code: Option<&str>) -> Self {
        code.and_then(|code| code.parse().ok()).unwrap_or_default()
    }
}

impl FromStr for Language {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "en" => Ok(Self::En),
            "ar" => Ok(Self::Ar),
            "es" => Ok(Self::Es),
            "pt" => Ok(Self::Pt),
            _ => Err(format!("Unsupported language code \"{}\"", value)),
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Query string wrapper for public endpoints accepting `?lang=<code>`
#[derive(Debug, Default, Deserialize)]
pub struct LanguageQuery {
    lang: Option<String>,
}

impl LanguageQuery {
    pub fn language(&self) -> Language {
        Language::resolve(self.lang.as_deref())
    }
}

/// Per-language title and content columns shared by every translatable table
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct LocalizedFields {
    pub title_en: String,
    #[serde(default)]
    pub title_ar: Option<String>,
    #[serde(default)]
    pub title_es: Option<String>,
    #[serde(default)]
    pub title_pt: Option<String>,
    pub content_en: String,
    #[serde(default)]
    pub content_ar: Option<String>,
    #[serde(default)]
    pub content_es: Option<String>,
    #[serde(default)]
    pub content_pt: Option<String>,
}

impl LocalizedFields {
    /// Check that the English columns, which every other language falls back to, are present
    pub fn validate(&self) -> Result<(), String> {
        if self.title_en.trim().is_empty() {
            return Err("English title cannot be empty".into());
        }
        if self.content_en.trim().is_empty() {
            return Err("English content cannot be empty".into());
        }
        Ok(())
    }

    fn title(&self, lang: Language) -> Option<&str> {
        match lang {
            Language::En => Some(&self.title_en),
            Language::Ar => self.title_ar.as_deref(),
            Language::Es => self.title_es.as_deref(),
            Language::Pt => self.title_pt.as_deref(),
        }
    }

    fn content(&self, lang: Language) -> Option<&str> {
        match lang {
            Language::En => Some(&self.content_en),
            Language::Ar => self.content_ar.as_deref(),
            Language::Es => self.content_es.as_deref(),
            Language::Pt => self.content_pt.as_deref(),
        }
    }
}

/// Title and content resolved for a single language
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LocalizedText {
    pub title: String,
    pub content: String,
}

/// Pick the requested language's title and content, falling back to English
/// for each field that is missing or empty
pub fn localize(fields: &LocalizedFields, lang: Language) -> LocalizedText {
    let pick = |requested: Option<&str>, english: &str| match requested {
        Some(value) if !value.trim().is_empty() => value.to_string(),
        _ => english.to_string(),
    };

    LocalizedText {
        title: pick(fields.title(lang), &fields.title_en),
        content: pick(fields.content(lang), &fields.content_en),
    }
}
