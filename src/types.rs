//! Shared types used by both pipeline stages.
//!
//! The indexer serializes [`ContentEntry`] lists to JSON; the prerenderer (and
//! the client app) read them back. Field names are camelCase on the wire
//! because the client consumes the same files.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A string that is either language-neutral or keyed by language code.
///
/// ```json
/// "Hello"
/// {"en": "Hello", "tr": "Merhaba"}
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Localized {
    Text(String),
    ByLanguage(BTreeMap<String, String>),
}

impl Localized {
    /// Pick the best string for `language`.
    ///
    /// Falls back to `default_language`, then to the first non-empty
    /// translation, then to `""`.
    pub fn resolve(&self, language: &str, default_language: &str) -> &str {
        match self {
            Localized::Text(text) => text,
            Localized::ByLanguage(map) => map
                .get(language)
                .or_else(|| map.get(default_language))
                .or_else(|| map.values().find(|v| !v.is_empty()))
                .map(String::as_str)
                .unwrap_or(""),
        }
    }
}

impl From<&str> for Localized {
    fn from(text: &str) -> Self {
        Localized::Text(text.to_string())
    }
}

impl From<String> for Localized {
    fn from(text: String) -> Self {
        Localized::Text(text)
    }
}

/// One blog post or series episode as it appears in a JSON index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentEntry {
    /// Unique within its collection; also the last route segment.
    #[serde(alias = "id")]
    pub slug: String,
    pub title: Localized,
    /// ISO-8601, millisecond precision, UTC (`2024-01-01T00:00:00.000Z`).
    pub date: String,
    #[serde(default = "default_category")]
    pub category: String,
    #[serde(default = "default_author")]
    pub author: String,
    #[serde(default)]
    pub author_role: String,
    #[serde(default = "default_read_time")]
    pub read_time: String,
    pub excerpt: Localized,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<Localized>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cover_image: Option<String>,
    /// Episode number within a series.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub part: Option<u32>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub languages: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_language: Option<String>,
}

pub const DEFAULT_TITLE: &str = "Untitled Post";
pub const DEFAULT_CATEGORY: &str = "Uncategorized";
pub const DEFAULT_AUTHOR: &str = "Anonymous";
pub const DEFAULT_READ_TIME: &str = "N/A";

fn default_category() -> String {
    DEFAULT_CATEGORY.to_string()
}

fn default_author() -> String {
    DEFAULT_AUTHOR.to_string()
}

fn default_read_time() -> String {
    DEFAULT_READ_TIME.to_string()
}

impl ContentEntry {
    /// Title collapsed to a single language for meta tags.
    pub fn display_title<'a>(&'a self, default_language: &'a str) -> &'a str {
        let language = self.default_language.as_deref().unwrap_or(default_language);
        self.title.resolve(language, default_language)
    }

    /// Excerpt collapsed to a single language for meta tags.
    pub fn display_excerpt<'a>(&'a self, default_language: &'a str) -> &'a str {
        let language = self.default_language.as_deref().unwrap_or(default_language);
        self.excerpt.resolve(language, default_language)
    }
}
