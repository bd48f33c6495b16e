//! Typed view of the content schema.
//!
//! The tables are owned by the content API; this crate only reads and patches
//! rows, so every struct mirrors the columns the maintenance queries select.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Supported UI languages. Order matters: reports list ru, he, en.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Ru,
    He,
    En,
}

impl Language {
    pub const ALL: [Language; 3] = [Language::Ru, Language::He, Language::En];

    /// Language used when the requested one has no row.
    pub const FALLBACK: Language = Language::En;

    pub fn as_code(self) -> &'static str {
        match self {
            Language::Ru => "ru",
            Language::He => "he",
            Language::En => "en",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Language::Ru => "Russian",
            Language::He => "Hebrew",
            Language::En => "English",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_code())
    }
}

impl FromStr for Language {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ru" => Ok(Language::Ru),
            "he" => Ok(Language::He),
            "en" => Ok(Language::En),
            other => Err(anyhow::anyhow!("unsupported language code '{other}' (expected ru, he or en)")),
        }
    }
}

/// `content_translations.status`. Unknown values are kept verbatim so reports
/// can show them instead of failing the decode.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(into = "String")]
pub enum TranslationStatus {
    Draft,
    Approved,
    Other(String),
}

impl TranslationStatus {
    pub fn as_str(&self) -> &str {
        match self {
            TranslationStatus::Draft => "draft",
            TranslationStatus::Approved => "approved",
            TranslationStatus::Other(s) => s.as_str(),
        }
    }

    pub fn is_approved(&self) -> bool {
        matches!(self, TranslationStatus::Approved)
    }
}

impl From<&str> for TranslationStatus {
    fn from(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "draft" => TranslationStatus::Draft,
            "approved" => TranslationStatus::Approved,
            _ => TranslationStatus::Other(raw.to_string()),
        }
    }
}

impl From<TranslationStatus> for String {
    fn from(s: TranslationStatus) -> Self {
        s.as_str().to_string()
    }
}

impl fmt::Display for TranslationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Component types that make up a dropdown field on a screen.
pub const DROPDOWN_FAMILY: [&str; 5] = ["dropdown", "option", "dropdown_option", "placeholder", "label"];

/// Component types hidden from the drill UI (rendered inside their dropdown).
pub fn is_option_component(component_type: Option<&str>) -> bool {
    component_type
        .map(|t| t.eq_ignore_ascii_case("option") || t.eq_ignore_ascii_case("dropdown_option"))
        .unwrap_or(false)
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct ContentItem {
    pub id: i64,
    pub content_key: String,
    pub screen_location: Option<String>,
    pub component_type: Option<String>,
    pub category: Option<String>,
    pub page_number: Option<i32>,
    pub is_active: Option<bool>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct NavigationMapping {
    pub confluence_num: String,
    pub confluence_title_ru: Option<String>,
    pub confluence_title_he: Option<String>,
    pub confluence_title_en: Option<String>,
    pub screen_location: Option<String>,
    pub parent_section: Option<String>,
    pub sort_order: Option<i32>,
    pub is_active: Option<bool>,
    /// Active content items currently living on `screen_location`.
    pub content_count: i64,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct ApplicationContext {
    pub id: i64,
    pub context_code: String,
    pub context_name_ru: Option<String>,
    pub context_name_he: Option<String>,
    pub context_name_en: Option<String>,
    /// Active content items assigned to the context.
    pub item_count: Option<i64>,
}

impl ApplicationContext {
    pub fn name(&self, lang: Language) -> Option<&str> {
        match lang {
            Language::Ru => self.context_name_ru.as_deref(),
            Language::He => self.context_name_he.as_deref(),
            Language::En => self.context_name_en.as_deref(),
        }
    }
}

/// Per-language slot used by pivoted queries (one column per language).
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PerLanguage<T> {
    pub ru: T,
    pub he: T,
    pub en: T,
}

impl<T> PerLanguage<T> {
    pub fn get(&self, lang: Language) -> &T {
        match lang {
            Language::Ru => &self.ru,
            Language::He => &self.he,
            Language::En => &self.en,
        }
    }

    pub fn get_mut(&mut self, lang: Language) -> &mut T {
        match lang {
            Language::Ru => &mut self.ru,
            Language::He => &mut self.he,
            Language::En => &mut self.en,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (Language, &T)> {
        Language::ALL.into_iter().map(move |l| (l, self.get(l)))
    }
}

/// Timestamp helper for report/export headers.
pub fn today_stamp(now: DateTime<Utc>) -> String {
    now.format("%Y-%m-%d").to_string()
}
