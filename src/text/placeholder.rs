//! Classification of translation values into real copy and filler.
//!
//! Filler comes in a few recognisable shapes: auto-generated suffixes such as
//! `"Income - Item 3"` (and the Russian/Hebrew equivalents), bracketed or
//! templated text (`"[title]"`, `"Label for ..."`), bare generic words
//! (`"Title"`, `"Option 2"`), values that simply echo the content key and
//! values carrying the CMS's "Translation missing" marker.

use std::sync::OnceLock;

use regex::Regex;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TextQuality {
    /// NULL or whitespace only.
    Empty,
    /// Value equals the item's content_key.
    KeyEcho,
    /// Contains the "Translation missing" marker left by the CMS.
    MissingFlag,
    /// Auto-generated "- Item N" style filler.
    Generated,
    /// Bracketed or templated placeholder text.
    Placeholder,
    /// Contains domain vocabulary.
    Meaningful,
    /// A single generic UI word, optionally numbered.
    Generic,
    /// Anything else.
    Plain,
}

impl TextQuality {
    pub fn is_filler(self) -> bool {
        matches!(
            self,
            TextQuality::Empty
                | TextQuality::KeyEcho
                | TextQuality::MissingFlag
                | TextQuality::Generated
                | TextQuality::Placeholder
                | TextQuality::Generic
        )
    }

    pub fn label(self) -> &'static str {
        match self {
            TextQuality::Empty => "empty",
            TextQuality::KeyEcho => "key echo",
            TextQuality::MissingFlag => "translation missing",
            TextQuality::Generated => "generated",
            TextQuality::Placeholder => "placeholder",
            TextQuality::Meaningful => "meaningful",
            TextQuality::Generic => "generic",
            TextQuality::Plain => "plain",
        }
    }
}

/// Marker the CMS writes into values it could not translate.
pub const MISSING_FLAG: &str = "Translation missing";

/// Case-insensitive check for [`MISSING_FLAG`].
pub fn has_missing_flag(value: &str) -> bool {
    value.to_lowercase().contains(&MISSING_FLAG.to_lowercase())
}

/// Server-side ILIKE patterns matching generated filler suffixes.
pub const SQL_GENERATED_LIKE: [&str; 3] = ["%- Элемент %", "%- פריט %", "%- Item %"];

/// Server-side regex for bare numbered filler ("Item 3").
pub const SQL_GENERATED_BARE: &str = r"^(Item|Элемент|פריט)\s*\d+$";

fn generated_suffix_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)-\s(?:Item|Элемент|פריט)\s").expect("static regex"))
}

fn generated_bare_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)^(?:Item|Элемент|פריט)\s*\d+$").expect("static regex"))
}

fn placeholder_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)\[.*?\]|item_\d+|Field \d+|Text for|Label for").expect("static regex")
    })
}

fn meaningful_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?i)loan|credit|income|employment|mortgage|payment|interest|account|application|registration|refinance|monthly|salary|employer|property|asset|liability|document|verification",
        )
        .expect("static regex")
    })
}

fn generic_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)^(?:Item|Field|Text|Label|Value|Option|Button|Link|Title|Description)\s*\d*$")
            .expect("static regex")
    })
}

/// Classify a translation value. `content_key` enables key-echo detection.
pub fn classify(value: Option<&str>, content_key: Option<&str>) -> TextQuality {
    let Some(raw) = value else {
        return TextQuality::Empty;
    };
    let v = raw.trim();
    if v.is_empty() {
        return TextQuality::Empty;
    }
    if content_key.is_some_and(|k| k == v) {
        return TextQuality::KeyEcho;
    }
    if has_missing_flag(v) {
        return TextQuality::MissingFlag;
    }
    if generated_suffix_re().is_match(v) || generated_bare_re().is_match(v) {
        return TextQuality::Generated;
    }
    if placeholder_re().is_match(v) {
        return TextQuality::Placeholder;
    }
    if meaningful_re().is_match(v) {
        return TextQuality::Meaningful;
    }
    if generic_re().is_match(v) {
        return TextQuality::Generic;
    }
    TextQuality::Plain
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_and_key_echo_take_precedence() {
        assert_eq!(classify(None, Some("k")), TextQuality::Empty);
        assert_eq!(classify(Some("   "), None), TextQuality::Empty);
        assert_eq!(
            classify(Some("app.mortgage.title"), Some("app.mortgage.title")),
            TextQuality::KeyEcho
        );
    }

    #[test]
    fn numbered_item_is_generated_filler() {
        assert_eq!(classify(Some("Item 3"), None), TextQuality::Generated);
        assert_eq!(classify(Some("Monthly income - Item 2"), None), TextQuality::Generated);
        assert_eq!(classify(Some("Доход - Элемент 4"), None), TextQuality::Generated);
        assert_eq!(classify(Some("הכנסה - פריט 1"), None), TextQuality::Generated);
        assert!(classify(Some("Item 3"), None).is_filler());
    }

    #[test]
    fn templated_text_is_placeholder() {
        assert_eq!(classify(Some("[bank name]"), None), TextQuality::Placeholder);
        assert_eq!(classify(Some("Label for phone"), None), TextQuality::Placeholder);
        assert_eq!(classify(Some("item_12"), None), TextQuality::Placeholder);
        assert_eq!(classify(Some("Field 7"), None), TextQuality::Placeholder);
    }

    #[test]
    fn business_vocabulary_is_meaningful() {
        assert_eq!(classify(Some("Monthly payment"), None), TextQuality::Meaningful);
        assert_eq!(classify(Some("Credit history"), None), TextQuality::Meaningful);
        assert!(!classify(Some("Employer name"), None).is_filler());
    }

    #[test]
    fn lone_ui_words_are_generic() {
        assert_eq!(classify(Some("Title"), None), TextQuality::Generic);
        assert_eq!(classify(Some("option 2"), None), TextQuality::Generic);
        assert_eq!(classify(Some("Button"), None), TextQuality::Generic);
    }

    #[test]
    fn ordinary_copy_is_plain() {
        assert_eq!(classify(Some("Выберите город"), None), TextQuality::Plain);
        assert_eq!(classify(Some("Continue to next step"), None), TextQuality::Plain);
        assert!(!TextQuality::Plain.is_filler());
    }

    #[test]
    fn missing_marker_is_its_own_class() {
        assert_eq!(classify(Some("Translation missing"), None), TextQuality::MissingFlag);
        assert_eq!(
            classify(Some("[he] translation MISSING: loan amount"), Some("k")),
            TextQuality::MissingFlag
        );
        assert_eq!(classify(Some("k"), Some("k")), TextQuality::KeyEcho);
        assert!(TextQuality::MissingFlag.is_filler());
        assert!(!has_missing_flag("Monthly payment"));
    }

    /// Mirror of Postgres ILIKE for the `%literal %` shapes used server-side.
    fn ilike(value: &str, pattern: &str) -> bool {
        let needle = pattern.trim_matches('%').to_lowercase();
        value.to_lowercase().contains(&needle)
    }

    #[test]
    fn server_patterns_catch_what_classify_calls_generated() {
        let bare = Regex::new(&format!("(?i){SQL_GENERATED_BARE}")).unwrap();
        for v in ["Income - Item 3", "income - ITEM 3", "Доход - элемент 4", "הכנסה - פריט 1", "item 7"] {
            assert_eq!(classify(Some(v), None), TextQuality::Generated, "{v}");
            let server = SQL_GENERATED_LIKE.iter().any(|p| ilike(v, p)) || bare.is_match(v);
            assert!(server, "{v} not matched server-side");
        }
    }
}
