//! Stand-in copy for items that have no translation yet.
//!
//! The keyword table is checked in order against the content key and the
//! first hit wins, so `monthly_payment_title` becomes "Title" rather than
//! "Monthly Payment". Keys with no known keyword get a humanised form of
//! their last segment in every language.

use serde::Serialize;

use crate::model::Language;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Suggestion {
    pub ru: String,
    pub he: String,
    pub en: String,
}

impl Suggestion {
    pub fn get(&self, lang: Language) -> &str {
        match lang {
            Language::Ru => &self.ru,
            Language::He => &self.he,
            Language::En => &self.en,
        }
    }

    fn same(text: String) -> Self {
        Self {
            ru: text.clone(),
            he: text.clone(),
            en: text,
        }
    }
}

/// (keyword, ru, he, en)
const KEYWORDS: &[(&str, &str, &str, &str)] = &[
    ("filter", "Фильтр", "מסנן", "Filter"),
    ("title", "Заголовок", "כותרת", "Title"),
    ("description", "Описание", "תיאור", "Description"),
    ("button", "Кнопка", "כפתור", "Button"),
    ("label", "Метка", "תווית", "Label"),
    ("placeholder", "Подсказка", "רמז", "Placeholder"),
    ("monthly_payment", "Ежемесячный платеж", "תשלום חודשי", "Monthly Payment"),
    ("total", "Общая сумма", "סכום כולל", "Total Amount"),
    ("select_bank", "Выбрать банк", "בחר בנק", "Select Bank"),
    ("parameters", "Параметры", "פרמטרים", "Parameters"),
    ("profile", "Профиль", "פרופיל", "Profile"),
    ("warning", "Предупреждение", "אזהרה", "Warning"),
    ("prime", "Прайм-ставка", "ריבית פריים", "Prime Rate"),
    ("fixed_rate", "Фиксированная ставка", "ריבית קבועה", "Fixed Rate"),
    ("variable_rate", "Переменная ставка", "ריבית משתנה", "Variable Rate"),
];

pub fn suggest_translations(content_key: &str) -> Suggestion {
    if let Some((_, ru, he, en)) = KEYWORDS.iter().find(|(kw, ..)| content_key.contains(kw)) {
        return Suggestion {
            ru: (*ru).to_string(),
            he: (*he).to_string(),
            en: (*en).to_string(),
        };
    }
    Suggestion::same(humanize_last_segment(content_key))
}

/// `app.mortgage.step1.city_name` -> `City name`
pub fn humanize_last_segment(content_key: &str) -> String {
    let last = content_key.rsplit('.').next().unwrap_or(content_key);
    let mut chars = last.chars();
    match chars.next() {
        Some(first) => {
            let rest: String = chars.collect();
            format!("{}{}", first.to_uppercase(), rest.replace('_', " "))
        }
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_matching_keyword_wins() {
        let s = suggest_translations("app.credit.monthly_payment_title");
        assert_eq!(s.en, "Title");
        assert_eq!(s.get(Language::He), "כותרת");

        let s = suggest_translations("calc.monthly_payment");
        assert_eq!(s.ru, "Ежемесячный платеж");
    }

    #[test]
    fn rate_keywords() {
        assert_eq!(suggest_translations("refi.prime_share").en, "Prime Rate");
        assert_eq!(suggest_translations("refi.variable_rate_share").en, "Variable Rate");
    }

    #[test]
    fn unknown_keys_fall_back_to_last_segment() {
        let s = suggest_translations("app.mortgage.step1.city_name");
        assert_eq!(s.en, "City name");
        assert_eq!(s.ru, "City name");
        assert_eq!(s.he, "City name");
    }

    #[test]
    fn humanize_handles_edge_cases() {
        assert_eq!(humanize_last_segment("single"), "Single");
        assert_eq!(humanize_last_segment("trailing."), "");
        assert_eq!(humanize_last_segment("a.b_c_d"), "B c d");
    }
}
