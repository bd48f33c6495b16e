use anyhow::Result;
use indexmap::IndexMap;
use serde::Serialize;
use sqlx::Row;

use super::{percent, ScreenFilter, SCREEN_PREDICATE};
use crate::model::{Language, PerLanguage, TranslationStatus};
use crate::text::placeholder::has_missing_flag;
use crate::util::db::Db;

/// One active item with its ru/he/en rows pivoted into columns.
#[derive(Debug, Clone, Serialize)]
pub struct ItemCoverage {
    pub id: i64,
    pub content_key: String,
    pub screen_location: Option<String>,
    pub component_type: Option<String>,
    pub values: PerLanguage<Option<String>>,
    pub statuses: PerLanguage<Option<TranslationStatus>>,
}

impl ItemCoverage {
    /// Languages with no row at all.
    pub fn missing_languages(&self) -> Vec<Language> {
        Language::ALL
            .into_iter()
            .filter(|l| self.values.get(*l).is_none())
            .collect()
    }

    /// Languages whose value is just the content key.
    pub fn key_echo_languages(&self) -> Vec<Language> {
        Language::ALL
            .into_iter()
            .filter(|l| self.values.get(*l).as_deref() == Some(self.content_key.as_str()))
            .collect()
    }

    /// Languages whose value carries the "Translation missing" marker.
    pub fn missing_flag_languages(&self) -> Vec<Language> {
        Language::ALL
            .into_iter()
            .filter(|l| self.values.get(*l).as_deref().is_some_and(has_missing_flag))
            .collect()
    }

    /// Languages that a repair pass should (re)write.
    pub fn languages_needing_repair(&self) -> Vec<Language> {
        Language::ALL
            .into_iter()
            .filter(|l| match self.values.get(*l) {
                None => true,
                Some(v) => v == &self.content_key || has_missing_flag(v),
            })
            .collect()
    }

    /// First sibling value (ru, en, he order) usable as a stand-in for `lang`:
    /// present, non-blank, not the key and not flagged as missing.
    pub fn clean_source(&self, lang: Language) -> Option<(Language, &str)> {
        [Language::Ru, Language::En, Language::He]
            .into_iter()
            .filter(|l| *l != lang)
            .find_map(|l| {
                let v = self.values.get(l).as_deref()?;
                let usable = !v.trim().is_empty() && v != self.content_key && !has_missing_flag(v);
                usable.then_some((l, v))
            })
    }

    pub fn needs_repair(&self) -> bool {
        !self.languages_needing_repair().is_empty()
    }

    pub fn screen(&self) -> &str {
        self.screen_location.as_deref().unwrap_or("(none)")
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ScreenSummary {
    pub screen_location: String,
    pub total_items: i64,
    pub items_with_translations: i64,
    pub translation_rows: i64,
    pub missing: PerLanguage<i64>,
    pub key_echo: PerLanguage<i64>,
    pub missing_flag: PerLanguage<i64>,
}

impl ScreenSummary {
    pub fn coverage_percent(&self) -> i64 {
        percent(self.items_with_translations, self.total_items)
    }

    pub fn badge(&self) -> &'static str {
        coverage_badge(self.coverage_percent())
    }
}

/// Red at 0 %, yellow under 50 %, green otherwise.
pub fn coverage_badge(coverage: i64) -> &'static str {
    if coverage == 0 {
        "🔴"
    } else if coverage < 50 {
        "🟡"
    } else {
        "🟢"
    }
}

/// Items breaking the "exactly one approved row per language" rule.
#[derive(Debug, Clone, Serialize)]
pub struct InvariantViolation {
    pub id: i64,
    pub content_key: String,
    pub screen_location: Option<String>,
    pub translation_rows: i64,
    pub approved_rows: i64,
    pub languages: String,
}

pub async fn fetch_item_translations(db: &Db, filter: &ScreenFilter) -> Result<Vec<ItemCoverage>> {
    let (screen, prefix) = filter.binds();
    let sql = format!(
        r#"
        SELECT
            ci.id::BIGINT AS id,
            ci.content_key,
            ci.screen_location,
            ci.component_type,
            ct_ru.content_value AS ru_value, ct_ru.status::TEXT AS ru_status,
            ct_he.content_value AS he_value, ct_he.status::TEXT AS he_status,
            ct_en.content_value AS en_value, ct_en.status::TEXT AS en_status
        FROM content_items ci
        LEFT JOIN content_translations ct_ru ON ci.id = ct_ru.content_item_id AND ct_ru.language_code = 'ru'
        LEFT JOIN content_translations ct_he ON ci.id = ct_he.content_item_id AND ct_he.language_code = 'he'
        LEFT JOIN content_translations ct_en ON ci.id = ct_en.content_item_id AND ct_en.language_code = 'en'
        WHERE ci.is_active = TRUE
          AND {SCREEN_PREDICATE}
        ORDER BY ci.screen_location, ci.content_key
        "#
    );
    let rows = sqlx::query(&sql)
        .persistent(false)
        .bind(screen)
        .bind(prefix)
        .fetch_all(&db.pool)
        .await?;

    let mut out = Vec::with_capacity(rows.len());
    for row in rows {
        let status = |col: &str| -> Result<Option<TranslationStatus>> {
            Ok(row
                .try_get::<Option<String>, _>(col)?
                .map(|s| TranslationStatus::from(s.as_str())))
        };
        out.push(ItemCoverage {
            id: row.try_get("id")?,
            content_key: row.try_get("content_key")?,
            screen_location: row.try_get("screen_location")?,
            component_type: row.try_get("component_type")?,
            values: PerLanguage {
                ru: row.try_get("ru_value")?,
                he: row.try_get("he_value")?,
                en: row.try_get("en_value")?,
            },
            statuses: PerLanguage {
                ru: status("ru_status")?,
                he: status("he_status")?,
                en: status("en_status")?,
            },
        });
    }
    Ok(out)
}

/// Group items per screen, keeping the query's screen order.
pub fn summarize(items: &[ItemCoverage]) -> Vec<ScreenSummary> {
    let mut by_screen: IndexMap<String, ScreenSummary> = IndexMap::new();
    for item in items {
        let entry = by_screen
            .entry(item.screen().to_string())
            .or_insert_with(|| ScreenSummary {
                screen_location: item.screen().to_string(),
                ..Default::default()
            });
        entry.total_items += 1;
        let rows = item.values.iter().filter(|(_, v)| v.is_some()).count() as i64;
        entry.translation_rows += rows;
        if rows > 0 {
            entry.items_with_translations += 1;
        }
        for lang in item.missing_languages() {
            *entry.missing.get_mut(lang) += 1;
        }
        for lang in item.key_echo_languages() {
            *entry.key_echo.get_mut(lang) += 1;
        }
        for lang in item.missing_flag_languages() {
            *entry.missing_flag.get_mut(lang) += 1;
        }
    }
    by_screen.into_values().collect()
}

pub async fn screen_summary(db: &Db, filter: &ScreenFilter) -> Result<Vec<ScreenSummary>> {
    let items = fetch_item_translations(db, filter).await?;
    Ok(summarize(&items))
}

pub async fn invariant_violations(db: &Db, filter: &ScreenFilter) -> Result<Vec<InvariantViolation>> {
    let (screen, prefix) = filter.binds();
    let sql = format!(
        r#"
        SELECT
            ci.id::BIGINT AS id,
            ci.content_key,
            ci.screen_location,
            COUNT(ct.id)::BIGINT AS translation_rows,
            (COUNT(ct.id) FILTER (WHERE ct.status::TEXT = 'approved'))::BIGINT AS approved_rows,
            COALESCE(STRING_AGG(DISTINCT ct.language_code, ',' ORDER BY ct.language_code), '') AS languages
        FROM content_items ci
        LEFT JOIN content_translations ct ON ct.content_item_id = ci.id
        WHERE ci.is_active = TRUE
          AND {SCREEN_PREDICATE}
        GROUP BY ci.id, ci.content_key, ci.screen_location
        HAVING COUNT(ct.id) <> 3
            OR COUNT(ct.id) FILTER (WHERE ct.status::TEXT = 'approved') <> 3
        ORDER BY ci.screen_location, ci.content_key
        "#
    );
    let rows = sqlx::query(&sql)
        .persistent(false)
        .bind(screen)
        .bind(prefix)
        .fetch_all(&db.pool)
        .await?;
    rows.into_iter()
        .map(|row| {
            Ok(InvariantViolation {
                id: row.try_get("id")?,
                content_key: row.try_get("content_key")?,
                screen_location: row.try_get("screen_location")?,
                translation_rows: row.try_get("translation_rows")?,
                approved_rows: row.try_get("approved_rows")?,
                languages: row.try_get("languages")?,
            })
        })
        .collect()
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn item(key: &str, screen: &str, ru: Option<&str>, he: Option<&str>, en: Option<&str>) -> ItemCoverage {
        let status = |v: Option<&str>| v.map(|_| TranslationStatus::Approved);
        ItemCoverage {
            id: 1,
            content_key: key.to_string(),
            screen_location: Some(screen.to_string()),
            component_type: Some("text".to_string()),
            values: PerLanguage {
                ru: ru.map(str::to_string),
                he: he.map(str::to_string),
                en: en.map(str::to_string),
            },
            statuses: PerLanguage {
                ru: status(ru),
                he: status(he),
                en: status(en),
            },
        }
    }

    #[test]
    fn detects_missing_and_echoed_languages() {
        let it = item("app.title", "s1", Some("Заголовок"), None, Some("app.title"));
        assert_eq!(it.missing_languages(), [Language::He]);
        assert_eq!(it.key_echo_languages(), [Language::En]);
        assert_eq!(it.languages_needing_repair(), [Language::He, Language::En]);
        assert!(it.needs_repair());

        let complete = item("k", "s1", Some("a"), Some("b"), Some("c"));
        assert!(!complete.needs_repair());
    }

    #[test]
    fn summarizes_per_screen_in_order() {
        let items = vec![
            item("a", "credit_step1", Some("x"), Some("y"), Some("z")),
            item("b", "credit_step1", None, None, None),
            item("c", "mortgage_step1", None, None, Some("c")),
        ];
        let summary = summarize(&items);
        assert_eq!(summary.len(), 2);
        assert_eq!(summary[0].screen_location, "credit_step1");
        assert_eq!(summary[0].total_items, 2);
        assert_eq!(summary[0].items_with_translations, 1);
        assert_eq!(summary[0].translation_rows, 3);
        assert_eq!(summary[0].missing.ru, 1);
        assert_eq!(summary[0].coverage_percent(), 50);
        assert_eq!(summary[0].badge(), "🟢");
        assert_eq!(summary[1].key_echo.en, 1);
        assert_eq!(summary[1].missing.he, 1);
    }

    #[test]
    fn flagged_values_need_repair_and_are_counted() {
        let it = item("calc.rate", "s1", Some("Ставка"), Some("Translation missing"), Some("Rate"));
        assert_eq!(it.missing_flag_languages(), [Language::He]);
        assert_eq!(it.languages_needing_repair(), [Language::He]);

        let summary = summarize(&[it]);
        assert_eq!(summary[0].missing_flag.he, 1);
        assert_eq!(summary[0].missing.he, 0);
    }

    #[test]
    fn clean_source_skips_flagged_and_echoed_siblings() {
        let it = item("k", "s1", Some("Translation missing"), Some("Translation missing"), Some("Rate"));
        assert_eq!(it.clean_source(Language::He), Some((Language::En, "Rate")));

        let it = item("k", "s1", Some("Ставка"), None, Some("Rate"));
        assert_eq!(it.clean_source(Language::He), Some((Language::Ru, "Ставка")));
        assert_eq!(it.clean_source(Language::Ru), Some((Language::En, "Rate")));

        let it = item("k", "s1", Some("k"), Some("translation missing"), Some("  "));
        assert_eq!(it.clean_source(Language::He), None);
    }

    #[test]
    fn badge_thresholds() {
        assert_eq!(coverage_badge(0), "🔴");
        assert_eq!(coverage_badge(49), "🟡");
        assert_eq!(coverage_badge(50), "🟢");
    }
}
