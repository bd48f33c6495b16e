use anyhow::Result;
use serde::Serialize;
use sqlx::Row;
use tracing::debug;

use super::percent;
use crate::model::{is_option_component, Language, PerLanguage};
use crate::util::db::Db;

/// One row of a drill page: the value shown in `lang`, falling back to English.
#[derive(Debug, Clone, Serialize)]
pub struct DrillItem {
    pub id: i64,
    pub content_key: String,
    pub component_type: Option<String>,
    pub category: Option<String>,
    pub page_number: Option<i32>,
    pub value: Option<String>,
    pub has_translation: bool,
    pub fallback_used: bool,
    pub values: PerLanguage<Option<String>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Picked {
    pub value: Option<String>,
    pub has_translation: bool,
    pub fallback_used: bool,
}

/// `COALESCE(requested, en, NULL)` on already-fetched values.
pub fn pick_with_fallback(requested: Language, values: &PerLanguage<Option<String>>) -> Picked {
    if let Some(v) = values.get(requested) {
        return Picked {
            value: Some(v.clone()),
            has_translation: true,
            fallback_used: false,
        };
    }
    match values.get(Language::FALLBACK) {
        Some(v) => Picked {
            value: Some(v.clone()),
            has_translation: false,
            fallback_used: true,
        },
        None => Picked {
            value: None,
            has_translation: false,
            fallback_used: false,
        },
    }
}

pub async fn drill_content(db: &Db, screen_location: &str, lang: Language) -> Result<Vec<DrillItem>> {
    let rows = sqlx::query(
        r#"
        SELECT
            ci.id::BIGINT AS id,
            ci.content_key,
            ci.component_type,
            ci.category,
            ci.page_number::INT4 AS page_number,
            MAX(CASE WHEN ct.language_code = 'ru' THEN ct.content_value END) AS ru_value,
            MAX(CASE WHEN ct.language_code = 'he' THEN ct.content_value END) AS he_value,
            MAX(CASE WHEN ct.language_code = 'en' THEN ct.content_value END) AS en_value
        FROM content_items ci
        LEFT JOIN content_translations ct
               ON ct.content_item_id = ci.id
              AND ct.status::TEXT IN ('approved', 'draft')
        WHERE ci.screen_location = $1
          AND ci.is_active = TRUE
        GROUP BY ci.id, ci.content_key, ci.component_type, ci.category, ci.page_number
        ORDER BY ci.page_number NULLS LAST, ci.id
        "#,
    )
    .persistent(false)
    .bind(screen_location)
    .fetch_all(&db.pool)
    .await?;

    let mut out = Vec::with_capacity(rows.len());
    for row in rows {
        let values = PerLanguage {
            ru: row.try_get("ru_value")?,
            he: row.try_get("he_value")?,
            en: row.try_get("en_value")?,
        };
        let picked = pick_with_fallback(lang, &values);
        out.push(DrillItem {
            id: row.try_get("id")?,
            content_key: row.try_get("content_key")?,
            component_type: row.try_get("component_type")?,
            category: row.try_get("category")?,
            page_number: row.try_get("page_number")?,
            value: picked.value,
            has_translation: picked.has_translation,
            fallback_used: picked.fallback_used,
            values,
        });
    }
    debug!(screen_location, %lang, items = out.len(), "drill content loaded");
    Ok(out)
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DrillStats {
    pub total: usize,
    pub with_translation: usize,
    pub using_fallback: usize,
    pub missing: usize,
    /// Option rows render inside their dropdown and are not separate actions.
    pub options: usize,
    pub translation_coverage: i64,
    pub fallback_coverage: i64,
}

impl DrillStats {
    pub fn from_items(items: &[DrillItem]) -> Self {
        let total = items.len();
        let with_translation = items.iter().filter(|i| i.has_translation).count();
        let using_fallback = items.iter().filter(|i| i.fallback_used).count();
        let missing = items.iter().filter(|i| i.value.is_none()).count();
        let options = items
            .iter()
            .filter(|i| is_option_component(i.component_type.as_deref()))
            .count();
        Self {
            total,
            with_translation,
            using_fallback,
            missing,
            options,
            translation_coverage: percent(with_translation as i64, total as i64),
            fallback_coverage: percent(using_fallback as i64, total as i64),
        }
    }

    /// Actions the drill UI shows once options are folded into their dropdown.
    pub fn visible_actions(&self) -> usize {
        self.total - self.options
    }
}
