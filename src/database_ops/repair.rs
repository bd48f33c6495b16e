use anyhow::{bail, Context, Result};
use serde::Serialize;
use sqlx::{PgConnection, Row};
use tracing::info;

use super::coverage::{fetch_item_translations, ItemCoverage};
use super::{ScreenFilter, SCREEN_PREDICATE};
use crate::model::{Language, PerLanguage, TranslationStatus};
use crate::text::suggest::suggest_translations;
use crate::util::db::{finish_tx, Db};

const UPSERT_TRANSLATION: &str = r#"
    INSERT INTO content_translations (content_item_id, language_code, content_value, status)
    VALUES ($1, $2, $3, $4)
    ON CONFLICT (content_item_id, language_code)
    DO UPDATE SET content_value = EXCLUDED.content_value,
                  status = EXCLUDED.status,
                  updated_at = CURRENT_TIMESTAMP
"#;

/// What to write into a missing slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RepairMode {
    /// Keyword-derived copy, approved.
    #[default]
    Suggest,
    /// Empty draft rows for translators to fill in.
    Empty,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlannedWrite {
    pub content_item_id: i64,
    pub content_key: String,
    pub screen_location: String,
    pub language: Language,
    pub value: String,
    pub status: TranslationStatus,
    /// Replaces a key-echo or flagged row rather than filling a gap.
    pub overwrite: bool,
    /// Sibling language the value was copied from.
    pub copied_from: Option<Language>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct RepairSummary {
    pub items: usize,
    pub writes: PerLanguage<usize>,
    pub dry_run: bool,
}

impl RepairSummary {
    pub fn total_writes(&self) -> usize {
        self.writes.ru + self.writes.he + self.writes.en
    }
}

/// Work out the writes for every item that lacks a language, echoes its key
/// or carries the "Translation missing" marker.
///
/// Flagged values are replaced with a clean sibling translation as a draft
/// when one exists; everything else gets the keyword suggestion.
pub fn plan_repairs(items: &[ItemCoverage], mode: RepairMode) -> Vec<PlannedWrite> {
    let mut out = Vec::new();
    for item in items {
        let langs = item.languages_needing_repair();
        if langs.is_empty() {
            continue;
        }
        let suggestion = suggest_translations(&item.content_key);
        let flagged = item.missing_flag_languages();
        for lang in langs {
            let source = match mode {
                RepairMode::Suggest if flagged.contains(&lang) => item.clean_source(lang),
                _ => None,
            };
            let (value, status) = match (mode, source) {
                (RepairMode::Suggest, Some((_, text))) => (text.to_string(), TranslationStatus::Draft),
                (RepairMode::Suggest, None) => (suggestion.get(lang).to_string(), TranslationStatus::Approved),
                (RepairMode::Empty, _) => (String::new(), TranslationStatus::Draft),
            };
            out.push(PlannedWrite {
                content_item_id: item.id,
                content_key: item.content_key.clone(),
                screen_location: item.screen().to_string(),
                language: lang,
                value,
                status,
                overwrite: item.values.get(lang).is_some(),
                copied_from: source.map(|(l, _)| l),
            });
        }
    }
    out
}

pub fn summarize_plan(plan: &[PlannedWrite], dry_run: bool) -> RepairSummary {
    let mut summary = RepairSummary {
        dry_run,
        ..Default::default()
    };
    let mut last_item = None;
    for w in plan {
        if last_item != Some(w.content_item_id) {
            summary.items += 1;
            last_item = Some(w.content_item_id);
        }
        *summary.writes.get_mut(w.language) += 1;
    }
    summary
}

async fn upsert(conn: &mut PgConnection, item_id: i64, lang: Language, value: &str, status: &TranslationStatus) -> Result<()> {
    sqlx::query(UPSERT_TRANSLATION)
        .persistent(false)
        .bind(item_id)
        .bind(lang.as_code())
        .bind(value)
        .bind(status.as_str())
        .execute(conn)
        .await
        .with_context(|| format!("upsert translation item={item_id} lang={lang}"))?;
    Ok(())
}

/// Apply a plan inside one transaction. With `dry_run` nothing is sent.
pub async fn apply_plan(db: &Db, plan: &[PlannedWrite], dry_run: bool) -> Result<RepairSummary> {
    let summary = summarize_plan(plan, dry_run);
    if dry_run || plan.is_empty() {
        return Ok(summary);
    }
    let mut tx = db.begin().await?;
    let outcome: Result<()> = async {
        for w in plan {
            upsert(&mut tx, w.content_item_id, w.language, &w.value, &w.status).await?;
        }
        Ok(())
    }
    .await;
    finish_tx(tx, outcome, false).await?;
    info!(writes = summary.total_writes(), items = summary.items, "repair applied");
    Ok(summary)
}

/// Scan, plan and apply in one go. The plan is returned so callers can print it.
pub async fn fill_missing(
    db: &Db,
    filter: &ScreenFilter,
    mode: RepairMode,
    dry_run: bool,
) -> Result<(Vec<PlannedWrite>, RepairSummary)> {
    let items = fetch_item_translations(db, filter).await?;
    let plan = plan_repairs(&items, mode);
    info!(items = items.len(), planned = plan.len(), filter = %filter.describe(), "repair planned");
    let summary = apply_plan(db, &plan, dry_run).await?;
    Ok((plan, summary))
}

/// Per-screen counts of values that still equal their content key.
#[derive(Debug, Clone, Serialize)]
pub struct RemainingEcho {
    pub screen_location: Option<String>,
    pub total_items: i64,
    pub echo: PerLanguage<i64>,
}

pub async fn remaining_key_echo(db: &Db, filter: &ScreenFilter) -> Result<Vec<RemainingEcho>> {
    let (screen, prefix) = filter.binds();
    let sql = format!(
        r#"
        SELECT
            ci.screen_location,
            COUNT(*)::BIGINT AS total_items,
            COUNT(CASE WHEN ct_ru.content_value = ci.content_key THEN 1 END)::BIGINT AS echo_ru,
            COUNT(CASE WHEN ct_he.content_value = ci.content_key THEN 1 END)::BIGINT AS echo_he,
            COUNT(CASE WHEN ct_en.content_value = ci.content_key THEN 1 END)::BIGINT AS echo_en
        FROM content_items ci
        LEFT JOIN content_translations ct_ru ON ci.id = ct_ru.content_item_id AND ct_ru.language_code = 'ru'
        LEFT JOIN content_translations ct_he ON ci.id = ct_he.content_item_id AND ct_he.language_code = 'he'
        LEFT JOIN content_translations ct_en ON ci.id = ct_en.content_item_id AND ct_en.language_code = 'en'
        WHERE ci.is_active = TRUE
          AND {SCREEN_PREDICATE}
        GROUP BY ci.screen_location
        HAVING COUNT(CASE WHEN ct_ru.content_value = ci.content_key THEN 1 END) > 0
            OR COUNT(CASE WHEN ct_he.content_value = ci.content_key THEN 1 END) > 0
            OR COUNT(CASE WHEN ct_en.content_value = ci.content_key THEN 1 END) > 0
        ORDER BY ci.screen_location
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
            Ok(RemainingEcho {
                screen_location: row.try_get("screen_location")?,
                total_items: row.try_get("total_items")?,
                echo: PerLanguage {
                    ru: row.try_get("echo_ru")?,
                    he: row.try_get("echo_he")?,
                    en: row.try_get("echo_en")?,
                },
            })
        })
        .collect()
}

/// Write one hand-authored value, addressing the item by content key.
pub async fn set_translation(
    db: &Db,
    content_key: &str,
    lang: Language,
    value: &str,
    status: &TranslationStatus,
) -> Result<i64> {
    let item_id: Option<i64> = sqlx::query_scalar("SELECT id::BIGINT FROM content_items WHERE content_key = $1")
        .persistent(false)
        .bind(content_key)
        .fetch_optional(&db.pool)
        .await?;
    let Some(item_id) = item_id else {
        bail!("no content item with key '{content_key}'");
    };
    let mut tx = db.begin().await?;
    let outcome = upsert(&mut tx, item_id, lang, value, status).await;
    finish_tx(tx, outcome, false).await?;
    info!(content_key, %lang, "translation written");
    Ok(item_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database_ops::coverage::tests::item;

    #[test]
    fn plans_suggested_approved_rows() {
        let items = vec![
            item("app.bank.select_bank", "s1", Some("Выбрать банк"), None, Some("app.bank.select_bank")),
            item("app.done", "s1", Some("a"), Some("b"), Some("c")),
        ];
        let plan = plan_repairs(&items, RepairMode::Suggest);
        assert_eq!(plan.len(), 2);
        assert_eq!(plan[0].language, Language::He);
        assert_eq!(plan[0].value, "בחר בנק");
        assert!(!plan[0].overwrite);
        assert_eq!(plan[1].language, Language::En);
        assert_eq!(plan[1].value, "Select Bank");
        assert!(plan[1].overwrite);
        assert!(plan.iter().all(|w| w.status == TranslationStatus::Approved));
    }

    #[test]
    fn flagged_values_copy_a_clean_sibling() {
        let items = vec![
            item("calc.loan_term", "s1", Some("Translation missing"), Some("תקופה"), Some("Loan term")),
            item("calc.select_bank", "s1", Some("x"), Some("Translation missing"), Some("Translation missing")),
        ];
        let plan = plan_repairs(&items, RepairMode::Suggest);
        assert_eq!(plan.len(), 3);

        assert_eq!(plan[0].language, Language::Ru);
        assert_eq!(plan[0].copied_from, Some(Language::En));
        assert_eq!(plan[0].value, "Loan term");
        assert_eq!(plan[0].status, TranslationStatus::Draft);
        assert!(plan[0].overwrite);

        assert_eq!(plan[1].language, Language::He);
        assert_eq!(plan[1].copied_from, Some(Language::Ru));
        assert_eq!(plan[1].value, "x");
        assert_eq!(plan[2].language, Language::En);
        assert_eq!(plan[2].copied_from, Some(Language::Ru));
    }

    #[test]
    fn flagged_without_clean_sibling_falls_back_to_suggestion() {
        let items = vec![item("app.select_bank", "s1", Some("Translation missing"), None, Some("app.select_bank"))];
        let plan = plan_repairs(&items, RepairMode::Suggest);
        assert_eq!(plan.len(), 3);
        assert!(plan.iter().all(|w| w.copied_from.is_none()));
        assert_eq!(plan[0].value, "Выбрать банк");
        assert_eq!(plan[0].status, TranslationStatus::Approved);
    }

    #[test]
    fn empty_mode_writes_drafts() {
        let items = vec![item("x.y", "s1", None, None, None)];
        let plan = plan_repairs(&items, RepairMode::Empty);
        assert_eq!(plan.len(), 3);
        assert!(plan.iter().all(|w| w.value.is_empty() && w.status == TranslationStatus::Draft));
    }

    #[test]
    fn summary_counts_items_and_languages() {
        let mut a = item("a", "s1", None, None, Some("en"));
        a.id = 10;
        let mut b = item("b", "s1", None, Some("he"), Some("en"));
        b.id = 11;
        let plan = plan_repairs(&[a, b], RepairMode::Suggest);
        let summary = summarize_plan(&plan, true);
        assert_eq!(summary.items, 2);
        assert_eq!(summary.writes.ru, 2);
        assert_eq!(summary.writes.he, 1);
        assert_eq!(summary.writes.en, 0);
        assert_eq!(summary.total_writes(), 3);
        assert!(summary.dry_run);
    }
}
