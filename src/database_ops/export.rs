use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use indexmap::IndexMap;
use itertools::Itertools;
use serde::Serialize;
use tracing::info;

use super::{ScreenFilter, SCREEN_PREDICATE};
use crate::model::{today_stamp, ContentItem, PerLanguage};
use crate::util::db::Db;

pub const CSV_HEADER: [&str; 7] = [
    "id",
    "screen_location",
    "content_key",
    "component_type",
    "russian_text",
    "hebrew_text",
    "english_text",
];

const HANDOFF_INSTRUCTIONS: &str =
    "Please fill in the translations for each item in Russian, Hebrew, and English";

/// Active items that have no translation row in any language.
pub async fn items_without_translations(db: &Db, filter: &ScreenFilter) -> Result<Vec<ContentItem>> {
    let (screen, prefix) = filter.binds();
    let sql = format!(
        r#"
        SELECT
            ci.id::BIGINT AS id,
            ci.content_key,
            ci.screen_location,
            ci.component_type,
            ci.category,
            ci.page_number::INT4 AS page_number,
            ci.is_active,
            ci.description
        FROM content_items ci
        WHERE ci.is_active = TRUE
          AND {SCREEN_PREDICATE}
          AND NOT EXISTS (SELECT 1 FROM content_translations ct WHERE ct.content_item_id = ci.id)
        ORDER BY ci.screen_location, ci.id
        "#
    );
    let rows = sqlx::query_as::<_, ContentItem>(&sql)
        .persistent(false)
        .bind(screen)
        .bind(prefix)
        .fetch_all(&db.pool)
        .await?;
    Ok(rows)
}

/// Screens in lexical order, items by id within each screen.
pub fn group_by_screen(items: &[ContentItem]) -> Vec<(String, Vec<&ContentItem>)> {
    let screen_of = |i: &ContentItem| i.screen_location.clone().unwrap_or_default();
    let chunks = items
        .iter()
        .sorted_by(|a, b| screen_of(*a).cmp(&screen_of(*b)).then(a.id.cmp(&b.id)))
        .chunk_by(|i| screen_of(*i));
    let grouped = chunks
        .into_iter()
        .map(|(screen, group)| (screen, group.collect()))
        .collect();
    grouped
}

#[derive(Debug, Serialize)]
struct CsvRow<'a> {
    id: i64,
    screen_location: &'a str,
    content_key: &'a str,
    component_type: &'a str,
    russian_text: &'a str,
    hebrew_text: &'a str,
    english_text: &'a str,
}

/// Spreadsheet for translators: one row per item, translation columns empty.
pub fn write_csv<W: Write>(writer: W, items: &[ContentItem]) -> Result<()> {
    let mut wtr = csv::WriterBuilder::new().has_headers(false).from_writer(writer);
    wtr.write_record(CSV_HEADER)?;
    for (screen, group) in group_by_screen(items) {
        for item in group {
            wtr.serialize(CsvRow {
                id: item.id,
                screen_location: &screen,
                content_key: &item.content_key,
                component_type: item.component_type.as_deref().unwrap_or(""),
                russian_text: "",
                hebrew_text: "",
                english_text: "",
            })?;
        }
    }
    wtr.flush()?;
    Ok(())
}

#[derive(Debug, Serialize)]
pub struct TranslationHandoff {
    pub export_date: String,
    pub total_items: usize,
    pub instructions: String,
    pub screens: IndexMap<String, HandoffScreen>,
}

#[derive(Debug, Serialize)]
pub struct HandoffScreen {
    pub item_count: usize,
    pub items: Vec<HandoffItem>,
}

#[derive(Debug, Serialize)]
pub struct HandoffItem {
    pub id: i64,
    pub content_key: String,
    pub component_type: Option<String>,
    pub translations_needed: PerLanguage<String>,
}

impl TranslationHandoff {
    pub fn build(items: &[ContentItem], now: DateTime<Utc>) -> Self {
        let screens = group_by_screen(items)
            .into_iter()
            .map(|(screen, group)| {
                let items: Vec<HandoffItem> = group
                    .into_iter()
                    .map(|i| HandoffItem {
                        id: i.id,
                        content_key: i.content_key.clone(),
                        component_type: i.component_type.clone(),
                        translations_needed: PerLanguage::default(),
                    })
                    .collect();
                (
                    screen,
                    HandoffScreen {
                        item_count: items.len(),
                        items,
                    },
                )
            })
            .collect();
        Self {
            export_date: now.to_rfc3339_opts(SecondsFormat::Millis, true),
            total_items: items.len(),
            instructions: HANDOFF_INSTRUCTIONS.to_string(),
            screens,
        }
    }
}

pub fn export_file_names(prefix: &str, now: DateTime<Utc>) -> (String, String) {
    let stem = format!("{prefix}_missing_translations_{}", today_stamp(now));
    (format!("{stem}.csv"), format!("{stem}.json"))
}

/// Write both hand-off files into `out_dir`, creating it if needed.
pub fn write_export_files(
    out_dir: &Path,
    prefix: &str,
    items: &[ContentItem],
    now: DateTime<Utc>,
) -> Result<(PathBuf, PathBuf)> {
    fs::create_dir_all(out_dir).with_context(|| format!("create {}", out_dir.display()))?;
    let (csv_name, json_name) = export_file_names(prefix, now);

    let csv_path = out_dir.join(csv_name);
    let file = File::create(&csv_path).with_context(|| format!("create {}", csv_path.display()))?;
    write_csv(file, items).with_context(|| format!("write {}", csv_path.display()))?;

    let json_path = out_dir.join(json_name);
    let handoff = TranslationHandoff::build(items, now);
    let body = serde_json::to_string_pretty(&handoff)?;
    fs::write(&json_path, body).with_context(|| format!("write {}", json_path.display()))?;

    info!(items = items.len(), csv = %csv_path.display(), json = %json_path.display(), "export written");
    Ok((csv_path, json_path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ci(id: i64, screen: &str, key: &str, kind: Option<&str>) -> ContentItem {
        ContentItem {
            id,
            content_key: key.to_string(),
            screen_location: Some(screen.to_string()),
            component_type: kind.map(str::to_string),
            category: None,
            page_number: None,
            is_active: Some(true),
            description: None,
        }
    }

    fn sample() -> Vec<ContentItem> {
        vec![
            ci(7, "credit_step2", "credit.step2.title", Some("text")),
            ci(3, "credit_refi_login", "credit_refi.login.button", Some("button")),
            ci(5, "credit_step2", "credit.step2.amount, total", None),
        ]
    }

    #[test]
    fn csv_has_header_and_sorted_rows() {
        let mut buf = Vec::new();
        write_csv(&mut buf, &sample()).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(
            lines[0],
            "id,screen_location,content_key,component_type,russian_text,hebrew_text,english_text"
        );
        assert_eq!(lines[1], "3,credit_refi_login,credit_refi.login.button,button,,,");
        assert_eq!(lines[2], "5,credit_step2,\"credit.step2.amount, total\",,,,");
        assert_eq!(lines[3], "7,credit_step2,credit.step2.title,text,,,");
        assert_eq!(lines.len(), 4);
    }

    #[test]
    fn handoff_groups_items_per_screen() {
        let now = Utc.with_ymd_and_hms(2025, 3, 9, 12, 0, 0).unwrap();
        let handoff = TranslationHandoff::build(&sample(), now);
        let json = serde_json::to_value(&handoff).unwrap();
        assert_eq!(json["export_date"], "2025-03-09T12:00:00.000Z");
        assert_eq!(json["total_items"], 3);
        let screens: Vec<_> = handoff.screens.keys().cloned().collect();
        assert_eq!(screens, ["credit_refi_login", "credit_step2"]);
        let step2 = &json["screens"]["credit_step2"];
        assert_eq!(step2["item_count"], 2);
        assert_eq!(step2["items"][0]["id"], 5);
        assert_eq!(
            step2["items"][0]["translations_needed"],
            serde_json::json!({"ru": "", "he": "", "en": ""})
        );
    }

    #[test]
    fn file_names_carry_prefix_and_date() {
        let now = Utc.with_ymd_and_hms(2025, 3, 9, 23, 59, 0).unwrap();
        let (csv_name, json_name) = export_file_names("bankim", now);
        assert_eq!(csv_name, "bankim_missing_translations_2025-03-09.csv");
        assert_eq!(json_name, "bankim_missing_translations_2025-03-09.json");
    }
}
