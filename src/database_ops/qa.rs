//! Translation quality audit.
//!
//! Rows are fetched flat (one per item/language) and folded into a report in
//! memory, so the aggregation is testable without a database.

use std::fs::{self, File};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use indexmap::IndexMap;
use serde::Serialize;
use tracing::{info, warn};

use super::{percent, ScreenFilter, SCREEN_PREDICATE};
use crate::model::{today_stamp, Language, PerLanguage, TranslationStatus};
use crate::text::placeholder::{classify, TextQuality};
use crate::util::db::Db;

const MAX_PLACEHOLDER_EXAMPLES: usize = 50;
const MAX_FIX_ROWS: usize = 100;
const EXAMPLE_CHARS: usize = 100;

/// One (item, language) row; language fields are NULL for items without rows.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct QaRow {
    pub item_id: i64,
    pub content_key: String,
    pub screen_location: Option<String>,
    pub language_code: Option<String>,
    pub content_value: Option<String>,
    pub status: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct QaSummary {
    pub total_items: usize,
    pub total_translations: usize,
    pub items_with_all_languages: usize,
    pub items_missing_languages: usize,
    pub placeholder_translations: usize,
    pub meaningful_translations: usize,
    pub generic_translations: usize,
    /// Values carrying the "Translation missing" marker; also counted as placeholders.
    pub missing_flag_translations: usize,
    pub quality_score: i64,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct LanguageQuality {
    pub total: usize,
    pub placeholder: usize,
    pub meaningful: usize,
    pub generic: usize,
}

impl LanguageQuality {
    pub fn quality_percent(&self) -> i64 {
        percent(self.meaningful as i64, self.total as i64)
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ScreenQuality {
    pub total_items: usize,
    pub with_translations: usize,
    pub missing_translations: usize,
    pub placeholders: usize,
    pub missing_flags: usize,
    pub meaningful: usize,
    pub quality_score: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum QaIssue {
    MissingLanguage {
        item_id: i64,
        content_key: String,
        missing: Vec<Language>,
    },
    PlaceholderText {
        item_id: i64,
        content_key: String,
        language: Language,
        value: String,
    },
    UnapprovedStatus {
        item_id: i64,
        content_key: String,
        language: Language,
        status: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Priority {
    Critical,
    High,
    Medium,
}

impl Priority {
    pub fn as_str(self) -> &'static str {
        match self {
            Priority::Critical => "CRITICAL",
            Priority::High => "HIGH",
            Priority::Medium => "MEDIUM",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ScreenScore {
    pub screen: String,
    pub quality_score: i64,
    pub placeholders: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct Recommendation {
    pub priority: Priority,
    pub issue: String,
    pub action: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub screens: Vec<ScreenScore>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
    Excellent,
    Good,
    Fair,
    Poor,
}

impl Verdict {
    pub fn from_score(score: i64) -> Self {
        match score {
            s if s >= 80 => Verdict::Excellent,
            s if s >= 60 => Verdict::Good,
            s if s >= 40 => Verdict::Fair,
            _ => Verdict::Poor,
        }
    }

    pub fn message(self) -> &'static str {
        match self {
            Verdict::Excellent => "EXCELLENT: translations are high quality and production-ready",
            Verdict::Good => "GOOD: translations are acceptable but could be improved",
            Verdict::Fair => "FAIR: significant improvements needed before production",
            Verdict::Poor => "POOR: major rework required, too many placeholders or generic text",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct QaReport {
    pub timestamp: String,
    pub summary: QaSummary,
    pub by_screen: IndexMap<String, ScreenQuality>,
    pub by_language: PerLanguage<LanguageQuality>,
    pub issues: Vec<QaIssue>,
    pub recommendations: Vec<Recommendation>,
    pub verdict: Verdict,
}

impl QaReport {
    /// A poor verdict fails the run.
    pub fn passes(&self) -> bool {
        self.verdict != Verdict::Poor
    }

    pub fn top_screens_by_volume(&self, n: usize) -> Vec<(&str, &ScreenQuality)> {
        let mut screens: Vec<_> = self.by_screen.iter().map(|(k, v)| (k.as_str(), v)).collect();
        screens.sort_by(|a, b| b.1.total_items.cmp(&a.1.total_items));
        screens.truncate(n);
        screens
    }

    pub fn placeholder_examples(&self) -> impl Iterator<Item = &QaIssue> {
        self.issues
            .iter()
            .filter(|i| matches!(i, QaIssue::PlaceholderText { .. }))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Bucket {
    Placeholder,
    Meaningful,
    Generic,
    Unscored,
}

fn bucket(quality: TextQuality) -> Bucket {
    match quality {
        TextQuality::Generated | TextQuality::Placeholder | TextQuality::KeyEcho | TextQuality::MissingFlag => {
            Bucket::Placeholder
        }
        TextQuality::Meaningful => Bucket::Meaningful,
        TextQuality::Generic => Bucket::Generic,
        TextQuality::Empty | TextQuality::Plain => Bucket::Unscored,
    }
}

struct ItemRows<'a> {
    content_key: &'a str,
    screen: String,
    translations: Vec<(Language, &'a str, Option<&'a str>)>,
}

/// Fold flat rows into the report, keeping the first-seen order of items and screens.
pub fn build_report(rows: &[QaRow], now: DateTime<Utc>) -> QaReport {
    let mut items: IndexMap<i64, ItemRows<'_>> = IndexMap::new();
    for row in rows {
        let entry = items.entry(row.item_id).or_insert_with(|| ItemRows {
            content_key: &row.content_key,
            screen: row.screen_location.clone().unwrap_or_else(|| "(none)".to_string()),
            translations: Vec::new(),
        });
        let (Some(code), Some(value)) = (row.language_code.as_deref(), row.content_value.as_deref()) else {
            continue;
        };
        if value.is_empty() {
            continue;
        }
        match code.parse::<Language>() {
            Ok(lang) => entry.translations.push((lang, value, row.status.as_deref())),
            Err(_) => warn!(item_id = row.item_id, code, "skipping unsupported language row"),
        }
    }

    let mut summary = QaSummary {
        total_items: items.len(),
        ..Default::default()
    };
    let mut by_screen: IndexMap<String, ScreenQuality> = IndexMap::new();
    let mut by_language: PerLanguage<LanguageQuality> = PerLanguage::default();
    let mut issues = Vec::new();
    let mut placeholder_examples = 0usize;

    for (&item_id, item) in &items {
        let missing: Vec<Language> = Language::ALL
            .into_iter()
            .filter(|l| !item.translations.iter().any(|(t, _, _)| t == l))
            .collect();
        if missing.is_empty() {
            summary.items_with_all_languages += 1;
        } else {
            summary.items_missing_languages += 1;
            issues.push(QaIssue::MissingLanguage {
                item_id,
                content_key: item.content_key.to_string(),
                missing,
            });
        }

        let screen = by_screen.entry(item.screen.clone()).or_default();
        screen.total_items += 1;
        if item.translations.is_empty() {
            screen.missing_translations += 1;
        } else {
            screen.with_translations += 1;
        }

        for &(lang, value, status) in &item.translations {
            summary.total_translations += 1;
            let lang_stats = by_language.get_mut(lang);
            lang_stats.total += 1;
            let quality = classify(Some(value), Some(item.content_key));
            if quality == TextQuality::MissingFlag {
                summary.missing_flag_translations += 1;
                screen.missing_flags += 1;
            }
            match bucket(quality) {
                Bucket::Placeholder => {
                    summary.placeholder_translations += 1;
                    lang_stats.placeholder += 1;
                    screen.placeholders += 1;
                    if placeholder_examples < MAX_PLACEHOLDER_EXAMPLES {
                        placeholder_examples += 1;
                        issues.push(QaIssue::PlaceholderText {
                            item_id,
                            content_key: item.content_key.to_string(),
                            language: lang,
                            value: value.chars().take(EXAMPLE_CHARS).collect(),
                        });
                    }
                }
                Bucket::Meaningful => {
                    summary.meaningful_translations += 1;
                    lang_stats.meaningful += 1;
                    screen.meaningful += 1;
                }
                Bucket::Generic => {
                    summary.generic_translations += 1;
                    lang_stats.generic += 1;
                }
                Bucket::Unscored => {}
            }
            let approved = status.is_some_and(|s| TranslationStatus::from(s).is_approved());
            if !approved {
                issues.push(QaIssue::UnapprovedStatus {
                    item_id,
                    content_key: item.content_key.to_string(),
                    language: lang,
                    status: status.unwrap_or("NULL").to_string(),
                });
            }
        }
    }

    summary.quality_score = percent(summary.meaningful_translations as i64, summary.total_translations as i64);
    for screen in by_screen.values_mut() {
        screen.quality_score = percent(screen.meaningful as i64, screen.with_translations as i64 * 3);
    }

    let recommendations = recommend(&summary, &by_screen);
    QaReport {
        timestamp: now.to_rfc3339_opts(SecondsFormat::Millis, true),
        verdict: Verdict::from_score(summary.quality_score),
        summary,
        by_screen,
        by_language,
        issues,
        recommendations,
    }
}

fn recommend(summary: &QaSummary, by_screen: &IndexMap<String, ScreenQuality>) -> Vec<Recommendation> {
    let mut out = Vec::new();
    if summary.placeholder_translations > 100 {
        out.push(Recommendation {
            priority: Priority::Critical,
            issue: format!("{} placeholder translations detected", summary.placeholder_translations),
            action: "Replace all placeholder text with actual business content before production".into(),
            screens: vec![],
        });
    }
    if summary.items_missing_languages > 0 {
        out.push(Recommendation {
            priority: Priority::High,
            issue: format!("{} items missing translations", summary.items_missing_languages),
            action: "Complete translations for all languages".into(),
            screens: vec![],
        });
    }
    if summary.quality_score < 50 {
        out.push(Recommendation {
            priority: Priority::High,
            issue: format!("Low quality score: {}%", summary.quality_score),
            action: "Review and improve translation quality with business-appropriate content".into(),
            screens: vec![],
        });
    }

    let mut worst: Vec<_> = by_screen
        .iter()
        .filter(|(_, s)| s.quality_score < 30 && s.total_items > 5)
        .collect();
    worst.sort_by_key(|(_, s)| s.quality_score);
    worst.truncate(5);
    if !worst.is_empty() {
        out.push(Recommendation {
            priority: Priority::Medium,
            issue: "Screens with poor translation quality".into(),
            action: "Prioritize improving these screens first".into(),
            screens: worst
                .into_iter()
                .map(|(screen, s)| ScreenScore {
                    screen: screen.clone(),
                    quality_score: s.quality_score,
                    placeholders: s.placeholders,
                })
                .collect(),
        });
    }
    out
}

pub async fn fetch_rows(db: &Db, filter: &ScreenFilter) -> Result<Vec<QaRow>> {
    let (screen, prefix) = filter.binds();
    let sql = format!(
        r#"
        SELECT
            ci.id::BIGINT AS item_id,
            ci.content_key,
            ci.screen_location,
            ct.language_code,
            ct.content_value,
            ct.status::TEXT AS status
        FROM content_items ci
        LEFT JOIN content_translations ct ON ci.id = ct.content_item_id
        WHERE ci.is_active = TRUE
          AND {SCREEN_PREDICATE}
        ORDER BY ci.screen_location, ci.id, ct.language_code
        "#
    );
    let rows = sqlx::query_as::<_, QaRow>(&sql)
        .persistent(false)
        .bind(screen)
        .bind(prefix)
        .fetch_all(&db.pool)
        .await?;
    Ok(rows)
}

#[derive(Debug, Serialize)]
struct FixRow<'a> {
    item_id: i64,
    content_key: &'a str,
    language: Language,
    current_value: &'a str,
    suggested_value: &'a str,
}

/// Save the JSON report and, when placeholders were found, a CSV of rows to fix.
pub fn write_report_files(out_dir: &Path, report: &QaReport, now: DateTime<Utc>) -> Result<(PathBuf, Option<PathBuf>)> {
    fs::create_dir_all(out_dir).with_context(|| format!("create {}", out_dir.display()))?;
    let stamp = today_stamp(now);

    let json_path = out_dir.join(format!("qa_validation_{stamp}.json"));
    let body = serde_json::to_string_pretty(report)?;
    fs::write(&json_path, body).with_context(|| format!("write {}", json_path.display()))?;

    let examples: Vec<_> = report.placeholder_examples().take(MAX_FIX_ROWS).collect();
    if examples.is_empty() {
        info!(report = %json_path.display(), "qa report written");
        return Ok((json_path, None));
    }
    let csv_path = out_dir.join(format!("placeholders_to_fix_{stamp}.csv"));
    let file = File::create(&csv_path).with_context(|| format!("create {}", csv_path.display()))?;
    let mut wtr = csv::Writer::from_writer(file);
    for issue in examples {
        if let QaIssue::PlaceholderText {
            item_id,
            content_key,
            language,
            value,
        } = issue
        {
            wtr.serialize(FixRow {
                item_id: *item_id,
                content_key,
                language: *language,
                current_value: value,
                suggested_value: "",
            })?;
        }
    }
    wtr.flush()?;
    info!(report = %json_path.display(), fixes = %csv_path.display(), "qa report written");
    Ok((json_path, Some(csv_path)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn row(id: i64, screen: &str, lang: Option<&str>, value: Option<&str>, status: &str) -> QaRow {
        QaRow {
            item_id: id,
            content_key: format!("{screen}.key{id}"),
            screen_location: Some(screen.to_string()),
            language_code: lang.map(str::to_string),
            content_value: value.map(str::to_string),
            status: Some(status.to_string()),
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 2, 3, 4, 5).unwrap()
    }

    #[test]
    fn aggregates_summary_language_and_screen() {
        let rows = vec![
            row(1, "credit_step1", Some("en"), Some("Monthly income"), "approved"),
            row(1, "credit_step1", Some("he"), Some("הכנסה חודשית"), "approved"),
            row(1, "credit_step1", Some("ru"), Some("Field 3"), "draft"),
            row(2, "credit_step1", None, None, "approved"),
            row(3, "mortgage_step1", Some("en"), Some("Title"), "approved"),
        ];
        let report = build_report(&rows, now());
        let s = &report.summary;
        assert_eq!(s.total_items, 3);
        assert_eq!(s.total_translations, 4);
        assert_eq!(s.items_with_all_languages, 1);
        assert_eq!(s.items_missing_languages, 2);
        assert_eq!(s.meaningful_translations, 1);
        assert_eq!(s.placeholder_translations, 1);
        assert_eq!(s.generic_translations, 1);
        assert_eq!(s.quality_score, 25);

        assert_eq!(report.by_language.ru.placeholder, 1);
        assert_eq!(report.by_language.en.total, 2);

        let credit = &report.by_screen["credit_step1"];
        assert_eq!(credit.total_items, 2);
        assert_eq!(credit.with_translations, 1);
        assert_eq!(credit.missing_translations, 1);
        // 1 meaningful / (1 item * 3 languages)
        assert_eq!(credit.quality_score, 33);

        assert!(report.issues.contains(&QaIssue::UnapprovedStatus {
            item_id: 1,
            content_key: "credit_step1.key1".into(),
            language: Language::Ru,
            status: "draft".into(),
        }));
        assert_eq!(report.verdict, Verdict::Poor);
        assert!(!report.passes());
    }

    #[test]
    fn placeholder_examples_are_capped() {
        let rows: Vec<_> = (0..120)
            .map(|i| row(i, "s", Some("en"), Some("[todo]"), "approved"))
            .collect();
        let report = build_report(&rows, now());
        assert_eq!(report.summary.placeholder_translations, 120);
        assert_eq!(report.placeholder_examples().count(), MAX_PLACEHOLDER_EXAMPLES);
        assert_eq!(report.recommendations[0].priority, Priority::Critical);
    }

    #[test]
    fn missing_markers_are_counted_as_placeholders() {
        let rows = vec![
            row(1, "s1", Some("ru"), Some("Сумма кредита"), "approved"),
            row(1, "s1", Some("he"), Some("Translation missing"), "approved"),
            row(1, "s1", Some("en"), Some("[translation missing]"), "approved"),
            row(2, "s2", Some("he"), Some("translation missing: he.calc"), "draft"),
        ];
        let report = build_report(&rows, now());
        assert_eq!(report.summary.missing_flag_translations, 3);
        assert_eq!(report.summary.placeholder_translations, 3);
        assert_eq!(report.by_screen["s1"].missing_flags, 2);
        assert_eq!(report.by_screen["s2"].missing_flags, 1);
        assert_eq!(report.by_language.he.placeholder, 2);
    }

    #[test]
    fn recommends_worst_screens() {
        let mut rows = Vec::new();
        for i in 0..6 {
            rows.push(row(i, "bad_screen", Some("en"), Some("Something"), "approved"));
        }
        rows.push(row(100, "tiny", Some("en"), Some("Nothing"), "approved"));
        let report = build_report(&rows, now());
        let medium = report
            .recommendations
            .iter()
            .find(|r| r.priority == Priority::Medium)
            .expect("medium recommendation");
        assert_eq!(medium.screens.len(), 1);
        assert_eq!(medium.screens[0].screen, "bad_screen");
    }

    #[test]
    fn verdict_thresholds() {
        assert_eq!(Verdict::from_score(80), Verdict::Excellent);
        assert_eq!(Verdict::from_score(79), Verdict::Good);
        assert_eq!(Verdict::from_score(60), Verdict::Good);
        assert_eq!(Verdict::from_score(40), Verdict::Fair);
        assert_eq!(Verdict::from_score(39), Verdict::Poor);
    }

    #[test]
    fn issues_serialize_with_type_tag() {
        let issue = QaIssue::MissingLanguage {
            item_id: 4,
            content_key: "k".into(),
            missing: vec![Language::He],
        };
        let json = serde_json::to_value(&issue).unwrap();
        assert_eq!(json["type"], "MISSING_LANGUAGE");
        assert_eq!(json["missing"], serde_json::json!(["he"]));
    }
}
