use std::fmt::Write as _;
use std::path::PathBuf;

use anyhow::Result;
use chrono::Utc;

use super::RULE;
use crate::database_ops::qa::{build_report, fetch_rows, write_report_files, QaReport};
use crate::database_ops::ScreenFilter;
use crate::util::db::Db;

#[derive(Debug, Clone)]
pub struct QaConfig {
    pub database_url: Option<String>,
    pub filter: ScreenFilter,
    pub out_dir: PathBuf,
}

/// Returns whether the verdict is better than poor.
pub async fn run(cfg: QaConfig) -> Result<bool> {
    let db = Db::from_env(cfg.database_url.clone()).await?;
    let res = fetch_rows(&db, &cfg.filter).await;
    db.close().await;
    let rows = res?;

    let now = Utc::now();
    let report = build_report(&rows, now);
    print!("{}", render(&report));
    let (json_path, csv_path) = write_report_files(&cfg.out_dir, &report, now)?;
    println!("Detailed report: {}", json_path.display());
    if let Some(csv_path) = csv_path {
        println!("Placeholders to fix: {}", csv_path.display());
    }
    println!("Final quality score: {}%", report.summary.quality_score);
    Ok(report.passes())
}

fn render(report: &QaReport) -> String {
    let s = &report.summary;
    let mut out = String::new();
    writeln!(out, "QA VALIDATION REPORT - TRANSLATIONS").ok();
    writeln!(out, "{RULE}").ok();
    writeln!(out, "Total content items: {}", s.total_items).ok();
    writeln!(out, "Total translations: {}", s.total_translations).ok();
    writeln!(out, "Items with all languages: {}", s.items_with_all_languages).ok();
    writeln!(out, "Items missing languages: {}", s.items_missing_languages).ok();
    writeln!(out).ok();
    writeln!(
        out,
        "Meaningful: {} ({}%), placeholders: {}, generic: {}",
        s.meaningful_translations, s.quality_score, s.placeholder_translations, s.generic_translations
    )
    .ok();
    if s.missing_flag_translations > 0 {
        writeln!(out, "\"Translation missing\" flags: {}", s.missing_flag_translations).ok();
    }
    writeln!(out).ok();

    writeln!(out, "By language").ok();
    for (lang, q) in report.by_language.iter() {
        writeln!(
            out,
            "  {}: {} total, {} meaningful ({}%), {} placeholders",
            lang.display_name(),
            q.total,
            q.meaningful,
            q.quality_percent(),
            q.placeholder
        )
        .ok();
    }
    writeln!(out).ok();

    writeln!(out, "Top 5 screens by volume").ok();
    for (screen, q) in report.top_screens_by_volume(5) {
        writeln!(out, "  {screen}: {} items, quality {}%", q.total_items, q.quality_score).ok();
    }
    writeln!(out).ok();

    if !report.recommendations.is_empty() {
        writeln!(out, "Recommendations").ok();
        for rec in &report.recommendations {
            writeln!(out, "  [{}] {}", rec.priority.as_str(), rec.issue).ok();
            writeln!(out, "     -> {}", rec.action).ok();
            for sc in &rec.screens {
                writeln!(
                    out,
                    "        - {}: {}% quality, {} placeholders",
                    sc.screen, sc.quality_score, sc.placeholders
                )
                .ok();
            }
        }
        writeln!(out).ok();
    }

    writeln!(out, "Verdict: {}", report.verdict.message()).ok();
    out
}
