use std::fmt::Write as _;

use anyhow::Result;
use serde::Serialize;

use super::{print_json, RULE};
use crate::database_ops::coverage::{
    coverage_badge, invariant_violations, screen_summary, InvariantViolation, ScreenSummary,
};
use crate::database_ops::{percent, ScreenFilter};
use crate::util::db::Db;

#[derive(Debug, Clone, Default)]
pub struct CoverageConfig {
    pub database_url: Option<String>,
    pub filter: ScreenFilter,
    /// Emit JSON instead of the text report.
    pub json: bool,
    /// How many invariant violations to list (0 hides the section).
    pub show_violations: usize,
}

#[derive(Debug, Serialize)]
struct CoverageReport {
    screens: Vec<ScreenSummary>,
    violations: Vec<InvariantViolation>,
}

pub async fn run(cfg: CoverageConfig) -> Result<()> {
    let db = Db::from_env(cfg.database_url.clone()).await?;
    let res = report(&db, &cfg).await;
    db.close().await;
    res
}

async fn report(db: &Db, cfg: &CoverageConfig) -> Result<()> {
    let screens = screen_summary(db, &cfg.filter).await?;
    let violations = invariant_violations(db, &cfg.filter).await?;
    if cfg.json {
        return print_json(&CoverageReport { screens, violations });
    }

    let mut out = String::new();
    writeln!(out, "Translation coverage for {}", cfg.filter.describe()).ok();
    writeln!(out, "{RULE}").ok();
    if screens.is_empty() {
        writeln!(out, "No active content items matched.").ok();
    }
    for s in &screens {
        writeln!(
            out,
            "{} {}: {}/{} items ({}%), {} rows",
            s.badge(),
            s.screen_location,
            s.items_with_translations,
            s.total_items,
            s.coverage_percent(),
            s.translation_rows
        )
        .ok();
        let missing = [("RU", s.missing.ru), ("HE", s.missing.he), ("EN", s.missing.en)];
        if missing.iter().any(|(_, n)| *n > 0) {
            let parts: Vec<_> = missing.iter().map(|(l, n)| format!("{l} {n}")).collect();
            writeln!(out, "     missing: {}", parts.join(", ")).ok();
        }
        let echo = s.key_echo.ru + s.key_echo.he + s.key_echo.en;
        if echo > 0 {
            writeln!(out, "     values equal to their key: {echo}").ok();
        }
        let flagged = s.missing_flag.ru + s.missing_flag.he + s.missing_flag.en;
        if flagged > 0 {
            writeln!(out, "     \"Translation missing\" flags: {flagged}").ok();
        }
    }

    let total_items: i64 = screens.iter().map(|s| s.total_items).sum();
    let with_translations: i64 = screens.iter().map(|s| s.items_with_translations).sum();
    let overall = percent(with_translations, total_items);
    writeln!(out, "{RULE}").ok();
    writeln!(
        out,
        "{} Overall: {with_translations}/{total_items} items translated ({overall}%) across {} screens",
        coverage_badge(overall),
        screens.len()
    )
    .ok();

    writeln!(
        out,
        "Items without exactly one approved row per language: {}",
        violations.len()
    )
    .ok();
    for v in violations.iter().take(cfg.show_violations) {
        writeln!(
            out,
            "  - {} ({}): {} rows, {} approved [{}]",
            v.content_key,
            v.screen_location.as_deref().unwrap_or("(none)"),
            v.translation_rows,
            v.approved_rows,
            v.languages
        )
        .ok();
    }
    if violations.len() > cfg.show_violations && cfg.show_violations > 0 {
        writeln!(out, "  ... and {} more", violations.len() - cfg.show_violations).ok();
    }
    print!("{out}");
    Ok(())
}
