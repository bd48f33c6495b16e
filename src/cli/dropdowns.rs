use std::fmt::Write as _;

use anyhow::Result;

use super::{print_json, RULE};
use crate::database_ops::dropdowns::{build_report, DropdownReport};
use crate::database_ops::ScreenFilter;
use crate::util::db::Db;

#[derive(Debug, Clone, Default)]
pub struct DropdownsConfig {
    pub database_url: Option<String>,
    pub filter: ScreenFilter,
    pub json: bool,
}

/// Returns the number of issues found.
pub async fn run(cfg: DropdownsConfig) -> Result<usize> {
    let db = Db::from_env(cfg.database_url.clone()).await?;
    let res = build_report(&db, &cfg.filter).await;
    db.close().await;
    let report = res?;
    if cfg.json {
        print_json(&report)?;
    } else {
        print!("{}", render(&report, &cfg.filter));
    }
    Ok(report.total_issues())
}

fn render(report: &DropdownReport, filter: &ScreenFilter) -> String {
    let mut out = String::new();
    writeln!(out, "Dropdown validation for {}", filter.describe()).ok();
    writeln!(out, "{RULE}").ok();

    writeln!(out, "1. Components ({})", report.components.len()).ok();
    for c in &report.components {
        writeln!(
            out,
            "   {} [{}] {} approved: {} ({}){}",
            c.content_key,
            c.component_type.as_deref().unwrap_or("?"),
            c.screen_location.as_deref().unwrap_or("(none)"),
            c.approved_translations,
            if c.languages.is_empty() { "-" } else { c.languages.as_str() },
            c.app_context
                .as_deref()
                .map(|ctx| format!(" context: {ctx}"))
                .unwrap_or_default()
        )
        .ok();
    }

    let incomplete = report.incomplete();
    writeln!(out, "2. Incomplete translations ({})", incomplete.len()).ok();
    for c in &incomplete {
        writeln!(out, "   {}: {}/3 approved", c.content_key, c.approved_translations).ok();
    }

    writeln!(out, "3. Duplicate content keys ({})", report.duplicate_keys.len()).ok();
    for d in &report.duplicate_keys {
        writeln!(out, "   {} x{}: {}", d.content_key, d.count, d.locations).ok();
    }

    writeln!(out, "4. Orphaned translations: {}", report.orphaned_translations).ok();

    writeln!(out, "5. Non-approved statuses ({})", report.non_approved.len()).ok();
    for s in &report.non_approved {
        writeln!(out, "   {}: {}", s.status, s.count).ok();
    }

    let invalid = report.invalid_payloads();
    writeln!(
        out,
        "6. Option payloads: {} checked, {} invalid",
        report.payloads.len(),
        invalid.len()
    )
    .ok();
    for p in &invalid {
        writeln!(out, "   {} [{}]: {}", p.content_key, p.language_code, p.check.summary()).ok();
    }

    writeln!(out, "7. Screen distribution").ok();
    for s in &report.screens {
        writeln!(
            out,
            "   {}: {} items ({})",
            s.screen_location.as_deref().unwrap_or("(none)"),
            s.item_count,
            s.component_types
        )
        .ok();
    }

    writeln!(out, "{RULE}").ok();
    match report.total_issues() {
        0 => writeln!(out, "No issues found.").ok(),
        n => writeln!(out, "{n} issue(s) found.").ok(),
    };
    out
}
