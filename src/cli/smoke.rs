use std::fmt::Write as _;

use anyhow::Result;

use super::{or_na, RULE};
use crate::api::smoke::{all_passed, check_drill_steps, check_list_vs_drill, SmokeResult};
use crate::api::ContentApiClient;

#[derive(Debug, Clone)]
pub enum SmokeCheck {
    Drill { content_type: String, steps: Vec<String> },
    Mismatches { content_types: Vec<String> },
}

#[derive(Debug, Clone)]
pub struct SmokeConfig {
    /// Overrides `CONTENT_API_URL`.
    pub base_url: Option<String>,
    pub check: SmokeCheck,
}

/// Returns whether every check passed.
pub async fn run(cfg: SmokeConfig) -> Result<bool> {
    let client = match &cfg.base_url {
        Some(url) => ContentApiClient::new(url)?,
        None => ContentApiClient::from_env()?,
    };
    let mut out = String::new();
    writeln!(out, "Content API: {}", client.base_url()).ok();
    let mut results: Vec<SmokeResult> = Vec::new();

    match &cfg.check {
        SmokeCheck::Drill { content_type, steps } => {
            writeln!(out, "Drill endpoints for {content_type}").ok();
            writeln!(out, "{RULE}").ok();
            for r in check_drill_steps(&client, content_type, steps).await {
                writeln!(out, "Step: {}", r.step).ok();
                writeln!(out, "  Success: {}", r.success).ok();
                match &r.error {
                    Some(e) => {
                        writeln!(out, "  Error: {e}").ok();
                    }
                    None => {
                        let count = r.action_count.map(|n| n.to_string());
                        writeln!(out, "  Actions: {}", or_na(count.as_deref())).ok();
                        writeln!(out, "  Page Title: {}", or_na(r.page_title.as_deref())).ok();
                        writeln!(out, "  First Action: {}", or_na(r.first_action.as_deref())).ok();
                    }
                }
                results.push(r.to_result(content_type));
            }
        }
        SmokeCheck::Mismatches { content_types } => {
            for content_type in content_types {
                writeln!(out, "{RULE}").ok();
                writeln!(out, "Checking {}", content_type.to_uppercase()).ok();
                writeln!(out, "{RULE}").ok();
                let rows = match check_list_vs_drill(&client, content_type).await {
                    Ok(rows) => rows,
                    Err(e) => {
                        writeln!(out, "  {e:#}").ok();
                        results.push(SmokeResult {
                            name: content_type.clone(),
                            ok: false,
                            detail: format!("{e:#}"),
                        });
                        continue;
                    }
                };
                for row in &rows {
                    writeln!(out, "{}: \"{}\"", row.drill_id, row.title).ok();
                    if let Some(e) = &row.error {
                        writeln!(out, "  drill request failed: {e}").ok();
                    } else if let Some(drilled) = row.drilled {
                        let listed = row.listed.map_or_else(|| "missing".to_string(), |n| n.to_string());
                        writeln!(
                            out,
                            "  list {listed} / drill {drilled} ({} regular, {} options hidden in UI)",
                            row.visible, row.options
                        )
                        .ok();
                        if row.is_mismatch() {
                            writeln!(out, "  MISMATCH: list ({listed}) != drill ({drilled})").ok();
                        }
                        if row.ui_differs() {
                            writeln!(out, "  UI shows {} instead of {drilled}", row.visible).ok();
                        }
                    }
                    results.push(row.to_result(content_type));
                }
            }
        }
    }

    let failed = results.iter().filter(|r| !r.ok).count();
    writeln!(out, "{RULE}").ok();
    writeln!(out, "{} checks, {failed} failed", results.len()).ok();
    for r in results.iter().filter(|r| !r.ok) {
        writeln!(out, "  FAIL {}: {}", r.name, r.detail).ok();
    }
    print!("{out}");
    Ok(all_passed(&results))
}
