use std::fmt::Write as _;

use anyhow::Result;

use super::{clip, RULE};
use crate::database_ops::copy::{copy_matching, IDENTICAL_FIELDS};
use crate::database_ops::coverage::screen_summary;
use crate::database_ops::ScreenFilter;
use crate::util::db::Db;

#[derive(Debug, Clone)]
pub struct CopyConfig {
    pub database_url: Option<String>,
    pub from_prefix: String,
    pub to_prefix: String,
    /// Overrides the built-in list of identical field names.
    pub fields: Option<Vec<String>>,
    pub dry_run: bool,
    pub show: usize,
}

pub async fn run(cfg: CopyConfig) -> Result<()> {
    let db = Db::from_env(cfg.database_url.clone()).await?;
    let res = copy(&db, &cfg).await;
    db.close().await;
    res
}

async fn copy(db: &Db, cfg: &CopyConfig) -> Result<()> {
    let fields: Vec<&str> = match &cfg.fields {
        Some(list) => list.iter().map(String::as_str).collect(),
        None => IDENTICAL_FIELDS.to_vec(),
    };
    let outcome = copy_matching(db, &cfg.from_prefix, &cfg.to_prefix, &fields, cfg.dry_run).await?;

    let mut out = String::new();
    writeln!(
        out,
        "Copying identical fields from '{}*' to '{}*'",
        cfg.from_prefix, cfg.to_prefix
    )
    .ok();
    writeln!(out, "{RULE}").ok();
    if outcome.planned.is_empty() {
        writeln!(out, "No identical field matches found.").ok();
        print!("{out}");
        return Ok(());
    }
    for w in outcome.planned.iter().take(cfg.show) {
        writeln!(
            out,
            "  {} <- {} [{}] \"{}\"",
            w.target_key,
            w.source_key,
            w.language,
            clip(&w.value, 50)
        )
        .ok();
    }
    if outcome.planned.len() > cfg.show {
        writeln!(out, "  ... and {} more", outcome.planned.len() - cfg.show).ok();
    }
    writeln!(
        out,
        "{} items, {} translations planned, {} inserted{}",
        outcome.items(),
        outcome.planned.len(),
        outcome.inserted,
        if cfg.dry_run { " (dry run, rolled back)" } else { "" }
    )
    .ok();

    if !cfg.dry_run {
        writeln!(out, "Coverage for '{}*':", cfg.to_prefix).ok();
        for s in screen_summary(db, &ScreenFilter::prefix(cfg.to_prefix.clone())).await? {
            writeln!(
                out,
                "  {} {}: {}/{} items ({}%)",
                s.badge(),
                s.screen_location,
                s.items_with_translations,
                s.total_items,
                s.coverage_percent()
            )
            .ok();
        }
    }
    print!("{out}");
    Ok(())
}
