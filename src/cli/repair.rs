use std::fmt::Write as _;

use anyhow::Result;

use super::{clip, RULE};
use crate::database_ops::repair::{fill_missing, remaining_key_echo, set_translation, RepairMode};
use crate::database_ops::ScreenFilter;
use crate::model::{Language, TranslationStatus};
use crate::util::db::Db;

#[derive(Debug, Clone, Default)]
pub struct RepairConfig {
    pub database_url: Option<String>,
    pub filter: ScreenFilter,
    pub mode: RepairMode,
    pub dry_run: bool,
    /// Planned writes to echo before the summary.
    pub show: usize,
}

pub async fn run(cfg: RepairConfig) -> Result<()> {
    let db = Db::from_env(cfg.database_url.clone()).await?;
    let res = repair(&db, &cfg).await;
    db.close().await;
    res
}

async fn repair(db: &Db, cfg: &RepairConfig) -> Result<()> {
    let (plan, summary) = fill_missing(db, &cfg.filter, cfg.mode, cfg.dry_run).await?;

    let mut out = String::new();
    let verb = if cfg.dry_run { "Would write" } else { "Wrote" };
    writeln!(out, "Repairing translations for {}", cfg.filter.describe()).ok();
    writeln!(out, "{RULE}").ok();
    for w in plan.iter().take(cfg.show) {
        let action = if w.overwrite { "replace" } else { "add" };
        let source = w.copied_from.map(|l| format!(" from {l}")).unwrap_or_default();
        writeln!(
            out,
            "  {action} {} [{}] {} = \"{}\" ({}{source})",
            w.content_key,
            w.screen_location,
            w.language,
            clip(&w.value, 60),
            w.status
        )
        .ok();
    }
    if plan.len() > cfg.show {
        writeln!(out, "  ... and {} more", plan.len() - cfg.show).ok();
    }
    writeln!(
        out,
        "{verb} {} translations for {} items (ru {}, he {}, en {})",
        summary.total_writes(),
        summary.items,
        summary.writes.ru,
        summary.writes.he,
        summary.writes.en
    )
    .ok();

    if !cfg.dry_run {
        let remaining = remaining_key_echo(db, &cfg.filter).await?;
        if remaining.is_empty() {
            writeln!(out, "No values equal to their content key remain.").ok();
        } else {
            writeln!(out, "Screens still showing raw keys:").ok();
            for r in &remaining {
                writeln!(
                    out,
                    "  {}: ru {}, he {}, en {} of {} items",
                    r.screen_location.as_deref().unwrap_or("(none)"),
                    r.echo.ru,
                    r.echo.he,
                    r.echo.en,
                    r.total_items
                )
                .ok();
            }
        }
    }
    print!("{out}");
    Ok(())
}

#[derive(Debug, Clone)]
pub struct SetTranslationConfig {
    pub database_url: Option<String>,
    pub content_key: String,
    pub language: Language,
    pub value: String,
    pub status: TranslationStatus,
}

pub async fn run_set(cfg: SetTranslationConfig) -> Result<()> {
    let db = Db::from_env(cfg.database_url.clone()).await?;
    let res = set_translation(&db, &cfg.content_key, cfg.language, &cfg.value, &cfg.status).await;
    db.close().await;
    let item_id = res?;
    println!(
        "Set {} [{}] on item {item_id} ({})",
        cfg.content_key, cfg.language, cfg.status
    );
    Ok(())
}
