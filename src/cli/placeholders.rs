use std::fmt::Write as _;

use anyhow::Result;
use indexmap::IndexMap;

use super::{clip, RULE};
use crate::database_ops::coverage::screen_summary;
use crate::database_ops::placeholders::{find_filler, purge, FillerScope};
use crate::database_ops::ScreenFilter;
use crate::util::db::Db;

#[derive(Debug, Clone, Default)]
pub struct PlaceholdersConfig {
    pub database_url: Option<String>,
    pub filter: ScreenFilter,
    pub scope: FillerScope,
    /// Delete the matched rows.
    pub purge: bool,
    pub dry_run: bool,
    /// Example rows to print.
    pub show: usize,
}

pub async fn run(cfg: PlaceholdersConfig) -> Result<()> {
    let db = Db::from_env(cfg.database_url.clone()).await?;
    let res = scan(&db, &cfg).await;
    db.close().await;
    res
}

async fn scan(db: &Db, cfg: &PlaceholdersConfig) -> Result<()> {
    let rows = find_filler(db, &cfg.filter, cfg.scope).await?;

    let mut out = String::new();
    writeln!(out, "Filler translations in {}", cfg.filter.describe()).ok();
    writeln!(out, "{RULE}").ok();
    if rows.is_empty() {
        writeln!(out, "None found.").ok();
        print!("{out}");
        return Ok(());
    }

    let mut per_screen: IndexMap<&str, usize> = IndexMap::new();
    for r in &rows {
        *per_screen
            .entry(r.screen_location.as_deref().unwrap_or("(none)"))
            .or_default() += 1;
    }
    for (screen, n) in &per_screen {
        writeln!(out, "  {screen}: {n}").ok();
    }
    writeln!(out, "Examples:").ok();
    for r in rows.iter().take(cfg.show) {
        writeln!(
            out,
            "  {} [{}] \"{}\" ({})",
            r.content_key,
            r.language_code,
            clip(r.content_value.as_deref().unwrap_or(""), 60),
            r.quality.label()
        )
        .ok();
    }
    writeln!(out, "Total: {} rows on {} screens", rows.len(), per_screen.len()).ok();

    if cfg.purge {
        let deleted = purge(db, &rows, cfg.dry_run).await?;
        if cfg.dry_run {
            writeln!(out, "Dry run: {deleted} rows would be deleted (rolled back).").ok();
        } else {
            writeln!(out, "Deleted {deleted} rows.").ok();
            writeln!(out, "Coverage after purge:").ok();
            for s in screen_summary(db, &cfg.filter).await? {
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
    } else {
        writeln!(out, "Re-run with --purge to delete them.").ok();
    }
    print!("{out}");
    Ok(())
}
