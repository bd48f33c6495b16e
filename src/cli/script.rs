use std::fmt::Write as _;
use std::path::PathBuf;

use anyhow::Result;

use super::{clip, or_na, RULE};
use crate::database_ops::drill::drill_content;
use crate::database_ops::navigation::list_mappings;
use crate::database_ops::script::apply_sql_files;
use crate::model::Language;
use crate::util::db::Db;

const SAMPLE_ITEMS: usize = 5;

#[derive(Debug, Clone)]
pub struct ApplySqlConfig {
    pub database_url: Option<String>,
    pub files: Vec<PathBuf>,
    /// Navigation section whose content counts are printed afterwards.
    pub section: String,
    /// Screen to sample after applying.
    pub show_screen: Option<String>,
    pub dry_run: bool,
}

pub async fn run(cfg: ApplySqlConfig) -> Result<()> {
    let db = Db::from_env(cfg.database_url.clone()).await?;
    let res = apply(&db, &cfg).await;
    db.close().await;
    res
}

async fn apply(db: &Db, cfg: &ApplySqlConfig) -> Result<()> {
    let runs = apply_sql_files(db, &cfg.files, cfg.dry_run).await?;

    let mut out = String::new();
    for r in &runs {
        writeln!(
            out,
            "{} {} ({} bytes, {} rows affected)",
            if cfg.dry_run { "Checked" } else { "Applied" },
            r.path.display(),
            r.bytes,
            r.rows_affected
        )
        .ok();
    }
    if cfg.dry_run {
        writeln!(out, "Dry run: all changes rolled back.").ok();
    }

    writeln!(out, "\nContent counts for section {}:", cfg.section).ok();
    writeln!(out, "{RULE}").ok();
    for m in list_mappings(db, Some(&cfg.section)).await? {
        writeln!(out, "  {}. {}", m.confluence_num, or_na(m.confluence_title_ru.as_deref())).ok();
        writeln!(out, "     Screen: {}", or_na(m.screen_location.as_deref())).ok();
        writeln!(out, "     Content items: {}", m.content_count).ok();
    }

    if let Some(screen) = &cfg.show_screen {
        writeln!(out, "\nSample content for {screen}:").ok();
        writeln!(out, "{RULE}").ok();
        let items = drill_content(db, screen, Language::Ru).await?;
        for item in items.iter().take(SAMPLE_ITEMS) {
            writeln!(
                out,
                "  {} ({})",
                item.content_key,
                item.component_type.as_deref().unwrap_or("?")
            )
            .ok();
            writeln!(out, "     RU: {}", clip(or_na(item.values.ru.as_deref()), 70)).ok();
        }
    }
    print!("{out}");
    Ok(())
}
