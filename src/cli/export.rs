use std::fmt::Write as _;
use std::path::PathBuf;

use anyhow::Result;
use chrono::Utc;

use super::RULE;
use crate::database_ops::export::{group_by_screen, items_without_translations, write_export_files};
use crate::database_ops::ScreenFilter;
use crate::util::db::Db;

#[derive(Debug, Clone)]
pub struct ExportConfig {
    pub database_url: Option<String>,
    pub filter: ScreenFilter,
    pub out_dir: PathBuf,
    /// File name prefix, e.g. `bankim`.
    pub prefix: String,
}

pub async fn run(cfg: ExportConfig) -> Result<()> {
    let db = Db::from_env(cfg.database_url.clone()).await?;
    let res = items_without_translations(&db, &cfg.filter).await;
    db.close().await;
    let items = res?;

    let mut out = String::new();
    writeln!(out, "Items needing translations in {}: {}", cfg.filter.describe(), items.len()).ok();
    if items.is_empty() {
        print!("{out}");
        return Ok(());
    }

    let (csv_path, json_path) = write_export_files(&cfg.out_dir, &cfg.prefix, &items, Utc::now())?;
    writeln!(out, "{RULE}").ok();
    for (screen, group) in group_by_screen(&items) {
        writeln!(out, "  {screen}: {} items", group.len()).ok();
    }
    writeln!(out, "{RULE}").ok();
    writeln!(out, "CSV (spreadsheet): {}", csv_path.display()).ok();
    writeln!(out, "JSON (developers): {}", json_path.display()).ok();
    print!("{out}");
    Ok(())
}
