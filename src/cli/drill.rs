use std::fmt::Write as _;

use anyhow::Result;
use serde::Serialize;

use super::{clip, print_json, RULE};
use crate::database_ops::drill::{drill_content, DrillItem, DrillStats};
use crate::model::Language;
use crate::util::db::Db;

#[derive(Debug, Clone)]
pub struct DrillConfig {
    pub database_url: Option<String>,
    pub screen_location: String,
    pub language: Language,
    pub json: bool,
}

#[derive(Debug, Serialize)]
struct DrillPage<'a> {
    screen_location: &'a str,
    language: Language,
    stats: &'a DrillStats,
    actions: &'a [DrillItem],
}

pub async fn run(cfg: DrillConfig) -> Result<()> {
    let db = Db::from_env(cfg.database_url.clone()).await?;
    let res = drill_content(&db, &cfg.screen_location, cfg.language).await;
    db.close().await;
    let items = res?;
    let stats = DrillStats::from_items(&items);

    if cfg.json {
        return print_json(&DrillPage {
            screen_location: &cfg.screen_location,
            language: cfg.language,
            stats: &stats,
            actions: &items,
        });
    }

    let mut out = String::new();
    writeln!(
        out,
        "Drill: {} ({})",
        cfg.screen_location,
        cfg.language.display_name()
    )
    .ok();
    writeln!(out, "{RULE}").ok();
    for (idx, item) in items.iter().enumerate() {
        let marker = match (item.has_translation, item.fallback_used) {
            (true, _) => "✅",
            (false, true) => "↩️",
            (false, false) => "❌",
        };
        writeln!(
            out,
            "{:>3}. {marker} {} [{}] {}",
            idx + 1,
            item.content_key,
            item.component_type.as_deref().unwrap_or("?"),
            clip(item.value.as_deref().unwrap_or("(missing)"), 70)
        )
        .ok();
    }
    writeln!(out, "{RULE}").ok();
    writeln!(
        out,
        "{} actions ({} visible, {} options)",
        stats.total,
        stats.visible_actions(),
        stats.options
    )
    .ok();
    writeln!(
        out,
        "translated: {} ({}%), english fallback: {} ({}%), missing: {}",
        stats.with_translation,
        stats.translation_coverage,
        stats.using_fallback,
        stats.fallback_coverage,
        stats.missing
    )
    .ok();
    print!("{out}");
    Ok(())
}
