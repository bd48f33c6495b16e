use std::fmt::Write as _;

use anyhow::Result;
use tracing::warn;

use super::{or_na, RULE};
use crate::database_ops::navigation::{list_contexts, list_mappings, set_screen, swap_screens};
use crate::model::{Language, NavigationMapping};
use crate::util::db::{is_undefined_table_error, Db};

#[derive(Debug, Clone)]
pub enum NavAction {
    List {
        parent_section: Option<String>,
    },
    Swap {
        parent_section: String,
        num_a: String,
        num_b: String,
        dry_run: bool,
    },
    Set {
        parent_section: String,
        num: String,
        screen_location: String,
        dry_run: bool,
    },
    Contexts,
}

#[derive(Debug, Clone)]
pub struct NavigationConfig {
    pub database_url: Option<String>,
    pub action: NavAction,
}

pub async fn run(cfg: NavigationConfig) -> Result<()> {
    let db = Db::from_env(cfg.database_url.clone()).await?;
    let res = dispatch(&db, &cfg.action).await;
    db.close().await;
    res
}

async fn dispatch(db: &Db, action: &NavAction) -> Result<()> {
    let mut out = String::new();
    match action {
        NavAction::List { parent_section } => {
            let rows = list_mappings(db, parent_section.as_deref()).await?;
            writeln!(
                out,
                "Navigation mapping ({})",
                parent_section.as_deref().unwrap_or("all sections")
            )
            .ok();
            writeln!(out, "{RULE}").ok();
            write_rows(&mut out, &rows);
            let empty = rows.iter().filter(|r| r.content_count == 0).count();
            writeln!(out, "{} rows, {empty} pointing at screens without content", rows.len()).ok();
        }
        NavAction::Swap {
            parent_section,
            num_a,
            num_b,
            dry_run,
        } => {
            let (before, after) = swap_screens(db, parent_section, num_a, num_b, *dry_run).await?;
            writeln!(out, "BEFORE").ok();
            write_rows(&mut out, &before);
            writeln!(out, "AFTER{}", if *dry_run { " (dry run, rolled back)" } else { "" }).ok();
            write_rows(&mut out, &after);
        }
        NavAction::Set {
            parent_section,
            num,
            screen_location,
            dry_run,
        } => {
            let row = set_screen(db, parent_section, num, screen_location, *dry_run).await?;
            writeln!(
                out,
                "#{num} in {parent_section} now points at {}{}",
                or_na(row.screen_location.as_deref()),
                if *dry_run { " (dry run, rolled back)" } else { "" }
            )
            .ok();
            write_rows(&mut out, std::slice::from_ref(&row));
        }
        NavAction::Contexts => match list_contexts(db).await {
            Ok(contexts) => {
                writeln!(out, "Application contexts").ok();
                writeln!(out, "{RULE}").ok();
                for c in &contexts {
                    let items = c.item_count.map_or_else(|| "n/a".to_string(), |n| n.to_string());
                    writeln!(
                        out,
                        "  {} {}: {} / {} / {} ({items} items)",
                        c.id,
                        c.context_code,
                        or_na(c.name(Language::En)),
                        or_na(c.name(Language::He)),
                        or_na(c.name(Language::Ru))
                    )
                    .ok();
                }
            }
            Err(e) if e.downcast_ref::<sqlx::Error>().is_some_and(is_undefined_table_error) => {
                warn!("application_contexts table is missing");
                writeln!(out, "application_contexts does not exist in this database.").ok();
            }
            Err(e) => return Err(e),
        },
    }
    print!("{out}");
    Ok(())
}

fn write_rows(out: &mut String, rows: &[NavigationMapping]) {
    for r in rows {
        let flag = if r.content_count == 0 { "  <- no content" } else { "" };
        writeln!(
            out,
            "  {}. {} / {}",
            r.confluence_num,
            or_na(r.confluence_title_ru.as_deref()),
            or_na(r.confluence_title_en.as_deref())
        )
        .ok();
        writeln!(
            out,
            "     screen: {} (items: {}){flag}",
            or_na(r.screen_location.as_deref()),
            r.content_count
        )
        .ok();
    }
}
