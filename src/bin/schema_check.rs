use anyhow::Result;
use content_maint::tracing::{init_tracing, DEFAULT_FILTER};
use content_maint::util::db::Db;
use content_maint::util::env;
use sqlx::Row;

/// Tables the maintenance commands touch, with the columns they rely on.
/// Columns marked optional are probed at runtime and only reported.
const EXPECTED: &[(&str, &[&str], &[&str])] = &[
    (
        "content_items",
        &[
            "id",
            "content_key",
            "component_type",
            "category",
            "screen_location",
            "page_number",
            "description",
            "is_active",
        ],
        &["app_context_id"],
    ),
    (
        "content_translations",
        &["id", "content_item_id", "language_code", "content_value", "status", "updated_at"],
        &["dropdown_options"],
    ),
    (
        "navigation_mapping",
        &[
            "confluence_num",
            "confluence_title_ru",
            "confluence_title_he",
            "confluence_title_en",
            "screen_location",
            "parent_section",
            "sort_order",
            "is_active",
        ],
        &[],
    ),
    (
        "application_contexts",
        &["id", "context_code"],
        &["context_name_ru", "context_name_he", "context_name_en"],
    ),
];

const OPTIONAL_TABLES: &[&str] = &["application_contexts"];

async fn table_columns(db: &Db, table: &str) -> Result<Vec<(String, String, String)>> {
    let rows = sqlx::query(
        "SELECT column_name::TEXT AS column_name, is_nullable::TEXT AS is_nullable, data_type::TEXT AS data_type \
         FROM information_schema.columns \
         WHERE table_schema = ANY (current_schemas(true)) AND table_name = $1 \
         ORDER BY ordinal_position",
    )
    .persistent(false)
    .bind(table)
    .fetch_all(&db.pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(|row| (row.get("column_name"), row.get("is_nullable"), row.get("data_type")))
        .collect())
}

fn absent<'a>(wanted: &[&'a str], present: &[&str]) -> Vec<&'a str> {
    wanted.iter().copied().filter(|c| !present.contains(c)).collect()
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing(DEFAULT_FILTER)?;
    env::bootstrap_cli("schema_check");
    let url = env::resolve_database_url(std::env::args().nth(1))?;
    let db = Db::connect(&url, 1).await?;

    let mut missing_required = 0usize;
    for (table, required, optional) in EXPECTED {
        let columns = table_columns(&db, table).await?;
        if columns.is_empty() && OPTIONAL_TABLES.contains(table) {
            println!("table {:24} absent (optional)", table);
            continue;
        }
        if columns.is_empty() {
            println!("table {:24} MISSING", table);
            missing_required += 1;
            continue;
        }
        println!("table {:24} {} columns", table, columns.len());
        for (name, nullable, dtype) in &columns {
            println!("  - {:24} {:8} {}", name, nullable, dtype);
        }
        let present: Vec<&str> = columns.iter().map(|(name, _, _)| name.as_str()).collect();
        for col in absent(required, &present) {
            println!("  ! required column {col} is missing");
            missing_required += 1;
        }
        for col in absent(optional, &present) {
            println!("  . optional column {col} absent; dependent reports degrade");
        }
    }

    let active_items: i64 = sqlx::query("SELECT COUNT(*)::BIGINT FROM content_items WHERE is_active = TRUE")
        .persistent(false)
        .fetch_one(&db.pool)
        .await?
        .try_get(0)?;
    println!("active content_items={active_items}");

    db.close().await;
    if missing_required > 0 {
        println!("schema check: {missing_required} problem(s)");
        std::process::exit(1);
    }
    println!("schema check: OK");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn required(table: &str) -> &'static [&'static str] {
        EXPECTED
            .iter()
            .find(|(t, _, _)| *t == table)
            .map(|(_, r, _)| *r)
            .unwrap()
    }

    #[test]
    fn requires_only_columns_the_commands_read() {
        let items = required("content_items");
        assert!(items.contains(&"description"));
        assert!(!items.contains(&"updated_at"));
        assert!(!required("content_translations").contains(&"created_at"));
        let nav = required("navigation_mapping");
        assert!(!nav.contains(&"id"));
        assert!(!nav.contains(&"updated_at"));
    }

    #[test]
    fn reports_absent_columns_in_declared_order() {
        let present = ["id", "content_key"];
        assert_eq!(absent(&["id", "is_active", "content_key", "category"], &present), vec!["is_active", "category"]);
    }
}
