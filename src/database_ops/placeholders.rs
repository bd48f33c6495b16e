use anyhow::Result;
use serde::Serialize;
use sqlx::Row;
use tracing::info;

use super::{ScreenFilter, SCREEN_PREDICATE};
use crate::text::placeholder::{classify, TextQuality, SQL_GENERATED_BARE, SQL_GENERATED_LIKE};
use crate::util::db::{finish_tx, Db};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FillerScope {
    /// Only auto-generated "- Item N" rows, matched server-side.
    #[default]
    Generated,
    /// Every row the text classifier considers filler.
    Any,
}

#[derive(Debug, Clone, Serialize)]
pub struct FillerTranslation {
    pub translation_id: i64,
    pub content_item_id: i64,
    pub content_key: String,
    pub screen_location: Option<String>,
    pub language_code: String,
    pub content_value: Option<String>,
    pub quality: TextQuality,
}

/// `$3` toggles the generated-only filter. Matching is case-insensitive to
/// agree with the client-side classifier.
const GENERATED_CLAUSE: &str = "(NOT $3 OR ct.content_value ILIKE ANY($4) OR ct.content_value ~* $5)";

pub async fn find_filler(db: &Db, filter: &ScreenFilter, scope: FillerScope) -> Result<Vec<FillerTranslation>> {
    let (screen, prefix) = filter.binds();
    let generated_only = scope == FillerScope::Generated;
    let sql = format!(
        r#"
        SELECT
            ct.id::BIGINT AS translation_id,
            ci.id::BIGINT AS content_item_id,
            ci.content_key,
            ci.screen_location,
            ct.language_code,
            ct.content_value
        FROM content_translations ct
        JOIN content_items ci ON ct.content_item_id = ci.id
        WHERE ci.is_active = TRUE
          AND {SCREEN_PREDICATE}
          AND {GENERATED_CLAUSE}
        ORDER BY ci.screen_location, ci.content_key, ct.language_code
        "#
    );
    let rows = sqlx::query(&sql)
        .persistent(false)
        .bind(screen)
        .bind(prefix)
        .bind(generated_only)
        .bind(&SQL_GENERATED_LIKE[..])
        .bind(SQL_GENERATED_BARE)
        .fetch_all(&db.pool)
        .await?;

    let mut out = Vec::new();
    for row in rows {
        let content_key: String = row.try_get("content_key")?;
        let content_value: Option<String> = row.try_get("content_value")?;
        let quality = classify(content_value.as_deref(), Some(&content_key));
        let keep = match scope {
            FillerScope::Generated => true,
            FillerScope::Any => quality.is_filler(),
        };
        if !keep {
            continue;
        }
        out.push(FillerTranslation {
            translation_id: row.try_get("translation_id")?,
            content_item_id: row.try_get("content_item_id")?,
            content_key,
            screen_location: row.try_get("screen_location")?,
            language_code: row.try_get("language_code")?,
            content_value,
            quality,
        });
    }
    info!(found = out.len(), scope = ?scope, filter = %filter.describe(), "filler scan done");
    Ok(out)
}

/// Delete the given translation rows in one transaction. Returns rows removed
/// (or that would be removed, on a dry run).
pub async fn purge(db: &Db, rows: &[FillerTranslation], dry_run: bool) -> Result<u64> {
    if rows.is_empty() {
        return Ok(0);
    }
    let ids: Vec<i64> = rows.iter().map(|r| r.translation_id).collect();
    let mut tx = db.begin().await?;
    let outcome = sqlx::query("DELETE FROM content_translations WHERE id = ANY($1)")
        .persistent(false)
        .bind(&ids)
        .execute(&mut *tx)
        .await
        .map(|r| r.rows_affected())
        .map_err(anyhow::Error::from);
    let deleted = finish_tx(tx, outcome, dry_run).await?;
    info!(deleted, dry_run, "filler purge finished");
    Ok(deleted)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_scan_ignores_case() {
        assert!(GENERATED_CLAUSE.contains("ILIKE ANY($4)"));
        assert!(GENERATED_CLAUSE.contains("~* $5"));
    }
}
