use anyhow::{bail, ensure, Context, Result};
use serde::Serialize;
use sqlx::PgConnection;
use tracing::info;

use crate::model::{ApplicationContext, NavigationMapping};
use crate::util::db::{finish_tx, Db};

/// Holding value used while two rows exchange screens.
pub const TEMP_SWAP_LOCATION: &str = "temp_swap_location";

const MAPPING_SELECT: &str = r#"
    SELECT
        nm.confluence_num::TEXT AS confluence_num,
        nm.confluence_title_ru,
        nm.confluence_title_he,
        nm.confluence_title_en,
        nm.screen_location,
        nm.parent_section::TEXT AS parent_section,
        nm.sort_order::INT4 AS sort_order,
        nm.is_active,
        (SELECT COUNT(*) FROM content_items ci
          WHERE ci.screen_location = nm.screen_location AND ci.is_active = TRUE)::BIGINT AS content_count
    FROM navigation_mapping nm
"#;

pub async fn list_mappings(db: &Db, parent_section: Option<&str>) -> Result<Vec<NavigationMapping>> {
    let sql = format!(
        "{MAPPING_SELECT} WHERE ($1::TEXT IS NULL OR nm.parent_section::TEXT = $1) \
         ORDER BY nm.parent_section, nm.sort_order, nm.confluence_num"
    );
    let rows = sqlx::query_as::<_, NavigationMapping>(&sql)
        .persistent(false)
        .bind(parent_section)
        .fetch_all(&db.pool)
        .await?;
    Ok(rows)
}

async fn mappings_for(
    conn: &mut PgConnection,
    parent_section: &str,
    nums: &[&str],
) -> Result<Vec<NavigationMapping>> {
    let sql = format!(
        "{MAPPING_SELECT} WHERE nm.parent_section::TEXT = $1 AND nm.confluence_num::TEXT = ANY($2) \
         ORDER BY nm.confluence_num"
    );
    let rows = sqlx::query_as::<_, NavigationMapping>(&sql)
        .persistent(false)
        .bind(parent_section)
        .bind(nums)
        .fetch_all(conn)
        .await?;
    Ok(rows)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SwapPlan {
    pub parent_section: String,
    pub num_a: String,
    pub num_b: String,
    /// Screen that `num_a` will point at afterwards (currently on `num_b`).
    pub new_screen_a: String,
    pub new_screen_b: String,
}

/// Check both rows exist exactly once and carry screens worth swapping.
pub fn plan_swap(parent_section: &str, num_a: &str, num_b: &str, rows: &[NavigationMapping]) -> Result<SwapPlan> {
    ensure!(num_a != num_b, "cannot swap confluence #{num_a} with itself");
    let find = |num: &str| -> Result<String> {
        let matches: Vec<_> = rows.iter().filter(|r| r.confluence_num == num).collect();
        match matches.as_slice() {
            [] => bail!("no navigation_mapping row for #{num} in section {parent_section}"),
            [row] => row
                .screen_location
                .clone()
                .filter(|s| !s.is_empty())
                .with_context(|| format!("navigation_mapping #{num} has no screen_location")),
            _ => bail!("confluence #{num} appears {} times in section {parent_section}", matches.len()),
        }
    };
    let screen_a = find(num_a)?;
    let screen_b = find(num_b)?;
    ensure!(screen_a != screen_b, "#{num_a} and #{num_b} already share screen '{screen_a}'");
    Ok(SwapPlan {
        parent_section: parent_section.to_string(),
        num_a: num_a.to_string(),
        num_b: num_b.to_string(),
        new_screen_a: screen_b,
        new_screen_b: screen_a,
    })
}

async fn update_screen(conn: &mut PgConnection, parent_section: &str, num: &str, screen: &str) -> Result<()> {
    let res = sqlx::query(
        "UPDATE navigation_mapping SET screen_location = $1 \
         WHERE confluence_num::TEXT = $2 AND parent_section::TEXT = $3",
    )
    .persistent(false)
    .bind(screen)
    .bind(num)
    .bind(parent_section)
    .execute(conn)
    .await?;
    ensure!(
        res.rows_affected() == 1,
        "expected 1 row for #{num} in section {parent_section}, updated {}",
        res.rows_affected()
    );
    Ok(())
}

/// Exchange the screens of two rows. Returns the (before, after) snapshots.
pub async fn swap_screens(
    db: &Db,
    parent_section: &str,
    num_a: &str,
    num_b: &str,
    dry_run: bool,
) -> Result<(Vec<NavigationMapping>, Vec<NavigationMapping>)> {
    let mut tx = db.begin().await?;
    let outcome: Result<_> = async {
        let before = mappings_for(&mut tx, parent_section, &[num_a, num_b]).await?;
        let plan = plan_swap(parent_section, num_a, num_b, &before)?;
        update_screen(&mut tx, parent_section, num_b, TEMP_SWAP_LOCATION).await?;
        update_screen(&mut tx, parent_section, num_a, &plan.new_screen_a).await?;
        update_screen(&mut tx, parent_section, num_b, &plan.new_screen_b).await?;
        let after = mappings_for(&mut tx, parent_section, &[num_a, num_b]).await?;
        Ok((before, after))
    }
    .await;
    let snapshots = finish_tx(tx, outcome, dry_run).await?;
    info!(parent_section, num_a, num_b, dry_run, "screen swap finished");
    Ok(snapshots)
}

/// Point one row at a different screen.
pub async fn set_screen(db: &Db, parent_section: &str, num: &str, screen: &str, dry_run: bool) -> Result<NavigationMapping> {
    ensure!(!screen.trim().is_empty(), "screen_location must not be empty");
    let mut tx = db.begin().await?;
    let outcome: Result<_> = async {
        update_screen(&mut tx, parent_section, num, screen).await?;
        let mut rows = mappings_for(&mut tx, parent_section, &[num]).await?;
        rows.pop().context("row vanished after update")
    }
    .await;
    finish_tx(tx, outcome, dry_run).await
}

fn contexts_sql(with_counts: bool) -> String {
    let (count, join) = if with_counts {
        (
            "COALESCE(n.items, 0)::BIGINT",
            "LEFT JOIN (SELECT app_context_id, COUNT(*) AS items FROM content_items \
             WHERE is_active = TRUE GROUP BY app_context_id) n ON n.app_context_id = ac.id",
        )
    } else {
        ("NULL::BIGINT", "")
    };
    format!(
        "SELECT ac.id::BIGINT AS id, ac.context_code, ac.context_name_ru, ac.context_name_he, \
         ac.context_name_en, {count} AS item_count \
         FROM application_contexts ac {join} ORDER BY ac.id"
    )
}

/// Application contexts with the number of active items in each. Counts are
/// `None` when `content_items` has no `app_context_id` column.
pub async fn list_contexts(db: &Db) -> Result<Vec<ApplicationContext>> {
    let with_counts = db.column_exists("content_items", "app_context_id").await?;
    if !with_counts {
        info!("content_items.app_context_id absent; context item counts unavailable");
    }
    let rows = sqlx::query_as::<_, ApplicationContext>(&contexts_sql(with_counts))
        .persistent(false)
        .fetch_all(&db.pool)
        .await?;
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(num: &str, screen: Option<&str>) -> NavigationMapping {
        NavigationMapping {
            confluence_num: num.to_string(),
            confluence_title_ru: None,
            confluence_title_he: None,
            confluence_title_en: None,
            screen_location: screen.map(str::to_string),
            parent_section: Some("3.1".to_string()),
            sort_order: None,
            is_active: Some(true),
            content_count: 0,
        }
    }

    #[test]
    fn context_counts_group_by_context() {
        let sql = contexts_sql(true);
        assert!(sql.contains("GROUP BY app_context_id"));
        assert!(sql.contains("COALESCE(n.items, 0)::BIGINT AS item_count"));
        let bare = contexts_sql(false);
        assert!(bare.contains("NULL::BIGINT AS item_count"));
        assert!(!bare.contains("content_items"));
    }

    #[test]
    fn plans_a_swap() {
        let rows = vec![
            row("5", Some("mortgage_step3")),
            row("6", Some("borrowers_personal_data_step1")),
        ];
        let plan = plan_swap("3.1", "5", "6", &rows).unwrap();
        assert_eq!(plan.new_screen_a, "borrowers_personal_data_step1");
        assert_eq!(plan.new_screen_b, "mortgage_step3");
    }

    #[test]
    fn rejects_missing_duplicate_or_identical_rows() {
        let rows = vec![row("5", Some("a"))];
        assert!(plan_swap("3.1", "5", "6", &rows).is_err());
        assert!(plan_swap("3.1", "5", "5", &rows).is_err());

        let dup = vec![row("5", Some("a")), row("5", Some("b")), row("6", Some("c"))];
        let err = plan_swap("3.1", "5", "6", &dup).unwrap_err().to_string();
        assert!(err.contains("appears 2 times"), "{err}");

        let same = vec![row("5", Some("a")), row("6", Some("a"))];
        assert!(plan_swap("3.1", "5", "6", &same).is_err());

        let blank = vec![row("5", None), row("6", Some("a"))];
        assert!(plan_swap("3.1", "5", "6", &blank).is_err());
    }
}
