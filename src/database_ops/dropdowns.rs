use anyhow::Result;
use serde::Serialize;
use sqlx::Row;
use tracing::{debug, info};

use super::{ScreenFilter, SCREEN_PREDICATE};
use crate::model::DROPDOWN_FAMILY;
use crate::text::dropdown::{validate_options, OptionsCheck};
use crate::util::db::Db;

#[derive(Debug, Clone, Serialize)]
pub struct DropdownComponent {
    pub id: i64,
    pub content_key: String,
    pub component_type: Option<String>,
    pub screen_location: Option<String>,
    pub app_context: Option<String>,
    pub approved_translations: i64,
    pub languages: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct DuplicateKey {
    pub content_key: String,
    pub count: i64,
    pub locations: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct StatusCount {
    pub status: String,
    pub count: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct PayloadCheck {
    pub content_key: String,
    pub screen_location: Option<String>,
    pub language_code: String,
    pub status: String,
    pub check: OptionsCheck,
}

#[derive(Debug, Clone, Serialize)]
pub struct ScreenDistribution {
    pub screen_location: Option<String>,
    pub item_count: i64,
    pub component_types: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct DropdownReport {
    pub components: Vec<DropdownComponent>,
    pub duplicate_keys: Vec<DuplicateKey>,
    pub orphaned_translations: i64,
    pub non_approved: Vec<StatusCount>,
    pub payloads: Vec<PayloadCheck>,
    pub screens: Vec<ScreenDistribution>,
}

impl DropdownReport {
    /// Components with fewer than one approved row per language.
    pub fn incomplete(&self) -> Vec<&DropdownComponent> {
        let mut out: Vec<_> = self
            .components
            .iter()
            .filter(|c| c.approved_translations < 3)
            .collect();
        out.sort_by(|a, b| {
            a.approved_translations
                .cmp(&b.approved_translations)
                .then_with(|| a.content_key.cmp(&b.content_key))
        });
        out
    }

    pub fn invalid_payloads(&self) -> Vec<&PayloadCheck> {
        self.payloads.iter().filter(|p| !p.check.is_valid()).collect()
    }

    pub fn total_issues(&self) -> usize {
        self.incomplete().len()
            + self.duplicate_keys.len()
            + usize::from(self.orphaned_translations > 0)
            + self.non_approved.len()
            + self.invalid_payloads().len()
    }
}

pub async fn build_report(db: &Db, filter: &ScreenFilter) -> Result<DropdownReport> {
    let (screen, prefix) = filter.binds();
    let family: Vec<&str> = DROPDOWN_FAMILY.to_vec();

    let has_context = db.column_exists("content_items", "app_context_id").await?
        && db.table_exists("application_contexts").await?;
    let (context_select, context_join) = if has_context {
        (
            "COALESCE(ac.context_name_en, ac.context_code)",
            "LEFT JOIN application_contexts ac ON ci.app_context_id = ac.id",
        )
    } else {
        ("NULL::TEXT", "")
    };
    debug!(has_context, "dropdown report: context join");

    let components_sql = format!(
        r#"
        SELECT
            ci.id::BIGINT AS id,
            ci.content_key,
            ci.component_type,
            ci.screen_location,
            {context_select} AS app_context,
            COUNT(ct.id)::BIGINT AS approved_translations,
            COALESCE(STRING_AGG(DISTINCT ct.language_code, ', ' ORDER BY ct.language_code), '') AS languages
        FROM content_items ci
        LEFT JOIN content_translations ct
               ON ci.id = ct.content_item_id AND ct.status::TEXT = 'approved'
        {context_join}
        WHERE ci.component_type = ANY($3)
          AND ci.is_active = TRUE
          AND {SCREEN_PREDICATE}
        GROUP BY ci.id, ci.content_key, ci.component_type, ci.screen_location, app_context
        ORDER BY ci.screen_location, ci.content_key, ci.component_type
        "#
    );
    let components = sqlx::query(&components_sql)
        .persistent(false)
        .bind(screen)
        .bind(prefix)
        .bind(&family)
        .fetch_all(&db.pool)
        .await?
        .into_iter()
        .map(|row| {
            Ok(DropdownComponent {
                id: row.try_get("id")?,
                content_key: row.try_get("content_key")?,
                component_type: row.try_get("component_type")?,
                screen_location: row.try_get("screen_location")?,
                app_context: row.try_get("app_context")?,
                approved_translations: row.try_get("approved_translations")?,
                languages: row.try_get("languages")?,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    let duplicates_sql = format!(
        r#"
        SELECT ci.content_key, COUNT(*)::BIGINT AS count,
               STRING_AGG(COALESCE(ci.screen_location, '(none)'), ', ' ORDER BY ci.screen_location) AS locations
        FROM content_items ci
        WHERE ci.is_active = TRUE
          AND {SCREEN_PREDICATE}
        GROUP BY ci.content_key
        HAVING COUNT(*) > 1
        ORDER BY count DESC, ci.content_key
        "#
    );
    let duplicate_keys = sqlx::query(&duplicates_sql)
        .persistent(false)
        .bind(screen)
        .bind(prefix)
        .fetch_all(&db.pool)
        .await?
        .into_iter()
        .map(|row| {
            Ok(DuplicateKey {
                content_key: row.try_get("content_key")?,
                count: row.try_get("count")?,
                locations: row.try_get("locations")?,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    let orphaned_translations: i64 = sqlx::query_scalar(
        "SELECT COUNT(*)::BIGINT FROM content_translations ct \
         LEFT JOIN content_items ci ON ct.content_item_id = ci.id WHERE ci.id IS NULL",
    )
    .persistent(false)
    .fetch_one(&db.pool)
    .await?;

    let non_approved_sql = format!(
        r#"
        SELECT ct.status::TEXT AS status, COUNT(*)::BIGINT AS count
        FROM content_translations ct
        JOIN content_items ci ON ct.content_item_id = ci.id
        WHERE ci.component_type = ANY($3)
          AND ci.is_active = TRUE
          AND ct.status::TEXT <> 'approved'
          AND {SCREEN_PREDICATE}
        GROUP BY ct.status
        ORDER BY ct.status
        "#
    );
    let non_approved = sqlx::query(&non_approved_sql)
        .persistent(false)
        .bind(screen)
        .bind(prefix)
        .bind(&family)
        .fetch_all(&db.pool)
        .await?
        .into_iter()
        .map(|row| {
            Ok(StatusCount {
                status: row.try_get::<Option<String>, _>("status")?.unwrap_or_else(|| "NULL".into()),
                count: row.try_get("count")?,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    // Some schemas keep options in a dedicated JSONB column; prefer it when present.
    let payload_expr = if db.column_exists("content_translations", "dropdown_options").await? {
        "COALESCE(ct.dropdown_options::TEXT, ct.content_value)"
    } else {
        "ct.content_value"
    };
    let payload_sql = format!(
        r#"
        SELECT ci.content_key, ci.screen_location, ct.language_code,
               ct.status::TEXT AS status, {payload_expr} AS payload
        FROM content_items ci
        JOIN content_translations ct ON ci.id = ct.content_item_id
        WHERE ci.component_type = 'dropdown'
          AND ci.is_active = TRUE
          AND {SCREEN_PREDICATE}
        ORDER BY ci.content_key, ct.language_code
        "#
    );
    let payloads = sqlx::query(&payload_sql)
        .persistent(false)
        .bind(screen)
        .bind(prefix)
        .fetch_all(&db.pool)
        .await?
        .into_iter()
        .map(|row| {
            let payload: Option<String> = row.try_get("payload")?;
            Ok(PayloadCheck {
                content_key: row.try_get("content_key")?,
                screen_location: row.try_get("screen_location")?,
                language_code: row.try_get("language_code")?,
                status: row.try_get::<Option<String>, _>("status")?.unwrap_or_default(),
                check: validate_options(payload.as_deref()),
            })
        })
        .collect::<Result<Vec<_>>>()?;

    let screens_sql = format!(
        r#"
        SELECT ci.screen_location, COUNT(*)::BIGINT AS item_count,
               COALESCE(STRING_AGG(DISTINCT ci.component_type, ', ' ORDER BY ci.component_type), '') AS component_types
        FROM content_items ci
        WHERE ci.is_active = TRUE
          AND {SCREEN_PREDICATE}
        GROUP BY ci.screen_location
        ORDER BY ci.screen_location
        "#
    );
    let screens = sqlx::query(&screens_sql)
        .persistent(false)
        .bind(screen)
        .bind(prefix)
        .fetch_all(&db.pool)
        .await?
        .into_iter()
        .map(|row| {
            Ok(ScreenDistribution {
                screen_location: row.try_get("screen_location")?,
                item_count: row.try_get("item_count")?,
                component_types: row.try_get("component_types")?,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    let report = DropdownReport {
        components,
        duplicate_keys,
        orphaned_translations,
        non_approved,
        payloads,
        screens,
    };
    info!(
        components = report.components.len(),
        issues = report.total_issues(),
        "dropdown report built"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn component(key: &str, approved: i64) -> DropdownComponent {
        DropdownComponent {
            id: 1,
            content_key: key.to_string(),
            component_type: Some("dropdown".to_string()),
            screen_location: Some("mortgage_step1".to_string()),
            app_context: None,
            approved_translations: approved,
            languages: String::new(),
        }
    }

    fn empty_report() -> DropdownReport {
        DropdownReport {
            components: vec![],
            duplicate_keys: vec![],
            orphaned_translations: 0,
            non_approved: vec![],
            payloads: vec![],
            screens: vec![],
        }
    }

    #[test]
    fn clean_report_has_no_issues() {
        let mut r = empty_report();
        r.components.push(component("a", 3));
        r.payloads.push(PayloadCheck {
            content_key: "a".into(),
            screen_location: None,
            language_code: "en".into(),
            status: "approved".into(),
            check: validate_options(Some(r#"[{"value":"1","label":"One"}]"#)),
        });
        assert_eq!(r.total_issues(), 0);
    }

    #[test]
    fn counts_each_issue_family() {
        let mut r = empty_report();
        r.components = vec![component("b", 1), component("a", 1), component("c", 3), component("d", 0)];
        r.orphaned_translations = 12;
        r.non_approved.push(StatusCount {
            status: "draft".into(),
            count: 4,
        });
        r.payloads.push(PayloadCheck {
            content_key: "a".into(),
            screen_location: None,
            language_code: "ru".into(),
            status: "draft".into(),
            check: validate_options(Some("[]")),
        });
        let incomplete: Vec<_> = r.incomplete().iter().map(|c| c.content_key.as_str()).collect();
        assert_eq!(incomplete, ["d", "a", "b"]);
        // 3 incomplete + orphans + 1 status + 1 payload
        assert_eq!(r.total_issues(), 6);
    }
}
