use std::collections::HashSet;

use anyhow::Result;
use serde::Serialize;
use tracing::info;

use crate::model::Language;
use crate::util::db::{finish_tx, Db};

/// Field names whose wording is the same in every product section.
pub const IDENTICAL_FIELDS: [&str; 28] = [
    // personal data
    "first_name",
    "last_name",
    "email",
    "phone",
    "date_of_birth",
    "id_number",
    "marital_status",
    "address",
    "city",
    "postal_code",
    // income
    "monthly_income",
    "employment_status",
    "employer_name",
    "years_employed",
    // common ui
    "submit",
    "cancel",
    "next",
    "back",
    "save",
    "continue",
    "agree",
    "terms_and_conditions",
    "privacy_policy",
    // validation
    "required_field",
    "invalid_email",
    "invalid_phone",
    "field_too_short",
    "field_too_long",
];

/// Text after the first `_`, or the whole key when there is none.
pub fn field_part(content_key: &str) -> &str {
    content_key.split_once('_').map_or(content_key, |(_, rest)| rest)
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct CopyTarget {
    pub id: i64,
    pub content_key: String,
    pub screen_location: Option<String>,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct SourceTranslation {
    pub content_key: String,
    pub language_code: String,
    pub content_value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CopyWrite {
    pub content_item_id: i64,
    pub target_key: String,
    pub screen_location: Option<String>,
    pub source_key: String,
    pub field: String,
    pub language: Language,
    pub value: String,
}

/// Pair each untranslated target with source rows sharing an allowed field
/// part. The first source row per (target, language) wins.
pub fn plan_copies(targets: &[CopyTarget], sources: &[SourceTranslation], fields: &[&str]) -> Vec<CopyWrite> {
    let mut seen: HashSet<(i64, Language)> = HashSet::new();
    let mut out = Vec::new();
    for target in targets {
        let field = field_part(&target.content_key);
        if !fields.contains(&field) {
            continue;
        }
        for src in sources.iter().filter(|s| field_part(&s.content_key) == field) {
            let Ok(lang) = src.language_code.parse::<Language>() else {
                continue;
            };
            if src.content_value.is_empty() || !seen.insert((target.id, lang)) {
                continue;
            }
            out.push(CopyWrite {
                content_item_id: target.id,
                target_key: target.content_key.clone(),
                screen_location: target.screen_location.clone(),
                source_key: src.content_key.clone(),
                field: field.to_string(),
                language: lang,
                value: src.content_value.clone(),
            });
        }
    }
    out
}

async fn load_targets(db: &Db, to_prefix: &str) -> Result<Vec<CopyTarget>> {
    let rows = sqlx::query_as::<_, CopyTarget>(
        r#"
        SELECT ci.id::BIGINT AS id, ci.content_key, ci.screen_location
        FROM content_items ci
        WHERE left(ci.screen_location, length($1)) = $1
          AND ci.is_active = TRUE
          AND NOT EXISTS (SELECT 1 FROM content_translations ct WHERE ct.content_item_id = ci.id)
        ORDER BY ci.screen_location, ci.content_key
        "#,
    )
    .persistent(false)
    .bind(to_prefix)
    .fetch_all(&db.pool)
    .await?;
    Ok(rows)
}

async fn load_sources(db: &Db, from_prefix: &str) -> Result<Vec<SourceTranslation>> {
    let rows = sqlx::query_as::<_, SourceTranslation>(
        r#"
        SELECT ci.content_key, ct.language_code, ct.content_value
        FROM content_items ci
        JOIN content_translations ct ON ci.id = ct.content_item_id
        WHERE left(ci.screen_location, length($1)) = $1
          AND ci.is_active = TRUE
          AND ct.content_value IS NOT NULL
          AND ct.content_value <> ''
        ORDER BY ci.content_key, ct.language_code
        "#,
    )
    .persistent(false)
    .bind(from_prefix)
    .fetch_all(&db.pool)
    .await?;
    Ok(rows)
}

#[derive(Debug, Clone, Serialize)]
pub struct CopyOutcome {
    pub planned: Vec<CopyWrite>,
    pub inserted: u64,
    pub dry_run: bool,
}

impl CopyOutcome {
    pub fn items(&self) -> usize {
        self.planned
            .iter()
            .map(|w| w.content_item_id)
            .collect::<HashSet<_>>()
            .len()
    }
}

/// Copy translations from `from_prefix` screens to untranslated `to_prefix`
/// items as drafts. Existing rows are never overwritten.
pub async fn copy_matching(
    db: &Db,
    from_prefix: &str,
    to_prefix: &str,
    fields: &[&str],
    dry_run: bool,
) -> Result<CopyOutcome> {
    let targets = load_targets(db, to_prefix).await?;
    let sources = load_sources(db, from_prefix).await?;
    let planned = plan_copies(&targets, &sources, fields);
    info!(
        from_prefix,
        to_prefix,
        targets = targets.len(),
        sources = sources.len(),
        planned = planned.len(),
        "copy planned"
    );
    if planned.is_empty() {
        return Ok(CopyOutcome {
            planned,
            inserted: 0,
            dry_run,
        });
    }

    let mut tx = db.begin().await?;
    let outcome: Result<u64> = async {
        let mut inserted = 0;
        for w in &planned {
            let res = sqlx::query(
                "INSERT INTO content_translations (content_item_id, language_code, content_value, status) \
                 VALUES ($1, $2, $3, 'draft') \
                 ON CONFLICT (content_item_id, language_code) DO NOTHING",
            )
            .persistent(false)
            .bind(w.content_item_id)
            .bind(w.language.as_code())
            .bind(&w.value)
            .execute(&mut *tx)
            .await?;
            inserted += res.rows_affected();
        }
        Ok(inserted)
    }
    .await;
    let inserted = finish_tx(tx, outcome, dry_run).await?;
    info!(inserted, dry_run, "copy finished");
    Ok(CopyOutcome {
        planned,
        inserted,
        dry_run,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn target(id: i64, key: &str) -> CopyTarget {
        CopyTarget {
            id,
            content_key: key.to_string(),
            screen_location: Some("credit_step3".to_string()),
        }
    }

    fn source(key: &str, lang: &str, value: &str) -> SourceTranslation {
        SourceTranslation {
            content_key: key.to_string(),
            language_code: lang.to_string(),
            content_value: value.to_string(),
        }
    }

    #[test]
    fn field_part_is_after_first_underscore() {
        assert_eq!(field_part("mortgage_first_name"), "first_name");
        assert_eq!(field_part("credit_email"), "email");
        assert_eq!(field_part("plainkey"), "plainkey");
    }

    #[test]
    fn copies_only_allowed_identical_fields() {
        let targets = vec![target(1, "credit_first_name"), target(2, "credit_loan_amount")];
        let sources = vec![
            source("mortgage_first_name", "en", "First name"),
            source("mortgage_first_name", "he", "שם פרטי"),
            source("mortgage_loan_amount", "en", "Loan amount"),
        ];
        let plan = plan_copies(&targets, &sources, &IDENTICAL_FIELDS);
        assert_eq!(plan.len(), 2);
        assert!(plan.iter().all(|w| w.content_item_id == 1 && w.field == "first_name"));
        assert_eq!(plan[0].language, Language::En);
        assert_eq!(plan[1].value, "שם פרטי");
    }

    #[test]
    fn first_source_wins_per_language() {
        let targets = vec![target(1, "credit_email")];
        let sources = vec![
            source("mortgage_email", "en", "Email"),
            source("refinance_email", "en", "E-mail address"),
            source("mortgage_email", "de", "E-Mail"),
            source("mortgage_email", "ru", ""),
        ];
        let plan = plan_copies(&targets, &sources, &IDENTICAL_FIELDS);
        assert_eq!(plan.len(), 1);
        assert_eq!(plan[0].value, "Email");
        assert_eq!(plan[0].source_key, "mortgage_email");
    }
}
