use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use serde::Serialize;
use tracing::info;

use crate::util::db::{finish_tx, Db};

#[derive(Debug, Clone, Serialize)]
pub struct ScriptRun {
    pub path: PathBuf,
    pub bytes: usize,
    pub rows_affected: u64,
}

/// Read a content script; empty files and statements that cannot run inside a
/// transaction are rejected up front.
pub fn load_script(path: &Path) -> Result<String> {
    let sql = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    if sql.trim().is_empty() {
        bail!("{} is empty", path.display());
    }
    let lowered = sql.to_lowercase();
    for forbidden in ["create index concurrently", "vacuum"] {
        if lowered.lines().any(|l| l.trim_start().starts_with(forbidden)) {
            bail!("{} contains '{forbidden}', which cannot run inside a transaction", path.display());
        }
    }
    Ok(sql)
}

/// Run SQL files in the given order inside a single transaction. On a dry run
/// everything executes and is then rolled back.
pub async fn apply_sql_files(db: &Db, paths: &[PathBuf], dry_run: bool) -> Result<Vec<ScriptRun>> {
    let scripts = paths
        .iter()
        .map(|p| load_script(p).map(|sql| (p.clone(), sql)))
        .collect::<Result<Vec<_>>>()?;

    let mut tx = db.begin().await?;
    let outcome: Result<Vec<ScriptRun>> = async {
        let mut runs = Vec::with_capacity(scripts.len());
        for (path, sql) in &scripts {
            info!(file = %path.display(), "applying content script");
            let res = sqlx::raw_sql(sql)
                .execute(&mut *tx)
                .await
                .with_context(|| format!("executing {}", path.display()))?;
            runs.push(ScriptRun {
                path: path.clone(),
                bytes: sql.len(),
                rows_affected: res.rows_affected(),
            });
        }
        Ok(runs)
    }
    .await;
    let runs = finish_tx(tx, outcome, dry_run).await?;
    info!(files = runs.len(), dry_run, "content scripts finished");
    Ok(runs)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_file(name: &str, body: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("content_maint_script_{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join(name);
        fs::write(&path, body).unwrap();
        path
    }

    #[test]
    fn loads_plain_scripts() {
        let path = temp_file("ok.sql", "INSERT INTO content_items (content_key) VALUES ('a');\n");
        assert!(load_script(&path).unwrap().contains("INSERT"));
    }

    #[test]
    fn rejects_empty_and_non_transactional_scripts() {
        let empty = temp_file("empty.sql", "  \n");
        assert!(load_script(&empty).is_err());

        let idx = temp_file(
            "idx.sql",
            "SELECT 1;\n  CREATE INDEX CONCURRENTLY idx_ci_key ON content_items (content_key);\n",
        );
        let err = load_script(&idx).unwrap_err().to_string();
        assert!(err.contains("create index concurrently"), "{err}");

        assert!(load_script(Path::new("/definitely/not/here.sql")).is_err());
    }
}
