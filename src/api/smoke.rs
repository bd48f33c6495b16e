//! Manual smoke checks against a running content API.
//!
//! Requests are issued one after another. A failing endpoint is recorded and
//! the run carries on, so one report covers every step.

use anyhow::{bail, Result};
use serde::Serialize;
use tracing::warn;

use super::client::ContentApiClient;
use super::models::{count_value, list_rows, DrillData};

#[derive(Debug, Clone, Serialize)]
pub struct SmokeResult {
    pub name: String,
    pub ok: bool,
    pub detail: String,
}

pub fn all_passed(results: &[SmokeResult]) -> bool {
    results.iter().all(|r| r.ok)
}

#[derive(Debug, Clone, Serialize)]
pub struct DrillStepReport {
    pub step: String,
    pub success: bool,
    pub action_count: Option<u64>,
    pub page_title: Option<String>,
    pub first_action: Option<String>,
    pub error: Option<String>,
}

impl DrillStepReport {
    pub fn to_result(&self, content_type: &str) -> SmokeResult {
        let ok = self.success && self.action_count.is_some();
        let detail = match (&self.error, self.action_count) {
            (Some(e), _) => e.clone(),
            (None, Some(n)) => format!("{n} actions"),
            (None, None) => "no actionCount and no actions".to_string(),
        };
        SmokeResult {
            name: format!("{content_type}/drill/{}", self.step),
            ok,
            detail,
        }
    }
}

fn failed_step(step: &str, error: String) -> DrillStepReport {
    DrillStepReport {
        step: step.to_string(),
        success: false,
        action_count: None,
        page_title: None,
        first_action: None,
        error: Some(error),
    }
}

pub async fn check_drill_steps(client: &ContentApiClient, content_type: &str, steps: &[String]) -> Vec<DrillStepReport> {
    let mut out = Vec::with_capacity(steps.len());
    for step in steps {
        let env = match client.drill(content_type, step).await {
            Ok(env) => env,
            Err(e) => {
                warn!(step, error = %e, "drill request failed");
                out.push(failed_step(step, format!("{e:#}")));
                continue;
            }
        };
        if !env.success {
            out.push(failed_step(step, env.error_message().to_string()));
            continue;
        }
        let Some(data) = env.data else {
            out.push(failed_step(step, "success without data".to_string()));
            continue;
        };
        match serde_json::from_value::<DrillData>(data) {
            Ok(d) => {
                let counted = d.action_count.as_ref().and_then(count_value).is_some() || !d.actions.is_empty();
                out.push(DrillStepReport {
                    step: step.clone(),
                    success: true,
                    action_count: counted.then(|| d.effective_action_count()),
                    page_title: d.page_title.clone(),
                    first_action: d.actions.first().map(|a| a.label().to_string()),
                    error: None,
                });
            }
            Err(e) => out.push(failed_step(step, format!("unexpected drill payload: {e}"))),
        }
    }
    out
}

#[derive(Debug, Clone, Serialize)]
pub struct MismatchRow {
    pub drill_id: String,
    pub title: String,
    pub listed: Option<u64>,
    pub drilled: Option<u64>,
    pub options: usize,
    pub visible: usize,
    pub error: Option<String>,
}

impl MismatchRow {
    pub fn is_mismatch(&self) -> bool {
        matches!((self.listed, self.drilled), (Some(l), Some(d)) if l != d)
    }

    /// The UI hides option rows, so it shows fewer actions than the API returns.
    pub fn ui_differs(&self) -> bool {
        self.drilled.is_some_and(|d| d != self.visible as u64)
    }

    pub fn to_result(&self, content_type: &str) -> SmokeResult {
        let name = format!("{content_type}/{}", self.drill_id);
        match (&self.error, self.drilled) {
            (Some(e), _) => SmokeResult {
                name,
                ok: false,
                detail: e.clone(),
            },
            (None, Some(d)) => match self.listed {
                Some(l) => SmokeResult {
                    name,
                    ok: l == d,
                    detail: format!("list {l} vs drill {d} ({} options hidden)", self.options),
                },
                None => SmokeResult {
                    name,
                    ok: false,
                    detail: format!("list count missing (drill {d})"),
                },
            },
            (None, None) => SmokeResult {
                name,
                ok: false,
                detail: "drill returned no count".to_string(),
            },
        }
    }
}

/// Compare each list row's `actionCount` with what its drill endpoint returns.
pub async fn check_list_vs_drill(client: &ContentApiClient, content_type: &str) -> Result<Vec<MismatchRow>> {
    let list = client.list(content_type).await?;
    if !list.success {
        bail!("{content_type} list request failed: {}", list.error_message());
    }
    let Some(rows) = list.data.as_ref().and_then(|d| list_rows(content_type, d)) else {
        bail!("{content_type} list response has no content rows");
    };

    let mut out = Vec::with_capacity(rows.len());
    for item in &rows {
        let Some(drill_id) = item.drill_id() else {
            continue;
        };
        let mut row = MismatchRow {
            drill_id: drill_id.to_string(),
            title: item.title().to_string(),
            listed: item.listed_count(),
            drilled: None,
            options: 0,
            visible: 0,
            error: None,
        };
        match client.drill(content_type, drill_id).await {
            Ok(env) if env.success => {
                match serde_json::from_value::<DrillData>(env.data.unwrap_or_default()) {
                    Ok(data) => {
                        row.drilled = Some(data.effective_action_count());
                        row.options = data.option_count();
                        row.visible = data.actions.len() - row.options;
                    }
                    Err(e) => row.error = Some(format!("unexpected drill payload: {e}")),
                }
            }
            Ok(env) => row.error = Some(env.error_message().to_string()),
            Err(e) => row.error = Some(format!("{e:#}")),
        }
        out.push(row);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Serve canned JSON bodies keyed by request path, one connection per request.
    async fn serve(routes: HashMap<&'static str, &'static str>, requests: usize) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            for _ in 0..requests {
                let (mut sock, _) = listener.accept().await.unwrap();
                let mut buf = vec![0u8; 4096];
                let n = sock.read(&mut buf).await.unwrap();
                let head = String::from_utf8_lossy(&buf[..n]).to_string();
                let path = head.split_whitespace().nth(1).unwrap_or("/").to_string();
                let (status, body) = match routes.get(path.as_str()) {
                    Some(body) => ("200 OK", *body),
                    None => ("404 Not Found", r#"{"success":false,"error":"not found"}"#),
                };
                let resp = format!(
                    "HTTP/1.1 {status}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
                    body.len()
                );
                sock.write_all(resp.as_bytes()).await.unwrap();
                sock.shutdown().await.ok();
            }
        });
        format!("http://{addr}")
    }

    #[tokio::test]
    async fn drill_steps_report_counts_and_errors() {
        let routes = HashMap::from([
            (
                "/api/content/mortgage-refi/drill/refinance_mortgage_1",
                r#"{"success":true,"data":{"pageTitle":"Step 1","actionCount":3,"actions":[{"content_key":"a"}]}}"#,
            ),
            (
                "/api/content/mortgage-refi/drill/refinance_mortgage_2",
                r#"{"success":true,"data":{"actions":[{"description":"d1"},{"description":"d2"}]}}"#,
            ),
        ]);
        let base = serve(routes, 3).await;
        let client = ContentApiClient::new(&base).unwrap();
        let steps: Vec<String> = ["refinance_mortgage_1", "refinance_mortgage_2", "refinance_mortgage_9"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let reports = check_drill_steps(&client, "mortgage-refi", &steps).await;

        assert_eq!(reports[0].action_count, Some(3));
        assert_eq!(reports[0].page_title.as_deref(), Some("Step 1"));
        assert_eq!(reports[0].first_action.as_deref(), Some("a"));
        assert_eq!(reports[1].action_count, Some(2));
        assert_eq!(reports[1].first_action.as_deref(), Some("d1"));
        assert!(!reports[2].success);
        assert_eq!(reports[2].error.as_deref(), Some("not found"));

        let results: Vec<_> = reports.iter().map(|r| r.to_result("mortgage-refi")).collect();
        assert!(results[0].ok && results[1].ok);
        assert!(!all_passed(&results));
    }

    #[tokio::test]
    async fn list_vs_drill_flags_mismatches() {
        let routes = HashMap::from([
            (
                "/api/content/mortgage",
                r#"{"success":true,"data":{"mortgage_content":[
                    {"content_key":"mortgage_step1","actionCount":"3"},
                    {"content_key":"mortgage_step2","action_count":2}
                ]}}"#,
            ),
            (
                "/api/content/mortgage/drill/mortgage_step1",
                r#"{"success":true,"data":{"actionCount":3,"actions":[
                    {"component_type":"dropdown"},{"component_type":"option"},{"component_type":"option"}
                ]}}"#,
            ),
            (
                "/api/content/mortgage/drill/mortgage_step2",
                r#"{"success":true,"data":{"actionCount":5,"actions":[]}}"#,
            ),
        ]);
        let base = serve(routes, 3).await;
        let client = ContentApiClient::new(&base).unwrap();
        let rows = check_list_vs_drill(&client, "mortgage").await.unwrap();

        assert_eq!(rows.len(), 2);
        assert!(!rows[0].is_mismatch());
        assert_eq!(rows[0].options, 2);
        assert_eq!(rows[0].visible, 1);
        assert!(rows[0].ui_differs());
        assert!(rows[1].is_mismatch());
        assert!(!rows[1].to_result("mortgage").ok);
    }

    #[tokio::test]
    async fn list_row_without_count_fails() {
        let routes = HashMap::from([
            (
                "/api/content/mortgage",
                r#"{"success":true,"data":{"mortgage_content":[{"content_key":"mortgage_step1"}]}}"#,
            ),
            (
                "/api/content/mortgage/drill/mortgage_step1",
                r#"{"success":true,"data":{"actionCount":0,"actions":[]}}"#,
            ),
        ]);
        let base = serve(routes, 2).await;
        let client = ContentApiClient::new(&base).unwrap();
        let rows = check_list_vs_drill(&client, "mortgage").await.unwrap();

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].listed, None);
        assert_eq!(rows[0].drilled, Some(0));
        assert!(!rows[0].is_mismatch());
        let result = rows[0].to_result("mortgage");
        assert!(!result.ok);
        assert!(result.detail.contains("list count missing"));
    }
}
