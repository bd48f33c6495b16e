//! Shape check for dropdown option payloads.
//!
//! A dropdown translation stores its options as a JSON array of
//! `{ "value": ..., "label": ... }` objects.

use serde::Serialize;
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum OptionsCheck {
    Null,
    InvalidJson { message: String },
    NotAnArray { found: &'static str },
    Empty,
    Options { count: usize, issues: Vec<OptionIssue> },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OptionIssue {
    pub index: usize,
    pub problem: String,
}

impl OptionsCheck {
    pub fn is_valid(&self) -> bool {
        matches!(self, OptionsCheck::Options { issues, .. } if issues.is_empty())
    }

    pub fn summary(&self) -> String {
        match self {
            OptionsCheck::Null => "NULL payload".to_string(),
            OptionsCheck::InvalidJson { message } => format!("invalid JSON: {message}"),
            OptionsCheck::NotAnArray { found } => format!("not an array ({found})"),
            OptionsCheck::Empty => "empty options array".to_string(),
            OptionsCheck::Options { count, issues } if issues.is_empty() => {
                format!("{count} options")
            }
            OptionsCheck::Options { count, issues } => {
                format!("{count} options, {} invalid", issues.len())
            }
        }
    }
}

fn json_kind(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Option values may be strings or numbers; labels must be non-empty text.
fn present(v: Option<&Value>) -> bool {
    match v {
        Some(Value::String(s)) => !s.trim().is_empty(),
        Some(Value::Number(_)) => true,
        _ => false,
    }
}

pub fn validate_options(raw: Option<&str>) -> OptionsCheck {
    let Some(raw) = raw else {
        return OptionsCheck::Null;
    };
    let parsed: Value = match serde_json::from_str(raw) {
        Ok(v) => v,
        Err(e) => {
            return OptionsCheck::InvalidJson {
                message: e.to_string(),
            }
        }
    };
    let options = match parsed {
        Value::Array(items) => items,
        other => {
            return OptionsCheck::NotAnArray {
                found: json_kind(&other),
            }
        }
    };
    if options.is_empty() {
        return OptionsCheck::Empty;
    }

    let mut issues = Vec::new();
    for (index, opt) in options.iter().enumerate() {
        if !present(opt.get("value")) || !present(opt.get("label")) {
            issues.push(OptionIssue {
                index,
                problem: "missing value or label".to_string(),
            });
            continue;
        }
        if let Some(label) = opt.get("label").and_then(Value::as_str) {
            if label.contains("TODO") || label.contains("PLACEHOLDER") {
                issues.push(OptionIssue {
                    index,
                    problem: format!("placeholder label '{label}'"),
                });
            }
        }
    }
    OptionsCheck::Options {
        count: options.len(),
        issues,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_value_label_pairs() {
        let check = validate_options(Some(
            r#"[{"value":"1","label":"Salaried"},{"value":2,"label":"Self-employed"}]"#,
        ));
        assert!(check.is_valid());
        assert_eq!(check.summary(), "2 options");
    }

    #[test]
    fn flags_missing_fields_and_placeholders() {
        let check = validate_options(Some(
            r#"[{"value":"a"},{"value":"b","label":"TODO translate"},{"value":"","label":"x"}]"#,
        ));
        match &check {
            OptionsCheck::Options { count, issues } => {
                assert_eq!(*count, 3);
                let idx: Vec<_> = issues.iter().map(|i| i.index).collect();
                assert_eq!(idx, [0, 1, 2]);
                assert!(issues[1].problem.contains("placeholder"));
            }
            other => panic!("unexpected {other:?}"),
        }
        assert!(!check.is_valid());
    }

    #[test]
    fn reports_structural_failures() {
        assert_eq!(validate_options(None), OptionsCheck::Null);
        assert_eq!(validate_options(Some("[]")), OptionsCheck::Empty);
        assert_eq!(
            validate_options(Some(r#"{"value":"1"}"#)),
            OptionsCheck::NotAnArray { found: "object" }
        );
        assert!(matches!(
            validate_options(Some("Select a bank")),
            OptionsCheck::InvalidJson { .. }
        ));
    }
}
