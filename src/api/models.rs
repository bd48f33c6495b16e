// Response shapes of the content API, as far as the smoke checks read them.

use serde::Deserialize;
use serde_json::Value;

/// `{ success, data, error }` wrapper returned by every content endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiEnvelope {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub data: Option<Value>,
    #[serde(default)]
    pub error: Option<String>,
}

impl ApiEnvelope {
    pub fn error_message(&self) -> &str {
        self.error.as_deref().unwrap_or("Unknown error")
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DrillAction {
    #[serde(default)]
    pub content_key: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub component_type: Option<String>,
}

impl DrillAction {
    pub fn label(&self) -> &str {
        self.content_key
            .as_deref()
            .or(self.description.as_deref())
            .unwrap_or("N/A")
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DrillData {
    #[serde(default, rename = "pageTitle")]
    pub page_title: Option<String>,
    #[serde(default, rename = "actionCount")]
    pub action_count: Option<Value>,
    #[serde(default)]
    pub actions: Vec<DrillAction>,
}

impl DrillData {
    /// Declared count, or the number of actions when the field is absent or zero.
    pub fn effective_action_count(&self) -> u64 {
        match self.action_count.as_ref().and_then(count_value) {
            Some(n) if n > 0 => n,
            _ => self.actions.len() as u64,
        }
    }

    /// Actions the drill UI folds into their dropdown. Only plain `option`
    /// rows count here; `dropdown_option` rows still render as actions.
    pub fn option_count(&self) -> usize {
        self.actions
            .iter()
            .filter(|a| a.component_type.as_deref().is_some_and(|t| t.eq_ignore_ascii_case("option")))
            .count()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListTranslations {
    #[serde(default)]
    pub ru: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListItem {
    #[serde(default)]
    pub content_key: Option<String>,
    #[serde(default)]
    pub screen_location: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, rename = "actionCount", alias = "action_count")]
    pub action_count: Option<Value>,
    #[serde(default)]
    pub translations: Option<ListTranslations>,
}

impl ListItem {
    /// Path segment used for the drill request.
    pub fn drill_id(&self) -> Option<&str> {
        self.content_key.as_deref().or(self.screen_location.as_deref())
    }

    pub fn title(&self) -> &str {
        self.translations
            .as_ref()
            .and_then(|t| t.ru.as_deref())
            .or(self.description.as_deref())
            .or(self.drill_id())
            .unwrap_or("")
    }

    /// `None` when the list row carries no usable count.
    pub fn listed_count(&self) -> Option<u64> {
        self.action_count.as_ref().and_then(count_value)
    }
}

/// Counts arrive as numbers or numeric strings depending on the endpoint.
pub fn count_value(v: &Value) -> Option<u64> {
    match v {
        Value::Number(n) => n.as_u64().or_else(|| n.as_f64().map(|f| f.max(0.0) as u64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// The list endpoint nests its rows under `<section>_content`; fall back to
/// the first array in `data` when that key is absent.
pub fn list_rows(content_type: &str, data: &Value) -> Option<Vec<ListItem>> {
    let section = content_type.split('-').next().unwrap_or(content_type);
    let obj = data.as_object()?;
    let rows = obj
        .get(&format!("{section}_content"))
        .filter(|v| v.is_array())
        .or_else(|| obj.values().find(|v| v.is_array()))?;
    serde_json::from_value(rows.clone()).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn action_count_falls_back_to_actions() {
        let d: DrillData = serde_json::from_value(json!({
            "pageTitle": "Step 1",
            "actions": [{"content_key": "a"}, {"content_key": "b", "component_type": "Option"}]
        }))
        .unwrap();
        assert_eq!(d.effective_action_count(), 2);
        assert_eq!(d.option_count(), 1);

        let d: DrillData = serde_json::from_value(json!({"actionCount": "7", "actions": []})).unwrap();
        assert_eq!(d.effective_action_count(), 7);
    }

    #[test]
    fn only_plain_options_are_hidden() {
        let d: DrillData = serde_json::from_value(json!({
            "actions": [
                {"component_type": "option"},
                {"component_type": "dropdown_option"},
                {"component_type": "dropdown"}
            ]
        }))
        .unwrap();
        assert_eq!(d.option_count(), 1);
    }

    #[test]
    fn non_numeric_list_count_is_none() {
        let item: ListItem = serde_json::from_value(json!({"content_key": "k", "actionCount": "many"})).unwrap();
        assert_eq!(item.listed_count(), None);
    }

    #[test]
    fn list_rows_prefers_section_key() {
        let data = json!({
            "other": [{"content_key": "x"}],
            "mortgage_content": [{"content_key": "refinance_mortgage_1", "action_count": 4}]
        });
        let rows = list_rows("mortgage-refi", &data).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].drill_id(), Some("refinance_mortgage_1"));
        assert_eq!(rows[0].listed_count(), Some(4));

        let data = json!({"credit_items": [{"screen_location": "credit_step1", "description": "Step"}]});
        let rows = list_rows("credit", &data).unwrap();
        assert_eq!(rows[0].title(), "Step");
        assert_eq!(rows[0].listed_count(), None);
    }
}
