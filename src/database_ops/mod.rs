//! Queries and batch writes against the content schema.
//!
//! Every function awaits its statements one after another on the shared
//! pool; writes that belong together run inside one transaction.

pub mod copy;
pub mod coverage;
pub mod drill;
pub mod dropdowns;
pub mod export;
pub mod navigation;
pub mod placeholders;
pub mod qa;
pub mod repair;
pub mod script;

use serde::Serialize;

/// Restricts a query to one screen or to every screen sharing a prefix.
/// Both unset means "all active content".
#[derive(Debug, Clone, Default, Serialize)]
pub struct ScreenFilter {
    pub screen: Option<String>,
    pub prefix: Option<String>,
}

impl ScreenFilter {
    pub fn prefix(prefix: impl Into<String>) -> Self {
        Self {
            screen: None,
            prefix: Some(prefix.into()),
        }
    }

    /// Bind values for the `($1 IS NULL OR ...) AND ($2 IS NULL OR ...)` predicate.
    pub fn binds(&self) -> (Option<&str>, Option<&str>) {
        (
            self.screen.as_deref().filter(|s| !s.is_empty()),
            self.prefix.as_deref().filter(|s| !s.is_empty()),
        )
    }

    pub fn describe(&self) -> String {
        match self.binds() {
            (Some(s), _) => format!("screen '{s}'"),
            (None, Some(p)) => format!("screens '{p}*'"),
            (None, None) => "all screens".to_string(),
        }
    }
}

/// SQL predicate over `ci.screen_location` using binds $1 (exact) and $2 (prefix).
/// The prefix is compared literally, so `_` and `%` in it are not wildcards.
pub(crate) const SCREEN_PREDICATE: &str = "($1::TEXT IS NULL OR ci.screen_location = $1) \
     AND ($2::TEXT IS NULL OR left(ci.screen_location, length($2)) = $2)";

/// Whole-number percentage, rounded half away from zero; 0 when `total` is 0.
pub fn percent(part: i64, total: i64) -> i64 {
    if total <= 0 {
        return 0;
    }
    ((part as f64 / total as f64) * 100.0).round() as i64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percent_rounds_and_guards_zero() {
        assert_eq!(percent(0, 0), 0);
        assert_eq!(percent(1, 3), 33);
        assert_eq!(percent(2, 3), 67);
        assert_eq!(percent(5, 5), 100);
    }

    #[test]
    fn prefix_predicate_is_literal() {
        assert!(!SCREEN_PREDICATE.contains("LIKE"));
        assert!(SCREEN_PREDICATE.contains("left(ci.screen_location, length($2)) = $2"));
        let f = ScreenFilter::prefix("credit_refi_");
        assert_eq!(f.binds(), (None, Some("credit_refi_")));
        assert_eq!(f.describe(), "screens 'credit_refi_*'");
    }

    #[test]
    fn empty_strings_do_not_filter() {
        let f = ScreenFilter {
            screen: Some(String::new()),
            prefix: Some(String::new()),
        };
        assert_eq!(f.binds(), (None, None));
        assert_eq!(f.describe(), "all screens");
        assert_eq!(ScreenFilter::prefix("credit").describe(), "screens 'credit*'");
    }
}
