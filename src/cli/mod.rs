//! Report runners behind the `cm` subcommands.
//!
//! Each runner takes a plain config struct, opens its own pool, writes a
//! human-readable report to stdout and closes the pool before returning,
//! whether or not the work succeeded.

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
pub mod smoke;

use anyhow::Result;
use serde::Serialize;

use crate::database_ops::ScreenFilter;

pub(crate) const RULE: &str = "==========================================";

/// Build a filter from the shared `--screen` / `--prefix` flags.
pub fn screen_filter(screen: Option<String>, prefix: Option<String>) -> ScreenFilter {
    ScreenFilter { screen, prefix }
}

pub(crate) fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

pub(crate) fn or_na(value: Option<&str>) -> &str {
    match value {
        Some(v) if !v.is_empty() => v,
        _ => "N/A",
    }
}

/// Shorten long values for one-line report output.
pub(crate) fn clip(value: &str, max_chars: usize) -> String {
    if value.chars().count() <= max_chars {
        return value.to_string();
    }
    let mut out: String = value.chars().take(max_chars).collect();
    out.push('…');
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clips_on_char_boundaries() {
        assert_eq!(clip("שלום עולם", 4), "שלום…");
        assert_eq!(clip("short", 10), "short");
        assert_eq!(or_na(Some("")), "N/A");
        assert_eq!(or_na(Some("x")), "x");
    }
}
