//! Structured-data (`application/ld+json`) contact extraction.

use super::phone::normalize_phone_field;
use crate::core::error::AppError;
use once_cell::sync::Lazy;
use scraper::{Html, Selector};
use serde_json::Value;

static SCRIPT_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("script[type]").expect("script selector must parse"));

const MAX_DEPTH: usize = 32;

/// Contact fields pulled out of every JSON-LD block on the page.
#[derive(Debug, Default)]
pub(crate) struct StructuredContacts {
    pub email_values: Vec<String>,
    pub phones: Vec<String>,
}

fn strip_wrappers(raw: &str) -> &str {
    let mut text = raw.trim();
    for prefix in ["<!--", "//<![CDATA[", "<![CDATA["] {
        text = text.strip_prefix(prefix).unwrap_or(text).trim();
    }
    for suffix in ["-->", "//]]>", "]]>"] {
        text = text.strip_suffix(suffix).unwrap_or(text).trim();
    }
    text
}

fn collect_strings(value: &Value, out: &mut Vec<String>) {
    match value {
        Value::String(s) => out.push(s.clone()),
        Value::Array(items) => items.iter().for_each(|v| collect_strings(v, out)),
        _ => {}
    }
}

fn walk(value: &Value, depth: usize, found: &mut StructuredContacts) {
    if depth > MAX_DEPTH {
        return;
    }
    match value {
        Value::Object(map) => {
            for (key, child) in map {
                let key = key.to_ascii_lowercase();
                if key.contains("email") {
                    let mut values = Vec::new();
                    collect_strings(child, &mut values);
                    found.email_values.extend(values.into_iter().map(|v| {
                        let trimmed = v.trim();
                        match trimmed.get(..7) {
                            Some(scheme) if scheme.eq_ignore_ascii_case("mailto:") => {
                                trimmed[7..].to_string()
                            }
                            _ => trimmed.to_string(),
                        }
                    }));
                } else if key == "telephone" || key.ends_with("phone") {
                    let mut values = Vec::new();
                    collect_strings(child, &mut values);
                    found
                        .phones
                        .extend(values.iter().filter_map(|v| normalize_phone_field(v)));
                }
                walk(child, depth + 1, found);
            }
        }
        Value::Array(items) => {
            for item in items {
                walk(item, depth + 1, found);
            }
        }
        _ => {}
    }
}

/// Walks every JSON-LD block in `document`. Blocks that do not parse are
/// logged and skipped.
pub(crate) fn structured_contacts(document: &Html) -> StructuredContacts {
    let mut found = StructuredContacts::default();

    for script in document.select(&SCRIPT_SELECTOR) {
        let is_json_ld = script
            .value()
            .attr("type")
            .map(|t| t.trim().to_ascii_lowercase().contains("ld+json"))
            .unwrap_or(false);
        if !is_json_ld {
            continue;
        }

        let raw: String = script.text().collect();
        let body = strip_wrappers(&raw);
        if body.is_empty() {
            continue;
        }

        match serde_json::from_str::<Value>(body) {
            Ok(value) => walk(&value, 0, &mut found),
            Err(e) => {
                let err = AppError::ParseMalformed(format!("JSON-LD block: {}", e));
                tracing::debug!(target: "extract_task", "Skipping structured data: {}", err);
            }
        }
    }

    found
}
