//! Row normalization: from loosely typed Bitable cells to flat [`Quote`]s.
//!
//! Bitable tables in the wild name their columns inconsistently (Chinese or
//! English, exact or approximate), and cell values arrive as strings,
//! numbers, lists, or nested objects depending on the column type. This
//! module resolves the three logical fields — text, author, category — by
//! trying, per alias and in order:
//!
//! 1. an exact field-name match resolved through the schema's id↔name maps,
//! 2. a direct key lookup with the alias itself,
//! 3. a case-insensitive substring match over the row's keys.
//!
//! The first alias that yields a defined cell wins. Cell values are then
//! flattened to strings, and rows whose resolved text is empty are dropped.

use std::collections::HashMap;

use serde_json::{Map, Value};

use crate::models::{FieldMeta, Quote, RawRecord};

const TEXT_ALIASES: &[&str] = &["内容", "语录", "text", "quote", "句子", "sentence"];
const AUTHOR_ALIASES: &[&str] = &["作者", "author", "写作者", "来源", "source"];
const CATEGORY_ALIASES: &[&str] = &["分类", "类别", "标签", "category", "tag", "type"];

/// Sub-keys tried, in order, when a cell value is a nested object.
const LABEL_KEYS: &[&str] = &["text", "name", "title"];

/// Normalize raw records into quotes.
///
/// Entries whose resolved text is empty are dropped; ids are the 1-based
/// positions of the surviving entries, so they are always `1..=N` with no
/// gaps.
pub fn normalize(records: &[RawRecord], fields: &[FieldMeta]) -> Vec<Quote> {
    let mut name_by_id: HashMap<&str, &str> = HashMap::new();
    let mut id_by_name: HashMap<String, &str> = HashMap::new();
    for field in fields {
        name_by_id.insert(field.id.as_str(), field.name.as_str());
        let lower = field.name.to_lowercase();
        if !lower.is_empty() {
            id_by_name.insert(lower, field.id.as_str());
        }
    }

    let mut quotes = Vec::new();
    for record in records {
        let text = resolve(TEXT_ALIASES, &record.fields, &id_by_name, &name_by_id);
        if text.is_empty() {
            continue;
        }
        quotes.push(Quote {
            id: (quotes.len() + 1) as u32,
            text,
            author: resolve(AUTHOR_ALIASES, &record.fields, &id_by_name, &name_by_id),
            category: resolve(CATEGORY_ALIASES, &record.fields, &id_by_name, &name_by_id),
        });
    }
    quotes
}

/// Resolve one logical field from a row, following the alias list in order.
/// Returns an empty string when nothing matches.
fn resolve(
    aliases: &[&str],
    row: &Map<String, Value>,
    id_by_name: &HashMap<String, &str>,
    name_by_id: &HashMap<&str, &str>,
) -> String {
    for alias in aliases {
        if let Some(field_id) = id_by_name.get(&alias.to_lowercase()) {
            if let Some(key) = name_by_id.get(field_id) {
                if let Some(value) = row.get(*key) {
                    return flatten_value(value);
                }
            }
        }
        if let Some(value) = row.get(*alias) {
            return flatten_value(value);
        }
    }

    let targets: Vec<String> = aliases.iter().map(|a| a.to_lowercase()).collect();
    for (key, value) in row {
        let lower = key.to_lowercase();
        if targets.iter().any(|t| lower.contains(t.as_str())) {
            return flatten_value(value);
        }
    }
    String::new()
}

/// Flatten an arbitrary cell value to a string.
///
/// Primitives pass through; lists join their flattened elements with a
/// space; objects yield their first non-null `text`/`name`/`title` string
/// sub-field, else their JSON form.
pub fn flatten_value(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Array(items) => items
            .iter()
            .map(flatten_element)
            .collect::<Vec<_>>()
            .join(" "),
        Value::Object(map) => object_label(map)
            .unwrap_or_else(|| serde_json::to_string(value).unwrap_or_default()),
    }
}

fn flatten_element(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Object(map) => object_label(map)
            .unwrap_or_else(|| serde_json::to_string(value).unwrap_or_default()),
        Value::Array(_) => serde_json::to_string(value).unwrap_or_default(),
    }
}

/// First non-null label sub-key, if it holds a string.
///
/// A non-null, non-string label (e.g. `{"text": 42}`) short-circuits the
/// search without matching, so the whole object is JSON-stringified instead.
fn object_label(map: &Map<String, Value>) -> Option<String> {
    let candidate = LABEL_KEYS
        .iter()
        .filter_map(|k| map.get(*k))
        .find(|v| !v.is_null())?;
    match candidate {
        Value::String(s) => Some(s.clone()),
        _ => None,
    }
}
