use crate::domain::{RawLevel, RawTaxonValue, SplistItem, TaxonSelection, TaxonomyLevel};
use serde_json::Value;

/// Keys consulted, in order, when a selected value is an object.
const VALUE_KEYS: &[&str] = &["value", "name", "label"];

/// Flattens a selection into `(level, value)` pairs.
///
/// Level names are trimmed and lowercased; levels without a name and values
/// that end up empty are dropped. Output follows level order, then value order.
pub fn build_splist(selection: &TaxonSelection) -> Vec<SplistItem> {
    let mut out = Vec::new();

    for raw in &selection.levels {
        let Some(level) = level_name(raw) else {
            continue;
        };

        for value in level_values(raw).filter_map(value_text) {
            out.push(SplistItem::new(level.clone(), value));
        }
    }

    out
}

/// Groups a selection into `{level, values}` entries, merging levels whose
/// names only differ in case or surrounding whitespace.
pub fn to_taxonomy_levels(selection: &TaxonSelection) -> Vec<TaxonomyLevel> {
    let mut levels: Vec<TaxonomyLevel> = Vec::new();

    for item in build_splist(selection) {
        match levels.iter_mut().find(|l| l.level == item.level) {
            Some(existing) => {
                if !existing.values.contains(&item.value) {
                    existing.values.push(item.value);
                }
            }
            None => levels.push(TaxonomyLevel {
                level: item.level,
                values: vec![item.value],
            }),
        }
    }

    levels
}

fn level_name(raw: &RawLevel) -> Option<String> {
    let name = raw.level.as_deref()?.trim();
    if name.is_empty() {
        None
    } else {
        Some(name.to_lowercase())
    }
}

/// The first slot present wins, even when it holds an empty list.
fn level_values(raw: &RawLevel) -> Box<dyn Iterator<Item = &RawTaxonValue> + '_> {
    if let Some(values) = raw.values.as_ref() {
        return Box::new(values.iter());
    }
    if let Some(selected) = raw.selected.as_ref() {
        return Box::new(selected.iter());
    }
    if let Some(items) = raw.items.as_ref() {
        return Box::new(items.iter());
    }
    Box::new(raw.value.iter())
}

fn value_text(value: &RawTaxonValue) -> Option<String> {
    let text = match value {
        RawTaxonValue::Text(s) => s.trim().to_string(),
        RawTaxonValue::Number(n) => n.to_string(),
        RawTaxonValue::Object(map) => VALUE_KEYS
            .iter()
            .find_map(|key| map.get(*key).filter(|v| !v.is_null()))
            .and_then(scalar_text)?,
        RawTaxonValue::Other(_) => return None,
    };

    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}
