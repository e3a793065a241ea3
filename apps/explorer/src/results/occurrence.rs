use crate::domain::OccurrenceRow;
use crate::results::coerce::{first_present, to_finite};
use serde_json::Value;

/// Field names the backend has used for the cell identifier, highest priority first.
pub const CELL_ID_FIELDS: &[&str] = &["cell_id", "cell_is", "id", "cellId"];
/// Field names for the per-cell occurrence count.
pub const OCCURRENCE_FIELDS: &[&str] = &["occ"];

/// Normalizes a `getOccOnMap` body. A missing or non-array `data` yields no rows.
pub fn normalize_occurrence_response(body: &Value) -> Vec<OccurrenceRow> {
    body.get("data")
        .and_then(Value::as_array)
        .map(|rows| normalize_occurrence_rows(rows))
        .unwrap_or_default()
}

/// Converts raw rows into canonical ones, silently dropping any row whose
/// identifier or count does not coerce to a finite number.
pub fn normalize_occurrence_rows(rows: &[Value]) -> Vec<OccurrenceRow> {
    rows.iter().filter_map(normalize_row).collect()
}

fn normalize_row(row: &Value) -> Option<OccurrenceRow> {
    let fields = row.as_object()?;
    let cell_id = first_present(fields, CELL_ID_FIELDS).and_then(to_finite)?;
    let occurrence_count = first_present(fields, OCCURRENCE_FIELDS).and_then(to_finite)?;

    Some(OccurrenceRow {
        cell_id,
        occurrence_count,
    })
}
