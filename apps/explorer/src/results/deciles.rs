use crate::domain::{HistogramPoint, ScoreDecile};
use crate::results::coerce::{first_present, round2, to_finite, to_integer};
use serde_json::Value;

pub const DECILE_FIELDS: &[&str] = &["decil", "decile", "dec"];
pub const SCORE_FIELDS: &[&str] = &["score_cell", "score", "score_mean"];

const TOP_DECILE: i64 = 10;

/// Groups table rows by decile and averages their score.
///
/// Rows without a decile in `1..=10` are skipped. A row with no score field
/// counts as score 0, as does a blank one; a score that does not coerce
/// skips the row.
/// Buckets come back from decile 10 down to 1, empty ones omitted.
#[allow(clippy::cast_precision_loss)]
pub fn aggregate_deciles(rows: &[Value]) -> Vec<ScoreDecile> {
    let mut sums = [0.0_f64; TOP_DECILE as usize];
    let mut counts = [0_i64; TOP_DECILE as usize];

    for row in rows {
        let Some(fields) = row.as_object() else {
            continue;
        };
        let Some(decile) = first_present(fields, DECILE_FIELDS)
            .and_then(to_integer)
            .filter(|d| (1..=TOP_DECILE).contains(d))
        else {
            continue;
        };
        let score = match first_present(fields, SCORE_FIELDS) {
            Some(raw) => match to_finite(raw) {
                Some(score) => score,
                None => continue,
            },
            None => 0.0,
        };

        let slot = usize::try_from(decile - 1).unwrap_or_default();
        sums[slot] += score;
        counts[slot] += 1;
    }

    (1..=TOP_DECILE)
        .rev()
        .filter_map(|decile| {
            let slot = usize::try_from(decile - 1).ok()?;
            let count = counts[slot];
            (count > 0).then(|| ScoreDecile {
                decile,
                average_score: sums[slot] / count as f64,
                cell_count: count,
            })
        })
        .collect()
}

/// Maps buckets to histogram points, strictly descending by decile.
pub fn histogram_from_buckets(buckets: &[ScoreDecile]) -> Vec<HistogramPoint> {
    let mut sorted = buckets.to_vec();
    sorted.sort_by(|a, b| b.decile.cmp(&a.decile));

    sorted
        .into_iter()
        .map(|bucket| HistogramPoint {
            label: bucket.decile.to_string(),
            value: round2(bucket.average_score),
        })
        .collect()
}

pub fn histogram_from_rows(rows: &[Value]) -> Vec<HistogramPoint> {
    histogram_from_buckets(&aggregate_deciles(rows))
}

/// Rows of the table belonging to one decile.
pub fn rows_in_decile(rows: &[Value], decile: u8) -> Vec<&Value> {
    rows.iter()
        .filter(|row| {
            row.as_object()
                .and_then(|fields| first_present(fields, DECILE_FIELDS))
                .and_then(to_integer)
                == Some(i64::from(decile))
        })
        .collect()
}
