use crate::app::AnalysisSessionState;
use crate::domain::{AnalysisPayload, HistogramPoint, MapQuery, OccurrenceRow, SplistItem};
use crate::results::{NicheStats, NicheTableRow};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use std::fmt::Write as _;

/// Which run a report describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReportKind {
    Occurrence,
    Niche,
    NicheMap,
}

impl ReportKind {
    const fn title(self) -> &'static str {
        match self {
            Self::Occurrence => "Occurrence Analysis",
            Self::Niche => "Niche Analysis",
            Self::NicheMap => "Niche Map",
        }
    }
}

/// Read-only projection of the session after a run.
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub kind: ReportKind,
    pub generated_at: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub validation: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub occurrence: Option<OccurrenceSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub niche: Option<NicheSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub niche_map: Option<NicheMapSummary>,
}

#[derive(Debug, Clone, Serialize)]
pub struct OccurrenceSummary {
    pub grid_id: Option<i64>,
    pub map_query: Option<MapQuery>,
    pub cells: usize,
    pub total_occurrences: f64,
    pub rows: Vec<OccurrenceRow>,
}

#[derive(Debug, Clone, Serialize)]
pub struct NicheSummary {
    pub payload: Option<AnalysisPayload>,
    pub uuid: Option<String>,
    pub histogram: Vec<HistogramPoint>,
    pub selected_decile: u8,
    pub table_rows: usize,
    pub selected_rows: Vec<Value>,
}

#[derive(Debug, Clone, Serialize)]
pub struct NicheMapSummary {
    pub uuid: Option<String>,
    pub stats: NicheStats,
    pub table_rows: Vec<NicheTableRow>,
}

/// Output of the `query` subcommand: no backend involved.
#[derive(Debug, Clone, Serialize)]
pub struct QueryReport {
    pub splist: Vec<SplistItem>,
    pub query: String,
}

impl Report {
    pub fn from_state(
        state: &AnalysisSessionState,
        kind: ReportKind,
        generated_at: DateTime<Utc>,
    ) -> Self {
        let mut report = Self {
            kind,
            generated_at: generated_at.to_rfc3339(),
            validation: state.validation_messages.clone(),
            occurrence: None,
            niche: None,
            niche_map: None,
        };

        match kind {
            ReportKind::Occurrence => {
                report.occurrence = Some(OccurrenceSummary {
                    grid_id: state.grid_id(),
                    map_query: state.map_query.clone(),
                    cells: state.occurrence_rows.len(),
                    total_occurrences: state
                        .occurrence_rows
                        .iter()
                        .map(|r| r.occurrence_count)
                        .sum(),
                    rows: state.occurrence_rows.clone(),
                });
            }
            ReportKind::Niche => {
                report.niche = Some(NicheSummary {
                    payload: state.last_payload.clone(),
                    uuid: state.relation_uuid.clone(),
                    histogram: state.histogram.clone(),
                    selected_decile: state.selected_decile,
                    table_rows: state.table_rows.len(),
                    selected_rows: state
                        .rows_for_selected_decile()
                        .into_iter()
                        .cloned()
                        .collect(),
                });
            }
            ReportKind::NicheMap => {
                report.niche_map = state.niche_map.as_ref().map(|result| NicheMapSummary {
                    uuid: result.uuid.clone(),
                    stats: result.stats.clone(),
                    table_rows: result.table_rows.clone(),
                });
            }
        }

        report
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    pub fn to_text(&self) -> String {
        let mut out = String::new();
        let title = self.kind.title();
        let _ = writeln!(out, "\n{title}");
        let _ = writeln!(out, "{}", "=".repeat(title.len()));
        let _ = writeln!(out, "Generated: {}", self.generated_at);

        if !self.validation.is_empty() {
            let _ = writeln!(out, "\nValidation:");
            for msg in &self.validation {
                let _ = writeln!(out, "- {msg}");
            }
        }

        if let Some(occurrence) = &self.occurrence {
            write_occurrence(&mut out, occurrence);
        }
        if let Some(niche) = &self.niche {
            write_niche(&mut out, niche);
        }
        if let Some(niche_map) = &self.niche_map {
            write_niche_map(&mut out, niche_map);
        }

        out
    }
}

impl QueryReport {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    pub fn to_text(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "Query: {}", self.query);
        let _ = writeln!(out, "\nSplist:");
        for item in &self.splist {
            let _ = writeln!(out, "- {} | {}", item.level, item.value);
        }
        out
    }
}

fn write_occurrence(out: &mut String, summary: &OccurrenceSummary) {
    let grid = summary
        .grid_id
        .map_or_else(|| "(none)".to_string(), |id| id.to_string());
    let _ = writeln!(out, "\nGrid: {grid}");
    if let Some(query) = &summary.map_query {
        let _ = writeln!(
            out,
            "Region: {} | Resolution: {}",
            query.region_id, query.resolution
        );
    }
    let _ = writeln!(out, "Cells: {}", summary.cells);
    let _ = writeln!(out, "Total occurrences: {}", summary.total_occurrences);

    if !summary.rows.is_empty() {
        let _ = writeln!(out, "\nCell | Occurrences");
        for row in &summary.rows {
            let _ = writeln!(out, "{} | {}", row.cell_id, row.occurrence_count);
        }
    }
}

fn write_niche(out: &mut String, summary: &NicheSummary) {
    if let Some(payload) = &summary.payload {
        let query = |q: &[crate::domain::RelationQuery]| {
            q.first().map(|r| r.query.clone()).unwrap_or_default()
        };
        let _ = writeln!(out, "\nGrid: {}", payload.grid_id);
        let _ = writeln!(out, "Target: {}", query(&payload.target));
        let _ = writeln!(out, "Covariates: {}", query(&payload.covariates));
    }
    let _ = writeln!(
        out,
        "Run: {}",
        summary.uuid.as_deref().unwrap_or("(none)")
    );

    if !summary.histogram.is_empty() {
        let _ = writeln!(out, "\nAverage score by decile:");
        for point in &summary.histogram {
            let _ = writeln!(out, "- {:>2}: {:.2}", point.label, point.value);
        }
    }

    let _ = writeln!(out, "\nTable rows: {}", summary.table_rows);
    let _ = writeln!(
        out,
        "Rows in decile {}: {}",
        summary.selected_decile,
        summary.selected_rows.len()
    );
    for row in &summary.selected_rows {
        let _ = writeln!(out, "- {row}");
    }
}

fn write_niche_map(out: &mut String, summary: &NicheMapSummary) {
    let _ = writeln!(
        out,
        "\nRun: {}",
        summary.uuid.as_deref().unwrap_or("(none)")
    );
    let _ = writeln!(out, "Features: {}", summary.stats.features);

    let range = |min: Option<f64>, max: Option<f64>| match (min, max) {
        (Some(min), Some(max)) => format!("{min:.4} .. {max:.4}"),
        _ => "(none)".to_string(),
    };
    let _ = writeln!(
        out,
        "Epsilon: {}",
        range(summary.stats.epsilon_min, summary.stats.epsilon_max)
    );
    let _ = writeln!(
        out,
        "Score: {}",
        range(summary.stats.score_min, summary.stats.score_max)
    );

    if !summary.table_rows.is_empty() {
        let _ = writeln!(out, "\n# | Cell | Epsilon | Score");
        for row in &summary.table_rows {
            let _ = writeln!(
                out,
                "{} | {} | {} | {}",
                row.id, row.cell, row.total_epsilon, row.total_score
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::FeatureCollection;
    use crate::results::build_niche_result;
    use chrono::TimeZone;
    use serde_json::json;

    fn fixed_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0)
            .single()
            .unwrap_or_default()
    }

    #[test]
    fn test_occurrence_report_totals() {
        let mut state = AnalysisSessionState::new();
        state.target.grid_id = Some(4);
        state.occurrence_rows = vec![
            OccurrenceRow {
                cell_id: 1.0,
                occurrence_count: 3.0,
            },
            OccurrenceRow {
                cell_id: 2.0,
                occurrence_count: 5.5,
            },
        ];

        let report = Report::from_state(&state, ReportKind::Occurrence, fixed_time());
        let text = report.to_text();

        assert!(text.contains("Occurrence Analysis"));
        assert!(text.contains("Grid: 4"));
        assert!(text.contains("Cells: 2"));
        assert!(text.contains("Total occurrences: 8.5"));
        assert!(text.contains("1 | 3"));
        assert!(text.contains("2 | 5.5"));
        assert!(report.niche.is_none());
    }

    #[test]
    fn test_validation_is_listed_first() {
        let mut state = AnalysisSessionState::new();
        state.validation_messages = vec!["Select at least one taxon in the navigator.".to_string()];

        let text = Report::from_state(&state, ReportKind::Occurrence, fixed_time()).to_text();

        let validation = text.find("Validation:");
        let cells = text.find("Cells:");
        assert!(validation.is_some());
        assert!(validation < cells);
    }

    #[test]
    fn test_niche_report_json_shape() -> serde_json::Result<()> {
        let mut state = AnalysisSessionState::new();
        state.last_payload = Some(AnalysisPayload::new(4, "genus = Lynx", "class = Aves"));
        state.relation_uuid = Some("u-1".to_string());
        state.histogram = vec![HistogramPoint {
            label: "10".to_string(),
            value: 2.5,
        }];
        state.table_rows = vec![json!({"decil": 10, "cell": 1}), json!({"decil": 3, "cell": 2})];

        let report = Report::from_state(&state, ReportKind::Niche, fixed_time());
        let value: Value = serde_json::from_str(&report.to_json()?)?;

        assert_eq!(value["kind"], json!("niche"));
        assert_eq!(value["generated_at"], json!("2024-05-01T12:00:00+00:00"));
        assert_eq!(value["niche"]["uuid"], json!("u-1"));
        assert_eq!(value["niche"]["payload"]["grid_id"], json!(4));
        assert_eq!(value["niche"]["table_rows"], json!(2));
        assert_eq!(value["niche"]["selected_rows"], json!([{"decil": 10, "cell": 1}]));
        assert!(value.get("validation").is_none());
        assert!(value.get("occurrence").is_none());

        let text = report.to_text();
        assert!(text.contains("Target: genus = Lynx"));
        assert!(text.contains("- 10: 2.50"));
        Ok(())
    }

    #[test]
    fn test_niche_report_after_failed_run_has_no_histogram() {
        let mut state = AnalysisSessionState::new();
        state.relation_uuid = None;
        state.table_rows = vec![json!({"decil": 10, "cell": 1})];

        let text = Report::from_state(&state, ReportKind::Niche, fixed_time()).to_text();

        assert!(text.contains("Run: (none)"));
        assert!(!text.contains("Average score by decile:"));
        assert!(text.contains("Table rows: 1"));
    }

    #[test]
    fn test_niche_map_report_ranges() -> serde_json::Result<()> {
        let grid: FeatureCollection = serde_json::from_value(json!({
            "type": "FeatureCollection",
            "features": [
                {"type": "Feature", "geometry": null, "properties": {"cell": 7, "total_epsilon": 1.25, "total_score": 0.5}}
            ]
        }))?;
        let mut state = AnalysisSessionState::new();
        state.niche_map = Some(build_niche_result(grid, None));

        let text = Report::from_state(&state, ReportKind::NicheMap, fixed_time()).to_text();

        assert!(text.contains("Run: (none)"));
        assert!(text.contains("Features: 1"));
        assert!(text.contains("Epsilon: 1.2500 .. 1.2500"));
        assert!(text.contains("1 | 7 | 1.25 | 0.5"));
        Ok(())
    }

    #[test]
    fn test_query_report_text() {
        let report = QueryReport {
            splist: vec![SplistItem::new("family", "Fabaceae")],
            query: "family = Fabaceae".to_string(),
        };

        let text = report.to_text();
        assert!(text.contains("Query: family = Fabaceae"));
        assert!(text.contains("- family | Fabaceae"));
    }
}
