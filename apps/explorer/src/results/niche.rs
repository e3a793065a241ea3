use crate::api::models::{CombinedConfig, FeatureCollection};
use crate::domain::{AnalysisPayload, SplistItem, TaxonomyLevel};
use crate::taxonomy::build_query_string;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One table row per grid feature.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NicheTableRow {
    pub id: usize,
    pub cell: Value,
    pub total_epsilon: Value,
    pub total_score: Value,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NicheStats {
    pub features: usize,
    pub epsilon_min: Option<f64>,
    pub epsilon_max: Option<f64>,
    pub score_min: Option<f64>,
    pub score_max: Option<f64>,
}

/// Map layer, table and summary of a combined niche-map run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NicheResult {
    pub grid: FeatureCollection,
    pub stats: NicheStats,
    pub table_rows: Vec<NicheTableRow>,
    pub uuid: Option<String>,
}

pub fn build_niche_result(grid: FeatureCollection, uuid: Option<String>) -> NicheResult {
    let table_rows: Vec<NicheTableRow> = grid
        .features
        .iter()
        .enumerate()
        .map(|(idx, feature)| {
            let id = idx + 1;
            let property = |key: &str| {
                feature
                    .properties
                    .as_ref()
                    .and_then(|p| p.get(key))
                    .filter(|v| !v.is_null())
                    .cloned()
            };

            NicheTableRow {
                id,
                cell: property("cell")
                    .or_else(|| property("id"))
                    .unwrap_or_else(|| Value::from(id)),
                total_epsilon: property("total_epsilon").unwrap_or(Value::Null),
                total_score: property("total_score").unwrap_or(Value::Null),
            }
        })
        .collect();

    let epsilons: Vec<f64> = finite_values(table_rows.iter().map(|r| &r.total_epsilon));
    let scores: Vec<f64> = finite_values(table_rows.iter().map(|r| &r.total_score));

    let stats = NicheStats {
        features: grid.features.len(),
        epsilon_min: epsilons.iter().copied().reduce(f64::min),
        epsilon_max: epsilons.iter().copied().reduce(f64::max),
        score_min: scores.iter().copied().reduce(f64::min),
        score_max: scores.iter().copied().reduce(f64::max),
    };

    NicheResult {
        grid,
        stats,
        table_rows,
        uuid,
    }
}

/// Relation payload matching a combined config: the base block supplies the
/// grid and target taxa, the analysis block the covariates.
pub fn relation_payload(config: &CombinedConfig) -> Option<AnalysisPayload> {
    let grid_id = config
        .base
        .region
        .as_ref()
        .map(|r| r.grid_id)
        .filter(|id| *id > 0)?;

    let target = taxonomy_query(config.base.taxonomy.as_deref().unwrap_or_default());
    let covariates = taxonomy_query(config.analysis.taxonomy.as_deref().unwrap_or_default());

    Some(AnalysisPayload::new(grid_id, &target, &covariates))
}

fn taxonomy_query(levels: &[TaxonomyLevel]) -> String {
    let splist: Vec<SplistItem> = levels
        .iter()
        .flat_map(|l| l.values.iter().map(|v| SplistItem::new(&l.level, v)))
        .collect();
    build_query_string(&splist)
}

// Only JSON numbers count; numeric strings are left out of the summary.
fn finite_values<'a>(values: impl Iterator<Item = &'a Value>) -> Vec<f64> {
    values
        .filter_map(Value::as_f64)
        .filter(|v| v.is_finite())
        .collect()
}
