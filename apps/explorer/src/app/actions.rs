use crate::api::models::{CombinedConfig, OccurrenceRequest, RelationResponse};
use crate::api::AnalyticsApi;
use crate::domain::{AnalysisPayload, OccurrenceRow, SplistItem};
use crate::results::niche::relation_payload;
use crate::results::{build_niche_result, NicheResult};
use color_eyre::Result;
use std::sync::Arc;
use tracing::{error, info};

/// Network side of the application, one call per backend operation.
#[derive(Clone)]
pub struct AppActions {
    api: Arc<dyn AnalyticsApi>,
}

impl std::fmt::Debug for AppActions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppActions").finish_non_exhaustive()
    }
}

impl AppActions {
    pub fn new(api: Arc<dyn AnalyticsApi>) -> Self {
        Self { api }
    }

    pub async fn fetch_occurrences(
        &self,
        grid_id: i64,
        splist: Vec<SplistItem>,
    ) -> Result<Vec<OccurrenceRow>> {
        let request = OccurrenceRequest {
            grid_id,
            array_splist: splist,
        };
        let rows = self.api.occurrences_on_map(&request).await?;
        info!(grid_id, rows = rows.len(), "occurrences fetched");
        Ok(rows)
    }

    pub async fn fetch_relation(&self, payload: &AnalysisPayload) -> Result<RelationResponse> {
        let response = self.api.eps_score_relation(payload).await?;
        info!(
            grid_id = payload.grid_id,
            uuid = response.uuid.as_deref().unwrap_or("-"),
            "relation fetched"
        );
        Ok(response)
    }

    /// Runs the niche map and relation requests side by side.
    ///
    /// Neither failure is fatal: a failed map yields an empty collection and a
    /// failed relation a missing uuid.
    pub async fn run_niche_map(&self, config: &CombinedConfig) -> NicheResult {
        let payload = relation_payload(config);

        let grid_fut = self.api.niche_map(config);
        let relation_fut = async {
            match payload.as_ref() {
                Some(payload) => self.api.eps_score_relation(payload).await.map(Some),
                None => Ok(None),
            }
        };
        let (grid, relation) = tokio::join!(grid_fut, relation_fut);

        let grid = grid.unwrap_or_else(|e| {
            error!(error = %e, "niche map request failed");
            crate::api::FeatureCollection::default()
        });
        let uuid = match relation {
            Ok(response) => response.and_then(|r| r.uuid),
            Err(e) => {
                error!(error = %e, "relation request failed");
                None
            }
        };

        let result = build_niche_result(grid, uuid);
        info!(features = result.stats.features, "niche map built");
        result
    }
}
