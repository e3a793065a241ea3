use crate::app::actions::AppActions;
use crate::app::map::MapCollaborator;
use crate::app::state::{Action, AnalysisSessionState, Effect, RunTicket};
use serde_json::Value;
use std::sync::Arc;
use tracing::error;

/// Owns the session state and runs the effects its transitions ask for.
pub struct AnalysisOrchestrator {
    pub state: AnalysisSessionState,
    actions: AppActions,
    map: Option<Arc<dyn MapCollaborator>>,
}

impl std::fmt::Debug for AnalysisOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnalysisOrchestrator")
            .field("state", &self.state)
            .field("map_attached", &self.map.is_some())
            .finish_non_exhaustive()
    }
}

impl AnalysisOrchestrator {
    pub fn new(actions: AppActions) -> Self {
        Self {
            state: AnalysisSessionState::new(),
            actions,
            map: None,
        }
    }

    #[must_use]
    pub fn with_map(mut self, map: Arc<dyn MapCollaborator>) -> Self {
        self.map = Some(map);
        self
    }

    /// Applies a UI event. Any effect is returned for the caller to run.
    pub fn dispatch(&mut self, action: Action) -> Option<Effect> {
        self.state.apply(action)
    }

    /// Occurrence run for the target section.
    pub async fn visualize(&mut self) {
        if let Some(effect) = self.dispatch(Action::OccurrenceRequested) {
            self.run_effect(effect).await;
        }
    }

    /// Target-vs-covariates relation run.
    pub async fn visualize_niche(&mut self) {
        let map_attached = self.map.is_some();
        if let Some(effect) = self.dispatch(Action::NicheRequested { map_attached }) {
            self.run_effect(effect).await;
        }
    }

    /// Combined niche map run (geometry, table and summary).
    pub async fn visualize_niche_map(&mut self) {
        if let Some(effect) = self.dispatch(Action::NicheMapRequested) {
            self.run_effect(effect).await;
        }
    }

    /// Called once the map has rendered a relation result.
    ///
    /// A callback from a superseded run leaves the loading indicator alone.
    pub fn on_relation_ready(&mut self, ticket: RunTicket, rows: Vec<Value>) {
        let current = self.state.niche_ticket == Some(ticket);
        self.dispatch(Action::RelationReady { ticket, rows });
        if !current {
            return;
        }
        if let Some(map) = &self.map {
            map.set_loading(false);
        }
    }

    pub async fn run_effect(&mut self, effect: Effect) {
        match effect {
            Effect::FetchOccurrences {
                ticket,
                grid_id,
                splist,
            } => {
                let action = match self.actions.fetch_occurrences(grid_id, splist).await {
                    Ok(rows) => Action::OccurrenceLoaded { ticket, rows },
                    Err(e) => {
                        error!(error = %e, "getOccOnMap failed");
                        Action::OccurrenceFailed { ticket }
                    }
                };
                self.dispatch(action);
            }
            Effect::FetchRelation { ticket, payload } => {
                let Some(map) = self.map.clone() else {
                    return;
                };
                map.set_loading(true);

                match self.actions.fetch_relation(&payload).await {
                    Ok(response) => {
                        self.dispatch(Action::RelationLoaded {
                            ticket,
                            response: response.clone(),
                        });
                        let rows = map.show_relation(&payload, &response).await;
                        self.on_relation_ready(ticket, rows);
                    }
                    Err(e) => {
                        error!(error = %e, "getEpsScrRelation failed");
                        self.dispatch(Action::RelationFailed { ticket });
                        map.set_loading(false);
                    }
                }
            }
            Effect::FetchNicheMap { ticket, config } => {
                let result = self.actions.run_niche_map(&config).await;
                self.dispatch(Action::NicheMapLoaded { ticket, result });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::models::{
        CombinedConfig, FeatureCollection, OccurrenceRequest, RelationResponse,
    };
    use crate::api::{AnalyticsApi, ApiError};
    use crate::app::validation::{MSG_INVALID_GRID, MSG_NO_TAXON, MSG_OCCURRENCE_FAILED};
    use crate::domain::{AnalysisPayload, OccurrenceRow, Section, TaxonSelection};
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Mutex;

    #[derive(Default)]
    struct FakeApi {
        fail: AtomicBool,
        occurrence_calls: Mutex<Vec<OccurrenceRequest>>,
        relation_calls: Mutex<Vec<AnalysisPayload>>,
        niche_map_calls: Mutex<Vec<CombinedConfig>>,
    }

    impl FakeApi {
        fn failing() -> Self {
            Self {
                fail: AtomicBool::new(true),
                ..Self::default()
            }
        }

        fn error(endpoint: &str) -> ApiError {
            ApiError::Status {
                endpoint: endpoint.to_string(),
                status: 500,
                body: "boom".to_string(),
            }
        }
    }

    #[async_trait]
    impl AnalyticsApi for FakeApi {
        async fn occurrences_on_map(
            &self,
            request: &OccurrenceRequest,
        ) -> Result<Vec<OccurrenceRow>, ApiError> {
            if let Ok(mut calls) = self.occurrence_calls.lock() {
                calls.push(request.clone());
            }
            if self.fail.load(Ordering::SeqCst) {
                return Err(Self::error("getOccOnMap"));
            }
            Ok(vec![OccurrenceRow {
                cell_id: 7.0,
                occurrence_count: 2.0,
            }])
        }

        async fn eps_score_relation(
            &self,
            payload: &AnalysisPayload,
        ) -> Result<RelationResponse, ApiError> {
            if let Ok(mut calls) = self.relation_calls.lock() {
                calls.push(payload.clone());
            }
            if self.fail.load(Ordering::SeqCst) {
                return Err(Self::error("getEpsScrRelation"));
            }
            Ok(serde_json::from_value(json!({
                "uuid": "run-1",
                "scoreDeciles": [
                    {"decil": 9, "avg_score_cell": 1.234, "cell_count": 2},
                    {"decil": 10, "avg_score_cell": 4.5, "cell_count": 1}
                ],
                "data": [{"cell": 1, "decil": 10}, {"cell": 2, "decil": 9}]
            }))
            .unwrap_or_default())
        }

        async fn niche_map(&self, config: &CombinedConfig) -> Result<FeatureCollection, ApiError> {
            if let Ok(mut calls) = self.niche_map_calls.lock() {
                calls.push(config.clone());
            }
            if self.fail.load(Ordering::SeqCst) {
                return Err(Self::error("getOccMapaAnalisisNicho"));
            }
            Ok(serde_json::from_value(json!({
                "type": "FeatureCollection",
                "features": [
                    {"type": "Feature", "geometry": null, "properties": {"cell": 5, "total_epsilon": 2.0, "total_score": 1.0}}
                ]
            }))
            .unwrap_or_default())
        }
    }

    #[derive(Default)]
    struct RecordingMap {
        loading: Mutex<Vec<bool>>,
        shown: Mutex<Vec<AnalysisPayload>>,
    }

    #[async_trait]
    impl MapCollaborator for RecordingMap {
        async fn show_relation(
            &self,
            payload: &AnalysisPayload,
            response: &RelationResponse,
        ) -> Vec<Value> {
            if let Ok(mut shown) = self.shown.lock() {
                shown.push(payload.clone());
            }
            response
                .extra
                .get("data")
                .and_then(Value::as_array)
                .cloned()
                .unwrap_or_default()
        }

        fn set_loading(&self, loading: bool) {
            if let Ok(mut log) = self.loading.lock() {
                log.push(loading);
            }
        }
    }

    fn orchestrator(api: &Arc<FakeApi>) -> AnalysisOrchestrator {
        let api: Arc<dyn AnalyticsApi> = api.clone();
        AnalysisOrchestrator::new(AppActions::new(api))
    }

    fn select_both_sections(orch: &mut AnalysisOrchestrator) {
        orch.dispatch(Action::RegionSelected {
            section: Section::Target,
            region_id: 1,
        });
        orch.dispatch(Action::ResolutionSelected {
            section: Section::Target,
            resolution: "16km".to_string(),
        });
        orch.dispatch(Action::GridSelected {
            section: Section::Target,
            grid_id: 3,
        });
        orch.dispatch(Action::SelectionChanged {
            section: Section::Target,
            selection: TaxonSelection::from_pairs(vec![("Family", vec!["Felidae"])]),
        });
        orch.dispatch(Action::SelectionChanged {
            section: Section::Covariates,
            selection: TaxonSelection::from_pairs(vec![("Class", vec!["Aves", "Reptilia"])]),
        });
    }

    fn count<T>(calls: &Mutex<Vec<T>>) -> usize {
        calls.lock().map(|c| c.len()).unwrap_or_default()
    }

    #[tokio::test]
    async fn test_validation_failure_issues_no_request() {
        let api = Arc::new(FakeApi::default());
        let mut orch = orchestrator(&api);
        orch.dispatch(Action::GridSelected {
            section: Section::Target,
            grid_id: 0,
        });

        orch.visualize().await;

        assert_eq!(orch.state.validation_messages, vec![MSG_INVALID_GRID, MSG_NO_TAXON]);
        assert_eq!(count(&api.occurrence_calls), 0);
    }

    #[tokio::test]
    async fn test_occurrence_run_stores_rows() {
        let api = Arc::new(FakeApi::default());
        let mut orch = orchestrator(&api);
        select_both_sections(&mut orch);

        orch.visualize().await;

        assert_eq!(
            orch.state.occurrence_rows,
            vec![OccurrenceRow {
                cell_id: 7.0,
                occurrence_count: 2.0
            }]
        );
        assert_eq!(orch.state.render_stamp, 1);
        assert!(!orch.state.analyzing_occurrence);

        let calls = api.occurrence_calls.lock().map(|c| c.clone()).unwrap_or_default();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].grid_id, 3);
        assert_eq!(calls[0].array_splist[0].level, "family");
    }

    #[tokio::test]
    async fn test_occurrence_failure_surfaces_message() {
        let api = Arc::new(FakeApi::failing());
        let mut orch = orchestrator(&api);
        select_both_sections(&mut orch);

        orch.visualize().await;

        assert!(orch.state.occurrence_rows.is_empty());
        assert_eq!(orch.state.render_stamp, 1);
        assert_eq!(orch.state.validation_messages, vec![MSG_OCCURRENCE_FAILED]);
    }

    #[tokio::test]
    async fn test_niche_run_issues_single_request_and_fans_out() {
        let api = Arc::new(FakeApi::default());
        let map = Arc::new(RecordingMap::default());
        let map_dyn: Arc<dyn MapCollaborator> = map.clone();
        let mut orch = orchestrator(&api).with_map(map_dyn);
        select_both_sections(&mut orch);

        orch.visualize_niche().await;

        assert_eq!(count(&api.relation_calls), 1);
        assert_eq!(count(&map.shown), 1);
        assert_eq!(
            map.loading.lock().map(|l| l.clone()).unwrap_or_default(),
            vec![true, false]
        );

        let payload = api
            .relation_calls
            .lock()
            .map(|c| c[0].clone())
            .unwrap_or_else(|_| AnalysisPayload::new(0, "", ""));
        assert_eq!(
            payload,
            AnalysisPayload::new(3, "family = Felidae", "class = Aves, Reptilia")
        );

        assert_eq!(orch.state.relation_uuid.as_deref(), Some("run-1"));
        assert_eq!(orch.state.table_rows.len(), 2);
        assert!(!orch.state.analyzing_niche);
        let labels: Vec<&str> = orch
            .state
            .histogram
            .iter()
            .map(|p| p.label.as_str())
            .collect();
        assert_eq!(labels, vec!["10", "9"]);
        assert!((orch.state.histogram[1].value - 1.23).abs() < f64::EPSILON);
        assert_eq!(orch.state.rows_for_selected_decile().len(), 1);
    }

    #[tokio::test]
    async fn test_niche_failure_keeps_table_rows() {
        let api = Arc::new(FakeApi::failing());
        let map = Arc::new(RecordingMap::default());
        let map_dyn: Arc<dyn MapCollaborator> = map.clone();
        let mut orch = orchestrator(&api).with_map(map_dyn);
        select_both_sections(&mut orch);
        orch.state.relation_uuid = Some("previous".to_string());
        orch.state.table_rows = vec![json!({"cell": 4})];

        orch.visualize_niche().await;

        assert_eq!(orch.state.relation_uuid, None);
        assert_eq!(orch.state.table_rows, vec![json!({"cell": 4})]);
        assert_eq!(count(&map.shown), 0);
        assert_eq!(
            map.loading.lock().map(|l| l.clone()).unwrap_or_default(),
            vec![true, false]
        );
        assert!(!orch.state.analyzing_niche);
    }

    #[tokio::test]
    async fn test_failed_niche_run_hides_previous_histogram() {
        let api = Arc::new(FakeApi::default());
        let map = Arc::new(RecordingMap::default());
        let map_dyn: Arc<dyn MapCollaborator> = map.clone();
        let mut orch = orchestrator(&api).with_map(map_dyn);
        select_both_sections(&mut orch);

        orch.visualize_niche().await;
        assert_eq!(orch.state.histogram.len(), 2);

        api.fail.store(true, Ordering::SeqCst);
        orch.visualize_niche().await;

        assert_eq!(orch.state.relation_uuid, None);
        assert!(orch.state.histogram.is_empty());
        assert_eq!(orch.state.table_rows.len(), 2);
        assert_eq!(count(&api.relation_calls), 2);
    }

    #[tokio::test]
    async fn test_niche_without_map_is_a_validation_error() {
        let api = Arc::new(FakeApi::default());
        let mut orch = orchestrator(&api);
        select_both_sections(&mut orch);

        orch.visualize_niche().await;

        assert!(orch.state.show_validation);
        assert_eq!(count(&api.relation_calls), 0);
    }

    #[tokio::test]
    async fn test_late_ready_callback_from_superseded_run_is_ignored() {
        let api = Arc::new(FakeApi::default());
        let map = Arc::new(RecordingMap::default());
        let map_dyn: Arc<dyn MapCollaborator> = map.clone();
        let mut orch = orchestrator(&api).with_map(map_dyn);
        select_both_sections(&mut orch);

        let Some(Effect::FetchRelation { ticket: stale, .. }) =
            orch.dispatch(Action::NicheRequested { map_attached: true })
        else {
            panic!("expected a relation fetch");
        };
        orch.visualize_niche().await;
        let rows_after_latest = orch.state.table_rows.clone();

        let loading_before = map.loading.lock().map(|l| l.len()).unwrap_or_default();

        orch.on_relation_ready(stale, vec![json!({"cell": 99})]);

        assert_eq!(orch.state.table_rows, rows_after_latest);
        assert_eq!(
            map.loading.lock().map(|l| l.len()).unwrap_or_default(),
            loading_before
        );
    }

    #[tokio::test]
    async fn test_niche_map_run_combines_both_requests() {
        let api = Arc::new(FakeApi::default());
        let mut orch = orchestrator(&api);
        select_both_sections(&mut orch);

        orch.visualize_niche_map().await;

        assert_eq!(count(&api.niche_map_calls), 1);
        assert_eq!(count(&api.relation_calls), 1);
        let result = orch.state.niche_map.clone();
        assert_eq!(result.as_ref().and_then(|r| r.uuid.as_deref()), Some("run-1"));
        assert_eq!(result.as_ref().map(|r| r.stats.features), Some(1));
        assert_eq!(
            result.as_ref().map(|r| r.table_rows[0].cell.clone()),
            Some(json!(5))
        );
        assert!(!orch.state.analyzing_niche_map);
    }

    #[tokio::test]
    async fn test_niche_map_failures_degrade_to_empty_result() {
        let api = Arc::new(FakeApi::failing());
        let mut orch = orchestrator(&api);
        select_both_sections(&mut orch);

        orch.visualize_niche_map().await;

        let result = orch.state.niche_map.clone();
        assert_eq!(result.as_ref().map(|r| r.stats.features), Some(0));
        assert_eq!(result.as_ref().and_then(|r| r.uuid.clone()), None);
    }
}
