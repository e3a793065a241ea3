use crate::api::models::RelationResponse;
use crate::domain::AnalysisPayload;
use async_trait::async_trait;
use serde_json::Value;

/// The map component that renders relation results.
///
/// It receives the payload together with the already fetched response and
/// returns the table rows once it is done rendering.
#[async_trait]
pub trait MapCollaborator: Send + Sync {
    async fn show_relation(
        &self,
        payload: &AnalysisPayload,
        response: &RelationResponse,
    ) -> Vec<Value>;

    fn set_loading(&self, _loading: bool) {}
}

/// Headless collaborator: the table is whatever row array the backend
/// attached to the relation response under `data`.
#[derive(Debug, Default, Clone, Copy)]
pub struct ResponseRowsMap;

#[async_trait]
impl MapCollaborator for ResponseRowsMap {
    async fn show_relation(
        &self,
        _payload: &AnalysisPayload,
        response: &RelationResponse,
    ) -> Vec<Value> {
        response
            .extra
            .get("data")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default()
    }
}
