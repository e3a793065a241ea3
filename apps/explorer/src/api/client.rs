use crate::api::error::ApiError;
use crate::api::models::{CombinedConfig, FeatureCollection, OccurrenceRequest, RelationResponse};
use crate::config::AppConfig;
use crate::domain::{AnalysisPayload, OccurrenceRow};
use crate::results::normalize_occurrence_response;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

pub const OCCURRENCE_ENDPOINT: &str = "getOccOnMap";
pub const RELATION_ENDPOINT: &str = "getEpsScrRelation";
pub const NICHE_MAP_ENDPOINT: &str = "getOccMapaAnalisisNicho";

/// The analytics backend as seen by the client.
#[async_trait]
pub trait AnalyticsApi: Send + Sync {
    /// Occurrence counts per cell, already normalized.
    async fn occurrences_on_map(
        &self,
        request: &OccurrenceRequest,
    ) -> Result<Vec<OccurrenceRow>, ApiError>;

    async fn eps_score_relation(
        &self,
        payload: &AnalysisPayload,
    ) -> Result<RelationResponse, ApiError>;

    async fn niche_map(&self, config: &CombinedConfig) -> Result<FeatureCollection, ApiError>;
}

/// `reqwest` client for the `/mdf` endpoints.
#[derive(Debug, Clone)]
pub struct HttpAnalyticsApi {
    client: reqwest::Client,
    base_url: String,
}

impl HttpAnalyticsApi {
    pub fn new(config: &AppConfig) -> Result<Self, ApiError> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = config.request_timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| ApiError::Config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: config.api_base_url.clone(),
        })
    }

    pub fn endpoint_url(&self, endpoint: &str) -> String {
        endpoint_url(&self.base_url, endpoint)
    }

    async fn post_json<B, T>(&self, endpoint: &str, body: &B) -> Result<T, ApiError>
    where
        B: Serialize + Sync + ?Sized,
        T: DeserializeOwned,
    {
        let url = self.endpoint_url(endpoint);
        debug!(%url, "POST");

        let transport = |source: reqwest::Error| ApiError::Transport {
            endpoint: endpoint.to_string(),
            source,
        };

        let response = self
            .client
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(transport)?;

        let status = response.status();
        let text = response.text().await.map_err(transport)?;

        if !status.is_success() {
            return Err(ApiError::Status {
                endpoint: endpoint.to_string(),
                status: status.as_u16(),
                body: text.trim().to_string(),
            });
        }

        serde_json::from_str(&text).map_err(|source| ApiError::Decode {
            endpoint: endpoint.to_string(),
            source,
        })
    }
}

#[async_trait]
impl AnalyticsApi for HttpAnalyticsApi {
    async fn occurrences_on_map(
        &self,
        request: &OccurrenceRequest,
    ) -> Result<Vec<OccurrenceRow>, ApiError> {
        let body: Value = self.post_json(OCCURRENCE_ENDPOINT, request).await?;
        let rows = normalize_occurrence_response(&body);
        debug!(rows = rows.len(), "occurrence rows normalized");
        Ok(rows)
    }

    async fn eps_score_relation(
        &self,
        payload: &AnalysisPayload,
    ) -> Result<RelationResponse, ApiError> {
        self.post_json(RELATION_ENDPOINT, payload).await
    }

    async fn niche_map(&self, config: &CombinedConfig) -> Result<FeatureCollection, ApiError> {
        self.post_json(NICHE_MAP_ENDPOINT, config).await
    }
}

fn endpoint_url(base_url: &str, endpoint: &str) -> String {
    format!("{}/mdf/{endpoint}", base_url.trim_end_matches('/'))
}
