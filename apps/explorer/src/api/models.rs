use crate::domain::{ScoreDecile, SplistItem, TaxonomyLevel};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Body of `POST /mdf/getOccOnMap`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OccurrenceRequest {
    pub grid_id: i64,
    pub array_splist: Vec<SplistItem>,
}

/// Body returned by `POST /mdf/getEpsScrRelation`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RelationResponse {
    #[serde(default)]
    pub uuid: Option<String>,
    #[serde(
        rename = "scoreDeciles",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub score_deciles: Option<Vec<ScoreDecile>>,
    /// Anything else the backend sends along (row data for the map, paging info)
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Body of `POST /mdf/getOccMapaAnalisisNicho`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CombinedConfig {
    pub base: SectionConfig,
    pub analysis: SectionConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<RegionConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub taxonomy: Option<Vec<TaxonomyLevel>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegionConfig {
    pub region_id: i64,
    pub resolution: String,
    pub grid_id: i64,
}

/// GeoJSON feature collection as returned by the niche map endpoint.
/// Geometry is passed through untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureCollection {
    #[serde(rename = "type", default = "feature_collection_kind")]
    pub kind: String,
    #[serde(default)]
    pub features: Vec<Feature>,
}

impl Default for FeatureCollection {
    fn default() -> Self {
        Self {
            kind: feature_collection_kind(),
            features: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feature {
    #[serde(rename = "type", default = "feature_kind")]
    pub kind: String,
    #[serde(default)]
    pub geometry: Value,
    #[serde(default)]
    pub properties: Option<Map<String, Value>>,
}

fn feature_collection_kind() -> String {
    "FeatureCollection".to_string()
}

fn feature_kind() -> String {
    "Feature".to_string()
}
