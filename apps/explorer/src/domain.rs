use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Source id the backend expects for occurrence-based relation queries.
pub const RELATION_SOURCE_ID: i64 = 1;
/// Minimum occurrences per cell for the epsilon/score relation.
pub const RELATION_MIN_OCCURRENCE: i64 = 5;
pub const RELATION_OFFSET: i64 = 0;
pub const RELATION_LIMIT: i64 = 100_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Section {
    Target,
    Covariates,
}

impl Section {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Target => "target",
            Self::Covariates => "covariates",
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Target => "Target",
            Self::Covariates => "Covariates",
        }
    }
}

/// A taxon selection as emitted by a selector widget.
///
/// Levels are kept in their raw shape; `taxonomy::normalize` flattens them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaxonSelection {
    #[serde(default, deserialize_with = "lenient_levels")]
    pub levels: Vec<RawLevel>,
}

impl TaxonSelection {
    /// Builds a selection from plain `(level, values)` pairs.
    pub fn from_pairs<L, V, I>(pairs: I) -> Self
    where
        L: Into<String>,
        V: Into<String>,
        I: IntoIterator<Item = (L, Vec<V>)>,
    {
        let levels = pairs
            .into_iter()
            .map(|(level, values)| RawLevel {
                level: Some(level.into()),
                values: Some(
                    values
                        .into_iter()
                        .map(|v| RawTaxonValue::Text(v.into()))
                        .collect(),
                ),
                ..RawLevel::default()
            })
            .collect();
        Self { levels }
    }
}

/// One level of a selection. Widgets disagree on where the values live,
/// so every known slot is optional. A list slot holding anything but an
/// array is treated as absent; a scalar level name is stringified.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawLevel {
    #[serde(default, deserialize_with = "lenient_level_name")]
    pub level: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient_list",
        skip_serializing_if = "Option::is_none"
    )]
    pub values: Option<Vec<RawTaxonValue>>,
    #[serde(
        default,
        deserialize_with = "lenient_list",
        skip_serializing_if = "Option::is_none"
    )]
    pub selected: Option<Vec<RawTaxonValue>>,
    #[serde(
        default,
        deserialize_with = "lenient_list",
        skip_serializing_if = "Option::is_none"
    )]
    pub items: Option<Vec<RawTaxonValue>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<RawTaxonValue>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawTaxonValue {
    Text(String),
    Number(serde_json::Number),
    Object(Map<String, Value>),
    Other(Value),
}

impl From<Value> for RawTaxonValue {
    fn from(value: Value) -> Self {
        match value {
            Value::String(s) => Self::Text(s),
            Value::Number(n) => Self::Number(n),
            Value::Object(map) => Self::Object(map),
            other => Self::Other(other),
        }
    }
}

// A non-array `levels` reads as no levels; non-object entries are skipped.
fn lenient_levels<'de, D>(deserializer: D) -> Result<Vec<RawLevel>, D::Error>
where
    D: Deserializer<'de>,
{
    let levels = match Value::deserialize(deserializer)? {
        Value::Array(items) => items
            .into_iter()
            .filter(Value::is_object)
            .filter_map(|item| serde_json::from_value(item).ok())
            .collect(),
        _ => Vec::new(),
    };
    Ok(levels)
}

fn lenient_level_name<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let name = match Value::deserialize(deserializer)? {
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    };
    Ok(name)
}

fn lenient_list<'de, D>(deserializer: D) -> Result<Option<Vec<RawTaxonValue>>, D::Error>
where
    D: Deserializer<'de>,
{
    let list = match Value::deserialize(deserializer)? {
        Value::Array(items) => Some(items.into_iter().map(RawTaxonValue::from).collect()),
        _ => None,
    };
    Ok(list)
}

/// A flattened `(level, value)` pair, `{nivel, valor}` on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SplistItem {
    #[serde(rename = "nivel")]
    pub level: String,
    #[serde(rename = "valor")]
    pub value: String,
}

impl SplistItem {
    pub fn new(level: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            level: level.into(),
            value: value.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationQuery {
    #[serde(rename = "id_source")]
    pub source_id: i64,
    #[serde(rename = "q")]
    pub query: String,
    pub offset: i64,
    pub limit: i64,
}

impl RelationQuery {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            source_id: RELATION_SOURCE_ID,
            query: query.into(),
            offset: RELATION_OFFSET,
            limit: RELATION_LIMIT,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisPayload {
    pub grid_id: i64,
    #[serde(rename = "min_occ")]
    pub min_occurrence: i64,
    pub target: Vec<RelationQuery>,
    #[serde(rename = "covars")]
    pub covariates: Vec<RelationQuery>,
}

impl AnalysisPayload {
    pub fn new(grid_id: i64, target_query: &str, covariate_query: &str) -> Self {
        Self {
            grid_id,
            min_occurrence: RELATION_MIN_OCCURRENCE,
            target: vec![RelationQuery::new(target_query)],
            covariates: vec![RelationQuery::new(covariate_query)],
        }
    }
}

/// Canonical per-cell occurrence count. Both fields are finite.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OccurrenceRow {
    pub cell_id: f64,
    #[serde(rename = "occ")]
    pub occurrence_count: f64,
}

/// A server-side decile bucket from `scoreDeciles`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreDecile {
    #[serde(rename = "decil")]
    pub decile: i64,
    #[serde(rename = "avg_score_cell")]
    pub average_score: f64,
    #[serde(default)]
    pub cell_count: i64,
}

/// One bar of the decile histogram.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistogramPoint {
    pub label: String,
    pub value: f64,
}

/// Snapshot of the target section handed to the occurrence map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MapQuery {
    pub region_id: i64,
    pub resolution: String,
    pub taxonomy: Vec<TaxonomyLevel>,
}

/// A `{level, values}` pair in the shape the map and niche-map endpoints use.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxonomyLevel {
    pub level: String,
    pub values: Vec<String>,
}
