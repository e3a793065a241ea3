pub mod client;
pub mod error;
pub mod models;

pub use client::{AnalyticsApi, HttpAnalyticsApi};
pub use error::ApiError;
pub use models::{CombinedConfig, FeatureCollection, OccurrenceRequest, RelationResponse};
