// Results module for niche_explorer
// Reshapes backend responses into rows and series the presentation layer reads

pub mod coerce;
pub mod deciles;
pub mod niche;
pub mod occurrence;

pub use deciles::{aggregate_deciles, histogram_from_buckets, histogram_from_rows};
pub use niche::{build_niche_result, NicheResult, NicheStats, NicheTableRow};
pub use occurrence::{normalize_occurrence_response, normalize_occurrence_rows};
