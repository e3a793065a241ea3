// Taxonomy module for niche_explorer
// Turns selector output into the backend's splist and query fragments

pub mod normalize;
pub mod query;

pub use normalize::{build_splist, to_taxonomy_levels};
pub use query::build_query_string;
