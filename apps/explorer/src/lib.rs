// Export our modules for use in the binary and tests
pub mod api;
pub mod app;
pub mod cli;
pub mod config;
pub mod domain;
pub mod logging;
pub mod report;
pub mod results;
pub mod taxonomy;

pub use domain::{Section, SplistItem, TaxonSelection};
