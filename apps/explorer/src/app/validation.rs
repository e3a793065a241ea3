use crate::domain::{Section, SplistItem};

pub const MSG_INVALID_GRID: &str = "Select a region and a resolution (invalid grid id).";
pub const MSG_NO_TAXON: &str = "Select at least one taxon in the navigator.";
pub const MSG_NICHE_NO_GRID: &str = "Select a region and resolution in the Target section.";
pub const MSG_OCCURRENCE_FAILED: &str = "An error occurred while fetching occurrence data.";
pub const MSG_NO_RELATION_MAP: &str = "No relation map is attached to the Covariates section.";

/// Checks for the occurrence run. Empty when the run may proceed.
pub fn collect_validation(grid_id: Option<i64>, splist: &[SplistItem]) -> Vec<String> {
    let mut msgs = Vec::new();
    if !is_valid_grid(grid_id) {
        msgs.push(MSG_INVALID_GRID.to_string());
    }
    if splist.is_empty() {
        msgs.push(MSG_NO_TAXON.to_string());
    }
    msgs
}

/// Checks for the niche run. A missing grid short-circuits the taxon checks.
pub fn collect_niche_validation(
    grid_id: Option<i64>,
    target: &[SplistItem],
    covariates: &[SplistItem],
) -> Vec<String> {
    if !is_valid_grid(grid_id) {
        return vec![MSG_NICHE_NO_GRID.to_string()];
    }

    let mut msgs = Vec::new();
    if target.is_empty() {
        msgs.push(missing_taxon(Section::Target));
    }
    if covariates.is_empty() {
        msgs.push(missing_taxon(Section::Covariates));
    }
    msgs
}

pub fn missing_taxon(section: Section) -> String {
    format!("Select at least one taxon in {}.", section.label())
}

fn is_valid_grid(grid_id: Option<i64>) -> bool {
    grid_id.is_some_and(|id| id > 0)
}
