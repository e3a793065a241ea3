// App module for niche_explorer
// Holds the analysis session state and drives the backend calls

pub mod actions;
pub mod map;
pub mod orchestrator;
pub mod state;
pub mod validation;

pub use actions::AppActions;
pub use map::{MapCollaborator, ResponseRowsMap};
pub use orchestrator::AnalysisOrchestrator;
pub use state::{Action, AnalysisSessionState, Effect, RunTicket, SectionState};
