use crate::api::models::{CombinedConfig, RegionConfig, RelationResponse, SectionConfig};
use crate::app::validation::{
    collect_niche_validation, collect_validation, MSG_NO_RELATION_MAP, MSG_OCCURRENCE_FAILED,
};
use crate::domain::{
    AnalysisPayload, HistogramPoint, MapQuery, OccurrenceRow, ScoreDecile, Section, SplistItem,
    TaxonSelection,
};
use crate::results::{histogram_from_buckets, histogram_from_rows, NicheResult};
use crate::taxonomy::{build_query_string, build_splist, to_taxonomy_levels};
use serde_json::Value;
use tracing::{debug, warn};

const DEFAULT_SELECTED_DECILE: u8 = 10;

/// Identifies one run. Completions carrying an older ticket are ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RunTicket(pub u64);

/// Selections made in one section of the screen.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SectionState {
    pub region_id: Option<i64>,
    pub resolution: Option<String>,
    pub grid_id: Option<i64>,
    pub selection: TaxonSelection,
}

impl SectionState {
    pub fn splist(&self) -> Vec<SplistItem> {
        build_splist(&self.selection)
    }
}

/// A user or network event.
#[derive(Debug, Clone)]
pub enum Action {
    RegionSelected { section: Section, region_id: i64 },
    ResolutionSelected { section: Section, resolution: String },
    GridSelected { section: Section, grid_id: i64 },
    SelectionChanged { section: Section, selection: TaxonSelection },
    DecileSelected(u8),
    OccurrenceRequested,
    OccurrenceLoaded { ticket: RunTicket, rows: Vec<OccurrenceRow> },
    OccurrenceFailed { ticket: RunTicket },
    NicheRequested { map_attached: bool },
    RelationLoaded { ticket: RunTicket, response: RelationResponse },
    RelationFailed { ticket: RunTicket },
    RelationReady { ticket: RunTicket, rows: Vec<Value> },
    NicheMapRequested,
    NicheMapLoaded { ticket: RunTicket, result: NicheResult },
}

/// Work the orchestrator has to perform after a transition.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    FetchOccurrences {
        ticket: RunTicket,
        grid_id: i64,
        splist: Vec<SplistItem>,
    },
    FetchRelation {
        ticket: RunTicket,
        payload: AnalysisPayload,
    },
    FetchNicheMap {
        ticket: RunTicket,
        config: CombinedConfig,
    },
}

/// Everything the presentation layer reads.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisSessionState {
    pub target: SectionState,
    pub covariates: SectionState,

    pub run_counter: u64,
    pub occurrence_ticket: Option<RunTicket>,
    pub niche_ticket: Option<RunTicket>,
    pub niche_map_ticket: Option<RunTicket>,

    // Occurrence section
    pub analyzing_occurrence: bool,
    pub map_query: Option<MapQuery>,
    pub occurrence_rows: Vec<OccurrenceRow>,
    /// Bumped whenever a new occurrence row set lands, for map refresh
    pub render_stamp: u64,

    // Niche section
    pub analyzing_niche: bool,
    pub last_payload: Option<AnalysisPayload>,
    pub relation_uuid: Option<String>,
    pub score_deciles: Vec<ScoreDecile>,
    pub histogram: Vec<HistogramPoint>,
    pub selected_decile: u8,
    pub table_rows: Vec<Value>,

    // Combined niche map
    pub analyzing_niche_map: bool,
    pub niche_map: Option<NicheResult>,

    pub show_validation: bool,
    pub validation_messages: Vec<String>,
}

impl Default for AnalysisSessionState {
    fn default() -> Self {
        Self::new()
    }
}

impl AnalysisSessionState {
    pub fn new() -> Self {
        Self {
            target: SectionState::default(),
            covariates: SectionState::default(),
            run_counter: 0,
            occurrence_ticket: None,
            niche_ticket: None,
            niche_map_ticket: None,
            analyzing_occurrence: false,
            map_query: None,
            occurrence_rows: Vec::new(),
            render_stamp: 0,
            analyzing_niche: false,
            last_payload: None,
            relation_uuid: None,
            score_deciles: Vec::new(),
            histogram: Vec::new(),
            selected_decile: DEFAULT_SELECTED_DECILE,
            table_rows: Vec::new(),
            analyzing_niche_map: false,
            niche_map: None,
            show_validation: false,
            validation_messages: Vec::new(),
        }
    }

    pub const fn section(&self, section: Section) -> &SectionState {
        match section {
            Section::Target => &self.target,
            Section::Covariates => &self.covariates,
        }
    }

    fn section_mut(&mut self, section: Section) -> &mut SectionState {
        match section {
            Section::Target => &mut self.target,
            Section::Covariates => &mut self.covariates,
        }
    }

    /// The grid both analyses run on. The covariates grid is never consulted.
    pub const fn grid_id(&self) -> Option<i64> {
        self.target.grid_id
    }

    /// Applies one action and reports the follow-up work, if any.
    pub fn apply(&mut self, action: Action) -> Option<Effect> {
        match action {
            Action::RegionSelected { section, region_id } => {
                self.section_mut(section).region_id = Some(region_id);
                self.clear_validation();
                None
            }
            Action::ResolutionSelected {
                section,
                resolution,
            } => {
                self.section_mut(section).resolution = Some(resolution);
                self.clear_validation();
                None
            }
            Action::GridSelected { section, grid_id } => {
                debug!(section = section.as_str(), grid_id, "grid selected");
                self.section_mut(section).grid_id = Some(grid_id);
                self.clear_validation();
                None
            }
            Action::SelectionChanged { section, selection } => {
                debug!(
                    section = section.as_str(),
                    levels = selection.levels.len(),
                    "selection changed"
                );
                self.section_mut(section).selection = selection;
                self.clear_validation();
                None
            }
            Action::DecileSelected(decile) => {
                self.selected_decile = decile.clamp(1, DEFAULT_SELECTED_DECILE);
                None
            }
            Action::OccurrenceRequested => self.start_occurrence(),
            Action::OccurrenceLoaded { ticket, rows } => {
                if self.accept(ticket, self.occurrence_ticket, "occurrence") {
                    self.occurrence_rows = rows;
                    self.finish_occurrence();
                }
                None
            }
            Action::OccurrenceFailed { ticket } => {
                if self.accept(ticket, self.occurrence_ticket, "occurrence") {
                    self.occurrence_rows.clear();
                    self.show_validation_messages(vec![MSG_OCCURRENCE_FAILED.to_string()]);
                    self.finish_occurrence();
                }
                None
            }
            Action::NicheRequested { map_attached } => self.start_niche(map_attached),
            Action::RelationLoaded { ticket, response } => {
                if self.accept(ticket, self.niche_ticket, "relation") {
                    self.relation_uuid = response.uuid;
                    self.selected_decile = DEFAULT_SELECTED_DECILE;
                    self.score_deciles = response.score_deciles.unwrap_or_default();
                    self.histogram = histogram_from_buckets(&self.score_deciles);
                }
                None
            }
            Action::RelationFailed { ticket } => {
                if self.accept(ticket, self.niche_ticket, "relation") {
                    // Hides the histogram; the table keeps its rows.
                    self.relation_uuid = None;
                    self.score_deciles.clear();
                    self.histogram.clear();
                    self.analyzing_niche = false;
                }
                None
            }
            Action::RelationReady { ticket, rows } => {
                if self.accept(ticket, self.niche_ticket, "relation map") {
                    self.table_rows = rows;
                    if self.histogram.is_empty() {
                        self.histogram = histogram_from_rows(&self.table_rows);
                    }
                    self.analyzing_niche = false;
                }
                None
            }
            Action::NicheMapRequested => self.start_niche_map(),
            Action::NicheMapLoaded { ticket, result } => {
                if self.accept(ticket, self.niche_map_ticket, "niche map") {
                    self.niche_map = Some(result);
                    self.analyzing_niche_map = false;
                }
                None
            }
        }
    }

    /// Table rows for the currently selected decile.
    pub fn rows_for_selected_decile(&self) -> Vec<&Value> {
        crate::results::deciles::rows_in_decile(&self.table_rows, self.selected_decile)
    }

    fn start_occurrence(&mut self) -> Option<Effect> {
        let splist = self.target.splist();
        let missing = collect_validation(self.grid_id(), &splist);
        if !missing.is_empty() {
            self.show_validation_messages(missing);
            return None;
        }
        let grid_id = self.grid_id()?;

        self.clear_validation();
        self.analyzing_occurrence = true;
        self.map_query = Some(MapQuery {
            region_id: self.target.region_id.unwrap_or(-1),
            resolution: self.target.resolution.clone().unwrap_or_default(),
            taxonomy: to_taxonomy_levels(&self.target.selection),
        });

        let ticket = self.next_ticket();
        self.occurrence_ticket = Some(ticket);
        Some(Effect::FetchOccurrences {
            ticket,
            grid_id,
            splist,
        })
    }

    fn finish_occurrence(&mut self) {
        self.render_stamp += 1;
        self.analyzing_occurrence = false;
    }

    fn start_niche(&mut self, map_attached: bool) -> Option<Effect> {
        let target = self.target.splist();
        let covariates = self.covariates.splist();
        let missing = collect_niche_validation(self.grid_id(), &target, &covariates);
        if !missing.is_empty() {
            self.show_validation_messages(missing);
            return None;
        }
        if !map_attached {
            warn!("niche run requested without a relation map");
            self.show_validation_messages(vec![MSG_NO_RELATION_MAP.to_string()]);
            return None;
        }
        let grid_id = self.grid_id()?;

        let payload = AnalysisPayload::new(
            grid_id,
            &build_query_string(&target),
            &build_query_string(&covariates),
        );
        debug!(?payload, "relation payload built");

        self.clear_validation();
        self.analyzing_niche = true;
        self.last_payload = Some(payload.clone());

        let ticket = self.next_ticket();
        self.niche_ticket = Some(ticket);
        Some(Effect::FetchRelation { ticket, payload })
    }

    fn start_niche_map(&mut self) -> Option<Effect> {
        let target = self.target.splist();
        let covariates = self.covariates.splist();
        let missing = collect_niche_validation(self.grid_id(), &target, &covariates);
        if !missing.is_empty() {
            self.show_validation_messages(missing);
            return None;
        }

        let config = self.combined_config();
        self.clear_validation();
        self.analyzing_niche_map = true;

        let ticket = self.next_ticket();
        self.niche_map_ticket = Some(ticket);
        Some(Effect::FetchNicheMap { ticket, config })
    }

    /// Request body for the niche map endpoint. Both blocks use the target grid.
    pub fn combined_config(&self) -> CombinedConfig {
        let block = |section: &SectionState| SectionConfig {
            region: match (section.region_id, section.resolution.as_ref(), self.grid_id()) {
                (Some(region_id), Some(resolution), Some(grid_id)) => Some(RegionConfig {
                    region_id,
                    resolution: resolution.clone(),
                    grid_id,
                }),
                _ => None,
            },
            taxonomy: Some(to_taxonomy_levels(&section.selection)),
        };

        CombinedConfig {
            base: block(&self.target),
            analysis: block(&self.covariates),
        }
    }

    fn next_ticket(&mut self) -> RunTicket {
        self.run_counter += 1;
        RunTicket(self.run_counter)
    }

    fn accept(&self, ticket: RunTicket, current: Option<RunTicket>, flow: &str) -> bool {
        if current == Some(ticket) {
            true
        } else {
            warn!(flow, ?ticket, ?current, "discarding stale result");
            false
        }
    }

    fn show_validation_messages(&mut self, msgs: Vec<String>) {
        self.show_validation = !msgs.is_empty();
        self.validation_messages = msgs;
    }

    fn clear_validation(&mut self) {
        self.show_validation = false;
        self.validation_messages.clear();
    }
}
