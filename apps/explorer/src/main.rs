use chrono::Utc;
use clap::Parser;
use color_eyre::Result;
use niche_explorer::api::HttpAnalyticsApi;
use niche_explorer::app::{Action, AnalysisOrchestrator, AppActions, ResponseRowsMap};
use niche_explorer::cli::{CliArgs, Command, RegionArgs};
use niche_explorer::config::{init_app_config, AppConfig};
use niche_explorer::domain::Section;
use niche_explorer::logging::init_tracing;
use niche_explorer::report::{QueryReport, Report, ReportKind};
use niche_explorer::taxonomy::{build_query_string, build_splist};
use niche_explorer::TaxonSelection;
use std::sync::Arc;
use tracing::debug;

#[tokio::main]
async fn main() -> Result<()> {
    // Setup error handling
    color_eyre::install()?;

    let args = CliArgs::parse();
    args.apply_env_overrides();

    let config = init_app_config()?;
    init_tracing(config.debug);
    debug!(?config, "configuration loaded");

    // Piped output gets JSON unless asked otherwise
    let json = args.json || !is_terminal();

    let (orchestrator, kind) = match &args.command {
        Command::Query(taxa) => {
            let splist = build_splist(&taxa.selection()?);
            let report = QueryReport {
                query: build_query_string(&splist),
                splist,
            };
            return print_report(json, || report.to_text(), || report.to_json());
        }
        Command::Occurrence { region, taxa } => {
            let mut orchestrator = build_orchestrator(&config)?;
            select_region(&mut orchestrator, Section::Target, region);
            select_taxa(&mut orchestrator, Section::Target, taxa.selection()?);
            orchestrator.visualize().await;
            (orchestrator, ReportKind::Occurrence)
        }
        Command::Niche {
            region,
            taxa,
            decile,
        } => {
            let mut orchestrator = build_orchestrator(&config)?;
            select_region(&mut orchestrator, Section::Target, region);
            select_taxa(&mut orchestrator, Section::Target, taxa.target()?);
            select_taxa(&mut orchestrator, Section::Covariates, taxa.covariates()?);
            orchestrator.visualize_niche().await;
            orchestrator.dispatch(Action::DecileSelected(*decile));
            (orchestrator, ReportKind::Niche)
        }
        Command::NicheMap {
            region,
            taxa,
            covariate_region,
            covariate_resolution,
        } => {
            let mut orchestrator = build_orchestrator(&config)?;
            select_region(&mut orchestrator, Section::Target, region);
            let covariate_area = RegionArgs {
                region: covariate_region.or(region.region),
                resolution: covariate_resolution
                    .clone()
                    .or_else(|| region.resolution.clone()),
                grid: None,
            };
            select_region(&mut orchestrator, Section::Covariates, &covariate_area);
            select_taxa(&mut orchestrator, Section::Target, taxa.target()?);
            select_taxa(&mut orchestrator, Section::Covariates, taxa.covariates()?);
            orchestrator.visualize_niche_map().await;
            (orchestrator, ReportKind::NicheMap)
        }
    };

    let report = Report::from_state(&orchestrator.state, kind, Utc::now());
    print_report(json, || report.to_text(), || report.to_json())
}

fn build_orchestrator(config: &AppConfig) -> Result<AnalysisOrchestrator> {
    let api = HttpAnalyticsApi::new(config)?;
    let actions = AppActions::new(Arc::new(api));
    Ok(AnalysisOrchestrator::new(actions).with_map(Arc::new(ResponseRowsMap)))
}

fn select_region(orchestrator: &mut AnalysisOrchestrator, section: Section, args: &RegionArgs) {
    if let Some(region_id) = args.region {
        orchestrator.dispatch(Action::RegionSelected { section, region_id });
    }
    if let Some(resolution) = &args.resolution {
        orchestrator.dispatch(Action::ResolutionSelected {
            section,
            resolution: resolution.clone(),
        });
    }
    if let Some(grid_id) = args.grid {
        orchestrator.dispatch(Action::GridSelected { section, grid_id });
    }
}

fn select_taxa(orchestrator: &mut AnalysisOrchestrator, section: Section, selection: TaxonSelection) {
    orchestrator.dispatch(Action::SelectionChanged { section, selection });
}

fn print_report(
    json: bool,
    text: impl FnOnce() -> String,
    to_json: impl FnOnce() -> serde_json::Result<String>,
) -> Result<()> {
    if json {
        println!("{}", to_json()?);
    } else {
        print!("{}", text());
    }
    Ok(())
}

// Check if we're running in a terminal
fn is_terminal() -> bool {
    atty::is(atty::Stream::Stdout)
}
