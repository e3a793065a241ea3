use crate::domain::TaxonSelection;
use clap::{Args, Parser, Subcommand};
use color_eyre::eyre::{eyre, Result, WrapErr};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(
    name = "niche-explorer",
    version,
    about = "Occurrence and niche analyses against the MDF backend"
)]
pub struct CliArgs {
    /// Print reports as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,

    /// Override the backend base URL
    #[arg(long = "api-base", value_name = "URL", global = true)]
    pub api_base: Option<String>,

    /// Request timeout in seconds
    #[arg(long, value_name = "SECS", global = true)]
    pub timeout: Option<u64>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Print the splist and query string for a selection, without calling the backend
    Query(TaxaArgs),
    /// Occurrence counts per grid cell for the target taxa
    Occurrence {
        #[command(flatten)]
        region: RegionArgs,
        #[command(flatten)]
        taxa: TaxaArgs,
    },
    /// Epsilon/score relation between target and covariates
    Niche {
        #[command(flatten)]
        region: RegionArgs,
        #[command(flatten)]
        taxa: NicheTaxaArgs,
        /// Decile whose rows are listed
        #[arg(long, value_name = "1-10", default_value_t = 10)]
        decile: u8,
    },
    /// Niche map geometry with per-cell table and summary
    NicheMap {
        #[command(flatten)]
        region: RegionArgs,
        #[command(flatten)]
        taxa: NicheTaxaArgs,
        /// Region id of the covariates section
        #[arg(long = "covariate-region", value_name = "ID")]
        covariate_region: Option<i64>,
        /// Resolution of the covariates section
        #[arg(long = "covariate-resolution", value_name = "RES")]
        covariate_resolution: Option<String>,
    },
}

/// Region, resolution and grid of the target section.
#[derive(Debug, Clone, Args)]
pub struct RegionArgs {
    #[arg(long, value_name = "ID")]
    pub region: Option<i64>,

    #[arg(long, value_name = "RES")]
    pub resolution: Option<String>,

    #[arg(long, value_name = "ID")]
    pub grid: Option<i64>,
}

#[derive(Debug, Clone, Args)]
pub struct TaxaArgs {
    /// Taxa as `level=value1,value2`, repeatable
    #[arg(long = "taxon", value_name = "LEVEL=VALUES")]
    pub taxa: Vec<String>,

    /// Free-form selection JSON file
    #[arg(long, value_name = "FILE", conflicts_with = "taxa")]
    pub selection: Option<PathBuf>,
}

impl TaxaArgs {
    pub fn selection(&self) -> Result<TaxonSelection> {
        load_selection(&self.taxa, self.selection.as_ref())
    }
}

#[derive(Debug, Clone, Args)]
pub struct NicheTaxaArgs {
    /// Target taxa as `level=value1,value2`, repeatable
    #[arg(long = "taxon", value_name = "LEVEL=VALUES")]
    pub target: Vec<String>,

    /// Target selection JSON file
    #[arg(long = "selection", value_name = "FILE", conflicts_with = "target")]
    pub target_selection: Option<PathBuf>,

    /// Covariate taxa as `level=value1,value2`, repeatable
    #[arg(long = "covariate", value_name = "LEVEL=VALUES")]
    pub covariates: Vec<String>,

    /// Covariate selection JSON file
    #[arg(
        long = "covariate-selection",
        value_name = "FILE",
        conflicts_with = "covariates"
    )]
    pub covariate_selection: Option<PathBuf>,
}

impl NicheTaxaArgs {
    pub fn target(&self) -> Result<TaxonSelection> {
        load_selection(&self.target, self.target_selection.as_ref())
    }

    pub fn covariates(&self) -> Result<TaxonSelection> {
        load_selection(&self.covariates, self.covariate_selection.as_ref())
    }
}

impl CliArgs {
    pub fn apply_env_overrides(&self) {
        if let Some(base) = &self.api_base {
            std::env::set_var("API_BASE_URL", base);
        }
        if let Some(secs) = self.timeout {
            std::env::set_var("REQUEST_TIMEOUT_SECS", secs.to_string());
        }
        if self.debug {
            std::env::set_var("DEBUG", "1");
        }
    }
}

/// Parses `level=value1,value2` into a level name and its values.
pub fn parse_taxon_arg(raw: &str) -> Result<(String, Vec<String>)> {
    let (level, values) = raw
        .split_once('=')
        .ok_or_else(|| eyre!("Expected LEVEL=VALUES, got '{raw}'"))?;

    let level = level.trim();
    if level.is_empty() {
        return Err(eyre!("Missing taxonomic level in '{raw}'"));
    }

    let values: Vec<String> = values
        .split(',')
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .collect();
    if values.is_empty() {
        return Err(eyre!("No values given for level '{level}'"));
    }

    Ok((level.to_string(), values))
}

fn load_selection(taxa: &[String], file: Option<&PathBuf>) -> Result<TaxonSelection> {
    if let Some(path) = file {
        let raw = std::fs::read_to_string(path)
            .wrap_err_with(|| format!("Failed to read selection file {}", path.display()))?;
        return parse_selection_json(&raw)
            .wrap_err_with(|| format!("Invalid selection file {}", path.display()));
    }

    let pairs = taxa
        .iter()
        .map(|raw| parse_taxon_arg(raw))
        .collect::<Result<Vec<_>>>()?;
    Ok(TaxonSelection::from_pairs(pairs))
}

/// Accepts either `{"levels": [...]}` or a bare array of levels.
pub fn parse_selection_json(raw: &str) -> Result<TaxonSelection> {
    let value: serde_json::Value = serde_json::from_str(raw)?;
    let value = if value.is_array() {
        serde_json::json!({ "levels": value })
    } else {
        value
    };
    Ok(serde_json::from_value(value)?)
}
