use std::path::PathBuf;

/// Population rebalancing CLI (argument schema only)
#[derive(clap::Parser, Debug)]
#[command(name = "popscale", version, about, propagate_version = true)]
pub struct Cli {
    /// Increase output verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// TOML settings file; flags below override it
    #[arg(long, global = true, value_hint = clap::ValueHint::FilePath)]
    pub config: Option<PathBuf>,

    /// Hierarchy definitions file
    #[arg(long, global = true, value_hint = clap::ValueHint::FilePath)]
    pub definitions: Option<PathBuf>,

    /// Population data file to rewrite
    #[arg(long, global = true, value_hint = clap::ValueHint::FilePath)]
    pub data: Option<PathBuf>,

    /// Suffix appended to the data file name for the backup, defaults to ".backup"
    #[arg(long, global = true)]
    pub backup_suffix: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(clap::Subcommand, Debug)]
pub enum Commands {
    /// Rescale every location under an area or region to a new total
    Scale(ScaleArgs),

    /// Show what a name resolves to and its current total
    Inspect(InspectArgs),

    /// Replace location blocks with rows from a CSV file
    Import(ImportArgs),
}

#[derive(clap::Args, Debug)]
pub struct ScaleArgs {
    /// Area (or, with --region, region) id
    pub name: String,

    /// New total population, must be positive
    pub total: f64,

    /// Treat NAME as a region and scale all of its areas together
    #[arg(long)]
    pub region: bool,

    /// Print the rescaled blocks instead of rewriting the data file
    #[arg(long)]
    pub dry_run: bool,

    /// Print the run summary as JSON
    #[arg(long)]
    pub json: bool,

    /// Do not insert a comment before the rewritten blocks
    #[arg(long)]
    pub no_annotate: bool,

    /// Require an exact area id (no substring matching)
    #[arg(long)]
    pub exact: bool,
}

#[derive(clap::Args, Debug)]
pub struct InspectArgs {
    /// Area (or, with --region, region) id
    pub name: String,

    #[arg(long)]
    pub region: bool,

    /// Print the result as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(clap::Args, Debug)]
pub struct ImportArgs {
    /// CSV with a header row: location, type, size, culture, religion
    #[arg(value_hint = clap::ValueHint::FilePath)]
    pub records: PathBuf,

    /// Print the imported blocks instead of rewriting the data file
    #[arg(long)]
    pub dry_run: bool,

    /// Print the run summary as JSON
    #[arg(long)]
    pub json: bool,
}
