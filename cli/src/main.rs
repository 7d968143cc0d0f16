mod cli;
mod commands;

use cli::{Cli, Commands};
use commands::{import, inspect, scale};

fn init_logging(verbose: u8) {
    use tracing_subscriber::{EnvFilter, fmt};

    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    fmt().with_env_filter(filter).with_target(false).with_writer(std::io::stderr).init();
}

pub fn run() -> anyhow::Result<()> {
    use clap::Parser;

    let cli = Cli::parse();
    init_logging(cli.verbose);
    match &cli.command {
        Commands::Scale(args) => scale::run(&cli, args),
        Commands::Inspect(args) => inspect::run(&cli, args),
        Commands::Import(args) => import::run(&cli, args),
    }
}

fn main() -> anyhow::Result<()> { run() }
