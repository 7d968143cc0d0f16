use anyhow::{Context, Result};
use popscale::{Rebalancer, Target};

pub fn run(cli: &crate::cli::Cli, args: &crate::cli::InspectArgs) -> Result<()> {
    let rebalancer = Rebalancer::open(super::load_config(cli)?).context("[inspect] Failed to load input files")?;
    let target = match args.region {
        true => Target::Region(args.name.clone()),
        false => Target::Area(args.name.clone()),
    };

    let inspection = rebalancer.inspect(&target)
        .with_context(|| format!("[inspect] Cannot resolve '{}'", args.name))?;
    super::emit(&inspection, args.json)
}
