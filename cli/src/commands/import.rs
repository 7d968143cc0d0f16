use anyhow::{Context, Result};
use popscale::{Rebalancer, records::CsvSource};

pub fn run(cli: &crate::cli::Cli, args: &crate::cli::ImportArgs) -> Result<()> {
    let rebalancer = Rebalancer::open(super::load_config(cli)?).context("[import] Failed to load input files")?;
    let source = CsvSource::read(&args.records)?;

    let plan = rebalancer.plan_import(&source)
        .with_context(|| format!("[import] Cannot import {}", args.records.display()))?;
    let mut summary = plan.summary();

    if args.dry_run {
        if !args.json {
            print!("{}", rebalancer.renderer().document(&plan.leaves, None));
        }
    } else {
        let report = rebalancer.commit(&plan.splice)
            .with_context(|| format!("[import] Failed to rewrite {}", rebalancer.config().data.display()))?;
        summary = summary.committed(&report);
    }

    super::emit(&summary, args.json)
}
