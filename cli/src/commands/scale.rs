use anyhow::{Context, Result, ensure};
use popscale::{Rebalancer, Target};

pub fn run(cli: &crate::cli::Cli, args: &crate::cli::ScaleArgs) -> Result<()> {
    ensure!(args.total.is_finite() && args.total > 0.0, "[scale] total must be a positive number, got {}", args.total);

    let mut config = super::load_config(cli)?;
    if args.no_annotate { config.annotate = false }
    if args.exact { config.fuzzy = false }

    let rebalancer = Rebalancer::open(config).context("[scale] Failed to load input files")?;
    let target = match args.region {
        true => Target::Region(args.name.clone()),
        false => Target::Area(args.name.clone()),
    };

    let plan = rebalancer.plan(&target, args.total)
        .with_context(|| format!("[scale] Cannot scale '{}'", args.name))?;
    let mut summary = plan.summary();

    if args.dry_run {
        if !args.json {
            print!("{}", plan.preview(&rebalancer.renderer()));
        }
        tracing::info!("dry run, data file left unchanged");
    } else {
        let report = rebalancer.commit(&plan.splice)
            .with_context(|| format!("[scale] Failed to rewrite {}", rebalancer.config().data.display()))?;
        summary = summary.committed(&report);
    }

    super::emit(&summary, args.json)
}
