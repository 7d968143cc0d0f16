//! The rebalancing run: resolve a node, rescale its locations, splice the data file.

use std::{fmt, path::PathBuf, sync::Arc};

use indexmap::IndexMap;
use serde::Serialize;
use tracing::info;

use crate::{
    aggregate::{Aggregate, ResolutionResult, aggregate},
    config::ScaleConfig,
    error::{Error, Result},
    hierarchy::{Hierarchy, NodeKind, Resolution, Target},
    io::{self, CommitReport},
    records::{RecordFields, RecordSource, leaves_from_records},
    rescale::{RescaleOutcome, rescale},
    splice::{Splice, splice},
    store::{LeafRecord, LeafStore, Renderer},
};

/// Parsed definitions and data for one run.
#[derive(Debug, Clone)]
pub struct Rebalancer {
    config: ScaleConfig,
    hierarchy: Hierarchy,
    store: LeafStore,
    data_text: String,
}

impl Rebalancer {
    /// Read and parse the definitions and data files named by `config`.
    pub fn open(config: ScaleConfig) -> Result<Self> {
        let definitions = io::read_text(&config.definitions)?;
        let data = io::read_text(&config.data)?;
        info!(definitions = %config.definitions.display(), data = %config.data.display(), "loaded input files");
        Self::from_texts(config, &definitions, data)
    }

    pub fn from_texts(config: ScaleConfig, definitions: &str, data_text: String) -> Result<Self> {
        let hierarchy = Hierarchy::parse(definitions, &config.conventions)?;
        let store = LeafStore::parse(&data_text, &config.conventions)?;
        Ok(Self { config, hierarchy, store, data_text })
    }

    #[inline] pub fn config(&self) -> &ScaleConfig { &self.config }

    #[inline] pub fn hierarchy(&self) -> &Hierarchy { &self.hierarchy }

    #[inline] pub fn store(&self) -> &LeafStore { &self.store }

    #[inline] pub fn data_text(&self) -> &str { &self.data_text }

    /// Resolve `target` and report the current totals, even when they are zero.
    pub fn inspect(&self, target: &Target) -> Result<Inspection> {
        let resolution = self.hierarchy.resolve_target(target, self.config.fuzzy)?;
        let tally = Aggregate::tally(&self.store, &resolution.leaves);
        Ok(Inspection {
            kind: resolution.kind,
            areas: resolution.areas.clone(),
            result: ResolutionResult::new(&resolution, &tally),
        })
    }

    /// Compute the rewrite that brings `target` to `total`, without touching any file.
    pub fn plan(&self, target: &Target, total: f64) -> Result<ScalePlan> {
        if !total.is_finite() || total <= 0.0 {
            return Err(Error::InvalidTarget(total));
        }

        let resolution = self.hierarchy.resolve_target(target, self.config.fuzzy)?;
        let aggregate = aggregate(&self.store, &resolution.matched, &resolution.leaves)?;
        let outcome = rescale(
            &self.store,
            &resolution.matched,
            &aggregate.found,
            total,
            self.config.tolerance,
            self.config.precision,
        )?;

        let annotation = self.config.annotate.then(|| default_annotation(&resolution, total));
        let splice = splice(
            &self.data_text,
            &outcome.per_leaf,
            annotation.as_deref(),
            &self.config.conventions,
            self.config.precision,
        )?;

        Ok(ScalePlan { target_total: total, resolution, aggregate, outcome, annotation, splice })
    }

    /// Compute the rewrite that replaces the blocks of every location in `source`.
    pub fn plan_import(&self, source: &dyn RecordSource) -> Result<ImportPlan> {
        let records = source.records().map_err(Error::Records)?;
        let fields = RecordFields::from_conventions(&self.config.conventions);
        let (leaves, skipped) = leaves_from_records(&records, &fields);

        let annotation = self.config.annotate
            .then(|| format!("Imported population for {} locations", leaves.len()));
        let splice = splice(
            &self.data_text,
            &leaves,
            annotation.as_deref(),
            &self.config.conventions,
            self.config.precision,
        )?;

        info!(rows = records.len(), locations = leaves.len(), skipped, "planned import");
        Ok(ImportPlan { rows: records.len(), skipped, leaves, splice })
    }

    /// Back up the data file, then replace it with the spliced text.
    pub fn commit(&self, splice: &Splice) -> Result<CommitReport> {
        io::commit(&self.config.data, &splice.backup, &splice.text, &self.config.backup_suffix)
    }

    #[inline] pub fn renderer(&self) -> Renderer<'_> {
        Renderer::new(&self.config.conventions, self.config.precision)
    }
}

/// `Scaled population for <name>: <total>`, noting the area count for regions.
pub fn default_annotation(resolution: &Resolution, total: f64) -> String {
    let mut text = format!("Scaled population for {}: {:.1}", resolution.matched, total);
    if resolution.kind == NodeKind::Region {
        text.push_str(&format!(" (from {} areas)", resolution.areas.len()));
    }
    text
}

/// A resolution with the current totals of its locations.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Inspection {
    pub kind: NodeKind,
    pub areas: Vec<Arc<str>>,
    #[serde(flatten)]
    pub result: ResolutionResult,
}

impl fmt::Display for Inspection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let r = &self.result;
        writeln!(f, "{} {} (requested '{}')", self.kind, r.matched_name, r.requested_name)?;
        if self.kind == NodeKind::Region {
            writeln!(f, "  areas: {}", self.areas.len())?;
        }
        writeln!(f, "  locations: {} ({} with data)", r.matched_leaf_ids.len(), r.found.len())?;
        for (id, subtotal) in &r.found {
            writeln!(f, "    {id:<32} {subtotal:>14.3}")?;
        }
        if !r.missing.is_empty() {
            writeln!(f, "  missing data: {}", join(&r.missing))?;
        }
        write!(f, "  total: {:.3}", r.total)
    }
}

/// Everything computed for a scale request, ready to preview or commit.
#[derive(Debug, Clone)]
pub struct ScalePlan {
    pub target_total: f64,
    pub resolution: Resolution,
    pub aggregate: Aggregate,
    pub outcome: RescaleOutcome,
    pub annotation: Option<String>,
    pub splice: Splice,
}

impl ScalePlan {
    pub fn summary(&self) -> RunSummary {
        RunSummary {
            requested: self.resolution.requested.clone(),
            matched: Arc::clone(&self.resolution.matched),
            kind: self.resolution.kind,
            areas: self.resolution.areas.len(),
            matched_leaves: self.resolution.leaves.len(),
            found: self.aggregate.found.len(),
            missing: self.aggregate.missing.clone(),
            previous_total: self.outcome.previous_total,
            target_total: self.target_total,
            new_total: self.outcome.new_total,
            scale_factor: self.outcome.scale_factor,
            replaced: self.splice.replaced.clone(),
            missing_targets: self.splice.missing_targets.clone(),
            backup: None,
        }
    }

    /// The rescaled blocks as a standalone document, for dry runs.
    pub fn preview(&self, renderer: &Renderer<'_>) -> String {
        renderer.document(&self.outcome.per_leaf, self.annotation.as_deref())
    }
}

/// Outcome of a scale run, printable or serializable as JSON.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunSummary {
    pub requested: String,
    pub matched: Arc<str>,
    pub kind: NodeKind,
    pub areas: usize,
    pub matched_leaves: usize,
    pub found: usize,
    pub missing: Vec<Arc<str>>,
    pub previous_total: f64,
    pub target_total: f64,
    pub new_total: f64,
    pub scale_factor: f64,
    pub replaced: Vec<Arc<str>>,
    pub missing_targets: Vec<Arc<str>>,
    /// Set once the data file has been rewritten.
    pub backup: Option<PathBuf>,
}

impl RunSummary {
    pub fn committed(mut self, report: &CommitReport) -> Self {
        self.backup = Some(report.backup.clone());
        self
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.matched.as_ref() != self.requested {
            writeln!(f, "'{}' matched {} {}", self.requested, self.kind, self.matched)?;
        } else {
            writeln!(f, "{} {}", self.kind, self.matched)?;
        }
        if self.kind == NodeKind::Region {
            writeln!(f, "  areas: {}", self.areas)?;
        }
        writeln!(f, "  locations: {} ({} with data)", self.matched_leaves, self.found)?;
        writeln!(f, "  total: {:.3} -> {:.3} (target {:.3}, factor {:.6})",
            self.previous_total, self.new_total, self.target_total, self.scale_factor)?;
        if !self.missing.is_empty() {
            writeln!(f, "  missing data: {}", join(&self.missing))?;
        }
        if !self.missing_targets.is_empty() {
            writeln!(f, "  no block in data file: {}", join(&self.missing_targets))?;
        }
        write!(f, "  blocks replaced: {}", self.replaced.len())?;
        match &self.backup {
            Some(path) => write!(f, "\n  backup: {}", path.display()),
            None => Ok(()),
        }
    }
}

/// Locations read from a record source and the rewrite that installs them.
#[derive(Debug, Clone)]
pub struct ImportPlan {
    pub rows: usize,
    pub skipped: usize,
    pub leaves: IndexMap<Arc<str>, LeafRecord>,
    pub splice: Splice,
}

impl ImportPlan {
    pub fn summary(&self) -> ImportSummary {
        ImportSummary {
            rows: self.rows,
            skipped: self.skipped,
            locations: self.leaves.len(),
            total: self.leaves.values().map(LeafRecord::total).sum(),
            replaced: self.splice.replaced.clone(),
            missing_targets: self.splice.missing_targets.clone(),
            backup: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImportSummary {
    pub rows: usize,
    pub skipped: usize,
    pub locations: usize,
    pub total: f64,
    pub replaced: Vec<Arc<str>>,
    pub missing_targets: Vec<Arc<str>>,
    pub backup: Option<PathBuf>,
}

impl ImportSummary {
    pub fn committed(mut self, report: &CommitReport) -> Self {
        self.backup = Some(report.backup.clone());
        self
    }
}

impl fmt::Display for ImportSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "rows: {} ({} skipped)", self.rows, self.skipped)?;
        writeln!(f, "  locations: {} (total {:.3})", self.locations, self.total)?;
        if !self.missing_targets.is_empty() {
            writeln!(f, "  no block in data file: {}", join(&self.missing_targets))?;
        }
        write!(f, "  blocks replaced: {}", self.replaced.len())?;
        match &self.backup {
            Some(path) => write!(f, "\n  backup: {}", path.display()),
            None => Ok(()),
        }
    }
}

fn join(ids: &[Arc<str>]) -> String {
    ids.iter().map(|id| &**id).collect::<Vec<_>>().join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::{Scalar, VecSource};

    const DEFINITIONS: &str = "\
world = {
\tnorth_region = {
\t\tx_area = {
\t\t\tx_province = { loc1 loc2 }
\t\t}
\t\ty_2_area = {
\t\t\ty_province = { loc3 }
\t\t}
\t}
\tbare_region = {
\t}
}
";

    const DATA: &str = "\
locations = {
\tloc1 = {
\t\tdefine_pop = {\ttype = peasants\tsize = 100\tculture = a\treligion = b }
\t}
\tloc2 = {
\t\tdefine_pop = {\ttype = peasants\tsize = 300\tculture = a\treligion = b }
\t}
\tloc3 = {
\t\tdefine_pop = {\ttype = nobles\tsize = 40\tculture = a\treligion = b }
\t}
}
";

    fn rebalancer(annotate: bool) -> Rebalancer {
        let config = ScaleConfig { annotate, ..ScaleConfig::default() };
        Rebalancer::from_texts(config, DEFINITIONS, DATA.to_string()).unwrap()
    }

    #[test]
    fn plans_area_rescale() {
        let plan = rebalancer(true).plan(&Target::Area("x_area".into()), 200.0).unwrap();
        let summary = plan.summary();

        assert_eq!(summary.previous_total, 400.0);
        assert_eq!(summary.scale_factor, 0.5);
        assert_eq!(summary.new_total, 200.0);
        assert_eq!(plan.annotation.as_deref(), Some("Scaled population for x_area: 200.0"));
        assert!(plan.splice.text.contains("\t# Scaled population for x_area: 200.0\n\tloc1 = {"));
        assert!(plan.splice.text.contains("size = 50.000"));
        assert!(plan.splice.text.contains("size = 150.000"));
        assert!(plan.splice.text.contains("size = 40\t"));
    }

    #[test]
    fn summary_serializes_for_json_output() {
        let summary = rebalancer(false).plan(&Target::Area("x_area".into()), 200.0).unwrap().summary();
        let json = serde_json::to_value(&summary).unwrap();

        assert_eq!(json["kind"], "area");
        assert_eq!(json["matched"], "x_area");
        assert_eq!(json["scale_factor"], 0.5);
        assert_eq!(json["replaced"], serde_json::json!(["loc1", "loc2"]));
        assert!(json["backup"].is_null());
    }

    #[test]
    fn plans_region_rescale_with_area_count() {
        let plan = rebalancer(true).plan(&Target::Region("north_region".into()), 880.0).unwrap();
        assert_eq!(plan.outcome.scale_factor, 2.0);
        assert_eq!(plan.annotation.as_deref(), Some("Scaled population for north_region: 880.0 (from 2 areas)"));
        assert_eq!(plan.splice.replaced.len(), 3);
    }

    #[test]
    fn rejects_bad_requests_before_planning() {
        let r = rebalancer(false);
        assert!(matches!(r.plan(&Target::Area("x_area".into()), 0.0), Err(Error::InvalidTarget(_))));
        assert!(matches!(r.plan(&Target::Area("x_area".into()), -5.0), Err(Error::InvalidTarget(_))));
        assert!(matches!(r.plan(&Target::Area("nowhere".into()), 10.0), Err(Error::NotFound { .. })));
        assert!(matches!(r.plan(&Target::Region("bare_region".into()), 10.0), Err(Error::EmptyAggregate { .. })));
    }

    #[test]
    fn inspects_fuzzy_match() {
        let inspection = rebalancer(false).inspect(&Target::Area("y_2".into())).unwrap();
        assert_eq!(&*inspection.result.matched_name, "y_2_area");
        assert_eq!(inspection.result.total, 40.0);
        assert!(inspection.to_string().contains("area y_2_area (requested 'y_2')"));
    }

    #[test]
    fn plans_import_from_records() {
        let row = |loc: &str, size: &str| -> crate::records::Record {
            [("location", loc), ("type", "burghers"), ("size", size), ("culture", "a"), ("religion", "b")]
                .into_iter()
                .map(|(k, v)| (k.to_string(), Scalar::infer(v)))
                .collect()
        };
        let source = VecSource(vec![row("loc3", "12.5"), row("loc9", "1"), row("", "3")]);
        let plan = rebalancer(false).plan_import(&source).unwrap();
        let summary = plan.summary();

        assert_eq!((summary.rows, summary.skipped, summary.locations), (3, 1, 2));
        assert_eq!(summary.replaced, vec![Arc::<str>::from("loc3")]);
        assert_eq!(summary.missing_targets, vec![Arc::<str>::from("loc9")]);
        assert!(plan.splice.text.contains("\tloc3 = {\n\t\tdefine_pop = {\ttype = burghers\tsize = 12.500\tculture = a\treligion = b }\n\t}\n"));
    }
}
