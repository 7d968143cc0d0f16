use std::{fs, path::Path};

use popscale::{Error, LeafStore, Rebalancer, ScaleConfig, Target, io::backup_path, records::CsvSource};

const DEFINITIONS: &str = "\
# world map
europe = {
\twestern_europe = {
\t\tfrance_region = {
\t\t\tile_de_france_area = {
\t\t\t\tparis_province = { paris versailles }
\t\t\t\tmeaux_province = { meaux }
\t\t\t}
\t\t\tchampagne_east_area = {
\t\t\t\treims_province = { reims }
\t\t\t}
\t\t}
\t}
}
";

const DATA: &str = "\
locations = {
\tparis = {
\t\tdefine_pop = {\ttype = nobles\tsize = 10\tculture = french\treligion = catholic }
\t\tdefine_pop = {\ttype = peasants\tsize = 90\tculture = french\treligion = catholic }
\t}
\tmeaux = {
\t\tdefine_pop = {\ttype = peasants\tsize = 300\tculture = french\treligion = catholic }
\t}
\t# reims comes later
\treims = {
\t\tdefine_pop = {\ttype = burghers\tsize = 25.5\tculture = champenois\treligion = catholic }
\t}
\tlondon = {
\t\tdefine_pop = {\ttype = burghers\tsize = 7\tculture = english\treligion = anglican }
\t}
}
";

fn workspace(dir: &Path) -> ScaleConfig {
    fs::write(dir.join("definitions.txt"), DEFINITIONS).unwrap();
    fs::write(dir.join("06_pops.txt"), DATA).unwrap();
    ScaleConfig {
        definitions: dir.join("definitions.txt"),
        data: dir.join("06_pops.txt"),
        ..ScaleConfig::default()
    }
}

#[test]
fn scales_area_and_keeps_everything_else() {
    let dir = tempfile::tempdir().unwrap();
    let config = workspace(dir.path());
    let data_path = config.data.clone();

    let rebalancer = Rebalancer::open(config).unwrap();
    let plan = rebalancer.plan(&Target::Area("ile_de_france_area".into()), 200.0).unwrap();
    let report = rebalancer.commit(&plan.splice).unwrap();
    let summary = plan.summary().committed(&report);

    assert_eq!(summary.previous_total, 400.0);
    assert_eq!(summary.scale_factor, 0.5);
    assert_eq!(summary.new_total, 200.0);
    assert_eq!(summary.missing.len(), 1);
    assert_eq!(&*summary.missing[0], "versailles");
    assert_eq!(summary.backup.as_deref(), Some(backup_path(&data_path, ".backup").as_path()));

    let expected = DATA
        .replace("\tparis = {\n", "\t# Scaled population for ile_de_france_area: 200.0\n\tparis = {\n")
        .replace("size = 10\t", "size = 5.000\t")
        .replace("size = 90\t", "size = 45.000\t")
        .replace("size = 300\t", "size = 150.000\t");
    let written = fs::read_to_string(&data_path).unwrap();
    assert_eq!(written, expected);
    assert_eq!(fs::read_to_string(&report.backup).unwrap(), DATA);

    let store = LeafStore::parse(&written, &Default::default()).unwrap();
    assert_eq!(store.get("paris").unwrap().total() + store.get("meaux").unwrap().total(), 200.0);
    assert_eq!(store.get("reims").unwrap().total(), 25.5);
}

#[test]
fn fuzzy_name_resolves_to_matching_area() {
    let dir = tempfile::tempdir().unwrap();
    let rebalancer = Rebalancer::open(workspace(dir.path())).unwrap();

    let plan = rebalancer.plan(&Target::Area("champagne".into()), 51.0).unwrap();
    assert!(plan.resolution.is_fuzzy());
    assert_eq!(&*plan.resolution.matched, "champagne_east_area");
    assert_eq!(plan.outcome.scale_factor, 2.0);

    let strict = ScaleConfig { fuzzy: false, ..rebalancer.config().clone() };
    let strict = Rebalancer::open(strict).unwrap();
    assert!(matches!(strict.plan(&Target::Area("champagne".into()), 51.0), Err(Error::NotFound { .. })));
}

#[test]
fn region_spans_all_its_areas() {
    let dir = tempfile::tempdir().unwrap();
    let rebalancer = Rebalancer::open(workspace(dir.path())).unwrap();

    let plan = rebalancer.plan(&Target::Region("france_region".into()), 851.0).unwrap();
    let summary = plan.summary();
    assert_eq!(summary.areas, 2);
    assert_eq!(summary.previous_total, 425.5);
    assert_eq!(summary.replaced.len(), 3);
    assert!(plan.splice.text.contains("size = 51.000\tculture = champenois"));
    assert!(plan.splice.text.contains("size = 7\tculture = english"));
}

#[test]
fn repeated_runs_are_stable_and_refresh_the_backup() {
    let dir = tempfile::tempdir().unwrap();
    let config = ScaleConfig { annotate: false, ..workspace(dir.path()) };
    let data_path = config.data.clone();
    let target = Target::Area("ile_de_france_area".into());

    let first = Rebalancer::open(config.clone()).unwrap();
    let plan = first.plan(&target, 200.0).unwrap();
    first.commit(&plan.splice).unwrap();
    let after_first = fs::read_to_string(&data_path).unwrap();

    let second = Rebalancer::open(config).unwrap();
    let plan = second.plan(&target, 200.0).unwrap();
    assert!(plan.splice.is_identity());
    let report = second.commit(&plan.splice).unwrap();

    assert!(report.unchanged);
    assert_eq!(fs::read_to_string(&data_path).unwrap(), after_first);
    assert_eq!(fs::read_to_string(&report.backup).unwrap(), after_first);
}

#[test]
fn rounded_totals_hit_the_target_and_rerun_cleanly() {
    let dir = tempfile::tempdir().unwrap();
    let config = ScaleConfig { annotate: false, precision: 0, ..workspace(dir.path()) };
    let data_path = config.data.clone();
    let target = Target::Region("france_region".into());

    let first = Rebalancer::open(config.clone()).unwrap();
    let plan = first.plan(&target, 101.0).unwrap();
    assert_eq!(plan.outcome.new_total, 101.0);
    first.commit(&plan.splice).unwrap();

    let written = fs::read_to_string(&data_path).unwrap();
    assert!(written.contains("type = nobles\tsize = 3\t"));
    assert!(written.contains("type = peasants\tsize = 21\t"));
    assert!(written.contains("type = peasants\tsize = 71\t"));
    assert!(written.contains("type = burghers\tsize = 6\t"));
    let store = LeafStore::parse(&written, &Default::default()).unwrap();
    let total: f64 = ["paris", "meaux", "reims"].iter().map(|id| store.get(id).unwrap().total()).sum();
    assert_eq!(total, 101.0);

    let second = Rebalancer::open(config).unwrap();
    let plan = second.plan(&target, 101.0).unwrap();
    assert_eq!(plan.outcome.previous_total, 101.0);
    assert!(plan.splice.is_identity());
}

#[test]
fn rejected_requests_leave_files_alone() {
    let dir = tempfile::tempdir().unwrap();
    let config = workspace(dir.path());
    let data_path = config.data.clone();
    let rebalancer = Rebalancer::open(config).unwrap();

    assert!(rebalancer.plan(&Target::Area("ile_de_france_area".into()), 0.0).is_err());
    assert!(rebalancer.plan(&Target::Area("atlantis_area".into()), 10.0).is_err());
    assert!(rebalancer.plan(&Target::Region("nowhere_region".into()), 10.0).is_err());

    assert_eq!(fs::read_to_string(&data_path).unwrap(), DATA);
    assert!(!backup_path(&data_path, ".backup").exists());
}

#[test]
fn refuses_to_overwrite_a_file_changed_since_reading() {
    let dir = tempfile::tempdir().unwrap();
    let config = workspace(dir.path());
    let data_path = config.data.clone();
    let rebalancer = Rebalancer::open(config).unwrap();
    let plan = rebalancer.plan(&Target::Area("ile_de_france_area".into()), 200.0).unwrap();

    fs::write(&data_path, "locations = {\n}\n").unwrap();
    assert!(matches!(rebalancer.commit(&plan.splice), Err(Error::Stale { .. })));
    assert_eq!(fs::read_to_string(&data_path).unwrap(), "locations = {\n}\n");
}

#[test]
fn imports_rows_from_csv() {
    let dir = tempfile::tempdir().unwrap();
    let config = ScaleConfig { annotate: false, ..workspace(dir.path()) };
    let data_path = config.data.clone();
    let csv = dir.path().join("pops.csv");
    fs::write(&csv, "location,type,size,culture,religion\nreims,burghers,30,champenois,catholic\nreims,clergy,2,champenois,catholic\n").unwrap();

    let rebalancer = Rebalancer::open(config).unwrap();
    let plan = rebalancer.plan_import(&CsvSource::read(&csv).unwrap()).unwrap();
    rebalancer.commit(&plan.splice).unwrap();

    let store = LeafStore::parse(&fs::read_to_string(&data_path).unwrap(), &Default::default()).unwrap();
    let reims = store.get("reims").unwrap();
    assert_eq!(reims.subentries.len(), 2);
    assert_eq!(reims.total(), 32.0);
    assert_eq!(store.get("paris").unwrap().total(), 100.0);
}
