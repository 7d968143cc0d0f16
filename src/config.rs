use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Naming conventions of the script files being processed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Conventions {
    pub region_suffix: String,
    pub area_suffix: String,
    pub province_suffix: String,
    /// Keywords the block reader looks through instead of yielding them as blocks.
    pub containers: Vec<String>,
    /// Block name written around a standalone preview document. Data files
    /// are read through `containers`, so this only affects output.
    pub wrapper: String,
    /// Key introducing a one-line sub-entry inside a location block.
    pub entry_keyword: String,
    pub category_field: String,
    pub weight_field: String,
    pub tag_fields: [String; 2],
}

impl Default for Conventions {
    fn default() -> Self {
        Self {
            region_suffix: "_region".into(),
            area_suffix: "_area".into(),
            province_suffix: "_province".into(),
            containers: vec!["locations".into(), "define_pop".into()],
            wrapper: "locations".into(),
            entry_keyword: "define_pop".into(),
            category_field: "type".into(),
            weight_field: "size".into(),
            tag_fields: ["culture".into(), "religion".into()],
        }
    }
}

impl Conventions {
    #[inline] pub fn is_region(&self, name: &str) -> bool { name.ends_with(&self.region_suffix) }

    #[inline] pub fn is_area(&self, name: &str) -> bool { name.ends_with(&self.area_suffix) }

    #[inline] pub fn is_province(&self, name: &str) -> bool { name.ends_with(&self.province_suffix) }

    /// Container keywords as borrowed strings, for `BlockReader::exclude`.
    pub fn container_keywords(&self) -> Vec<&str> {
        self.containers.iter().map(String::as_str).collect()
    }
}

/// Settings for one rebalancing run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScaleConfig {
    /// Hierarchy definitions file.
    pub definitions: PathBuf,
    /// Leaf data file rewritten by a run.
    pub data: PathBuf,
    /// Appended to the data file name to form the backup path.
    pub backup_suffix: String,
    /// Allowed absolute drift between the rescaled total and the target.
    pub tolerance: f64,
    /// Decimal places written for rescaled weights.
    pub precision: usize,
    /// Allow substring matching when an area name has no exact match.
    pub fuzzy: bool,
    /// Insert a comment before the first rewritten block.
    pub annotate: bool,
    pub conventions: Conventions,
}

impl Default for ScaleConfig {
    fn default() -> Self {
        Self {
            definitions: PathBuf::from("definitions.txt"),
            data: PathBuf::from("06_pops.txt"),
            backup_suffix: ".backup".into(),
            tolerance: 1e-3,
            precision: 3,
            fuzzy: true,
            annotate: true,
            conventions: Conventions::default(),
        }
    }
}
