/// Item remap config: expected-score labels → canonical item numbers.
///
/// The IRT dataset names its items with cohort-prefixed labels; this study
/// numbers them 1..20. The mapping is dataset-specific and brittle, so it
/// lives in a TOML file supplied per study rather than in code. Labels
/// absent from the map are excluded downstream.
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::bail;

#[derive(Deserialize, Default)]
struct RemapConfig {
    #[serde(default)]
    items: BTreeMap<String, i64>,
}

const DEFAULT_REMAP_TEMPLATE: &str = "\
# itemdiff item remap
# Maps item labels from the expected-score table to canonical item numbers.
# Labels missing here are dropped from the reference difficulty (and thus
# from the correlation) — they are counted and reported, never defaulted.

[items]
# \"examq01\" = 1
# \"examq02\" = 2
";

/// Load the remap table. An empty or missing `[items]` table is legal but
/// means every expected-score label gets dropped.
pub fn load_remap(path: &Path) -> BTreeMap<String, i64> {
    let content = std::fs::read_to_string(path)
        .unwrap_or_else(|e| bail(format!("Failed to read remap at {}: {e}", path.display())));
    let config: RemapConfig = toml::from_str(&content)
        .unwrap_or_else(|e| bail(format!("Failed to parse remap at {}: {e}", path.display())));
    config.items
}

/// Create a commented remap template in the current directory.
/// Errors if the file already exists.
pub fn create_default_remap() -> PathBuf {
    let path = PathBuf::from("remap.toml");

    if path.exists() {
        bail(format!("Remap file already exists at {}", path.display()));
    }

    std::fs::write(&path, DEFAULT_REMAP_TEMPLATE)
        .unwrap_or_else(|e| bail(format!("Failed to write {}: {e}", path.display())));

    path
}
