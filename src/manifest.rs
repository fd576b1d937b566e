use std::collections::BTreeMap;
use std::path::Path;
use anyhow::{Context, Result};
use colored::Colorize;
use semver::{Version, VersionReq};
use serde::Deserialize;

/// File name of the dependency manifest sitting next to each dependency
/// directory.
pub const MANIFEST_NAME: &str = "package.json";

/// The parts of a `package.json` this tool cares about.
/// Everything else in the file is ignored.
#[derive(Debug, Deserialize)]
pub struct Manifest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub dependencies: BTreeMap<String, String>,
}

impl Manifest {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Manifest> {
        let content = std::fs::read_to_string(path.as_ref())
            .with_context(|| format!("Could not read manifest {:?}", path.as_ref()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("Could not parse manifest {:?}", path.as_ref()))
    }

    /// Dependencies whose requirement is a range rather than an exact pin.
    /// Requirements that are not semver at all (git URLs, file paths) are
    /// left alone.
    pub fn loose_dependencies(&self) -> Vec<(&str, &str)> {
        self.dependencies
            .iter()
            .filter(|(_, req)| is_loose_requirement(req))
            .map(|(name, req)| (name.as_str(), req.as_str()))
            .collect()
    }
}

fn is_loose_requirement(req: &str) -> bool {
    let req = req.trim();
    if Version::parse(req).is_ok() {
        return false;
    }
    req == "latest" || VersionReq::parse(req).is_ok()
}

/// Prints an advisory for loosely-pinned version ranges in the root
/// manifest. Informational only, never affects control flow.
pub fn advise_loose_ranges(build_root: &Path) {
    let path = build_root.join(MANIFEST_NAME);
    let Ok(manifest) = Manifest::load(&path) else {
        return;
    };
    let loose = manifest.loose_dependencies();
    if loose.is_empty() {
        return;
    }
    let subject = manifest.name.as_deref().unwrap_or(MANIFEST_NAME);
    println!(
        "{}",
        format!("Unpinned dependency ranges found in {}:", subject).yellow()
    );
    for (name, req) in loose {
        println!("  {}: {}", name, req.yellow());
    }
    println!("  Pin exact versions for reproducible builds");
}
