use std::collections::HashSet;
use std::path::{Path, PathBuf};
use anyhow::{Context, Result};
use colored::Colorize;
use crate::manifest::MANIFEST_NAME;
use crate::npm::Npm;
use crate::scanner;
use crate::store::{CacheMode, CacheStore, AUX_CACHE_DIRS};

/// Runs `npm rebuild` for every dependency directory already present in the
/// build tree, i.e. checked into source instead of restored from cache.
/// Native extensions compiled on another machine are useless here, so they
/// are rebuilt in place. A failed rebuild aborts the build.
pub fn rebuild_native(build_root: &Path, present: &[PathBuf], npm: &Npm) -> Result<()> {
    for rel in present {
        let dir = build_root.join(rel);
        let parent = dir
            .parent()
            .context("Dependency directory has no parent")?;
        println!("Rebuilding native extensions in {}", rel.display());
        npm.rebuild(parent)?;
    }
    Ok(())
}

/// Restores cached dependency directories into the build tree.
///
/// Candidates are the cache's own dependency directories, minus the ones
/// already present in the build tree, filtered to paths whose parent
/// directory holds a manifest. After each restore the directory is pruned so
/// that packages dropped from the manifest since the cache was written do
/// not survive into the install step. The restore itself is fail-fast; a
/// prune failure is reported and the remaining directories are still
/// processed.
pub fn restore_cached(
    build_root: &Path,
    store: &CacheStore,
    mode: CacheMode,
    present: &HashSet<PathBuf>,
    npm: &Npm,
) -> Result<()> {
    let cached = scanner::scan(store.root(), &[], false)?;
    for rel in cached {
        if present.contains(&rel) {
            continue;
        }
        let dest = build_root.join(&rel);
        let parent = dest
            .parent()
            .context("Dependency directory has no parent")?;
        if !parent.join(MANIFEST_NAME).is_file() {
            continue;
        }
        println!("Restoring {} from cache", rel.display());
        store.restore(&rel, build_root, mode)?;
        if let Err(err) = npm.prune(parent) {
            eprintln!(
                "{} prune failed in {}: {:#}",
                "warning:".yellow(),
                rel.display(),
                err
            );
        }
    }
    Ok(())
}

/// Restores the fixed auxiliary caches (the package manager's own cache and
/// the secondary tool's cache) when the store holds them and the build tree
/// does not. No manifest gate applies to these.
pub fn restore_aux(build_root: &Path, store: &CacheStore, mode: CacheMode) -> Result<()> {
    for rel in AUX_CACHE_DIRS {
        if !store.contains(rel) {
            continue;
        }
        if build_root.join(rel).symlink_metadata().is_ok() {
            continue;
        }
        store
            .restore(rel, build_root, mode)
            .with_context(|| format!("Could not restore auxiliary cache {}", rel))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn npm_for(dir: &Path) -> Npm {
        Npm::new(&dir.join("scratch"))
    }

    #[test]
    fn test_restore_requires_sibling_manifest() {
        let dir = tempdir().unwrap();
        let build = dir.path().join("build");
        std::fs::create_dir_all(&build).unwrap();
        let store = CacheStore::open(dir.path().join("cache")).unwrap();
        std::fs::create_dir_all(store.root().join("node_modules/pkg")).unwrap();

        let present = HashSet::new();
        restore_cached(&build, &store, CacheMode::Copy, &present, &npm_for(dir.path())).unwrap();

        // No package.json next to the would-be destination, so nothing lands.
        assert!(!build.join("node_modules").exists());
    }

    #[test]
    fn test_restore_skips_paths_present_in_build_tree() {
        let dir = tempdir().unwrap();
        let build = dir.path().join("build");
        std::fs::create_dir_all(build.join("node_modules")).unwrap();
        std::fs::write(build.join("package.json"), "{}").unwrap();
        std::fs::write(build.join("node_modules/committed.txt"), "local").unwrap();

        let store = CacheStore::open(dir.path().join("cache")).unwrap();
        std::fs::create_dir_all(store.root().join("node_modules")).unwrap();
        std::fs::write(store.root().join("node_modules/cached.txt"), "cached").unwrap();

        let present: HashSet<PathBuf> = [PathBuf::from("node_modules")].into();
        restore_cached(&build, &store, CacheMode::Copy, &present, &npm_for(dir.path())).unwrap();

        assert!(build.join("node_modules/committed.txt").exists());
        assert!(!build.join("node_modules/cached.txt").exists());
    }

    #[test]
    fn test_restore_places_cached_dir_with_manifest() {
        let dir = tempdir().unwrap();
        let build = dir.path().join("build");
        std::fs::create_dir_all(&build).unwrap();
        std::fs::write(build.join("package.json"), "{}").unwrap();

        let store = CacheStore::open(dir.path().join("cache")).unwrap();
        std::fs::create_dir_all(store.root().join("node_modules/pkg")).unwrap();
        std::fs::write(store.root().join("node_modules/pkg/index.js"), "ok").unwrap();

        let present = HashSet::new();
        restore_cached(&build, &store, CacheMode::Copy, &present, &npm_for(dir.path())).unwrap();

        assert!(build.join("node_modules/pkg/index.js").exists());
    }

    #[test]
    fn test_restore_aux_only_when_absent_from_build_tree() {
        let dir = tempdir().unwrap();
        let build = dir.path().join("build");
        std::fs::create_dir_all(build.join(".npm")).unwrap();
        std::fs::write(build.join(".npm/local.txt"), "local").unwrap();

        let store = CacheStore::open(dir.path().join("cache")).unwrap();
        std::fs::create_dir_all(store.root().join(".npm")).unwrap();
        std::fs::write(store.root().join(".npm/cached.txt"), "cached").unwrap();

        restore_aux(&build, &store, CacheMode::Copy).unwrap();

        assert!(build.join(".npm/local.txt").exists());
        assert!(!build.join(".npm/cached.txt").exists());
    }
}
