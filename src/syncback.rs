use std::path::{Path, PathBuf};
use anyhow::Result;
use colored::Colorize;
use crate::scanner;
use crate::store::{CacheMode, CacheStore, AUX_CACHE_DIRS};

/// Mirrors the post-install state of every live dependency directory, plus
/// the auxiliary caches, back into the cache store.
///
/// The build tree is rescanned with symlink matching enabled since
/// restoration may have placed links instead of real directories. In Link
/// mode an entry whose build-tree side is still a symlink and whose cache
/// side exists already *is* the cache content, so it is skipped without any
/// filesystem writes. One directory failing to sync is reported and the
/// rest are still processed.
pub fn sync_back(
    build_root: &Path,
    store: &CacheStore,
    mode: CacheMode,
    exclude: &[PathBuf],
) -> Result<()> {
    let live = scanner::scan(build_root, exclude, true)?;
    for rel in &live {
        println!("Caching {}", rel.display());
        if let Err(err) = sync_one(build_root, store, mode, rel) {
            eprintln!(
                "{} could not sync {}: {:#}",
                "warning:".yellow(),
                rel.display(),
                err
            );
        }
    }
    for rel in AUX_CACHE_DIRS {
        let rel = PathBuf::from(rel);
        if build_root.join(&rel).symlink_metadata().is_err() {
            continue;
        }
        if let Err(err) = sync_one(build_root, store, mode, &rel) {
            eprintln!(
                "{} could not sync auxiliary cache {}: {:#}",
                "warning:".yellow(),
                rel.display(),
                err
            );
        }
    }
    Ok(())
}

fn sync_one(build_root: &Path, store: &CacheStore, mode: CacheMode, rel: &Path) -> Result<()> {
    let src = build_root.join(rel);
    let is_link = src.symlink_metadata()?.file_type().is_symlink();
    if mode == CacheMode::Link && is_link && store.contains(rel) {
        return Ok(());
    }
    store.write_back(rel, build_root)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_sync_back_mirrors_new_content() {
        let dir = tempdir().unwrap();
        let build = dir.path().join("build");
        std::fs::create_dir_all(build.join("node_modules/fresh")).unwrap();
        std::fs::write(build.join("node_modules/fresh/index.js"), "x").unwrap();
        let store = CacheStore::open(dir.path().join("cache")).unwrap();

        sync_back(&build, &store, CacheMode::Copy, &[]).unwrap();

        assert!(store.root().join("node_modules/fresh/index.js").exists());
    }

    #[test]
    fn test_sync_back_deletes_extraneous_cache_files() {
        let dir = tempdir().unwrap();
        let build = dir.path().join("build");
        std::fs::create_dir_all(build.join("node_modules")).unwrap();
        std::fs::write(build.join("node_modules/kept.js"), "x").unwrap();
        let store = CacheStore::open(dir.path().join("cache")).unwrap();
        std::fs::create_dir_all(store.root().join("node_modules/removed-pkg")).unwrap();

        sync_back(&build, &store, CacheMode::Copy, &[]).unwrap();

        assert!(store.root().join("node_modules/kept.js").exists());
        assert!(!store.root().join("node_modules/removed-pkg").exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_sync_back_link_mode_skips_existing_entries() {
        let dir = tempdir().unwrap();
        let build = dir.path().join("build");
        std::fs::create_dir_all(&build).unwrap();
        let store = CacheStore::open(dir.path().join("cache")).unwrap();
        std::fs::create_dir_all(store.root().join("node_modules")).unwrap();
        std::fs::write(store.root().join("node_modules/cached.js"), "x").unwrap();
        std::os::unix::fs::symlink(
            store.root().join("node_modules"),
            build.join("node_modules"),
        )
        .unwrap();

        let before = std::fs::metadata(store.root().join("node_modules/cached.js"))
            .unwrap()
            .modified()
            .unwrap();
        sync_back(&build, &store, CacheMode::Link, &[]).unwrap();
        let after = std::fs::metadata(store.root().join("node_modules/cached.js"))
            .unwrap()
            .modified()
            .unwrap();

        assert_eq!(before, after);
    }

    #[test]
    fn test_sync_back_includes_aux_caches() {
        let dir = tempdir().unwrap();
        let build = dir.path().join("build");
        std::fs::create_dir_all(build.join(".npm/some-pkg")).unwrap();
        std::fs::create_dir_all(build.join(".cache/bower/pkg")).unwrap();
        let store = CacheStore::open(dir.path().join("cache")).unwrap();

        sync_back(&build, &store, CacheMode::Copy, &[]).unwrap();

        assert!(store.root().join(".npm/some-pkg").is_dir());
        assert!(store.root().join(".cache/bower/pkg").is_dir());
    }
}
