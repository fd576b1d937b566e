use std::path::{Path, PathBuf};
use anyhow::{bail, Context, Result};
use crate::util::{copy_dir_recursive, mirror_dir};

/// Auxiliary cache directories mirrored alongside the scanned dependency
/// directories. Fixed well-known locations relative to the build-tree root.
pub const AUX_CACHE_DIRS: &[&str] = &[".npm", ".cache/bower"];

/// Cache strategy, read once at startup from `MODCACHE_STRATEGY`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheMode {
    /// Restore by symlinking into the cache; sync-back is a no-op for
    /// unchanged entries.
    Link,
    /// Restore by copying out of the cache; sync-back always mirrors.
    Copy,
}

impl CacheMode {
    pub fn from_env() -> CacheMode {
        match std::env::var("MODCACHE_STRATEGY") {
            Ok(value) if value.eq_ignore_ascii_case("link") => CacheMode::Link,
            _ => CacheMode::Copy,
        }
    }
}

/// A persistent cache directory, addressed by paths relative to its root.
/// Cache subpaths mirror build-tree subpaths exactly.
#[derive(Debug)]
pub struct CacheStore {
    root: PathBuf,
}

impl CacheStore {
    /// Opens (creating if necessary) the cache at `root`.
    /// The root is canonicalized so symlink targets stay valid regardless of
    /// the working directory of later consumers.
    pub fn open<P: AsRef<Path>>(root: P) -> Result<CacheStore> {
        std::fs::create_dir_all(root.as_ref())
            .with_context(|| format!("Could not create cache dir {:?}", root.as_ref()))?;
        let root = root.as_ref().canonicalize()?;
        Ok(CacheStore { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Whether the cache holds an entry for `rel`.
    pub fn contains<P: AsRef<Path>>(&self, rel: P) -> bool {
        self.root.join(rel).is_dir()
    }

    /// Places the cached entry `rel` into the build tree, either as a
    /// symlink back into the cache or as a full attribute-preserving copy.
    pub fn restore<P: AsRef<Path>>(
        &self,
        rel: P,
        build_root: &Path,
        mode: CacheMode,
    ) -> Result<()> {
        let src = self.root.join(rel.as_ref());
        let dest = build_root.join(rel.as_ref());
        if let Some(parent) = dest.parent() {
            std::fs::create_dir_all(parent)?;
        }
        match mode {
            CacheMode::Link => {
                if let Ok(meta) = dest.symlink_metadata() {
                    if !meta.file_type().is_symlink() {
                        bail!("Cannot restore {:?}: target exists and is not a symlink", dest);
                    }
                    // Leftover link from an earlier run, relink it.
                    std::fs::remove_file(&dest)?;
                }
                make_dir_symlink(&src, &dest)
                    .with_context(|| format!("Could not link {:?} -> {:?}", dest, src))?;
            }
            CacheMode::Copy => {
                if let Ok(meta) = dest.symlink_metadata() {
                    if meta.file_type().is_symlink() {
                        // A leftover link would be written through by the
                        // copy; replace it with a real directory instead.
                        std::fs::remove_file(&dest)?;
                    }
                }
                copy_dir_recursive(&src, &dest)
                    .with_context(|| format!("Could not restore {:?} from cache", rel.as_ref()))?;
            }
        }
        Ok(())
    }

    /// Mirrors `build_root/rel` into the cache with delete-extraneous
    /// semantics. Any stale placeholder (a file or dangling link where the
    /// entry should be) is removed first.
    pub fn write_back<P: AsRef<Path>>(&self, rel: P, build_root: &Path) -> Result<()> {
        let src = build_root.join(rel.as_ref());
        let dest = self.root.join(rel.as_ref());
        if let Ok(meta) = dest.symlink_metadata() {
            if !meta.is_dir() {
                self.remove(rel.as_ref())?;
            }
        }
        mirror_dir(&src, &dest)
            .with_context(|| format!("Could not sync {:?} back into cache", rel.as_ref()))
    }

    /// Drops the cached entry for `rel`, if present.
    pub fn remove<P: AsRef<Path>>(&self, rel: P) -> Result<()> {
        let path = self.root.join(rel.as_ref());
        if let Ok(meta) = path.symlink_metadata() {
            if meta.is_dir() {
                std::fs::remove_dir_all(&path)?;
            } else {
                std::fs::remove_file(&path)?;
            }
        }
        Ok(())
    }
}

#[cfg(unix)]
fn make_dir_symlink(target: &Path, link: &Path) -> std::io::Result<()> {
    std::os::unix::fs::symlink(target, link)
}

#[cfg(windows)]
fn make_dir_symlink(target: &Path, link: &Path) -> std::io::Result<()> {
    std::os::windows::fs::symlink_dir(target, link)
}
