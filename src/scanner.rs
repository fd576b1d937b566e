use std::path::{Path, PathBuf};
use anyhow::Result;
use colored::Colorize;
use walkdir::WalkDir;

/// Directory name that marks an installed dependency directory.
pub const DEP_DIR_NAME: &str = "node_modules";

/// Walks `root` depth-first and returns the relative paths of all dependency
/// directories found in it.
///
/// A matched directory is never descended into, so nested dependency
/// directories (a package's own `node_modules`) are not reported. Paths under
/// any of the `exclude` prefixes are skipped entirely. When `symlinks` is
/// set, symbolic links pointing at directories count as matches too; this is
/// needed for the post-install rescan, where restoration may have placed
/// links instead of real directories.
///
/// Returned paths are relative to `root`, sorted and free of duplicates.
pub fn scan(root: &Path, exclude: &[PathBuf], symlinks: bool) -> Result<Vec<PathBuf>> {
    let mut found = Vec::new();
    let mut walker = WalkDir::new(root).into_iter();

    while let Some(entry) = walker.next() {
        let entry = entry?;
        let rel = entry.path().strip_prefix(root)?.to_path_buf();
        if rel.as_os_str().is_empty() {
            continue;
        }
        if exclude.iter().any(|prefix| rel.starts_with(prefix)) {
            if entry.file_type().is_dir() {
                walker.skip_current_dir();
            }
            continue;
        }
        if entry.file_name() != DEP_DIR_NAME {
            continue;
        }
        if entry.file_type().is_dir() {
            found.push(rel);
            walker.skip_current_dir();
        } else if symlinks && entry.file_type().is_symlink() {
            if entry.path().is_dir() {
                // Symlinked matches are not descended into by the walker
                // anyway.
                found.push(rel);
            } else {
                eprintln!(
                    "{} skipping broken symlink {}",
                    "warning:".yellow(),
                    rel.display()
                );
            }
        }
    }
    found.sort();
    found.dedup();
    Ok(found)
}
