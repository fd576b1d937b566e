use std::collections::HashSet;
use std::ffi::OsString;
use std::fmt;
use std::path::Path;
use anyhow::{Context, Result};

/// Error carrying the exit status of a failed collaborator subprocess.
///
/// Travels up through `anyhow` unchanged so that `main` can re-use the
/// child's exit code as the process exit code.
#[derive(Debug)]
pub struct ExitCodeError {
    pub tool: String,
    pub code: i32,
}

impl fmt::Display for ExitCodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "`{}` exited with status {}", self.tool, self.code)
    }
}

impl std::error::Error for ExitCodeError {}

/// Prefixes every line of `text` with `prefix`.
/// Used to nest captured subprocess output into the surrounding build log.
pub fn indent(text: &str, prefix: &str) -> String {
    text.lines()
        .map(|line| format!("{}{}", prefix, line))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Recursively copies `src` into `dst`, preserving file permissions.
/// Symbolic links are recreated as links, not followed.
pub fn copy_dir_recursive(src: &Path, dst: &Path) -> Result<()> {
    std::fs::create_dir_all(dst)
        .with_context(|| format!("Could not create directory {:?}", dst))?;
    let meta = std::fs::metadata(src)
        .with_context(|| format!("Could not read metadata of {:?}", src))?;
    std::fs::set_permissions(dst, meta.permissions())?;

    for entry in std::fs::read_dir(src)
        .with_context(|| format!("Could not read directory {:?}", src))?
    {
        let entry = entry?;
        let from = entry.path();
        let to = dst.join(entry.file_name());
        let ftype = entry.file_type()?;
        if ftype.is_dir() {
            copy_dir_recursive(&from, &to)?;
        } else if ftype.is_symlink() {
            copy_symlink(&from, &to)?;
        } else {
            std::fs::copy(&from, &to)
                .with_context(|| format!("Could not copy {:?}", from))?;
        }
    }
    Ok(())
}

/// Mirrors `src` into `dst` with delete-extraneous semantics: afterwards
/// `dst` holds exactly the entries of `src`, and anything only present in
/// `dst` has been removed.
pub fn mirror_dir(src: &Path, dst: &Path) -> Result<()> {
    std::fs::create_dir_all(dst)
        .with_context(|| format!("Could not create directory {:?}", dst))?;
    let meta = std::fs::metadata(src)
        .with_context(|| format!("Could not read metadata of {:?}", src))?;
    std::fs::set_permissions(dst, meta.permissions())?;

    let mut keep: HashSet<OsString> = HashSet::new();
    for entry in std::fs::read_dir(src)
        .with_context(|| format!("Could not read directory {:?}", src))?
    {
        let entry = entry?;
        let from = entry.path();
        let to = dst.join(entry.file_name());
        let ftype = entry.file_type()?;
        keep.insert(entry.file_name());

        if ftype.is_dir() {
            remove_if_mismatched(&to, true)?;
            mirror_dir(&from, &to)?;
        } else if ftype.is_symlink() {
            remove_if_mismatched(&to, false)?;
            copy_symlink(&from, &to)?;
        } else {
            remove_if_mismatched(&to, false)?;
            std::fs::copy(&from, &to)
                .with_context(|| format!("Could not copy {:?}", from))?;
        }
    }
    for entry in std::fs::read_dir(dst)? {
        let entry = entry?;
        if keep.contains(&entry.file_name()) {
            continue;
        }
        if entry.file_type()?.is_dir() {
            std::fs::remove_dir_all(entry.path())?;
        } else {
            std::fs::remove_file(entry.path())?;
        }
    }
    Ok(())
}

/// Removes `path` when its on-disk type does not match what is about to be
/// written there (a directory where a file will go, or the other way round).
fn remove_if_mismatched(path: &Path, want_dir: bool) -> Result<()> {
    let Ok(meta) = path.symlink_metadata() else {
        return Ok(());
    };
    if meta.is_dir() == want_dir && !meta.file_type().is_symlink() {
        return Ok(());
    }
    if meta.is_dir() {
        std::fs::remove_dir_all(path)?;
    } else {
        std::fs::remove_file(path)?;
    }
    Ok(())
}

#[cfg(unix)]
fn copy_symlink(from: &Path, to: &Path) -> Result<()> {
    let target = std::fs::read_link(from)?;
    if to.symlink_metadata().is_ok() {
        std::fs::remove_file(to)?;
    }
    std::os::unix::fs::symlink(target, to)?;
    Ok(())
}

#[cfg(windows)]
fn copy_symlink(from: &Path, to: &Path) -> Result<()> {
    // Creating symlinks requires elevation on Windows, so copy whatever
    // the link resolves to instead.
    if from.is_dir() {
        copy_dir_recursive(from, to)
    } else {
        std::fs::copy(from, to)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_indent_prefixes_every_line() {
        let out = indent("one\ntwo", "  ");
        assert_eq!(out, "  one\n  two");
    }

    #[test]
    fn test_copy_dir_recursive_copies_nested_files() {
        let dir = tempdir().unwrap();
        let src = dir.path().join("src");
        std::fs::create_dir_all(src.join("a/b")).unwrap();
        std::fs::write(src.join("a/b/file.txt"), "hello").unwrap();

        let dst = dir.path().join("dst");
        copy_dir_recursive(&src, &dst).unwrap();

        let copied = std::fs::read_to_string(dst.join("a/b/file.txt")).unwrap();
        assert_eq!(copied, "hello");
    }

    #[cfg(unix)]
    #[test]
    fn test_copy_dir_recursive_keeps_symlinks_as_links() {
        let dir = tempdir().unwrap();
        let src = dir.path().join("src");
        std::fs::create_dir_all(&src).unwrap();
        std::fs::write(src.join("real"), "x").unwrap();
        std::os::unix::fs::symlink("real", src.join("link")).unwrap();

        let dst = dir.path().join("dst");
        copy_dir_recursive(&src, &dst).unwrap();

        let meta = dst.join("link").symlink_metadata().unwrap();
        assert!(meta.file_type().is_symlink());
        assert_eq!(std::fs::read_link(dst.join("link")).unwrap().to_str(), Some("real"));
    }

    #[test]
    fn test_mirror_dir_removes_extraneous_entries() {
        let dir = tempdir().unwrap();
        let src = dir.path().join("src");
        let dst = dir.path().join("dst");
        std::fs::create_dir_all(&src).unwrap();
        std::fs::create_dir_all(dst.join("stale_dir")).unwrap();
        std::fs::write(src.join("keep.txt"), "keep").unwrap();
        std::fs::write(dst.join("stale.txt"), "stale").unwrap();

        mirror_dir(&src, &dst).unwrap();

        assert!(dst.join("keep.txt").exists());
        assert!(!dst.join("stale.txt").exists());
        assert!(!dst.join("stale_dir").exists());
    }

    #[test]
    fn test_mirror_dir_replaces_file_with_directory() {
        let dir = tempdir().unwrap();
        let src = dir.path().join("src");
        let dst = dir.path().join("dst");
        std::fs::create_dir_all(src.join("entry")).unwrap();
        std::fs::write(src.join("entry/inner.txt"), "new").unwrap();
        std::fs::create_dir_all(&dst).unwrap();
        std::fs::write(dst.join("entry"), "old file").unwrap();

        mirror_dir(&src, &dst).unwrap();

        assert!(dst.join("entry").is_dir());
        assert_eq!(std::fs::read_to_string(dst.join("entry/inner.txt")).unwrap(), "new");
    }
}
