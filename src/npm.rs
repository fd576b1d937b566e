use std::path::{Path, PathBuf};
use std::process::Command;
use anyhow::{Context, Result};
use crate::util::{indent, ExitCodeError};

const OUTPUT_INDENT: &str = "       ";

/// Marker files that signal a grunt build step in the build-tree root.
pub const GRUNT_MARKERS: &[&str] = &["Gruntfile.js", "Gruntfile.coffee"];

/// Handle to the package manager executable.
///
/// The binary defaults to `npm` on the `PATH` and can be overridden through
/// `MODCACHE_NPM` (integration tests point this at a stub script). Every
/// child process gets `TMPDIR` pointed at the build's scratch directory so
/// stray temp files are removed with the run.
pub struct Npm {
    program: PathBuf,
    scratch: PathBuf,
}

impl Npm {
    pub fn new(scratch: &Path) -> Npm {
        let program = std::env::var_os("MODCACHE_NPM")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("npm"));
        Npm {
            program,
            scratch: scratch.to_path_buf(),
        }
    }

    /// `npm install --production --unsafe-perm` in the build-tree root.
    /// The env-file pairs apply to this one child process only.
    pub fn install(&self, cwd: &Path, env: &[(String, String)]) -> Result<()> {
        let mut cmd = Command::new(&self.program);
        cmd.args(["install", "--production", "--unsafe-perm"])
            .current_dir(cwd)
            .env("TMPDIR", &self.scratch)
            .envs(env.iter().map(|(k, v)| (k.as_str(), v.as_str())));
        run_logged(cmd, "npm install")
    }

    /// `npm rebuild`, recompiling native extensions of a checked-in
    /// dependency directory.
    pub fn rebuild(&self, cwd: &Path) -> Result<()> {
        let mut cmd = Command::new(&self.program);
        cmd.arg("rebuild").current_dir(cwd).env("TMPDIR", &self.scratch);
        run_logged(cmd, "npm rebuild")
    }

    /// `npm prune`, dropping installed packages no longer in the manifest.
    pub fn prune(&self, cwd: &Path) -> Result<()> {
        let mut cmd = Command::new(&self.program);
        cmd.arg("prune").current_dir(cwd).env("TMPDIR", &self.scratch);
        run_logged(cmd, "npm prune")
    }
}

/// The optional secondary build tool, detected by its marker files.
pub struct Grunt {
    program: PathBuf,
    scratch: PathBuf,
}

impl Grunt {
    /// Returns a runner when a Gruntfile is present in the build-tree root.
    pub fn detect(build_root: &Path, scratch: &Path) -> Option<Grunt> {
        if !GRUNT_MARKERS.iter().any(|m| build_root.join(m).is_file()) {
            return None;
        }
        let program = std::env::var_os("MODCACHE_GRUNT")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("grunt"));
        Some(Grunt {
            program,
            scratch: scratch.to_path_buf(),
        })
    }

    pub fn build(&self, cwd: &Path) -> Result<()> {
        let mut cmd = Command::new(&self.program);
        cmd.arg("build").current_dir(cwd).env("TMPDIR", &self.scratch);
        run_logged(cmd, "grunt build")
    }
}

/// Runs the command synchronously, re-emits its captured output indented for
/// the surrounding log, and converts a non-zero exit into an
/// [`ExitCodeError`].
fn run_logged(mut cmd: Command, tool: &str) -> Result<()> {
    let output = cmd
        .output()
        .with_context(|| format!("Could not spawn `{}`", tool))?;
    let stdout = String::from_utf8_lossy(&output.stdout);
    if !stdout.trim().is_empty() {
        println!("{}", indent(&stdout, OUTPUT_INDENT));
    }
    let stderr = String::from_utf8_lossy(&output.stderr);
    if !stderr.trim().is_empty() {
        eprintln!("{}", indent(&stderr, OUTPUT_INDENT));
    }
    if !output.status.success() {
        let code = output.status.code().unwrap_or(1);
        return Err(ExitCodeError {
            tool: tool.to_string(),
            code,
        }
        .into());
    }
    Ok(())
}
