use std::collections::HashSet;
use std::path::PathBuf;
use anyhow::{bail, Context, Result};
use modcache::envfile::EnvFile;
use modcache::manifest::advise_loose_ranges;
use modcache::npm::{Grunt, Npm};
use modcache::restore::{rebuild_native, restore_aux, restore_cached};
use modcache::scanner::scan;
use modcache::store::{CacheMode, CacheStore};
use modcache::syncback::sync_back;
use crate::cli::CLI;

/// Location of the vendored runtime inside the build tree; never scanned.
pub const VENDORED_RUNTIME: &str = "vendor/node";

/// Runs one full build pass: rebuild checked-in dependency directories,
/// restore cached ones, install, run the optional grunt step, then sync the
/// final state back into the cache.
pub fn execute(cli: CLI) -> Result<()> {
    if !cli.build_dir.is_dir() {
        bail!("Build directory {:?} does not exist", cli.build_dir);
    }
    let build_root = cli.build_dir.canonicalize()?;
    let store = CacheStore::open(&cli.cache_dir)?;
    let mode = CacheMode::from_env();
    let exclude = vec![PathBuf::from(VENDORED_RUNTIME)];

    // Scratch dir handed to every child process as TMPDIR. The guard's drop
    // removes it on every exit path of this function.
    let scratch = tempfile::tempdir().context("Could not create scratch directory")?;
    let npm = Npm::new(scratch.path());

    let present = scan(&build_root, &exclude, false)?;
    rebuild_native(&build_root, &present, &npm)?;

    let present: HashSet<PathBuf> = present.into_iter().collect();
    restore_cached(&build_root, &store, mode, &present, &npm)?;
    restore_aux(&build_root, &store, mode)?;

    advise_loose_ranges(&build_root);
    let env = EnvFile::load(&cli.env_file)?;
    npm.install(&build_root, &env.filtered())?;

    if let Some(grunt) = Grunt::detect(&build_root, scratch.path()) {
        println!("Gruntfile found, running grunt build");
        grunt.build(&build_root)?;
    }

    sync_back(&build_root, &store, mode, &exclude)?;
    Ok(())
}
