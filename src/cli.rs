use std::path::PathBuf;
use clap::Parser;

#[derive(Debug, Parser, Clone)]
#[clap(author, version, about, long_about = None)]
pub struct CLI {
    /// Root of the project tree being built
    pub(crate) build_dir: PathBuf,
    /// Persistent cache directory, shared across builds of this project
    pub(crate) cache_dir: PathBuf,
    /// File of KEY=VALUE pairs imported for the install step only
    pub(crate) env_file: PathBuf,
}
