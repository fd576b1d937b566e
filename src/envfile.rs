use std::path::Path;
use anyhow::{Context, Result};
use regex::Regex;

/// Variable names never imported from the env-file.
/// These either alter binary/library resolution for child processes or leak
/// the surrounding machine's layout into the build.
pub const ENV_DENYLIST: &[&str] = &[
    "PATH",
    "HOME",
    "GIT_DIR",
    "CPATH",
    "CPPATH",
    "LD_PRELOAD",
    "LD_LIBRARY_PATH",
    "LIBRARY_PATH",
    "IFS",
];

/// `KEY=VALUE` pairs parsed from an env-file, to be handed to exactly one
/// child process. Never written into the ambient process environment, so
/// nothing imported here is visible to later build steps.
#[derive(Debug, Default)]
pub struct EnvFile {
    pairs: Vec<(String, String)>,
}

impl EnvFile {
    /// Loads the env-file at `path`. A missing file yields an empty set;
    /// an unreadable one is an error.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<EnvFile> {
        if !path.as_ref().exists() {
            return Ok(EnvFile::default());
        }
        let content = std::fs::read_to_string(path.as_ref())
            .with_context(|| format!("Could not read env file {:?}", path.as_ref()))?;
        Ok(EnvFile::parse(&content))
    }

    /// Parses `KEY=VALUE` lines. Blank lines and `#` comments are skipped,
    /// a leading `export ` is tolerated, and single or double quotes around
    /// the value are stripped.
    pub fn parse(content: &str) -> EnvFile {
        let line_re = Regex::new(r"^(?:export\s+)?([A-Za-z_][A-Za-z0-9_]*)=(.*)$").unwrap();
        let mut pairs = Vec::new();
        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            if let Some(caps) = line_re.captures(line) {
                let key = caps[1].to_string();
                let value = unquote(&caps[2]).to_string();
                pairs.push((key, value));
            }
        }
        EnvFile { pairs }
    }

    /// The pairs minus the denylisted names, ready for `Command::envs`.
    pub fn filtered(&self) -> Vec<(String, String)> {
        self.pairs
            .iter()
            .filter(|(key, _)| !ENV_DENYLIST.contains(&key.as_str()))
            .cloned()
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

fn unquote(value: &str) -> &str {
    let value = value.trim();
    for quote in ['"', '\''] {
        if value.len() >= 2 && value.starts_with(quote) && value.ends_with(quote) {
            return &value[1..value.len() - 1];
        }
    }
    value
}
