use anyhow::{Context, Result};
use mdtree_parser::ParserConfig;
use std::fs;
use std::path::{Path, PathBuf};

/// Looked up in the working directory when no configuration file is given.
pub const DEFAULT_FILE: &str = "mdtree.yml";

/// Loads the configuration from `path`, or from [DEFAULT_FILE] in `dir` when it exists. Falls back
/// to the defaults otherwise.
pub fn resolve(path: Option<&Path>, dir: &Path) -> Result<ParserConfig> {
    let path: Option<PathBuf> = match path {
        Some(p) => Some(p.to_path_buf()),
        None => Some(dir.join(DEFAULT_FILE)).filter(|p| p.is_file()),
    };

    match path {
        Some(path) => load(&path),
        None => Ok(ParserConfig::default()),
    }
}

pub fn load(path: &Path) -> Result<ParserConfig> {
    let input = fs::read_to_string(path)
        .with_context(|| format!("could not read configuration file {}", path.display()))?;
    parse(&input).with_context(|| format!("error in configuration file {}", path.display()))
}

/// Parses YAML (and therefore JSON) configuration. Missing keys keep their defaults.
pub fn parse(input: &str) -> Result<ParserConfig> {
    if input.trim().is_empty() {
        return Ok(ParserConfig::default());
    }
    Ok(serde_yaml::from_str(input)?)
}
