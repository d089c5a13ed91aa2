pub mod error;
pub mod rules;

pub use error::*;
pub use rules::{CompiledRules, Matchers, NukeConfig, RuleSet};

use std::path::{Path, PathBuf};
use tracing::debug;

/// Environment variable pointing directly at a config file
pub const CONFIG_PATH_ENV: &str = "CLOUDNUKE_CONFIG_PATH";

const CANDIDATES: [&str; 4] = [
    "cloudnuke.local.yaml",
    ".cloudnuke.local.yaml",
    "cloudnuke.yaml",
    ".cloudnuke.yaml",
];

/// `~/.config/cloudnuke`
pub fn get_config_dir() -> Result<PathBuf> {
    Ok(dirs::config_dir()
        .ok_or(ConfigError::ConfigDirNotFound)?
        .join("cloudnuke"))
}

/// Find the rules file: the first entry of [`search_paths`] that is a file
pub fn find_config_file() -> Result<PathBuf> {
    search_paths()?
        .into_iter()
        .find(|path| path.is_file())
        .inspect(|path| debug!(path = %path.display(), "Found config file"))
        .ok_or(ConfigError::ConfigFileNotFound)
}

/// Locations checked for a rules file, in priority order
///
/// 1. `CLOUDNUKE_CONFIG_PATH`
/// 2. current directory: cloudnuke.local.yaml, .cloudnuke.local.yaml, cloudnuke.yaml, .cloudnuke.yaml
/// 3. `./.cloudnuke/` with the same names
/// 4. `~/.config/cloudnuke/config.yaml`
pub fn search_paths() -> Result<Vec<PathBuf>> {
    let mut paths = Vec::new();
    if let Some(config_path) = std::env::var_os(CONFIG_PATH_ENV) {
        paths.push(PathBuf::from(config_path));
    }

    let current_dir = std::env::current_dir()?;
    for dir in [current_dir.clone(), current_dir.join(".cloudnuke")] {
        paths.extend(CANDIDATES.iter().map(|name| dir.join(name)));
    }

    if let Ok(config_dir) = get_config_dir() {
        paths.push(config_dir.join("config.yaml"));
    }
    Ok(paths)
}

/// Read and parse one rules file
pub fn load_from(path: &Path) -> Result<NukeConfig> {
    let content = std::fs::read_to_string(path)?;
    NukeConfig::from_yaml(&content, path)
}

/// Load the rules file for a run
///
/// An explicit path must exist. Without one, discovery runs and finding
/// nothing yields an empty config.
pub fn load(explicit: Option<&Path>) -> Result<(Option<PathBuf>, NukeConfig)> {
    let path = match explicit {
        Some(path) => {
            if !path.exists() {
                return Err(ConfigError::ExplicitFileMissing(path.to_path_buf()));
            }
            path.to_path_buf()
        }
        None => match find_config_file() {
            Ok(path) => path,
            Err(ConfigError::ConfigFileNotFound) => {
                debug!("No config file found, running without rules");
                return Ok((None, NukeConfig::default()));
            }
            Err(e) => return Err(e),
        },
    };

    debug!(path = %path.display(), "Loading config file");
    let config = load_from(&path)?;
    Ok((Some(path), config))
}
