use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Config directory not found")]
    ConfigDirNotFound,

    #[error(
        "No config file found. Looked in:\n\
        - CLOUDNUKE_CONFIG_PATH\n\
        - current directory: cloudnuke.local.yaml, .cloudnuke.local.yaml, cloudnuke.yaml, .cloudnuke.yaml\n\
        - ./.cloudnuke/\n\
        - ~/.config/cloudnuke/config.yaml"
    )]
    ConfigFileNotFound,

    #[error("Config file does not exist: {}", .0.display())]
    ExplicitFileMissing(PathBuf),

    #[error("Failed to parse {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("Invalid rule for {scope}: {source}")]
    InvalidRule {
        scope: String,
        #[source]
        source: cloudnuke_core::NukeError,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ConfigError>;
