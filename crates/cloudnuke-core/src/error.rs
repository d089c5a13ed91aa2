//! Engine error types

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors produced while resolving a plan or nuking resources
#[derive(Error, Debug)]
pub enum NukeError {
    #[error("Resource types cannot be both included and excluded in the same run")]
    ConflictingSelection,

    #[error("Invalid resource type(s): {}", .names.join(", "))]
    InvalidResourceType { names: Vec<String> },

    #[error("Invalid region selection: {0}")]
    InvalidRegionSelection(String),

    #[error("Too many {resource_type} resources in one call: {count} (limit {limit})")]
    TooManyResources {
        resource_type: String,
        count: usize,
        limit: usize,
    },

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Teardown step '{step}' failed for {identifier}: {message}")]
    TeardownStep {
        step: String,
        identifier: String,
        message: String,
    },

    #[error("Delete failed for {identifier}: {message}")]
    Delete { identifier: String, message: String },

    #[error("{identifier} entered terminal state '{state}' while deleting")]
    TerminalState { identifier: String, state: String },

    #[error("{identifier} still present after {attempts} confirmation attempts")]
    ConfirmationTimeout { identifier: String, attempts: u32 },

    #[error("Failed to list {resource_type}: {message}")]
    List {
        resource_type: String,
        message: String,
    },

    #[error("Failed to write first-seen tag on {identifier}: {message}")]
    Tagging { identifier: String, message: String },

    #[error("Invalid filter rule: {0}")]
    InvalidRule(String),

    #[error("API error: {0}")]
    Api(String),
}

impl NukeError {
    /// Build a delete error from any displayable provider error
    pub fn delete(identifier: impl Into<String>, err: impl std::fmt::Display) -> Self {
        NukeError::Delete {
            identifier: identifier.into(),
            message: err.to_string(),
        }
    }

    /// Whether the provider reported the resource as already gone
    pub fn is_not_found(&self) -> bool {
        matches!(self, NukeError::NotFound(_))
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            NukeError::ConflictingSelection => ErrorKind::ConflictingSelection,
            NukeError::InvalidResourceType { .. } => ErrorKind::InvalidResourceType,
            NukeError::InvalidRegionSelection(_) => ErrorKind::InvalidRegionSelection,
            NukeError::TooManyResources { .. } => ErrorKind::TooManyResources,
            NukeError::NotFound(_) => ErrorKind::AlreadyGone,
            NukeError::TeardownStep { .. } => ErrorKind::TeardownStep,
            NukeError::Delete { .. } | NukeError::Api(_) => ErrorKind::Delete,
            NukeError::TerminalState { .. } => ErrorKind::Terminal,
            NukeError::ConfirmationTimeout { .. } => ErrorKind::ConfirmationTimeout,
            NukeError::List { .. } => ErrorKind::List,
            NukeError::Tagging { .. } => ErrorKind::Tagging,
            NukeError::InvalidRule(_) => ErrorKind::InvalidRule,
        }
    }
}

/// Error classification carried in reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    ConflictingSelection,
    InvalidResourceType,
    InvalidRegionSelection,
    TooManyResources,
    AlreadyGone,
    TeardownStep,
    Delete,
    Terminal,
    ConfirmationTimeout,
    List,
    Tagging,
    InvalidRule,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ErrorKind::ConflictingSelection => "conflicting-selection",
            ErrorKind::InvalidResourceType => "invalid-resource-type",
            ErrorKind::InvalidRegionSelection => "invalid-region-selection",
            ErrorKind::TooManyResources => "too-many-resources",
            ErrorKind::AlreadyGone => "already-gone",
            ErrorKind::TeardownStep => "teardown-step",
            ErrorKind::Delete => "delete",
            ErrorKind::Terminal => "terminal",
            ErrorKind::ConfirmationTimeout => "confirmation-timeout",
            ErrorKind::List => "list",
            ErrorKind::Tagging => "tagging",
            ErrorKind::InvalidRule => "invalid-rule",
        };
        write!(f, "{}", s)
    }
}

pub type Result<T> = std::result::Result<T, NukeError>;
