//! Local provider error types

use cloudnuke_core::NukeError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LocalError {
    #[error("Resource not found: {0}")]
    ResourceNotFound(String),

    #[error("{identifier} still has {remaining} '{step}' attachment(s)")]
    DependencyViolation {
        identifier: String,
        step: String,
        remaining: usize,
    },

    #[error("Delete rejected for {identifier}: {message}")]
    Rejected { identifier: String, message: String },

    #[error("Duplicate resource type in inventory: {0}")]
    DuplicateResourceType(String),

    #[error("Resource {identifier} has undeclared type '{resource_type}'")]
    UndeclaredResourceType {
        identifier: String,
        resource_type: String,
    },

    #[error("Inventory file error: {0}")]
    StateError(String),

    #[error("Lock acquisition failed: {0}")]
    LockError(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, LocalError>;

impl From<LocalError> for NukeError {
    fn from(err: LocalError) -> Self {
        match err {
            LocalError::ResourceNotFound(id) => NukeError::NotFound(id),
            LocalError::DependencyViolation { ref identifier, .. }
            | LocalError::Rejected { ref identifier, .. } => {
                NukeError::delete(identifier.clone(), &err)
            }
            other => NukeError::Api(other.to_string()),
        }
    }
}
