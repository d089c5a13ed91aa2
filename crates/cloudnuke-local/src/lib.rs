//! Local inventory provider
//!
//! Serves resource types from a JSON file instead of a cloud API. Sandbox
//! runs and integration tests drive the engine through it exactly as they
//! would through a cloud adapter.

pub mod error;
pub mod inventory;
pub mod provider;

pub use error::{LocalError, Result};
pub use inventory::{
    DEFAULT_INVENTORY_PATH, InventoryDocument, InventoryLock, InventoryStore, LocalResource,
    ResourceStatus, TypeSpec,
};
pub use provider::{LocalProvider, LocalResourceType};
