//! cloudnuke engine
//!
//! This crate discovers and destroys cloud resources for any resource type
//! that implements [`ResourceType`]. Provider adapters supply typed list and
//! delete functions; the engine owns everything in between.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────┐
//! │                cloud-nuke CLI                    │
//! │           (nuke / inspect / config)              │
//! └─────────────────┬────────────────────────────────┘
//!                   │ PlanRequest + FilterConfig
//! ┌─────────────────▼────────────────────────────────┐
//! │                cloudnuke-core                    │
//! │  Plan ─► list ─► first-seen ─► filter            │
//! │       ─► run_batched ─► teardown ─► delete       │
//! │       ─► wait_until_gone ─► ResultAggregator     │
//! └───────┬─────────────────┬────────────────────────┘
//!         │                 │
//! ┌───────▼───────┐ ┌───────▼───────┐
//! │ local (JSON)  │ │ cloud adapter │
//! │   inventory   │ │  (external)   │
//! └───────────────┘ └───────────────┘
//! ```

pub mod batch;
pub mod engine;
pub mod error;
pub mod filter;
pub mod first_seen;
pub mod plan;
pub mod poller;
pub mod report;
pub mod resource;
pub mod tags;
pub mod teardown;

// Re-exports
pub use batch::{DeletionOutcome, MAX_RESOURCES_PER_CALL, run_batched};
pub use engine::{Engine, EngineOptions};
pub use error::{ErrorKind, NukeError, Result};
pub use filter::{ExclusionReason, FilterConfig, NameRules, ResourceRules, TagRule, Verdict};
pub use first_seen::{FirstSeenStore, FirstSeenTracker, ReferenceTime};
pub use plan::{Plan, PlanRequest, PlanSummary, Registry};
pub use poller::{ConfirmPolicy, ProbeStatus, wait_until_gone};
pub use report::{
    AggregatedResult, Inventory, InventoryEntry, LogReporter, NukeReporter, Outcome, ReportEntry,
    ResultAggregator, ResultSummary, TypeFailure,
};
pub use resource::{Candidate, DEFAULT_MAX_BATCH_SIZE, GLOBAL_REGION, ResourceType, Scope};
pub use teardown::{TeardownStep, run_teardown};
