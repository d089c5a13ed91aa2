//! Resource type contract
//!
//! Every nukeable resource type (EC2 instances, IAM roles, ECS services, ...)
//! implements [`ResourceType`] so the engine can drive it without knowing
//! anything about the provider API behind it.

use crate::error::Result;
use crate::filter::FilterConfig;
use crate::first_seen::FirstSeenStore;
use crate::poller::{ConfirmPolicy, ProbeStatus};
use crate::tags;
use crate::teardown::TeardownStep;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

/// Pseudo-region holding account-level resources
pub const GLOBAL_REGION: &str = "global";

/// Batch size used by resource types that do not declare their own
pub const DEFAULT_MAX_BATCH_SIZE: usize = 50;

/// Resource type abstraction
///
/// Implementations are registered once when the engine starts and are
/// shared between regions, so they must not hold per-run mutable state.
#[async_trait]
pub trait ResourceType: Send + Sync {
    /// Returns the resource type name (e.g., "ec2-instance", "iam-role")
    fn name(&self) -> &str;

    /// Largest number of identifiers one delete call may process concurrently
    fn max_batch_size(&self) -> usize {
        DEFAULT_MAX_BATCH_SIZE
    }

    /// Whether the type lives in the [`GLOBAL_REGION`] pseudo-region
    fn is_global(&self) -> bool {
        false
    }

    /// Store for first-seen tags
    ///
    /// Returns `Some` only for types whose provider API exposes no creation
    /// timestamp. The engine then ages candidates by their first-seen tag.
    fn first_seen_store(&self) -> Option<Arc<dyn FirstSeenStore>> {
        None
    }

    /// List candidates in the given scope
    ///
    /// `filter` is passed so implementations can push filtering down to the
    /// provider; the engine evaluates it again on the returned candidates.
    async fn list(&self, scope: &Scope, filter: &FilterConfig) -> Result<Vec<Candidate>>;

    /// Ordered pre-delete steps (detach, drain, disassociate, ...)
    fn teardown_steps(&self) -> Vec<Arc<dyn TeardownStep>> {
        Vec::new()
    }

    /// Issue the delete call for one identifier
    ///
    /// Return [`NukeError::NotFound`](crate::NukeError::NotFound) when the
    /// provider reports the resource as already gone.
    async fn delete(&self, scope: &Scope, identifier: &str) -> Result<()>;

    /// Confirmation policy for asynchronous deletes; `None` means the delete
    /// call is authoritative
    fn confirmation(&self) -> Option<ConfirmPolicy> {
        None
    }

    /// Observe a resource after its delete call returned
    async fn probe(&self, _scope: &Scope, _identifier: &str) -> Result<ProbeStatus> {
        Ok(ProbeStatus::Gone)
    }
}

/// Where a resource type is being listed or deleted
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Scope {
    pub region: String,
}

impl Scope {
    pub fn new(region: impl Into<String>) -> Self {
        Self {
            region: region.into(),
        }
    }

    pub fn global() -> Self {
        Self::new(GLOBAL_REGION)
    }

    pub fn is_global(&self) -> bool {
        self.region == GLOBAL_REGION
    }
}

impl std::fmt::Display for Scope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.region)
    }
}

/// A resource returned by [`ResourceType::list`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    /// Opaque provider identifier (ID or ARN)
    pub id: String,

    /// Human readable name, matched by name rules when present
    pub name: Option<String>,

    /// Reference time: creation or last-modified time when the provider
    /// exposes one
    pub created_at: Option<DateTime<Utc>>,

    /// Provider-native tags
    #[serde(default)]
    pub tags: HashMap<String, String>,
}

impl Candidate {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: None,
            created_at: None,
            tags: HashMap::new(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = Some(created_at);
        self
    }

    pub fn with_tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }

    /// Name used for name rules: the resource name, or its identifier
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.id)
    }

    pub fn tag(&self, key: &str) -> Option<&str> {
        self.tags.get(key).map(String::as_str)
    }

    /// First-seen timestamp stored on the resource, if any
    pub fn first_seen(&self) -> Option<DateTime<Utc>> {
        self.tag(tags::TAG_FIRST_SEEN).and_then(tags::parse_timestamp)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_name_falls_back_to_id() {
        let candidate = Candidate::new("sg-0abc");
        assert_eq!(candidate.display_name(), "sg-0abc");

        let named = candidate.with_name("web");
        assert_eq!(named.display_name(), "web");
    }

    #[test]
    fn test_first_seen_reads_tag() {
        let candidate = Candidate::new("role/app")
            .with_tag(tags::TAG_FIRST_SEEN, "2024-01-02T03:04:05Z");
        let first_seen = candidate.first_seen().unwrap();
        assert_eq!(first_seen.to_rfc3339(), "2024-01-02T03:04:05+00:00");

        let garbage = Candidate::new("role/app").with_tag(tags::TAG_FIRST_SEEN, "soon");
        assert!(garbage.first_seen().is_none());
    }

    #[test]
    fn test_global_scope() {
        assert!(Scope::global().is_global());
        assert!(!Scope::new("us-east-1").is_global());
    }
}
