//! First-seen tracking for resource types without creation timestamps
//!
//! The first time the engine observes such a resource it writes a
//! `cloud-nuke-first-seen` tag and leaves the resource alone. Later runs age
//! the resource by that tag.

use crate::error::Result;
use crate::resource::{Candidate, Scope};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Persists first-seen timestamps on the resources themselves
#[async_trait]
pub trait FirstSeenStore: Send + Sync {
    /// Write `observed_at` unless a readable timestamp is already stored
    ///
    /// Returns the timestamp that is stored after the call. Implementations
    /// must never replace an existing readable value.
    async fn record(
        &self,
        scope: &Scope,
        identifier: &str,
        observed_at: DateTime<Utc>,
    ) -> Result<DateTime<Utc>>;
}

/// Reference time of a candidate of a first-seen tracked type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferenceTime {
    Known(DateTime<Utc>),
    NeedsTagging,
}

pub struct FirstSeenTracker;

impl FirstSeenTracker {
    pub fn reference_time(candidate: &Candidate) -> ReferenceTime {
        match candidate.first_seen() {
            Some(at) => ReferenceTime::Known(at),
            None => ReferenceTime::NeedsTagging,
        }
    }

    /// Split candidates into those aged by their tag and those seen for the
    /// first time
    ///
    /// Aged candidates come back with `created_at` replaced by the tag value.
    pub fn partition(candidates: Vec<Candidate>) -> (Vec<Candidate>, Vec<Candidate>) {
        let mut known = Vec::new();
        let mut untagged = Vec::new();
        for mut candidate in candidates {
            match Self::reference_time(&candidate) {
                ReferenceTime::Known(at) => {
                    candidate.created_at = Some(at);
                    known.push(candidate);
                }
                ReferenceTime::NeedsTagging => untagged.push(candidate),
            }
        }
        (known, untagged)
    }

    /// Tag every untagged candidate with `now`
    ///
    /// Returns the identifiers whose tag write failed, with the error.
    pub async fn tag_all(
        store: &dyn FirstSeenStore,
        scope: &Scope,
        untagged: &[Candidate],
        now: DateTime<Utc>,
    ) -> Vec<(String, crate::NukeError)> {
        let mut failures = Vec::new();
        for candidate in untagged {
            match store.record(scope, &candidate.id, now).await {
                Ok(stored) => {
                    tracing::debug!(
                        identifier = %candidate.id,
                        region = %scope,
                        first_seen = %stored,
                        "Recorded first-seen tag"
                    );
                }
                Err(e) => {
                    tracing::warn!(
                        identifier = %candidate.id,
                        region = %scope,
                        error = %e,
                        "Failed to record first-seen tag"
                    );
                    let error = match e {
                        crate::NukeError::Tagging { .. } => e,
                        other => crate::NukeError::Tagging {
                            identifier: candidate.id.clone(),
                            message: other.to_string(),
                        },
                    };
                    failures.push((candidate.id.clone(), error));
                }
            }
        }
        failures
    }
}
