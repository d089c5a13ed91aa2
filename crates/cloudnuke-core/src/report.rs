//! Result aggregation and reporting

use crate::batch::DeletionOutcome;
use crate::error::{ErrorKind, NukeError};
use crate::filter::ExclusionReason;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{info, warn};

/// Final state of one identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Deleted,
    AlreadyGone,
    Failed,
}

impl std::fmt::Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Outcome::Deleted => write!(f, "deleted"),
            Outcome::AlreadyGone => write!(f, "already-gone"),
            Outcome::Failed => write!(f, "failed"),
        }
    }
}

/// One line of the run report
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportEntry {
    pub resource_type: String,
    pub region: String,
    pub identifier: String,
    pub outcome: Outcome,
    pub error_kind: Option<ErrorKind>,
    pub error: Option<String>,
}

impl ReportEntry {
    pub fn is_success(&self) -> bool {
        self.outcome != Outcome::Failed
    }
}

/// A failure scoped to a whole resource type in one region
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TypeFailure {
    pub resource_type: String,
    pub region: String,
    pub kind: ErrorKind,
    pub message: String,
}

impl TypeFailure {
    pub fn new(resource_type: &str, region: &str, error: &NukeError) -> Self {
        Self {
            resource_type: resource_type.to_string(),
            region: region.to_string(),
            kind: error.kind(),
            message: error.to_string(),
        }
    }
}

/// Everything that happened during a run
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AggregatedResult {
    pub succeeded: Vec<ReportEntry>,
    pub failed: Vec<ReportEntry>,
    pub type_failures: Vec<TypeFailure>,
    pub duration_ms: u64,
}

impl AggregatedResult {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty() && self.type_failures.is_empty()
    }

    pub fn is_empty(&self) -> bool {
        self.succeeded.is_empty() && self.failed.is_empty() && self.type_failures.is_empty()
    }

    pub fn entries(&self) -> impl Iterator<Item = &ReportEntry> {
        self.succeeded.iter().chain(self.failed.iter())
    }

    pub fn summary(&self) -> ResultSummary {
        ResultSummary {
            deleted: self
                .succeeded
                .iter()
                .filter(|e| e.outcome == Outcome::Deleted)
                .count(),
            already_gone: self
                .succeeded
                .iter()
                .filter(|e| e.outcome == Outcome::AlreadyGone)
                .count(),
            failed: self.failed.len(),
            type_failures: self.type_failures.len(),
        }
    }
}

/// Counts for the end-of-run line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResultSummary {
    pub deleted: usize,
    pub already_gone: usize,
    pub failed: usize,
    pub type_failures: usize,
}

impl std::fmt::Display for ResultSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} deleted, {} already gone, {} failed, {} resource type errors",
            self.deleted, self.already_gone, self.failed, self.type_failures
        )
    }
}

/// Collects outcomes into an [`AggregatedResult`]
///
/// Owned by a single task; concurrent producers hand their outcomes over
/// instead of writing here directly.
pub struct ResultAggregator {
    started: Instant,
    result: AggregatedResult,
}

impl Default for ResultAggregator {
    fn default() -> Self {
        Self::new()
    }
}

impl ResultAggregator {
    pub fn new() -> Self {
        Self {
            started: Instant::now(),
            result: AggregatedResult::default(),
        }
    }

    /// Record one identifier; "not found" errors count as success
    pub fn record(
        &mut self,
        resource_type: &str,
        region: &str,
        identifier: &str,
        error: Option<&NukeError>,
    ) -> ReportEntry {
        let (outcome, error_kind, message) = match error {
            None => (Outcome::Deleted, None, None),
            Some(e) if e.is_not_found() => (Outcome::AlreadyGone, None, None),
            Some(e) => (Outcome::Failed, Some(e.kind()), Some(e.to_string())),
        };
        let entry = ReportEntry {
            resource_type: resource_type.to_string(),
            region: region.to_string(),
            identifier: identifier.to_string(),
            outcome,
            error_kind,
            error: message,
        };

        if entry.is_success() {
            self.result.succeeded.push(entry.clone());
        } else {
            self.result.failed.push(entry.clone());
        }
        entry
    }

    pub fn record_outcome(
        &mut self,
        resource_type: &str,
        region: &str,
        outcome: &DeletionOutcome,
    ) -> ReportEntry {
        self.record(
            resource_type,
            region,
            &outcome.identifier,
            outcome.error.as_ref(),
        )
    }

    pub fn record_type_failure(
        &mut self,
        resource_type: &str,
        region: &str,
        error: &NukeError,
    ) -> TypeFailure {
        let failure = TypeFailure::new(resource_type, region, error);
        self.result.type_failures.push(failure.clone());
        failure
    }

    /// Fold a partial result (e.g., one region's) into this one
    pub fn merge(&mut self, other: AggregatedResult) {
        self.result.succeeded.extend(other.succeeded);
        self.result.failed.extend(other.failed);
        self.result.type_failures.extend(other.type_failures);
    }

    /// Never fails; partial failure is for the caller to judge
    pub fn finalize(mut self) -> AggregatedResult {
        self.result.duration_ms = self.started.elapsed().as_millis() as u64;
        self.result
    }
}

/// Candidate listing produced by a dry run
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Inventory {
    pub entries: Vec<InventoryEntry>,
    pub type_failures: Vec<TypeFailure>,
}

impl Inventory {
    pub fn eligible(&self) -> impl Iterator<Item = &InventoryEntry> {
        self.entries.iter().filter(|e| e.eligible)
    }

    pub fn merge(&mut self, other: Inventory) {
        self.entries.extend(other.entries);
        self.type_failures.extend(other.type_failures);
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InventoryEntry {
    pub resource_type: String,
    pub region: String,
    pub identifier: String,
    pub name: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub eligible: bool,
    pub reason: Option<ExclusionReason>,
}

/// Receives progress while a run is in flight
///
/// Passed to the engine at construction; `flush` is called once at the end
/// of every run.
pub trait NukeReporter: Send + Sync {
    fn listed(&self, _resource_type: &str, _region: &str, _found: usize, _eligible: usize) {}

    fn outcome(&self, entry: &ReportEntry);

    fn type_failure(&self, failure: &TypeFailure);

    fn flush(&self, _result: &AggregatedResult) {}
}

/// Reporter that forwards everything to `tracing`
#[derive(Debug, Clone, Copy, Default)]
pub struct LogReporter;

impl NukeReporter for LogReporter {
    fn listed(&self, resource_type: &str, region: &str, found: usize, eligible: usize) {
        info!(
            resource_type = %resource_type,
            region = %region,
            found,
            eligible,
            "Listed resources"
        );
    }

    fn outcome(&self, entry: &ReportEntry) {
        match entry.outcome {
            Outcome::Failed => warn!(
                resource_type = %entry.resource_type,
                region = %entry.region,
                identifier = %entry.identifier,
                error = entry.error.as_deref().unwrap_or_default(),
                "Failed to nuke resource"
            ),
            outcome => info!(
                resource_type = %entry.resource_type,
                region = %entry.region,
                identifier = %entry.identifier,
                outcome = %outcome,
                "Nuked resource"
            ),
        }
    }

    fn type_failure(&self, failure: &TypeFailure) {
        warn!(
            resource_type = %failure.resource_type,
            region = %failure.region,
            kind = %failure.kind,
            error = %failure.message,
            "Resource type failed"
        );
    }

    fn flush(&self, result: &AggregatedResult) {
        info!(
            duration_ms = result.duration_ms,
            "Run finished: {}",
            result.summary()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_already_gone_is_success() {
        let mut aggregator = ResultAggregator::new();
        let gone = NukeError::NotFound("i-1".to_string());
        aggregator.record("ec2-instance", "us-east-1", "i-1", Some(&gone));

        let result = aggregator.finalize();
        assert_eq!(result.succeeded.len(), 1);
        assert_eq!(result.succeeded[0].outcome, Outcome::AlreadyGone);
        assert!(result.failed.is_empty());
        assert!(result.is_success());
    }

    #[test]
    fn test_partial_failure_accounting() {
        let mut aggregator = ResultAggregator::new();
        for i in 0..5 {
            let id = format!("vol-{}", i);
            let error = (i % 2 == 1).then(|| NukeError::delete(&id, "VolumeInUse"));
            aggregator.record("ebs-volume", "eu-west-1", &id, error.as_ref());
        }

        let result = aggregator.finalize();
        assert_eq!(result.succeeded.len(), 3);
        assert_eq!(result.failed.len(), 2);
        assert_eq!(result.failed[0].error_kind, Some(ErrorKind::Delete));
        assert!(!result.is_success());

        let mut seen: Vec<_> = result.entries().map(|e| e.identifier.clone()).collect();
        seen.sort();
        assert_eq!(seen, vec!["vol-0", "vol-1", "vol-2", "vol-3", "vol-4"]);
    }

    #[test]
    fn test_type_failures_make_run_unsuccessful() {
        let mut aggregator = ResultAggregator::new();
        let err = NukeError::TooManyResources {
            resource_type: "s3-bucket".to_string(),
            count: 150,
            limit: 100,
        };
        aggregator.record_type_failure("s3-bucket", "global", &err);

        let result = aggregator.finalize();
        assert!(!result.is_success());
        assert_eq!(result.type_failures[0].kind, ErrorKind::TooManyResources);
        assert_eq!(result.summary().type_failures, 1);
    }

    #[test]
    fn test_merge_and_summary() {
        let mut region_a = ResultAggregator::new();
        region_a.record("ec2-instance", "us-east-1", "i-1", None);
        let mut total = ResultAggregator::new();
        total.record("ec2-instance", "us-west-2", "i-2", None);
        total.merge(region_a.finalize());

        let result = total.finalize();
        assert_eq!(
            result.summary().to_string(),
            "2 deleted, 0 already gone, 0 failed, 0 resource type errors"
        );
    }

    #[test]
    fn test_empty_result() {
        let result = ResultAggregator::new().finalize();
        assert!(result.is_empty());
        assert!(result.is_success());
    }
}
