//! Nuke orchestration
//!
//! For every region of a [`Plan`] and every resource type in that region:
//! list → first-seen resolution → filter → batch → teardown → delete →
//! confirm → aggregate.

use crate::batch::run_batched;
use crate::error::{NukeError, Result};
use crate::filter::{ExclusionReason, FilterConfig};
use crate::first_seen::FirstSeenTracker;
use crate::plan::Plan;
use crate::poller::wait_until_gone;
use crate::report::{
    AggregatedResult, Inventory, InventoryEntry, NukeReporter, ResultAggregator, TypeFailure,
};
use crate::resource::{Candidate, ResourceType, Scope};
use crate::teardown::run_teardown;
use futures_util::stream::{self, StreamExt};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Engine tuning
#[derive(Debug, Clone)]
pub struct EngineOptions {
    /// Regions processed at the same time
    pub region_concurrency: usize,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            region_concurrency: 4,
        }
    }
}

/// Drives resource types through the nuke pipeline
pub struct Engine {
    reporter: Arc<dyn NukeReporter>,
    options: EngineOptions,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mode {
    Inspect,
    Nuke,
}

/// Candidates of one type after first-seen resolution and filtering
struct Selection {
    eligible: Vec<String>,
    entries: Vec<InventoryEntry>,
    tagging_failures: Vec<(String, NukeError)>,
}

impl Engine {
    pub fn new(reporter: Arc<dyn NukeReporter>) -> Self {
        Self {
            reporter,
            options: EngineOptions::default(),
        }
    }

    pub fn with_options(mut self, options: EngineOptions) -> Self {
        self.options = options;
        self
    }

    /// List and filter without tagging or deleting anything
    pub async fn inspect(&self, plan: &Plan) -> Inventory {
        let per_region: Vec<Inventory> = stream::iter(plan.scopes())
            .map(|scope| self.inspect_region(plan, scope))
            .buffer_unordered(self.options.region_concurrency.max(1))
            .collect()
            .await;

        let mut inventory = Inventory::default();
        for region in per_region {
            inventory.merge(region);
        }
        inventory
    }

    /// Nuke every eligible resource in the plan
    ///
    /// Always returns a full accounting; failures of one identifier or one
    /// resource type never stop the others.
    pub async fn nuke(&self, plan: &Plan) -> AggregatedResult {
        info!(plan = %plan.summary(), "Starting nuke run");

        let mut aggregator = ResultAggregator::new();
        let mut regions = stream::iter(plan.scopes())
            .map(|scope| self.nuke_region(plan, scope))
            .buffer_unordered(self.options.region_concurrency.max(1));

        while let Some(region_result) = regions.next().await {
            aggregator.merge(region_result);
        }

        let result = aggregator.finalize();
        self.reporter.flush(&result);
        result
    }

    /// Run the delete pipeline on identifiers that were already selected
    pub async fn nuke_identifiers(
        &self,
        resource_type: &Arc<dyn ResourceType>,
        scope: &Scope,
        identifiers: Vec<String>,
    ) -> AggregatedResult {
        let mut aggregator = ResultAggregator::new();
        self.delete_all(resource_type, scope, identifiers, &mut aggregator)
            .await;
        aggregator.finalize()
    }

    async fn inspect_region(&self, plan: &Plan, scope: Scope) -> Inventory {
        let mut inventory = Inventory::default();
        for resource_type in plan.types_for(&scope) {
            let filter = plan.filter_for(resource_type.name());
            match self
                .select(&resource_type, &scope, &filter, Mode::Inspect)
                .await
            {
                Ok(selection) => inventory.entries.extend(selection.entries),
                Err(e) => {
                    let failure = TypeFailure::new(resource_type.name(), &scope.region, &e);
                    self.reporter.type_failure(&failure);
                    inventory.type_failures.push(failure);
                }
            }
        }
        inventory
    }

    async fn nuke_region(&self, plan: &Plan, scope: Scope) -> AggregatedResult {
        let mut aggregator = ResultAggregator::new();
        for resource_type in plan.types_for(&scope) {
            let filter = plan.filter_for(resource_type.name());
            self.nuke_type(&resource_type, &scope, &filter, &mut aggregator)
                .await;
        }
        aggregator.finalize()
    }

    async fn nuke_type(
        &self,
        resource_type: &Arc<dyn ResourceType>,
        scope: &Scope,
        filter: &FilterConfig,
        aggregator: &mut ResultAggregator,
    ) {
        let selection = match self.select(resource_type, scope, filter, Mode::Nuke).await {
            Ok(selection) => selection,
            Err(e) => {
                let failure = aggregator.record_type_failure(resource_type.name(), &scope.region, &e);
                self.reporter.type_failure(&failure);
                return;
            }
        };

        for (identifier, error) in &selection.tagging_failures {
            let entry = aggregator.record(
                resource_type.name(),
                &scope.region,
                identifier,
                Some(error),
            );
            self.reporter.outcome(&entry);
        }

        self.delete_all(resource_type, scope, selection.eligible, aggregator)
            .await;
    }

    /// List, resolve first-seen tags and filter one resource type
    async fn select(
        &self,
        resource_type: &Arc<dyn ResourceType>,
        scope: &Scope,
        filter: &FilterConfig,
        mode: Mode,
    ) -> Result<Selection> {
        let listed = resource_type
            .list(scope, filter)
            .await
            .map_err(|e| match e {
                NukeError::List { .. } => e,
                other => NukeError::List {
                    resource_type: resource_type.name().to_string(),
                    message: other.to_string(),
                },
            })?;
        let found = listed.len();

        let mut selection = Selection {
            eligible: Vec::new(),
            entries: Vec::with_capacity(found),
            tagging_failures: Vec::new(),
        };

        let candidates = match resource_type.first_seen_store() {
            None => listed,
            Some(store) => {
                let (known, untagged) = FirstSeenTracker::partition(listed);
                if mode == Mode::Nuke && !untagged.is_empty() {
                    selection.tagging_failures =
                        FirstSeenTracker::tag_all(store.as_ref(), scope, &untagged, filter.now)
                            .await;
                }
                for candidate in &untagged {
                    selection.entries.push(entry_for(
                        resource_type.name(),
                        scope,
                        candidate,
                        Some(ExclusionReason::FirstSeenPending),
                    ));
                }
                known
            }
        };

        for candidate in candidates {
            let verdict = filter.evaluate(&candidate);
            if verdict.is_included() {
                selection.eligible.push(candidate.id.clone());
            } else {
                debug!(
                    resource_type = %resource_type.name(),
                    region = %scope,
                    identifier = %candidate.id,
                    reason = ?verdict.reason(),
                    "Candidate excluded"
                );
            }
            selection.entries.push(entry_for(
                resource_type.name(),
                scope,
                &candidate,
                verdict.reason(),
            ));
        }

        self.reporter.listed(
            resource_type.name(),
            &scope.region,
            found,
            selection.eligible.len(),
        );
        Ok(selection)
    }

    /// Hand every eligible identifier to the controller in one call
    ///
    /// The controller owns batching and the per-call ceiling; a ceiling trip
    /// ends this resource type in this region without any delete call.
    async fn delete_all(
        &self,
        resource_type: &Arc<dyn ResourceType>,
        scope: &Scope,
        identifiers: Vec<String>,
        aggregator: &mut ResultAggregator,
    ) {
        if identifiers.is_empty() {
            return;
        }

        let action = {
            let resource_type = resource_type.clone();
            let scope = scope.clone();
            move |identifier: String| {
                let resource_type = resource_type.clone();
                let scope = scope.clone();
                async move { nuke_one(resource_type, scope, identifier).await }
            }
        };

        let max_batch_size = resource_type.max_batch_size();
        match run_batched(resource_type.name(), identifiers, max_batch_size, action).await {
            Ok(outcomes) => {
                for outcome in &outcomes {
                    let entry =
                        aggregator.record_outcome(resource_type.name(), &scope.region, outcome);
                    self.reporter.outcome(&entry);
                }
            }
            Err(e) => {
                let failure =
                    aggregator.record_type_failure(resource_type.name(), &scope.region, &e);
                self.reporter.type_failure(&failure);
                warn!(
                    resource_type = %resource_type.name(),
                    region = %scope,
                    error = %e,
                    "Skipping resource type"
                );
            }
        }
    }
}

/// Teardown, delete and confirm one identifier
async fn nuke_one(
    resource_type: Arc<dyn ResourceType>,
    scope: Scope,
    identifier: String,
) -> Result<()> {
    let steps = resource_type.teardown_steps();
    if !steps.is_empty() {
        run_teardown(&steps, &scope, &identifier).await?;
    }

    resource_type.delete(&scope, &identifier).await?;

    if let Some(policy) = resource_type.confirmation() {
        wait_until_gone(&identifier, &policy, || {
            resource_type.probe(&scope, &identifier)
        })
        .await?;
    }
    Ok(())
}

fn entry_for(
    resource_type: &str,
    scope: &Scope,
    candidate: &Candidate,
    reason: Option<ExclusionReason>,
) -> InventoryEntry {
    InventoryEntry {
        resource_type: resource_type.to_string(),
        region: scope.region.clone(),
        identifier: candidate.id.clone(),
        name: candidate.name.clone(),
        created_at: candidate.created_at,
        eligible: reason.is_none(),
        reason,
    }
}
