//! Resource types served from the inventory file
//!
//! Every [`TypeSpec`] in the inventory becomes one [`LocalResourceType`].
//! Mutations are applied to an in-memory copy and written back to disk
//! right away, so an interrupted run leaves a consistent file behind.

use crate::error::{LocalError, Result};
use crate::inventory::{
    InventoryDocument, InventoryLock, InventoryStore, ResourceStatus, TypeSpec,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use cloudnuke_core::{
    Candidate, ConfirmPolicy, FilterConfig, FirstSeenStore, ProbeStatus, Registry, ResourceType,
    Scope, TeardownStep, tags,
};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info};

struct Shared {
    store: InventoryStore,
    document: Mutex<InventoryDocument>,
}

impl Shared {
    /// Apply `f` and persist the document when it succeeds
    async fn mutate<T>(&self, f: impl FnOnce(&mut InventoryDocument) -> Result<T>) -> Result<T> {
        let mut document = self.document.lock().await;
        let value = f(&mut document)?;
        self.store.save(&document).await?;
        Ok(value)
    }
}

/// Provider backed by a local inventory file
pub struct LocalProvider {
    shared: Arc<Shared>,
    lock: Option<InventoryLock>,
}

impl LocalProvider {
    /// Open the inventory for a destructive run, holding the lock until
    /// [`close`](Self::close) or drop
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let store = InventoryStore::new(path);
        let lock = store.acquire_lock().await?;
        let document = store.load().await?;
        info!(
            path = %store.path().display(),
            resources = document.resources.len(),
            "Opened inventory"
        );
        Ok(Self {
            shared: Arc::new(Shared {
                store,
                document: Mutex::new(document),
            }),
            lock: Some(lock),
        })
    }

    /// Open without taking the lock; for listing only
    pub async fn open_read_only(path: impl AsRef<Path>) -> Result<Self> {
        let store = InventoryStore::new(path);
        let document = store.load().await?;
        Ok(Self {
            shared: Arc::new(Shared {
                store,
                document: Mutex::new(document),
            }),
            lock: None,
        })
    }

    /// Regions enabled in the inventory
    pub async fn enabled_regions(&self) -> Vec<String> {
        self.shared.document.lock().await.regions.clone()
    }

    /// Registry with one resource type per declared type, in file order
    pub async fn registry(&self) -> Registry {
        let document = self.shared.document.lock().await;
        let mut registry = Registry::new();
        for spec in &document.resource_types {
            registry.register(LocalResourceType {
                spec: spec.clone(),
                shared: self.shared.clone(),
            });
        }
        registry
    }

    /// Snapshot of the current document
    pub async fn snapshot(&self) -> InventoryDocument {
        self.shared.document.lock().await.clone()
    }

    pub async fn close(mut self) -> Result<()> {
        if let Some(lock) = self.lock.take() {
            lock.release().await?;
        }
        Ok(())
    }
}

/// One inventory resource type
pub struct LocalResourceType {
    spec: TypeSpec,
    shared: Arc<Shared>,
}

enum DeleteAction {
    Remove,
    MarkDeleting,
    InProgress,
}

#[async_trait]
impl ResourceType for LocalResourceType {
    fn name(&self) -> &str {
        &self.spec.name
    }

    fn max_batch_size(&self) -> usize {
        self.spec.max_batch_size
    }

    fn is_global(&self) -> bool {
        self.spec.global
    }

    fn first_seen_store(&self) -> Option<Arc<dyn FirstSeenStore>> {
        self.spec.tracks_first_seen.then(|| {
            Arc::new(LocalTagStore {
                resource_type: self.spec.name.clone(),
                shared: self.shared.clone(),
            }) as Arc<dyn FirstSeenStore>
        })
    }

    async fn list(
        &self,
        scope: &Scope,
        _filter: &FilterConfig,
    ) -> cloudnuke_core::Result<Vec<Candidate>> {
        let document = self.shared.document.lock().await;
        Ok(document
            .in_scope(&self.spec.name, &scope.region)
            .filter(|r| r.status == ResourceStatus::Active)
            .map(|r| r.to_candidate())
            .collect())
    }

    fn teardown_steps(&self) -> Vec<Arc<dyn TeardownStep>> {
        self.spec
            .teardown
            .iter()
            .map(|step| {
                Arc::new(DetachStep {
                    resource_type: self.spec.name.clone(),
                    step: step.clone(),
                    shared: self.shared.clone(),
                }) as Arc<dyn TeardownStep>
            })
            .collect()
    }

    async fn delete(&self, scope: &Scope, identifier: &str) -> cloudnuke_core::Result<()> {
        let name = self.spec.name.as_str();
        let async_delete = self.spec.async_delete;
        let teardown = &self.spec.teardown;

        self.shared
            .mutate(|document| {
                let resource = document
                    .find_mut(name, &scope.region, identifier)
                    .ok_or_else(|| LocalError::ResourceNotFound(identifier.to_string()))?;

                let status = resource.status;
                let action = match status {
                    ResourceStatus::Deleting => DeleteAction::InProgress,
                    ResourceStatus::Failed => {
                        return Err(LocalError::Rejected {
                            identifier: identifier.to_string(),
                            message: "resource is in failed state".to_string(),
                        });
                    }
                    ResourceStatus::Active => {
                        if let Some(message) = &resource.reject_delete {
                            return Err(LocalError::Rejected {
                                identifier: identifier.to_string(),
                                message: message.clone(),
                            });
                        }
                        if let Some((step, remaining)) = resource.blocking_attachment(teardown) {
                            return Err(LocalError::DependencyViolation {
                                identifier: identifier.to_string(),
                                step: step.to_string(),
                                remaining,
                            });
                        }
                        if async_delete {
                            resource.status = ResourceStatus::Deleting;
                            DeleteAction::MarkDeleting
                        } else {
                            DeleteAction::Remove
                        }
                    }
                };

                match action {
                    DeleteAction::Remove => {
                        document.remove(name, &scope.region, identifier);
                    }
                    DeleteAction::MarkDeleting => document.touch(),
                    DeleteAction::InProgress => {}
                }
                Ok(())
            })
            .await?;

        debug!(
            resource_type = %name,
            region = %scope,
            identifier = %identifier,
            async_delete,
            "Delete accepted"
        );
        Ok(())
    }

    fn confirmation(&self) -> Option<ConfirmPolicy> {
        self.spec.async_delete.then(|| {
            ConfirmPolicy::fixed(
                self.spec.confirm_attempts,
                Duration::from_millis(self.spec.confirm_interval_ms),
            )
        })
    }

    async fn probe(&self, scope: &Scope, identifier: &str) -> cloudnuke_core::Result<ProbeStatus> {
        let name = self.spec.name.as_str();
        let status = self
            .shared
            .mutate(|document| {
                let Some(resource) = document.find_mut(name, &scope.region, identifier) else {
                    return Ok(ProbeStatus::Gone);
                };

                let current = resource.status;
                let status = match current {
                    ResourceStatus::Active => ProbeStatus::Pending,
                    ResourceStatus::Failed => ProbeStatus::Terminal(
                        resource
                            .terminal_state
                            .clone()
                            .unwrap_or_else(|| ResourceStatus::Failed.to_string()),
                    ),
                    ResourceStatus::Deleting => {
                        if let Some(state) = resource.terminal_state.clone() {
                            resource.status = ResourceStatus::Failed;
                            ProbeStatus::Terminal(state)
                        } else if resource.pending_polls == 0 {
                            document.remove(name, &scope.region, identifier);
                            ProbeStatus::Gone
                        } else {
                            resource.pending_polls -= 1;
                            ProbeStatus::Pending
                        }
                    }
                };
                Ok(status)
            })
            .await?;
        Ok(status)
    }
}

/// Clears one attachment list of a resource
struct DetachStep {
    resource_type: String,
    step: String,
    shared: Arc<Shared>,
}

#[async_trait]
impl TeardownStep for DetachStep {
    fn name(&self) -> &str {
        &self.step
    }

    async fn run(&self, scope: &Scope, identifier: &str) -> cloudnuke_core::Result<()> {
        let cleared = self
            .shared
            .mutate(|document| {
                // Nothing to detach; the delete call reports the resource gone
                let Some(resource) = document.find_mut(&self.resource_type, &scope.region, identifier)
                else {
                    return Ok(0);
                };
                let cleared = resource
                    .attachments
                    .get_mut(&self.step)
                    .map(|items| std::mem::take(items).len())
                    .unwrap_or(0);
                document.touch();
                Ok(cleared)
            })
            .await?;

        debug!(
            resource_type = %self.resource_type,
            identifier = %identifier,
            step = %self.step,
            cleared,
            "Detached"
        );
        Ok(())
    }
}

/// Writes first-seen tags into the inventory
struct LocalTagStore {
    resource_type: String,
    shared: Arc<Shared>,
}

#[async_trait]
impl FirstSeenStore for LocalTagStore {
    async fn record(
        &self,
        scope: &Scope,
        identifier: &str,
        observed_at: DateTime<Utc>,
    ) -> cloudnuke_core::Result<DateTime<Utc>> {
        let stored = self
            .shared
            .mutate(|document| {
                let resource = document
                    .find_mut(&self.resource_type, &scope.region, identifier)
                    .ok_or_else(|| LocalError::ResourceNotFound(identifier.to_string()))?;

                let existing = resource
                    .tags
                    .get(tags::TAG_FIRST_SEEN)
                    .and_then(|value| tags::parse_timestamp(value));
                if let Some(existing) = existing {
                    return Ok(existing);
                }

                resource.tags.insert(
                    tags::TAG_FIRST_SEEN.to_string(),
                    tags::format_timestamp(observed_at),
                );
                document.touch();
                Ok(observed_at)
            })
            .await?;
        Ok(stored)
    }
}
