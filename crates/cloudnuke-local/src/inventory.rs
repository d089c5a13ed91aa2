//! Inventory file
//!
//! Manages the `.cloudnuke/inventory.json` file which describes the
//! resource types and resources the local provider serves.

use crate::error::{LocalError, Result};
use chrono::{DateTime, Utc};
use cloudnuke_core::{Candidate, DEFAULT_MAX_BATCH_SIZE, GLOBAL_REGION};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::io;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;

const INVENTORY_VERSION: u32 = 1;
const LOCK_FILE: &str = "inventory.lock";

/// Default location relative to the working directory
pub const DEFAULT_INVENTORY_PATH: &str = ".cloudnuke/inventory.json";

/// Whole inventory document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InventoryDocument {
    /// Inventory file version
    pub version: u32,

    /// Last modified timestamp
    pub updated_at: DateTime<Utc>,

    /// Regions the local "account" has enabled
    #[serde(default)]
    pub regions: Vec<String>,

    /// Resource types in processing order
    #[serde(default)]
    pub resource_types: Vec<TypeSpec>,

    #[serde(default)]
    pub resources: Vec<LocalResource>,
}

impl Default for InventoryDocument {
    fn default() -> Self {
        Self {
            version: INVENTORY_VERSION,
            updated_at: Utc::now(),
            regions: Vec::new(),
            resource_types: Vec::new(),
            resources: Vec::new(),
        }
    }
}

impl InventoryDocument {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject documents the provider cannot serve consistently
    pub fn validate(&self) -> Result<()> {
        if self.version > INVENTORY_VERSION {
            return Err(LocalError::StateError(format!(
                "Inventory version {} is newer than supported version {}",
                self.version, INVENTORY_VERSION
            )));
        }

        let mut seen = HashSet::new();
        for spec in &self.resource_types {
            if !seen.insert(spec.name.as_str()) {
                return Err(LocalError::DuplicateResourceType(spec.name.clone()));
            }
        }

        for resource in &self.resources {
            if !seen.contains(resource.resource_type.as_str()) {
                return Err(LocalError::UndeclaredResourceType {
                    identifier: resource.id.clone(),
                    resource_type: resource.resource_type.clone(),
                });
            }
        }
        Ok(())
    }

    pub fn spec(&self, resource_type: &str) -> Option<&TypeSpec> {
        self.resource_types.iter().find(|s| s.name == resource_type)
    }

    pub fn find(&self, resource_type: &str, region: &str, id: &str) -> Option<&LocalResource> {
        self.resources
            .iter()
            .find(|r| r.matches(resource_type, region) && r.id == id)
    }

    pub fn find_mut(
        &mut self,
        resource_type: &str,
        region: &str,
        id: &str,
    ) -> Option<&mut LocalResource> {
        self.resources
            .iter_mut()
            .find(|r| r.matches(resource_type, region) && r.id == id)
    }

    /// Remove a resource
    pub fn remove(&mut self, resource_type: &str, region: &str, id: &str) -> Option<LocalResource> {
        let index = self
            .resources
            .iter()
            .position(|r| r.matches(resource_type, region) && r.id == id)?;
        self.updated_at = Utc::now();
        Some(self.resources.remove(index))
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    /// Resources of one type in one region
    pub fn in_scope<'a>(
        &'a self,
        resource_type: &'a str,
        region: &'a str,
    ) -> impl Iterator<Item = &'a LocalResource> + 'a {
        self.resources
            .iter()
            .filter(move |r| r.matches(resource_type, region))
    }
}

/// Declared behavior of one resource type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeSpec {
    pub name: String,

    #[serde(default = "default_batch_size")]
    pub max_batch_size: usize,

    /// Lives in the global pseudo-region
    #[serde(default)]
    pub global: bool,

    /// No creation timestamp; aged by the first-seen tag
    #[serde(default)]
    pub tracks_first_seen: bool,

    /// Delete returns before the resource is gone
    #[serde(default)]
    pub async_delete: bool,

    /// Ordered teardown step names
    #[serde(default)]
    pub teardown: Vec<String>,

    #[serde(default = "default_confirm_attempts")]
    pub confirm_attempts: u32,

    #[serde(default = "default_confirm_interval_ms")]
    pub confirm_interval_ms: u64,
}

impl TypeSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            max_batch_size: default_batch_size(),
            global: false,
            tracks_first_seen: false,
            async_delete: false,
            teardown: Vec::new(),
            confirm_attempts: default_confirm_attempts(),
            confirm_interval_ms: default_confirm_interval_ms(),
        }
    }
}

fn default_batch_size() -> usize {
    DEFAULT_MAX_BATCH_SIZE
}

fn default_confirm_attempts() -> u32 {
    10
}

fn default_confirm_interval_ms() -> u64 {
    1000
}

/// State of a single resource
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocalResource {
    pub id: String,

    pub resource_type: String,

    /// Region, or "global" for global types
    #[serde(default = "default_region")]
    pub region: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,

    #[serde(default)]
    pub tags: HashMap<String, String>,

    /// Teardown step name to the attachments that step removes
    #[serde(default)]
    pub attachments: BTreeMap<String, Vec<String>>,

    #[serde(default)]
    pub status: ResourceStatus,

    /// Probes answered `deleting` before an async delete completes
    #[serde(default)]
    pub pending_polls: u32,

    /// Delete calls fail with this message
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reject_delete: Option<String>,

    /// Async delete ends in this terminal state instead of disappearing
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub terminal_state: Option<String>,
}

fn default_region() -> String {
    GLOBAL_REGION.to_string()
}

impl LocalResource {
    pub fn new(
        id: impl Into<String>,
        resource_type: impl Into<String>,
        region: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            resource_type: resource_type.into(),
            region: region.into(),
            name: None,
            created_at: None,
            tags: HashMap::new(),
            attachments: BTreeMap::new(),
            status: ResourceStatus::Active,
            pending_polls: 0,
            reject_delete: None,
            terminal_state: None,
        }
    }

    pub fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = Some(created_at);
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }

    pub fn with_attachments(mut self, step: impl Into<String>, items: &[&str]) -> Self {
        self.attachments
            .insert(step.into(), items.iter().map(|s| s.to_string()).collect());
        self
    }

    fn matches(&self, resource_type: &str, region: &str) -> bool {
        self.resource_type == resource_type && self.region == region
    }

    /// First step, in teardown order, that still has attachments
    ///
    /// Attachments under a step the type does not declare come last; no
    /// teardown run can ever clear them.
    pub fn blocking_attachment<'a>(
        &'a self,
        teardown: &'a [String],
    ) -> Option<(&'a str, usize)> {
        let pending = |step: &str| {
            self.attachments
                .get(step)
                .filter(|items| !items.is_empty())
                .map(|items| items.len())
        };
        teardown
            .iter()
            .find_map(|step| pending(step).map(|n| (step.as_str(), n)))
            .or_else(|| {
                self.attachments
                    .iter()
                    .find(|(step, items)| !items.is_empty() && !teardown.contains(step))
                    .map(|(step, items)| (step.as_str(), items.len()))
            })
    }

    pub fn to_candidate(&self) -> Candidate {
        Candidate {
            id: self.id.clone(),
            name: self.name.clone(),
            created_at: self.created_at,
            tags: self.tags.clone(),
        }
    }
}

/// Status of a resource
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceStatus {
    #[default]
    Active,
    /// Delete accepted, not gone yet
    Deleting,
    /// Delete ended in a terminal state
    Failed,
}

impl std::fmt::Display for ResourceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResourceStatus::Active => write!(f, "active"),
            ResourceStatus::Deleting => write!(f, "deleting"),
            ResourceStatus::Failed => write!(f, "failed"),
        }
    }
}

/// Reads and writes the inventory file
#[derive(Debug, Clone)]
pub struct InventoryStore {
    path: PathBuf,
}

impl InventoryStore {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn dir(&self) -> PathBuf {
        self.path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default()
    }

    fn backup_path(&self) -> PathBuf {
        let mut name = self.path.as_os_str().to_owned();
        name.push(".backup");
        PathBuf::from(name)
    }

    fn lock_path(&self) -> PathBuf {
        self.dir().join(LOCK_FILE)
    }

    async fn ensure_dir(&self) -> Result<()> {
        let dir = self.dir();
        if !dir.as_os_str().is_empty() && !dir.exists() {
            fs::create_dir_all(&dir).await?;
            tracing::debug!("Created inventory directory: {}", dir.display());
        }
        Ok(())
    }

    /// Load the inventory; a missing file is an empty inventory
    pub async fn load(&self) -> Result<InventoryDocument> {
        if !self.path.exists() {
            tracing::debug!("Inventory file not found, returning empty inventory");
            return Ok(InventoryDocument::new());
        }

        let content = fs::read_to_string(&self.path).await?;
        let document: InventoryDocument = serde_json::from_str(&content)?;
        document.validate()?;

        tracing::debug!("Loaded inventory with {} resources", document.resources.len());
        Ok(document)
    }

    /// Save the inventory, keeping the previous file as a backup
    ///
    /// The new document is written and synced to a sibling temp file, then
    /// renamed over the inventory. A failed write leaves the current file in
    /// place.
    pub async fn save(&self, document: &InventoryDocument) -> Result<()> {
        self.ensure_dir().await?;

        let content = serde_json::to_vec_pretty(document)?;
        let staged = self.staged_path();
        let mut file = fs::File::create(&staged).await?;
        if let Err(e) = write_synced(&mut file, &content).await {
            drop(file);
            let _ = fs::remove_file(&staged).await;
            return Err(e.into());
        }
        drop(file);

        if self.path.exists() {
            fs::copy(&self.path, self.backup_path()).await?;
        }
        fs::rename(&staged, &self.path).await?;

        tracing::debug!(
            path = %self.path.display(),
            resources = document.resources.len(),
            "Saved inventory"
        );
        Ok(())
    }

    /// Take the inventory lock
    ///
    /// The lock file is created with `create_new`, so two processes can
    /// never both succeed. A lock older than one hour is broken once and the
    /// create is retried.
    pub async fn acquire_lock(&self) -> Result<InventoryLock> {
        self.ensure_dir().await?;

        let lock_path = self.lock_path();
        let owner = LockInfo::current();

        match create_lock_file(&lock_path, &owner).await {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                let held = LockInfo::read(&lock_path).await?;
                if !held.is_stale(Utc::now()) {
                    return Err(LocalError::LockError(format!(
                        "Inventory is locked by {} since {}",
                        held.holder, held.acquired_at
                    )));
                }

                tracing::warn!(
                    holder = %held.holder,
                    acquired_at = %held.acquired_at,
                    "Breaking stale inventory lock"
                );
                match fs::remove_file(&lock_path).await {
                    Ok(()) => {}
                    Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                    Err(e) => return Err(e.into()),
                }
                create_lock_file(&lock_path, &owner).await.map_err(|e| {
                    if e.kind() == io::ErrorKind::AlreadyExists {
                        LocalError::LockError(
                            "Inventory lock was taken by another process".to_string(),
                        )
                    } else {
                        e.into()
                    }
                })?;
            }
            Err(e) => return Err(e.into()),
        }

        tracing::debug!(holder = %owner.holder, "Acquired inventory lock");
        Ok(InventoryLock {
            path: Some(lock_path),
        })
    }

    fn staged_path(&self) -> PathBuf {
        let mut name = self.path.as_os_str().to_owned();
        name.push(".tmp");
        PathBuf::from(name)
    }
}

async fn write_synced(file: &mut fs::File, content: &[u8]) -> io::Result<()> {
    file.write_all(content).await?;
    file.sync_all().await
}

async fn create_lock_file(path: &Path, owner: &LockInfo) -> io::Result<()> {
    let mut file = fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
        .await?;
    let content = serde_json::to_vec(owner).map_err(io::Error::other)?;
    write_synced(&mut file, &content).await
}

/// Hours after which a held lock is considered abandoned
const LOCK_STALE_AFTER_HOURS: i64 = 1;

/// Contents of the lock file
#[derive(Debug, Serialize, Deserialize)]
struct LockInfo {
    holder: String,
    acquired_at: DateTime<Utc>,
}

impl LockInfo {
    fn current() -> Self {
        let host = std::env::var("HOSTNAME")
            .or_else(|_| std::env::var("HOST"))
            .unwrap_or_else(|_| "localhost".to_string());
        Self {
            holder: format!("{}:{}", host, std::process::id()),
            acquired_at: Utc::now(),
        }
    }

    /// Read a held lock; an unreadable one is aged by its modification time
    async fn read(path: &Path) -> Result<Self> {
        let content = fs::read(path).await?;
        if let Ok(info) = serde_json::from_slice::<LockInfo>(&content) {
            return Ok(info);
        }
        let modified = fs::metadata(path).await?.modified()?;
        Ok(Self {
            holder: "unknown".to_string(),
            acquired_at: DateTime::<Utc>::from(modified),
        })
    }

    fn is_stale(&self, now: DateTime<Utc>) -> bool {
        now.signed_duration_since(self.acquired_at) >= chrono::Duration::hours(LOCK_STALE_AFTER_HOURS)
    }
}

/// Held inventory lock; removed on release or drop
#[derive(Debug)]
pub struct InventoryLock {
    path: Option<PathBuf>,
}

impl InventoryLock {
    pub async fn release(mut self) -> Result<()> {
        let Some(path) = self.path.take() else {
            return Ok(());
        };
        match fs::remove_file(&path).await {
            Ok(()) => {
                tracing::debug!("Released inventory lock");
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

impl Drop for InventoryLock {
    fn drop(&mut self) {
        if let Some(path) = self.path.take() {
            let _ = std::fs::remove_file(path);
        }
    }
}
