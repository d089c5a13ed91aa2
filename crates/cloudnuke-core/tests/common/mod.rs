use async_trait::async_trait;
use chrono::{DateTime, Utc};
use cloudnuke_core::{
    Candidate, ConfirmPolicy, FilterConfig, FirstSeenStore, NukeError, ProbeStatus, ResourceType,
    Result, Scope, TeardownStep, tags,
};
use std::collections::HashSet;
use std::sync::{Arc, Mutex};

type Shared<T> = Arc<Mutex<T>>;

/// In-memory resource type with scripted failures
pub struct FakeType {
    name: String,
    global: bool,
    max_batch_size: usize,
    tracks_first_seen: bool,
    list_error: Option<String>,
    untaggable: HashSet<String>,
    resources: Shared<Vec<(String, Candidate)>>,
    failing: HashSet<String>,
    missing: HashSet<String>,
    stuck: HashSet<String>,
    steps: Vec<Arc<dyn TeardownStep>>,
    confirmation: Option<ConfirmPolicy>,
    pub delete_calls: Shared<Vec<String>>,
    pub tag_writes: Shared<Vec<String>>,
}

#[allow(dead_code)]
impl FakeType {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            global: false,
            max_batch_size: 50,
            tracks_first_seen: false,
            list_error: None,
            untaggable: HashSet::new(),
            resources: Arc::new(Mutex::new(Vec::new())),
            failing: HashSet::new(),
            missing: HashSet::new(),
            stuck: HashSet::new(),
            steps: Vec::new(),
            confirmation: None,
            delete_calls: Arc::new(Mutex::new(Vec::new())),
            tag_writes: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn global(mut self) -> Self {
        self.global = true;
        self
    }

    pub fn batch_size(mut self, size: usize) -> Self {
        self.max_batch_size = size;
        self
    }

    pub fn first_seen(mut self) -> Self {
        self.tracks_first_seen = true;
        self
    }

    pub fn list_fails(mut self, message: &str) -> Self {
        self.list_error = Some(message.to_string());
        self
    }

    pub fn untaggable(mut self, id: &str) -> Self {
        self.untaggable.insert(id.to_string());
        self
    }

    pub fn with(self, region: &str, candidate: Candidate) -> Self {
        self.resources
            .lock()
            .unwrap()
            .push((region.to_string(), candidate));
        self
    }

    pub fn failing(mut self, id: &str) -> Self {
        self.failing.insert(id.to_string());
        self
    }

    pub fn missing(mut self, id: &str) -> Self {
        self.missing.insert(id.to_string());
        self
    }

    pub fn stuck(mut self, id: &str) -> Self {
        self.stuck.insert(id.to_string());
        self
    }

    pub fn steps(mut self, steps: Vec<Arc<dyn TeardownStep>>) -> Self {
        self.steps = steps;
        self
    }

    pub fn confirm(mut self, policy: ConfirmPolicy) -> Self {
        self.confirmation = Some(policy);
        self
    }

    pub fn remaining(&self) -> Vec<String> {
        self.resources
            .lock()
            .unwrap()
            .iter()
            .map(|(_, c)| c.id.clone())
            .collect()
    }

    pub fn deletes(&self) -> Vec<String> {
        self.delete_calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ResourceType for FakeType {
    fn name(&self) -> &str {
        &self.name
    }

    fn max_batch_size(&self) -> usize {
        self.max_batch_size
    }

    fn is_global(&self) -> bool {
        self.global
    }

    fn first_seen_store(&self) -> Option<Arc<dyn FirstSeenStore>> {
        self.tracks_first_seen.then(|| {
            Arc::new(FakeTagStore {
                resources: self.resources.clone(),
                writes: self.tag_writes.clone(),
                refused: self.untaggable.clone(),
            }) as Arc<dyn FirstSeenStore>
        })
    }

    async fn list(&self, scope: &Scope, _filter: &FilterConfig) -> Result<Vec<Candidate>> {
        if let Some(message) = &self.list_error {
            return Err(NukeError::Api(message.clone()));
        }
        Ok(self
            .resources
            .lock()
            .unwrap()
            .iter()
            .filter(|(region, _)| *region == scope.region)
            .map(|(_, c)| c.clone())
            .collect())
    }

    fn teardown_steps(&self) -> Vec<Arc<dyn TeardownStep>> {
        self.steps.clone()
    }

    async fn delete(&self, _scope: &Scope, identifier: &str) -> Result<()> {
        self.delete_calls
            .lock()
            .unwrap()
            .push(identifier.to_string());

        if self.failing.contains(identifier) {
            return Err(NukeError::delete(identifier, "AccessDenied"));
        }
        if self.missing.contains(identifier) {
            return Err(NukeError::NotFound(identifier.to_string()));
        }
        if !self.stuck.contains(identifier) {
            self.resources
                .lock()
                .unwrap()
                .retain(|(_, c)| c.id != identifier);
        }
        Ok(())
    }

    fn confirmation(&self) -> Option<ConfirmPolicy> {
        self.confirmation.clone()
    }

    async fn probe(&self, _scope: &Scope, identifier: &str) -> Result<ProbeStatus> {
        let present = self
            .resources
            .lock()
            .unwrap()
            .iter()
            .any(|(_, c)| c.id == identifier);
        Ok(if present {
            ProbeStatus::Pending
        } else {
            ProbeStatus::Gone
        })
    }
}

struct FakeTagStore {
    resources: Shared<Vec<(String, Candidate)>>,
    writes: Shared<Vec<String>>,
    refused: HashSet<String>,
}

#[async_trait]
impl FirstSeenStore for FakeTagStore {
    async fn record(
        &self,
        _scope: &Scope,
        identifier: &str,
        observed_at: DateTime<Utc>,
    ) -> Result<DateTime<Utc>> {
        if self.refused.contains(identifier) {
            return Err(NukeError::Api(format!("CreateTags denied for {}", identifier)));
        }
        let mut resources = self.resources.lock().unwrap();
        let (_, candidate) = resources
            .iter_mut()
            .find(|(_, c)| c.id == identifier)
            .ok_or_else(|| NukeError::NotFound(identifier.to_string()))?;

        if let Some(existing) = candidate.first_seen() {
            return Ok(existing);
        }
        candidate.tags.insert(
            tags::TAG_FIRST_SEEN.to_string(),
            tags::format_timestamp(observed_at),
        );
        self.writes.lock().unwrap().push(identifier.to_string());
        Ok(observed_at)
    }
}

/// Teardown step that records its invocation and optionally fails
pub struct Step {
    pub name: &'static str,
    pub fail: bool,
    pub log: Shared<Vec<String>>,
}

#[async_trait]
impl TeardownStep for Step {
    fn name(&self) -> &str {
        self.name
    }

    async fn run(&self, _scope: &Scope, identifier: &str) -> Result<()> {
        self.log
            .lock()
            .unwrap()
            .push(format!("{}:{}", self.name, identifier));
        if self.fail {
            return Err(NukeError::Api(format!("{} refused", self.name)));
        }
        Ok(())
    }
}

#[allow(dead_code)]
pub fn old(id: &str) -> Candidate {
    Candidate::new(id).with_created_at(Utc::now() - chrono::Duration::days(30))
}
