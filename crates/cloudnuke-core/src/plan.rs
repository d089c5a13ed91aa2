//! Plan resolution
//!
//! Turns the user's region and resource-type selections into a validated
//! [`Plan`]. Resolution is pure: nothing is listed or deleted here, and an
//! invalid request is always rejected rather than silently narrowed.

use crate::error::{NukeError, Result};
use crate::filter::{FilterConfig, ResourceRules};
use crate::resource::{GLOBAL_REGION, ResourceType, Scope};
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

/// Resource types known to the engine, in processing order
///
/// Types that depend on others being gone (e.g., a VPC after the instances
/// attached to it) must be registered after them.
#[derive(Default, Clone)]
pub struct Registry {
    types: Vec<Arc<dyn ResourceType>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<R: ResourceType + 'static>(&mut self, resource_type: R) -> &mut Self {
        self.register_arc(Arc::new(resource_type))
    }

    pub fn register_arc(&mut self, resource_type: Arc<dyn ResourceType>) -> &mut Self {
        self.types.retain(|t| t.name() != resource_type.name());
        self.types.push(resource_type);
        self
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn ResourceType>> {
        self.types.iter().find(|t| t.name() == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn names(&self) -> Vec<&str> {
        self.types.iter().map(|t| t.name()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn ResourceType>> {
        self.types.iter()
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Names from `requested` that are not registered, in request order
    pub fn unknown<'a>(&self, requested: &'a [String]) -> Vec<&'a str> {
        let mut seen = BTreeSet::new();
        requested
            .iter()
            .map(String::as_str)
            .filter(|name| !self.contains(name) && seen.insert(*name))
            .collect()
    }
}

/// User selection before validation
#[derive(Debug, Clone, Default)]
pub struct PlanRequest {
    pub regions: Vec<String>,
    pub excluded_regions: Vec<String>,
    pub resource_types: Vec<String>,
    pub excluded_resource_types: Vec<String>,
}

/// Validated execution plan
#[derive(Clone)]
pub struct Plan {
    /// Target regions, [`GLOBAL_REGION`] included when selected
    pub regions: Vec<String>,

    /// Target resource types in processing order
    pub resource_types: Vec<Arc<dyn ResourceType>>,

    /// Age window and default rules shared by every type
    pub filter: FilterConfig,

    rules: HashMap<String, ResourceRules>,
}

impl Plan {
    /// Resolve `request` against the registry and the provider's enabled regions
    pub fn resolve(
        registry: &Registry,
        enabled_regions: &[String],
        request: &PlanRequest,
        filter: FilterConfig,
    ) -> Result<Self> {
        let resource_types = resolve_resource_types(registry, request)?;
        let regions = resolve_regions(enabled_regions, request)?;

        tracing::debug!(
            regions = regions.len(),
            resource_types = resource_types.len(),
            "Resolved plan"
        );

        Ok(Self {
            regions,
            resource_types,
            filter,
            rules: HashMap::new(),
        })
    }

    /// Attach per-type rules; unknown type names are rejected together
    pub fn with_rules(
        mut self,
        registry: &Registry,
        rules: HashMap<String, ResourceRules>,
    ) -> Result<Self> {
        let names: Vec<String> = rules.keys().cloned().collect();
        let mut unknown: Vec<String> = registry
            .unknown(&names)
            .into_iter()
            .map(str::to_string)
            .collect();
        if !unknown.is_empty() {
            unknown.sort();
            return Err(NukeError::InvalidResourceType { names: unknown });
        }
        self.rules = rules;
        Ok(self)
    }

    /// Effective filter for one resource type
    pub fn filter_for(&self, resource_type: &str) -> FilterConfig {
        match self.rules.get(resource_type) {
            Some(rules) => self.filter.clone().with_rules(rules.clone()),
            None => self.filter.clone(),
        }
    }

    /// Resource types to process in `scope`, in order
    pub fn types_for(&self, scope: &Scope) -> Vec<Arc<dyn ResourceType>> {
        self.resource_types
            .iter()
            .filter(|t| t.is_global() == scope.is_global())
            .cloned()
            .collect()
    }

    pub fn scopes(&self) -> Vec<Scope> {
        self.regions.iter().map(Scope::new).collect()
    }

    pub fn summary(&self) -> PlanSummary {
        let targets = self.scopes().iter().map(|s| self.types_for(s).len()).sum();
        PlanSummary {
            regions: self.regions.len(),
            resource_types: self.resource_types.len(),
            targets,
        }
    }
}

impl std::fmt::Debug for Plan {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Plan")
            .field("regions", &self.regions)
            .field(
                "resource_types",
                &self.resource_types.iter().map(|t| t.name()).collect::<Vec<_>>(),
            )
            .field("filter", &self.filter)
            .finish()
    }
}

/// Summary of a plan
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlanSummary {
    pub regions: usize,
    pub resource_types: usize,
    /// (region, resource type) pairs that will be listed
    pub targets: usize,
}

impl std::fmt::Display for PlanSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} regions, {} resource types, {} targets",
            self.regions, self.resource_types, self.targets
        )
    }
}

fn resolve_resource_types(
    registry: &Registry,
    request: &PlanRequest,
) -> Result<Vec<Arc<dyn ResourceType>>> {
    if !request.resource_types.is_empty() && !request.excluded_resource_types.is_empty() {
        return Err(NukeError::ConflictingSelection);
    }

    let selection = if request.resource_types.is_empty() {
        &request.excluded_resource_types
    } else {
        &request.resource_types
    };
    let unknown = registry.unknown(selection);
    if !unknown.is_empty() {
        return Err(NukeError::InvalidResourceType {
            names: unknown.into_iter().map(str::to_string).collect(),
        });
    }

    let types = registry
        .iter()
        .filter(|t| {
            let name = t.name().to_string();
            if !request.resource_types.is_empty() {
                request.resource_types.contains(&name)
            } else {
                !request.excluded_resource_types.contains(&name)
            }
        })
        .cloned()
        .collect();
    Ok(types)
}

fn resolve_regions(enabled_regions: &[String], request: &PlanRequest) -> Result<Vec<String>> {
    let mut all: Vec<String> = enabled_regions.to_vec();
    if !all.iter().any(|r| r == GLOBAL_REGION) {
        all.push(GLOBAL_REGION.to_string());
    }

    let invalid: Vec<&str> = request
        .regions
        .iter()
        .chain(request.excluded_regions.iter())
        .filter(|r| !all.contains(r))
        .map(String::as_str)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    if !invalid.is_empty() {
        return Err(NukeError::InvalidRegionSelection(format!(
            "unknown or disabled region(s): {}",
            invalid.join(", ")
        )));
    }

    let regions: Vec<String> = all
        .into_iter()
        .filter(|r| !request.excluded_regions.contains(r))
        .filter(|r| request.regions.is_empty() || request.regions.contains(r))
        .collect();

    if regions.is_empty() {
        return Err(NukeError::InvalidRegionSelection(
            "no regions left after applying exclusions".to_string(),
        ));
    }
    Ok(regions)
}
