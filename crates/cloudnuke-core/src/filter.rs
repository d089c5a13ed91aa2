//! Candidate filtering
//!
//! [`FilterConfig::evaluate`] is a pure function of the candidate and the
//! config. Rules are applied in this order, the first failing one decides:
//!
//! 1. do-not-nuke tag (`cloud-nuke-excluded = true`)
//! 2. protect-until tag (`cloud-nuke-after`)
//! 3. age window (`include_after <= t <= exclude_after`)
//! 4. name rules (include list, otherwise exclude list)
//! 5. tag exclusion rules

use crate::error::{NukeError, Result};
use crate::resource::Candidate;
use crate::tags;
use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Filter applied to every candidate of one resource type
#[derive(Debug, Clone)]
pub struct FilterConfig {
    /// Candidates with a reference time after this instant are kept
    pub exclude_after: DateTime<Utc>,

    /// Optional lower bound of the age window
    pub include_after: Option<DateTime<Utc>>,

    /// Time the run started, used for protect-until tags
    pub now: DateTime<Utc>,

    /// Name and tag rules
    pub rules: ResourceRules,
}

impl FilterConfig {
    /// Everything created at or before `exclude_after`
    pub fn older_than(exclude_after: DateTime<Utc>) -> Self {
        Self {
            exclude_after,
            include_after: None,
            now: Utc::now(),
            rules: ResourceRules::default(),
        }
    }

    pub fn with_include_after(mut self, include_after: DateTime<Utc>) -> Self {
        self.include_after = Some(include_after);
        self
    }

    pub fn with_now(mut self, now: DateTime<Utc>) -> Self {
        self.now = now;
        self
    }

    pub fn with_rules(mut self, rules: ResourceRules) -> Self {
        self.rules = rules;
        self
    }

    pub fn includes(&self, candidate: &Candidate) -> bool {
        self.evaluate(candidate).is_included()
    }

    pub fn evaluate(&self, candidate: &Candidate) -> Verdict {
        if candidate.tag(tags::TAG_EXCLUDE) == Some(tags::TAG_EXCLUDE_VALUE) {
            return Verdict::Excluded(ExclusionReason::ExcludedTag);
        }

        if let Some(value) = candidate.tag(tags::TAG_PROTECT_UNTIL) {
            // An unreadable protection tag still protects
            match tags::parse_timestamp(value) {
                Some(until) if until <= self.now => {}
                _ => return Verdict::Excluded(ExclusionReason::ProtectedUntil),
            }
        }

        if let Some(reason) = self.check_age(candidate.created_at) {
            return Verdict::Excluded(reason);
        }

        if let Some(reason) = self.rules.names.check(candidate.display_name()) {
            return Verdict::Excluded(reason);
        }

        if self.rules.excludes_tags(candidate) {
            return Verdict::Excluded(ExclusionReason::TagExcluded);
        }

        Verdict::Included
    }

    fn check_age(&self, reference: Option<DateTime<Utc>>) -> Option<ExclusionReason> {
        let Some(reference) = reference else {
            return Some(ExclusionReason::UnknownAge);
        };
        if reference > self.exclude_after {
            return Some(ExclusionReason::TooNew);
        }
        match self.include_after {
            Some(lower) if reference < lower => Some(ExclusionReason::TooOld),
            _ => None,
        }
    }
}

/// Outcome of evaluating one candidate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Included,
    Excluded(ExclusionReason),
}

impl Verdict {
    pub fn is_included(&self) -> bool {
        matches!(self, Verdict::Included)
    }

    pub fn reason(&self) -> Option<ExclusionReason> {
        match self {
            Verdict::Included => None,
            Verdict::Excluded(reason) => Some(*reason),
        }
    }
}

/// Why a candidate was left out of the deletion set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ExclusionReason {
    ExcludedTag,
    ProtectedUntil,
    TooNew,
    TooOld,
    UnknownAge,
    NameNotIncluded,
    NameExcluded,
    TagExcluded,
    FirstSeenPending,
}

impl std::fmt::Display for ExclusionReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ExclusionReason::ExcludedTag => "excluded-tag",
            ExclusionReason::ProtectedUntil => "protected-until",
            ExclusionReason::TooNew => "too-new",
            ExclusionReason::TooOld => "too-old",
            ExclusionReason::UnknownAge => "unknown-age",
            ExclusionReason::NameNotIncluded => "name-not-included",
            ExclusionReason::NameExcluded => "name-excluded",
            ExclusionReason::TagExcluded => "tag-excluded",
            ExclusionReason::FirstSeenPending => "first-seen-pending",
        };
        write!(f, "{}", s)
    }
}

/// Name and tag rules for one resource type
#[derive(Debug, Clone, Default)]
pub struct ResourceRules {
    pub names: NameRules,
    pub exclude_tags: Vec<TagRule>,
}

impl ResourceRules {
    pub fn is_empty(&self) -> bool {
        self.names.is_empty() && self.exclude_tags.is_empty()
    }

    fn excludes_tags(&self, candidate: &Candidate) -> bool {
        self.exclude_tags.iter().any(|rule| rule.matches(candidate))
    }
}

/// Include/exclude regexes matched against resource names
#[derive(Debug, Clone, Default)]
pub struct NameRules {
    pub include: Vec<Regex>,
    pub exclude: Vec<Regex>,
}

impl NameRules {
    pub fn compile<S: AsRef<str>>(include: &[S], exclude: &[S]) -> Result<Self> {
        Ok(Self {
            include: compile_all(include)?,
            exclude: compile_all(exclude)?,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.include.is_empty() && self.exclude.is_empty()
    }

    /// Include list wins when present; the exclude list is only consulted
    /// when no include patterns are configured
    fn check(&self, name: &str) -> Option<ExclusionReason> {
        if !self.include.is_empty() {
            if self.include.iter().any(|re| re.is_match(name)) {
                return None;
            }
            return Some(ExclusionReason::NameNotIncluded);
        }
        if self.exclude.iter().any(|re| re.is_match(name)) {
            return Some(ExclusionReason::NameExcluded);
        }
        None
    }
}

/// Excludes candidates whose tag `key` matches `value`
#[derive(Debug, Clone)]
pub struct TagRule {
    pub key: String,
    pub value: Regex,
}

impl TagRule {
    pub fn new(key: impl Into<String>, value: &str) -> Result<Self> {
        Ok(Self {
            key: key.into(),
            value: compile(value)?,
        })
    }

    fn matches(&self, candidate: &Candidate) -> bool {
        candidate
            .tag(&self.key)
            .is_some_and(|value| self.value.is_match(value))
    }
}

fn compile(pattern: &str) -> Result<Regex> {
    Regex::new(pattern).map_err(|e| NukeError::InvalidRule(format!("{}: {}", pattern, e)))
}

fn compile_all<S: AsRef<str>>(patterns: &[S]) -> Result<Vec<Regex>> {
    patterns.iter().map(|p| compile(p.as_ref())).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn cutoff() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
    }

    fn filter() -> FilterConfig {
        FilterConfig::older_than(cutoff()).with_now(cutoff() + Duration::days(1))
    }

    fn aged(id: &str, at: DateTime<Utc>) -> Candidate {
        Candidate::new(id).with_created_at(at)
    }

    #[test]
    fn test_age_boundary_is_inclusive() {
        let filter = filter();
        assert!(filter.includes(&aged("a", cutoff())));
        assert_eq!(
            filter.evaluate(&aged("b", cutoff() + Duration::seconds(1))),
            Verdict::Excluded(ExclusionReason::TooNew)
        );
    }

    #[test]
    fn test_include_after_window() {
        let lower = cutoff() - Duration::days(7);
        let filter = filter().with_include_after(lower);

        assert!(filter.includes(&aged("at-lower", lower)));
        assert!(filter.includes(&aged("inside", lower + Duration::days(1))));
        assert_eq!(
            filter.evaluate(&aged("before", lower - Duration::seconds(1))),
            Verdict::Excluded(ExclusionReason::TooOld)
        );
    }

    #[test]
    fn test_missing_reference_time_is_excluded() {
        assert_eq!(
            filter().evaluate(&Candidate::new("no-age")),
            Verdict::Excluded(ExclusionReason::UnknownAge)
        );
    }

    #[test]
    fn test_exclude_tag_overrides_everything() {
        let rules = ResourceRules {
            names: NameRules::compile(&["^keep"], &[]).unwrap(),
            exclude_tags: Vec::new(),
        };
        let filter = filter().with_rules(rules);
        let candidate = aged("x", cutoff())
            .with_name("keep-me")
            .with_tag(tags::TAG_EXCLUDE, "true");
        assert_eq!(
            filter.evaluate(&candidate),
            Verdict::Excluded(ExclusionReason::ExcludedTag)
        );

        let not_true = aged("y", cutoff()).with_tag(tags::TAG_EXCLUDE, "false");
        assert!(self::filter().includes(&not_true));
    }

    #[test]
    fn test_protect_until() {
        let filter = filter();
        let protected = aged("p", cutoff()).with_tag(
            tags::TAG_PROTECT_UNTIL,
            tags::format_timestamp(filter.now + Duration::hours(1)),
        );
        assert_eq!(
            filter.evaluate(&protected),
            Verdict::Excluded(ExclusionReason::ProtectedUntil)
        );

        let expired = aged("e", cutoff()).with_tag(
            tags::TAG_PROTECT_UNTIL,
            tags::format_timestamp(filter.now - Duration::hours(1)),
        );
        assert!(filter.includes(&expired));

        let unreadable = aged("u", cutoff()).with_tag(tags::TAG_PROTECT_UNTIL, "later");
        assert!(!filter.includes(&unreadable));
    }

    #[test]
    fn test_include_names_take_precedence_over_excludes() {
        let names = NameRules::compile(&["^test-"], &["^test-keep"]).unwrap();
        let filter = filter().with_rules(ResourceRules {
            names,
            exclude_tags: Vec::new(),
        });

        assert!(filter.includes(&aged("1", cutoff()).with_name("test-keep-1")));
        assert_eq!(
            filter.evaluate(&aged("2", cutoff()).with_name("prod-db")),
            Verdict::Excluded(ExclusionReason::NameNotIncluded)
        );
    }

    #[test]
    fn test_exclude_names() {
        let names = NameRules::compile(&[] as &[&str], &["-keep$"]).unwrap();
        let filter = filter().with_rules(ResourceRules {
            names,
            exclude_tags: Vec::new(),
        });

        assert!(filter.includes(&aged("1", cutoff()).with_name("scratch")));
        assert_eq!(
            filter.evaluate(&aged("2", cutoff()).with_name("db-keep")),
            Verdict::Excluded(ExclusionReason::NameExcluded)
        );
        // Unnamed candidates are matched by identifier
        assert_eq!(
            filter.evaluate(&aged("vol-keep", cutoff())),
            Verdict::Excluded(ExclusionReason::NameExcluded)
        );
    }

    #[test]
    fn test_tag_rules() {
        let filter = filter().with_rules(ResourceRules {
            names: NameRules::default(),
            exclude_tags: vec![TagRule::new("env", "^prod").unwrap()],
        });

        assert_eq!(
            filter.evaluate(&aged("1", cutoff()).with_tag("env", "production")),
            Verdict::Excluded(ExclusionReason::TagExcluded)
        );
        assert!(filter.includes(&aged("2", cutoff()).with_tag("env", "dev")));
        assert!(filter.includes(&aged("3", cutoff())));
    }

    #[test]
    fn test_invalid_regex_is_reported() {
        let err = NameRules::compile(&["(unclosed"], &[]).unwrap_err();
        assert!(matches!(err, NukeError::InvalidRule(_)));
    }
}
