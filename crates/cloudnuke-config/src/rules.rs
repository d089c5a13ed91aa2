//! Rules file schema
//!
//! ```yaml
//! defaults:
//!   exclude:
//!     tags: { team: "^platform$" }
//! resources:
//!   ec2-instance:
//!     include:
//!       names_regex: ["^test-"]
//!     exclude:
//!       names_regex: ["-keep$"]
//!       tags: { env: "^prod" }
//! ```

use crate::error::{ConfigError, Result};
use cloudnuke_core::{NameRules, ResourceRules, TagRule};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NukeConfig {
    #[serde(default)]
    pub defaults: RuleSet,

    /// Keyed by resource type name
    #[serde(default)]
    pub resources: BTreeMap<String, RuleSet>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RuleSet {
    #[serde(default)]
    pub include: Matchers,

    #[serde(default)]
    pub exclude: Matchers,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Matchers {
    #[serde(default)]
    pub names_regex: Vec<String>,

    /// Tag key to value regex. Only meaningful under `exclude`.
    #[serde(default)]
    pub tags: BTreeMap<String, String>,
}

/// Compiled rules ready to be attached to a plan
#[derive(Debug, Clone, Default)]
pub struct CompiledRules {
    pub defaults: ResourceRules,
    pub per_type: HashMap<String, ResourceRules>,
}

impl NukeConfig {
    pub fn from_yaml(content: &str, path: &Path) -> Result<Self> {
        serde_yaml::from_str(content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }

    /// Compile every regex up front
    ///
    /// A type's own tag patterns override the default pattern for the same
    /// key; default keys it does not mention still apply.
    pub fn compile(&self) -> Result<CompiledRules> {
        let defaults = compile_set("defaults", &self.defaults, &BTreeMap::new())?;

        let mut per_type = HashMap::with_capacity(self.resources.len());
        for (name, set) in &self.resources {
            let rules = compile_set(name, set, &self.defaults.exclude.tags)?;
            per_type.insert(name.clone(), rules);
        }

        Ok(CompiledRules { defaults, per_type })
    }
}

fn compile_set(
    scope: &str,
    set: &RuleSet,
    inherited_tags: &BTreeMap<String, String>,
) -> Result<ResourceRules> {
    let invalid = |source: cloudnuke_core::NukeError| ConfigError::InvalidRule {
        scope: scope.to_string(),
        source,
    };

    if !set.include.tags.is_empty() {
        return Err(invalid(cloudnuke_core::NukeError::InvalidRule(
            "tag rules are only supported under exclude".to_string(),
        )));
    }

    let names = NameRules::compile(&set.include.names_regex, &set.exclude.names_regex)
        .map_err(invalid)?;

    let mut tags = inherited_tags.clone();
    tags.extend(set.exclude.tags.clone());
    let exclude_tags = tags
        .iter()
        .map(|(key, pattern)| TagRule::new(key.clone(), pattern))
        .collect::<cloudnuke_core::Result<Vec<_>>>()
        .map_err(invalid)?;

    Ok(ResourceRules {
        names,
        exclude_tags,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
defaults:
  exclude:
    tags: { team: "^platform$" }
resources:
  ec2-instance:
    include:
      names_regex: ["^test-"]
    exclude:
      names_regex: ["-keep$"]
      tags: { env: "^prod" }
  iam-role:
    exclude:
      tags: { team: "^security$" }
"#;

    fn parse(content: &str) -> Result<NukeConfig> {
        NukeConfig::from_yaml(content, Path::new("cloudnuke.yaml"))
    }

    #[test]
    fn test_parse_sample() {
        let config = parse(SAMPLE).unwrap();
        assert_eq!(config.resources.len(), 2);

        let ec2 = &config.resources["ec2-instance"];
        assert_eq!(ec2.include.names_regex, vec!["^test-"]);
        assert_eq!(ec2.exclude.names_regex, vec!["-keep$"]);
        assert_eq!(ec2.exclude.tags["env"], "^prod");
        assert_eq!(config.defaults.exclude.tags["team"], "^platform$");
    }

    #[test]
    fn test_empty_document() {
        let config = parse("{}").unwrap();
        assert!(config.is_empty());
        let compiled = config.compile().unwrap();
        assert!(compiled.defaults.is_empty());
        assert!(compiled.per_type.is_empty());
    }

    #[test]
    fn test_unknown_field_rejected() {
        let err = parse("resources:\n  ec2-instance:\n    exclude:\n      name: [x]\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn test_compile_merges_default_tags() {
        let compiled = parse(SAMPLE).unwrap().compile().unwrap();

        let ec2 = &compiled.per_type["ec2-instance"];
        let mut keys: Vec<_> = ec2.exclude_tags.iter().map(|r| r.key.as_str()).collect();
        keys.sort();
        assert_eq!(keys, vec!["env", "team"]);
        assert_eq!(ec2.names.include.len(), 1);
        assert_eq!(ec2.names.exclude.len(), 1);

        assert_eq!(compiled.defaults.exclude_tags.len(), 1);
    }

    #[test]
    fn test_type_tag_overrides_default() {
        let yaml = r#"
defaults:
  exclude:
    tags: { team: "^platform$" }
resources:
  iam-role:
    exclude:
      tags: { team: "^security$" }
"#;
        let compiled = parse(yaml).unwrap().compile().unwrap();
        let role = &compiled.per_type["iam-role"];
        assert_eq!(role.exclude_tags.len(), 1);
        assert!(role.exclude_tags[0].value.is_match("security"));
        assert!(!role.exclude_tags[0].value.is_match("platform"));
    }

    #[test]
    fn test_invalid_regex_names_scope() {
        let yaml = "resources:\n  s3-bucket:\n    exclude:\n      names_regex: [\"(unclosed\"]\n";
        let err = parse(yaml).unwrap().compile().unwrap_err();
        match err {
            ConfigError::InvalidRule { scope, .. } => assert_eq!(scope, "s3-bucket"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_include_tags_rejected() {
        let yaml = "resources:\n  s3-bucket:\n    include:\n      tags: { env: dev }\n";
        let err = parse(yaml).unwrap().compile().unwrap_err();
        assert!(matches!(err, ConfigError::InvalidRule { .. }));
    }
}
