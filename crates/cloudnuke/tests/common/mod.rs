use assert_cmd::Command;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Isolated working directory with an inventory file
pub struct TestProject {
    pub root: TempDir,
}

#[allow(dead_code)]
impl TestProject {
    pub fn new() -> Self {
        let root = tempfile::tempdir().unwrap();
        Self { root }
    }

    pub fn path(&self) -> &Path {
        self.root.path()
    }

    pub fn inventory_path(&self) -> PathBuf {
        self.path().join(".cloudnuke").join("inventory.json")
    }

    pub fn write_inventory(&self, content: &str) {
        let path = self.inventory_path();
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    pub fn write_config(&self, content: &str) {
        fs::write(self.path().join("cloudnuke.yaml"), content).unwrap();
    }

    pub fn inventory(&self) -> serde_json::Value {
        serde_json::from_str(&fs::read_to_string(self.inventory_path()).unwrap()).unwrap()
    }

    pub fn resource_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.inventory()["resources"]
            .as_array()
            .unwrap()
            .iter()
            .map(|r| r["id"].as_str().unwrap().to_string())
            .collect();
        ids.sort();
        ids
    }

    /// `cloud-nuke` running inside the project with no user config in reach
    #[allow(deprecated)]
    pub fn cmd(&self) -> Command {
        let mut cmd = Command::cargo_bin("cloud-nuke").unwrap();
        cmd.current_dir(self.path())
            .env_remove("CLOUDNUKE_CONFIG_PATH")
            .env_remove("CLOUDNUKE_INVENTORY")
            .env_remove("RUST_LOG")
            .env("HOME", self.path())
            .env("XDG_CONFIG_HOME", self.path().join(".config"))
            .env("NO_COLOR", "1");
        cmd
    }
}

pub const SANDBOX: &str = r#"{
  "version": 1,
  "updated_at": "2026-01-01T00:00:00Z",
  "regions": ["us-east-1", "eu-west-1"],
  "resource_types": [
    { "name": "ec2-instance" },
    { "name": "iam-role", "global": true,
      "teardown": ["detach-policies", "delete-inline-policies"] }
  ],
  "resources": [
    { "id": "i-1", "resource_type": "ec2-instance", "region": "us-east-1",
      "name": "test-web", "created_at": "2026-01-01T00:00:00Z" },
    { "id": "i-2", "resource_type": "ec2-instance", "region": "eu-west-1",
      "name": "db-keep", "created_at": "2026-01-01T00:00:00Z" },
    { "id": "i-3", "resource_type": "ec2-instance", "region": "eu-west-1",
      "created_at": "2026-01-01T00:00:00Z",
      "tags": { "cloud-nuke-excluded": "true" } },
    { "id": "role/app", "resource_type": "iam-role",
      "created_at": "2026-01-01T00:00:00Z",
      "attachments": { "detach-policies": ["arn:policy/a"], "delete-inline-policies": ["inline"] } }
  ]
}"#;
