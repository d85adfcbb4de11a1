//! Status report written after each lifecycle transition.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::descriptor::Descriptor;
use crate::lifecycle::LifecycleState;
use crate::synth::ContentSource;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DescriptorStatus {
    pub descriptor: Descriptor,
    pub endpoint: String,
    pub installed: bool,
    pub installed_at: Option<DateTime<Utc>>,
    /// None while no content is loaded
    pub source: Option<ContentSource>,
    pub bytes: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusReport {
    pub state: LifecycleState,
    pub profile_root: PathBuf,
    pub descriptors: Vec<DescriptorStatus>,
    pub generated_at: DateTime<Utc>,
}

impl StatusReport {
    /// One-line summary for logs
    pub fn summary(&self) -> String {
        let installed = self.descriptors.iter().filter(|d| d.installed).count();
        let from_profile = self
            .descriptors
            .iter()
            .filter(|d| d.source == Some(ContentSource::Profile))
            .count();
        format!(
            "{}: {}/{} installed, {} from profile",
            self.state,
            installed,
            self.descriptors.len(),
            from_profile
        )
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).context("Failed to serialize status report")
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let json = self.to_json()?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory {}", parent.display()))?;
        }

        // Atomic write
        let temp_path = path.with_extension("json.tmp");
        fs::write(&temp_path, json)
            .with_context(|| format!("Failed to write {}", temp_path.display()))?;
        fs::rename(&temp_path, path)
            .with_context(|| format!("Failed to rename to {}", path.display()))?;

        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self> {
        let json = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        serde_json::from_str(&json).with_context(|| format!("Failed to parse {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn report() -> StatusReport {
        StatusReport {
            state: LifecycleState::Active,
            profile_root: PathBuf::from("/etc/hwshim/profiles/active"),
            descriptors: vec![
                DescriptorStatus {
                    descriptor: Descriptor::CpuInfo,
                    endpoint: "/proc/cpuinfo".to_string(),
                    installed: true,
                    installed_at: Some(Utc::now()),
                    source: Some(ContentSource::Fallback),
                    bytes: Some(1200),
                },
                DescriptorStatus {
                    descriptor: Descriptor::SysVendor,
                    endpoint: "/sys/class/dmi/id/sys_vendor".to_string(),
                    installed: true,
                    installed_at: Some(Utc::now()),
                    source: Some(ContentSource::Profile),
                    bytes: Some(14),
                },
            ],
            generated_at: Utc::now(),
        }
    }

    #[test]
    fn test_summary() {
        assert_eq!(report().summary(), "active: 2/2 installed, 1 from profile");
    }

    #[test]
    fn test_json_field_names() {
        let json = report().to_json().unwrap();
        assert!(json.contains("\"state\": \"active\""));
        assert!(json.contains("\"descriptor\": \"dmi.sys_vendor\""));
        assert!(json.contains("\"source\": \"profile\""));
    }

    #[test]
    fn test_save_and_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("status.json");

        let original = report();
        original.save(&path).unwrap();
        let loaded = StatusReport::load(&path).unwrap();

        assert_eq!(loaded.state, original.state);
        assert_eq!(loaded.descriptors, original.descriptors);
        assert!(!path.with_extension("json.tmp").exists());
    }
}
