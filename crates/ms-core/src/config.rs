use crate::error::Result;
use crate::paths;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Project settings read from `.planning/config.json`.
///
/// Only the fields below are read; anything else in the file is ignored.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlanningConfig {
    /// Canonical subsystem vocabulary for `subsystem:` frontmatter values.
    #[serde(default)]
    pub subsystems: Vec<String>,
}

impl PlanningConfig {
    /// Strict load: a missing file is the default, a malformed one is an error.
    pub fn load(planning: &Path) -> Result<Self> {
        let path = paths::config_path(planning);
        if !path.exists() {
            return Ok(Self::default());
        }
        let data = std::fs::read_to_string(&path)?;
        let cfg: PlanningConfig = serde_json::from_str(&data)?;
        Ok(cfg)
    }

    /// Tolerant load used by best-effort commands: any failure yields the default.
    pub fn load_or_default(planning: &Path) -> Self {
        match Self::load(planning) {
            Ok(cfg) => cfg,
            Err(e) => {
                tracing::warn!(error = %e, "ignoring unreadable config.json");
                Self::default()
            }
        }
    }

    pub fn knows_subsystem(&self, subsystem: &str) -> bool {
        self.subsystems.iter().any(|s| s == subsystem)
    }
}
