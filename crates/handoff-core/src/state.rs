use crate::error::Result;
use crate::paths;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

// ---------------------------------------------------------------------------
// WorkflowPhase
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowPhase {
    Planning,
    Implementation,
}

impl WorkflowPhase {
    pub fn as_str(self) -> &'static str {
        match self {
            WorkflowPhase::Planning => "planning",
            WorkflowPhase::Implementation => "implementation",
        }
    }
}

impl fmt::Display for WorkflowPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// PhaseState
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhaseState {
    #[serde(default = "default_version")]
    pub version: u32,
    pub project: String,
    pub phase: WorkflowPhase,
    pub status: String,
    pub started_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

fn default_version() -> u32 {
    1
}

impl PhaseState {
    pub fn new(project: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            version: 1,
            project: project.into(),
            phase: WorkflowPhase::Planning,
            status: "planning".to_string(),
            started_at: now,
            updated_at: now,
        }
    }

    /// Load `.handoff/state.yaml`, or start fresh if it is absent.
    pub fn load_or_new(root: &Path, project: &str) -> Result<Self> {
        let path = paths::state_path(root);
        if !path.exists() {
            tracing::debug!("no phase state found, starting fresh");
            return Ok(Self::new(project));
        }
        let data = std::fs::read_to_string(&path)?;
        let state: PhaseState = serde_yaml::from_str(&data)?;
        Ok(state)
    }

    pub fn save(&self, root: &Path) -> Result<()> {
        let path = paths::state_path(root);
        let data = serde_yaml::to_string(self)?;
        crate::io::atomic_write(&path, data.as_bytes())
    }

    /// Move to the implementation phase. The original start timestamp is
    /// preserved; only `updated_at` is stamped.
    pub fn advance_to_implementation(&mut self) {
        self.phase = WorkflowPhase::Implementation;
        self.status = "in_progress".to_string();
        self.updated_at = Utc::now();
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn state_roundtrip() {
        let dir = TempDir::new().unwrap();
        let state = PhaseState::new("my-project");
        state.save(dir.path()).unwrap();

        let loaded = PhaseState::load_or_new(dir.path(), "ignored").unwrap();
        assert_eq!(loaded.project, "my-project");
        assert_eq!(loaded.phase, WorkflowPhase::Planning);
    }

    #[test]
    fn load_or_new_defaults_when_absent() {
        let dir = TempDir::new().unwrap();
        let state = PhaseState::load_or_new(dir.path(), "fresh").unwrap();
        assert_eq!(state.project, "fresh");
        assert_eq!(state.phase, WorkflowPhase::Planning);
    }

    #[test]
    fn advance_preserves_start_timestamp() {
        let mut state = PhaseState::new("proj");
        let started = state.started_at;
        state.advance_to_implementation();
        assert_eq!(state.phase, WorkflowPhase::Implementation);
        assert_eq!(state.status, "in_progress");
        assert_eq!(state.started_at, started);
        assert!(state.updated_at >= started);
    }
}
