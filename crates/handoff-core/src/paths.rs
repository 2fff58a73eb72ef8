use std::path::{Path, PathBuf};

// ---------------------------------------------------------------------------
// Directory constants
// ---------------------------------------------------------------------------

pub const HANDOFF_DIR: &str = ".handoff";
pub const STATE_FILE: &str = ".handoff/state.yaml";
pub const SNAPSHOT_DIR: &str = ".handoff/specs";
pub const SPEC_INDEX_FILE: &str = ".handoff/spec-index.md";
pub const CHANGELOG_FILE: &str = ".handoff/spec-changelog.md";

pub const CHECKLIST_FILE: &str = "docs/implementation-checklist.md";
pub const BRIEFING_FILE: &str = "docs/project-briefing.md";
pub const WORKING_INSTRUCTIONS_FILE: &str = "docs/working-instructions.md";
pub const AGENTS_MD: &str = "AGENTS.md";

/// Candidate locations for the planning-artifacts directory, tried in order.
pub const ARTIFACT_DIR_CANDIDATES: &[&str] = &["docs/planning", "planning", "docs"];

/// Root of the planning-output tree that gets snapshotted wholesale when present.
pub const PLANNING_TREE_DIR: &str = "docs";

/// Placeholder token substituted with the project name in working instructions.
pub const PROJECT_NAME_PLACEHOLDER: &str = "[PROJECT_NAME]";

// ---------------------------------------------------------------------------
// Path helpers
// ---------------------------------------------------------------------------

pub fn state_path(root: &Path) -> PathBuf {
    root.join(STATE_FILE)
}

pub fn snapshot_dir(root: &Path) -> PathBuf {
    root.join(SNAPSHOT_DIR)
}

pub fn spec_index_path(root: &Path) -> PathBuf {
    root.join(SPEC_INDEX_FILE)
}

pub fn changelog_path(root: &Path) -> PathBuf {
    root.join(CHANGELOG_FILE)
}

pub fn checklist_path(root: &Path) -> PathBuf {
    root.join(CHECKLIST_FILE)
}

pub fn briefing_path(root: &Path) -> PathBuf {
    root.join(BRIEFING_FILE)
}

pub fn working_instructions_path(root: &Path) -> PathBuf {
    root.join(WORKING_INSTRUCTIONS_FILE)
}

pub fn agents_md_path(root: &Path) -> PathBuf {
    root.join(AGENTS_MD)
}

/// First existing artifact-directory candidate under `root`, if any.
pub fn find_artifacts_dir(root: &Path) -> Option<PathBuf> {
    ARTIFACT_DIR_CANDIDATES
        .iter()
        .map(|c| root.join(c))
        .find(|p| p.is_dir())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn path_helpers() {
        let root = Path::new("/tmp/proj");
        assert_eq!(
            state_path(root),
            PathBuf::from("/tmp/proj/.handoff/state.yaml")
        );
        assert_eq!(
            checklist_path(root),
            PathBuf::from("/tmp/proj/docs/implementation-checklist.md")
        );
    }

    #[test]
    fn artifacts_dir_first_candidate_wins() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("docs/planning")).unwrap();
        std::fs::create_dir_all(dir.path().join("planning")).unwrap();
        assert_eq!(
            find_artifacts_dir(dir.path()),
            Some(dir.path().join("docs/planning"))
        );
    }

    #[test]
    fn artifacts_dir_none_when_absent() {
        let dir = TempDir::new().unwrap();
        assert_eq!(find_artifacts_dir(dir.path()), None);
    }
}
