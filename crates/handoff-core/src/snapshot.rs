//! Snapshot management: tree diffing, changelog rendering, and the
//! stage-then-atomic-swap directory replacement.
//!
//! The visible snapshot directory must always be either the old complete
//! tree or the new complete tree. The swap stages into a sibling directory
//! first, verifies it, then removes the old target and renames the staging
//! directory into place. The staging name is disposable state and is
//! cleaned up defensively at the start of every run.

use crate::error::{HandoffError, Result};
use crate::io;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::debug;

const STAGING_SUFFIX: &str = ".staging";

// ---------------------------------------------------------------------------
// SnapshotDiff
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default)]
pub struct SnapshotDiff {
    pub added: Vec<String>,
    pub modified: Vec<String>,
    pub removed: Vec<String>,
}

impl SnapshotDiff {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.modified.is_empty() && self.removed.is_empty()
    }
}

fn collect_files(base: &Path, dir: &Path, out: &mut BTreeMap<String, PathBuf>) -> Result<()> {
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if path.is_dir() {
            collect_files(base, &path, out)?;
        } else {
            let relative = path
                .strip_prefix(base)
                .unwrap_or(&path)
                .components()
                .map(|c| c.as_os_str().to_string_lossy().into_owned())
                .collect::<Vec<_>>()
                .join("/");
            out.insert(relative, path);
        }
    }
    Ok(())
}

/// Compare the prior snapshot against the fresh tree by file content.
pub fn diff_trees(prior: &Path, fresh: &Path) -> Result<SnapshotDiff> {
    let mut prior_files = BTreeMap::new();
    let mut fresh_files = BTreeMap::new();
    collect_files(prior, prior, &mut prior_files)?;
    collect_files(fresh, fresh, &mut fresh_files)?;

    let mut diff = SnapshotDiff::default();
    for (relative, fresh_path) in &fresh_files {
        match prior_files.get(relative) {
            None => diff.added.push(relative.clone()),
            Some(prior_path) => {
                let before = std::fs::read(prior_path)?;
                let after = std::fs::read(fresh_path)?;
                if before != after {
                    diff.modified.push(relative.clone());
                }
            }
        }
    }
    for relative in prior_files.keys() {
        if !fresh_files.contains_key(relative) {
            diff.removed.push(relative.clone());
        }
    }
    Ok(diff)
}

/// Render the changelog document: Added/Modified/Removed sections.
pub fn render_changelog(diff: &SnapshotDiff) -> String {
    let mut out = String::from("# Spec Changelog\n");
    let sections: [(&str, &[String]); 3] = [
        ("Added", &diff.added),
        ("Modified", &diff.modified),
        ("Removed", &diff.removed),
    ];
    for (heading, files) in sections {
        if files.is_empty() {
            continue;
        }
        out.push_str(&format!("\n## {heading}\n\n"));
        for file in files {
            out.push_str(&format!("- {file}\n"));
        }
    }
    out
}

// ---------------------------------------------------------------------------
// Stage-then-swap
// ---------------------------------------------------------------------------

fn staging_path(target: &Path) -> PathBuf {
    let name = target
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    target.with_file_name(format!("{name}{STAGING_SUFFIX}"))
}

/// Remove any staging directory left behind by a crashed previous run.
pub fn cleanup_stale_staging(target: &Path) -> Result<()> {
    let staging = staging_path(target);
    if staging.exists() {
        debug!(path = %staging.display(), "removing stale staging directory");
        std::fs::remove_dir_all(&staging)?;
    }
    Ok(())
}

fn copy_tree(source: &Path, dest: &Path) -> Result<()> {
    io::ensure_dir(dest)?;
    for entry in std::fs::read_dir(source)? {
        let entry = entry?;
        let from = entry.path();
        let to = dest.join(entry.file_name());
        if from.is_dir() {
            copy_tree(&from, &to)?;
        } else {
            std::fs::copy(&from, &to)?;
        }
    }
    Ok(())
}

/// Copy only the top-level files of `source` into `dest` (no subdirectories).
fn copy_shallow(source: &Path, dest: &Path) -> Result<()> {
    io::ensure_dir(dest)?;
    for entry in std::fs::read_dir(source)? {
        let entry = entry?;
        let from = entry.path();
        if from.is_file() {
            std::fs::copy(&from, dest.join(entry.file_name()))?;
        }
    }
    Ok(())
}

/// Replace `target` with a copy of `source` via the staging discipline.
///
/// When `shallow` is true only the top-level files of `source` are copied
/// (the fallback when the full planning tree is absent).
pub fn stage_and_swap(source: &Path, target: &Path, shallow: bool) -> Result<()> {
    let staging = staging_path(target);
    if staging.exists() {
        std::fs::remove_dir_all(&staging)?;
    }
    if let Some(parent) = target.parent() {
        io::ensure_dir(parent)?;
    }

    if shallow {
        copy_shallow(source, &staging)?;
    } else {
        copy_tree(source, &staging)?;
    }

    // Verify the staged copy is readable before touching the old snapshot.
    std::fs::read_dir(&staging).map_err(|e| {
        HandoffError::SnapshotSwap(format!("staged copy unreadable at {}: {e}", staging.display()))
    })?;

    if target.exists() {
        std::fs::remove_dir_all(target)?;
    }
    std::fs::rename(&staging, target).map_err(|e| {
        HandoffError::SnapshotSwap(format!(
            "failed to rename {} into place: {e}",
            staging.display()
        ))
    })?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
