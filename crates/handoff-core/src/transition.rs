//! The transition orchestrator: turns the planning artifacts into the
//! implementation checklist, briefing, spec snapshot/index, and phase-state
//! commit, in one idempotent pass.
//!
//! Error taxonomy: the three fatal conditions abort immediately; everything
//! else is caught at its call site and converted into a warning string.
//! Optional inputs with sensible fallbacks are only logged at debug level.
//! The checklist and snapshot are always written before the phase-state
//! commit so a crash between them is recoverable by rerunning.

use crate::checklist;
use crate::error::{HandoffError, Result};
use crate::io;
use crate::paths;
use crate::section::{ContextSources, ProjectContext};
use crate::snapshot;
use crate::spec_index::{self, SpecType};
use crate::state::PhaseState;
use crate::story;
use chrono::Utc;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::debug;

// ---------------------------------------------------------------------------
// TransitionReport
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct TransitionReport {
    pub story_count: usize,
    pub warnings: Vec<String>,
    pub progress_preserved: bool,
}

/// Documents this tool writes into the planning-output tree, by name
/// relative to the tree root.
const GENERATED_DOC_FILES: &[&str] = &[
    "implementation-checklist.md",
    "project-briefing.md",
    "working-instructions.md",
];

fn is_generated_doc(relative: &str) -> bool {
    GENERATED_DOC_FILES.contains(&relative)
}

// ---------------------------------------------------------------------------
// run_transition
// ---------------------------------------------------------------------------

pub fn run_transition(root: &Path) -> Result<TransitionReport> {
    let snapshot_dir = paths::snapshot_dir(root);
    snapshot::cleanup_stale_staging(&snapshot_dir)?;

    // 1. Locate the planning artifacts.
    let artifacts_dir = paths::find_artifacts_dir(root).ok_or_else(|| {
        HandoffError::ArtifactsDirNotFound(paths::ARTIFACT_DIR_CANDIDATES.join(", "))
    })?;

    // 2. Locate the stories/epics document.
    let stories_file = find_stories_file(&artifacts_dir)?.ok_or_else(|| {
        HandoffError::StoriesFileNotFound(artifacts_dir.display().to_string())
    })?;

    // 3. Extract stories.
    let text = std::fs::read_to_string(&stories_file)?;
    let extraction = story::extract_stories(&text);
    if extraction.stories.is_empty() {
        return Err(HandoffError::NoStories(stories_file.display().to_string()));
    }
    let mut warnings = extraction.warnings;

    // 4. Merge against any previous checklist and write the new one.
    let checklist_path = paths::checklist_path(root);
    let prior = match std::fs::read_to_string(&checklist_path) {
        Ok(content) => Some(content),
        Err(_) => {
            debug!("no prior checklist, generating fresh");
            None
        }
    };
    let outcome = checklist::merge(&extraction.stories, prior.as_deref());
    warnings.extend(outcome.warnings);
    io::atomic_write(&checklist_path, outcome.rendered.as_bytes())?;

    // 5. Changelog: diff the prior snapshot against the fresh tree. Files
    //    this tool writes into the tree itself churn on every run and are
    //    excluded so the changelog only reflects planning-source edits.
    let planning_tree = root.join(paths::PLANNING_TREE_DIR);
    let (snapshot_source, shallow) = if planning_tree.is_dir() {
        (planning_tree, false)
    } else {
        (artifacts_dir.clone(), true)
    };
    if snapshot_dir.is_dir() {
        match snapshot::diff_trees(&snapshot_dir, &snapshot_source) {
            Ok(mut diff) => {
                diff.added.retain(|p| !is_generated_doc(p));
                diff.modified.retain(|p| !is_generated_doc(p));
                diff.removed.retain(|p| !is_generated_doc(p));
                if !diff.is_empty() {
                    let changelog = snapshot::render_changelog(&diff);
                    io::atomic_write(&paths::changelog_path(root), changelog.as_bytes())?;
                }
            }
            Err(e) => warnings.push(format!("could not diff prior snapshot: {e}")),
        }
    } else {
        debug!("no prior snapshot, skipping changelog");
    }

    // 6. Refresh the snapshot via stage-then-swap.
    snapshot::stage_and_swap(&snapshot_source, &snapshot_dir, shallow)?;

    // 7. Regenerate the spec index over the new snapshot.
    let files = spec_index::scan_dir(&snapshot_dir)?;
    let index = spec_index::render_index(&files, Utc::now());
    io::atomic_write(&paths::spec_index_path(root), index.as_bytes())?;

    // 8. Synthesize the project context and write the briefing.
    let (context, truncations) = build_context(&artifacts_dir)?;
    for info in truncations {
        warnings.push(format!(
            "briefing field '{}' truncated from {} to {} characters",
            info.field, info.original_length, info.truncated_to
        ));
    }
    io::atomic_write(
        &paths::briefing_path(root),
        context.render_briefing().as_bytes(),
    )?;

    // 9. Working instructions: substitute the placeholder in place, or
    //    regenerate from the template.
    let project = project_name(root);
    write_working_instructions(root, &project, &context)?;

    // 10. Tech-stack detection and agent command rewrite (advisory only).
    if let Err(e) = customize_agent_commands(root, &artifacts_dir) {
        warnings.push(format!("could not customize agent commands: {e}"));
    }

    // 11. Artifact validation.
    warnings.extend(validate_artifacts(&artifacts_dir));

    // 13. Commit phase state last so a crash before this point reruns cleanly.
    let mut state = PhaseState::load_or_new(root, &project)?;
    state.advance_to_implementation();
    state.save(root)?;

    Ok(TransitionReport {
        story_count: extraction.stories.len(),
        warnings,
        progress_preserved: outcome.progress_preserved,
    })
}

// ---------------------------------------------------------------------------
// Partial rebuilds
// ---------------------------------------------------------------------------

/// Rescan and rewrite the spec index only. Scans the snapshot when one
/// exists, else the live artifacts directory. Returns the file count.
pub fn rebuild_index(root: &Path) -> Result<usize> {
    let snapshot_dir = paths::snapshot_dir(root);
    let scan_root = if snapshot_dir.is_dir() {
        snapshot_dir
    } else {
        paths::find_artifacts_dir(root).ok_or_else(|| {
            HandoffError::ArtifactsDirNotFound(paths::ARTIFACT_DIR_CANDIDATES.join(", "))
        })?
    };
    let files = spec_index::scan_dir(&scan_root)?;
    let index = spec_index::render_index(&files, Utc::now());
    io::atomic_write(&paths::spec_index_path(root), index.as_bytes())?;
    Ok(files.len())
}

/// Rebuild the briefing document only. Returns truncation warnings.
pub fn rebuild_briefing(root: &Path) -> Result<Vec<String>> {
    let artifacts_dir = paths::find_artifacts_dir(root).ok_or_else(|| {
        HandoffError::ArtifactsDirNotFound(paths::ARTIFACT_DIR_CANDIDATES.join(", "))
    })?;
    let (context, truncations) = build_context(&artifacts_dir)?;
    io::atomic_write(
        &paths::briefing_path(root),
        context.render_briefing().as_bytes(),
    )?;
    Ok(truncations
        .into_iter()
        .map(|info| {
            format!(
                "briefing field '{}' truncated from {} to {} characters",
                info.field, info.original_length, info.truncated_to
            )
        })
        .collect())
}

// ---------------------------------------------------------------------------
// Document location
// ---------------------------------------------------------------------------

/// First markdown file in `dir` that looks like a stories/epics document,
/// in name order for determinism.
fn find_stories_file(dir: &Path) -> Result<Option<PathBuf>> {
    find_doc(dir, SpecType::Stories)
}

fn find_doc(dir: &Path, wanted: SpecType) -> Result<Option<PathBuf>> {
    let mut names: Vec<String> = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        if !name.to_lowercase().ends_with(".md") {
            continue;
        }
        if spec_index::classify(name) == wanted {
            names.push(name.to_string());
        }
    }
    names.sort();
    Ok(names.first().map(|n| dir.join(n)))
}

// ---------------------------------------------------------------------------
// Project context
// ---------------------------------------------------------------------------

fn build_context(
    artifacts_dir: &Path,
) -> Result<(ProjectContext, Vec<crate::section::TruncationInfo>)> {
    let prd = find_doc(artifacts_dir, SpecType::Prd)?
        .and_then(|p| std::fs::read_to_string(p).ok());
    let technical = match find_doc(artifacts_dir, SpecType::Architecture)? {
        Some(p) => std::fs::read_to_string(p).ok(),
        None => find_doc(artifacts_dir, SpecType::Readiness)?
            .and_then(|p| std::fs::read_to_string(p).ok()),
    };

    let mut all_docs = String::new();
    for file in spec_index::scan_dir(artifacts_dir)? {
        if let Ok(content) = std::fs::read_to_string(artifacts_dir.join(&file.path)) {
            all_docs.push_str(&content);
            all_docs.push('\n');
        }
    }

    let sources = ContextSources {
        prd,
        technical,
        all_docs,
    };
    Ok(ProjectContext::from_sources(&sources))
}

fn project_name(root: &Path) -> String {
    let state_path = paths::state_path(root);
    if state_path.exists() {
        if let Ok(data) = std::fs::read_to_string(&state_path) {
            if let Ok(state) = serde_yaml::from_str::<PhaseState>(&data) {
                return state.project;
            }
        }
    }
    root.file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("project")
        .to_string()
}

// ---------------------------------------------------------------------------
// Working instructions
// ---------------------------------------------------------------------------

fn write_working_instructions(root: &Path, project: &str, context: &ProjectContext) -> Result<()> {
    let path = paths::working_instructions_path(root);
    if path.exists() {
        let existing = std::fs::read_to_string(&path)?;
        if existing.contains(paths::PROJECT_NAME_PLACEHOLDER) {
            let updated = existing.replace(paths::PROJECT_NAME_PLACEHOLDER, project);
            return io::atomic_write(&path, updated.as_bytes());
        }
        debug!("working instructions exist without placeholder, regenerating");
    }
    let rendered = working_instructions_template(project, context);
    io::atomic_write(&path, rendered.as_bytes())
}

fn working_instructions_template(project: &str, context: &ProjectContext) -> String {
    let mut out = format!(
        "# Working Instructions — {project}\n\n\
         Work through `docs/implementation-checklist.md` top to bottom, one story\n\
         at a time. Mark a story `[x]` only when every AC line passes. Consult\n\
         `docs/project-briefing.md` and the spec index before starting a new epic.\n"
    );
    if !context.goals.is_empty() {
        out.push_str(&format!("\n## Goals\n\n{}\n", context.goals));
    }
    if !context.scope_boundaries.is_empty() {
        out.push_str(&format!("\n## Scope\n\n{}\n", context.scope_boundaries));
    }
    if !context.architecture_constraints.is_empty() {
        out.push_str(&format!(
            "\n## Constraints\n\n{}\n",
            context.architecture_constraints
        ));
    }
    out
}

// ---------------------------------------------------------------------------
// Tech-stack detection
// ---------------------------------------------------------------------------

const COMMANDS_START: &str = "<!-- handoff:commands -->";
const COMMANDS_END: &str = "<!-- /handoff:commands -->";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TechStack {
    Rust,
    Node,
    Python,
    Go,
}

impl TechStack {
    fn command_block(self) -> &'static str {
        match self {
            TechStack::Rust => "cargo build\ncargo test\ncargo clippy -- -D warnings",
            TechStack::Node => "npm install\nnpm test\nnpm run build",
            TechStack::Python => "pip install -e .\npytest",
            TechStack::Go => "go build ./...\ngo test ./...",
        }
    }
}

fn detect_stack(stack_section: &str) -> Option<TechStack> {
    let text = stack_section.to_lowercase();
    if text.contains("rust") || text.contains("cargo") {
        Some(TechStack::Rust)
    } else if text.contains("typescript")
        || text.contains("javascript")
        || text.contains("node")
        || text.contains("npm")
    {
        Some(TechStack::Node)
    } else if text.contains("python") || text.contains("pytest") || text.contains("django") {
        Some(TechStack::Python)
    } else if text.contains("golang") || text.contains("go 1.") {
        Some(TechStack::Go)
    } else {
        None
    }
}

fn customize_agent_commands(root: &Path, artifacts_dir: &Path) -> Result<()> {
    let Some(arch_path) = find_doc(artifacts_dir, SpecType::Architecture)? else {
        debug!("no architecture document, skipping agent command rewrite");
        return Ok(());
    };
    let arch = std::fs::read_to_string(&arch_path)?;
    let Some(section) = crate::section::extract_section(
        &arch,
        &["Tech Stack", "Technology Stack", "Stack"],
        "stack",
    ) else {
        debug!("architecture document has no stack section");
        return Ok(());
    };
    let Some(stack) = detect_stack(&section.content) else {
        debug!("no known ecosystem detected in stack section");
        return Ok(());
    };

    let replacement = format!(
        "{COMMANDS_START}\n```sh\n{}\n```\n{COMMANDS_END}",
        stack.command_block()
    );
    let updated = io::replace_between_markers(
        &paths::agents_md_path(root),
        COMMANDS_START,
        COMMANDS_END,
        &replacement,
    )?;
    if !updated {
        debug!("agent instructions missing command markers, leaving unchanged");
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

fn validate_artifacts(artifacts_dir: &Path) -> Vec<String> {
    let mut warnings = Vec::new();

    match find_doc(artifacts_dir, SpecType::Prd) {
        Ok(Some(_)) => {}
        _ => warnings.push("no product-requirements document found among planning artifacts".to_string()),
    }
    match find_doc(artifacts_dir, SpecType::Architecture) {
        Ok(Some(_)) => {}
        _ => warnings.push("no architecture document found among planning artifacts".to_string()),
    }

    if let Ok(Some(readiness_path)) = find_doc(artifacts_dir, SpecType::Readiness) {
        match std::fs::read_to_string(&readiness_path) {
            Ok(content) => {
                let upper = content.to_uppercase();
                if upper.contains("NO-GO") || upper.contains("NO GO") {
                    warnings.push(format!(
                        "readiness report '{}' records a NO-GO verdict",
                        readiness_path
                            .file_name()
                            .and_then(|n| n.to_str())
                            .unwrap_or("readiness")
                    ));
                }
            }
            Err(_) => debug!("readiness report unreadable, treating as absent"),
        }
    }

    warnings
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
