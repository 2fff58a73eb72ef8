//! Spec-file classification and index generation.
//!
//! Classification is filename-substring matching over an ordered predicate
//! list; the list order *is* the precedence contract. In particular the
//! stories pattern is checked before concluding brainstorm, so a file named
//! `brainstorm-stories.md` classifies as stories (critical) rather than
//! brainstorm (low) — its priority decides reading order.

use crate::error::Result;
use crate::story::strip_emphasis;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Files at or above this size get a "[LARGE]" marker in the index.
pub const LARGE_FILE_BYTES: u64 = 102_400;

const DESCRIPTION_MAX: usize = 60;

// ---------------------------------------------------------------------------
// SpecType / Priority
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SpecType {
    Prd,
    Architecture,
    Stories,
    Ux,
    TestDesign,
    Readiness,
    Sprint,
    Brainstorm,
    Other,
}

impl SpecType {
    pub fn as_str(self) -> &'static str {
        match self {
            SpecType::Prd => "prd",
            SpecType::Architecture => "architecture",
            SpecType::Stories => "stories",
            SpecType::Ux => "ux",
            SpecType::TestDesign => "test-design",
            SpecType::Readiness => "readiness",
            SpecType::Sprint => "sprint",
            SpecType::Brainstorm => "brainstorm",
            SpecType::Other => "other",
        }
    }

    /// Reading priority is a pure function of the type.
    pub fn priority(self) -> Priority {
        match self {
            SpecType::Prd | SpecType::Architecture | SpecType::Stories => Priority::Critical,
            SpecType::Ux | SpecType::TestDesign | SpecType::Readiness => Priority::High,
            SpecType::Sprint => Priority::Medium,
            SpecType::Brainstorm | SpecType::Other => Priority::Low,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Critical,
    High,
    Medium,
    Low,
}

impl Priority {
    pub fn as_str(self) -> &'static str {
        match self {
            Priority::Critical => "critical",
            Priority::High => "high",
            Priority::Medium => "medium",
            Priority::Low => "low",
        }
    }

    pub fn all() -> &'static [Priority] {
        &[
            Priority::Critical,
            Priority::High,
            Priority::Medium,
            Priority::Low,
        ]
    }
}

// ---------------------------------------------------------------------------
// Classification
// ---------------------------------------------------------------------------

fn stories_pattern(name: &str) -> bool {
    name.contains("stories") || name.contains("story") || name.contains("epic")
}

/// Ordered (predicate, type) pairs. Evaluated top to bottom; first hit wins.
const CLASSIFIERS: &[(fn(&str) -> bool, SpecType)] = &[
    (|n| n.contains("prd") || n.contains("product-requirements"), SpecType::Prd),
    (|n| n.contains("architecture"), SpecType::Architecture),
    // Brainstorm only when the stories pattern is absent — see module docs.
    (
        |n| n.contains("brainstorm") && !stories_pattern(n),
        SpecType::Brainstorm,
    ),
    (stories_pattern, SpecType::Stories),
    (
        |n| n.contains("ux") || n.contains("wireframe") || n.contains("user-flow"),
        SpecType::Ux,
    ),
    (
        |n| {
            n.contains("test-design") || n.contains("test_design") || n.contains("testdesign")
        },
        SpecType::TestDesign,
    ),
    (|n| n.contains("readiness"), SpecType::Readiness),
    (|n| n.contains("sprint"), SpecType::Sprint),
];

/// Classify a file by its name alone.
pub fn classify(filename: &str) -> SpecType {
    let name = filename.to_lowercase();
    for (predicate, spec_type) in CLASSIFIERS {
        if predicate(&name) {
            return *spec_type;
        }
    }
    SpecType::Other
}

// ---------------------------------------------------------------------------
// SpecFileMetadata
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpecFileMetadata {
    /// Slash-normalized path relative to the scanned directory.
    pub path: String,
    pub size: u64,
    #[serde(rename = "type")]
    pub spec_type: SpecType,
    pub priority: Priority,
    pub description: String,
}

/// Short summary: first `#`/`##` heading text, else first non-empty line,
/// capped at 60 characters.
pub fn describe(content: &str) -> String {
    let mut fallback = None;
    for line in content.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        if let Some(rest) = trimmed.strip_prefix("##").or_else(|| trimmed.strip_prefix('#')) {
            if let Some(text) = rest.strip_prefix(' ') {
                return cap_description(&strip_emphasis(text.trim()));
            }
        }
        if fallback.is_none() {
            fallback = Some(trimmed);
        }
    }
    fallback
        .map(|l| cap_description(&strip_emphasis(l)))
        .unwrap_or_default()
}

fn cap_description(text: &str) -> String {
    if text.chars().count() <= DESCRIPTION_MAX {
        return text.to_string();
    }
    let clipped: String = text.chars().take(DESCRIPTION_MAX - 3).collect();
    format!("{}...", clipped.trim_end())
}

// ---------------------------------------------------------------------------
// Scanning
// ---------------------------------------------------------------------------

/// Recursively collect every markdown file under `dir` (case-insensitive
/// extension), classify each, and sort by priority tier with stable
/// path order within a tier.
pub fn scan_dir(dir: &Path) -> Result<Vec<SpecFileMetadata>> {
    let mut files = Vec::new();
    collect_markdown(dir, dir, &mut files)?;
    files.sort_by(|a, b| a.path.cmp(&b.path));
    files.sort_by_key(|f| f.priority);
    Ok(files)
}

fn collect_markdown(base: &Path, dir: &Path, out: &mut Vec<SpecFileMetadata>) -> Result<()> {
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if path.is_dir() {
            collect_markdown(base, &path, out)?;
            continue;
        }
        let is_markdown = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.eq_ignore_ascii_case("md"))
            .unwrap_or(false);
        if !is_markdown {
            continue;
        }

        let filename = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default()
            .to_string();
        let relative = path
            .strip_prefix(base)
            .unwrap_or(&path)
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect::<Vec<_>>()
            .join("/");
        let size = entry.metadata()?.len();
        let content = std::fs::read_to_string(&path).unwrap_or_default();
        let spec_type = classify(&filename);

        out.push(SpecFileMetadata {
            path: relative,
            size,
            spec_type,
            priority: spec_type.priority(),
            description: describe(&content),
        });
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Index rendering
// ---------------------------------------------------------------------------

/// Render the navigable index: priority-grouped, numbered reading order,
/// with size annotations and a "[LARGE]" marker for scan-headers-first files.
pub fn render_index(files: &[SpecFileMetadata], generated_at: DateTime<Utc>) -> String {
    let total_size: u64 = files.iter().map(|f| f.size).sum();
    let mut out = format!(
        "# Spec Index\n\nGenerated: {}\nFiles: {} ({} total)\n",
        generated_at.format("%Y-%m-%dT%H:%M:%SZ"),
        files.len(),
        format_size(total_size)
    );

    let mut number = 0usize;
    for priority in Priority::all() {
        let tier: Vec<&SpecFileMetadata> =
            files.iter().filter(|f| f.priority == *priority).collect();
        if tier.is_empty() {
            continue;
        }
        out.push_str(&format!("\n## {}\n\n", title_case(priority.as_str())));
        for file in tier {
            number += 1;
            let large = if file.size >= LARGE_FILE_BYTES {
                " [LARGE] — scan headers first"
            } else {
                ""
            };
            out.push_str(&format!(
                "{number}. `{}` ({}, {}) — {}{large}\n",
                file.path,
                file.spec_type.as_str(),
                format_size(file.size),
                file.description
            ));
        }
    }
    out
}

fn format_size(bytes: u64) -> String {
    if bytes >= 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{bytes} B")
    }
}

fn title_case(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
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
    fn classification_precedence() {
        assert_eq!(classify("prd.md"), SpecType::Prd);
        assert_eq!(classify("architecture.md"), SpecType::Architecture);
        assert_eq!(classify("epics-and-stories.md"), SpecType::Stories);
        assert_eq!(classify("ux-wireframes.md"), SpecType::Ux);
        assert_eq!(classify("test-design-v2.md"), SpecType::TestDesign);
        assert_eq!(classify("readiness-report.md"), SpecType::Readiness);
        assert_eq!(classify("sprint-3-notes.md"), SpecType::Sprint);
        assert_eq!(classify("brainstorm-session.md"), SpecType::Brainstorm);
        assert_eq!(classify("random-notes.md"), SpecType::Other);
    }

    #[test]
    fn stories_beats_brainstorm() {
        // Safety-relevant precedence: critical vs low reading priority.
        assert_eq!(classify("brainstorm-stories.md"), SpecType::Stories);
        assert_eq!(classify("brainstorm-stories.md").priority(), Priority::Critical);
        assert_eq!(classify("brainstorm-ideas.md").priority(), Priority::Low);
    }

    #[test]
    fn classification_is_case_insensitive() {
        assert_eq!(classify("PRD.md"), SpecType::Prd);
        assert_eq!(classify("Epic-List.MD"), SpecType::Stories);
    }

    #[test]
    fn describe_prefers_first_heading() {
        assert_eq!(describe("intro text\n# **The Title**\nbody"), "The Title");
        assert_eq!(describe("## Sub Title\nbody"), "Sub Title");
    }

    #[test]
    fn describe_falls_back_to_first_line() {
        assert_eq!(describe("\nJust a line of prose.\nmore"), "Just a line of prose.");
        assert_eq!(describe(""), "");
    }

    #[test]
    fn describe_caps_at_sixty_chars() {
        let long = "word ".repeat(40);
        let desc = describe(&long);
        assert!(desc.chars().count() <= 60);
        assert!(desc.ends_with("..."));
    }

    #[test]
    fn scan_collects_markdown_recursively() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("sub")).unwrap();
        std::fs::write(dir.path().join("prd.md"), "# PRD\n").unwrap();
        std::fs::write(dir.path().join("sub/notes.MD"), "# Notes\n").unwrap();
        std::fs::write(dir.path().join("ignore.txt"), "nope").unwrap();

        let files = scan_dir(dir.path()).unwrap();
        assert_eq!(files.len(), 2);
        let paths: Vec<&str> = files.iter().map(|f| f.path.as_str()).collect();
        assert!(paths.contains(&"prd.md"));
        assert!(paths.contains(&"sub/notes.MD"));
    }

    #[test]
    fn scan_sorts_by_priority_then_path() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("zz-brainstorm.md"), "x").unwrap();
        std::fs::write(dir.path().join("sprint-1.md"), "x").unwrap();
        std::fs::write(dir.path().join("prd.md"), "x").unwrap();
        std::fs::write(dir.path().join("architecture.md"), "x").unwrap();

        let files = scan_dir(dir.path()).unwrap();
        let paths: Vec<&str> = files.iter().map(|f| f.path.as_str()).collect();
        assert_eq!(
            paths,
            vec!["architecture.md", "prd.md", "sprint-1.md", "zz-brainstorm.md"]
        );
    }

    #[test]
    fn index_renders_groups_and_large_marker() {
        let files = vec![
            SpecFileMetadata {
                path: "prd.md".to_string(),
                size: 200_000,
                spec_type: SpecType::Prd,
                priority: Priority::Critical,
                description: "The PRD".to_string(),
            },
            SpecFileMetadata {
                path: "brainstorm.md".to_string(),
                size: 100,
                spec_type: SpecType::Brainstorm,
                priority: Priority::Low,
                description: "Ideas".to_string(),
            },
        ];
        let out = render_index(&files, Utc::now());
        assert!(out.contains("## Critical"));
        assert!(out.contains("## Low"));
        assert!(out.contains("1. `prd.md`"));
        assert!(out.contains("2. `brainstorm.md`"));
        assert!(out.contains("[LARGE]"));
        assert!(out.contains("Files: 2"));
    }
}
