//! Checklist generation and progress-preserving merge.
//!
//! The checklist is the one operator-editable artifact: completion marks
//! recorded there must survive regeneration. Matching is ID-keyed, not
//! content-keyed, because titles are allowed to change between passes.

use crate::story::Story;
use regex::Regex;
use std::collections::{HashMap, HashSet};
use std::sync::OnceLock;

// ---------------------------------------------------------------------------
// ChecklistItem
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChecklistItem {
    pub id: String,
    pub completed: bool,
    pub title: String,
}

static ITEM_RE: OnceLock<Regex> = OnceLock::new();

fn item_re() -> &'static Regex {
    ITEM_RE.get_or_init(|| Regex::new(r"^- \[([ xX])\] Story ([^:\s]+)\s*:\s*(.*)$").unwrap())
}

/// Parse a previously generated checklist. Lines that do not match the item
/// shape are ignored, so a corrupt checklist degrades to "no completions".
pub fn parse_checklist(text: &str) -> Vec<ChecklistItem> {
    text.lines()
        .filter_map(|line| {
            let caps = item_re().captures(line.trim_end())?;
            Some(ChecklistItem {
                id: caps[2].to_string(),
                completed: &caps[1] != " ",
                title: caps[3].trim().to_string(),
            })
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Generation
// ---------------------------------------------------------------------------

/// Split free text on sentence-like boundaries for indented rendering.
fn split_sentences(text: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut current = String::new();
    for word in text.split_whitespace() {
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(word);
        if word.ends_with('.') || word.ends_with('!') || word.ends_with('?') {
            out.push(std::mem::take(&mut current));
        }
    }
    if !current.is_empty() {
        out.push(current);
    }
    out
}

/// Cap an epic description to its first two sentences for compact output.
fn goal_line(description: &str) -> String {
    let sentences = split_sentences(description);
    sentences
        .iter()
        .take(2)
        .cloned()
        .collect::<Vec<_>>()
        .join(" ")
}

fn render(stories: &[Story], completed: &HashSet<String>) -> String {
    let mut out = String::from("# Implementation Checklist\n");

    // Epics in first-seen order.
    let mut epic_order: Vec<&str> = Vec::new();
    for story in stories {
        if !epic_order.contains(&story.epic.as_str()) {
            epic_order.push(&story.epic);
        }
    }

    for epic in epic_order {
        let heading = if epic.is_empty() { "Ungrouped" } else { epic };
        out.push_str(&format!("\n## {heading}\n"));

        if let Some(desc) = stories
            .iter()
            .find(|s| s.epic == epic && !s.epic_description.is_empty())
            .map(|s| s.epic_description.as_str())
        {
            out.push_str(&format!("\nGoal: {}\n", goal_line(desc)));
        }

        for story in stories.iter().filter(|s| s.epic == epic) {
            let mark = if completed.contains(&story.id) {
                "x"
            } else {
                " "
            };
            out.push_str(&format!(
                "\n- [{mark}] Story {}: {}\n",
                story.id, story.title
            ));
            for sentence in split_sentences(&story.description) {
                out.push_str(&format!("  - {sentence}\n"));
            }
            for criterion in &story.acceptance_criteria {
                out.push_str(&format!("  - AC: {criterion}\n"));
            }
        }
    }

    out
}

/// Render a fresh checklist with every item unchecked.
pub fn generate(stories: &[Story]) -> String {
    render(stories, &HashSet::new())
}

// ---------------------------------------------------------------------------
// Merge
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct MergeOutcome {
    pub rendered: String,
    pub warnings: Vec<String>,
    /// True if at least one completion mark carried over from the prior
    /// checklist.
    pub progress_preserved: bool,
}

/// Re-render the checklist for `stories`, carrying over completion marks
/// from `prior_text` (the previously generated checklist, if any).
///
/// Two advisory detectors run against the before/after comparison, mutually
/// exclusive per prior completed item: if a completed id vanished but a new
/// story carries the same title under a different id, warn "renumbered";
/// otherwise warn "orphaned". Unchecked removals are not reported.
pub fn merge(stories: &[Story], prior_text: Option<&str>) -> MergeOutcome {
    let prior_items = match prior_text {
        Some(text) => parse_checklist(text),
        None => Vec::new(),
    };

    let completed: HashSet<String> = prior_items
        .iter()
        .filter(|i| i.completed)
        .map(|i| i.id.clone())
        .collect();

    let new_ids: HashSet<&str> = stories.iter().map(|s| s.id.as_str()).collect();
    let titles_to_ids: HashMap<&str, &str> = stories
        .iter()
        .map(|s| (s.title.as_str(), s.id.as_str()))
        .collect();

    let mut warnings = Vec::new();
    for item in prior_items.iter().filter(|i| i.completed) {
        if new_ids.contains(item.id.as_str()) {
            continue;
        }
        match titles_to_ids.get(item.title.as_str()) {
            Some(new_id) => warnings.push(format!(
                "completed story {} ('{}') may have been renumbered to {} — verify before \
                 treating it as new work",
                item.id, item.title, new_id
            )),
            None => warnings.push(format!(
                "completed story {} ('{}') no longer exists in the stories document — \
                 possible silent work loss",
                item.id, item.title
            )),
        }
    }

    let progress_preserved = stories.iter().any(|s| completed.contains(&s.id));
    let rendered = render(stories, &completed);

    MergeOutcome {
        rendered,
        warnings,
        progress_preserved,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn story(epic: &str, id: &str, title: &str) -> Story {
        Story {
            epic: epic.to_string(),
            epic_description: String::new(),
            id: id.to_string(),
            title: title.to_string(),
            description: "Does the thing.".to_string(),
            acceptance_criteria: vec!["Given a, Then b".to_string()],
        }
    }

    #[test]
    fn generate_renders_unchecked_items() {
        let stories = vec![
            story("Epic 1: Auth", "1.1", "Login"),
            story("Epic 1: Auth", "1.2", "Logout"),
        ];
        let out = generate(&stories);
        assert!(out.contains("## Epic 1: Auth"));
        assert!(out.contains("- [ ] Story 1.1: Login"));
        assert!(out.contains("- [ ] Story 1.2: Logout"));
        assert!(out.contains("  - Does the thing."));
        assert!(out.contains("  - AC: Given a, Then b"));
    }

    #[test]
    fn generate_includes_goal_from_epic_description() {
        let mut s = story("Epic 1: Auth", "1.1", "Login");
        s.epic_description =
            "First sentence. Second sentence. Third sentence should be dropped.".to_string();
        let out = generate(&[s]);
        assert!(out.contains("Goal: First sentence. Second sentence."));
        assert!(!out.contains("Third sentence"));
    }

    #[test]
    fn parse_round_trips_generated_output() {
        let stories = vec![story("Epic 1: Auth", "1.1", "Login")];
        let items = parse_checklist(&generate(&stories));
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].id, "1.1");
        assert_eq!(items[0].title, "Login");
        assert!(!items[0].completed);
    }

    #[test]
    fn parse_reads_checked_and_unchecked() {
        let text = "- [x] Story 1.1: Done\n- [ ] Story 1.2: Pending\njunk line\n";
        let items = parse_checklist(text);
        assert_eq!(items.len(), 2);
        assert!(items[0].completed);
        assert!(!items[1].completed);
    }

    #[test]
    fn merge_preserves_completion_by_id() {
        let stories = vec![
            story("Epic 1: Auth", "1.1", "Login renamed"),
            story("Epic 1: Auth", "1.2", "Logout"),
        ];
        let prior = "- [x] Story 1.1: Login\n- [ ] Story 1.2: Logout\n";
        let outcome = merge(&stories, Some(prior));
        assert!(outcome.rendered.contains("- [x] Story 1.1: Login renamed"));
        assert!(outcome.rendered.contains("- [ ] Story 1.2: Logout"));
        assert!(outcome.progress_preserved);
        assert!(outcome.warnings.is_empty());
    }

    #[test]
    fn merge_without_prior_is_plain_generation() {
        let stories = vec![story("Epic 1: Auth", "1.1", "Login")];
        let outcome = merge(&stories, None);
        assert_eq!(outcome.rendered, generate(&stories));
        assert!(outcome.warnings.is_empty());
        assert!(!outcome.progress_preserved);
    }

    #[test]
    fn merge_tolerates_corrupt_prior() {
        let stories = vec![story("Epic 1: Auth", "1.1", "Login")];
        let outcome = merge(&stories, Some("%%% not a checklist at all %%%"));
        assert!(outcome.rendered.contains("- [ ] Story 1.1: Login"));
        assert!(!outcome.progress_preserved);
    }

    #[test]
    fn orphan_detection_fires_for_completed_removal() {
        let stories = vec![story("Epic 1: Auth", "1.2", "Logout")];
        let prior = "- [x] Story 1.1: Login\n- [ ] Story 1.2: Logout\n";
        let outcome = merge(&stories, Some(prior));
        assert_eq!(outcome.warnings.len(), 1);
        assert!(outcome.warnings[0].contains("1.1"));
        assert!(outcome.warnings[0].contains("no longer exists"));
    }

    #[test]
    fn orphan_detection_ignores_unchecked_removal() {
        let stories = vec![story("Epic 1: Auth", "1.2", "Logout")];
        let prior = "- [ ] Story 1.1: Login\n- [ ] Story 1.2: Logout\n";
        let outcome = merge(&stories, Some(prior));
        assert!(outcome.warnings.is_empty());
    }

    #[test]
    fn renumbering_heuristic_matches_on_title() {
        let stories = vec![story("Epic 1: Auth", "1.2", "Login Feature")];
        let prior = "- [x] Story 1.1: Login Feature\n";
        let outcome = merge(&stories, Some(prior));
        assert_eq!(outcome.warnings.len(), 1);
        assert!(outcome.warnings[0].contains("renumbered"));
        assert!(outcome.warnings[0].contains("1.1"));
        assert!(outcome.warnings[0].contains("1.2"));
    }

    #[test]
    fn merge_is_idempotent_over_unchanged_stories() {
        let stories = vec![
            story("Epic 1: Auth", "1.1", "Login"),
            story("Epic 1: Auth", "1.2", "Logout"),
        ];
        let first = merge(&stories, None);
        let second = merge(&stories, Some(&first.rendered));
        assert_eq!(first.rendered, second.rendered);
    }

    #[test]
    fn ungrouped_epic_renders_placeholder_heading() {
        let stories = vec![story("", "1.1", "Loose story")];
        let out = generate(&stories);
        assert!(out.contains("## Ungrouped"));
    }
}
