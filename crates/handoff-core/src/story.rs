//! Story extraction — turns an epics/stories markdown document into
//! structured `Story` records plus advisory warnings.
//!
//! Parsing is a single forward scan driven by an explicit state machine.
//! Nothing here is fatal: malformed input degrades to warnings, never errors.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

// ---------------------------------------------------------------------------
// Story
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Story {
    /// Title of the containing epic; empty if the story appeared before any
    /// epic header.
    pub epic: String,
    /// Prose immediately following the epic header, joined with spaces.
    pub epic_description: String,
    /// Dotted two-part identifier, e.g. "1.2". Kept verbatim even when it
    /// does not match the expected shape (a warning is emitted instead).
    pub id: String,
    pub title: String,
    /// Free text preceding the acceptance criteria, joined with spaces.
    pub description: String,
    /// One comma-joined Given/When/Then clause group per criterion,
    /// emphasis markup stripped, in source order.
    pub acceptance_criteria: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct Extraction {
    pub stories: Vec<Story>,
    pub warnings: Vec<String>,
}

// ---------------------------------------------------------------------------
// Line patterns
// ---------------------------------------------------------------------------

static EPIC_RE: OnceLock<Regex> = OnceLock::new();
static STORY_RE: OnceLock<Regex> = OnceLock::new();
static ID_RE: OnceLock<Regex> = OnceLock::new();
static AC_LABEL_RE: OnceLock<Regex> = OnceLock::new();
static GIVEN_RE: OnceLock<Regex> = OnceLock::new();
static WHEN_THEN_RE: OnceLock<Regex> = OnceLock::new();

fn epic_re() -> &'static Regex {
    EPIC_RE.get_or_init(|| Regex::new(r"^##\s+Epic\s+(\d+)\s*:\s*(.*)$").unwrap())
}

fn story_re() -> &'static Regex {
    STORY_RE.get_or_init(|| Regex::new(r"^###\s+Story\s+([^:\s]+)\s*:\s*(.*)$").unwrap())
}

fn id_re() -> &'static Regex {
    ID_RE.get_or_init(|| Regex::new(r"^\d+\.\d+$").unwrap())
}

fn ac_label_re() -> &'static Regex {
    AC_LABEL_RE
        .get_or_init(|| Regex::new(r"(?i)^[*_]*\s*acceptance criteria\s*:?\s*[*_]*\s*$").unwrap())
}

fn given_re() -> &'static Regex {
    GIVEN_RE.get_or_init(|| Regex::new(r"(?i)^[*_]*given\b").unwrap())
}

fn when_then_re() -> &'static Regex {
    WHEN_THEN_RE.get_or_init(|| Regex::new(r"(?i)^[*_]*(?:when|then)\b").unwrap())
}

/// Strip bold/italic markers from a clause line.
pub(crate) fn strip_emphasis(s: &str) -> String {
    s.replace("**", "").replace('*', "").replace("__", "")
}

/// Drop a leading list bullet so "- **Given** x" matches the Given pattern.
fn strip_bullet(s: &str) -> &str {
    s.strip_prefix("- ")
        .or_else(|| s.strip_prefix("* "))
        .unwrap_or(s)
}

/// True for a level-2 or level-3 heading. Deeper headings (`####`+) are
/// body text and must not terminate a story.
fn closes_story_body(line: &str) -> bool {
    let trimmed = line.trim_start();
    let level = trimmed.chars().take_while(|&c| c == '#').count();
    (level == 2 || level == 3) && trimmed.chars().nth(level).map_or(true, |c| c == ' ')
}

// ---------------------------------------------------------------------------
// Scan state
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScanState {
    /// Before any epic header, or after a silently skipped story header.
    Idle,
    /// After an epic header: collecting its description lines.
    InEpic,
    /// Inside a story body, before the acceptance-criteria boundary.
    InStoryDescription,
    /// Inside a story body, at or after the acceptance-criteria boundary.
    InStoryCriteria,
}

#[derive(Debug, Default)]
struct StoryAccumulator {
    epic: String,
    epic_description: String,
    id: String,
    title: String,
    description_lines: Vec<String>,
    criteria: Vec<String>,
    block: Vec<String>,
}

impl StoryAccumulator {
    fn flush_block(&mut self) {
        if !self.block.is_empty() {
            self.criteria.push(self.block.join(", "));
            self.block.clear();
        }
    }

    fn finish(mut self, warnings: &mut Vec<String>) -> Story {
        self.flush_block();
        if !id_re().is_match(&self.id) {
            warnings.push(format!(
                "story '{}' has a malformed id (expected '<major>.<minor>')",
                self.id
            ));
        }
        if self.criteria.is_empty() {
            warnings.push(format!("story {} has no acceptance criteria", self.id));
        }
        if self.description_lines.is_empty() {
            warnings.push(format!("story {} has no description", self.id));
        }
        Story {
            epic: self.epic,
            epic_description: self.epic_description,
            id: self.id,
            title: self.title,
            description: self.description_lines.join(" "),
            acceptance_criteria: self.criteria,
        }
    }
}

// ---------------------------------------------------------------------------
// extract_stories
// ---------------------------------------------------------------------------

/// Extract every story from `text`. Pure function; never fails.
///
/// Warnings are advisory only — a malformed story is still recorded, with
/// two exceptions: a story header with an empty title is skipped without a
/// warning, and body text of a skipped story is discarded.
pub fn extract_stories(text: &str) -> Extraction {
    let mut stories = Vec::new();
    let mut warnings = Vec::new();

    let mut state = ScanState::Idle;
    let mut epic_title = String::new();
    let mut epic_desc_lines: Vec<String> = Vec::new();
    let mut current: Option<StoryAccumulator> = None;

    for raw in text.lines() {
        let line = raw.trim_end();

        if let Some(caps) = epic_re().captures(line) {
            if let Some(acc) = current.take() {
                stories.push(acc.finish(&mut warnings));
            }
            let number = &caps[1];
            let title = caps[2].trim();
            epic_title = if title.is_empty() {
                format!("Epic {number}")
            } else {
                format!("Epic {number}: {title}")
            };
            epic_desc_lines.clear();
            state = ScanState::InEpic;
            continue;
        }

        if let Some(caps) = story_re().captures(line) {
            if let Some(acc) = current.take() {
                stories.push(acc.finish(&mut warnings));
            }
            let id = caps[1].to_string();
            let title = strip_emphasis(caps[2].trim());
            if title.is_empty() {
                // Deliberate leniency: a header with no title is skipped
                // without a warning, and its body is ignored.
                state = ScanState::Idle;
                continue;
            }
            if epic_title.is_empty() {
                warnings.push(format!("story {id} is not under an epic"));
            }
            current = Some(StoryAccumulator {
                epic: epic_title.clone(),
                epic_description: epic_desc_lines.join(" "),
                id,
                title,
                ..Default::default()
            });
            state = ScanState::InStoryDescription;
            continue;
        }

        // Any other level-2/3 heading closes the current story body.
        if matches!(
            state,
            ScanState::InStoryDescription | ScanState::InStoryCriteria
        ) && closes_story_body(line)
        {
            if let Some(acc) = current.take() {
                stories.push(acc.finish(&mut warnings));
            }
            state = ScanState::Idle;
            continue;
        }

        match state {
            ScanState::Idle => {}
            ScanState::InEpic => {
                // Any heading ends the epic description.
                if line.trim_start().starts_with('#') {
                    state = ScanState::Idle;
                } else if !line.trim().is_empty() {
                    epic_desc_lines.push(line.trim().to_string());
                }
            }
            ScanState::InStoryDescription => {
                let trimmed = strip_bullet(line.trim());
                if ac_label_re().is_match(trimmed) {
                    state = ScanState::InStoryCriteria;
                } else if given_re().is_match(trimmed) {
                    state = ScanState::InStoryCriteria;
                    if let Some(acc) = current.as_mut() {
                        acc.flush_block();
                        acc.block.push(strip_emphasis(trimmed));
                    }
                } else if !trimmed.is_empty() && !trimmed.starts_with('#') {
                    if let Some(acc) = current.as_mut() {
                        acc.description_lines.push(trimmed.to_string());
                    }
                }
            }
            ScanState::InStoryCriteria => {
                let trimmed = strip_bullet(line.trim());
                if given_re().is_match(trimmed) {
                    if let Some(acc) = current.as_mut() {
                        acc.flush_block();
                        acc.block.push(strip_emphasis(trimmed));
                    }
                } else if when_then_re().is_match(trimmed) {
                    if let Some(acc) = current.as_mut() {
                        if !acc.block.is_empty() {
                            acc.block.push(strip_emphasis(trimmed));
                        }
                    }
                }
                // Anything else inside the criteria region is ignored.
            }
        }
    }

    if let Some(acc) = current.take() {
        stories.push(acc.finish(&mut warnings));
    }

    Extraction { stories, warnings }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    const DOC: &str = "\
# Epics

## Epic 1: Authentication
Everything needed to let users sign in.
Covers both password and OAuth flows.

### Story 1.1: Login form
As a user, I want to log in with email and password.

**Acceptance Criteria:**

**Given** a registered user
**When** they submit valid credentials
**Then** they land on the dashboard

**Given** an unknown email
**Then** an error message is shown

### Story 1.2: Logout
As a user, I want to log out.

Given a logged-in user
When they click logout
Then the session is cleared
";

    #[test]
    fn extracts_stories_with_epic_context() {
        let result = extract_stories(DOC);
        assert_eq!(result.stories.len(), 2);

        let s1 = &result.stories[0];
        assert_eq!(s1.epic, "Epic 1: Authentication");
        assert_eq!(
            s1.epic_description,
            "Everything needed to let users sign in. Covers both password and OAuth flows."
        );
        assert_eq!(s1.id, "1.1");
        assert_eq!(s1.title, "Login form");
        assert_eq!(
            s1.description,
            "As a user, I want to log in with email and password."
        );
        assert_eq!(s1.acceptance_criteria.len(), 2);
        assert_eq!(
            s1.acceptance_criteria[0],
            "Given a registered user, When they submit valid credentials, Then they land on the dashboard"
        );
        assert_eq!(
            s1.acceptance_criteria[1],
            "Given an unknown email, Then an error message is shown"
        );
    }

    #[test]
    fn given_line_without_label_starts_criteria() {
        let result = extract_stories(DOC);
        let s2 = &result.stories[1];
        assert_eq!(s2.id, "1.2");
        assert_eq!(s2.acceptance_criteria.len(), 1);
        assert_eq!(
            s2.acceptance_criteria[0],
            "Given a logged-in user, When they click logout, Then the session is cleared"
        );
    }

    #[test]
    fn clean_doc_has_no_warnings() {
        let result = extract_stories(DOC);
        assert!(result.warnings.is_empty(), "{:?}", result.warnings);
    }

    #[test]
    fn story_before_epic_warns_but_is_kept() {
        let doc = "### Story 1.1: Orphaned\nSome description.\n\nGiven x\nThen y\n";
        let result = extract_stories(doc);
        assert_eq!(result.stories.len(), 1);
        assert_eq!(result.stories[0].epic, "");
        assert!(result
            .warnings
            .iter()
            .any(|w| w.contains("not under an epic")));
    }

    #[test]
    fn malformed_id_warns_but_is_kept() {
        let doc = "## Epic 1: E\n\n### Story 1.2.3: Deep id\nDesc.\n\nGiven a\nThen b\n";
        let result = extract_stories(doc);
        assert_eq!(result.stories.len(), 1);
        assert_eq!(result.stories[0].id, "1.2.3");
        assert!(result.warnings.iter().any(|w| w.contains("malformed id")));
    }

    #[test]
    fn missing_criteria_and_description_warn() {
        let doc = "## Epic 1: E\n\n### Story 1.1: Bare\n";
        let result = extract_stories(doc);
        assert_eq!(result.stories.len(), 1);
        assert!(result
            .warnings
            .iter()
            .any(|w| w.contains("no acceptance criteria")));
        assert!(result.warnings.iter().any(|w| w.contains("no description")));
    }

    #[test]
    fn empty_title_is_silently_skipped() {
        let doc = "## Epic 1: E\n\n### Story 1.1:\nBody that belongs to nothing.\n\n### Story 1.2: Real\nDesc.\n\nGiven a\nThen b\n";
        let result = extract_stories(doc);
        assert_eq!(result.stories.len(), 1);
        assert_eq!(result.stories[0].id, "1.2");
        // Skip must be silent and the orphan body must not leak into 1.2.
        assert!(result.warnings.is_empty(), "{:?}", result.warnings);
        assert_eq!(result.stories[0].description, "Desc.");
    }

    #[test]
    fn story_count_matches_headers_with_titles() {
        let mut doc = String::from("## Epic 1: E\nIntro.\n");
        for i in 1..=5 {
            doc.push_str(&format!(
                "\n### Story 1.{i}: Story number {i}\nDesc {i}.\n\nGiven a\nThen b\n"
            ));
        }
        let result = extract_stories(&doc);
        assert_eq!(result.stories.len(), 5);
    }

    #[test]
    fn bulleted_clauses_are_grouped() {
        let doc = "## Epic 2: E\n\n### Story 2.1: Bullets\nDesc.\n\nAcceptance Criteria\n- Given a\n- When b\n- Then c\n";
        let result = extract_stories(doc);
        assert_eq!(result.stories[0].acceptance_criteria.len(), 1);
        assert_eq!(
            result.stories[0].acceptance_criteria[0],
            "Given a, When b, Then c"
        );
    }

    #[test]
    fn unrelated_heading_closes_story_body() {
        let doc = "## Epic 1: E\n\n### Story 1.1: First\nDesc.\n\nGiven a\nThen b\n\n## Notes\nGiven this looks like a clause, it must not join story 1.1.\n";
        let result = extract_stories(doc);
        assert_eq!(result.stories.len(), 1);
        assert_eq!(result.stories[0].acceptance_criteria.len(), 1);
        assert_eq!(
            result.stories[0].acceptance_criteria[0],
            "Given a, Then b"
        );
    }

    #[test]
    fn level_four_heading_stays_inside_story_body() {
        let doc = "## Epic 1: E\n\n### Story 1.1: First\nDesc.\n\n#### Notes\nExtra detail.\n\nGiven a\nThen b\n";
        let result = extract_stories(doc);
        assert_eq!(result.stories.len(), 1);
        assert_eq!(result.stories[0].acceptance_criteria, vec!["Given a, Then b"]);
        assert!(result.warnings.is_empty(), "{:?}", result.warnings);
    }

    #[test]
    fn empty_input_yields_nothing() {
        let result = extract_stories("");
        assert!(result.stories.is_empty());
        assert!(result.warnings.is_empty());
    }
}
