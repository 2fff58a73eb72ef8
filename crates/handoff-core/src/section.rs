//! Heading-bounded section extraction and project-context synthesis.
//!
//! A matched `##` section includes any nested `###` subsections: the
//! boundary search only considers headings at the matched level or
//! shallower.

use crate::story::strip_emphasis;
use serde::{Deserialize, Serialize};

/// Shared clipping cap for every extracted briefing field, in characters.
pub const MAX_SECTION_LEN: usize = 2000;

// ---------------------------------------------------------------------------
// TruncationInfo
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TruncationInfo {
    pub field: String,
    pub original_length: usize,
    pub truncated_to: usize,
}

// ---------------------------------------------------------------------------
// Section extraction
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Section {
    pub content: String,
    pub truncation: Option<TruncationInfo>,
}

fn heading_level(line: &str) -> Option<usize> {
    let trimmed = line.trim_start();
    let level = trimmed.chars().take_while(|&c| c == '#').count();
    if level > 0 && trimmed.chars().nth(level).map_or(true, |c| c == ' ') {
        Some(level)
    } else {
        None
    }
}

fn heading_text(line: &str) -> String {
    let trimmed = line.trim_start().trim_start_matches('#').trim();
    strip_emphasis(trimmed).trim_end_matches(':').trim().to_string()
}

/// Extract the first section whose heading matches one of `candidates`
/// (tried in preference order, case-insensitive). The body runs up to the
/// next heading of equal-or-shallower level and is clipped at
/// [`MAX_SECTION_LEN`] characters.
pub fn extract_section(text: &str, candidates: &[&str], field: &str) -> Option<Section> {
    let lines: Vec<&str> = text.lines().collect();

    for candidate in candidates {
        for (i, line) in lines.iter().enumerate() {
            let Some(level) = heading_level(line) else {
                continue;
            };
            if !heading_text(line).eq_ignore_ascii_case(candidate) {
                continue;
            }

            let mut body_lines: Vec<&str> = Vec::new();
            for next in &lines[i + 1..] {
                match heading_level(next) {
                    Some(next_level) if next_level <= level => break,
                    _ => body_lines.push(next),
                }
            }
            let body = body_lines.join("\n").trim().to_string();
            if body.is_empty() {
                continue;
            }

            let original_length = body.chars().count();
            if original_length > MAX_SECTION_LEN {
                let clipped: String = body.chars().take(MAX_SECTION_LEN).collect();
                return Some(Section {
                    content: clipped,
                    truncation: Some(TruncationInfo {
                        field: field.to_string(),
                        original_length,
                        truncated_to: MAX_SECTION_LEN,
                    }),
                });
            }
            return Some(Section {
                content: body,
                truncation: None,
            });
        }
    }
    None
}

// ---------------------------------------------------------------------------
// ProjectContext
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProjectContext {
    pub goals: String,
    pub success_metrics: String,
    pub architecture_constraints: String,
    pub technical_risks: String,
    pub scope_boundaries: String,
    pub target_users: String,
    pub non_functional_requirements: String,
}

// Heading synonyms per field, in preference order.
const GOALS_HEADINGS: &[&str] = &["Executive Summary", "Vision", "Goals", "Project Goals"];
const METRICS_HEADINGS: &[&str] = &["Success Metrics", "Success Criteria", "Metrics", "KPIs"];
const CONSTRAINTS_HEADINGS: &[&str] = &[
    "Architecture Constraints",
    "Technical Constraints",
    "Constraints",
];
const RISKS_HEADINGS: &[&str] = &["Technical Risks", "Risks", "Risk Assessment"];
const SCOPE_HEADINGS: &[&str] = &["Scope", "Scope Boundaries", "In Scope", "MVP Scope"];
const USERS_HEADINGS: &[&str] = &["Target Users", "Users", "Personas", "Target Audience"];
const NFR_HEADINGS: &[&str] = &[
    "Non-Functional Requirements",
    "NFRs",
    "Quality Attributes",
];

/// Documents the context is synthesized from. Each source is optional; the
/// `all_docs` concatenation is the fallback when a specific source is absent.
#[derive(Debug, Clone, Default)]
pub struct ContextSources {
    /// The product-requirements document, for product-facing fields.
    pub prd: Option<String>,
    /// The architecture/readiness document, for technical fields.
    pub technical: Option<String>,
    /// Concatenation of every planning document.
    pub all_docs: String,
}

impl ProjectContext {
    /// Extract all seven fields. Fields with no matching section stay empty.
    pub fn from_sources(sources: &ContextSources) -> (Self, Vec<TruncationInfo>) {
        let product = sources.prd.as_deref().unwrap_or(&sources.all_docs);
        let technical = sources.technical.as_deref().unwrap_or(&sources.all_docs);

        let mut truncations = Vec::new();
        let mut field = |text: &str, headings: &[&str], name: &str| -> String {
            match extract_section(text, headings, name) {
                Some(section) => {
                    if let Some(info) = section.truncation {
                        truncations.push(info);
                    }
                    section.content
                }
                None => String::new(),
            }
        };

        let context = Self {
            goals: field(product, GOALS_HEADINGS, "goals"),
            success_metrics: field(product, METRICS_HEADINGS, "success_metrics"),
            architecture_constraints: field(
                technical,
                CONSTRAINTS_HEADINGS,
                "architecture_constraints",
            ),
            technical_risks: field(technical, RISKS_HEADINGS, "technical_risks"),
            scope_boundaries: field(product, SCOPE_HEADINGS, "scope_boundaries"),
            target_users: field(product, USERS_HEADINGS, "target_users"),
            non_functional_requirements: field(
                technical,
                NFR_HEADINGS,
                "non_functional_requirements",
            ),
        };
        (context, truncations)
    }

    /// Render the briefing document: seven optional sections in fixed order.
    pub fn render_briefing(&self) -> String {
        let mut out = String::from("# Project Briefing\n");
        let sections: [(&str, &str); 7] = [
            ("Goals", &self.goals),
            ("Success Metrics", &self.success_metrics),
            ("Architecture Constraints", &self.architecture_constraints),
            ("Technical Risks", &self.technical_risks),
            ("Scope Boundaries", &self.scope_boundaries),
            ("Target Users", &self.target_users),
            ("Non-Functional Requirements", &self.non_functional_requirements),
        ];
        for (heading, body) in sections {
            if !body.is_empty() {
                out.push_str(&format!("\n## {heading}\n\n{body}\n"));
            }
        }
        out
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
