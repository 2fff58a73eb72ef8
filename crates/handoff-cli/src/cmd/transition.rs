use crate::output::{print_json, print_warnings};
use anyhow::Context;
use handoff_core::transition::run_transition;
use std::path::Path;

pub fn run(root: &Path, json: bool) -> anyhow::Result<()> {
    let report = run_transition(root).context("transition failed")?;

    if json {
        return print_json(&report);
    }

    println!("Transition complete: {} stories", report.story_count);
    if report.progress_preserved {
        println!("Completion marks carried over from the previous checklist.");
    }
    print_warnings(&report.warnings);
    Ok(())
}
