use crate::output::print_json;
use anyhow::Context;
use handoff_core::paths;
use handoff_core::state::PhaseState;
use std::path::Path;

pub fn run(root: &Path, json: bool) -> anyhow::Result<()> {
    let path = paths::state_path(root);
    if !path.exists() {
        println!("No phase state yet — run 'handoff transition' first.");
        return Ok(());
    }
    let data = std::fs::read_to_string(&path).context("failed to read phase state")?;
    let state: PhaseState =
        serde_yaml::from_str(&data).context("failed to parse phase state")?;

    if json {
        return print_json(&state);
    }

    println!("Project: {}", state.project);
    println!("Phase:   {}", state.phase);
    println!("Status:  {}", state.status);
    println!("Started: {}", state.started_at.format("%Y-%m-%d %H:%M UTC"));
    println!("Updated: {}", state.updated_at.format("%Y-%m-%d %H:%M UTC"));
    Ok(())
}
