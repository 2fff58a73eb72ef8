use crate::output::print_warnings;
use anyhow::Context;
use handoff_core::paths;
use handoff_core::transition::rebuild_briefing;
use std::path::Path;

pub fn run(root: &Path) -> anyhow::Result<()> {
    let warnings = rebuild_briefing(root).context("failed to rebuild briefing")?;
    println!(
        "Briefing written to {}",
        paths::briefing_path(root).display()
    );
    print_warnings(&warnings);
    Ok(())
}
