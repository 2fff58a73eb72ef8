use anyhow::Context;
use handoff_core::paths;
use handoff_core::transition::rebuild_index;
use std::path::Path;

pub fn run(root: &Path) -> anyhow::Result<()> {
    let count = rebuild_index(root).context("failed to rebuild spec index")?;
    println!(
        "Indexed {count} files -> {}",
        paths::spec_index_path(root).display()
    );
    Ok(())
}
