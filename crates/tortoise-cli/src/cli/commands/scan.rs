//! `tortoise scan` – enumerate sources into scan progress.

use anyhow::{bail, Context, Result};
use std::path::Path;
use std::time::Instant;
use tortoise_core::archive::parse_sources;
use tortoise_core::checkpoint::ScanCheckpointer;
use tortoise_core::config::TortoiseConfig;

use super::state::{orchestrator, scan_store};

pub async fn run_scan(cfg: &TortoiseConfig, sources_file: &Path) -> Result<()> {
    let text = std::fs::read_to_string(sources_file)
        .with_context(|| format!("reading {}", sources_file.display()))?;
    let sources = parse_sources(&text);
    if sources.is_empty() {
        bail!("no sources listed in {}", sources_file.display());
    }

    let store = scan_store(cfg)?;
    let mut checkpointer = ScanCheckpointer::open(store, cfg.checkpoint_interval(), Instant::now())
        .context("loading scan progress")?;
    let orch = orchestrator(cfg)?;

    println!("Scanning {} source(s)...", sources.len());
    let report = orch.run_scan(&sources, &mut checkpointer).await;
    print!("{}", report.render());
    if !report.cancelled {
        println!("Next: `tortoise populate` to queue discovered items.");
    }
    Ok(())
}
