//! `tortoise populate` – queue discovered items.

use anyhow::{bail, Context, Result};
use std::collections::HashSet;
use tortoise_core::archive::load_archive;
use tortoise_core::config::TortoiseConfig;
use tortoise_core::queue::populate;

use super::state::{open_queue, scan_store};

pub fn run_populate(cfg: &TortoiseConfig) -> Result<()> {
    let scan = scan_store(cfg)?;
    let Some(progress) = scan.load_or_recover().context("loading scan progress")? else {
        bail!(
            "no scan results at {}; run `tortoise scan` first",
            scan.path().display()
        );
    };

    let archive = match &cfg.populate.archive {
        Some(path) => load_archive(path)
            .with_context(|| format!("reading archive {}", path.display()))?,
        None => HashSet::new(),
    };

    let mut state = open_queue(cfg)?;
    let report = populate(
        &state.queue,
        &progress,
        &cfg.populate.reference_template,
        &archive,
        chrono::Utc::now(),
    );
    state
        .store
        .save(&state.queue.snapshot())
        .context("saving queue")?;

    println!(
        "Queued {} new job(s); {} already queued, {} already completed, {} in archive.",
        report.added, report.existing, report.already_completed, report.archived
    );
    Ok(())
}
