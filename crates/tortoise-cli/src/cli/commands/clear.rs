//! `tortoise clear` – empty the queue (and optionally scan progress).

use anyhow::{Context, Result};
use tortoise_core::checkpoint::ScanProgress;
use tortoise_core::config::TortoiseConfig;

use super::state::{open_queue, scan_store};

pub fn run_clear(cfg: &TortoiseConfig, scan: bool) -> Result<()> {
    let mut state = open_queue(cfg)?;
    let removed = state.queue.len();
    state.queue.clear();
    // The first save keeps the old queue as `<name>.backup`.
    state.store.save(&state.queue.snapshot()).context("saving queue")?;
    println!("Removed {} job(s) from the queue.", removed);

    if scan {
        let mut store = scan_store(cfg)?;
        store.save(&ScanProgress::new()).context("saving scan progress")?;
        println!("Scan progress reset.");
    }
    Ok(())
}
