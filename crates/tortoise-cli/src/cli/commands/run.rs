//! `tortoise run` – work through the download queue.

use anyhow::Result;
use tortoise_core::config::TortoiseConfig;
use tortoise_core::orchestrator::DownloadOptions;

use super::state::{open_queue, orchestrator};

pub async fn run_downloads(cfg: &TortoiseConfig, workers: Option<usize>, no_wait: bool) -> Result<()> {
    let state = open_queue(cfg)?;
    if !state.queue.has_unfinished() {
        println!("Nothing to do: no pending or retrying jobs.");
        return Ok(());
    }
    let options = DownloadOptions {
        workers: workers.unwrap_or(cfg.queue.workers).max(1),
        wait_for_retries: cfg.queue.wait_for_retries && !no_wait,
    };
    if options.workers > 1 {
        tracing::warn!(workers = options.workers, "running more than one worker raises the risk of being throttled");
    }

    let orch = orchestrator(cfg)?;
    let report = orch.run_downloads(state.queue, state.store, options).await;
    print!("{}", report.render());
    Ok(())
}
