//! `tortoise status` – show queue and scan state.

use anyhow::Result;
use tortoise_core::config::TortoiseConfig;
use tortoise_core::queue::JobState;

use super::state::{open_queue, scan_store};

pub fn run_status(cfg: &TortoiseConfig, limit: usize) -> Result<()> {
    if let Some(progress) = scan_store(cfg)?.load_or_recover()? {
        println!(
            "Scan: {}/{} source(s) complete, {} item(s) discovered",
            progress.completed_sources(),
            progress.sources.len(),
            progress.total_items()
        );
    } else {
        println!("Scan: no progress recorded.");
    }

    let state = open_queue(cfg)?;
    let summary = state.queue.status_summary();
    if summary.total() == 0 {
        println!("Queue: empty.");
        return Ok(());
    }
    println!("{:<12} {}", "STATE", "JOBS");
    for s in JobState::ALL {
        println!("{:<12} {}", s.as_str(), summary.count(s));
    }

    for s in [JobState::Retrying, JobState::Failed] {
        let jobs = state.queue.jobs_in_state(s);
        if jobs.is_empty() {
            continue;
        }
        println!();
        println!("{} ({}):", s, jobs.len());
        for j in jobs.iter().take(limit) {
            let error = j
                .last_error
                .as_ref()
                .map(|e| format!("[{}] {}", e.category, e.message))
                .unwrap_or_else(|| "-".to_string());
            println!(
                "  {:<14} attempts={} next={} {}",
                j.identifier,
                j.attempt_count,
                j.next_eligible_time.format("%Y-%m-%d %H:%M:%S"),
                error
            );
        }
        if jobs.len() > limit {
            println!("  ... and {} more", jobs.len() - limit);
        }
    }
    if let Some(at) = state.queue.next_wakeup() {
        println!();
        println!("Next retry eligible at {}", at.format("%Y-%m-%d %H:%M:%S UTC"));
    }
    Ok(())
}
