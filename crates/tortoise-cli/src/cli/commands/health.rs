//! `tortoise health [<reference>]` – one operation against a known target.

use anyhow::{bail, Result};
use tortoise_core::config::TortoiseConfig;
use tortoise_core::orchestrator::HealthOutcome;

use super::state::orchestrator;

pub async fn run_health(cfg: &TortoiseConfig, reference: Option<&str>) -> Result<()> {
    let reference = reference.unwrap_or(cfg.collaborator.health_reference.as_str());
    let orch = orchestrator(cfg)?;
    let report = orch.health_check(reference).await;
    print!("{}", report.render());
    match report.outcome {
        HealthOutcome::Healthy => Ok(()),
        HealthOutcome::Interrupted => bail!("health check interrupted"),
        HealthOutcome::Failed { category, .. } => bail!("health check failed: {}", category),
    }
}
