use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::collaborator::CommandCollaborator;
use crate::pacing::{PacingController, DEFAULT_IDENTITIES};
use crate::retry::{BackoffPolicy, SubAttemptPolicy, PACING_CAP_MULTIPLIER};

/// Longest accepted inter-request interval (one day).
pub const MAX_PACING_INTERVAL_SECS: f64 = 86_400.0;

/// Longest accepted job retry ceiling (thirty days).
pub const MAX_JOB_BACKOFF_SECS: u64 = 30 * 86_400;

/// Rejected configuration value.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("invalid config value for {field}: {reason}")]
pub struct ConfigError {
    pub field: &'static str,
    pub reason: String,
}

impl ConfigError {
    fn new(field: &'static str, reason: impl Into<String>) -> Self {
        Self {
            field,
            reason: reason.into(),
        }
    }
}

/// Request pacing (`[pacing]`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PacingConfig {
    /// Seconds between operations when nothing is failing.
    pub base_interval_secs: f64,
    /// Pacing delay ceiling as a multiple of the base interval.
    pub cap_multiplier: f64,
    /// Random spread applied to each pacing sleep (0.2 = ±20%).
    pub jitter_fraction: f64,
    /// Access identities, in rotation order.
    pub identities: Vec<String>,
    /// Attempts per unit of work on throttling errors, including the first.
    pub sub_attempts: u32,
    /// Waits between those attempts, in seconds.
    pub sub_attempt_delays_secs: Vec<u64>,
}

impl Default for PacingConfig {
    fn default() -> Self {
        Self {
            base_interval_secs: 60.0,
            cap_multiplier: PACING_CAP_MULTIPLIER,
            jitter_fraction: 0.2,
            identities: DEFAULT_IDENTITIES.iter().map(|s| s.to_string()).collect(),
            sub_attempts: 3,
            sub_attempt_delays_secs: vec![5, 10, 15],
        }
    }
}

/// Job queue and download run (`[queue]`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueConfig {
    pub max_attempts: u32,
    pub backoff_base_secs: u64,
    pub backoff_cap_secs: u64,
    /// Concurrent download workers. Keep at 1 unless you know the platform tolerates more.
    pub workers: usize,
    /// Keep running until retrying jobs become eligible instead of exiting.
    pub wait_for_retries: bool,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            backoff_base_secs: 60,
            backoff_cap_secs: 3600,
            workers: 1,
            wait_for_retries: true,
        }
    }
}

/// Persistence (`[checkpoint]`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CheckpointConfig {
    /// Seconds between time-triggered scan checkpoints; 0 disables them.
    pub interval_secs: u64,
    /// Directory for state files (default: XDG state dir).
    pub state_dir: Option<PathBuf>,
    pub queue_file: String,
    pub scan_file: String,
    pub error_log: String,
}

impl Default for CheckpointConfig {
    fn default() -> Self {
        Self {
            interval_secs: 300,
            state_dir: None,
            queue_file: "queue.json".to_string(),
            scan_file: "scan.json".to_string(),
            error_log: "errors.log".to_string(),
        }
    }
}

/// External program (`[collaborator]`). Arguments may use `{source}` and `{identity}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CollaboratorConfig {
    pub program: String,
    pub perform_args: Vec<String>,
    pub enumerate_args: Vec<String>,
    /// Target of `tortoise health` when none is given.
    pub health_reference: String,
}

impl Default for CollaboratorConfig {
    fn default() -> Self {
        let client = "youtube:player_client={identity}".to_string();
        Self {
            program: "yt-dlp".to_string(),
            perform_args: vec![
                "--no-progress".to_string(),
                "--extractor-args".to_string(),
                client.clone(),
                "{source}".to_string(),
            ],
            enumerate_args: vec![
                "--flat-playlist".to_string(),
                "--print".to_string(),
                "%(id)s\t%(title)s".to_string(),
                "--extractor-args".to_string(),
                client,
                "{source}".to_string(),
            ],
            health_reference: "https://www.youtube.com/watch?v=dQw4w9WgXcQ".to_string(),
        }
    }
}

/// Queue population (`[populate]`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PopulateConfig {
    /// `{id}` is replaced by the discovered identifier.
    pub reference_template: String,
    /// Download archive whose identifiers are never queued.
    pub archive: Option<PathBuf>,
}

impl Default for PopulateConfig {
    fn default() -> Self {
        Self {
            reference_template: "{id}".to_string(),
            archive: None,
        }
    }
}

/// Global configuration loaded from `~/.config/tortoise/config.toml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TortoiseConfig {
    pub pacing: PacingConfig,
    pub queue: QueueConfig,
    pub checkpoint: CheckpointConfig,
    pub collaborator: CollaboratorConfig,
    pub populate: PopulateConfig,
}

impl TortoiseConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let p = &self.pacing;
        if !p.base_interval_secs.is_finite() || p.base_interval_secs <= 0.0 {
            return Err(ConfigError::new("pacing.base_interval_secs", "must be a positive number"));
        }
        if p.base_interval_secs > MAX_PACING_INTERVAL_SECS {
            return Err(ConfigError::new(
                "pacing.base_interval_secs",
                format!("must be at most {MAX_PACING_INTERVAL_SECS} seconds"),
            ));
        }
        if !p.cap_multiplier.is_finite() || p.cap_multiplier < 1.0 {
            return Err(ConfigError::new("pacing.cap_multiplier", "must be at least 1"));
        }
        if !p.jitter_fraction.is_finite() || !(0.0..1.0).contains(&p.jitter_fraction) {
            return Err(ConfigError::new("pacing.jitter_fraction", "must be in [0, 1)"));
        }
        if p.identities.is_empty() || p.identities.iter().any(|i| i.trim().is_empty()) {
            return Err(ConfigError::new("pacing.identities", "must list at least one non-empty identity"));
        }
        if p.sub_attempts == 0 {
            return Err(ConfigError::new("pacing.sub_attempts", "must be at least 1"));
        }
        let q = &self.queue;
        if q.max_attempts == 0 {
            return Err(ConfigError::new("queue.max_attempts", "must be at least 1"));
        }
        if q.backoff_base_secs == 0 {
            return Err(ConfigError::new("queue.backoff_base_secs", "must be positive"));
        }
        if q.backoff_cap_secs < q.backoff_base_secs {
            return Err(ConfigError::new(
                "queue.backoff_cap_secs",
                format!("must be at least backoff_base_secs ({})", q.backoff_base_secs),
            ));
        }
        if q.backoff_cap_secs > MAX_JOB_BACKOFF_SECS {
            return Err(ConfigError::new(
                "queue.backoff_cap_secs",
                format!("must be at most {MAX_JOB_BACKOFF_SECS} seconds"),
            ));
        }
        if q.workers == 0 {
            return Err(ConfigError::new("queue.workers", "must be at least 1"));
        }
        if self.collaborator.program.trim().is_empty() {
            return Err(ConfigError::new("collaborator.program", "must not be empty"));
        }
        if self.collaborator.health_reference.trim().is_empty() {
            return Err(ConfigError::new("collaborator.health_reference", "must not be empty"));
        }
        Ok(())
    }

    pub fn job_backoff(&self) -> BackoffPolicy {
        BackoffPolicy::job_retry(
            Duration::from_secs(self.queue.backoff_base_secs),
            Duration::from_secs(self.queue.backoff_cap_secs),
        )
    }

    pub fn pacing_backoff(&self) -> BackoffPolicy {
        BackoffPolicy::new(
            Duration::from_secs_f64(self.pacing.base_interval_secs),
            self.pacing.cap_multiplier,
        )
    }

    pub fn sub_attempt_policy(&self) -> SubAttemptPolicy {
        SubAttemptPolicy {
            max_attempts: self.pacing.sub_attempts,
            delays: self
                .pacing
                .sub_attempt_delays_secs
                .iter()
                .map(|s| Duration::from_secs(*s))
                .collect(),
        }
    }

    /// Fresh pacing state for one run.
    pub fn pacing_controller(&self) -> PacingController {
        PacingController::new(
            self.pacing_backoff(),
            self.pacing.identities.clone(),
            self.sub_attempt_policy(),
        )
    }

    pub fn checkpoint_interval(&self) -> Duration {
        Duration::from_secs(self.checkpoint.interval_secs)
    }

    pub fn collaborator(&self) -> CommandCollaborator {
        CommandCollaborator::new(
            self.collaborator.program.clone(),
            self.collaborator.perform_args.clone(),
            self.collaborator.enumerate_args.clone(),
        )
    }

    /// Directory holding the queue, scan and error-log files.
    pub fn state_dir(&self) -> Result<PathBuf> {
        match &self.checkpoint.state_dir {
            Some(dir) => Ok(dir.clone()),
            None => default_state_dir(),
        }
    }

    pub fn queue_path(&self) -> Result<PathBuf> {
        Ok(self.state_dir()?.join(&self.checkpoint.queue_file))
    }

    pub fn scan_path(&self) -> Result<PathBuf> {
        Ok(self.state_dir()?.join(&self.checkpoint.scan_file))
    }

    pub fn error_log_path(&self) -> Result<PathBuf> {
        Ok(self.state_dir()?.join(&self.checkpoint.error_log))
    }
}

pub fn default_state_dir() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("tortoise")?;
    Ok(xdg_dirs.get_state_home().join("tortoise"))
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("tortoise")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from the default location, creating a default file if none exists.
pub fn load_or_init() -> Result<TortoiseConfig> {
    load_or_init_at(&config_path()?)
}

/// Load and validate configuration from `path`, writing defaults there first if it is missing.
pub fn load_or_init_at(path: &Path) -> Result<TortoiseConfig> {
    if !path.exists() {
        let default_cfg = TortoiseConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, toml).with_context(|| format!("writing {}", path.display()))?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }

    let data = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let cfg: TortoiseConfig =
        toml::from_str(&data).with_context(|| format!("parsing {}", path.display()))?;
    cfg.validate()?;
    Ok(cfg)
}
