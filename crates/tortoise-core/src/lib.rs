pub mod config;
pub mod logging;

pub mod archive;
pub mod checkpoint;
pub mod classify;
pub mod collaborator;
pub mod control;
pub mod orchestrator;
pub mod pacing;
pub mod queue;
pub mod retry;
