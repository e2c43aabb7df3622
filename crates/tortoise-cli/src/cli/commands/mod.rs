//! CLI command handlers, one per file.

mod clear;
mod health;
mod populate;
mod run;
mod scan;
mod state;
mod status;

pub use clear::run_clear;
pub use health::run_health;
pub use populate::run_populate;
pub use run::run_downloads;
pub use scan::run_scan;
pub use status::run_status;
