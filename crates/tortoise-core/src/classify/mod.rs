//! Error classification and per-run error statistics.
//!
//! Raw failures (status code + message text) are mapped onto a closed
//! taxonomy by an ordered rule table. The classifier also accumulates one
//! [`ErrorRecord`] per observation and per-category aggregates used for the
//! end-of-run report and its recommendations.

mod category;
mod classifier;
mod recommend;
mod rules;
mod sink;

pub use category::ErrorCategory;
pub use classifier::{
    CategoryStats, ErrorClassifier, ErrorRecord, MAX_MESSAGE_LEN, MAX_SAMPLES,
};
pub use recommend::{recommendation, recommendations, NO_ERRORS};
pub use rules::{classify, Matcher, Rule, RULES};
pub use sink::ErrorLog;
