//! Fixed, human-readable recommendations per category.

use super::{CategoryStats, ErrorCategory};

/// Line reported for a run with no errors at all.
pub const NO_ERRORS: &str = "No errors detected: run completed successfully.";

/// Recommendation for `count` occurrences of `category`.
pub fn recommendation(category: ErrorCategory, count: u64) -> String {
    let advice = match category {
        ErrorCategory::GeoRestricted => {
            "not available from this region. Retry through an egress in a different country."
        }
        ErrorCategory::AgeRestricted => {
            "behind an age gate. Refresh the collaborator's cookies from an account that has passed age verification."
        }
        ErrorCategory::MembersOnly => {
            "restricted to channel members. They can only be fetched with a member account."
        }
        ErrorCategory::PrivateOrDeleted => {
            "private or deleted. This is expected for older sources and needs no action."
        }
        ErrorCategory::RateLimited => {
            "rate limited. Raise pacing.base_interval_secs (180-300s is safe for long scans) or use a different egress."
        }
        ErrorCategory::TokenAcquisitionFailed => {
            "failed to acquire an access token. Check that the token provider is reachable; identity rotation will prefer clients that need none."
        }
        ErrorCategory::AuthenticationRequired => {
            "require login. Refresh the cookies used by the collaborator and retry."
        }
        ErrorCategory::Unknown => "unclassified. Inspect the error log for details.",
    };
    format!("{} ({}): {}", category.label(), count, advice)
}

/// Recommendations for a classifier report, in report order.
pub fn recommendations(report: &[(ErrorCategory, CategoryStats)]) -> Vec<String> {
    if report.iter().all(|(_, s)| s.count == 0) {
        return vec![NO_ERRORS.to_string()];
    }
    report
        .iter()
        .filter(|(_, s)| s.count > 0)
        .map(|(c, s)| recommendation(*c, s.count))
        .collect()
}
