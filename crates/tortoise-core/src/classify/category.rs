use std::fmt;

use serde::{Deserialize, Serialize};

/// Closed set of failure causes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    GeoRestricted,
    AgeRestricted,
    MembersOnly,
    PrivateOrDeleted,
    RateLimited,
    TokenAcquisitionFailed,
    AuthenticationRequired,
    Unknown,
}

impl ErrorCategory {
    pub const ALL: [ErrorCategory; 8] = [
        ErrorCategory::GeoRestricted,
        ErrorCategory::AgeRestricted,
        ErrorCategory::MembersOnly,
        ErrorCategory::PrivateOrDeleted,
        ErrorCategory::RateLimited,
        ErrorCategory::TokenAcquisitionFailed,
        ErrorCategory::AuthenticationRequired,
        ErrorCategory::Unknown,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCategory::GeoRestricted => "geo_restricted",
            ErrorCategory::AgeRestricted => "age_restricted",
            ErrorCategory::MembersOnly => "members_only",
            ErrorCategory::PrivateOrDeleted => "private_or_deleted",
            ErrorCategory::RateLimited => "rate_limited",
            ErrorCategory::TokenAcquisitionFailed => "token_acquisition_failed",
            ErrorCategory::AuthenticationRequired => "authentication_required",
            ErrorCategory::Unknown => "unknown",
        }
    }

    /// Human-readable label for reports.
    pub fn label(self) -> &'static str {
        match self {
            ErrorCategory::GeoRestricted => "Geo-restricted",
            ErrorCategory::AgeRestricted => "Age-restricted",
            ErrorCategory::MembersOnly => "Members only",
            ErrorCategory::PrivateOrDeleted => "Private or deleted",
            ErrorCategory::RateLimited => "Rate limited",
            ErrorCategory::TokenAcquisitionFailed => "Token acquisition failed",
            ErrorCategory::AuthenticationRequired => "Authentication required",
            ErrorCategory::Unknown => "Unknown",
        }
    }

    /// Whether a failure of this kind signals server-side throttling and is
    /// worth re-attempting with another access identity.
    pub fn is_retryable(self) -> bool {
        matches!(
            self,
            ErrorCategory::RateLimited | ErrorCategory::TokenAcquisitionFailed
        )
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
