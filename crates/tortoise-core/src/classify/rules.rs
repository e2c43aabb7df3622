//! Ordered, data-driven classification rules.
//!
//! Rules are evaluated top to bottom and the first match wins. Text rules come
//! before status rules so that specific message text (e.g. an age gate served
//! with 403) beats the generic reading of the status code.

use crate::retry::OperationFailure;

use super::ErrorCategory;

/// One predicate over a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Matcher {
    /// Exact status code.
    Status(u16),
    /// Case-insensitive substring of the message.
    Contains(&'static str),
    /// Case-insensitive whole word of the message.
    Word(&'static str),
}

/// A category and the matchers that select it (any one suffices).
#[derive(Debug, Clone, Copy)]
pub struct Rule {
    pub category: ErrorCategory,
    pub matchers: &'static [Matcher],
}

use Matcher::{Contains, Status, Word};

pub const RULES: &[Rule] = &[
    Rule {
        category: ErrorCategory::GeoRestricted,
        matchers: &[
            Contains("not available in your country"),
            Contains("not available in your location"),
            Contains("in your region"),
            Contains("geo restrict"),
            Contains("geo-restrict"),
            Contains("georestrict"),
        ],
    },
    Rule {
        category: ErrorCategory::AgeRestricted,
        matchers: &[
            Contains("confirm your age"),
            Contains("age-restricted"),
            Contains("age restricted"),
            Contains("age verification"),
            Contains("age-gated"),
            Contains("inappropriate for some users"),
            Word("age"),
        ],
    },
    Rule {
        category: ErrorCategory::MembersOnly,
        matchers: &[
            Contains("members only"),
            Contains("members-only"),
            Contains("channel members"),
            Contains("join this channel"),
            Word("membership"),
        ],
    },
    Rule {
        category: ErrorCategory::PrivateOrDeleted,
        matchers: &[
            Contains("private video"),
            Contains("video is private"),
            Contains("has been removed"),
            Contains("no longer available"),
            Contains("uploader has not made"),
            Contains("has been terminated"),
            Word("deleted"),
        ],
    },
    Rule {
        category: ErrorCategory::TokenAcquisitionFailed,
        matchers: &[
            Contains("po token"),
            Contains("po_token"),
            Contains("potoken"),
            Contains("proof of origin"),
            Contains("token provider"),
        ],
    },
    Rule {
        category: ErrorCategory::RateLimited,
        matchers: &[
            Contains("too many requests"),
            Contains("rate limit"),
            Contains("rate-limit"),
            Contains("ratelimit"),
            Contains("not a bot"),
            Contains("http error 429"),
            Contains("http error 403"),
            Contains("video unavailable"),
            Contains("content isn't available"),
            Contains("content isn’t available"),
            Contains("content is not available"),
            Word("forbidden"),
        ],
    },
    Rule {
        category: ErrorCategory::AuthenticationRequired,
        matchers: &[
            Contains("login required"),
            Contains("log in"),
            Contains("sign in"),
            Contains("authentication"),
            Contains("cookies"),
        ],
    },
    Rule {
        category: ErrorCategory::RateLimited,
        matchers: &[Status(429), Status(403)],
    },
    Rule {
        category: ErrorCategory::PrivateOrDeleted,
        matchers: &[Status(410), Status(404)],
    },
    Rule {
        category: ErrorCategory::AuthenticationRequired,
        matchers: &[Status(401), Status(407)],
    },
    Rule {
        category: ErrorCategory::GeoRestricted,
        matchers: &[Status(451)],
    },
];

impl Matcher {
    fn matches(&self, status: Option<u16>, lowered: &str, words: &[&str]) -> bool {
        match *self {
            Matcher::Status(code) => status == Some(code),
            Matcher::Contains(needle) => lowered.contains(needle),
            Matcher::Word(word) => words.iter().any(|w| *w == word),
        }
    }
}

impl Rule {
    fn matches(&self, status: Option<u16>, lowered: &str, words: &[&str]) -> bool {
        self.matchers
            .iter()
            .any(|m| m.matches(status, lowered, words))
    }
}

/// Classify a failure against [`RULES`]. Falls through to `Unknown`.
pub fn classify(failure: &OperationFailure) -> ErrorCategory {
    classify_with(RULES, failure)
}

pub(super) fn classify_with(rules: &[Rule], failure: &OperationFailure) -> ErrorCategory {
    let lowered = failure.message.to_lowercase();
    let words: Vec<&str> = lowered
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .collect();
    rules
        .iter()
        .find(|r| r.matches(failure.status, &lowered, &words))
        .map(|r| r.category)
        .unwrap_or(ErrorCategory::Unknown)
}
