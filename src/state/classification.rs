/// Page classification definitions
///
/// Every committed page receives exactly one of these verdicts; call sites
/// match on the enum instead of testing loose flags.
use crate::state::FailureKind;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Represents how a page's content relates to everything seen before it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PageClassification {
    /// The page's fingerprint matches an earlier page exactly
    TrueWrap { origin: i64 },

    /// Every item was already known, but the combination is new
    Redundant,

    /// The page contributed at least one unseen item
    New { count: usize },

    /// The request succeeded and listed nothing
    Empty,

    /// The request failed
    Failed { reason: FailureKind },
}

impl PageClassification {
    /// Returns the number of items this page added to the seen set
    pub fn new_count(&self) -> usize {
        match self {
            Self::New { count } => *count,
            _ => 0,
        }
    }

    /// Returns true if the page answered (anything but `Failed`)
    pub fn is_success(&self) -> bool {
        !matches!(self, Self::Failed { .. })
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }

    /// Returns the page this one duplicates, if it is a true wrap
    pub fn wraps_to(&self) -> Option<i64> {
        match self {
            Self::TrueWrap { origin } => Some(*origin),
            _ => None,
        }
    }

    /// Short label used in logs and summaries
    pub fn label(&self) -> &'static str {
        match self {
            Self::TrueWrap { .. } => "true_wrap",
            Self::Redundant => "redundant",
            Self::New { .. } => "new",
            Self::Empty => "empty",
            Self::Failed { .. } => "failed",
        }
    }
}

impl fmt::Display for PageClassification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TrueWrap { origin } => write!(f, "true wrap -> page {}", origin),
            Self::Redundant => write!(f, "redundant"),
            Self::New { count } => write!(f, "+{} new", count),
            Self::Empty => write!(f, "empty"),
            Self::Failed { reason } => write!(f, "failed ({})", reason),
        }
    }
}
