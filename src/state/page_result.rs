//! Outcome of fetching a single listing page

use crate::state::ItemId;
use num_bigint::BigInt;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Why a page fetch did not produce a usable listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum FailureKind {
    /// HTTP 404: the page definitively does not exist
    NotFound,

    /// Any other non-200 status
    HttpStatus(u16),

    /// The request timed out
    Timeout,

    /// Connection refused, reset, DNS failure and similar
    Connection(String),

    /// A 200 response that looks like an error page and carries no identifiers
    ErrorPage,

    /// The response body could not be read
    Body(String),
}

impl FailureKind {
    /// Returns true if the failure is worth retrying after a backoff
    ///
    /// | Failure | Retried |
    /// |---------|---------|
    /// | Timeout, connection error | yes |
    /// | HTTP 5xx | yes |
    /// | HTTP 404 | no |
    /// | Other statuses, error pages, unreadable bodies | no |
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Timeout | Self::Connection(_) => true,
            Self::HttpStatus(code) => *code >= 500,
            Self::NotFound | Self::ErrorPage | Self::Body(_) => false,
        }
    }

    /// Returns true for malformed or error-flagged responses
    pub fn is_server_error(&self) -> bool {
        match self {
            Self::ErrorPage | Self::Body(_) => true,
            Self::HttpStatus(code) => *code < 500,
            _ => false,
        }
    }

    /// Short label used in logs and reports
    pub fn label(&self) -> &'static str {
        match self {
            Self::NotFound => "not_found",
            Self::HttpStatus(_) => "http_status",
            Self::Timeout => "timeout",
            Self::Connection(_) => "connection",
            Self::ErrorPage => "error_page",
            Self::Body(_) => "body",
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound => write!(f, "HTTP 404"),
            Self::HttpStatus(code) => write!(f, "HTTP {}", code),
            Self::Timeout => write!(f, "request timeout"),
            Self::Connection(error) => write!(f, "connection error: {}", error),
            Self::ErrorPage => write!(f, "error page without identifiers"),
            Self::Body(error) => write!(f, "unreadable body: {}", error),
        }
    }
}

/// The tri-state result of one page request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageOutcome {
    /// The page answered and listed at least one identifier
    Success(BTreeSet<ItemId>),

    /// The page answered but listed nothing
    EmptySuccess,

    /// The page did not answer usefully
    Failure(FailureKind),
}

impl PageOutcome {
    /// Builds a successful outcome, collapsing an empty set to `EmptySuccess`
    pub fn from_items<I>(items: I) -> Self
    where
        I: IntoIterator<Item = ItemId>,
    {
        let items: BTreeSet<ItemId> = items.into_iter().collect();
        if items.is_empty() {
            Self::EmptySuccess
        } else {
            Self::Success(items)
        }
    }

    /// A page "works" when the service answered it, even with no items
    pub fn is_working(&self) -> bool {
        !matches!(self, Self::Failure(_))
    }

    pub fn item_count(&self) -> usize {
        match self {
            Self::Success(items) => items.len(),
            _ => 0,
        }
    }

    pub fn failure(&self) -> Option<&FailureKind> {
        match self {
            Self::Failure(failure) => Some(failure),
            _ => None,
        }
    }
}

/// Immutable record of one page fetch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageResult {
    page: BigInt,
    outcome: PageOutcome,
}

impl PageResult {
    pub fn new(page: BigInt, outcome: PageOutcome) -> Self {
        Self { page, outcome }
    }

    pub fn page(&self) -> &BigInt {
        &self.page
    }

    pub fn outcome(&self) -> &PageOutcome {
        &self.outcome
    }

    pub fn into_outcome(self) -> PageOutcome {
        self.outcome
    }
}

/// Serializes a `BigInt` page number as a decimal string
///
/// JSON numbers lose precision past 2^53 in most consumers, and the boundary
/// search routinely probes far beyond that.
pub mod bigint_string {
    use num_bigint::BigInt;
    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &BigInt, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<BigInt, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(D::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        assert!(FailureKind::Timeout.is_transient());
        assert!(FailureKind::Connection("reset".to_string()).is_transient());
        assert!(FailureKind::HttpStatus(503).is_transient());
        assert!(!FailureKind::NotFound.is_transient());
        assert!(!FailureKind::HttpStatus(403).is_transient());
        assert!(!FailureKind::ErrorPage.is_transient());
    }

    #[test]
    fn test_server_error_classification() {
        assert!(FailureKind::ErrorPage.is_server_error());
        assert!(FailureKind::HttpStatus(403).is_server_error());
        assert!(!FailureKind::HttpStatus(502).is_server_error());
        assert!(!FailureKind::NotFound.is_server_error());
    }

    #[test]
    fn test_from_items_collapses_empty() {
        assert_eq!(
            PageOutcome::from_items(Vec::<ItemId>::new()),
            PageOutcome::EmptySuccess
        );
        let outcome = PageOutcome::from_items(vec![ItemId::new("A"), ItemId::new("a")]);
        assert_eq!(outcome.item_count(), 1);
    }

    #[test]
    fn test_empty_success_is_working() {
        assert!(PageOutcome::EmptySuccess.is_working());
        assert!(!PageOutcome::Failure(FailureKind::NotFound).is_working());
    }

    #[test]
    fn test_failure_kind_json_shape() {
        let json = serde_json::to_string(&FailureKind::HttpStatus(502)).unwrap();
        assert_eq!(json, r#"{"kind":"http_status","detail":502}"#);
        let back: FailureKind = serde_json::from_str(r#"{"kind":"not_found"}"#).unwrap();
        assert_eq!(back, FailureKind::NotFound);
    }
}
