//! Boundary search around a known-good anchor page
//!
//! The locator walks away from the anchor with exponentially growing steps
//! until a page fails, narrows the gap with binary search, then re-tests both
//! ends of the final pair once. Page numbers are arbitrary precision, and the
//! search stops at an explicit magnitude ceiling instead of overflowing.

use crate::crawler::fetcher::PageFetcher;
use crate::state::{bigint_string, PageOutcome};
use num_bigint::{BigInt, BigUint, Sign};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Which way from the anchor the search moves
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    #[default]
    Up,
    Down,
}

impl Direction {
    fn sign(self) -> Sign {
        match self {
            Direction::Up => Sign::Plus,
            Direction::Down => Sign::Minus,
        }
    }

    fn unit(self) -> BigInt {
        match self {
            Direction::Up => BigInt::from(1),
            Direction::Down => BigInt::from(-1),
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Up => write!(f, "up"),
            Direction::Down => write!(f, "down"),
        }
    }
}

impl FromStr for Direction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "up" | "+" | "+1" => Ok(Direction::Up),
            "down" | "-" | "-1" => Ok(Direction::Down),
            other => Err(format!("invalid direction '{}', expected 'up' or 'down'", other)),
        }
    }
}

/// Search phases, in the order they run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchPhase {
    Anchor,
    Exponential,
    Binary,
    Confirm,
}

/// One request made during a search
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProbeRecord {
    pub phase: SearchPhase,
    #[serde(with = "bigint_string")]
    pub page: BigInt,
    pub working: bool,
    pub outcome: String,
}

/// Result of re-testing the final pair
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Confirmation {
    pub last_working_ok: bool,
    pub first_failing_failed: bool,
}

impl Confirmation {
    /// True if both re-tests agreed with the search
    pub fn is_stable(&self) -> bool {
        self.last_working_ok && self.first_failing_failed
    }
}

/// How a search ended
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BoundaryOutcome {
    /// An adjacent (working, failing) pair was found
    Found {
        #[serde(with = "bigint_string")]
        last_working: BigInt,
        #[serde(with = "bigint_string")]
        first_failing: BigInt,
        confirmation: Confirmation,
    },
    /// Every probe up to the ceiling worked
    NoBoundary {
        #[serde(with = "bigint_string")]
        highest_working: BigInt,
    },
}

/// Everything a search produced, ready to be written as JSON
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundaryReport {
    #[serde(with = "bigint_string")]
    pub anchor: BigInt,
    pub direction: Direction,
    #[serde(with = "bigint_string")]
    pub ceiling: BigInt,
    pub outcome: BoundaryOutcome,
    pub probes: Vec<ProbeRecord>,
}

impl BoundaryReport {
    /// The (last working, first failing) pair, if one was found
    pub fn pair(&self) -> Option<(&BigInt, &BigInt)> {
        match &self.outcome {
            BoundaryOutcome::Found {
                last_working,
                first_failing,
                ..
            } => Some((last_working, first_failing)),
            BoundaryOutcome::NoBoundary { .. } => None,
        }
    }

    pub fn request_count(&self) -> usize {
        self.probes.len()
    }
}

/// Errors that stop a search before it starts
#[derive(Debug, Error, PartialEq, Eq)]
pub enum LocatorError {
    #[error("Anchor page {anchor} does not work ({outcome})")]
    AnchorNotWorking { anchor: BigInt, outcome: String },
}

/// Finds where a paged listing stops answering
///
/// A page is "working" if the fetch succeeded, with or without items.
pub struct BoundaryLocator<'a, F> {
    fetcher: &'a F,
    ceiling: BigInt,
}

impl<'a, F: PageFetcher> BoundaryLocator<'a, F> {
    pub fn new(fetcher: &'a F) -> Self {
        Self {
            fetcher,
            ceiling: default_ceiling(),
        }
    }

    /// Sets the largest page magnitude the search may request
    pub fn with_ceiling(mut self, ceiling: BigInt) -> Self {
        self.ceiling = ceiling;
        self
    }

    pub fn ceiling(&self) -> &BigInt {
        &self.ceiling
    }

    /// Searches from `anchor` in `direction`
    ///
    /// # Errors
    ///
    /// Returns [`LocatorError::AnchorNotWorking`] if the anchor itself fails.
    pub async fn locate(
        &self,
        anchor: BigInt,
        direction: Direction,
    ) -> Result<BoundaryReport, LocatorError> {
        tracing::info!(
            "Searching for boundary from page {} going {} (ceiling {})",
            anchor,
            direction,
            self.ceiling
        );
        let mut probes = Vec::new();

        if !self.test(&anchor, SearchPhase::Anchor, &mut probes).await {
            let outcome = probes
                .last()
                .map(|p: &ProbeRecord| p.outcome.clone())
                .unwrap_or_default();
            return Err(LocatorError::AnchorNotWorking { anchor, outcome });
        }

        // Exponential phase
        let mut last_working = anchor.clone();
        let scales = anchor.sign() == direction.sign();
        let mut k: u32 = 0;
        let mut first_failing = loop {
            let candidate = if scales {
                &anchor << (k as usize + 1)
            } else {
                &anchor + direction.unit() * (BigInt::from(1) << k as usize)
            };
            k += 1;

            if candidate.magnitude() > self.ceiling.magnitude() {
                // Last step lands exactly on the ceiling
                let limit = direction.unit() * BigInt::from(self.ceiling.magnitude().clone());
                let beyond = match direction {
                    Direction::Up => limit > last_working,
                    Direction::Down => limit < last_working,
                };
                if beyond {
                    if !self.test(&limit, SearchPhase::Exponential, &mut probes).await {
                        break limit;
                    }
                    last_working = limit;
                }
                tracing::warn!(
                    "No failing page found up to the ceiling; highest working page is {}",
                    last_working
                );
                return Ok(self.report(
                    anchor,
                    direction,
                    BoundaryOutcome::NoBoundary {
                        highest_working: last_working,
                    },
                    probes,
                ));
            }

            if self.test(&candidate, SearchPhase::Exponential, &mut probes).await {
                last_working = candidate;
            } else {
                break candidate;
            }
        };
        tracing::info!(
            "Bracketed boundary between {} and {}",
            last_working,
            first_failing
        );

        // Binary phase
        while (&first_failing - &last_working).magnitude() > &BigUint::from(1u8) {
            let mid: BigInt = (&last_working + &first_failing) >> 1usize;
            if self.test(&mid, SearchPhase::Binary, &mut probes).await {
                last_working = mid;
            } else {
                first_failing = mid;
            }
        }

        // Confirm phase
        let last_working_ok = self.test(&last_working, SearchPhase::Confirm, &mut probes).await;
        let first_failing_failed =
            !self.test(&first_failing, SearchPhase::Confirm, &mut probes).await;
        let confirmation = Confirmation {
            last_working_ok,
            first_failing_failed,
        };

        if confirmation.is_stable() {
            tracing::info!(
                "Boundary: last working {}, first failing {}",
                last_working,
                first_failing
            );
        } else {
            tracing::warn!(
                "Boundary {} / {} did not confirm (last working ok: {}, first failing failed: {})",
                last_working,
                first_failing,
                last_working_ok,
                first_failing_failed
            );
        }

        Ok(self.report(
            anchor,
            direction,
            BoundaryOutcome::Found {
                last_working,
                first_failing,
                confirmation,
            },
            probes,
        ))
    }

    async fn test(&self, page: &BigInt, phase: SearchPhase, probes: &mut Vec<ProbeRecord>) -> bool {
        let result = self.fetcher.fetch(page).await;
        let working = result.outcome().is_working();
        tracing::debug!(
            "{:?} probe page {}: {}",
            phase,
            page,
            if working { "working" } else { "failing" }
        );
        probes.push(ProbeRecord {
            phase,
            page: page.clone(),
            working,
            outcome: describe(result.outcome()),
        });
        working
    }

    fn report(
        &self,
        anchor: BigInt,
        direction: Direction,
        outcome: BoundaryOutcome,
        probes: Vec<ProbeRecord>,
    ) -> BoundaryReport {
        BoundaryReport {
            anchor,
            direction,
            ceiling: self.ceiling.clone(),
            outcome,
            probes,
        }
    }
}

/// 10^30, the same value as the configuration default
fn default_ceiling() -> BigInt {
    BigInt::from(10u8).pow(30)
}

fn describe(outcome: &PageOutcome) -> String {
    match outcome {
        PageOutcome::Success(items) => format!("success ({} items)", items.len()),
        PageOutcome::EmptySuccess => "empty".to_string(),
        PageOutcome::Failure(reason) => format!("failed: {}", reason),
    }
}
