//! HTML parser for extracting document identifiers
//!
//! Identifiers are taken from link targets only: an `<a href>` whose value
//! contains the tag, eight digits and the file extension
//! (e.g. `/files/EFTA00039025.pdf`). Matching is case-insensitive and every
//! identifier is uppercased on extraction.

use crate::state::{FailureKind, ItemId, PageOutcome};
use crate::ConfigError;
use regex::Regex;
use scraper::{Html, Selector};
use std::collections::BTreeSet;

/// How many leading characters are inspected for an error-page signature
const ERROR_SIGNATURE_WINDOW: usize = 500;

/// Extracts identifiers from listing pages
#[derive(Debug, Clone)]
pub struct ItemExtractor {
    link_pattern: Regex,
    token_pattern: Regex,
    anchor_selector: Selector,
}

impl ItemExtractor {
    /// Builds an extractor for `TAG########EXT` identifiers
    ///
    /// # Example
    ///
    /// ```
    /// use wrapscan::crawler::ItemExtractor;
    ///
    /// let extractor = ItemExtractor::new("EFTA", ".pdf").unwrap();
    /// let items = extractor.extract(r#"<a href="/f/efta00000001.pdf">one</a>"#);
    /// assert_eq!(items.len(), 1);
    /// ```
    pub fn new(tag: &str, extension: &str) -> Result<Self, ConfigError> {
        let link_pattern = Regex::new(&format!(
            r"(?i)({}\d{{8}}){}",
            regex::escape(tag),
            regex::escape(extension)
        ))
        .map_err(|e| ConfigError::InvalidPattern(e.to_string()))?;

        let token_pattern = Regex::new(&format!(r"(?i){}\d{{8}}", regex::escape(tag)))
            .map_err(|e| ConfigError::InvalidPattern(e.to_string()))?;

        let anchor_selector = Selector::parse("a[href]")
            .map_err(|e| ConfigError::InvalidPattern(format!("{:?}", e)))?;

        Ok(Self {
            link_pattern,
            token_pattern,
            anchor_selector,
        })
    }

    /// Extracts the canonical identifier set from an HTML document
    pub fn extract(&self, html: &str) -> BTreeSet<ItemId> {
        let document = Html::parse_document(html);
        let mut items = BTreeSet::new();

        for element in document.select(&self.anchor_selector) {
            if let Some(href) = element.value().attr("href") {
                for capture in self.link_pattern.captures_iter(href) {
                    if let Some(token) = capture.get(1) {
                        items.insert(ItemId::new(token.as_str()));
                    }
                }
            }
        }

        items
    }

    /// Returns true if the body contains an identifier-shaped token anywhere
    pub fn contains_token(&self, body: &str) -> bool {
        self.token_pattern.is_match(body)
    }

    /// Returns true if the body carries the service's error-page signature
    ///
    /// An error page mentions "error" near the top of the document and has no
    /// identifier tokens at all.
    pub fn looks_like_error_page(&self, body: &str) -> bool {
        let head: String = body
            .chars()
            .take(ERROR_SIGNATURE_WINDOW)
            .collect::<String>()
            .to_lowercase();
        head.contains("error") && !self.contains_token(body)
    }

    /// Turns a 200 response body into a page outcome
    pub fn classify_body(&self, body: &str) -> PageOutcome {
        if self.looks_like_error_page(body) {
            return PageOutcome::Failure(FailureKind::ErrorPage);
        }
        PageOutcome::from_items(self.extract(body))
    }
}
