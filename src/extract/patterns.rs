//! Applying a single structural pattern.

use scraper::{ElementRef, Html, Selector};

use crate::models::RawListing;
use crate::profiles::Pattern;

/// Result of one pattern against one document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PatternOutcome {
    /// At least one element matched; candidates may still be empty if every
    /// match lacked a title or link.
    Matched(Vec<RawListing>),
    NoMatch,
}

impl PatternOutcome {
}

/// Apply `pattern`, requiring both a title and a link per candidate.
pub fn apply_pattern(document: &Html, pattern: &Pattern, nested: Option<&Selector>) -> PatternOutcome {
    let mut matched = false;
    let mut listings = Vec::new();

    for element in document.select(&pattern.selector) {
        matched = true;
        let title = element_text(element);
        let Some(href) = link_for(element, nested) else {
            continue;
        };
        if !title.is_empty() {
            listings.push(RawListing::new(title, href));
        }
    }

    if matched {
        PatternOutcome::Matched(listings)
    } else {
        PatternOutcome::NoMatch
    }
}

/// Visible text of an element: fragments trimmed and joined by one space.
pub fn element_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// The element's own href, else the first nested link's.
pub fn link_for(element: ElementRef<'_>, nested: Option<&Selector>) -> Option<String> {
    element
        .value()
        .attr("href")
        .or_else(|| {
            element
                .select(nested?)
                .next()
                .and_then(|a| a.value().attr("href"))
        })
        .map(|h| h.trim().to_string())
        .filter(|h| !h.is_empty())
}
