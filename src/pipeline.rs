//! Normalization, filtering and deduplication of raw listings.
//!
//! Each candidate goes through a fixed sequence:
//! 1. title cleanup
//! 2. URL resolution against the page it came from
//! 3. dedup against the run index and the URLs already seen on this page
//! 4. job keyword allow-list
//! 5. navigational keyword deny-list
//! 6. structural plausibility of the link (or of the title, if there is none)
//!
//! Survivors keep their extraction order.

use std::collections::HashSet;

use regex::{Regex, RegexBuilder};
use tracing::{debug, warn};

use crate::config::FilterConfig;
use crate::dedup::DedupIndex;
use crate::models::{Listing, RawListing};
use crate::url_utils::{path_of, resolve};

/// Why a candidate was dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DropReason {
    EmptyTitle,
    Duplicate,
    NoJobKeyword,
    Excluded,
    Implausible,
}

/// Per-call counters, logged at debug level.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PipelineStats {
    pub kept: usize,
    pub empty_title: usize,
    pub duplicate: usize,
    pub no_job_keyword: usize,
    pub excluded: usize,
    pub implausible: usize,
}

impl PipelineStats {
    fn record(&mut self, reason: DropReason) {
        match reason {
            DropReason::EmptyTitle => self.empty_title += 1,
            DropReason::Duplicate => self.duplicate += 1,
            DropReason::NoJobKeyword => self.no_job_keyword += 1,
            DropReason::Excluded => self.excluded += 1,
            DropReason::Implausible => self.implausible += 1,
        }
    }

    pub fn dropped(&self) -> usize {
        self.empty_title + self.duplicate + self.no_job_keyword + self.excluded + self.implausible
    }
}

/// Turns raw candidates into listings.
#[derive(Debug, Clone)]
pub struct ListingPipeline {
    boilerplate: Option<Regex>,
    job_keywords: Vec<String>,
    excluded_keywords: Vec<String>,
    job_path_tokens: Vec<String>,
    min_path_segments: usize,
    min_title_words: usize,
}

impl ListingPipeline {
    pub fn new(filters: &FilterConfig) -> Self {
        Self {
            boilerplate: boilerplate_regex(&filters.boilerplate),
            job_keywords: lowercase_all(&filters.job_keywords),
            excluded_keywords: lowercase_all(&filters.excluded_keywords),
            job_path_tokens: lowercase_all(&filters.job_path_tokens),
            min_path_segments: filters.min_path_segments,
            min_title_words: filters.min_title_words,
        }
    }

    /// Process one extraction pass from `source_url`.
    ///
    /// Keys of kept candidates are inserted into `index`, so a second pass
    /// over the same candidates yields nothing.
    pub fn process(&self, raw: &[RawListing], source_url: &str, index: &DedupIndex) -> Vec<Listing> {
        let (listings, stats) = self.process_with_stats(raw, source_url, index);
        debug!(
            "{}: kept {}, dropped {} ({} duplicate, {} without job keyword, {} excluded, {} implausible)",
            source_url,
            stats.kept,
            stats.dropped(),
            stats.duplicate,
            stats.no_job_keyword,
            stats.excluded,
            stats.implausible
        );
        listings
    }

    pub fn process_with_stats(
        &self,
        raw: &[RawListing],
        source_url: &str,
        index: &DedupIndex,
    ) -> (Vec<Listing>, PipelineStats) {
        let mut page_urls: HashSet<String> = HashSet::new();
        let mut stats = PipelineStats::default();
        let mut listings = Vec::new();

        for candidate in raw {
            match self.check(candidate, source_url, index, &page_urls) {
                Ok(listing) => {
                    if !listing.url.is_empty() {
                        page_urls.insert(listing.url.clone());
                    }
                    stats.kept += 1;
                    listings.push(listing);
                }
                Err(reason) => stats.record(reason),
            }
        }

        (listings, stats)
    }

    fn check(
        &self,
        candidate: &RawListing,
        source_url: &str,
        index: &DedupIndex,
        page_urls: &HashSet<String>,
    ) -> Result<Listing, DropReason> {
        let title = self.clean_title(&candidate.title);
        if title.is_empty() {
            return Err(DropReason::EmptyTitle);
        }

        let url = if candidate.href.trim().is_empty() {
            String::new()
        } else {
            resolve(source_url, &candidate.href)
        };

        let key = DedupIndex::key(&title, &url);
        if (!url.is_empty() && page_urls.contains(&url)) || !index.insert_if_absent(key) {
            return Err(DropReason::Duplicate);
        }

        let lowered = title.to_lowercase();
        if !self.job_keywords.iter().any(|k| lowered.contains(k.as_str())) {
            return Err(DropReason::NoJobKeyword);
        }
        if self
            .excluded_keywords
            .iter()
            .any(|k| lowered.contains(k.as_str()))
        {
            return Err(DropReason::Excluded);
        }
        if !self.is_plausible(&title, &url) {
            return Err(DropReason::Implausible);
        }

        Ok(Listing { title, url })
    }

    /// Short paths need a job token somewhere in the URL (hosts such as
    /// `jobs.lever.co` count); link-less titles need enough words.
    fn is_plausible(&self, title: &str, url: &str) -> bool {
        if url.is_empty() {
            return title.split_whitespace().count() >= self.min_title_words;
        }

        if path_of(url).split('/').count() >= self.min_path_segments {
            return true;
        }
        let url = url.to_lowercase();
        self.job_path_tokens.iter().any(|t| url.contains(t.as_str()))
    }

    /// Strip boilerplate and a duplicated leading word, then trim separators.
    ///
    /// Boilerplate is replaced by a space so glued fragments such as
    /// `SeniorJobsJobsEngineer` keep their word boundary.
    pub fn clean_title(&self, title: &str) -> String {
        let stripped = match &self.boilerplate {
            Some(re) => re.replace_all(title, " ").into_owned(),
            None => title.to_string(),
        };

        let mut tokens: Vec<&str> = stripped.split_whitespace().collect();
        if leading_label_repeated(&tokens) {
            tokens.remove(0);
        } else if tokens.len() >= 2 && tokens[0].to_lowercase() == tokens[1].to_lowercase() {
            tokens.remove(0);
        }

        tokens
            .join(" ")
            .trim_matches(|c: char| c == ':' || c == '-' || c.is_whitespace())
            .to_string()
    }
}

impl Default for ListingPipeline {
    fn default() -> Self {
        Self::new(&FilterConfig::default())
    }
}

fn lowercase_all(words: &[String]) -> Vec<String> {
    words
        .iter()
        .map(|w| w.trim().to_lowercase())
        .filter(|w| !w.is_empty())
        .collect()
}

fn boilerplate_regex(fragments: &[String]) -> Option<Regex> {
    let alternation = fragments
        .iter()
        .filter(|f| !f.is_empty())
        .map(|f| regex::escape(f))
        .collect::<Vec<_>>()
        .join("|");
    if alternation.is_empty() {
        return None;
    }

    match RegexBuilder::new(&alternation).case_insensitive(true).build() {
        Ok(re) => Some(re),
        Err(e) => {
            warn!("Ignoring title boilerplate list: {}", e);
            None
        }
    }
}

/// The first token is a word written twice that also appears later, as in
/// `EngineerEngineer Software Engineer`. `Murmur Analytics` is left alone.
fn leading_label_repeated(tokens: &[&str]) -> bool {
    let Some(first) = tokens.first() else {
        return false;
    };
    if !is_doubled_word(first) {
        return false;
    }
    let half: String = first.chars().take(first.chars().count() / 2).collect();
    tokens[1..].iter().any(|t| t.eq_ignore_ascii_case(&half))
}

/// A token that is one word written twice, e.g. `EngineerEngineer`.
fn is_doubled_word(token: &str) -> bool {
    let chars: Vec<char> = token.chars().collect();
    if chars.len() < 6 || chars.len() % 2 != 0 {
        return false;
    }
    let (left, right) = chars.split_at(chars.len() / 2);
    left.iter()
        .zip(right)
        .all(|(a, b)| a.to_lowercase().eq(b.to_lowercase()))
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = "https://acme.com/careers";

    fn pipeline() -> ListingPipeline {
        ListingPipeline::default()
    }

    #[test]
    fn cleans_titles() {
        let p = pipeline();
        assert_eq!(
            p.clean_title("EngineerEngineer Software Engineer"),
            "Software Engineer"
        );
        assert_eq!(p.clean_title("- Senior Analyst -"), "Senior Analyst");
        assert_eq!(p.clean_title("Lead Lead Designer"), "Lead Designer");
        assert_eq!(
            p.clean_title("work_outlineJobsProduct   Manager open_in_new"),
            "Product Manager"
        );
        assert_eq!(p.clean_title(": Staff  Engineer :"), "Staff Engineer");
        assert_eq!(p.clean_title("  "), "");
    }

    #[test]
    fn resolves_relative_links() {
        let index = DedupIndex::new();
        let raw = vec![RawListing::new("Senior Engineer", "/careers/senior-engineer-42")];
        let listings = pipeline().process(&raw, "http://foojobs.com/careers/open", &index);
        assert_eq!(
            listings,
            vec![Listing {
                title: "Senior Engineer".into(),
                url: "http://foojobs.com/careers/senior-engineer-42".into(),
            }]
        );
    }

    #[test]
    fn second_pass_yields_nothing() {
        let index = DedupIndex::new();
        let raw = vec![
            RawListing::new("Senior Analyst", "/careers/jobs/123/senior-analyst"),
            RawListing::new("Product Manager", "https://acme.com/jobs/pm-7"),
        ];
        let p = pipeline();
        assert_eq!(p.process(&raw, PAGE, &index).len(), 2);
        assert!(p.process(&raw, PAGE, &index).is_empty());
    }

    #[test]
    fn same_url_twice_on_one_page_is_kept_once() {
        let index = DedupIndex::new();
        let raw = vec![
            RawListing::new("Senior Analyst", "/jobs/1"),
            RawListing::new("Senior Analyst (Remote)", "/jobs/1"),
        ];
        let (listings, stats) = pipeline().process_with_stats(&raw, PAGE, &index);
        assert_eq!(listings.len(), 1);
        assert_eq!(stats.duplicate, 1);
    }

    #[test]
    fn keyword_lists_apply() {
        let index = DedupIndex::new();
        let raw = vec![
            RawListing::new("Our Mission", "/careers/jobs/1/mission"),
            RawListing::new("Privacy Policy Manager", "/careers/jobs/2/privacy"),
            RawListing::new("Data Scientist", "/careers/jobs/3/data"),
        ];
        let (listings, stats) = pipeline().process_with_stats(&raw, PAGE, &index);
        assert_eq!(listings.len(), 1);
        assert_eq!(listings[0].title, "Data Scientist");
        assert_eq!(stats.no_job_keyword, 1);
        assert_eq!(stats.excluded, 1);
    }

    #[test]
    fn structural_boundary() {
        let index = DedupIndex::new();
        let raw = vec![
            RawListing::new("Senior Analyst", "/x/y"),
            RawListing::new("Senior Analyst", "/careers/jobs/123/senior-analyst"),
            RawListing::new("Senior Engineer", "/a/b/c"),
        ];
        let listings = pipeline().process(&raw, PAGE, &index);
        let urls: Vec<_> = listings.iter().map(|l| l.url.as_str()).collect();
        assert_eq!(
            urls,
            vec![
                "https://acme.com/careers/jobs/123/senior-analyst",
                "https://acme.com/a/b/c",
            ]
        );
    }

    #[test]
    fn title_only_listings_need_three_words() {
        let index = DedupIndex::new();
        let raw = vec![
            RawListing::title_only("Senior Engineer"),
            RawListing::title_only("Senior Platform Engineer"),
        ];
        let listings = pipeline().process(&raw, PAGE, &index);
        assert_eq!(
            listings,
            vec![Listing {
                title: "Senior Platform Engineer".into(),
                url: String::new(),
            }]
        );
    }

    #[test]
    fn doubled_words_inside_a_title_survive() {
        let p = pipeline();
        assert_eq!(
            p.clean_title("Murmur Analytics Senior Analyst"),
            "Murmur Analytics Senior Analyst"
        );
        assert_eq!(p.clean_title("SeniorJobsJobsEngineer"), "Senior Engineer");
        assert_eq!(p.clean_title("Senior AnalystAnalyst Lead"), "Senior AnalystAnalyst Lead");

        let index = DedupIndex::new();
        let raw = vec![RawListing::new("Couscous Product Manager", "/jobs/1/pm")];
        let listings = p.process(&raw, PAGE, &index);
        assert_eq!(listings[0].title, "Couscous Product Manager");
        assert!(!index.insert_if_absent(DedupIndex::key(
            "Couscous Product Manager",
            "https://acme.com/jobs/1/pm"
        )));
    }

    #[test]
    fn ats_host_counts_as_job_token() {
        let index = DedupIndex::new();
        let raw = vec![RawListing::new(
            "Senior Data Analyst",
            "https://jobs.lever.co/acme/4f1c-data",
        )];
        let (listings, stats) = pipeline().process_with_stats(&raw, PAGE, &index);
        assert_eq!(
            listings,
            vec![Listing {
                title: "Senior Data Analyst".into(),
                url: "https://jobs.lever.co/acme/4f1c-data".into(),
            }]
        );
        assert_eq!(stats.dropped(), 0);
    }

    #[test]
    fn doubled_word_detection() {
        assert!(is_doubled_word("EngineerEngineer"));
        assert!(is_doubled_word("jobsJOBS"));
        assert!(!is_doubled_word("papa"));
        assert!(!is_doubled_word("Engineer"));
    }
}
