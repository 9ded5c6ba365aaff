//! Listing extraction commands.

use std::path::{Path, PathBuf};

use anyhow::Context;
use console::style;

use careerscout::models::ExtractionRecord;
use careerscout::runner::known_targets;
use careerscout::{roster, BatchRunner, Config, DiscoveryResult};

use super::discover::{batch_progress, print_discovery_summary};
use super::BatchArgs;
use crate::cli::helpers::write_json;
use crate::cli::icons::{arrow, success, warning};

/// Scrape career pages listed in a discovery file or a roster.
pub async fn cmd_scrape(mut config: Config, input: &Path, batch: &BatchArgs) -> anyhow::Result<()> {
    batch.apply(&mut config);

    let targets = load_targets(input).await?;
    let scrapeable = targets.iter().filter(|t| t.is_success()).count();
    if scrapeable == 0 {
        eprintln!("{} No career pages to scrape in {}", warning(), input.display());
        return Ok(());
    }

    eprintln!(
        "{} Scraping {} career pages using {} workers",
        arrow(),
        scrapeable,
        config.concurrency.workers
    );

    let pb = batch_progress(batch, scrapeable, "scraping");
    let runner = BatchRunner::from_config(&config)?.with_progress(pb.clone());
    let records = runner.scrape_all(targets).await;
    runner.finish().await;
    pb.finish_and_clear();

    write_json(batch.output.as_ref(), &records).await?;
    print_extraction_summary(&records);
    Ok(())
}

/// Discover and scrape a roster in one batch.
pub async fn cmd_run(
    mut config: Config,
    roster_path: &Path,
    discovery_output: Option<&PathBuf>,
    batch: &BatchArgs,
) -> anyhow::Result<()> {
    batch.apply(&mut config);

    let companies = roster::load(roster_path)
        .await
        .with_context(|| format!("Failed to load roster {}", roster_path.display()))?;
    if companies.is_empty() {
        eprintln!("{} Roster is empty", warning());
        return Ok(());
    }

    eprintln!(
        "{} Processing {} companies using {} workers",
        arrow(),
        companies.len(),
        config.concurrency.workers
    );

    let pb = batch_progress(batch, companies.len(), "processing");
    let runner = BatchRunner::from_config(&config)?.with_progress(pb.clone());
    let report = runner.run(companies).await;
    runner.finish().await;
    pb.finish_and_clear();

    if let Some(path) = discovery_output {
        write_json(Some(path), &report.discovery).await?;
    }
    write_json(batch.output.as_ref(), &report.extraction).await?;

    print_discovery_summary(&report.discovery);
    print_extraction_summary(&report.extraction);
    Ok(())
}

/// Discovery output if the file is one, otherwise a roster's known URLs.
async fn load_targets(input: &Path) -> anyhow::Result<Vec<DiscoveryResult>> {
    let is_json = input
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("json"));
    if is_json {
        if let Ok(results) = roster::load_discovery(input).await {
            return Ok(results);
        }
    }

    let companies = roster::load(input)
        .await
        .with_context(|| format!("Failed to load {}", input.display()))?;
    Ok(known_targets(&companies))
}

fn print_extraction_summary(records: &[ExtractionRecord]) {
    let listings: usize = records.iter().map(|r| r.scraped_data.listings.len()).sum();
    let failed: Vec<_> = records
        .iter()
        .filter(|r| r.scraped_data.error.is_some())
        .collect();

    eprintln!(
        "{} Extraction: {} listings from {} pages ({} failed)",
        success(),
        style(listings).green(),
        records.len(),
        style(failed.len()).red()
    );
    for record in failed {
        eprintln!(
            "  {} {}: {}",
            style("→").dim(),
            record.company_name,
            record.scraped_data.error.as_deref().unwrap_or_default()
        );
    }
}
