//! Career page discovery command.

use std::path::Path;

use anyhow::Context;
use console::style;
use indicatif::ProgressBar;

use careerscout::models::DiscoveryStatus;
use careerscout::{roster, BatchRunner, Config, DiscoveryResult};

use super::BatchArgs;
use crate::cli::helpers::{progress_bar, write_json};
use crate::cli::icons::{arrow, success, warning};

/// Discover career pages for a roster and write the discovery output.
pub async fn cmd_discover(mut config: Config, roster_path: &Path, batch: &BatchArgs) -> anyhow::Result<()> {
    batch.apply(&mut config);

    let companies = roster::load(roster_path)
        .await
        .with_context(|| format!("Failed to load roster {}", roster_path.display()))?;
    if companies.is_empty() {
        eprintln!("{} Roster is empty", warning());
        return Ok(());
    }

    eprintln!(
        "{} Discovering career pages for {} companies using {} workers",
        arrow(),
        companies.len(),
        config.concurrency.workers
    );

    let pb = batch_progress(batch, companies.len(), "discovering");
    let runner = BatchRunner::from_config(&config)?.with_progress(pb.clone());
    let results = runner.discover_all(companies).await;
    pb.finish_and_clear();

    write_json(batch.output.as_ref(), &results).await?;
    print_discovery_summary(&results);
    Ok(())
}

pub(super) fn batch_progress(batch: &BatchArgs, total: usize, message: &str) -> ProgressBar {
    if batch.quiet {
        ProgressBar::hidden()
    } else {
        progress_bar(total, message)
    }
}

pub(super) fn print_discovery_summary(results: &[DiscoveryResult]) {
    let found = results.iter().filter(|r| r.is_success()).count();
    let errors = results
        .iter()
        .filter(|r| matches!(r.status, DiscoveryStatus::Error(_)))
        .count();
    let failed = results.len() - found - errors;

    eprintln!(
        "{} Discovery: {} found, {} not found, {} errors",
        success(),
        style(found).green(),
        style(failed).yellow(),
        style(errors).red()
    );
    for result in results {
        if let DiscoveryStatus::Error(reason) = &result.status {
            eprintln!("  {} {}: {}", style("→").dim(), result.company, reason);
        }
    }
}
