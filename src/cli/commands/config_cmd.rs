//! Configuration management commands.

use console::style;

use careerscout::config::Config;
use careerscout::profiles::{compile_patterns, ProfileRegistry};

use crate::cli::icons::{error, success};

/// Print the effective configuration.
pub fn cmd_config_show(config: &Config) -> anyhow::Result<()> {
    let source = config
        .source_path
        .as_ref()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "defaults".to_string());
    eprintln!("{} Source: {}", style("→").dim(), source);

    let toml = config.to_toml().map_err(|e| anyhow::anyhow!(e))?;
    println!("{}", toml);
    Ok(())
}

/// Compile every selector in the configuration and report failures.
pub fn cmd_config_check(config: &Config) -> anyhow::Result<()> {
    let (generic, mut problems) = compile_patterns(&config.extraction.generic_selectors);
    let registry = ProfileRegistry::from_config(config);
    problems.extend(registry.problems().iter().cloned());

    if problems.is_empty() {
        eprintln!(
            "{} {} generic patterns and {} site profiles compiled",
            success(),
            generic.len(),
            registry.len()
        );
        return Ok(());
    }

    for problem in &problems {
        eprintln!("{} {}", error(), problem);
    }
    anyhow::bail!("{} configuration problems found", problems.len())
}
