//! Company roster and discovery file loading.
//!
//! A roster is either JSON (an array of `{name, direct_career_url}`
//! objects) or `name,url` lines with an optional header row. Blank names
//! are skipped with a warning; a blank URL means "unknown".

use std::path::Path;

use serde::Deserialize;
use thiserror::Error;
use tracing::warn;

use crate::models::{CompanyRef, DiscoveryResult};
use crate::url_utils::is_valid_url;

#[derive(Debug, Error)]
pub enum RosterError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse JSON roster: {0}")]
    Json(#[from] serde_json::Error),
}

/// Load a roster, choosing the format by extension (`.json` or anything
/// else as lines).
pub async fn load(path: &Path) -> Result<Vec<CompanyRef>, RosterError> {
    let contents = read(path).await?;
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("csv");
    parse(&contents, ext)
}

pub fn parse(contents: &str, ext: &str) -> Result<Vec<CompanyRef>, RosterError> {
    let companies = if ext.eq_ignore_ascii_case("json") {
        parse_json(contents)?
    } else {
        parse_lines(contents)
    };
    Ok(companies)
}

#[derive(Deserialize)]
struct RosterEntry {
    #[serde(alias = "company", alias = "company_name")]
    name: String,
    #[serde(default, alias = "known_url", alias = "url")]
    direct_career_url: Option<String>,
}

fn parse_json(contents: &str) -> Result<Vec<CompanyRef>, RosterError> {
    let entries: Vec<RosterEntry> = serde_json::from_str(contents)?;
    Ok(entries
        .into_iter()
        .enumerate()
        .filter_map(|(i, e)| company(i + 1, &e.name, e.direct_career_url))
        .collect())
}

/// Parse `name,url` lines. The field after the last comma is the URL only
/// when it is empty or a valid URL, so `Acme, Inc.` stays one name.
pub fn parse_lines(contents: &str) -> Vec<CompanyRef> {
    let mut companies = Vec::new();

    for (i, line) in contents.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let first_field = line.split(',').next().unwrap_or_default();
        if i == 0 && is_header(unquote(first_field)) {
            continue;
        }

        let (name, url) = match line.rsplit_once(',') {
            Some((name, url)) if unquote(url).is_empty() || is_valid_url(unquote(url)) => {
                (unquote(name), unquote(url))
            }
            _ => (unquote(line), ""),
        };

        let url = (!url.is_empty()).then(|| url.to_string());
        if let Some(company) = company(i + 1, name, url) {
            companies.push(company);
        }
    }

    companies
}

fn company(line: usize, name: &str, url: Option<String>) -> Option<CompanyRef> {
    if name.trim().is_empty() {
        warn!("Roster entry {} has no company name, skipping", line);
        return None;
    }
    Some(CompanyRef::new(name.trim(), url))
}

fn is_header(first_field: &str) -> bool {
    matches!(
        first_field.to_lowercase().as_str(),
        "name" | "company" | "company_name" | "company name"
    )
}

fn unquote(field: &str) -> &str {
    let field = field.trim();
    field
        .strip_prefix('"')
        .and_then(|f| f.strip_suffix('"'))
        .unwrap_or(field)
        .trim()
}

/// Load discovery output written by a previous `discover` run.
pub async fn load_discovery(path: &Path) -> Result<Vec<DiscoveryResult>, RosterError> {
    let contents = read(path).await?;
    Ok(serde_json::from_str(&contents)?)
}

async fn read(path: &Path) -> Result<String, RosterError> {
    tokio::fs::read_to_string(path)
        .await
        .map_err(|source| RosterError::Io {
            path: path.display().to_string(),
            source,
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lines_with_header_and_blanks() {
        let text = "\
name,direct_career_url
Acme,https://careers.acme.com/
\"Foo, Inc.\",
,https://nameless.com/jobs

Bar
";
        let companies = parse_lines(text);
        assert_eq!(
            companies,
            vec![
                CompanyRef::new("Acme", Some("https://careers.acme.com/".into())),
                CompanyRef::new("Foo, Inc.", None),
                CompanyRef::new("Bar", None),
            ]
        );
    }

    #[test]
    fn comma_in_name_without_url_column() {
        let companies = parse_lines("Acme, Inc.\n\"Globex, LLC\",https://globex.com/jobs\n");
        assert_eq!(
            companies,
            vec![
                CompanyRef::new("Acme, Inc.", None),
                CompanyRef::new("Globex, LLC", Some("https://globex.com/jobs".into())),
            ]
        );
    }

    #[test]
    fn json_roster_accepts_aliases() {
        let text = r#"[
            {"name": "Acme", "direct_career_url": ""},
            {"company_name": "Foo", "url": "https://foo.com/careers"},
            {"name": "  "}
        ]"#;
        let companies = parse(text, "json").unwrap();
        assert_eq!(companies.len(), 2);
        assert_eq!(companies[0].known_url, None);
        assert_eq!(companies[1].known_url.as_deref(), Some("https://foo.com/careers"));
    }

    #[test]
    fn bad_json_is_an_error() {
        assert!(matches!(parse("{", "json"), Err(RosterError::Json(_))));
    }
}
