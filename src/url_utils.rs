//! URL validation and normalization helpers.
//!
//! All functions here are pure and never fail: malformed input yields
//! `false` or an empty string.

use url::Url;

/// Check if a string is a syntactically valid absolute URL.
///
/// True iff the string parses with both a scheme and an authority (host).
pub fn is_valid_url(s: &str) -> bool {
    match Url::parse(s.trim()) {
        Ok(u) => !u.scheme().is_empty() && u.host_str().is_some_and(|h| !h.is_empty()),
        Err(_) => false,
    }
}

/// Extract the authority of a URL with a leading `www.` label removed.
///
/// `https://www.example.com/x` becomes `example.com`. Ports are kept, as the
/// authority is compared textually against slug guesses.
pub fn base_domain(url: &str) -> String {
    let Ok(parsed) = Url::parse(url.trim()) else {
        return String::new();
    };
    let Some(host) = parsed.host_str() else {
        return String::new();
    };

    let authority = match parsed.port() {
        Some(port) => format!("{}:{}", host, port),
        None => host.to_string(),
    };

    authority
        .strip_prefix("www.")
        .map(|s| s.to_string())
        .unwrap_or(authority)
}

/// Resolve `href` against `base`.
///
/// Returns `href` unchanged when it already carries scheme and authority,
/// otherwise joins it per standard URL resolution. When neither works the
/// raw href is returned so callers can still reject it downstream.
pub fn resolve(base: &str, href: &str) -> String {
    let href = href.trim();
    if is_valid_url(href) {
        return href.to_string();
    }

    Url::parse(base.trim())
        .and_then(|b| b.join(href))
        .map(|u| u.to_string())
        .unwrap_or_else(|_| href.to_string())
}

/// Path plus query string of a URL, lowercased.
///
/// Relative hrefs are handled by resolving against a dummy origin.
pub fn path_and_query(url: &str) -> String {
    let parsed = Url::parse(url.trim())
        .or_else(|_| Url::parse("http://relative.invalid/").and_then(|b| b.join(url.trim())));

    match parsed {
        Ok(u) => {
            let mut out = u.path().to_lowercase();
            if let Some(q) = u.query() {
                out.push('?');
                out.push_str(&q.to_lowercase());
            }
            out
        }
        Err(_) => url.to_lowercase(),
    }
}

/// Path component of a URL (or relative href), without the query.
pub fn path_of(url: &str) -> String {
    Url::parse(url.trim())
        .or_else(|_| Url::parse("http://relative.invalid/").and_then(|b| b.join(url.trim())))
        .map(|u| u.path().to_string())
        .unwrap_or_else(|_| url.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_urls() {
        assert!(is_valid_url("https://example.com"));
        assert!(is_valid_url("http://careers.acme.com/jobs?page=2"));
        assert!(is_valid_url("https://127.0.0.1:8080/x"));
    }

    #[test]
    fn invalid_urls() {
        assert!(!is_valid_url(""));
        assert!(!is_valid_url("example.com/careers"));
        assert!(!is_valid_url("/careers/jobs"));
        assert!(!is_valid_url("mailto:jobs@example.com"));
        assert!(!is_valid_url("not a url"));
    }

    #[test]
    fn base_domain_strips_www() {
        assert_eq!(base_domain("https://www.example.com/x"), "example.com");
        assert_eq!(base_domain("https://jobs.example.com/"), "jobs.example.com");
        assert_eq!(base_domain("garbage"), "");
    }

    #[test]
    fn base_domain_keeps_port() {
        assert_eq!(base_domain("http://127.0.0.1:9000/a"), "127.0.0.1:9000");
    }

    #[test]
    fn resolve_relative_and_absolute() {
        assert_eq!(
            resolve("http://foojobs.com/careers/open", "/careers/senior-engineer-42"),
            "http://foojobs.com/careers/senior-engineer-42"
        );
        assert_eq!(
            resolve("https://a.com/jobs/", "detail/7"),
            "https://a.com/jobs/detail/7"
        );
        assert_eq!(
            resolve("https://a.com/", "https://boards.greenhouse.io/a/jobs/1"),
            "https://boards.greenhouse.io/a/jobs/1"
        );
    }

    #[test]
    fn resolve_with_bad_base_returns_href() {
        assert_eq!(resolve("nope", "/x"), "/x");
    }

    #[test]
    fn path_helpers() {
        assert_eq!(path_and_query("https://a.com/Careers?Team=Eng"), "/careers?team=eng");
        assert_eq!(path_of("https://a.com/x/y?z=1"), "/x/y");
        assert_eq!(path_of("/x/y"), "/x/y");
    }
}
