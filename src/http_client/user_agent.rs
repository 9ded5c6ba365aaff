//! Outbound `User-Agent` selection.
//!
//! Career sites often serve stripped markup, or a block page, to agents that
//! do not look like a desktop browser, so the default is a browser string.

/// Identifier sent when the config asks for `"careerscout"`.
pub const IDENTIFIER: &str = "careerscout/0.1 (+career page indexer)";

const DESKTOP_BROWSERS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:133.0) Gecko/20100101 Firefox/133.0",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/18.1 Safari/605.1.15",
];

/// What the `http.user_agent` setting asks for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AgentMode {
    /// A desktop browser string, picked once per client.
    Browser,
    Identifier,
    Custom(String),
}

impl AgentMode {
    pub fn from_setting(setting: Option<&str>) -> Self {
        match setting.map(str::trim) {
            None | Some("") | Some("impersonate") | Some("browser") => AgentMode::Browser,
            Some("careerscout") | Some("default") => AgentMode::Identifier,
            Some(custom) => AgentMode::Custom(custom.to_string()),
        }
    }

    pub fn header_value(&self) -> String {
        match self {
            AgentMode::Browser => browser_agent().to_string(),
            AgentMode::Identifier => IDENTIFIER.to_string(),
            AgentMode::Custom(value) => value.clone(),
        }
    }
}

fn browser_agent() -> &'static str {
    let seed = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.subsec_nanos() as usize)
        .unwrap_or(0);
    DESKTOP_BROWSERS[seed % DESKTOP_BROWSERS.len()]
}

/// Header value for the configured setting.
pub fn resolve_user_agent(setting: Option<&str>) -> String {
    AgentMode::from_setting(setting).header_value()
}
