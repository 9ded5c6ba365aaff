//! Search query and domain-guess construction.

/// Placeholder replaced by the company name in query templates.
pub const NAME_PLACEHOLDER: &str = "{name}";

/// Builds the ordered search queries and domain guesses for one company.
#[derive(Debug, Clone, Default)]
pub struct QueryBuilder {
    name: String,
    templates: Vec<String>,
    suffixes: Vec<String>,
}

impl QueryBuilder {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.trim().to_string(),
            ..Default::default()
        }
    }

    /// Query templates, applied in order.
    pub fn templates(mut self, templates: &[String]) -> Self {
        self.templates = templates.to_vec();
        self
    }

    /// Top-level domains tried after the slug.
    pub fn suffixes(mut self, suffixes: &[String]) -> Self {
        self.suffixes = suffixes.to_vec();
        self
    }

    /// Lowercased company name with whitespace removed.
    pub fn slug(&self) -> String {
        slugify(&self.name)
    }

    /// Expanded queries. A template without the placeholder gets the name
    /// prepended.
    pub fn queries(&self) -> Vec<String> {
        self.templates
            .iter()
            .map(|t| t.trim())
            .filter(|t| !t.is_empty())
            .map(|t| {
                if t.contains(NAME_PLACEHOLDER) {
                    t.replace(NAME_PLACEHOLDER, &self.name)
                } else {
                    format!("{} {}", self.name, t)
                }
            })
            .collect()
    }

    /// `{slug}.{suffix}` for each configured suffix.
    pub fn domain_guesses(&self) -> Vec<String> {
        let slug = self.slug();
        if slug.is_empty() {
            return Vec::new();
        }
        self.suffixes
            .iter()
            .map(|s| s.trim().trim_start_matches('.'))
            .filter(|s| !s.is_empty())
            .map(|s| format!("{}.{}", slug, s))
            .collect()
    }
}

pub fn slugify(name: &str) -> String {
    name.chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect()
}
