/// Content types the host offers for indexing, in display order.
pub trait ContentTypeCatalog: Send + Sync {
    fn content_types(&self) -> Vec<String>;
}

/// Fixed list of content types, typically from configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaticCatalog {
    types: Vec<String>,
}

impl StaticCatalog {
    pub fn new<I, S>(types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut seen: Vec<String> = Vec::new();
        for t in types {
            let t = t.into().trim().to_string();
            if !t.is_empty() && !seen.contains(&t) {
                seen.push(t);
            }
        }
        Self { types: seen }
    }

    /// Parses `"page, post,product"`.
    pub fn from_csv(raw: &str) -> Self {
        Self::new(raw.split(','))
    }
}

impl Default for StaticCatalog {
    fn default() -> Self {
        Self::new(["page", "post"])
    }
}

impl ContentTypeCatalog for StaticCatalog {
    fn content_types(&self) -> Vec<String> {
        self.types.clone()
    }
}
