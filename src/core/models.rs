use std::fmt;

/// Maximum number of items retained per source.
pub const MAX_FEED_SIZE: usize = 7;

/// Prefix every item id is appended to when rendered.
pub const WATCH_URL_BASE: &str = "https://www.youtube.com/watch?v=";

/// A single video belonging to a source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Item {
    pub title: String,
    pub id: String,
    pub description: String,
}

impl Item {
    pub fn new(
        title: impl Into<String>,
        id: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            id: id.into(),
            description: description.into(),
        }
    }
}

/// A subscribed (or freshly fetched) source with its most recent items.
///
/// `items` is ordered newest first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceRecord {
    /// Display name as the client typed it.
    pub name: String,
    /// Canonical feed address, used for refreshes.
    pub address: String,
    /// Human-facing channel page, shown in renderings.
    pub page_url: String,
    pub items: Vec<Item>,
}

/// Lower-case a name and drop all whitespace.
pub fn normalize_key(name: &str) -> String {
    name.chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect()
}

impl fmt::Display for Item {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}\n\t{}{}", self.title, WATCH_URL_BASE, self.id)
    }
}

impl fmt::Display for SourceRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}\n\t{}\n\n", self.name, self.page_url)?;
        for (i, item) in self.items.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{}", item)?;
        }
        Ok(())
    }
}
