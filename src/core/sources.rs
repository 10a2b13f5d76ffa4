use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

use super::models::SourceRecord;

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("empty channel name")]
    EmptyName,

    #[error("channel '{0}' not found")]
    NotFound(String),

    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("malformed feed at '{address}': {reason}")]
    MalformedFeed { address: String, reason: String },

    #[error("invalid search query '{query}': {source}")]
    InvalidQuery {
        query: String,
        #[source]
        source: regex::Error,
    },
}

/// Maps a channel name to its canonical feed address.
#[async_trait]
pub trait ChannelResolver: Send + Sync {
    async fn resolve(&self, name: &str) -> Result<String, SourceError>;
}

/// Retrieves the current items of a feed.
#[async_trait]
pub trait FeedFetcher: Send + Sync {
    /// Fetch `address` and build a record displayed as `name`.
    ///
    /// Items come back newest first and at most `MAX_FEED_SIZE` long.
    async fn fetch(&self, name: &str, address: &str) -> Result<SourceRecord, SourceError>;
}

/// Free-text lookup of channel handles.
#[async_trait]
pub trait ChannelSearch: Send + Sync {
    async fn search(&self, query: &str) -> Result<Vec<String>, SourceError>;
}

/// The external collaborators every endpoint may reach.
#[derive(Clone)]
pub struct Sources {
    pub resolver: Arc<dyn ChannelResolver>,
    pub fetcher: Arc<dyn FeedFetcher>,
    pub search: Arc<dyn ChannelSearch>,
}

impl Sources {
    /// Use one value for all three roles.
    pub fn from_single<T>(source: Arc<T>) -> Self
    where
        T: ChannelResolver + FeedFetcher + ChannelSearch + 'static,
    {
        Self {
            resolver: source.clone(),
            fetcher: source.clone(),
            search: source,
        }
    }

    /// Resolve `name`, then fetch its feed.
    pub async fn lookup(&self, name: &str) -> Result<SourceRecord, SourceError> {
        let address = self.resolver.resolve(name).await?;
        self.fetcher.fetch(name, &address).await
    }
}
