use anyhow::{Context, Result};
use async_trait::async_trait;
use atom_syndication::Feed;
use atom_syndication::extension::ExtensionMap;
use regex::Regex;
use std::collections::HashSet;
use tracing::debug;

use crate::core::models::{Item, MAX_FEED_SIZE, SourceRecord};
use crate::core::sources::{ChannelResolver, ChannelSearch, FeedFetcher, SourceError};

const CHANNEL_URL_BASE: &str = "https://www.youtube.com/@";
const CHANNEL_BY_ID_URL_BASE: &str = "https://www.youtube.com/channel/";
const FEED_URL_PATTERN: &str =
    r"https://www\.youtube\.com/feeds/videos\.xml\?channel_id=[a-zA-Z0-9_-]{24}";
const SEARCH_URL: &str = "https://www.youtube.com/results";

/// Scrapes YouTube channel pages and reads their Atom video feeds.
pub struct YoutubeClient {
    client: reqwest::Client,
    feed_url: Regex,
}

impl YoutubeClient {
    pub fn new() -> Result<Self> {
        Ok(Self {
            client: reqwest::Client::new(),
            feed_url: Regex::new(FEED_URL_PATTERN).context("Invalid feed url pattern")?,
        })
    }

    fn find_feed_address(&self, page: &str) -> Option<String> {
        self.feed_url.find(page).map(|m| m.as_str().to_string())
    }

    async fn get_text(&self, url: &str) -> Result<String, SourceError> {
        let body = self
            .client
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;
        Ok(body)
    }
}

#[async_trait]
impl ChannelResolver for YoutubeClient {
    async fn resolve(&self, name: &str) -> Result<String, SourceError> {
        let name = name.replace('\n', "");
        if name.is_empty() {
            return Err(SourceError::EmptyName);
        }

        let page = self.get_text(&format!("{}{}", CHANNEL_URL_BASE, name)).await?;
        let address = self
            .find_feed_address(&page)
            .ok_or_else(|| SourceError::NotFound(name.clone()))?;

        debug!(source = %name, address = %address, "Resolved channel");
        Ok(address)
    }
}

#[async_trait]
impl FeedFetcher for YoutubeClient {
    async fn fetch(&self, name: &str, address: &str) -> Result<SourceRecord, SourceError> {
        let body = self.get_text(address).await?;
        let mut items = parse_feed(&body).map_err(|reason| {
            SourceError::MalformedFeed {
                address: address.to_string(),
                reason,
            }
        })?;
        items.truncate(MAX_FEED_SIZE);

        Ok(SourceRecord {
            name: name.to_string(),
            address: address.to_string(),
            page_url: page_url_for(name, address),
            items,
        })
    }
}

#[async_trait]
impl ChannelSearch for YoutubeClient {
    async fn search(&self, query: &str) -> Result<Vec<String>, SourceError> {
        let body = self
            .client
            .get(SEARCH_URL)
            .query(&[("search_query", query.to_lowercase())])
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;

        extract_handles(&body, query)
    }
}

/// Channel page for a feed address, falling back to the handle URL.
pub fn page_url_for(name: &str, address: &str) -> String {
    match address.split_once('=') {
        Some((_, id)) if !id.is_empty() => format!("{}{}", CHANNEL_BY_ID_URL_BASE, id),
        _ => format!("{}{}", CHANNEL_URL_BASE, name.trim()),
    }
}

/// Pull `"/@handle"` links containing `query` out of a results page.
///
/// Handles come back deduplicated, in page order, with their original casing.
/// Matching ignores ASCII case only; other letters must match exactly.
pub fn extract_handles(page: &str, query: &str) -> Result<Vec<String>, SourceError> {
    let needle: String = query
        .chars()
        .filter(|c| !c.is_whitespace())
        .map(|c| c.to_ascii_lowercase())
        .collect();
    let re = Regex::new(&format!(r#""/@\w*{}\w*""#, regex::escape(&needle))).map_err(
        |source| SourceError::InvalidQuery {
            query: query.to_string(),
            source,
        },
    )?;

    // ASCII lowering keeps byte offsets valid for the original text
    let lowered = page.to_ascii_lowercase();
    let mut seen = HashSet::new();
    let mut handles = Vec::new();
    for m in re.find_iter(&lowered) {
        let quoted = &page[m.start()..m.end()];
        let handle = &quoted[3..quoted.len() - 1];
        if seen.insert(handle.to_string()) {
            handles.push(handle.to_string());
        }
    }
    Ok(handles)
}

/// Read the entries of a YouTube Atom feed, newest first as served.
///
/// Pure function so tests can exercise it without the network. Entries
/// without a `yt:videoId` are skipped.
pub fn parse_feed(body: &str) -> Result<Vec<Item>, String> {
    let feed = Feed::read_from(body.as_bytes()).map_err(|e| e.to_string())?;

    Ok(feed
        .entries()
        .iter()
        .filter_map(|entry| {
            let id = extension_value(entry.extensions(), "yt", "videoId")?;
            if id.is_empty() {
                return None;
            }
            Some(Item {
                title: entry.title().as_str().trim().to_string(),
                id,
                description: media_description(entry.extensions()).unwrap_or_default(),
            })
        })
        .collect())
}

fn extension_value(extensions: &ExtensionMap, prefix: &str, name: &str) -> Option<String> {
    extensions
        .get(prefix)?
        .get(name)?
        .first()?
        .value()
        .map(|v| v.trim().to_string())
}

/// `<media:group><media:description>` text, if any.
fn media_description(extensions: &ExtensionMap) -> Option<String> {
    let group = extensions.get("media")?.get("group")?.first()?;
    let children = group.children();
    children
        .get("description")
        .or_else(|| children.get("media:description"))?
        .first()?
        .value()
        .map(|v| v.trim().to_string())
}
