//! Query engine for paginated, filtered reads
//!
//! Pipeline: pick candidates (whole buffer, or one channel bucket) → keep the
//! ones matching the search term → count → slice the requested page.

use rayon::prelude::*;
use serde::{Deserialize, Deserializer};

use crate::types::{Message, MessagePage};

use super::buffer::MessageBuffer;
use super::channel_index::ChannelIndex;

/// Smallest page size a reader may ask for
pub const MIN_PAGE_SIZE: usize = 5;

/// Largest page size a reader may ask for
pub const MAX_PAGE_SIZE: usize = 100;

/// Threshold for using parallel search (candidate count)
const PARALLEL_SEARCH_THRESHOLD: usize = 1000;

/// Read request. Out-of-range values are normalized, never rejected.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageQuery {
    #[serde(default, deserialize_with = "lenient_count")]
    pub page: Option<usize>,
    #[serde(default, deserialize_with = "lenient_count")]
    pub page_size: Option<usize>,
    /// Exact channel name
    #[serde(default)]
    pub channel: Option<String>,
    /// Case-insensitive substring over text, nickname and channel
    #[serde(default, alias = "search")]
    pub q: Option<String>,
}

impl MessageQuery {
    pub fn page(page: usize, page_size: usize) -> Self {
        Self {
            page: Some(page),
            page_size: Some(page_size),
            ..Default::default()
        }
    }

    pub fn in_channel(mut self, channel: impl Into<String>) -> Self {
        self.channel = Some(channel.into());
        self
    }

    pub fn matching(mut self, term: impl Into<String>) -> Self {
        self.q = Some(term.into());
        self
    }
}

/// Read a count from a query string without ever failing: negative numbers
/// become 0 (normalized upward later) and anything unparseable is treated as
/// absent.
fn lenient_count<'de, D>(deserializer: D) -> Result<Option<usize>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw.and_then(|value| {
        let value = value.trim();
        value
            .parse::<usize>()
            .ok()
            .or_else(|| value.parse::<i64>().ok().map(|_| 0))
    }))
}

/// Run a query against the buffer and its channel index
pub fn run_query(
    buffer: &MessageBuffer,
    index: &ChannelIndex,
    query: &MessageQuery,
    default_page_size: usize,
) -> MessagePage {
    let page = query.page.unwrap_or(1).max(1);
    let page_size = query
        .page_size
        .unwrap_or(default_page_size)
        .clamp(MIN_PAGE_SIZE, MAX_PAGE_SIZE);

    let channel = non_blank(query.channel.as_deref());
    let candidates: Vec<&Message> = match channel {
        Some(channel) => index
            .bucket(channel)
            .iter()
            .filter_map(|&pos| buffer.get(pos))
            .collect(),
        None => buffer.iter().collect(),
    };

    let matching = match non_blank(query.q.as_deref()) {
        Some(term) => search(candidates, &term.to_lowercase()),
        None => candidates,
    };

    let total = matching.len();
    let total_pages = total.div_ceil(page_size);
    let start = (page - 1).saturating_mul(page_size);
    let items = matching
        .into_iter()
        .skip(start)
        .take(page_size)
        .cloned()
        .collect();

    MessagePage {
        total,
        total_pages,
        page,
        page_size,
        items,
    }
}

/// Keep candidates containing `needle` (already lowercased), preserving order
fn search<'a>(candidates: Vec<&'a Message>, needle: &str) -> Vec<&'a Message> {
    if candidates.len() > PARALLEL_SEARCH_THRESHOLD {
        candidates
            .into_par_iter()
            .filter(|m| matches_term(m, needle))
            .collect()
    } else {
        candidates
            .into_iter()
            .filter(|m| matches_term(m, needle))
            .collect()
    }
}

fn matches_term(message: &Message, needle: &str) -> bool {
    contains_ignore_case(&message.text, needle)
        || contains_ignore_case(&message.nickname, needle)
        || contains_ignore_case(&message.channel, needle)
}

fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(needle)
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}
