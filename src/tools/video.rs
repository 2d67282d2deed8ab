//! YouTube video and trailer search tools.

use super::{count_arg, str_arg, BuiltinTool, ToolHandler, ToolResult};
use crate::error::{MarqueeError, Result};
use crate::providers::{VideoHit, YouTubeClient};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

const TRAILER_MARKERS: [&str; 3] = ["trailer", "teaser", "official"];

/// Whether a video title looks like a trailer.
pub fn is_likely_trailer(title: &str) -> bool {
    let lower = title.to_lowercase();
    TRAILER_MARKERS.iter().any(|m| lower.contains(m))
}

fn format_videos(query: &str, hits: &[VideoHit], flag_trailers: bool) -> String {
    if hits.is_empty() {
        return format!("No videos found for \"{}\".", query);
    }

    let formatted = hits
        .iter()
        .enumerate()
        .map(|(i, hit)| {
            let mut entry = format!(
                "{}. {}\n   {}\n   Thumbnail: {}",
                i + 1,
                hit.title,
                hit.url,
                hit.thumbnail_url
            );
            if flag_trailers {
                entry.push_str(&format!("\n   Likely trailer: {}", is_likely_trailer(&hit.title)));
            }
            entry
        })
        .collect::<Vec<_>>()
        .join("\n\n");

    format!("Found {} videos for \"{}\":\n\n{}", hits.len(), query, formatted)
}

/// General YouTube search (`youtube_search`).
pub struct YouTubeSearchTool {
    client: Arc<YouTubeClient>,
    default_results: usize,
}

impl YouTubeSearchTool {
    pub fn new(client: Arc<YouTubeClient>, default_results: usize) -> Self {
        Self {
            client,
            default_results,
        }
    }
}

#[async_trait]
impl ToolHandler for YouTubeSearchTool {
    async fn execute(&self, args: &Value) -> Result<ToolResult> {
        let name = BuiltinTool::YouTubeSearch.name();
        let query = str_arg(name, args, "query")?;
        let max = count_arg(name, args, "num_results", self.default_results)?;

        let hits = self.client.search_videos(query, max).await?;
        Ok(ToolResult::new(name, format_videos(query, &hits, false)))
    }
}

/// Trailer lookup for a movie or show (`movie_trailer_search`).
pub struct TrailerSearchTool {
    client: Arc<YouTubeClient>,
    default_results: usize,
}

impl TrailerSearchTool {
    pub fn new(client: Arc<YouTubeClient>, default_results: usize) -> Self {
        Self {
            client,
            default_results,
        }
    }
}

#[async_trait]
impl ToolHandler for TrailerSearchTool {
    async fn execute(&self, args: &Value) -> Result<ToolResult> {
        let name = BuiltinTool::TrailerSearch.name();
        let title = str_arg(name, args, "query")?;
        let max = count_arg(name, args, "num_results", self.default_results)?;

        if title.trim().is_empty() {
            return Err(MarqueeError::invalid_arguments(name, "query must not be empty"));
        }

        let query = format!("{} official trailer", title.trim());
        let hits = self.client.search_videos(&query, max).await?;
        Ok(ToolResult::new(name, format_videos(&query, &hits, true)))
    }
}
