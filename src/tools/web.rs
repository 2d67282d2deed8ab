//! Web search and movie-info tools.

use super::{count_arg, str_arg, BuiltinTool, ToolHandler, ToolResult};
use crate::error::{MarqueeError, Result};
use crate::extract;
use crate::providers::{SearchClient, SearchHit};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

const SYNOPSIS_MIN_CHARS: usize = 100;
const SYNOPSIS_MAX_CHARS: usize = 300;

/// General web search (`web_search`).
pub struct WebSearchTool {
    client: Arc<SearchClient>,
    default_results: usize,
}

impl WebSearchTool {
    pub fn new(client: Arc<SearchClient>, default_results: usize) -> Self {
        Self {
            client,
            default_results,
        }
    }
}

#[async_trait]
impl ToolHandler for WebSearchTool {
    async fn execute(&self, args: &Value) -> Result<ToolResult> {
        let name = BuiltinTool::WebSearch.name();
        let query = str_arg(name, args, "query")?;
        let max = count_arg(name, args, "num_results", self.default_results)?;

        let hits = self.client.search(query, max).await?;
        let output = format_hits(query, &hits);

        Ok(ToolResult::new(name, output).with_extracted(hits.iter().map(|h| h.snippet.as_str())))
    }
}

fn format_hits(query: &str, hits: &[SearchHit]) -> String {
    if hits.is_empty() {
        return format!("No results found for \"{}\".", query);
    }

    let formatted = hits
        .iter()
        .enumerate()
        .map(|(i, hit)| format!("{}. {}\n   {}\n   {}", i + 1, hit.title, hit.url, hit.snippet))
        .collect::<Vec<_>>()
        .join("\n\n");

    format!("Found {} results for \"{}\":\n\n{}", hits.len(), query, formatted)
}

/// Facts assembled from ranked movie-info search results.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MovieInfo {
    pub title: String,
    pub release_year: Option<i32>,
    pub release_date: Option<String>,
    pub imdb_rating: Option<f32>,
    pub synopsis: Option<String>,
    pub sources: Vec<String>,
}

impl MovieInfo {
    /// Build from hits in rank order. Returns `None` when there are no hits.
    pub fn from_hits(hits: &[SearchHit]) -> Option<Self> {
        let first = hits.first()?;
        let title = clean_title(&first.title);

        let mut info = MovieInfo {
            title,
            sources: hits.iter().map(|h| h.url.clone()).collect(),
            ..Default::default()
        };

        for hit in hits {
            if info.imdb_rating.is_none() {
                info.imdb_rating = extract::extract_rating(&hit.snippet);
            }
            if info.release_date.is_none() {
                info.release_date = extract::extract_release_date(&hit.snippet);
            }
        }

        info.release_year = extract::title_year(&info.title)
            .or_else(|| {
                info.release_date
                    .as_deref()
                    .and_then(|d| d.get(..4))
                    .and_then(|y| y.parse().ok())
            })
            .or_else(|| hits.iter().find_map(|h| extract::extract_year(&h.snippet)));

        info.synopsis = hits
            .iter()
            .map(|h| h.snippet.trim())
            .find(|s| s.chars().count() > SYNOPSIS_MIN_CHARS)
            .map(truncate_synopsis);

        Some(info)
    }

    fn to_text(&self) -> String {
        let mut lines = vec![format!("Title: {}", self.title)];
        if let Some(year) = self.release_year {
            lines.push(format!("Release year: {}", year));
        }
        if let Some(date) = &self.release_date {
            lines.push(format!("Release date: {}", date));
        }
        if let Some(rating) = self.imdb_rating {
            lines.push(format!("IMDb rating: {}/10", rating));
        }
        if let Some(synopsis) = &self.synopsis {
            lines.push(format!("Synopsis: {}", synopsis));
        }
        if !self.sources.is_empty() {
            lines.push("Sources:".to_string());
            for (i, source) in self.sources.iter().enumerate() {
                lines.push(format!("{}. {}", i + 1, source));
            }
        }
        lines.join("\n")
    }
}

/// Drop site suffixes such as " - IMDb" or " | Official Site".
fn clean_title(title: &str) -> String {
    let cut = [" - ", " | "]
        .iter()
        .filter_map(|sep| title.find(sep))
        .min()
        .unwrap_or(title.len());
    title[..cut].trim().to_string()
}

fn truncate_synopsis(text: &str) -> String {
    if text.chars().count() <= SYNOPSIS_MAX_CHARS {
        return text.to_string();
    }
    let cut: String = text.chars().take(SYNOPSIS_MAX_CHARS).collect();
    format!("{}...", cut.trim_end())
}

/// Targeted movie and TV fact lookup (`movie_info_search`).
pub struct MovieInfoTool {
    client: Arc<SearchClient>,
    default_results: usize,
}

impl MovieInfoTool {
    pub fn new(client: Arc<SearchClient>, default_results: usize) -> Self {
        Self {
            client,
            default_results,
        }
    }
}

#[async_trait]
impl ToolHandler for MovieInfoTool {
    async fn execute(&self, args: &Value) -> Result<ToolResult> {
        let name = BuiltinTool::MovieInfo.name();
        let title = str_arg(name, args, "query")?;
        let max = count_arg(name, args, "num_results", self.default_results)?;

        if title.trim().is_empty() {
            return Err(MarqueeError::invalid_arguments(name, "query must not be empty"));
        }

        let query = format!("{} movie information IMDb rating release date", title.trim());
        let hits = self.client.search(&query, max).await?;

        let Some(info) = MovieInfo::from_hits(&hits) else {
            return Ok(ToolResult::new(
                name,
                format!("No information found for \"{}\".", title),
            ));
        };

        let mut result = ToolResult::new(name, info.to_text());
        result.rating = info.imdb_rating;
        result.release_date = info.release_date;
        Ok(result)
    }
}
