//! Tools the language model can call.
//!
//! Every tool implements [`ToolHandler`]. The built-in set is the closed enum
//! [`BuiltinTool`]; [`builtin_registry`] registers all of them once at startup
//! and the agent dispatches by name through the resulting [`ToolRegistry`].

mod registry;
mod video;
mod web;

pub use registry::{ParamSpec, ParamType, ToolRegistry, ToolSchema, ToolSpec};
pub use video::{is_likely_trailer, TrailerSearchTool, YouTubeSearchTool};
pub use web::{MovieInfo, MovieInfoTool, WebSearchTool};

use crate::config::Settings;
use crate::error::{MarqueeError, Result};
use crate::extract;
use crate::providers::{SearchClient, YouTubeClient};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Arc;

/// Capability shared by every tool.
#[async_trait]
pub trait ToolHandler: Send + Sync {
    /// Run the tool with schema-validated arguments.
    async fn execute(&self, args: &Value) -> Result<ToolResult>;
}

/// Outcome of one tool invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolResult {
    pub tool: String,
    pub output: String,
    pub rating: Option<f32>,
    pub release_date: Option<String>,
}

impl ToolResult {
    pub fn new(tool: &str, output: impl Into<String>) -> Self {
        Self {
            tool: tool.to_string(),
            output: output.into(),
            rating: None,
            release_date: None,
        }
    }

    /// Fill rating and release date from texts in rank order; the first text
    /// that yields a value wins.
    pub fn with_extracted<'a>(mut self, texts: impl IntoIterator<Item = &'a str>) -> Self {
        for text in texts {
            if self.rating.is_none() {
                self.rating = extract::extract_rating(text);
            }
            if self.release_date.is_none() {
                self.release_date = extract::extract_release_date(text);
            }
            if self.rating.is_some() && self.release_date.is_some() {
                break;
            }
        }
        self
    }

    /// Content of the tool message handed back to the model.
    pub fn to_message_content(&self) -> String {
        let mut content = self.output.clone();
        if let Some(rating) = self.rating {
            content.push_str(&format!("\n\nExtracted rating: {}/10", rating));
        }
        if let Some(date) = &self.release_date {
            content.push_str(&format!("\nExtracted release date: {}", date));
        }
        content
    }
}

/// The built-in tools.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuiltinTool {
    WebSearch,
    MovieInfo,
    YouTubeSearch,
    TrailerSearch,
}

impl BuiltinTool {
    pub const ALL: [BuiltinTool; 4] = [
        BuiltinTool::WebSearch,
        BuiltinTool::MovieInfo,
        BuiltinTool::YouTubeSearch,
        BuiltinTool::TrailerSearch,
    ];

    pub fn name(self) -> &'static str {
        match self {
            BuiltinTool::WebSearch => "web_search",
            BuiltinTool::MovieInfo => "movie_info_search",
            BuiltinTool::YouTubeSearch => "youtube_search",
            BuiltinTool::TrailerSearch => "movie_trailer_search",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            BuiltinTool::WebSearch => {
                "Search the web using DuckDuckGo. Returns ranked titles, links and snippets. \
                Use this for general questions or anything the other tools miss."
            }
            BuiltinTool::MovieInfo => {
                "Search for specific information about a movie or TV show \
                (title, release year, IMDb rating, synopsis, sources)."
            }
            BuiltinTool::YouTubeSearch => "Search for videos on YouTube based on a query.",
            BuiltinTool::TrailerSearch => {
                "Search for trailers of specific movies or TV shows on YouTube."
            }
        }
    }

    /// Input schema, with per-tool default result counts from settings.
    pub fn schema(self, settings: &Settings) -> ToolSchema {
        let (query_doc, default_results) = match self {
            BuiltinTool::WebSearch => ("The search query to use.", settings.search.max_results),
            BuiltinTool::MovieInfo => (
                "Title of the movie or TV show, optionally with the year.",
                settings.search.movie_info_results,
            ),
            BuiltinTool::YouTubeSearch => ("The search query to use.", settings.youtube.max_results),
            BuiltinTool::TrailerSearch => (
                "Title of the movie or TV show.",
                settings.youtube.max_results,
            ),
        };

        ToolSchema::new()
            .required("query", ParamType::String, query_doc)
            .optional(
                "num_results",
                ParamType::Integer,
                "Number of search results to return.",
                json!(default_results),
            )
    }

    fn handler(
        self,
        settings: &Settings,
        search: &Arc<SearchClient>,
        youtube: &Arc<YouTubeClient>,
    ) -> Arc<dyn ToolHandler> {
        match self {
            BuiltinTool::WebSearch => Arc::new(WebSearchTool::new(
                search.clone(),
                settings.search.max_results,
            )),
            BuiltinTool::MovieInfo => Arc::new(MovieInfoTool::new(
                search.clone(),
                settings.search.movie_info_results,
            )),
            BuiltinTool::YouTubeSearch => Arc::new(YouTubeSearchTool::new(
                youtube.clone(),
                settings.youtube.max_results,
            )),
            BuiltinTool::TrailerSearch => Arc::new(TrailerSearchTool::new(
                youtube.clone(),
                settings.youtube.max_results,
            )),
        }
    }
}

/// Build the registry of built-in tools with their provider clients.
pub fn builtin_registry(settings: &Settings) -> Result<ToolRegistry> {
    let search = Arc::new(SearchClient::from_settings(&settings.search)?);
    let youtube = Arc::new(YouTubeClient::from_settings(settings)?);

    let mut registry = ToolRegistry::new();
    for tool in BuiltinTool::ALL {
        registry.register(
            tool.name(),
            tool.description(),
            tool.schema(settings),
            tool.handler(settings, &search, &youtube),
        )?;
    }
    Ok(registry)
}

/// Required string argument.
pub(crate) fn str_arg<'a>(tool: &str, args: &'a Value, name: &str) -> Result<&'a str> {
    args.get(name)
        .and_then(Value::as_str)
        .ok_or_else(|| MarqueeError::invalid_arguments(tool, format!("missing '{}'", name)))
}

/// Optional positive count argument.
pub(crate) fn count_arg(tool: &str, args: &Value, name: &str, default: usize) -> Result<usize> {
    match args.get(name) {
        None | Some(Value::Null) => Ok(default),
        Some(value) => match value.as_u64() {
            Some(n) if n > 0 => Ok(n as usize),
            _ => Err(MarqueeError::invalid_arguments(
                tool,
                format!("'{}' must be a positive integer", name),
            )),
        },
    }
}
