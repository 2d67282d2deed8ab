//! Web search through the DuckDuckGo HTML endpoint.

use super::{check_status, html, http_client, validate_query};
use crate::config::SearchSettings;
use crate::error::{MarqueeError, Result};
use reqwest::StatusCode;
use scraper::{Html, Selector};
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;
use tracing::{debug, instrument};

const SERVICE: &str = "DuckDuckGo";

/// Result title anchors and snippets, matched in document order.
static RESULT_PARTS: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse("a.result__a, .result__snippet").expect("Invalid result selector")
});

/// A single ranked web search result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub title: String,
    pub snippet: String,
    pub url: String,
}

/// Client for the DuckDuckGo HTML search endpoint.
pub struct SearchClient {
    client: reqwest::Client,
    endpoint: String,
}

impl SearchClient {
    /// Create a client for the given endpoint.
    pub fn new(endpoint: &str, user_agent: &str, timeout_secs: u64) -> Result<Self> {
        Ok(Self {
            client: http_client(user_agent, timeout_secs)?,
            endpoint: endpoint.to_string(),
        })
    }

    /// Create a client from search settings.
    pub fn from_settings(settings: &SearchSettings) -> Result<Self> {
        Self::new(&settings.endpoint, &settings.user_agent, settings.timeout_secs)
    }

    /// Search the web and return up to `max_results` ranked hits.
    ///
    /// No hits is a valid, successful result.
    #[instrument(skip(self))]
    pub async fn search(&self, query: &str, max_results: usize) -> Result<Vec<SearchHit>> {
        validate_query("web_search", query, max_results)?;

        debug!("Searching {} for {:?}", self.endpoint, query);

        let response = self
            .client
            .get(&self.endpoint)
            .query(&[("q", query)])
            .send()
            .await?;

        // DuckDuckGo answers throttled clients with a 202 challenge page.
        if response.status() == StatusCode::ACCEPTED {
            return Err(MarqueeError::RateLimit(SERVICE.to_string()));
        }

        let body = check_status(SERVICE, response)?.text().await?;
        if body.contains("anomaly-modal") {
            return Err(MarqueeError::RateLimit(SERVICE.to_string()));
        }

        let hits = parse_results(&body, max_results);
        debug!("Parsed {} search results", hits.len());
        Ok(hits)
    }
}

/// Parse DuckDuckGo HTML results, in page order.
///
/// Each `result__a` anchor opens a hit; the next `result__snippet` anchor
/// supplies its snippet. Sponsored links are skipped.
pub fn parse_results(body: &str, max_results: usize) -> Vec<SearchHit> {
    let document = Html::parse_document(body);
    let mut hits: Vec<SearchHit> = Vec::new();
    let mut skipping_ad = false;

    for element in document.select(&RESULT_PARTS) {
        if element.value().classes().any(|c| c == "result__a") {
            let url = element
                .value()
                .attr("href")
                .map(resolve_url)
                .unwrap_or_default();

            if url.is_empty() || is_ad_link(&url) {
                skipping_ad = true;
                continue;
            }
            skipping_ad = false;

            if hits.len() == max_results {
                break;
            }
            hits.push(SearchHit {
                title: html::element_text(element),
                snippet: String::new(),
                url,
            });
        } else if !skipping_ad {
            if let Some(hit) = hits.last_mut() {
                if hit.snippet.is_empty() {
                    hit.snippet = html::element_text(element);
                }
            }
        }
    }

    hits
}

/// Turn a result href into the target URL, unwrapping `/l/?uddg=` redirects.
fn resolve_url(href: &str) -> String {
    let absolute = if href.starts_with("//") {
        format!("https:{}", href)
    } else {
        href.to_string()
    };

    match url::Url::parse(&absolute) {
        Ok(parsed) if parsed.path() == "/l/" => parsed
            .query_pairs()
            .find(|(k, _)| k == "uddg")
            .map(|(_, v)| v.into_owned())
            .unwrap_or(absolute),
        _ => absolute,
    }
}

fn is_ad_link(url: &str) -> bool {
    url.contains("duckduckgo.com/y.js")
}
