//! YouTube video search.
//!
//! Uses the YouTube Data API when a key is configured and falls back to
//! scraping the public results page otherwise. The scrape path depends on
//! YouTube's page markup and may return fewer or untitled results.

use super::{check_status, html, http_client, validate_query};
use crate::config::Settings;
use crate::error::{MarqueeError, Result};
use regex::Regex;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;
use tracing::{debug, instrument, warn};

const SERVICE: &str = "YouTube";

/// Data API caps `maxResults` at 50.
const API_MAX_RESULTS: usize = 50;

static VIDEO_RENDERER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#""videoRenderer":\{"videoId":"([a-zA-Z0-9_-]{11})""#)
        .expect("Invalid renderer regex")
});

static RENDERER_TITLE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#""title":\{(?:"runs":\[\{"text"|"simpleText"):"((?:[^"\\]|\\.)*)""#)
        .expect("Invalid title regex")
});

static WATCH_LINK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"watch\?v=([a-zA-Z0-9_-]{11})").expect("Invalid watch link regex")
});

/// A single ranked video search result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoHit {
    pub title: String,
    pub video_id: String,
    pub url: String,
    pub thumbnail_url: String,
}

impl VideoHit {
    pub fn new(video_id: &str, title: &str) -> Self {
        Self {
            title: title.to_string(),
            video_id: video_id.to_string(),
            url: format!("https://www.youtube.com/watch?v={}", video_id),
            thumbnail_url: format!("https://i.ytimg.com/vi/{}/hqdefault.jpg", video_id),
        }
    }
}

/// YouTube search client.
pub struct YouTubeClient {
    client: reqwest::Client,
    api_key: Option<String>,
    api_endpoint: String,
    results_endpoint: String,
}

impl YouTubeClient {
    pub fn new(
        api_key: Option<String>,
        api_endpoint: &str,
        results_endpoint: &str,
        user_agent: &str,
        timeout_secs: u64,
    ) -> Result<Self> {
        Ok(Self {
            client: http_client(user_agent, timeout_secs)?,
            api_key,
            api_endpoint: api_endpoint.to_string(),
            results_endpoint: results_endpoint.to_string(),
        })
    }

    /// Create a client from settings, picking up the optional API key.
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        Self::new(
            settings.youtube_api_key(),
            &settings.youtube.api_endpoint,
            &settings.youtube.results_endpoint,
            &settings.search.user_agent,
            settings.youtube.timeout_secs,
        )
    }

    /// Whether searches go through the authenticated Data API.
    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    /// Search for videos and return up to `max_results` ranked hits.
    #[instrument(skip(self))]
    pub async fn search_videos(&self, query: &str, max_results: usize) -> Result<Vec<VideoHit>> {
        validate_query("youtube_search", query, max_results)?;

        match &self.api_key {
            Some(key) => self.search_api(key, query, max_results).await,
            None => {
                debug!("No YouTube API key configured, scraping results page");
                self.search_results_page(query, max_results).await
            }
        }
    }

    async fn search_api(&self, key: &str, query: &str, max_results: usize) -> Result<Vec<VideoHit>> {
        let max = max_results.min(API_MAX_RESULTS).to_string();
        let response = self
            .client
            .get(&self.api_endpoint)
            .query(&[
                ("part", "snippet"),
                ("type", "video"),
                ("q", query),
                ("maxResults", max.as_str()),
                ("key", key),
            ])
            .send()
            .await?;

        // Quota exhaustion is reported as 403 with a reason in the body.
        if response.status() == StatusCode::FORBIDDEN {
            let body = response.text().await.unwrap_or_default();
            if body.contains("quotaExceeded") || body.contains("rateLimitExceeded") {
                return Err(MarqueeError::RateLimit(SERVICE.to_string()));
            }
            warn!("YouTube API rejected the request: {}", body);
            return Err(MarqueeError::UnexpectedStatus {
                service: SERVICE.to_string(),
                status: StatusCode::FORBIDDEN.as_u16(),
            });
        }

        let payload: ApiSearchResponse = check_status(SERVICE, response)?.json().await?;

        Ok(payload
            .items
            .into_iter()
            .filter_map(|item| {
                let video_id = item.id.video_id?;
                let title = item
                    .snippet
                    .map(|s| html::to_text(&s.title))
                    .unwrap_or_default();
                Some(VideoHit::new(&video_id, &title))
            })
            .take(max_results)
            .collect())
    }

    async fn search_results_page(&self, query: &str, max_results: usize) -> Result<Vec<VideoHit>> {
        let response = self
            .client
            .get(&self.results_endpoint)
            .query(&[("search_query", query)])
            .header("Accept-Language", "en-US,en;q=0.9")
            .send()
            .await?;

        let body = check_status(SERVICE, response)?.text().await?;
        Ok(parse_results_page(&body, max_results))
    }
}

/// Extract videos from a YouTube results page.
///
/// Prefers `videoRenderer` entries (id plus title). When none parse, falls
/// back to bare `watch?v=` links with placeholder titles. Ids are
/// de-duplicated in first-seen order.
pub fn parse_results_page(body: &str, max_results: usize) -> Vec<VideoHit> {
    let renderers: Vec<_> = VIDEO_RENDERER.captures_iter(body).collect();
    let mut hits: Vec<VideoHit> = Vec::new();

    for (i, caps) in renderers.iter().enumerate() {
        if hits.len() == max_results {
            break;
        }
        let video_id = &caps[1];
        if hits.iter().any(|h| h.video_id == video_id) {
            continue;
        }

        let start = caps.get(0).map_or(0, |m| m.end());
        let end = renderers
            .get(i + 1)
            .and_then(|next| next.get(0))
            .map_or(body.len(), |m| m.start());
        let title = RENDERER_TITLE
            .captures(&body[start..end])
            .map(|t| decode_json_string(&t[1]))
            .unwrap_or_else(|| format!("Video {}", hits.len() + 1));

        hits.push(VideoHit::new(video_id, &title));
    }

    if hits.is_empty() {
        for caps in WATCH_LINK.captures_iter(body) {
            if hits.len() == max_results {
                break;
            }
            let video_id = &caps[1];
            if !hits.iter().any(|h| h.video_id == video_id) {
                let title = format!("Video {}", hits.len() + 1);
                hits.push(VideoHit::new(video_id, &title));
            }
        }
    }

    hits
}

/// Decode the escapes of a JSON string body (without quotes).
fn decode_json_string(raw: &str) -> String {
    serde_json::from_str::<String>(&format!("\"{}\"", raw)).unwrap_or_else(|_| raw.to_string())
}

#[derive(Debug, Deserialize)]
struct ApiSearchResponse {
    #[serde(default)]
    items: Vec<ApiSearchItem>,
}

#[derive(Debug, Deserialize)]
struct ApiSearchItem {
    id: ApiItemId,
    snippet: Option<ApiSnippet>,
}

#[derive(Debug, Deserialize)]
struct ApiItemId {
    #[serde(rename = "videoId")]
    video_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiSnippet {
    title: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const RESULTS_PAGE: &str = r#"<script>var ytInitialData = {"contents":[
{"videoRenderer":{"videoId":"YoHD9XEInc0","thumbnail":{},"title":{"runs":[{"text":"Inception (2010) Official Trailer #1 - Christopher Nolan Movie & HD"}]}}},
{"videoRenderer":{"videoId":"YoHD9XEInc0","title":{"runs":[{"text":"duplicate"}]}}},
{"videoRenderer":{"videoId":"8hP9D6kZseM","title":{"runs":[{"text":"Inception - \"Mombasa\" chase"}]}}},
{"videoRenderer":{"videoId":"66TuSJo4dZM","title":{"simpleText":"Inception Explained"}}}
]};</script>"#;

    fn client_for(server: &MockServer, api_key: Option<&str>) -> YouTubeClient {
        YouTubeClient::new(
            api_key.map(String::from),
            &format!("{}/youtube/v3/search", server.uri()),
            &format!("{}/results", server.uri()),
            "marquee-test",
            5,
        )
        .unwrap()
    }

    #[test]
    fn test_parse_results_page() {
        let hits = parse_results_page(RESULTS_PAGE, 10);
        assert_eq!(hits.len(), 3);
        assert_eq!(hits[0].video_id, "YoHD9XEInc0");
        assert_eq!(
            hits[0].title,
            "Inception (2010) Official Trailer #1 - Christopher Nolan Movie & HD"
        );
        assert_eq!(hits[0].url, "https://www.youtube.com/watch?v=YoHD9XEInc0");
        assert_eq!(
            hits[0].thumbnail_url,
            "https://i.ytimg.com/vi/YoHD9XEInc0/hqdefault.jpg"
        );
        assert_eq!(hits[1].title, "Inception - \"Mombasa\" chase");
        assert_eq!(hits[2].title, "Inception Explained");
    }

    #[test]
    fn test_parse_results_page_falls_back_to_watch_links() {
        let page = r#"<a href="/watch?v=YoHD9XEInc0">a</a><a href="/watch?v=YoHD9XEInc0&t=1">b</a><a href="/watch?v=8hP9D6kZseM">c</a>"#;
        let hits = parse_results_page(page, 5);
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].title, "Video 1");
        assert_eq!(hits[1].video_id, "8hP9D6kZseM");
        assert_eq!(hits[1].title, "Video 2");
    }

    #[test]
    fn test_parse_results_page_limit() {
        assert_eq!(parse_results_page(RESULTS_PAGE, 1).len(), 1);
        assert!(parse_results_page("<html></html>", 3).is_empty());
    }

    #[tokio::test]
    async fn test_api_search() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/youtube/v3/search"))
            .and(query_param("key", "yt-key"))
            .and(query_param("q", "Inception trailer"))
            .and(query_param("type", "video"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "items": [
                    {"id": {"kind": "youtube#video", "videoId": "YoHD9XEInc0"},
                     "snippet": {"title": "Inception &#39;Official&#39; Trailer"}},
                    {"id": {"kind": "youtube#channel", "channelId": "UC123"},
                     "snippet": {"title": "Warner Bros."}}
                ]
            })))
            .mount(&server)
            .await;

        let client = client_for(&server, Some("yt-key"));
        assert!(client.has_api_key());

        let hits = client.search_videos("Inception trailer", 5).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].title, "Inception 'Official' Trailer");
    }

    #[tokio::test]
    async fn test_api_quota_exceeded_is_rate_limit() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(403).set_body_string(
                r#"{"error":{"code":403,"errors":[{"reason":"quotaExceeded"}]}}"#,
            ))
            .mount(&server)
            .await;

        let err = client_for(&server, Some("yt-key"))
            .search_videos("Inception", 1)
            .await
            .unwrap_err();
        assert!(matches!(err, MarqueeError::RateLimit(_)));
    }

    #[tokio::test]
    async fn test_api_forbidden_without_quota_reason() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(403).set_body_string(r#"{"error":{"code":403}}"#))
            .mount(&server)
            .await;

        let err = client_for(&server, Some("bad-key"))
            .search_videos("Inception", 1)
            .await
            .unwrap_err();
        assert!(matches!(err, MarqueeError::UnexpectedStatus { status: 403, .. }));
    }

    #[tokio::test]
    async fn test_scrape_without_key() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/results"))
            .and(query_param("search_query", "Inception official trailer"))
            .respond_with(ResponseTemplate::new(200).set_body_string(RESULTS_PAGE))
            .mount(&server)
            .await;

        let client = client_for(&server, None);
        assert!(!client.has_api_key());

        let hits = client
            .search_videos("Inception official trailer", 2)
            .await
            .unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[1].video_id, "8hP9D6kZseM");
    }

    #[tokio::test]
    async fn test_scrape_rate_limited() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(429))
            .mount(&server)
            .await;

        let err = client_for(&server, None)
            .search_videos("Inception", 1)
            .await
            .unwrap_err();
        assert!(matches!(err, MarqueeError::RateLimit(_)));
    }
}
