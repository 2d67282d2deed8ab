//! Videos command implementation.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::providers::YouTubeClient;
use crate::tools::is_likely_trailer;
use anyhow::Result;

/// Run the videos command.
pub async fn run_videos(
    query: &str,
    trailer: bool,
    limit: Option<usize>,
    settings: Settings,
) -> Result<()> {
    preflight::check(Operation::Search, &settings)?;

    let client = YouTubeClient::from_settings(&settings)?;
    if !client.has_api_key() {
        Output::info("No YouTube API key configured; results come from the public results page.");
    }

    let query = if trailer {
        format!("{} official trailer", query.trim())
    } else {
        query.to_string()
    };
    let limit = limit.unwrap_or(settings.youtube.max_results);

    let spinner = Output::spinner("Searching YouTube...");
    let result = client.search_videos(&query, limit).await;
    spinner.finish_and_clear();

    let hits = match result {
        Ok(hits) => hits,
        Err(e) => {
            Output::error(&format!("Video search failed: {}", e));
            return Err(e.into());
        }
    };

    if hits.is_empty() {
        Output::info(&format!("No videos found for \"{}\".", query));
        return Ok(());
    }

    Output::header(&format!("Videos for \"{}\"", query));
    for (i, hit) in hits.iter().enumerate() {
        let flag = trailer.then(|| is_likely_trailer(&hit.title));
        Output::video_hit(i + 1, hit, flag);
    }

    Ok(())
}
