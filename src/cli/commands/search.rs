//! Search command implementation.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::extract;
use crate::providers::SearchClient;
use anyhow::Result;

/// Run the search command.
pub async fn run_search(query: &str, limit: Option<usize>, settings: Settings) -> Result<()> {
    preflight::check(Operation::Search, &settings)?;

    let client = SearchClient::from_settings(&settings.search)?;
    let limit = limit.unwrap_or(settings.search.max_results);

    let spinner = Output::spinner("Searching...");
    let result = client.search(query, limit).await;
    spinner.finish_and_clear();

    let hits = match result {
        Ok(hits) => hits,
        Err(e) => {
            Output::error(&format!("Search failed: {}", e));
            return Err(e.into());
        }
    };

    if hits.is_empty() {
        Output::info(&format!("No results found for \"{}\".", query));
        return Ok(());
    }

    Output::header(&format!("Results for \"{}\"", query));
    for (i, hit) in hits.iter().enumerate() {
        Output::search_hit(i + 1, hit);
    }

    let rating = hits.iter().find_map(|h| extract::extract_rating(&h.snippet));
    let release_date = hits
        .iter()
        .find_map(|h| extract::extract_release_date(&h.snippet));

    if rating.is_some() || release_date.is_some() {
        Output::header("Extracted");
        if let Some(rating) = rating {
            Output::kv("Rating", &format!("{}/10", rating));
        }
        if let Some(date) = release_date {
            Output::kv("Release date", &date);
        }
    }

    Ok(())
}
