//! CLI output formatting utilities.

use crate::agent::ToolInvocation;
use crate::providers::{SearchHit, VideoHit};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};

/// Output helper for CLI formatting.
pub struct Output;

impl Output {
    /// Print an info message.
    pub fn info(msg: &str) {
        println!("{} {}", style(">>").cyan().bold(), msg);
    }

    /// Print a success message.
    pub fn success(msg: &str) {
        println!("{} {}", style(">>").green().bold(), msg);
    }

    /// Print a warning message.
    pub fn warning(msg: &str) {
        eprintln!("{} {}", style(">>").yellow().bold(), msg);
    }

    /// Print an error message.
    pub fn error(msg: &str) {
        eprintln!("{} {}", style(">>").red().bold(), msg);
    }

    /// Print a header.
    pub fn header(msg: &str) {
        println!("\n{}", style(msg).bold().underlined());
    }

    /// Print a key-value pair.
    pub fn kv(key: &str, value: &str) {
        println!("  {}: {}", style(key).dim(), value);
    }

    /// Print a list item.
    pub fn list_item(msg: &str) {
        println!("  {} {}", style("*").cyan(), msg);
    }

    /// Print the assistant's answer.
    pub fn answer(text: &str) {
        println!("\n{} {}\n", style("Marquee:").cyan().bold(), text);
    }

    /// Print one ranked web search hit.
    pub fn search_hit(rank: usize, hit: &SearchHit) {
        println!("\n{} {}", style(format!("{}.", rank)).green(), style(&hit.title).bold());
        if !hit.snippet.is_empty() {
            println!("   {}", content_preview(&hit.snippet, 200));
        }
        println!("   {}", style(&hit.url).dim());
    }

    /// Print one ranked video hit.
    pub fn video_hit(rank: usize, hit: &VideoHit, likely_trailer: Option<bool>) {
        let marker = match likely_trailer {
            Some(true) => format!(" {}", style("[trailer]").yellow()),
            _ => String::new(),
        };
        println!(
            "\n{} {}{}",
            style(format!("{}.", rank)).green(),
            style(&hit.title).bold(),
            marker
        );
        println!("   {}", hit.url);
        println!("   {}", style(&hit.thumbnail_url).dim());
    }

    /// Print the tool calls made during a session.
    pub fn tool_trace(trace: &[ToolInvocation]) {
        for invocation in trace {
            let icon = if invocation.ok {
                style("✓").green()
            } else {
                style("✗").red()
            };
            println!(
                "  {} {} {}",
                icon,
                style(invocation.to_string()).bold(),
                style(invocation.timestamp.format("%H:%M:%S")).dim()
            );
            if let Some(rating) = invocation.rating {
                Output::kv("rating", &format!("{}/10", rating));
            }
            if let Some(date) = &invocation.release_date {
                Output::kv("release date", date);
            }
        }
    }

    /// Create a spinner.
    pub fn spinner(msg: &str) -> ProgressBar {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        pb.set_message(msg.to_string());
        pb.enable_steady_tick(std::time::Duration::from_millis(100));
        pb
    }
}

/// Single-line preview, cut on a char boundary.
fn content_preview(content: &str, max_chars: usize) -> String {
    let content = content.replace('\n', " ");
    if content.chars().count() <= max_chars {
        content
    } else {
        let cut: String = content.chars().take(max_chars).collect();
        format!("{}...", cut)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_preview() {
        assert_eq!(content_preview("short\ntext", 20), "short text");
        assert_eq!(content_preview("Amélie Amélie", 6), "Amélie...");
    }
}
