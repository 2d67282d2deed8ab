//! Doctor command - verify configuration and provider connectivity.

use crate::cli::Output;
use crate::config::Settings;
use crate::error::MarqueeError;
use crate::providers::SearchClient;
use console::style;
use std::path::Path;

/// Check result for a single item.
#[derive(Debug)]
pub struct CheckResult {
    pub name: String,
    pub status: CheckStatus,
    pub message: String,
    pub hint: Option<String>,
}

#[derive(Debug, PartialEq)]
pub enum CheckStatus {
    Ok,
    Warning,
    Error,
}

impl CheckResult {
    fn ok(name: &str, message: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Ok,
            message: message.to_string(),
            hint: None,
        }
    }

    fn warning(name: &str, message: &str, hint: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Warning,
            message: message.to_string(),
            hint: Some(hint.to_string()),
        }
    }

    fn error(name: &str, message: &str, hint: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Error,
            message: message.to_string(),
            hint: Some(hint.to_string()),
        }
    }

    fn print(&self) {
        let icon = match self.status {
            CheckStatus::Ok => style("✓").green(),
            CheckStatus::Warning => style("!").yellow(),
            CheckStatus::Error => style("✗").red(),
        };

        println!("  {} {} - {}", icon, style(&self.name).bold(), self.message);

        if let Some(hint) = &self.hint {
            println!("    {} {}", style("→").dim(), style(hint).dim());
        }
    }
}

/// Run all diagnostic checks.
pub async fn run_doctor(settings: &Settings, config_path: &Path) -> anyhow::Result<()> {
    Output::header("Marquee Doctor");
    println!();
    println!("Checking configuration and providers...\n");

    let mut checks = Vec::new();

    println!("{}", style("API Configuration").bold());
    let api_checks = vec![
        check_openai_api_key(settings.openai_api_key().as_deref()),
        check_youtube_api_key(settings.youtube_api_key().as_deref()),
        CheckResult::ok("Model", &settings.openai.model),
    ];
    for check in &api_checks {
        check.print();
    }
    checks.extend(api_checks);

    println!();

    println!("{}", style("Providers").bold());
    let search_check = check_search(settings).await;
    search_check.print();
    checks.push(search_check);

    println!();

    println!("{}", style("Configuration").bold());
    let config_check = check_config_file(config_path);
    config_check.print();
    checks.push(config_check);

    println!();

    let errors = checks.iter().filter(|c| c.status == CheckStatus::Error).count();
    let warnings = checks.iter().filter(|c| c.status == CheckStatus::Warning).count();

    if errors > 0 {
        Output::error(&format!(
            "{} error(s) found. Please fix them before using Marquee.",
            errors
        ));
        anyhow::bail!("doctor found {} error(s)", errors);
    } else if warnings > 0 {
        Output::warning(&format!("All checks passed with {} warning(s).", warnings));
    } else {
        Output::success("All checks passed! Marquee is ready to use.");
    }

    Ok(())
}

/// Show the first and last characters of a secret.
fn mask_key(key: &str) -> String {
    let chars: Vec<char> = key.chars().collect();
    if chars.len() <= 12 {
        return "***".to_string();
    }
    let head: String = chars[..7].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{}...{}", head, tail)
}

fn check_openai_api_key(key: Option<&str>) -> CheckResult {
    match key {
        Some(key) if key.starts_with("sk-") => {
            CheckResult::ok("OpenAI API key", &format!("configured ({})", mask_key(key)))
        }
        Some(_) => CheckResult::warning(
            "OpenAI API key",
            "set but format looks unusual",
            "Expected format: sk-... (OpenAI API key)",
        ),
        None => CheckResult::error(
            "OpenAI API key",
            "not set",
            "Set with: export OPENAI_API_KEY='sk-...' or openai.api_key in the config file",
        ),
    }
}

fn check_youtube_api_key(key: Option<&str>) -> CheckResult {
    match key {
        Some(key) => CheckResult::ok("YouTube API key", &format!("configured ({})", mask_key(key))),
        None => CheckResult::warning(
            "YouTube API key",
            "not set, video search scrapes the public results page",
            "Set YOUTUBE_API_KEY for more reliable video results",
        ),
    }
}

/// Run one small search to check the search provider is reachable.
async fn check_search(settings: &Settings) -> CheckResult {
    let client = match SearchClient::from_settings(&settings.search) {
        Ok(client) => client,
        Err(e) => return CheckResult::error("Web search", &e.to_string(), "Check the [search] section"),
    };

    match client.search("imdb", 1).await {
        Ok(_) => CheckResult::ok("Web search", &settings.search.endpoint),
        Err(MarqueeError::RateLimit(_)) => CheckResult::warning(
            "Web search",
            "reachable but rate limited",
            "Wait a few minutes before searching again",
        ),
        Err(e) => CheckResult::warning(
            "Web search",
            &format!("unreachable: {}", e),
            "Check your network connection or search.endpoint",
        ),
    }
}

fn check_config_file(config_path: &Path) -> CheckResult {
    if config_path.exists() {
        CheckResult::ok("Config file", &format!("{}", config_path.display()))
    } else {
        CheckResult::warning(
            "Config file",
            "using defaults",
            "Create with: marquee config edit",
        )
    }
}
