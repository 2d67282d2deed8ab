//! Pre-flight checks before operations that need credentials.
//!
//! Validates configuration up front so that commands fail with a clear hint
//! instead of midway through a conversation.

use crate::config::Settings;
use crate::error::{MarqueeError, Result};

/// Requirements for different operations.
#[derive(Debug, Clone, Copy)]
pub enum Operation {
    /// Chatting, asking and serving need the model API key.
    Converse,
    /// Direct searches need no credentials.
    Search,
}

/// Run pre-flight checks for the given operation.
///
/// Returns Ok(()) if all checks pass, or an error describing what's missing.
pub fn check(operation: Operation, settings: &Settings) -> Result<()> {
    match operation {
        Operation::Converse => check_api_key(settings),
        Operation::Search => Ok(()),
    }
}

/// Check if the OpenAI API key is configured.
fn check_api_key(settings: &Settings) -> Result<()> {
    match settings.openai_api_key() {
        Some(_) => Ok(()),
        None => Err(MarqueeError::Config(
            "OPENAI_API_KEY not set. Set it with: export OPENAI_API_KEY='sk-...' \
            or add openai.api_key to the config file"
                .to_string(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_search_no_requirements() {
        assert!(check(Operation::Search, &Settings::default()).is_ok());
    }

    #[test]
    fn test_check_converse_with_configured_key() {
        let mut settings = Settings::default();
        settings.openai.api_key = Some("sk-test-key".to_string());
        assert!(check(Operation::Converse, &settings).is_ok());
    }
}
