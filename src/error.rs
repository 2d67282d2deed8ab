//! Error types for Marquee.

use thiserror::Error;

/// Library-level error type for Marquee operations.
#[derive(Error, Debug)]
pub enum MarqueeError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Rate limited by {0}")]
    RateLimit(String),

    #[error("{service} returned HTTP {status}")]
    UnexpectedStatus { service: String, status: u16 },

    #[error("Unexpected response: {0}")]
    InvalidResponse(String),

    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    #[error("Invalid arguments for '{tool}': {reason}")]
    InvalidArguments { tool: String, reason: String },

    #[error("Tool '{tool}' failed: {source}")]
    ToolExecution {
        tool: String,
        #[source]
        source: Box<MarqueeError>,
    },

    #[error("Tool already registered: {0}")]
    DuplicateTool(String),

    #[error("Agent exceeded maximum iterations ({0})")]
    MaxIterationsExceeded(usize),

    #[error("Language model error: {0}")]
    Model(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),
}

impl MarqueeError {
    /// Shorthand for an [`MarqueeError::InvalidArguments`] error.
    pub fn invalid_arguments(tool: &str, reason: impl Into<String>) -> Self {
        MarqueeError::InvalidArguments {
            tool: tool.to_string(),
            reason: reason.into(),
        }
    }

    /// Whether the agent loop can hand this failure back to the model as a
    /// tool result instead of aborting the turn.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            MarqueeError::Network(_)
                | MarqueeError::RateLimit(_)
                | MarqueeError::ToolExecution { .. }
        )
    }

    /// Text suitable for showing to the end user.
    pub fn user_message(&self) -> String {
        match self {
            MarqueeError::MaxIterationsExceeded(_) => {
                "Sorry, I was unable to complete that request. Please try rephrasing your question."
                    .to_string()
            }
            other => format!(
                "I encountered an error while processing your request: {}",
                other
            ),
        }
    }
}

impl From<reqwest::Error> for MarqueeError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            MarqueeError::InvalidResponse(e.to_string())
        } else if let Some(status) = e.status() {
            MarqueeError::UnexpectedStatus {
                service: e
                    .url()
                    .and_then(|u| u.host_str())
                    .unwrap_or("remote service")
                    .to_string(),
                status: status.as_u16(),
            }
        } else {
            // Timeouts, refused connections, TLS and request-building failures.
            MarqueeError::Network(e.to_string())
        }
    }
}

/// Result type alias for Marquee operations.
pub type Result<T> = std::result::Result<T, MarqueeError>;
