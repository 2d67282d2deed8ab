//! Marquee - a movie and TV assistant
//!
//! A hosted language model answers questions about films and shows and calls
//! tools for the facts it needs: web search, movie-info lookup, YouTube video
//! search and trailer search.
//!
//! # Architecture
//!
//! The library is organized into several modules:
//!
//! - `config` - Configuration and prompt templates
//! - `providers` - HTTP clients for DuckDuckGo and YouTube
//! - `extract` - Rating and release-date extraction from search text
//! - `tools` - Tool registry and the built-in tools
//! - `agent` - The tool-calling conversation loop and session history
//! - `openai` - OpenAI client construction
//! - `cli` - Terminal commands and the HTTP server
//!
//! # Example
//!
//! ```rust,no_run
//! use marquee::agent::Agent;
//! use marquee::config::{Prompts, Settings};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let settings = Settings::load()?;
//!     let prompt = Prompts::default().agent_system_prompt();
//!     let mut agent = Agent::from_settings(&settings, &prompt)?;
//!
//!     let answer = agent.handle_user_message("What is Inception rated on IMDb?").await?;
//!     println!("{}", answer);
//!
//!     Ok(())
//! }
//! ```

pub mod agent;
pub mod cli;
pub mod config;
pub mod error;
pub mod extract;
pub mod openai;
pub mod providers;
pub mod tools;

pub use error::{MarqueeError, Result};
