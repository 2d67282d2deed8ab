//! CLI module for Marquee.

pub mod commands;
mod output;
pub mod preflight;

pub use output::Output;

use clap::{Parser, Subcommand};

/// Marquee - a movie and TV assistant for the terminal
///
/// Ask about films and shows; a language model answers with the help of web
/// search, movie-info lookup and YouTube trailer search.
#[derive(Parser, Debug)]
#[command(name = "marquee")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Increase verbosity (-v for info, -vv for debug, -vvv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to configuration file
    #[arg(short, long, global = true, env = "MARQUEE_CONFIG")]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start an interactive chat session
    Chat {
        /// LLM model to use
        #[arg(short, long)]
        model: Option<String>,
    },

    /// Ask a single question and print the answer
    Ask {
        /// The question to ask
        question: String,

        /// LLM model to use
        #[arg(short, long)]
        model: Option<String>,
    },

    /// Search the web directly, without the language model
    Search {
        /// Search query
        query: String,

        /// Maximum number of results
        #[arg(short = 'n', long)]
        limit: Option<usize>,
    },

    /// Search YouTube for videos
    Videos {
        /// Search query, or a title when --trailer is set
        query: String,

        /// Look for the official trailer of a movie or show
        #[arg(short, long)]
        trailer: bool,

        /// Maximum number of results
        #[arg(short = 'n', long)]
        limit: Option<usize>,
    },

    /// List the tools available to the model
    Tools,

    /// Check configuration and connectivity
    Doctor,

    /// Start HTTP API server for integration with other systems
    Serve {
        /// Host to bind to
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Port to bind to
        #[arg(short, long, default_value = "3000")]
        port: u16,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Open configuration file in editor
    Edit,

    /// Show configuration file path
    Path,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_videos_trailer() {
        let cli = Cli::try_parse_from(["marquee", "videos", "Dune", "--trailer", "-n", "3"]).unwrap();
        match cli.command {
            Commands::Videos { query, trailer, limit } => {
                assert_eq!(query, "Dune");
                assert!(trailer);
                assert_eq!(limit, Some(3));
            }
            other => panic!("Unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_verbose_is_global() {
        let cli = Cli::try_parse_from(["marquee", "tools", "-vv"]).unwrap();
        assert_eq!(cli.verbose, 2);
    }
}
