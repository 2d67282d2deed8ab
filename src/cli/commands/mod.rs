//! CLI command implementations.

mod ask;
mod chat;
mod config;
mod doctor;
mod search;
mod serve;
mod tools;
mod videos;

pub use ask::run_ask;
pub use chat::run_chat;
pub use config::run_config;
pub use doctor::run_doctor;
pub use search::run_search;
pub use serve::run_serve;
pub use tools::run_tools;
pub use videos::run_videos;

use crate::agent::Agent;
use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::{Prompts, Settings};
use anyhow::Result;

/// Settings with the `--model` override applied.
fn with_model(mut settings: Settings, model: Option<String>) -> Settings {
    if let Some(model) = model {
        settings.openai.model = model;
    }
    settings
}

/// Load the agent system prompt, honoring custom prompts from config.
fn system_prompt(settings: &Settings) -> Result<String> {
    let prompts = Prompts::load(
        settings.prompts.custom_dir.as_deref(),
        Some(&settings.prompts.variables),
    )?;
    Ok(prompts.agent_system_prompt())
}

/// Pre-flight checks for commands that talk to the model.
fn converse_preflight(settings: &Settings) -> Result<()> {
    if let Err(e) = preflight::check(Operation::Converse, settings) {
        Output::error(&format!("{}", e));
        Output::info("Run 'marquee doctor' for detailed diagnostics.");
        return Err(e.into());
    }
    Ok(())
}

/// Run pre-flight checks and build an agent for a conversation.
fn build_agent(settings: &Settings) -> Result<Agent> {
    converse_preflight(settings)?;
    Ok(Agent::from_settings(settings, &system_prompt(settings)?)?)
}
