//! Ask command implementation.

use super::{build_agent, with_model};
use crate::cli::Output;
use crate::config::Settings;
use crate::error::MarqueeError;
use anyhow::Result;

/// Run the ask command.
pub async fn run_ask(question: &str, model: Option<String>, settings: Settings) -> Result<()> {
    let settings = with_model(settings, model);
    let mut agent = build_agent(&settings)?;

    let spinner = Output::spinner("Thinking...");

    match agent.handle_user_message(question).await {
        Ok(answer) => {
            spinner.finish_and_clear();
            Output::answer(&answer);

            let trace = agent.history().trace();
            if !trace.is_empty() {
                Output::header("Tool calls");
                Output::tool_trace(trace);
            }
        }
        Err(e @ MarqueeError::MaxIterationsExceeded(_)) => {
            spinner.finish_and_clear();
            Output::answer(&e.user_message());
            return Err(e.into());
        }
        Err(e) => {
            spinner.finish_and_clear();
            Output::error(&e.user_message());
            return Err(e.into());
        }
    }

    Ok(())
}
