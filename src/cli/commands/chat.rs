//! Interactive chat command.

use super::{build_agent, with_model};
use crate::cli::Output;
use crate::config::Settings;
use anyhow::Result;
use console::style;
use std::io::Write;
use tokio::io::{AsyncBufReadExt, BufReader};

/// What the user typed at the prompt.
#[derive(Debug, PartialEq)]
enum Input<'a> {
    Empty,
    Exit,
    Reset,
    History,
    Message(&'a str),
}

fn parse_input(line: &str) -> Input<'_> {
    let line = line.trim();
    if line.is_empty() {
        return Input::Empty;
    }
    match line.to_ascii_lowercase().as_str() {
        "exit" | "quit" => Input::Exit,
        "clear" | "reset" => Input::Reset,
        "history" => Input::History,
        _ => Input::Message(line),
    }
}

/// Run the interactive chat command.
pub async fn run_chat(model: Option<String>, settings: Settings) -> Result<()> {
    let settings = with_model(settings, model);
    let mut agent = build_agent(&settings)?;

    println!("\n{}", style("Marquee Chat").bold().cyan());
    println!(
        "{}\n",
        style("Ask about movies and shows. 'clear' resets, 'history' shows tool calls, 'exit' quits. Ctrl-C cancels a running answer.").dim()
    );

    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        print!("{} ", style("You:").green().bold());
        std::io::stdout().flush()?;

        let line = tokio::select! {
            line = lines.next_line() => line?,
            _ = tokio::signal::ctrl_c() => None,
        };
        let Some(line) = line else {
            println!();
            Output::info("Goodbye!");
            break;
        };

        match parse_input(&line) {
            Input::Empty => continue,
            Input::Exit => {
                Output::info("Goodbye!");
                break;
            }
            Input::Reset => {
                agent.reset();
                Output::info("Conversation history cleared.");
            }
            Input::History => {
                let trace = agent.history().trace();
                if trace.is_empty() {
                    Output::info("No tool calls yet.");
                } else {
                    Output::tool_trace(trace);
                }
            }
            Input::Message(text) => {
                let spinner = Output::spinner("Thinking...");

                // Losing the race drops the turn, which leaves the history untouched.
                let outcome = tokio::select! {
                    result = agent.handle_user_message(text) => Some(result),
                    _ = tokio::signal::ctrl_c() => None,
                };
                spinner.finish_and_clear();

                match outcome {
                    Some(Ok(answer)) => Output::answer(&answer),
                    Some(Err(e)) => Output::error(&e.user_message()),
                    None => Output::warning("Cancelled."),
                }
            }
        }
    }

    Ok(())
}
