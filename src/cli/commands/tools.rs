//! Tools command implementation.

use crate::cli::Output;
use crate::config::Settings;
use crate::tools::builtin_registry;
use anyhow::Result;
use console::style;

/// List the registered tools and their parameters.
pub fn run_tools(settings: &Settings) -> Result<()> {
    let registry = builtin_registry(settings)?;

    Output::header("Available tools");
    for spec in registry.list_specs() {
        println!("\n  {}", style(&spec.name).bold().cyan());
        println!("  {}", spec.description);
        for param in spec.schema.params() {
            let detail = match (&param.default, param.required) {
                (_, true) => "required".to_string(),
                (Some(default), false) => format!("default {}", default),
                (None, false) => "optional".to_string(),
            };
            Output::kv(
                &param.name,
                &format!("{:?}, {} - {}", param.kind, detail, param.description),
            );
        }
    }
    println!();

    Ok(())
}
