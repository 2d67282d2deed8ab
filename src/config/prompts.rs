//! Prompt templates for Marquee.
//!
//! Prompts can be customized by placing TOML files in the custom prompts directory.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Collection of all prompt templates.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct Prompts {
    pub agent: AgentPrompts,
    /// Custom variables from config, available in all prompts.
    #[serde(skip)]
    pub variables: HashMap<String, String>,
}

/// Prompts for the movie assistant agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentPrompts {
    pub system: String,
}

impl Default for AgentPrompts {
    fn default() -> Self {
        Self {
            system: r#"You are a helpful movie and TV show information assistant. Today is {{today}}.

You can search the web, look up details about specific movies and TV shows, and find videos and trailers on YouTube.

When asked about a movie or TV show:
1. Use 'movie_info_search' to get basic information about the title (year, rating, synopsis)
2. Use 'movie_trailer_search' when the user would benefit from a trailer
3. Combine the information and present it in a well-structured format

Guidelines:
- Use 'web_search' for general questions, news, cast and crew, or anything the other tools miss
- Use 'youtube_search' for clips, reviews, interviews and other videos
- Tool results may include an extracted rating or release date; prefer them, but say so when sources disagree
- If a tool reports an error, try a different query or tool before giving up
- Cite the sources (titles and links) you relied on

Always be polite and helpful. If you don't know something, say so and offer to search for it."#
                .to_string(),
        }
    }
}

impl Prompts {
    /// Load prompts from the default location, with optional custom directory and variables.
    pub fn load(
        custom_dir: Option<&str>,
        custom_variables: Option<&HashMap<String, String>>,
    ) -> crate::error::Result<Self> {
        let mut prompts = Prompts::default();

        if let Some(vars) = custom_variables {
            prompts.variables = vars.clone();
        }

        if let Some(dir) = custom_dir {
            let custom_path = crate::config::Settings::expand_path(dir);

            let agent_path = custom_path.join("agent.toml");
            if agent_path.exists() {
                let content = std::fs::read_to_string(&agent_path)?;
                prompts.agent = toml::from_str(&content)?;
            }
        }

        Ok(prompts)
    }

    /// Render a prompt template with the given variables.
    pub fn render(template: &str, vars: &HashMap<String, String>) -> String {
        let mut result = template.to_string();
        for (key, value) in vars {
            result = result.replace(&format!("{{{{{}}}}}", key), value);
        }
        result
    }

    /// Render a prompt template with both provided variables and custom config variables.
    /// Provided variables take precedence over custom config variables.
    pub fn render_with_custom(&self, template: &str, vars: &HashMap<String, String>) -> String {
        let mut merged = self.variables.clone();
        for (key, value) in vars {
            merged.insert(key.clone(), value.clone());
        }
        Self::render(template, &merged)
    }

    /// The agent system prompt with built-in and custom variables filled in.
    pub fn agent_system_prompt(&self) -> String {
        let mut vars = HashMap::new();
        vars.insert(
            "today".to_string(),
            chrono::Local::now().format("%Y-%m-%d").to_string(),
        );
        self.render_with_custom(&self.agent.system, &vars)
    }
}
