//! Language-model seam for the agent loop.

use super::message::{Message, Role, ToolCallRequest};
use crate::config::Settings;
use crate::error::{MarqueeError, Result};
use crate::openai::create_client;
use crate::tools::ToolSpec;
use async_openai::config::OpenAIConfig;
use async_openai::error::OpenAIError;
use async_openai::types::{
    ChatCompletionMessageToolCall, ChatCompletionRequestAssistantMessageArgs,
    ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
    ChatCompletionRequestToolMessageArgs, ChatCompletionRequestUserMessageArgs, ChatCompletionTool,
    ChatCompletionToolType, CreateChatCompletionRequestArgs, FunctionCall, FunctionObject,
};
use async_openai::Client;
use async_trait::async_trait;
use tracing::debug;

/// What the model answered.
#[derive(Debug, Clone, PartialEq)]
pub enum ModelReply {
    /// Plain-text final answer.
    Final(String),
    /// One or more tool calls, with any text the model sent alongside.
    ToolCalls {
        content: String,
        calls: Vec<ToolCallRequest>,
    },
}

/// A chat model that can request tool calls.
#[async_trait]
pub trait ChatModel: Send + Sync {
    async fn complete(
        &self,
        system_prompt: &str,
        messages: &[Message],
        tools: &[ToolSpec],
    ) -> Result<ModelReply>;
}

/// Chat model backed by the OpenAI chat completions API.
pub struct OpenAIChatModel {
    client: Client<OpenAIConfig>,
    model: String,
    temperature: f32,
}

impl OpenAIChatModel {
    pub fn new(client: Client<OpenAIConfig>, model: &str, temperature: f32) -> Self {
        Self {
            client,
            model: model.to_string(),
            temperature,
        }
    }

    /// Create from settings. Fails when no API key is configured.
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        Ok(Self::new(
            create_client(settings)?,
            &settings.openai.model,
            settings.openai.temperature,
        ))
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl ChatModel for OpenAIChatModel {
    async fn complete(
        &self,
        system_prompt: &str,
        messages: &[Message],
        tools: &[ToolSpec],
    ) -> Result<ModelReply> {
        let mut request_messages: Vec<ChatCompletionRequestMessage> = vec![
            ChatCompletionRequestSystemMessageArgs::default()
                .content(system_prompt.to_string())
                .build()
                .map_err(model_error)?
                .into(),
        ];
        for message in messages {
            request_messages.push(to_request_message(message)?);
        }

        let mut builder = CreateChatCompletionRequestArgs::default();
        builder
            .model(&self.model)
            .messages(request_messages)
            .temperature(self.temperature);
        if !tools.is_empty() {
            builder.tools(tool_definitions(tools));
        }
        let request = builder.build().map_err(model_error)?;

        debug!("Calling model {} with {} messages", self.model, messages.len());

        let response = self.client.chat().create(request).await.map_err(|e| match e {
            OpenAIError::Reqwest(e) => MarqueeError::Network(format!("Model request failed: {}", e)),
            other => MarqueeError::Model(other.to_string()),
        })?;

        let choice = response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| MarqueeError::Model("No response from model".to_string()))?;

        let content = choice.message.content.unwrap_or_default();
        let calls: Vec<ToolCallRequest> = choice
            .message
            .tool_calls
            .unwrap_or_default()
            .into_iter()
            .map(|call| ToolCallRequest {
                id: call.id,
                name: call.function.name,
                arguments: call.function.arguments,
            })
            .collect();

        if calls.is_empty() {
            Ok(ModelReply::Final(content))
        } else {
            Ok(ModelReply::ToolCalls { content, calls })
        }
    }
}

fn model_error(e: OpenAIError) -> MarqueeError {
    MarqueeError::Model(e.to_string())
}

/// Convert a history message into the API request shape.
fn to_request_message(message: &Message) -> Result<ChatCompletionRequestMessage> {
    let converted = match message.role {
        Role::User => ChatCompletionRequestUserMessageArgs::default()
            .content(message.content.clone())
            .build()
            .map_err(model_error)?
            .into(),
        Role::Assistant => {
            let mut args = ChatCompletionRequestAssistantMessageArgs::default();
            if !message.content.is_empty() {
                args.content(message.content.clone());
            }
            if message.has_tool_calls() {
                args.tool_calls(
                    message
                        .tool_calls
                        .iter()
                        .map(|call| ChatCompletionMessageToolCall {
                            id: call.id.clone(),
                            r#type: ChatCompletionToolType::Function,
                            function: FunctionCall {
                                name: call.name.clone(),
                                arguments: call.arguments.clone(),
                            },
                        })
                        .collect::<Vec<_>>(),
                );
            }
            args.build().map_err(model_error)?.into()
        }
        Role::Tool => ChatCompletionRequestToolMessageArgs::default()
            .tool_call_id(message.tool_call_id.clone().unwrap_or_default())
            .content(message.content.clone())
            .build()
            .map_err(model_error)?
            .into(),
    };
    Ok(converted)
}

/// Render registered tools as function definitions for the model.
pub fn tool_definitions(tools: &[ToolSpec]) -> Vec<ChatCompletionTool> {
    tools
        .iter()
        .map(|spec| ChatCompletionTool {
            r#type: ChatCompletionToolType::Function,
            function: FunctionObject {
                name: spec.name.clone(),
                description: Some(spec.description.clone()),
                parameters: Some(spec.schema.to_json_schema()),
                strict: None,
            },
        })
        .collect()
}
