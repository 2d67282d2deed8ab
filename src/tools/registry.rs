//! Tool registry: name → (description, schema, handler).

use super::{ToolHandler, ToolResult};
use crate::error::{MarqueeError, Result};
use serde_json::{json, Map, Value};
use std::sync::Arc;
use tracing::{debug, info};

/// JSON type of a tool parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamType {
    String,
    Integer,
    Number,
    Boolean,
}

impl ParamType {
    fn json_name(self) -> &'static str {
        match self {
            ParamType::String => "string",
            ParamType::Integer => "integer",
            ParamType::Number => "number",
            ParamType::Boolean => "boolean",
        }
    }

    fn accepts(self, value: &Value) -> bool {
        match self {
            ParamType::String => value.is_string(),
            ParamType::Integer => value.is_i64() || value.is_u64(),
            ParamType::Number => value.is_number(),
            ParamType::Boolean => value.is_boolean(),
        }
    }
}

/// A single named parameter of a tool.
#[derive(Debug, Clone)]
pub struct ParamSpec {
    pub name: String,
    pub kind: ParamType,
    pub required: bool,
    pub description: String,
    pub default: Option<Value>,
}

/// Input schema of a tool.
#[derive(Debug, Clone, Default)]
pub struct ToolSchema {
    params: Vec<ParamSpec>,
}

impl ToolSchema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a required parameter.
    pub fn required(mut self, name: &str, kind: ParamType, description: &str) -> Self {
        self.params.push(ParamSpec {
            name: name.to_string(),
            kind,
            required: true,
            description: description.to_string(),
            default: None,
        });
        self
    }

    /// Add an optional parameter with a default value.
    pub fn optional(mut self, name: &str, kind: ParamType, description: &str, default: Value) -> Self {
        self.params.push(ParamSpec {
            name: name.to_string(),
            kind,
            required: false,
            description: description.to_string(),
            default: Some(default),
        });
        self
    }

    pub fn params(&self) -> &[ParamSpec] {
        &self.params
    }

    /// Render as a JSON Schema object for the model.
    pub fn to_json_schema(&self) -> Value {
        let mut properties = Map::new();
        for param in &self.params {
            let mut prop = json!({
                "type": param.kind.json_name(),
                "description": param.description,
            });
            if let Some(default) = &param.default {
                prop["default"] = default.clone();
            }
            properties.insert(param.name.clone(), prop);
        }

        let required: Vec<&str> = self
            .params
            .iter()
            .filter(|p| p.required)
            .map(|p| p.name.as_str())
            .collect();

        json!({
            "type": "object",
            "properties": properties,
            "required": required,
        })
    }

    /// Check that `args` is an object with every required field present and
    /// every known field of the declared type. Null counts as absent.
    pub fn validate(&self, tool: &str, args: &Value) -> Result<()> {
        let Some(object) = args.as_object() else {
            return Err(MarqueeError::invalid_arguments(tool, "arguments must be a JSON object"));
        };

        for param in &self.params {
            match object.get(&param.name) {
                None | Some(Value::Null) if param.required => {
                    return Err(MarqueeError::invalid_arguments(
                        tool,
                        format!("missing required field '{}'", param.name),
                    ));
                }
                None | Some(Value::Null) => {}
                Some(value) if !param.kind.accepts(value) => {
                    return Err(MarqueeError::invalid_arguments(
                        tool,
                        format!("field '{}' must be a {}", param.name, param.kind.json_name()),
                    ));
                }
                Some(_) => {}
            }
        }

        Ok(())
    }
}

/// A registered tool.
#[derive(Clone)]
pub struct ToolSpec {
    pub name: String,
    pub description: String,
    pub schema: ToolSchema,
    pub handler: Arc<dyn ToolHandler>,
}

impl std::fmt::Debug for ToolSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolSpec")
            .field("name", &self.name)
            .field("description", &self.description)
            .field("schema", &self.schema)
            .finish_non_exhaustive()
    }
}

/// Ordered set of tools, built once at startup.
#[derive(Debug, Clone, Default)]
pub struct ToolRegistry {
    specs: Vec<ToolSpec>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool. Names must be unique.
    pub fn register(
        &mut self,
        name: &str,
        description: &str,
        schema: ToolSchema,
        handler: Arc<dyn ToolHandler>,
    ) -> Result<()> {
        if self.get(name).is_some() {
            return Err(MarqueeError::DuplicateTool(name.to_string()));
        }

        debug!("Registering tool {}", name);
        self.specs.push(ToolSpec {
            name: name.to_string(),
            description: description.to_string(),
            schema,
            handler,
        });
        Ok(())
    }

    /// Registered tools in registration order.
    pub fn list_specs(&self) -> &[ToolSpec] {
        &self.specs
    }

    pub fn get(&self, name: &str) -> Option<&ToolSpec> {
        self.specs.iter().find(|s| s.name == name)
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }

    /// Validate `arguments` against the tool's schema and run its handler.
    ///
    /// Handler failures are wrapped in [`MarqueeError::ToolExecution`], except
    /// argument errors raised by the handler itself, which pass through.
    pub async fn dispatch(&self, name: &str, arguments: &Value) -> Result<ToolResult> {
        let spec = self
            .get(name)
            .ok_or_else(|| MarqueeError::UnknownTool(name.to_string()))?;

        spec.schema.validate(name, arguments)?;

        info!("Dispatching tool: {} with args: {}", name, arguments);

        spec.handler.execute(arguments).await.map_err(|e| match e {
            e @ MarqueeError::InvalidArguments { .. } => e,
            other => MarqueeError::ToolExecution {
                tool: name.to_string(),
                source: Box::new(other),
            },
        })
    }
}
