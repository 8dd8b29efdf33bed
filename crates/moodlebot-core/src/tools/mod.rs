//! Tool system: trait, registry, and the Moodle administration tools.
//!
//! Every tool implements the `Tool` trait and registers itself in the
//! `ToolRegistry`. The external agent framework queries the registry for
//! the available tool definitions and dispatches tool calls by name.
//!
//! Tools never fail with an `Err`: every outcome — remote payload,
//! validation problem, clarification request — is returned as a string the
//! agent can hand to the user.

pub mod courses;
pub mod enrolment;
pub mod users;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, error};

use crate::moodle::MoodleClient;

/// Trait that all agent tools must implement.
///
/// Each tool declares its name, description, JSON Schema parameters, and
/// an async `execute` method.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Unique tool name used in function calls (e.g., "get_user_info").
    fn name(&self) -> &str;

    /// Description shown to the LLM when it picks a tool.
    fn description(&self) -> &str;

    /// JSON Schema for the tool's parameters.
    fn parameters(&self) -> Value;

    /// Execute the tool with the given arguments.
    async fn execute(&self, args: HashMap<String, Value>) -> String;
}

/// Tool definition in OpenAI function-calling format, the wire shape the
/// agent framework expects.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    #[serde(rename = "type")]
    pub def_type: String,
    pub function: ToolFunctionDef,
}

/// Function metadata within a tool definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolFunctionDef {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

/// Dynamic registry for agent tools.
///
/// Allows runtime registration and lookup of tools by name.
pub struct ToolRegistry {
    tools: HashMap<String, Box<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
        }
    }

    /// Register a tool. Replaces any existing tool with the same name.
    pub fn register(&mut self, tool: Box<dyn Tool>) {
        debug!(tool = tool.name(), "Registered tool");
        self.tools.insert(tool.name().to_string(), tool);
    }

    /// Get a tool by name.
    pub fn get(&self, name: &str) -> Option<&dyn Tool> {
        self.tools.get(name).map(|t| t.as_ref())
    }

    /// Check if a tool is registered.
    pub fn has(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    /// Execute a tool by name with the given arguments.
    pub async fn execute(&self, name: &str, args: HashMap<String, Value>) -> String {
        match self.tools.get(name) {
            Some(tool) => {
                debug!(tool = name, "Executing tool");
                tool.execute(args).await
            }
            None => {
                error!(tool = name, "Tool not found");
                format!("Error: Tool '{}' not found", name)
            }
        }
    }

    /// Get all tool definitions in OpenAI function-calling format.
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools
            .values()
            .map(|tool| ToolDefinition {
                def_type: "function".into(),
                function: ToolFunctionDef {
                    name: tool.name().into(),
                    description: tool.description().into(),
                    parameters: tool.parameters(),
                },
            })
            .collect()
    }

    /// Get the list of registered tool names.
    pub fn names(&self) -> Vec<&str> {
        self.tools.keys().map(|s| s.as_str()).collect()
    }

    /// Number of registered tools.
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Register the full Moodle administration tool set against one client.
pub fn register_all(registry: &mut ToolRegistry, client: Arc<MoodleClient>) {
    registry.register(Box::new(users::GetUserInfoTool::new(client.clone())));
    registry.register(Box::new(users::ListAllUsersTool::new(client.clone())));
    registry.register(Box::new(users::CreateUserTool::new(client.clone())));
    registry.register(Box::new(users::UpdateUserDataTool::new(client.clone())));
    registry.register(Box::new(users::DeleteUserTool::new(client.clone())));

    registry.register(Box::new(courses::ListAllCoursesTool::new(client.clone())));
    registry.register(Box::new(courses::GetCourseParticipantsTool::new(
        client.clone(),
    )));
    registry.register(Box::new(courses::CreateCourseTool::new(client.clone())));

    registry.register(Box::new(enrolment::GetUserCoursesTool::new(client.clone())));
    registry.register(Box::new(enrolment::GetUserGradesTool::new(client.clone())));
    registry.register(Box::new(enrolment::EnrolUserTool::new(client)));
}

/// Extract a required string argument, with a Spanish error message the
/// agent can relay verbatim.
pub(crate) fn require_str<'a>(
    args: &'a HashMap<String, Value>,
    key: &str,
) -> Result<&'a str, String> {
    args.get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| format!("Error: el parámetro '{key}' es obligatorio."))
}
