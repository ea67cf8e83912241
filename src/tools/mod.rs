//! Tool calling: definitions, registration, input repair and execution.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

pub mod coerce;
pub mod execute;
pub mod registry;

pub use execute::{classify_by_status, Classified, Classifier, ToolDispatch};
pub use registry::ToolRegistry;

/// Retry budget applied when a tool does not declare its own.
pub const DEFAULT_MAX_RETRIES: u32 = 2;

/// Arguments as they arrive from a `tool_use` block.
pub type ToolInput = serde_json::Map<String, Value>;

/// An executable registered under a tool name.
///
/// The `Err` channel is the "tool raised" path; returning a value whose
/// `code` field is >= 400 is the classified-failure path.
pub type ToolFn = Arc<dyn Fn(&ToolInput) -> anyhow::Result<Value> + Send + Sync>;

/// Tool definition advertised to the model.
///
/// `max_retries` is orchestration metadata and never serialized onto the
/// wire.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub input_schema: InputSchema,
    #[serde(default = "default_max_retries", skip_serializing)]
    pub max_retries: u32,
}

fn default_max_retries() -> u32 {
    DEFAULT_MAX_RETRIES
}

impl ToolDefinition {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            input_schema: InputSchema::object(),
            max_retries: DEFAULT_MAX_RETRIES,
        }
    }

    pub fn input_schema(mut self, schema: InputSchema) -> Self {
        self.input_schema = schema;
        self
    }

    pub fn max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }
}

/// JSON-Schema-like description of a tool's parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputSchema {
    #[serde(rename = "type", default = "default_schema_type")]
    pub schema_type: String,
    #[serde(default)]
    pub properties: HashMap<String, PropertySchema>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub required: Vec<String>,
}

fn default_schema_type() -> String {
    "object".to_string()
}

impl InputSchema {
    pub fn object() -> Self {
        Self {
            schema_type: default_schema_type(),
            properties: HashMap::new(),
            required: Vec::new(),
        }
    }

    pub fn property(mut self, name: impl Into<String>, schema: PropertySchema) -> Self {
        self.properties.insert(name.into(), schema);
        self
    }

    pub fn required(mut self, name: impl Into<String>) -> Self {
        self.required.push(name.into());
        self
    }
}

impl Default for InputSchema {
    fn default() -> Self {
        Self::object()
    }
}

/// Declared shape of one parameter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PropertySchema {
    #[serde(rename = "type")]
    pub value_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
}

impl PropertySchema {
    pub fn typed(value_type: impl Into<String>) -> Self {
        Self {
            value_type: value_type.into(),
            description: None,
            default: None,
        }
    }

    pub fn with_default(mut self, default: Value) -> Self {
        self.default = Some(default);
        self
    }
}

/// Host-supplied tool group configuration.
///
/// A group names one action or a list of actions; every action matched
/// against the supplied function map is registered individually.
#[derive(Debug, Clone, Deserialize)]
pub struct ToolGroupConfig {
    pub action: ActionRef,
    #[serde(default)]
    pub input_schema: Option<InputSchema>,
    #[serde(default)]
    pub max_retries: Option<u32>,
}

/// One action name or several.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ActionRef {
    One(String),
    Many(Vec<String>),
}

impl ActionRef {
    pub fn names(&self) -> Vec<&str> {
        match self {
            ActionRef::One(name) => vec![name.as_str()],
            ActionRef::Many(names) => names.iter().map(String::as_str).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_definition_wire_shape_omits_max_retries() {
        let def = ToolDefinition::new("add", "Add two numbers")
            .input_schema(
                InputSchema::object()
                    .property("a", PropertySchema::typed("integer"))
                    .required("a"),
            )
            .max_retries(5);

        let wire = serde_json::to_value(&def).unwrap();
        assert_eq!(wire["name"], "add");
        assert_eq!(wire["input_schema"]["type"], "object");
        assert_eq!(wire["input_schema"]["properties"]["a"]["type"], "integer");
        assert!(wire.get("max_retries").is_none());
    }

    #[test]
    fn test_definition_deserializes_with_default_retries() {
        let def: ToolDefinition = serde_json::from_value(serde_json::json!({
            "name": "lookup",
            "description": "Look something up",
            "input_schema": {"type": "object", "properties": {}}
        }))
        .unwrap();
        assert_eq!(def.max_retries, DEFAULT_MAX_RETRIES);
    }

    #[test]
    fn test_action_ref_one_or_many() {
        let one: ActionRef = serde_json::from_value(serde_json::json!("add")).unwrap();
        assert_eq!(one.names(), vec!["add"]);

        let many: ActionRef = serde_json::from_value(serde_json::json!(["add", "sub"])).unwrap();
        assert_eq!(many.names(), vec!["add", "sub"]);
    }
}
