use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use guardian_db::repositories::RepositoryError;
use serde::Serialize;
use serde_json::{json, Value};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ToolError {
    #[error("unknown tool `{0}`")]
    UnknownTool(String),
    #[error("invalid arguments for `{tool}`: {message}")]
    InvalidArguments { tool: &'static str, message: String },
    #[error("product `{0}` not found")]
    ProductNotFound(String),
    #[error("{message}")]
    Denied { reason_code: &'static str, message: String },
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error("tool output could not be serialized: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl ToolError {
    /// Storage failures abort a request; everything else is reported back to the caller.
    pub fn is_fatal(&self) -> bool {
        match self {
            Self::Repository(RepositoryError::Domain(_)) => false,
            Self::Repository(_) | Self::Serialize(_) => true,
            _ => false,
        }
    }

    pub fn to_payload(&self) -> Value {
        match self {
            Self::Denied { reason_code, message } => {
                json!({"error": message, "reason_code": reason_code})
            }
            other => json!({"error": other.to_string()}),
        }
    }
}

#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &'static str;
    fn description(&self) -> &'static str;

    /// JSON schema of the accepted arguments object.
    fn parameters(&self) -> Value {
        json!({"type": "object", "properties": {}})
    }

    async fn execute(&self, input: Value) -> Result<Value, ToolError>;
}

#[derive(Default)]
pub struct ToolRegistry {
    tools: BTreeMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn register<T>(&mut self, tool: T)
    where
        T: Tool + 'static,
    {
        self.tools.insert(tool.name().to_string(), Arc::new(tool));
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    pub async fn execute(&self, name: &str, input: Value) -> Result<Value, ToolError> {
        let tool = self.get(name).ok_or_else(|| ToolError::UnknownTool(name.to_string()))?;
        tool.execute(input).await
    }

    pub fn names(&self) -> Vec<&str> {
        self.tools.keys().map(String::as_str).collect()
    }

    /// Catalog handed to the model: name, description and parameter schema per tool.
    pub fn describe(&self) -> Value {
        Value::Array(
            self.tools
                .values()
                .map(|tool| {
                    json!({
                        "name": tool.name(),
                        "description": tool.description(),
                        "parameters": tool.parameters(),
                    })
                })
                .collect(),
        )
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

pub(crate) fn to_value<T: Serialize>(value: &T) -> Result<Value, ToolError> {
    Ok(serde_json::to_value(value)?)
}

pub(crate) fn required_str<'a>(
    tool: &'static str,
    input: &'a Value,
    field: &str,
) -> Result<&'a str, ToolError> {
    optional_str(input, field).ok_or_else(|| ToolError::InvalidArguments {
        tool,
        message: format!("`{field}` must be a non-empty string"),
    })
}

pub(crate) fn optional_str<'a>(input: &'a Value, field: &str) -> Option<&'a str> {
    input.get(field).and_then(Value::as_str).map(str::trim).filter(|value| !value.is_empty())
}

/// Accepts integers and integer-valued strings, since models emit both.
pub(crate) fn required_i64(tool: &'static str, input: &Value, field: &str) -> Result<i64, ToolError> {
    let value = input.get(field);
    value
        .and_then(Value::as_i64)
        .or_else(|| value.and_then(Value::as_str).and_then(|raw| raw.trim().parse().ok()))
        .ok_or_else(|| ToolError::InvalidArguments {
            tool,
            message: format!("`{field}` must be an integer"),
        })
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use serde_json::{json, Value};

    use super::{required_i64, Tool, ToolError, ToolRegistry};

    struct Echo;

    #[async_trait]
    impl Tool for Echo {
        fn name(&self) -> &'static str {
            "echo"
        }

        fn description(&self) -> &'static str {
            "Returns its input"
        }

        async fn execute(&self, input: Value) -> Result<Value, ToolError> {
            Ok(input)
        }
    }

    #[tokio::test]
    async fn registry_dispatches_by_name() {
        let mut registry = ToolRegistry::default();
        registry.register(Echo);

        assert_eq!(registry.len(), 1);
        assert_eq!(registry.names(), vec!["echo"]);
        let output = registry.execute("echo", json!({"a": 1})).await.expect("echo");
        assert_eq!(output, json!({"a": 1}));

        let error = registry.execute("missing", Value::Null).await.expect_err("unknown");
        assert!(matches!(error, ToolError::UnknownTool(ref name) if name == "missing"));
        assert!(!error.is_fatal());
    }

    #[test]
    fn catalog_lists_schema() {
        let mut registry = ToolRegistry::default();
        registry.register(Echo);

        let catalog = registry.describe();
        assert_eq!(catalog[0]["name"], "echo");
        assert_eq!(catalog[0]["parameters"]["type"], "object");
    }

    #[test]
    fn integer_arguments_accept_numeric_strings() {
        assert_eq!(required_i64("t", &json!({"n": 5}), "n").expect("int"), 5);
        assert_eq!(required_i64("t", &json!({"n": " -3 "}), "n").expect("string"), -3);
        assert!(required_i64("t", &json!({"n": "five"}), "n").is_err());
    }

    #[test]
    fn denied_payload_carries_reason_code() {
        let error = ToolError::Denied {
            reason_code: "negative_stock_disallowed",
            message: "no".to_string(),
        };
        assert_eq!(error.to_payload()["reason_code"], "negative_stock_disallowed");
    }
}
