//! Bounded tool-calling loop over a plain text completion API.
//!
//! Each step the model sees the tool catalog and the transcript so far and
//! must reply with a single JSON object: `{"tool": name, "arguments": {...}}`
//! to call a tool, or `{"answer": text}` to finish.

use std::sync::Arc;

use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use crate::llm::LlmClient;
use crate::tools::{ToolError, ToolRegistry};

pub const DEFAULT_MAX_STEPS: usize = 4;

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("no language model is configured")]
    Unavailable,
    #[error("language model call failed: {0}")]
    Llm(#[source] anyhow::Error),
    #[error("model did not answer within {0} steps")]
    StepLimit(usize),
    #[error(transparent)]
    Tool(#[from] ToolError),
}

#[derive(Clone, Debug, PartialEq)]
pub enum ModelReply {
    Call { tool: String, arguments: Value },
    Answer(String),
}

impl ModelReply {
    /// Non-JSON replies are taken as a final answer.
    pub fn parse(raw: &str) -> Self {
        let trimmed = strip_fences(raw);
        let parsed = match serde_json::from_str::<Value>(trimmed) {
            Ok(Value::Object(map)) => map,
            _ => return Self::Answer(raw.trim().to_string()),
        };

        if let Some(tool) = parsed.get("tool").and_then(Value::as_str) {
            let arguments = parsed.get("arguments").cloned().unwrap_or(Value::Null);
            return Self::Call { tool: tool.to_string(), arguments };
        }
        match parsed.get("answer") {
            Some(Value::String(text)) => Self::Answer(text.clone()),
            Some(other) => Self::Answer(other.to_string()),
            None => Self::Answer(raw.trim().to_string()),
        }
    }
}

fn strip_fences(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(body) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let body = body.strip_prefix("json").unwrap_or(body);
    body.strip_suffix("```").unwrap_or(body).trim()
}

#[derive(Clone)]
pub struct AgentRuntime {
    llm: Option<Arc<dyn LlmClient>>,
    max_steps: usize,
}

impl Default for AgentRuntime {
    fn default() -> Self {
        Self { llm: None, max_steps: DEFAULT_MAX_STEPS }
    }
}

impl AgentRuntime {
    pub fn new(llm: Option<Arc<dyn LlmClient>>) -> Self {
        Self { llm, max_steps: DEFAULT_MAX_STEPS }
    }

    pub fn with_max_steps(mut self, max_steps: usize) -> Self {
        self.max_steps = max_steps.max(1);
        self
    }

    pub fn has_llm(&self) -> bool {
        self.llm.is_some()
    }

    pub async fn run(
        &self,
        system: &str,
        tools: &ToolRegistry,
        input: &str,
    ) -> Result<String, RuntimeError> {
        let llm = self.llm.as_ref().ok_or(RuntimeError::Unavailable)?;
        let system = format!(
            "{system}\n\nAvailable tools:\n{}\n\nReply with exactly one JSON object. \
             To call a tool: {{\"tool\": \"<name>\", \"arguments\": {{...}}}}. \
             To finish: {{\"answer\": \"<text for the user>\"}}.",
            tools.describe()
        );
        let mut transcript = format!("User request: {input}\n");

        for step in 0..self.max_steps {
            let raw = llm.complete(&system, &transcript).await.map_err(RuntimeError::Llm)?;
            match ModelReply::parse(&raw) {
                ModelReply::Answer(answer) => return Ok(answer),
                ModelReply::Call { tool, arguments } => {
                    debug!(event_name = "agent.runtime.tool_call", step, tool = %tool, "model called tool");
                    let result = match tools.execute(&tool, arguments.clone()).await {
                        Ok(value) => value,
                        Err(error) if error.is_fatal() => return Err(error.into()),
                        Err(error) => error.to_payload(),
                    };
                    transcript.push_str(&format!(
                        "Tool `{tool}` called with {arguments} returned: {result}\n"
                    ));
                }
            }
        }

        Err(RuntimeError::StepLimit(self.max_steps))
    }
}
