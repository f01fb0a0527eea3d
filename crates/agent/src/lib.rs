//! Query routing and the three supply chain agents.
//!
//! The orchestrator picks one agent per query. Each agent owns a tool
//! registry and, when a model is configured, runs a bounded tool-calling
//! loop over it. Without a model, or when the model fails, agents answer
//! through deterministic keyword handling over the same data.
//!
//! The model never writes stock directly: `update_stock_level` passes through
//! the guardrail policy, and negative stock is refused before storage is touched.

pub mod agents;
pub mod guardrails;
pub mod llm;
pub mod orchestrator;
pub mod runtime;
pub mod tools;

pub use agents::{Agent, AgentContext, AgentKind, AgentReply, ReplyMode};
pub use guardrails::{ActionOrigin, GuardrailDecision, GuardrailIntent, GuardrailPolicy};
pub use llm::{build_llm_client, LlmClient};
pub use orchestrator::{Orchestrator, OrchestratorReply, RouteDecision, RoutingError, RoutingMethod};
pub use runtime::AgentRuntime;
pub use tools::{Tool, ToolError, ToolRegistry};
