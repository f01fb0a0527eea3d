//! Routes a free-text query to exactly one agent.
//!
//! A configured model classifies first. When it is missing, fails, or returns
//! an unknown label, keyword scoring decides: the agent with the most matched
//! terms wins and ties go to Ops, then Strategy, then Market.

use std::sync::Arc;

use guardian_core::errors::{ApplicationError, DomainError};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use crate::agents::{
    mentions_term, words, Agent, AgentContext, AgentKind, AgentReply, MarketAgent, OpsAgent,
    ReplyMode, StrategyAgent,
};
use crate::llm::LlmClient;
use crate::runtime::AgentRuntime;
use crate::tools::ToolError;

const OPS_TERMS: &[&str] =
    &["stock", "inventory", "alert", "warehouse", "units", "on hand", "level", "sku"];
const STRATEGY_TERMS: &[&str] = &[
    "weather", "delay", "shipment", "reorder", "recommend", "resilience", "health", "risk",
    "forecast", "lead time",
];
const MARKET_TERMS: &[&str] = &[
    "trend", "market", "news", "event", "disruption", "suggest", "new product", "competitor",
    "demand",
];

const ROUTER_PROMPT: &str = "You route supply chain questions. Reply with exactly one word: \
`ops` for inventory levels, stock updates and alerts; `strategy` for shipment delays, weather \
risk, reorders and resilience; `market` for trends, news and product suggestions; `none` when \
no agent applies.";

pub const CANNOT_ROUTE_MESSAGE: &str = "I could not match that request to an agent. Ask about \
inventory and alerts, shipment delays and weather risk, or market trends and product ideas.";

#[derive(Debug, Error)]
pub enum RoutingError {
    #[error("query is empty")]
    EmptyQuery,
    #[error(transparent)]
    Agent(#[from] ToolError),
}

impl From<RoutingError> for ApplicationError {
    fn from(value: RoutingError) -> Self {
        match value {
            RoutingError::EmptyQuery => ApplicationError::Domain(DomainError::InvariantViolation(
                "query must not be empty".to_string(),
            )),
            RoutingError::Agent(ToolError::Repository(error)) => error.into(),
            RoutingError::Agent(error) => ApplicationError::Integration(error.to_string()),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoutingMethod {
    Llm,
    Keyword,
}

impl RoutingMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Llm => "llm",
            Self::Keyword => "keyword",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteDecision {
    pub target: Option<AgentKind>,
    pub method: RoutingMethod,
    pub matched_terms: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrchestratorReply {
    pub route: RouteDecision,
    pub reply: Option<AgentReply>,
    pub text: String,
}

impl OrchestratorReply {
    pub fn agent_label(&self) -> &'static str {
        self.route.target.map(|kind| kind.as_str()).unwrap_or("none")
    }

    pub fn mode(&self) -> Option<ReplyMode> {
        self.reply.as_ref().map(|reply| reply.mode)
    }
}

fn terms_for(kind: AgentKind) -> &'static [&'static str] {
    match kind {
        AgentKind::Ops => OPS_TERMS,
        AgentKind::Strategy => STRATEGY_TERMS,
        AgentKind::Market => MARKET_TERMS,
    }
}

/// Scores each agent by matched terms; `AgentKind::ALL` order breaks ties.
pub fn keyword_route(query: &str) -> RouteDecision {
    let lowered = query.to_lowercase();
    let tokens: Vec<&str> = words(&lowered).collect();
    let mut best: Option<(AgentKind, Vec<String>)> = None;

    for kind in AgentKind::ALL {
        let matched: Vec<String> = terms_for(kind)
            .iter()
            .filter(|term| mentions_term(&tokens, term))
            .map(|term| term.to_string())
            .collect();
        let better = match &best {
            Some((_, current)) => matched.len() > current.len(),
            None => !matched.is_empty(),
        };
        if better {
            best = Some((kind, matched));
        }
    }

    match best {
        Some((kind, matched_terms)) => {
            RouteDecision { target: Some(kind), method: RoutingMethod::Keyword, matched_terms }
        }
        None => RouteDecision { target: None, method: RoutingMethod::Keyword, matched_terms: vec![] },
    }
}

/// Reads the first word of a classifier reply. `Some(None)` means the model chose no agent.
fn parse_label(reply: &str) -> Option<Option<AgentKind>> {
    let word = reply
        .split_whitespace()
        .next()?
        .trim_matches(|c: char| !c.is_ascii_alphabetic())
        .to_ascii_lowercase();
    if word == "none" {
        return Some(None);
    }
    AgentKind::parse(&word).map(Some)
}

pub struct Orchestrator {
    llm: Option<Arc<dyn LlmClient>>,
    ops: Arc<dyn Agent>,
    strategy: Arc<dyn Agent>,
    market: Arc<dyn Agent>,
}

impl Orchestrator {
    pub fn new(
        llm: Option<Arc<dyn LlmClient>>,
        ops: Arc<dyn Agent>,
        strategy: Arc<dyn Agent>,
        market: Arc<dyn Agent>,
    ) -> Self {
        Self { llm, ops, strategy, market }
    }

    /// Wires the three agents over one shared context and model.
    pub fn from_context(ctx: Arc<AgentContext>, llm: Option<Arc<dyn LlmClient>>) -> Self {
        let runtime = AgentRuntime::new(llm.clone());
        Self::new(
            llm,
            Arc::new(OpsAgent::new(ctx.clone(), runtime.clone())),
            Arc::new(StrategyAgent::new(ctx.clone(), runtime.clone())),
            Arc::new(MarketAgent::new(ctx, runtime)),
        )
    }

    pub fn mode(&self) -> &'static str {
        if self.llm.is_some() {
            "llm"
        } else {
            "keyword"
        }
    }

    fn agent(&self, kind: AgentKind) -> &Arc<dyn Agent> {
        match kind {
            AgentKind::Ops => &self.ops,
            AgentKind::Strategy => &self.strategy,
            AgentKind::Market => &self.market,
        }
    }

    pub async fn route(
        &self,
        query: &str,
        correlation_id: &str,
    ) -> Result<RouteDecision, RoutingError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(RoutingError::EmptyQuery);
        }

        if let Some(llm) = &self.llm {
            match llm.complete(ROUTER_PROMPT, query).await {
                Ok(reply) => match parse_label(&reply) {
                    Some(target) => {
                        return Ok(RouteDecision {
                            target,
                            method: RoutingMethod::Llm,
                            matched_terms: vec![],
                        })
                    }
                    None => warn!(
                        event_name = "orchestrator.route.fallback",
                        correlation_id,
                        reply = %reply.chars().take(80).collect::<String>(),
                        "classifier reply not understood; using keyword routing"
                    ),
                },
                Err(error) => warn!(
                    event_name = "orchestrator.route.fallback",
                    correlation_id,
                    error = %error,
                    "classifier call failed; using keyword routing"
                ),
            }
        }

        Ok(keyword_route(query))
    }

    pub async fn handle(
        &self,
        query: &str,
        correlation_id: &str,
    ) -> Result<OrchestratorReply, RoutingError> {
        let route = self.route(query, correlation_id).await?;
        info!(
            event_name = "orchestrator.route.decided",
            correlation_id,
            agent = route.target.map(|kind| kind.as_str()).unwrap_or("none"),
            method = route.method.as_str(),
            "query routed"
        );

        let Some(kind) = route.target else {
            return Ok(OrchestratorReply {
                route,
                reply: None,
                text: CANNOT_ROUTE_MESSAGE.to_string(),
            });
        };

        let reply = self.agent(kind).handle(query.trim(), correlation_id).await?;
        Ok(OrchestratorReply { text: reply.text.clone(), reply: Some(reply), route })
    }
}
