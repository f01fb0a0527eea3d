//! Market intelligence: trends, supply chain news, product suggestions and competitor risk.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use guardian_core::domain::market::{
    CompetitorProfile, ProductSuggestion, ProductTrend, SupplyChainEvent,
};
use guardian_core::signals::{classify_events, competitor_profile, suggest_products};
use guardian_external::news::DEFAULT_KEYWORDS;
use serde::Serialize;
use serde_json::{json, Value};

use super::{contains_any, Agent, AgentContext, AgentKind};
use crate::runtime::AgentRuntime;
use crate::tools::{optional_str, to_value, Tool, ToolError, ToolRegistry};

pub const DEFAULT_CATEGORY: &str = "Baking Staples";

const SYSTEM_PROMPT: &str = "You are the Market Intelligence agent of a supply chain assistant. \
Analyze market trends, monitor global supply chain events, suggest new products from demand \
signals and assess competitive risk. Use the tools to gather data and explain your reasoning.";

const TREND_TERMS: &[&str] = &["trend", "market", "demand", "popular"];
const EVENT_TERMS: &[&str] = &["news", "event", "disruption", "strike"];
const SUGGEST_TERMS: &[&str] = &["suggest", "new product", "add to", "expand"];
const COMPETITOR_TERMS: &[&str] = &["competitor", "competition", "rival"];
const FALLBACK_LIMIT: usize = 5;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct MarketTrends {
    pub category: String,
    pub trending_products: Vec<ProductTrend>,
    pub analyzed_at: DateTime<Utc>,
}

pub async fn market_trends(ctx: &AgentContext, category: &str) -> MarketTrends {
    MarketTrends {
        category: category.to_string(),
        trending_products: ctx.news.product_trends(category).await,
        analyzed_at: Utc::now(),
    }
}

pub async fn supply_chain_events(ctx: &AgentContext) -> Vec<SupplyChainEvent> {
    classify_events(ctx.news.supply_chain_news(DEFAULT_KEYWORDS).await)
}

pub async fn product_suggestions(
    ctx: &AgentContext,
    category: &str,
) -> Result<Vec<ProductSuggestion>, ToolError> {
    let products = ctx.products.list().await?;
    let trends = ctx.news.product_trends(category).await;
    Ok(suggest_products(&trends, &products, category))
}

pub fn competitor_risk(category: &str) -> CompetitorProfile {
    competitor_profile(category)
}

fn category_schema(field: &str) -> Value {
    json!({
        "type": "object",
        "properties": {
            field: {"type": "string", "description": "Product category, e.g. Baking Staples"}
        }
    })
}

struct AnalyzeMarketTrends(Arc<AgentContext>);

#[async_trait]
impl Tool for AnalyzeMarketTrends {
    fn name(&self) -> &'static str {
        "analyze_market_trends"
    }

    fn description(&self) -> &'static str {
        "Analyze trending products and growth for a product category"
    }

    fn parameters(&self) -> Value {
        category_schema("category")
    }

    async fn execute(&self, input: Value) -> Result<Value, ToolError> {
        let category = optional_str(&input, "category").unwrap_or(DEFAULT_CATEGORY);
        to_value(&market_trends(&self.0, category).await)
    }
}

struct GetSupplyChainEvents(Arc<AgentContext>);

#[async_trait]
impl Tool for GetSupplyChainEvents {
    fn name(&self) -> &'static str {
        "get_supply_chain_events"
    }

    fn description(&self) -> &'static str {
        "Fetch recent supply chain disruptions with a severity per headline"
    }

    async fn execute(&self, _input: Value) -> Result<Value, ToolError> {
        to_value(&supply_chain_events(&self.0).await)
    }
}

struct SuggestNewProducts(Arc<AgentContext>);

#[async_trait]
impl Tool for SuggestNewProducts {
    fn name(&self) -> &'static str {
        "suggest_new_products"
    }

    fn description(&self) -> &'static str {
        "Suggest products to add or stock up on based on market trends"
    }

    fn parameters(&self) -> Value {
        category_schema("category")
    }

    async fn execute(&self, input: Value) -> Result<Value, ToolError> {
        let category = optional_str(&input, "category").unwrap_or(DEFAULT_CATEGORY);
        to_value(&product_suggestions(&self.0, category).await?)
    }
}

struct AssessCompetitorRisk;

#[async_trait]
impl Tool for AssessCompetitorRisk {
    fn name(&self) -> &'static str {
        "assess_competitor_risk"
    }

    fn description(&self) -> &'static str {
        "Assess market competition and supply risks for a category"
    }

    fn parameters(&self) -> Value {
        category_schema("product_category")
    }

    async fn execute(&self, input: Value) -> Result<Value, ToolError> {
        let category = optional_str(&input, "product_category").unwrap_or(DEFAULT_CATEGORY);
        to_value(&competitor_risk(category))
    }
}

pub struct MarketAgent {
    ctx: Arc<AgentContext>,
    runtime: AgentRuntime,
    tools: ToolRegistry,
}

impl MarketAgent {
    pub fn new(ctx: Arc<AgentContext>, runtime: AgentRuntime) -> Self {
        let mut tools = ToolRegistry::default();
        tools.register(AnalyzeMarketTrends(ctx.clone()));
        tools.register(GetSupplyChainEvents(ctx.clone()));
        tools.register(SuggestNewProducts(ctx.clone()));
        tools.register(AssessCompetitorRisk);
        Self { ctx, runtime, tools }
    }
}

#[async_trait]
impl Agent for MarketAgent {
    fn kind(&self) -> AgentKind {
        AgentKind::Market
    }

    fn system_prompt(&self) -> &'static str {
        SYSTEM_PROMPT
    }

    fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    fn runtime(&self) -> &AgentRuntime {
        &self.runtime
    }

    async fn fallback(&self, input: &str) -> Result<String, ToolError> {
        let lowered = input.to_lowercase();

        if contains_any(&lowered, SUGGEST_TERMS) {
            let suggestions = product_suggestions(&self.ctx, DEFAULT_CATEGORY).await?;
            if suggestions.is_empty() {
                return Ok("Current portfolio looks good.".to_string());
            }
            let lines: Vec<String> = suggestions
                .iter()
                .take(FALLBACK_LIMIT)
                .map(|suggestion| {
                    format!(
                        "- {}: score {} - {}",
                        suggestion.product_name,
                        suggestion.trend_score,
                        suggestion.recommendation.label()
                    )
                })
                .collect();
            return Ok(format!("Product suggestions:\n{}", lines.join("\n")));
        }

        if contains_any(&lowered, EVENT_TERMS) {
            let events = supply_chain_events(&self.ctx).await;
            if events.is_empty() {
                return Ok("No recent supply chain events.".to_string());
            }
            let lines: Vec<String> = events
                .iter()
                .take(FALLBACK_LIMIT)
                .map(|event| format!("- [{}] {}", event.severity.as_str().to_uppercase(), event.title))
                .collect();
            return Ok(format!("Supply chain events:\n{}", lines.join("\n")));
        }

        if contains_any(&lowered, COMPETITOR_TERMS) {
            let profile = competitor_risk(DEFAULT_CATEGORY);
            return Ok(format!(
                "Competitive landscape for {}: competition {}, supply availability {}, prices {}\n  Key competitors: {}",
                profile.category,
                profile.market_competition.as_str(),
                profile.supply_availability.as_str(),
                profile.price_trend.to_lowercase(),
                profile.key_competitors.join(", ")
            ));
        }

        if contains_any(&lowered, TREND_TERMS) {
            let trends = market_trends(&self.ctx, DEFAULT_CATEGORY).await;
            let lines: Vec<String> = trends
                .trending_products
                .iter()
                .take(FALLBACK_LIMIT)
                .map(|trend| {
                    format!("- {}: score {} ({})", trend.product, trend.trend_score, trend.growth_rate)
                })
                .collect();
            return Ok(format!("Market trends:\n{}", lines.join("\n")));
        }

        Ok("Market agent: I can analyze trends, monitor supply chain events and suggest new \
            products."
            .to_string())
    }
}
