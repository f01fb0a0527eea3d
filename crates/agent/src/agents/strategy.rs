//! Delay prediction, reorder planning and resilience scoring from inventory plus weather.

use std::collections::BTreeSet;
use std::sync::Arc;

use async_trait::async_trait;
use guardian_core::domain::shipment::ShipmentStatus;
use guardian_core::domain::weather::LogisticsRisk;
use guardian_core::planning::{
    assess_resilience, predict_delay, recommend_reorder, DelayPrediction, ReorderRecommendation,
    ResilienceReport,
};
use serde_json::{json, Value};

use super::{contains_any, Agent, AgentContext, AgentKind};
use crate::runtime::AgentRuntime;
use crate::tools::{optional_str, required_str, to_value, Tool, ToolError, ToolRegistry};

const SYSTEM_PROMPT: &str = "You are the Strategy agent of a supply chain assistant. Predict \
shipment delays from weather, recommend reorders that account for weather-adjusted lead times \
and assess overall supply chain resilience. Always use the tools to analyze real data and give \
quantified, actionable recommendations.";

const DELAY_TERMS: &[&str] = &["delay", "shipment", "arrive", "in transit"];
const REORDER_TERMS: &[&str] = &["reorder", "recommend", "restock", "replenish"];
const RESILIENCE_TERMS: &[&str] =
    &["resilience", "health", "score", "vulnerable", "vulnerability"];
const WEATHER_TERMS: &[&str] = &["weather", "risk", "storm", "forecast"];
const FALLBACK_LIMIT: usize = 5;

/// Predictions for in-transit shipments, optionally narrowed to one product.
pub async fn predict_shipment_delays(
    ctx: &AgentContext,
    product: Option<&str>,
) -> Result<Vec<DelayPrediction>, ToolError> {
    let shipments = match product {
        Some(reference) => {
            let product = ctx
                .products
                .lookup(reference)
                .await?
                .ok_or_else(|| ToolError::ProductNotFound(reference.to_string()))?;
            ctx.shipments.list_in_transit_for(product.id).await?
        }
        None => ctx.shipments.list_by_status(ShipmentStatus::InTransit).await?,
    };

    let mut predictions = Vec::with_capacity(shipments.len());
    for shipment in &shipments {
        let origin = ctx.weather.assess_logistics_risk(&shipment.origin).await;
        let destination = ctx.weather.assess_logistics_risk(&shipment.destination).await;
        predictions.push(predict_delay(shipment, &origin, &destination));
    }
    Ok(predictions)
}

pub async fn reorder_recommendations(
    ctx: &AgentContext,
) -> Result<Vec<ReorderRecommendation>, ToolError> {
    let products = ctx.products.list().await?;
    let mut recommendations = Vec::new();
    for product in &products {
        let supplier_risk = ctx.weather.assess_logistics_risk(&product.supplier_location).await;
        if let Some(recommendation) = recommend_reorder(product, &supplier_risk) {
            recommendations.push(recommendation);
        }
    }
    Ok(recommendations)
}

pub async fn supply_chain_resilience(ctx: &AgentContext) -> Result<ResilienceReport, ToolError> {
    let products = ctx.products.list().await?;
    let active_alerts = ctx.alerts.list_active().await?.len();

    let locations: BTreeSet<&str> =
        products.iter().map(|product| product.supplier_location.as_str()).collect();
    let mut supplier_risks = Vec::with_capacity(locations.len());
    for location in locations {
        supplier_risks.push(ctx.weather.assess_logistics_risk(location).await);
    }

    Ok(assess_resilience(&products, &supplier_risks, active_alerts))
}

pub async fn weather_risk(ctx: &AgentContext, location: &str) -> LogisticsRisk {
    ctx.weather.assess_logistics_risk(location).await
}

struct PredictShipmentDelays(Arc<AgentContext>);

#[async_trait]
impl Tool for PredictShipmentDelays {
    fn name(&self) -> &'static str {
        "predict_shipment_delays"
    }

    fn description(&self) -> &'static str {
        "Predict delays for in-transit shipments from weather at origin and destination"
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "product": {"type": "string", "description": "Optional product id, sku or name"}
            }
        })
    }

    async fn execute(&self, input: Value) -> Result<Value, ToolError> {
        to_value(&predict_shipment_delays(&self.0, optional_str(&input, "product")).await?)
    }
}

struct CalculateReorderRecommendations(Arc<AgentContext>);

#[async_trait]
impl Tool for CalculateReorderRecommendations {
    fn name(&self) -> &'static str {
        "calculate_reorder_recommendations"
    }

    fn description(&self) -> &'static str {
        "Recommend reorders using sales rate, lead time and supplier weather risk"
    }

    async fn execute(&self, _input: Value) -> Result<Value, ToolError> {
        to_value(&reorder_recommendations(&self.0).await?)
    }
}

struct AssessSupplyChainResilience(Arc<AgentContext>);

#[async_trait]
impl Tool for AssessSupplyChainResilience {
    fn name(&self) -> &'static str {
        "assess_supply_chain_resilience"
    }

    fn description(&self) -> &'static str {
        "Score overall supply chain health from stock status, alerts and supplier weather"
    }

    async fn execute(&self, _input: Value) -> Result<Value, ToolError> {
        to_value(&supply_chain_resilience(&self.0).await?)
    }
}

struct CheckWeatherRisk(Arc<AgentContext>);

#[async_trait]
impl Tool for CheckWeatherRisk {
    fn name(&self) -> &'static str {
        "check_weather_risk"
    }

    fn description(&self) -> &'static str {
        "Check weather-related logistics risk for a city or region"
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "location": {"type": "string", "description": "City or region, e.g. Kochi, India"}
            },
            "required": ["location"]
        })
    }

    async fn execute(&self, input: Value) -> Result<Value, ToolError> {
        let location = required_str(self.name(), &input, "location")?;
        to_value(&weather_risk(&self.0, location).await)
    }
}

pub struct StrategyAgent {
    ctx: Arc<AgentContext>,
    runtime: AgentRuntime,
    tools: ToolRegistry,
}

impl StrategyAgent {
    pub fn new(ctx: Arc<AgentContext>, runtime: AgentRuntime) -> Self {
        let mut tools = ToolRegistry::default();
        tools.register(PredictShipmentDelays(ctx.clone()));
        tools.register(CalculateReorderRecommendations(ctx.clone()));
        tools.register(AssessSupplyChainResilience(ctx.clone()));
        tools.register(CheckWeatherRisk(ctx.clone()));
        Self { ctx, runtime, tools }
    }

    async fn resolve_location(&self, lowered: &str, original: &str) -> Result<Option<String>, ToolError> {
        let products = self.ctx.products.list().await?;
        let known = products
            .iter()
            .flat_map(|product| [&product.supplier_location, &product.warehouse_location])
            .find(|location| {
                let city = location.split(',').next().unwrap_or_default().trim().to_lowercase();
                !city.is_empty() && lowered.contains(&city)
            })
            .cloned();
        Ok(known.or_else(|| location_after_preposition(original)))
    }
}

#[async_trait]
impl Agent for StrategyAgent {
    fn kind(&self) -> AgentKind {
        AgentKind::Strategy
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

        if contains_any(&lowered, DELAY_TERMS) {
            let predictions = predict_shipment_delays(&self.ctx, None).await?;
            if predictions.is_empty() {
                return Ok("No active shipments to track.".to_string());
            }
            let lines: Vec<String> = predictions
                .iter()
                .take(FALLBACK_LIMIT)
                .map(|prediction| {
                    format!(
                        "- Shipment {} ({} -> {}): {} day delay, risk {}",
                        prediction.shipment_id,
                        prediction.origin,
                        prediction.destination,
                        prediction.predicted_delay_days,
                        prediction.risk_level.as_str()
                    )
                })
                .collect();
            return Ok(format!("Delay predictions:\n{}", lines.join("\n")));
        }

        if contains_any(&lowered, REORDER_TERMS) {
            let recommendations = reorder_recommendations(&self.ctx).await?;
            if recommendations.is_empty() {
                return Ok("No immediate reorders needed.".to_string());
            }
            let lines: Vec<String> = recommendations
                .iter()
                .take(FALLBACK_LIMIT)
                .map(|recommendation| {
                    format!(
                        "- {}: order {} units ({} urgency)",
                        recommendation.product_name,
                        recommendation.recommended_quantity,
                        recommendation.urgency.as_str()
                    )
                })
                .collect();
            return Ok(format!("Reorder recommendations:\n{}", lines.join("\n")));
        }

        if contains_any(&lowered, RESILIENCE_TERMS) {
            let report = supply_chain_resilience(&self.ctx).await?;
            return Ok(format!(
                "Supply chain health: {} (score {}/100)\n  Critical products: {}\n  Active alerts: {}\n  High-risk locations: {}",
                report.health_status.label(),
                report.resilience_score,
                report.inventory_breakdown.critical,
                report.active_alerts,
                report.high_risk_locations.len()
            ));
        }

        if contains_any(&lowered, WEATHER_TERMS) {
            let Some(location) = self.resolve_location(&lowered, input).await? else {
                return Ok("Name a location to assess, for example: weather risk in Kochi."
                    .to_string());
            };
            let risk = weather_risk(&self.ctx, &location).await;
            let factors = if risk.risk_factors.is_empty() {
                "none".to_string()
            } else {
                risk.risk_factors.join("; ")
            };
            return Ok(format!(
                "Weather risk for {}: {}\n  Delay estimate: {} days\n  Factors: {}",
                location,
                risk.risk_level.as_str(),
                risk.delay_estimate_days,
                factors
            ));
        }

        Ok("Strategy agent: I can predict shipment delays, recommend reorders and assess supply \
            chain resilience."
            .to_string())
    }
}

/// Takes the text after the last " in ", " at " or " for ".
fn location_after_preposition(input: &str) -> Option<String> {
    let lowered = input.to_lowercase();
    let start = [" in ", " at ", " for "]
        .iter()
        .filter_map(|marker| lowered.rfind(marker).map(|index| index + marker.len()))
        .max()?;
    let location = input
        .get(start..)?
        .trim()
        .trim_end_matches(|c: char| c == '?' || c == '.' || c == '!')
        .trim();
    (!location.is_empty()).then(|| location.to_string())
}
