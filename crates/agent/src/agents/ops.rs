//! Inventory operations: stock lookups, active alerts and guarded stock updates.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use guardian_core::domain::alert::Alert;
use guardian_core::domain::product::{Product, ProductId, StockStatus};
use serde::Serialize;
use serde_json::{json, Value};
use tracing::info;

use super::{contains_any, words, Agent, AgentContext, AgentKind};
use crate::guardrails::{ActionOrigin, GuardrailDecision, GuardrailIntent};
use crate::runtime::AgentRuntime;
use crate::tools::{required_i64, required_str, to_value, Tool, ToolError, ToolRegistry};

const SYSTEM_PROMPT: &str = "You are the Inventory Operations agent of a supply chain assistant. \
Monitor stock levels, report low and critical inventory, list active alerts and apply stock \
updates when asked. Always use the tools to read real data. Be concise and actionable.";

const UPDATE_TERMS: &[&str] = &["set", "update", "change", "adjust"];
const ALERT_TERMS: &[&str] = &["alert"];
const LISTING_TERMS: &[&str] = &["stock", "inventory", "level", "all products"];

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ProductStatusView {
    pub product_id: ProductId,
    pub sku: String,
    pub name: String,
    pub stock_level: i64,
    pub status: StockStatus,
    pub warehouse_location: String,
    pub reorder_threshold: i64,
    pub supplier_location: String,
    pub lead_time_days: i64,
    pub days_until_stockout: Option<i64>,
    pub last_updated: DateTime<Utc>,
}

impl From<&Product> for ProductStatusView {
    fn from(product: &Product) -> Self {
        Self {
            product_id: product.id,
            sku: product.sku.clone(),
            name: product.name.clone(),
            stock_level: product.current_stock,
            status: product.stock_status(),
            warehouse_location: product.warehouse_location.clone(),
            reorder_threshold: product.reorder_threshold,
            supplier_location: product.supplier_location.clone(),
            lead_time_days: product.lead_time_days,
            days_until_stockout: product.days_until_stockout(),
            last_updated: product.last_updated,
        }
    }
}

pub async fn inventory_status(
    ctx: &AgentContext,
    reference: &str,
) -> Result<ProductStatusView, ToolError> {
    let product = ctx
        .products
        .lookup(reference)
        .await?
        .ok_or_else(|| ToolError::ProductNotFound(reference.to_string()))?;
    Ok(ProductStatusView::from(&product))
}

pub async fn all_inventory(ctx: &AgentContext) -> Result<Vec<ProductStatusView>, ToolError> {
    Ok(ctx.products.list().await?.iter().map(ProductStatusView::from).collect())
}

pub async fn active_alerts(ctx: &AgentContext) -> Result<Vec<Alert>, ToolError> {
    Ok(ctx.alerts.list_active().await?)
}

/// Applies a stock update after the guardrail policy has approved it.
pub async fn update_stock_level(
    ctx: &AgentContext,
    reference: &str,
    new_stock: i64,
    origin: ActionOrigin,
) -> Result<Product, ToolError> {
    let product = ctx
        .products
        .lookup(reference)
        .await?
        .ok_or_else(|| ToolError::ProductNotFound(reference.to_string()))?;

    let intent =
        GuardrailIntent::StockUpdate { product: product.name.clone(), new_stock, origin };
    match ctx.guardrails.evaluate(&intent) {
        GuardrailDecision::Allow => {}
        GuardrailDecision::Deny { reason_code, user_message, .. }
        | GuardrailDecision::Degrade { reason_code, user_message, .. } => {
            info!(
                event_name = "agent.guardrail.blocked",
                action = intent.action_key(),
                reason_code,
                product_id = %product.id,
                "stock update blocked"
            );
            return Err(ToolError::Denied { reason_code, message: user_message });
        }
    }

    let updated = ctx.products.set_stock(product.id, new_stock).await?;
    info!(
        event_name = "agent.inventory.stock_updated",
        product_id = %updated.id,
        previous = product.current_stock,
        current = updated.current_stock,
        "stock level updated"
    );
    Ok(updated)
}

struct GetInventoryStatus(Arc<AgentContext>);

#[async_trait]
impl Tool for GetInventoryStatus {
    fn name(&self) -> &'static str {
        "get_inventory_status"
    }

    fn description(&self) -> &'static str {
        "Get current stock status and details for one product by id, sku or name"
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "product": {"type": "string", "description": "Product id, sku (e.g. VAN-EXT) or name"}
            },
            "required": ["product"]
        })
    }

    async fn execute(&self, input: Value) -> Result<Value, ToolError> {
        let reference = required_str(self.name(), &input, "product")?;
        to_value(&inventory_status(&self.0, reference).await?)
    }
}

struct GetAllInventory(Arc<AgentContext>);

#[async_trait]
impl Tool for GetAllInventory {
    fn name(&self) -> &'static str {
        "get_all_inventory"
    }

    fn description(&self) -> &'static str {
        "Get stock status of every product"
    }

    async fn execute(&self, _input: Value) -> Result<Value, ToolError> {
        to_value(&all_inventory(&self.0).await?)
    }
}

struct GetActiveAlerts(Arc<AgentContext>);

#[async_trait]
impl Tool for GetActiveAlerts {
    fn name(&self) -> &'static str {
        "get_active_alerts"
    }

    fn description(&self) -> &'static str {
        "Get all unresolved stock and shipment alerts"
    }

    async fn execute(&self, _input: Value) -> Result<Value, ToolError> {
        to_value(&active_alerts(&self.0).await?)
    }
}

struct UpdateStockLevel(Arc<AgentContext>);

#[async_trait]
impl Tool for UpdateStockLevel {
    fn name(&self) -> &'static str {
        "update_stock_level"
    }

    fn description(&self) -> &'static str {
        "Set the stock level of a product. Stock can never be negative."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "product": {"type": "string", "description": "Product id, sku or name"},
                "new_stock": {"type": "integer", "description": "New stock quantity"}
            },
            "required": ["product", "new_stock"]
        })
    }

    async fn execute(&self, input: Value) -> Result<Value, ToolError> {
        let reference = required_str(self.name(), &input, "product")?;
        let new_stock = required_i64(self.name(), &input, "new_stock")?;
        let product = update_stock_level(&self.0, reference, new_stock, ActionOrigin::Model).await?;
        Ok(json!({
            "success": true,
            "message": format!("Stock updated for {}", product.name),
            "product": ProductStatusView::from(&product),
        }))
    }
}

pub struct OpsAgent {
    ctx: Arc<AgentContext>,
    runtime: AgentRuntime,
    tools: ToolRegistry,
}

impl OpsAgent {
    pub fn new(ctx: Arc<AgentContext>, runtime: AgentRuntime) -> Self {
        let mut tools = ToolRegistry::default();
        tools.register(GetInventoryStatus(ctx.clone()));
        tools.register(GetAllInventory(ctx.clone()));
        tools.register(GetActiveAlerts(ctx.clone()));
        tools.register(UpdateStockLevel(ctx.clone()));
        Self { ctx, runtime, tools }
    }
}

#[async_trait]
impl Agent for OpsAgent {
    fn kind(&self) -> AgentKind {
        AgentKind::Ops
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
        let products = self.ctx.products.list().await?;
        let mentioned = mentioned_product(&lowered, &products);

        if let (Some(product), true) = (mentioned, contains_any(&lowered, UPDATE_TERMS)) {
            return Ok(format!(
                "Keyword handling never changes stock. Use PUT /api/products/{}/stock to set it.\n{}",
                product.id,
                product_detail(product)
            ));
        }

        if contains_any(&lowered, ALERT_TERMS) {
            let alerts = active_alerts(&self.ctx).await?;
            if alerts.is_empty() {
                return Ok("No active alerts.".to_string());
            }
            let lines: Vec<String> = alerts
                .iter()
                .map(|alert| {
                    format!("- [{}] {}", alert.severity.as_str().to_uppercase(), alert.message)
                })
                .collect();
            return Ok(format!("Active alerts:\n{}", lines.join("\n")));
        }

        if let Some(product) = mentioned {
            return Ok(product_detail(product));
        }

        if contains_any(&lowered, &["weather"]) {
            let Some(location) = mentioned_location(&lowered, &products) else {
                return Ok("Name a supplier or warehouse location to check its weather risk."
                    .to_string());
            };
            let risk = self.ctx.weather.assess_logistics_risk(&location).await;
            return Ok(format!(
                "Weather risk for {}: {} (estimated delay {} days)",
                location,
                risk.risk_level.as_str(),
                risk.delay_estimate_days
            ));
        }

        if contains_any(&lowered, LISTING_TERMS) {
            let lines: Vec<String> = products
                .iter()
                .map(|product| {
                    format!(
                        "- {} ({}): {} units - {}",
                        product.name,
                        product.sku,
                        product.current_stock,
                        product.stock_status().as_str()
                    )
                })
                .collect();
            return Ok(format!("Current inventory:\n{}", lines.join("\n")));
        }

        Ok("Ops agent: I can report inventory status and active alerts. \
            Try asking about a specific product."
            .to_string())
    }
}

fn product_detail(product: &Product) -> String {
    let view = ProductStatusView::from(product);
    format!(
        "{} ({}):\n  Stock: {} units\n  Status: {}\n  Location: {}\n  Days of cover: {}",
        view.name,
        view.sku,
        view.stock_level,
        view.status.as_str(),
        view.warehouse_location,
        view.days_until_stockout.map(|days| days.to_string()).unwrap_or_else(|| "n/a".to_string())
    )
}

/// First product whose sku, or any name word of four or more letters, appears in the query.
fn mentioned_product<'a>(lowered: &str, products: &'a [Product]) -> Option<&'a Product> {
    let query_words: Vec<&str> = words(lowered).collect();
    products.iter().find(|product| {
        let sku = product.sku.to_lowercase();
        if query_words.contains(&sku.as_str()) {
            return true;
        }
        let name = product.name.to_lowercase();
        let named =
            words(&name).filter(|word| word.len() >= 4).any(|word| query_words.contains(&word));
        named
    })
}

fn mentioned_location(lowered: &str, products: &[Product]) -> Option<String> {
    products
        .iter()
        .flat_map(|product| [&product.supplier_location, &product.warehouse_location])
        .find(|location| {
            let city = location.split(',').next().unwrap_or_default().trim().to_lowercase();
            !city.is_empty() && lowered.contains(&city)
        })
        .cloned()
}

#[cfg(test)]
mod tests {
    use guardian_core::domain::product::ProductId;
    use serde_json::json;

    use super::OpsAgent;
    use crate::agents::fixtures::context;
    use crate::agents::{Agent, ReplyMode};
    use crate::guardrails::GuardrailPolicy;
    use crate::runtime::AgentRuntime;
    use crate::tools::ToolError;

    fn agent(policy: GuardrailPolicy) -> OpsAgent {
        OpsAgent::new(context(policy), AgentRuntime::default())
    }

    #[tokio::test]
    async fn registers_inventory_tools() {
        let agent = agent(GuardrailPolicy::default());
        assert_eq!(
            agent.tools().names(),
            vec!["get_active_alerts", "get_all_inventory", "get_inventory_status", "update_stock_level"]
        );
    }

    #[tokio::test]
    async fn status_tool_resolves_sku() {
        let agent = agent(GuardrailPolicy::default());
        let output = agent
            .tools()
            .execute("get_inventory_status", json!({"product": "VAN-EXT"}))
            .await
            .expect("status");

        assert_eq!(output["name"], "Vanilla Extract");
        assert_eq!(output["stock_level"], 30);
        assert_eq!(output["days_until_stockout"], 12);
    }

    #[tokio::test]
    async fn negative_update_is_denied_and_stock_unchanged() {
        let agent = agent(GuardrailPolicy::default());
        let error = agent
            .tools()
            .execute("update_stock_level", json!({"product": "Cocoa Powder", "new_stock": -3}))
            .await
            .expect_err("negative");
        assert!(matches!(error, ToolError::Denied { reason_code: "negative_stock_disallowed", .. }));

        let product = agent
            .ctx
            .products
            .find_by_id(ProductId(4))
            .await
            .expect("query")
            .expect("cocoa");
        assert_eq!(product.current_stock, 8);
    }

    #[tokio::test]
    async fn read_only_policy_blocks_model_writes() {
        let agent = agent(GuardrailPolicy::read_only_model());
        let error = agent
            .tools()
            .execute("update_stock_level", json!({"product": "4", "new_stock": 30}))
            .await
            .expect_err("blocked");
        assert!(
            matches!(error, ToolError::Denied { reason_code: "model_stock_writes_disabled", .. })
        );
    }

    #[tokio::test]
    async fn fallback_lists_stock_levels() {
        let reply = agent(GuardrailPolicy::default())
            .handle("show me stock levels", "corr-1")
            .await
            .expect("reply");

        assert_eq!(reply.mode, ReplyMode::Fallback);
        assert!(reply.text.starts_with("Current inventory:"));
        assert!(reply.text.contains("Cocoa Powder (COC-PWD): 8 units - low"));
    }

    async fn cocoa_stock(agent: &OpsAgent) -> i64 {
        agent
            .ctx
            .products
            .find_by_id(ProductId(4))
            .await
            .expect("query")
            .expect("cocoa")
            .current_stock
    }

    #[tokio::test]
    async fn fallback_questions_with_numbers_leave_stock_unchanged() {
        let agent = agent(GuardrailPolicy::read_only_model());

        let reply = agent
            .fallback("How has cocoa stock changed over the last 7 days?")
            .await
            .expect("reply");
        assert!(reply.starts_with("Cocoa Powder (COC-PWD):"));
        assert_eq!(cocoa_stock(&agent).await, 8);
    }

    #[tokio::test]
    async fn fallback_update_requests_point_to_operator_endpoint() {
        let agent = agent(GuardrailPolicy::default());

        let reply = agent.fallback("update cocoa stock to 60").await.expect("reply");
        assert!(reply.starts_with("Keyword handling never changes stock."));
        assert!(reply.contains("PUT /api/products/4/stock"));
        assert_eq!(cocoa_stock(&agent).await, 8);
    }

    #[tokio::test]
    async fn fallback_reports_product_detail_and_weather() {
        let agent = agent(GuardrailPolicy::default());

        let detail = agent.fallback("how much vanilla do we have?").await.expect("detail");
        assert!(detail.starts_with("Vanilla Extract (VAN-EXT):"));

        let weather = agent.fallback("weather in Florida").await.expect("weather");
        assert_eq!(weather, "Weather risk for Florida, USA: high (estimated delay 3 days)");
    }
}
