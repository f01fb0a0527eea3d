use std::sync::Arc;

use async_trait::async_trait;
use guardian_core::config::AppConfig;
use guardian_db::repositories::{
    AlertRepository, ProductRepository, ShipmentRepository, SqlAlertRepository,
    SqlProductRepository, SqlShipmentRepository,
};
use guardian_db::DbPool;
use guardian_external::{news_source, weather_source, NewsSource, WeatherSource};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::guardrails::GuardrailPolicy;
use crate::runtime::AgentRuntime;
use crate::tools::{ToolError, ToolRegistry};

pub mod market;
pub mod ops;
pub mod strategy;

pub use market::MarketAgent;
pub use ops::OpsAgent;
pub use strategy::StrategyAgent;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentKind {
    Ops,
    Strategy,
    Market,
}

impl AgentKind {
    pub const ALL: [AgentKind; 3] = [Self::Ops, Self::Strategy, Self::Market];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ops => "ops",
            Self::Strategy => "strategy",
            Self::Market => "market",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "ops" | "operations" | "inventory" => Some(Self::Ops),
            "strategy" | "strat" => Some(Self::Strategy),
            "market" => Some(Self::Market),
            _ => None,
        }
    }
}

/// Shared handles every agent's tools read from.
pub struct AgentContext {
    pub products: Arc<dyn ProductRepository>,
    pub shipments: Arc<dyn ShipmentRepository>,
    pub alerts: Arc<dyn AlertRepository>,
    pub weather: Arc<dyn WeatherSource>,
    pub news: Arc<dyn NewsSource>,
    pub guardrails: GuardrailPolicy,
}

impl AgentContext {
    /// SQL-backed repositories plus live or mock external sources per config.
    pub fn from_pool(pool: DbPool, config: &AppConfig) -> Self {
        Self {
            products: Arc::new(SqlProductRepository::new(pool.clone())),
            shipments: Arc::new(SqlShipmentRepository::new(pool.clone())),
            alerts: Arc::new(SqlAlertRepository::new(pool)),
            weather: weather_source(&config.weather),
            news: news_source(&config.news),
            guardrails: GuardrailPolicy::default(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplyMode {
    Model,
    Fallback,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentReply {
    pub agent: AgentKind,
    pub mode: ReplyMode,
    pub text: String,
}

#[async_trait]
pub trait Agent: Send + Sync {
    fn kind(&self) -> AgentKind;
    fn system_prompt(&self) -> &'static str;
    fn tools(&self) -> &ToolRegistry;
    fn runtime(&self) -> &AgentRuntime;

    /// Keyword handling used when no model is available or the model fails.
    async fn fallback(&self, input: &str) -> Result<String, ToolError>;

    async fn handle(&self, input: &str, correlation_id: &str) -> Result<AgentReply, ToolError> {
        if self.runtime().has_llm() {
            match self.runtime().run(self.system_prompt(), self.tools(), input).await {
                Ok(text) => {
                    return Ok(AgentReply { agent: self.kind(), mode: ReplyMode::Model, text })
                }
                Err(error) => warn!(
                    event_name = "agent.fallback",
                    correlation_id,
                    agent = self.kind().as_str(),
                    error = %error,
                    "model run failed; using keyword handling"
                ),
            }
        }

        let text = self.fallback(input).await?;
        Ok(AgentReply { agent: self.kind(), mode: ReplyMode::Fallback, text })
    }
}

/// Splits text into word tokens. Hyphens stay inside a word so skus like `coc-pwd` survive.
pub(crate) fn words(text: &str) -> impl Iterator<Item = &str> {
    text.split(|c: char| !(c.is_alphanumeric() || c == '-')).filter(|word| !word.is_empty())
}

fn word_matches(word: &str, term: &str) -> bool {
    word == term
        || word.strip_suffix('s') == Some(term)
        || word.strip_suffix("es") == Some(term)
}

/// True when `term` appears as whole words in `tokens`. Multi-word terms must appear
/// consecutively; a plural `s`/`es` is accepted on the last word only.
pub(crate) fn mentions_term(tokens: &[&str], term: &str) -> bool {
    let parts: Vec<&str> = words(term).collect();
    let Some((last, leading)) = parts.split_last() else {
        return false;
    };
    tokens.windows(parts.len()).any(|window| {
        window[..leading.len()] == *leading && word_matches(window[leading.len()], last)
    })
}

pub(crate) fn contains_any(haystack: &str, needles: &[&str]) -> bool {
    let tokens: Vec<&str> = words(haystack).collect();
    needles.iter().any(|needle| mentions_term(&tokens, needle))
}

#[cfg(test)]
pub(crate) mod fixtures {
    use std::sync::Arc;

    use chrono::{NaiveDate, Utc};
    use guardian_core::domain::product::{Product, ProductId};
    use guardian_core::domain::shipment::{Shipment, ShipmentId, ShipmentStatus};
    use guardian_db::repositories::{
        InMemoryAlertRepository, InMemoryProductRepository, InMemoryShipmentRepository,
    };
    use guardian_external::{MockNews, MockWeather};
    use rust_decimal::Decimal;

    use super::AgentContext;
    use crate::guardrails::GuardrailPolicy;

    fn product(
        id: i64,
        sku: &str,
        name: &str,
        stock: i64,
        daily: Decimal,
        threshold: i64,
        warehouse: &str,
        supplier: &str,
        lead: i64,
    ) -> Product {
        Product {
            id: ProductId(id),
            sku: sku.to_string(),
            name: name.to_string(),
            category: "Baking Staples".to_string(),
            current_stock: stock,
            avg_daily_sale: daily,
            price: Decimal::new(450, 2),
            reorder_threshold: threshold,
            warehouse_location: warehouse.to_string(),
            supplier_location: supplier.to_string(),
            lead_time_days: lead,
            last_updated: Utc::now(),
        }
    }

    pub fn products() -> Vec<Product> {
        vec![
            product(1, "FLR-ORG", "Organic Flour", 120, Decimal::new(155, 1), 40, "California, USA", "Mumbai, India", 7),
            product(2, "SUG-CAN", "Cane Sugar", 80, Decimal::new(100, 1), 25, "Texas, USA", "Ho Chi Minh City, Vietnam", 10),
            product(3, "VAN-EXT", "Vanilla Extract", 30, Decimal::new(25, 1), 10, "California, USA", "Kochi, India", 14),
            product(4, "COC-PWD", "Cocoa Powder", 8, Decimal::new(30, 1), 15, "Florida, USA", "Accra, Ghana", 12),
        ]
    }

    pub fn shipments() -> Vec<Shipment> {
        let date = NaiveDate::from_ymd_opt(2026, 7, 1).unwrap_or_default();
        vec![
            Shipment {
                id: ShipmentId(1),
                product_id: ProductId(1),
                quantity: 200,
                origin: "Mumbai, India".to_string(),
                destination: "California, USA".to_string(),
                expected_date: date,
                status: ShipmentStatus::InTransit,
                delay_days: 0,
                delay_reason: None,
            },
            Shipment {
                id: ShipmentId(4),
                product_id: ProductId(4),
                quantity: 40,
                origin: "Accra, Ghana".to_string(),
                destination: "Florida, USA".to_string(),
                expected_date: date,
                status: ShipmentStatus::InTransit,
                delay_days: 0,
                delay_reason: None,
            },
        ]
    }

    pub fn context(guardrails: GuardrailPolicy) -> Arc<AgentContext> {
        Arc::new(AgentContext {
            products: Arc::new(InMemoryProductRepository::with_products(products())),
            shipments: Arc::new(InMemoryShipmentRepository::with_shipments(shipments())),
            alerts: Arc::new(InMemoryAlertRepository::default()),
            weather: Arc::new(MockWeather::default()),
            news: Arc::new(MockNews),
            guardrails,
        })
    }
}
