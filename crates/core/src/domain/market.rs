use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::alert::Severity;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewsArticle {
    pub title: String,
    pub description: String,
    pub source: String,
    pub published_at: DateTime<Utc>,
    pub url: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductTrend {
    pub product: String,
    pub trend_score: u32,
    pub growth_rate: String,
    pub reasoning: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupplyChainEvent {
    pub title: String,
    pub description: String,
    pub source: String,
    pub severity: Severity,
    pub published_at: DateTime<Utc>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SuggestionAction {
    AddToInventory,
    IncreaseStock,
}

impl SuggestionAction {
    pub fn label(&self) -> &'static str {
        match self {
            Self::AddToInventory => "Add to inventory",
            Self::IncreaseStock => "Increase stock",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductSuggestion {
    pub product_name: String,
    pub category: String,
    pub trend_score: u32,
    pub growth_rate: String,
    pub reasoning: String,
    pub recommendation: SuggestionAction,
    pub priority: Severity,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompetitorProfile {
    pub category: String,
    pub market_competition: Severity,
    pub supply_availability: Severity,
    pub price_trend: String,
    pub key_competitors: Vec<String>,
    pub risks: Vec<String>,
    pub opportunities: Vec<String>,
}
