use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::product::{Product, ProductId, StockStatus};
use crate::domain::shipment::{Shipment, ShipmentId};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AlertId(pub i64);

impl std::fmt::Display for AlertId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertKind {
    CriticalStock,
    LowStock,
    ShipmentDelay,
}

impl AlertKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CriticalStock => "critical_stock",
            Self::LowStock => "low_stock",
            Self::ShipmentDelay => "shipment_delay",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "critical_stock" => Some(Self::CriticalStock),
            "low_stock" => Some(Self::LowStock),
            "shipment_delay" => Some(Self::ShipmentDelay),
            _ => None,
        }
    }

    pub fn severity(&self) -> Severity {
        match self {
            Self::CriticalStock | Self::ShipmentDelay => Severity::High,
            Self::LowStock => Severity::Medium,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Low,
    Medium,
    High,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "low" => Some(Self::Low),
            "medium" => Some(Self::Medium),
            "high" => Some(Self::High),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryOutcome {
    NotSent,
    Console,
    PubSub,
    Failed,
}

impl DeliveryOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotSent => "not_sent",
            Self::Console => "console",
            Self::PubSub => "pubsub",
            Self::Failed => "failed",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "not_sent" => Some(Self::NotSent),
            "console" => Some(Self::Console),
            "pubsub" => Some(Self::PubSub),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Alert {
    pub id: AlertId,
    pub product_id: ProductId,
    pub shipment_id: Option<ShipmentId>,
    pub kind: AlertKind,
    pub severity: Severity,
    pub message: String,
    pub created_at: DateTime<Utc>,
    pub resolved: bool,
    pub resolved_at: Option<DateTime<Utc>>,
    pub delivery: DeliveryOutcome,
}

/// An alert that has been detected but not yet persisted.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewAlert {
    pub product_id: ProductId,
    pub shipment_id: Option<ShipmentId>,
    pub kind: AlertKind,
    pub severity: Severity,
    pub message: String,
}

impl NewAlert {
    pub fn for_stock(product: &Product) -> Option<Self> {
        let kind = match product.stock_status() {
            StockStatus::Critical => AlertKind::CriticalStock,
            StockStatus::Low => AlertKind::LowStock,
            StockStatus::Ok => return None,
        };
        let message = match kind {
            AlertKind::CriticalStock => format!("{} is OUT OF STOCK", product.name),
            _ => format!(
                "{} is running low ({} units, threshold {})",
                product.name, product.current_stock, product.reorder_threshold
            ),
        };

        Some(Self {
            product_id: product.id,
            shipment_id: None,
            kind,
            severity: kind.severity(),
            message,
        })
    }

    pub fn for_delay(shipment: &Shipment, product_name: &str) -> Self {
        let reason = shipment.delay_reason.as_deref().unwrap_or("unspecified");
        Self {
            product_id: shipment.product_id,
            shipment_id: Some(shipment.id),
            kind: AlertKind::ShipmentDelay,
            severity: AlertKind::ShipmentDelay.severity(),
            message: format!(
                "Shipment {} of {} delayed by {} days ({reason})",
                shipment.id, product_name, shipment.delay_days
            ),
        }
    }
}
