use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::domain::product::ProductId;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ShipmentId(pub i64);

impl std::fmt::Display for ShipmentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShipmentStatus {
    InTransit,
    Delayed,
    Delivered,
}

impl ShipmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InTransit => "in_transit",
            Self::Delayed => "delayed",
            Self::Delivered => "delivered",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "in_transit" => Some(Self::InTransit),
            "delayed" => Some(Self::Delayed),
            "delivered" => Some(Self::Delivered),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Shipment {
    pub id: ShipmentId,
    pub product_id: ProductId,
    pub quantity: i64,
    pub origin: String,
    pub destination: String,
    pub expected_date: NaiveDate,
    pub status: ShipmentStatus,
    pub delay_days: i64,
    pub delay_reason: Option<String>,
}

impl Shipment {
    pub fn exceeds_delay_threshold(&self, threshold_days: u32) -> bool {
        self.status == ShipmentStatus::Delayed && self.delay_days > i64::from(threshold_days)
    }
}
