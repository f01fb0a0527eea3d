//! Shipment delay, reorder and resilience computations over inventory and weather risk.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::domain::alert::Severity;
use crate::domain::product::{Product, ProductId, StockStatus};
use crate::domain::shipment::{Shipment, ShipmentId};
use crate::domain::weather::LogisticsRisk;
use crate::risk::adjusted_lead_time;

const REORDER_WINDOW_DAYS: i64 = 7;
const MIN_REORDER_QUANTITY: i64 = 50;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DelayPrediction {
    pub shipment_id: ShipmentId,
    pub product_id: ProductId,
    pub origin: String,
    pub destination: String,
    pub expected_date: NaiveDate,
    pub predicted_delay_days: i64,
    pub risk_level: Severity,
    pub risk_factors: Vec<String>,
    pub confidence: f64,
}

/// Keeps whichever end of the route carries the longer delay; ties go to the destination.
pub fn predict_delay(
    shipment: &Shipment,
    origin_risk: &LogisticsRisk,
    destination_risk: &LogisticsRisk,
) -> DelayPrediction {
    let worst = if origin_risk.delay_estimate_days > destination_risk.delay_estimate_days {
        origin_risk
    } else {
        destination_risk
    };

    DelayPrediction {
        shipment_id: shipment.id,
        product_id: shipment.product_id,
        origin: shipment.origin.clone(),
        destination: shipment.destination.clone(),
        expected_date: shipment.expected_date,
        predicted_delay_days: worst.delay_estimate_days,
        risk_level: worst.risk_level,
        risk_factors: worst.risk_factors.clone(),
        confidence: if worst.risk_level == Severity::High { 0.85 } else { 0.7 },
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ReorderRecommendation {
    pub product_id: ProductId,
    pub product_name: String,
    pub current_stock: i64,
    pub reorder_threshold: i64,
    pub normal_lead_time: i64,
    pub adjusted_lead_time: i64,
    pub days_until_stockout: Option<i64>,
    pub urgency: Severity,
    pub recommended_quantity: i64,
    pub reasoning: String,
}

pub fn recommend_reorder(
    product: &Product,
    supplier_risk: &LogisticsRisk,
) -> Option<ReorderRecommendation> {
    let adjusted = adjusted_lead_time(product.lead_time_days, supplier_risk);
    let days_until_stockout = product.days_until_stockout();

    let urgency = match days_until_stockout {
        Some(days) if days < adjusted => Severity::High,
        Some(days) if days < adjusted + REORDER_WINDOW_DAYS => Severity::Medium,
        _ => Severity::Low,
    };
    let reorder_now = urgency > Severity::Low;

    if !reorder_now && product.stock_status() == StockStatus::Ok {
        return None;
    }

    Some(ReorderRecommendation {
        product_id: product.id,
        product_name: product.name.clone(),
        current_stock: product.current_stock,
        reorder_threshold: product.reorder_threshold,
        normal_lead_time: product.lead_time_days,
        adjusted_lead_time: adjusted,
        days_until_stockout,
        urgency,
        recommended_quantity: MIN_REORDER_QUANTITY.max(product.reorder_threshold * 2),
        reasoning: format!(
            "Stock covers {} against a {}-day lead time. Weather risk at {} adds {} days to delivery.",
            describe_cover(days_until_stockout),
            adjusted,
            product.supplier_location,
            supplier_risk.delay_estimate_days
        ),
    })
}

fn describe_cover(days: Option<i64>) -> String {
    match days {
        Some(days) => format!("{days} days"),
        None => "an unbounded period (no recorded sales)".to_string(),
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum HealthStatus {
    Excellent,
    Good,
    Fair,
    #[serde(rename = "At Risk")]
    AtRisk,
}

impl HealthStatus {
    pub fn from_score(score: u32) -> Self {
        match score {
            80.. => Self::Excellent,
            60..=79 => Self::Good,
            40..=59 => Self::Fair,
            _ => Self::AtRisk,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Excellent => "Excellent",
            Self::Good => "Good",
            Self::Fair => "Fair",
            Self::AtRisk => "At Risk",
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryBreakdown {
    pub total: usize,
    pub critical: usize,
    pub low: usize,
    pub ok: usize,
}

impl InventoryBreakdown {
    pub fn from_products(products: &[Product]) -> Self {
        products.iter().fold(Self::default(), |mut acc, product| {
            acc.total += 1;
            match product.stock_status() {
                StockStatus::Critical => acc.critical += 1,
                StockStatus::Low => acc.low += 1,
                StockStatus::Ok => acc.ok += 1,
            }
            acc
        })
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskyLocation {
    pub location: String,
    pub risk_level: Severity,
    pub factors: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResilienceReport {
    pub resilience_score: u32,
    pub health_status: HealthStatus,
    pub inventory_breakdown: InventoryBreakdown,
    pub active_alerts: usize,
    pub high_risk_locations: Vec<RiskyLocation>,
}

/// `supplier_risks` should hold one assessment per distinct supplier location.
pub fn assess_resilience(
    products: &[Product],
    supplier_risks: &[LogisticsRisk],
    active_alerts: usize,
) -> ResilienceReport {
    let inventory_breakdown = InventoryBreakdown::from_products(products);
    let high_risk_locations: Vec<RiskyLocation> = supplier_risks
        .iter()
        .filter(|risk| risk.is_elevated())
        .map(|risk| RiskyLocation {
            location: risk.location.clone(),
            risk_level: risk.risk_level,
            factors: risk.risk_factors.clone(),
        })
        .collect();

    let penalty = 15 * inventory_breakdown.critical as i64
        + 5 * inventory_breakdown.low as i64
        + 10 * high_risk_locations.len() as i64
        + 5 * active_alerts as i64;
    let resilience_score = (100 - penalty).clamp(0, 100) as u32;

    ResilienceReport {
        resilience_score,
        health_status: HealthStatus::from_score(resilience_score),
        inventory_breakdown,
        active_alerts,
        high_risk_locations,
    }
}
