use chrono::{DateTime, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::errors::DomainError;

pub const DEFAULT_REORDER_THRESHOLD: i64 = 10;
pub const DEFAULT_LEAD_TIME_DAYS: i64 = 7;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ProductId(pub i64);

impl std::fmt::Display for ProductId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StockStatus {
    Ok,
    Low,
    Critical,
}

impl StockStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ok => "ok",
            Self::Low => "low",
            Self::Critical => "critical",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub sku: String,
    pub name: String,
    pub category: String,
    pub current_stock: i64,
    pub avg_daily_sale: Decimal,
    pub price: Decimal,
    pub reorder_threshold: i64,
    pub warehouse_location: String,
    pub supplier_location: String,
    pub lead_time_days: i64,
    pub last_updated: DateTime<Utc>,
}

impl Product {
    pub fn stock_status(&self) -> StockStatus {
        if self.current_stock <= 0 {
            StockStatus::Critical
        } else if self.current_stock <= self.reorder_threshold {
            StockStatus::Low
        } else {
            StockStatus::Ok
        }
    }

    /// Whole days of cover at the current sales rate; `None` when nothing sells.
    pub fn days_until_stockout(&self) -> Option<i64> {
        if self.avg_daily_sale <= Decimal::ZERO {
            return None;
        }
        (Decimal::from(self.current_stock) / self.avg_daily_sale).floor().to_i64()
    }

    pub fn set_stock(&mut self, new_stock: i64, now: DateTime<Utc>) -> Result<(), DomainError> {
        if new_stock < 0 {
            return Err(DomainError::NegativeStock { product_id: self.id, requested: new_stock });
        }
        self.current_stock = new_stock;
        self.last_updated = now;
        Ok(())
    }

    pub fn adjust_stock(&mut self, delta: i64, now: DateTime<Utc>) -> Result<(), DomainError> {
        let next = self.current_stock.checked_add(delta).ok_or_else(|| {
            DomainError::InvariantViolation(format!("stock adjustment {delta} overflows"))
        })?;
        self.set_stock(next, now)
    }

    pub fn matches_name(&self, name: &str) -> bool {
        self.name.trim().eq_ignore_ascii_case(name.trim())
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use rust_decimal::Decimal;

    use super::{Product, ProductId, StockStatus};
    use crate::errors::DomainError;

    fn product(stock: i64, avg_daily_sale: Decimal) -> Product {
        Product {
            id: ProductId(3),
            sku: "VAN-EXT".to_string(),
            name: "Vanilla Extract".to_string(),
            category: "Flavorings".to_string(),
            current_stock: stock,
            avg_daily_sale,
            price: Decimal::new(2500, 2),
            reorder_threshold: 10,
            warehouse_location: "Warehouse A".to_string(),
            supplier_location: "Kochi, India".to_string(),
            lead_time_days: 7,
            last_updated: Utc::now(),
        }
    }

    #[test]
    fn status_is_derived_from_stock_and_threshold() {
        assert_eq!(product(0, Decimal::ONE).stock_status(), StockStatus::Critical);
        assert_eq!(product(10, Decimal::ONE).stock_status(), StockStatus::Low);
        assert_eq!(product(11, Decimal::ONE).stock_status(), StockStatus::Ok);
    }

    #[test]
    fn days_until_stockout_floors_and_handles_zero_sales() {
        assert_eq!(product(30, Decimal::new(25, 1)).days_until_stockout(), Some(12));
        assert_eq!(product(8, Decimal::new(30, 1)).days_until_stockout(), Some(2));
        assert_eq!(product(30, Decimal::ZERO).days_until_stockout(), None);
    }

    #[test]
    fn set_stock_rejects_negative_values_and_keeps_previous_level() {
        let mut product = product(30, Decimal::ONE);
        let error = product.set_stock(-1, Utc::now()).expect_err("negative stock must fail");

        assert!(matches!(error, DomainError::NegativeStock { requested: -1, .. }));
        assert_eq!(product.current_stock, 30);
    }

    #[test]
    fn adjust_stock_cannot_drive_stock_below_zero() {
        let mut product = product(5, Decimal::ONE);
        product.adjust_stock(-5, Utc::now()).expect("draining to zero is allowed");
        assert_eq!(product.current_stock, 0);

        let error = product.adjust_stock(-1, Utc::now()).expect_err("below zero must fail");
        assert!(matches!(error, DomainError::NegativeStock { .. }));
        assert_eq!(product.current_stock, 0);
    }

    #[test]
    fn name_matching_ignores_case_and_whitespace() {
        assert!(product(1, Decimal::ONE).matches_name("  vanilla EXTRACT "));
        assert!(!product(1, Decimal::ONE).matches_name("vanilla"));
    }
}
