use std::str::FromStr;

use rust_decimal::Decimal;
use sqlx::Executor;

use crate::connection::DbPool;
use crate::repositories::RepositoryError;

/// Canonical products written by the seed fixture.
const SEED_PRODUCTS: &[SeedProductContract] = &[
    SeedProductContract {
        product_id: 1,
        product_name: "Organic Flour",
        current_stock: 120,
        avg_daily_sale: "15.5",
        price_per_product: "4.50",
    },
    SeedProductContract {
        product_id: 2,
        product_name: "Cane Sugar",
        current_stock: 80,
        avg_daily_sale: "10.0",
        price_per_product: "3.25",
    },
    SeedProductContract {
        product_id: 3,
        product_name: "Vanilla Extract",
        current_stock: 30,
        avg_daily_sale: "2.5",
        price_per_product: "25.00",
    },
    SeedProductContract {
        product_id: 4,
        product_name: "Cocoa Powder",
        current_stock: 8,
        avg_daily_sale: "3.0",
        price_per_product: "12.75",
    },
];

const SEED_SHIPMENT_COUNT: i64 = 4;

/// Deterministic inventory dataset used by `guardian seed` and integration tests.
pub struct SeedDataset;

impl SeedDataset {
    pub const SQL: &str = include_str!("../../../config/fixtures/seed.sql");

    /// Resets inventory tables to the canonical dataset.
    pub async fn load(pool: &DbPool) -> Result<SeedResult, RepositoryError> {
        let mut tx = pool.begin().await?;
        tx.execute(sqlx::query(Self::SQL)).await?;
        tx.commit().await?;

        Ok(SeedResult {
            products_seeded: SEED_PRODUCTS.iter().map(|p| p.product_name).collect(),
            shipments_seeded: SEED_SHIPMENT_COUNT,
        })
    }

    /// Checks that the products table holds exactly the canonical rows.
    pub async fn verify(pool: &DbPool) -> Result<VerificationResult, RepositoryError> {
        let mut checks = Vec::new();

        let product_count: i64 =
            sqlx::query_scalar("SELECT COUNT(1) FROM products").fetch_one(pool).await?;
        checks.push(("product-count", product_count == SEED_PRODUCTS.len() as i64));

        for product in SEED_PRODUCTS {
            let row = sqlx::query_as::<_, (String, i64, String, String)>(
                "SELECT product_name, current_stock, avg_daily_sale, price_per_product
                 FROM products WHERE product_id = ?",
            )
            .bind(product.product_id)
            .fetch_optional(pool)
            .await?;

            let matches = match row {
                Some((name, stock, avg, price)) => {
                    name == product.product_name
                        && stock == product.current_stock
                        && decimal_eq(&avg, product.avg_daily_sale)?
                        && decimal_eq(&price, product.price_per_product)?
                }
                None => false,
            };
            checks.push((product.product_name, matches));
        }

        let shipment_count: i64 =
            sqlx::query_scalar("SELECT COUNT(1) FROM shipments").fetch_one(pool).await?;
        checks.push(("shipment-count", shipment_count == SEED_SHIPMENT_COUNT));

        let all_present = checks.iter().all(|(_, ok)| *ok);
        Ok(VerificationResult { all_present, checks })
    }
}

fn decimal_eq(stored: &str, expected: &str) -> Result<bool, RepositoryError> {
    let stored = Decimal::from_str(stored.trim())
        .map_err(|error| RepositoryError::Decode(error.to_string()))?;
    let expected =
        Decimal::from_str(expected).map_err(|error| RepositoryError::Decode(error.to_string()))?;
    Ok(stored == expected)
}

#[derive(Debug, Clone, Copy)]
struct SeedProductContract {
    product_id: i64,
    product_name: &'static str,
    current_stock: i64,
    avg_daily_sale: &'static str,
    price_per_product: &'static str,
}

#[derive(Debug, Clone)]
pub struct SeedResult {
    pub products_seeded: Vec<&'static str>,
    pub shipments_seeded: i64,
}

#[derive(Debug, Clone)]
pub struct VerificationResult {
    pub all_present: bool,
    pub checks: Vec<(&'static str, bool)>,
}

impl VerificationResult {
    pub fn failed_checks(&self) -> Vec<&'static str> {
        self.checks.iter().filter(|(_, ok)| !ok).map(|(label, _)| *label).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::SeedDataset;
    use crate::{connect_with_settings, migrations};

    #[tokio::test]
    async fn seed_is_verifiable_and_idempotent() {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrations");

        let result = SeedDataset::load(&pool).await.expect("first seed");
        assert_eq!(result.products_seeded.len(), 4);
        SeedDataset::load(&pool).await.expect("second seed");

        let verification = SeedDataset::verify(&pool).await.expect("verify");
        assert!(verification.all_present, "failed: {:?}", verification.failed_checks());
    }

    #[tokio::test]
    async fn verify_detects_drifted_stock() {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrations");
        SeedDataset::load(&pool).await.expect("seed");

        sqlx::query("UPDATE products SET current_stock = 29 WHERE product_id = 3")
            .execute(&pool)
            .await
            .expect("drift");

        let verification = SeedDataset::verify(&pool).await.expect("verify");
        assert!(!verification.all_present);
        assert_eq!(verification.failed_checks(), vec!["Vanilla Extract"]);
    }
}
