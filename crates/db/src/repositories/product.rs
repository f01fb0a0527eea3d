use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::Row;

use guardian_core::domain::product::{Product, ProductId};

use super::{not_found, ProductRepository, RepositoryError};
use crate::DbPool;

const PRODUCT_COLUMNS: &str = "product_id, product_name, sku, category, current_stock,
    avg_daily_sale, price_per_product, reorder_threshold, warehouse_location,
    supplier_location, lead_time_days, last_updated";

pub struct SqlProductRepository {
    pool: DbPool,
}

impl SqlProductRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    async fn fetch_one_where(
        &self,
        clause: &str,
        value: &str,
    ) -> Result<Option<Product>, RepositoryError> {
        let row = sqlx::query(&format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE {clause}"))
            .bind(value)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(row_to_product).transpose()
    }

    async fn write_stock(&self, product: &Product) -> Result<(), RepositoryError> {
        sqlx::query(
            "UPDATE products SET current_stock = ?, last_updated = ? WHERE product_id = ?",
        )
        .bind(product.current_stock)
        .bind(product.last_updated.to_rfc3339())
        .bind(product.id.0)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

fn decode_err(error: impl std::fmt::Display) -> RepositoryError {
    RepositoryError::Decode(error.to_string())
}

fn parse_decimal(column: &str, raw: &str) -> Result<Decimal, RepositoryError> {
    Decimal::from_str(raw.trim())
        .map_err(|e| RepositoryError::Decode(format!("{column} `{raw}` is not a decimal: {e}")))
}

pub(crate) fn parse_timestamp(column: &str, raw: &str) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::parse_from_rfc3339(raw.trim())
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| RepositoryError::Decode(format!("{column} `{raw}` is not a timestamp: {e}")))
}

fn row_to_product(row: &sqlx::sqlite::SqliteRow) -> Result<Product, RepositoryError> {
    let id: i64 = row.try_get("product_id").map_err(decode_err)?;
    let name: String = row.try_get("product_name").map_err(decode_err)?;
    let sku: String = row.try_get("sku").map_err(decode_err)?;
    let category: String = row.try_get("category").map_err(decode_err)?;
    let current_stock: i64 = row.try_get("current_stock").map_err(decode_err)?;
    let avg_daily_sale: String = row.try_get("avg_daily_sale").map_err(decode_err)?;
    let price: String = row.try_get("price_per_product").map_err(decode_err)?;
    let reorder_threshold: i64 = row.try_get("reorder_threshold").map_err(decode_err)?;
    let warehouse_location: String = row.try_get("warehouse_location").map_err(decode_err)?;
    let supplier_location: String = row.try_get("supplier_location").map_err(decode_err)?;
    let lead_time_days: i64 = row.try_get("lead_time_days").map_err(decode_err)?;
    let last_updated: String = row.try_get("last_updated").map_err(decode_err)?;

    Ok(Product {
        id: ProductId(id),
        sku,
        name,
        category,
        current_stock,
        avg_daily_sale: parse_decimal("avg_daily_sale", &avg_daily_sale)?,
        price: parse_decimal("price_per_product", &price)?,
        reorder_threshold,
        warehouse_location,
        supplier_location,
        lead_time_days,
        last_updated: parse_timestamp("last_updated", &last_updated)?,
    })
}

#[async_trait::async_trait]
impl ProductRepository for SqlProductRepository {
    async fn find_by_id(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        let row = sqlx::query(&format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE product_id = ?"))
            .bind(id.0)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(row_to_product).transpose()
    }

    async fn find_by_sku(&self, sku: &str) -> Result<Option<Product>, RepositoryError> {
        self.fetch_one_where("UPPER(sku) = UPPER(?)", sku.trim()).await
    }

    async fn find_by_name(&self, name: &str) -> Result<Option<Product>, RepositoryError> {
        self.fetch_one_where("LOWER(TRIM(product_name)) = LOWER(TRIM(?))", name).await
    }

    async fn list(&self) -> Result<Vec<Product>, RepositoryError> {
        let rows =
            sqlx::query(&format!("SELECT {PRODUCT_COLUMNS} FROM products ORDER BY product_id"))
                .fetch_all(&self.pool)
                .await?;

        rows.iter().map(row_to_product).collect()
    }

    async fn set_stock(&self, id: ProductId, new_stock: i64) -> Result<Product, RepositoryError> {
        let mut product = self.find_by_id(id).await?.ok_or_else(|| not_found(id))?;
        product.set_stock(new_stock, Utc::now())?;
        self.write_stock(&product).await?;
        Ok(product)
    }

    async fn adjust_stock(&self, id: ProductId, delta: i64) -> Result<Product, RepositoryError> {
        let mut product = self.find_by_id(id).await?.ok_or_else(|| not_found(id))?;
        product.adjust_stock(delta, Utc::now())?;
        self.write_stock(&product).await?;
        Ok(product)
    }
}
