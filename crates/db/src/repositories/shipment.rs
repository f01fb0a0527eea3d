use chrono::NaiveDate;
use sqlx::Row;

use guardian_core::domain::product::ProductId;
use guardian_core::domain::shipment::{Shipment, ShipmentId, ShipmentStatus};

use super::{RepositoryError, ShipmentRepository};
use crate::DbPool;

pub struct SqlShipmentRepository {
    pool: DbPool,
}

impl SqlShipmentRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn row_to_shipment(row: &sqlx::sqlite::SqliteRow) -> Result<Shipment, RepositoryError> {
    let id: i64 = row.try_get("id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let product_id: i64 =
        row.try_get("product_id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let quantity: i64 =
        row.try_get("quantity").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let origin: String =
        row.try_get("origin").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let destination: String =
        row.try_get("destination").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let expected_date: String =
        row.try_get("expected_date").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let status: String =
        row.try_get("status").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let delay_days: i64 =
        row.try_get("delay_days").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let delay_reason: Option<String> =
        row.try_get("delay_reason").map_err(|e| RepositoryError::Decode(e.to_string()))?;

    let date_part = expected_date.get(..10).unwrap_or(expected_date.as_str());
    let expected_date = NaiveDate::parse_from_str(date_part, "%Y-%m-%d")
        .map_err(|e| RepositoryError::Decode(format!("expected_date `{expected_date}`: {e}")))?;
    let status = ShipmentStatus::parse(&status)
        .ok_or_else(|| RepositoryError::Decode(format!("unknown shipment status `{status}`")))?;

    Ok(Shipment {
        id: ShipmentId(id),
        product_id: ProductId(product_id),
        quantity,
        origin,
        destination,
        expected_date,
        status,
        delay_days,
        delay_reason,
    })
}

#[async_trait::async_trait]
impl ShipmentRepository for SqlShipmentRepository {
    async fn list_by_status(&self, status: ShipmentStatus) -> Result<Vec<Shipment>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT id, product_id, quantity, origin, destination, expected_date, status,
                    delay_days, delay_reason
             FROM shipments WHERE status = ? ORDER BY id",
        )
        .bind(status.as_str())
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_shipment).collect()
    }

    async fn list_in_transit_for(
        &self,
        product_id: ProductId,
    ) -> Result<Vec<Shipment>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT id, product_id, quantity, origin, destination, expected_date, status,
                    delay_days, delay_reason
             FROM shipments WHERE status = 'in_transit' AND product_id = ? ORDER BY id",
        )
        .bind(product_id.0)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_shipment).collect()
    }
}
