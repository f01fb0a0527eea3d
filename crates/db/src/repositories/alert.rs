use chrono::{DateTime, Utc};
use sqlx::Row;

use guardian_core::domain::alert::{
    Alert, AlertId, AlertKind, DeliveryOutcome, NewAlert, Severity,
};
use guardian_core::domain::product::ProductId;
use guardian_core::domain::shipment::ShipmentId;

use super::product::parse_timestamp;
use super::{AlertRepository, RepositoryError};
use crate::DbPool;

const ALERT_COLUMNS: &str =
    "id, product_id, shipment_id, kind, severity, message, created_at, resolved, resolved_at, delivery";

pub struct SqlAlertRepository {
    pool: DbPool,
}

impl SqlAlertRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    async fn find_by_id(&self, id: AlertId) -> Result<Option<Alert>, RepositoryError> {
        let row = sqlx::query(&format!("SELECT {ALERT_COLUMNS} FROM alerts WHERE id = ?"))
            .bind(id.0)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(row_to_alert).transpose()
    }
}

fn row_to_alert(row: &sqlx::sqlite::SqliteRow) -> Result<Alert, RepositoryError> {
    let id: i64 = row.try_get("id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let product_id: i64 =
        row.try_get("product_id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let shipment_id: Option<i64> =
        row.try_get("shipment_id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let kind: String = row.try_get("kind").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let severity: String =
        row.try_get("severity").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let message: String =
        row.try_get("message").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let created_at: String =
        row.try_get("created_at").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let resolved: bool =
        row.try_get("resolved").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let resolved_at: Option<String> =
        row.try_get("resolved_at").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let delivery: String =
        row.try_get("delivery").map_err(|e| RepositoryError::Decode(e.to_string()))?;

    Ok(Alert {
        id: AlertId(id),
        product_id: ProductId(product_id),
        shipment_id: shipment_id.map(ShipmentId),
        kind: AlertKind::parse(&kind)
            .ok_or_else(|| RepositoryError::Decode(format!("unknown alert kind `{kind}`")))?,
        severity: Severity::parse(&severity)
            .ok_or_else(|| RepositoryError::Decode(format!("unknown severity `{severity}`")))?,
        message,
        created_at: parse_timestamp("created_at", &created_at)?,
        resolved,
        resolved_at: resolved_at
            .as_deref()
            .map(|raw| parse_timestamp("resolved_at", raw))
            .transpose()?,
        delivery: DeliveryOutcome::parse(&delivery)
            .ok_or_else(|| RepositoryError::Decode(format!("unknown delivery `{delivery}`")))?,
    })
}

#[async_trait::async_trait]
impl AlertRepository for SqlAlertRepository {
    async fn create(
        &self,
        alert: NewAlert,
        created_at: DateTime<Utc>,
    ) -> Result<Alert, RepositoryError> {
        let result = sqlx::query(
            "INSERT INTO alerts (product_id, shipment_id, kind, severity, message, created_at,
                                 resolved, delivery)
             VALUES (?, ?, ?, ?, ?, ?, 0, 'not_sent')",
        )
        .bind(alert.product_id.0)
        .bind(alert.shipment_id.map(|id| id.0))
        .bind(alert.kind.as_str())
        .bind(alert.severity.as_str())
        .bind(&alert.message)
        .bind(created_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(Alert {
            id: AlertId(result.last_insert_rowid()),
            product_id: alert.product_id,
            shipment_id: alert.shipment_id,
            kind: alert.kind,
            severity: alert.severity,
            message: alert.message,
            created_at,
            resolved: false,
            resolved_at: None,
            delivery: DeliveryOutcome::NotSent,
        })
    }

    async fn create_if_absent(
        &self,
        alert: NewAlert,
        created_at: DateTime<Utc>,
    ) -> Result<Option<Alert>, RepositoryError> {
        let result = sqlx::query(
            "INSERT INTO alerts (product_id, shipment_id, kind, severity, message, created_at,
                                 resolved, delivery)
             SELECT ?1, ?2, ?3, ?4, ?5, ?6, 0, 'not_sent'
             WHERE NOT EXISTS (
                 SELECT 1 FROM alerts
                 WHERE resolved = 0 AND product_id = ?1 AND kind = ?3 AND shipment_id IS ?2
             )",
        )
        .bind(alert.product_id.0)
        .bind(alert.shipment_id.map(|id| id.0))
        .bind(alert.kind.as_str())
        .bind(alert.severity.as_str())
        .bind(&alert.message)
        .bind(created_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }

        Ok(Some(Alert {
            id: AlertId(result.last_insert_rowid()),
            product_id: alert.product_id,
            shipment_id: alert.shipment_id,
            kind: alert.kind,
            severity: alert.severity,
            message: alert.message,
            created_at,
            resolved: false,
            resolved_at: None,
            delivery: DeliveryOutcome::NotSent,
        }))
    }

    async fn list_active(&self) -> Result<Vec<Alert>, RepositoryError> {
        let rows = sqlx::query(&format!(
            "SELECT {ALERT_COLUMNS} FROM alerts WHERE resolved = 0 ORDER BY created_at DESC, id DESC"
        ))
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_alert).collect()
    }

    async fn find_open(
        &self,
        product_id: ProductId,
        kind: AlertKind,
        shipment_id: Option<ShipmentId>,
    ) -> Result<Option<Alert>, RepositoryError> {
        let row = sqlx::query(&format!(
            "SELECT {ALERT_COLUMNS} FROM alerts
             WHERE resolved = 0 AND product_id = ? AND kind = ? AND shipment_id IS ?
             ORDER BY id LIMIT 1"
        ))
        .bind(product_id.0)
        .bind(kind.as_str())
        .bind(shipment_id.map(|id| id.0))
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(row_to_alert).transpose()
    }

    async fn resolve(
        &self,
        id: AlertId,
        resolved_at: DateTime<Utc>,
    ) -> Result<Option<Alert>, RepositoryError> {
        sqlx::query("UPDATE alerts SET resolved = 1, resolved_at = ? WHERE id = ? AND resolved = 0")
            .bind(resolved_at.to_rfc3339())
            .bind(id.0)
            .execute(&self.pool)
            .await?;

        self.find_by_id(id).await
    }

    async fn set_delivery(
        &self,
        id: AlertId,
        delivery: DeliveryOutcome,
    ) -> Result<(), RepositoryError> {
        sqlx::query("UPDATE alerts SET delivery = ? WHERE id = ?")
            .bind(delivery.as_str())
            .bind(id.0)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
