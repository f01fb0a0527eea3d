use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use guardian_core::domain::alert::{Alert, AlertId, AlertKind, DeliveryOutcome, NewAlert};
use guardian_core::domain::product::{Product, ProductId};
use guardian_core::domain::shipment::{Shipment, ShipmentId, ShipmentStatus};

use super::{not_found, AlertRepository, ProductRepository, RepositoryError, ShipmentRepository};

#[derive(Default)]
pub struct InMemoryProductRepository {
    products: RwLock<BTreeMap<i64, Product>>,
}

impl InMemoryProductRepository {
    pub fn with_products(products: impl IntoIterator<Item = Product>) -> Self {
        Self {
            products: RwLock::new(products.into_iter().map(|p| (p.id.0, p)).collect()),
        }
    }
}

#[async_trait::async_trait]
impl ProductRepository for InMemoryProductRepository {
    async fn find_by_id(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        let products = self.products.read().await;
        Ok(products.get(&id.0).cloned())
    }

    async fn find_by_sku(&self, sku: &str) -> Result<Option<Product>, RepositoryError> {
        let products = self.products.read().await;
        Ok(products.values().find(|p| p.sku.eq_ignore_ascii_case(sku.trim())).cloned())
    }

    async fn find_by_name(&self, name: &str) -> Result<Option<Product>, RepositoryError> {
        let products = self.products.read().await;
        Ok(products.values().find(|p| p.matches_name(name)).cloned())
    }

    async fn list(&self) -> Result<Vec<Product>, RepositoryError> {
        let products = self.products.read().await;
        Ok(products.values().cloned().collect())
    }

    async fn set_stock(&self, id: ProductId, new_stock: i64) -> Result<Product, RepositoryError> {
        let mut products = self.products.write().await;
        let product = products.get_mut(&id.0).ok_or_else(|| not_found(id))?;
        product.set_stock(new_stock, Utc::now())?;
        Ok(product.clone())
    }

    async fn adjust_stock(&self, id: ProductId, delta: i64) -> Result<Product, RepositoryError> {
        let mut products = self.products.write().await;
        let product = products.get_mut(&id.0).ok_or_else(|| not_found(id))?;
        product.adjust_stock(delta, Utc::now())?;
        Ok(product.clone())
    }
}

#[derive(Default)]
pub struct InMemoryShipmentRepository {
    shipments: RwLock<BTreeMap<i64, Shipment>>,
}

impl InMemoryShipmentRepository {
    pub fn with_shipments(shipments: impl IntoIterator<Item = Shipment>) -> Self {
        Self {
            shipments: RwLock::new(shipments.into_iter().map(|s| (s.id.0, s)).collect()),
        }
    }
}

#[async_trait::async_trait]
impl ShipmentRepository for InMemoryShipmentRepository {
    async fn list_by_status(&self, status: ShipmentStatus) -> Result<Vec<Shipment>, RepositoryError> {
        let shipments = self.shipments.read().await;
        Ok(shipments.values().filter(|s| s.status == status).cloned().collect())
    }

    async fn list_in_transit_for(
        &self,
        product_id: ProductId,
    ) -> Result<Vec<Shipment>, RepositoryError> {
        let shipments = self.shipments.read().await;
        Ok(shipments
            .values()
            .filter(|s| s.status == ShipmentStatus::InTransit && s.product_id == product_id)
            .cloned()
            .collect())
    }
}

#[derive(Default)]
pub struct InMemoryAlertRepository {
    alerts: RwLock<BTreeMap<i64, Alert>>,
}

fn insert_alert(
    alerts: &mut BTreeMap<i64, Alert>,
    alert: NewAlert,
    created_at: DateTime<Utc>,
) -> Alert {
    let id = alerts.keys().next_back().copied().unwrap_or(0) + 1;
    let stored = Alert {
        id: AlertId(id),
        product_id: alert.product_id,
        shipment_id: alert.shipment_id,
        kind: alert.kind,
        severity: alert.severity,
        message: alert.message,
        created_at,
        resolved: false,
        resolved_at: None,
        delivery: DeliveryOutcome::NotSent,
    };
    alerts.insert(id, stored.clone());
    stored
}

#[async_trait::async_trait]
impl AlertRepository for InMemoryAlertRepository {
    async fn create(
        &self,
        alert: NewAlert,
        created_at: DateTime<Utc>,
    ) -> Result<Alert, RepositoryError> {
        let mut alerts = self.alerts.write().await;
        Ok(insert_alert(&mut alerts, alert, created_at))
    }

    async fn create_if_absent(
        &self,
        alert: NewAlert,
        created_at: DateTime<Utc>,
    ) -> Result<Option<Alert>, RepositoryError> {
        let mut alerts = self.alerts.write().await;
        let duplicate = alerts.values().any(|open| {
            !open.resolved
                && open.product_id == alert.product_id
                && open.kind == alert.kind
                && open.shipment_id == alert.shipment_id
        });
        if duplicate {
            return Ok(None);
        }
        Ok(Some(insert_alert(&mut alerts, alert, created_at)))
    }

    async fn list_active(&self) -> Result<Vec<Alert>, RepositoryError> {
        let alerts = self.alerts.read().await;
        Ok(alerts.values().rev().filter(|a| !a.resolved).cloned().collect())
    }

    async fn find_open(
        &self,
        product_id: ProductId,
        kind: AlertKind,
        shipment_id: Option<ShipmentId>,
    ) -> Result<Option<Alert>, RepositoryError> {
        let alerts = self.alerts.read().await;
        Ok(alerts
            .values()
            .find(|a| {
                !a.resolved
                    && a.product_id == product_id
                    && a.kind == kind
                    && a.shipment_id == shipment_id
            })
            .cloned())
    }

    async fn resolve(
        &self,
        id: AlertId,
        resolved_at: DateTime<Utc>,
    ) -> Result<Option<Alert>, RepositoryError> {
        let mut alerts = self.alerts.write().await;
        Ok(alerts.get_mut(&id.0).map(|alert| {
            if !alert.resolved {
                alert.resolved = true;
                alert.resolved_at = Some(resolved_at);
            }
            alert.clone()
        }))
    }

    async fn set_delivery(
        &self,
        id: AlertId,
        delivery: DeliveryOutcome,
    ) -> Result<(), RepositoryError> {
        let mut alerts = self.alerts.write().await;
        if let Some(alert) = alerts.get_mut(&id.0) {
            alert.delivery = delivery;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use rust_decimal::Decimal;

    use guardian_core::domain::alert::{AlertKind, NewAlert, Severity};
    use guardian_core::domain::product::{Product, ProductId};
    use guardian_core::errors::DomainError;

    use crate::repositories::{
        AlertRepository, InMemoryAlertRepository, InMemoryProductRepository, ProductRepository,
        RepositoryError,
    };

    fn product() -> Product {
        Product {
            id: ProductId(2),
            sku: "SUG-CAN".to_string(),
            name: "Cane Sugar".to_string(),
            category: "Baking Staples".to_string(),
            current_stock: 80,
            avg_daily_sale: Decimal::new(100, 1),
            price: Decimal::new(325, 2),
            reorder_threshold: 25,
            warehouse_location: "Texas, USA".to_string(),
            supplier_location: "Ho Chi Minh City, Vietnam".to_string(),
            lead_time_days: 10,
            last_updated: Utc::now(),
        }
    }

    #[tokio::test]
    async fn in_memory_product_repo_guards_stock() {
        let repo = InMemoryProductRepository::with_products([product()]);

        let found = repo.lookup("sug-can").await.expect("lookup");
        assert_eq!(found.map(|p| p.id), Some(ProductId(2)));

        let error = repo.set_stock(ProductId(2), -1).await.expect_err("negative");
        assert!(matches!(error, RepositoryError::Domain(DomainError::NegativeStock { .. })));
        let stored = repo.find_by_id(ProductId(2)).await.expect("find").expect("present");
        assert_eq!(stored.current_stock, 80);
    }

    #[tokio::test]
    async fn in_memory_alert_repo_assigns_sequential_ids() {
        let repo = InMemoryAlertRepository::default();
        let alert = NewAlert {
            product_id: ProductId(2),
            shipment_id: None,
            kind: AlertKind::LowStock,
            severity: Severity::Medium,
            message: "low".to_string(),
        };

        let first = repo.create(alert.clone(), Utc::now()).await.expect("create");
        let second = repo.create(alert, Utc::now()).await.expect("create");

        assert_eq!(second.id.0, first.id.0 + 1);
        assert_eq!(repo.list_active().await.expect("list").len(), 2);
    }

    #[tokio::test]
    async fn in_memory_create_if_absent_skips_open_duplicates() {
        let repo = InMemoryAlertRepository::default();
        let alert = NewAlert {
            product_id: ProductId(2),
            shipment_id: None,
            kind: AlertKind::LowStock,
            severity: Severity::Medium,
            message: "low".to_string(),
        };

        let first = repo.create_if_absent(alert.clone(), Utc::now()).await.expect("create");
        let second = repo.create_if_absent(alert.clone(), Utc::now()).await.expect("create");
        assert!(second.is_none());

        let first = first.expect("first insert");
        repo.resolve(first.id, Utc::now()).await.expect("resolve");
        let reopened = repo.create_if_absent(alert, Utc::now()).await.expect("create");
        assert!(reopened.is_some());
    }
}
