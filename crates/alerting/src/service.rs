//! Scans inventory and shipments, records new alerts once, and delivers high-severity ones.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use guardian_core::config::{AlertingConfig, AppConfig};
use guardian_core::domain::alert::{Alert, AlertId, NewAlert, Severity};
use guardian_core::domain::product::{Product, ProductId};
use guardian_core::domain::shipment::ShipmentStatus;
use guardian_db::repositories::{
    AlertRepository, ProductRepository, ShipmentRepository, SqlAlertRepository,
    SqlProductRepository, SqlShipmentRepository,
};
use guardian_db::DbPool;
use serde::Serialize;
use tracing::{debug, info};

use crate::error::AlertingError;
use crate::notifier::{notifier_from_config, AlertMessage, Notifier};

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct CheckReport {
    pub products_checked: usize,
    pub delayed_shipments_checked: usize,
    pub created: Vec<Alert>,
    pub duplicates_skipped: usize,
}

impl CheckReport {
    pub fn delivered(&self) -> usize {
        self.created.iter().filter(|alert| alert.severity == Severity::High).count()
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct AlertSummary {
    pub total_active: usize,
    pub high: Vec<Alert>,
    pub medium: Vec<Alert>,
    pub low: Vec<Alert>,
}

impl AlertSummary {
    pub fn from_alerts(alerts: Vec<Alert>) -> Self {
        let mut summary = Self { total_active: alerts.len(), ..Self::default() };
        for alert in alerts {
            match alert.severity {
                Severity::High => summary.high.push(alert),
                Severity::Medium => summary.medium.push(alert),
                Severity::Low => summary.low.push(alert),
            }
        }
        summary
    }
}

pub struct AlertService {
    products: Arc<dyn ProductRepository>,
    shipments: Arc<dyn ShipmentRepository>,
    alerts: Arc<dyn AlertRepository>,
    notifier: Arc<dyn Notifier>,
    delay_threshold_days: u32,
    notify_email: Option<String>,
}

impl AlertService {
    pub fn new(
        products: Arc<dyn ProductRepository>,
        shipments: Arc<dyn ShipmentRepository>,
        alerts: Arc<dyn AlertRepository>,
        notifier: Arc<dyn Notifier>,
        config: &AlertingConfig,
    ) -> Self {
        Self {
            products,
            shipments,
            alerts,
            notifier,
            delay_threshold_days: config.delay_threshold_days,
            notify_email: config.alert_email.clone(),
        }
    }

    pub fn from_pool(pool: DbPool, config: &AppConfig) -> Self {
        Self::new(
            Arc::new(SqlProductRepository::new(pool.clone())),
            Arc::new(SqlShipmentRepository::new(pool.clone())),
            Arc::new(SqlAlertRepository::new(pool)),
            notifier_from_config(config),
            &config.alerting,
        )
    }

    pub fn notifier_channel(&self) -> &'static str {
        self.notifier.channel()
    }

    pub async fn check_and_alert(&self, now: DateTime<Utc>) -> Result<CheckReport, AlertingError> {
        let products = self.products.list().await?;
        let names: BTreeMap<ProductId, &Product> =
            products.iter().map(|product| (product.id, product)).collect();

        let mut candidates: Vec<NewAlert> =
            products.iter().filter_map(NewAlert::for_stock).collect();

        let delayed: Vec<_> = self
            .shipments
            .list_by_status(ShipmentStatus::Delayed)
            .await?
            .into_iter()
            .filter(|shipment| shipment.exceeds_delay_threshold(self.delay_threshold_days))
            .collect();
        for shipment in &delayed {
            let name = names
                .get(&shipment.product_id)
                .map(|product| product.name.as_str())
                .unwrap_or("unknown product");
            candidates.push(NewAlert::for_delay(shipment, name));
        }

        let mut report = CheckReport {
            products_checked: products.len(),
            delayed_shipments_checked: delayed.len(),
            ..CheckReport::default()
        };

        for candidate in candidates {
            let (product_id, kind) = (candidate.product_id, candidate.kind);
            let Some(mut alert) = self.alerts.create_if_absent(candidate, now).await? else {
                debug!(
                    event_name = "alerting.check.duplicate",
                    product_id = %product_id,
                    kind = kind.as_str(),
                    "open alert already exists"
                );
                report.duplicates_skipped += 1;
                continue;
            };

            if alert.severity == Severity::High {
                let product_name = names
                    .get(&alert.product_id)
                    .map(|product| product.name.as_str())
                    .unwrap_or("unknown product");
                let message = AlertMessage::new(&alert, product_name, self.notify_email.clone());
                let outcome = self.notifier.notify(&message).await;
                self.alerts.set_delivery(alert.id, outcome).await?;
                alert.delivery = outcome;
            }
            report.created.push(alert);
        }

        info!(
            event_name = "alerting.check.completed",
            products_checked = report.products_checked,
            delayed_shipments = report.delayed_shipments_checked,
            created = report.created.len(),
            duplicates_skipped = report.duplicates_skipped,
            "alert check completed"
        );
        Ok(report)
    }

    pub async fn active_alerts(&self) -> Result<Vec<Alert>, AlertingError> {
        Ok(self.alerts.list_active().await?)
    }

    pub async fn summary(&self) -> Result<AlertSummary, AlertingError> {
        Ok(AlertSummary::from_alerts(self.alerts.list_active().await?))
    }

    /// `None` when the alert does not exist.
    pub async fn resolve(
        &self,
        id: AlertId,
        now: DateTime<Utc>,
    ) -> Result<Option<Alert>, AlertingError> {
        let resolved = self.alerts.resolve(id, now).await?;
        if resolved.is_some() {
            info!(event_name = "alerting.alert.resolved", alert_id = %id, "alert resolved");
        }
        Ok(resolved)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;
    use chrono::{NaiveDate, Utc};
    use guardian_core::config::AlertingConfig;
    use guardian_core::domain::alert::{AlertKind, DeliveryOutcome, Severity};
    use guardian_core::domain::product::{Product, ProductId};
    use guardian_core::domain::shipment::{Shipment, ShipmentId, ShipmentStatus};
    use guardian_db::repositories::{
        InMemoryAlertRepository, InMemoryProductRepository, InMemoryShipmentRepository,
        ProductRepository,
    };
    use rust_decimal::Decimal;

    use super::AlertService;
    use crate::notifier::{AlertMessage, Notifier};

    #[derive(Default)]
    struct Recording {
        sent: Mutex<Vec<AlertMessage>>,
    }

    #[async_trait]
    impl Notifier for Recording {
        fn channel(&self) -> &'static str {
            "recording"
        }

        async fn notify(&self, message: &AlertMessage) -> DeliveryOutcome {
            self.sent.lock().expect("lock").push(message.clone());
            DeliveryOutcome::Console
        }
    }

    fn product(id: i64, name: &str, stock: i64, threshold: i64) -> Product {
        Product {
            id: ProductId(id),
            sku: format!("SKU-{id}"),
            name: name.to_string(),
            category: "Baking Staples".to_string(),
            current_stock: stock,
            avg_daily_sale: Decimal::ONE,
            price: Decimal::ONE,
            reorder_threshold: threshold,
            warehouse_location: "California, USA".to_string(),
            supplier_location: "Mumbai, India".to_string(),
            lead_time_days: 7,
            last_updated: Utc::now(),
        }
    }

    fn delayed(id: i64, product_id: i64, delay_days: i64) -> Shipment {
        Shipment {
            id: ShipmentId(id),
            product_id: ProductId(product_id),
            quantity: 60,
            origin: "Kochi, India".to_string(),
            destination: "California, USA".to_string(),
            expected_date: NaiveDate::from_ymd_opt(2026, 7, 1).expect("date"),
            status: ShipmentStatus::Delayed,
            delay_days,
            delay_reason: Some("Cyclone warning".to_string()),
        }
    }

    fn config() -> AlertingConfig {
        AlertingConfig {
            pubsub_topic: None,
            pubsub_access_token: None,
            pubsub_endpoint: "https://pubsub.googleapis.com/v1".to_string(),
            alert_email: Some("ops@example.com".to_string()),
            poll_interval_secs: 300,
            delay_threshold_days: 3,
            poller_enabled: true,
        }
    }

    fn service(notifier: Arc<Recording>) -> (AlertService, Arc<InMemoryProductRepository>) {
        let products = Arc::new(InMemoryProductRepository::with_products([
            product(1, "Organic Flour", 120, 40),
            product(3, "Vanilla Extract", 30, 10),
            product(4, "Cocoa Powder", 8, 15),
            product(5, "Baking Soda", 0, 10),
        ]));
        let shipments = Arc::new(InMemoryShipmentRepository::with_shipments([
            delayed(2, 3, 5),
            delayed(4, 4, 2),
        ]));
        let service = AlertService::new(
            products.clone(),
            shipments,
            Arc::new(InMemoryAlertRepository::default()),
            notifier,
            &config(),
        );
        (service, products)
    }

    #[tokio::test]
    async fn check_creates_stock_and_delay_alerts() {
        let notifier = Arc::new(Recording::default());
        let (service, _) = service(notifier.clone());

        let report = service.check_and_alert(Utc::now()).await.expect("check");

        let kinds: Vec<AlertKind> = report.created.iter().map(|alert| alert.kind).collect();
        assert_eq!(
            kinds,
            vec![AlertKind::LowStock, AlertKind::CriticalStock, AlertKind::ShipmentDelay]
        );
        assert_eq!(report.delayed_shipments_checked, 1);
        assert_eq!(report.delivered(), 2);

        let sent = notifier.sent.lock().expect("lock");
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[0].product_name, "Baking Soda");
        assert_eq!(sent[1].shipment_id, Some(ShipmentId(2)));
        assert_eq!(sent[1].notify_email.as_deref(), Some("ops@example.com"));
    }

    #[tokio::test]
    async fn delivery_outcome_is_recorded_only_for_high_severity() {
        let (service, _) = service(Arc::new(Recording::default()));
        let report = service.check_and_alert(Utc::now()).await.expect("check");

        for alert in &report.created {
            let expected = if alert.severity == Severity::High {
                DeliveryOutcome::Console
            } else {
                DeliveryOutcome::NotSent
            };
            assert_eq!(alert.delivery, expected, "{:?}", alert.kind);
        }
    }

    #[tokio::test]
    async fn repeated_checks_do_not_duplicate_open_alerts() {
        let notifier = Arc::new(Recording::default());
        let (service, _) = service(notifier.clone());

        service.check_and_alert(Utc::now()).await.expect("first");
        let second = service.check_and_alert(Utc::now()).await.expect("second");

        assert!(second.created.is_empty());
        assert_eq!(second.duplicates_skipped, 3);
        assert_eq!(notifier.sent.lock().expect("lock").len(), 2);
        assert_eq!(service.active_alerts().await.expect("active").len(), 3);
    }

    #[tokio::test]
    async fn overlapping_checks_create_each_alert_once() {
        let notifier = Arc::new(Recording::default());
        let (service, _) = service(notifier.clone());

        let (first, second) =
            tokio::join!(service.check_and_alert(Utc::now()), service.check_and_alert(Utc::now()));
        let (first, second) = (first.expect("first"), second.expect("second"));

        assert_eq!(first.created.len() + second.created.len(), 3);
        assert_eq!(first.duplicates_skipped + second.duplicates_skipped, 3);
        assert_eq!(notifier.sent.lock().expect("lock").len(), 2);
        assert_eq!(service.active_alerts().await.expect("active").len(), 3);
    }

    #[tokio::test]
    async fn resolving_allows_a_fresh_alert() {
        let (service, products) = service(Arc::new(Recording::default()));
        let first = service.check_and_alert(Utc::now()).await.expect("first");
        let low = first
            .created
            .iter()
            .find(|alert| alert.kind == AlertKind::LowStock)
            .expect("low stock alert");

        let resolved = service.resolve(low.id, Utc::now()).await.expect("resolve");
        assert!(resolved.is_some_and(|alert| alert.resolved));

        products.set_stock(ProductId(4), 5).await.expect("still low");
        let again = service.check_and_alert(Utc::now()).await.expect("again");
        assert_eq!(again.created.len(), 1);
        assert_eq!(again.created[0].kind, AlertKind::LowStock);
    }

    #[tokio::test]
    async fn summary_groups_by_severity() {
        let (service, _) = service(Arc::new(Recording::default()));
        service.check_and_alert(Utc::now()).await.expect("check");

        let summary = service.summary().await.expect("summary");
        assert_eq!(summary.total_active, 3);
        assert_eq!(summary.high.len(), 2);
        assert_eq!(summary.medium.len(), 1);
        assert!(summary.low.is_empty());
    }

    #[tokio::test]
    async fn resolving_unknown_alert_returns_none() {
        let (service, _) = service(Arc::new(Recording::default()));
        let resolved = service
            .resolve(guardian_core::domain::alert::AlertId(99), Utc::now())
            .await
            .expect("resolve");
        assert!(resolved.is_none());
    }
}
