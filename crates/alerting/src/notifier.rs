//! Alert delivery channels.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use guardian_core::config::AppConfig;
use guardian_core::domain::alert::{Alert, AlertKind, DeliveryOutcome, Severity};
use guardian_core::domain::product::ProductId;
use guardian_core::domain::shipment::ShipmentId;
use guardian_external::PubSubPublisher;
use serde::Serialize;
use tracing::{info, warn};

/// Body published for one alert.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct AlertMessage {
    pub alert_id: i64,
    pub kind: AlertKind,
    pub severity: Severity,
    pub product_id: ProductId,
    pub product_name: String,
    pub shipment_id: Option<ShipmentId>,
    pub message: String,
    pub created_at: DateTime<Utc>,
    pub notify_email: Option<String>,
}

impl AlertMessage {
    pub fn new(alert: &Alert, product_name: &str, notify_email: Option<String>) -> Self {
        Self {
            alert_id: alert.id.0,
            kind: alert.kind,
            severity: alert.severity,
            product_id: alert.product_id,
            product_name: product_name.to_string(),
            shipment_id: alert.shipment_id,
            message: alert.message.clone(),
            created_at: alert.created_at,
            notify_email,
        }
    }
}

#[async_trait]
pub trait Notifier: Send + Sync {
    fn channel(&self) -> &'static str;

    /// Never fails; the outcome records which channel carried the alert.
    async fn notify(&self, message: &AlertMessage) -> DeliveryOutcome;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct ConsoleNotifier;

impl ConsoleNotifier {
    fn emit(message: &AlertMessage) {
        warn!(
            event_name = "alerting.delivery.console",
            alert_id = message.alert_id,
            kind = message.kind.as_str(),
            severity = message.severity.as_str(),
            product_id = %message.product_id,
            product_name = %message.product_name,
            "ALERT: {}",
            message.message
        );
    }
}

#[async_trait]
impl Notifier for ConsoleNotifier {
    fn channel(&self) -> &'static str {
        "console"
    }

    async fn notify(&self, message: &AlertMessage) -> DeliveryOutcome {
        Self::emit(message);
        DeliveryOutcome::Console
    }
}

pub struct PubSubNotifier {
    publisher: PubSubPublisher,
}

impl PubSubNotifier {
    pub fn new(publisher: PubSubPublisher) -> Self {
        Self { publisher }
    }
}

#[async_trait]
impl Notifier for PubSubNotifier {
    fn channel(&self) -> &'static str {
        "pubsub"
    }

    async fn notify(&self, message: &AlertMessage) -> DeliveryOutcome {
        let attributes = BTreeMap::from([
            ("alert_kind".to_string(), message.kind.as_str().to_string()),
            ("severity".to_string(), message.severity.as_str().to_string()),
            ("product_id".to_string(), message.product_id.to_string()),
        ]);

        match self.publisher.publish(message, attributes).await {
            Ok(message_id) => {
                info!(
                    event_name = "alerting.delivery.pubsub",
                    alert_id = message.alert_id,
                    topic = self.publisher.topic_path(),
                    message_id = %message_id,
                    "alert published"
                );
                DeliveryOutcome::PubSub
            }
            Err(error) => {
                warn!(
                    event_name = "alerting.delivery.fallback",
                    alert_id = message.alert_id,
                    error = %error,
                    "pub/sub publish failed; logging alert to console"
                );
                ConsoleNotifier::emit(message);
                DeliveryOutcome::Failed
            }
        }
    }
}

/// Pub/Sub when a topic is configured, console otherwise.
pub fn notifier_from_config(config: &AppConfig) -> Arc<dyn Notifier> {
    match PubSubPublisher::from_config(config) {
        Some(publisher) => {
            info!(
                event_name = "alerting.notifier.configured",
                channel = "pubsub",
                topic = publisher.topic_path(),
                "alerts will be published to pub/sub"
            );
            Arc::new(PubSubNotifier::new(publisher))
        }
        None => {
            info!(
                event_name = "alerting.notifier.configured",
                channel = "console",
                "PUBSUB_TOPIC not set; alerts will be logged to console"
            );
            Arc::new(ConsoleNotifier)
        }
    }
}
