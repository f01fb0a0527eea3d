//! Inventory and shipment alerting: scan, dedupe, deliver, summarise, poll.

pub mod error;
pub mod notifier;
pub mod poller;
pub mod service;

pub use error::AlertingError;
pub use notifier::{notifier_from_config, ConsoleNotifier, Notifier, PubSubNotifier};
pub use poller::Poller;
pub use service::{AlertService, AlertSummary, CheckReport};
