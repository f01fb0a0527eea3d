pub mod config;
pub mod domain;
pub mod errors;
pub mod planning;
pub mod risk;
pub mod signals;

pub use config::{AppConfig, ConfigError, ConfigOverrides, LlmProvider, LoadOptions, LogFormat};
pub use domain::alert::{Alert, AlertId, AlertKind, DeliveryOutcome, NewAlert, Severity};
pub use domain::market::{
    CompetitorProfile, NewsArticle, ProductSuggestion, ProductTrend, SupplyChainEvent,
};
pub use domain::product::{Product, ProductId, StockStatus};
pub use domain::shipment::{Shipment, ShipmentId, ShipmentStatus};
pub use domain::weather::{DataOrigin, ForecastDay, LogisticsRisk, WeatherReport};
pub use errors::{ApplicationError, DomainError, InterfaceError};
