use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use guardian_core::domain::alert::{Alert, AlertId, AlertKind, DeliveryOutcome, NewAlert};
use guardian_core::domain::product::{Product, ProductId};
use guardian_core::domain::shipment::{Shipment, ShipmentId, ShipmentStatus};
use guardian_core::errors::{ApplicationError, DomainError};

pub mod alert;
pub mod memory;
pub mod product;
pub mod shipment;

pub use alert::SqlAlertRepository;
pub use memory::{InMemoryAlertRepository, InMemoryProductRepository, InMemoryShipmentRepository};
pub use product::SqlProductRepository;
pub use shipment::SqlShipmentRepository;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
    #[error(transparent)]
    Domain(#[from] DomainError),
}

impl From<RepositoryError> for ApplicationError {
    fn from(value: RepositoryError) -> Self {
        match value {
            RepositoryError::Domain(error) => ApplicationError::Domain(error),
            other => ApplicationError::Persistence(other.to_string()),
        }
    }
}

#[async_trait]
pub trait ProductRepository: Send + Sync {
    async fn find_by_id(&self, id: ProductId) -> Result<Option<Product>, RepositoryError>;
    async fn find_by_sku(&self, sku: &str) -> Result<Option<Product>, RepositoryError>;
    async fn find_by_name(&self, name: &str) -> Result<Option<Product>, RepositoryError>;
    async fn list(&self) -> Result<Vec<Product>, RepositoryError>;

    /// Replaces the stock level. Negative values are rejected before touching storage.
    async fn set_stock(&self, id: ProductId, new_stock: i64) -> Result<Product, RepositoryError>;

    /// Applies a signed delta. Fails when the result would drop below zero.
    async fn adjust_stock(&self, id: ProductId, delta: i64) -> Result<Product, RepositoryError>;

    /// Resolves an id, sku or case-insensitive name, in that order.
    async fn lookup(&self, reference: &str) -> Result<Option<Product>, RepositoryError> {
        let reference = reference.trim();
        if let Ok(id) = reference.parse::<i64>() {
            if let Some(product) = self.find_by_id(ProductId(id)).await? {
                return Ok(Some(product));
            }
        }
        if let Some(product) = self.find_by_sku(reference).await? {
            return Ok(Some(product));
        }
        self.find_by_name(reference).await
    }
}

#[async_trait]
pub trait ShipmentRepository: Send + Sync {
    async fn list_by_status(&self, status: ShipmentStatus) -> Result<Vec<Shipment>, RepositoryError>;
    async fn list_in_transit_for(&self, product_id: ProductId)
        -> Result<Vec<Shipment>, RepositoryError>;
}

#[async_trait]
pub trait AlertRepository: Send + Sync {
    async fn create(&self, alert: NewAlert, created_at: DateTime<Utc>)
        -> Result<Alert, RepositoryError>;
    /// Inserts the alert unless an unresolved one exists for the same product, kind and
    /// shipment. The check and the insert happen as one step; `None` means a duplicate.
    async fn create_if_absent(&self, alert: NewAlert, created_at: DateTime<Utc>)
        -> Result<Option<Alert>, RepositoryError>;
    async fn list_active(&self) -> Result<Vec<Alert>, RepositoryError>;
    async fn find_open(
        &self,
        product_id: ProductId,
        kind: AlertKind,
        shipment_id: Option<ShipmentId>,
    ) -> Result<Option<Alert>, RepositoryError>;
    async fn resolve(&self, id: AlertId, resolved_at: DateTime<Utc>)
        -> Result<Option<Alert>, RepositoryError>;
    async fn set_delivery(&self, id: AlertId, delivery: DeliveryOutcome)
        -> Result<(), RepositoryError>;
}

pub(crate) fn not_found(id: ProductId) -> RepositoryError {
    RepositoryError::Domain(DomainError::ProductNotFound(id.to_string()))
}
