use guardian_core::errors::ApplicationError;
use guardian_db::repositories::RepositoryError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AlertingError {
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl From<AlertingError> for ApplicationError {
    fn from(value: AlertingError) -> Self {
        match value {
            AlertingError::Repository(error) => error.into(),
        }
    }
}
