pub mod billing;
pub mod contact;
pub mod events;
pub mod holds;
pub mod repository;

use roteiro_catalog::{CatalogError, SeatError};
use roteiro_order::{AffiliateError, BookingError};

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Validation failed: {0}")]
    ValidationError(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("Internal service error: {0}")]
    InternalError(String),
}

pub type CoreResult<T> = Result<T, CoreError>;

impl From<CatalogError> for CoreError {
    fn from(err: CatalogError) -> Self {
        CoreError::ValidationError(err.to_string())
    }
}

impl From<BookingError> for CoreError {
    fn from(err: BookingError) -> Self {
        match err {
            BookingError::Seats(SeatError::Taken(_))
            | BookingError::SoldOut { .. }
            | BookingError::InvalidTransition { .. } => CoreError::Conflict(err.to_string()),
            other => CoreError::ValidationError(other.to_string()),
        }
    }
}

impl From<AffiliateError> for CoreError {
    fn from(err: AffiliateError) -> Self {
        match err {
            AffiliateError::InvalidRate(_) => CoreError::ValidationError(err.to_string()),
            other => CoreError::Conflict(other.to_string()),
        }
    }
}
