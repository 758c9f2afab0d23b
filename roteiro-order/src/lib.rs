pub mod affiliate;
pub mod customers;
pub mod lifecycle;
pub mod models;
pub mod pricing;
pub mod submission;

pub use affiliate::{Affiliate, AffiliateAction, AffiliateError, AffiliateStatus, CommissionStatus, Referral};
pub use customers::{merge_customers, Customer, RegisteredUser};
pub use lifecycle::StatusChange;
pub use models::{Booking, BookingStatus, Occupancy, PaymentStatus};
pub use pricing::{quote, PriceQuote};
pub use submission::{prepare_booking, BookingRequest};

use roteiro_catalog::SeatError;

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum BookingError {
    #[error("{0} is required")]
    MissingField(&'static str),

    #[error("Invalid booking: {0}")]
    Invalid(String),

    #[error("Package is not open for booking: {0}")]
    NotBookable(String),

    #[error("Not enough seats: requested {requested}, available {available}")]
    SoldOut {
        requested: u32,
        available: u32,
    },

    #[error(transparent)]
    Seats(#[from] SeatError),

    #[error("Invalid state transition from {from} to {to}")]
    InvalidTransition {
        from: String,
        to: String,
    },
}
