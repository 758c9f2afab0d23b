pub mod fleet;
pub mod filter;
pub mod package;
pub mod seat_map;

pub use fleet::{Bus, BusInput};
pub use filter::PackageFilter;
pub use package::{ChildPriceTier, Package, PackageInput, PackageStatus};
pub use seat_map::{SeatError, SeatMap, SeatRow, SeatSelection, ToggleOutcome};

/// Catalog validation errors
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum CatalogError {
    #[error("{0} is required")]
    MissingField(&'static str),

    #[error("Invalid value for {field}: {reason}")]
    InvalidField {
        field: &'static str,
        reason: String,
    },

    #[error("Package needs {requested} seats but bus only has {available}")]
    BusTooSmall {
        requested: u32,
        available: u32,
    },
}
