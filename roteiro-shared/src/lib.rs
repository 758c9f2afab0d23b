pub mod money;
pub mod pii;
pub mod models;

pub use money::{format_brl, percent_of, Cents};
pub use pii::Masked;
