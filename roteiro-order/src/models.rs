use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum BookingStatus {
    Pending,
    Confirmed,
    Paid,
    Canceled,
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Pending => "pending",
            BookingStatus::Confirmed => "confirmed",
            BookingStatus::Paid => "paid",
            BookingStatus::Canceled => "canceled",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(BookingStatus::Pending),
            "confirmed" => Some(BookingStatus::Confirmed),
            "paid" => Some(BookingStatus::Paid),
            "canceled" => Some(BookingStatus::Canceled),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Pending,
    Paid,
    Failed,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Paid => "paid",
            PaymentStatus::Failed => "failed",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(PaymentStatus::Pending),
            "paid" => Some(PaymentStatus::Paid),
            "failed" => Some(PaymentStatus::Failed),
            _ => None,
        }
    }
}

/// A customer's reservation against a package.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Booking {
    pub id: Uuid,
    pub package_id: Uuid,
    pub customer_name: String,
    pub customer_email: String,
    pub customer_phone: String,
    pub passengers: u32,
    pub child_ages: Vec<u8>,
    /// Ascending; empty for packages sold without a seat map.
    pub seats: Vec<u32>,
    pub total_cents: i64,
    pub status: BookingStatus,
    pub payment_status: PaymentStatus,
    pub affiliate_code: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Booking {
    /// Canceled bookings no longer hold seats or capacity.
    pub fn is_active(&self) -> bool {
        self.status != BookingStatus::Canceled
    }
}

/// What non-canceled bookings (and live holds) already claim on a package.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Occupancy {
    pub seats: Vec<u32>,
    pub passengers: u32,
}

impl Occupancy {
    pub fn from_bookings<'a>(bookings: impl IntoIterator<Item = &'a Booking>) -> Self {
        let mut occupancy = Occupancy::default();
        for booking in bookings.into_iter().filter(|b| b.is_active()) {
            occupancy.passengers += booking.passengers;
            occupancy.seats.extend_from_slice(&booking.seats);
        }
        occupancy.seats.sort_unstable();
        occupancy.seats.dedup();
        occupancy
    }

    /// Adds seats claimed elsewhere (e.g. short-lived holds by other sessions).
    pub fn with_blocked(mut self, blocked: impl IntoIterator<Item = u32>) -> Self {
        self.seats.extend(blocked);
        self.seats.sort_unstable();
        self.seats.dedup();
        self
    }
}
