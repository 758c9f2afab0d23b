use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::pii::Masked;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct BookingCreatedEvent {
    pub booking_id: Uuid,
    pub package_id: Uuid,
    pub customer_email: Masked<String>,
    pub passengers: u32,
    pub seats: Vec<u32>,
    pub total_cents: i64,
    pub affiliate_code: Option<String>,
    pub timestamp: i64,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct BookingStatusChangedEvent {
    pub booking_id: Uuid,
    pub package_id: Uuid,
    pub from: String,
    pub to: String,
    pub timestamp: i64,
}

/// Pushed to seat-map subscribers whenever occupancy of a package changes.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct SeatsChangedEvent {
    pub package_id: Uuid,
    pub occupied: Vec<u32>,
    pub changed_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ContactReceivedEvent {
    pub contact_id: Uuid,
    pub email: Masked<String>,
    pub subject: String,
    pub timestamp: i64,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DomainEvent {
    BookingCreated(BookingCreatedEvent),
    BookingStatusChanged(BookingStatusChangedEvent),
    ContactReceived(ContactReceivedEvent),
}

impl DomainEvent {
    pub fn topic(&self) -> &'static str {
        match self {
            DomainEvent::BookingCreated(_) => "booking.created",
            DomainEvent::BookingStatusChanged(_) => "booking.status_changed",
            DomainEvent::ContactReceived(_) => "contact.received",
        }
    }

    /// Partition key: everything about one booking lands on the same partition.
    pub fn key(&self) -> String {
        match self {
            DomainEvent::BookingCreated(e) => e.booking_id.to_string(),
            DomainEvent::BookingStatusChanged(e) => e.booking_id.to_string(),
            DomainEvent::ContactReceived(e) => e.contact_id.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_is_tagged_and_keyed_by_booking() {
        let booking_id = Uuid::new_v4();
        let event = DomainEvent::BookingStatusChanged(BookingStatusChangedEvent {
            booking_id,
            package_id: Uuid::new_v4(),
            from: "pending".into(),
            to: "paid".into(),
            timestamp: 0,
        });

        assert_eq!(event.topic(), "booking.status_changed");
        assert_eq!(event.key(), booking_id.to_string());

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "booking_status_changed");
        assert_eq!(json["to"], "paid");
    }
}
