use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::Booking;

/// Account from the external auth/user service.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RegisteredUser {
    pub id: String,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Admin customer row: registered users and guest bookers, one per e-mail.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Customer {
    pub email: String,
    pub name: String,
    pub phone: Option<String>,
    pub registered: bool,
    pub user_id: Option<String>,
    pub bookings: u32,
    pub total_spent_cents: i64,
    pub last_booking_at: Option<DateTime<Utc>>,
}

/// Merges registered users with guest bookings by lower-cased e-mail.
///
/// Registered profile data wins over what was typed into booking forms.
/// Canceled bookings count as bookings but not as spend.
pub fn merge_customers(users: &[RegisteredUser], bookings: &[Booking]) -> Vec<Customer> {
    let mut by_email: BTreeMap<String, Customer> = BTreeMap::new();

    for user in users {
        let email = user.email.trim().to_lowercase();
        by_email.insert(
            email.clone(),
            Customer {
                email,
                name: user.name.clone(),
                phone: user.phone.clone(),
                registered: true,
                user_id: Some(user.id.clone()),
                bookings: 0,
                total_spent_cents: 0,
                last_booking_at: None,
            },
        );
    }

    for booking in bookings {
        let email = booking.customer_email.trim().to_lowercase();
        let customer = by_email.entry(email.clone()).or_insert_with(|| Customer {
            email,
            name: booking.customer_name.clone(),
            phone: Some(booking.customer_phone.clone()),
            registered: false,
            user_id: None,
            bookings: 0,
            total_spent_cents: 0,
            last_booking_at: None,
        });

        customer.bookings += 1;
        if booking.is_active() {
            customer.total_spent_cents += booking.total_cents;
        }
        if customer.phone.is_none() {
            customer.phone = Some(booking.customer_phone.clone());
        }
        match customer.last_booking_at {
            Some(last) if last >= booking.created_at => {}
            _ => customer.last_booking_at = Some(booking.created_at),
        }
    }

    let mut customers: Vec<Customer> = by_email.into_values().collect();
    customers.sort_by(|a, b| {
        a.name
            .to_lowercase()
            .cmp(&b.name.to_lowercase())
            .then_with(|| a.email.cmp(&b.email))
    });
    customers
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{BookingStatus, PaymentStatus};
    use uuid::Uuid;

    fn booking(name: &str, email: &str, total: i64, status: BookingStatus) -> Booking {
        let now = Utc::now();
        Booking {
            id: Uuid::new_v4(),
            package_id: Uuid::new_v4(),
            customer_name: name.into(),
            customer_email: email.into(),
            customer_phone: "11988887777".into(),
            passengers: 1,
            child_ages: vec![],
            seats: vec![],
            total_cents: total,
            status,
            payment_status: PaymentStatus::Pending,
            affiliate_code: None,
            notes: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn merges_users_and_guests_by_email() {
        let users = vec![RegisteredUser {
            id: "user_1".into(),
            name: "Beatriz Lima".into(),
            email: "Bia@Example.com".into(),
            phone: None,
            created_at: Utc::now(),
        }];
        let bookings = vec![
            booking("Bia", "bia@example.com", 100_000, BookingStatus::Paid),
            booking("Bia", "BIA@example.com ", 50_000, BookingStatus::Canceled),
            booking("Arthur", "arthur@example.com", 70_000, BookingStatus::Pending),
        ];

        let customers = merge_customers(&users, &bookings);
        assert_eq!(customers.len(), 2);

        assert_eq!(customers[0].name, "Arthur");
        assert!(!customers[0].registered);

        let bia = &customers[1];
        assert_eq!(bia.name, "Beatriz Lima");
        assert!(bia.registered);
        assert_eq!(bia.bookings, 2);
        assert_eq!(bia.total_spent_cents, 100_000);
        assert_eq!(bia.phone.as_deref(), Some("11988887777"));
    }
}
