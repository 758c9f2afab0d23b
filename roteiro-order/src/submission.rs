use chrono::Utc;
use roteiro_catalog::{Package, SeatError, SeatMap};
use serde::Deserialize;
use uuid::Uuid;

use crate::models::{Booking, BookingStatus, Occupancy, PaymentStatus};
use crate::pricing::quote;
use crate::BookingError;

/// Storefront booking form payload.
#[derive(Debug, Clone, Deserialize)]
pub struct BookingRequest {
    pub package_id: Uuid,
    #[serde(default)]
    pub customer_name: String,
    #[serde(default)]
    pub customer_email: String,
    #[serde(default)]
    pub customer_phone: String,
    pub passengers: u32,
    #[serde(default)]
    pub child_ages: Vec<u8>,
    #[serde(default)]
    pub seats: Vec<u32>,
    /// Affiliate code carried from the `ref` link.
    #[serde(default, rename = "ref")]
    pub affiliate_code: Option<String>,
    /// Seat-hold session that may own some of `seats`.
    #[serde(default)]
    pub hold_token: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl BookingRequest {
    /// Presence/shape checks that need no package data.
    pub fn validate_fields(&self) -> Result<(), BookingError> {
        if self.customer_name.trim().is_empty() {
            return Err(BookingError::MissingField("customer_name"));
        }
        if self.customer_email.trim().is_empty() {
            return Err(BookingError::MissingField("customer_email"));
        }
        if !looks_like_email(self.customer_email.trim()) {
            return Err(BookingError::Invalid("customer_email is not a valid e-mail".into()));
        }
        if self.customer_phone.trim().is_empty() {
            return Err(BookingError::MissingField("customer_phone"));
        }
        if self.customer_phone.chars().filter(char::is_ascii_digit).count() < 8 {
            return Err(BookingError::Invalid("customer_phone needs at least 8 digits".into()));
        }
        if self.passengers == 0 {
            return Err(BookingError::Invalid("at least one passenger is required".into()));
        }
        Ok(())
    }
}

fn looks_like_email(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => !local.is_empty() && domain.contains('.') && !domain.starts_with('.') && !domain.ends_with('.'),
        None => false,
    }
}

/// Validates a request against the package and its current occupancy and
/// builds the pending booking to persist.
pub fn prepare_booking(request: &BookingRequest, package: &Package, occupancy: &Occupancy) -> Result<Booking, BookingError> {
    request.validate_fields()?;

    if !package.is_published() {
        return Err(BookingError::NotBookable(format!("{} is not published", package.title)));
    }
    if package.departure_date < Utc::now().date_naive() {
        return Err(BookingError::NotBookable(format!("{} already departed", package.title)));
    }

    let seats = if package.has_seat_map() {
        if request.seats.len() != request.passengers as usize {
            if request.seats.is_empty() {
                return Err(BookingError::MissingField("seats"));
            }
            return Err(SeatError::CountMismatch {
                expected: request.passengers as usize,
                actual: request.seats.len(),
            }
            .into());
        }
        SeatMap::new(package.total_seats, occupancy.seats.iter().copied()).claim(&request.seats)?
    } else {
        let available = package.total_seats.saturating_sub(occupancy.passengers);
        if request.passengers > available {
            return Err(BookingError::SoldOut {
                requested: request.passengers,
                available,
            });
        }
        Vec::new()
    };

    let price = quote(package, request.passengers, &request.child_ages)?;
    let now = Utc::now();

    Ok(Booking {
        id: Uuid::new_v4(),
        package_id: package.id,
        customer_name: request.customer_name.trim().to_string(),
        customer_email: request.customer_email.trim().to_lowercase(),
        customer_phone: request.customer_phone.trim().to_string(),
        passengers: request.passengers,
        child_ages: request.child_ages.clone(),
        seats,
        total_cents: price.total_cents,
        status: BookingStatus::Pending,
        payment_status: PaymentStatus::Pending,
        affiliate_code: request
            .affiliate_code
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(str::to_uppercase),
        notes: request.notes.clone(),
        created_at: now,
        updated_at: now,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate};
    use roteiro_catalog::{PackageInput, PackageStatus};

    fn package(with_bus: bool) -> Package {
        let departure = Utc::now().date_naive() + Duration::days(30);
        PackageInput {
            title: "Bonito".into(),
            destination: "Bonito - MS".into(),
            description: None,
            price_cents: 250_000,
            child_prices: vec![],
            duration_days: None,
            departure_date: departure,
            departure_time: None,
            return_date: departure + Duration::days(4),
            return_time: None,
            total_seats: Some(8),
            cover_image: None,
            gallery: vec![],
            included: vec![],
            excluded: vec![],
            attractions: vec![],
            status: PackageStatus::Published,
            bus_id: with_bus.then(Uuid::new_v4),
        }
        .into_package(8)
    }

    fn request(package: &Package, passengers: u32, seats: Vec<u32>) -> BookingRequest {
        BookingRequest {
            package_id: package.id,
            customer_name: "Carlos Souza".into(),
            customer_email: "Carlos@Example.com".into(),
            customer_phone: "(11) 98888-7777".into(),
            passengers,
            child_ages: vec![],
            seats,
            affiliate_code: Some(" abcd1234 ".into()),
            hold_token: None,
            notes: None,
        }
    }

    #[test]
    fn builds_pending_booking_with_sorted_seats() {
        let pkg = package(true);
        let booking = prepare_booking(&request(&pkg, 2, vec![6, 5]), &pkg, &Occupancy::default()).unwrap();
        assert_eq!(booking.seats, vec![5, 6]);
        assert_eq!(booking.total_cents, 500_000);
        assert_eq!(booking.status, BookingStatus::Pending);
        assert_eq!(booking.customer_email, "carlos@example.com");
        assert_eq!(booking.affiliate_code.as_deref(), Some("ABCD1234"));
    }

    #[test]
    fn rejects_seats_already_occupied() {
        let pkg = package(true);
        let occupancy = Occupancy { seats: vec![5], passengers: 1 };
        let err = prepare_booking(&request(&pkg, 2, vec![5, 6]), &pkg, &occupancy).unwrap_err();
        assert_eq!(err, BookingError::Seats(SeatError::Taken(vec![5])));
    }

    #[test]
    fn seat_map_packages_need_one_seat_per_passenger() {
        let pkg = package(true);
        assert_eq!(
            prepare_booking(&request(&pkg, 2, vec![]), &pkg, &Occupancy::default()),
            Err(BookingError::MissingField("seats"))
        );
        assert!(prepare_booking(&request(&pkg, 2, vec![1]), &pkg, &Occupancy::default()).is_err());
    }

    #[test]
    fn packages_without_bus_check_capacity() {
        let pkg = package(false);
        let occupancy = Occupancy { seats: vec![], passengers: 7 };
        assert_eq!(
            prepare_booking(&request(&pkg, 2, vec![]), &pkg, &occupancy),
            Err(BookingError::SoldOut { requested: 2, available: 1 })
        );
    }

    #[test]
    fn missing_contact_fields_are_reported() {
        let pkg = package(false);
        let mut req = request(&pkg, 1, vec![]);
        req.customer_phone = "  ".into();
        assert_eq!(req.validate_fields(), Err(BookingError::MissingField("customer_phone")));
        req.customer_phone = "11999990000".into();
        req.customer_email = "no-at-sign".into();
        assert!(req.validate_fields().is_err());
    }

    #[test]
    fn drafts_and_past_trips_are_not_bookable() {
        let mut pkg = package(false);
        pkg.status = PackageStatus::Draft;
        assert!(matches!(
            prepare_booking(&request(&pkg, 1, vec![]), &pkg, &Occupancy::default()),
            Err(BookingError::NotBookable(_))
        ));

        pkg.status = PackageStatus::Published;
        pkg.departure_date = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap();
        assert!(matches!(
            prepare_booking(&request(&pkg, 1, vec![]), &pkg, &Occupancy::default()),
            Err(BookingError::NotBookable(_))
        ));
    }
}
