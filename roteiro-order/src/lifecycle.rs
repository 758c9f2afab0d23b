use chrono::Utc;

use crate::models::{Booking, BookingStatus, PaymentStatus};
use crate::BookingError;

/// Result of a successful status transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusChange {
    pub from: BookingStatus,
    pub to: BookingStatus,
}

impl StatusChange {
    pub fn releases_seats(&self) -> bool {
        self.to == BookingStatus::Canceled
    }
}

impl BookingStatus {
    /// pending → confirmed | paid | canceled; confirmed → paid | canceled;
    /// paid → canceled; canceled is terminal.
    pub fn can_transition_to(self, next: BookingStatus) -> bool {
        use BookingStatus::*;
        matches!(
            (self, next),
            (Pending, Confirmed) | (Pending, Paid) | (Pending, Canceled)
                | (Confirmed, Paid) | (Confirmed, Canceled)
                | (Paid, Canceled)
        )
    }
}

/// Moves a booking to `next`, keeping payment status consistent with it.
pub fn transition(booking: &mut Booking, next: BookingStatus) -> Result<StatusChange, BookingError> {
    let from = booking.status;
    if !from.can_transition_to(next) {
        return Err(BookingError::InvalidTransition {
            from: from.as_str().to_string(),
            to: next.as_str().to_string(),
        });
    }

    booking.status = next;
    if next == BookingStatus::Paid {
        booking.payment_status = PaymentStatus::Paid;
    }
    booking.updated_at = Utc::now();

    Ok(StatusChange { from, to: next })
}

/// Applies a payment outcome reported by the admin or the payment provider.
///
/// A successful payment also moves the booking to `paid`; a failure leaves the
/// booking status alone so it can be retried or canceled.
pub fn record_payment(booking: &mut Booking, payment: PaymentStatus) -> Result<Option<StatusChange>, BookingError> {
    if booking.payment_status == payment {
        return Ok(None);
    }
    if booking.payment_status == PaymentStatus::Paid || booking.status == BookingStatus::Canceled {
        return Err(BookingError::InvalidTransition {
            from: format!("payment {}", booking.payment_status.as_str()),
            to: format!("payment {}", payment.as_str()),
        });
    }

    match payment {
        PaymentStatus::Paid => transition(booking, BookingStatus::Paid).map(Some),
        other => {
            booking.payment_status = other;
            booking.updated_at = Utc::now();
            Ok(None)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn booking() -> Booking {
        let now = Utc::now();
        Booking {
            id: Uuid::new_v4(),
            package_id: Uuid::new_v4(),
            customer_name: "Ana".into(),
            customer_email: "ana@example.com".into(),
            customer_phone: "11999990000".into(),
            passengers: 1,
            child_ages: vec![],
            seats: vec![1],
            total_cents: 10_000,
            status: BookingStatus::Pending,
            payment_status: PaymentStatus::Pending,
            affiliate_code: None,
            notes: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn booking_lifecycle() {
        let mut b = booking();

        transition(&mut b, BookingStatus::Confirmed).unwrap();
        let change = transition(&mut b, BookingStatus::Paid).unwrap();
        assert_eq!(change.from, BookingStatus::Confirmed);
        assert_eq!(b.payment_status, PaymentStatus::Paid);

        let change = transition(&mut b, BookingStatus::Canceled).unwrap();
        assert!(change.releases_seats());
        assert!(!b.is_active());
    }

    #[test]
    fn canceled_is_terminal() {
        let mut b = booking();
        transition(&mut b, BookingStatus::Canceled).unwrap();
        for next in [BookingStatus::Pending, BookingStatus::Confirmed, BookingStatus::Paid] {
            assert!(transition(&mut b, next).is_err());
        }
    }

    #[test]
    fn cannot_go_back_to_pending() {
        let mut b = booking();
        transition(&mut b, BookingStatus::Confirmed).unwrap();
        assert_eq!(
            transition(&mut b, BookingStatus::Pending),
            Err(BookingError::InvalidTransition { from: "confirmed".into(), to: "pending".into() })
        );
    }

    #[test]
    fn payment_success_marks_booking_paid() {
        let mut b = booking();
        assert_eq!(record_payment(&mut b, PaymentStatus::Failed), Ok(None));
        assert_eq!(b.status, BookingStatus::Pending);

        let change = record_payment(&mut b, PaymentStatus::Paid).unwrap().unwrap();
        assert_eq!(change.to, BookingStatus::Paid);
        assert!(record_payment(&mut b, PaymentStatus::Failed).is_err());
    }
}
