use async_trait::async_trait;
use serde::Deserialize;
use uuid::Uuid;

use roteiro_catalog::{Bus, Package, PackageStatus};
use roteiro_order::{
    Affiliate, AffiliateStatus, Booking, BookingStatus, Occupancy, PaymentStatus, Referral, RegisteredUser,
};

use crate::contact::{ContactMessage, ContactStatus};
use crate::CoreResult;

/// Repository trait for travel packages
#[async_trait]
pub trait PackageRepository: Send + Sync {
    async fn list_packages(&self, status: Option<PackageStatus>) -> CoreResult<Vec<Package>>;

    async fn get_package(&self, id: Uuid) -> CoreResult<Option<Package>>;

    async fn create_package(&self, package: &Package) -> CoreResult<()>;

    async fn update_package(&self, package: &Package) -> CoreResult<()>;

    /// Fails with `Conflict` while bookings still reference the package.
    async fn delete_package(&self, id: Uuid) -> CoreResult<()>;
}

/// Repository trait for the bus fleet
#[async_trait]
pub trait FleetRepository: Send + Sync {
    async fn list_buses(&self, active_only: bool) -> CoreResult<Vec<Bus>>;

    async fn get_bus(&self, id: Uuid) -> CoreResult<Option<Bus>>;

    async fn create_bus(&self, bus: &Bus) -> CoreResult<()>;

    async fn update_bus(&self, bus: &Bus) -> CoreResult<()>;

    /// Fails with `Conflict` while packages still reference the bus.
    async fn delete_bus(&self, id: Uuid) -> CoreResult<()>;
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BookingFilter {
    pub package_id: Option<Uuid>,
    pub status: Option<BookingStatus>,
    pub email: Option<String>,
}

impl BookingFilter {
    pub fn matches(&self, booking: &Booking) -> bool {
        self.package_id.map_or(true, |id| id == booking.package_id)
            && self.status.map_or(true, |status| status == booking.status)
            && self
                .email
                .as_deref()
                .map_or(true, |email| email.trim().eq_ignore_ascii_case(&booking.customer_email))
    }
}

/// Repository trait for bookings and the seat occupancy they imply
#[async_trait]
pub trait BookingRepository: Send + Sync {
    /// Seats and passenger count claimed by non-canceled bookings.
    async fn occupancy(&self, package_id: Uuid) -> CoreResult<Occupancy>;

    /// Persists a new booking atomically with respect to other bookings of the
    /// same package: fails with `Conflict` if any seat is already claimed or
    /// the package would exceed `capacity` passengers.
    async fn create_booking(&self, booking: &Booking, capacity: u32) -> CoreResult<()>;

    async fn get_booking(&self, id: Uuid) -> CoreResult<Option<Booking>>;

    /// Newest first.
    async fn list_bookings(&self, filter: &BookingFilter) -> CoreResult<Vec<Booking>>;

    /// Stores status and payment status; canceled bookings give their seats back.
    ///
    /// The write only lands while the stored booking still has the status pair
    /// it was read with (`expected`); otherwise it fails with `Conflict`.
    async fn update_booking_status(&self, booking: &Booking, expected: (BookingStatus, PaymentStatus)) -> CoreResult<()>;
}

/// Repository trait for affiliates and their referrals
#[async_trait]
pub trait AffiliateRepository: Send + Sync {
    async fn list_affiliates(&self, status: Option<AffiliateStatus>) -> CoreResult<Vec<Affiliate>>;

    async fn get_affiliate(&self, id: Uuid) -> CoreResult<Option<Affiliate>>;

    async fn find_affiliate_by_user(&self, user_id: &str) -> CoreResult<Option<Affiliate>>;

    async fn find_affiliate_by_code(&self, code: &str) -> CoreResult<Option<Affiliate>>;

    /// Fails with `Conflict` if the user already applied or the code is taken.
    async fn create_affiliate(&self, affiliate: &Affiliate) -> CoreResult<()>;

    async fn update_affiliate(&self, affiliate: &Affiliate) -> CoreResult<()>;

    async fn create_referral(&self, referral: &Referral) -> CoreResult<()>;

    async fn list_referrals(&self, affiliate_id: Uuid) -> CoreResult<Vec<Referral>>;

    async fn get_referral(&self, id: Uuid) -> CoreResult<Option<Referral>>;

    async fn update_referral(&self, referral: &Referral) -> CoreResult<()>;
}

/// Repository trait for contact-form tickets
#[async_trait]
pub trait ContactRepository: Send + Sync {
    async fn create_contact(&self, contact: &ContactMessage) -> CoreResult<()>;

    async fn list_contacts(&self, status: Option<ContactStatus>) -> CoreResult<Vec<ContactMessage>>;

    async fn get_contact(&self, id: Uuid) -> CoreResult<Option<ContactMessage>>;

    async fn update_contact(&self, contact: &ContactMessage) -> CoreResult<()>;

    async fn delete_contact(&self, id: Uuid) -> CoreResult<()>;
}

/// Read side of the external auth/user service
#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn list_users(&self) -> CoreResult<Vec<RegisteredUser>>;
}
