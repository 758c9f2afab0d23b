//! In-process backend used by `storage.backend = "memory"` and by the API tests.
//! Enforces the same invariants as the Postgres repositories.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::sync::{Mutex, RwLock};
use tracing::debug;
use uuid::Uuid;

use roteiro_catalog::{Bus, Package, PackageStatus};
use roteiro_core::contact::{ContactMessage, ContactStatus};
use roteiro_core::events::EventPublisher;
use roteiro_core::holds::{RateLimiter, SeatHold, SeatHoldStore};
use roteiro_core::repository::{
    AffiliateRepository, BookingFilter, BookingRepository, ContactRepository, FleetRepository, PackageRepository,
    UserDirectory,
};
use roteiro_core::{CoreError, CoreResult};
use roteiro_order::{
    Affiliate, AffiliateStatus, Booking, BookingStatus, Occupancy, PaymentStatus, Referral, RegisteredUser,
};
use roteiro_shared::models::events::DomainEvent;

#[derive(Default)]
struct Tables {
    packages: HashMap<Uuid, Package>,
    buses: HashMap<Uuid, Bus>,
    bookings: HashMap<Uuid, Booking>,
    affiliates: HashMap<Uuid, Affiliate>,
    referrals: HashMap<Uuid, Referral>,
    contacts: HashMap<Uuid, ContactMessage>,
    users: Vec<RegisteredUser>,
}

struct HoldEntry {
    token: String,
    expires_at: Instant,
}

struct Window {
    started: Instant,
    hits: i64,
}

#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
    holds: Mutex<HashMap<(Uuid, u32), HoldEntry>>,
    windows: Mutex<HashMap<String, Window>>,
    events: Mutex<Vec<DomainEvent>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a user as if the auth provider had synced it.
    pub async fn add_user(&self, user: RegisteredUser) {
        self.tables.write().await.users.push(user);
    }

    /// Events published so far, oldest first.
    pub async fn published_events(&self) -> Vec<DomainEvent> {
        self.events.lock().await.clone()
    }
}

#[async_trait]
impl PackageRepository for MemoryStore {
    async fn list_packages(&self, status: Option<PackageStatus>) -> CoreResult<Vec<Package>> {
        let tables = self.tables.read().await;
        let mut packages: Vec<Package> = tables
            .packages
            .values()
            .filter(|p| status.map_or(true, |s| p.status == s))
            .cloned()
            .collect();
        packages.sort_by(|a, b| a.departure_date.cmp(&b.departure_date).then_with(|| a.title.cmp(&b.title)));
        Ok(packages)
    }

    async fn get_package(&self, id: Uuid) -> CoreResult<Option<Package>> {
        Ok(self.tables.read().await.packages.get(&id).cloned())
    }

    async fn create_package(&self, package: &Package) -> CoreResult<()> {
        let mut tables = self.tables.write().await;
        if let Some(bus_id) = package.bus_id {
            if !tables.buses.contains_key(&bus_id) {
                return Err(CoreError::Conflict(format!("bus {bus_id} does not exist")));
            }
        }
        if tables.packages.contains_key(&package.id) {
            return Err(CoreError::Conflict(format!("package {} already exists", package.id)));
        }
        tables.packages.insert(package.id, package.clone());
        Ok(())
    }

    async fn update_package(&self, package: &Package) -> CoreResult<()> {
        let mut tables = self.tables.write().await;
        if let Some(bus_id) = package.bus_id {
            if !tables.buses.contains_key(&bus_id) {
                return Err(CoreError::Conflict(format!("bus {bus_id} does not exist")));
            }
        }
        match tables.packages.get_mut(&package.id) {
            Some(existing) => {
                *existing = package.clone();
                Ok(())
            }
            None => Err(CoreError::NotFound(format!("package {}", package.id))),
        }
    }

    async fn delete_package(&self, id: Uuid) -> CoreResult<()> {
        let mut tables = self.tables.write().await;
        if tables.bookings.values().any(|b| b.package_id == id) {
            return Err(CoreError::Conflict(format!("package {id} has bookings")));
        }
        tables
            .packages
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| CoreError::NotFound(format!("package {id}")))
    }
}

#[async_trait]
impl FleetRepository for MemoryStore {
    async fn list_buses(&self, active_only: bool) -> CoreResult<Vec<Bus>> {
        let tables = self.tables.read().await;
        let mut buses: Vec<Bus> = tables.buses.values().filter(|b| !active_only || b.active).cloned().collect();
        buses.sort_by(|a, b| a.model.cmp(&b.model).then_with(|| a.plate.cmp(&b.plate)));
        Ok(buses)
    }

    async fn get_bus(&self, id: Uuid) -> CoreResult<Option<Bus>> {
        Ok(self.tables.read().await.buses.get(&id).cloned())
    }

    async fn create_bus(&self, bus: &Bus) -> CoreResult<()> {
        let mut tables = self.tables.write().await;
        if tables.buses.values().any(|b| b.plate == bus.plate) {
            return Err(CoreError::Conflict(format!("plate {} already registered", bus.plate)));
        }
        tables.buses.insert(bus.id, bus.clone());
        Ok(())
    }

    async fn update_bus(&self, bus: &Bus) -> CoreResult<()> {
        let mut tables = self.tables.write().await;
        if tables.buses.values().any(|b| b.plate == bus.plate && b.id != bus.id) {
            return Err(CoreError::Conflict(format!("plate {} already registered", bus.plate)));
        }
        match tables.buses.get_mut(&bus.id) {
            Some(existing) => {
                *existing = bus.clone();
                Ok(())
            }
            None => Err(CoreError::NotFound(format!("bus {}", bus.id))),
        }
    }

    async fn delete_bus(&self, id: Uuid) -> CoreResult<()> {
        let mut tables = self.tables.write().await;
        if tables.packages.values().any(|p| p.bus_id == Some(id)) {
            return Err(CoreError::Conflict(format!("bus {id} is assigned to a package")));
        }
        tables
            .buses
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| CoreError::NotFound(format!("bus {id}")))
    }
}

#[async_trait]
impl BookingRepository for MemoryStore {
    async fn occupancy(&self, package_id: Uuid) -> CoreResult<Occupancy> {
        let tables = self.tables.read().await;
        Ok(Occupancy::from_bookings(
            tables.bookings.values().filter(|b| b.package_id == package_id),
        ))
    }

    async fn create_booking(&self, booking: &Booking, capacity: u32) -> CoreResult<()> {
        // The write lock plays the role of the package row lock.
        let mut tables = self.tables.write().await;
        if !tables.packages.contains_key(&booking.package_id) {
            return Err(CoreError::NotFound(format!("package {}", booking.package_id)));
        }

        let occupancy = Occupancy::from_bookings(
            tables.bookings.values().filter(|b| b.package_id == booking.package_id),
        );
        let available = capacity.saturating_sub(occupancy.passengers);
        if booking.passengers > available {
            return Err(CoreError::Conflict(format!(
                "only {available} seats left, {} requested",
                booking.passengers
            )));
        }

        let taken: Vec<u32> = booking
            .seats
            .iter()
            .copied()
            .filter(|seat| occupancy.seats.binary_search(seat).is_ok())
            .collect();
        if !taken.is_empty() {
            return Err(CoreError::Conflict(format!("seats already taken: {taken:?}")));
        }

        tables.bookings.insert(booking.id, booking.clone());
        debug!("memory: booking {} stored", booking.id);
        Ok(())
    }

    async fn get_booking(&self, id: Uuid) -> CoreResult<Option<Booking>> {
        Ok(self.tables.read().await.bookings.get(&id).cloned())
    }

    async fn list_bookings(&self, filter: &BookingFilter) -> CoreResult<Vec<Booking>> {
        let tables = self.tables.read().await;
        let mut bookings: Vec<Booking> = tables.bookings.values().filter(|b| filter.matches(b)).cloned().collect();
        bookings.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(bookings)
    }

    async fn update_booking_status(&self, booking: &Booking, expected: (BookingStatus, PaymentStatus)) -> CoreResult<()> {
        let mut tables = self.tables.write().await;
        match tables.bookings.get_mut(&booking.id) {
            Some(existing) if (existing.status, existing.payment_status) != expected => Err(CoreError::Conflict(format!(
                "booking {} is no longer {}",
                booking.id,
                expected.0.as_str()
            ))),
            Some(existing) => {
                existing.status = booking.status;
                existing.payment_status = booking.payment_status;
                existing.updated_at = booking.updated_at;
                Ok(())
            }
            None => Err(CoreError::NotFound(format!("booking {}", booking.id))),
        }
    }
}

#[async_trait]
impl AffiliateRepository for MemoryStore {
    async fn list_affiliates(&self, status: Option<AffiliateStatus>) -> CoreResult<Vec<Affiliate>> {
        let tables = self.tables.read().await;
        let mut affiliates: Vec<Affiliate> = tables
            .affiliates
            .values()
            .filter(|a| status.map_or(true, |s| a.status == s))
            .cloned()
            .collect();
        affiliates.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(affiliates)
    }

    async fn get_affiliate(&self, id: Uuid) -> CoreResult<Option<Affiliate>> {
        Ok(self.tables.read().await.affiliates.get(&id).cloned())
    }

    async fn find_affiliate_by_user(&self, user_id: &str) -> CoreResult<Option<Affiliate>> {
        let tables = self.tables.read().await;
        Ok(tables.affiliates.values().find(|a| a.user_id == user_id).cloned())
    }

    async fn find_affiliate_by_code(&self, code: &str) -> CoreResult<Option<Affiliate>> {
        let code = code.trim();
        let tables = self.tables.read().await;
        Ok(tables.affiliates.values().find(|a| a.code.eq_ignore_ascii_case(code)).cloned())
    }

    async fn create_affiliate(&self, affiliate: &Affiliate) -> CoreResult<()> {
        let mut tables = self.tables.write().await;
        if tables
            .affiliates
            .values()
            .any(|a| a.user_id == affiliate.user_id || a.code == affiliate.code)
        {
            return Err(CoreError::Conflict("affiliate already registered".into()));
        }
        tables.affiliates.insert(affiliate.id, affiliate.clone());
        Ok(())
    }

    async fn update_affiliate(&self, affiliate: &Affiliate) -> CoreResult<()> {
        let mut tables = self.tables.write().await;
        match tables.affiliates.get_mut(&affiliate.id) {
            Some(existing) => {
                *existing = affiliate.clone();
                Ok(())
            }
            None => Err(CoreError::NotFound(format!("affiliate {}", affiliate.id))),
        }
    }

    async fn create_referral(&self, referral: &Referral) -> CoreResult<()> {
        let mut tables = self.tables.write().await;
        if tables.referrals.values().any(|r| r.booking_id == referral.booking_id) {
            return Err(CoreError::Conflict(format!("booking {} already referred", referral.booking_id)));
        }
        tables.referrals.insert(referral.id, referral.clone());
        Ok(())
    }

    async fn list_referrals(&self, affiliate_id: Uuid) -> CoreResult<Vec<Referral>> {
        let tables = self.tables.read().await;
        let mut referrals: Vec<Referral> = tables
            .referrals
            .values()
            .filter(|r| r.affiliate_id == affiliate_id)
            .cloned()
            .collect();
        referrals.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(referrals)
    }

    async fn get_referral(&self, id: Uuid) -> CoreResult<Option<Referral>> {
        Ok(self.tables.read().await.referrals.get(&id).cloned())
    }

    async fn update_referral(&self, referral: &Referral) -> CoreResult<()> {
        let mut tables = self.tables.write().await;
        match tables.referrals.get_mut(&referral.id) {
            Some(existing) => {
                existing.status = referral.status;
                Ok(())
            }
            None => Err(CoreError::NotFound(format!("referral {}", referral.id))),
        }
    }
}

#[async_trait]
impl ContactRepository for MemoryStore {
    async fn create_contact(&self, contact: &ContactMessage) -> CoreResult<()> {
        self.tables.write().await.contacts.insert(contact.id, contact.clone());
        Ok(())
    }

    async fn list_contacts(&self, status: Option<ContactStatus>) -> CoreResult<Vec<ContactMessage>> {
        let tables = self.tables.read().await;
        let mut contacts: Vec<ContactMessage> = tables
            .contacts
            .values()
            .filter(|c| status.map_or(true, |s| c.status == s))
            .cloned()
            .collect();
        contacts.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(contacts)
    }

    async fn get_contact(&self, id: Uuid) -> CoreResult<Option<ContactMessage>> {
        Ok(self.tables.read().await.contacts.get(&id).cloned())
    }

    async fn update_contact(&self, contact: &ContactMessage) -> CoreResult<()> {
        let mut tables = self.tables.write().await;
        match tables.contacts.get_mut(&contact.id) {
            Some(existing) => {
                existing.status = contact.status;
                existing.updated_at = contact.updated_at;
                Ok(())
            }
            None => Err(CoreError::NotFound(format!("contact {}", contact.id))),
        }
    }

    async fn delete_contact(&self, id: Uuid) -> CoreResult<()> {
        self.tables
            .write()
            .await
            .contacts
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| CoreError::NotFound(format!("contact {id}")))
    }
}

#[async_trait]
impl UserDirectory for MemoryStore {
    async fn list_users(&self) -> CoreResult<Vec<RegisteredUser>> {
        Ok(self.tables.read().await.users.clone())
    }
}

#[async_trait]
impl SeatHoldStore for MemoryStore {
    async fn hold_seats(&self, package_id: Uuid, seats: &[u32], token: &str, ttl_seconds: u64) -> CoreResult<Vec<u32>> {
        let now = Instant::now();
        let mut holds = self.holds.lock().await;
        holds.retain(|_, hold| hold.expires_at > now);

        let mut conflicts: Vec<u32> = seats
            .iter()
            .copied()
            .filter(|&seat| holds.get(&(package_id, seat)).is_some_and(|h| h.token != token))
            .collect();
        if !conflicts.is_empty() {
            conflicts.sort_unstable();
            return Ok(conflicts);
        }

        let expires_at = now + Duration::from_secs(ttl_seconds);
        for &seat in seats {
            holds.insert(
                (package_id, seat),
                HoldEntry {
                    token: token.to_string(),
                    expires_at,
                },
            );
        }
        Ok(Vec::new())
    }

    async fn held_seats(&self, package_id: Uuid) -> CoreResult<Vec<SeatHold>> {
        let now = Instant::now();
        let holds = self.holds.lock().await;
        let mut held: Vec<SeatHold> = holds
            .iter()
            .filter(|((pkg, _), hold)| *pkg == package_id && hold.expires_at > now)
            .map(|((_, seat), hold)| SeatHold {
                seat: *seat,
                token: hold.token.clone(),
            })
            .collect();
        held.sort_by_key(|h| h.seat);
        Ok(held)
    }

    async fn release_seats(&self, package_id: Uuid, seats: &[u32], token: &str) -> CoreResult<()> {
        let mut holds = self.holds.lock().await;
        for &seat in seats {
            if holds.get(&(package_id, seat)).is_some_and(|h| h.token == token) {
                holds.remove(&(package_id, seat));
            }
        }
        Ok(())
    }
}

#[async_trait]
impl RateLimiter for MemoryStore {
    async fn check_rate_limit(&self, key: &str, limit: i64, window_seconds: i64) -> CoreResult<bool> {
        let now = Instant::now();
        let window = Duration::from_secs(window_seconds.max(0) as u64);
        let mut windows = self.windows.lock().await;
        let entry = windows.entry(key.to_string()).or_insert(Window { started: now, hits: 0 });
        if now.duration_since(entry.started) >= window {
            entry.started = now;
            entry.hits = 0;
        }
        entry.hits += 1;
        Ok(entry.hits <= limit)
    }
}

#[async_trait]
impl EventPublisher for MemoryStore {
    async fn publish(&self, event: &DomainEvent) -> CoreResult<()> {
        debug!("memory: event {}", event.topic());
        self.events.lock().await.push(event.clone());
        Ok(())
    }
}
