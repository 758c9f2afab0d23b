use std::sync::Arc;

use tokio::sync::broadcast;

use roteiro_core::billing::BillingProvider;
use roteiro_core::events::EventPublisher;
use roteiro_core::holds::{RateLimiter, SeatHoldStore};
use roteiro_core::repository::{
    AffiliateRepository, BookingRepository, ContactRepository, FleetRepository, PackageRepository, UserDirectory,
};
use roteiro_shared::models::events::SeatsChangedEvent;
use roteiro_store::app_config::BusinessRules;
use roteiro_store::MemoryStore;

use crate::metrics::Metrics;

#[derive(Clone)]
pub struct AuthConfig {
    pub secret: String,
    pub expiration: u64,
}

/// Storage and collaborator implementations selected at startup.
#[derive(Clone)]
pub struct Backends {
    pub packages: Arc<dyn PackageRepository>,
    pub fleet: Arc<dyn FleetRepository>,
    pub bookings: Arc<dyn BookingRepository>,
    pub affiliates: Arc<dyn AffiliateRepository>,
    pub contacts: Arc<dyn ContactRepository>,
    pub users: Arc<dyn UserDirectory>,
    pub holds: Arc<dyn SeatHoldStore>,
    pub rate_limiter: Arc<dyn RateLimiter>,
    pub events: Arc<dyn EventPublisher>,
}

impl Backends {
    pub fn memory(store: Arc<MemoryStore>) -> Self {
        Self {
            packages: store.clone(),
            fleet: store.clone(),
            bookings: store.clone(),
            affiliates: store.clone(),
            contacts: store.clone(),
            users: store.clone(),
            holds: store.clone(),
            rate_limiter: store.clone(),
            events: store,
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub packages: Arc<dyn PackageRepository>,
    pub fleet: Arc<dyn FleetRepository>,
    pub bookings: Arc<dyn BookingRepository>,
    pub affiliates: Arc<dyn AffiliateRepository>,
    pub contacts: Arc<dyn ContactRepository>,
    pub users: Arc<dyn UserDirectory>,
    pub holds: Arc<dyn SeatHoldStore>,
    pub rate_limiter: Arc<dyn RateLimiter>,
    pub events: Arc<dyn EventPublisher>,
    pub billing: Arc<dyn BillingProvider>,
    pub sse_tx: broadcast::Sender<SeatsChangedEvent>,
    pub metrics: Arc<Metrics>,
    pub auth: AuthConfig,
    pub business_rules: BusinessRules,
}

impl AppState {
    pub fn new(
        backends: Backends,
        billing: Arc<dyn BillingProvider>,
        auth: AuthConfig,
        business_rules: BusinessRules,
    ) -> Result<Self, prometheus::Error> {
        let (sse_tx, _) = broadcast::channel(100);
        Ok(Self {
            packages: backends.packages,
            fleet: backends.fleet,
            bookings: backends.bookings,
            affiliates: backends.affiliates,
            contacts: backends.contacts,
            users: backends.users,
            holds: backends.holds,
            rate_limiter: backends.rate_limiter,
            events: backends.events,
            billing,
            sse_tx,
            metrics: Arc::new(Metrics::new()?),
            auth,
            business_rules,
        })
    }
}
