use async_trait::async_trait;
use serde::Serialize;
use uuid::Uuid;

use crate::CoreResult;

/// A short-lived claim on one seat by an anonymous booking session.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct SeatHold {
    pub seat: u32,
    pub token: String,
}

#[async_trait]
pub trait SeatHoldStore: Send + Sync {
    /// Claims every seat in `seats` for `token` or none of them. Returns the
    /// seats held by other tokens; an empty result means success. Seats the
    /// token already holds get their TTL refreshed.
    async fn hold_seats(&self, package_id: Uuid, seats: &[u32], token: &str, ttl_seconds: u64) -> CoreResult<Vec<u32>>;

    /// Live holds for a package.
    async fn held_seats(&self, package_id: Uuid) -> CoreResult<Vec<SeatHold>>;

    /// Drops the token's holds on `seats`; holds owned by others are untouched.
    async fn release_seats(&self, package_id: Uuid, seats: &[u32], token: &str) -> CoreResult<()>;
}

/// Seats that `token` may not take because another session holds them.
pub fn blocked_for(holds: &[SeatHold], token: Option<&str>) -> Vec<u32> {
    let mut seats: Vec<u32> = holds
        .iter()
        .filter(|hold| token != Some(hold.token.as_str()))
        .map(|hold| hold.seat)
        .collect();
    seats.sort_unstable();
    seats.dedup();
    seats
}

#[async_trait]
pub trait RateLimiter: Send + Sync {
    /// Counts one hit against `key`; false once `limit` is exceeded within the window.
    async fn check_rate_limit(&self, key: &str, limit: i64, window_seconds: i64) -> CoreResult<bool>;
}
