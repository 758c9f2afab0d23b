use async_trait::async_trait;
use roteiro_shared::models::events::DomainEvent;

use crate::CoreResult;

/// Outbound domain events (booking created, status changes, contact received).
#[async_trait]
pub trait EventPublisher: Send + Sync {
    async fn publish(&self, event: &DomainEvent) -> CoreResult<()>;
}
