use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::CoreResult;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    Trialing,
    Active,
    PastDue,
    Canceled,
}

/// The agency's own plan with the platform's payment/subscription provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subscription {
    pub plan: String,
    pub status: SubscriptionStatus,
    pub amount_cents: i64,
    pub current_period_end: DateTime<Utc>,
    pub cancel_at_period_end: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum InvoiceStatus {
    Draft,
    Open,
    Paid,
    Void,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Invoice {
    pub id: String,
    pub number: String,
    pub amount_cents: i64,
    pub status: InvoiceStatus,
    pub issued_at: DateTime<Utc>,
    pub hosted_url: Option<String>,
}

#[async_trait]
pub trait BillingProvider: Send + Sync {
    /// Current subscription, if the agency has one
    async fn subscription(&self) -> CoreResult<Option<Subscription>>;

    /// Invoices, newest first
    async fn invoices(&self) -> CoreResult<Vec<Invoice>>;

    /// URL of the provider-hosted billing portal
    async fn portal_session(&self, return_url: &str) -> CoreResult<String>;
}

/// Billing backed by configuration instead of a live provider.
pub struct StaticBillingProvider {
    plan: String,
    amount_cents: i64,
    portal_url: String,
}

impl StaticBillingProvider {
    pub fn new(plan: impl Into<String>, amount_cents: i64, portal_url: impl Into<String>) -> Self {
        Self {
            plan: plan.into(),
            amount_cents,
            portal_url: portal_url.into(),
        }
    }
}

#[async_trait]
impl BillingProvider for StaticBillingProvider {
    async fn subscription(&self) -> CoreResult<Option<Subscription>> {
        Ok(Some(Subscription {
            plan: self.plan.clone(),
            status: SubscriptionStatus::Active,
            amount_cents: self.amount_cents,
            current_period_end: Utc::now() + Duration::days(30),
            cancel_at_period_end: false,
        }))
    }

    async fn invoices(&self) -> CoreResult<Vec<Invoice>> {
        let now = Utc::now();
        Ok((0..3)
            .map(|month| Invoice {
                id: format!("in_static_{}", month),
                number: format!("ROT-{:04}", 3 - month),
                amount_cents: self.amount_cents,
                status: InvoiceStatus::Paid,
                issued_at: now - Duration::days(30 * (month as i64 + 1)),
                hosted_url: None,
            })
            .collect())
    }

    async fn portal_session(&self, return_url: &str) -> CoreResult<String> {
        tracing::info!("Opening static billing portal, returning to {}", return_url);
        Ok(format!("{}?return_url={}", self.portal_url, return_url))
    }
}
