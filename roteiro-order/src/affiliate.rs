use chrono::{DateTime, Utc};
use roteiro_shared::money::{percent_of, Cents};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::Booking;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AffiliateStatus {
    Pending,
    Active,
    Rejected,
    Suspended,
}

impl AffiliateStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AffiliateStatus::Pending => "pending",
            AffiliateStatus::Active => "active",
            AffiliateStatus::Rejected => "rejected",
            AffiliateStatus::Suspended => "suspended",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(AffiliateStatus::Pending),
            "active" => Some(AffiliateStatus::Active),
            "rejected" => Some(AffiliateStatus::Rejected),
            "suspended" => Some(AffiliateStatus::Suspended),
            _ => None,
        }
    }
}

/// Admin decisions on an affiliate account.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AffiliateAction {
    Approve,
    Reject,
    Suspend,
    Reactivate,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CommissionStatus {
    Pending,
    Approved,
    Paid,
}

impl CommissionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CommissionStatus::Pending => "pending",
            CommissionStatus::Approved => "approved",
            CommissionStatus::Paid => "paid",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(CommissionStatus::Pending),
            "approved" => Some(CommissionStatus::Approved),
            "paid" => Some(CommissionStatus::Paid),
            _ => None,
        }
    }
}

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum AffiliateError {
    #[error("Cannot {action:?} an affiliate that is {status}")]
    InvalidAction {
        action: AffiliateAction,
        status: &'static str,
    },

    #[error("Commission cannot move from {from} to {to}")]
    InvalidCommissionTransition {
        from: &'static str,
        to: &'static str,
    },

    #[error("Commission rate must be between 0 and 100, got {0}")]
    InvalidRate(i32),
}

/// A referral partner earning commission on bookings made with their code.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Affiliate {
    pub id: Uuid,
    /// Subject id from the auth service.
    pub user_id: String,
    pub name: String,
    pub email: String,
    pub code: String,
    /// Flat percentage applied to every referred sale.
    pub commission_rate: i32,
    pub status: AffiliateStatus,
    pub pix_key: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Affiliate {
    pub fn new(user_id: String, name: String, email: String, commission_rate: i32, pix_key: Option<String>) -> Self {
        let now = Utc::now();
        let id = Uuid::new_v4();
        Self {
            id,
            code: generate_code(&name, id),
            user_id,
            name,
            email,
            commission_rate,
            status: AffiliateStatus::Pending,
            pix_key,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == AffiliateStatus::Active
    }

    pub fn apply(&mut self, action: AffiliateAction) -> Result<(), AffiliateError> {
        use AffiliateAction::*;
        use AffiliateStatus::*;

        let next = match (self.status, action) {
            (Pending, Approve) => Active,
            (Pending, Reject) => Rejected,
            (Active, Suspend) => Suspended,
            (Suspended, Reactivate) => Active,
            (status, action) => {
                return Err(AffiliateError::InvalidAction {
                    action,
                    status: status.as_str(),
                })
            }
        };
        self.status = next;
        self.updated_at = Utc::now();
        Ok(())
    }

    pub fn set_commission_rate(&mut self, rate: i32) -> Result<(), AffiliateError> {
        if !(0..=100).contains(&rate) {
            return Err(AffiliateError::InvalidRate(rate));
        }
        self.commission_rate = rate;
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Commission record for a sale attributed to this affiliate.
    pub fn referral_for(&self, booking: &Booking) -> Referral {
        Referral {
            id: Uuid::new_v4(),
            affiliate_id: self.id,
            booking_id: booking.id,
            sale_cents: booking.total_cents,
            commission_cents: percent_of(booking.total_cents, self.commission_rate),
            status: CommissionStatus::Pending,
            created_at: Utc::now(),
        }
    }
}

/// `GRAMA1B2`-style code: up to four letters of the name plus four hex digits of the id.
pub fn generate_code(name: &str, id: Uuid) -> String {
    let mut prefix: String = name
        .chars()
        .filter(|c| c.is_ascii_alphabetic())
        .take(4)
        .map(|c| c.to_ascii_uppercase())
        .collect();
    while prefix.len() < 4 {
        prefix.push('X');
    }
    let suffix: String = id.simple().to_string().chars().take(4).collect();
    format!("{}{}", prefix, suffix.to_uppercase())
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Referral {
    pub id: Uuid,
    pub affiliate_id: Uuid,
    pub booking_id: Uuid,
    pub sale_cents: Cents,
    pub commission_cents: Cents,
    pub status: CommissionStatus,
    pub created_at: DateTime<Utc>,
}

impl Referral {
    /// pending → approved → paid, one step at a time.
    pub fn advance(&mut self, next: CommissionStatus) -> Result<(), AffiliateError> {
        let allowed = matches!(
            (self.status, next),
            (CommissionStatus::Pending, CommissionStatus::Approved) | (CommissionStatus::Approved, CommissionStatus::Paid)
        );
        if !allowed {
            return Err(AffiliateError::InvalidCommissionTransition {
                from: self.status.as_str(),
                to: next.as_str(),
            });
        }
        self.status = next;
        Ok(())
    }
}

/// Row of the published commission table.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct CommissionTier {
    pub level: u8,
    pub min_sales: u32,
    pub max_sales: Option<u32>,
    pub percent: i32,
    pub bonus_cents: Cents,
}

/// Marketing table shown on the affiliate landing page. Informational only:
/// the rate actually paid is the affiliate's own `commission_rate`.
pub const COMMISSION_TIERS: [CommissionTier; 4] = [
    CommissionTier { level: 1, min_sales: 1, max_sales: Some(10), percent: 5, bonus_cents: 0 },
    CommissionTier { level: 2, min_sales: 11, max_sales: Some(30), percent: 7, bonus_cents: 20_000 },
    CommissionTier { level: 3, min_sales: 31, max_sales: Some(60), percent: 10, bonus_cents: 50_000 },
    CommissionTier { level: 4, min_sales: 61, max_sales: None, percent: 12, bonus_cents: 100_000 },
];

/// Band a cumulative sales count falls into; zero sales sits in the first tier.
pub fn tier_for_sales(sales: u32) -> &'static CommissionTier {
    COMMISSION_TIERS
        .iter()
        .rev()
        .find(|tier| sales >= tier.min_sales)
        .unwrap_or(&COMMISSION_TIERS[0])
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct AffiliateSummary {
    pub sales: u32,
    pub sales_cents: Cents,
    pub pending_cents: Cents,
    pub approved_cents: Cents,
    pub paid_cents: Cents,
    pub tier: CommissionTier,
}

pub fn summarize(referrals: &[Referral]) -> AffiliateSummary {
    let mut summary = AffiliateSummary {
        sales: referrals.len() as u32,
        sales_cents: 0,
        pending_cents: 0,
        approved_cents: 0,
        paid_cents: 0,
        tier: *tier_for_sales(referrals.len() as u32),
    };
    for referral in referrals {
        summary.sales_cents += referral.sale_cents;
        match referral.status {
            CommissionStatus::Pending => summary.pending_cents += referral.commission_cents,
            CommissionStatus::Approved => summary.approved_cents += referral.commission_cents,
            CommissionStatus::Paid => summary.paid_cents += referral.commission_cents,
        }
    }
    summary
}
