use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::fleet::Bus;
use crate::CatalogError;

/// Highest per-passenger price accepted (R$ 1.000.000,00).
pub const MAX_PRICE_CENTS: i64 = 100_000_000;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum PackageStatus {
    #[default]
    Draft,
    Published,
}

impl PackageStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PackageStatus::Draft => "draft",
            PackageStatus::Published => "published",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "draft" => Some(PackageStatus::Draft),
            "published" => Some(PackageStatus::Published),
            _ => None,
        }
    }
}

/// Discounted price for children within an age band (inclusive).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChildPriceTier {
    pub min_age: u8,
    pub max_age: u8,
    pub price_cents: i64,
}

/// A sellable bus tour with fixed dates, price and seat capacity.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Package {
    pub id: Uuid,
    pub title: String,
    pub destination: String,
    pub description: Option<String>,
    pub price_cents: i64,
    pub child_prices: Vec<ChildPriceTier>,
    pub duration_days: u32,
    pub departure_date: NaiveDate,
    pub departure_time: Option<NaiveTime>,
    pub return_date: NaiveDate,
    pub return_time: Option<NaiveTime>,
    pub total_seats: u32,
    pub cover_image: Option<String>,
    pub gallery: Vec<String>,
    pub included: Vec<String>,
    pub excluded: Vec<String>,
    pub attractions: Vec<String>,
    pub status: PackageStatus,
    pub bus_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Package {
    pub fn is_published(&self) -> bool {
        self.status == PackageStatus::Published
    }

    /// Packages tied to a bus are sold with assigned seats.
    pub fn has_seat_map(&self) -> bool {
        self.bus_id.is_some()
    }

    pub fn child_price_for(&self, age: u8) -> Option<i64> {
        self.child_prices
            .iter()
            .find(|tier| age >= tier.min_age && age <= tier.max_age)
            .map(|tier| tier.price_cents)
    }
}

/// Admin payload for creating or replacing a package.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PackageInput {
    pub title: String,
    pub destination: String,
    #[serde(default)]
    pub description: Option<String>,
    pub price_cents: i64,
    #[serde(default)]
    pub child_prices: Vec<ChildPriceTier>,
    #[serde(default)]
    pub duration_days: Option<u32>,
    pub departure_date: NaiveDate,
    #[serde(default)]
    pub departure_time: Option<NaiveTime>,
    pub return_date: NaiveDate,
    #[serde(default)]
    pub return_time: Option<NaiveTime>,
    #[serde(default)]
    pub total_seats: Option<u32>,
    #[serde(default)]
    pub cover_image: Option<String>,
    #[serde(default)]
    pub gallery: Vec<String>,
    #[serde(default)]
    pub included: Vec<String>,
    #[serde(default)]
    pub excluded: Vec<String>,
    #[serde(default)]
    pub attractions: Vec<String>,
    #[serde(default)]
    pub status: PackageStatus,
    #[serde(default)]
    pub bus_id: Option<Uuid>,
}

impl PackageInput {
    pub fn validate(&self) -> Result<(), CatalogError> {
        if self.title.trim().is_empty() {
            return Err(CatalogError::MissingField("title"));
        }
        if self.destination.trim().is_empty() {
            return Err(CatalogError::MissingField("destination"));
        }
        if !(0..=MAX_PRICE_CENTS).contains(&self.price_cents) {
            return Err(CatalogError::InvalidField {
                field: "price_cents",
                reason: format!("must be between 0 and {}", MAX_PRICE_CENTS),
            });
        }
        if self.return_date < self.departure_date {
            return Err(CatalogError::InvalidField {
                field: "return_date",
                reason: "must not be before departure_date".into(),
            });
        }
        if self.total_seats == Some(0) {
            return Err(CatalogError::InvalidField {
                field: "total_seats",
                reason: "must be at least 1".into(),
            });
        }

        let mut tiers: Vec<&ChildPriceTier> = self.child_prices.iter().collect();
        tiers.sort_by_key(|t| t.min_age);
        for tier in &tiers {
            if tier.min_age > tier.max_age || !(0..=MAX_PRICE_CENTS).contains(&tier.price_cents) {
                return Err(CatalogError::InvalidField {
                    field: "child_prices",
                    reason: format!("bad tier {}-{}", tier.min_age, tier.max_age),
                });
            }
        }
        for pair in tiers.windows(2) {
            if pair[1].min_age <= pair[0].max_age {
                return Err(CatalogError::InvalidField {
                    field: "child_prices",
                    reason: "age bands overlap".into(),
                });
            }
        }

        Ok(())
    }

    /// Seat capacity comes from the payload, falling back to the assigned bus.
    pub fn resolve_total_seats(&self, bus: Option<&Bus>) -> Result<u32, CatalogError> {
        match (self.total_seats, bus) {
            (Some(requested), Some(bus)) if requested > bus.seat_count => Err(CatalogError::BusTooSmall {
                requested,
                available: bus.seat_count,
            }),
            (Some(requested), _) => Ok(requested),
            (None, Some(bus)) => Ok(bus.seat_count),
            (None, None) => Err(CatalogError::MissingField("total_seats")),
        }
    }

    fn duration(&self) -> u32 {
        self.duration_days.unwrap_or_else(|| {
            (self.return_date - self.departure_date).num_days() as u32 + 1
        })
    }

    pub fn into_package(self, total_seats: u32) -> Package {
        let now = Utc::now();
        let duration_days = self.duration();
        Package {
            id: Uuid::new_v4(),
            title: self.title.trim().to_string(),
            destination: self.destination.trim().to_string(),
            description: self.description,
            price_cents: self.price_cents,
            child_prices: self.child_prices,
            duration_days,
            departure_date: self.departure_date,
            departure_time: self.departure_time,
            return_date: self.return_date,
            return_time: self.return_time,
            total_seats,
            cover_image: self.cover_image,
            gallery: self.gallery,
            included: self.included,
            excluded: self.excluded,
            attractions: self.attractions,
            status: self.status,
            bus_id: self.bus_id,
            created_at: now,
            updated_at: now,
        }
    }

    /// Replaces every editable field of `existing`, keeping id and creation time.
    pub fn apply_to(self, existing: &Package, total_seats: u32) -> Package {
        let id = existing.id;
        let created_at = existing.created_at;
        let mut updated = self.into_package(total_seats);
        updated.id = id;
        updated.created_at = created_at;
        updated
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input() -> PackageInput {
        PackageInput {
            title: "Gramado e Canela".into(),
            destination: "Gramado - RS".into(),
            description: None,
            price_cents: 189_900,
            child_prices: vec![
                ChildPriceTier { min_age: 0, max_age: 5, price_cents: 0 },
                ChildPriceTier { min_age: 6, max_age: 11, price_cents: 94_950 },
            ],
            duration_days: None,
            departure_date: NaiveDate::from_ymd_opt(2026, 7, 10).unwrap(),
            departure_time: NaiveTime::from_hms_opt(21, 0, 0),
            return_date: NaiveDate::from_ymd_opt(2026, 7, 14).unwrap(),
            return_time: None,
            total_seats: Some(44),
            cover_image: None,
            gallery: vec![],
            included: vec!["Hotel".into()],
            excluded: vec![],
            attractions: vec![],
            status: PackageStatus::Published,
            bus_id: None,
        }
    }

    #[test]
    fn builds_package_with_derived_duration() {
        let input = input();
        input.validate().unwrap();
        let package = input.into_package(44);
        assert_eq!(package.duration_days, 5);
        assert_eq!(package.child_price_for(3), Some(0));
        assert_eq!(package.child_price_for(8), Some(94_950));
        assert_eq!(package.child_price_for(12), None);
    }

    #[test]
    fn rejects_return_before_departure() {
        let mut input = input();
        input.return_date = NaiveDate::from_ymd_opt(2026, 7, 1).unwrap();
        assert!(matches!(input.validate(), Err(CatalogError::InvalidField { field: "return_date", .. })));
    }

    #[test]
    fn rejects_prices_out_of_range() {
        let mut too_high = input();
        too_high.price_cents = MAX_PRICE_CENTS + 1;
        assert!(matches!(too_high.validate(), Err(CatalogError::InvalidField { field: "price_cents", .. })));

        let mut negative = input();
        negative.price_cents = -1;
        assert!(negative.validate().is_err());
    }

    #[test]
    fn rejects_overlapping_child_tiers() {
        let mut input = input();
        input.child_prices.push(ChildPriceTier { min_age: 10, max_age: 12, price_cents: 1 });
        assert!(input.validate().is_err());
    }

    #[test]
    fn seats_fall_back_to_bus_capacity() {
        let bus = Bus::for_tests(46);
        let mut input = input();
        input.total_seats = None;
        assert_eq!(input.resolve_total_seats(Some(&bus)), Ok(46));
        assert_eq!(input.resolve_total_seats(None), Err(CatalogError::MissingField("total_seats")));

        input.total_seats = Some(50);
        assert_eq!(
            input.resolve_total_seats(Some(&bus)),
            Err(CatalogError::BusTooSmall { requested: 50, available: 46 })
        );
    }
}
