use roteiro_catalog::Package;
use serde::Serialize;

use crate::BookingError;

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ChildLine {
    pub age: u8,
    pub price_cents: i64,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct PriceQuote {
    pub unit_price_cents: i64,
    pub adults: u32,
    pub children: Vec<ChildLine>,
    pub total_cents: i64,
}

/// Prices a booking in integer cents.
///
/// Without child ages this is exactly `price × passengers`. Each listed child
/// age that falls in one of the package's tiers pays the tier price instead;
/// ages outside every tier pay full price.
pub fn quote(package: &Package, passengers: u32, child_ages: &[u8]) -> Result<PriceQuote, BookingError> {
    if passengers == 0 {
        return Err(BookingError::Invalid("at least one passenger is required".into()));
    }
    if child_ages.len() as u32 > passengers {
        return Err(BookingError::Invalid(format!(
            "{} child ages given for {} passengers",
            child_ages.len(),
            passengers
        )));
    }

    let adults = passengers - child_ages.len() as u32;
    let children: Vec<ChildLine> = child_ages
        .iter()
        .map(|&age| ChildLine {
            age,
            price_cents: package.child_price_for(age).unwrap_or(package.price_cents),
        })
        .collect();

    let overflow = || BookingError::Invalid("total exceeds supported amount".into());
    let adult_total = package
        .price_cents
        .checked_mul(adults as i64)
        .ok_or_else(overflow)?;
    let total_cents = children
        .iter()
        .try_fold(adult_total, |acc, line| acc.checked_add(line.price_cents))
        .ok_or_else(overflow)?;

    Ok(PriceQuote {
        unit_price_cents: package.price_cents,
        adults,
        children,
        total_cents,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use roteiro_catalog::{ChildPriceTier, PackageInput, PackageStatus};

    pub(crate) fn package(price: i64) -> Package {
        PackageInput {
            title: "Foz do Iguaçu".into(),
            destination: "Foz do Iguaçu - PR".into(),
            description: None,
            price_cents: price,
            child_prices: vec![ChildPriceTier { min_age: 0, max_age: 5, price_cents: 0 }],
            duration_days: None,
            departure_date: NaiveDate::from_ymd_opt(2026, 9, 1).unwrap(),
            departure_time: None,
            return_date: NaiveDate::from_ymd_opt(2026, 9, 4).unwrap(),
            return_time: None,
            total_seats: Some(40),
            cover_image: None,
            gallery: vec![],
            included: vec![],
            excluded: vec![],
            attractions: vec![],
            status: PackageStatus::Published,
            bus_id: None,
        }
        .into_package(40)
    }

    #[test]
    fn total_is_price_times_passengers() {
        let pkg = package(129_990);
        for passengers in [1u32, 2, 7, 40] {
            let q = quote(&pkg, passengers, &[]).unwrap();
            assert_eq!(q.total_cents, 129_990 * passengers as i64);
        }
    }

    #[test]
    fn children_use_tier_price_when_matched() {
        let pkg = package(100_000);
        let q = quote(&pkg, 3, &[4, 9]).unwrap();
        assert_eq!(q.adults, 1);
        assert_eq!(q.children[0].price_cents, 0);
        assert_eq!(q.children[1].price_cents, 100_000);
        assert_eq!(q.total_cents, 200_000);
    }

    #[test]
    fn rejects_zero_passengers_and_extra_children() {
        let pkg = package(100_000);
        assert!(quote(&pkg, 0, &[]).is_err());
        assert!(quote(&pkg, 1, &[2, 3]).is_err());
    }
}
