use chrono::NaiveDate;
use serde::Deserialize;

use crate::package::{Package, PackageStatus};

/// Storefront/admin listing filter. Every field is optional and they combine with AND.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PackageFilter {
    /// Case-insensitive match against title or destination.
    pub q: Option<String>,
    pub destination: Option<String>,
    pub min_price: Option<i64>,
    pub max_price: Option<i64>,
    pub departure_from: Option<NaiveDate>,
    pub departure_to: Option<NaiveDate>,
    pub status: Option<PackageStatus>,
}

impl PackageFilter {
    /// Storefront visitors only ever see published packages.
    pub fn published_only(mut self) -> Self {
        self.status = Some(PackageStatus::Published);
        self
    }

    pub fn matches(&self, package: &Package) -> bool {
        if let Some(status) = self.status {
            if package.status != status {
                return false;
            }
        }
        if let Some(q) = self.q.as_deref().map(str::trim).filter(|q| !q.is_empty()) {
            let q = q.to_lowercase();
            if !package.title.to_lowercase().contains(&q) && !package.destination.to_lowercase().contains(&q) {
                return false;
            }
        }
        if let Some(dest) = self.destination.as_deref().map(str::trim).filter(|d| !d.is_empty()) {
            if !package.destination.to_lowercase().contains(&dest.to_lowercase()) {
                return false;
            }
        }
        if self.min_price.is_some_and(|min| package.price_cents < min) {
            return false;
        }
        if self.max_price.is_some_and(|max| package.price_cents > max) {
            return false;
        }
        if self.departure_from.is_some_and(|from| package.departure_date < from) {
            return false;
        }
        if self.departure_to.is_some_and(|to| package.departure_date > to) {
            return false;
        }
        true
    }

    /// Filters and orders by departure date, then title.
    pub fn apply(&self, packages: Vec<Package>) -> Vec<Package> {
        let mut matched: Vec<Package> = packages.into_iter().filter(|p| self.matches(p)).collect();
        matched.sort_by(|a, b| {
            a.departure_date
                .cmp(&b.departure_date)
                .then_with(|| a.title.cmp(&b.title))
        });
        matched
    }
}
