use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::CatalogError;

/// A coach in the agency's fleet.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Bus {
    pub id: Uuid,
    pub model: String,
    pub year: i32,
    pub plate: String,
    pub seat_count: u32,
    pub floor_count: u32,
    pub photos: Vec<String>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Upper bound for `seat_count`; double-deck coaches seat around 70.
pub const MAX_BUS_SEATS: u32 = 100;

fn default_floors() -> u32 {
    1
}

fn default_active() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BusInput {
    pub model: String,
    pub year: i32,
    pub plate: String,
    pub seat_count: u32,
    #[serde(default = "default_floors")]
    pub floor_count: u32,
    #[serde(default)]
    pub photos: Vec<String>,
    #[serde(default = "default_active")]
    pub active: bool,
}

impl BusInput {
    pub fn validate(&self) -> Result<(), CatalogError> {
        if self.model.trim().is_empty() {
            return Err(CatalogError::MissingField("model"));
        }
        if self.plate.trim().is_empty() {
            return Err(CatalogError::MissingField("plate"));
        }
        if !(1..=MAX_BUS_SEATS).contains(&self.seat_count) {
            return Err(CatalogError::InvalidField {
                field: "seat_count",
                reason: format!("must be between 1 and {}", MAX_BUS_SEATS),
            });
        }
        if !(1..=2).contains(&self.floor_count) {
            return Err(CatalogError::InvalidField {
                field: "floor_count",
                reason: "buses have one or two floors".into(),
            });
        }
        let next_year = Utc::now().year() + 1;
        if self.year < 1950 || self.year > next_year {
            return Err(CatalogError::InvalidField {
                field: "year",
                reason: format!("must be between 1950 and {}", next_year),
            });
        }
        Ok(())
    }

    pub fn into_bus(self) -> Bus {
        let now = Utc::now();
        Bus {
            id: Uuid::new_v4(),
            model: self.model.trim().to_string(),
            year: self.year,
            plate: normalize_plate(&self.plate),
            seat_count: self.seat_count,
            floor_count: self.floor_count,
            photos: self.photos,
            active: self.active,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn apply_to(self, existing: &Bus) -> Bus {
        let mut bus = self.into_bus();
        bus.id = existing.id;
        bus.created_at = existing.created_at;
        bus
    }
}

/// Plates are stored upper-case without spaces or dashes (`abc-1d23` -> `ABC1D23`).
pub fn normalize_plate(plate: &str) -> String {
    plate
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_uppercase())
        .collect()
}

#[cfg(test)]
impl Bus {
    pub(crate) fn for_tests(seat_count: u32) -> Self {
        BusInput {
            model: "Marcopolo Paradiso G7".into(),
            year: 2022,
            plate: "ABC-1D23".into(),
            seat_count,
            floor_count: 1,
            photos: vec![],
            active: true,
        }
        .into_bus()
    }
}
