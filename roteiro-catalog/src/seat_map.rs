//! 2+2 coach layout and the seat selection model behind the booking widget.
//!
//! Seats are numbered `1..=total_seats` and laid out four per row: two left
//! of the aisle, two right. The last row may be partial.

use std::collections::BTreeSet;
use std::fmt;

use serde::Serialize;

pub const SEATS_PER_ROW: u32 = 4;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum SeatError {
    #[error("Seat {seat} does not exist (bus has {total} seats)")]
    OutOfRange { seat: u32, total: u32 },

    #[error("Seat {0} was selected more than once")]
    Duplicate(u32),

    #[error("Seats already taken: {0:?}")]
    Taken(Vec<u32>),

    #[error("Expected {expected} seats, got {actual}")]
    CountMismatch { expected: usize, actual: usize },
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct SeatRow {
    pub row: u32,
    pub left: [Option<u32>; 2],
    pub right: [Option<u32>; 2],
}

/// Occupancy snapshot for one package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeatMap {
    total_seats: u32,
    occupied: BTreeSet<u32>,
}

impl SeatMap {
    /// Out-of-range occupied numbers are dropped.
    pub fn new(total_seats: u32, occupied: impl IntoIterator<Item = u32>) -> Self {
        let occupied = occupied
            .into_iter()
            .filter(|seat| (1..=total_seats).contains(seat))
            .collect();
        Self { total_seats, occupied }
    }

    pub fn total_seats(&self) -> u32 {
        self.total_seats
    }

    pub fn row_count(&self) -> u32 {
        self.total_seats.div_ceil(SEATS_PER_ROW)
    }

    pub fn contains(&self, seat: u32) -> bool {
        (1..=self.total_seats).contains(&seat)
    }

    pub fn is_occupied(&self, seat: u32) -> bool {
        self.occupied.contains(&seat)
    }

    pub fn is_available(&self, seat: u32) -> bool {
        self.contains(seat) && !self.is_occupied(seat)
    }

    /// Ascending, duplicate free.
    pub fn occupied(&self) -> Vec<u32> {
        self.occupied.iter().copied().collect()
    }

    pub fn available_count(&self) -> u32 {
        self.total_seats - self.occupied.len() as u32
    }

    pub fn rows(&self) -> Vec<SeatRow> {
        let seat = |n: u32| (n <= self.total_seats).then_some(n);
        (0..self.row_count())
            .map(|r| {
                let first = r * SEATS_PER_ROW + 1;
                SeatRow {
                    row: r + 1,
                    left: [seat(first), seat(first + 1)],
                    right: [seat(first + 2), seat(first + 3)],
                }
            })
            .collect()
    }

    /// Checks a requested seat list against this map and returns it sorted.
    pub fn claim(&self, requested: &[u32]) -> Result<Vec<u32>, SeatError> {
        let mut seen = BTreeSet::new();
        for &seat in requested {
            if !self.contains(seat) {
                return Err(SeatError::OutOfRange { seat, total: self.total_seats });
            }
            if !seen.insert(seat) {
                return Err(SeatError::Duplicate(seat));
            }
        }

        let taken: Vec<u32> = seen.iter().copied().filter(|s| self.is_occupied(*s)).collect();
        if !taken.is_empty() {
            return Err(SeatError::Taken(taken));
        }

        Ok(seen.into_iter().collect())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToggleOutcome {
    Added,
    Removed,
    /// Occupied or nonexistent seat.
    Ignored,
    LimitReached,
}

type ChangeListener = Box<dyn FnMut(&[u32]) + Send>;

/// Controlled seat picker state. Never holds occupied seats and never grows
/// past `max_selectable`.
pub struct SeatSelection {
    map: SeatMap,
    max_selectable: usize,
    selected: BTreeSet<u32>,
    on_change: Option<ChangeListener>,
}

impl fmt::Debug for SeatSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SeatSelection")
            .field("map", &self.map)
            .field("max_selectable", &self.max_selectable)
            .field("selected", &self.selected)
            .finish()
    }
}

impl SeatSelection {
    pub fn new(map: SeatMap, max_selectable: usize, preselected: &[u32]) -> Self {
        let selected = preselected
            .iter()
            .copied()
            .filter(|s| map.is_available(*s))
            .collect::<BTreeSet<_>>()
            .into_iter()
            .take(max_selectable)
            .collect();
        Self {
            map,
            max_selectable,
            selected,
            on_change: None,
        }
    }

    /// Registers a callback fired with the full ascending selection after every change.
    pub fn on_change(mut self, listener: impl FnMut(&[u32]) + Send + 'static) -> Self {
        self.on_change = Some(Box::new(listener));
        self
    }

    pub fn toggle(&mut self, seat: u32) -> ToggleOutcome {
        let outcome = if self.selected.contains(&seat) {
            self.selected.remove(&seat);
            ToggleOutcome::Removed
        } else if !self.map.is_available(seat) {
            ToggleOutcome::Ignored
        } else if self.selected.len() >= self.max_selectable {
            ToggleOutcome::LimitReached
        } else {
            self.selected.insert(seat);
            ToggleOutcome::Added
        };

        if matches!(outcome, ToggleOutcome::Added | ToggleOutcome::Removed) {
            let current = self.selected();
            if let Some(listener) = self.on_change.as_mut() {
                listener(&current);
            }
        }
        outcome
    }

    pub fn selected(&self) -> Vec<u32> {
        self.selected.iter().copied().collect()
    }

    pub fn is_complete(&self) -> bool {
        self.selected.len() == self.max_selectable
    }

    pub fn map(&self) -> &SeatMap {
        &self.map
    }
}
