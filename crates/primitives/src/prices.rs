//! Price series type definitions.

use serde::{Deserialize, Serialize};

use crate::Date;

/// A single observed price.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    /// Trading day.
    pub date: Date,
    /// Adjusted close.
    pub price: f64,
}

impl PricePoint {
    /// Create a new price point.
    #[must_use]
    pub const fn new(date: Date, price: f64) -> Self {
        Self { date, price }
    }
}

/// Daily price history for one entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceSeries {
    /// Entity identifier (ticker).
    pub entity: String,
    /// Observations, ordered by date.
    pub points: Vec<PricePoint>,
}

impl PriceSeries {
    /// Create a new price series, sorting the points by date.
    #[must_use]
    pub fn new(entity: impl Into<String>, mut points: Vec<PricePoint>) -> Self {
        points.sort_by_key(|p| p.date);
        Self { entity: entity.into(), points }
    }

    /// Number of observations.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.points.len()
    }

    /// Check if empty.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// First and last observed dates.
    #[must_use]
    pub fn date_range(&self) -> Option<(Date, Date)> {
        Some((self.points.first()?.date, self.points.last()?.date))
    }

    /// Drop every observation after `last`.
    #[must_use]
    pub fn truncate_after(mut self, last: Date) -> Self {
        self.points.retain(|p| p.date <= last);
        self
    }
}
