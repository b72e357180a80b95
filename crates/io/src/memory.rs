//! In-memory sources for tests, demos and pre-fetched data.

use std::collections::HashMap;

use carhart_primitives::{Date, FactorTables, PricePoint, PriceSeries};
use carhart_traits::{FactorSource, PriceSource, SourceError};

/// Factor source serving a fixed pair of tables.
#[derive(Debug, Clone, Default)]
pub struct StaticFactorSource {
    tables: FactorTables,
}

impl StaticFactorSource {
    /// Serve `tables` on every fetch.
    #[must_use]
    pub const fn new(tables: FactorTables) -> Self {
        Self { tables }
    }
}

impl FactorSource for StaticFactorSource {
    fn fetch_factors(&self) -> Result<FactorTables, SourceError> {
        Ok(self.tables.clone())
    }

    fn name(&self) -> &str {
        "static-factors"
    }
}

/// Price source serving fixed daily prices per entity.
#[derive(Debug, Clone, Default)]
pub struct StaticPriceSource {
    prices: HashMap<String, Vec<PricePoint>>,
}

impl StaticPriceSource {
    /// Create an empty source.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace the prices of one entity.
    #[must_use]
    pub fn with_prices(mut self, entity: impl Into<String>, points: Vec<PricePoint>) -> Self {
        self.insert(entity, points);
        self
    }

    /// Add or replace the prices of one entity.
    pub fn insert(&mut self, entity: impl Into<String>, points: Vec<PricePoint>) {
        self.prices.insert(entity.into(), points);
    }

    /// Number of entities with prices.
    #[must_use]
    pub fn len(&self) -> usize {
        self.prices.len()
    }

    /// Check if empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.prices.is_empty()
    }
}

impl PriceSource for StaticPriceSource {
    fn fetch_prices(
        &self,
        entity: &str,
        start: Date,
        end: Date,
    ) -> Result<PriceSeries, SourceError> {
        let points: Vec<PricePoint> = self
            .prices
            .get(entity)
            .into_iter()
            .flatten()
            .filter(|p| p.date >= start && p.date <= end)
            .copied()
            .collect();

        if points.is_empty() {
            return Err(SourceError::Empty(entity.to_string()));
        }
        Ok(PriceSeries::new(entity, points))
    }

    fn name(&self) -> &str {
        "static-prices"
    }
}
