//! Daily adjusted closes from Yahoo Finance.

use std::time::Duration;

use carhart_primitives::{Date, PricePoint, PriceSeries};
use carhart_traits::{PriceSource, SourceError};
use time::OffsetDateTime;
use tokio::runtime::Runtime;
use tokio::time::sleep;
use yahoo_finance_api as yahoo;

use crate::IoError;

/// Retry and throttling settings for [`YahooPriceSource`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct YahooConfig {
    /// Extra attempts after a failed request.
    pub retries: u32,
    /// Wait between attempts.
    pub retry_delay: Duration,
    /// Wait after every request.
    pub throttle: Duration,
}

impl Default for YahooConfig {
    fn default() -> Self {
        Self {
            retries: 3,
            retry_delay: Duration::from_secs(2),
            throttle: Duration::from_millis(500),
        }
    }
}

/// Price source backed by the Yahoo Finance chart API.
///
/// The source owns a tokio runtime so it can be used from synchronous batch
/// code, including rayon worker threads.
pub struct YahooPriceSource {
    connector: yahoo::YahooConnector,
    runtime: Runtime,
    config: YahooConfig,
}

impl std::fmt::Debug for YahooPriceSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("YahooPriceSource").field("config", &self.config).finish_non_exhaustive()
    }
}

impl YahooPriceSource {
    /// Create a source with default retry settings.
    ///
    /// # Errors
    /// Returns an error if the HTTP client or runtime cannot be created.
    pub fn new() -> Result<Self, IoError> {
        Self::with_config(YahooConfig::default())
    }

    /// Create a source with custom retry settings.
    ///
    /// # Errors
    /// Returns an error if the HTTP client or runtime cannot be created.
    pub fn with_config(config: YahooConfig) -> Result<Self, IoError> {
        let connector = yahoo::YahooConnector::new().map_err(|e| IoError::Yahoo(e.to_string()))?;
        let runtime = tokio::runtime::Builder::new_multi_thread().enable_all().build()?;
        Ok(Self { connector, runtime, config })
    }

    /// Get the configuration.
    #[must_use]
    pub const fn config(&self) -> &YahooConfig {
        &self.config
    }

    async fn fetch_with_retry(
        &self,
        entity: &str,
        start: OffsetDateTime,
        end: OffsetDateTime,
    ) -> Result<Vec<PricePoint>, SourceError> {
        let mut attempt = 0;
        loop {
            let result = self.fetch_once(entity, start, end).await;
            sleep(self.config.throttle).await;

            match result {
                Err(err) if err.is_transient() && attempt < self.config.retries => {
                    attempt += 1;
                    tracing::warn!(%entity, attempt, error = %err, "retrying price request");
                    sleep(self.config.retry_delay).await;
                }
                other => return other,
            }
        }
    }

    async fn fetch_once(
        &self,
        entity: &str,
        start: OffsetDateTime,
        end: OffsetDateTime,
    ) -> Result<Vec<PricePoint>, SourceError> {
        let response = self
            .connector
            .get_quote_history(entity, start, end)
            .await
            .map_err(|e| SourceError::Unreachable(format!("{entity}: {e}")))?;

        let quotes = response.quotes().map_err(|_| SourceError::Empty(entity.to_string()))?;

        Ok(quotes
            .iter()
            .filter_map(|q| {
                let ts = i64::try_from(q.timestamp).ok()?;
                let date = chrono::DateTime::from_timestamp(ts, 0)?.date_naive();
                Some(PricePoint::new(date, q.adjclose))
            })
            .collect())
    }
}

fn to_offset(date: Date) -> Result<OffsetDateTime, IoError> {
    let ts = date.and_hms_opt(0, 0, 0).map(|dt| dt.and_utc().timestamp()).unwrap_or_default();
    OffsetDateTime::from_unix_timestamp(ts).map_err(|e| IoError::TimeConversion(e.to_string()))
}

impl PriceSource for YahooPriceSource {
    fn fetch_prices(
        &self,
        entity: &str,
        start: Date,
        end: Date,
    ) -> Result<PriceSeries, SourceError> {
        let from = to_offset(start)?;
        // The end bound is exclusive on the API side.
        let to = to_offset(end.succ_opt().unwrap_or(end))?;

        let points = self.runtime.block_on(self.fetch_with_retry(entity, from, to))?;
        if points.is_empty() {
            return Err(SourceError::Empty(entity.to_string()));
        }

        tracing::debug!(%entity, quotes = points.len(), "fetched prices");
        Ok(PriceSeries::new(entity, points))
    }

    fn name(&self) -> &str {
        "yahoo"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = YahooConfig::default();
        assert_eq!(config.retries, 3);
        assert_eq!(config.retry_delay, Duration::from_secs(2));
    }

    #[test]
    fn date_to_offset_is_midnight_utc() {
        let date = Date::from_ymd_opt(2024, 3, 15).unwrap();
        let offset = to_offset(date).unwrap();
        assert_eq!(offset.unix_timestamp(), 1_710_460_800);
    }
}
