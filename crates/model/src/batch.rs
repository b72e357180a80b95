//! Batch orchestration over a list of entities.
//!
//! Factor data is fetched and normalized once per run. Each entity then goes
//! through prices, returns, alignment and regression independently; a failing
//! entity is recorded and skipped so the rest of the batch still completes.

use std::collections::HashSet;

use carhart_panel::{FactorSeries, align, compute_returns, normalize_factors};
use carhart_primitives::{
    CoefficientMatrix, CoefficientName, Date, FailureKind, FailureRecord, ResamplePeriod,
};
use carhart_traits::{CoefficientSink, FactorSource, PriceSource, SourceError};
use rayon::prelude::*;

use crate::{CarhartRegression, ModelError, RegressionConfig, RegressionFit};

/// Label given to the intercept row of the output table.
pub const DEFAULT_INTERCEPT_LABEL: &str = "FF-alpha";

/// Settings for one batch run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchConfig {
    /// Entity identifiers, in output column order.
    pub entities: Vec<String>,
    /// First price date requested.
    pub start: Date,
    /// Last price date requested.
    pub end: Date,
    /// Return resampling period.
    pub period: ResamplePeriod,
    /// Label replacing `Intercept` in the output table.
    pub intercept_label: String,
    /// Fan entities out over the rayon thread pool.
    pub parallel: bool,
    /// Regression settings.
    pub regression: RegressionConfig,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            entities: Vec::new(),
            start: Date::default(),
            end: Date::default(),
            period: ResamplePeriod::default(),
            intercept_label: DEFAULT_INTERCEPT_LABEL.to_string(),
            parallel: false,
            regression: RegressionConfig::default(),
        }
    }
}

impl BatchConfig {
    /// Create a config for `entities` over `[start, end]`.
    #[must_use]
    pub fn new<I, S>(entities: I, start: Date, end: Date) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            entities: entities.into_iter().map(Into::into).collect(),
            start,
            end,
            ..Self::default()
        }
    }

    /// Set the resampling period.
    #[must_use]
    pub const fn with_period(mut self, period: ResamplePeriod) -> Self {
        self.period = period;
        self
    }

    /// Set the intercept row label.
    #[must_use]
    pub fn with_intercept_label(mut self, label: impl Into<String>) -> Self {
        self.intercept_label = label.into();
        self
    }

    /// Enable or disable parallel processing.
    #[must_use]
    pub const fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Set the regression settings.
    #[must_use]
    pub const fn with_regression(mut self, regression: RegressionConfig) -> Self {
        self.regression = regression;
        self
    }

    /// Check the configuration before any data is fetched.
    ///
    /// # Errors
    /// Returns `Configuration` for an empty entity list, a blank or duplicate
    /// entity id, a start date after the end date, or a blank intercept label.
    pub fn validate(&self) -> Result<(), ModelError> {
        if self.entities.is_empty() {
            return Err(ModelError::Configuration("entity list is empty".to_string()));
        }

        let mut seen = HashSet::with_capacity(self.entities.len());
        for (i, entity) in self.entities.iter().enumerate() {
            if entity.trim().is_empty() {
                return Err(ModelError::Configuration(format!("blank entity id at position {i}")));
            }
            if !seen.insert(entity.as_str()) {
                return Err(ModelError::Configuration(format!("duplicate entity id {entity}")));
            }
        }

        if self.start > self.end {
            return Err(ModelError::Configuration(format!(
                "start date {} is after end date {}",
                self.start, self.end
            )));
        }

        if self.intercept_label.trim().is_empty() {
            return Err(ModelError::Configuration("intercept label is blank".to_string()));
        }

        Ok(())
    }
}

/// Result of a batch run.
#[derive(Debug, Clone)]
pub struct BatchOutput {
    /// One column per successful entity, in input order.
    pub coefficients: CoefficientMatrix,
    /// Skipped entities, in input order.
    pub failures: Vec<FailureRecord>,
    /// Fit diagnostics per successful entity, in input order.
    pub fits: Vec<(String, RegressionFit)>,
}

impl BatchOutput {
    /// Check if every entity succeeded.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    /// Number of entities with coefficients.
    #[must_use]
    pub fn n_succeeded(&self) -> usize {
        self.coefficients.n_columns()
    }
}

fn failure_record(entity: &str, err: &ModelError) -> FailureRecord {
    let kind = match err {
        ModelError::SourceData(_) => FailureKind::SourceData,
        ModelError::AlignmentEmpty { .. } => FailureKind::AlignmentEmpty,
        ModelError::RegressionUnderdetermined(_) => FailureKind::RegressionUnderdetermined,
        _ => FailureKind::Processing,
    };
    FailureRecord::new(entity, kind, err.to_string())
}

/// Runs the four-factor regression for every entity of a batch.
#[derive(Debug)]
pub struct BatchRunner<F, P> {
    factors: F,
    prices: P,
}

impl<F: FactorSource, P: PriceSource> BatchRunner<F, P> {
    /// Create a runner over a factor source and a price source.
    pub const fn new(factors: F, prices: P) -> Self {
        Self { factors, prices }
    }

    /// Run the batch.
    ///
    /// Per-entity errors are collected in [`BatchOutput::failures`]; the
    /// intercept row is relabeled after all entities are processed.
    ///
    /// # Errors
    /// Returns `Configuration` if the config is invalid (nothing is fetched),
    /// or `SourceData` if the factor data cannot be fetched or normalized.
    pub fn run(&self, config: &BatchConfig) -> Result<BatchOutput, ModelError> {
        config.validate()?;

        let span = tracing::info_span!("batch", entities = config.entities.len(), period = %config.period);
        let _guard = span.enter();

        let factors = self.load_factors()?;
        let regression = CarhartRegression::with_config(config.regression);

        let results: Vec<Result<RegressionFit, ModelError>> = if config.parallel {
            config
                .entities
                .par_iter()
                .map(|entity| self.fit_entity(&span, entity, &factors, &regression, config))
                .collect()
        } else {
            config
                .entities
                .iter()
                .map(|entity| self.fit_entity(&span, entity, &factors, &regression, config))
                .collect()
        };

        let mut coefficients = CoefficientMatrix::four_factor();
        let mut failures = Vec::new();
        let mut fits = Vec::new();
        for (entity, result) in config.entities.iter().zip(results) {
            match result {
                Ok(fit) => {
                    coefficients.push_column(entity.as_str(), &fit.coefficients);
                    fits.push((entity.clone(), fit));
                }
                Err(err) => {
                    tracing::warn!(%entity, error = %err, "skipping entity");
                    failures.push(failure_record(entity, &err));
                }
            }
        }

        coefficients.relabel_row(CoefficientName::Intercept.label(), config.intercept_label.as_str());

        tracing::info!(
            succeeded = coefficients.n_columns(),
            failed = failures.len(),
            "batch complete"
        );
        Ok(BatchOutput { coefficients, failures, fits })
    }

    /// Run the batch and hand the result to `sink`.
    ///
    /// The table is written even when every entity failed.
    ///
    /// # Errors
    /// Returns the errors of [`Self::run`], or `Sink` if writing fails.
    pub fn run_into<S: CoefficientSink>(
        &self,
        config: &BatchConfig,
        sink: &mut S,
    ) -> Result<BatchOutput, ModelError> {
        let output = self.run(config)?;
        sink.write_coefficients(&output.coefficients)?;
        sink.write_failures(&output.failures)?;
        Ok(output)
    }

    fn load_factors(&self) -> Result<FactorSeries, ModelError> {
        let tables = self.factors.fetch_factors()?;
        let series = normalize_factors(&tables)
            .map_err(|e| SourceError::malformed(self.factors.name(), e.to_string()))?;
        tracing::info!(source = self.factors.name(), months = series.len(), "loaded factor data");
        Ok(series)
    }

    /// Fit one entity against an already-normalized factor series.
    ///
    /// The entity span is a child of the caller's current span.
    ///
    /// # Errors
    /// Returns `SourceData` if prices cannot be fetched, `AlignmentEmpty` if
    /// no dates overlap, or `RegressionUnderdetermined` if the fit fails.
    pub fn process_entity(
        &self,
        entity: &str,
        factors: &FactorSeries,
        regression: &CarhartRegression,
        config: &BatchConfig,
    ) -> Result<RegressionFit, ModelError> {
        self.fit_entity(&tracing::Span::current(), entity, factors, regression, config)
    }

    // Rayon workers do not inherit the batch span, so the parent is explicit.
    fn fit_entity(
        &self,
        parent: &tracing::Span,
        entity: &str,
        factors: &FactorSeries,
        regression: &CarhartRegression,
        config: &BatchConfig,
    ) -> Result<RegressionFit, ModelError> {
        let span = tracing::info_span!(parent: parent, "entity", %entity);
        let _guard = span.enter();

        let prices = self.prices.fetch_prices(entity, config.start, config.end)?;
        let prices = match factors.last_date()? {
            Some(last) => prices.truncate_after(last),
            None => prices,
        };

        let returns = compute_returns(&prices, config.period)?;
        let panel = align(&returns, factors)?;
        let fit = regression.fit(&panel)?;

        tracing::debug!(
            n_obs = fit.n_obs,
            dropped = fit.dropped_rows,
            r_squared = fit.r_squared,
            "fitted entity"
        );
        Ok(fit)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use approx::assert_relative_eq;
    use carhart_primitives::{FactorTables, PricePoint, PriceSeries, RawFactorRow, RawFactorTable};
    use carhart_traits::SinkError;
    use rstest::rstest;

    use super::*;

    fn d(y: i32, m: u32, day: u32) -> Date {
        Date::from_ymd_opt(y, m, day).unwrap()
    }

    /// 24 months of factors, Jan 2022 to Dec 2023, in percent.
    fn factor_tables() -> FactorTables {
        let mut three = Vec::new();
        let mut mom = Vec::new();
        for i in 0..24 {
            let key = format!("{}{:02}", 2022 + i / 12, i % 12 + 1);
            let t = f64::from(i);
            three.push(RawFactorRow::new(
                key.as_str(),
                vec![
                    Some(4.0 * (0.7 * t).sin()),
                    Some(2.0 * (1.3 * t).cos()),
                    Some(3.0 * (0.4 * t + 1.0).sin()),
                    Some(0.1 + 0.01 * t),
                ],
            ));
            mom.push(RawFactorRow::new(key.as_str(), vec![Some(2.5 * (2.1 * t).cos())]));
        }
        three.push(RawFactorRow::new(" Annual Factors: January-December ", vec![None; 4]));
        FactorTables::new(
            RawFactorTable::new(
                ["Mkt-RF", "SMB", "HML", "RF"].iter().map(|s| (*s).to_string()).collect(),
                three,
            ),
            RawFactorTable::new(vec!["Mom   ".to_string()], mom),
        )
    }

    /// Two observations a month from Dec 2021 through Dec 2023.
    fn monthly_prices(seed: f64) -> Vec<PricePoint> {
        let mut points = Vec::new();
        let mut price = 100.0;
        for i in 0..25 {
            let (y, m) = if i == 0 { (2021, 12) } else { (2022 + (i - 1) / 12, (i - 1) % 12 + 1) };
            price *= 1.0 + 0.01 * (seed * f64::from(i)).sin() + 0.004;
            points.push(PricePoint::new(d(y, m as u32, 10), price * 0.99));
            points.push(PricePoint::new(d(y, m as u32, 25), price));
        }
        points
    }

    struct CountingFactors {
        tables: FactorTables,
        calls: AtomicUsize,
    }

    impl CountingFactors {
        fn new() -> Self {
            Self { tables: factor_tables(), calls: AtomicUsize::new(0) }
        }
    }

    impl FactorSource for CountingFactors {
        fn fetch_factors(&self) -> Result<FactorTables, SourceError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.tables.clone())
        }

        fn name(&self) -> &str {
            "counting"
        }
    }

    impl FactorSource for &CountingFactors {
        fn fetch_factors(&self) -> Result<FactorTables, SourceError> {
            (*self).fetch_factors()
        }

        fn name(&self) -> &str {
            "counting"
        }
    }

    struct UnreachableFactors;

    impl FactorSource for UnreachableFactors {
        fn fetch_factors(&self) -> Result<FactorTables, SourceError> {
            Err(SourceError::Unreachable("connection refused".to_string()))
        }

        fn name(&self) -> &str {
            "unreachable"
        }
    }

    struct MapPrices(HashMap<String, Vec<PricePoint>>);

    impl MapPrices {
        fn abc() -> Self {
            let mut map = HashMap::new();
            map.insert("A".to_string(), monthly_prices(0.9));
            // B trades only in 2010, long before the factor window.
            map.insert(
                "B".to_string(),
                (1..=12).map(|m| PricePoint::new(d(2010, m, 15), 50.0 + f64::from(m))).collect(),
            );
            map.insert("C".to_string(), monthly_prices(1.7));
            Self(map)
        }
    }

    impl PriceSource for MapPrices {
        fn fetch_prices(
            &self,
            entity: &str,
            start: Date,
            end: Date,
        ) -> Result<PriceSeries, SourceError> {
            let points = self.0.get(entity).ok_or_else(|| SourceError::Empty(entity.to_string()))?;
            let points =
                points.iter().filter(|p| p.date >= start && p.date <= end).copied().collect();
            Ok(PriceSeries::new(entity, points))
        }

        fn name(&self) -> &str {
            "map"
        }
    }

    fn config(entities: &[&str]) -> BatchConfig {
        BatchConfig::new(entities.iter().copied(), d(2021, 1, 1), d(2024, 6, 30))
    }

    #[test]
    fn single_entity_table_shape() {
        let runner = BatchRunner::new(CountingFactors::new(), MapPrices::abc());
        let output = runner.run(&config(&["A"])).unwrap();

        assert_eq!(output.coefficients.n_rows(), 5);
        assert_eq!(output.coefficients.entities(), &["A".to_string()]);
        assert_eq!(
            output.coefficients.row_labels(),
            &["FF-alpha", "mkt_excess", "SMB", "HML", "mom"].map(String::from)
        );
        assert!(output.is_complete());
        assert_eq!(output.fits[0].1.n_obs, 24);
    }

    #[rstest]
    #[case(false)]
    #[case(true)]
    fn disjoint_entity_is_skipped(#[case] parallel: bool) {
        let runner = BatchRunner::new(CountingFactors::new(), MapPrices::abc());
        let output = runner.run(&config(&["A", "B", "C"]).with_parallel(parallel)).unwrap();

        assert_eq!(output.coefficients.entities(), &["A".to_string(), "C".to_string()]);
        assert_eq!(output.failures.len(), 1);
        assert_eq!(output.failures[0].entity, "B");
        assert_eq!(output.failures[0].kind, FailureKind::AlignmentEmpty);
        assert_eq!(output.n_succeeded(), 2);
    }

    #[test]
    fn parallel_matches_sequential() {
        let runner = BatchRunner::new(CountingFactors::new(), MapPrices::abc());
        let seq = runner.run(&config(&["C", "A"])).unwrap();
        let par = runner.run(&config(&["C", "A"]).with_parallel(true)).unwrap();

        assert_eq!(par.coefficients.entities(), seq.coefficients.entities());
        for entity in ["A", "C"] {
            let a = seq.coefficients.column(entity).unwrap();
            let b = par.coefficients.column(entity).unwrap();
            for (x, y) in a.iter().zip(b) {
                assert_relative_eq!(*x, *y, epsilon = 1e-12);
            }
        }
    }

    #[test]
    fn unknown_entity_is_source_failure() {
        let runner = BatchRunner::new(CountingFactors::new(), MapPrices::abc());
        let output = runner.run(&config(&["ZZZ", "A"])).unwrap();

        assert_eq!(output.coefficients.entities(), &["A".to_string()]);
        assert_eq!(output.failures[0].kind, FailureKind::SourceData);
    }

    #[test]
    fn all_failed_batch_has_empty_table() {
        let runner = BatchRunner::new(CountingFactors::new(), MapPrices::abc());
        let output = runner.run(&config(&["B", "Q"])).unwrap();

        assert_eq!(output.coefficients.n_columns(), 0);
        assert_eq!(output.coefficients.n_rows(), 5);
        assert_eq!(output.failures.len(), 2);
    }

    #[test]
    fn factors_fetched_once() {
        let factors = CountingFactors::new();
        let runner = BatchRunner::new(&factors, MapPrices::abc());
        runner.run(&config(&["A", "B", "C"])).unwrap();
        assert_eq!(factors.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn month_without_prices_drops_adjacent_returns() {
        let mut prices = MapPrices::abc();
        let june = d(2022, 6, 1)..=d(2022, 6, 30);
        let gapped: Vec<PricePoint> =
            monthly_prices(0.9).into_iter().filter(|p| !june.contains(&p.date)).collect();
        prices.0.insert("G".to_string(), gapped);

        let runner = BatchRunner::new(CountingFactors::new(), prices);
        let output = runner.run(&config(&["A", "G"])).unwrap();

        let (_, full) = &output.fits[0];
        let (_, gapped) = &output.fits[1];
        assert_eq!(full.dropped_rows, 0);
        assert_eq!(gapped.n_obs, full.n_obs - 2);
        assert_eq!(gapped.dropped_rows, 2);
    }

    #[test]
    fn custom_intercept_label() {
        let runner = BatchRunner::new(CountingFactors::new(), MapPrices::abc());
        let output = runner.run(&config(&["A"]).with_intercept_label("alpha")).unwrap();
        assert_eq!(output.coefficients.row_labels()[0], "alpha");
        assert!(output.coefficients.get("alpha", "A").is_some());
    }

    #[rstest]
    #[case(BatchConfig::new(Vec::<String>::new(), d(2020, 1, 1), d(2021, 1, 1)))]
    #[case(BatchConfig::new(["A", " "], d(2020, 1, 1), d(2021, 1, 1)))]
    #[case(BatchConfig::new(["A", "A"], d(2020, 1, 1), d(2021, 1, 1)))]
    #[case(BatchConfig::new(["A"], d(2021, 1, 1), d(2020, 1, 1)))]
    #[case(BatchConfig::new(["A"], d(2020, 1, 1), d(2021, 1, 1)).with_intercept_label(""))]
    fn invalid_config_fails_before_fetch(#[case] config: BatchConfig) {
        let factors = CountingFactors::new();
        let runner = BatchRunner::new(&factors, MapPrices::abc());
        let err = runner.run(&config).unwrap_err();

        assert!(matches!(err, ModelError::Configuration(_)));
        assert!(!err.is_recoverable());
        assert_eq!(factors.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn factor_fetch_failure_is_fatal() {
        let runner = BatchRunner::new(UnreachableFactors, MapPrices::abc());
        let err = runner.run(&config(&["A"])).unwrap_err();
        assert!(matches!(err, ModelError::SourceData(_)));
    }

    #[test]
    fn malformed_factor_data_is_source_error() {
        struct Broken;
        impl FactorSource for Broken {
            fn fetch_factors(&self) -> Result<FactorTables, SourceError> {
                Ok(FactorTables::new(
                    RawFactorTable::new(vec!["Mkt-RF".to_string()], vec![]),
                    RawFactorTable::new(vec!["Mom".to_string()], vec![]),
                ))
            }

            fn name(&self) -> &str {
                "broken"
            }
        }

        let runner = BatchRunner::new(Broken, MapPrices::abc());
        let err = runner.run(&config(&["A"])).unwrap_err();
        assert!(matches!(err, ModelError::SourceData(SourceError::Malformed { .. })));
    }

    #[derive(Default)]
    struct RecordingSink {
        tables: Vec<CoefficientMatrix>,
        failures: Vec<FailureRecord>,
    }

    impl CoefficientSink for RecordingSink {
        fn write_coefficients(&mut self, matrix: &CoefficientMatrix) -> Result<(), SinkError> {
            self.tables.push(matrix.clone());
            Ok(())
        }

        fn write_failures(&mut self, failures: &[FailureRecord]) -> Result<(), SinkError> {
            self.failures.extend_from_slice(failures);
            Ok(())
        }
    }

    #[test]
    fn run_into_writes_table_and_failures() {
        let runner = BatchRunner::new(CountingFactors::new(), MapPrices::abc());
        let mut sink = RecordingSink::default();
        let output = runner.run_into(&config(&["A", "B"]), &mut sink).unwrap();

        assert_eq!(sink.tables.len(), 1);
        assert_eq!(sink.tables[0].entities(), output.coefficients.entities());
        assert_eq!(sink.failures, output.failures);
    }

    /// Records each span's name and explicit parent.
    #[derive(Default)]
    struct SpanTree {
        next_id: std::sync::atomic::AtomicU64,
        spans: std::sync::Mutex<Vec<(u64, &'static str, Option<u64>)>>,
    }

    impl tracing::Subscriber for SpanTree {
        fn enabled(&self, _: &tracing::Metadata<'_>) -> bool {
            true
        }

        fn new_span(&self, attrs: &tracing::span::Attributes<'_>) -> tracing::span::Id {
            let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
            let parent = attrs.parent().map(tracing::span::Id::into_u64);
            self.spans.lock().unwrap().push((id, attrs.metadata().name(), parent));
            tracing::span::Id::from_u64(id)
        }

        fn record(&self, _: &tracing::span::Id, _: &tracing::span::Record<'_>) {}

        fn record_follows_from(&self, _: &tracing::span::Id, _: &tracing::span::Id) {}

        fn event(&self, _: &tracing::Event<'_>) {}

        fn enter(&self, _: &tracing::span::Id) {}

        fn exit(&self, _: &tracing::span::Id) {}
    }

    #[rstest]
    #[case(false)]
    #[case(true)]
    fn entity_spans_are_children_of_batch_span(#[case] parallel: bool) {
        let tree = std::sync::Arc::new(SpanTree::default());
        let dispatch = tracing::Dispatch::from(std::sync::Arc::clone(&tree));

        let worker_dispatch = dispatch.clone();
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(3)
            .spawn_handler(move |thread| {
                let d = worker_dispatch.clone();
                std::thread::spawn(move || tracing::dispatcher::with_default(&d, || thread.run()));
                Ok(())
            })
            .build()
            .unwrap();

        let runner = BatchRunner::new(CountingFactors::new(), MapPrices::abc());
        let config = config(&["A", "B", "C"]).with_parallel(parallel);
        let output = pool
            .install(|| tracing::dispatcher::with_default(&dispatch, || runner.run(&config)))
            .unwrap();
        assert_eq!(output.n_succeeded(), 2);

        let spans = tree.spans.lock().unwrap().clone();
        let batch: Vec<u64> =
            spans.iter().filter(|(_, name, _)| *name == "batch").map(|(id, _, _)| *id).collect();
        assert_eq!(batch.len(), 1);

        let entity_parents: Vec<Option<u64>> = spans
            .iter()
            .filter(|(_, name, _)| *name == "entity")
            .map(|(_, _, parent)| *parent)
            .collect();
        assert_eq!(entity_parents, vec![Some(batch[0]); 3]);
    }
}
