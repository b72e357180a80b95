//! Four-factor OLS regression for one entity.

use carhart_math::{MathError, ordinary_least_squares, with_intercept};
use carhart_panel::AlignedPanel;
use carhart_primitives::{CoefficientName, CoefficientVector, columns};
use ndarray::{Array1, Array2};

use crate::ModelError;

/// Minimum usable observations for a four-factor fit.
const DEFAULT_MIN_OBSERVATIONS: usize = 5;

/// Regression settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegressionConfig {
    /// Fits with fewer usable rows than this are underdetermined.
    pub min_observations: usize,
}

impl Default for RegressionConfig {
    fn default() -> Self {
        Self { min_observations: DEFAULT_MIN_OBSERVATIONS }
    }
}

/// Coefficients and diagnostics of one fit.
#[derive(Debug, Clone)]
pub struct RegressionFit {
    /// `Intercept`, `mkt_excess`, `SMB`, `HML`, `mom` in that order.
    pub coefficients: CoefficientVector,
    /// Residuals of the usable rows.
    pub residuals: Array1<f64>,
    /// R-squared.
    pub r_squared: f64,
    /// Rows used in the fit.
    pub n_obs: usize,
    /// Rows dropped for null or non-finite values.
    pub dropped_rows: usize,
}

/// Fits `port_excess ~ mkt_excess + SMB + HML + mom` by ordinary least squares.
#[derive(Debug, Clone, Default)]
pub struct CarhartRegression {
    config: RegressionConfig,
}

impl CarhartRegression {
    /// Create a regression with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a regression with custom settings.
    #[must_use]
    pub const fn with_config(config: RegressionConfig) -> Self {
        Self { config }
    }

    /// Get the configuration.
    #[must_use]
    pub const fn config(&self) -> &RegressionConfig {
        &self.config
    }

    /// Fit the model on an aligned panel.
    ///
    /// Rows with a null or non-finite value in the response or any predictor
    /// are dropped before fitting.
    ///
    /// # Errors
    /// Returns `AlignmentEmpty` for an empty panel, and
    /// `RegressionUnderdetermined` when fewer than `min_observations` rows
    /// remain or the predictors are collinear.
    pub fn fit(&self, panel: &AlignedPanel) -> Result<RegressionFit, ModelError> {
        if panel.is_empty() {
            return Err(ModelError::AlignmentEmpty { n_returns: 0 });
        }

        let response = panel.column(columns::PORT_EXCESS)?;
        let predictors = CoefficientName::PREDICTORS
            .iter()
            .map(|name| panel.column(name.label()))
            .collect::<Result<Vec<_>, _>>()?;

        let (y, x) = usable_rows(&response, &predictors);
        let n_obs = y.len();
        let dropped_rows = response.len() - n_obs;
        if dropped_rows > 0 {
            tracing::debug!(dropped_rows, n_obs, "dropped incomplete panel rows");
        }

        let required = self.config.min_observations.max(CoefficientName::ALL.len());
        if n_obs < required {
            return Err(ModelError::RegressionUnderdetermined(
                MathError::InsufficientObservations { required, actual: n_obs },
            ));
        }

        let design = with_intercept(&x);
        let ols = ordinary_least_squares(&y, &design)?;

        let coefficients = CoefficientVector::new(
            CoefficientName::ALL
                .iter()
                .zip(ols.coefficients.iter())
                .map(|(name, value)| (name.label().to_string(), *value))
                .collect(),
        );

        Ok(RegressionFit {
            coefficients,
            residuals: ols.residuals,
            r_squared: ols.r_squared,
            n_obs: ols.n_obs,
            dropped_rows,
        })
    }
}

/// Listwise deletion: keep rows where every value is present and finite.
fn usable_rows(
    response: &[Option<f64>],
    predictors: &[Vec<Option<f64>>],
) -> (Array1<f64>, Array2<f64>) {
    let finite = |v: Option<f64>| v.filter(|x| x.is_finite());

    let mut y = Vec::with_capacity(response.len());
    let mut rows = Vec::with_capacity(response.len());
    for (i, target) in response.iter().enumerate() {
        let Some(target) = finite(*target) else { continue };
        let row: Option<Vec<f64>> =
            predictors.iter().map(|column| column.get(i).copied().and_then(finite)).collect();
        if let Some(row) = row {
            y.push(target);
            rows.push(row);
        }
    }

    let x = Array2::from_shape_fn((rows.len(), predictors.len()), |(i, j)| rows[i][j]);
    (Array1::from(y), x)
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use carhart_primitives::{Date, month_end};
    use polars::prelude::*;
    use rstest::rstest;

    use super::*;

    /// Panel with factor columns from smooth deterministic signals and a
    /// response built exactly from known coefficients.
    fn synthetic_panel(n: usize) -> AlignedPanel {
        let dates: Vec<Date> =
            (0..n).map(|i| month_end(2020 + (i / 12) as i32, (i % 12) as u32 + 1).unwrap()).collect();
        let t = |i: usize| i as f64;
        let mkt: Vec<f64> = (0..n).map(|i| 0.04 * (0.7 * t(i)).sin()).collect();
        let smb: Vec<f64> = (0..n).map(|i| 0.02 * (1.3 * t(i)).cos()).collect();
        let hml: Vec<f64> = (0..n).map(|i| 0.03 * (0.4 * t(i) + 1.0).sin()).collect();
        let mom: Vec<f64> = (0..n).map(|i| 0.025 * (2.1 * t(i)).cos()).collect();
        let rf: Vec<f64> = (0..n).map(|i| 0.001 + 0.0001 * t(i)).collect();
        let excess: Vec<f64> = (0..n)
            .map(|i| 0.02 + 1.1 * mkt[i] - 0.3 * smb[i] + 0.5 * hml[i] + 0.2 * mom[i])
            .collect();
        let portfolio: Vec<f64> = (0..n).map(|i| excess[i] + rf[i]).collect();

        let df = DataFrame::new(vec![
            Column::new(columns::DATE.into(), dates),
            Column::new(columns::PORTFOLIO.into(), portfolio),
            Column::new(columns::MKT_EXCESS.into(), mkt),
            Column::new(columns::SMB.into(), smb),
            Column::new(columns::HML.into(), hml),
            Column::new(columns::MOM.into(), mom),
            Column::new(columns::RF.into(), rf),
            Column::new(columns::PORT_EXCESS.into(), excess),
        ])
        .unwrap();
        AlignedPanel::from_frame(df)
    }

    #[test]
    fn recovers_known_coefficients() {
        let fit = CarhartRegression::new().fit(&synthetic_panel(24)).unwrap();

        assert_eq!(fit.coefficients.names(), vec!["Intercept", "mkt_excess", "SMB", "HML", "mom"]);
        assert_relative_eq!(fit.coefficients.get("Intercept").unwrap(), 0.02, epsilon = 1e-9);
        assert_relative_eq!(fit.coefficients.get("mkt_excess").unwrap(), 1.1, epsilon = 1e-9);
        assert_relative_eq!(fit.coefficients.get("SMB").unwrap(), -0.3, epsilon = 1e-9);
        assert_relative_eq!(fit.coefficients.get("HML").unwrap(), 0.5, epsilon = 1e-9);
        assert_relative_eq!(fit.coefficients.get("mom").unwrap(), 0.2, epsilon = 1e-9);
        assert_relative_eq!(fit.r_squared, 1.0, epsilon = 1e-9);
        assert_eq!(fit.n_obs, 24);
        assert_eq!(fit.dropped_rows, 0);
    }

    #[rstest]
    #[case(3)]
    #[case(4)]
    fn too_few_rows_underdetermined(#[case] n: usize) {
        let err = CarhartRegression::new().fit(&synthetic_panel(n)).unwrap_err();
        assert!(matches!(err, ModelError::RegressionUnderdetermined(_)));
    }

    #[test]
    fn empty_panel_is_alignment_empty() {
        let panel = synthetic_panel(0);
        let err = CarhartRegression::new().fit(&panel).unwrap_err();
        assert!(matches!(err, ModelError::AlignmentEmpty { .. }));
    }

    #[test]
    fn rows_with_nulls_are_dropped() {
        let panel = synthetic_panel(12);
        let mut mom: Vec<Option<f64>> = panel.column(columns::MOM).unwrap();
        mom[3] = None;
        mom[7] = Some(f64::NAN);
        let mut df = panel.frame().clone();
        df.replace(columns::MOM, Series::new(columns::MOM.into(), mom)).unwrap();

        let fit = CarhartRegression::new().fit(&AlignedPanel::from_frame(df)).unwrap();
        assert_eq!(fit.n_obs, 10);
        assert_eq!(fit.dropped_rows, 2);
        assert_relative_eq!(fit.coefficients.get("mkt_excess").unwrap(), 1.1, epsilon = 1e-9);
    }

    #[test]
    fn collinear_predictors_underdetermined() {
        let panel = synthetic_panel(12);
        let smb = panel.column(columns::SMB).unwrap();
        let mut df = panel.frame().clone();
        df.replace(columns::HML, Series::new(columns::HML.into(), smb)).unwrap();

        let err = CarhartRegression::new().fit(&AlignedPanel::from_frame(df)).unwrap_err();
        assert!(matches!(err, ModelError::RegressionUnderdetermined(_)));
    }

    #[test]
    fn min_observations_is_configurable() {
        let regression = CarhartRegression::with_config(RegressionConfig { min_observations: 20 });
        assert_eq!(regression.config().min_observations, 20);
        assert!(regression.fit(&synthetic_panel(12)).is_err());
        assert!(regression.fit(&synthetic_panel(24)).is_ok());
    }
}
