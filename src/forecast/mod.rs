//! Per-location forecasting over the cleaned `Temp01` readings.

pub mod arima;
pub mod diagnostics;
mod linalg;

pub use arima::{ArimaModel, ArimaOrder, TrainedArimaModel};
pub use diagnostics::{AdfResult, CriticalValues, Decomposition, adf_test, seasonal_decompose};

use std::fmt::Debug;

use chrono::{Datelike, Duration, NaiveDateTime};
use serde::Serialize;

use crate::error::{PipelineError, Result};
use crate::model::CleanedRow;

/// Default forecast horizon, in weeks.
pub const DEFAULT_STEPS: usize = 25;

/// A model that can be fitted to a univariate series.
pub trait ForecastModel: Debug + Clone {
    /// The fitted model produced by [`ForecastModel::train`].
    type Trained: TrainedForecastModel;

    fn train(&self, series: &[f64]) -> Result<Self::Trained>;

    fn name(&self) -> &str;
}

/// A fitted model.
pub trait TrainedForecastModel: Debug {
    /// Forecasts the next `horizon` values.
    fn forecast(&self, horizon: usize) -> Result<Vec<f64>>;

    /// In-sample one-step residuals.
    fn residuals(&self) -> &[f64];

    /// Akaike information criterion.
    fn aic(&self) -> f64;

    /// Bayesian information criterion.
    fn bic(&self) -> f64;

    fn name(&self) -> &str;
}

/// The readings of one location, in table order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LocationSeries {
    pub location: String,
    pub timestamps: Vec<NaiveDateTime>,
    pub values: Vec<f64>,
}

impl LocationSeries {
    /// Selects the rows tagged with `location`.
    pub fn from_cleaned(rows: &[CleanedRow], location: &str) -> Result<Self> {
        let (timestamps, values): (Vec<_>, Vec<_>) = rows
            .iter()
            .filter(|row| row.location == location)
            .map(|row| (row.timestamp, row.temp01))
            .unzip();
        if values.is_empty() {
            return Err(PipelineError::UnknownLocation(location.to_string()));
        }
        Ok(Self {
            location: location.to_string(),
            timestamps,
            values,
        })
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Latest timestamp of the series.
    pub fn last_timestamp(&self) -> Option<NaiveDateTime> {
        self.timestamps.iter().max().copied()
    }
}

/// Distinct locations in order of first appearance.
pub fn locations(rows: &[CleanedRow]) -> Vec<String> {
    let mut seen: Vec<String> = Vec::new();
    for row in rows {
        if !seen.contains(&row.location) {
            seen.push(row.location.clone());
        }
    }
    seen
}

/// Dates for a weekly forecast: Sundays, starting with the first Sunday on or
/// after the day following `last`. The time of day of `last` is kept.
pub fn weekly_dates(last: NaiveDateTime, steps: usize) -> Vec<NaiveDateTime> {
    let start = last + Duration::days(1);
    let to_sunday = (7 - start.weekday().num_days_from_sunday()) % 7;
    let first = start + Duration::days(i64::from(to_sunday));
    (0..steps)
        .map(|week| first + Duration::weeks(week as i64))
        .collect()
}
