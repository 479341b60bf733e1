//! ARIMA models for the temperature series.

use std::f64::consts::PI;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{PipelineError, Result};
use crate::forecast::linalg::{dot, ols};
use crate::forecast::{ForecastModel, TrainedForecastModel};

/// Model order `(p, d, q)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArimaOrder {
    /// AR order
    pub p: usize,
    /// Differencing order
    pub d: usize,
    /// MA order
    pub q: usize,
}

impl ArimaOrder {
    pub const MAX_P: usize = 5;
    pub const MAX_D: usize = 2;
    pub const MAX_Q: usize = 5;

    pub fn new(p: usize, d: usize, q: usize) -> Result<Self> {
        if p > Self::MAX_P || d > Self::MAX_D || q > Self::MAX_Q {
            return Err(PipelineError::InvalidConfig(format!(
                "ARIMA order ({p},{d},{q}) out of range: p <= {}, d <= {}, q <= {}",
                Self::MAX_P,
                Self::MAX_D,
                Self::MAX_Q
            )));
        }
        Ok(Self { p, d, q })
    }
}

impl Default for ArimaOrder {
    fn default() -> Self {
        Self { p: 0, d: 1, q: 0 }
    }
}

impl fmt::Display for ArimaOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({},{},{})", self.p, self.d, self.q)
    }
}

impl FromStr for ArimaOrder {
    type Err = PipelineError;

    /// Accepts `p,d,q`, optionally wrapped in parentheses.
    fn from_str(value: &str) -> Result<Self> {
        let invalid = || PipelineError::InvalidConfig(format!("invalid ARIMA order '{value}'"));
        let trimmed = value.trim().trim_start_matches('(').trim_end_matches(')');
        let parts = trimmed
            .split(',')
            .map(|part| part.trim().parse::<usize>().map_err(|_| invalid()))
            .collect::<Result<Vec<_>>>()?;
        match parts.as_slice() {
            [p, d, q] => Self::new(*p, *d, *q),
            _ => Err(invalid()),
        }
    }
}

/// ARIMA(p,d,q) estimated with the Hannan–Rissanen two-stage regression.
///
/// A constant is fitted only when `d == 0`. Residuals are conditional on
/// the first `p` differenced observations.
#[derive(Debug, Clone)]
pub struct ArimaModel {
    name: String,
    order: ArimaOrder,
}

/// A fitted [`ArimaModel`].
#[derive(Debug, Clone)]
pub struct TrainedArimaModel {
    name: String,
    order: ArimaOrder,
    constant: f64,
    ar_coefficients: Vec<f64>,
    ma_coefficients: Vec<f64>,
    /// Series after `d` rounds of differencing.
    differenced: Vec<f64>,
    residuals: Vec<f64>,
    /// Last value of the series at each differencing level `0..d`.
    tail_levels: Vec<f64>,
    sigma2: f64,
    log_likelihood: f64,
    nobs: usize,
}

impl ArimaModel {
    pub fn new(order: ArimaOrder) -> Self {
        Self {
            name: format!("ARIMA{order}"),
            order,
        }
    }

    pub fn order(&self) -> ArimaOrder {
        self.order
    }

    /// Order of the long autoregression used to estimate the innovations.
    fn long_ar_order(&self, len: usize) -> usize {
        let ArimaOrder { p, q, .. } = self.order;
        let by_length = (len as f64).ln().ceil() as usize;
        by_length.max(p + q).max(1)
    }

    fn estimate_innovations(&self, series: &[f64], include_constant: bool) -> Result<Vec<f64>> {
        let order = self.long_ar_order(series.len());
        let (design, target) = lagged_design(series, &[], order, 0, order, include_constant);
        let fit = ols(&design, &target, "estimating ARIMA innovations")?;

        let mut innovations = vec![0.0; order];
        innovations.extend(fit.residuals);
        Ok(innovations)
    }
}

impl ForecastModel for ArimaModel {
    type Trained = TrainedArimaModel;

    fn train(&self, series: &[f64]) -> Result<TrainedArimaModel> {
        let ArimaOrder { p, d, q } = self.order;
        let needed = minimum_observations(self.order);
        if series.len() < needed {
            return Err(PipelineError::InsufficientData {
                what: self.name.clone(),
                needed,
                actual: series.len(),
            });
        }

        let mut tail_levels = Vec::with_capacity(d);
        let mut differenced = series.to_vec();
        for _ in 0..d {
            tail_levels.push(differenced[differenced.len() - 1]);
            differenced = difference(&differenced);
        }

        let include_constant = d == 0;
        let (constant, ar_coefficients, ma_coefficients) = if p == 0 && q == 0 {
            let constant = if include_constant { mean(&differenced) } else { 0.0 };
            (constant, Vec::new(), Vec::new())
        } else {
            let innovations = if q > 0 {
                self.estimate_innovations(&differenced, include_constant)?
            } else {
                Vec::new()
            };
            let start = if q > 0 {
                self.long_ar_order(differenced.len()) + q
            } else {
                p
            };
            let (design, target) =
                lagged_design(&differenced, &innovations, p, q, start, include_constant);
            let fit = ols(&design, &target, "fitting ARIMA coefficients")?;

            let offset = usize::from(include_constant);
            let constant = if include_constant { fit.coefficients[0] } else { 0.0 };
            let ar = fit.coefficients[offset..offset + p].to_vec();
            let ma = fit.coefficients[offset + p..offset + p + q].to_vec();
            (constant, ar, ma)
        };

        let residuals =
            conditional_residuals(&differenced, constant, &ar_coefficients, &ma_coefficients);
        let nobs = differenced.len() - p;
        let ssr: f64 = residuals[p..].iter().map(|r| r * r).sum();
        let sigma2 = (ssr / nobs as f64).max(f64::EPSILON);
        let log_likelihood = -0.5 * nobs as f64 * ((2.0 * PI * sigma2).ln() + 1.0);

        debug!(
            model = %self.name,
            constant,
            ?ar_coefficients,
            ?ma_coefficients,
            sigma2,
            "fitted ARIMA"
        );

        Ok(TrainedArimaModel {
            name: self.name.clone(),
            order: self.order,
            constant,
            ar_coefficients,
            ma_coefficients,
            differenced,
            residuals,
            tail_levels,
            sigma2,
            log_likelihood,
            nobs,
        })
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl TrainedArimaModel {
    pub fn order(&self) -> ArimaOrder {
        self.order
    }

    pub fn constant(&self) -> f64 {
        self.constant
    }

    pub fn ar_coefficients(&self) -> &[f64] {
        &self.ar_coefficients
    }

    pub fn ma_coefficients(&self) -> &[f64] {
        &self.ma_coefficients
    }

    pub fn sigma2(&self) -> f64 {
        self.sigma2
    }

    pub fn log_likelihood(&self) -> f64 {
        self.log_likelihood
    }

    /// Number of observations the likelihood is conditioned on.
    pub fn nobs(&self) -> usize {
        self.nobs
    }

    /// Estimated parameters, including the innovation variance.
    fn parameter_count(&self) -> usize {
        let constant = usize::from(self.order.d == 0);
        self.order.p + self.order.q + constant + 1
    }
}

impl TrainedForecastModel for TrainedArimaModel {
    fn forecast(&self, horizon: usize) -> Result<Vec<f64>> {
        let ArimaOrder { p, q, .. } = self.order;
        let observed = self.differenced.len();

        let mut history = self.differenced.clone();
        let mut shocks = self.residuals.clone();
        for _ in 0..horizon {
            let t = history.len();
            let mut value = self.constant;
            for i in 1..=p {
                value += self.ar_coefficients[i - 1] * history[t - i];
            }
            for j in 1..=q {
                if t >= j && t - j < observed {
                    value += self.ma_coefficients[j - 1] * shocks[t - j];
                }
            }
            history.push(value);
            shocks.push(0.0);
        }

        let mut forecasts = history.split_off(observed);
        for level in self.tail_levels.iter().rev() {
            let mut running = *level;
            for value in forecasts.iter_mut() {
                running += *value;
                *value = running;
            }
        }
        Ok(forecasts)
    }

    fn residuals(&self) -> &[f64] {
        &self.residuals
    }

    fn aic(&self) -> f64 {
        2.0 * self.parameter_count() as f64 - 2.0 * self.log_likelihood
    }

    fn bic(&self) -> f64 {
        (self.nobs as f64).ln() * self.parameter_count() as f64 - 2.0 * self.log_likelihood
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Smallest series length [`ArimaModel::train`] accepts for `order`.
pub fn minimum_observations(order: ArimaOrder) -> usize {
    order.d + 2 * (order.p + order.q) + 2
}

fn difference(series: &[f64]) -> Vec<f64> {
    series.windows(2).map(|pair| pair[1] - pair[0]).collect()
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Regression rows `t = start..len` of `y_t` on an optional constant, `p`
/// lags of `y` and `q` lags of `shocks`.
fn lagged_design(
    series: &[f64],
    shocks: &[f64],
    p: usize,
    q: usize,
    start: usize,
    include_constant: bool,
) -> (Vec<Vec<f64>>, Vec<f64>) {
    let mut design = Vec::new();
    let mut target = Vec::new();
    for t in start..series.len() {
        let mut row = Vec::with_capacity(p + q + 1);
        if include_constant {
            row.push(1.0);
        }
        row.extend((1..=p).map(|i| series[t - i]));
        row.extend((1..=q).map(|j| shocks[t - j]));
        design.push(row);
        target.push(series[t]);
    }
    (design, target)
}

fn conditional_residuals(series: &[f64], constant: f64, ar: &[f64], ma: &[f64]) -> Vec<f64> {
    let p = ar.len();
    let mut residuals = vec![0.0; series.len()];
    for t in p..series.len() {
        let lags: Vec<f64> = (1..=p).map(|i| series[t - i]).collect();
        let mut predicted = constant + dot(ar, &lags);
        for (j, theta) in ma.iter().enumerate() {
            if let Some(lag) = t.checked_sub(j + 1) {
                predicted += theta * residuals[lag];
            }
        }
        residuals[t] = series[t] - predicted;
    }
    residuals
}
