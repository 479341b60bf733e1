//! Stationarity test and seasonal decomposition shown next to a forecast.

use serde::Serialize;
use statrs::distribution::{ContinuousCDF, Normal};

use crate::error::{PipelineError, Result};
use crate::forecast::linalg::{OlsFit, ols};

/// Season length used when none is configured.
pub const DEFAULT_PERIOD: usize = 4;

// MacKinnon (2010) response surface, constant-only regression, one series.
const CRITICAL_1: [f64; 4] = [-3.43035, -6.5393, -16.786, -79.433];
const CRITICAL_5: [f64; 4] = [-2.86154, -2.8903, -4.234, -40.040];
const CRITICAL_10: [f64; 4] = [-2.56677, -1.5384, -2.809, 0.0];

// MacKinnon (1994) approximate p-value surface, constant-only regression.
const TAU_MAX: f64 = 2.74;
const TAU_MIN: f64 = -18.83;
const TAU_STAR: f64 = -1.61;
const TAU_SMALL_P: [f64; 3] = [2.1659, 1.4412, 0.038269];
const TAU_LARGE_P: [f64; 4] = [1.7339, 0.93202, -0.12745, -0.010368];

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CriticalValues {
    pub one_percent: f64,
    pub five_percent: f64,
    pub ten_percent: f64,
}

/// Augmented Dickey–Fuller test outcome.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AdfResult {
    pub statistic: f64,
    pub p_value: f64,
    pub used_lag: usize,
    pub nobs: usize,
    pub critical_values: CriticalValues,
}

/// Augmented Dickey–Fuller test with a constant. The lag count is chosen by
/// AIC between 0 and `ceil(12 * (n / 100)^(1/4))`, capped by the series
/// length.
pub fn adf_test(series: &[f64]) -> Result<AdfResult> {
    let len = series.len();
    let schwert = (12.0 * (len as f64 / 100.0).powf(0.25)).ceil() as i64;
    let max_lag = schwert.min(len as i64 / 2 - 2);
    if max_lag < 0 {
        return Err(PipelineError::InsufficientData {
            what: "ADF test".to_string(),
            needed: 4,
            actual: len,
        });
    }
    let max_lag = max_lag as usize;
    let diffs: Vec<f64> = series.windows(2).map(|pair| pair[1] - pair[0]).collect();

    let mut best: Option<(usize, f64)> = None;
    for lag in 0..=max_lag {
        let Ok(fit) = adf_regression(series, &diffs, lag, max_lag) else {
            continue;
        };
        let rows = fit.residuals.len() as f64;
        let aic = rows * (fit.ssr / rows).ln() + 2.0 * fit.coefficients.len() as f64;
        if best.is_none_or(|(_, best_aic)| aic < best_aic) {
            best = Some((lag, aic));
        }
    }
    let used_lag = best.map(|(lag, _)| lag).unwrap_or(0);

    let fit = adf_regression(series, &diffs, used_lag, used_lag)?;
    let statistic = fit.coefficients[0] / fit.standard_error(0);
    let nobs = fit.residuals.len();

    Ok(AdfResult {
        statistic,
        p_value: mackinnon_p_value(statistic),
        used_lag,
        nobs,
        critical_values: critical_values(nobs),
    })
}

/// Regresses `Δy_t` on `y_{t-1}`, `lag` lagged differences and a constant,
/// using the sample that `first_lag` lags leave available.
fn adf_regression(series: &[f64], diffs: &[f64], lag: usize, first_lag: usize) -> Result<OlsFit> {
    let mut design = Vec::new();
    let mut target = Vec::new();
    for i in first_lag..diffs.len() {
        let mut row = Vec::with_capacity(lag + 2);
        row.push(series[i]);
        row.extend((1..=lag).map(|k| diffs[i - k]));
        row.push(1.0);
        design.push(row);
        target.push(diffs[i]);
    }
    let fit = ols(&design, &target, "running ADF regression")?;
    if fit.residuals.len() <= fit.coefficients.len() {
        return Err(PipelineError::InsufficientData {
            what: "ADF test".to_string(),
            needed: fit.coefficients.len() + 1,
            actual: fit.residuals.len(),
        });
    }
    Ok(fit)
}

/// Critical values of the constant-only test statistic for `nobs` observations.
pub fn critical_values(nobs: usize) -> CriticalValues {
    let surface = |coefficients: &[f64; 4]| {
        let inverse = 1.0 / nobs as f64;
        coefficients
            .iter()
            .enumerate()
            .map(|(power, c)| c * inverse.powi(power as i32))
            .sum()
    };
    CriticalValues {
        one_percent: surface(&CRITICAL_1),
        five_percent: surface(&CRITICAL_5),
        ten_percent: surface(&CRITICAL_10),
    }
}

/// Approximate p-value of an ADF statistic, clamped to `[0, 1]` outside the
/// tabulated range.
pub fn mackinnon_p_value(statistic: f64) -> f64 {
    if statistic > TAU_MAX {
        return 1.0;
    }
    if statistic < TAU_MIN {
        return 0.0;
    }
    let coefficients: &[f64] = if statistic <= TAU_STAR {
        &TAU_SMALL_P
    } else {
        &TAU_LARGE_P
    };
    let z: f64 = coefficients
        .iter()
        .enumerate()
        .map(|(power, c)| c * statistic.powi(power as i32))
        .sum();
    Normal::new(0.0, 1.0)
        .map(|normal| normal.cdf(z))
        .unwrap_or(f64::NAN)
}

/// Additive decomposition `observed = trend + seasonal + residual`.
/// `trend` and `residual` are `None` where the moving average does not
/// reach.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Decomposition {
    pub period: usize,
    pub observed: Vec<f64>,
    pub trend: Vec<Option<f64>>,
    pub seasonal: Vec<f64>,
    pub residual: Vec<Option<f64>>,
}

/// Additive seasonal decomposition with a centred moving-average trend.
pub fn seasonal_decompose(series: &[f64], period: usize) -> Result<Decomposition> {
    if period < 2 {
        return Err(PipelineError::InvalidConfig(format!(
            "seasonal period must be at least 2, got {period}"
        )));
    }
    if series.len() < 2 * period {
        return Err(PipelineError::InsufficientData {
            what: format!("seasonal decomposition with period {period}"),
            needed: 2 * period,
            actual: series.len(),
        });
    }

    let weights = trend_weights(period);
    let half = weights.len() / 2;
    let trend: Vec<Option<f64>> = (0..series.len())
        .map(|t| {
            if t < half || t + half >= series.len() {
                return None;
            }
            let window = &series[t - half..=t + half];
            Some(window.iter().zip(&weights).map(|(x, w)| x * w).sum())
        })
        .collect();

    let detrended: Vec<Option<f64>> = series
        .iter()
        .zip(&trend)
        .map(|(x, t)| t.map(|t| x - t))
        .collect();

    let mut phase_means = vec![0.0; period];
    for (phase, slot) in phase_means.iter_mut().enumerate() {
        let values: Vec<f64> = detrended
            .iter()
            .skip(phase)
            .step_by(period)
            .filter_map(|value| *value)
            .collect();
        if !values.is_empty() {
            *slot = values.iter().sum::<f64>() / values.len() as f64;
        }
    }
    let centre = phase_means.iter().sum::<f64>() / period as f64;
    for value in phase_means.iter_mut() {
        *value -= centre;
    }

    let seasonal: Vec<f64> = (0..series.len()).map(|t| phase_means[t % period]).collect();
    let residual = detrended
        .iter()
        .zip(&seasonal)
        .map(|(value, s)| value.map(|value| value - s))
        .collect();

    Ok(Decomposition {
        period,
        observed: series.to_vec(),
        trend,
        seasonal,
        residual,
    })
}

/// Moving-average weights: `1/period` each for odd periods, a `2×period`
/// centred average for even ones.
fn trend_weights(period: usize) -> Vec<f64> {
    let scale = 1.0 / period as f64;
    if period % 2 == 0 {
        let mut weights = vec![scale; period + 1];
        weights[0] = 0.5 * scale;
        weights[period] = 0.5 * scale;
        weights
    } else {
        vec![scale; period]
    }
}
