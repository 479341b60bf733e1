mod common;

use chrono::{Datelike, NaiveDate, NaiveDateTime, Weekday};
use compost_forecast::PipelineError;
use compost_forecast::clean::{CleaningOptions, clean};
use compost_forecast::forecast::diagnostics::{critical_values, mackinnon_p_value};
use compost_forecast::forecast::{
    ArimaModel, ArimaOrder, ForecastModel, LocationSeries, TrainedForecastModel, adf_test,
    locations, seasonal_decompose, weekly_dates,
};
use compost_forecast::model::CleanedRow;
use compost_forecast::pipeline::{ForecastOptions, MAX_STEPS, forecast_all, forecast_location};

use common::{pseudo_noise, reading};

const TOLERANCE: f64 = 1e-6;

fn at(year: i32, month: u32, day: u32, hour: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(year, month, day)
        .and_then(|date| date.and_hms_opt(hour, 0, 0))
        .expect("valid date")
}

fn assert_close(actual: f64, expected: f64, tolerance: f64) {
    assert!(
        (actual - expected).abs() <= tolerance,
        "expected {expected}, got {actual}"
    );
}

fn weekly_readings(location: &str, temps: &[f64]) -> Vec<CleanedRow> {
    let rows: Vec<_> = temps
        .iter()
        .enumerate()
        .map(|(week, temp)| {
            let day = NaiveDate::from_ymd_opt(2024, 6, 3).expect("valid date")
                + chrono::Duration::weeks(week as i64);
            reading(location, &day.to_string(), &temp.to_string())
        })
        .collect();
    let (cleaned, _) = clean(&rows, &CleaningOptions::default()).expect("cleaned");
    cleaned
}

#[test]
fn order_parses_from_text() {
    assert_eq!(
        "0,1,0".parse::<ArimaOrder>().unwrap(),
        ArimaOrder { p: 0, d: 1, q: 0 }
    );
    assert_eq!(
        "(1, 1, 1)".parse::<ArimaOrder>().unwrap(),
        ArimaOrder { p: 1, d: 1, q: 1 }
    );
    assert!("1,2".parse::<ArimaOrder>().is_err());
    assert!("6,0,0".parse::<ArimaOrder>().is_err());
    assert!("0,3,0".parse::<ArimaOrder>().is_err());
    assert_eq!(ArimaOrder::default().to_string(), "(0,1,0)");
}

#[test]
fn random_walk_forecasts_the_last_value() {
    let series = [20.0, 21.0, 22.0, 21.5, 23.0];
    let trained = ArimaModel::new(ArimaOrder::default())
        .train(&series)
        .expect("trained");

    assert_eq!(trained.forecast(3).expect("forecast"), vec![23.0, 23.0, 23.0]);

    let sigma2 = (1.0 + 1.0 + 0.25 + 2.25) / 4.0;
    let log_likelihood = -2.0 * ((2.0 * std::f64::consts::PI * sigma2).ln() + 1.0);
    assert_close(trained.log_likelihood(), log_likelihood, TOLERANCE);
    assert_close(trained.aic(), 2.0 - 2.0 * log_likelihood, TOLERANCE);
    assert_close(trained.bic(), 4.0_f64.ln() - 2.0 * log_likelihood, TOLERANCE);
    assert_eq!(trained.residuals(), &[1.0, 1.0, -0.5, 1.5]);
}

#[test]
fn white_noise_model_forecasts_the_mean() {
    let series = [18.0, 22.0, 20.0, 19.0, 21.0];
    let trained = ArimaModel::new(ArimaOrder { p: 0, d: 0, q: 0 })
        .train(&series)
        .expect("trained");

    for value in trained.forecast(2).expect("forecast") {
        assert_close(value, 20.0, TOLERANCE);
    }
}

#[test]
fn autoregression_recovers_a_noiseless_process() {
    let mut series = vec![0.0];
    for _ in 0..11 {
        let last = series[series.len() - 1];
        series.push(10.0 + 0.5 * last);
    }

    let trained = ArimaModel::new(ArimaOrder { p: 1, d: 0, q: 0 })
        .train(&series)
        .expect("trained");

    assert_close(trained.constant(), 10.0, 1e-6);
    assert_close(trained.ar_coefficients()[0], 0.5, 1e-6);
    let last = series[series.len() - 1];
    let forecast = trained.forecast(1).expect("forecast");
    assert_close(forecast[0], 10.0 + 0.5 * last, 1e-6);
}

#[test]
fn differenced_autoregression_extends_a_linear_trend() {
    let series: Vec<f64> = (0..10).map(|t| 1.0 + 2.0 * t as f64).collect();

    let trained = ArimaModel::new(ArimaOrder { p: 1, d: 1, q: 0 })
        .train(&series)
        .expect("trained");

    let forecast = trained.forecast(3).expect("forecast");
    for (value, expected) in forecast.iter().zip([21.0, 23.0, 25.0]) {
        assert_close(*value, expected, 1e-9);
    }
}

#[test]
fn moving_average_terms_are_estimated() {
    let noise = pseudo_noise(80, 7);
    let mut series = Vec::with_capacity(noise.len());
    let mut previous = 20.0;
    let mut previous_shock = 0.0;
    for shock in noise {
        let value = 8.0 + 0.6 * previous + shock + 0.3 * previous_shock;
        series.push(value);
        previous = value;
        previous_shock = shock;
    }

    let trained = ArimaModel::new(ArimaOrder { p: 1, d: 0, q: 1 })
        .train(&series)
        .expect("trained");

    assert_eq!(trained.ma_coefficients().len(), 1);
    assert_eq!(trained.residuals().len(), series.len());
    let forecast = trained.forecast(5).expect("forecast");
    assert_eq!(forecast.len(), 5);
    assert!(forecast.iter().all(|value| value.is_finite()));
    assert!(trained.aic().is_finite());
}

#[test]
fn short_series_is_rejected() {
    let error = ArimaModel::new(ArimaOrder { p: 1, d: 1, q: 1 })
        .train(&[20.0, 21.0, 22.0])
        .expect_err("too short");
    assert!(matches!(error, PipelineError::InsufficientData { .. }));
}

#[test]
fn weekly_dates_land_on_sundays_after_the_last_reading() {
    // 2024-07-03 is a Wednesday.
    let dates = weekly_dates(at(2024, 7, 3, 10), 3);
    assert_eq!(
        dates,
        vec![at(2024, 7, 7, 10), at(2024, 7, 14, 10), at(2024, 7, 21, 10)]
    );
    assert!(dates.iter().all(|date| date.weekday() == Weekday::Sun));

    // A Saturday rolls onto the next day, a Sunday onto the following week.
    assert_eq!(weekly_dates(at(2024, 7, 6, 0), 1), vec![at(2024, 7, 7, 0)]);
    assert_eq!(weekly_dates(at(2024, 7, 7, 0), 1), vec![at(2024, 7, 14, 0)]);
}

#[test]
fn adf_rejects_a_unit_root_for_white_noise() {
    let series: Vec<f64> = pseudo_noise(200, 42).iter().map(|x| 20.0 + x).collect();

    let result = adf_test(&series).expect("ADF computed");

    assert!(result.statistic < result.critical_values.five_percent);
    assert!(result.p_value < 0.05);
    assert!(result.nobs <= series.len() - 1);
}

#[test]
fn adf_needs_a_few_observations() {
    assert!(matches!(
        adf_test(&[1.0, 2.0, 3.0]),
        Err(PipelineError::InsufficientData { .. })
    ));
}

#[test]
fn mackinnon_tables() {
    let values = critical_values(100);
    assert_close(values.one_percent, -3.4977, 1e-3);
    assert_close(values.five_percent, -2.8909, 1e-3);
    assert_close(values.ten_percent, -2.5824, 1e-3);

    assert_close(mackinnon_p_value(-1.61), 0.478, 0.01);
    assert!(mackinnon_p_value(-4.0) < mackinnon_p_value(-2.0));
    assert_eq!(mackinnon_p_value(3.0), 1.0);
    assert_eq!(mackinnon_p_value(-20.0), 0.0);
}

#[test]
fn decomposition_separates_trend_and_season() {
    let pattern = [1.0, -1.0, 2.0, -2.0];
    let series: Vec<f64> = (0..16).map(|t| t as f64 + pattern[t % 4]).collect();

    let decomposition = seasonal_decompose(&series, 4).expect("decomposed");

    assert_eq!(decomposition.trend[0], None);
    assert_eq!(decomposition.trend[1], None);
    assert_eq!(decomposition.trend[14], None);
    assert_eq!(decomposition.trend[15], None);
    for t in 2..14 {
        assert_close(decomposition.trend[t].expect("trend"), t as f64, TOLERANCE);
        assert_close(
            decomposition.residual[t].expect("residual"),
            0.0,
            TOLERANCE,
        );
    }
    for (t, expected) in pattern.iter().enumerate() {
        assert_close(decomposition.seasonal[t], *expected, TOLERANCE);
    }
}

#[test]
fn decomposition_validates_inputs() {
    assert!(matches!(
        seasonal_decompose(&[1.0; 7], 4),
        Err(PipelineError::InsufficientData { .. })
    ));
    assert!(matches!(
        seasonal_decompose(&[1.0; 8], 1),
        Err(PipelineError::InvalidConfig(_))
    ));
}

#[test]
fn series_are_selected_per_location() {
    let mut rows = weekly_readings("NorthFarm", &[20.0, 21.0]);
    rows.extend(weekly_readings("SouthFarm", &[15.0]));

    assert_eq!(locations(&rows), vec!["NorthFarm", "SouthFarm"]);
    let series = LocationSeries::from_cleaned(&rows, "NorthFarm").expect("series");
    assert_eq!(series.values, vec![20.0, 21.0]);
    assert_eq!(series.last_timestamp(), Some(at(2024, 6, 10, 0)));
    assert!(matches!(
        LocationSeries::from_cleaned(&rows, "EastFarm"),
        Err(PipelineError::UnknownLocation(_))
    ));
}

#[test]
fn location_forecast_bundles_diagnostics_and_dates() {
    let temps: Vec<f64> = pseudo_noise(12, 3).iter().map(|x| 21.0 + x).collect();
    let rows = weekly_readings("NorthFarm", &temps);
    let options = ForecastOptions {
        steps: 4,
        ..ForecastOptions::default()
    };

    let forecast = forecast_location(&rows, "NorthFarm", &options).expect("forecast");

    assert_eq!(forecast.observations, 12);
    assert_eq!(forecast.points.len(), 4);
    let last = temps[temps.len() - 1];
    assert!(forecast.points.iter().all(|point| point.value == last));
    // Last reading is Monday 2024-08-19; forecasts start the following Sunday.
    assert_eq!(forecast.points[0].date, at(2024, 8, 25, 0));
    assert!(forecast.decomposition.is_some());
    assert!(forecast.adf.is_some());
}

#[test]
fn forecasting_every_location_follows_first_appearance() {
    let mut rows = weekly_readings("SouthFarm", &[15.0, 16.0, 15.5, 16.5]);
    rows.extend(weekly_readings("NorthFarm", &[20.0, 21.0, 20.5, 22.0]));

    let forecasts = forecast_all(&rows, &ForecastOptions::default()).expect("forecasts");

    let names: Vec<&str> = forecasts
        .iter()
        .map(|forecast| forecast.location.as_str())
        .collect();
    assert_eq!(names, vec!["SouthFarm", "NorthFarm"]);
    assert!(forecasts.iter().all(|forecast| forecast.points.len() == 25));
    // Four readings are too few for a period-4 decomposition.
    assert!(forecasts.iter().all(|forecast| forecast.decomposition.is_none()));
}

#[test]
fn forecast_horizon_is_validated() {
    let rows = weekly_readings("NorthFarm", &[20.0, 21.0, 22.0]);
    let options = ForecastOptions {
        steps: 0,
        ..ForecastOptions::default()
    };
    assert!(matches!(
        forecast_location(&rows, "NorthFarm", &options),
        Err(PipelineError::InvalidConfig(_))
    ));

    let year = ForecastOptions {
        steps: MAX_STEPS,
        ..ForecastOptions::default()
    };
    assert_eq!(MAX_STEPS, 52);
    assert!(year.validate().is_ok());
    let beyond = ForecastOptions {
        steps: MAX_STEPS + 1,
        ..ForecastOptions::default()
    };
    assert!(matches!(
        beyond.validate(),
        Err(PipelineError::InvalidConfig(_))
    ));
}
