use std::path::Path;

use chrono::NaiveDateTime;
use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use crate::clean::{self, CleaningReport};
use crate::config::PipelineConfig;
use crate::consolidate::{self, Consolidated};
use crate::error::{PipelineError, Result};
use crate::flatten::{build_dataset_workbook, build_forecast_workbook};
use crate::forecast::{
    self, AdfResult, ArimaModel, ArimaOrder, DEFAULT_STEPS, Decomposition, ForecastModel,
    LocationSeries, TrainedForecastModel, diagnostics::DEFAULT_PERIOD,
};
use crate::io::SheetStore;
use crate::io::excel_write;
use crate::model::CleanedRow;

/// Longest horizon accepted, one year of weeks.
pub const MAX_STEPS: usize = 52;

/// Consolidated and cleaned data for one run.
#[derive(Debug, Clone)]
pub struct Dataset {
    pub consolidated: Consolidated,
    pub cleaned: Vec<CleanedRow>,
    pub report: CleaningReport,
}

/// Consolidates every spreadsheet below the configured root and cleans the
/// result. Nothing is cached between calls.
#[instrument(level = "info", skip_all, fields(root = %config.root_folder))]
pub fn load_dataset<S: SheetStore + ?Sized>(store: &S, config: &PipelineConfig) -> Result<Dataset> {
    config.validate()?;
    let consolidated = consolidate::consolidate(store, &config.root_folder, config.header_row)?;
    let (cleaned, report) = clean::clean(&consolidated.rows, &config.cleaning)?;
    info!(
        consolidated_rows = consolidated.rows.len(),
        cleaned_rows = cleaned.len(),
        "dataset loaded"
    );
    Ok(Dataset {
        consolidated,
        cleaned,
        report,
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ForecastOptions {
    pub order: ArimaOrder,
    /// Number of weekly steps to forecast.
    pub steps: usize,
    /// Season length for the decomposition.
    pub period: usize,
}

impl Default for ForecastOptions {
    fn default() -> Self {
        Self {
            order: ArimaOrder::default(),
            steps: DEFAULT_STEPS,
            period: DEFAULT_PERIOD,
        }
    }
}

impl ForecastOptions {
    pub fn validate(&self) -> Result<()> {
        if self.steps == 0 || self.steps > MAX_STEPS {
            return Err(PipelineError::InvalidConfig(format!(
                "forecast steps must be between 1 and {MAX_STEPS}, got {}",
                self.steps
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ForecastPoint {
    pub date: NaiveDateTime,
    pub value: f64,
}

/// Diagnostics, fit statistics and dated forecast for one location.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LocationForecast {
    pub location: String,
    pub order: ArimaOrder,
    pub observations: usize,
    /// `None` when the series is too short for the test.
    pub adf: Option<AdfResult>,
    /// `None` when the series is shorter than two seasons.
    pub decomposition: Option<Decomposition>,
    pub aic: f64,
    pub bic: f64,
    pub residuals: Vec<f64>,
    pub points: Vec<ForecastPoint>,
}

/// Runs diagnostics, fits the model and forecasts one location.
#[instrument(level = "info", skip(rows, options), fields(order = %options.order, steps = options.steps))]
pub fn forecast_location(
    rows: &[CleanedRow],
    location: &str,
    options: &ForecastOptions,
) -> Result<LocationForecast> {
    options.validate()?;
    let series = LocationSeries::from_cleaned(rows, location)?;

    let adf = forecast::adf_test(&series.values)
        .inspect_err(|error| warn!(%error, "skipping ADF test"))
        .ok();
    let decomposition = forecast::seasonal_decompose(&series.values, options.period)
        .inspect_err(|error| warn!(%error, "skipping seasonal decomposition"))
        .ok();

    let model = ArimaModel::new(options.order);
    let trained = model.train(&series.values)?;
    let values = trained.forecast(options.steps)?;
    debug!(model = trained.name(), aic = trained.aic(), bic = trained.bic(), "model fitted");

    let dates = match series.last_timestamp() {
        Some(last) => forecast::weekly_dates(last, options.steps),
        None => Vec::new(),
    };
    let points = dates
        .into_iter()
        .zip(values)
        .map(|(date, value)| ForecastPoint { date, value })
        .collect();

    Ok(LocationForecast {
        location: series.location.clone(),
        order: options.order,
        observations: series.len(),
        adf,
        decomposition,
        aic: trained.aic(),
        bic: trained.bic(),
        residuals: trained.residuals().to_vec(),
        points,
    })
}

/// Forecasts every location of the cleaned table, in order of first
/// appearance.
pub fn forecast_all(rows: &[CleanedRow], options: &ForecastOptions) -> Result<Vec<LocationForecast>> {
    forecast::locations(rows)
        .iter()
        .map(|location| forecast_location(rows, location, options))
        .collect()
}

/// Writes the cleaned dataset to an Excel workbook.
#[instrument(level = "info", skip(rows), fields(output = %output.display()))]
pub fn export_dataset(rows: &[CleanedRow], output: &Path) -> Result<()> {
    let workbook = build_dataset_workbook(rows);
    debug!(sheet_count = workbook.tables.len(), "workbook constructed");
    excel_write::write_workbook(output, &workbook)
}

/// Writes the forecasts to an Excel workbook, one sheet per location.
#[instrument(level = "info", skip(forecasts), fields(output = %output.display()))]
pub fn export_forecasts(forecasts: &[LocationForecast], output: &Path) -> Result<()> {
    let workbook = build_forecast_workbook(forecasts);
    debug!(sheet_count = workbook.tables.len(), "workbook constructed");
    excel_write::write_workbook(output, &workbook)
}
