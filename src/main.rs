use std::path::PathBuf;

use clap::{Parser, Subcommand};
use compost_forecast::align::DEFAULT_HEADER_ROW;
use compost_forecast::clean::{CleaningOptions, CleaningReport, DEFAULT_MIN_YEAR, TimestampPolicy};
use compost_forecast::config::{Credentials, PipelineConfig};
use compost_forecast::forecast::diagnostics::DEFAULT_PERIOD;
use compost_forecast::forecast::{ArimaOrder, DEFAULT_STEPS};
use compost_forecast::io::LocalStore;
use compost_forecast::model::{cleaned_shape, tagged_shape};
use compost_forecast::pipeline::{self, Dataset, ForecastOptions, LocationForecast};
use compost_forecast::{PipelineError, Result};
use tracing::info;
use tracing_subscriber::EnvFilter;

fn main() {
    let cli = Cli::parse();
    if let Err(error) = init_logging().and_then(|()| run(cli)) {
        eprintln!("error: {error}");
        std::process::exit(1);
    }
}

fn init_logging() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|error| PipelineError::Logging(error.to_string()))
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Consolidate(args) => execute_consolidate(args),
        Command::Clean(args) => execute_clean(args),
        Command::Forecast(args) => execute_forecast(args),
        Command::Export(args) => execute_export(args),
    }
}

fn execute_consolidate(args: SourceArgs) -> Result<()> {
    let dataset = args.load()?;
    for file in &dataset.consolidated.files {
        println!(
            "{}/{}: {} worksheet(s), {} row(s)",
            file.location, file.file, file.worksheets, file.rows
        );
    }
    print_shapes(&dataset);
    Ok(())
}

fn execute_clean(args: CleanArgs) -> Result<()> {
    let dataset = args.source.load()?;
    if args.json {
        println!("{}", serde_json::to_string_pretty(&dataset.report)?);
        return Ok(());
    }
    print_shapes(&dataset);
    print_report(&dataset.report);
    Ok(())
}

fn execute_forecast(args: ForecastArgs) -> Result<()> {
    let options = ForecastOptions {
        order: args.order,
        steps: args.steps,
        period: args.period,
    };
    options.validate()?;

    let dataset = args.source.load()?;
    print_shapes(&dataset);

    let forecasts = match &args.location {
        Some(location) => vec![pipeline::forecast_location(
            &dataset.cleaned,
            location,
            &options,
        )?],
        None => pipeline::forecast_all(&dataset.cleaned, &options)?,
    };
    for forecast in &forecasts {
        print_forecast(forecast);
    }

    if let Some(output) = &args.output {
        pipeline::export_forecasts(&forecasts, output)?;
        info!(output = %output.display(), "forecasts written");
    }
    Ok(())
}

fn execute_export(args: ExportArgs) -> Result<()> {
    let dataset = args.source.load()?;
    pipeline::export_dataset(&dataset.cleaned, &args.output)?;
    println!(
        "wrote {} row(s) to {}",
        dataset.cleaned.len(),
        args.output.display()
    );
    Ok(())
}

fn print_shapes(dataset: &Dataset) {
    let (rows, columns) = tagged_shape(&dataset.consolidated.rows);
    println!("consolidated: ({rows}, {columns})");
    let (rows, columns) = cleaned_shape(&dataset.cleaned);
    println!("cleaned: ({rows}, {columns})");
}

fn print_report(report: &CleaningReport) {
    println!("dropped rows: {}", report.dropped());
    println!("  missing Timestamp or Temp01: {}", report.missing_required);
    println!("  header or unit rows: {}", report.header_or_unit);
    println!("  null Timestamp: {}", report.null_timestamp);
    println!("  unparseable Timestamp: {}", report.bad_timestamp);
    println!("  unparseable Temp01: {}", report.unparseable_temperature);
    println!("  Temp01 <= 0: {}", report.non_positive_temperature);
    println!("  before minimum year: {}", report.before_min_year);
}

fn print_forecast(forecast: &LocationForecast) {
    println!();
    println!(
        "== {} ARIMA{} on {} observation(s)",
        forecast.location, forecast.order, forecast.observations
    );
    match &forecast.adf {
        Some(adf) => {
            println!("ADF Test Statistic: {:.4}", adf.statistic);
            println!("p-value: {:.4}", adf.p_value);
            println!("Critical Values:");
            println!("  1%: {:.4}", adf.critical_values.one_percent);
            println!("  5%: {:.4}", adf.critical_values.five_percent);
            println!("  10%: {:.4}", adf.critical_values.ten_percent);
        }
        None => println!("ADF test skipped: series too short"),
    }
    if let Some(decomposition) = &forecast.decomposition {
        let phases: Vec<String> = decomposition
            .seasonal
            .iter()
            .take(decomposition.period)
            .map(|value| format!("{value:.3}"))
            .collect();
        println!(
            "Seasonal component (period {}): [{}]",
            decomposition.period,
            phases.join(", ")
        );
    }
    println!("AIC: {:.2}", forecast.aic);
    println!("BIC: {:.2}", forecast.bic);
    println!("Forecasted Temp values for {}:", forecast.location);
    for point in &forecast.points {
        println!("{}: {:.2}", point.date.format("%Y-%m-%d"), point.value);
    }
}

fn parse_order(value: &str) -> std::result::Result<ArimaOrder, String> {
    value.parse().map_err(|error: PipelineError| error.to_string())
}

#[derive(Parser)]
#[command(
    author,
    version,
    about = "Consolidate sensor spreadsheets and forecast temperature per location."
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Consolidate every spreadsheet and print the shapes read.
    Consolidate(SourceArgs),
    /// Consolidate and clean, then print what was dropped.
    Clean(CleanArgs),
    /// Fit a model per location and print the forecasts.
    Forecast(ForecastArgs),
    /// Write the cleaned dataset to an Excel workbook.
    Export(ExportArgs),
}

#[derive(clap::Args)]
struct SourceArgs {
    /// Root folder holding one `<prefix>_<location>` folder per site.
    #[arg(long)]
    root: PathBuf,

    /// 1-based header row of the worksheets.
    #[arg(long, default_value_t = DEFAULT_HEADER_ROW)]
    header_row: usize,

    /// Readings stamped before this year are dropped.
    #[arg(long, default_value_t = DEFAULT_MIN_YEAR)]
    min_year: i32,

    /// Drop rows with unparseable timestamps instead of failing.
    #[arg(long)]
    drop_bad_timestamps: bool,

    /// Environment variable holding service-account JSON to validate first.
    #[arg(long)]
    credentials_env: Option<String>,
}

impl SourceArgs {
    fn config(&self) -> PipelineConfig {
        let timestamp_policy = if self.drop_bad_timestamps {
            TimestampPolicy::DropRow
        } else {
            TimestampPolicy::Strict
        };
        PipelineConfig {
            root_folder: self.root.to_string_lossy().into_owned(),
            header_row: self.header_row,
            cleaning: CleaningOptions {
                timestamp_policy,
                min_year: self.min_year,
            },
        }
    }

    fn load(&self) -> Result<Dataset> {
        if let Some(var) = &self.credentials_env {
            let credentials = Credentials::from_env(var)?;
            info!(client = %credentials.client_email, "credentials validated");
        }
        let config = self.config();
        config.validate()?;
        let store = LocalStore::new(&self.root);
        pipeline::load_dataset(&store, &config)
    }
}

#[derive(clap::Args)]
struct CleanArgs {
    #[command(flatten)]
    source: SourceArgs,

    /// Print the cleaning report as JSON.
    #[arg(long)]
    json: bool,
}

#[derive(clap::Args)]
struct ForecastArgs {
    #[command(flatten)]
    source: SourceArgs,

    /// Model order as `p,d,q`.
    #[arg(long, default_value = "0,1,0", value_parser = parse_order)]
    order: ArimaOrder,

    /// Number of weeks to forecast.
    #[arg(long, default_value_t = DEFAULT_STEPS)]
    steps: usize,

    /// Season length for the decomposition.
    #[arg(long, default_value_t = DEFAULT_PERIOD)]
    period: usize,

    /// Only forecast this location.
    #[arg(long)]
    location: Option<String>,

    /// Also write the forecasts to this Excel workbook.
    #[arg(long)]
    output: Option<PathBuf>,
}

#[derive(clap::Args)]
struct ExportArgs {
    #[command(flatten)]
    source: SourceArgs,

    /// Output workbook path.
    #[arg(long)]
    output: PathBuf,
}
