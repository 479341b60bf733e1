mod common;

use std::fs;

use chrono::NaiveDate;
use compost_forecast::clean::{CleaningOptions, clean};
use compost_forecast::consolidate::consolidate;
use compost_forecast::flatten::{DATASET_SHEET, sanitize_sheet_name};
use compost_forecast::io::LocalStore;
use compost_forecast::io::excel_read::{self, excel_serial_to_datetime};
use compost_forecast::model::{CANONICAL_COLUMNS, LOCATION_COLUMN, TaggedRow, column_index};
use compost_forecast::pipeline::{self, ForecastOptions};
use tempfile::tempdir;

use common::reading;

fn sample_rows() -> Vec<TaggedRow> {
    let mut north = reading("NorthFarm", "2024-07-01 10:00:00", "19.5");
    let humidity = column_index("Hum01").expect("canonical column");
    north.fields.set(humidity, Some("41".to_string()));
    vec![
        north,
        reading("NorthFarm", "2024-07-08 10:00:00", "20.25"),
        reading("NorthFarm", "2024-07-15 10:00:00", "21"),
        reading("South/Farm", "2024-07-02 09:30:00", "17.5"),
        reading("South/Farm", "2024-07-03 09:30:00", "18.5"),
        reading("South/Farm", "2024-07-04 09:30:00", "18"),
    ]
}

#[test]
fn exported_dataset_consolidates_back_to_the_same_rows() {
    let (cleaned, _) = clean(&sample_rows(), &CleaningOptions::default()).expect("cleaned");

    let temp_dir = tempdir().expect("temporary directory");
    let mirror = temp_dir.path().join("root").join("Export_Mirror");
    fs::create_dir_all(&mirror).expect("mirror folder");
    let xlsx_path = mirror.join("cleaned.xlsx");
    pipeline::export_dataset(&cleaned, &xlsx_path).expect("dataset exported");

    let worksheets = excel_read::read_worksheets(&xlsx_path).expect("Excel read");
    assert_eq!(worksheets.len(), 1);
    let header = &worksheets[0][0];
    assert_eq!(header[0], LOCATION_COLUMN);
    assert_eq!(&header[1..], CANONICAL_COLUMNS.as_slice());
    assert_eq!(worksheets[0][4][0], "South/Farm");

    let store = LocalStore::new(temp_dir.path().join("root"));
    let consolidated = consolidate(&store, &store.root_id(), 1).expect("consolidated");
    let (restored, report) =
        clean(&consolidated.rows, &CleaningOptions::default()).expect("cleaned again");

    assert_eq!(report.dropped(), 0);
    assert_eq!(restored.len(), cleaned.len());
    for (before, after) in cleaned.iter().zip(&restored) {
        assert_eq!(after.location, "Mirror");
        assert_eq!(after.timestamp, before.timestamp);
        assert_eq!(after.temp01, before.temp01);
        assert_eq!(after.fields.get("Hum01"), before.fields.get("Hum01"));
    }
}

#[test]
fn forecasts_are_written_one_sheet_per_location() {
    let (cleaned, _) = clean(&sample_rows(), &CleaningOptions::default()).expect("cleaned");
    let options = ForecastOptions {
        steps: 3,
        ..ForecastOptions::default()
    };
    let forecasts = pipeline::forecast_all(&cleaned, &options).expect("forecasts");

    let temp_dir = tempdir().expect("temporary directory");
    let xlsx_path = temp_dir.path().join("forecasts.xlsx");
    pipeline::export_forecasts(&forecasts, &xlsx_path).expect("forecasts exported");

    let worksheets = excel_read::read_worksheets(&xlsx_path).expect("Excel read");
    assert_eq!(worksheets.len(), 2);

    let north = &worksheets[0];
    assert_eq!(north[0], vec!["Date", "Forecasted Temp"]);
    assert_eq!(north.len(), 4);
    // Last NorthFarm reading is Monday 2024-07-15.
    assert_eq!(north[1], vec!["2024-07-21", "21"]);
    assert_eq!(north[3][0], "2024-08-04");

    // Last South/Farm reading is Thursday 2024-07-04.
    let south = &worksheets[1];
    assert_eq!(south[1], vec!["2024-07-07", "18"]);
}

#[test]
fn dataset_sheet_is_named_consistently() {
    assert_eq!(DATASET_SHEET, "Cleaned");
    assert_eq!(sanitize_sheet_name("South/Farm"), "South_Farm");
    assert_eq!(sanitize_sheet_name("  "), "Sheet");
    assert_eq!(sanitize_sheet_name(&"x".repeat(40)).chars().count(), 31);
}

#[test]
fn serial_dates_convert_to_calendar_time() {
    let expected = NaiveDate::from_ymd_opt(2024, 7, 1)
        .and_then(|date| date.and_hms_opt(12, 0, 0))
        .expect("valid date");
    assert_eq!(excel_serial_to_datetime(45474.5), Some(expected));
    assert_eq!(excel_serial_to_datetime(-1.0), None);
    assert_eq!(excel_serial_to_datetime(f64::NAN), None);
}
