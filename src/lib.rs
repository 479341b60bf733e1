//! Core library for the compost-forecast command line application.
//!
//! Sensor readings are spread over many spreadsheets, one folder per
//! location. The library lists and reads them through a [`io::SheetStore`],
//! normalises every worksheet onto the canonical column set in [`align`],
//! tags and concatenates them in [`consolidate`], filters and coerces the
//! result in [`clean`], and fits per-location models in [`forecast`]. The
//! [`pipeline`] module wires these stages together for the CLI and the
//! tests.

pub mod align;
pub mod clean;
pub mod config;
pub mod consolidate;
pub mod error;
pub mod flatten;
pub mod forecast;
pub mod io;
pub mod model;
pub mod pipeline;

pub use error::{PipelineError, Result};
