//! Converts survival-assay spreadsheets into the long, one-event-per-row
//! layout expected by plotting software.
//!
//! The conversion is a straight pipeline: [`survival::export::io::table_read`]
//! loads the sheet, [`survival::export::filter`] selects the rows of each
//! condition, [`survival::export::expand`] turns per-day counts into event rows
//! and [`survival::export::io::table_write`] persists the result. The
//! [`survival::export::pipeline`] module ties the stages together for the
//! command-line interface and the tests.

pub mod survival;

pub use survival::export::{
    ExportError, Result, config, error, expand, filter, io, logging, model, pipeline,
};
