pub mod config;
pub mod error;
pub mod expand;
pub mod filter;
pub mod io;
pub mod logging;
pub mod model;
pub mod pipeline;

pub use error::{ExportError, Result};
