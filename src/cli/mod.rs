//! Command-line interface for epharvest.

mod commands;

pub use commands::{is_verbose, run};
