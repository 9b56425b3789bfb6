//! I/O module
//!
//! Handles CSV parsing and output.
//!
//! # Components
//!
//! - `csv_format` - CSV format handling (record conversion, output serialization)
//! - `script_reader` - Streaming reader over an operation script

pub mod csv_format;
pub mod script_reader;

pub use csv_format::{convert_script_record, write_balances_csv, ScriptRecord};
pub use script_reader::ScriptReader;
