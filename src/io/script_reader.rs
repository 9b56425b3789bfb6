//! Streaming reader over an operation script
//!
//! `ScriptReader` yields one `Result<Operation, String>` per CSV row, so
//! callers can log and skip malformed rows while keeping the good ones:
//!
//! ```no_run
//! use ledger_engine::io::ScriptReader;
//! use std::path::Path;
//!
//! let reader = ScriptReader::new(Path::new("operations.csv")).unwrap();
//! for result in reader {
//!     match result {
//!         Ok(operation) => println!("{:?}", operation),
//!         Err(e) => eprintln!("skipped: {}", e),
//!     }
//! }
//! ```
//!
//! Failing to open the file is reported by [`ScriptReader::new`]; row errors
//! carry the 1-based line number, counting the header as line 1.

use crate::io::csv_format::{convert_script_record, ScriptRecord};
use crate::types::Operation;
use csv::{ReaderBuilder, Trim};
use std::fs::File;
use std::path::Path;

/// Iterator over the operations of a script file
#[derive(Debug)]
pub struct ScriptReader {
    reader: csv::Reader<File>,
    line_num: usize,
}

impl ScriptReader {
    /// Open a script for streaming iteration
    ///
    /// Fields are trimmed and rows may omit trailing columns.
    ///
    /// # Errors
    ///
    /// Returns a message naming the path if the file cannot be opened.
    pub fn new(path: &Path) -> Result<Self, String> {
        let file = File::open(path)
            .map_err(|e| format!("Failed to open file '{}': {}", path.display(), e))?;

        let reader = ReaderBuilder::new()
            .trim(Trim::All)
            .flexible(true)
            .buffer_capacity(8 * 1024)
            .from_reader(file);

        Ok(Self {
            reader,
            line_num: 1,
        })
    }
}

impl Iterator for ScriptReader {
    type Item = Result<Operation, String>;

    fn next(&mut self) -> Option<Self::Item> {
        let parsed = self.reader.deserialize::<ScriptRecord>().next()?;
        self.line_num += 1;

        Some(match parsed {
            Ok(record) => {
                convert_script_record(record).map_err(|e| format!("Line {}: {}", self.line_num, e))
            }
            Err(e) => Err(format!("Line {}: CSV parse error: {}", self.line_num, e)),
        })
    }
}
