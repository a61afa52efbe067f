//! File-backed storage for the focus tracker.
//!
//! Day logs are CSV files named `YYYYMMDD.csv`, one row per polling tick.
//! Preferences are a single pretty-printed JSON document shared with other
//! tools; only the category keys are ever rewritten.

use std::path::PathBuf;

use thiserror::Error;

pub mod daylog;
pub mod preferences;

pub use daylog::{DayLoad, dates_between, day_path, load_range, read_day};
pub use preferences::PreferencesFile;

/// Storage errors.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A file could not be read or written.
    #[error("failed to access {}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// A day log could not be read.
    #[error("failed to read day log {}", .path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
    /// The preferences document could not be encoded.
    #[error("failed to encode preferences")]
    Encode(#[from] serde_json::Error),
}
