//! CLI subcommand implementations.

pub mod categories;
pub mod report;
pub mod status;

use std::io::Write;

use anyhow::{Context, Result};

use ft_core::Tracker;
use ft_store::{PreferencesFile, StoreError, load_range};

use crate::Config;

/// Day logs read into a tracker.
#[derive(Debug, Default)]
pub struct History {
    pub days: usize,
    pub errors: Vec<(i32, StoreError)>,
}

/// Opens the tracker over the configured preferences file.
pub fn open_tracker(config: &Config) -> Result<Tracker> {
    let file = PreferencesFile::new(config.preferences_file());
    let prefs = file
        .load()
        .with_context(|| format!("failed to read {}", file.path().display()))?;
    Ok(Tracker::open(prefs, Box::new(file), config.consolidation))
}

/// Reads day logs from `history_start` through `today` into the tracker.
pub fn load_history(tracker: &Tracker, config: &Config, today: i32) -> History {
    let load = load_range(&config.data_dir, config.history_start, today);
    let records = tracker.ingest_days(&load.days);
    tracing::debug!(days = load.days.len(), records, "loaded history");
    History {
        days: load.days.len(),
        errors: load.errors,
    }
}

/// Lists day logs that exist but could not be read. Writes nothing when
/// every day was read.
pub fn write_unreadable<W: Write>(writer: &mut W, history: &History) -> std::io::Result<()> {
    if history.errors.is_empty() {
        return Ok(());
    }
    writeln!(writer, "Unreadable day logs:")?;
    for (date_id, error) in &history.errors {
        writeln!(writer, "- {date_id}: {error}")?;
    }
    Ok(())
}

/// Formats seconds as duration string.
/// Returns "Xh Ym" if >= 1 hour, "Xm" if < 1 hour.
pub fn format_duration(secs: i64) -> String {
    if secs < 0 {
        return "0m".to_string();
    }
    let total_minutes = secs / 60;
    let hours = total_minutes / 60;
    let minutes = total_minutes % 60;

    if hours >= 1 {
        format!("{hours}h {minutes}m")
    } else {
        format!("{minutes}m")
    }
}
