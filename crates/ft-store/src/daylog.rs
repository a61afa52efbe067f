//! Day-log CSV reading.

use std::path::{Path, PathBuf};

use chrono::{NaiveDate, NaiveTime};
use rayon::prelude::*;

use ft_core::date::split_date_id;
use ft_core::{Sample, date_id, parse_rows};

use crate::StoreError;

/// Days read by [`load_range`].
#[derive(Debug, Default)]
pub struct DayLoad {
    /// Samples per day id, ascending by day.
    pub days: Vec<(i32, Vec<Sample>)>,
    /// Days whose log exists but could not be read.
    pub errors: Vec<(i32, StoreError)>,
}

/// Path of the log for one day.
pub fn day_path(dir: &Path, date_id: i32) -> PathBuf {
    dir.join(format!("{date_id}.csv"))
}

/// Reads one day log.
///
/// Malformed rows (including a header row and rows that are not valid UTF-8)
/// are skipped. Samples are returned in timestamp order. An I/O error fails
/// the whole day.
pub fn read_day(path: &Path) -> Result<Vec<Sample>, StoreError> {
    let csv_error = |source| StoreError::Csv {
        path: path.to_path_buf(),
        source,
    };

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)
        .map_err(csv_error)?;
    let mut rows = Vec::new();
    for (idx, record) in reader.byte_records().enumerate() {
        let record = record.map_err(csv_error)?;
        match record
            .iter()
            .map(std::str::from_utf8)
            .collect::<Result<Vec<&str>, _>>()
        {
            Ok(fields) => rows.push(fields.into_iter().map(str::to_owned).collect::<Vec<_>>()),
            Err(e) => tracing::trace!(row = idx, error = %e, "skipping row with invalid UTF-8"),
        }
    }

    let mut samples = parse_rows(rows);
    samples.sort_by_key(|sample| sample.timestamp);
    Ok(samples)
}

/// Day ids from `start` through `end`, inclusive.
///
/// Returns nothing when either bound is not a valid day id or `end` precedes
/// `start`.
pub fn dates_between(start: i32, end: i32) -> Vec<i32> {
    let (Some(start), Some(end)) = (strict_date(start), strict_date(end)) else {
        return Vec::new();
    };
    start
        .iter_days()
        .take_while(|day| *day <= end)
        .map(|day| date_id(&day.and_time(NaiveTime::MIN).and_utc()))
        .collect()
}

fn strict_date(date_id: i32) -> Option<NaiveDate> {
    let (year, month, day) = split_date_id(date_id);
    NaiveDate::from_ymd_opt(year, u32::try_from(month).ok()?, u32::try_from(day).ok()?)
}

/// Reads every existing day log in the range in parallel.
///
/// Missing days are skipped. Unreadable days are logged and collected in
/// [`DayLoad::errors`].
pub fn load_range(dir: &Path, start: i32, end: i32) -> DayLoad {
    let results: Vec<(i32, Result<Vec<Sample>, StoreError>)> = dates_between(start, end)
        .into_par_iter()
        .filter_map(|date_id| {
            let path = day_path(dir, date_id);
            if !path.exists() {
                tracing::debug!(date_id, path = ?path, "no day log");
                return None;
            }
            Some((date_id, read_day(&path)))
        })
        .collect();

    let mut load = DayLoad::default();
    for (date_id, result) in results {
        match result {
            Ok(samples) => load.days.push((date_id, samples)),
            Err(e) => {
                tracing::warn!(date_id, error = %e, "failed to read day log");
                load.errors.push((date_id, e));
            }
        }
    }
    load
}
