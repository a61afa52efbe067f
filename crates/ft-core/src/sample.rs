//! Raw focus-polling samples.

use chrono::{DateTime, Datelike, FixedOffset};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Identifier recorded while the tracker was inactive (machine locked, app stopped).
pub const OFF_IDENTIFIER: &str = "Off";

/// Number of fields in a day-log row.
pub const ROW_FIELDS: usize = 5;

/// Errors for a single malformed day-log row.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RowError {
    /// The row did not have enough fields.
    #[error("expected {ROW_FIELDS} fields, found {found}")]
    TooFewFields { found: usize },

    /// The timestamp was not RFC 3339.
    #[error("invalid timestamp: {value}")]
    Timestamp { value: String },
}

/// One polling observation of the focused window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sample {
    /// Process or application name, or [`OFF_IDENTIFIER`].
    pub identifier: String,
    /// When the sample was taken, in the offset it was recorded with.
    pub timestamp: DateTime<FixedOffset>,
    /// Title of the active browser tab, if any.
    pub tab_title: String,
    /// URL of the active browser tab, if any.
    pub tab_url: String,
    /// Whether keyboard or mouse input happened during the tick.
    pub had_activity: bool,
}

impl Sample {
    /// Parses a raw row `{identifier, timestamp, tabName, tabUrl, hadActivity}`.
    pub fn from_row<S: AsRef<str>>(row: &[S]) -> Result<Self, RowError> {
        if row.len() < ROW_FIELDS {
            return Err(RowError::TooFewFields { found: row.len() });
        }
        let raw_timestamp = row[1].as_ref();
        let timestamp =
            DateTime::parse_from_rfc3339(raw_timestamp).map_err(|_| RowError::Timestamp {
                value: raw_timestamp.to_string(),
            })?;

        Ok(Self {
            identifier: row[0].as_ref().to_string(),
            timestamp,
            tab_title: row[2].as_ref().to_string(),
            tab_url: row[3].as_ref().to_string(),
            had_activity: row[4].as_ref() == "true",
        })
    }

    /// Returns true for the tracker-inactive sentinel.
    pub fn is_off(&self) -> bool {
        self.identifier == OFF_IDENTIFIER
    }

    /// Day id (`YYYYMMDD`) of the sample in its recorded offset.
    pub fn date_id(&self) -> i32 {
        date_id(&self.timestamp)
    }
}

/// Encodes a timestamp's calendar date as `YYYYMMDD`.
pub fn date_id<Tz: chrono::TimeZone>(timestamp: &DateTime<Tz>) -> i32 {
    let date = timestamp.date_naive();
    #[expect(
        clippy::cast_possible_wrap,
        reason = "month and day are at most 31"
    )]
    let (month, day) = (date.month() as i32, date.day() as i32);
    date.year() * 10_000 + month * 100 + day
}

/// Parses a day's rows, skipping malformed ones.
pub fn parse_rows<I, R, S>(rows: I) -> Vec<Sample>
where
    I: IntoIterator<Item = R>,
    R: AsRef<[S]>,
    S: AsRef<str>,
{
    rows.into_iter()
        .enumerate()
        .filter_map(|(idx, row)| match Sample::from_row(row.as_ref()) {
            Ok(sample) => Some(sample),
            Err(e) => {
                tracing::trace!(row = idx, error = %e, "skipping malformed row");
                None
            }
        })
        .collect()
}
