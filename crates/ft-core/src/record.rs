//! Consolidated activity intervals.

use serde::{Deserialize, Serialize};

use crate::category::Categorizer;
use crate::date::DateInfo;

/// A span of continuous activity with a single identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    /// Process or application name.
    pub exe_path: String,
    /// Normalized site identity, empty for non-browser activity.
    pub url: String,
    /// Tab title, empty for non-browser activity.
    pub name: String,
    /// Active time in seconds, always positive.
    pub duration_secs: i64,
    /// Day id (`YYYYMMDD`) the interval started on.
    pub date_id: i32,
    pub date_info: DateInfo,
    /// Cached category; refreshed whenever assignments change.
    pub category: String,
}

impl Record {
    /// Recomputes the cached category from the current assignments.
    pub fn recategorize<C: Categorizer + ?Sized>(&mut self, categorizer: &C) {
        self.category = categorizer.categorize(&self.exe_path, &self.url);
    }

    /// Calendar month (1-12) from the day id.
    pub const fn month(&self) -> i32 {
        (self.date_id / 100) % 100
    }

    /// Calendar year from the day id.
    pub const fn year(&self) -> i32 {
        self.date_id / 10_000
    }
}
