//! Consolidation of raw samples into activity intervals.
//!
//! # Algorithm Summary
//!
//! The pass walks consecutive sample pairs, crediting the time between them
//! to the first sample of the pair:
//!
//! 1. An `Off` sample or a gap longer than the gap threshold closes the
//!    current interval; the gap itself is never credited.
//! 2. Idle ticks on the current identity build up an inactive streak. Once
//!    the streak reaches the idle cutoff the interval closes and the streak
//!    is dropped. A shorter streak is folded back in when activity resumes.
//! 3. Idle ticks on any other identity close the current interval without
//!    starting a new one.
//! 4. Active ticks extend the current interval or start a new one.
//!
//! Identity is the exact `(exe, normalized url, tab title)` triple.

use serde::{Deserialize, Serialize};

use crate::category::Categorizer;
use crate::date::enrich;
use crate::record::Record;
use crate::sample::Sample;
use crate::url::UrlNormalizer;

/// Thresholds for the consolidation pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsolidationConfig {
    /// Pairs further apart than this are a tracker gap (sleep, crash).
    /// Default: 15 seconds.
    pub gap_threshold_secs: i64,

    /// Continuous idle time on one identity that ends the interval.
    /// Default: 120 seconds.
    pub idle_cutoff_secs: i64,
}

impl Default for ConsolidationConfig {
    fn default() -> Self {
        Self {
            gap_threshold_secs: 15,
            idle_cutoff_secs: 120,
        }
    }
}

/// Interval being accumulated.
#[derive(Debug)]
struct Activity {
    exe_path: String,
    url: String,
    name: String,
    date_id: i32,
    duration_secs: i64,
    inactive_streak_secs: i64,
}

impl Activity {
    fn start(sample: &Sample, url: String, duration_secs: i64) -> Self {
        Self {
            exe_path: sample.identifier.clone(),
            url,
            name: sample.tab_title.clone(),
            date_id: sample.date_id(),
            duration_secs,
            inactive_streak_secs: 0,
        }
    }

    fn is_same(&self, sample: &Sample, url: &str) -> bool {
        self.exe_path == sample.identifier && self.url == url && self.name == sample.tab_title
    }
}

/// Remembers the last normalized URL; consecutive samples usually share it.
#[derive(Debug, Default)]
struct NormalizedUrlCache {
    raw: String,
    normalized: String,
}

impl NormalizedUrlCache {
    fn get(&mut self, normalizer: &UrlNormalizer, raw: &str) -> String {
        if self.raw != raw {
            self.normalized = normalizer.normalize(raw);
            self.raw = raw.to_string();
        }
        self.normalized.clone()
    }
}

/// Turns one day's samples into records.
pub struct Consolidator<'a, C: Categorizer + ?Sized> {
    normalizer: &'a UrlNormalizer,
    categorizer: &'a C,
    config: ConsolidationConfig,
}

impl<'a, C: Categorizer + ?Sized> Consolidator<'a, C> {
    pub const fn new(
        normalizer: &'a UrlNormalizer,
        categorizer: &'a C,
        config: ConsolidationConfig,
    ) -> Self {
        Self {
            normalizer,
            categorizer,
            config,
        }
    }

    /// Consolidates samples, which must be sorted by timestamp.
    pub fn consolidate(&self, samples: &[Sample]) -> Vec<Record> {
        let mut records = Vec::new();
        let mut current: Option<Activity> = None;
        let mut urls = NormalizedUrlCache::default();

        for pair in samples.windows(2) {
            let (sample, next) = (&pair[0], &pair[1]);

            if sample.is_off() {
                self.flush(&mut current, &mut records);
                continue;
            }

            let duration = (next.timestamp - sample.timestamp).num_seconds();
            if duration < 0 || duration > self.config.gap_threshold_secs {
                self.flush(&mut current, &mut records);
                continue;
            }

            let url = urls.get(self.normalizer, &sample.tab_url);
            let same = current
                .as_ref()
                .is_some_and(|activity| activity.is_same(sample, &url));

            match (sample.had_activity, current.as_mut()) {
                (false, Some(activity)) if same => {
                    activity.inactive_streak_secs += duration;
                    if activity.inactive_streak_secs >= self.config.idle_cutoff_secs {
                        self.flush(&mut current, &mut records);
                    }
                }
                (false, _) => self.flush(&mut current, &mut records),
                (true, Some(activity)) if same => {
                    if activity.inactive_streak_secs < self.config.idle_cutoff_secs {
                        activity.duration_secs += activity.inactive_streak_secs + duration;
                    }
                    activity.inactive_streak_secs = 0;
                }
                (true, _) => {
                    self.flush(&mut current, &mut records);
                    current = Some(Activity::start(sample, url, duration));
                }
            }
        }

        self.flush(&mut current, &mut records);
        records
    }

    /// Emits the current interval if it has positive duration, then clears it.
    fn flush(&self, current: &mut Option<Activity>, records: &mut Vec<Record>) {
        let Some(activity) = current.take() else {
            return;
        };
        if activity.duration_secs <= 0 {
            return;
        }

        let category = self
            .categorizer
            .categorize(&activity.exe_path, &activity.url);
        records.push(Record {
            exe_path: activity.exe_path,
            url: activity.url,
            name: activity.name,
            duration_secs: activity.duration_secs,
            date_id: activity.date_id,
            date_info: enrich(activity.date_id),
            category,
        });
    }
}
