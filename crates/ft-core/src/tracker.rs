//! Shared tracker state and the query surface.
//!
//! # Thread Safety
//!
//! The category store, the per-day record arena, and the preferences
//! document live behind a single [`Mutex`]. Category mutations, the
//! recategorization sweep over every held record, and the persistence call
//! all happen while holding it, so no caller can observe a half-applied
//! reassignment.
//!
//! Consolidation runs outside the lock against a [`CategorySnapshot`]. When
//! the store changed while a day was being consolidated, the day's records
//! are recategorized before they are inserted.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard, PoisonError};

use rayon::prelude::*;
use thiserror::Error;

use crate::aggregate::{Aggregation, Grouper, RecordFilter, UnknownGrouper, aggregate};
use crate::category::{CategoriesResponse, CategoryError, CategorySnapshot, CategoryStore};
use crate::consolidate::{ConsolidationConfig, Consolidator};
use crate::prefs::{PersistError, Preferences, PreferencesSink, PrefsError};
use crate::record::Record;
use crate::sample::Sample;
use crate::url::{TruncationRules, UrlNormalizer};

/// Errors from the tracker query surface.
#[derive(Debug, Error)]
pub enum TrackerError {
    #[error(transparent)]
    Category(#[from] CategoryError),

    #[error(transparent)]
    UnknownGrouper(#[from] UnknownGrouper),

    #[error(transparent)]
    Preferences(#[from] PrefsError),

    #[error(transparent)]
    Persist(#[from] PersistError),
}

#[derive(Debug)]
struct State {
    store: CategoryStore,
    days: BTreeMap<i32, Vec<Record>>,
    prefs: Preferences,
}

impl State {
    fn recategorize_all(&mut self) {
        for records in self.days.values_mut() {
            for record in records {
                record.recategorize(&self.store);
            }
        }
    }

    fn persist(&mut self, sink: &dyn PreferencesSink) -> Result<(), TrackerError> {
        self.store.write_to(&mut self.prefs)?;
        sink.save(&self.prefs)?;
        Ok(())
    }
}

/// Owns the category store and every consolidated record.
pub struct Tracker {
    state: Mutex<State>,
    normalizer: UrlNormalizer,
    config: ConsolidationConfig,
    sink: Box<dyn PreferencesSink>,
}

impl std::fmt::Debug for Tracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tracker")
            .field("normalizer", &self.normalizer)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Tracker {
    /// Builds the tracker from the preferences document.
    ///
    /// Default categories are persisted through `sink` when the document had
    /// none; a failed save is logged and the defaults stay in memory.
    /// Unreadable truncation rules are ignored.
    pub fn open(
        prefs: Preferences,
        sink: Box<dyn PreferencesSink>,
        config: ConsolidationConfig,
    ) -> Self {
        let rules = TruncationRules::from_preferences(&prefs).unwrap_or_else(|e| {
            tracing::warn!(error = %e, "ignoring unreadable URL truncation rules");
            TruncationRules::new()
        });
        let (store, installed_defaults) = CategoryStore::from_preferences(&prefs);

        let mut state = State {
            store,
            days: BTreeMap::new(),
            prefs,
        };
        if installed_defaults {
            tracing::debug!("installing default categories");
            if let Err(e) = state.persist(sink.as_ref()) {
                tracing::warn!(error = %e, "failed to save default categories");
            }
        }

        Self {
            state: Mutex::new(state),
            normalizer: UrlNormalizer::new(rules),
            config,
            sink,
        }
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        // State is consistent after every mutation, so a poisoned lock is usable.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Takes a snapshot of the current category assignments.
    pub fn snapshot(&self) -> CategorySnapshot {
        self.lock().store.snapshot()
    }

    /// Consolidates one day's samples and stores the records, replacing any
    /// previous records for that day. Returns the number of records.
    pub fn ingest_day(&self, date_id: i32, samples: &[Sample]) -> usize {
        let snapshot = self.snapshot();
        let records = self.consolidate(samples, &snapshot);
        self.insert_days(vec![(date_id, records)], snapshot.revision())
    }

    /// Consolidates several days in parallel against one snapshot.
    pub fn ingest_days(&self, days: &[(i32, Vec<Sample>)]) -> usize {
        let snapshot = self.snapshot();
        let consolidated: Vec<(i32, Vec<Record>)> = days
            .par_iter()
            .map(|(date_id, samples)| (*date_id, self.consolidate(samples, &snapshot)))
            .collect();
        self.insert_days(consolidated, snapshot.revision())
    }

    fn consolidate(&self, samples: &[Sample], snapshot: &CategorySnapshot) -> Vec<Record> {
        Consolidator::new(&self.normalizer, snapshot, self.config).consolidate(samples)
    }

    fn insert_days(&self, days: Vec<(i32, Vec<Record>)>, revision: u64) -> usize {
        let mut state = self.lock();
        let stale = state.store.revision() != revision;
        let mut inserted = 0;
        for (date_id, mut records) in days {
            if stale {
                for record in &mut records {
                    record.recategorize(&state.store);
                }
            }
            inserted += records.len();
            tracing::debug!(date_id, records = records.len(), "consolidated day");
            state.days.insert(date_id, records);
        }
        inserted
    }

    /// Day ids with stored records, ascending.
    pub fn days(&self) -> Vec<i32> {
        self.lock().days.keys().copied().collect()
    }

    /// Total number of stored records.
    pub fn record_count(&self) -> usize {
        self.lock().days.values().map(Vec::len).sum()
    }

    /// Copies the stored records, in day order.
    pub fn records(&self) -> Vec<Record> {
        self.lock().days.values().flatten().cloned().collect()
    }

    /// Aggregates stored records by the named dimensions after filtering.
    pub fn get_aggregations<S: AsRef<str>>(
        &self,
        groupers: &[S],
        filters: &HashMap<String, String>,
    ) -> Result<Vec<Aggregation>, TrackerError> {
        let groupers = groupers
            .iter()
            .map(|g| g.as_ref().parse())
            .collect::<Result<Vec<Grouper>, _>>()?;
        let filter = RecordFilter::from_map(filters);

        let state = self.lock();
        Ok(aggregate(state.days.values().flatten(), &groupers, &filter))
    }

    /// Returns the categories and their display order.
    pub fn get_categories(&self) -> CategoriesResponse {
        self.lock().store.response()
    }

    /// Moves an identifier to a category (or uncategorizes it when `category`
    /// is empty), recategorizes every record, and persists.
    pub fn set_item_category(
        &self,
        identifier: &str,
        category: &str,
        is_app: bool,
    ) -> Result<(), TrackerError> {
        let mut state = self.lock();
        state.store.set_item_category(identifier, category, is_app)?;
        state.recategorize_all();
        tracing::info!(identifier, category, "category assignment changed");
        state.persist(self.sink.as_ref())
    }

    /// Adds an empty category and persists.
    pub fn create_category(&self, name: &str) -> Result<(), TrackerError> {
        let mut state = self.lock();
        state.store.create_category(name)?;
        tracing::info!(name, "category created");
        state.persist(self.sink.as_ref())
    }

    /// Replaces the category display order and persists.
    pub fn reorder_categories(&self, order: &[String]) -> Result<(), TrackerError> {
        let mut state = self.lock();
        state.store.reorder_categories(order)?;
        state.persist(self.sink.as_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::Arc;

    use chrono::{DateTime, Duration, FixedOffset, TimeZone};

    use crate::category::UNCATEGORIZED;
    use crate::prefs::NullSink;

    /// Sink that records every saved document.
    #[derive(Default, Clone)]
    struct RecordingSink {
        saves: Arc<Mutex<Vec<Preferences>>>,
        fail: bool,
    }

    impl RecordingSink {
        fn count(&self) -> usize {
            self.saves.lock().unwrap().len()
        }

        fn last(&self) -> Preferences {
            self.saves.lock().unwrap().last().cloned().unwrap()
        }
    }

    impl PreferencesSink for RecordingSink {
        fn save(&self, prefs: &Preferences) -> Result<(), PersistError> {
            if self.fail {
                return Err(PersistError::new(
                    "disk full",
                    std::io::Error::other("disk full"),
                ));
            }
            self.saves.lock().unwrap().push(prefs.clone());
            Ok(())
        }
    }

    fn ts(date: u32, seconds: i64) -> DateTime<FixedOffset> {
        FixedOffset::east_opt(0)
            .unwrap()
            .with_ymd_and_hms(2024, 1, date, 9, 0, 0)
            .single()
            .unwrap()
            + Duration::seconds(seconds)
    }

    fn sample(date: u32, seconds: i64, exe: &str, url: &str) -> Sample {
        Sample {
            identifier: exe.to_string(),
            timestamp: ts(date, seconds),
            tab_title: String::new(),
            tab_url: url.to_string(),
            had_activity: true,
        }
    }

    /// Two samples of activity on `exe` lasting `seconds`.
    fn day(date: u32, exe: &str, url: &str, seconds: i64) -> Vec<Sample> {
        vec![sample(date, 0, exe, url), sample(date, seconds, exe, url)]
    }

    fn tracker_with(prefs: &str, sink: RecordingSink) -> Tracker {
        Tracker::open(
            Preferences::from_json(prefs).unwrap(),
            Box::new(sink),
            ConsolidationConfig::default(),
        )
    }

    fn filters(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    #[test]
    fn open_persists_defaults_when_missing() {
        let sink = RecordingSink::default();
        let tracker = tracker_with(r#"{"theme":"dark"}"#, sink.clone());

        assert_eq!(sink.count(), 1);
        let saved = sink.last();
        assert_eq!(saved.raw("theme"), Some(r#""dark""#));
        assert!(saved.contains_key("categories"));
        assert_eq!(tracker.get_categories().order.len(), 4);
    }

    #[test]
    fn open_keeps_defaults_when_saving_them_fails() {
        let sink = RecordingSink {
            fail: true,
            ..RecordingSink::default()
        };
        let tracker = tracker_with("{}", sink.clone());

        assert_eq!(sink.count(), 0);
        assert_eq!(
            tracker.get_categories().order,
            ["Work", "Productivity", "Entertainment", "Games"]
        );
        let err = tracker.set_item_category("code.exe", "Work", true).unwrap_err();
        assert!(matches!(err, TrackerError::Persist(_)));
    }

    #[test]
    fn open_does_not_persist_existing_categories() {
        let sink = RecordingSink::default();
        let _tracker = tracker_with(r#"{"categories":{"Work":{}}}"#, sink.clone());
        assert_eq!(sink.count(), 0);
    }

    #[test]
    fn ingest_applies_truncation_rules() {
        let tracker = tracker_with(
            r#"{"url_truncation":{"github.com":["*/*"]}}"#,
            RecordingSink::default(),
        );
        tracker.ingest_day(
            20_240_105,
            &day(5, "chrome.exe", "https://github.com/rust-lang/rust", 10),
        );

        let records = tracker.records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].url, "github.com/rust-lang/rust");
    }

    #[test]
    fn reingesting_a_day_replaces_records() {
        let tracker = tracker_with("{}", RecordingSink::default());
        tracker.ingest_day(20_240_105, &day(5, "code.exe", "", 10));
        tracker.ingest_day(20_240_105, &day(5, "code.exe", "", 12));

        assert_eq!(tracker.days(), vec![20_240_105]);
        assert_eq!(tracker.record_count(), 1);
        assert_eq!(tracker.records()[0].duration_secs, 12);
    }

    #[test]
    fn aggregations_by_category_and_range() {
        let tracker = tracker_with("{}", RecordingSink::default());
        tracker.set_item_category("code.exe", "Work", true).unwrap();
        tracker.ingest_days(&[
            (20_240_105, day(5, "code.exe", "", 10)),
            (20_240_106, day(6, "code.exe", "", 5)),
            (20_240_107, day(7, "notepad.exe", "", 3)),
        ]);

        let mut result = tracker
            .get_aggregations(
                &["category"],
                &filters(&[("start_date", "20240105"), ("end_date", "20240107")]),
            )
            .unwrap();
        result.sort_by_key(|a| std::cmp::Reverse(a.duration));

        assert_eq!(result.len(), 2);
        assert_eq!(result[0].groupers["category"].to_string(), "Work");
        assert_eq!(result[0].duration, 15);
        assert_eq!(result[1].groupers["category"].to_string(), UNCATEGORIZED);
        assert_eq!(result[1].duration, 3);
    }

    #[test]
    fn unknown_grouper_is_reported() {
        let tracker = tracker_with("{}", RecordingSink::default());
        let err = tracker
            .get_aggregations(&["hour"], &HashMap::new())
            .unwrap_err();
        assert_eq!(err.to_string(), "unknown grouper: hour");
    }

    #[test]
    fn set_item_category_recategorizes_existing_records() {
        let sink = RecordingSink::default();
        let tracker = tracker_with("{}", sink.clone());
        tracker.ingest_day(20_240_105, &day(5, "chrome.exe", "https://youtube.com/watch", 10));
        assert_eq!(tracker.records()[0].category, UNCATEGORIZED);

        tracker
            .set_item_category("youtube.com", "Entertainment", false)
            .unwrap();
        assert_eq!(tracker.records()[0].category, "Entertainment");

        tracker.set_item_category("youtube.com", "", false).unwrap();
        assert_eq!(tracker.records()[0].category, UNCATEGORIZED);
        // defaults + two assignments
        assert_eq!(sink.count(), 3);
    }

    #[test]
    fn failed_mutation_leaves_state_and_skips_persist() {
        let sink = RecordingSink::default();
        let tracker = tracker_with("{}", sink.clone());
        let before = tracker.get_categories();

        let err = tracker.create_category("Work").unwrap_err();
        assert!(matches!(
            err,
            TrackerError::Category(CategoryError::AlreadyExists { .. })
        ));
        let err = tracker
            .reorder_categories(&["Work".to_string()])
            .unwrap_err();
        assert!(matches!(
            err,
            TrackerError::Category(CategoryError::InvalidOrder { .. })
        ));

        assert_eq!(tracker.get_categories(), before);
        assert_eq!(sink.count(), 1);
    }

    #[test]
    fn create_and_reorder_persist() {
        let sink = RecordingSink::default();
        let tracker = tracker_with(r#"{"categories":{"A":{},"B":{}}}"#, sink.clone());

        tracker.create_category("C").unwrap();
        tracker
            .reorder_categories(&["C".to_string(), "A".to_string(), "B".to_string()])
            .unwrap();

        assert_eq!(sink.count(), 2);
        let order: Vec<String> = sink.last().get("category_order").unwrap().unwrap();
        assert_eq!(order, vec!["C", "A", "B"]);
    }

    #[test]
    fn persist_failure_is_reported() {
        let tracker = Tracker::open(
            Preferences::from_json(r#"{"categories":{"Work":{}}}"#).unwrap(),
            Box::new(RecordingSink {
                fail: true,
                ..RecordingSink::default()
            }),
            ConsolidationConfig::default(),
        );

        let err = tracker.create_category("Games").unwrap_err();
        assert!(matches!(err, TrackerError::Persist(_)));
        // In-memory state still reflects the mutation.
        assert!(tracker.get_categories().order.contains(&"Games".to_string()));
    }

    #[test]
    fn ingest_after_concurrent_change_uses_current_categories() {
        let tracker = tracker_with("{}", RecordingSink::default());
        let snapshot = tracker.snapshot();
        let records = tracker.consolidate(&day(5, "code.exe", "", 10), &snapshot);
        assert_eq!(records[0].category, UNCATEGORIZED);

        tracker.set_item_category("code.exe", "Work", true).unwrap();
        tracker.insert_days(vec![(20_240_105, records)], snapshot.revision());

        assert_eq!(tracker.records()[0].category, "Work");
    }

    #[test]
    fn tracker_is_shareable_across_threads() {
        let tracker = Arc::new(
            Tracker::open(
                Preferences::new(),
                Box::new(NullSink),
                ConsolidationConfig::default(),
            ),
        );

        let handles: Vec<_> = (1..=4)
            .map(|date| {
                let tracker = Arc::clone(&tracker);
                std::thread::spawn(move || {
                    tracker.ingest_day(20_240_100 + date, &day(date.unsigned_abs(), "code.exe", "", 5));
                    tracker.set_item_category("code.exe", "Work", true).unwrap();
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(tracker.record_count(), 4);
        assert!(tracker.records().iter().all(|r| r.category == "Work"));
    }
}
