//! Core domain logic for the focus tracker.
//!
//! This crate contains the fundamental types and logic for:
//! - Samples: parsing polling rows into typed observations
//! - Consolidation: folding samples into activity records
//! - Categories: assigning apps and sites to user-defined categories
//! - Aggregation: grouping records by date, identity, and category
//! - URL normalization: reducing tab URLs to site identities

pub mod aggregate;
pub mod category;
pub mod consolidate;
pub mod date;
pub mod prefs;
mod record;
pub mod sample;
pub mod tracker;
pub mod url;

pub use aggregate::{Aggregation, GroupValue, Grouper, RecordFilter, UnknownGrouper, aggregate};
pub use category::{
    CategoriesResponse, Categorizer, CategoryError, CategoryItems, CategorySnapshot,
    CategoryStore, UNCATEGORIZED,
};
pub use consolidate::{ConsolidationConfig, Consolidator};
pub use date::{DateInfo, enrich};
pub use prefs::{NullSink, PersistError, Preferences, PreferencesSink, PrefsError};
pub use record::Record;
pub use sample::{Sample, date_id, parse_rows};
pub use tracker::{Tracker, TrackerError};
pub use url::{TruncationRules, UrlNormalizer};
