//! Multi-dimension aggregation of records.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::record::Record;

/// Dimension a record set can be grouped by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Grouper {
    Date,
    Week,
    Month,
    Year,
    DayOfWeek,
    IsWeekend,
    Category,
    Url,
    ExePath,
    Name,
}

impl Grouper {
    pub const ALL: [Self; 10] = [
        Self::Date,
        Self::Week,
        Self::Month,
        Self::Year,
        Self::DayOfWeek,
        Self::IsWeekend,
        Self::Category,
        Self::Url,
        Self::ExePath,
        Self::Name,
    ];

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Date => "date",
            Self::Week => "week",
            Self::Month => "month",
            Self::Year => "year",
            Self::DayOfWeek => "day_of_week",
            Self::IsWeekend => "is_weekend",
            Self::Category => "category",
            Self::Url => "url",
            Self::ExePath => "exe_path",
            Self::Name => "name",
        }
    }

    /// Extracts this dimension's value from a record.
    pub fn value_of(self, record: &Record) -> GroupValue {
        match self {
            Self::Date => GroupValue::Int(i64::from(record.date_id)),
            Self::Week => GroupValue::Int(i64::from(record.date_info.week_of_year)),
            Self::Month => GroupValue::Int(i64::from(record.month())),
            Self::Year => GroupValue::Int(i64::from(record.year())),
            Self::DayOfWeek => GroupValue::Text(record.date_info.day_of_week.clone()),
            Self::IsWeekend => GroupValue::Bool(record.date_info.is_weekend),
            Self::Category => GroupValue::Text(record.category.clone()),
            Self::Url => GroupValue::Text(record.url.clone()),
            Self::ExePath => GroupValue::Text(record.exe_path.clone()),
            Self::Name => GroupValue::Text(record.name.clone()),
        }
    }
}

impl fmt::Display for Grouper {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error type for unknown grouper tags.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownGrouper(pub String);

impl fmt::Display for UnknownGrouper {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown grouper: {}", self.0)
    }
}

impl std::error::Error for UnknownGrouper {}

impl FromStr for Grouper {
    type Err = UnknownGrouper;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|grouper| grouper.as_str() == s)
            .ok_or_else(|| UnknownGrouper(s.to_string()))
    }
}

impl Serialize for Grouper {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Grouper {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Value of one dimension for one aggregation entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum GroupValue {
    Bool(bool),
    Int(i64),
    Text(String),
}

impl fmt::Display for GroupValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(i) => write!(f, "{i}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

/// Total duration for one distinct combination of grouper values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Aggregation {
    pub groupers: BTreeMap<String, GroupValue>,
    /// Total duration in seconds.
    pub duration: i64,
}

/// Predicates a record must satisfy to be aggregated.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordFilter {
    /// Inclusive lower bound on the day id.
    pub start_date: Option<i32>,
    /// Inclusive upper bound on the day id.
    pub end_date: Option<i32>,
    pub category: Option<String>,
    pub exe_path: Option<String>,
    pub name: Option<String>,
    /// Substring the record's URL must contain.
    pub url: Option<String>,
    pub is_weekend: Option<bool>,
}

impl RecordFilter {
    /// Builds a filter from string key/value pairs.
    ///
    /// Unknown keys are ignored, as are date bounds that are not integers.
    pub fn from_pairs<'a, I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut filter = Self::default();
        for (key, value) in pairs {
            match key {
                "start_date" => filter.start_date = parse_date_bound(key, value),
                "end_date" => filter.end_date = parse_date_bound(key, value),
                "category" => filter.category = Some(value.to_string()),
                "exe_path" => filter.exe_path = Some(value.to_string()),
                "name" => filter.name = Some(value.to_string()),
                "url" => filter.url = Some(value.to_string()),
                "is_weekend" => filter.is_weekend = Some(value == "true"),
                _ => tracing::debug!(key, "ignoring unknown filter"),
            }
        }
        filter
    }

    /// Builds a filter from a string map.
    pub fn from_map<K, V, S>(map: &HashMap<K, V, S>) -> Self
    where
        K: AsRef<str>,
        V: AsRef<str>,
    {
        Self::from_pairs(map.iter().map(|(k, v)| (k.as_ref(), v.as_ref())))
    }

    /// Returns true when the record satisfies every predicate.
    pub fn matches(&self, record: &Record) -> bool {
        self.start_date.is_none_or(|start| record.date_id >= start)
            && self.end_date.is_none_or(|end| record.date_id <= end)
            && self
                .category
                .as_ref()
                .is_none_or(|category| record.category == *category)
            && self
                .exe_path
                .as_ref()
                .is_none_or(|exe_path| record.exe_path == *exe_path)
            && self.name.as_ref().is_none_or(|name| record.name == *name)
            && self
                .url
                .as_ref()
                .is_none_or(|url| record.url.contains(url.as_str()))
            && self
                .is_weekend
                .is_none_or(|weekend| record.date_info.is_weekend == weekend)
    }
}

fn parse_date_bound(key: &str, value: &str) -> Option<i32> {
    match value.trim().parse() {
        Ok(date_id) => Some(date_id),
        Err(e) => {
            tracing::warn!(key, value, error = %e, "ignoring non-numeric date filter");
            None
        }
    }
}

/// Sums record durations per distinct combination of grouper values.
///
/// Records failing the filter are skipped. With no groupers the result is a
/// single entry (if any record passes) with an empty grouper map. Entries
/// come back in the order their key was first seen.
pub fn aggregate<'a, I>(records: I, groupers: &[Grouper], filter: &RecordFilter) -> Vec<Aggregation>
where
    I: IntoIterator<Item = &'a Record>,
{
    let mut index: HashMap<Vec<GroupValue>, usize> = HashMap::new();
    let mut aggregations: Vec<Aggregation> = Vec::new();

    for record in records {
        if !filter.matches(record) {
            continue;
        }

        let key: Vec<GroupValue> = groupers.iter().map(|g| g.value_of(record)).collect();
        if let Some(&slot) = index.get(&key) {
            aggregations[slot].duration += record.duration_secs;
            continue;
        }

        let groupers = groupers
            .iter()
            .zip(&key)
            .map(|(g, value)| (g.as_str().to_string(), value.clone()))
            .collect();
        index.insert(key, aggregations.len());
        aggregations.push(Aggregation {
            groupers,
            duration: record.duration_secs,
        });
    }

    aggregations
}
