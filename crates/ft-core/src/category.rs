//! Category assignments for apps and sites.
//!
//! The store keeps a forward map (identifier to category), a reverse index
//! (category to member sites and apps), and a user-defined display order.
//! Every mutation validates before touching any of the three, so a failed
//! call leaves the store exactly as it was.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::prefs::{Preferences, PrefsError};

/// Preferences key holding the reverse index.
pub const CATEGORIES_KEY: &str = "categories";

/// Preferences key holding the display order.
pub const CATEGORY_ORDER_KEY: &str = "category_order";

/// Category reported for identifiers with no assignment.
pub const UNCATEGORIZED: &str = "Other";

/// Categories installed when the preferences contain none.
pub const DEFAULT_CATEGORIES: [&str; 4] = ["Work", "Productivity", "Entertainment", "Games"];

/// Errors from category store operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CategoryError {
    #[error("category '{name}' already exists")]
    AlreadyExists { name: String },

    #[error("unknown category '{name}'")]
    UnknownCategory { name: String },

    #[error("invalid category order: {reason}")]
    InvalidOrder { reason: String },

    #[error("category name cannot be empty")]
    EmptyName,

    #[error("identifier cannot be empty")]
    EmptyIdentifier,
}

/// Sites and apps assigned to one category.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryItems {
    #[serde(default)]
    pub sites: BTreeSet<String>,
    #[serde(default)]
    pub apps: BTreeSet<String>,
}

impl CategoryItems {
    fn remove(&mut self, identifier: &str) {
        self.sites.remove(identifier);
        self.apps.remove(identifier);
    }
}

/// Payload returned to callers listing categories.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoriesResponse {
    pub categories: BTreeMap<String, CategoryItems>,
    pub order: Vec<String>,
}

/// Resolves the category of an interval.
pub trait Categorizer {
    /// Categorizes by URL when one is present, otherwise by exact exe name.
    fn categorize(&self, exe_path: &str, url: &str) -> String;
}

/// Finds the category for an exe path or URL in a forward map.
///
/// When several identifiers are contained in the URL the longest one wins,
/// and equal lengths fall back to lexicographic order.
fn categorize_in(assignments: &BTreeMap<String, String>, exe_path: &str, url: &str) -> String {
    let found = if url.is_empty() {
        assignments.get(exe_path)
    } else {
        assignments
            .iter()
            .filter(|(identifier, _)| !identifier.is_empty() && url.contains(identifier.as_str()))
            .min_by(|(a, _), (b, _)| b.len().cmp(&a.len()).then_with(|| a.cmp(b)))
            .map(|(_, category)| category)
    };
    found.map_or_else(|| UNCATEGORIZED.to_string(), Clone::clone)
}

/// Immutable copy of the forward map, used for a whole consolidation pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CategorySnapshot {
    assignments: BTreeMap<String, String>,
    revision: u64,
}

impl CategorySnapshot {
    /// Revision of the store this snapshot was taken from.
    pub const fn revision(&self) -> u64 {
        self.revision
    }
}

impl Categorizer for CategorySnapshot {
    fn categorize(&self, exe_path: &str, url: &str) -> String {
        categorize_in(&self.assignments, exe_path, url)
    }
}

/// Mutable category assignments with reverse index and display order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryStore {
    assignments: BTreeMap<String, String>,
    members: BTreeMap<String, CategoryItems>,
    order: Vec<String>,
    revision: u64,
}

impl Default for CategoryStore {
    fn default() -> Self {
        Self {
            assignments: BTreeMap::new(),
            members: DEFAULT_CATEGORIES
                .iter()
                .map(|name| ((*name).to_string(), CategoryItems::default()))
                .collect(),
            order: DEFAULT_CATEGORIES.iter().map(|s| (*s).to_string()).collect(),
            revision: 0,
        }
    }
}

impl CategoryStore {
    /// Builds a store from the preferences document.
    ///
    /// Returns `true` alongside the store when the document had no categories
    /// and defaults were installed, so the caller can persist them.
    pub fn from_preferences(prefs: &Preferences) -> (Self, bool) {
        let members: BTreeMap<String, CategoryItems> = match prefs.get(CATEGORIES_KEY) {
            Ok(members) => members.unwrap_or_default(),
            Err(e) => {
                tracing::warn!(error = %e, "ignoring unreadable categories");
                BTreeMap::new()
            }
        };
        if members.is_empty() {
            return (Self::default(), true);
        }

        let order: Vec<String> = match prefs.get(CATEGORY_ORDER_KEY) {
            Ok(order) => order.unwrap_or_default(),
            Err(e) => {
                tracing::warn!(error = %e, "ignoring unreadable category order");
                Vec::new()
            }
        };

        (Self::from_parts(members, order), false)
    }

    /// Builds a consistent store from a reverse index and a display order.
    ///
    /// Identifiers listed under several categories stay in the first one.
    /// The order drops unknown or repeated names and appends missing ones.
    pub fn from_parts(mut members: BTreeMap<String, CategoryItems>, order: Vec<String>) -> Self {
        let mut assignments: BTreeMap<String, String> = BTreeMap::new();
        for (category, items) in &mut members {
            let mut duplicates = Vec::new();
            for identifier in items.sites.iter().chain(&items.apps) {
                match assignments.get(identifier) {
                    Some(existing) if existing != category => {
                        tracing::warn!(
                            identifier = %identifier,
                            kept = %existing,
                            dropped = %category,
                            "identifier assigned to multiple categories"
                        );
                        duplicates.push(identifier.clone());
                    }
                    Some(_) => {}
                    None => {
                        assignments.insert(identifier.clone(), category.clone());
                    }
                }
            }
            for identifier in duplicates {
                items.remove(&identifier);
            }
        }

        let mut seen = BTreeSet::new();
        let mut reconciled: Vec<String> = order
            .into_iter()
            .filter(|name| members.contains_key(name) && seen.insert(name.clone()))
            .collect();
        reconciled.extend(members.keys().filter(|name| !seen.contains(*name)).cloned());

        Self {
            assignments,
            members,
            order: reconciled,
            revision: 0,
        }
    }

    /// Number of successful mutations since the store was built.
    pub const fn revision(&self) -> u64 {
        self.revision
    }

    /// Takes an immutable copy of the current assignments.
    pub fn snapshot(&self) -> CategorySnapshot {
        CategorySnapshot {
            assignments: self.assignments.clone(),
            revision: self.revision,
        }
    }

    /// Category currently assigned to an identifier.
    pub fn category_of(&self, identifier: &str) -> Option<&str> {
        self.assignments.get(identifier).map(String::as_str)
    }

    pub fn order(&self) -> &[String] {
        &self.order
    }

    pub fn members(&self, category: &str) -> Option<&CategoryItems> {
        self.members.get(category)
    }

    /// Returns the categories and their display order.
    pub fn response(&self) -> CategoriesResponse {
        CategoriesResponse {
            categories: self.members.clone(),
            order: self.order.clone(),
        }
    }

    /// Moves an identifier to `category`, or uncategorizes it when `category` is empty.
    pub fn set_item_category(
        &mut self,
        identifier: &str,
        category: &str,
        is_app: bool,
    ) -> Result<(), CategoryError> {
        if identifier.is_empty() {
            return Err(CategoryError::EmptyIdentifier);
        }
        if !category.is_empty() && !self.members.contains_key(category) {
            return Err(CategoryError::UnknownCategory {
                name: category.to_string(),
            });
        }

        if let Some(old) = self.assignments.remove(identifier) {
            if let Some(items) = self.members.get_mut(&old) {
                items.remove(identifier);
            }
        }

        let target = if category.is_empty() {
            None
        } else {
            self.members.get_mut(category)
        };
        if let Some(items) = target {
            if is_app {
                items.apps.insert(identifier.to_string());
            } else {
                items.sites.insert(identifier.to_string());
            }
            self.assignments
                .insert(identifier.to_string(), category.to_string());
        }

        self.revision += 1;
        Ok(())
    }

    /// Adds an empty category at the end of the display order.
    pub fn create_category(&mut self, name: &str) -> Result<(), CategoryError> {
        if name.is_empty() {
            return Err(CategoryError::EmptyName);
        }
        if self.members.contains_key(name) {
            return Err(CategoryError::AlreadyExists {
                name: name.to_string(),
            });
        }

        self.members
            .insert(name.to_string(), CategoryItems::default());
        self.order.push(name.to_string());
        self.revision += 1;
        Ok(())
    }

    /// Replaces the display order with a permutation of the existing categories.
    pub fn reorder_categories(&mut self, order: &[String]) -> Result<(), CategoryError> {
        if order.len() != self.members.len() {
            return Err(CategoryError::InvalidOrder {
                reason: format!(
                    "expected {} categories, got {}",
                    self.members.len(),
                    order.len()
                ),
            });
        }

        let mut seen = BTreeSet::new();
        for name in order {
            if !self.members.contains_key(name) {
                return Err(CategoryError::UnknownCategory { name: name.clone() });
            }
            if !seen.insert(name.as_str()) {
                return Err(CategoryError::InvalidOrder {
                    reason: format!("category '{name}' listed twice"),
                });
            }
        }

        self.order = order.to_vec();
        self.revision += 1;
        Ok(())
    }

    /// Writes the store's keys into a preferences document.
    pub fn write_to(&self, prefs: &mut Preferences) -> Result<(), PrefsError> {
        prefs.set(CATEGORIES_KEY, &self.members)?;
        prefs.set(CATEGORY_ORDER_KEY, &self.order)
    }
}

impl Categorizer for CategoryStore {
    fn categorize(&self, exe_path: &str, url: &str) -> String {
        categorize_in(&self.assignments, exe_path, url)
    }
}
