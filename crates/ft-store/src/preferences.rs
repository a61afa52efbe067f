//! Preferences JSON file.

use std::fs;
use std::path::{Path, PathBuf};

use ft_core::category::{CATEGORIES_KEY, CATEGORY_ORDER_KEY};
use ft_core::{PersistError, Preferences, PreferencesSink};

use crate::StoreError;

/// Keys rewritten on save; everything else in the file is left alone.
const OWNED_KEYS: [&str; 2] = [CATEGORIES_KEY, CATEGORY_ORDER_KEY];

/// Preferences document stored as a JSON file.
#[derive(Debug, Clone)]
pub struct PreferencesFile {
    path: PathBuf,
}

impl PreferencesFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the document.
    ///
    /// A missing file yields an empty document. So does malformed JSON, with
    /// a warning.
    pub fn load(&self) -> Result<Preferences, StoreError> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Preferences::new()),
            Err(source) => {
                return Err(StoreError::Io {
                    path: self.path.clone(),
                    source,
                });
            }
        };

        Ok(Preferences::from_json(&content).unwrap_or_else(|e| {
            tracing::warn!(path = ?self.path, error = %e, "ignoring malformed preferences file");
            Preferences::new()
        }))
    }

    fn write(&self, prefs: &Preferences) -> Result<(), StoreError> {
        let io_error = |source| StoreError::Io {
            path: self.path.clone(),
            source,
        };

        let mut on_disk = self.load()?;
        on_disk.merge_from(&prefs.subset(&OWNED_KEYS));

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(io_error)?;
        }
        let json = on_disk.to_json_pretty()?;
        fs::write(&self.path, json).map_err(io_error)?;
        tracing::debug!(path = ?self.path, "saved preferences");
        Ok(())
    }
}

impl PreferencesSink for PreferencesFile {
    fn save(&self, prefs: &Preferences) -> Result<(), PersistError> {
        self.write(prefs)
            .map_err(|e| PersistError::new(format!("could not write {}", self.path.display()), e))
    }
}
