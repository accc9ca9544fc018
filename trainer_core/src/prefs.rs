//! Local key-value preference storage.

use crate::{persist, Result};
use std::collections::BTreeMap;
use std::path::PathBuf;

pub trait PreferenceStore {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&mut self, key: &str, value: &str) -> Result<()>;
}

/// Preferences kept in a small JSON map on disk
#[derive(Clone, Debug)]
pub struct FilePreferences {
    path: PathBuf,
}

impl FilePreferences {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl PreferenceStore for FilePreferences {
    /// A missing or unreadable file reads as "no preference"
    fn get(&self, key: &str) -> Result<Option<String>> {
        match persist::load_json::<BTreeMap<String, String>>(&self.path) {
            Ok(map) => Ok(map.get(key).cloned()),
            Err(e) => {
                tracing::warn!(
                    "Failed to read preferences {:?}: {}. Using defaults.",
                    self.path,
                    e
                );
                Ok(None)
            }
        }
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        persist::update_json(&self.path, |map: &mut BTreeMap<String, String>| {
            map.insert(key.to_string(), value.to_string());
            Ok(())
        })?;
        tracing::debug!(key, value, "Preference saved");
        Ok(())
    }
}

/// In-process preferences, for callers without durable storage
#[derive(Clone, Debug, Default)]
pub struct MemoryPreferences {
    values: BTreeMap<String, String>,
}

impl PreferenceStore for MemoryPreferences {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.values.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        self.values.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_preferences_roundtrip() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("prefs.json");

        let mut prefs = FilePreferences::new(&path);
        assert_eq!(prefs.get("sort_preference").unwrap(), None);

        prefs.set("sort_preference", "duration_seconds").unwrap();
        let reopened = FilePreferences::new(&path);
        assert_eq!(
            reopened.get("sort_preference").unwrap().as_deref(),
            Some("duration_seconds")
        );
    }

    #[test]
    fn test_corrupted_preferences_read_as_unset() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("prefs.json");
        std::fs::write(&path, "not json").unwrap();

        let prefs = FilePreferences::new(&path);
        assert_eq!(prefs.get("sort_preference").unwrap(), None);
    }

    #[test]
    fn test_memory_preferences() {
        let mut prefs = MemoryPreferences::default();
        prefs.set("k", "v").unwrap();
        assert_eq!(prefs.get("k").unwrap().as_deref(), Some("v"));
    }
}
