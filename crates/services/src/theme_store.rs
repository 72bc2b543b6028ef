//! Durable, append-only history of applied theme changes.
//!
//! One record per client: the ordered list of descriptors that were applied
//! and whether a custom theme is active. The page is rebuilt from this list on
//! every load, and cleared only by an explicit reset.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use shared::error::AssistantError;
use shared::theme::{ThemeChangeDescriptor, ThemeStatus};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PersistedTheme {
    pub changes: Vec<ThemeChangeDescriptor>,
    pub has_active_theme: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Where a client's theme record lives.
pub trait ThemeSlot: Send + Sync {
    /// The raw record, or `None` when nothing was ever saved.
    fn load(&self) -> Result<Option<String>>;
    fn save(&self, record: &str) -> Result<()>;
    fn clear(&self) -> Result<()>;
}

/// One JSON file per client under the app's config directory.
pub struct FileSlot {
    path: PathBuf,
}

impl FileSlot {
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn for_client(client_key: &str) -> Self {
        Self::at(themes_dir().join(format!("theme-{}.json", sanitize_key(client_key))))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn themes_dir() -> PathBuf {
    directories::ProjectDirs::from("com.local", "Folio Assistant", "FolioAssistant")
        .map(|p| p.config_dir().join("themes"))
        .unwrap_or_else(|| PathBuf::from("./themes"))
}

fn sanitize_key(key: &str) -> String {
    let cleaned: String = key
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    if cleaned.is_empty() {
        "default".to_string()
    } else {
        cleaned
    }
}

impl ThemeSlot for FileSlot {
    fn load(&self) -> Result<Option<String>> {
        match fs::read_to_string(&self.path) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e).with_context(|| format!("reading {}", self.path.display())),
        }
    }

    fn save(&self, record: &str) -> Result<()> {
        if let Some(dir) = self.path.parent() {
            fs::create_dir_all(dir)
                .with_context(|| format!("creating {}", dir.display()))?;
        }
        // Write-then-rename so a crash never leaves a half-written record
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, record).with_context(|| format!("writing {}", tmp.display()))?;
        fs::rename(&tmp, &self.path)
            .with_context(|| format!("replacing {}", self.path.display()))?;
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e).with_context(|| format!("removing {}", self.path.display())),
        }
    }
}

/// Process-local slot, for tests and for clients that opt out of persistence.
#[derive(Default)]
pub struct MemorySlot {
    record: Mutex<Option<String>>,
}

impl MemorySlot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_record(record: impl Into<String>) -> Self {
        Self {
            record: Mutex::new(Some(record.into())),
        }
    }
}

impl ThemeSlot for MemorySlot {
    fn load(&self) -> Result<Option<String>> {
        Ok(self.record.lock().clone())
    }

    fn save(&self, record: &str) -> Result<()> {
        *self.record.lock() = Some(record.to_string());
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        *self.record.lock() = None;
        Ok(())
    }
}

/// Returned by [`ThemeHistoryStore::reset`]; the caller must reload the page.
#[must_use = "the page still carries the old theme until it is reloaded"]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReloadRequest;

pub struct ThemeHistoryStore {
    slot: Arc<dyn ThemeSlot>,
    cache: Mutex<PersistedTheme>,
}

impl ThemeHistoryStore {
    /// Load the client's record. A missing or unreadable record starts empty.
    pub fn open(slot: Arc<dyn ThemeSlot>) -> Self {
        let cache = match slot.load() {
            Ok(Some(raw)) => match serde_json::from_str::<PersistedTheme>(&raw) {
                Ok(record) => record,
                Err(e) => {
                    tracing::warn!(error = %e, "discarding corrupt theme record");
                    PersistedTheme::default()
                }
            },
            Ok(None) => PersistedTheme::default(),
            Err(e) => {
                tracing::warn!(error = %e, "theme record unreadable, starting empty");
                PersistedTheme::default()
            }
        };
        Self {
            slot,
            cache: Mutex::new(cache),
        }
    }

    pub fn in_memory() -> Self {
        Self::open(Arc::new(MemorySlot::new()))
    }

    /// Record changes that were applied to the page. Empty batches are ignored.
    ///
    /// The in-memory history is updated even when the write fails, so the
    /// running session stays consistent with the page.
    pub fn append(&self, changes: &[ThemeChangeDescriptor]) -> Result<(), AssistantError> {
        if changes.is_empty() {
            return Ok(());
        }
        let snapshot = {
            let mut cache = self.cache.lock();
            cache.changes.extend_from_slice(changes);
            cache.has_active_theme = true;
            cache.updated_at = Some(Utc::now());
            cache.clone()
        };
        self.persist(&snapshot)
    }

    /// Every recorded change, oldest first.
    pub fn all(&self) -> Vec<ThemeChangeDescriptor> {
        self.cache.lock().changes.clone()
    }

    pub fn len(&self) -> usize {
        self.cache.lock().changes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn status(&self) -> ThemeStatus {
        let cache = self.cache.lock();
        ThemeStatus {
            active: cache.has_active_theme,
            change_count: cache.changes.len(),
        }
    }

    /// Forget the whole history.
    pub fn reset(&self) -> Result<ReloadRequest, AssistantError> {
        *self.cache.lock() = PersistedTheme::default();
        self.slot
            .clear()
            .map_err(|e| AssistantError::Storage(format!("{:#}", e)))?;
        tracing::info!("theme history cleared");
        Ok(ReloadRequest)
    }

    fn persist(&self, record: &PersistedTheme) -> Result<(), AssistantError> {
        let json = serde_json::to_string_pretty(record)
            .map_err(|e| AssistantError::Storage(e.to_string()))?;
        self.slot
            .save(&json)
            .map_err(|e| AssistantError::Storage(format!("{:#}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::theme::VisibilityAction;

    fn hide(selector: &str) -> ThemeChangeDescriptor {
        ThemeChangeDescriptor::Visibility {
            selector: selector.into(),
            action: VisibilityAction::Hide,
        }
    }

    #[test]
    fn test_append_keeps_order_and_activates() {
        let store = ThemeHistoryStore::in_memory();
        assert_eq!(store.status(), ThemeStatus::default());

        store.append(&[hide("#navbar")]).unwrap();
        store.append(&[]).unwrap();
        store.append(&[hide("#footer"), hide("#github")]).unwrap();

        assert_eq!(
            store.all(),
            vec![hide("#navbar"), hide("#footer"), hide("#github")]
        );
        assert_eq!(
            store.status(),
            ThemeStatus {
                active: true,
                change_count: 3
            }
        );
    }

    #[test]
    fn test_file_slot_survives_reopen_and_reset() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("theme-default.json");

        let store = ThemeHistoryStore::open(Arc::new(FileSlot::at(&path)));
        store.append(&[hide("#navbar")]).unwrap();
        assert!(path.exists());

        let reopened = ThemeHistoryStore::open(Arc::new(FileSlot::at(&path)));
        assert_eq!(reopened.all(), vec![hide("#navbar")]);
        assert!(reopened.status().active);

        assert_eq!(reopened.reset().unwrap(), ReloadRequest);
        assert!(!path.exists());
        assert!(reopened.is_empty());

        let after_reset = ThemeHistoryStore::open(Arc::new(FileSlot::at(&path)));
        assert_eq!(after_reset.status(), ThemeStatus::default());
    }

    #[test]
    fn test_corrupt_record_starts_empty() {
        let slot = Arc::new(MemorySlot::with_record("{not json"));
        let store = ThemeHistoryStore::open(slot);
        assert!(store.is_empty());

        store.append(&[hide("#navbar")]).unwrap();
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_client_keys_are_file_safe() {
        assert_eq!(sanitize_key("visitor/../42"), "visitor____42");
        assert_eq!(sanitize_key(""), "default");
        let slot = FileSlot::for_client("abc-1");
        assert!(slot.path().ends_with("theme-abc-1.json"));
    }
}
