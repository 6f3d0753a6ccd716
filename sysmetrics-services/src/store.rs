// SPDX-License-Identifier: LGPL-3.0-only
//! Persistent storage for window metric entries.
//!
//! Entries live under a configuration path (on Windows, a registry key below
//! the current user hive) as string values holding native-unit integers.

use crate::error::StoreError;
use indexmap::IndexMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

/// Configuration path holding the window metric entries.
pub const WINDOW_METRICS_PATH: &str = r"Control Panel\Desktop\WindowMetrics";

/// Section name used when broadcasting a change of [WINDOW_METRICS_PATH].
pub const WINDOW_METRICS_SECTION: &str = "WindowMetrics";

/// A persistent key/value configuration store.
pub trait MetricsStore: Send + Sync {
    /// The configuration path this store writes under.
    fn path(&self) -> &str;

    /// Make sure the configuration path exists, creating it if missing.
    fn ensure_path(&self) -> Result<(), StoreError>;

    /// Write a string value.
    fn set_value(&self, name: &str, value: &str) -> Result<(), StoreError>;

    /// Read a string value.
    fn get_value(&self, name: &str) -> Result<Option<String>, StoreError>;
}

/// An in-memory store.
#[derive(Debug)]
pub struct MemoryStore {
    path: String,
    inner: Mutex<MemoryStoreState>,
}

#[derive(Debug, Default)]
struct MemoryStoreState {
    exists: bool,
    values: IndexMap<String, String>,
    writes: usize,
    fail_path: bool,
    fail_keys: Vec<String>,
}

impl MemoryStore {
    /// Create an empty store for [WINDOW_METRICS_PATH]; the path does not exist yet.
    pub fn new() -> Self {
        Self::with_path(WINDOW_METRICS_PATH)
    }

    /// Create an empty store for a custom path.
    pub fn with_path(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            inner: Mutex::new(MemoryStoreState::default()),
        }
    }

    fn state(&self) -> std::sync::MutexGuard<'_, MemoryStoreState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Seed a value without counting it as a write.
    pub fn insert(&self, name: &str, value: &str) {
        let mut state = self.state();
        state.exists = true;
        state.values.insert(name.to_string(), value.to_string());
    }

    /// Whether the configuration path has been created.
    pub fn path_exists(&self) -> bool {
        self.state().exists
    }

    /// Number of successful [MetricsStore::set_value] calls.
    pub fn write_count(&self) -> usize {
        self.state().writes
    }

    /// Snapshot of all entries in insertion order.
    pub fn entries(&self) -> Vec<(String, String)> {
        self.state()
            .values
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    /// Make [MetricsStore::ensure_path] fail.
    pub fn fail_path(&self, fail: bool) {
        self.state().fail_path = fail;
    }

    /// Make writes of `name` fail.
    pub fn fail_key(&self, name: &str) {
        self.state().fail_keys.push(name.to_string());
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MetricsStore for MemoryStore {
    fn path(&self) -> &str {
        &self.path
    }

    fn ensure_path(&self) -> Result<(), StoreError> {
        let mut state = self.state();
        if state.fail_path {
            return Err(StoreError::PathUnavailable {
                path: self.path.clone(),
                code: 5,
            });
        }
        if !state.exists {
            state.exists = true;
            log::info!("Created configuration path: {}", self.path);
        }
        Ok(())
    }

    fn set_value(&self, name: &str, value: &str) -> Result<(), StoreError> {
        let mut state = self.state();
        if state.fail_keys.iter().any(|k| k == name) {
            return Err(StoreError::WriteFailed {
                name: name.to_string(),
                value: value.to_string(),
                code: 5,
            });
        }
        state.values.insert(name.to_string(), value.to_string());
        state.writes += 1;
        Ok(())
    }

    fn get_value(&self, name: &str) -> Result<Option<String>, StoreError> {
        Ok(self.state().values.get(name).cloned())
    }
}

/// A store persisted as a TOML document, one table per configuration path.
///
/// ```toml
/// ["Control Panel\\Desktop\\WindowMetrics"]
/// CaptionHeight = "-285"
/// ```
///
/// Keys and tables not owned by this store are preserved on write.
pub struct TomlFileStore {
    file: PathBuf,
    path: String,
    lock: Mutex<()>,
}

impl TomlFileStore {
    /// Create a store writing [WINDOW_METRICS_PATH] into `file`.
    pub fn new(file: impl Into<PathBuf>) -> Self {
        Self::with_path(file, WINDOW_METRICS_PATH)
    }

    /// Create a store writing a custom configuration path into `file`.
    pub fn with_path(file: impl Into<PathBuf>, path: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    /// The backing file.
    pub fn file(&self) -> &Path {
        &self.file
    }

    fn read_document(&self) -> Result<toml::Table, StoreError> {
        match fs::read_to_string(&self.file) {
            Ok(content) => content.parse::<toml::Table>().map_err(|e| StoreError::Corrupt {
                path: self.file.clone(),
                details: e.to_string(),
            }),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(toml::Table::new()),
            Err(e) => Err(e.into()),
        }
    }

    fn write_document(&self, document: &toml::Table) -> Result<(), StoreError> {
        let content = toml::to_string(document).map_err(|e| StoreError::Corrupt {
            path: self.file.clone(),
            details: e.to_string(),
        })?;
        fs::write(&self.file, content)?;
        Ok(())
    }

    fn section<'a>(&self, document: &'a mut toml::Table) -> Result<&'a mut toml::Table, StoreError> {
        let entry = document
            .entry(self.path.clone())
            .or_insert(toml::Value::Table(toml::Table::new()));
        entry.as_table_mut().ok_or_else(|| StoreError::Corrupt {
            path: self.file.clone(),
            details: format!("{} is not a table", self.path),
        })
    }
}

impl MetricsStore for TomlFileStore {
    fn path(&self) -> &str {
        &self.path
    }

    fn ensure_path(&self) -> Result<(), StoreError> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(parent) = self.file.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let mut document = self.read_document()?;
        if document.contains_key(&self.path) {
            return Ok(());
        }
        self.section(&mut document)?;
        self.write_document(&document)?;
        log::info!("Created configuration path: {} in {:?}", self.path, self.file);
        Ok(())
    }

    fn set_value(&self, name: &str, value: &str) -> Result<(), StoreError> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        let mut document = self.read_document()?;
        self.section(&mut document)?
            .insert(name.to_string(), toml::Value::String(value.to_string()));
        self.write_document(&document)
    }

    fn get_value(&self, name: &str) -> Result<Option<String>, StoreError> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        let document = self.read_document()?;
        Ok(document
            .get(&self.path)
            .and_then(|section| section.get(name))
            .and_then(|value| value.as_str())
            .map(str::to_owned))
    }
}
