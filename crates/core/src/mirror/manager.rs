//! Mirror management and fallback cycling.

use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::info;

use crate::config::MirrorsConfig;
use crate::metrics;

use super::{parse_search_url, MirrorChange, MirrorError, MirrorRecord, MirrorStore};

/// Owns the mirror store and exposes the operations a UI or client may run
/// against it.
///
/// Create one per process (or per test) and share it behind an `Arc`.
/// Every mutation is persisted before the call returns.
#[derive(Debug)]
pub struct MirrorManager {
    store: Mutex<MirrorStore>,
}

impl MirrorManager {
    /// Load (or bootstrap) the mirror list stored at `path`.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        Self::from_store(MirrorStore::load(path))
    }

    /// Manager over the built-in mirrors that never touches disk.
    pub fn in_memory() -> Self {
        Self::from_store(MirrorStore::in_memory())
    }

    /// Open the store described by `config`, or keep it in memory when no
    /// location can be resolved.
    pub fn from_config(config: &MirrorsConfig) -> Self {
        match config.resolved_path() {
            Some(path) => Self::open(path),
            None => {
                info!("No config directory available, keeping mirrors in memory");
                Self::in_memory()
            }
        }
    }

    /// In-memory manager over the given mirrors, in order.
    pub fn with_mirrors(records: impl IntoIterator<Item = MirrorRecord>) -> Self {
        Self::from_store(MirrorStore::with_records(records))
    }

    pub fn from_store(store: MirrorStore) -> Self {
        Self {
            store: Mutex::new(store),
        }
    }

    fn store(&self) -> MutexGuard<'_, MirrorStore> {
        self.store.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Location of the persisted mirror file, if any.
    pub fn path(&self) -> Option<PathBuf> {
        self.store().path().map(Path::to_path_buf)
    }

    /// The currently active mirror.
    pub fn current(&self) -> MirrorRecord {
        self.store().current()
    }

    pub fn current_base_url(&self) -> String {
        self.current().base_url().to_string()
    }

    pub fn current_index(&self) -> usize {
        self.store().current_index()
    }

    /// Snapshot of all configured mirrors.
    pub fn mirrors(&self) -> Vec<MirrorRecord> {
        self.store().records().to_vec()
    }

    pub fn len(&self) -> usize {
        self.store().len()
    }

    pub fn is_empty(&self) -> bool {
        self.store().is_empty()
    }

    /// Add a mirror by parsing a search URL copied from a browser.
    ///
    /// An existing mirror with the same origin gets its search path and
    /// params replaced instead.
    pub fn add_mirror_from_url(&self, url: &str) -> Result<MirrorChange, MirrorError> {
        let record = parse_search_url(url).ok_or_else(|| MirrorError::InvalidUrl(url.to_string()))?;
        Ok(self.add_mirror(record))
    }

    pub fn add_mirror(&self, record: MirrorRecord) -> MirrorChange {
        self.store().add_or_update(record)
    }

    pub fn remove_mirror(&self, index: usize) -> Result<MirrorChange, MirrorError> {
        self.store().remove(index)
    }

    pub fn move_mirror(&self, from: usize, to: usize) -> Result<MirrorChange, MirrorError> {
        self.store().move_record(from, to)
    }

    /// Switch to the next mirror for fallback.
    ///
    /// Returns `None` once the cycle would wrap back to the first mirror, or
    /// when there is nothing to switch to. The active index is left
    /// untouched in that case.
    pub fn advance(&self) -> Option<MirrorRecord> {
        let mut store = self.store();
        let len = store.len();
        if len < 2 {
            return None;
        }

        let next = (store.current_index() + 1) % len;
        if next == 0 {
            return None;
        }

        store.select(next);
        let record = store.current();
        metrics::MIRROR_SWITCHES.inc();
        info!("Switched to mirror: {}", record.base_url());
        Some(record)
    }

    /// Make the first mirror active again.
    pub fn reset_to_primary(&self) {
        self.store().reset_to_primary();
    }

    /// Replace the mirror list with the built-in mirrors.
    pub fn reset_to_defaults(&self) -> MirrorChange {
        self.store().reset_to_defaults()
    }

    /// One-line description of the mirror at `index`, marking the active one
    /// with `*`. Empty for an out-of-range index.
    pub fn format_mirror_display(&self, index: usize) -> String {
        let store = self.store();
        match store.records().get(index) {
            Some(record) => {
                let prefix = if index == store.current_index() { "* " } else { "  " };
                format!("{}{}", prefix, record)
            }
            None => String::new(),
        }
    }

    /// Browser search URL on the active mirror.
    pub fn search_url(&self, word: &str, page: u32) -> String {
        self.current().search_url(word, page)
    }
}
