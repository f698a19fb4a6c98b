//! Durable mirror list with an active index.
//!
//! The list is stored as a small JSON document:
//!
//! ```json
//! {
//!   "version": 1,
//!   "mirrors": [{"base_url": "https://bato.to", "search_path": "/v4x-search", "search_params": {"type": "comic"}}],
//!   "current_index": 0
//! }
//! ```
//!
//! Older files may list mirrors as bare origin strings; those are upgraded
//! on load. Unreadable files fall back to the built-in mirrors.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::types::{default_mirrors, primary_default, DEFAULT_SEARCH_PATH};
use super::{MirrorChange, MirrorError, MirrorRecord};

/// Current on-disk format version.
pub const STORE_FORMAT_VERSION: u32 = 1;

/// Ordered mirror records plus the index of the active one.
#[derive(Debug)]
pub struct MirrorStore {
    path: Option<PathBuf>,
    records: Vec<MirrorRecord>,
    current_index: usize,
}

impl MirrorStore {
    /// Load the store from `path`, installing defaults when the file is
    /// missing, unreadable, or lists no usable mirror.
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let (records, current_index) = read_file(&path).unwrap_or_else(|| (default_mirrors(), 0));
        Self {
            path: Some(path),
            records,
            current_index,
        }
    }

    /// A store that is never written to disk.
    pub fn in_memory() -> Self {
        Self {
            path: None,
            records: default_mirrors(),
            current_index: 0,
        }
    }

    /// An in-memory store over `records`, deduplicated by origin. An empty
    /// list installs the built-in mirrors.
    pub fn with_records(records: impl IntoIterator<Item = MirrorRecord>) -> Self {
        let mut deduped: Vec<MirrorRecord> = Vec::new();
        for record in records {
            if !deduped.contains(&record) {
                deduped.push(record);
            }
        }
        if deduped.is_empty() {
            deduped = default_mirrors();
        }
        Self {
            path: None,
            records: deduped,
            current_index: 0,
        }
    }

    /// Location of the persisted file, if any.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn records(&self) -> &[MirrorRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn current_index(&self) -> usize {
        self.current_index
    }

    /// The active mirror, or the first built-in mirror if the store is empty.
    pub fn current(&self) -> MirrorRecord {
        match self.records.get(self.current_index) {
            Some(record) => record.clone(),
            None => self.records.first().cloned().unwrap_or_else(primary_default),
        }
    }

    /// Persist records and index. Failures are logged; the in-memory state
    /// stays authoritative.
    pub fn save(&self) {
        let Some(path) = &self.path else {
            return;
        };

        let document = PersistedMirrors {
            version: STORE_FORMAT_VERSION,
            mirrors: &self.records,
            current_index: self.current_index,
        };

        if let Err(e) = write_file(path, &document) {
            warn!(path = %path.display(), error = %e, "Failed to save mirror config");
        } else {
            debug!(path = %path.display(), "Saved mirror config");
        }
    }

    /// Update the mirror with the same origin, or append a new one.
    pub fn add_or_update(&mut self, record: MirrorRecord) -> MirrorChange {
        let change = match self.records.iter().position(|r| *r == record) {
            Some(index) => {
                let updated = self.records[index].with_search_from(&record);
                self.records[index] = updated.clone();
                MirrorChange::Updated(updated)
            }
            None => {
                info!("Added mirror: {}", record.base_url());
                self.records.push(record.clone());
                MirrorChange::Added(record)
            }
        };
        self.save();
        change
    }

    /// Remove the mirror at `index`. The last remaining mirror cannot be
    /// removed.
    pub fn remove(&mut self, index: usize) -> Result<MirrorChange, MirrorError> {
        if index >= self.records.len() {
            return Err(MirrorError::InvalidIndex(index));
        }
        if self.records.len() <= 1 {
            return Err(MirrorError::LastMirror);
        }

        let removed = self.records.remove(index);

        if self.current_index >= self.records.len() {
            self.current_index = self.records.len() - 1;
        } else if index < self.current_index {
            self.current_index -= 1;
        }

        self.save();
        info!("Removed mirror: {}", removed.base_url());
        Ok(MirrorChange::Removed(removed))
    }

    /// Move the mirror at `from` to position `to`.
    ///
    /// `current_index` keeps its numeric value, so after a move across it
    /// the active mirror may be a different record.
    pub fn move_record(&mut self, from: usize, to: usize) -> Result<MirrorChange, MirrorError> {
        if from >= self.records.len() {
            return Err(MirrorError::InvalidIndex(from));
        }
        if to >= self.records.len() {
            return Err(MirrorError::InvalidIndex(to));
        }
        if from == to {
            return Ok(MirrorChange::Unchanged);
        }

        let record = self.records.remove(from);
        self.records.insert(to, record);
        self.save();
        Ok(MirrorChange::Moved { from, to })
    }

    /// Make the first mirror active again.
    pub fn reset_to_primary(&mut self) {
        if self.current_index != 0 {
            self.current_index = 0;
            self.save();
        }
    }

    /// Replace everything with the built-in mirrors.
    pub fn reset_to_defaults(&mut self) -> MirrorChange {
        self.records = default_mirrors();
        self.current_index = 0;
        self.save();
        MirrorChange::Reset
    }

    /// Point the active index at `index` and persist. Out-of-range values
    /// are ignored.
    pub(crate) fn select(&mut self, index: usize) {
        if index < self.records.len() && index != self.current_index {
            self.current_index = index;
            self.save();
        }
    }
}

// ============================================================================
// On-disk format (private)
// ============================================================================

#[derive(Serialize)]
struct PersistedMirrors<'a> {
    version: u32,
    mirrors: &'a [MirrorRecord],
    current_index: usize,
}

#[derive(Deserialize)]
struct RawMirrorFile {
    #[serde(default)]
    version: u32,
    #[serde(default)]
    mirrors: Vec<RawMirrorEntry>,
    #[serde(default)]
    current_index: i64,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawMirrorEntry {
    /// Format v0: a bare origin string.
    Legacy(String),
    Record {
        base_url: String,
        #[serde(default = "default_search_path")]
        search_path: String,
        #[serde(default)]
        search_params: BTreeMap<String, String>,
    },
    Unknown(serde_json::Value),
}

fn default_search_path() -> String {
    DEFAULT_SEARCH_PATH.to_string()
}

impl RawMirrorEntry {
    fn into_record(self) -> Option<MirrorRecord> {
        let record = match self {
            RawMirrorEntry::Legacy(origin) => MirrorRecord::from_origin(origin),
            RawMirrorEntry::Record {
                base_url,
                search_path,
                search_params,
            } => MirrorRecord::new(base_url, search_path, search_params),
            RawMirrorEntry::Unknown(value) => {
                debug!("Skipping unrecognized mirror entry: {}", value);
                return None;
            }
        };
        (!record.base_url().is_empty()).then_some(record)
    }
}

/// Read and normalize the persisted file. `None` means "use defaults".
fn read_file(path: &Path) -> Option<(Vec<MirrorRecord>, usize)> {
    let contents = match fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return None,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Failed to load mirror config");
            return None;
        }
    };

    let raw: RawMirrorFile = match serde_json::from_str(&contents) {
        Ok(raw) => raw,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Failed to load mirror config");
            return None;
        }
    };

    if raw.version > STORE_FORMAT_VERSION {
        warn!(
            "Mirror config version {} is newer than supported version {}",
            raw.version, STORE_FORMAT_VERSION
        );
    }

    let mut records: Vec<MirrorRecord> = Vec::with_capacity(raw.mirrors.len());
    for record in raw.mirrors.into_iter().filter_map(RawMirrorEntry::into_record) {
        if !records.contains(&record) {
            records.push(record);
        }
    }

    if records.is_empty() {
        return None;
    }

    let max_index = (records.len() - 1) as i64;
    let current_index = raw.current_index.clamp(0, max_index) as usize;
    Some((records, current_index))
}

/// Write to a sibling temp file, then rename it over the target.
fn write_file(path: &Path, document: &PersistedMirrors<'_>) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    let json = serde_json::to_string_pretty(document).map_err(io::Error::other)?;
    let tmp_path = path.with_extension("json.tmp");
    fs::write(&tmp_path, json)?;

    #[cfg(target_os = "windows")]
    if path.exists() {
        fs::remove_file(path)?;
    }

    fs::rename(&tmp_path, path)
}
