//! Persistence of the view toggles across sessions.
//!
//! Only the overlay flags, the heatmap assignment, and the active view are
//! stored. The selection is never persisted.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use region_map_overlay::HeatmapAssignment;
use serde::{Deserialize, Serialize};

use crate::state::{OverlayMode, SelectionState, ViewMode};

/// Name of the persisted record.
pub const STORAGE_KEY: &str = "map-storage";

/// Version written alongside the record.
const STORAGE_VERSION: u32 = 0;

/// Errors that can occur while loading or saving view state.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Reading or writing the backing file failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The stored record is not valid JSON.
    #[error("Invalid stored view state: {0}")]
    Json(#[from] serde_json::Error),

    /// The in-memory store's lock was poisoned.
    #[error("View state store lock poisoned")]
    Poisoned,
}

/// The persisted subset of [`SelectionState`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedViewState {
    #[serde(default)]
    pub is_heatmap_enabled: bool,
    #[serde(default)]
    pub is_crime_mode_enabled: bool,
    #[serde(default)]
    pub heatmap_groups: HeatmapAssignment,
    #[serde(default)]
    pub view_mode: ViewMode,
}

impl PersistedViewState {
    /// Extracts the persisted subset of `state`.
    #[must_use]
    pub fn capture(state: &SelectionState) -> Self {
        let (is_heatmap_enabled, is_crime_mode_enabled) = state.mode().flags();
        Self {
            is_heatmap_enabled,
            is_crime_mode_enabled,
            heatmap_groups: state.heatmap_groups().clone(),
            view_mode: state.view_mode(),
        }
    }

    /// Rebuilds a state with nothing selected.
    #[must_use]
    pub fn restore(self) -> SelectionState {
        SelectionState::restored(
            OverlayMode::from_flags(self.is_heatmap_enabled, self.is_crime_mode_enabled),
            self.heatmap_groups,
            self.view_mode,
        )
    }
}

/// On-disk envelope around the record.
#[derive(Debug, Serialize, Deserialize)]
struct Envelope {
    state: PersistedViewState,
    #[serde(default)]
    version: u32,
}

fn encode(state: &PersistedViewState) -> Result<String, StoreError> {
    Ok(serde_json::to_string_pretty(&Envelope {
        state: state.clone(),
        version: STORAGE_VERSION,
    })?)
}

fn decode(raw: &str) -> Result<PersistedViewState, StoreError> {
    let envelope: Envelope = serde_json::from_str(raw)?;
    if envelope.version != STORAGE_VERSION {
        log::warn!(
            "Stored view state has version {}, expected {STORAGE_VERSION}",
            envelope.version
        );
    }
    Ok(envelope.state)
}

/// Key-value storage for the persisted record.
pub trait ViewStateStore: Send + Sync {
    /// Loads the record; `Ok(None)` on first run.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the record exists but cannot be read.
    fn load(&self) -> Result<Option<PersistedViewState>, StoreError>;

    /// Replaces the record.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the record cannot be written.
    fn save(&self, state: &PersistedViewState) -> Result<(), StoreError>;
}

/// Stores the record as `<dir>/map-storage.json`.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    /// Creates a store writing into `dir`.
    #[must_use]
    pub fn in_dir(dir: &Path) -> Self {
        Self {
            path: dir.join(format!("{STORAGE_KEY}.json")),
        }
    }

    /// Creates a store at an explicit file path.
    #[must_use]
    pub const fn at(path: PathBuf) -> Self {
        Self { path }
    }

    /// Reads `VIEW_STATE_PATH`, defaulting to `data/map-storage.json`.
    #[must_use]
    pub fn from_env() -> Self {
        std::env::var("VIEW_STATE_PATH").map_or_else(
            |_| Self::in_dir(Path::new("data")),
            |path| Self::at(PathBuf::from(path)),
        )
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ViewStateStore for JsonFileStore {
    fn load(&self) -> Result<Option<PersistedViewState>, StoreError> {
        match std::fs::read_to_string(&self.path) {
            Ok(raw) => decode(&raw).map(Some),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn save(&self, state: &PersistedViewState) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, encode(state)?)?;
        std::fs::rename(&tmp, &self.path)?;
        log::debug!("Saved view state to {}", self.path.display());
        Ok(())
    }
}

/// Keeps the serialized record in memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    raw: Mutex<Option<String>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store that already holds `raw` as its record.
    #[must_use]
    pub fn with_raw(raw: &str) -> Self {
        Self {
            raw: Mutex::new(Some(raw.to_owned())),
        }
    }

    /// The serialized record, if one was saved.
    #[must_use]
    pub fn raw(&self) -> Option<String> {
        self.raw.lock().ok().and_then(|raw| raw.clone())
    }
}

impl ViewStateStore for MemoryStore {
    fn load(&self) -> Result<Option<PersistedViewState>, StoreError> {
        let raw = self.raw.lock().map_err(|_| StoreError::Poisoned)?;
        raw.as_deref().map(decode).transpose()
    }

    fn save(&self, state: &PersistedViewState) -> Result<(), StoreError> {
        let encoded = encode(state)?;
        *self.raw.lock().map_err(|_| StoreError::Poisoned)? = Some(encoded);
        Ok(())
    }
}

/// Loads the stored state, falling back to defaults on absence or error.
pub fn load_or_default(store: &dyn ViewStateStore) -> SelectionState {
    match store.load() {
        Ok(Some(persisted)) => persisted.restore(),
        Ok(None) => SelectionState::default(),
        Err(e) => {
            log::warn!("Ignoring unreadable view state: {e}");
            SelectionState::default()
        }
    }
}
