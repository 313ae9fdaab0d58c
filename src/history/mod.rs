//! Saved artwork: PNG files in one directory plus an index of their ids.
//!
//! The index and the files are kept consistent: an id is only added once
//! its file is completely written, and only removed once its file is gone.

mod export;
mod index;
mod thumbnail;
mod writer;

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use chrono::{DateTime, Utc};
use image::RgbaImage;
use parking_lot::Mutex;
use thiserror::Error;

use crate::config::StorageConfig;
use crate::util::time;

pub use export::export_png;
pub use index::{KeyValueStore, MemoryPrefs, PrefsFile};
pub use thumbnail::{fitted_size, thumbnail};
pub use writer::{PendingSave, SaveWriter};

/// Errors that can occur while reading or writing the drawing history
#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("Storage error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to encode image: {0}")]
    Image(image::ImageError),

    #[error("Failed to read history index: {0}")]
    Index(#[from] serde_json::Error),

    #[error("No drawing named {0}")]
    NotFound(String),

    #[error("Not a drawing id: {0:?}")]
    InvalidId(String),

    #[error("Thumbnail box {width}x{height} is empty")]
    InvalidThumbnailSize { width: u32, height: u32 },

    #[error("The background writer has stopped")]
    WriterStopped,
}

impl From<image::ImageError> for HistoryError {
    fn from(error: image::ImageError) -> Self {
        match error {
            image::ImageError::IoError(io) => HistoryError::Io(io),
            other => HistoryError::Image(other),
        }
    }
}

pub type HistoryResult<T> = Result<T, HistoryError>;

const ID_PREFIX: &str = "drawing_";
const ID_SUFFIX: &str = ".png";

/// Time-derived identifier of a saved drawing, also its file name.
///
/// Ids order by creation time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EntryId(u64);

impl EntryId {
    pub fn from_millis(millis: u64) -> Self {
        Self(millis)
    }

    pub fn millis(self) -> u64 {
        self.0
    }

    pub fn created_at(self) -> Option<DateTime<Utc>> {
        time::datetime_from_millis(self.0)
    }
}

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{ID_PREFIX}{}{ID_SUFFIX}", self.0)
    }
}

impl FromStr for EntryId {
    type Err = HistoryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.strip_prefix(ID_PREFIX)
            .and_then(|rest| rest.strip_suffix(ID_SUFFIX))
            .filter(|digits| !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()))
            .and_then(|digits| digits.parse().ok())
            .map(EntryId)
            .ok_or_else(|| HistoryError::InvalidId(s.to_owned()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryEntry {
    pub id: EntryId,
    pub created_at: Option<DateTime<Utc>>,
}

struct Inner {
    index: Box<dyn KeyValueStore>,
    /// Newest id handed out, so ids stay strictly increasing within a
    /// millisecond and across clock steps backwards.
    last_millis: u64,
}

impl Inner {
    fn next_id(&mut self) -> EntryId {
        let millis = time::timestamp_millis().max(self.last_millis + 1);
        self.last_millis = millis;
        EntryId(millis)
    }
}

/// Persistent history of saved drawings.
///
/// All operations take `&self`; the index is guarded by a mutex so the store
/// can be shared with a background [`SaveWriter`].
pub struct HistoryStore {
    dir: PathBuf,
    key: String,
    inner: Mutex<Inner>,
}

impl fmt::Debug for HistoryStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HistoryStore")
            .field("dir", &self.dir)
            .field("key", &self.key)
            .finish_non_exhaustive()
    }
}

impl HistoryStore {
    /// Opens (creating if needed) the store described by `config`, with its
    /// index in a preferences file next to the drawings.
    pub fn open(config: &StorageConfig) -> HistoryResult<Self> {
        fs::create_dir_all(&config.directory)?;
        let prefs = PrefsFile::open(&config.directory, &config.namespace)?;
        Self::with_index(&config.directory, &config.index_key, Box::new(prefs))
    }

    /// Store whose index lives in `index` under `key`.
    pub fn with_index(
        dir: impl Into<PathBuf>,
        key: &str,
        index: Box<dyn KeyValueStore>,
    ) -> HistoryResult<Self> {
        let dir = dir.into();
        let last_millis = parse_ids(index.string_set(key)?)
            .into_iter()
            .map(EntryId::millis)
            .max()
            .unwrap_or(0);
        log::info!("Opened drawing history in {}", dir.display());

        Ok(Self {
            dir,
            key: key.to_owned(),
            inner: Mutex::new(Inner { index, last_millis }),
        })
    }

    pub fn directory(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, id: EntryId) -> PathBuf {
        self.dir.join(id.to_string())
    }

    /// Writes `image` as a new entry and returns its id. On failure nothing
    /// is added to the index.
    pub fn save(&self, image: &RgbaImage) -> HistoryResult<EntryId> {
        let mut inner = self.inner.lock();
        let id = inner.next_id();
        let path = self.path_for(id);

        export::write_png_atomically(image, &path)?;

        let indexed = inner.index.string_set(&self.key).and_then(|mut ids| {
            ids.insert(id.to_string());
            inner.index.put_string_set(&self.key, ids)
        });
        if let Err(err) = indexed {
            // Keep file and index in agreement.
            if let Err(cleanup) = fs::remove_file(&path) {
                log::warn!("Could not remove unindexed {}: {cleanup}", path.display());
            }
            return Err(err);
        }

        log::info!("Saved drawing {id}");
        Ok(id)
    }

    /// All ids, newest first.
    pub fn list(&self) -> Vec<EntryId> {
        let inner = self.inner.lock();
        self.sorted_ids(&inner)
    }

    fn sorted_ids(&self, inner: &Inner) -> Vec<EntryId> {
        let ids = match inner.index.string_set(&self.key) {
            Ok(ids) => ids,
            Err(err) => {
                log::error!("Failed to read history index: {err}");
                return Vec::new();
            }
        };
        let mut ids = parse_ids(ids);
        ids.sort_unstable_by(|a, b| b.cmp(a));
        ids
    }

    pub fn entries(&self) -> Vec<HistoryEntry> {
        self.list()
            .into_iter()
            .map(|id| HistoryEntry {
                id,
                created_at: id.created_at(),
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.list().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, id: EntryId) -> bool {
        let inner = self.inner.lock();
        inner
            .index
            .string_set(&self.key)
            .map(|ids| ids.contains(&id.to_string()))
            .unwrap_or(false)
    }

    /// Decodes a stored drawing. Unknown ids and missing or unreadable files
    /// are all [`HistoryError::NotFound`].
    pub fn load(&self, id: EntryId) -> HistoryResult<RgbaImage> {
        if !self.contains(id) {
            return Err(HistoryError::NotFound(id.to_string()));
        }

        let path = self.path_for(id);
        match image::open(&path) {
            Ok(image) => Ok(image.to_rgba8()),
            Err(err) => {
                log::warn!("Failed to load {}: {err}", path.display());
                Err(HistoryError::NotFound(id.to_string()))
            }
        }
    }

    /// Removes the file, then the index entry. Returns `false` and keeps the
    /// index untouched if the file could not be removed.
    pub fn delete(&self, id: EntryId) -> bool {
        let mut inner = self.inner.lock();
        let path = self.path_for(id);

        if let Err(err) = fs::remove_file(&path) {
            log::warn!("Failed to delete {}: {err}", path.display());
            return false;
        }

        let removed = inner.index.string_set(&self.key).and_then(|mut ids| {
            ids.remove(&id.to_string());
            inner.index.put_string_set(&self.key, ids)
        });
        match removed {
            Ok(()) => {
                log::info!("Deleted drawing {id}");
                true
            }
            Err(err) => {
                log::error!("Deleted {} but could not update the index: {err}", path.display());
                false
            }
        }
    }

    /// Aspect-preserving copy of a stored drawing scaled to fit the box.
    pub fn thumbnail(&self, id: EntryId, max_width: u32, max_height: u32) -> HistoryResult<RgbaImage> {
        if max_width == 0 || max_height == 0 {
            return Err(HistoryError::InvalidThumbnailSize {
                width: max_width,
                height: max_height,
            });
        }
        let image = self.load(id)?;
        Ok(thumbnail::thumbnail(&image, max_width, max_height))
    }

    /// Copies a stored drawing out to `dir`, see [`export_png`].
    pub fn export_to(&self, id: EntryId, dir: &Path) -> HistoryResult<PathBuf> {
        let image = self.load(id)?;
        export_png(&image, dir)
    }

    /// Writes an image that is not part of the history to `dir`.
    pub fn export_image_to(&self, image: &RgbaImage, dir: &Path) -> HistoryResult<PathBuf> {
        export_png(image, dir)
    }

    /// Deletes every file, then drops their ids from the index. Ids whose
    /// file could not be removed stay indexed and are returned; a file that
    /// is already missing counts as removed.
    pub fn clear(&self) -> HistoryResult<Vec<EntryId>> {
        let mut inner = self.inner.lock();
        let ids = self.sorted_ids(&inner);
        let mut kept = Vec::new();
        for id in &ids {
            let path = self.path_for(*id);
            match fs::remove_file(&path) {
                Ok(()) => {}
                Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
                Err(err) => {
                    log::warn!("Failed to delete {}: {err}", path.display());
                    kept.push(*id);
                }
            }
        }

        if kept.is_empty() {
            inner.index.remove(&self.key)?;
        } else {
            let remaining = kept.iter().map(EntryId::to_string).collect();
            inner.index.put_string_set(&self.key, remaining)?;
        }
        log::info!(
            "Cleared drawing history ({} of {} entries)",
            ids.len() - kept.len(),
            ids.len()
        );
        Ok(kept)
    }
}

/// Parses index values, skipping anything that is not an id.
fn parse_ids(values: impl IntoIterator<Item = String>) -> Vec<EntryId> {
    values
        .into_iter()
        .filter_map(|value| match value.parse() {
            Ok(id) => Some(id),
            Err(_) => {
                log::warn!("Ignoring unexpected history entry {value:?}");
                None
            }
        })
        .collect()
}
