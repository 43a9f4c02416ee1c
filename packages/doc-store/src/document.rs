//! The backing document.
//!
//! `DocumentStore` owns the in-memory tree and keeps it in step with the YAML
//! file on disk: it loads it, writes it back after every mutation, and
//! reloads it when the file was edited behind our back.

use std::fs;
use std::io::{self, Write};
use std::path::{Path as FsPath, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

use log::{debug, error, info, warn};
use parking_lot::Mutex;
use yamlfs_core_store::{Error, Format, Value};
use yamlfs_serde_store::{Bytes, Codec, YamlCodec};

/// Load-time options for the document.
#[derive(Debug, Clone, Default)]
pub struct DocumentOptions {
    /// Turn `\n` escape sequences inside strings into real line breaks when
    /// loading, so they are written back as literal blocks.
    pub repair_escaped_newlines: bool,
}

/// What the document looked like on disk when we last loaded or wrote it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StalenessMarker {
    pub modified: SystemTime,
    pub len: u64,
}

impl StalenessMarker {
    /// Read the marker for the file at `path`.
    pub fn of(path: &FsPath) -> io::Result<Self> {
        let metadata = fs::metadata(path)?;
        Ok(StalenessMarker {
            modified: metadata.modified()?,
            len: metadata.len(),
        })
    }
}

#[derive(Debug)]
struct State {
    root: Arc<Value>,
    dirty: bool,
    /// Bumped on every change to `root`, so a persist can tell whether the
    /// tree it wrote is still the current one.
    generation: u64,
    marker: Option<StalenessMarker>,
    cache_invalidated: bool,
}

/// The document tree and its backing file.
///
/// Readers take a snapshot (a cheap `Arc` clone) under a short lock and
/// serialize from it without holding the lock. Mutations run under the same
/// lock and copy the tree only if a snapshot is still alive.
#[derive(Debug)]
pub struct DocumentStore {
    path: PathBuf,
    options: DocumentOptions,
    codec: YamlCodec,
    opened_at: SystemTime,
    state: Mutex<State>,
    persist_lock: Mutex<()>,
}

impl DocumentStore {
    /// Open the document at `path` and load it.
    ///
    /// A missing or unparseable document is not an error: the store starts
    /// from an empty mapping.
    pub fn open(path: impl Into<PathBuf>, options: DocumentOptions) -> Self {
        let path = path.into();
        // Follow symlinks so that persisting replaces the target, not the link
        let path = fs::canonicalize(&path).unwrap_or(path);

        let store = DocumentStore {
            path,
            options,
            codec: YamlCodec,
            opened_at: SystemTime::now(),
            state: Mutex::new(State {
                root: Arc::new(Value::map()),
                dirty: false,
                generation: 0,
                marker: None,
                cache_invalidated: false,
            }),
            persist_lock: Mutex::new(()),
        };
        store.load();
        store
    }

    /// Path of the backing document.
    pub fn path(&self) -> &FsPath {
        &self.path
    }

    /// Replace the in-memory tree with the document on disk.
    pub fn load(&self) {
        let mut state = self.state.lock();
        self.load_locked(&mut state);
    }

    fn load_locked(&self, state: &mut State) {
        let (root, marker) = self.read_document();
        state.root = Arc::new(root);
        state.marker = marker;
        state.dirty = false;
        state.generation += 1;
    }

    fn read_document(&self) -> (Value, Option<StalenessMarker>) {
        // Marker first: an edit racing the read then shows up as stale later.
        let marker = StalenessMarker::of(&self.path).ok();

        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                warn!(
                    "Document {} not found, starting with an empty tree",
                    self.path.display()
                );
                return (Value::map(), None);
            }
            Err(e) => {
                error!("Failed to read document {}: {}", self.path.display(), e);
                return (Value::map(), marker);
            }
        };

        let mut root = match self.codec.decode(&Bytes::from(bytes), &Format::YAML) {
            Ok(Value::Null) => Value::map(),
            Ok(value) => value,
            Err(e) => {
                error!(
                    "Failed to parse document {}, starting with an empty tree: {}",
                    self.path.display(),
                    e
                );
                Value::map()
            }
        };

        if !root.is_map() {
            warn!(
                "Document {} holds a {} at the top level, nothing will be listed",
                self.path.display(),
                root.kind()
            );
        }

        if self.options.repair_escaped_newlines {
            let repaired = root.repair_escaped_newlines();
            if repaired > 0 {
                info!("Repaired escaped newlines in {} strings", repaired);
            }
        }

        debug!("Loaded document {}", self.path.display());
        (root, marker)
    }

    /// A stable view of the current tree.
    pub fn snapshot(&self) -> Arc<Value> {
        Arc::clone(&self.state.lock().root)
    }

    /// Whether there are changes not yet written to disk.
    pub fn is_dirty(&self) -> bool {
        self.state.lock().dirty
    }

    /// When the document last changed on disk, as far as we know.
    pub fn modified(&self) -> SystemTime {
        self.state
            .lock()
            .marker
            .map(|marker| marker.modified)
            .unwrap_or(self.opened_at)
    }

    /// Apply a change to the tree, then write the document back.
    ///
    /// An edit made on disk since the last load is picked up first, so `f`
    /// sees (and the persist keeps) the newer document. `f` must leave the
    /// tree untouched when it fails. On success the tree is marked dirty and
    /// the directory cache invalidated before the persist; a failed persist
    /// is returned and the tree stays dirty.
    pub fn mutate<T>(&self, f: impl FnOnce(&mut Value) -> Result<T, Error>) -> Result<T, Error> {
        let result = {
            let mut state = self.state.lock();
            self.reload_locked(&mut state, false);
            let result = f(Arc::make_mut(&mut state.root))?;
            state.dirty = true;
            state.generation += 1;
            state.cache_invalidated = true;
            result
        };

        self.persist()?;
        Ok(result)
    }

    /// Write the tree to disk in block style.
    ///
    /// The document is written to a temporary file next to it and renamed
    /// into place, so a failed write never leaves a torn document.
    pub fn persist(&self) -> Result<(), Error> {
        let _guard = self.persist_lock.lock();

        let (root, generation) = {
            let state = self.state.lock();
            (Arc::clone(&state.root), state.generation)
        };

        let bytes = self.codec.encode(&root, &Format::YAML)?;
        if let Err(source) = self.write_atomically(&bytes) {
            error!("Failed to persist {}: {}", self.path.display(), source);
            return Err(Error::Persist {
                path: self.path.clone(),
                source,
            });
        }

        let mut state = self.state.lock();
        if state.generation == generation {
            state.dirty = false;
        }
        state.marker = StalenessMarker::of(&self.path).ok().or(state.marker);
        debug!("Persisted {} ({} bytes)", self.path.display(), bytes.len());
        Ok(())
    }

    /// Persist only if there are unsaved changes.
    pub fn persist_if_dirty(&self) -> Result<(), Error> {
        if self.is_dirty() {
            self.persist()
        } else {
            Ok(())
        }
    }

    fn write_atomically(&self, bytes: &[u8]) -> io::Result<()> {
        let dir = match self.path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir,
            _ => FsPath::new("."),
        };

        let mut file = tempfile::NamedTempFile::new_in(dir)?;
        file.write_all(bytes)?;
        file.as_file().sync_all()?;
        if let Ok(metadata) = fs::metadata(&self.path) {
            file.as_file().set_permissions(metadata.permissions())?;
        }
        file.persist(&self.path).map_err(|e| e.error)?;
        Ok(())
    }

    /// Reload the tree if the document's modification time moved forward.
    ///
    /// Returns whether a reload happened. Local changes that have not been
    /// persisted yet win over an edit on disk.
    pub fn reload_if_stale(&self) -> bool {
        self.reload_checked(false)
    }

    /// Like `reload_if_stale`, but after a mutation (see `invalidate_cache`)
    /// any difference in modification time or size counts as stale. Used by
    /// directory listings.
    pub fn reload_for_listing(&self) -> bool {
        let force = std::mem::take(&mut self.state.lock().cache_invalidated);
        self.reload_checked(force)
    }

    /// Force the next listing to re-check the document on disk.
    pub fn invalidate_cache(&self) {
        self.state.lock().cache_invalidated = true;
    }

    fn reload_checked(&self, force: bool) -> bool {
        let mut state = self.state.lock();
        self.reload_locked(&mut state, force)
    }

    fn reload_locked(&self, state: &mut State, force: bool) -> bool {
        let Ok(current) = StalenessMarker::of(&self.path) else {
            return false;
        };
        let stale = match state.marker {
            None => true,
            Some(known) => current.modified > known.modified || (force && current != known),
        };
        if !stale {
            return false;
        }

        if state.dirty {
            warn!(
                "{} changed on disk while local changes are unsaved, keeping the in-memory tree",
                self.path.display()
            );
            return false;
        }

        info!("{} changed on disk, reloading", self.path.display());
        self.load_locked(state);
        true
    }
}
