//! Ephemeral files.
//!
//! Hidden paths (editor swap files, lock files, `.git` probes) live only in
//! memory. They never reach the document, and they behave like ordinary
//! files: writes land at their offset, truncation resizes.

use std::collections::BTreeMap;

use parking_lot::Mutex;
use yamlfs_core_store::{Error, Path};

/// Largest size a hidden file may grow to.
pub const MAX_EPHEMERAL_SIZE: u64 = 64 * 1024 * 1024;

fn check_size(path: &Path, size: u64) -> Result<usize, Error> {
    if size > MAX_EPHEMERAL_SIZE {
        return Err(Error::TooLarge {
            message: format!("{} would grow to {} bytes", path, size),
        });
    }
    usize::try_from(size).map_err(|_| Error::TooLarge {
        message: format!("{} would grow to {} bytes", path, size),
    })
}

/// In-memory table of hidden files, keyed by full path.
#[derive(Debug, Default)]
pub struct EphemeralStore {
    files: Mutex<BTreeMap<Path, Vec<u8>>>,
}

impl EphemeralStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create (or empty) the file at `path`.
    pub fn create(&self, path: &Path) {
        log::debug!("ephemeral create {}", path);
        self.files.lock().insert(path.clone(), Vec::new());
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.files.lock().contains_key(path)
    }

    /// Size in bytes, or `None` if the file doesn't exist.
    pub fn len(&self, path: &Path) -> Option<u64> {
        self.files.lock().get(path).map(|content| content.len() as u64)
    }

    /// Read up to `size` bytes starting at `offset`.
    pub fn read(&self, path: &Path, offset: u64, size: usize) -> Result<Vec<u8>, Error> {
        let files = self.files.lock();
        let content = files.get(path).ok_or_else(|| Error::not_found(path))?;
        Ok(slice(content, offset, size).to_vec())
    }

    /// Replace everything from `offset` onward with `data`.
    ///
    /// Writing past the end zero-fills the gap. Nothing may grow past
    /// `MAX_EPHEMERAL_SIZE`.
    pub fn write(&self, path: &Path, offset: u64, data: &[u8]) -> Result<usize, Error> {
        let mut files = self.files.lock();
        let content = files.get_mut(path).ok_or_else(|| Error::not_found(path))?;

        check_size(path, offset.saturating_add(data.len() as u64))?;
        let offset = check_size(path, offset)?;
        content.resize(offset, 0);
        content.extend_from_slice(data);
        Ok(data.len())
    }

    /// Shrink or zero-extend the file to `len` bytes.
    pub fn truncate(&self, path: &Path, len: u64) -> Result<(), Error> {
        let mut files = self.files.lock();
        let content = files.get_mut(path).ok_or_else(|| Error::not_found(path))?;

        let len = check_size(path, len)?;
        content.resize(len, 0);
        Ok(())
    }

    pub fn remove(&self, path: &Path) -> Result<(), Error> {
        log::debug!("ephemeral remove {}", path);
        self.files
            .lock()
            .remove(path)
            .map(|_| ())
            .ok_or_else(|| Error::not_found(path))
    }

    /// Names of the ephemeral files directly inside `dir`.
    pub fn children(&self, dir: &Path) -> Vec<String> {
        self.files
            .lock()
            .keys()
            .filter(|path| path.parent().as_ref() == Some(dir))
            .filter_map(|path| path.file_name().map(str::to_string))
            .collect()
    }
}

/// The `[offset, offset + size)` window of `content`, clamped to its length.
pub fn slice(content: &[u8], offset: u64, size: usize) -> &[u8] {
    let start = usize::try_from(offset).unwrap_or(usize::MAX).min(content.len());
    let end = start.saturating_add(size).min(content.len());
    &content[start..end]
}
