//! Write sessions for regular paths.
//!
//! Bytes written to a document-backed file are buffered per path until the
//! last handle on that path is released, then committed as a whole. Keying
//! by path (not handle) coalesces concurrent opens of the same file.

use std::collections::HashMap;

use parking_lot::Mutex;
use yamlfs_core_store::Path;

#[derive(Debug, Default)]
struct Session {
    handles: usize,
    buffer: Vec<u8>,
    written: bool,
}

/// Buffers of uncommitted writes, one per open path.
#[derive(Debug, Default)]
pub struct WriteSessions {
    sessions: Mutex<HashMap<Path, Session>>,
}

impl WriteSessions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handle on `path`.
    pub fn open(&self, path: &Path) {
        let mut sessions = self.sessions.lock();
        sessions.entry(path.clone()).or_default().handles += 1;
    }

    /// Buffer `data` written at `offset`.
    ///
    /// Offset zero starts a new buffer. Other offsets replace the buffer from
    /// that point on; a gap past the end is not filled, the data is appended.
    pub fn write(&self, path: &Path, offset: u64, data: &[u8]) -> usize {
        let mut sessions = self.sessions.lock();
        let session = sessions.entry(path.clone()).or_default();

        let offset = usize::try_from(offset).unwrap_or(usize::MAX);
        if offset < session.buffer.len() {
            session.buffer.truncate(offset);
        }
        session.buffer.extend_from_slice(data);
        session.written = true;
        data.len()
    }

    /// Cut the pending buffer for `path` to `len` bytes, if there is one.
    pub fn truncate(&self, path: &Path, len: u64) {
        if let Some(session) = self.sessions.lock().get_mut(path) {
            let len = usize::try_from(len).unwrap_or(usize::MAX);
            session.buffer.truncate(len);
        }
    }

    /// Drop one handle on `path`.
    ///
    /// Returns the buffered bytes when this was the last handle and something
    /// was written, which the caller then commits.
    pub fn release(&self, path: &Path) -> Option<Vec<u8>> {
        let mut sessions = self.sessions.lock();
        let session = sessions.get_mut(path)?;

        session.handles = session.handles.saturating_sub(1);
        if session.handles > 0 {
            return None;
        }

        let session = sessions.remove(path)?;
        session.written.then_some(session.buffer)
    }
}
