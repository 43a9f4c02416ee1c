//! Inode numbers for projected paths.
//!
//! The projection is path based; the kernel speaks inode numbers. Numbers
//! are handed out on first sight of a path and stay stable while the kernel
//! holds a reference. Entries handed to the kernel through `lookup` are
//! dropped once it forgets them all.

use std::collections::HashMap;

use parking_lot::RwLock;
use yamlfs_core_store::Path;

/// Root inode number (FUSE convention).
pub const ROOT_INO: u64 = fuser::FUSE_ROOT_ID;

struct Inner {
    paths: HashMap<u64, Path>,
    inos: HashMap<Path, u64>,
    lookups: HashMap<u64, u64>,
    next: u64,
}

impl Inner {
    fn assign(&mut self, path: &Path) -> u64 {
        if let Some(&ino) = self.inos.get(path) {
            return ino;
        }
        let ino = self.next;
        self.next += 1;
        self.paths.insert(ino, path.clone());
        self.inos.insert(path.clone(), ino);
        ino
    }
}

/// Two-way map between inode numbers and paths.
pub struct InodeTable {
    inner: RwLock<Inner>,
}

impl InodeTable {
    /// Creates a table holding only the root.
    pub fn new() -> Self {
        let root = Path::root();
        Self {
            inner: RwLock::new(Inner {
                paths: HashMap::from([(ROOT_INO, root.clone())]),
                inos: HashMap::from([(root, ROOT_INO)]),
                lookups: HashMap::new(),
                next: ROOT_INO + 1,
            }),
        }
    }

    /// Path for an inode number.
    pub fn path(&self, ino: u64) -> Option<Path> {
        self.inner.read().paths.get(&ino).cloned()
    }

    /// Inode number for a path, assigning one if needed.
    pub fn ino(&self, path: &Path) -> u64 {
        if let Some(&ino) = self.inner.read().inos.get(path) {
            return ino;
        }
        self.inner.write().assign(path)
    }

    /// Like `ino`, and counts one kernel reference to the number.
    pub fn lookup(&self, path: &Path) -> u64 {
        let mut inner = self.inner.write();
        let ino = inner.assign(path);
        if ino != ROOT_INO {
            *inner.lookups.entry(ino).or_default() += 1;
        }
        ino
    }

    /// Drop `nlookup` kernel references. The entry goes away with the last.
    pub fn forget(&self, ino: u64, nlookup: u64) {
        let mut inner = self.inner.write();
        let Some(count) = inner.lookups.get_mut(&ino) else {
            return;
        };
        *count = count.saturating_sub(nlookup);
        if *count > 0 {
            return;
        }
        inner.lookups.remove(&ino);
        if let Some(path) = inner.paths.remove(&ino) {
            inner.inos.remove(&path);
        }
    }

    /// Number of known paths, including the root.
    pub fn len(&self) -> usize {
        self.inner.read().paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for InodeTable {
    fn default() -> Self {
        Self::new()
    }
}
