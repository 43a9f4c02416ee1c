//! File attributes of projected entries.

use std::time::SystemTime;

use fuser::{FileAttr, FileType};

/// Mode bits for directories (mappings and the root).
pub const DIR_PERM: u16 = 0o755;
/// Mode bits for regular files (scalars, sequences, ephemeral files).
pub const FILE_PERM: u16 = 0o644;

const BLOCK_SIZE: u32 = 4096;

/// What an entry looks like to the filesystem.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    Directory,
    File,
}

impl From<EntryKind> for FileType {
    fn from(kind: EntryKind) -> Self {
        match kind {
            EntryKind::Directory => FileType::Directory,
            EntryKind::File => FileType::RegularFile,
        }
    }
}

/// Attributes computed for one path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Attributes {
    pub kind: EntryKind,
    /// Length of the serialized content; zero for directories.
    pub size: u64,
    pub mtime: SystemTime,
}

impl Attributes {
    pub fn directory(mtime: SystemTime) -> Self {
        Self {
            kind: EntryKind::Directory,
            size: 0,
            mtime,
        }
    }

    pub fn file(size: u64, mtime: SystemTime) -> Self {
        Self {
            kind: EntryKind::File,
            size,
            mtime,
        }
    }

    pub fn is_dir(&self) -> bool {
        self.kind == EntryKind::Directory
    }

    pub fn perm(&self) -> u16 {
        match self.kind {
            EntryKind::Directory => DIR_PERM,
            EntryKind::File => FILE_PERM,
        }
    }

    pub fn nlink(&self) -> u32 {
        match self.kind {
            EntryKind::Directory => 2,
            EntryKind::File => 1,
        }
    }

    /// Converts to FUSE file attributes.
    pub fn to_file_attr(&self, ino: u64, uid: u32, gid: u32) -> FileAttr {
        FileAttr {
            ino,
            size: self.size,
            blocks: self.size.div_ceil(512),
            atime: self.mtime,
            mtime: self.mtime,
            ctime: self.mtime,
            crtime: self.mtime,
            kind: self.kind.into(),
            perm: self.perm(),
            nlink: self.nlink(),
            uid,
            gid,
            rdev: 0,
            blksize: BLOCK_SIZE,
            flags: 0,
        }
    }
}
