//! Path-level filesystem operations.
//!
//! `Projection` answers every request in terms of paths, so it can be driven
//! (and tested) without a kernel. The FUSE bridge in `vfs` only translates
//! inode numbers to paths and results to replies.
//!
//! Two kinds of path exist. Hidden paths (any component starting with `.`)
//! are plain in-memory files. Every other path is a location in the
//! document: mappings are directories, everything else is a file whose
//! content is the serialized value. A mapping named with a format suffix
//! (`db.json`) is a file too, holding the whole mapping.

use std::path::Path as FsPath;
use std::sync::Arc;

use log::debug;
use yamlfs_core_store::{Error, Format, Path, Value};
use yamlfs_doc_store::{
    lookup, resolve_mut, slice, DocumentOptions, DocumentStore, EphemeralStore, WriteSessions,
};
use yamlfs_serde_store::{infer_value, render};

use crate::attr::{Attributes, EntryKind};
use crate::config::ProjectionConfig;

/// One entry of a directory listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    pub name: String,
    pub kind: EntryKind,
}

/// A filesystem path mapped onto the tree.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Located {
    tree_path: Path,
    format: Format,
    /// A format suffix was stripped from the last component. A mapping
    /// reached this way is a regular file holding the rendered mapping.
    suffixed: bool,
}

/// A file opened through `open` or `create`.
///
/// The tree location is resolved once, at open. Writes and the final
/// release go there even if the tree changes under the handle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenFile {
    path: Path,
    tree_path: Option<Path>,
    writable: bool,
}

impl OpenFile {
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_writable(&self) -> bool {
        self.writable
    }
}

/// The document projected onto a filesystem namespace.
#[derive(Debug)]
pub struct Projection {
    document: DocumentStore,
    sessions: WriteSessions,
    ephemeral: EphemeralStore,
    config: ProjectionConfig,
}

impl Projection {
    /// Load the document at `document` and project it.
    pub fn new(document: impl AsRef<FsPath>, config: ProjectionConfig) -> Self {
        let options = DocumentOptions {
            repair_escaped_newlines: config.repair_escaped_newlines,
        };
        Self {
            document: DocumentStore::open(document.as_ref(), options),
            sessions: WriteSessions::new(),
            ephemeral: EphemeralStore::new(),
            config,
        }
    }

    pub fn config(&self) -> &ProjectionConfig {
        &self.config
    }

    pub fn document(&self) -> &DocumentStore {
        &self.document
    }

    /// Map a filesystem path to a tree path and the presentation to use.
    ///
    /// An existing key wins over suffix handling, so a key literally named
    /// `notes.yaml` stays reachable. Otherwise a `.json`, `.yaml` or `.yml`
    /// suffix is stripped and selects the presentation.
    fn locate(&self, root: &Value, path: &Path) -> Located {
        if root.get(path).is_some() {
            return Located {
                tree_path: path.clone(),
                format: self.config.default_format.clone(),
                suffixed: false,
            };
        }
        match path.split_format_suffix() {
            (stem, Some(format)) => Located {
                tree_path: stem,
                format,
                suffixed: true,
            },
            (path, None) => Located {
                tree_path: path,
                format: self.config.default_format.clone(),
                suffixed: false,
            },
        }
    }

    /// `locate` on the current tree, after picking up any edit on disk.
    fn target(&self, path: &Path) -> (Arc<Value>, Located) {
        self.document.reload_if_stale();
        let root = self.document.snapshot();
        let located = self.locate(&root, path);
        (root, located)
    }

    fn attributes(&self, root: &Value, located: &Located) -> Result<Attributes, Error> {
        let mtime = self.document.modified();
        if located.tree_path.is_root() {
            return Ok(Attributes::directory(mtime));
        }
        match lookup(root, &located.tree_path)? {
            Value::Map(_) if !located.suffixed => Ok(Attributes::directory(mtime)),
            value => {
                let size = render(value, &located.format)?.len() as u64;
                Ok(Attributes::file(size, mtime))
            }
        }
    }

    /// List a directory: mapping keys, then ephemeral files in it.
    ///
    /// Sequence items are never listed; a sequence is a single file.
    pub fn list(&self, dir: &Path) -> Result<Vec<DirEntry>, Error> {
        debug!("list {}", dir);
        self.document.reload_for_listing();

        let root = self.document.snapshot();
        let mut entries = Vec::new();

        if !dir.is_hidden() {
            let located = self.locate(&root, dir);
            match lookup(&root, &located.tree_path)? {
                Value::Map(map) if !located.suffixed => {
                    for (key, value) in map {
                        if !is_listable(key) {
                            debug!("skipping key {:?} in {}, not a valid file name", key, dir);
                            continue;
                        }
                        let kind = if value.is_map() {
                            EntryKind::Directory
                        } else {
                            EntryKind::File
                        };
                        entries.push(DirEntry {
                            name: key.clone(),
                            kind,
                        });
                    }
                }
                _ if located.tree_path.is_root() => {}
                _ => return Err(Error::not_directory(dir)),
            }
        }

        for name in self.ephemeral.children(dir) {
            if !entries.iter().any(|entry| entry.name == name) {
                entries.push(DirEntry {
                    name,
                    kind: EntryKind::File,
                });
            }
        }

        Ok(entries)
    }

    /// Attributes of the entry at `path`.
    pub fn getattr(&self, path: &Path) -> Result<Attributes, Error> {
        if path.is_hidden() {
            let size = self
                .ephemeral
                .len(path)
                .ok_or_else(|| Error::not_found(path))?;
            return Ok(Attributes::file(size, self.document.modified()));
        }

        let (root, located) = self.target(path);
        self.attributes(&root, &located)
    }

    /// Open the file at `path`. Writable opens start (or join) a write
    /// session that is committed when the last one is released.
    pub fn open(&self, path: &Path, writable: bool) -> Result<OpenFile, Error> {
        debug!("open {} writable={}", path, writable);

        if path.is_hidden() {
            if !self.ephemeral.contains(path) {
                return Err(Error::not_found(path));
            }
            return Ok(OpenFile {
                path: path.clone(),
                tree_path: None,
                writable,
            });
        }

        let (root, located) = self.target(path);
        if self.attributes(&root, &located)?.is_dir() {
            return Err(Error::IsDirectory {
                path: path.to_string(),
            });
        }
        if writable {
            self.sessions.open(&located.tree_path);
        }
        Ok(OpenFile {
            path: path.clone(),
            tree_path: Some(located.tree_path),
            writable,
        })
    }

    /// Read up to `size` bytes at `offset`.
    pub fn read(&self, path: &Path, offset: u64, size: usize) -> Result<Vec<u8>, Error> {
        debug!("read {} offset={} size={}", path, offset, size);

        if path.is_hidden() {
            return self.ephemeral.read(path, offset, size);
        }

        let (root, located) = self.target(path);
        if located.tree_path.is_root() {
            return Err(Error::IsDirectory {
                path: path.to_string(),
            });
        }
        match lookup(&root, &located.tree_path)? {
            Value::Map(_) if !located.suffixed => Err(Error::IsDirectory {
                path: path.to_string(),
            }),
            value => {
                let content = render(value, &located.format)?;
                Ok(slice(&content, offset, size).to_vec())
            }
        }
    }

    /// Write `data` at `offset` through an open file.
    ///
    /// Document-backed files buffer the bytes; nothing reaches the tree
    /// until the file is released.
    pub fn write(&self, file: &OpenFile, offset: u64, data: &[u8]) -> Result<usize, Error> {
        debug!("write {} offset={} len={}", file.path, offset, data.len());

        if !file.writable {
            return Err(Error::NotPermitted {
                message: format!("{} is not open for writing", file.path),
            });
        }
        match &file.tree_path {
            None => self.ephemeral.write(&file.path, offset, data),
            Some(tree_path) => Ok(self.sessions.write(tree_path, offset, data)),
        }
    }

    /// Truncate the file at `path` to `len` bytes.
    ///
    /// Zero stores an empty string. Any other length keeps that many bytes of
    /// the current presentation and infers a value from them again.
    pub fn truncate(&self, path: &Path, len: u64) -> Result<(), Error> {
        debug!("truncate {} len={}", path, len);

        if path.is_hidden() {
            return self.ephemeral.truncate(path, len);
        }

        let (_, located) = self.target(path);
        self.sessions.truncate(&located.tree_path, len);
        self.document.mutate(|root| {
            let location = resolve_mut(root, &located.tree_path, true)?;
            let value = match location.value() {
                _ if location.key.is_none() => {
                    return Err(Error::IsDirectory {
                        path: path.to_string(),
                    })
                }
                Some(Value::Map(_)) if !located.suffixed => {
                    return Err(Error::IsDirectory {
                        path: path.to_string(),
                    })
                }
                _ if len == 0 => Value::from(""),
                Some(current) => {
                    let content = render(current, &located.format)?;
                    infer_value(slice(&content, 0, usize::try_from(len).unwrap_or(usize::MAX)))
                }
                None => Value::from(""),
            };
            location.set(value)
        })
    }

    /// Create an empty file at `path` and open it for writing.
    pub fn create(&self, path: &Path) -> Result<(Attributes, OpenFile), Error> {
        debug!("create {}", path);

        if path.is_hidden() {
            self.ephemeral.create(path);
            let file = OpenFile {
                path: path.clone(),
                tree_path: None,
                writable: true,
            };
            return Ok((Attributes::file(0, self.document.modified()), file));
        }

        let (_, located) = self.target(path);
        self.document.mutate(|root| {
            let location = resolve_mut(root, &located.tree_path, true)?;
            let is_dir = match location.value() {
                Some(Value::Map(_)) => !located.suffixed,
                _ => location.key.is_none(),
            };
            if is_dir {
                return Err(Error::IsDirectory {
                    path: path.to_string(),
                });
            }
            location.set(Value::from(""))
        })?;

        self.sessions.open(&located.tree_path);
        let file = OpenFile {
            path: path.clone(),
            tree_path: Some(located.tree_path),
            writable: true,
        };
        Ok((Attributes::file(0, self.document.modified()), file))
    }

    /// Remove the entry at `path`, whatever it holds.
    pub fn unlink(&self, path: &Path) -> Result<(), Error> {
        debug!("unlink {}", path);

        if path.is_hidden() {
            return self.ephemeral.remove(path);
        }

        let (_, located) = self.target(path);
        self.document
            .mutate(|root| resolve_mut(root, &located.tree_path, false)?.remove())
            .map(|_| ())
    }

    /// Remove a directory. Like `unlink`, the mapping need not be empty.
    pub fn rmdir(&self, path: &Path) -> Result<(), Error> {
        self.unlink(path)
    }

    /// Create an empty mapping at `path`, with any missing parents.
    ///
    /// A directory has no presentation, so the name is taken literally.
    pub fn mkdir(&self, path: &Path) -> Result<Attributes, Error> {
        debug!("mkdir {}", path);

        if path.is_hidden() {
            return Err(Error::NotPermitted {
                message: format!("cannot create hidden directory {}", path),
            });
        }

        self.document.mutate(|root| {
            let location = resolve_mut(root, path, true)?;
            if location.key.is_none() || matches!(location.value(), Some(Value::Map(_))) {
                return Err(Error::not_directory(path));
            }
            location.set(Value::map())
        })?;

        Ok(Attributes::directory(self.document.modified()))
    }

    /// Release one handle. The last writable handle on a location commits
    /// the buffered bytes into the tree.
    pub fn release(&self, file: OpenFile) -> Result<(), Error> {
        debug!("release {} writable={}", file.path, file.writable);

        let Some(tree_path) = file.tree_path else {
            return Ok(());
        };
        if file.writable {
            if let Some(buffer) = self.sessions.release(&tree_path) {
                return self.commit(&tree_path, &buffer);
            }
        }
        self.document.persist_if_dirty()
    }

    fn commit(&self, tree_path: &Path, buffer: &[u8]) -> Result<(), Error> {
        let value = infer_value(buffer);
        debug!("commit {} as {}", tree_path, value.kind());
        self.document
            .mutate(|root| resolve_mut(root, tree_path, true)?.set(value))
    }

    /// Persist pending changes, if any.
    pub fn flush(&self, path: &Path) -> Result<(), Error> {
        debug!("flush {}", path);
        self.document.persist_if_dirty()
    }

    /// Same as `flush`; the document is the only thing to sync.
    pub fn fsync(&self, path: &Path) -> Result<(), Error> {
        debug!("fsync {}", path);
        self.document.persist_if_dirty()
    }

    /// Any existing entry is accessible.
    pub fn access(&self, path: &Path) -> Result<(), Error> {
        self.getattr(path).map(|_| ())
    }

    /// Timestamps come from the document; requests to change them are
    /// accepted and ignored.
    pub fn utimens(&self, path: &Path) -> Result<(), Error> {
        self.getattr(path).map(|_| ())
    }
}

/// Keys that can't be a file name are kept in the tree but not listed.
fn is_listable(key: &str) -> bool {
    !key.is_empty() && key != "." && key != ".." && !key.contains(['/', '\0'])
}
