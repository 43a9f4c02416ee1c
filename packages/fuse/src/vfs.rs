//! FUSE bindings for the projection.

use std::collections::HashMap;
use std::ffi::OsStr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, SystemTime};

use fuser::{
    consts::FOPEN_DIRECT_IO, FileType, Filesystem, KernelConfig, ReplyAttr, ReplyCreate,
    ReplyData, ReplyDirectory, ReplyEmpty, ReplyEntry, ReplyOpen, ReplyWrite, Request, TimeOrNow,
};
use log::{debug, info, warn};
use parking_lot::Mutex;
use yamlfs_core_store::{Error, Path};

use crate::attr::Attributes;
use crate::inode::{InodeTable, ROOT_INO};
use crate::projection::{OpenFile, Projection};

/// The projection as a FUSE filesystem.
pub struct YamlFilesystem {
    projection: Projection,
    inodes: InodeTable,
    handles: Mutex<HashMap<u64, OpenFile>>,
    next_handle: AtomicU64,
    read_only: bool,
    ttl: Duration,
    uid: u32,
    gid: u32,
}

impl YamlFilesystem {
    /// Creates the filesystem. Files are owned by the mounting user.
    pub fn new(projection: Projection, read_only: bool) -> Self {
        let ttl = projection.config().attr_ttl;
        Self {
            projection,
            inodes: InodeTable::new(),
            handles: Mutex::new(HashMap::new()),
            next_handle: AtomicU64::new(1),
            read_only,
            ttl,
            uid: unsafe { libc::getuid() },
            gid: unsafe { libc::getgid() },
        }
    }

    pub fn projection(&self) -> &Projection {
        &self.projection
    }

    fn path(&self, ino: u64) -> Result<Path, Error> {
        self.inodes
            .path(ino)
            .ok_or_else(|| Error::not_found(format!("inode {}", ino)))
    }

    fn child_path(&self, parent: u64, name: &OsStr) -> Result<Path, Error> {
        let name = name
            .to_str()
            .ok_or_else(|| Error::not_found(name.to_string_lossy()))?;
        Ok(self.path(parent)?.child(name)?)
    }

    fn file_attr(&self, path: &Path, attributes: Attributes) -> fuser::FileAttr {
        attributes.to_file_attr(self.inodes.ino(path), self.uid, self.gid)
    }

    /// Attributes for an entry reply; the kernel now holds a reference.
    fn entry_attr(&self, path: &Path, attributes: Attributes) -> fuser::FileAttr {
        attributes.to_file_attr(self.inodes.lookup(path), self.uid, self.gid)
    }

    fn allocate_handle(&self, file: OpenFile) -> u64 {
        let fh = self.next_handle.fetch_add(1, Ordering::Relaxed);
        self.handles.lock().insert(fh, file);
        fh
    }

    fn handle_path(&self, ino: u64, fh: u64) -> Result<Path, Error> {
        match self.handles.lock().get(&fh) {
            Some(file) => Ok(file.path().clone()),
            None => self.path(ino),
        }
    }

    fn check_writable(&self) -> Result<(), libc::c_int> {
        if self.read_only {
            Err(libc::EROFS)
        } else {
            Ok(())
        }
    }
}

fn log_error(op: &str, e: &Error) -> libc::c_int {
    let errno = e.errno();
    match e {
        Error::NotFound { .. } => debug!("{}: {}", op, e),
        _ => warn!("{} failed: {}", op, e),
    }
    errno
}

impl Filesystem for YamlFilesystem {
    fn init(&mut self, _req: &Request<'_>, _config: &mut KernelConfig) -> Result<(), libc::c_int> {
        info!(
            "Serving {}",
            self.projection.document().path().display()
        );
        Ok(())
    }

    fn destroy(&mut self) {
        if let Err(e) = self.projection.document().persist_if_dirty() {
            warn!("Unsaved changes lost at unmount: {}", e);
        }
        info!("Unmounted");
    }

    fn lookup(&mut self, _req: &Request<'_>, parent: u64, name: &OsStr, reply: ReplyEntry) {
        debug!("lookup parent={} name={:?}", parent, name);

        let result = self
            .child_path(parent, name)
            .and_then(|path| Ok((self.projection.getattr(&path)?, path)));
        match result {
            Ok((attributes, path)) => reply.entry(&self.ttl, &self.entry_attr(&path, attributes), 0),
            Err(e) => reply.error(log_error("lookup", &e)),
        }
    }

    fn forget(&mut self, _req: &Request<'_>, ino: u64, nlookup: u64) {
        debug!("forget ino={} nlookup={}", ino, nlookup);
        self.inodes.forget(ino, nlookup);
    }

    fn getattr(&mut self, _req: &Request<'_>, ino: u64, _fh: Option<u64>, reply: ReplyAttr) {
        debug!("getattr ino={}", ino);

        let result = self
            .path(ino)
            .and_then(|path| Ok((self.projection.getattr(&path)?, path)));
        match result {
            Ok((attributes, path)) => reply.attr(&self.ttl, &self.file_attr(&path, attributes)),
            Err(e) => reply.error(log_error("getattr", &e)),
        }
    }

    fn setattr(
        &mut self,
        _req: &Request<'_>,
        ino: u64,
        _mode: Option<u32>,
        _uid: Option<u32>,
        _gid: Option<u32>,
        size: Option<u64>,
        atime: Option<TimeOrNow>,
        mtime: Option<TimeOrNow>,
        _ctime: Option<SystemTime>,
        fh: Option<u64>,
        _crtime: Option<SystemTime>,
        _chgtime: Option<SystemTime>,
        _bkuptime: Option<SystemTime>,
        _flags: Option<u32>,
        reply: ReplyAttr,
    ) {
        debug!("setattr ino={} size={:?}", ino, size);

        if size.is_some() {
            if let Err(errno) = self.check_writable() {
                reply.error(errno);
                return;
            }
        }

        let path = match fh {
            Some(fh) => self.handle_path(ino, fh),
            None => self.path(ino),
        };
        let result = path.and_then(|path| {
            if let Some(size) = size {
                self.projection.truncate(&path, size)?;
            }
            if atime.is_some() || mtime.is_some() {
                self.projection.utimens(&path)?;
            }
            Ok((self.projection.getattr(&path)?, path))
        });
        match result {
            Ok((attributes, path)) => reply.attr(&self.ttl, &self.file_attr(&path, attributes)),
            Err(e) => reply.error(log_error("setattr", &e)),
        }
    }

    fn mkdir(
        &mut self,
        _req: &Request<'_>,
        parent: u64,
        name: &OsStr,
        _mode: u32,
        _umask: u32,
        reply: ReplyEntry,
    ) {
        debug!("mkdir parent={} name={:?}", parent, name);

        if let Err(errno) = self.check_writable() {
            reply.error(errno);
            return;
        }
        let result = self
            .child_path(parent, name)
            .and_then(|path| Ok((self.projection.mkdir(&path)?, path)));
        match result {
            Ok((attributes, path)) => reply.entry(&self.ttl, &self.entry_attr(&path, attributes), 0),
            Err(e) => reply.error(log_error("mkdir", &e)),
        }
    }

    fn unlink(&mut self, _req: &Request<'_>, parent: u64, name: &OsStr, reply: ReplyEmpty) {
        debug!("unlink parent={} name={:?}", parent, name);

        if let Err(errno) = self.check_writable() {
            reply.error(errno);
            return;
        }
        match self
            .child_path(parent, name)
            .and_then(|path| self.projection.unlink(&path))
        {
            Ok(()) => reply.ok(),
            Err(e) => reply.error(log_error("unlink", &e)),
        }
    }

    fn rmdir(&mut self, _req: &Request<'_>, parent: u64, name: &OsStr, reply: ReplyEmpty) {
        debug!("rmdir parent={} name={:?}", parent, name);

        if let Err(errno) = self.check_writable() {
            reply.error(errno);
            return;
        }
        match self
            .child_path(parent, name)
            .and_then(|path| self.projection.rmdir(&path))
        {
            Ok(()) => reply.ok(),
            Err(e) => reply.error(log_error("rmdir", &e)),
        }
    }

    fn open(&mut self, _req: &Request<'_>, ino: u64, flags: i32, reply: ReplyOpen) {
        debug!("open ino={} flags={:#o}", ino, flags);

        let writable = (flags & libc::O_ACCMODE) != libc::O_RDONLY;
        if writable {
            if let Err(errno) = self.check_writable() {
                reply.error(errno);
                return;
            }
        }

        let result = self
            .path(ino)
            .and_then(|path| self.projection.open(&path, writable));
        match result {
            Ok(file) => {
                let fh = self.allocate_handle(file);
                // Content is generated on every read, never cache it
                reply.opened(fh, FOPEN_DIRECT_IO);
            }
            Err(e) => reply.error(log_error("open", &e)),
        }
    }

    fn read(
        &mut self,
        _req: &Request<'_>,
        ino: u64,
        fh: u64,
        offset: i64,
        size: u32,
        _flags: i32,
        _lock_owner: Option<u64>,
        reply: ReplyData,
    ) {
        debug!("read ino={} fh={} offset={} size={}", ino, fh, offset, size);

        let offset = u64::try_from(offset).unwrap_or(0);
        let result = self
            .handle_path(ino, fh)
            .and_then(|path| self.projection.read(&path, offset, size as usize));
        match result {
            Ok(data) => reply.data(&data),
            Err(e) => reply.error(log_error("read", &e)),
        }
    }

    fn write(
        &mut self,
        _req: &Request<'_>,
        ino: u64,
        fh: u64,
        offset: i64,
        data: &[u8],
        _write_flags: u32,
        _flags: i32,
        _lock_owner: Option<u64>,
        reply: ReplyWrite,
    ) {
        debug!(
            "write ino={} fh={} offset={} size={}",
            ino,
            fh,
            offset,
            data.len()
        );

        let Some(file) = self.handles.lock().get(&fh).cloned() else {
            reply.error(libc::EBADF);
            return;
        };
        let offset = u64::try_from(offset).unwrap_or(0);
        match self.projection.write(&file, offset, data) {
            Ok(written) => reply.written(written as u32),
            Err(e) => reply.error(log_error("write", &e)),
        }
    }

    fn flush(&mut self, _req: &Request<'_>, ino: u64, fh: u64, _lock_owner: u64, reply: ReplyEmpty) {
        debug!("flush ino={} fh={}", ino, fh);

        match self
            .handle_path(ino, fh)
            .and_then(|path| self.projection.flush(&path))
        {
            Ok(()) => reply.ok(),
            Err(e) => reply.error(log_error("flush", &e)),
        }
    }

    fn release(
        &mut self,
        _req: &Request<'_>,
        ino: u64,
        fh: u64,
        _flags: i32,
        _lock_owner: Option<u64>,
        _flush: bool,
        reply: ReplyEmpty,
    ) {
        debug!("release ino={} fh={}", ino, fh);

        let Some(file) = self.handles.lock().remove(&fh) else {
            reply.error(libc::EBADF);
            return;
        };
        match self.projection.release(file) {
            Ok(()) => reply.ok(),
            Err(e) => reply.error(log_error("release", &e)),
        }
    }

    fn fsync(&mut self, _req: &Request<'_>, ino: u64, fh: u64, _datasync: bool, reply: ReplyEmpty) {
        debug!("fsync ino={} fh={}", ino, fh);

        match self
            .handle_path(ino, fh)
            .and_then(|path| self.projection.fsync(&path))
        {
            Ok(()) => reply.ok(),
            Err(e) => reply.error(log_error("fsync", &e)),
        }
    }

    fn readdir(
        &mut self,
        _req: &Request<'_>,
        ino: u64,
        _fh: u64,
        offset: i64,
        mut reply: ReplyDirectory,
    ) {
        debug!("readdir ino={} offset={}", ino, offset);

        let path = match self.path(ino) {
            Ok(path) => path,
            Err(e) => {
                reply.error(log_error("readdir", &e));
                return;
            }
        };
        let listing = match self.projection.list(&path) {
            Ok(listing) => listing,
            Err(e) => {
                reply.error(log_error("readdir", &e));
                return;
            }
        };

        let parent_ino = path
            .parent()
            .map(|parent| self.inodes.ino(&parent))
            .unwrap_or(ROOT_INO);
        let mut entries: Vec<(u64, FileType, String)> = vec![
            (ino, FileType::Directory, ".".to_string()),
            (parent_ino, FileType::Directory, "..".to_string()),
        ];
        for entry in listing {
            let child = match path.child(&entry.name) {
                Ok(child) => child,
                Err(_) => continue,
            };
            entries.push((self.inodes.ino(&child), entry.kind.into(), entry.name));
        }

        let skip = usize::try_from(offset).unwrap_or(0);
        for (i, (ino, kind, name)) in entries.into_iter().enumerate().skip(skip) {
            // Reply returns true if buffer is full
            if reply.add(ino, (i + 1) as i64, kind, &name) {
                break;
            }
        }
        reply.ok();
    }

    fn access(&mut self, _req: &Request<'_>, ino: u64, mask: i32, reply: ReplyEmpty) {
        debug!("access ino={} mask={}", ino, mask);

        if mask & libc::W_OK != 0 {
            if let Err(errno) = self.check_writable() {
                reply.error(errno);
                return;
            }
        }
        match self.path(ino).and_then(|path| self.projection.access(&path)) {
            Ok(()) => reply.ok(),
            Err(e) => reply.error(log_error("access", &e)),
        }
    }

    fn create(
        &mut self,
        _req: &Request<'_>,
        parent: u64,
        name: &OsStr,
        _mode: u32,
        _umask: u32,
        _flags: i32,
        reply: ReplyCreate,
    ) {
        debug!("create parent={} name={:?}", parent, name);

        if let Err(errno) = self.check_writable() {
            reply.error(errno);
            return;
        }
        let result = self
            .child_path(parent, name)
            .and_then(|path| Ok((self.projection.create(&path)?, path)));
        match result {
            Ok(((attributes, file), path)) => {
                let attr = self.entry_attr(&path, attributes);
                let fh = self.allocate_handle(file);
                reply.created(&self.ttl, &attr, 0, fh, FOPEN_DIRECT_IO);
            }
            Err(e) => reply.error(log_error("create", &e)),
        }
    }
}
