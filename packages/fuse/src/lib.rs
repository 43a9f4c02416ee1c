//! yamlfs FUSE layer - a YAML document as a directory tree.
//!
//! - `Projection`: every filesystem operation, expressed on paths
//! - `YamlFilesystem`: the `fuser::Filesystem` bridge (inode numbers, handles)
//! - `mount` / `spawn_mount`: mount helpers
//!
//! # Example
//!
//! ```rust,no_run
//! use std::path::Path;
//! use yamlfs_fuse::{mount, MountConfig, ProjectionConfig};
//!
//! let config = MountConfig {
//!     mount_point: "/mnt/config".into(),
//!     ..MountConfig::default()
//! };
//! mount(Path::new("config.yaml"), ProjectionConfig::default(), &config).unwrap();
//! ```

pub mod attr;
pub mod config;
pub mod inode;
pub mod mount;
pub mod projection;
pub mod vfs;

pub use attr::{Attributes, EntryKind};
pub use config::ProjectionConfig;
pub use inode::{InodeTable, ROOT_INO};
pub use mount::{mount, prepare_mount_point, spawn_mount, MountConfig};
pub use projection::{DirEntry, OpenFile, Projection};
pub use vfs::YamlFilesystem;

use std::path::PathBuf;

use thiserror::Error;

/// Filesystem errors.
#[derive(Debug, Error)]
pub enum FsError {
    /// Mount failed
    #[error("Mount failed: {0}")]
    Mount(String),

    /// Mount point unusable
    #[error("Invalid mount point {}: {message}", path.display())]
    MountPoint { path: PathBuf, message: String },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Projection error
    #[error(transparent)]
    Projection(#[from] yamlfs_core_store::Error),
}
