//! Mount point management.

use std::fs;
use std::path::{Path, PathBuf};

use fuser::MountOption;
use log::info;

use crate::config::ProjectionConfig;
use crate::projection::Projection;
use crate::vfs::YamlFilesystem;
use crate::FsError;

/// Mount configuration.
#[derive(Debug, Clone)]
pub struct MountConfig {
    /// Mount point path
    pub mount_point: PathBuf,
    /// Allow other users to access
    pub allow_other: bool,
    /// Unmount when the process exits
    pub auto_unmount: bool,
    /// Read-only mount
    pub read_only: bool,
    /// Filesystem name shown in mount output
    pub fs_name: String,
}

impl Default for MountConfig {
    fn default() -> Self {
        Self {
            mount_point: PathBuf::new(),
            allow_other: false,
            auto_unmount: true,
            read_only: false,
            fs_name: "yamlfs".to_string(),
        }
    }
}

impl MountConfig {
    /// Options passed to the kernel.
    pub fn mount_options(&self) -> Vec<MountOption> {
        let mut options = vec![
            MountOption::FSName(self.fs_name.clone()),
            MountOption::Subtype("yamlfs".to_string()),
            MountOption::DefaultPermissions,
        ];
        options.push(if self.read_only {
            MountOption::RO
        } else {
            MountOption::RW
        });
        if self.allow_other {
            options.push(MountOption::AllowOther);
        }
        if self.auto_unmount {
            options.push(MountOption::AutoUnmount);
        }
        options
    }
}

/// Create the mount point if it's missing; refuse anything but a directory.
pub fn prepare_mount_point(mount_point: &Path) -> Result<(), FsError> {
    match fs::metadata(mount_point) {
        Ok(metadata) if metadata.is_dir() => Ok(()),
        Ok(_) => Err(FsError::MountPoint {
            path: mount_point.to_path_buf(),
            message: "not a directory".to_string(),
        }),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            info!("Creating mount point {}", mount_point.display());
            fs::create_dir_all(mount_point).map_err(|e| FsError::MountPoint {
                path: mount_point.to_path_buf(),
                message: format!("failed to create: {}", e),
            })
        }
        Err(e) => Err(FsError::MountPoint {
            path: mount_point.to_path_buf(),
            message: e.to_string(),
        }),
    }
}

fn filesystem(document: &Path, projection: ProjectionConfig, config: &MountConfig) -> YamlFilesystem {
    YamlFilesystem::new(Projection::new(document, projection), config.read_only)
}

/// Mounts `document` and serves it until the filesystem is unmounted.
pub fn mount(
    document: &Path,
    projection: ProjectionConfig,
    config: &MountConfig,
) -> Result<(), FsError> {
    prepare_mount_point(&config.mount_point)?;
    let fs = filesystem(document, projection, config);

    info!(
        "Mounting {} at {}",
        document.display(),
        config.mount_point.display()
    );
    fuser::mount2(fs, &config.mount_point, &config.mount_options())
        .map_err(|e| FsError::Mount(format!("FUSE mount failed: {}", e)))
}

/// Mounts `document` in a background thread.
///
/// The filesystem stays mounted until the returned session is dropped.
pub fn spawn_mount(
    document: &Path,
    projection: ProjectionConfig,
    config: &MountConfig,
) -> Result<fuser::BackgroundSession, FsError> {
    prepare_mount_point(&config.mount_point)?;
    let fs = filesystem(document, projection, config);

    info!(
        "Mounting {} at {} in the background",
        document.display(),
        config.mount_point.display()
    );
    fuser::spawn_mount2(fs, &config.mount_point, &config.mount_options())
        .map_err(|e| FsError::Mount(format!("FUSE mount failed: {}", e)))
}
