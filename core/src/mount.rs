//! Archive mounting (.squashfs ROMs)
//!
//! Archives are mounted read-only under a per-archive directory for the
//! duration of the session. The returned [`MountHandle`] must be consumed
//! with [`MountHandle::end`]; if it is dropped without that (panic path), the
//! drop makes a best-effort unmount so the mount point is never left behind
//! without a cleanup attempt.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::error::{LaunchError, Result};
use crate::tool::{ToolOutput, run_tool};

/// File extension of mountable ROM archives.
pub const ARCHIVE_EXTENSION: &str = "squashfs";

/// Check if a ROM path is a mountable archive (case-insensitive extension).
pub fn is_archive(rom: &Path) -> bool {
    rom.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case(ARCHIVE_EXTENSION))
}

/// Mounts and unmounts archives.
pub trait MountTool: Send + Sync {
    fn mount(&self, archive: &Path, mount_point: &Path) -> std::io::Result<ToolOutput>;
    fn unmount(&self, mount_point: &Path) -> std::io::Result<ToolOutput>;
}

/// `mount` / `umount` from the host.
#[derive(Debug, Clone)]
pub struct SystemMountTool {
    pub mount: String,
    pub umount: String,
}

impl MountTool for SystemMountTool {
    fn mount(&self, archive: &Path, mount_point: &Path) -> std::io::Result<ToolOutput> {
        run_tool(&self.mount, [archive.as_os_str(), mount_point.as_os_str()])
    }

    fn unmount(&self, mount_point: &Path) -> std::io::Result<ToolOutput> {
        run_tool(&self.umount, [mount_point.as_os_str()])
    }
}

/// What currently sits at a mount point path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MountPointState {
    Absent,
    /// Empty directory, usually left by a crash
    Empty,
    /// Non-empty directory, or something that is not a directory
    Occupied,
}

/// Probe a mount point path.
pub fn probe_mount_point(path: &Path) -> MountPointState {
    if !path.exists() {
        return MountPointState::Absent;
    }
    if !path.is_dir() {
        return MountPointState::Occupied;
    }
    match std::fs::read_dir(path) {
        Ok(mut entries) => {
            if entries.next().is_none() {
                MountPointState::Empty
            } else {
                MountPointState::Occupied
            }
        }
        Err(_) => MountPointState::Occupied,
    }
}

/// Mount point name for an archive: its file name without the extension.
fn archive_stem(archive: &Path) -> Option<String> {
    archive
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .filter(|stem| !stem.is_empty())
}

/// Mounts archives under a fixed root directory.
pub struct ArchiveMounter {
    root: PathBuf,
    tool: Arc<dyn MountTool>,
    reuse_occupied: bool,
}

impl ArchiveMounter {
    pub fn new(root: impl Into<PathBuf>, tool: Arc<dyn MountTool>, reuse_occupied: bool) -> Self {
        Self {
            root: root.into(),
            tool,
            reuse_occupied,
        }
    }

    /// Mount `archive` and work out which path the emulator should open.
    pub fn begin(&self, archive: &Path) -> Result<MountHandle> {
        tracing::debug!("Mounting archive {}", archive.display());

        let stem = archive_stem(archive).ok_or_else(|| LaunchError::MountFailed {
            archive: archive.to_path_buf(),
            reason: "archive has no file name".to_string(),
        })?;
        let mount_point = self.root.join(&stem);

        std::fs::create_dir_all(&self.root).map_err(|e| {
            LaunchError::io(format!("failed to create {}", self.root.display()), e)
        })?;

        match probe_mount_point(&mount_point) {
            MountPointState::Absent => {}
            MountPointState::Empty => {
                tracing::debug!("Removing stale mount point {}", mount_point.display());
                std::fs::remove_dir(&mount_point).map_err(|e| {
                    LaunchError::io(format!("failed to remove {}", mount_point.display()), e)
                })?;
            }
            MountPointState::Occupied if self.reuse_occupied => {
                tracing::warn!(
                    "Mount point {} is not empty, using its content as-is",
                    mount_point.display()
                );
                return Ok(MountHandle {
                    archive: archive.to_path_buf(),
                    rom: mount_point.clone(),
                    mount_point,
                    needs_unmount: false,
                    single_file: false,
                    tool: Arc::clone(&self.tool),
                    finished: false,
                });
            }
            MountPointState::Occupied => {
                return Err(LaunchError::MountPointBusy { mount_point });
            }
        }

        std::fs::create_dir(&mount_point).map_err(|e| {
            LaunchError::io(format!("failed to create {}", mount_point.display()), e)
        })?;

        let failure = match self.tool.mount(archive, &mount_point) {
            Ok(out) if out.success() => None,
            Ok(out) => Some(out.failure_reason()),
            Err(e) => Some(e.to_string()),
        };
        if let Some(reason) = failure {
            tracing::debug!("Mounting {} failed: {}", mount_point.display(), reason);
            let _ = std::fs::remove_dir(&mount_point);
            return Err(LaunchError::MountFailed {
                archive: archive.to_path_buf(),
                reason,
            });
        }

        // A single entry named like the archive is the ROM itself
        let single = mount_point.join(&stem);
        let entry_count = std::fs::read_dir(&mount_point)
            .map(|entries| entries.count())
            .unwrap_or(0);
        let single_file = entry_count == 1 && single.exists();
        let rom = if single_file {
            tracing::debug!("Archive holds a single rom: {}", single.display());
            single
        } else {
            mount_point.clone()
        };

        Ok(MountHandle {
            archive: archive.to_path_buf(),
            mount_point,
            rom,
            needs_unmount: true,
            single_file,
            tool: Arc::clone(&self.tool),
            finished: false,
        })
    }
}

/// A mounted (or reused) archive.
pub struct MountHandle {
    pub archive: PathBuf,
    pub mount_point: PathBuf,
    /// Path the emulator should open
    pub rom: PathBuf,
    pub needs_unmount: bool,
    pub single_file: bool,
    tool: Arc<dyn MountTool>,
    finished: bool,
}

impl std::fmt::Debug for MountHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MountHandle")
            .field("archive", &self.archive)
            .field("mount_point", &self.mount_point)
            .field("rom", &self.rom)
            .field("needs_unmount", &self.needs_unmount)
            .field("single_file", &self.single_file)
            .finish()
    }
}

impl MountHandle {
    /// Unmount and remove the mount directory.
    ///
    /// Does nothing for reused mount points.
    pub fn end(mut self) -> Result<()> {
        self.finished = true;
        if !self.needs_unmount {
            return Ok(());
        }
        unmount_and_remove(self.tool.as_ref(), &self.mount_point)
    }
}

impl Drop for MountHandle {
    fn drop(&mut self) {
        if self.finished || !self.needs_unmount {
            return;
        }
        tracing::warn!(
            "Mount point {} dropped without cleanup, unmounting",
            self.mount_point.display()
        );
        if let Err(e) = unmount_and_remove(self.tool.as_ref(), &self.mount_point) {
            tracing::error!("{}", e);
        }
    }
}

fn unmount_and_remove(tool: &dyn MountTool, mount_point: &Path) -> Result<()> {
    tracing::debug!("Unmounting {}", mount_point.display());

    let failure = match tool.unmount(mount_point) {
        Ok(out) if out.success() => None,
        Ok(out) => Some(out.failure_reason()),
        Err(e) => Some(e.to_string()),
    };
    if let Some(reason) = failure {
        return Err(LaunchError::UnmountFailed {
            mount_point: mount_point.to_path_buf(),
            reason,
        });
    }

    std::fs::remove_dir(mount_point)
        .map_err(|e| LaunchError::io(format!("failed to remove {}", mount_point.display()), e))
}
