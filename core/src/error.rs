//! Launch error taxonomy
//!
//! Fatal variants abort the session and reach the binary, which turns them
//! into exit code `-1`. `HookFailed`, `OverlayComputationFailed`,
//! `ResolutionRestoreFailed` and `InputMapperFailed` are only ever logged by
//! the orchestrator.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum LaunchError {
    #[error("no backend registered for emulator '{name}' (available: {available})")]
    UnknownBackend { name: String, available: String },

    #[error("no emulator configured for this session")]
    MissingEmulator,

    #[error("unable to mount {}: {reason}", archive.display())]
    MountFailed { archive: PathBuf, reason: String },

    #[error("mount point {} is already in use", mount_point.display())]
    MountPointBusy { mount_point: PathBuf },

    #[error("unable to unmount {}: {reason}", mount_point.display())]
    UnmountFailed { mount_point: PathBuf, reason: String },

    #[error("failed to launch '{program}': {source}")]
    ChildLaunchFailed {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("display mode {action} failed: {reason}")]
    DisplayFailed { action: &'static str, reason: String },

    #[error("input mapper {action} failed: {reason}")]
    InputMapperFailed { action: &'static str, reason: String },

    #[error("hook {} failed: {reason}", path.display())]
    HookFailed { path: PathBuf, reason: String },

    #[error("overlay computation failed: {0}")]
    OverlayComputationFailed(String),

    #[error("failed to restore display mode '{mode}': {reason}")]
    ResolutionRestoreFailed { mode: String, reason: String },

    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },
}

impl LaunchError {
    pub(crate) fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        LaunchError::Io {
            context: context.into(),
            source,
        }
    }
}

pub type Result<T, E = LaunchError> = std::result::Result<T, E>;
