//! Game start/stop scripts
//!
//! Every executable file under a hook root is called as
//! `<script> gameStart|gameStop <system> <backend> <core> <rom>`. Exit
//! statuses are ignored and failures never stop the session.

use std::fmt;
use std::fs::Metadata;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use walkdir::WalkDir;

use crate::error::LaunchError;

/// Session event passed as the first hook argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookEvent {
    GameStart,
    GameStop,
}

impl HookEvent {
    pub fn as_str(self) -> &'static str {
        match self {
            HookEvent::GameStart => "gameStart",
            HookEvent::GameStop => "gameStop",
        }
    }
}

impl fmt::Display for HookEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Arguments after the event name.
#[derive(Debug, Clone, Copy)]
pub struct HookArgs<'a> {
    pub system: &'a str,
    pub backend: &'a str,
    pub core: &'a str,
    pub rom: &'a Path,
}

#[cfg(unix)]
fn is_executable(meta: &Metadata) -> bool {
    use std::os::unix::fs::PermissionsExt;
    meta.permissions().mode() & 0o111 != 0
}

#[cfg(not(unix))]
fn is_executable(_meta: &Metadata) -> bool {
    true
}

/// Executable files under `root`, recursively, sorted by file name.
///
/// Symbolic links are followed, both to files and to directories.
pub fn find_hooks(root: &Path) -> Vec<PathBuf> {
    if !root.is_dir() {
        return Vec::new();
    }
    WalkDir::new(root)
        .follow_links(true)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                tracing::warn!("Skipping hook entry: {}", e);
                None
            }
        })
        .filter(|entry| entry.file_type().is_file())
        .filter(|entry| entry.metadata().is_ok_and(|meta| is_executable(&meta)))
        .map(|entry| entry.into_path())
        .collect()
}

/// Run every hook under `root` for `event`.
pub fn run_hooks(root: &Path, event: HookEvent, args: &HookArgs<'_>) {
    for script in find_hooks(root) {
        tracing::debug!(
            "Calling external script: {} {} {} {} {} {}",
            script.display(),
            event,
            args.system,
            args.backend,
            args.core,
            args.rom.display()
        );
        let status = Command::new(&script)
            .arg(event.as_str())
            .arg(args.system)
            .arg(args.backend)
            .arg(args.core)
            .arg(args.rom)
            .stdin(Stdio::null())
            .status();
        match status {
            Ok(status) if !status.success() => {
                tracing::debug!("{} exited with {}", script.display(), status);
            }
            Ok(_) => {}
            Err(e) => {
                let error = LaunchError::HookFailed {
                    path: script,
                    reason: e.to_string(),
                };
                tracing::warn!("{}", error);
            }
        }
    }
}

/// System and user hook roots.
#[derive(Debug, Clone)]
pub struct HookRunner {
    pub system_root: PathBuf,
    pub user_root: PathBuf,
}

impl HookRunner {
    pub fn new(system_root: impl Into<PathBuf>, user_root: impl Into<PathBuf>) -> Self {
        Self {
            system_root: system_root.into(),
            user_root: user_root.into(),
        }
    }

    /// Roots in calling order: system first on start, user first on stop.
    pub fn roots(&self, event: HookEvent) -> [&Path; 2] {
        match event {
            HookEvent::GameStart => [self.system_root.as_path(), self.user_root.as_path()],
            HookEvent::GameStop => [self.user_root.as_path(), self.system_root.as_path()],
        }
    }

    pub fn run(&self, event: HookEvent, args: &HookArgs<'_>) {
        for root in self.roots(event) {
            run_hooks(root, event, args);
        }
    }
}
