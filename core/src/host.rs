//! Host preparation before a launch (pointer helper, executable bits)
//!
//! Everything here is best effort: failures are logged and the session goes
//! on.

use std::path::Path;

use crate::tool::run_tool;

/// Make the mouse pointer visible for the emulator's own UI.
///
/// Runs the pointer helper (`unclutter-remote`) with `-s`, which shows it.
pub fn show_pointer(program: &str) {
    match run_tool(program, ["-s"]) {
        Ok(out) if !out.success() => {
            tracing::debug!("{} -s: {}", program, out.failure_reason());
        }
        Ok(_) => {}
        Err(e) => tracing::debug!("Unable to run {}: {}", program, e),
    }
}

/// Add the executable bits to everything under `root` (`chmod -R +x`).
///
/// Returns the number of entries whose mode changed.
#[cfg(unix)]
pub fn mark_executable(root: &Path) -> usize {
    use std::os::unix::fs::PermissionsExt;
    use walkdir::WalkDir;

    if !root.exists() {
        return 0;
    }
    let mut changed = 0;
    for entry in WalkDir::new(root).into_iter().filter_map(Result::ok) {
        let Ok(meta) = entry.metadata() else {
            continue;
        };
        let mode = meta.permissions().mode();
        if mode & 0o111 == 0o111 {
            continue;
        }
        let perms = std::fs::Permissions::from_mode(mode | 0o111);
        match std::fs::set_permissions(entry.path(), perms) {
            Ok(()) => changed += 1,
            Err(e) => tracing::debug!("chmod +x {}: {}", entry.path().display(), e),
        }
    }
    changed
}

#[cfg(not(unix))]
pub fn mark_executable(_root: &Path) -> usize {
    0
}
