//! Helpers shared by the built-in backends

use std::path::{Path, PathBuf};

use emulauncher_core::{Controller, SessionConfig};

/// Config key overriding the emulator binary path.
pub const KEY_BINARY: &str = "emulator_binary";

/// Directory holding the emulator AppImages.
pub const APPS_DIR: &str = "/userdata/system/switch";

/// Emulator binary: `emulator_binary` if set, else `<APPS_DIR>/<file>`.
pub fn binary_path(config: &SessionConfig, default_file: &str) -> PathBuf {
    config
        .get_str(KEY_BINARY)
        .filter(|path| !path.is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| Path::new(APPS_DIR).join(default_file))
}

/// Device nodes of the assigned controllers, in player order.
pub fn joystick_devices(controllers: &[Controller]) -> Option<String> {
    let mut sorted: Vec<&Controller> = controllers.iter().collect();
    sorted.sort_by_key(|c| c.player);

    let devices: Vec<&str> = sorted
        .iter()
        .filter_map(|c| c.device_path.as_deref())
        .filter(|path| !path.is_empty())
        .collect();
    (!devices.is_empty()).then(|| devices.join(","))
}
