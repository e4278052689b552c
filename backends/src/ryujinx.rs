//! Ryujinx family backend (ryujinx, ryujinx-avalonia, ryujinx-greem)

use std::path::{Path, PathBuf};

use emulauncher_core::{
    AspectRatio, Backend, LaunchCommand, LaunchContext, Resolution, Result, SessionConfig,
};

use crate::common::{binary_path, joystick_devices};
use crate::yuzu::ENV_JOYSTICK_DEVICE;

/// Launches Ryujinx from its own directory, next to its bundled libraries.
#[derive(Debug, Clone)]
pub struct RyujinxBackend {
    name: &'static str,
    binary: &'static str,
}

impl RyujinxBackend {
    pub fn new(name: &'static str, binary: &'static str) -> Self {
        Self { name, binary }
    }
}

impl Backend for RyujinxBackend {
    fn name(&self) -> &str {
        self.name
    }

    fn generate(&self, ctx: &LaunchContext<'_>) -> Result<LaunchCommand> {
        let binary = binary_path(ctx.config, self.binary);
        let mut command = LaunchCommand::new([
            binary.display().to_string(),
            ctx.rom.display().to_string(),
        ]);
        if let Some(devices) = joystick_devices(ctx.controllers) {
            command = command.env(ENV_JOYSTICK_DEVICE, devices);
        }
        Ok(command)
    }

    fn execution_directory(&self, config: &SessionConfig, _rom: &Path) -> Option<PathBuf> {
        binary_path(config, self.binary)
            .parent()
            .filter(|dir| !dir.as_os_str().is_empty())
            .map(Path::to_path_buf)
    }

    fn in_game_ratio(
        &self,
        _config: &SessionConfig,
        _resolution: Resolution,
        _rom: &Path,
    ) -> AspectRatio {
        AspectRatio::SIXTEEN_NINE
    }
}
