//! yuzu family backend (eden, citron, sudachi, yuzu, yuzu early access)

use std::path::Path;

use emulauncher_core::{
    AspectRatio, Backend, LaunchCommand, LaunchContext, Resolution, Result, SessionConfig,
};

use crate::common::{binary_path, joystick_devices};

/// Forces the Qt frontend onto X11.
pub const ENV_QT_PLATFORM: &str = "QT_QPA_PLATFORM";
/// Restricts SDL to the controllers assigned by the frontend.
pub const ENV_JOYSTICK_DEVICE: &str = "SDL_JOYSTICK_DEVICE";

/// Launches one of the yuzu forks in fullscreen.
#[derive(Debug, Clone)]
pub struct YuzuBackend {
    name: &'static str,
    binary: &'static str,
}

impl YuzuBackend {
    /// `binary` is the default file name under the emulator directory.
    pub fn new(name: &'static str, binary: &'static str) -> Self {
        Self { name, binary }
    }
}

impl Backend for YuzuBackend {
    fn name(&self) -> &str {
        self.name
    }

    fn generate(&self, ctx: &LaunchContext<'_>) -> Result<LaunchCommand> {
        let binary = binary_path(ctx.config, self.binary);
        tracing::debug!("{} binary: {}", self.name, binary.display());

        let mut command = LaunchCommand::new([
            binary.display().to_string(),
            "-f".to_string(),
            "-g".to_string(),
            ctx.rom.display().to_string(),
        ])
        .env(ENV_QT_PLATFORM, "xcb");

        if let Some(devices) = joystick_devices(ctx.controllers) {
            command = command.env(ENV_JOYSTICK_DEVICE, devices);
        }
        Ok(command)
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
