//! Emulator backend abstraction
//!
//! A backend turns a resolved session into a [`LaunchCommand`] and answers
//! the capability questions the session needs before launching (preferred
//! display mode, bezel support, HUD integration, in-game aspect ratio).

use std::path::{Path, PathBuf};

use crate::config::SessionConfig;
use crate::error::Result;
use crate::types::{AspectRatio, Controller, LaunchCommand, Resolution};

/// Everything a backend may need to build its command.
#[derive(Debug, Clone, Copy)]
pub struct LaunchContext<'a> {
    pub config: &'a SessionConfig,
    pub system: &'a str,
    /// Effective ROM path (inside the mount point for archives)
    pub rom: &'a Path,
    pub controllers: &'a [Controller],
    pub resolution: Resolution,
    pub saves_dir: &'a Path,
}

/// Per-emulator launch strategy.
pub trait Backend: Send + Sync {
    /// Registry name of this backend
    fn name(&self) -> &str;

    /// Build the command line and environment for the emulator.
    fn generate(&self, ctx: &LaunchContext<'_>) -> Result<LaunchCommand>;

    /// Display mode the backend wants, or `"default"` to keep the current one.
    fn resolution_mode(&self, config: &SessionConfig) -> String {
        if config.video_mode.is_empty() {
            "default".to_string()
        } else {
            config.video_mode.clone()
        }
    }

    /// Directory the emulator must be started from, if any.
    fn execution_directory(&self, _config: &SessionConfig, _rom: &Path) -> Option<PathBuf> {
        None
    }

    /// The emulator draws its own bezels.
    fn supports_internal_bezels(&self) -> bool {
        false
    }

    /// The emulator loads the HUD renderer itself.
    fn has_internal_hud_call(&self) -> bool {
        false
    }

    /// Aspect ratio of the game image on screen.
    fn in_game_ratio(
        &self,
        _config: &SessionConfig,
        _resolution: Resolution,
        _rom: &Path,
    ) -> AspectRatio {
        AspectRatio::FOUR_THREE
    }
}
