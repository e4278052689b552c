//! Launcher settings (launcher.toml)
//!
//! Fixed paths, external tool names and the configuration layers merged into
//! each session. Every section has defaults matching the console image, so a
//! missing file is not an error.
//!
//! Layer tables are flattened: `bezel.tattoo = "system"` sets the session key
//! `bezel.tattoo`. A table that also sets `bezel` itself needs the quoted
//! form, `"bezel.tattoo" = "system"`.

use std::path::{Path, PathBuf};

use hashbrown::HashMap;
use serde::{Deserialize, Serialize};

use crate::config::{ConfigMap, KEY_CORE, KEY_EMULATOR};

/// Default location of the settings file.
pub const DEFAULT_SETTINGS_PATH: &str = "/userdata/system/configs/emulauncher/launcher.toml";

/// Environment variable overriding [`DEFAULT_SETTINGS_PATH`].
pub const SETTINGS_ENV: &str = "EMULAUNCHER_CONFIG";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LauncherSettings {
    /// Delay before the process exits, so the display can reclaim GPU memory
    #[serde(default = "default_exit_delay_ms")]
    pub exit_delay_ms: u64,
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(default)]
    pub tools: ToolsConfig,
    #[serde(default)]
    pub mount: MountConfig,
    /// Global session keys
    #[serde(default)]
    pub defaults: toml::Table,
    /// Per-system session keys
    #[serde(default)]
    pub systems: HashMap<String, toml::Table>,
    /// Per-game session keys, by system then ROM file name
    #[serde(default)]
    pub games: HashMap<String, HashMap<String, toml::Table>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    pub mount_root: PathBuf,
    pub saves_dir: PathBuf,
    pub hud_config: PathBuf,
    pub overlay_dir: PathBuf,
    pub system_hooks: PathBuf,
    pub user_hooks: PathBuf,
    pub decorations: Vec<PathBuf>,
    pub executable_dirs: Vec<PathBuf>,
    pub input_mapper_state: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolsConfig {
    pub resolution: String,
    pub mount: String,
    pub umount: String,
    pub input_mapper: String,
    /// Pointer helper run before launch (optional)
    pub pointer: Option<String>,
    /// HUD renderer prepended when the backend does not call it itself
    pub hud_renderer: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MountConfig {
    /// Use a non-empty mount point as-is instead of failing
    pub reuse_occupied_mount_point: bool,
}

fn default_exit_delay_ms() -> u64 {
    1000
}

impl Default for LauncherSettings {
    fn default() -> Self {
        Self {
            exit_delay_ms: default_exit_delay_ms(),
            paths: PathsConfig::default(),
            tools: ToolsConfig::default(),
            mount: MountConfig::default(),
            defaults: toml::Table::new(),
            systems: HashMap::new(),
            games: HashMap::new(),
        }
    }
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            mount_root: PathBuf::from("/var/run/squashfs"),
            saves_dir: PathBuf::from("/userdata/saves"),
            hud_config: PathBuf::from("/var/run/hud.config"),
            overlay_dir: PathBuf::from("/tmp"),
            system_hooks: PathBuf::from("/usr/share/batocera/configgen/scripts"),
            user_hooks: PathBuf::from("/userdata/system/scripts"),
            decorations: vec![
                PathBuf::from("/userdata/decorations"),
                PathBuf::from("/usr/share/batocera/datainit/decorations"),
            ],
            executable_dirs: vec![
                PathBuf::from("/userdata/system/switch/extra"),
                PathBuf::from("/userdata/system/switch"),
            ],
            input_mapper_state: PathBuf::from("/var/run/evmapy"),
        }
    }
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            resolution: "batocera-resolution".to_string(),
            mount: "mount".to_string(),
            umount: "umount".to_string(),
            input_mapper: "batocera-evmapy".to_string(),
            pointer: Some("unclutter-remote".to_string()),
            hud_renderer: "mangohud".to_string(),
        }
    }
}

impl Default for MountConfig {
    fn default() -> Self {
        Self {
            reuse_occupied_mount_point: true,
        }
    }
}

/// Explicit overrides from the command line.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub emulator: Option<String>,
    pub core: Option<String>,
    /// Extra keys (netplay, save states) pinned for the session
    pub extra: Vec<(String, String)>,
}

impl LauncherSettings {
    /// Resolve the settings path: explicit path, then environment, then default.
    pub fn resolve_path(explicit: Option<&Path>) -> PathBuf {
        explicit
            .map(Path::to_path_buf)
            .or_else(|| std::env::var_os(SETTINGS_ENV).map(PathBuf::from))
            .unwrap_or_else(|| PathBuf::from(DEFAULT_SETTINGS_PATH))
    }

    /// Load settings from a file.
    ///
    /// Returns defaults if the file doesn't exist; unreadable or invalid files
    /// are logged and also fall back to defaults.
    pub fn load(path: &Path) -> Self {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!("No settings file at {}, using defaults", path.display());
                return Self::default();
            }
            Err(e) => {
                tracing::warn!("Failed to read {}: {}", path.display(), e);
                return Self::default();
            }
        };

        match toml::from_str(&content) {
            Ok(settings) => settings,
            Err(e) => {
                tracing::warn!("Invalid settings file {}: {}", path.display(), e);
                Self::default()
            }
        }
    }

    /// Merge all layers for one game.
    ///
    /// Order: `defaults`, `systems.<system>`, `games.<system>.<rom file>`;
    /// CLI overrides are forced so none of the layers can replace them.
    pub fn session_values(&self, system: &str, rom: &Path, overrides: &Overrides) -> ConfigMap {
        let mut map = ConfigMap::new();

        if let Some(emulator) = &overrides.emulator {
            map.force(KEY_EMULATOR, emulator.as_str());
        }
        if let Some(core) = &overrides.core {
            map.force(KEY_CORE, core.as_str());
        }
        for (key, value) in &overrides.extra {
            map.force(key.as_str(), value.as_str());
        }

        map.merge_toml(&self.defaults);
        if let Some(table) = self.systems.get(system) {
            map.merge_toml(table);
        }
        if let Some(file_name) = rom.file_name().and_then(|n| n.to_str())
            && let Some(table) = self.games.get(system).and_then(|games| games.get(file_name))
        {
            map.merge_toml(table);
        }

        map
    }
}
