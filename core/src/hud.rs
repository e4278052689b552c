//! HUD renderer configuration (mangohud)
//!
//! The renderer reads a `key=value` text file. Built-in layouts are `perf`
//! and `game`; `custom` takes the user's text with literal `\n` sequences
//! turned into line breaks.

use std::path::{Path, PathBuf};

use crate::config::SessionConfig;

/// Environment variable telling the renderer to hook `dlsym`.
pub const ENV_DLSYM: &str = "MANGOHUD_DLSYM";
/// Environment variable pointing the renderer at its config file.
pub const ENV_CONFIG_FILE: &str = "MANGOHUD_CONFIGFILE";

const PERF_LAYOUT: &str = "position=bottom-left\nbackground_alpha=0.9\nlegacy_layout=false\ncustom_text=%GAMENAME%\ncustom_text=%SYSTEMNAME%\ncustom_text=%EMULATORCORE%\nfps\ngpu_name\nengine_version\nvulkan_driver\nresolution\nram\ngpu_stats\ngpu_temp\ncpu_stats\ncpu_temp\ncore_load";

const GAME_LAYOUT: &str = "position=bottom-left\nbackground_alpha=0\nlegacy_layout=false\nfont_size=32\nimage_max_width=200\nimage=%THUMBNAIL%\ncustom_text=%GAMENAME%\ncustom_text=%SYSTEMNAME%\ncustom_text=%EMULATORCORE%";

const HIDE_BACKGROUND: &str = "background_alpha=0\n";

/// Game name and thumbnail from the frontend's game-info XML.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GameInfo {
    pub name: String,
    pub thumbnail: String,
}

impl GameInfo {
    /// Read `<root><game><name/><thumbnail/></game></root>`.
    ///
    /// A missing file, bad XML or missing nodes give empty strings.
    pub fn load(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(text) => Self::parse(&text),
            Err(e) => {
                tracing::debug!("No game info at {}: {}", path.display(), e);
                Self::default()
            }
        }
    }

    pub fn parse(text: &str) -> Self {
        let doc = match roxmltree::Document::parse(text) {
            Ok(doc) => doc,
            Err(e) => {
                tracing::debug!("Unable to parse game info: {}", e);
                return Self::default();
            }
        };

        let Some(game) = doc
            .root_element()
            .children()
            .find(|n| n.has_tag_name("game"))
        else {
            return Self::default();
        };

        let text_of = |tag: &str| {
            game.children()
                .find(|n| n.has_tag_name(tag))
                .and_then(|n| n.text())
                .map(|t| t.trim().to_string())
                .unwrap_or_default()
        };

        Self {
            name: text_of("name"),
            thumbnail: text_of("thumbnail"),
        }
    }
}

/// Inputs for [`render_hud_config`].
#[derive(Debug, Clone, Copy)]
pub struct HudContext<'a> {
    /// Display name of the system, falls back to the system id
    pub system_name: &'a str,
    pub emulator: &'a str,
    pub core: &'a str,
    pub game: &'a GameInfo,
    pub bezel: Option<&'a Path>,
}

impl HudContext<'_> {
    /// `emulator`, or `emulator/core` when the core is a different name.
    fn emulator_label(&self) -> String {
        if self.core.is_empty() || self.core == self.emulator {
            self.emulator.to_string()
        } else {
            format!("{}/{}", self.emulator, self.core)
        }
    }
}

/// Build the renderer config text for a session.
pub fn render_hud_config(config: &SessionConfig, ctx: &HudContext<'_>) -> String {
    let mut text = String::new();
    if let Some(bezel) = ctx.bezel {
        text.push_str(&format!(
            "background_image={}\nlegacy_layout=false\n",
            bezel.display()
        ));
    }

    let Some(mode) = config.hud.as_deref() else {
        text.push_str(HIDE_BACKGROUND);
        return text;
    };

    match mode {
        "perf" => text.push_str(PERF_LAYOUT),
        "game" => text.push_str(GAME_LAYOUT),
        "custom" if config.hud_custom.as_deref().is_some_and(|c| !c.is_empty()) => {
            let custom = config.hud_custom.as_deref().unwrap_or_default();
            text.push_str(&custom.replace("\\n", "\n"));
        }
        _ => text.push_str(HIDE_BACKGROUND),
    }

    text.replace("%SYSTEMNAME%", ctx.system_name)
        .replace("%GAMENAME%", &ctx.game.name)
        .replace("%EMULATORCORE%", &ctx.emulator_label())
        .replace("%THUMBNAIL%", &ctx.game.thumbnail)
}

/// Write the config file, creating its directory if needed.
pub fn write_hud_config(path: &Path, text: &str) -> std::io::Result<PathBuf> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, text)?;
    Ok(path.to_path_buf())
}
