//! Bezel asset lookup in the decorations directories

use std::path::{Path, PathBuf};

use serde::Deserialize;

/// A bezel image and its metadata file, if any.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverlayAsset {
    pub image: PathBuf,
    pub info: Option<PathBuf>,
}

/// Bezel metadata (`.info` JSON next to the image).
#[derive(Debug, Clone, Copy, PartialEq, Default, Deserialize)]
#[serde(default)]
pub struct OverlayInfo {
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub top: Option<f64>,
    pub bottom: Option<f64>,
    pub left: Option<f64>,
    pub right: Option<f64>,
}

impl OverlayInfo {
    /// Read a metadata file.
    ///
    /// Unreadable or malformed files are logged and give empty metadata.
    pub fn load(path: &Path) -> Self {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) => {
                tracing::warn!("Failed to read bezel info {}: {}", path.display(), e);
                return Self::default();
            }
        };
        match serde_json::from_str(&content) {
            Ok(info) => info,
            Err(e) => {
                tracing::warn!("Invalid bezel info {}: {}", path.display(), e);
                Self::default()
            }
        }
    }

    /// Size declared by the metadata, when both axes are present.
    pub fn size(&self) -> Option<(u32, u32)> {
        Some((self.width?, self.height?))
    }
}

/// Finds the bezel to use for a game.
pub trait OverlayLookup: Send {
    fn lookup(&self, rom: &Path, name: &str, system: &str) -> Option<OverlayAsset>;

    /// Stamp image used for `bezel.tattoo = system`.
    fn controller_image(&self, _system: &str) -> Option<PathBuf> {
        None
    }
}

/// Searches decoration packs on disk, first root wins.
#[derive(Debug, Clone, Default)]
pub struct DecorationLookup {
    roots: Vec<PathBuf>,
}

impl DecorationLookup {
    pub fn new(roots: Vec<PathBuf>) -> Self {
        Self { roots }
    }

    fn candidates(&self, rom: &Path, name: &str, system: &str) -> Vec<PathBuf> {
        let stem = rom
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();

        let mut paths = Vec::new();
        for root in &self.roots {
            let pack = root.join(name);
            if !stem.is_empty() {
                paths.push(pack.join("games").join(system).join(format!("{}.png", stem)));
                paths.push(pack.join("games").join(format!("{}.png", stem)));
            }
            paths.push(pack.join("systems").join(format!("{}.png", system)));
            paths.push(pack.join("default.png"));
        }
        paths
    }
}

impl OverlayLookup for DecorationLookup {
    fn lookup(&self, rom: &Path, name: &str, system: &str) -> Option<OverlayAsset> {
        let image = self
            .candidates(rom, name, system)
            .into_iter()
            .find(|path| path.is_file())?;
        let info = image.with_extension("info");
        tracing::debug!("Bezel image found: {}", image.display());

        Some(OverlayAsset {
            info: info.is_file().then_some(info),
            image,
        })
    }

    fn controller_image(&self, system: &str) -> Option<PathBuf> {
        self.roots
            .iter()
            .map(|root| root.join("controllers").join(format!("{}.png", system)))
            .find(|path| path.is_file())
    }
}
