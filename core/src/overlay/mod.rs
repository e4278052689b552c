//! Bezel (overlay) compatibility engine
//!
//! Decides whether the configured bezel can frame the game at the session
//! resolution and, if it can, produces the image the HUD renderer should
//! draw behind the game. Every failure here degrades to "no bezel"; nothing
//! in this module aborts a session.
//!
//! Steps:
//! 1. skip when no bezel is requested or the emulator draws its own
//! 2. look the asset up in the decoration packs
//! 3. size from the `.info` metadata, else from the image header
//! 4. ratio and border gates ([`fit::check_fit`])
//! 5. resize to the game resolution when needed
//! 6. tattoo when requested

mod fit;
mod image_ops;
mod lookup;

pub use fit::{BezelGeometry, FitRejection, check_fit};
pub use image_ops::{ImageCrateOps, ImageOps, TattooCorner, TattooSpec};
pub use lookup::{DecorationLookup, OverlayAsset, OverlayInfo, OverlayLookup};

use std::path::{Path, PathBuf};

use crate::backend::Backend;
use crate::config::{KEY_TATTOO_CORNER, KEY_TATTOO_FILE, SessionConfig};
use crate::types::Resolution;

/// File name of the resized bezel in the overlay directory.
pub const RESIZED_BEZEL: &str = "bezel.png";
/// File name of the tattooed bezel in the overlay directory.
pub const TATTOOED_BEZEL: &str = "bezel_tattooed.png";

/// Collaborators and output location used to compute a session bezel.
pub struct OverlayEngine<'a> {
    pub lookup: &'a dyn OverlayLookup,
    pub images: &'a dyn ImageOps,
    /// Transient directory for generated images
    pub overlay_dir: &'a Path,
}

impl OverlayEngine<'_> {
    /// Compute the bezel image for a session, or `None` when no bezel applies.
    pub fn compute(
        &self,
        config: &SessionConfig,
        rom: &Path,
        system: &str,
        resolution: Resolution,
        backend: &dyn Backend,
    ) -> Option<PathBuf> {
        let name = config.bezel.as_deref()?;
        tracing::debug!("HUD enabled, trying to apply the bezel {}", name);

        if backend.supports_internal_bezels() {
            tracing::debug!("Skipping bezels for emulator {}", backend.name());
            return None;
        }

        let Some(asset) = self.lookup.lookup(rom, name, system) else {
            tracing::debug!("No bezel found for {}", rom.display());
            return None;
        };

        let info = asset
            .info
            .as_deref()
            .map(OverlayInfo::load)
            .unwrap_or_default();

        let (width, height) = match info.size() {
            Some(size) => {
                tracing::debug!("Bezel size read from its info file");
                size
            }
            None => match self.images.dimensions(&asset.image) {
                Ok(size) => {
                    tracing::debug!("Bezel size read from {}", asset.image.display());
                    size
                }
                Err(e) => {
                    tracing::warn!("{}", e);
                    return None;
                }
            },
        };

        let geometry = BezelGeometry {
            width,
            height,
            top: info.top,
            bottom: info.bottom,
            left: info.left,
            right: info.right,
        };
        let in_game = backend.in_game_ratio(config, resolution, rom);
        if let Err(rejection) = check_fit(resolution, &geometry, in_game) {
            tracing::debug!("Bezel rejected: {}", rejection);
            return None;
        }

        let mut image = asset.image;
        if (width, height) != (resolution.width, resolution.height) {
            tracing::debug!("Bezel needs to be resized to {}", resolution);
            let output = self.overlay_dir.join(RESIZED_BEZEL);
            if let Err(e) = self
                .images
                .resize(&image, &output, resolution.width, resolution.height)
            {
                tracing::error!("Failed to resize the bezel: {}", e);
                return None;
            }
            image = output;
        }

        if let Some(mode) = config.tattoo.as_deref() {
            image = self.apply_tattoo(config, system, mode, image);
        }

        tracing::debug!("Applying bezel {}", image.display());
        Some(image)
    }

    /// Stamp the bezel; on failure the untouched image is kept.
    fn apply_tattoo(
        &self,
        config: &SessionConfig,
        system: &str,
        mode: &str,
        image: PathBuf,
    ) -> PathBuf {
        let stamp = if mode == "custom" {
            config
                .get_str(KEY_TATTOO_FILE)
                .filter(|file| !file.is_empty())
                .map(PathBuf::from)
        } else {
            self.lookup.controller_image(system)
        };
        let Some(stamp) = stamp else {
            tracing::warn!("No tattoo image available for '{}'", mode);
            return image;
        };

        let spec = TattooSpec {
            image: stamp,
            corner: config
                .get_str(KEY_TATTOO_CORNER)
                .map(|corner| TattooCorner::parse(&corner))
                .unwrap_or_default(),
        };
        let output = self.overlay_dir.join(TATTOOED_BEZEL);
        match self.images.tattoo(&image, &output, &spec) {
            Ok(()) => output,
            Err(e) => {
                tracing::warn!("Failed to tattoo the bezel: {}", e);
                image
            }
        }
    }
}
