//! Bezel image primitives backed by the `image` crate

use std::path::{Path, PathBuf};

use image::imageops::{self, FilterType};

use crate::error::{LaunchError, Result};

/// Stamp width relative to the bezel width, as `num / den`.
const TATTOO_WIDTH: (u32, u32) = (225, 1920);
/// Stamp margin relative to the bezel height, as `num / den`.
const TATTOO_MARGIN: (u32, u32) = (20, 1080);

/// Bezel corner receiving the tattoo stamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TattooCorner {
    #[default]
    NorthWest,
    NorthEast,
    SouthWest,
    SouthEast,
}

impl TattooCorner {
    /// Parse `NW`, `NE`, `SW` or `SE` (case-insensitive); anything else is `NW`.
    pub fn parse(text: &str) -> Self {
        match text.trim().to_ascii_uppercase().as_str() {
            "NE" => TattooCorner::NorthEast,
            "SW" => TattooCorner::SouthWest,
            "SE" => TattooCorner::SouthEast,
            _ => TattooCorner::NorthWest,
        }
    }
}

/// What to stamp and where.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TattooSpec {
    pub image: PathBuf,
    pub corner: TattooCorner,
}

/// Image operations used by the overlay engine.
pub trait ImageOps: Send {
    /// Pixel size read from the image header.
    fn dimensions(&self, path: &Path) -> Result<(u32, u32)>;

    /// Resize `src` to exactly `width`x`height`, written to `dst`.
    fn resize(&self, src: &Path, dst: &Path, width: u32, height: u32) -> Result<()>;

    /// Composite the tattoo stamp onto `src`, written to `dst`.
    fn tattoo(&self, src: &Path, dst: &Path, spec: &TattooSpec) -> Result<()>;
}

/// [`ImageOps`] implemented with the `image` crate.
#[derive(Debug, Clone, Copy, Default)]
pub struct ImageCrateOps;

fn image_error(path: &Path, e: image::ImageError) -> LaunchError {
    LaunchError::OverlayComputationFailed(format!("{}: {}", path.display(), e))
}

/// Top-left position of a `stamp` sized box in `corner` of a `base` sized image.
fn stamp_origin(base: (u32, u32), stamp: (u32, u32), corner: TattooCorner) -> (i64, i64) {
    let margin = i64::from(base.1 * TATTOO_MARGIN.0 / TATTOO_MARGIN.1);
    let right = i64::from(base.0) - i64::from(stamp.0) - margin;
    let bottom = i64::from(base.1) - i64::from(stamp.1) - margin;
    match corner {
        TattooCorner::NorthWest => (margin, margin),
        TattooCorner::NorthEast => (right, margin),
        TattooCorner::SouthWest => (margin, bottom),
        TattooCorner::SouthEast => (right, bottom),
    }
}

impl ImageOps for ImageCrateOps {
    fn dimensions(&self, path: &Path) -> Result<(u32, u32)> {
        image::image_dimensions(path).map_err(|e| image_error(path, e))
    }

    fn resize(&self, src: &Path, dst: &Path, width: u32, height: u32) -> Result<()> {
        let img = image::open(src).map_err(|e| image_error(src, e))?;
        img.resize_exact(width, height, FilterType::Lanczos3)
            .save(dst)
            .map_err(|e| image_error(dst, e))
    }

    fn tattoo(&self, src: &Path, dst: &Path, spec: &TattooSpec) -> Result<()> {
        let mut base = image::open(src).map_err(|e| image_error(src, e))?.to_rgba8();
        let stamp = image::open(&spec.image)
            .map_err(|e| image_error(&spec.image, e))?
            .to_rgba8();
        if stamp.width() == 0 || stamp.height() == 0 {
            return Err(LaunchError::OverlayComputationFailed(format!(
                "{}: empty tattoo image",
                spec.image.display()
            )));
        }

        let width = (base.width() * TATTOO_WIDTH.0 / TATTOO_WIDTH.1).max(1);
        let height = (u64::from(stamp.height()) * u64::from(width) / u64::from(stamp.width()))
            .max(1) as u32;
        let stamp = imageops::resize(&stamp, width, height, FilterType::Lanczos3);

        let (x, y) = stamp_origin(base.dimensions(), (width, height), spec.corner);
        imageops::overlay(&mut base, &stamp, x, y);
        base.save(dst).map_err(|e| image_error(dst, e))
    }
}
