//! Bezel fit checks
//!
//! A bezel is only usable when its shape matches the screen and its opaque
//! borders do not eat into the game image. All comparisons are written as
//! multiplications so exact boundary values behave the same on every run.

use std::fmt;

use crate::types::{AspectRatio, Resolution};

/// Maximum distance between screen and bezel aspect ratios, as `1 / N`.
const MAX_RATIO_DELTA_INV: u64 = 100;
/// Maximum part of the reference dimension a border may cover, as `1 / N`.
const MAX_COVER_INV: f64 = 20.0;

/// Bezel size and optional border insets, in bezel pixels.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct BezelGeometry {
    pub width: u32,
    pub height: u32,
    pub top: Option<f64>,
    pub bottom: Option<f64>,
    pub left: Option<f64>,
    pub right: Option<f64>,
}

/// Why a bezel was rejected.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FitRejection {
    EmptyDimensions,
    RatioMismatch { screen: f64, bezel: f64 },
    TopCover(f64),
    BottomCover(f64),
    LeftCover(f64),
    RightCover(f64),
}

impl fmt::Display for FitRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FitRejection::EmptyDimensions => write!(f, "screen or bezel has a zero dimension"),
            FitRejection::RatioMismatch { screen, bezel } => write!(
                f,
                "screen ratio ({:.4}) is too far from the bezel one ({:.4})",
                screen, bezel
            ),
            FitRejection::TopCover(v) => write!(f, "bezel top covers too much the game image ({})", v),
            FitRejection::BottomCover(v) => {
                write!(f, "bezel bottom covers too much the game image ({})", v)
            }
            FitRejection::LeftCover(v) => write!(f, "bezel left covers too much the game image ({})", v),
            FitRejection::RightCover(v) => {
                write!(f, "bezel right covers too much the game image ({})", v)
            }
        }
    }
}

/// `part / whole > 1 / MAX_COVER_INV`
fn covers_too_much(part: f64, whole: f64) -> bool {
    part.abs() * MAX_COVER_INV > whole
}

/// Decide whether `bezel` fits a screen of `screen` showing a game at
/// `in_game` aspect ratio.
pub fn check_fit(
    screen: Resolution,
    bezel: &BezelGeometry,
    in_game: AspectRatio,
) -> Result<(), FitRejection> {
    if screen.width == 0 || screen.height == 0 || bezel.width == 0 || bezel.height == 0 {
        return Err(FitRejection::EmptyDimensions);
    }

    // |sw/sh - bw/bh| > 1/100  <=>  |sw*bh - bw*sh| * 100 > sh*bh
    let cross = (u64::from(screen.width) * u64::from(bezel.height))
        .abs_diff(u64::from(bezel.width) * u64::from(screen.height));
    if cross * MAX_RATIO_DELTA_INV > u64::from(screen.height) * u64::from(bezel.height) {
        return Err(FitRejection::RatioMismatch {
            screen: f64::from(screen.width) / f64::from(screen.height),
            bezel: f64::from(bezel.width) / f64::from(bezel.height),
        });
    }

    let bezel_width = f64::from(bezel.width);
    let bezel_height = f64::from(bezel.height);

    if let Some(top) = bezel.top
        && covers_too_much(top, bezel_height)
    {
        return Err(FitRejection::TopCover(top));
    }
    if let Some(bottom) = bezel.bottom
        && covers_too_much(bottom, bezel_height)
    {
        return Err(FitRejection::BottomCover(bottom));
    }

    // Without insets, assume a 4:3 window centered in the bezel
    let image_width = in_game.width_for_height(bezel_height);
    let expected_inset = (bezel_width - image_width) / 2.0;
    let default_inset = (bezel_width - AspectRatio::FOUR_THREE.width_for_height(bezel_height)) / 2.0;

    let left = bezel.left.unwrap_or(default_inset);
    if covers_too_much(left - expected_inset, image_width) {
        return Err(FitRejection::LeftCover(left - expected_inset));
    }
    let right = bezel.right.unwrap_or(default_inset);
    if covers_too_much(right - expected_inset, image_width) {
        return Err(FitRejection::RightCover(right - expected_inset));
    }

    Ok(())
}
