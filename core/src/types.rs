//! Plain data shared by the session components and the backends.

use std::fmt;
use std::path::PathBuf;

use hashbrown::HashMap;
use serde::Serialize;

/// Display resolution in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl Resolution {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Swap the axes (some boards report them transposed).
    pub fn transposed(self) -> Self {
        Self {
            width: self.height,
            height: self.width,
        }
    }

    /// Parse the `WIDTHxHEIGHT` form printed by the resolution tool.
    pub fn parse(text: &str) -> Option<Self> {
        let (w, h) = text.trim().split_once('x')?;
        Some(Self {
            width: w.trim().parse().ok()?,
            height: h.trim().parse().ok()?,
        })
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Exact aspect ratio `num:den`.
///
/// Kept rational so the overlay fit checks give the same answer for the same
/// inputs on every run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AspectRatio {
    pub num: u32,
    pub den: u32,
}

impl AspectRatio {
    pub const FOUR_THREE: AspectRatio = AspectRatio { num: 4, den: 3 };
    pub const SIXTEEN_NINE: AspectRatio = AspectRatio { num: 16, den: 9 };

    pub const fn new(num: u32, den: u32) -> Self {
        Self { num, den }
    }

    /// Width of an image of the given height at this ratio.
    pub fn width_for_height(self, height: f64) -> f64 {
        height * f64::from(self.num) / f64::from(self.den)
    }
}

/// A controller assigned to a player slot.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct Controller {
    /// Player number, starting at 1
    pub player: u8,
    pub index: Option<i32>,
    pub guid: Option<String>,
    pub name: Option<String>,
    pub device_path: Option<String>,
    pub buttons: Option<u32>,
    pub hats: Option<u32>,
    pub axes: Option<u32>,
}

/// Command line, environment and working directory for the emulator process.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LaunchCommand {
    pub args: Vec<String>,
    pub env: HashMap<String, String>,
    pub cwd: Option<PathBuf>,
}

impl LaunchCommand {
    pub fn new<I, S>(args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            args: args.into_iter().map(Into::into).collect(),
            env: HashMap::new(),
            cwd: None,
        }
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    /// Insert a wrapper program in front of the emulator binary.
    pub fn prepend(&mut self, program: impl Into<String>) {
        self.args.insert(0, program.into());
    }

    pub fn is_empty(&self) -> bool {
        self.args.is_empty()
    }

    pub fn program(&self) -> Option<&str> {
        self.args.first().map(String::as_str)
    }
}
