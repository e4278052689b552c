//! emulauncher core - single game session lifecycle
//!
//! This crate owns everything between "the frontend asked for a game" and
//! "the console is back in its previous state": configuration merging,
//! backend dispatch, archive mounting, display mode negotiation, bezel and
//! HUD preparation, process supervision and teardown.
//!
//! # Architecture
//!
//! - [`Backend`] - Per-emulator strategy producing a [`LaunchCommand`]
//! - [`BackendRegistry`] - Name to backend constructor table
//! - [`ArchiveMounter`] - `.squashfs` mount/unmount with [`MountHandle`]
//! - [`DisplayModeController`] - Negotiates and restores the display mode
//! - [`OverlayEngine`] - Bezel compatibility checks and image preparation
//! - [`ProcessSupervisor`] - Runs the emulator, [`ChildHandle`] stops it
//! - [`Session`] - Orchestrates all of the above

pub mod backend;
pub mod config;
pub mod display;
pub mod error;
pub mod hooks;
pub mod host;
pub mod hud;
pub mod input;
pub mod mount;
pub mod overlay;
pub mod registry;
pub mod session;
pub mod settings;
pub mod signals;
pub mod supervisor;
#[cfg(test)]
pub mod test_utils;
pub mod tool;
pub mod types;

pub use backend::{Backend, LaunchContext};
pub use config::{ConfigMap, ConfigValue, SessionConfig};
pub use display::{DisplayDriver, DisplayModeController, ResolutionTool};
pub use error::{LaunchError, Result};
pub use hud::GameInfo;
pub use input::{Evmapy, InputMapper, InputSession, NoInputMapper};
pub use mount::{ArchiveMounter, MountHandle, MountTool, SystemMountTool};
pub use overlay::{DecorationLookup, ImageCrateOps, ImageOps, OverlayEngine, OverlayLookup};
pub use registry::BackendRegistry;
pub use session::{Outcome, Services, Session, SessionRequest, SessionState};
pub use settings::{LauncherSettings, Overrides};
pub use supervisor::{ChildHandle, ProcessSupervisor};
pub use types::{AspectRatio, Controller, LaunchCommand, Resolution};
