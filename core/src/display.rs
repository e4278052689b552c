//! Display mode negotiation and restoration
//!
//! [`DisplayModeController`] remembers the mode that was active before the
//! session and puts it back once, only if the session changed it.

use crate::error::{LaunchError, Result};
use crate::tool::run_tool;
use crate::types::Resolution;

/// Mode name meaning "keep whatever is active".
pub const DEFAULT_MODE: &str = "default";

/// Display driver operations used by the launcher.
pub trait DisplayDriver: Send {
    fn current_mode(&mut self) -> Result<String>;
    fn current_resolution(&mut self) -> Result<Resolution>;
    fn set_mode(&mut self, mode: &str) -> Result<()>;
    /// Switch to the maximum mode the display supports.
    fn set_max_mode(&mut self) -> Result<()>;
}

/// Console resolution utility (`batocera-resolution`).
#[derive(Debug, Clone)]
pub struct ResolutionTool {
    program: String,
}

impl ResolutionTool {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    fn query(&self, action: &'static str, args: &[&str]) -> Result<String> {
        let out = run_tool(&self.program, args).map_err(|e| LaunchError::DisplayFailed {
            action,
            reason: e.to_string(),
        })?;
        if !out.success() {
            return Err(LaunchError::DisplayFailed {
                action,
                reason: out.failure_reason(),
            });
        }
        Ok(out.stdout.trim().to_string())
    }
}

impl DisplayDriver for ResolutionTool {
    fn current_mode(&mut self) -> Result<String> {
        self.query("query", &["currentMode"])
    }

    fn current_resolution(&mut self) -> Result<Resolution> {
        let text = self.query("query", &["currentResolution"])?;
        Resolution::parse(&text).ok_or_else(|| LaunchError::DisplayFailed {
            action: "query",
            reason: format!("unexpected resolution '{}'", text),
        })
    }

    fn set_mode(&mut self, mode: &str) -> Result<()> {
        self.query("switch", &["setMode", mode]).map(drop)
    }

    fn set_max_mode(&mut self) -> Result<()> {
        self.query("switch", &["minTomaxResolution"]).map(drop)
    }
}

/// Negotiates the session display mode and restores the original one.
pub struct DisplayModeController {
    driver: Box<dyn DisplayDriver>,
    original_mode: Option<String>,
    changed: bool,
}

impl DisplayModeController {
    pub fn new(driver: Box<dyn DisplayDriver>) -> Self {
        Self {
            driver,
            original_mode: None,
            changed: false,
        }
    }

    /// Mode that was active before [`negotiate`](Self::negotiate), if read.
    pub fn original_mode(&self) -> Option<&str> {
        self.original_mode.as_deref()
    }

    /// True while a change is pending restoration.
    pub fn changed(&self) -> bool {
        self.changed
    }

    /// Apply the session display mode and return the game resolution.
    ///
    /// `requested_mode` is the configured `videomode`; empty or `default`
    /// first raises the display to its maximum mode. A `preferred_mode` other
    /// than `default` is then applied if it differs from the active mode.
    /// Changes made before an error stay recorded, so [`restore`](Self::restore)
    /// still undoes them.
    pub fn negotiate(
        &mut self,
        requested_mode: &str,
        preferred_mode: &str,
        reversed: bool,
    ) -> Result<Resolution> {
        let original = self.driver.current_mode()?;
        self.original_mode = Some(original.clone());

        let mut active = original.clone();
        if requested_mode.is_empty() || requested_mode == DEFAULT_MODE {
            tracing::debug!("Video mode before max mode: {}", original);
            self.driver.set_max_mode()?;
            active = self.driver.current_mode()?;
            if active != original {
                self.changed = true;
            }
        }

        tracing::debug!("Current video mode: {}", active);
        tracing::debug!("Wanted video mode: {}", preferred_mode);

        if preferred_mode != DEFAULT_MODE && preferred_mode != active {
            // Mark first: a failed switch may still have touched the display
            self.changed = true;
            self.driver.set_mode(preferred_mode)?;
        }

        let mut resolution = self.driver.current_resolution()?;
        if reversed {
            resolution = resolution.transposed();
        }
        tracing::debug!("Game resolution: {}", resolution);
        Ok(resolution)
    }

    /// Switch back to the original mode if the session changed it.
    ///
    /// Failures are logged and swallowed; calling this again is a no-op.
    pub fn restore(&mut self) {
        if !self.changed {
            return;
        }
        self.changed = false;

        let Some(mode) = self.original_mode.clone() else {
            return;
        };
        tracing::debug!("Restoring video mode {}", mode);
        if let Err(e) = self.driver.set_mode(&mode) {
            let error = LaunchError::ResolutionRestoreFailed {
                mode,
                reason: e.to_string(),
            };
            tracing::warn!("{}", error);
        }
    }
}

impl Drop for DisplayModeController {
    fn drop(&mut self) {
        self.restore();
    }
}
