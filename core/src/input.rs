//! Input mapper service (pad-to-keyboard mapping daemon)

use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::error::{LaunchError, Result};
use crate::tool::run_tool;
use crate::types::Controller;

/// Session description handed to the input mapper.
#[derive(Debug, Clone, Serialize)]
pub struct InputSession<'a> {
    pub system: &'a str,
    pub emulator: &'a str,
    pub core: &'a str,
    pub rom: &'a Path,
    pub controllers: &'a [Controller],
}

/// Starts and stops input mapping around the emulator run.
pub trait InputMapper: Send {
    fn start(&mut self, session: &InputSession<'_>) -> Result<()>;
    fn stop(&mut self) -> Result<()>;
}

/// No input mapping.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoInputMapper;

impl InputMapper for NoInputMapper {
    fn start(&mut self, _session: &InputSession<'_>) -> Result<()> {
        Ok(())
    }

    fn stop(&mut self) -> Result<()> {
        Ok(())
    }
}

/// File the session description is written to, in the state directory.
pub const SESSION_FILE: &str = "session.json";

/// `batocera-evmapy` driven mapper.
#[derive(Debug, Clone)]
pub struct Evmapy {
    program: String,
    state_dir: PathBuf,
}

impl Evmapy {
    pub fn new(program: impl Into<String>, state_dir: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            state_dir: state_dir.into(),
        }
    }

    fn write_session(&self, session: &InputSession<'_>) -> Result<PathBuf> {
        std::fs::create_dir_all(&self.state_dir).map_err(|e| {
            LaunchError::io(format!("failed to create {}", self.state_dir.display()), e)
        })?;
        let path = self.state_dir.join(SESSION_FILE);
        let json = serde_json::to_string_pretty(session).map_err(|e| {
            LaunchError::InputMapperFailed {
                action: "start",
                reason: e.to_string(),
            }
        })?;
        std::fs::write(&path, json)
            .map_err(|e| LaunchError::io(format!("failed to write {}", path.display()), e))?;
        Ok(path)
    }

    fn call(&self, action: &'static str) -> Result<()> {
        let out = run_tool(&self.program, [action]).map_err(|e| {
            LaunchError::InputMapperFailed {
                action,
                reason: e.to_string(),
            }
        })?;
        if !out.success() {
            return Err(LaunchError::InputMapperFailed {
                action,
                reason: out.failure_reason(),
            });
        }
        Ok(())
    }
}

impl InputMapper for Evmapy {
    fn start(&mut self, session: &InputSession<'_>) -> Result<()> {
        let path = self.write_session(session)?;
        tracing::debug!("Input mapper session written to {}", path.display());
        self.call("clear")?;
        self.call("start")
    }

    fn stop(&mut self) -> Result<()> {
        self.call("stop")
    }
}
