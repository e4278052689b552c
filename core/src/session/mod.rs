//! Session orchestration
//!
//! One [`Session`] runs one game: it resolves the configuration and backend,
//! acquires the archive mount and display mode, runs the emulator, then
//! releases everything it acquired in reverse order whatever the outcome.
//!
//! ```text
//! Init -> ArchiveMounted? -> ResolutionNegotiated -> PreHooksRun
//!      -> InputMappingStarted -> CommandBuilt -> ChildRunning
//!      -> PostHooksRun -> TornDown(Success | Failure)
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::backend::{Backend, LaunchContext};
use crate::config::SessionConfig;
use crate::display::{DisplayDriver, DisplayModeController, ResolutionTool};
use crate::error::{LaunchError, Result};
use crate::hooks::{HookArgs, HookEvent, HookRunner};
use crate::host;
use crate::hud::{self, GameInfo, HudContext};
use crate::input::{Evmapy, InputMapper, InputSession};
use crate::mount::{ArchiveMounter, MountHandle, MountTool, SystemMountTool, is_archive};
use crate::overlay::{DecorationLookup, ImageCrateOps, ImageOps, OverlayEngine, OverlayLookup};
use crate::registry::BackendRegistry;
use crate::settings::{LauncherSettings, Overrides};
use crate::supervisor::{ChildHandle, ProcessSupervisor};
use crate::types::{Controller, LaunchCommand, Resolution};

#[cfg(test)]
mod tests;

/// How a session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Success,
    Failure,
}

/// Lifecycle position of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Init,
    ArchiveMounted,
    ResolutionNegotiated,
    PreHooksRun,
    InputMappingStarted,
    CommandBuilt,
    ChildRunning,
    PostHooksRun,
    TornDown(Outcome),
}

/// What to launch.
#[derive(Debug, Clone, Default)]
pub struct SessionRequest {
    pub system: String,
    /// Display name of the system for the HUD
    pub system_label: Option<String>,
    pub rom: PathBuf,
    pub controllers: Vec<Controller>,
    pub game_info: GameInfo,
    pub overrides: Overrides,
}

/// External collaborators of a session.
pub struct Services {
    pub display: Box<dyn DisplayDriver>,
    pub mount_tool: Arc<dyn MountTool>,
    pub input_mapper: Box<dyn InputMapper>,
    pub overlays: Box<dyn OverlayLookup>,
    pub images: Box<dyn ImageOps>,
}

impl Services {
    /// Host tools as configured in the settings.
    pub fn from_settings(settings: &LauncherSettings) -> Self {
        Self {
            display: Box::new(ResolutionTool::new(&settings.tools.resolution)),
            mount_tool: Arc::new(SystemMountTool {
                mount: settings.tools.mount.clone(),
                umount: settings.tools.umount.clone(),
            }),
            input_mapper: Box::new(Evmapy::new(
                &settings.tools.input_mapper,
                &settings.paths.input_mapper_state,
            )),
            overlays: Box::new(DecorationLookup::new(settings.paths.decorations.clone())),
            images: Box::new(ImageCrateOps),
        }
    }
}

/// Runs a single game session.
pub struct Session<'a> {
    settings: &'a LauncherSettings,
    registry: &'a BackendRegistry,
    display: DisplayModeController,
    mounter: ArchiveMounter,
    input_mapper: Box<dyn InputMapper>,
    overlays: Box<dyn OverlayLookup>,
    images: Box<dyn ImageOps>,
    hooks: HookRunner,
    supervisor: ProcessSupervisor,
    history: Vec<SessionState>,
}

impl<'a> Session<'a> {
    pub fn new(
        settings: &'a LauncherSettings,
        registry: &'a BackendRegistry,
        services: Services,
    ) -> Self {
        Self {
            display: DisplayModeController::new(services.display),
            mounter: ArchiveMounter::new(
                &settings.paths.mount_root,
                services.mount_tool,
                settings.mount.reuse_occupied_mount_point,
            ),
            input_mapper: services.input_mapper,
            overlays: services.overlays,
            images: services.images,
            hooks: HookRunner::new(&settings.paths.system_hooks, &settings.paths.user_hooks),
            supervisor: ProcessSupervisor::new(),
            history: Vec::new(),
            settings,
            registry,
        }
    }

    /// Handle to stop the emulator from another thread (signal forwarding).
    pub fn child_handle(&self) -> ChildHandle {
        self.supervisor.handle()
    }

    /// Current lifecycle state.
    pub fn state(&self) -> SessionState {
        self.history.last().copied().unwrap_or(SessionState::Init)
    }

    /// Every state entered by the last run, in order.
    pub fn history(&self) -> &[SessionState] {
        &self.history
    }

    fn enter(&mut self, state: SessionState) {
        tracing::debug!("Session state: {:?}", state);
        self.history.push(state);
    }

    /// Run the session and return the emulator exit code.
    pub fn run(&mut self, request: &SessionRequest) -> Result<i32> {
        self.history.clear();
        self.enter(SessionState::Init);

        let (config, backend) = match self.resolve(request) {
            Ok(resolved) => resolved,
            Err(e) => {
                self.enter(SessionState::TornDown(Outcome::Failure));
                return Err(e);
            }
        };

        let mut mount = None;
        let result = self.launch(request, &config, backend.as_ref(), &mut mount);
        let result = self.teardown(result, mount);

        let outcome = if result.is_ok() {
            Outcome::Success
        } else {
            Outcome::Failure
        };
        self.enter(SessionState::TornDown(outcome));
        result
    }

    /// Merge the configuration and pick the backend; no side effects.
    fn resolve(&self, request: &SessionRequest) -> Result<(SessionConfig, Box<dyn Backend>)> {
        let values =
            self.settings
                .session_values(&request.system, &request.rom, &request.overrides);
        tracing::debug!("Configuration: {:?}", values.redacted());

        let config = SessionConfig::from_map(values)?;
        let backend = self.registry.resolve(&config.emulator)?;
        tracing::info!(
            "Launching {} with {} (core: {})",
            request.rom.display(),
            config.emulator,
            config.core_or_empty()
        );
        Ok((config, backend))
    }

    fn launch(
        &mut self,
        request: &SessionRequest,
        config: &SessionConfig,
        backend: &dyn Backend,
        mount: &mut Option<MountHandle>,
    ) -> Result<i32> {
        let mut rom = request.rom.clone();
        if is_archive(&request.rom) {
            let handle = self.mounter.begin(&request.rom)?;
            rom = handle.rom.clone();
            *mount = Some(handle);
            self.enter(SessionState::ArchiveMounted);
        }

        self.prepare_host();

        let resolution = self.display.negotiate(
            &config.video_mode,
            &backend.resolution_mode(config),
            config.resolution_is_reversed,
        )?;
        self.enter(SessionState::ResolutionNegotiated);

        let saves_dir = self.settings.paths.saves_dir.join(&request.system);
        std::fs::create_dir_all(&saves_dir)
            .map_err(|e| LaunchError::io(format!("failed to create {}", saves_dir.display()), e))?;

        let hook_args = HookArgs {
            system: &request.system,
            backend: &config.emulator,
            core: config.core_or_empty(),
            rom: &rom,
        };
        self.hooks.run(HookEvent::GameStart, &hook_args);
        self.enter(SessionState::PreHooksRun);

        let input = InputSession {
            system: &request.system,
            emulator: &config.emulator,
            core: config.core_or_empty(),
            rom: &request.rom,
            controllers: &request.controllers,
        };
        if let Err(e) = self.input_mapper.start(&input) {
            tracing::warn!("{}", e);
        }
        self.enter(SessionState::InputMappingStarted);

        let ran = self.build_and_run(request, config, backend, &rom, resolution, &saves_dir);

        if let Err(e) = self.input_mapper.stop() {
            tracing::warn!("{}", e);
        }

        let code = ran?;
        self.hooks.run(HookEvent::GameStop, &hook_args);
        self.enter(SessionState::PostHooksRun);
        Ok(code)
    }

    fn prepare_host(&self) {
        if let Some(pointer) = &self.settings.tools.pointer {
            host::show_pointer(pointer);
        }
        for dir in &self.settings.paths.executable_dirs {
            host::mark_executable(dir);
        }
    }

    fn build_and_run(
        &mut self,
        request: &SessionRequest,
        config: &SessionConfig,
        backend: &dyn Backend,
        rom: &Path,
        resolution: Resolution,
        saves_dir: &Path,
    ) -> Result<i32> {
        let cwd = backend.execution_directory(config, rom);
        let ctx = LaunchContext {
            config,
            system: &request.system,
            rom,
            controllers: &request.controllers,
            resolution,
            saves_dir,
        };
        let mut command = backend.generate(&ctx)?;
        if command.cwd.is_none() {
            command.cwd = cwd;
        }
        if config.hud_support {
            self.apply_hud(request, config, backend, rom, resolution, &mut command);
        }
        self.enter(SessionState::CommandBuilt);

        self.enter(SessionState::ChildRunning);
        self.supervisor.run(&command)
    }

    /// Compute the bezel and wire the HUD renderer into the command.
    fn apply_hud(
        &self,
        request: &SessionRequest,
        config: &SessionConfig,
        backend: &dyn Backend,
        rom: &Path,
        resolution: Resolution,
        command: &mut LaunchCommand,
    ) {
        let engine = OverlayEngine {
            lookup: self.overlays.as_ref(),
            images: self.images.as_ref(),
            overlay_dir: &self.settings.paths.overlay_dir,
        };
        let bezel = engine.compute(config, rom, &request.system, resolution, backend);
        if !config.hud_requested() && bezel.is_none() {
            return;
        }

        let ctx = HudContext {
            system_name: request.system_label.as_deref().unwrap_or(&request.system),
            emulator: &config.emulator,
            core: config.core_or_empty(),
            game: &request.game_info,
            bezel: bezel.as_deref(),
        };
        let text = hud::render_hud_config(config, &ctx);
        let path = &self.settings.paths.hud_config;
        if let Err(e) = hud::write_hud_config(path, &text) {
            tracing::warn!("Failed to write {}: {}", path.display(), e);
            return;
        }

        command
            .env
            .insert(hud::ENV_DLSYM.to_string(), "1".to_string());
        command
            .env
            .insert(hud::ENV_CONFIG_FILE.to_string(), path.display().to_string());
        if !backend.has_internal_hud_call() {
            command.prepend(self.settings.tools.hud_renderer.as_str());
        }
    }

    /// Release what was acquired, display first then the mount.
    fn teardown(&mut self, result: Result<i32>, mount: Option<MountHandle>) -> Result<i32> {
        self.display.restore();

        let Some(handle) = mount else {
            return result;
        };
        match (result, handle.end()) {
            (result, Ok(())) => result,
            (Ok(_), Err(e)) => Err(e),
            (Err(primary), Err(e)) => {
                tracing::error!("{}", e);
                Err(primary)
            }
        }
    }
}
