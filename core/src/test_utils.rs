//! In-memory collaborators for unit tests
//!
//! Every fake is cheap to clone and shares its recorded state between
//! clones, so a test can hand one copy to the session and inspect the other.
//! Fakes that take part in teardown can write into a shared [`Journal`] to
//! check ordering across collaborators.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::backend::{Backend, LaunchContext};
use crate::config::SessionConfig;
use crate::display::DisplayDriver;
use crate::error::{LaunchError, Result};
use crate::input::{InputMapper, InputSession};
use crate::mount::MountTool;
use crate::overlay::{ImageOps, OverlayAsset, OverlayLookup, TattooSpec};
use crate::tool::ToolOutput;
use crate::types::{AspectRatio, LaunchCommand, Resolution};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

// ============================================================================
// Journal
// ============================================================================

/// Ordered record of side effects across fakes.
#[derive(Debug, Clone, Default)]
pub struct Journal {
    entries: Arc<Mutex<Vec<String>>>,
}

impl Journal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, entry: impl Into<String>) {
        lock(&self.entries).push(entry.into());
    }

    pub fn entries(&self) -> Vec<String> {
        lock(&self.entries).clone()
    }
}

fn record(journal: &Option<Journal>, entry: impl Into<String>) {
    if let Some(journal) = journal {
        journal.record(entry);
    }
}

// ============================================================================
// Backend
// ============================================================================

/// Configurable backend; runs `sh -c "exit 0"` unless told otherwise.
#[derive(Debug, Clone)]
pub struct FakeBackend {
    name: String,
    command: Vec<String>,
    preferred_mode: Option<String>,
    execution_dir: Option<PathBuf>,
    internal_bezels: bool,
    internal_hud: bool,
    ratio: AspectRatio,
    fail_generate: bool,
    generated: Arc<Mutex<Vec<(PathBuf, Resolution)>>>,
}

impl FakeBackend {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            command: ["sh", "-c", "exit 0"].map(String::from).to_vec(),
            preferred_mode: None,
            execution_dir: None,
            internal_bezels: false,
            internal_hud: false,
            ratio: AspectRatio::FOUR_THREE,
            fail_generate: false,
            generated: Arc::default(),
        }
    }

    pub fn with_command<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.command = args.into_iter().map(Into::into).collect();
        self
    }

    /// Run a shell that exits with `code`.
    pub fn with_exit_code(self, code: i32) -> Self {
        let script = format!("exit {}", code);
        self.with_command(["sh".to_string(), "-c".to_string(), script])
    }

    pub fn with_preferred_mode(mut self, mode: &str) -> Self {
        self.preferred_mode = Some(mode.to_string());
        self
    }

    pub fn with_execution_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.execution_dir = Some(dir.into());
        self
    }

    pub fn with_internal_bezels(mut self) -> Self {
        self.internal_bezels = true;
        self
    }

    pub fn with_internal_hud(mut self) -> Self {
        self.internal_hud = true;
        self
    }

    pub fn with_ratio(mut self, ratio: AspectRatio) -> Self {
        self.ratio = ratio;
        self
    }

    pub fn failing_generate(mut self) -> Self {
        self.fail_generate = true;
        self
    }

    /// ROM path and resolution of every `generate` call.
    pub fn generated(&self) -> Vec<(PathBuf, Resolution)> {
        lock(&self.generated).clone()
    }
}

impl Backend for FakeBackend {
    fn name(&self) -> &str {
        &self.name
    }

    fn generate(&self, ctx: &LaunchContext<'_>) -> Result<LaunchCommand> {
        lock(&self.generated).push((ctx.rom.to_path_buf(), ctx.resolution));
        if self.fail_generate {
            return Err(LaunchError::io(
                "fake backend",
                std::io::Error::other("generate failed"),
            ));
        }
        Ok(LaunchCommand::new(self.command.clone()))
    }

    fn resolution_mode(&self, config: &SessionConfig) -> String {
        match &self.preferred_mode {
            Some(mode) => mode.clone(),
            None if config.video_mode.is_empty() => "default".to_string(),
            None => config.video_mode.clone(),
        }
    }

    fn execution_directory(&self, _config: &SessionConfig, _rom: &Path) -> Option<PathBuf> {
        self.execution_dir.clone()
    }

    fn supports_internal_bezels(&self) -> bool {
        self.internal_bezels
    }

    fn has_internal_hud_call(&self) -> bool {
        self.internal_hud
    }

    fn in_game_ratio(
        &self,
        _config: &SessionConfig,
        _resolution: Resolution,
        _rom: &Path,
    ) -> AspectRatio {
        self.ratio
    }
}

// ============================================================================
// Mount tool
// ============================================================================

/// Mount tool that fills the mount point with empty files.
#[derive(Debug, Default)]
pub struct FakeMountTool {
    entries: Vec<String>,
    fail_mount: bool,
    fail_unmount: bool,
    mounts: AtomicUsize,
    unmounts: AtomicUsize,
    journal: Option<Journal>,
}

impl FakeMountTool {
    /// Mounting creates one empty file per entry.
    pub fn with_entries(entries: &[&str]) -> Self {
        Self {
            entries: entries.iter().map(|e| e.to_string()).collect(),
            ..Default::default()
        }
    }

    pub fn failing_mount() -> Self {
        Self {
            fail_mount: true,
            ..Default::default()
        }
    }

    pub fn failing_unmount(entries: &[&str]) -> Self {
        Self {
            fail_unmount: true,
            ..Self::with_entries(entries)
        }
    }

    pub fn with_journal(mut self, journal: Journal) -> Self {
        self.journal = Some(journal);
        self
    }

    pub fn mounts(&self) -> usize {
        self.mounts.load(Ordering::SeqCst)
    }

    pub fn unmounts(&self) -> usize {
        self.unmounts.load(Ordering::SeqCst)
    }

    fn output(failed: bool) -> ToolOutput {
        ToolOutput {
            code: if failed { 32 } else { 0 },
            stdout: String::new(),
            stderr: if failed { "fake failure".to_string() } else { String::new() },
        }
    }
}

impl MountTool for FakeMountTool {
    fn mount(&self, _archive: &Path, mount_point: &Path) -> std::io::Result<ToolOutput> {
        record(&self.journal, "mount");
        if self.fail_mount {
            return Ok(Self::output(true));
        }
        for entry in &self.entries {
            std::fs::write(mount_point.join(entry), b"")?;
        }
        self.mounts.fetch_add(1, Ordering::SeqCst);
        Ok(Self::output(false))
    }

    fn unmount(&self, mount_point: &Path) -> std::io::Result<ToolOutput> {
        record(&self.journal, "unmount");
        if self.fail_unmount {
            return Ok(Self::output(true));
        }
        for entry in std::fs::read_dir(mount_point)? {
            let path = entry?.path();
            if path.is_dir() {
                std::fs::remove_dir_all(&path)?;
            } else {
                std::fs::remove_file(&path)?;
            }
        }
        self.unmounts.fetch_add(1, Ordering::SeqCst);
        Ok(Self::output(false))
    }
}

// ============================================================================
// Display
// ============================================================================

#[derive(Debug)]
struct DisplayState {
    mode: String,
    resolution: Resolution,
    max: Option<(String, Resolution)>,
    fail_set_mode: bool,
    set_mode_calls: Vec<String>,
    max_mode_calls: usize,
}

/// Display whose resolution follows `WIDTHxHEIGHT[@rate]` mode names.
#[derive(Debug, Clone)]
pub struct FakeDisplay {
    state: Arc<Mutex<DisplayState>>,
    journal: Option<Journal>,
}

impl FakeDisplay {
    pub fn new(mode: &str, resolution: Resolution) -> Self {
        Self {
            state: Arc::new(Mutex::new(DisplayState {
                mode: mode.to_string(),
                resolution,
                max: None,
                fail_set_mode: false,
                set_mode_calls: Vec::new(),
                max_mode_calls: 0,
            })),
            journal: None,
        }
    }

    /// Mode applied by `set_max_mode`; without one it keeps the current mode.
    pub fn with_max_mode(self, mode: &str, resolution: Resolution) -> Self {
        lock(&self.state).max = Some((mode.to_string(), resolution));
        self
    }

    pub fn with_journal(mut self, journal: Journal) -> Self {
        self.journal = Some(journal);
        self
    }

    pub fn fail_set_mode(&self, fail: bool) {
        lock(&self.state).fail_set_mode = fail;
    }

    /// Every `set_mode` attempt, failed ones included.
    pub fn set_mode_calls(&self) -> Vec<String> {
        lock(&self.state).set_mode_calls.clone()
    }

    pub fn max_mode_calls(&self) -> usize {
        lock(&self.state).max_mode_calls
    }

    pub fn mode(&self) -> String {
        lock(&self.state).mode.clone()
    }
}

impl DisplayDriver for FakeDisplay {
    fn current_mode(&mut self) -> Result<String> {
        Ok(lock(&self.state).mode.clone())
    }

    fn current_resolution(&mut self) -> Result<Resolution> {
        Ok(lock(&self.state).resolution)
    }

    fn set_mode(&mut self, mode: &str) -> Result<()> {
        record(&self.journal, format!("set_mode {}", mode));
        let mut state = lock(&self.state);
        state.set_mode_calls.push(mode.to_string());
        if state.fail_set_mode {
            return Err(LaunchError::DisplayFailed {
                action: "switch",
                reason: "fake failure".to_string(),
            });
        }
        state.mode = mode.to_string();
        let size = mode.split('@').next().unwrap_or(mode);
        if let Some(resolution) = Resolution::parse(size) {
            state.resolution = resolution;
        }
        Ok(())
    }

    fn set_max_mode(&mut self) -> Result<()> {
        record(&self.journal, "set_max_mode");
        let mut state = lock(&self.state);
        state.max_mode_calls += 1;
        if let Some((mode, resolution)) = state.max.clone() {
            state.mode = mode;
            state.resolution = resolution;
        }
        Ok(())
    }
}

// ============================================================================
// Input mapper
// ============================================================================

#[derive(Debug, Default)]
struct InputState {
    started: Vec<String>,
    stops: usize,
}

/// Input mapper recording start/stop calls.
#[derive(Debug, Clone, Default)]
pub struct FakeInputMapper {
    state: Arc<Mutex<InputState>>,
    fail_start: bool,
    journal: Option<Journal>,
}

impl FakeInputMapper {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_start(mut self) -> Self {
        self.fail_start = true;
        self
    }

    pub fn with_journal(mut self, journal: Journal) -> Self {
        self.journal = Some(journal);
        self
    }

    /// Emulator name of every start call.
    pub fn starts(&self) -> Vec<String> {
        lock(&self.state).started.clone()
    }

    pub fn stops(&self) -> usize {
        lock(&self.state).stops
    }
}

impl InputMapper for FakeInputMapper {
    fn start(&mut self, session: &InputSession<'_>) -> Result<()> {
        record(&self.journal, "input start");
        lock(&self.state).started.push(session.emulator.to_string());
        if self.fail_start {
            return Err(LaunchError::InputMapperFailed {
                action: "start",
                reason: "fake failure".to_string(),
            });
        }
        Ok(())
    }

    fn stop(&mut self) -> Result<()> {
        record(&self.journal, "input stop");
        lock(&self.state).stops += 1;
        Ok(())
    }
}

// ============================================================================
// Overlays
// ============================================================================

/// Lookup returning a fixed asset.
#[derive(Debug, Clone, Default)]
pub struct FakeOverlayLookup {
    asset: Option<OverlayAsset>,
    controller: Option<PathBuf>,
    lookups: Arc<AtomicUsize>,
}

impl FakeOverlayLookup {
    /// No bezel is ever found.
    pub fn none() -> Self {
        Self::default()
    }

    pub fn with_image(image: impl Into<PathBuf>) -> Self {
        Self {
            asset: Some(OverlayAsset {
                image: image.into(),
                info: None,
            }),
            ..Default::default()
        }
    }

    pub fn with_info(mut self, info: impl Into<PathBuf>) -> Self {
        if let Some(asset) = self.asset.as_mut() {
            asset.info = Some(info.into());
        }
        self
    }

    pub fn with_controller_image(mut self, image: impl Into<PathBuf>) -> Self {
        self.controller = Some(image.into());
        self
    }

    pub fn lookups(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }
}

impl OverlayLookup for FakeOverlayLookup {
    fn lookup(&self, _rom: &Path, _name: &str, _system: &str) -> Option<OverlayAsset> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        self.asset.clone()
    }

    fn controller_image(&self, _system: &str) -> Option<PathBuf> {
        self.controller.clone()
    }
}

#[derive(Debug, Default)]
struct ImageState {
    resizes: Vec<(u32, u32)>,
    tattoos: Vec<TattooSpec>,
}

/// Image operations that only record what they were asked to do.
#[derive(Debug, Clone, Default)]
pub struct FakeImageOps {
    size: Option<(u32, u32)>,
    fail_resize: bool,
    fail_tattoo: bool,
    state: Arc<Mutex<ImageState>>,
}

impl FakeImageOps {
    pub fn new() -> Self {
        Self::default()
    }

    /// Header size reported for any image.
    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.size = Some((width, height));
        self
    }

    pub fn failing_resize(mut self) -> Self {
        self.fail_resize = true;
        self
    }

    pub fn failing_tattoo(mut self) -> Self {
        self.fail_tattoo = true;
        self
    }

    pub fn resizes(&self) -> Vec<(u32, u32)> {
        lock(&self.state).resizes.clone()
    }

    pub fn tattoos(&self) -> Vec<TattooSpec> {
        lock(&self.state).tattoos.clone()
    }
}

fn fake_image_error(what: &str) -> LaunchError {
    LaunchError::OverlayComputationFailed(format!("fake {} failure", what))
}

impl ImageOps for FakeImageOps {
    fn dimensions(&self, _path: &Path) -> Result<(u32, u32)> {
        self.size.ok_or_else(|| fake_image_error("header"))
    }

    fn resize(&self, _src: &Path, _dst: &Path, width: u32, height: u32) -> Result<()> {
        if self.fail_resize {
            return Err(fake_image_error("resize"));
        }
        lock(&self.state).resizes.push((width, height));
        Ok(())
    }

    fn tattoo(&self, _src: &Path, _dst: &Path, spec: &TattooSpec) -> Result<()> {
        if self.fail_tattoo {
            return Err(fake_image_error("tattoo"));
        }
        lock(&self.state).tattoos.push(spec.clone());
        Ok(())
    }
}
