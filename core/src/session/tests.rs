#![cfg(unix)]

use super::*;
use crate::config::{KEY_BEZEL, KEY_EMULATOR, KEY_HUD, KEY_HUD_SUPPORT};
use crate::test_utils::{
    FakeBackend, FakeDisplay, FakeImageOps, FakeInputMapper, FakeMountTool, FakeOverlayLookup,
    Journal,
};
use std::os::unix::fs::PermissionsExt;
use tempfile::TempDir;

const HD: Resolution = Resolution::new(1920, 1080);

struct Harness {
    dir: TempDir,
    settings: LauncherSettings,
    display: FakeDisplay,
    mount_tool: Arc<FakeMountTool>,
    input: FakeInputMapper,
    lookup: FakeOverlayLookup,
    images: FakeImageOps,
}

impl Harness {
    fn new() -> Self {
        Self::with_mount_tool(FakeMountTool::with_entries(&["Game"]))
    }

    fn with_mount_tool(mount_tool: FakeMountTool) -> Self {
        let dir = TempDir::new().unwrap();
        let root = dir.path();

        let mut settings = LauncherSettings::default();
        settings.paths.mount_root = root.join("squashfs");
        settings.paths.saves_dir = root.join("saves");
        settings.paths.hud_config = root.join("run/hud.config");
        settings.paths.overlay_dir = root.join("overlays");
        settings.paths.system_hooks = root.join("hooks/system");
        settings.paths.user_hooks = root.join("hooks/user");
        settings.paths.decorations = Vec::new();
        settings.paths.executable_dirs = Vec::new();
        settings.paths.input_mapper_state = root.join("evmapy");
        settings.tools.pointer = None;
        // Stands in for the HUD renderer: runs the rest of the command line
        settings.tools.hud_renderer = "env".to_string();
        settings
            .defaults
            .insert(KEY_EMULATOR.to_string(), toml::Value::String("fake".to_string()));

        Self {
            dir,
            settings,
            display: FakeDisplay::new("1920x1080@60", HD),
            mount_tool: Arc::new(mount_tool),
            input: FakeInputMapper::new(),
            lookup: FakeOverlayLookup::none(),
            images: FakeImageOps::new(),
        }
    }

    fn set(&mut self, key: &str, value: &str) {
        self.settings
            .defaults
            .insert(key.to_string(), toml::Value::String(value.to_string()));
    }

    fn path(&self, rel: &str) -> PathBuf {
        self.dir.path().join(rel)
    }

    fn services(&self) -> Services {
        Services {
            display: Box::new(self.display.clone()),
            mount_tool: self.mount_tool.clone(),
            input_mapper: Box::new(self.input.clone()),
            overlays: Box::new(self.lookup.clone()),
            images: Box::new(self.images.clone()),
        }
    }

    /// Log every hook call as `<root> <event>` into `hooks.log`.
    fn install_hooks(&self) {
        let log = self.path("hooks.log");
        let roots = [
            (&self.settings.paths.system_hooks, "system"),
            (&self.settings.paths.user_hooks, "user"),
        ];
        for (root, tag) in roots {
            std::fs::create_dir_all(root).unwrap();
            let script = root.join("log.sh");
            std::fs::write(
                &script,
                format!("#!/bin/sh\necho \"{} $1 $5\" >> {}\n", tag, log.display()),
            )
            .unwrap();
            std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();
        }
    }

    fn hook_log(&self) -> Vec<String> {
        std::fs::read_to_string(self.path("hooks.log"))
            .unwrap_or_default()
            .lines()
            .map(String::from)
            .collect()
    }
}

fn registry_with(backend: &FakeBackend) -> BackendRegistry {
    let mut registry = BackendRegistry::new();
    let backend = backend.clone();
    registry.register("fake", move || -> Box<dyn Backend> { Box::new(backend.clone()) });
    registry
}

fn request(rom: impl Into<PathBuf>) -> SessionRequest {
    SessionRequest {
        system: "switch".to_string(),
        rom: rom.into(),
        ..Default::default()
    }
}

#[test]
fn test_plain_rom_default_resolution_no_overlay() {
    let h = Harness::new();
    let backend = FakeBackend::new("fake").with_exit_code(3);
    let registry = registry_with(&backend);
    let mut session = Session::new(&h.settings, &registry, h.services());

    let code = session.run(&request("/roms/switch/Game.xci")).unwrap();

    assert_eq!(code, 3);
    assert!(h.display.set_mode_calls().is_empty());
    assert_eq!(h.display.mode(), "1920x1080@60");
    assert_eq!(
        backend.generated(),
        vec![(PathBuf::from("/roms/switch/Game.xci"), HD)]
    );
    assert_eq!(h.mount_tool.mounts(), 0);
    assert_eq!(h.lookup.lookups(), 0);
    assert!(!h.settings.paths.hud_config.exists());
    assert!(h.path("saves/switch").is_dir());
    assert_eq!(
        session.history(),
        &[
            SessionState::Init,
            SessionState::ResolutionNegotiated,
            SessionState::PreHooksRun,
            SessionState::InputMappingStarted,
            SessionState::CommandBuilt,
            SessionState::ChildRunning,
            SessionState::PostHooksRun,
            SessionState::TornDown(Outcome::Success),
        ]
    );
    assert_eq!(session.state(), SessionState::TornDown(Outcome::Success));
}

#[test]
fn test_single_file_archive_uses_inner_rom_and_cleans_up() {
    let h = Harness::new();
    let backend = FakeBackend::new("fake");
    let registry = registry_with(&backend);
    let mut session = Session::new(&h.settings, &registry, h.services());

    let code = session.run(&request("/roms/switch/Game.squashfs")).unwrap();

    assert_eq!(code, 0);
    assert_eq!(backend.generated()[0].0, h.path("squashfs/Game/Game"));
    assert!(!h.path("squashfs/Game").exists());
    assert_eq!(h.mount_tool.mounts(), 1);
    assert_eq!(h.mount_tool.unmounts(), 1);
    assert_eq!(session.history()[1], SessionState::ArchiveMounted);
}

#[test]
fn test_mismatched_bezel_is_dropped() {
    let mut h = Harness::new();
    h.set(KEY_HUD_SUPPORT, "1");
    h.set(KEY_BEZEL, "thebezelproject");
    h.lookup = FakeOverlayLookup::with_image(h.path("deco/bezel.png"));
    // 1942/1080 vs 1920/1080: 0.02 apart
    h.images = FakeImageOps::new().with_size(1942, 1080);
    let backend = FakeBackend::new("fake");
    let registry = registry_with(&backend);
    let mut session = Session::new(&h.settings, &registry, h.services());

    let code = session.run(&request("/roms/switch/Game.xci")).unwrap();

    assert_eq!(code, 0);
    assert_eq!(h.lookup.lookups(), 1);
    assert!(h.images.resizes().is_empty());
    assert!(!h.settings.paths.hud_config.exists());
    assert_eq!(session.state(), SessionState::TornDown(Outcome::Success));
}

#[test]
fn test_unknown_backend_has_no_side_effects() {
    let mut h = Harness::new();
    h.set(KEY_EMULATOR, "mame");
    h.install_hooks();
    let backend = FakeBackend::new("fake");
    let registry = registry_with(&backend);
    let mut session = Session::new(&h.settings, &registry, h.services());

    let err = session.run(&request("/roms/switch/Game.squashfs")).unwrap_err();

    assert!(matches!(err, LaunchError::UnknownBackend { ref name, .. } if name == "mame"));
    assert_eq!(h.mount_tool.mounts(), 0);
    assert!(!h.path("squashfs").exists());
    assert_eq!(h.display.max_mode_calls(), 0);
    assert!(h.display.set_mode_calls().is_empty());
    assert!(h.input.starts().is_empty());
    assert!(h.hook_log().is_empty());
    assert!(backend.generated().is_empty());
    assert_eq!(
        session.history(),
        &[SessionState::Init, SessionState::TornDown(Outcome::Failure)]
    );
}

#[test]
fn test_missing_emulator() {
    let mut h = Harness::new();
    h.settings.defaults.remove(KEY_EMULATOR);
    let registry = registry_with(&FakeBackend::new("fake"));
    let mut session = Session::new(&h.settings, &registry, h.services());

    assert!(matches!(
        session.run(&request("/roms/switch/Game.xci")),
        Err(LaunchError::MissingEmulator)
    ));
}

#[test]
fn test_cli_emulator_override_is_forced() {
    let mut h = Harness::new();
    h.set(KEY_EMULATOR, "mame");
    let backend = FakeBackend::new("fake").with_exit_code(5);
    let registry = registry_with(&backend);
    let mut session = Session::new(&h.settings, &registry, h.services());

    let mut req = request("/roms/switch/Game.xci");
    req.overrides.emulator = Some("fake".to_string());
    assert_eq!(session.run(&req).unwrap(), 5);
}

#[test]
fn test_teardown_runs_in_reverse_order() {
    let journal = Journal::new();
    let tool = FakeMountTool::with_entries(&["Game"]).with_journal(journal.clone());
    let mut h = Harness::with_mount_tool(tool);
    h.display = FakeDisplay::new("1920x1080@60", HD).with_journal(journal.clone());
    h.input = FakeInputMapper::new().with_journal(journal.clone());
    let backend = FakeBackend::new("fake").with_preferred_mode("1280x720@60");
    let registry = registry_with(&backend);
    let mut session = Session::new(&h.settings, &registry, h.services());

    session.run(&request("/roms/switch/Game.squashfs")).unwrap();

    assert_eq!(
        journal.entries(),
        vec![
            "mount",
            "set_max_mode",
            "set_mode 1280x720@60",
            "input start",
            "input stop",
            "set_mode 1920x1080@60",
            "unmount",
        ]
    );
    assert_eq!(backend.generated()[0].1, Resolution::new(1280, 720));
}

#[test]
fn test_launch_failure_still_tears_down() {
    let h = Harness::new();
    h.install_hooks();
    let backend = FakeBackend::new("fake")
        .with_preferred_mode("1280x720@60")
        .with_command(["/nonexistent/emulator-4242"]);
    let registry = registry_with(&backend);
    let mut session = Session::new(&h.settings, &registry, h.services());

    let err = session.run(&request("/roms/switch/Game.squashfs")).unwrap_err();

    assert!(matches!(err, LaunchError::ChildLaunchFailed { .. }));
    assert_eq!(h.input.stops(), 1);
    assert_eq!(h.display.mode(), "1920x1080@60");
    assert!(!h.path("squashfs/Game").exists());
    // Post hooks only run when the emulator ran
    let rom = h.path("squashfs/Game/Game");
    assert_eq!(
        h.hook_log(),
        vec![
            format!("system gameStart {}", rom.display()),
            format!("user gameStart {}", rom.display()),
        ]
    );
    assert_eq!(session.state(), SessionState::TornDown(Outcome::Failure));
}

#[test]
fn test_hooks_wrap_the_run() {
    let h = Harness::new();
    h.install_hooks();
    let registry = registry_with(&FakeBackend::new("fake"));
    let mut session = Session::new(&h.settings, &registry, h.services());

    session.run(&request("/roms/switch/Game.xci")).unwrap();

    assert_eq!(
        h.hook_log(),
        vec![
            "system gameStart /roms/switch/Game.xci",
            "user gameStart /roms/switch/Game.xci",
            "user gameStop /roms/switch/Game.xci",
            "system gameStop /roms/switch/Game.xci",
        ]
    );
}

#[test]
fn test_generate_failure_stops_input_mapper() {
    let h = Harness::new();
    let registry = registry_with(&FakeBackend::new("fake").failing_generate());
    let mut session = Session::new(&h.settings, &registry, h.services());

    assert!(session.run(&request("/roms/switch/Game.xci")).is_err());
    assert_eq!(h.input.starts(), vec!["fake".to_string()]);
    assert_eq!(h.input.stops(), 1);
    assert!(!session.history().contains(&SessionState::ChildRunning));
}

#[test]
fn test_unmount_failure_after_success_is_reported() {
    let h = Harness::with_mount_tool(FakeMountTool::failing_unmount(&["Game"]));
    let registry = registry_with(&FakeBackend::new("fake"));
    let mut session = Session::new(&h.settings, &registry, h.services());

    assert!(matches!(
        session.run(&request("/roms/switch/Game.squashfs")),
        Err(LaunchError::UnmountFailed { .. })
    ));
    assert_eq!(session.state(), SessionState::TornDown(Outcome::Failure));
}

#[test]
fn test_primary_error_wins_over_unmount_failure() {
    let h = Harness::with_mount_tool(FakeMountTool::failing_unmount(&["Game"]));
    let backend = FakeBackend::new("fake").with_command(["/nonexistent/emulator-4242"]);
    let registry = registry_with(&backend);
    let mut session = Session::new(&h.settings, &registry, h.services());

    assert!(matches!(
        session.run(&request("/roms/switch/Game.squashfs")),
        Err(LaunchError::ChildLaunchFailed { .. })
    ));
}

#[test]
fn test_display_failure_aborts_after_unmount() {
    let h = Harness::new();
    h.display.fail_set_mode(true);
    let backend = FakeBackend::new("fake").with_preferred_mode("1280x720@60");
    let registry = registry_with(&backend);
    let mut session = Session::new(&h.settings, &registry, h.services());

    assert!(matches!(
        session.run(&request("/roms/switch/Game.squashfs")),
        Err(LaunchError::DisplayFailed { .. })
    ));
    assert!(h.input.starts().is_empty());
    assert_eq!(h.mount_tool.unmounts(), 1);
    assert!(backend.generated().is_empty());
}

#[test]
fn test_input_mapper_start_failure_is_not_fatal() {
    let mut h = Harness::new();
    h.input = FakeInputMapper::new().failing_start();
    let registry = registry_with(&FakeBackend::new("fake").with_exit_code(2));
    let mut session = Session::new(&h.settings, &registry, h.services());

    assert_eq!(session.run(&request("/roms/switch/Game.xci")).unwrap(), 2);
    assert_eq!(h.input.stops(), 1);
}

#[test]
fn test_hud_with_bezel_configures_renderer() {
    let mut h = Harness::new();
    h.set(KEY_HUD_SUPPORT, "true");
    h.set(KEY_BEZEL, "thebezelproject");
    h.lookup = FakeOverlayLookup::with_image("/deco/bezel.png");
    h.images = FakeImageOps::new().with_size(1920, 1080);
    let backend = FakeBackend::new("fake").with_command([
        "sh",
        "-c",
        "test \"$MANGOHUD_DLSYM\" = 1 && test -f \"$MANGOHUD_CONFIGFILE\"",
    ]);
    let registry = registry_with(&backend);
    let mut session = Session::new(&h.settings, &registry, h.services());

    assert_eq!(session.run(&request("/roms/switch/Game.xci")).unwrap(), 0);
    assert_eq!(
        std::fs::read_to_string(&h.settings.paths.hud_config).unwrap(),
        "background_image=/deco/bezel.png\nlegacy_layout=false\nbackground_alpha=0\n"
    );
}

#[test]
fn test_hud_layout_without_bezel() {
    let mut h = Harness::new();
    h.set(KEY_HUD_SUPPORT, "1");
    h.set(KEY_HUD, "game");
    let registry = registry_with(&FakeBackend::new("fake").with_internal_hud());
    let mut session = Session::new(&h.settings, &registry, h.services());

    let mut req = request("/roms/switch/Game.xci");
    req.system_label = Some("Nintendo Switch".to_string());
    req.game_info = GameInfo {
        name: "Zelda".to_string(),
        thumbnail: "/t.png".to_string(),
    };
    assert_eq!(session.run(&req).unwrap(), 0);

    let text = std::fs::read_to_string(&h.settings.paths.hud_config).unwrap();
    assert!(text.contains("image=/t.png\ncustom_text=Zelda\ncustom_text=Nintendo Switch\ncustom_text=fake"));
    assert!(!text.contains("background_image"));
}

#[test]
fn test_execution_directory_applied() {
    let h = Harness::new();
    let workdir = h.path("emu");
    std::fs::create_dir_all(&workdir).unwrap();
    let expected = workdir.canonicalize().unwrap();
    let backend = FakeBackend::new("fake")
        .with_execution_dir(&workdir)
        .with_command([
            "sh".to_string(),
            "-c".to_string(),
            format!("test \"$(pwd -P)\" = \"{}\"", expected.display()),
        ]);
    let registry = registry_with(&backend);
    let mut session = Session::new(&h.settings, &registry, h.services());

    assert_eq!(session.run(&request("/roms/switch/Game.xci")).unwrap(), 0);
}

#[test]
fn test_reversed_resolution_reaches_backend() {
    let mut h = Harness::new();
    h.set("resolutionIsReversed", "1");
    h.display = FakeDisplay::new("480x854", Resolution::new(480, 854));
    let backend = FakeBackend::new("fake");
    let registry = registry_with(&backend);
    let mut session = Session::new(&h.settings, &registry, h.services());

    session.run(&request("/roms/switch/Game.xci")).unwrap();
    assert_eq!(backend.generated()[0].1, Resolution::new(854, 480));
}
