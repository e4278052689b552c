//! Command line of the `emulatorlauncher` binary
//!
//! Frontends call the launcher with single-dash long flags
//! (`-system switch -rom ... -p1guid ...`). They are rewritten to `--` form
//! before clap sees them. The per-player flags are generated at runtime for
//! players 1 to [`MAX_PLAYERS`].

use std::ffi::OsString;
use std::path::PathBuf;

use clap::{Arg, ArgMatches, Command, CommandFactory, FromArgMatches, Parser, value_parser};

use emulauncher_core::{Controller, GameInfo, Overrides, SessionRequest};

/// Number of player slots accepted on the command line.
pub const MAX_PLAYERS: u8 = 8;

#[derive(Parser, Debug)]
#[command(name = "emulatorlauncher")]
#[command(version, about = "Launches a single emulated game session")]
pub struct Cli {
    /// System identifier (e.g. "switch")
    #[arg(long)]
    pub system: String,

    /// Game file or .squashfs archive
    #[arg(long)]
    pub rom: PathBuf,

    /// Emulator backend, overrides every settings layer
    #[arg(long)]
    pub emulator: Option<String>,

    /// Emulator core, overrides every settings layer
    #[arg(long)]
    pub core: Option<String>,

    // === Netplay ===
    #[arg(long)]
    pub netplaymode: Option<String>,

    #[arg(long)]
    pub netplaypass: Option<String>,

    #[arg(long)]
    pub netplayip: Option<String>,

    #[arg(long)]
    pub netplayport: Option<String>,

    // === Save states ===
    #[arg(long = "state_slot")]
    pub state_slot: Option<String>,

    #[arg(long)]
    pub autosave: Option<String>,

    /// System name shown in the HUD
    #[arg(long)]
    pub systemname: Option<String>,

    /// Game descriptor with name and thumbnail
    #[arg(long, value_name = "FILE", default_value = "/dev/null")]
    pub gameinfoxml: PathBuf,

    /// Settings file (defaults to $EMULAUNCHER_CONFIG, then the system path)
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Filled from the generated `--p<N>*` flags
    #[arg(skip)]
    pub controllers: Vec<Controller>,
}

/// One per-player flag, `--p<N><suffix>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PlayerField {
    Index,
    Guid,
    Name,
    DevicePath,
    Buttons,
    Hats,
    Axes,
}

impl PlayerField {
    const ALL: [PlayerField; 7] = [
        PlayerField::Index,
        PlayerField::Guid,
        PlayerField::Name,
        PlayerField::DevicePath,
        PlayerField::Buttons,
        PlayerField::Hats,
        PlayerField::Axes,
    ];

    fn suffix(self) -> &'static str {
        match self {
            PlayerField::Index => "index",
            PlayerField::Guid => "guid",
            PlayerField::Name => "name",
            PlayerField::DevicePath => "devicepath",
            PlayerField::Buttons => "nbbuttons",
            PlayerField::Hats => "nbhats",
            PlayerField::Axes => "nbaxes",
        }
    }

    fn id(self, player: u8) -> String {
        format!("p{}{}", player, self.suffix())
    }

    fn arg(self, player: u8) -> Arg {
        let id = self.id(player);
        let arg = Arg::new(id.clone()).long(id).hide(true);
        match self {
            PlayerField::Index => arg
                .value_parser(value_parser!(i32))
                .allow_negative_numbers(true),
            PlayerField::Buttons | PlayerField::Hats | PlayerField::Axes => {
                arg.value_parser(value_parser!(u32))
            }
            PlayerField::Guid | PlayerField::Name | PlayerField::DevicePath => {
                arg.allow_hyphen_values(true)
            }
        }
    }
}

impl Cli {
    /// The derived command plus the per-player flags.
    pub fn full_command() -> Command {
        let mut command = Self::command();
        for player in 1..=MAX_PLAYERS {
            for field in PlayerField::ALL {
                command = command.arg(field.arg(player));
            }
        }
        command
    }

    /// Parse a raw argument list (program name first), legacy flags included.
    pub fn try_parse_legacy<I, T>(args: I) -> Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString>,
    {
        let matches = Self::full_command().try_get_matches_from(normalize_legacy_flags(args))?;
        let mut cli = Self::from_arg_matches(&matches)?;
        cli.controllers = controllers_from(&matches);
        Ok(cli)
    }

    /// Parse the process arguments, exiting with usage on error.
    pub fn parse_legacy() -> Self {
        Self::try_parse_legacy(std::env::args_os()).unwrap_or_else(|e| e.exit())
    }

    /// Values pinned over every settings layer.
    pub fn overrides(&self) -> Overrides {
        let pinned = [
            ("netplay.mode", &self.netplaymode),
            ("netplay.password", &self.netplaypass),
            ("netplay.host", &self.netplayip),
            ("netplay.port", &self.netplayport),
            ("state_slot", &self.state_slot),
            ("autosave", &self.autosave),
        ];
        Overrides {
            emulator: self.emulator.clone(),
            core: self.core.clone(),
            extra: pinned
                .into_iter()
                .filter_map(|(key, value)| value.as_ref().map(|v| (key.to_string(), v.clone())))
                .collect(),
        }
    }

    /// Build the session request; reads the game descriptor.
    pub fn session_request(&self) -> SessionRequest {
        SessionRequest {
            system: self.system.clone(),
            system_label: self.systemname.clone(),
            rom: self.rom.clone(),
            controllers: self.controllers.clone(),
            game_info: GameInfo::load(&self.gameinfoxml),
            overrides: self.overrides(),
        }
    }
}

/// Long flags that take no value.
const SWITCHES: [&str; 2] = ["help", "version"];

/// Rewrite `-flag` into `--flag`.
///
/// Single-character flags (`-h`, `-V`), already long flags and negative
/// numbers are kept. The token after a value-taking flag is its value and is
/// never rewritten, so `-p1name -Pad-` keeps the name. The program name is
/// never touched.
pub fn normalize_legacy_flags<I, T>(args: I) -> Vec<OsString>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString>,
{
    let mut args = args.into_iter().map(Into::into);
    let mut normalized: Vec<OsString> = args.next().into_iter().collect();
    let mut value_expected = false;
    for arg in args {
        if std::mem::take(&mut value_expected) {
            normalized.push(arg);
            continue;
        }
        let Some(name) = arg.to_str().and_then(|text| text.strip_prefix('-')) else {
            normalized.push(arg);
            continue;
        };
        let long = name.strip_prefix('-').unwrap_or(name);
        let is_legacy = !name.starts_with('-') && name.len() > 1 && name.parse::<f64>().is_err();
        if is_legacy || long.len() != name.len() {
            value_expected = !long.contains('=') && !SWITCHES.contains(&long);
        }
        if is_legacy {
            normalized.push(OsString::from(format!("--{}", name)));
        } else {
            normalized.push(arg);
        }
    }
    normalized
}

/// Controllers for every player slot that has at least one value.
fn controllers_from(matches: &ArgMatches) -> Vec<Controller> {
    let text = |field: PlayerField, player: u8| matches.get_one::<String>(&field.id(player)).cloned();
    let count = |field: PlayerField, player: u8| matches.get_one::<u32>(&field.id(player)).copied();

    (1..=MAX_PLAYERS)
        .filter_map(|player| {
            let controller = Controller {
                player,
                index: matches
                    .get_one::<i32>(&PlayerField::Index.id(player))
                    .copied(),
                guid: text(PlayerField::Guid, player),
                name: text(PlayerField::Name, player),
                device_path: text(PlayerField::DevicePath, player),
                buttons: count(PlayerField::Buttons, player),
                hats: count(PlayerField::Hats, player),
                axes: count(PlayerField::Axes, player),
            };
            let empty = Controller {
                player,
                ..Default::default()
            };
            (controller != empty).then_some(controller)
        })
        .collect()
}
