//! emulatorlauncher - runs one game session and exits with the emulator's code
//!
//! # Usage
//!
//! ```bash
//! emulatorlauncher -system switch -rom /userdata/roms/switch/Zelda.xci
//! emulatorlauncher -system switch -rom game.squashfs -emulator ryujinx \
//!     -p1guid 030000005e0400008e02000010010000 -p1devicepath /dev/input/event3
//! ```
//!
//! `SIGINT`/`SIGTERM` stop the emulator; the session still restores the
//! display mode and unmounts the archive before exiting.

mod cli;

use std::panic::{self, AssertUnwindSafe};
use std::time::Duration;

use anyhow::{Context, Result};

use emulauncher_backends::builtin_registry;
use emulauncher_core::{LauncherSettings, Services, Session, signals};

use crate::cli::Cli;

/// Exit code when the session could not run the emulator.
const EARLY_FAILURE: i32 = -1;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse_legacy();
    let settings_path = LauncherSettings::resolve_path(cli.config.as_deref());
    let settings = LauncherSettings::load(&settings_path);

    let code = exit_code_of(|| run(&cli, &settings));
    tracing::info!("Exiting with code {}", code);

    if settings.exit_delay_ms > 0 {
        std::thread::sleep(Duration::from_millis(settings.exit_delay_ms));
    }
    std::process::exit(code);
}

/// Exit code of a session attempt; errors and panics both give `-1`.
fn exit_code_of<F>(attempt: F) -> i32
where
    F: FnOnce() -> Result<i32>,
{
    match panic::catch_unwind(AssertUnwindSafe(attempt)) {
        Ok(Ok(code)) => code,
        Ok(Err(e)) => {
            tracing::error!("{:#}", e);
            EARLY_FAILURE
        }
        Err(_) => {
            tracing::error!("Launcher panicked");
            EARLY_FAILURE
        }
    }
}

fn run(cli: &Cli, settings: &LauncherSettings) -> Result<i32> {
    let registry = builtin_registry();
    let mut session = Session::new(settings, &registry, Services::from_settings(settings));

    // No thread exists yet: every later thread inherits the blocked mask.
    signals::install_interrupt_forwarder(session.child_handle())
        .context("failed to install the interrupt forwarder")?;

    let request = cli.session_request();
    let code = session.run(&request)?;
    Ok(code)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_code_of_session_result() {
        assert_eq!(exit_code_of(|| Ok(3)), 3);
        assert_eq!(exit_code_of(|| Ok(-15)), -15);
        assert_eq!(exit_code_of(|| Err(anyhow::anyhow!("no backend"))), EARLY_FAILURE);
    }

    #[test]
    fn test_exit_code_of_panic() {
        assert_eq!(exit_code_of(|| panic!("emulator table corrupted")), EARLY_FAILURE);
    }
}
