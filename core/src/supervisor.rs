//! Emulator process supervision
//!
//! [`ProcessSupervisor::run`] spawns the launch command, drains its output
//! and waits for it. The running child lives in a [`ChildHandle`] shared with
//! the interrupt forwarder: reaping and killing happen under the same lock,
//! so a kill never reaches a pid that was already reaped.
//!
//! On unix the child leads its own process group and a kill reaches the
//! whole group, so wrapper scripts and AppImage runtimes go down with the
//! processes they forked.

use std::io::{ErrorKind, Read};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crate::error::{LaunchError, Result};
use crate::types::LaunchCommand;

/// Exit code reported when no process could be run or waited for.
pub const NO_EXIT_CODE: i32 = -1;

const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// How long output is still collected once the child has exited.
const DRAIN_GRACE: Duration = Duration::from_secs(2);

#[derive(Default)]
struct ChildSlot {
    child: Mutex<Option<Child>>,
    killed: AtomicBool,
}

/// Shared handle to the running emulator, if any.
#[derive(Clone, Default)]
pub struct ChildHandle {
    slot: Arc<ChildSlot>,
}

impl ChildHandle {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Option<Child>> {
        self.slot
            .child
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn is_running(&self) -> bool {
        self.lock().is_some()
    }

    /// Kill the running child.
    ///
    /// Only the first call of a run sends the kill; returns whether it did.
    /// Does nothing when no child is running.
    pub fn terminate(&self) -> bool {
        let mut guard = self.lock();
        let Some(child) = guard.as_mut() else {
            tracing::debug!("No emulator running, nothing to stop");
            return false;
        };
        if self.slot.killed.swap(true, Ordering::SeqCst) {
            return false;
        }
        tracing::info!("Stopping emulator (pid {})", child.id());
        kill_tree(child);
        true
    }

    fn install(&self, child: Child) {
        let mut guard = self.lock();
        self.slot.killed.store(false, Ordering::SeqCst);
        *guard = Some(child);
    }

    /// Reap the child if it exited; the slot is emptied once reaped.
    fn poll(&self) -> std::io::Result<Option<ExitStatus>> {
        let mut guard = self.lock();
        let Some(child) = guard.as_mut() else {
            return Ok(None);
        };
        match child.try_wait() {
            Ok(Some(status)) => {
                *guard = None;
                Ok(Some(status))
            }
            Ok(None) => Ok(None),
            Err(e) => {
                *guard = None;
                Err(e)
            }
        }
    }
}

/// Kill the child's process group, or the child alone if that fails.
#[cfg(unix)]
fn kill_tree(child: &mut Child) {
    use nix::sys::signal::{Signal, killpg};
    use nix::unistd::Pid;

    let Ok(pid) = i32::try_from(child.id()) else {
        kill_child(child);
        return;
    };
    if let Err(e) = killpg(Pid::from_raw(pid), Signal::SIGKILL) {
        tracing::warn!("Failed to kill process group {}: {}", pid, e);
        kill_child(child);
    }
}

#[cfg(not(unix))]
fn kill_tree(child: &mut Child) {
    kill_child(child);
}

fn kill_child(child: &mut Child) {
    if let Err(e) = child.kill() {
        tracing::warn!("Failed to kill pid {}: {}", child.id(), e);
    }
}

/// Convert an exit status, reporting signal deaths as `-signal`.
pub fn exit_code(status: ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return -signal;
        }
    }
    NO_EXIT_CODE
}

fn drain<R: Read + Send + 'static>(mut stream: R, name: &'static str) -> JoinHandle<String> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        match stream.read_to_end(&mut buf) {
            Ok(_) => {}
            Err(e) if e.kind() == ErrorKind::BrokenPipe => {}
            Err(e) => tracing::warn!("Failed to read emulator {}: {}", name, e),
        }
        String::from_utf8_lossy(&buf).into_owned()
    })
}

/// Collect a drained stream, giving up at `deadline`.
///
/// A process that outlived the child may keep the pipe open forever; its
/// drain thread is then left behind.
fn joined(handle: Option<JoinHandle<String>>, name: &str, deadline: Instant) -> String {
    let Some(handle) = handle else {
        return String::new();
    };
    while !handle.is_finished() {
        if Instant::now() >= deadline {
            tracing::warn!("Emulator {} still open after exit, not waiting for it", name);
            return String::new();
        }
        thread::sleep(POLL_INTERVAL);
    }
    handle.join().unwrap_or_default()
}

/// Runs launch commands one at a time.
#[derive(Clone, Default)]
pub struct ProcessSupervisor {
    handle: ChildHandle,
}

impl ProcessSupervisor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle used to stop the running child from another thread.
    pub fn handle(&self) -> ChildHandle {
        self.handle.clone()
    }

    /// Run `command` to completion and return its exit code.
    ///
    /// The process environment is the launcher's own, overlaid with the
    /// command's. An empty command runs nothing and returns `-1`.
    pub fn run(&self, command: &LaunchCommand) -> Result<i32> {
        let Some((program, args)) = command.args.split_first() else {
            tracing::warn!("Empty launch command, nothing to run");
            return Ok(NO_EXIT_CODE);
        };

        let mut cmd = Command::new(program);
        cmd.args(args)
            .envs(&command.env)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(dir) = &command.cwd {
            cmd.current_dir(dir);
        }
        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            cmd.process_group(0);
        }

        tracing::debug!("command: {:?}", command.args);
        tracing::debug!("env: {:?}", command.env);

        let mut child = cmd.spawn().map_err(|source| LaunchError::ChildLaunchFailed {
            program: program.clone(),
            source,
        })?;
        tracing::info!("Started {} (pid {})", program, child.id());

        let stdout = child.stdout.take().map(|s| drain(s, "stdout"));
        let stderr = child.stderr.take().map(|s| drain(s, "stderr"));
        self.handle.install(child);

        let code = loop {
            match self.handle.poll() {
                Ok(Some(status)) => break exit_code(status),
                Ok(None) => thread::sleep(POLL_INTERVAL),
                Err(e) => {
                    tracing::error!("Failed to wait for {}: {}", program, e);
                    break NO_EXIT_CODE;
                }
            }
        };

        let deadline = Instant::now() + DRAIN_GRACE;
        let out = joined(stdout, "stdout", deadline);
        let err = joined(stderr, "stderr", deadline);
        if !out.is_empty() {
            tracing::debug!("{}", out);
        }
        if !err.is_empty() {
            tracing::error!("{}", err);
        }

        tracing::info!("{} exited with code {}", program, code);
        Ok(code)
    }
}
