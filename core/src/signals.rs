//! Interrupt forwarding to the emulator
//!
//! `SIGINT` and `SIGTERM` are blocked in the calling thread before any other
//! thread exists, so every thread inherits the mask and only the forwarder
//! receives them (through `sigwait`). Spawned children start with an empty
//! mask again.

use std::thread::{self, JoinHandle};

use nix::sys::signal::{SigSet, Signal};

use crate::supervisor::ChildHandle;

/// Signals that stop the running emulator.
pub const INTERRUPT_SIGNALS: [Signal; 2] = [Signal::SIGINT, Signal::SIGTERM];

/// Block the interrupt signals in the current thread.
///
/// Must run in `main` before any thread is spawned.
pub fn block_interrupts() -> nix::Result<SigSet> {
    let mut set = SigSet::empty();
    for signal in INTERRUPT_SIGNALS {
        set.add(signal);
    }
    set.thread_block()?;
    Ok(set)
}

/// Wait for blocked interrupts and stop the child on each one.
pub fn spawn_interrupt_forwarder(
    set: SigSet,
    handle: ChildHandle,
) -> std::io::Result<JoinHandle<()>> {
    thread::Builder::new()
        .name("interrupt-forwarder".to_string())
        .spawn(move || {
            loop {
                match set.wait() {
                    Ok(signal) => {
                        tracing::info!("Received {:?}, stopping the emulator", signal);
                        handle.terminate();
                    }
                    Err(e) => {
                        tracing::error!("Waiting for signals failed: {}", e);
                        break;
                    }
                }
            }
        })
}

/// Block the interrupts and start the forwarder for `handle`.
pub fn install_interrupt_forwarder(handle: ChildHandle) -> std::io::Result<JoinHandle<()>> {
    let set = block_interrupts().map_err(std::io::Error::from)?;
    spawn_interrupt_forwarder(set, handle)
}
