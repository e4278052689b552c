//! Built-in emulator backends
//!
//! [`builtin_registry`] returns the table the launcher resolves emulator
//! names against.

pub mod common;
pub mod ryujinx;
pub mod yuzu;

use emulauncher_core::{Backend, BackendRegistry};

pub use ryujinx::RyujinxBackend;
pub use yuzu::YuzuBackend;

/// yuzu forks: registry name and default binary.
const YUZU_FAMILY: [(&str, &str); 6] = [
    ("eden", "eden.AppImage"),
    ("citron", "citron.AppImage"),
    ("sudachi", "sudachi.AppImage"),
    ("yuzu", "yuzu.AppImage"),
    ("yuzu-ea", "yuzuEA.AppImage"),
    ("yuzu-early-access", "yuzuEA.AppImage"),
];

/// Ryujinx builds: registry name and default binary.
const RYUJINX_FAMILY: [(&str, &str); 3] = [
    ("ryujinx", "ryujinx.AppImage"),
    ("ryujinx-avalonia", "ryujinx-avalonia.AppImage"),
    ("ryujinx-greem", "ryujinx-greem.AppImage"),
];

/// Registry with every built-in backend.
pub fn builtin_registry() -> BackendRegistry {
    let mut registry = BackendRegistry::new();
    for (name, binary) in YUZU_FAMILY {
        registry.register(name, move || -> Box<dyn Backend> {
            Box::new(YuzuBackend::new(name, binary))
        });
    }
    for (name, binary) in RYUJINX_FAMILY {
        registry.register(name, move || -> Box<dyn Backend> {
            Box::new(RyujinxBackend::new(name, binary))
        });
    }
    registry
}
