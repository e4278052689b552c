//! Session configuration (system defaults, per-game overrides, CLI overrides)
//!
//! Layers are merged into a [`ConfigMap`] and then frozen into a
//! [`SessionConfig`]. Keys the launcher reads are lifted into typed fields;
//! everything else stays reachable through the pass-through accessors so
//! backends can read their own keys.

use std::collections::BTreeMap;
use std::fmt;

use hashbrown::{HashMap, HashSet};

use crate::error::{LaunchError, Result};

pub const KEY_EMULATOR: &str = "emulator";
pub const KEY_CORE: &str = "core";
pub const KEY_VIDEO_MODE: &str = "videomode";
pub const KEY_RESOLUTION_REVERSED: &str = "resolutionIsReversed";
pub const KEY_HUD_SUPPORT: &str = "hud_support";
pub const KEY_HUD: &str = "hud";
pub const KEY_HUD_CUSTOM: &str = "hud_custom";
pub const KEY_BEZEL: &str = "bezel";
pub const KEY_TATTOO: &str = "bezel.tattoo";
pub const KEY_TATTOO_CORNER: &str = "bezel.tattoo_corner";
pub const KEY_TATTOO_FILE: &str = "bezel.tattoo_file";

/// A single configuration value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigValue {
    Str(String),
    Bool(bool),
    Int(i64),
}

impl ConfigValue {
    /// Interpret as a boolean; strings accept the usual spellings.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ConfigValue::Bool(b) => Some(*b),
            ConfigValue::Int(i) => Some(*i != 0),
            ConfigValue::Str(s) => match s.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "on" | "yes" => Some(true),
                "0" | "false" | "off" | "no" => Some(false),
                _ => None,
            },
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            ConfigValue::Int(i) => Some(*i),
            ConfigValue::Bool(b) => Some(i64::from(*b)),
            ConfigValue::Str(s) => s.trim().parse().ok(),
        }
    }

    /// Convert a TOML value. Arrays, tables and datetimes have no meaning
    /// as session keys and are rejected.
    pub fn from_toml(value: &toml::Value) -> Option<Self> {
        match value {
            toml::Value::String(s) => Some(ConfigValue::Str(s.clone())),
            toml::Value::Boolean(b) => Some(ConfigValue::Bool(*b)),
            toml::Value::Integer(i) => Some(ConfigValue::Int(*i)),
            toml::Value::Float(f) => Some(ConfigValue::Str(f.to_string())),
            _ => None,
        }
    }
}

impl fmt::Display for ConfigValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigValue::Str(s) => f.write_str(s),
            ConfigValue::Bool(b) => write!(f, "{}", b),
            ConfigValue::Int(i) => write!(f, "{}", i),
        }
    }
}

impl From<&str> for ConfigValue {
    fn from(s: &str) -> Self {
        ConfigValue::Str(s.to_string())
    }
}

impl From<String> for ConfigValue {
    fn from(s: String) -> Self {
        ConfigValue::Str(s)
    }
}

impl From<bool> for ConfigValue {
    fn from(b: bool) -> Self {
        ConfigValue::Bool(b)
    }
}

impl From<i64> for ConfigValue {
    fn from(i: i64) -> Self {
        ConfigValue::Int(i)
    }
}

/// Mutable key/value map used while merging layers.
///
/// Keys set through [`ConfigMap::force`] are pinned: later merges skip them.
#[derive(Debug, Clone, Default)]
pub struct ConfigMap {
    values: HashMap<String, ConfigValue>,
    forced: HashSet<String>,
}

impl ConfigMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a value unless the key was forced.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<ConfigValue>) {
        let key = key.into();
        if self.forced.contains(&key) {
            tracing::trace!("Keeping forced value for '{}'", key);
            return;
        }
        self.values.insert(key, value.into());
    }

    /// Set a value and pin it against later merges.
    pub fn force(&mut self, key: impl Into<String>, value: impl Into<ConfigValue>) {
        let key = key.into();
        self.values.insert(key.clone(), value.into());
        self.forced.insert(key);
    }

    /// Merge a layer on top of the current values.
    pub fn merge<I, K, V>(&mut self, layer: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<ConfigValue>,
    {
        for (key, value) in layer {
            self.set(key, value);
        }
    }

    /// Merge a TOML table.
    ///
    /// Nested tables are flattened into dotted keys, so `bezel.tattoo = "x"`
    /// and `"bezel.tattoo" = "x"` set the same key. Arrays are skipped.
    pub fn merge_toml(&mut self, table: &toml::Table) {
        self.merge_toml_prefixed("", table);
    }

    fn merge_toml_prefixed(&mut self, prefix: &str, table: &toml::Table) {
        for (key, value) in table {
            let key = if prefix.is_empty() {
                key.clone()
            } else {
                format!("{}.{}", prefix, key)
            };
            if let toml::Value::Table(nested) = value {
                self.merge_toml_prefixed(&key, nested);
                continue;
            }
            match ConfigValue::from_toml(value) {
                Some(value) => self.set(key, value),
                None => tracing::warn!("Ignoring non-scalar setting '{}'", key),
            }
        }
    }

    pub fn get(&self, key: &str) -> Option<&ConfigValue> {
        self.values.get(key)
    }

    pub fn is_forced(&self, key: &str) -> bool {
        self.forced.contains(key)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Sorted view for logging, with password values masked.
    pub fn redacted(&self) -> BTreeMap<&str, String> {
        self.values
            .iter()
            .map(|(key, value)| {
                let shown = if key.ends_with("password") || key.ends_with(".pass") {
                    "***".to_string()
                } else {
                    value.to_string()
                };
                (key.as_str(), shown)
            })
            .collect()
    }
}

/// Resolved configuration for one session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub emulator: String,
    pub emulator_forced: bool,
    pub core: Option<String>,
    pub core_forced: bool,
    /// Raw `videomode` value, empty when unset
    pub video_mode: String,
    pub resolution_is_reversed: bool,
    pub hud_support: bool,
    /// Raw `hud` value when set
    pub hud: Option<String>,
    pub hud_custom: Option<String>,
    /// Requested bezel, `None` when unset, empty or `none`
    pub bezel: Option<String>,
    /// Tattoo mode, `None` when unset or `0`
    pub tattoo: Option<String>,
    values: ConfigMap,
}

impl SessionConfig {
    /// Freeze a merged map. Fails if no emulator is configured.
    pub fn from_map(values: ConfigMap) -> Result<Self> {
        let emulator = values
            .get(KEY_EMULATOR)
            .map(ToString::to_string)
            .filter(|e| !e.is_empty())
            .ok_or(LaunchError::MissingEmulator)?;

        let text = |key: &str| values.get(key).map(ToString::to_string);
        let flag = |key: &str| {
            values
                .get(key)
                .and_then(ConfigValue::as_bool)
                .unwrap_or(false)
        };

        Ok(Self {
            emulator_forced: values.is_forced(KEY_EMULATOR),
            core: text(KEY_CORE).filter(|c| !c.is_empty()),
            core_forced: values.is_forced(KEY_CORE),
            video_mode: text(KEY_VIDEO_MODE).unwrap_or_default(),
            resolution_is_reversed: flag(KEY_RESOLUTION_REVERSED),
            hud_support: flag(KEY_HUD_SUPPORT),
            hud: text(KEY_HUD),
            hud_custom: text(KEY_HUD_CUSTOM),
            bezel: text(KEY_BEZEL).filter(|b| !b.is_empty() && b != "none"),
            tattoo: text(KEY_TATTOO).filter(|t| !t.is_empty() && t != "0"),
            emulator,
            values,
        })
    }

    /// True when the requested video mode leaves the choice to the launcher.
    pub fn wants_default_video_mode(&self) -> bool {
        self.video_mode.is_empty() || self.video_mode == "default"
    }

    /// True when a HUD layout was explicitly requested.
    pub fn hud_requested(&self) -> bool {
        self.hud
            .as_deref()
            .is_some_and(|hud| !hud.is_empty() && hud != "none")
    }

    /// Core name, or an empty string when none is configured.
    pub fn core_or_empty(&self) -> &str {
        self.core.as_deref().unwrap_or("")
    }

    pub fn is_set(&self, key: &str) -> bool {
        self.values.get(key).is_some()
    }

    pub fn get(&self, key: &str) -> Option<&ConfigValue> {
        self.values.get(key)
    }

    pub fn get_str(&self, key: &str) -> Option<String> {
        self.values.get(key).map(ToString::to_string)
    }

    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.values.get(key).and_then(ConfigValue::as_bool)
    }

    pub fn get_int(&self, key: &str) -> Option<i64> {
        self.values.get(key).and_then(ConfigValue::as_int)
    }

    pub fn values(&self) -> &ConfigMap {
        &self.values
    }
}
