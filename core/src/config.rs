//! Configuration handling for the Soficca decision engine.
//!
//! Settings are read from environment variables or from a small YAML file.
//! The engine is deterministic for a fixed configuration: nothing here
//! changes which rule or policy fires, only what gets surfaced in the trace.

use std::env;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

/// Runtime configuration for a [`crate::DecisionEngine`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct EngineConfig {
    /// When `true`, safety-flag codes that match no known red flag are
    /// listed in one uncertainty note. They never trigger a policy either way.
    #[serde(default)]
    pub surface_unknown_safety_flags: bool,
}

impl EngineConfig {
    /// Creates a new configuration with explicit values.
    #[must_use]
    pub const fn new(surface_unknown_safety_flags: bool) -> Self {
        Self {
            surface_unknown_safety_flags,
        }
    }

    /// Loads configuration from environment variables, falling back to defaults.
    ///
    /// Recognised variables:
    ///
    /// - `SOFICCA_SURFACE_UNKNOWN_FLAGS` or `SOFICCA_STRICT_FLAGS`
    ///   - accepted values (case-insensitive): `"1"`, `"true"`, `"yes"`, `"on"` → `true`
    ///   - anything else → `false`
    ///   - unset → default (`false`)
    ///
    /// # Errors
    ///
    /// Currently infallible; the `Result` keeps the signature aligned with
    /// [`EngineConfig::from_yaml`].
    pub fn from_env() -> Result<Self> {
        let mut cfg = Self::default();

        if let Some(raw) = first_env(&["SOFICCA_SURFACE_UNKNOWN_FLAGS", "SOFICCA_STRICT_FLAGS"]) {
            cfg.surface_unknown_safety_flags = parse_bool(&raw);
        }

        Ok(cfg)
    }

    /// Loads configuration from a YAML file.
    ///
    /// Missing keys take their default value.
    ///
    /// # Errors
    ///
    /// Fails if the file cannot be read or is not valid YAML for this struct.
    pub fn from_yaml(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Unable to read engine config from {}", path.display()))?;
        Self::from_yaml_str(&raw)
            .with_context(|| format!("Invalid engine config in {}", path.display()))
    }

    /// Parses configuration from YAML text.
    ///
    /// # Errors
    ///
    /// Fails on malformed YAML or unknown value types.
    pub fn from_yaml_str(raw: &str) -> Result<Self> {
        if raw.trim().is_empty() {
            return Ok(Self::default());
        }
        let cfg: Self = serde_yaml::from_str(raw)?;
        Ok(cfg)
    }
}

/// Returns the first defined environment variable from the given list.
fn first_env(keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| env::var(key).ok())
}

/// Parses a loose boolean value from a string.
///
/// Accepted as `true`: `"1"`, `"true"`, `"yes"`, `"on"`.
/// Any other value → `false` (conservative default).
#[must_use]
pub fn parse_bool(raw: &str) -> bool {
    let v = raw.trim().to_ascii_lowercase();
    matches!(v.as_str(), "1" | "true" | "yes" | "on")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;

    fn reset_env() {
        for key in ["SOFICCA_SURFACE_UNKNOWN_FLAGS", "SOFICCA_STRICT_FLAGS"] {
            env::remove_var(key);
        }
    }

    #[test]
    fn default_config_keeps_unknown_flags_silent() {
        let cfg = EngineConfig::default();
        assert!(!cfg.surface_unknown_safety_flags);
    }

    // Only test touching the environment; tests run in parallel.
    #[test]
    fn env_overrides_defaults() {
        reset_env();
        assert_eq!(EngineConfig::from_env().unwrap(), EngineConfig::default());

        env::set_var("SOFICCA_STRICT_FLAGS", "yes");
        assert!(EngineConfig::from_env().unwrap().surface_unknown_safety_flags);

        env::set_var("SOFICCA_SURFACE_UNKNOWN_FLAGS", "off");
        assert!(!EngineConfig::from_env().unwrap().surface_unknown_safety_flags);

        reset_env();
    }

    #[test]
    fn yaml_config() {
        let cfg = EngineConfig::from_yaml_str("surface_unknown_safety_flags: true\n").unwrap();
        assert!(cfg.surface_unknown_safety_flags);

        assert_eq!(EngineConfig::from_yaml_str("").unwrap(), EngineConfig::default());
        assert_eq!(EngineConfig::from_yaml_str("{}").unwrap(), EngineConfig::default());
        assert!(EngineConfig::from_yaml_str("surface_unknown_safety_flags: [1, 2]").is_err());
    }

    #[test]
    fn missing_yaml_file_errors() {
        assert!(EngineConfig::from_yaml(Path::new("/definitely/not/here.yaml")).is_err());
    }

    #[test]
    fn parse_bool_variants() {
        assert!(parse_bool("1"));
        assert!(parse_bool("true"));
        assert!(parse_bool("YES"));
        assert!(parse_bool("On"));

        assert!(!parse_bool("0"));
        assert!(!parse_bool("false"));
        assert!(!parse_bool("no"));
        assert!(!parse_bool("maybe"));
    }
}
