//! Configuration for the `soficca` command-line adapter.
//!
//! The engine itself is configured through [`soficca_core::EngineConfig`];
//! this module only covers what the adapter adds on top (log format and
//! batch limits).

use std::env;

use anyhow::{bail, Context, Result};

/// Default upper bound on the number of items in one batch line.
pub const DEFAULT_MAX_BATCH_ITEMS: usize = 100;

/// Runtime configuration for the CLI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CliConfig {
    /// Emit log events as JSON lines instead of the human-readable format.
    pub log_json: bool,
    /// Maximum number of items accepted in a single `{"items": [...]}` line.
    pub max_batch_items: usize,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            log_json: false,
            max_batch_items: DEFAULT_MAX_BATCH_ITEMS,
        }
    }
}

impl CliConfig {
    /// Loads configuration from environment variables, falling back to defaults.
    ///
    /// Recognised variables:
    ///
    /// - `SOFICCA_LOG_JSON`
    ///   - accepted values (case-insensitive): `"1"`, `"true"`, `"yes"`, `"on"` → `true`
    ///   - anything else → `false`
    /// - `SOFICCA_MAX_BATCH_ITEMS`
    ///   - positive integer
    pub fn from_env() -> Result<Self> {
        let mut cfg = Self::default();

        if let Ok(raw) = env::var("SOFICCA_LOG_JSON") {
            cfg.log_json = soficca_core::config::parse_bool(&raw);
        }

        if let Ok(raw) = env::var("SOFICCA_MAX_BATCH_ITEMS") {
            let parsed: usize = raw
                .trim()
                .parse()
                .with_context(|| format!("Invalid SOFICCA_MAX_BATCH_ITEMS value: {raw}"))?;
            if parsed == 0 {
                bail!("SOFICCA_MAX_BATCH_ITEMS must be greater than zero");
            }
            cfg.max_batch_items = parsed;
        }

        Ok(cfg)
    }
}
