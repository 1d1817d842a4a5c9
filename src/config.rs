//! Compiler configuration (`Config`, descended from the teacher's
//! `CompilerConfig`/`LintConfig`): the knobs `main.rs` derives from CLI
//! flags, plus an optional `rvimp.toml` file sitting next to the source
//! that can override the defaults, parsed with `serde`/`toml` the way the
//! teacher's `LintConfig::from_toml` parses `lints.toml`.
//!
//! Grounded in `examples/navicore-cem3/crates/compiler/src/lint.rs`'s
//! `LintConfig` (TOML-backed config struct, `from_toml`, `merge` for
//! user-overrides-defaults).

use serde::Deserialize;
use std::path::Path;

/// Whether the code generator folds constant binary operations and prefers
/// immediate-form instructions over loading a constant into a register
/// first. Both are mandatory per this crate's own semantics, so in
/// practice this stays `true`; the field exists for parity with the
/// teacher's optimization-level knob and as a seam for a future `-O0`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OptimizationLevel {
    None,
    Default,
}

impl Default for OptimizationLevel {
    fn default() -> Self {
        OptimizationLevel::Default
    }
}

/// User-overridable compiler configuration. CLI flags always take
/// precedence over a loaded `rvimp.toml`; `main.rs` applies the file first,
/// then lets clap-derived fields stomp on top.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    pub optimization_level: OptimizationLevel,
    pub output_base: String,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            optimization_level: OptimizationLevel::default(),
            output_base: "output".to_string(),
        }
    }
}

impl Config {
    pub fn new() -> Self {
        Config::default()
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self, String> {
        toml::from_str(toml_str).map_err(|e| format!("failed to parse rvimp.toml: {e}"))
    }

    /// Loads `rvimp.toml` from `dir` if present, falling back to defaults
    /// when the file doesn't exist. A file that exists but fails to parse
    /// is still an error.
    pub fn load_from_dir(dir: &Path) -> Result<Self, String> {
        let path = dir.join("rvimp.toml");
        match std::fs::read_to_string(&path) {
            Ok(contents) => Config::from_toml(&contents),
            Err(_) => Ok(Config::default()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_default_optimization() {
        let cfg = Config::default();
        assert_eq!(cfg.optimization_level, OptimizationLevel::Default);
        assert_eq!(cfg.output_base, "output");
    }

    #[test]
    fn from_toml_overrides_output_base() {
        let cfg = Config::from_toml("output_base = \"build/out\"\n").unwrap();
        assert_eq!(cfg.output_base, "build/out");
    }

    #[test]
    fn load_from_dir_falls_back_to_defaults_when_absent() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = Config::load_from_dir(dir.path()).unwrap();
        assert_eq!(cfg.output_base, "output");
    }

    #[test]
    fn from_toml_rejects_garbage() {
        assert!(Config::from_toml("not valid toml {{{").is_err());
    }
}
