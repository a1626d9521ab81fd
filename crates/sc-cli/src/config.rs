use std::path::Path;
use std::str::FromStr;

use serde::Deserialize;

/// Top-level configuration for the `sc` CLI, loadable from an optional TOML
/// file with every field defaulted so a bare `sc execute FILE` needs none.
/// CLI flags (`--no-code`, `-l`, clock speed) override the matching field
/// when present, the same precedence the logging level gives `RUST_LOG`.
#[derive(Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct InterpreterConfig {
    /// Collect contract failures into `failed_conditions` instead of
    /// aborting the macro-step on the first one.
    pub silent_contract: bool,
    /// Bound on the number of macro-steps `execute` runs. `<= 0` is
    /// unbounded.
    pub max_steps: i64,
    /// Wall-clock multiplier used by `sc-runtime::BackgroundDriver`.
    pub clock_speed: f64,
    pub log: LoggingConfig,
}

impl Default for InterpreterConfig {
    fn default() -> Self {
        Self { silent_contract: false, max_steps: -1, clock_speed: 1.0, log: LoggingConfig::default() }
    }
}

impl InterpreterConfig {
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| anyhow::anyhow!("failed to read {}: {e}", path.as_ref().display()))?;
        content.parse()
    }
}

impl FromStr for InterpreterConfig {
    type Err = anyhow::Error;

    fn from_str(toml_str: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(toml_str)?)
    }
}

/// Logging configuration, matching `sc-runtime::init_tracing`'s two knobs.
#[derive(Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: "info".to_string(), json: false }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_config_uses_every_default() {
        let cfg: InterpreterConfig = "".parse().unwrap();
        assert_eq!(cfg, InterpreterConfig::default());
    }

    #[test]
    fn partial_config_overrides_only_named_fields() {
        let cfg: InterpreterConfig = r#"
            max_steps = 50

            [log]
            level = "debug"
        "#
        .parse()
        .unwrap();
        assert_eq!(cfg.max_steps, 50);
        assert!(!cfg.silent_contract);
        assert_eq!(cfg.log.level, "debug");
        assert!(!cfg.log.json);
    }

    #[test]
    fn rejects_malformed_toml() {
        assert!("max_steps = [".parse::<InterpreterConfig>().is_err());
    }
}
